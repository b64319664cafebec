//! The process-root application context.
//!
//! One context owns every collaborator client for the lifetime of the
//! process and is passed explicitly to whatever needs it. Nothing in the
//! workspace constructs its own backend handle.

use std::sync::Arc;

use auth_client::{AuthClient, SessionStore};
use change_feed::{FeedClient, FeedConfig};
use eventdesk_config::Config;
use record_client::RecordClient;

/// Owns the collaborator clients and the session store.
pub struct AppContext {
    pub config: Config,
    pub records: RecordClient,
    pub auth: AuthClient,
    pub feed: Arc<FeedClient>,
    pub session: Arc<SessionStore>,
}

impl AppContext {
    /// Builds the context from configuration.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let records = RecordClient::new(&config.api_url, &config.publishable_key);
        let auth = AuthClient::new(&config.api_url, &config.publishable_key, records.clone());

        let feed = FeedClient::new(FeedConfig {
            url: config.feed_url()?,
            ..FeedConfig::default()
        });

        Ok(Self {
            config,
            records,
            auth,
            feed: Arc::new(feed),
            session: Arc::new(SessionStore::new()),
        })
    }

    /// The current access token, or an error when signed out.
    pub fn access_token(&self) -> anyhow::Result<String> {
        self.session
            .access_token()
            .ok_or_else(|| anyhow::anyhow!("not signed in"))
    }
}
