//! WebSocket feed client with automatic reconnection.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::{interval, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::error::{FeedError, FeedResult};
use crate::hub::{FeedEvent, FeedHub, FeedSubscription};
use crate::protocol::{normalize, FeedMessage, FeedMessageType, RawChange};

/// Feed client configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed channel URL (e.g. `wss://feed.eventdesk.io/v1`).
    pub url: String,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Base reconnect delay in seconds.
    pub reconnect_base_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub reconnect_max_delay_secs: u64,
    /// Maximum reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "wss://feed.eventdesk.io/v1".to_string(),
            heartbeat_interval_secs: 30,
            reconnect_base_delay_secs: 2,
            reconnect_max_delay_secs: 30,
            max_reconnect_attempts: 10,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
}

/// WebSocket feed client.
///
/// One client serves the whole process; views subscribe to collections
/// through it. `connect` runs the socket loop until the connection is
/// finally lost, so callers usually spawn it.
pub struct FeedClient {
    config: FeedConfig,
    state: Arc<RwLock<ConnectionState>>,
    hub: Arc<FeedHub>,
    sender: Arc<Mutex<Option<mpsc::Sender<Message>>>>,
    auth_token: Arc<RwLock<Option<String>>>,
    /// Collections to re-join after a reconnect.
    joined: Arc<RwLock<HashSet<String>>>,
    reconnect_attempts: Arc<RwLock<u32>>,
    /// Whether a connection has ever been established; a later reconnect
    /// must announce a resync, the first connect must not.
    was_connected: Arc<RwLock<bool>>,
}

impl FeedClient {
    /// Create a new feed client with the given configuration.
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            hub: Arc::new(FeedHub::new()),
            sender: Arc::new(Mutex::new(None)),
            auth_token: Arc::new(RwLock::new(None)),
            joined: Arc::new(RwLock::new(HashSet::new())),
            reconnect_attempts: Arc::new(RwLock::new(0)),
            was_connected: Arc::new(RwLock::new(false)),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(FeedConfig::default())
    }

    /// Get the current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Check if connected and authenticated.
    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Subscribe to a collection's change events.
    ///
    /// Joins the topic on the live channel when connected; the topic is
    /// re-joined automatically after reconnects. The returned subscription
    /// releases the channel when dropped or cancelled.
    pub async fn subscribe(&self, collection: &str) -> FeedSubscription {
        let subscription = self.hub.subscribe(collection);
        self.joined.write().await.insert(collection.to_string());

        if self.is_connected().await {
            if let Err(e) = self.send_message(FeedMessage::join(collection)).await {
                warn!(collection, error = %e, "failed to join collection topic");
            }
        }

        subscription
    }

    /// Connect to the feed channel and process events until the
    /// connection is finally lost. Stores the token for reconnects.
    pub async fn connect(&self, access_token: &str) -> FeedResult<()> {
        let current_state = *self.state.read().await;
        if current_state != ConnectionState::Disconnected {
            debug!("already connecting or connected");
            return Ok(());
        }

        *self.auth_token.write().await = Some(access_token.to_string());

        self.do_connect().await
    }

    /// Internal connect implementation.
    async fn do_connect(&self) -> FeedResult<()> {
        *self.state.write().await = ConnectionState::Connecting;
        info!(url = %self.config.url, "connecting to change feed");

        let (ws_stream, _) = connect_async(&self.config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        let (msg_tx, mut msg_rx) = mpsc::channel::<Message>(100);
        *self.sender.lock().await = Some(msg_tx.clone());

        *self.state.write().await = ConnectionState::Authenticating;

        let auth_token = self
            .auth_token
            .read()
            .await
            .clone()
            .ok_or_else(|| FeedError::Authentication("no access token".to_string()))?;

        let auth_json = FeedMessage::auth(&auth_token).to_json()?;
        write.send(Message::Text(auth_json.into())).await?;
        debug!("sent AUTH message");

        // Writer task drains the outgoing queue.
        let sender_handle = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if write.send(msg).await.is_err() {
                    break;
                }
            }
        });

        // Heartbeat task keeps the channel alive.
        let heartbeat_sender = msg_tx.clone();
        let heartbeat_interval = self.config.heartbeat_interval_secs;
        let heartbeat_handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(heartbeat_interval));
            loop {
                ticker.tick().await;
                if let Ok(json) = FeedMessage::heartbeat().to_json() {
                    if heartbeat_sender
                        .send(Message::Text(json.into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            }
        });

        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match FeedMessage::from_json(&text) {
                    Ok(feed_msg) => self.handle_message(feed_msg).await,
                    Err(e) => {
                        warn!(error = %e, "failed to parse feed message");
                    }
                },
                Ok(Message::Close(_)) => {
                    info!("feed connection closed");
                    break;
                }
                Ok(Message::Ping(data)) => {
                    if let Some(sender) = self.sender.lock().await.as_ref() {
                        let _ = sender.send(Message::Pong(data)).await;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "WebSocket error");
                    break;
                }
            }
        }

        // Cleanup
        heartbeat_handle.abort();
        sender_handle.abort();
        *self.sender.lock().await = None;
        *self.state.write().await = ConnectionState::Disconnected;

        // Attempt reconnection; consumers reseed once it succeeds.
        self.schedule_reconnect().await;

        Ok(())
    }

    /// Handle one incoming feed message.
    async fn handle_message(&self, msg: FeedMessage) {
        match msg.msg_type {
            FeedMessageType::AuthResult => {
                if msg.success == Some(true) {
                    *self.state.write().await = ConnectionState::Connected;
                    *self.reconnect_attempts.write().await = 0;
                    info!("authenticated with change feed");

                    // Re-join every observed collection on the new socket.
                    let collections: Vec<String> =
                        self.joined.read().await.iter().cloned().collect();
                    for collection in collections {
                        if let Err(e) = self.send_message(FeedMessage::join(&collection)).await {
                            warn!(collection = %collection, error = %e, "failed to re-join topic");
                        }
                    }

                    let mut was_connected = self.was_connected.write().await;
                    if *was_connected {
                        // The channel cannot replay what was missed while
                        // disconnected; every consumer must reseed.
                        info!("reconnected, requesting consumer resync");
                        self.hub.broadcast(FeedEvent::Resync);
                    } else {
                        *was_connected = true;
                    }
                } else {
                    let error = msg.error.unwrap_or_else(|| "unknown error".to_string());
                    *self.state.write().await = ConnectionState::Disconnected;
                    error!(error = %error, "feed authentication failed");
                }
            }
            FeedMessageType::Joined => {
                if let Some(collection) = &msg.collection {
                    debug!(collection = %collection, "joined collection topic");
                }
            }
            FeedMessageType::Left => {
                if let Some(collection) = &msg.collection {
                    debug!(collection = %collection, "left collection topic");
                }
            }
            FeedMessageType::Change => {
                let Some(collection) = msg.collection.as_deref() else {
                    warn!("change message without a collection");
                    return;
                };
                let Some(payload) = msg.payload else {
                    warn!(collection, "change message without a payload");
                    return;
                };
                let raw: RawChange = match serde_json::from_value(payload) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(collection, error = %e, "undecodable change payload");
                        return;
                    }
                };
                let event = normalize(collection, raw);
                self.hub.notify(collection, FeedEvent::Change(event));
            }
            FeedMessageType::Error => {
                let error = msg.error.unwrap_or_else(|| "unknown error".to_string());
                warn!(error = %error, "feed channel error");
            }
            other => {
                debug!(msg_type = ?other, "ignoring feed message");
            }
        }
    }

    /// Schedule automatic reconnection with exponential backoff.
    async fn schedule_reconnect(&self) {
        let mut attempts = self.reconnect_attempts.write().await;
        *attempts += 1;

        if *attempts > self.config.max_reconnect_attempts {
            warn!("max reconnect attempts reached, live updates unavailable");
            self.hub.broadcast(FeedEvent::Lost(
                "max reconnect attempts reached".to_string(),
            ));
            return;
        }

        let delay = std::cmp::min(
            self.config.reconnect_base_delay_secs * 2u64.pow(*attempts - 1),
            self.config.reconnect_max_delay_secs,
        );

        info!(attempt = *attempts, delay_secs = delay, "scheduling feed reconnect");

        drop(attempts);

        tokio::time::sleep(Duration::from_secs(delay)).await;

        if self.auth_token.read().await.is_some() {
            if let Err(e) = Box::pin(self.do_connect()).await {
                error!(error = %e, "feed reconnect failed");
            }
        }
    }

    /// Disconnect and stop reconnecting.
    pub async fn disconnect(&self) {
        *self.reconnect_attempts.write().await = self.config.max_reconnect_attempts + 1;

        if let Some(sender) = self.sender.lock().await.take() {
            drop(sender);
        }

        *self.state.write().await = ConnectionState::Disconnected;
        *self.auth_token.write().await = None;

        info!("disconnected from change feed");
    }

    /// Send a message over the live channel.
    async fn send_message(&self, msg: FeedMessage) -> FeedResult<()> {
        let sender = self.sender.lock().await;
        let sender = sender.as_ref().ok_or(FeedError::NotConnected)?;

        let json = msg.to_json()?;
        sender
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| FeedError::Send(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = FeedConfig::default();
        assert_eq!(config.heartbeat_interval_secs, 30);
        assert_eq!(config.reconnect_base_delay_secs, 2);
        assert_eq!(config.reconnect_max_delay_secs, 30);
        assert_eq!(config.max_reconnect_attempts, 10);
    }

    #[tokio::test]
    async fn initial_state_is_disconnected() {
        let client = FeedClient::with_defaults();
        assert_eq!(client.state().await, ConnectionState::Disconnected);
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn subscribe_without_connection_still_registers() {
        let client = FeedClient::with_defaults();
        let sub = client.subscribe("event_requests").await;

        assert_eq!(sub.collection(), "event_requests");
        assert_eq!(client.hub.subscriber_count("event_requests"), 1);
        assert!(client.joined.read().await.contains("event_requests"));
    }

    #[tokio::test]
    async fn change_messages_reach_subscribers() {
        let client = FeedClient::with_defaults();
        let mut sub = client.subscribe("event_requests").await;

        let raw = RawChange {
            operation: "INSERT".to_string(),
            record: serde_json::json!({"id": 7, "title": "Gala", "date": "2025-10-01", "status": "Open"}),
            old_record: None,
        };
        let msg = FeedMessage {
            collection: Some("event_requests".to_string()),
            payload: Some(serde_json::to_value(&raw).unwrap()),
            ..FeedMessage::new(FeedMessageType::Change)
        };

        client.handle_message(msg).await;

        match sub.try_recv().unwrap() {
            FeedEvent::Change(event) => {
                assert_eq!(event.op, eventdesk_types::ChangeOp::Insert);
                assert_eq!(event.record["id"], 7);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn auth_result_reconnect_broadcasts_resync() {
        let client = FeedClient::with_defaults();
        let mut sub = client.subscribe("event_requests").await;

        let ok = FeedMessage {
            success: Some(true),
            ..FeedMessage::new(FeedMessageType::AuthResult)
        };

        // First successful auth: no resync, consumers seed on mount.
        client.handle_message(ok.clone()).await;
        assert!(client.is_connected().await);
        assert!(sub.try_recv().is_none());

        // Second successful auth means a reconnect happened in between.
        client.handle_message(ok).await;
        assert!(matches!(sub.try_recv(), Some(FeedEvent::Resync)));
    }

    #[tokio::test]
    async fn failed_auth_disconnects() {
        let client = FeedClient::with_defaults();
        let msg = FeedMessage {
            success: Some(false),
            error: Some("bad token".to_string()),
            ..FeedMessage::new(FeedMessageType::AuthResult)
        };

        client.handle_message(msg).await;
        assert_eq!(client.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn undecodable_change_payload_is_skipped() {
        let client = FeedClient::with_defaults();
        let mut sub = client.subscribe("event_requests").await;

        let msg = FeedMessage {
            collection: Some("event_requests".to_string()),
            payload: Some(serde_json::json!("not an object")),
            ..FeedMessage::new(FeedMessageType::Change)
        };
        client.handle_message(msg).await;

        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn disconnect_when_not_connected_is_safe() {
        let client = FeedClient::with_defaults();
        client.disconnect().await;
        assert_eq!(client.state().await, ConnectionState::Disconnected);
    }
}
