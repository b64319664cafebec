//! Credential service REST client.
//!
//! Sign-in is a two-step resolution: the password grant yields an access
//! token and the opaque user id, then the profile row (including the role)
//! is fetched from the `users` table. A session without a resolvable
//! profile is unusable and reported as [`AuthError::ProfileMissing`].

use chrono::{DateTime, Duration, Utc};
use record_client::{RecordClient, TableQuery};
use serde::Deserialize;

use eventdesk_types::{Role, UserId, UserProfile};

use crate::error::{AuthError, AuthResult};

const PROFILE_COLUMNS: &str = "id,name,email,role";

fn body_digest(body: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// An access token bound to an authenticated user.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub user_id: UserId,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The result of a successful sign-in or sign-up: the token plus the
/// resolved profile.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session: AuthSession,
    pub profile: UserProfile,
}

/// Wire shape of the credential service's token and user endpoints.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: UserId,
}

/// Credential service REST client.
#[derive(Clone)]
pub struct AuthClient {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
    records: RecordClient,
}

impl AuthClient {
    /// Create a new credential service client.
    ///
    /// # Arguments
    /// * `api_url` - The project API URL (e.g. `https://xyz.example.co`)
    /// * `anon_key` - The publishable API key
    /// * `records` - Record store client used for profile rows
    pub fn new(
        api_url: impl Into<String>,
        anon_key: impl Into<String>,
        records: RecordClient,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.into(),
            anon_key: anon_key.into(),
            records,
        }
    }

    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.api_url, endpoint)
    }

    fn session_from(&self, token: TokenResponse) -> AuthSession {
        AuthSession {
            access_token: token.access_token,
            user_id: token.user.id,
            expires_at: token
                .expires_in
                .map(|seconds| Utc::now() + Duration::seconds(seconds)),
        }
    }

    /// Sign in with email and password, then resolve the profile row.
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<SignedIn> {
        let url = format!("{}?grant_type=password", self.auth_url("token"));
        tracing::debug!(email, "signing in");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
        {
            tracing::warn!(email, status = %status, "credentials rejected");
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let summary = body_digest(&body);
            tracing::error!(status = %status, body_summary = %summary, "sign-in failed");
            return Err(AuthError::Api {
                operation: "sign-in",
                status,
                body_summary: summary,
            });
        }

        let token: TokenResponse = response.json().await?;
        let session = self.session_from(token);
        let profile = self.fetch_profile(&session).await?;

        tracing::info!(user_id = %session.user_id, role = %profile.role, "signed in");
        Ok(SignedIn { session, profile })
    }

    /// Create an account, provision the profile row, and confirm it.
    ///
    /// The profile insert and the confirming re-fetch mirror the two-phase
    /// provisioning the backend expects; a missing row after insert is
    /// reported, not papered over.
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> AuthResult<SignedIn> {
        let url = self.auth_url("signup");
        tracing::debug!(email, role = %role, "signing up");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Content-Type", "application/json")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let summary = body_digest(&body);
            tracing::error!(status = %status, body_summary = %summary, "sign-up failed");
            return Err(AuthError::Api {
                operation: "sign-up",
                status,
                body_summary: summary,
            });
        }

        let token: TokenResponse = response.json().await?;
        let session = self.session_from(token);

        let row = serde_json::json!({
            "id": session.user_id,
            "name": name,
            "email": email,
            "role": role,
        });
        self.records
            .insert("users", &row, &session.access_token)
            .await?;

        // Re-fetch to confirm provisioning landed before reporting success.
        let profile = self.fetch_profile(&session).await?;

        tracing::info!(user_id = %session.user_id, role = %profile.role, "signed up");
        Ok(SignedIn { session, profile })
    }

    /// Resolve the identity behind an existing access token.
    pub async fn current_user(&self, access_token: &str) -> AuthResult<SignedIn> {
        let url = self.auth_url("user");
        tracing::debug!("resolving current user");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let summary = body_digest(&body);
            tracing::warn!(status = %status, body_summary = %summary, "current-user lookup failed");
            return Err(AuthError::Api {
                operation: "current-user",
                status,
                body_summary: summary,
            });
        }

        let user: WireUser = response.json().await?;
        let session = AuthSession {
            access_token: access_token.to_string(),
            user_id: user.id,
            expires_at: None,
        };
        let profile = self.fetch_profile(&session).await?;
        Ok(SignedIn { session, profile })
    }

    /// Fetch the profile row for a session's user id.
    pub async fn fetch_profile(&self, session: &AuthSession) -> AuthResult<UserProfile> {
        let query = TableQuery::new()
            .eq("id", session.user_id)
            .select(PROFILE_COLUMNS);
        let rows: Vec<UserProfile> = self
            .records
            .select("users", &query, &session.access_token)
            .await?;

        match rows.into_iter().next() {
            Some(profile) => Ok(profile),
            None => {
                tracing::error!(user_id = %session.user_id, "profile row missing");
                Err(AuthError::ProfileMissing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AuthClient {
        let records = RecordClient::new("https://test.example.co", "test-key");
        AuthClient::new("https://test.example.co", "test-key", records)
    }

    #[test]
    fn auth_url_shape() {
        let client = client();
        assert_eq!(
            client.auth_url("token"),
            "https://test.example.co/auth/v1/token"
        );
        assert_eq!(
            client.auth_url("signup"),
            "https://test.example.co/auth/v1/signup"
        );
    }

    #[test]
    fn token_response_deserializes() {
        let json = r#"{
            "access_token": "jwt-here",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": "4f5c1a52-6f0e-4bfb-8f2e-0d1a6d1c9e21", "email": "a@b.c" }
        }"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.access_token, "jwt-here");
        assert_eq!(token.expires_in, Some(3600));
    }

    #[test]
    fn session_expiry_derived_from_expires_in() {
        let client = client();
        let token: TokenResponse = serde_json::from_str(
            r#"{"access_token":"t","user":{"id":"4f5c1a52-6f0e-4bfb-8f2e-0d1a6d1c9e21"}}"#,
        )
        .unwrap();
        let session = client.session_from(token);
        assert!(session.expires_at.is_none());
        assert_eq!(session.access_token, "t");
    }

    #[test]
    fn invalid_credentials_message_is_literal() {
        // The UI shows this string to the user as-is.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        assert_eq!(
            AuthError::ProfileMissing.to_string(),
            "User not found in database"
        );
    }
}
