//! Authentication error types.

use thiserror::Error;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The credential service rejected the email/password pair.
    /// Surfaced to the user verbatim; never retried.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Authentication succeeded but the profile row is missing, so the
    /// role cannot be resolved. Treated as unauthenticated downstream.
    #[error("User not found in database")]
    ProfileMissing,

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the credential service
    #[error("credential service rejected {operation}: {status} ({body_summary})")]
    Api {
        operation: &'static str,
        status: reqwest::StatusCode,
        body_summary: String,
    },

    /// Record store error while resolving or provisioning the profile
    #[error("profile lookup failed: {0}")]
    Record(#[from] record_client::RecordError),

    /// JSON decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
