//! Change-feed error types.

use thiserror::Error;

/// Change-feed error type.
#[derive(Error, Debug)]
pub enum FeedError {
    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Authentication error
    #[error("Channel authentication failed: {0}")]
    Authentication(String),

    /// Not connected error
    #[error("Not connected to the change feed")]
    NotConnected,

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Send error
    #[error("Failed to send channel message: {0}")]
    Send(String),
}

/// Result type alias using FeedError.
pub type FeedResult<T> = Result<T, FeedError>;
