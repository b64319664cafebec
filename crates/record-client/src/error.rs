//! Record store error types.

use thiserror::Error;

/// Record store error type.
#[derive(Error, Debug)]
pub enum RecordError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the store
    #[error("record store rejected {operation} on {table}: {status} ({body_summary})")]
    Api {
        operation: &'static str,
        table: String,
        status: reqwest::StatusCode,
        body_summary: String,
    },

    /// JSON decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The store did not report a count where one was requested
    #[error("count response for {table} carried no Content-Range total")]
    MissingCount { table: String },
}

/// Result type alias using RecordError.
pub type RecordResult<T> = Result<T, RecordError>;
