//! REST client for the table-shaped record store.
//!
//! The backing store exposes its tables over a PostgREST-compatible API:
//! filters are query-string operators (`status=eq.Open`), writes are
//! POST/PATCH with an `apikey` header plus the caller's bearer token, and
//! exact counts travel back in the `Content-Range` header. One-shot
//! queries only; failures surface as [`RecordError`] and are never retried
//! here.

mod client;
mod error;
mod query;

pub use client::RecordClient;
pub use error::{RecordError, RecordResult};
pub use query::TableQuery;
