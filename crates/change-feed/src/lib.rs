//! Change-feed client.
//!
//! Subscribes to the backend's push channel for named collections and
//! normalizes the heterogeneous wire payloads into typed
//! [`eventdesk_types::ChangeEvent`]s delivered over per-collection
//! channels. Consumers never touch the socket: the reconciliation logic
//! stays testable without a live network.
//!
//! # Delivery contract
//!
//! - Events for the same row id arrive in the channel's commit order; no
//!   ordering is guaranteed across different ids.
//! - Unrecognized operation tags are delivered as `ChangeOp::Unknown`
//!   (with a warning), never dropped.
//! - After every reconnect the client emits [`FeedEvent::Resync`]: it
//!   cannot know what it missed while disconnected, so consumers must
//!   reseed from a one-shot fetch before resuming incremental application.
//! - When reconnection gives up, [`FeedEvent::Lost`] is emitted so the UI
//!   can surface a "live updates unavailable" state.

mod client;
mod error;
mod hub;
mod protocol;

pub use client::{ConnectionState, FeedClient, FeedConfig};
pub use error::{FeedError, FeedResult};
pub use hub::{FeedEvent, FeedHub, FeedSubscription};
pub use protocol::{normalize, FeedMessage, FeedMessageType, RawChange};
