//! # Request board
//!
//! The locally held view of the `event_requests` collection, kept live by
//! the change feed, plus the derived unread-message counter.
//!
//! ## Principles
//!
//! - **The backing store is the only authority** - local state is a cache
//!   seeded by one-shot fetches and patched by feed events
//! - **One writer** - all mutation happens on the owning view's single
//!   event loop; the board itself does no I/O
//! - **Reconciliation is total** - every feed event produces an outcome,
//!   and outcomes that cannot be applied demand a reseed instead of being
//!   dropped
//!
//! ## Example
//!
//! ```rust
//! use eventdesk_types::{EventRequest, RequestId, RequestStatus, Role};
//! use request_board::RequestBoard;
//!
//! let mut board = RequestBoard::new();
//! board.seed(vec![]);
//!
//! board.apply_upsert(EventRequest {
//!     id: RequestId(7),
//!     title: "Gala".to_string(),
//!     date: chrono::NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
//!     status: RequestStatus::Open,
//! });
//!
//! assert_eq!(board.len(), 1);
//! assert_eq!(board.visible(Role::Agency).len(), 1);
//! ```

mod board;
mod live;
mod unread;

#[cfg(test)]
mod tests;

pub use board::{BoardOutcome, RequestBoard, REQUESTS_COLLECTION};
pub use live::{BoardHub, BoardSignal, BoardSubscription};
pub use unread::{UnreadCounter, MESSAGES_COLLECTION};
