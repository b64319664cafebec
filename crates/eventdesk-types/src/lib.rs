//! Shared domain types for the Eventdesk dashboard core.
//!
//! Everything in this crate is plain data: roles and profiles, event
//! requests and their status state machine, and the normalized change
//! events the feed client produces. No I/O happens here.

mod change;
mod request;
mod role;

pub use change::{ChangeEvent, ChangeOp, MessageRecord};
pub use request::{EventRequest, InvalidTransition, RequestId, RequestStatus, UnknownStatus};
pub use role::{Role, SessionSnapshot, UnknownRole, UserId, UserProfile};
