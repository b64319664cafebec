//! Credential service client and session store.
//!
//! This crate provides:
//! - REST client for the credential service (password sign-in, signup,
//!   current-user lookup)
//! - Profile provisioning and lookup against the `users` table
//! - A per-process session store with change notifications
//!
//! Failure policy: a failed credential check or an unresolvable profile
//! record is reported as unauthenticated. "Signed in but role unknown" is
//! indistinguishable from "not signed in" to every consumer.

mod client;
mod error;
mod session;

pub use client::{AuthClient, AuthSession, SignedIn};
pub use error::{AuthError, AuthResult};
pub use session::{SessionEvent, SessionStore};
