//! The per-process session store.
//!
//! Holds the current authenticated identity and notifies observers on
//! every identity or role change. Exactly one store exists per client
//! context, and it has one writer path: the credential operations plus
//! profile updates observed over the change feed.

use std::sync::RwLock;

use tokio::sync::broadcast;

use eventdesk_types::{SessionSnapshot, UserProfile};

use crate::client::{AuthSession, SignedIn};

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session change notifications.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A user signed in (or was restored from an existing token).
    SignedIn(UserProfile),
    /// The signed-in user's role was reassigned externally.
    RoleChanged(UserProfile),
    /// The session ended.
    SignedOut,
}

struct SessionState {
    session: Option<AuthSession>,
    profile: Option<UserProfile>,
}

/// Holds the current identity and its access token.
pub struct SessionStore {
    state: RwLock<SessionState>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(SessionState {
                session: None,
                profile: None,
            }),
            event_tx,
        }
    }

    /// Subscribe to session change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// The current observable state. A held token without a resolved
    /// profile reads as `Unauthenticated` (fail closed).
    pub fn current(&self) -> SessionSnapshot {
        let state = self.state.read().expect("lock poisoned");
        match (&state.session, &state.profile) {
            (Some(_), Some(profile)) => SessionSnapshot::Authenticated(profile.clone()),
            _ => SessionSnapshot::Unauthenticated,
        }
    }

    /// The access token for outgoing requests, if signed in.
    pub fn access_token(&self) -> Option<String> {
        let state = self.state.read().expect("lock poisoned");
        state.session.as_ref().map(|s| s.access_token.clone())
    }

    /// Installs a signed-in identity and notifies observers.
    pub fn set_signed_in(&self, signed_in: SignedIn) {
        let profile = signed_in.profile.clone();
        {
            let mut state = self.state.write().expect("lock poisoned");
            state.session = Some(signed_in.session);
            state.profile = Some(signed_in.profile);
        }
        tracing::info!(user_id = %profile.id, role = %profile.role, "session established");
        let _ = self.event_tx.send(SessionEvent::SignedIn(profile));
    }

    /// Applies a profile row observed elsewhere (feed event or re-fetch).
    ///
    /// Rows for other users are ignored. A role change notifies observers
    /// so guarded views re-run authorization.
    pub fn apply_profile_update(&self, profile: UserProfile) {
        let role_changed = {
            let mut state = self.state.write().expect("lock poisoned");
            match &state.profile {
                Some(current) if current.id == profile.id => {
                    let changed = current.role != profile.role;
                    state.profile = Some(profile.clone());
                    changed
                }
                _ => return,
            }
        };

        if role_changed {
            tracing::warn!(user_id = %profile.id, role = %profile.role, "session role reassigned");
            let _ = self.event_tx.send(SessionEvent::RoleChanged(profile));
        }
    }

    /// Ends the session and notifies observers.
    pub fn sign_out(&self) {
        {
            let mut state = self.state.write().expect("lock poisoned");
            state.session = None;
            state.profile = None;
        }
        tracing::info!("session ended");
        let _ = self.event_tx.send(SessionEvent::SignedOut);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
