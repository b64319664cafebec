//! The guarded dashboard runtime.
//!
//! Mounting a dashboard view runs the full sequence the UI depends on:
//! authorize the session for the view's role, seed the board from a
//! one-shot fetch scoped to that role's visibility rule, subscribe to the
//! change feed, and take an authoritative unread recount. After that a
//! single `select!` loop is the only writer of the board and the counter:
//! feed deliveries, session changes, and the recount timer all land on it
//! in arrival order, so reconciliation never races itself.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use auth_client::SessionEvent;
use change_feed::{FeedEvent, FeedSubscription};
use eventdesk_types::{ChangeOp, EventRequest, Role, UserId, UserProfile};
use record_client::TableQuery;
use request_board::{
    BoardOutcome, RequestBoard, UnreadCounter, MESSAGES_COLLECTION, REQUESTS_COLLECTION,
};
use route_guard::{authorize, AccessDecision, Route};

use crate::context::AppContext;

const REQUEST_COLUMNS: &str = "id,title,date,status";

/// The collection carrying identity rows; role edits arrive here.
const PROFILES_COLLECTION: &str = "users";

/// Cadence of the authoritative unread recount.
const RECOUNT_INTERVAL: Duration = Duration::from_secs(60);

/// How mounting a guarded view resolved.
pub enum MountOutcome {
    /// The session may see the view; the runtime is live.
    Mounted(Box<DashboardRuntime>),
    /// The session belongs elsewhere; the caller navigates.
    Redirected(Route),
}

/// Why the runtime stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// The session ended.
    SignedOut,
    /// A role change re-routed the view; the caller navigates.
    Redirected(Route),
    /// The feed channel closed underneath the runtime.
    FeedClosed,
}

/// The seed query for a role's dashboard.
///
/// Agencies work the open queue only. Clients and admins fetch everything
/// the backing store lets their token see (owner scoping is the store's
/// row filter, not ours).
fn seed_query(role: Role) -> TableQuery {
    match role {
        Role::Agency => TableQuery::new()
            .eq("status", "Open")
            .select(REQUEST_COLUMNS),
        Role::Client | Role::Admin => TableQuery::new().select(REQUEST_COLUMNS),
    }
}

/// The unread-count query for a role.
fn unread_query(role: Role) -> TableQuery {
    TableQuery::new()
        .eq("is_read", false)
        .eq("recipient_role", role)
}

/// Identity rows as the feed delivers them. The role stays a string
/// until parsed, so an unrecognized role can fail closed instead of
/// failing deserialization silently.
#[derive(Debug, serde::Deserialize)]
struct ProfileRow {
    id: UserId,
    name: String,
    email: String,
    role: String,
}

/// A mounted dashboard view: the board, the counter, and the
/// subscriptions that keep them live.
pub struct DashboardRuntime {
    ctx: Arc<AppContext>,
    role: Role,
    board: RequestBoard,
    unread: UnreadCounter,
    requests_sub: FeedSubscription,
    messages_sub: FeedSubscription,
    profiles_sub: FeedSubscription,
    session_rx: broadcast::Receiver<SessionEvent>,
    /// Set when reconnection gave up; cleared by the next resync.
    live_degraded: bool,
}

/// Authorizes and mounts a dashboard view for `required_role`.
pub async fn mount(ctx: Arc<AppContext>, required_role: Role) -> anyhow::Result<MountOutcome> {
    match authorize(&ctx.session.current(), required_role) {
        AccessDecision::Redirect(route) => {
            info!(required = %required_role, route = %route, "view not authorized, redirecting");
            return Ok(MountOutcome::Redirected(route));
        }
        AccessDecision::Allow => {}
    }

    let token = ctx.access_token()?;

    // Subscribe before seeding: the subscriptions start buffering
    // immediately, so nothing committed after the fetch is lost.
    let requests_sub = ctx.feed.subscribe(REQUESTS_COLLECTION).await;
    let messages_sub = ctx.feed.subscribe(MESSAGES_COLLECTION).await;
    let profiles_sub = ctx.feed.subscribe(PROFILES_COLLECTION).await;

    let rows: Vec<EventRequest> = ctx
        .records
        .select(REQUESTS_COLLECTION, &seed_query(required_role), &token)
        .await?;

    let mut board = RequestBoard::new();
    board.seed(rows);

    let mut unread = UnreadCounter::new(required_role);
    let count = ctx
        .records
        .count(MESSAGES_COLLECTION, &unread_query(required_role), &token)
        .await?;
    unread.recount(count);

    info!(
        role = %required_role,
        requests = board.len(),
        unread = unread.count(),
        "dashboard mounted"
    );

    Ok(MountOutcome::Mounted(Box::new(DashboardRuntime {
        session_rx: ctx.session.subscribe(),
        ctx,
        role: required_role,
        board,
        unread,
        requests_sub,
        messages_sub,
        profiles_sub,
        live_degraded: false,
    })))
}

impl DashboardRuntime {
    pub fn role(&self) -> Role {
        self.role
    }

    /// The rows the mounted role may display, in display order.
    pub fn visible(&self) -> Vec<EventRequest> {
        self.board.visible(self.role)
    }

    pub fn unread_count(&self) -> u64 {
        self.unread.count()
    }

    /// Runs the single-writer mutation loop until the session ends, the
    /// role is re-routed, or the feed closes.
    pub async fn run(mut self) -> RunExit {
        let mut recount_timer = interval(RECOUNT_INTERVAL);
        recount_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the mount already recounted.
        recount_timer.tick().await;

        let exit = loop {
            tokio::select! {
                event = self.requests_sub.recv() => {
                    let Some(event) = event else {
                        warn!("request feed subscription closed");
                        break RunExit::FeedClosed;
                    };
                    self.on_request_event(event).await;
                }
                event = self.messages_sub.recv() => {
                    let Some(event) = event else {
                        warn!("message feed subscription closed");
                        break RunExit::FeedClosed;
                    };
                    self.on_message_event(event).await;
                }
                event = self.profiles_sub.recv() => {
                    let Some(event) = event else {
                        warn!("profile feed subscription closed");
                        break RunExit::FeedClosed;
                    };
                    self.on_profile_event(event).await;
                }
                session_event = self.session_rx.recv() => {
                    match session_event {
                        Ok(event) => {
                            if let Some(exit) = self.on_session_event(event) {
                                break exit;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Missed notifications may include a role
                            // change; re-run the check directly.
                            warn!(skipped, "session events lagged, re-checking authorization");
                            if let AccessDecision::Redirect(route) =
                                authorize(&self.ctx.session.current(), self.role)
                            {
                                break RunExit::Redirected(route);
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            break RunExit::SignedOut;
                        }
                    }
                }
                _ = recount_timer.tick() => {
                    self.recount().await;
                }
            }
        };

        self.unmount();
        exit
    }

    async fn on_request_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Change(change) => match self.board.apply_change(&change) {
                BoardOutcome::Applied => {
                    debug!(op = %change.op, "request change applied");
                }
                BoardOutcome::Ignored => {}
                BoardOutcome::NeedsResync => {
                    warn!("request change could not be applied, reseeding");
                    self.reseed().await;
                }
            },
            FeedEvent::Resync => {
                info!("feed requested resync, reseeding board");
                self.live_degraded = false;
                self.reseed().await;
            }
            FeedEvent::Lost(reason) => self.mark_degraded(&reason),
        }
    }

    async fn on_message_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Change(change) => {
                let count = self.unread.apply_change(&change);
                debug!(count, "unread count adjusted");
            }
            FeedEvent::Resync => {
                self.recount().await;
            }
            FeedEvent::Lost(reason) => self.mark_degraded(&reason),
        }
    }

    /// Feeds identity-row changes into the session store so an admin's
    /// role reassignment re-routes this view while it is open.
    async fn on_profile_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Change(change)
                if matches!(change.op, ChangeOp::Insert | ChangeOp::Update) =>
            {
                let row: ProfileRow = match change.decode() {
                    Ok(row) => row,
                    Err(e) => {
                        warn!(error = %e, "undecodable profile row");
                        return;
                    }
                };

                match Role::parse(&row.role) {
                    Ok(role) => {
                        self.ctx.session.apply_profile_update(UserProfile {
                            id: row.id,
                            name: row.name,
                            email: row.email,
                            role,
                        });
                    }
                    Err(e) => {
                        let ours = self
                            .ctx
                            .session
                            .current()
                            .profile()
                            .map(|profile| profile.id)
                            == Some(row.id);
                        if ours {
                            // Fail closed: an unrecognizable role must not
                            // keep an authorized view alive.
                            error!(error = %e, "current session role is unrecognized, signing out");
                            self.ctx.session.sign_out();
                        } else {
                            warn!(error = %e, user = %row.id, "ignoring profile with unrecognized role");
                        }
                    }
                }
            }
            FeedEvent::Change(_) => {}
            FeedEvent::Resync => {
                // The channel may have dropped a role edit; re-resolve the
                // identity from the credential service.
                let Some(token) = self.ctx.session.access_token() else {
                    return;
                };
                match self.ctx.auth.current_user(&token).await {
                    Ok(signed_in) => {
                        self.ctx.session.apply_profile_update(signed_in.profile);
                    }
                    Err(e) => {
                        error!(error = %e, "identity re-resolution failed, signing out");
                        self.ctx.session.sign_out();
                    }
                }
            }
            FeedEvent::Lost(reason) => self.mark_degraded(&reason),
        }
    }

    /// Surfaces the "live updates unavailable" state once per outage.
    fn mark_degraded(&mut self, reason: &str) {
        if !self.live_degraded {
            warn!(reason = %reason, "live updates unavailable");
        }
        self.live_degraded = true;
    }

    /// Re-runs authorization on session changes. Returns the exit when
    /// the view must come down.
    fn on_session_event(&mut self, event: SessionEvent) -> Option<RunExit> {
        match event {
            SessionEvent::SignedOut => {
                info!("session ended, unmounting dashboard");
                Some(RunExit::SignedOut)
            }
            SessionEvent::RoleChanged(profile) => {
                match authorize(&self.ctx.session.current(), self.role) {
                    AccessDecision::Allow => None,
                    AccessDecision::Redirect(route) => {
                        info!(
                            role = %profile.role,
                            route = %route,
                            "role reassigned, re-routing open view"
                        );
                        Some(RunExit::Redirected(route))
                    }
                }
            }
            SessionEvent::SignedIn(_) => None,
        }
    }

    /// Full gap repair: one-shot fetch replaces the board, and the unread
    /// count is re-established.
    async fn reseed(&mut self) {
        let token = match self.ctx.session.access_token() {
            Some(token) => token,
            None => {
                warn!("cannot reseed without a session");
                return;
            }
        };

        match self
            .ctx
            .records
            .select::<EventRequest>(REQUESTS_COLLECTION, &seed_query(self.role), &token)
            .await
        {
            Ok(rows) => {
                self.board.seed(rows);
                info!(count = self.board.len(), "board reseeded");
            }
            Err(e) => {
                // Surfaced, not retried here; the next resync or recount
                // tick gets another chance.
                error!(error = %e, "reseed fetch failed");
            }
        }

        self.recount().await;
    }

    /// Authoritative unread recount; drift since the last one is
    /// discarded.
    async fn recount(&mut self) {
        let token = match self.ctx.session.access_token() {
            Some(token) => token,
            None => return,
        };

        match self
            .ctx
            .records
            .count(MESSAGES_COLLECTION, &unread_query(self.role), &token)
            .await
        {
            Ok(count) => self.unread.recount(count),
            Err(e) => {
                warn!(error = %e, "unread recount failed, keeping derived count");
            }
        }
    }

    /// Cancels the feed subscriptions. Forgetting this would leak the
    /// channel and deliver events into a store nothing observes.
    fn unmount(self) {
        self.requests_sub.cancel();
        self.messages_sub.cancel();
        self.profiles_sub.cancel();
        debug!("dashboard unmounted");
    }
}
