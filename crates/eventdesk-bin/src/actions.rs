//! User-triggered mutations.
//!
//! Actions write to the record store and then wait for the feed's
//! resulting upsert; the board is never mutated optimistically, so a
//! rejected write can never leave a local guess disagreeing with the
//! authoritative state.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use eventdesk_types::{InvalidTransition, RequestId, RequestStatus, Role, UserId};
use record_client::{RecordError, TableQuery};
use request_board::{RequestBoard, REQUESTS_COLLECTION};

use crate::context::AppContext;

/// Errors from user-triggered mutations.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("unknown event request: {0}")]
    UnknownRequest(RequestId),

    /// The local state machine rejected the transition; nothing was sent
    /// to the store.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    /// The record store rejected the write.
    #[error(transparent)]
    Record(#[from] RecordError),
}

fn token(ctx: &AppContext) -> Result<String, ActionError> {
    ctx.session.access_token().ok_or(ActionError::NotSignedIn)
}

/// Creates a new event request. Status is always `Open` on creation; the
/// id is assigned by the record store and arrives over the feed.
pub async fn create_request(
    ctx: &AppContext,
    title: &str,
    date: NaiveDate,
) -> Result<(), ActionError> {
    let token = token(ctx)?;
    let row = serde_json::json!({
        "title": title,
        "date": date,
        "status": RequestStatus::Open,
    });
    ctx.records.insert(REQUESTS_COLLECTION, &row, &token).await?;
    info!(title, %date, "event request submitted");
    Ok(())
}

/// Moves a request to `next`, validating against the local state machine
/// first so terminal rows are rejected without a round trip. The board
/// updates when the store's upsert comes back over the feed.
pub async fn set_request_status(
    ctx: &AppContext,
    board: &RequestBoard,
    id: RequestId,
    next: RequestStatus,
) -> Result<(), ActionError> {
    let current = board.get(id).ok_or(ActionError::UnknownRequest(id))?;
    current.status.transition_to(next)?;

    let token = token(ctx)?;
    let patch = serde_json::json!({ "status": next });
    ctx.records
        .update(
            REQUESTS_COLLECTION,
            &TableQuery::new().eq("id", id),
            &patch,
            &token,
        )
        .await?;
    info!(%id, status = %next, "request status updated");
    Ok(())
}

/// Accepts an open or in-review request.
pub async fn accept_request(
    ctx: &AppContext,
    board: &RequestBoard,
    id: RequestId,
) -> Result<(), ActionError> {
    set_request_status(ctx, board, id, RequestStatus::Accepted).await
}

/// Rejects an open or in-review request.
pub async fn reject_request(
    ctx: &AppContext,
    board: &RequestBoard,
    id: RequestId,
) -> Result<(), ActionError> {
    set_request_status(ctx, board, id, RequestStatus::Rejected).await
}

/// Reassigns a user's role (admin operation). Open dashboards belonging
/// to that user re-authorize when the profile update reaches them.
pub async fn assign_role(ctx: &AppContext, user: UserId, role: Role) -> Result<(), ActionError> {
    let token = token(ctx)?;
    let patch = serde_json::json!({ "role": role });
    ctx.records
        .update("users", &TableQuery::new().eq("id", user), &patch, &token)
        .await?;
    info!(%user, %role, "user role reassigned");
    Ok(())
}
