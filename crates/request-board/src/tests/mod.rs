//! Integration tests for the request board.
//!
//! Organization:
//!
//! - `reconcile.rs` - seeding, upsert/delete reconciliation, dedup,
//!   ordering, last-writer-wins, resync outcomes
//! - `unread.rs`    - unread counter recounts and incremental adjustments

mod reconcile;

use chrono::NaiveDate;
use eventdesk_types::{ChangeEvent, ChangeOp, EventRequest, RequestId, RequestStatus};

pub(crate) fn request(id: i64, status: RequestStatus) -> EventRequest {
    EventRequest {
        id: RequestId(id),
        title: format!("Request {}", id),
        date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        status,
    }
}

pub(crate) fn request_change(op: ChangeOp, record: serde_json::Value) -> ChangeEvent {
    ChangeEvent {
        op,
        collection: "event_requests".to_string(),
        record,
        old_record: None,
    }
}

pub(crate) fn request_json(id: i64, status: RequestStatus) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": format!("Request {}", id),
        "date": "2025-06-01",
        "status": status.as_str(),
    })
}
