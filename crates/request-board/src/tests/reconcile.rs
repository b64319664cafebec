//! Seeding, reconciliation, ordering, and resync outcomes.

use std::collections::HashSet;

use eventdesk_types::{ChangeEvent, ChangeOp, RequestId, RequestStatus, Role};

use crate::board::{BoardOutcome, RequestBoard};
use crate::live::BoardSignal;

use super::{request, request_change, request_json};

#[test]
fn seed_replaces_wholesale() {
    let mut board = RequestBoard::new();
    board.seed(vec![
        request(10, RequestStatus::Open),
        request(11, RequestStatus::Reviewing),
        request(12, RequestStatus::Accepted),
    ]);
    assert_eq!(board.len(), 3);

    // Reseed after a channel gap: prior contents are irrelevant.
    board.seed(vec![request(1, RequestStatus::Open), request(2, RequestStatus::Open)]);

    let ids: Vec<RequestId> = board.snapshot().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![RequestId(1), RequestId(2)]);
}

#[test]
fn seed_deduplicates_by_id() {
    let mut board = RequestBoard::new();
    board.seed(vec![
        request(1, RequestStatus::Open),
        request(1, RequestStatus::Accepted),
        request(2, RequestStatus::Open),
    ]);

    assert_eq!(board.len(), 2);
    assert_eq!(board.get(RequestId(1)).unwrap().status, RequestStatus::Open);
}

#[test]
fn no_duplicate_ids_under_arbitrary_sequences() {
    let mut board = RequestBoard::new();
    board.seed((0..10).map(|i| request(i, RequestStatus::Open)).collect());

    for i in 0..50i64 {
        let id = i % 15;
        if i % 7 == 0 {
            board.apply_delete(RequestId(id));
        } else {
            board.apply_upsert(request(id, RequestStatus::Open));
        }
    }

    let ids: Vec<RequestId> = board.snapshot().iter().map(|r| r.id).collect();
    let unique: HashSet<RequestId> = ids.iter().copied().collect();
    assert_eq!(ids.len(), unique.len());
}

#[test]
fn upsert_is_idempotent() {
    let mut board = RequestBoard::new();
    board.seed(vec![request(1, RequestStatus::Open)]);

    board.apply_upsert(request(2, RequestStatus::Open));
    let once = board.snapshot();

    board.apply_upsert(request(2, RequestStatus::Open));
    let twice = board.snapshot();

    assert_eq!(once, twice);
}

#[test]
fn upsert_moves_row_to_front() {
    let mut board = RequestBoard::new();
    board.seed(vec![
        request(1, RequestStatus::Open),
        request(2, RequestStatus::Open),
        request(3, RequestStatus::Open),
    ]);

    // Most-recently-changed-first: touching id 3 promotes it.
    board.apply_upsert(request(3, RequestStatus::Reviewing));

    let ids: Vec<RequestId> = board.snapshot().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![RequestId(3), RequestId(1), RequestId(2)]);
}

#[test]
fn last_writer_wins_per_id() {
    let mut board = RequestBoard::new();

    board.apply_upsert(request(5, RequestStatus::Open));
    board.apply_upsert(request(5, RequestStatus::Accepted));

    assert_eq!(board.len(), 1);
    assert_eq!(board.get(RequestId(5)).unwrap().status, RequestStatus::Accepted);
}

#[test]
fn concurrent_updates_to_different_ids_keep_arrival_order() {
    let mut board = RequestBoard::new();

    board.apply_upsert(request(1, RequestStatus::Open));
    board.apply_upsert(request(2, RequestStatus::Open));
    board.apply_upsert(request(1, RequestStatus::Reviewing));

    let ids: Vec<RequestId> = board.snapshot().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![RequestId(1), RequestId(2)]);
}

#[test]
fn delete_of_unknown_id_is_a_no_op() {
    let mut board = RequestBoard::new();
    board.seed(vec![request(1, RequestStatus::Open)]);

    assert!(!board.apply_delete(RequestId(99)));
    assert_eq!(board.len(), 1);
}

#[test]
fn insert_then_update_scenario() {
    // Feed delivers insert(id 7, Open) then update(id 7, Accepted): the
    // board ends with one entry, Accepted, invisible to the agency view.
    let mut board = RequestBoard::new();
    board.seed(vec![]);

    let insert = request_change(ChangeOp::Insert, request_json(7, RequestStatus::Open));
    assert_eq!(board.apply_change(&insert), BoardOutcome::Applied);
    assert_eq!(board.visible(Role::Agency).len(), 1);

    let update = request_change(ChangeOp::Update, request_json(7, RequestStatus::Accepted));
    assert_eq!(board.apply_change(&update), BoardOutcome::Applied);

    assert_eq!(board.len(), 1);
    assert_eq!(board.get(RequestId(7)).unwrap().status, RequestStatus::Accepted);
    assert!(board.visible(Role::Agency).is_empty());
    assert_eq!(board.visible(Role::Admin).len(), 1);
}

#[test]
fn reseed_after_channel_error_scenario() {
    let mut board = RequestBoard::new();
    board.seed(vec![
        request(5, RequestStatus::Open),
        request(6, RequestStatus::Reviewing),
        request(7, RequestStatus::Accepted),
    ]);

    // The channel dropped; the client resubscribed and reseeded.
    board.seed(vec![request(1, RequestStatus::Open), request(2, RequestStatus::Open)]);

    let ids: HashSet<RequestId> = board.snapshot().iter().map(|r| r.id).collect();
    assert_eq!(ids, HashSet::from([RequestId(1), RequestId(2)]));
}

#[test]
fn agency_view_is_open_only() {
    let mut board = RequestBoard::new();
    board.seed(vec![
        request(1, RequestStatus::Open),
        request(2, RequestStatus::Reviewing),
        request(3, RequestStatus::Accepted),
        request(4, RequestStatus::Rejected),
        request(5, RequestStatus::Open),
    ]);

    let visible = board.visible(Role::Agency);
    let ids: Vec<RequestId> = visible.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![RequestId(1), RequestId(5)]);

    assert_eq!(board.visible(Role::Admin).len(), 5);
    assert_eq!(board.visible(Role::Client).len(), 5);
}

#[test]
fn delete_event_uses_pre_image_key() {
    let mut board = RequestBoard::new();
    board.seed(vec![request(3, RequestStatus::Open)]);

    let event = ChangeEvent {
        op: ChangeOp::Delete,
        collection: "event_requests".to_string(),
        record: serde_json::Value::Null,
        old_record: Some(serde_json::json!({ "id": 3 })),
    };

    assert_eq!(board.apply_change(&event), BoardOutcome::Applied);
    assert!(board.is_empty());
}

#[test]
fn unknown_operation_demands_resync() {
    let mut board = RequestBoard::new();
    board.seed(vec![request(1, RequestStatus::Open)]);

    let event = request_change(ChangeOp::Unknown, serde_json::Value::Null);
    assert_eq!(board.apply_change(&event), BoardOutcome::NeedsResync);

    // The board itself is untouched; the owner reseeds.
    assert_eq!(board.len(), 1);
}

#[test]
fn undecodable_row_demands_resync() {
    let mut board = RequestBoard::new();

    let event = request_change(
        ChangeOp::Insert,
        serde_json::json!({ "id": "seven", "title": 3 }),
    );
    assert_eq!(board.apply_change(&event), BoardOutcome::NeedsResync);
    assert!(board.is_empty());
}

#[test]
fn foreign_collection_events_are_ignored() {
    let mut board = RequestBoard::new();

    let event = ChangeEvent {
        op: ChangeOp::Insert,
        collection: "messages".to_string(),
        record: serde_json::json!({ "id": 1 }),
        old_record: None,
    };
    assert_eq!(board.apply_change(&event), BoardOutcome::Ignored);
    assert!(board.is_empty());
}

#[test]
fn observers_see_mutations_in_order() {
    let mut board = RequestBoard::new();
    let sub = board.subscribe();

    board.seed(vec![request(1, RequestStatus::Open)]);
    board.apply_upsert(request(2, RequestStatus::Open));
    board.apply_delete(RequestId(1));

    assert_eq!(sub.try_recv(), Some(BoardSignal::Seeded { count: 1 }));
    assert_eq!(
        sub.try_recv(),
        Some(BoardSignal::Upserted(request(2, RequestStatus::Open)))
    );
    assert_eq!(sub.try_recv(), Some(BoardSignal::Deleted(RequestId(1))));
    assert_eq!(sub.try_recv(), None);
}

#[test]
fn silent_delete_does_not_signal() {
    let mut board = RequestBoard::new();
    board.seed(vec![]);
    let sub = board.subscribe();

    board.apply_delete(RequestId(42));
    assert_eq!(sub.try_recv(), None);
}
