//! The reconciling list store for event requests.

use serde::Deserialize;

use eventdesk_types::{ChangeEvent, ChangeOp, EventRequest, RequestId, Role};

use crate::live::{BoardHub, BoardSignal, BoardSubscription};

/// The collection this board reconciles.
pub const REQUESTS_COLLECTION: &str = "event_requests";

/// What applying a feed event did to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardOutcome {
    /// The event mutated (or validly no-op'd against) the board.
    Applied,
    /// The event was not for this board's collection.
    Ignored,
    /// The event could not be applied safely; the owner must reseed the
    /// board from a one-shot fetch before trusting it again.
    NeedsResync,
}

/// Minimal row shape for delete events, which may omit everything but the
/// key.
#[derive(Debug, Deserialize)]
struct RowKey {
    id: RequestId,
}

/// An ordered, deduplicated collection of event requests.
///
/// Display order is most-recently-changed-first: every upsert moves its
/// row to the front. Conflicts resolve last-writer-wins by arrival order,
/// which the feed guarantees matches the store's commit order per id.
pub struct RequestBoard {
    entries: Vec<EventRequest>,
    live: BoardHub,
}

impl RequestBoard {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            live: BoardHub::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: RequestId) -> Option<&EventRequest> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// A copy of the held rows in display order.
    pub fn snapshot(&self) -> Vec<EventRequest> {
        self.entries.clone()
    }

    /// The rows a role's dashboard may display.
    ///
    /// Agencies work a queue of open requests only; admins see everything.
    /// Clients also see everything held, because the seed query already
    /// scoped the store to rows they own.
    pub fn visible(&self, role: Role) -> Vec<EventRequest> {
        match role {
            Role::Agency => self
                .entries
                .iter()
                .filter(|entry| entry.status == eventdesk_types::RequestStatus::Open)
                .cloned()
                .collect(),
            Role::Client | Role::Admin => self.entries.clone(),
        }
    }

    /// Observe board mutations.
    pub fn subscribe(&self) -> BoardSubscription {
        self.live.subscribe()
    }

    /// Replaces the collection wholesale.
    ///
    /// Used on initial load and on feed-gap repair; whatever the board
    /// held before is discarded. Duplicate ids in the input keep their
    /// first occurrence.
    pub fn seed(&mut self, entities: Vec<EventRequest>) {
        let mut seen = std::collections::HashSet::new();
        self.entries = entities
            .into_iter()
            .filter(|entry| seen.insert(entry.id))
            .collect();

        tracing::debug!(count = self.entries.len(), "board seeded");
        self.live.notify(BoardSignal::Seeded {
            count: self.entries.len(),
        });
    }

    /// Inserts or replaces by id and moves the row to the front.
    pub fn apply_upsert(&mut self, entity: EventRequest) {
        self.entries.retain(|entry| entry.id != entity.id);
        self.entries.insert(0, entity.clone());
        self.live.notify(BoardSignal::Upserted(entity));
    }

    /// Removes by id if present.
    ///
    /// Unknown ids are a no-op, not an error: the row may have been
    /// filtered out by the role's visibility predicate before it ever
    /// entered the board.
    pub fn apply_delete(&mut self, id: RequestId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        let removed = self.entries.len() != before;
        if removed {
            self.live.notify(BoardSignal::Deleted(id));
        }
        removed
    }

    /// Applies a normalized feed event.
    ///
    /// `Unknown` operations and undecodable rows return
    /// [`BoardOutcome::NeedsResync`]; the board is left untouched and the
    /// owner re-fetches the collection.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> BoardOutcome {
        if event.collection != REQUESTS_COLLECTION {
            return BoardOutcome::Ignored;
        }

        match event.op {
            ChangeOp::Insert | ChangeOp::Update => match event.decode::<EventRequest>() {
                Ok(entity) => {
                    self.apply_upsert(entity);
                    BoardOutcome::Applied
                }
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable event request row, resync needed");
                    BoardOutcome::NeedsResync
                }
            },
            ChangeOp::Delete => {
                let key = event
                    .decode_old::<RowKey>()
                    .unwrap_or_else(|| event.decode::<RowKey>());
                match key {
                    Ok(RowKey { id }) => {
                        self.apply_delete(id);
                        BoardOutcome::Applied
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "delete event without a row key, resync needed");
                        BoardOutcome::NeedsResync
                    }
                }
            }
            ChangeOp::Unknown => {
                tracing::warn!(
                    collection = %event.collection,
                    "unknown change operation reached the board, resync needed"
                );
                BoardOutcome::NeedsResync
            }
        }
    }
}

impl Default for RequestBoard {
    fn default() -> Self {
        Self::new()
    }
}
