//! The derived unread-message counter.
//!
//! A best-effort cache over `count(messages, is_read=false,
//! recipient_role=<role>)`: authoritative on every recount, adjusted
//! incrementally between recounts from message change events. Drift is
//! bounded by design (corrected at the next recount), not eliminated.

use eventdesk_types::{ChangeEvent, ChangeOp, MessageRecord, Role};

/// The collection the counter derives from.
pub const MESSAGES_COLLECTION: &str = "messages";

/// Unread-message count for one role.
#[derive(Debug, Clone)]
pub struct UnreadCounter {
    role: Role,
    count: u64,
}

impl UnreadCounter {
    pub fn new(role: Role) -> Self {
        Self { role, count: 0 }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Installs an authoritative full count.
    pub fn recount(&mut self, count: u64) {
        if self.count != count {
            tracing::debug!(role = %self.role, from = self.count, to = count, "unread recount");
        }
        self.count = count;
    }

    fn counts_as_unread(&self, record: &MessageRecord) -> bool {
        record.recipient_role == self.role && !record.is_read
    }

    /// Adjusts the count from a message change event and returns the new
    /// value.
    ///
    /// The adjustment is the difference between the row's unread-ness
    /// before and after the event. Updates without a pre-image adjust by
    /// nothing; the next recount corrects any drift that causes.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> u64 {
        if event.collection != MESSAGES_COLLECTION {
            return self.count;
        }

        let new_record = event.decode::<MessageRecord>().ok();
        let old_record = event.decode_old::<MessageRecord>().and_then(Result::ok);

        let (was_unread, is_unread) = match event.op {
            ChangeOp::Insert => (
                false,
                new_record.as_ref().map(|r| self.counts_as_unread(r)),
            ),
            ChangeOp::Update => match (&old_record, &new_record) {
                (Some(old), Some(new)) => (
                    self.counts_as_unread(old),
                    Some(self.counts_as_unread(new)),
                ),
                // No pre-image: the transition is unknowable, leave the
                // count alone until the next recount.
                _ => return self.count,
            },
            ChangeOp::Delete => {
                let old = old_record.or(new_record);
                (
                    old.as_ref().map(|r| self.counts_as_unread(r)).unwrap_or(false),
                    Some(false),
                )
            }
            ChangeOp::Unknown => {
                // The owner recounts as part of the forced re-fetch.
                tracing::warn!(role = %self.role, "unknown message operation, awaiting recount");
                return self.count;
            }
        };

        let Some(is_unread) = is_unread else {
            tracing::warn!(role = %self.role, "undecodable message row, awaiting recount");
            return self.count;
        };

        match (was_unread, is_unread) {
            (false, true) => self.count += 1,
            (true, false) => self.count = self.count.saturating_sub(1),
            _ => {}
        }

        self.count
    }
}
