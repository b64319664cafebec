//! Normalized change-feed events.
//!
//! The feed client maps whatever the push channel delivers onto
//! [`ChangeEvent`]; consumers never see the wire representation.

use serde::{Deserialize, Serialize};

use crate::Role;

/// Normalized operation tag of a change event.
///
/// Unrecognized wire tags become `Unknown`. Consumers must treat `Unknown`
/// as a visible warning that forces a compensating full re-fetch of the
/// collection, never as a silent drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
    Unknown,
}

impl ChangeOp {
    /// Maps a raw wire operation tag onto the closed set.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized change notification for one row of one collection.
///
/// `record` holds the row as delivered; `old_record` holds the pre-image
/// when the channel provides one (updates and deletes). Both stay untyped
/// here because different collections decode into different row types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub op: ChangeOp,
    pub collection: String,
    pub record: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_record: Option<serde_json::Value>,
}

impl ChangeEvent {
    /// Decodes the row into a concrete record type.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.record.clone())
    }

    /// Decodes the pre-image, if the channel delivered one.
    pub fn decode_old<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Option<Result<T, serde_json::Error>> {
        self.old_record
            .as_ref()
            .map(|old| serde_json::from_value(old.clone()))
    }
}

/// A row of the `messages` table, as far as the unread counter needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub recipient_role: Role,
    pub is_read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventRequest, RequestId, RequestStatus};

    #[test]
    fn from_tag_known_operations() {
        assert_eq!(ChangeOp::from_tag("INSERT"), ChangeOp::Insert);
        assert_eq!(ChangeOp::from_tag("UPDATE"), ChangeOp::Update);
        assert_eq!(ChangeOp::from_tag("DELETE"), ChangeOp::Delete);
        // Wire casing varies between channel versions.
        assert_eq!(ChangeOp::from_tag("insert"), ChangeOp::Insert);
    }

    #[test]
    fn from_tag_unrecognized_becomes_unknown() {
        assert_eq!(ChangeOp::from_tag("TRUNCATE"), ChangeOp::Unknown);
        assert_eq!(ChangeOp::from_tag(""), ChangeOp::Unknown);
    }

    #[test]
    fn decode_event_request_record() {
        let event = ChangeEvent {
            op: ChangeOp::Insert,
            collection: "event_requests".to_string(),
            record: serde_json::json!({
                "id": 7, "title": "Gala", "date": "2025-10-01", "status": "Open"
            }),
            old_record: None,
        };

        let request: EventRequest = event.decode().unwrap();
        assert_eq!(request.id, RequestId(7));
        assert_eq!(request.status, RequestStatus::Open);
        assert!(event.decode_old::<EventRequest>().is_none());
    }

    #[test]
    fn decode_old_pre_image() {
        let event = ChangeEvent {
            op: ChangeOp::Update,
            collection: "messages".to_string(),
            record: serde_json::json!({"id": 3, "recipient_role": "agency", "is_read": true}),
            old_record: Some(serde_json::json!({
                "id": 3, "recipient_role": "agency", "is_read": false
            })),
        };

        let new: MessageRecord = event.decode().unwrap();
        let old: MessageRecord = event.decode_old().unwrap().unwrap();
        assert!(new.is_read);
        assert!(!old.is_read);
    }

    #[test]
    fn decode_malformed_record_is_an_error() {
        let event = ChangeEvent {
            op: ChangeOp::Insert,
            collection: "event_requests".to_string(),
            record: serde_json::json!({"id": "not-a-number"}),
            old_record: None,
        };
        assert!(event.decode::<EventRequest>().is_err());
    }
}
