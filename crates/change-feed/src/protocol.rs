//! Feed channel protocol messages and payload normalization.

use serde::{Deserialize, Serialize};

use eventdesk_types::{ChangeEvent, ChangeOp};

/// Feed channel message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedMessageType {
    // Connection
    Auth,
    AuthResult,
    Error,

    // Collection topics
    Join,
    Leave,
    Joined,
    Left,

    // Data
    Change,
    Heartbeat,
}

/// A message sent to/from the feed channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMessage {
    #[serde(rename = "type")]
    pub msg_type: FeedMessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
}

impl FeedMessage {
    /// Create a new feed message.
    pub fn new(msg_type: FeedMessageType) -> Self {
        Self {
            msg_type,
            collection: None,
            payload: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            error: None,
            success: None,
        }
    }

    /// Create an AUTH message carrying the access token.
    pub fn auth(access_token: &str) -> Self {
        Self {
            payload: Some(serde_json::json!({ "accessToken": access_token })),
            ..Self::new(FeedMessageType::Auth)
        }
    }

    /// Create a JOIN message for a collection topic.
    pub fn join(collection: &str) -> Self {
        Self {
            collection: Some(collection.to_string()),
            ..Self::new(FeedMessageType::Join)
        }
    }

    /// Create a LEAVE message for a collection topic.
    pub fn leave(collection: &str) -> Self {
        Self {
            collection: Some(collection.to_string()),
            ..Self::new(FeedMessageType::Leave)
        }
    }

    /// Create a HEARTBEAT message.
    pub fn heartbeat() -> Self {
        Self::new(FeedMessageType::Heartbeat)
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The raw change payload inside a CHANGE message, as the channel emits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChange {
    /// Wire operation tag (`INSERT`, `UPDATE`, `DELETE`, or anything a
    /// newer channel version might add).
    pub operation: String,
    #[serde(default)]
    pub record: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_record: Option<serde_json::Value>,
}

/// Maps a raw payload onto the normalized [`ChangeEvent`].
///
/// Unrecognized operation tags become [`ChangeOp::Unknown`] and are still
/// delivered; consumers react by re-fetching the collection rather than
/// guessing.
pub fn normalize(collection: &str, raw: RawChange) -> ChangeEvent {
    let op = ChangeOp::from_tag(&raw.operation);
    if op == ChangeOp::Unknown {
        tracing::warn!(
            collection,
            tag = %raw.operation,
            "unrecognized change operation, forcing resync downstream"
        );
    }
    ChangeEvent {
        op,
        collection: collection.to_string(),
        record: raw.record,
        old_record: raw.old_record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_message_shape() {
        let msg = FeedMessage::auth("token-123");
        let json = msg.to_json().unwrap();

        assert!(json.contains("\"type\":\"AUTH\""));
        assert!(json.contains("\"accessToken\":\"token-123\""));
    }

    #[test]
    fn join_message_shape() {
        let msg = FeedMessage::join("event_requests");
        let json = msg.to_json().unwrap();

        assert!(json.contains("\"type\":\"JOIN\""));
        assert!(json.contains("\"collection\":\"event_requests\""));
        assert!(msg.timestamp.is_some());
    }

    #[test]
    fn leave_message_shape() {
        let msg = FeedMessage::leave("messages");
        let json = msg.to_json().unwrap();

        assert!(json.contains("\"type\":\"LEAVE\""));
        assert!(json.contains("\"collection\":\"messages\""));
    }

    #[test]
    fn heartbeat_message_shape() {
        let json = FeedMessage::heartbeat().to_json().unwrap();
        assert!(json.contains("\"type\":\"HEARTBEAT\""));
    }

    #[test]
    fn deserialize_auth_result() {
        let json = r#"{"type":"AUTH_RESULT","success":true}"#;
        let msg = FeedMessage::from_json(json).unwrap();

        assert_eq!(msg.msg_type, FeedMessageType::AuthResult);
        assert_eq!(msg.success, Some(true));
    }

    #[test]
    fn deserialize_error_message() {
        let json = r#"{"type":"ERROR","error":"channel closed"}"#;
        let msg = FeedMessage::from_json(json).unwrap();

        assert_eq!(msg.msg_type, FeedMessageType::Error);
        assert_eq!(msg.error, Some("channel closed".to_string()));
    }

    #[test]
    fn change_message_round_trip() {
        let raw = RawChange {
            operation: "INSERT".to_string(),
            record: serde_json::json!({"id": 1}),
            old_record: None,
        };
        let msg = FeedMessage {
            collection: Some("event_requests".to_string()),
            payload: Some(serde_json::to_value(&raw).unwrap()),
            ..FeedMessage::new(FeedMessageType::Change)
        };

        let parsed = FeedMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed.msg_type, FeedMessageType::Change);
        let back: RawChange = serde_json::from_value(parsed.payload.unwrap()).unwrap();
        assert_eq!(back.operation, "INSERT");
    }

    #[test]
    fn normalize_known_operations() {
        let event = normalize(
            "event_requests",
            RawChange {
                operation: "UPDATE".to_string(),
                record: serde_json::json!({"id": 7}),
                old_record: Some(serde_json::json!({"id": 7})),
            },
        );
        assert_eq!(event.op, eventdesk_types::ChangeOp::Update);
        assert_eq!(event.collection, "event_requests");
        assert!(event.old_record.is_some());
    }

    #[test]
    fn normalize_unknown_tag_is_delivered_not_dropped() {
        let event = normalize(
            "event_requests",
            RawChange {
                operation: "TRUNCATE".to_string(),
                record: serde_json::Value::Null,
                old_record: None,
            },
        );
        assert_eq!(event.op, eventdesk_types::ChangeOp::Unknown);
    }
}
