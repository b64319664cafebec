//! Event requests and their status state machine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for an event request, assigned by the record store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Error returned when a status string does not name a known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown request status: {0}")]
pub struct UnknownStatus(pub String);

/// Error returned for a transition the state machine forbids.
///
/// Terminal states (`Accepted`, `Rejected`) reject every transition; this
/// is reported to the caller, never silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: RequestStatus,
    pub to: RequestStatus,
}

/// Lifecycle status of an event request.
///
/// `Open -> {Reviewing, Accepted, Rejected}`, `Reviewing -> {Accepted,
/// Rejected}`. `Reviewing` is a valid intermediate state that no local
/// code path assigns; rows may arrive in it from the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Open,
    Reviewing,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::Reviewing => "Reviewing",
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
        }
    }

    /// Parses a wire status string. Fallible: status drives role-visible
    /// views, so an unknown status must not be defaulted away.
    pub fn parse(s: &str) -> Result<Self, UnknownStatus> {
        match s {
            "Open" => Ok(Self::Open),
            "Reviewing" => Ok(Self::Reviewing),
            "Accepted" => Ok(Self::Accepted),
            "Rejected" => Ok(Self::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }

    /// True for states with no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// Whether the state machine permits `self -> to`.
    pub fn can_transition_to(&self, to: RequestStatus) -> bool {
        match (self, to) {
            (Self::Open, Self::Reviewing | Self::Accepted | Self::Rejected) => true,
            (Self::Reviewing, Self::Accepted | Self::Rejected) => true,
            _ => false,
        }
    }

    /// Validates `self -> to`, returning the new state or the rejected
    /// transition.
    pub fn transition_to(self, to: RequestStatus) -> Result<RequestStatus, InvalidTransition> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A client's event planning ask and its current lifecycle status.
///
/// Created with status `Open`; never deleted by the dashboard itself
/// (deletes can still arrive over the feed and are honored).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    pub id: RequestId,
    pub title: String,
    pub date: NaiveDate,
    pub status: RequestStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: i64, status: RequestStatus) -> EventRequest {
        EventRequest {
            id: RequestId(id),
            title: format!("Request {}", id),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            status,
        }
    }

    #[test]
    fn open_transitions() {
        assert!(RequestStatus::Open.can_transition_to(RequestStatus::Reviewing));
        assert!(RequestStatus::Open.can_transition_to(RequestStatus::Accepted));
        assert!(RequestStatus::Open.can_transition_to(RequestStatus::Rejected));
        assert!(!RequestStatus::Open.can_transition_to(RequestStatus::Open));
    }

    #[test]
    fn reviewing_transitions() {
        assert!(RequestStatus::Reviewing.can_transition_to(RequestStatus::Accepted));
        assert!(RequestStatus::Reviewing.can_transition_to(RequestStatus::Rejected));
        assert!(!RequestStatus::Reviewing.can_transition_to(RequestStatus::Open));
    }

    #[test]
    fn terminal_states_reject_everything() {
        for terminal in [RequestStatus::Accepted, RequestStatus::Rejected] {
            assert!(terminal.is_terminal());
            for next in [
                RequestStatus::Open,
                RequestStatus::Reviewing,
                RequestStatus::Accepted,
                RequestStatus::Rejected,
            ] {
                let err = terminal.transition_to(next).unwrap_err();
                assert_eq!(err, InvalidTransition { from: terminal, to: next });
            }
        }
    }

    #[test]
    fn valid_paths_through_the_machine() {
        // Open -> Reviewing -> Accepted
        let s = RequestStatus::Open
            .transition_to(RequestStatus::Reviewing)
            .unwrap();
        assert_eq!(s.transition_to(RequestStatus::Accepted).unwrap(), RequestStatus::Accepted);

        // Open -> Rejected, without passing through Reviewing
        assert_eq!(
            RequestStatus::Open.transition_to(RequestStatus::Rejected).unwrap(),
            RequestStatus::Rejected
        );
    }

    #[test]
    fn status_parse_is_fallible() {
        assert_eq!(RequestStatus::parse("Open").unwrap(), RequestStatus::Open);
        assert!(RequestStatus::parse("open").is_err());
        assert!(RequestStatus::parse("Cancelled").is_err());
    }

    #[test]
    fn event_request_wire_shape() {
        let json = r#"{"id": 7, "title": "Wedding", "date": "2025-09-12", "status": "Open"}"#;
        let req: EventRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.id, RequestId(7));
        assert_eq!(req.date, NaiveDate::from_ymd_opt(2025, 9, 12).unwrap());
        assert_eq!(req.status, RequestStatus::Open);

        let back = serde_json::to_value(&req).unwrap();
        assert_eq!(back["status"], "Open");
        assert_eq!(back["date"], "2025-09-12");
    }

    #[test]
    fn request_equality_is_by_value() {
        assert_eq!(request(1, RequestStatus::Open), request(1, RequestStatus::Open));
        assert_ne!(request(1, RequestStatus::Open), request(1, RequestStatus::Accepted));
    }
}
