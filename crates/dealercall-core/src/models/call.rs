//! Call record and lifecycle states

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status string reported by the voice provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Ringing,
    InProgress,
    Forwarding,
    #[serde(alias = "ended")]
    Completed,
    Failed,
    #[serde(alias = "canceled")]
    Cancelled,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Queued => "queued",
            CallStatus::Ringing => "ringing",
            CallStatus::InProgress => "in-progress",
            CallStatus::Forwarding => "forwarding",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::Cancelled => "cancelled",
            CallStatus::Unknown => "unknown",
        }
    }

    /// Whether the provider will report no further transitions
    pub fn is_terminal(&self) -> bool {
        CallState::from(*self).is_terminal()
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller-level lifecycle state
///
/// ```text
/// Idle -> Calling -> {Queued, Ringing, InProgress} -> {Completed, Failed, Cancelled}
/// ```
///
/// `Calling` only means an initiate request is in flight; it says nothing
/// about the phone call itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallState {
    Idle,
    Calling,
    Queued,
    Ringing,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallState::Completed | CallState::Failed | CallState::Cancelled
        )
    }

    /// A remote call exists and may still change state
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            CallState::Queued | CallState::Ringing | CallState::InProgress
        )
    }
}

impl From<CallStatus> for CallState {
    fn from(status: CallStatus) -> Self {
        match status {
            CallStatus::Queued => CallState::Queued,
            CallStatus::Ringing => CallState::Ringing,
            CallStatus::InProgress | CallStatus::Forwarding | CallStatus::Unknown => {
                CallState::InProgress
            }
            CallStatus::Completed => CallState::Completed,
            CallStatus::Failed => CallState::Failed,
            CallStatus::Cancelled => CallState::Cancelled,
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallState::Idle => "idle",
            CallState::Calling => "calling",
            CallState::Queued => "queued",
            CallState::Ringing => "ringing",
            CallState::InProgress => "in_progress",
            CallState::Completed => "completed",
            CallState::Failed => "failed",
            CallState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One outbound call as last reported by the provider
///
/// Every status refresh replaces the whole record; nothing is merged from
/// an earlier snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    /// Opaque provider-assigned id
    pub id: String,
    pub status: CallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    /// Provider message attached to the call (usually on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
}

impl CallRecord {
    /// A bare record with only id and status
    pub fn new(id: impl Into<String>, status: CallStatus) -> Self {
        Self {
            id: id.into(),
            status,
            phone_number: None,
            duration_seconds: None,
            cost_usd: None,
            error_message: None,
            started_at: None,
            ended_at: None,
            ended_reason: None,
            transcript: None,
            recording_url: None,
        }
    }

    pub fn state(&self) -> CallState {
        self.status.into()
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let parse = |s: &str| serde_json::from_value::<CallStatus>(serde_json::json!(s)).unwrap();

        assert_eq!(parse("queued"), CallStatus::Queued);
        assert_eq!(parse("in-progress"), CallStatus::InProgress);
        assert_eq!(parse("ended"), CallStatus::Completed);
        assert_eq!(parse("canceled"), CallStatus::Cancelled);
        assert_eq!(parse("scheduled"), CallStatus::Unknown);

        assert_eq!(
            serde_json::to_value(CallStatus::InProgress).unwrap(),
            serde_json::json!("in-progress")
        );
    }

    #[test]
    fn test_state_mapping() {
        assert_eq!(CallState::from(CallStatus::Forwarding), CallState::InProgress);
        assert_eq!(CallState::from(CallStatus::Unknown), CallState::InProgress);
        assert!(CallStatus::Completed.is_terminal());
        assert!(CallStatus::Failed.is_terminal());
        assert!(CallStatus::Cancelled.is_terminal());
        assert!(!CallStatus::Ringing.is_terminal());
        assert!(!CallState::Calling.is_active());
        assert!(CallState::Ringing.is_active());
    }

    #[test]
    fn test_record_json_omits_absent_fields() {
        let record = CallRecord::new("abc123", CallStatus::Queued);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({"id": "abc123", "status": "queued"}));
    }
}
