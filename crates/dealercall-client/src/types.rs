//! Wire types for the voice provider's REST API

use chrono::{DateTime, Utc};
use dealercall_core::{CallRecord, CallStatus, VariableValues};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /call`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCallRequest {
    pub assistant_id: String,
    pub phone_number_id: String,
    pub customer: Customer,
    pub assistant_overrides: AssistantOverrides,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// Who the provider should dial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// E.164 number
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Per-call assistant overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOverrides {
    pub variable_values: VariableValues,
    /// Where the provider pushes call events, when a webhook is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

// =============================================================================
// Responses
// =============================================================================

/// A call as returned by `POST /call` and `GET /call/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<CallStatus>,
    /// Provider note; a string or a list of strings
    #[serde(default)]
    pub message: Option<Value>,
    /// Either the dialled number or an object describing the caller line
    #[serde(default)]
    pub phone_number: Option<Value>,
    #[serde(default)]
    pub customer: Option<CustomerResponse>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerResponse {
    #[serde(default)]
    pub number: Option<String>,
}

impl From<CallResponse> for CallRecord {
    fn from(r: CallResponse) -> Self {
        let phone_number = r
            .phone_number
            .as_ref()
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| r.customer.and_then(|c| c.number));

        CallRecord {
            id: r.id,
            status: r.status.unwrap_or(CallStatus::Unknown),
            phone_number,
            duration_seconds: r.duration,
            cost_usd: r.cost,
            error_message: r.message.as_ref().and_then(message_text),
            started_at: r.started_at,
            ended_at: r.ended_at,
            ended_reason: r.ended_reason,
            transcript: r.transcript,
            recording_url: r.recording_url,
        }
    }
}

/// `GET /call` returns either a bare list or `{ "calls": [...] }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CallListResponse {
    List(Vec<CallResponse>),
    Wrapped { calls: Vec<CallResponse> },
}

impl CallListResponse {
    pub fn into_records(self) -> Vec<CallRecord> {
        let calls = match self {
            CallListResponse::List(calls) => calls,
            CallListResponse::Wrapped { calls } => calls,
        };
        calls.into_iter().map(CallRecord::from).collect()
    }
}

/// Text of a `message`-like field: a string, or a list of strings joined
fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

/// Pull the provider's error message out of an error body
///
/// Checks `message` first, then `error` (a string or `{ "message": .. }`).
pub fn provider_error_message(body: &Value) -> Option<String> {
    if let Some(msg) = body.get("message").and_then(message_text) {
        return Some(msg);
    }
    match body.get("error") {
        Some(Value::Object(obj)) => obj.get("message").and_then(message_text),
        Some(other) => message_text(other),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            provider_error_message(&json!({"error": "rate_limited"})).as_deref(),
            Some("rate_limited")
        );
        assert_eq!(
            provider_error_message(&json!({"message": "Bad number", "error": "Bad Request"}))
                .as_deref(),
            Some("Bad number")
        );
        assert_eq!(
            provider_error_message(&json!({"message": ["a must be set", "b must be set"]}))
                .as_deref(),
            Some("a must be set; b must be set")
        );
        assert_eq!(
            provider_error_message(&json!({"error": {"message": "nested"}})).as_deref(),
            Some("nested")
        );
        assert_eq!(provider_error_message(&json!({"message": ""})), None);
        assert_eq!(provider_error_message(&json!({})), None);
    }

    #[test]
    fn test_call_response_to_record() {
        let response: CallResponse = serde_json::from_value(json!({
            "id": "abc123",
            "status": "ended",
            "customer": {"number": "+15551234567"},
            "phoneNumber": {"id": "pn-1", "number": "+15550000000"},
            "duration": 42.5,
            "cost": 0.12,
            "endedReason": "customer-ended-call",
            "startedAt": "2024-05-01T12:00:00Z"
        }))
        .unwrap();

        let record = CallRecord::from(response);
        assert_eq!(record.status, CallStatus::Completed);
        assert_eq!(record.phone_number.as_deref(), Some("+15551234567"));
        assert_eq!(record.duration_seconds, Some(42.5));
        assert_eq!(record.cost_usd, Some(0.12));
        assert_eq!(record.ended_reason.as_deref(), Some("customer-ended-call"));
        assert!(record.started_at.is_some());
        assert_eq!(record.error_message, None);
    }

    #[test]
    fn test_call_response_minimal() {
        let response: CallResponse =
            serde_json::from_value(json!({"id": "abc123", "status": "queued"})).unwrap();
        assert_eq!(
            CallRecord::from(response),
            CallRecord::new("abc123", CallStatus::Queued)
        );

        let response: CallResponse = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert_eq!(CallRecord::from(response).status, CallStatus::Unknown);
    }

    #[test]
    fn test_call_list_shapes() {
        let bare: CallListResponse =
            serde_json::from_value(json!([{"id": "a", "status": "queued"}])).unwrap();
        assert_eq!(bare.into_records().len(), 1);

        let wrapped: CallListResponse = serde_json::from_value(
            json!({"calls": [{"id": "a"}, {"id": "b", "status": "failed"}]}),
        )
        .unwrap();
        let records = wrapped.into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].status, CallStatus::Failed);
    }
}
