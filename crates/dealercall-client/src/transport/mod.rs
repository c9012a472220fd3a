//! Call transport: the request/response exchange with the voice API
//!
//! Transports are stateless apart from their connection pool. The
//! configuration is passed to every call so one transport can serve any
//! number of controllers. Transports never retry; retry policy belongs to
//! the [`CallController`](crate::CallController).

mod http;
pub mod mock;

pub use http::HttpCallTransport;
pub use mock::MockCallTransport;

use async_trait::async_trait;
use dealercall_core::{phone, CallContext, CallRecord, VariableValues, VoiceCallConfig};
use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::types::{AssistantOverrides, Customer, InitiateCallRequest};

/// Everything the transport needs to place one call
#[derive(Debug, Clone, PartialEq)]
pub struct CallPayload {
    pub assistant_id: String,
    /// Number to dial, E.164
    pub phone_number: String,
    pub customer_name: Option<String>,
    pub variable_values: VariableValues,
    pub metadata: Map<String, Value>,
}

impl CallPayload {
    /// Build a payload from a call context
    pub fn from_context(context: &CallContext, assistant_id: impl Into<String>) -> Self {
        let name = &context.customer_name;

        Self {
            assistant_id: assistant_id.into(),
            phone_number: phone::to_e164(&context.phone_number),
            customer_name: (!name.is_empty()).then(|| name.clone()),
            variable_values: context.variable_values(),
            metadata: context.metadata_payload(),
        }
    }

    /// Request body for `POST /call`
    pub fn to_request(&self, config: &VoiceCallConfig) -> InitiateCallRequest {
        InitiateCallRequest {
            assistant_id: self.assistant_id.clone(),
            phone_number_id: config.phone_number_id.clone(),
            customer: Customer {
                number: self.phone_number.clone(),
                name: self.customer_name.clone(),
            },
            assistant_overrides: AssistantOverrides {
                variable_values: self.variable_values.clone(),
                server_url: config.webhook_url.clone(),
            },
            metadata: self.metadata.clone(),
        }
    }
}

/// Request/response exchange with the remote voice API
#[async_trait]
pub trait CallTransport: Send + Sync {
    /// Place an outbound call (`POST {base}/call`)
    async fn initiate(
        &self,
        config: &VoiceCallConfig,
        payload: &CallPayload,
    ) -> Result<CallRecord, TransportError>;

    /// Fetch the current state of a call (`GET {base}/call/{id}`)
    async fn fetch_status(
        &self,
        config: &VoiceCallConfig,
        call_id: &str,
    ) -> Result<CallRecord, TransportError>;

    /// Ask the provider to stop a call
    ///
    /// `Ok(true)` only on a confirmed success. Failures are errors, never
    /// `Ok(false)`; after an error the remote call may or may not have
    /// stopped.
    async fn cancel(&self, config: &VoiceCallConfig, call_id: &str)
        -> Result<bool, TransportError>;

    /// One customer's most recent calls, newest first
    /// (`GET {base}/call?customerId=ID&limit=N`)
    async fn list_calls(
        &self,
        config: &VoiceCallConfig,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<CallRecord>, TransportError>;
}
