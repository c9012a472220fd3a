//! Mock transport for testing
//!
//! Responses are scripted per operation and consumed in order; when a queue
//! is empty a default answer is used. Every call is counted so tests can
//! assert that preflight failures never reached the transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dealercall_core::{CallRecord, CallStatus, VoiceCallConfig};
use parking_lot::RwLock;

use super::{CallPayload, CallTransport};
use crate::error::TransportError;

type Scripted<T> = RwLock<VecDeque<Result<T, TransportError>>>;

/// In-memory transport with scripted responses
#[derive(Default)]
pub struct MockCallTransport {
    initiate_responses: Scripted<CallRecord>,
    status_responses: Scripted<CallRecord>,
    cancel_responses: Scripted<bool>,
    list_responses: Scripted<Vec<CallRecord>>,
    /// Payloads passed to `initiate`, in order
    payloads: RwLock<Vec<CallPayload>>,
    /// Customer ids passed to `list_calls`, in order
    history_queries: RwLock<Vec<String>>,
    initiate_calls: AtomicUsize,
    status_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    list_calls: AtomicUsize,
    delay: RwLock<Option<Duration>>,
}

impl MockCallTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next `initiate` result
    pub fn push_initiate(&self, result: Result<CallRecord, TransportError>) {
        self.initiate_responses.write().push_back(result);
    }

    /// Queue the next `fetch_status` result
    pub fn push_status(&self, result: Result<CallRecord, TransportError>) {
        self.status_responses.write().push_back(result);
    }

    /// Queue the next `cancel` result
    pub fn push_cancel(&self, result: Result<bool, TransportError>) {
        self.cancel_responses.write().push_back(result);
    }

    /// Queue the next `list_calls` result
    pub fn push_list(&self, result: Result<Vec<CallRecord>, TransportError>) {
        self.list_responses.write().push_back(result);
    }

    /// Delay every operation (to keep a request in flight)
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    pub fn initiate_count(&self) -> usize {
        self.initiate_calls.load(Ordering::SeqCst)
    }

    pub fn status_count(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_count(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Total transport calls of any kind
    pub fn total_count(&self) -> usize {
        self.initiate_count() + self.status_count() + self.cancel_count() + self.list_count()
    }

    /// Payloads seen by `initiate`
    pub fn payloads(&self) -> Vec<CallPayload> {
        self.payloads.read().clone()
    }

    /// Customer ids seen by `list_calls`
    pub fn history_queries(&self) -> Vec<String> {
        self.history_queries.read().clone()
    }

    async fn pause(&self) {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl CallTransport for MockCallTransport {
    async fn initiate(
        &self,
        _config: &VoiceCallConfig,
        payload: &CallPayload,
    ) -> Result<CallRecord, TransportError> {
        let n = self.initiate_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.payloads.write().push(payload.clone());
        self.pause().await;

        let scripted = self.initiate_responses.write().pop_front();
        scripted.unwrap_or_else(|| {
            let mut record = CallRecord::new(format!("mock-call-{}", n), CallStatus::Queued);
            record.phone_number = Some(payload.phone_number.clone());
            Ok(record)
        })
    }

    async fn fetch_status(
        &self,
        _config: &VoiceCallConfig,
        call_id: &str,
    ) -> Result<CallRecord, TransportError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        let scripted = self.status_responses.write().pop_front();
        scripted.unwrap_or_else(|| {
            Err(TransportError::Provider {
                status: 404,
                message: format!("Call {} not found", call_id),
            })
        })
    }

    async fn cancel(
        &self,
        _config: &VoiceCallConfig,
        _call_id: &str,
    ) -> Result<bool, TransportError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        let scripted = self.cancel_responses.write().pop_front();
        scripted.unwrap_or(Ok(true))
    }

    async fn list_calls(
        &self,
        _config: &VoiceCallConfig,
        customer_id: &str,
        _limit: usize,
    ) -> Result<Vec<CallRecord>, TransportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.history_queries.write().push(customer_id.to_string());
        self.pause().await;

        let scripted = self.list_responses.write().pop_front();
        scripted.unwrap_or_else(|| Ok(Vec::new()))
    }
}
