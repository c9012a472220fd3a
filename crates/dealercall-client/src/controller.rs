//! Call lifecycle controller
//!
//! Owns at most one [`CallRecord`] at a time and drives it through
//!
//! ```text
//! Idle -> Calling -> {Queued, Ringing, InProgress} -> {Completed, Failed, Cancelled}
//! ```
//!
//! The controller never polls on its own. Status is learned only when the
//! caller asks for it ([`refresh_status`](CallController::refresh_status)).

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dealercall_core::{
    phone, CallContext, CallRecord, CallState, ConfigStatus, FinancingOption, User, Vehicle,
    VoiceCallConfig,
};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::{CallError, Result, TransportError};
use crate::transport::{CallPayload, CallTransport, HttpCallTransport};

/// Per-call options for [`CallController::initiate`]
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Assistant for this call only; falls back to the configured one
    pub assistant_id: Option<String>,
    /// Overrides the vehicle's own financing option
    pub financing: Option<FinancingOption>,
    /// Free-form metadata forwarded to the provider
    pub metadata: Map<String, Value>,
    /// History key for this call; defaults to the user's `first_last`
    pub customer_id: Option<String>,
}

impl CallOptions {
    pub fn with_assistant(mut self, assistant_id: impl Into<String>) -> Self {
        self.assistant_id = Some(assistant_id.into());
        self
    }

    pub fn with_financing(mut self, financing: FinancingOption) -> Self {
        self.financing = Some(financing);
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    record: Option<CallRecord>,
    error: Option<CallError>,
}

/// Marks an initiate attempt as in flight; clears the mark on drop
///
/// Only clears the slot if it still holds this attempt's token, so a
/// successful cancel (which clears the slot itself) is not undone.
struct InFlight<'a> {
    slot: &'a AtomicU64,
    token: u64,
}

impl<'a> InFlight<'a> {
    fn acquire(slot: &'a AtomicU64, token: u64) -> Option<Self> {
        slot.compare_exchange(0, token, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { slot, token })
    }

    fn is_current(&self) -> bool {
        self.slot.load(Ordering::SeqCst) == self.token
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let _ = self
            .slot
            .compare_exchange(self.token, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

/// Stateful orchestrator for one shopper's outbound calls
///
/// Safe to share across tasks (`Arc<CallController>`), but only one
/// `initiate` may be outstanding at a time; a second one fails with
/// [`CallError::AlreadyCalling`].
pub struct CallController {
    config: VoiceCallConfig,
    transport: Arc<dyn CallTransport>,
    state: RwLock<ControllerState>,
    /// Token of the in-flight initiate attempt, 0 when none
    in_flight: AtomicU64,
    next_token: AtomicU64,
}

impl CallController {
    /// Create a controller with an explicit transport
    pub fn new(config: VoiceCallConfig, transport: Arc<dyn CallTransport>) -> Self {
        Self {
            config,
            transport,
            state: RwLock::new(ControllerState::default()),
            in_flight: AtomicU64::new(0),
            next_token: AtomicU64::new(1),
        }
    }

    /// Create a controller talking HTTP to the configured provider
    pub fn http(config: VoiceCallConfig) -> std::result::Result<Self, TransportError> {
        let transport = HttpCallTransport::new()?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &VoiceCallConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn config_status(&self) -> ConfigStatus {
        self.config.status()
    }

    /// Whether an initiate request is in flight
    ///
    /// This tracks the HTTP request only, not the phone call.
    pub fn is_calling(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) != 0
    }

    /// Snapshot of the tracked call, if any
    pub fn record(&self) -> Option<CallRecord> {
        self.state.read().record.clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> CallState {
        if self.is_calling() {
            return CallState::Calling;
        }
        self.state
            .read()
            .record
            .as_ref()
            .map(CallRecord::state)
            .unwrap_or(CallState::Idle)
    }

    /// Last error, until cleared or superseded by a new `initiate`
    pub fn error(&self) -> Option<CallError> {
        self.state.read().error.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.state.read().error.as_ref().map(ToString::to_string)
    }

    /// Reset the error slot; safe to call at any time
    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    fn fail<T>(&self, err: CallError) -> Result<T> {
        self.state.write().error = Some(err.clone());
        Err(err)
    }

    fn ensure_configured(&self) -> Result<()> {
        let errors = self.config.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            self.fail(CallError::NotConfigured(errors))
        }
    }

    /// Place a call to `user` about `vehicle`
    ///
    /// Preflight runs before any network request: configuration first, then
    /// the user's phone number. On success the returned record replaces any
    /// previously tracked call.
    #[instrument(skip_all, fields(make = %vehicle.make, model = %vehicle.model))]
    pub async fn initiate(
        &self,
        user: &User,
        vehicle: &Vehicle,
        options: CallOptions,
    ) -> Result<CallRecord> {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        let Some(guard) = InFlight::acquire(&self.in_flight, token) else {
            warn!("Rejected initiate: another call is already being placed");
            return Err(CallError::AlreadyCalling);
        };

        self.clear_error();

        let errors = self.config.validate();
        if !errors.is_empty() {
            return self.fail(CallError::Configuration(errors));
        }

        let Some(raw_phone) = user.phone() else {
            return self.fail(CallError::MissingPhone);
        };
        if !phone::validate(raw_phone) {
            return self.fail(CallError::InvalidPhone(raw_phone.to_string()));
        }

        // Preflight passed: the previous call is no longer ours to track
        self.state.write().record = None;

        let assistant_id = options
            .assistant_id
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .or_else(|| self.config.assistant_id())
            .unwrap_or_default()
            .to_string();

        let mut context = CallContext::build(user, vehicle, options.financing, options.metadata);
        if let Some(customer_id) = options.customer_id {
            context = context.with_customer_id(customer_id);
        }
        let payload = CallPayload::from_context(&context, assistant_id);

        info!(
            phone = %phone::format(raw_phone),
            "Initiating call"
        );

        let result = self
            .with_retry(
                "initiate",
                false,
                || guard.is_current(),
                || self.transport.initiate(&self.config, &payload),
            )
            .await;

        match result {
            Ok(record) => {
                if guard.is_current() {
                    self.state.write().record = Some(record.clone());
                } else {
                    warn!(call_id = %record.id, "Call was cancelled while being placed; not tracking it");
                }
                info!(call_id = %record.id, status = %record.status, "Call initiated");
                Ok(record)
            }
            Err(e) if !guard.is_current() => {
                info!(error = %e, "Call was cancelled while being placed; stopped retrying");
                Err(CallError::CancelledWhilePlacing)
            }
            Err(e) => {
                warn!(error = %e, "Call initiation failed");
                self.fail(CallError::Transport(e))
            }
        }
    }

    /// Fetch the latest state of a call and make it the tracked record
    ///
    /// The tracked record is replaced wholesale; on failure it is left as
    /// it was.
    #[instrument(skip(self))]
    pub async fn refresh_status(&self, call_id: &str) -> Result<CallRecord> {
        self.ensure_configured()?;

        match self.fetch_and_store(call_id).await {
            Ok(record) => Ok(record),
            Err(e) => {
                warn!(error = %e, "Status refresh failed");
                self.fail(CallError::Transport(e))
            }
        }
    }

    /// Refresh the tracked call, ignoring failures
    ///
    /// Meant for background/UI refresh loops: errors are logged and never
    /// reach the error slot. Returns the new record when the refresh
    /// succeeded.
    #[instrument(skip_all)]
    pub async fn refresh_current(&self) -> Option<CallRecord> {
        let call_id = self.state.read().record.as_ref().map(|r| r.id.clone())?;
        if !self.config.is_configured() {
            return None;
        }

        match self.fetch_and_store(&call_id).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "Failed to refresh call status");
                None
            }
        }
    }

    async fn fetch_and_store(&self, call_id: &str) -> std::result::Result<CallRecord, TransportError> {
        let record = self
            .with_retry("fetch_status", true, || true, || {
                self.transport.fetch_status(&self.config, call_id)
            })
            .await?;

        debug!(call_id = %record.id, status = %record.status, "Call status refreshed");
        self.state.write().record = Some(record.clone());
        Ok(record)
    }

    /// Ask the provider to stop a call
    ///
    /// On confirmed success the tracked record and the in-flight flag are
    /// cleared. On failure nothing changes: the call may still be live.
    #[instrument(skip(self))]
    pub async fn cancel(&self, call_id: &str) -> Result<bool> {
        self.ensure_configured()?;

        let result = self
            .with_retry("cancel", false, || true, || {
                self.transport.cancel(&self.config, call_id)
            })
            .await;

        match result {
            Ok(true) => {
                self.state.write().record = None;
                self.in_flight.store(0, Ordering::SeqCst);
                info!("Call cancelled");
                Ok(true)
            }
            Ok(false) => {
                warn!("Provider did not confirm cancellation");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "Cancellation failed");
                self.fail(CallError::Cancellation(e))
            }
        }
    }

    /// Most recent calls placed for one customer id
    ///
    /// Does not touch the tracked record or the error slot.
    #[instrument(skip(self))]
    pub async fn call_history(&self, customer_id: &str, limit: usize) -> Result<Vec<CallRecord>> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            return Err(CallError::NotConfigured(errors));
        }

        let calls = self
            .with_retry("list_calls", true, || true, || {
                self.transport.list_calls(&self.config, customer_id, limit)
            })
            .await?;
        Ok(calls)
    }

    /// Refresh a call every `interval` until it reaches a terminal state
    ///
    /// Still caller-driven: the loop runs on the caller's task and stops at
    /// the first error or when `timeout` has elapsed.
    #[instrument(skip(self))]
    pub async fn wait_for_terminal(
        &self,
        call_id: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<CallRecord> {
        let start = Instant::now();

        loop {
            let record = self.refresh_status(call_id).await?;
            if record.is_terminal() {
                info!(call_id, status = %record.status, "Call finished");
                return Ok(record);
            }

            if start.elapsed() + interval > timeout {
                return self.fail(CallError::WaitTimeout {
                    call_id: call_id.to_string(),
                });
            }
            debug!(call_id, status = %record.status, "Call still active");
            tokio::time::sleep(interval).await;
        }
    }

    /// Run a transport operation, retrying failures that are safe to repeat
    ///
    /// Makes at most `1 + max_retries` attempts, sleeping
    /// `retry_backoff * attempt` in between. `keep_going` is checked after
    /// each backoff; once it returns false the last error is returned
    /// without another attempt.
    async fn with_retry<T, C, F, Fut>(
        &self,
        operation: &str,
        idempotent: bool,
        keep_going: C,
        mut attempt_fn: F,
    ) -> std::result::Result<T, TransportError>
    where
        C: Fn() -> bool,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, TransportError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.config.max_retries && e.is_retryable(idempotent) => {
                    attempt += 1;
                    let delay = self.config.retry_backoff() * attempt;
                    warn!(
                        operation,
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "Retrying voice API request in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    if !keep_going() {
                        debug!(operation, attempt, "Retry abandoned");
                        return Err(e);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}
