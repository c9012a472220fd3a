//! Test utilities for dealercall-client
//!
//! [`MockVoiceApi`] is an in-process stand-in for the voice provider's REST
//! API and [`TestServer`] runs any axum router on a loopback port, so the
//! real HTTP transport can be exercised end to end.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use dealercall_core::VoiceCallConfig;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::controller::CallController;
use crate::error::TransportError;

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `router` on an ephemeral loopback port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use dealercall_client::testing::{MockVoiceApi, TestServer};
    ///
    /// let api = MockVoiceApi::new("test-key");
    /// let server = TestServer::start(api.router()).await?;
    /// let controller = server.controller("test-key")?;
    /// ```
    pub async fn start<S>(router: Router<S>) -> std::io::Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        Router<S>: Into<Router>,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router: Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A complete configuration pointing at this server
    ///
    /// Backoff is kept short so retry tests stay fast.
    pub fn config(&self, api_key: &str) -> VoiceCallConfig {
        let mut config = VoiceCallConfig::default();
        config.api_key = api_key.to_string();
        config.base_url = self.base_url();
        config.assistant_id = Some(MockVoiceApi::ASSISTANT_ID.to_string());
        config.phone_number_id = MockVoiceApi::PHONE_NUMBER_ID.to_string();
        config.max_retries = 2;
        config.timeout_ms = 2_000;
        config.retry_backoff_ms = 10;
        config
    }

    /// HTTP-backed controller for [`config`](Self::config)
    pub fn controller(&self, api_key: &str) -> Result<CallController, TransportError> {
        CallController::http(self.config(api_key))
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Voice API routes served by [`MockVoiceApi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `POST /call`
    CreateCall,
    /// `GET /call/{id}`
    GetCall,
    /// `DELETE /call/{id}`
    CancelCall,
    /// `GET /call`
    ListCalls,
}

/// One request as the fake provider saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub endpoint: Endpoint,
    pub call_id: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
enum ScriptedFailure {
    Json(StatusCode, Value),
    Raw(StatusCode, String),
}

impl IntoResponse for ScriptedFailure {
    fn into_response(self) -> Response {
        match self {
            ScriptedFailure::Json(status, body) => (status, Json(body)).into_response(),
            ScriptedFailure::Raw(status, body) => (status, body).into_response(),
        }
    }
}

#[derive(Default)]
struct ApiState {
    api_key: String,
    /// Calls in creation order
    calls: RwLock<Vec<Value>>,
    failures: RwLock<HashMap<Endpoint, VecDeque<ScriptedFailure>>>,
    requests: RwLock<Vec<RecordedRequest>>,
    next_ids: RwLock<VecDeque<String>>,
    delay: RwLock<Option<Duration>>,
}

/// In-memory fake of the voice provider
///
/// Calls are created `queued`, and move only when a test says so
/// ([`set_status`](Self::set_status)). Failures can be scripted per endpoint
/// and are served before any other handling, including auth.
#[derive(Clone, Default)]
pub struct MockVoiceApi {
    state: Arc<ApiState>,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(rename = "customerId")]
    customer_id: Option<String>,
    limit: Option<usize>,
}

impl MockVoiceApi {
    pub const ASSISTANT_ID: &'static str = "test-assistant";
    pub const PHONE_NUMBER_ID: &'static str = "test-phone-number";

    /// Fake provider accepting `Bearer {api_key}`
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            state: Arc::new(ApiState {
                api_key: api_key.into(),
                ..Default::default()
            }),
        }
    }

    /// Router to hand to [`TestServer::start`]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/call", get(list_calls).post(create_call))
            .route("/call/{id}", get(get_call).delete(cancel_call))
            .with_state(self.clone())
    }

    /// Fail the next request to `endpoint` with a JSON body
    pub fn fail(&self, endpoint: Endpoint, status: u16, body: Value) {
        self.push_failure(endpoint, ScriptedFailure::Json(status_code(status), body));
    }

    /// Fail the next request to `endpoint` with a plain-text body
    pub fn fail_raw(&self, endpoint: Endpoint, status: u16, body: impl Into<String>) {
        self.push_failure(endpoint, ScriptedFailure::Raw(status_code(status), body.into()));
    }

    fn push_failure(&self, endpoint: Endpoint, failure: ScriptedFailure) {
        self.state
            .failures
            .write()
            .entry(endpoint)
            .or_default()
            .push_back(failure);
    }

    /// Use `id` for the next created call instead of a random UUID
    pub fn next_call_id(&self, id: impl Into<String>) {
        self.state.next_ids.write().push_back(id.into());
    }

    /// Move a call to the provider status `status`
    ///
    /// Returns false when the call does not exist.
    pub fn set_status(&self, call_id: &str, status: &str) -> bool {
        self.update_call(call_id, json!({ "status": status }))
    }

    /// Merge `fields` into a stored call
    pub fn update_call(&self, call_id: &str, fields: Value) -> bool {
        let mut calls = self.state.calls.write();
        let Some(call) = calls.iter_mut().find(|c| c["id"] == call_id) else {
            return false;
        };
        if let (Some(call), Value::Object(fields)) = (call.as_object_mut(), fields) {
            call.extend(fields);
        }
        true
    }

    /// Stored call as the provider would return it
    pub fn call(&self, call_id: &str) -> Option<Value> {
        self.find(call_id)
    }

    /// Delay every response
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.state.delay.write() = delay;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.read().clone()
    }

    pub fn request_count(&self, endpoint: Endpoint) -> usize {
        self.state
            .requests
            .read()
            .iter()
            .filter(|r| r.endpoint == endpoint)
            .count()
    }

    /// Body of the most recent `POST /call`
    pub fn last_create_body(&self) -> Option<Value> {
        self.state
            .requests
            .read()
            .iter()
            .rev()
            .find(|r| r.endpoint == Endpoint::CreateCall)
            .and_then(|r| r.body.clone())
    }

    fn find(&self, call_id: &str) -> Option<Value> {
        self.state
            .calls
            .read()
            .iter()
            .find(|c| c["id"] == call_id)
            .cloned()
    }

    /// Shared handling for every route: record, delay, scripted failure, auth
    async fn admit(
        &self,
        endpoint: Endpoint,
        headers: &HeaderMap,
        call_id: Option<&str>,
        body: Option<&Value>,
    ) -> Option<Response> {
        let authorization = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        self.state.requests.write().push(RecordedRequest {
            endpoint,
            call_id: call_id.map(str::to_string),
            authorization: authorization.clone(),
            body: body.cloned(),
        });

        let delay = *self.state.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .state
            .failures
            .write()
            .get_mut(&endpoint)
            .and_then(VecDeque::pop_front);
        if let Some(failure) = scripted {
            return Some(failure.into_response());
        }

        let expected = format!("Bearer {}", self.state.api_key);
        if authorization.as_deref() != Some(expected.as_str()) {
            return Some(
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Invalid API key" })),
                )
                    .into_response(),
            );
        }

        None
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn not_found(call_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("Call {} not found", call_id) })),
    )
        .into_response()
}

fn is_ended(call: &Value) -> bool {
    matches!(
        call["status"].as_str(),
        Some("ended" | "completed" | "failed" | "cancelled" | "canceled")
    )
}

/// POST /call
async fn create_call(
    State(api): State<MockVoiceApi>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(response) = api.admit(Endpoint::CreateCall, &headers, None, Some(&body)).await {
        return response;
    }

    let mut problems = Vec::new();
    for (field, value) in [
        ("assistantId", &body["assistantId"]),
        ("phoneNumberId", &body["phoneNumberId"]),
        ("customer.number", &body["customer"]["number"]),
    ] {
        if value.as_str().map_or(true, str::is_empty) {
            problems.push(format!("{} should not be empty", field));
        }
    }
    if !problems.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": problems }))).into_response();
    }

    let id = api
        .state
        .next_ids
        .write()
        .pop_front()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let call = json!({
        "id": id,
        "status": "queued",
        "type": "outboundPhoneCall",
        "assistantId": body["assistantId"],
        "phoneNumberId": body["phoneNumberId"],
        "customer": body["customer"],
        "metadata": body["metadata"],
        "createdAt": Utc::now().to_rfc3339(),
    });
    api.state.calls.write().push(call.clone());

    (StatusCode::CREATED, Json(call)).into_response()
}

/// GET /call/{id}
async fn get_call(
    State(api): State<MockVoiceApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Some(response) = api.admit(Endpoint::GetCall, &headers, Some(&id), None).await {
        return response;
    }

    match api.find(&id) {
        Some(call) => Json(call).into_response(),
        None => not_found(&id),
    }
}

/// DELETE /call/{id}
async fn cancel_call(
    State(api): State<MockVoiceApi>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Some(response) = api.admit(Endpoint::CancelCall, &headers, Some(&id), None).await {
        return response;
    }

    let Some(call) = api.find(&id) else {
        return not_found(&id);
    };
    if is_ended(&call) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Call has already ended" })),
        )
            .into_response();
    }

    api.update_call(
        &id,
        json!({
            "status": "cancelled",
            "endedReason": "manually-canceled",
            "endedAt": Utc::now().to_rfc3339(),
        }),
    );
    match api.find(&id) {
        Some(call) => Json(call).into_response(),
        None => not_found(&id),
    }
}

/// GET /call?customerId=ID&limit=N, most recent first
///
/// Without `customerId` every call is listed.
async fn list_calls(
    State(api): State<MockVoiceApi>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response {
    if let Some(response) = api.admit(Endpoint::ListCalls, &headers, None, None).await {
        return response;
    }

    let calls: Vec<Value> = api
        .state
        .calls
        .read()
        .iter()
        .rev()
        .filter(|call| match &query.customer_id {
            Some(id) => call["metadata"]["customerId"] == id.as_str(),
            None => true,
        })
        .take(query.limit.unwrap_or(100))
        .cloned()
        .collect();
    Json(calls).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_reachable_at_base_url() {
        let api = MockVoiceApi::new("k");
        let server = TestServer::start(api.router()).await.unwrap();

        assert!(server.addr.ip().is_loopback());
        assert_ne!(server.addr.port(), 0);

        let response = reqwest::get(format!("{}/call", server.base_url()))
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(api.request_count(Endpoint::ListCalls), 1);
        server.shutdown().await;
    }

    #[test]
    fn test_set_status_unknown_call() {
        let api = MockVoiceApi::new("k");
        assert!(!api.set_status("nope", "ringing"));
        assert!(api.call("nope").is_none());
    }

    #[test]
    fn test_scripted_failures_are_per_endpoint() {
        let api = MockVoiceApi::new("k");
        api.fail(Endpoint::CreateCall, 500, json!({ "message": "boom" }));
        api.fail_raw(Endpoint::GetCall, 502, "bad gateway");

        let failures = api.state.failures.read();
        assert_eq!(failures[&Endpoint::CreateCall].len(), 1);
        assert_eq!(failures[&Endpoint::GetCall].len(), 1);
        assert!(!failures.contains_key(&Endpoint::CancelCall));
    }

    #[tokio::test]
    async fn test_server_config_is_complete() {
        let api = MockVoiceApi::new("k");
        let server = TestServer::start(api.router()).await.unwrap();
        let config = server.config("k");

        assert!(config.is_configured());
        assert_eq!(config.base_url, server.base_url());
        server.shutdown().await;
    }
}
