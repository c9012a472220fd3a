//! HTTP transport over reqwest

use std::time::Duration;

use async_trait::async_trait;
use dealercall_core::{CallRecord, VoiceCallConfig};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};
use url::Url;

use super::{CallPayload, CallTransport};
use crate::error::TransportError;
use crate::types::{provider_error_message, CallListResponse, CallResponse};

/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Voice API transport over HTTPS
///
/// Holds only a connection pool; credentials and deadlines come from the
/// [`VoiceCallConfig`] passed to each call.
#[derive(Debug, Clone)]
pub struct HttpCallTransport {
    client: Client,
}

impl HttpCallTransport {
    /// Create a transport with its own connection pool
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    /// Create a transport that reuses an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn endpoint(config: &VoiceCallConfig, path: &str) -> Result<Url, TransportError> {
        let raw = format!("{}/{}", config.base_url.trim().trim_end_matches('/'), path);
        Url::parse(&raw)
            .map_err(|e| TransportError::InvalidRequest(format!("invalid URL '{}': {}", raw, e)))
    }

    /// `{base}/call/{id}` with the id encoded as a single path segment
    fn call_url(config: &VoiceCallConfig, call_id: &str) -> Result<Url, TransportError> {
        let mut url = Self::endpoint(config, "call")?;
        url.path_segments_mut()
            .map_err(|_| TransportError::InvalidRequest("base URL cannot take a path".into()))?
            .push(call_id);
        Ok(url)
    }

    fn request(&self, config: &VoiceCallConfig, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&config.api_key)
            .timeout(config.timeout())
    }

    async fn send(
        &self,
        config: &VoiceCallConfig,
        request: RequestBuilder,
    ) -> Result<Response, TransportError> {
        request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, config.timeout_ms))
    }

    /// Decode a 2xx body or turn a non-2xx into a transport error
    async fn handle_response<T: DeserializeOwned>(
        config: &VoiceCallConfig,
        response: Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::extract_error(config, response, status).await);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(e, config.timeout_ms))?;
        serde_json::from_slice(&body).map_err(|e| TransportError::Parse(e.to_string()))
    }

    async fn extract_error(
        config: &VoiceCallConfig,
        response: Response,
        status: StatusCode,
    ) -> TransportError {
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return TransportError::from_reqwest(e, config.timeout_ms),
        };

        let message = serde_json::from_slice::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| provider_error_message(&v));

        debug!(status = status.as_u16(), message = ?message, "Voice API error response");

        match message {
            Some(message) => TransportError::Provider {
                status: status.as_u16(),
                message,
            },
            None => TransportError::Http {
                status: status.as_u16(),
            },
        }
    }
}

#[async_trait]
impl CallTransport for HttpCallTransport {
    #[instrument(skip(self, config, payload), fields(assistant_id = %payload.assistant_id))]
    async fn initiate(
        &self,
        config: &VoiceCallConfig,
        payload: &CallPayload,
    ) -> Result<CallRecord, TransportError> {
        let url = Self::endpoint(config, "call")?;
        info!("Placing outbound call via {}", url);

        let request = self
            .request(config, Method::POST, url)
            .json(&payload.to_request(config));
        let response = self.send(config, request).await?;

        let call: CallResponse = Self::handle_response(config, response).await?;
        info!(call_id = %call.id, "Call accepted by provider");
        Ok(call.into())
    }

    #[instrument(skip(self, config))]
    async fn fetch_status(
        &self,
        config: &VoiceCallConfig,
        call_id: &str,
    ) -> Result<CallRecord, TransportError> {
        let url = Self::call_url(config, call_id)?;
        debug!("Fetching call status from {}", url);

        let response = self.send(config, self.request(config, Method::GET, url)).await?;
        let call: CallResponse = Self::handle_response(config, response).await?;
        Ok(call.into())
    }

    #[instrument(skip(self, config))]
    async fn cancel(
        &self,
        config: &VoiceCallConfig,
        call_id: &str,
    ) -> Result<bool, TransportError> {
        let url = Self::call_url(config, call_id)?;
        info!("Cancelling call at {}", url);

        let response = self
            .send(config, self.request(config, Method::DELETE, url))
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else {
            Err(Self::extract_error(config, response, status).await)
        }
    }

    #[instrument(skip(self, config))]
    async fn list_calls(
        &self,
        config: &VoiceCallConfig,
        customer_id: &str,
        limit: usize,
    ) -> Result<Vec<CallRecord>, TransportError> {
        let mut url = Self::endpoint(config, "call")?;
        url.query_pairs_mut()
            .append_pair("customerId", customer_id)
            .append_pair("limit", &limit.to_string());
        debug!("Listing calls from {}", url);

        let response = self.send(config, self.request(config, Method::GET, url)).await?;
        let list: CallListResponse = Self::handle_response(config, response).await?;
        Ok(list.into_records())
    }
}
