//! HTTP client implementation using reqwest

use crate::protocol::Provider;
use crate::providers::error::{TransportError, TransportResult};
use reqwest::{Client, ClientBuilder};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum response size accepted from a provider (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("studyroute/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
#[derive(Clone, Debug)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(Duration::from_secs(10), 10)
    }

    /// Create a new HTTP client with custom pool settings
    ///
    /// Request timeouts are set per call by the transport request.
    pub fn with_config(
        connect_timeout: Duration,
        max_idle_per_host: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// POST a JSON body and return the JSON object the provider answered with
    ///
    /// Statuses >= 400 are classified by [`super::error::map_http_error`] with
    /// the body as best-effort detail. Any other status is read as a payload,
    /// which must be a JSON object within the size limit.
    pub async fn post_json<B>(
        &self,
        provider: Provider,
        url: &str,
        headers: &[(&'static str, String)],
        body: &B,
        timeout: Duration,
    ) -> TransportResult<Map<String, Value>>
    where
        B: Serialize + ?Sized,
    {
        debug!(provider = %provider, url, "Sending provider request");

        let mut req_builder = self.client.post(url).timeout(timeout).json(body);
        for (name, value) in headers {
            req_builder = req_builder.header(*name, value);
        }

        let response = req_builder.send().await.map_err(|e| {
            let err = TransportError::from_reqwest(provider, e);
            warn!(provider = %provider, error_kind = err.kind(), "Provider request failed: {}", err);
            err
        })?;

        let status = response.status();
        debug!(provider = %provider, status = status.as_u16(), "Provider responded");

        if status.as_u16() >= 400 {
            // The body only contributes detail; the status decides the error class
            let body = if self.exceeds_limit(response.content_length()) {
                None
            } else {
                response.text().await.ok()
            };
            let err = super::error::map_http_error(provider, status, body.as_deref());
            warn!(
                provider = %provider,
                status = status.as_u16(),
                error_kind = err.kind(),
                "Provider request was not successful"
            );
            return Err(err);
        }

        if let Some(content_length) = response.content_length() {
            if self.exceeds_limit(Some(content_length)) {
                return Err(self.too_large(provider, content_length));
            }
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| TransportError::from_reqwest(provider, e))?;

        if response_text.len() > self.max_response_size {
            return Err(self.too_large(provider, response_text.len() as u64));
        }

        match serde_json::from_str::<Value>(&response_text) {
            Ok(Value::Object(payload)) => Ok(payload),
            Ok(_) => Err(TransportError::invalid_response(
                provider,
                format!("{} response root must be a JSON object.", provider),
            )),
            Err(_) => Err(TransportError::invalid_response(
                provider,
                format!("{} returned invalid JSON payload.", provider),
            )),
        }
    }

    fn exceeds_limit(&self, content_length: Option<u64>) -> bool {
        content_length.is_some_and(|len| len > self.max_response_size as u64)
    }

    fn too_large(&self, provider: Provider, size: u64) -> TransportError {
        TransportError::invalid_response(
            provider,
            format!(
                "response size {} exceeds maximum {}",
                size, self.max_response_size
            ),
        )
    }
}
