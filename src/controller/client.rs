//! REST client for the fabric controller.

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::config::{ControllerConfig, Credentials};
use crate::error::{ConfigError, ControllerError, FabricError, Result, is_retryable_status};

use super::transport::{ControllerRequest, ControllerResponse, ControllerTransport, HttpMethod};

/// Maximum number of attempts for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Header carrying the user name for API-key authentication.
const USERNAME_HEADER: &str = "X-Nd-Username";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "X-Nd-Apikey";

/// HTTPS client for the controller REST API.
#[derive(Debug, Clone)]
pub struct RestClient {
    /// HTTP client.
    client: Client,
    /// Controller base URL without trailing slash.
    base_url: String,
    /// Authentication.
    credentials: Credentials,
    /// Delay unit between retries.
    retry_delay: Duration,
}

impl RestClient {
    /// Creates a client from the task's controller settings.
    ///
    /// # Errors
    ///
    /// Returns an error if no URL is configured or the HTTP client cannot
    /// be created.
    pub fn new(config: &ControllerConfig, credentials: Credentials) -> Result<Self> {
        let base_url = config
            .url
            .as_deref()
            .ok_or_else(|| ConfigError::validation("controller URL is required", "controller.url"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| FabricError::internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        })
    }

    /// Overrides the delay between retries.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sends one call without retrying.
    async fn send_once(&self, request: &ControllerRequest) -> Result<ControllerResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        trace!("{} {url}", request.method);

        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &url)
            .header(header::ACCEPT, "application/json");

        builder = match &self.credentials {
            Credentials::Token(token) => {
                builder.header(header::AUTHORIZATION, format!("Bearer {token}"))
            }
            Credentials::ApiKey { username, key } => builder
                .header(USERNAME_HEADER, username)
                .header(API_KEY_HEADER, key),
        };

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ControllerError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(FabricError::Controller(ControllerError::AuthenticationFailed {
                message: format!("{} returned {status}", request.path),
            }));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ControllerError::network(format!("Failed to read response body: {e}")))?;

        let data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(ControllerResponse {
            method: request.method,
            path: request.path.clone(),
            return_code: status.as_u16(),
            message: status.canonical_reason().unwrap_or("").to_string(),
            data,
        })
    }
}

#[async_trait]
impl ControllerTransport for RestClient {
    async fn send(&self, request: ControllerRequest) -> Result<ControllerResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {MAX_RETRIES} for {}", request.path);
                tokio::time::sleep(self.retry_delay * attempt).await;
            }

            match self.send_once(&request).await {
                Ok(response)
                    if request.method == HttpMethod::Get
                        && is_retryable_status(response.return_code)
                        && attempt + 1 < MAX_RETRIES =>
                {
                    warn!("{} answered {}, retrying", request.path, response.return_code);
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FabricError::Controller(ControllerError::network("Max retries exceeded"))
        }))
    }
}
