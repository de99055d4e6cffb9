//! HTTP client utilities.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;

use crate::config::HttpConfig;
use crate::sources::SourceError;
use crate::utils::{with_retry, RetryConfig};

/// Shared HTTP client with the configured user agent and timeouts.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    retry: RetryConfig,
}

impl HttpClient {
    /// Create a client from HTTP settings
    pub fn from_config(config: &HttpConfig, retry: RetryConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| SourceError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            retry,
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>, retry: RetryConfig) -> Self {
        Self { client, retry }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET a URL and return the body as text, retrying transient failures
    pub async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        with_retry(self.retry, || {
            let request = self.client.get(url);
            async move { send_for_text(request).await }
        })
        .await
    }

    /// POST a URL-encoded form and return the body as text
    pub async fn post_form_text(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<String, SourceError> {
        with_retry(self.retry, || {
            let request = self.client.post(url).form(form);
            async move { send_for_text(request).await }
        })
        .await
    }
}

async fn send_for_text(request: RequestBuilder) -> Result<String, SourceError> {
    let response = request.send().await?;
    let response = check_status(response)?;
    response
        .text()
        .await
        .map_err(|e| SourceError::Network(format!("Failed to read response body: {}", e)))
}

/// Map non-success HTTP statuses onto SourceError variants
fn check_status(response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimit),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            Err(SourceError::Unavailable(format!("HTTP {}", status)))
        }
        _ => Err(SourceError::Api(format!("HTTP {}", status))),
    }
}
