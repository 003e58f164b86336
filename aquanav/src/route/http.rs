//! HTTP client abstraction for testability

use std::time::Duration;

use super::RouteError;
use crate::position::BoxFuture;

/// Trait for async HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync + 'static {
    /// Performs an HTTP GET request.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    ///
    /// # Returns
    ///
    /// The response body as bytes, or an error for transport failures and
    /// non-2xx statuses.
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, RouteError>>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, RouteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aquanav/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RouteError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, RouteError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self.client.get(&url).send().await.map_err(|e| {
                if e.is_timeout() {
                    RouteError::Http(format!("Request timed out: {}", e))
                } else {
                    RouteError::Http(format!("Request failed: {}", e))
                }
            })?;

            // Check HTTP status
            let status = response.status();
            if !status.is_success() {
                return Err(RouteError::Status {
                    status: status.as_u16(),
                });
            }

            // Read response body
            response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| RouteError::Http(format!("Failed to read response: {}", e)))
        })
    }
}
