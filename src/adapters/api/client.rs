//! Ledger HTTP Client - Authenticated REST API Client
//!
//! Wraps reqwest with request signing, a request timeout, and optional
//! retries on rate limiting and server errors for all ledger network
//! REST API interactions.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::auth::LedgerAuth;
use crate::config::LedgerConfig;

/// Configuration for the ledger HTTP client.
#[derive(Debug, Clone)]
pub struct LedgerClientConfig {
  /// Base URL for the ledger API.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
}

impl Default for LedgerClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.mixin.one".to_string(),
      timeout: Duration::from_secs(10),
      max_retries: 0,
      retry_base_delay: Duration::from_millis(200),
    }
  }
}

impl From<&LedgerConfig> for LedgerClientConfig {
  fn from(config: &LedgerConfig) -> Self {
    Self {
      base_url: config.base_url.trim_end_matches('/').to_string(),
      timeout: Duration::from_millis(config.timeout_ms),
      max_retries: config.max_retries,
      ..Self::default()
    }
  }
}

/// Signed HTTP client for the ledger network API.
pub struct LedgerClient {
  /// Underlying HTTP client.
  http: Client,
  /// Authentication manager.
  auth: Arc<LedgerAuth>,
  /// Client configuration.
  config: LedgerClientConfig,
}

impl LedgerClient {
  /// Create a new ledger client.
  pub fn new(auth: Arc<LedgerAuth>, config: LedgerClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(2)
      .build()
      .context("Failed to build HTTP client")?;

    Ok(Self { http, auth, config })
  }

  /// Execute a signed GET request.
  pub async fn get(&self, path: &str) -> Result<Response> {
    let url = format!("{}{}", self.config.base_url, path);
    let request = self.http.get(&url);
    self.execute_with_retry(request, "GET", path, "").await
  }

  /// Execute request with authentication and retries.
  async fn execute_with_retry(
    &self,
    request: RequestBuilder,
    method: &str,
    path: &str,
    body: &str,
  ) -> Result<Response> {
    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = self
          .config
          .retry_base_delay
          .saturating_mul(2u32.saturating_pow(attempt - 1));
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        sleep(delay).await;
      }

      let headers = self.auth.auth_headers(method, path, body);
      let req = request
        .try_clone()
        .context("Failed to clone request")?
        .header("X-Client-Id", &headers.client_id)
        .header("X-Session-Id", &headers.session_id)
        .header("X-Timestamp", &headers.timestamp)
        .header("X-Signature", &headers.signature)
        .header("X-Request-Id", &headers.request_id);

      match req.send().await {
        Ok(response) => match response.status() {
          status if status.is_success() => return Ok(response),
          StatusCode::TOO_MANY_REQUESTS => {
            warn!("Rate limited by ledger API, backing off");
            last_error = Some(anyhow::anyhow!("Rate limited"));
          }
          status if status.is_server_error() => {
            warn!(status = %status, "Server error");
            last_error = Some(anyhow::anyhow!("Server error: {status}"));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("API error {status}: {body}"));
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, "Request failed");
          last_error = Some(e.into());
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Max retries exceeded")))
  }

  /// Get a reference to the auth manager.
  pub fn auth(&self) -> &LedgerAuth {
    &self.auth
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_config_from_ledger_section() {
    let ledger = LedgerConfig {
      base_url: "https://api.example.com/".to_string(),
      timeout_ms: 2_500,
      page_limit: 100,
      retry_delay_ms: 1_000,
      idle_delay_ms: 1_000,
      max_retries: 2,
    };
    let config = LedgerClientConfig::from(&ledger);
    assert_eq!(config.base_url, "https://api.example.com");
    assert_eq!(config.timeout, Duration::from_millis(2_500));
    assert_eq!(config.max_retries, 2);
  }
}
