//! Marketplace HTTP Client - Rate-limited REST API Client
//!
//! Wraps reqwest with request pacing, a concurrency cap, retries and
//! authentication for all marketplace REST API interactions.
//!
//! Retries cover a single request only (429, 5xx, transport errors)
//! with exponential backoff. Callers never see a retried flow step.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use governor::{Quota, RateLimiter as GovRateLimiter};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::auth::MarketplaceAuth;

type RateLimiter = GovRateLimiter<
  governor::state::NotKeyed,
  governor::state::InMemoryState,
  governor::clock::DefaultClock,
>;

/// Configuration for the marketplace HTTP client.
#[derive(Debug, Clone)]
pub struct MarketplaceClientConfig {
  /// Base URL for the marketplace API.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Maximum retries on transient errors.
  pub max_retries: u32,
  /// Base delay between retries (exponential backoff).
  pub retry_base_delay: Duration,
  /// Request pacing.
  pub requests_per_second: u32,
}

impl Default for MarketplaceClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.opensea.io".to_string(),
      timeout: Duration::from_secs(30),
      max_concurrent: 4,
      max_retries: 3,
      retry_base_delay: Duration::from_millis(250),
      requests_per_second: 2,
    }
  }
}

/// Rate-limited HTTP client for the marketplace API.
pub struct MarketplaceClient {
  /// Underlying HTTP client.
  http: Client,
  auth: MarketplaceAuth,
  config: MarketplaceClientConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
  /// Request pacing.
  limiter: RateLimiter,
}

impl MarketplaceClient {
  /// Create a new marketplace client.
  pub fn new(auth: MarketplaceAuth, config: MarketplaceClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(4)
      .build()
      .context("Failed to build HTTP client")?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
    let limiter = GovRateLimiter::direct(Quota::per_second(per_second));

    Ok(Self {
      http,
      auth,
      config,
      semaphore,
      limiter,
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// GET and decode a JSON body.
  pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    self
      .get_optional_json(path)
      .await?
      .ok_or_else(|| anyhow!("API error 404 Not Found: {path}"))
  }

  /// GET and decode a JSON body; `None` on 404.
  pub async fn get_optional_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
    let request = self.http.get(self.url(path));
    let response = self.execute_with_retry(request, "GET", path).await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    let body = response
      .json::<T>()
      .await
      .with_context(|| format!("Malformed response from GET {path}"))?;
    Ok(Some(body))
  }

  /// POST a JSON body and decode the JSON response.
  pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T> {
    let request = self.http.post(self.url(path)).json(body);
    let response = self.execute_with_retry(request, "POST", path).await?;
    if response.status() == StatusCode::NOT_FOUND {
      bail!("API error 404 Not Found: {path}");
    }
    response
      .json::<T>()
      .await
      .with_context(|| format!("Malformed response from POST {path}"))
  }

  /// Execute request with authentication, pacing and retries.
  ///
  /// Returns successful responses and 404s; every other status is an
  /// error carrying the response body.
  async fn execute_with_retry(
    &self,
    request: RequestBuilder,
    method: &str,
    path: &str,
  ) -> Result<Response> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .context("Semaphore closed")?;

    let mut last_error = None;

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        let delay = backoff_delay(self.config.retry_base_delay, attempt);
        debug!(attempt, delay_ms = delay.as_millis(), "Retrying request");
        sleep(delay).await;
      }

      self.limiter.until_ready().await;

      let req = self
        .auth
        .apply(request.try_clone().context("Failed to clone request")?);

      match req.send().await {
        Ok(response) => match response.status() {
          status if status.is_success() || status == StatusCode::NOT_FOUND => {
            return Ok(response);
          }
          status if is_retryable(status) => {
            warn!(%status, method, path, "Transient API error, backing off");
            last_error = Some(anyhow!("API error {status} on {method} {path}"));
          }
          status => {
            let body = response.text().await.unwrap_or_default();
            bail!("API error {status}: {body}");
          }
        },
        Err(e) => {
          warn!(error = %e, attempt, method, path, "Request failed");
          last_error = Some(e.into());
        }
      }
    }

    Err(last_error.unwrap_or_else(|| anyhow!("Max retries exceeded")))
  }
}

/// Statuses worth retrying: rate limiting and server errors.
fn is_retryable(status: StatusCode) -> bool {
  status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Delay before retry `attempt` (1-based).
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
  base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}
