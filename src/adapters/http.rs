//! Shared JSON-over-HTTP client with rate-limit back-off.

use crate::utils::error::{Result, ReviewError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 60;
const NO_QUERY: [(&str, &str); 0] = [];

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    /// Pause between consecutive pages of a paginated listing.
    pub request_delay: Duration,
    pub max_retries: u32,
    pub max_rate_limit_wait: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            request_delay: Duration::from_millis(500),
            max_retries: 5,
            max_rate_limit_wait: Duration::from_secs(3600),
        }
    }
}

pub struct ApiClient {
    service: &'static str,
    client: Client,
    settings: HttpSettings,
}

impl ApiClient {
    pub fn new(
        service: &'static str,
        headers: &[(&'static str, String)],
        settings: HttpSettings,
    ) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let value = HeaderValue::from_str(value).map_err(|e| {
                ReviewError::ConfigValidationError {
                    field: format!("{} {} header", service, name),
                    message: e.to_string(),
                }
            })?;
            default_headers.insert(HeaderName::from_static(*name), value);
        }

        let client = Client::builder()
            .default_headers(default_headers)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            service,
            client,
            settings,
        })
    }

    /// GET `url` and decode the JSON body, waiting out rate limits.
    pub async fn get_json<T, Q>(&self, url: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let mut retries = 0;
        loop {
            tracing::debug!("{} GET {}", self.service, url);
            let response = self.client.get(url).query(query).send().await?;

            let now = chrono::Utc::now().timestamp();
            if let Some(wait) = rate_limit_wait(
                response.status(),
                response.headers(),
                now,
                self.settings.max_rate_limit_wait,
            ) {
                if retries >= self.settings.max_retries {
                    return Err(ReviewError::RateLimitError {
                        service: self.service.to_string(),
                        attempts: retries + 1,
                    });
                }
                retries += 1;
                tracing::warn!(
                    "⏳ {} rate limited. Waiting {} seconds (retry {}/{})",
                    self.service,
                    wait.as_secs(),
                    retries,
                    self.settings.max_retries
                );
                tokio::time::sleep(wait).await;
                continue;
            }

            let response = response.error_for_status()?;
            return Ok(response.json::<T>().await?);
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get_json(url, &NO_QUERY).await
    }

    /// Politeness delay between pages.
    pub async fn pause(&self) {
        if !self.settings.request_delay.is_zero() {
            tokio::time::sleep(self.settings.request_delay).await;
        }
    }
}

/// How long to wait before retrying, or `None` when the response is not a rate limit.
///
/// 429 is always a rate limit. 403 counts only when GitHub reports an exhausted
/// quota (`X-RateLimit-Remaining: 0`) or the server sent `Retry-After`, so that
/// plain permission errors fail fast.
pub fn rate_limit_wait(
    status: StatusCode,
    headers: &HeaderMap,
    now_epoch_secs: i64,
    max_wait: Duration,
) -> Option<Duration> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);

    let retry_after = header("retry-after").and_then(|v| v.parse::<u64>().ok());
    let exhausted = header("x-ratelimit-remaining") == Some("0");

    let limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (exhausted || retry_after.is_some()));
    if !limited {
        return None;
    }

    let secs = retry_after
        .or_else(|| {
            header("x-ratelimit-reset")
                .and_then(|v| v.parse::<i64>().ok())
                .map(|reset| (reset - now_epoch_secs + 1).max(0) as u64)
        })
        .unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS);

    Some(Duration::from_secs(secs).min(max_wait))
}
