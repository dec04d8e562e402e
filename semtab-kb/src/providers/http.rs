//! Rate-limited HTTP client shared by the knowledge-base providers

use super::{invalid_response, rate_limited, request_failed};
use crate::KbResult;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use semtab_core::{EndpointConfig, KnowledgeBase};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Requests-per-minute quota. The burst is one second's share of the
/// budget, so requests are spread across the minute instead of front-loaded.
fn request_quota(requests_per_minute: u32) -> Quota {
    let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(rpm.get() / 60).unwrap_or(NonZeroU32::MIN);
    Quota::per_minute(rpm).allow_burst(burst)
}

/// HTTP client with rate limiting for one knowledge base.
pub struct HttpCore {
    client: Client,
    kb: KnowledgeBase,
    limiter: DirectRateLimiter,
    requests_per_minute: u32,
}

impl HttpCore {
    /// Create a client for `kb` using the user agent and request budget
    /// from `endpoints`.
    pub fn new(kb: KnowledgeBase, endpoints: &EndpointConfig) -> KbResult<Self> {
        let client = Client::builder()
            .user_agent(endpoints.user_agent.as_str())
            .build()
            .map_err(|e| request_failed(kb, 0, format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            kb,
            limiter: RateLimiter::direct(request_quota(endpoints.requests_per_minute)),
            requests_per_minute: endpoints.requests_per_minute,
        })
    }

    pub fn knowledge_base(&self) -> KnowledgeBase {
        self.kb
    }

    /// GET `url` with query parameters and decode the JSON body.
    pub async fn get_json<Res: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        accept: &str,
    ) -> KbResult<Res> {
        self.limiter.until_ready().await;

        tracing::debug!(kb = %self.kb, url, "knowledge base request");
        let response = self
            .client
            .get(url)
            .header("Accept", accept)
            .query(params)
            .send()
            .await
            .map_err(|e| request_failed(self.kb, 0, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let retry_after_ms = parse_retry_after_ms(response.headers()).unwrap_or(0);

        if status.is_success() {
            response.json().await.map_err(|e| {
                invalid_response(self.kb, format!("Failed to parse response: {}", e))
            })
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            Err(match status {
                StatusCode::TOO_MANY_REQUESTS => rate_limited(self.kb, retry_after_ms),
                _ => request_failed(self.kb, status.as_u16() as i32, truncate(&error_text, 200)),
            })
        }
    }
}

fn parse_retry_after_ms(headers: &reqwest::header::HeaderMap) -> Option<i64> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .map(|seconds| (seconds * 1000.0) as i64)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

impl std::fmt::Debug for HttpCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCore")
            .field("kb", &self.kb)
            .field("requests_per_minute", &self.requests_per_minute)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after_ms(&headers), Some(1500));
    }

    #[test]
    fn test_parse_retry_after_missing_or_date() {
        let headers = HeaderMap::new();
        assert_eq!(parse_retry_after_ms(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(
            "retry-after",
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after_ms(&headers), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }

    #[test]
    fn test_quota_spreads_requests_over_the_minute() {
        let limiter: DirectRateLimiter = RateLimiter::direct(request_quota(600));
        // 600 per minute allows a burst of 10, then one every 100ms.
        for _ in 0..10 {
            assert!(limiter.check().is_ok());
        }
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_low_budget_allows_single_request_burst() {
        let limiter: DirectRateLimiter = RateLimiter::direct(request_quota(30));
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_requests_wait_their_turn() {
        let core = HttpCore::new(
            KnowledgeBase::Wikidata,
            &EndpointConfig {
                requests_per_minute: 3000,
                ..Default::default()
            },
        )
        .unwrap();
        // Drain the burst so every waiter is paced.
        let burst = NonZeroU32::new(50).unwrap();
        assert!(matches!(core.limiter.check_n(burst), Ok(Ok(()))));

        let start = std::time::Instant::now();
        tokio::join!(
            core.limiter.until_ready(),
            core.limiter.until_ready(),
            core.limiter.until_ready(),
        );
        assert!(start.elapsed() >= std::time::Duration::from_millis(50));
        assert_eq!(core.knowledge_base(), KnowledgeBase::Wikidata);
    }
}
