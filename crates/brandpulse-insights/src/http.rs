//! Plumbing shared by the outbound HTTP clients.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;

use crate::error::InsightsError;

pub(crate) const USER_AGENT: &str = "brandpulse/0.1 (brand-insights)";

/// Fallback wait when a 429 carries no usable hint.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
const MAX_ERROR_BODY_CHARS: usize = 500;

/// `reqwest` client with the per-request and connect timeouts every client uses.
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, InsightsError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Parse `base_url`, normalised to end with exactly one slash so relative
/// joins append to the path instead of replacing its last segment.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<Url, InsightsError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised).map_err(|e| InsightsError::InvalidBaseUrl {
        url: base_url.to_owned(),
        reason: e.to_string(),
    })
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url, InsightsError> {
    base.join(path).map_err(|e| InsightsError::InvalidBaseUrl {
        url: format!("{base}{path}"),
        reason: e.to_string(),
    })
}

/// Seconds to wait before retrying a rate-limited request.
///
/// Prefers `Retry-After` (delta seconds), then the X-style
/// `x-rate-limit-reset` epoch timestamp relative to `now`.
pub(crate) fn retry_after_secs(headers: &HeaderMap, now: DateTime<Utc>) -> u64 {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(secs) = header(RETRY_AFTER.as_str()).and_then(|s| s.trim().parse::<u64>().ok()) {
        return secs;
    }
    if let Some(reset) = header("x-rate-limit-reset").and_then(|s| s.trim().parse::<i64>().ok()) {
        return u64::try_from(reset - now.timestamp()).unwrap_or(0);
    }
    DEFAULT_RETRY_AFTER_SECS
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        body.to_owned()
    } else {
        let mut cut: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        cut.push_str("...");
        cut
    }
}

/// Map the status to a typed error, then parse the body as JSON.
///
/// # Errors
///
/// - [`InsightsError::RateLimited`] for HTTP 429.
/// - [`InsightsError::UnexpectedStatus`] for any other non-2xx status.
/// - [`InsightsError::Http`] if the body cannot be read.
/// - [`InsightsError::Deserialize`] if the body is not JSON.
pub(crate) async fn read_json(response: Response, service: &str) -> Result<Value, InsightsError> {
    let status = response.status();
    let url = response.url().clone();

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(InsightsError::RateLimited {
            service: service.to_owned(),
            retry_after_secs: retry_after_secs(response.headers(), Utc::now()),
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(InsightsError::UnexpectedStatus {
            status: status.as_u16(),
            url: format!("{}{}", url.origin().ascii_serialization(), url.path()),
            body: truncate_body(&body),
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| InsightsError::Deserialize {
        context: format!("{service} {}", url.path()),
        source: e,
    })
}
