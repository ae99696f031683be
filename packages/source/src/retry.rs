//! HTTP retry helper for bulk crawls.
//!
//! Crawls issue hundreds of page requests against county servers that
//! routinely drop connections or answer 503 under load, so each page goes
//! through [`send_json`] which retries transient failures with exponential
//! backoff. Interactive lookups do not retry.

use std::time::Duration;

use crate::SourceError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// With exponential backoff (1s, 2s, 4s) the total wait before giving up
/// is 7 seconds.
const MAX_RETRIES: u32 = 3;

/// Returns `true` for statuses worth retrying: 429 and any 5xx.
fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Returns `true` for transport errors worth retrying.
fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

const fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt)
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`], since builders are consumed by
/// `.send()`.
///
/// Does **not** retry HTTP 4xx (except 429).
///
/// # Errors
///
/// Returns [`SourceError`] if the request still fails after
/// [`MAX_RETRIES`] retries, the server returns a non-retryable status, or
/// the body is not valid JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, SourceError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        match build_request().send().await {
            Ok(response) if is_retryable_status(response.status()) && attempt < MAX_RETRIES => {
                let delay = backoff(attempt);
                log::warn!(
                    "HTTP {} from {} (retry {}/{MAX_RETRIES}), retrying in {delay:?}",
                    response.status(),
                    response.url(),
                    attempt + 1,
                );
                tokio::time::sleep(delay).await;
            }
            Ok(response) => {
                let text = response.error_for_status()?.text().await?;
                return Ok(serde_json::from_str(&text)?);
            }
            Err(e) if is_retryable_error(&e) && attempt < MAX_RETRIES => {
                let delay = backoff(attempt);
                log::warn!(
                    "Request failed (retry {}/{MAX_RETRIES}), retrying in {delay:?}: {e}",
                    attempt + 1,
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(SourceError::Http(e)),
        }
        attempt += 1;
    }
}
