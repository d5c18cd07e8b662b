//! Shared HTTP plumbing for API-backed providers.
//!
//! Providers build their own signed `RequestBuilder`; this module sends it,
//! logs it, classifies transport failures and decodes bodies. Whether a request
//! may be retried is decided by its [`RequestKind`]: reads are retried on
//! transient errors, mutations never are.

use reqwest::RequestBuilder;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::ProviderError;
use crate::utils::log_sanitizer::truncate_for_log;

/// Retries applied to read requests (zone lookup, record listing).
const READ_RETRIES: u32 = 2;
/// Upper bound for a server-provided `Retry-After`.
const MAX_RETRY_AFTER_SECS: u64 = 30;

/// What a request does to remote state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Side-effect free; safe to resend.
    Read,
    /// Creates, changes or deletes a record; sent exactly once.
    Mutation,
}

impl RequestKind {
    fn max_retries(self) -> u32 {
        match self {
            Self::Read => READ_RETRIES,
            Self::Mutation => 0,
        }
    }
}

/// HTTP helper functions
pub struct HttpUtils;

impl HttpUtils {
    /// Send a request once and return `(status, body)`.
    ///
    /// HTTP 429 becomes [`ProviderError::RateLimited`] and 502..=504 become
    /// [`ProviderError::NetworkError`]; every other status is returned to the
    /// caller for provider-specific interpretation.
    pub async fn execute_request(
        request_builder: RequestBuilder,
        provider_name: &str,
        method_name: &str,
        url_or_action: &str,
    ) -> Result<(u16, String), ProviderError> {
        log::debug!("[{provider_name}] {method_name} {url_or_action}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: provider_name.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ProviderError::NetworkError {
                    provider: provider_name.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[{provider_name}] Response Status: {status_code}");

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if status_code == 429 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{provider_name}] Rate limited (HTTP 429), retry_after={retry_after:?}");
            return Err(ProviderError::RateLimited {
                provider: provider_name.to_string(),
                retry_after,
                raw_message: Some(truncate_for_log(&body)),
            });
        }

        if matches!(status_code, 502..=504) {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{provider_name}] Server error (HTTP {status_code})");
            return Err(ProviderError::NetworkError {
                provider: provider_name.to_string(),
                detail: format!("HTTP {status_code}: {}", truncate_for_log(&body)),
            });
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError {
                provider: provider_name.to_string(),
                detail: format!("Failed to read response body: {e}"),
            })?;

        log::debug!(
            "[{provider_name}] Response Body: {}",
            truncate_for_log(&response_text)
        );

        Ok((status_code, response_text))
    }

    /// Send a request, retrying according to its [`RequestKind`].
    ///
    /// Transient errors (network, timeout, 429) on reads are retried with
    /// exponential backoff (100ms, 200ms, ... capped at 10s), or after the
    /// server's `Retry-After` when present. Mutations go straight through.
    pub async fn send(
        request_builder: RequestBuilder,
        provider_name: &str,
        method_name: &str,
        url_or_action: &str,
        kind: RequestKind,
    ) -> Result<(u16, String), ProviderError> {
        let max_retries = kind.max_retries();
        if max_retries == 0 {
            return Self::execute_request(
                request_builder,
                provider_name,
                method_name,
                url_or_action,
            )
            .await;
        }

        let mut last_error = None;

        for attempt in 0..=max_retries {
            let Some(req) = request_builder.try_clone() else {
                log::warn!("[{provider_name}] Request body is not cloneable, sending once");
                return Self::execute_request(
                    request_builder,
                    provider_name,
                    method_name,
                    url_or_action,
                )
                .await;
            };

            match Self::execute_request(req, provider_name, method_name, url_or_action).await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt < max_retries && e.is_transient() => {
                    let delay = retry_delay(&e, attempt);
                    log::warn!(
                        "[{}] {} {} failed (attempt {}/{}), retrying in {:.1}s: {}",
                        provider_name,
                        method_name,
                        url_or_action,
                        attempt + 1,
                        max_retries + 1,
                        delay.as_secs_f32(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::NetworkError {
            provider: provider_name.to_string(),
            detail: "All retries exhausted with no error captured".to_string(),
        }))
    }

    /// Encode a request body.
    pub fn to_json<T>(body: &T, provider_name: &str) -> Result<String, ProviderError>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_string(body).map_err(|e| {
            log::error!("[{provider_name}] JSON encode failed: {e}");
            ProviderError::SerializationError {
                provider: provider_name.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// Decode a JSON body.
    pub fn parse_json<T>(response_text: &str, provider_name: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(response_text).map_err(|e| {
            log::error!("[{provider_name}] JSON parse failed: {e}");
            log::error!(
                "[{provider_name}] Raw response: {}",
                truncate_for_log(response_text)
            );
            ProviderError::ParseError {
                provider: provider_name.to_string(),
                detail: e.to_string(),
            }
        })
    }

    /// Decode an XML body.
    #[cfg(feature = "route53")]
    pub fn parse_xml<T>(response_text: &str, provider_name: &str) -> Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        quick_xml::de::from_str(response_text).map_err(|e| {
            log::error!("[{provider_name}] XML parse failed: {e}");
            log::error!(
                "[{provider_name}] Raw response: {}",
                truncate_for_log(response_text)
            );
            ProviderError::ParseError {
                provider: provider_name.to_string(),
                detail: e.to_string(),
            }
        })
    }
}

/// `Retry-After` (capped) for rate limits, exponential backoff otherwise.
fn retry_delay(error: &ProviderError, attempt: u32) -> Duration {
    if let ProviderError::RateLimited {
        retry_after: Some(secs),
        ..
    } = error
    {
        Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS))
    } else {
        backoff_delay(attempt)
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let capped_attempt = attempt.min(20);
    let delay_ms = 100_u64.saturating_mul(1_u64 << capped_attempt);
    Duration::from_millis(delay_ms.min(10_000))
}
