//! HTTP and TCP health checks.

use std::sync::LazyLock;
use std::time::Duration;

use log::debug;
use reqwest::Client;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

use crate::types::{HealthCheck, HealthCheckResult, HealthCheckType};

/// Shared HTTP client with the default certificate verification.
static HTTP_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .unwrap_or_default()
});

/// Client used by checks with `skip_tls_verify`.
static INSECURE_HTTP_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    let builder = Client::builder().redirect(reqwest::redirect::Policy::limited(5));
    #[cfg(any(feature = "native-tls", feature = "rustls"))]
    let builder = builder.danger_accept_invalid_certs(true);
    builder.build().unwrap_or_default()
});

/// Ensure the URL includes a scheme; default to https://
pub(crate) fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Result of a single attempt.
struct Attempt {
    passed: bool,
    detail: String,
    status_code: Option<u16>,
}

/// Run a check, retrying up to `check.retries` extra times.
pub(crate) async fn run_health_check(check: &HealthCheck) -> HealthCheckResult {
    let errors = check.validate();
    if !errors.is_empty() {
        return HealthCheckResult::failed(&check.id, errors.join("; "));
    }

    let max_attempts = check.retries.saturating_add(1);
    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let attempt = match check.check_type {
            HealthCheckType::Http => check_http(check).await,
            HealthCheckType::Tcp => check_tcp(check).await,
        };
        debug!(
            "[Health] {} attempt {attempts}/{max_attempts}: {}",
            check.id, attempt.detail
        );

        if attempt.passed || attempts >= max_attempts {
            // u128 -> u64: elapsed millis for a health check will never exceed u64::MAX
            #[allow(clippy::cast_possible_truncation)]
            let response_time_ms = start.elapsed().as_millis() as u64;
            return HealthCheckResult {
                check_id: check.id.clone(),
                passed: attempt.passed,
                detail: attempt.detail,
                status_code: attempt.status_code,
                response_time_ms,
                attempts,
            };
        }

        sleep(Duration::from_secs(check.retry_interval_secs)).await;
    }
}

async fn check_http(check: &HealthCheck) -> Attempt {
    let url = normalize_url(check.url.as_deref().unwrap_or_default());
    let client = if check.skip_tls_verify {
        &*INSECURE_HTTP_CLIENT
    } else {
        &*HTTP_CLIENT
    };

    match client
        .get(&url)
        .timeout(Duration::from_secs(check.timeout_secs))
        .send()
        .await
    {
        Ok(response) => {
            let status = response.status().as_u16();
            let passed = status == check.expected_status;
            let detail = if passed {
                format!("GET {url} returned HTTP {status}")
            } else {
                format!(
                    "GET {url} returned HTTP {status}, expected {}",
                    check.expected_status
                )
            };
            Attempt {
                passed,
                detail,
                status_code: Some(status),
            }
        }
        Err(e) if e.is_timeout() => Attempt {
            passed: false,
            detail: format!("GET {url} timed out after {}s", check.timeout_secs),
            status_code: None,
        },
        Err(e) => Attempt {
            passed: false,
            detail: format!("GET {url} failed: {e}"),
            status_code: None,
        },
    }
}

async fn check_tcp(check: &HealthCheck) -> Attempt {
    let host = check.host.as_deref().unwrap_or_default();
    let port = check.port.unwrap_or_default();
    let target = check.target();

    match timeout(
        Duration::from_secs(check.timeout_secs),
        TcpStream::connect((host, port)),
    )
    .await
    {
        Ok(Ok(_stream)) => Attempt {
            passed: true,
            detail: format!("connected to {target}"),
            status_code: None,
        },
        Ok(Err(e)) => Attempt {
            passed: false,
            detail: format!("connect to {target} failed: {e}"),
            status_code: None,
        },
        Err(_) => Attempt {
            passed: false,
            detail: format!("connect to {target} timed out after {}s", check.timeout_secs),
            status_code: None,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `count` requests with a fixed status line, then stop.
    async fn serve_status(status_line: &'static str, count: usize) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            for _ in 0..count {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let response =
                    format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        port
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com/health"), "https://example.com/health");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url(" https://example.com "), "https://example.com");
    }

    #[tokio::test]
    async fn test_http_check_expected_status() {
        let port = serve_status("204 No Content", 1).await;
        let check = HealthCheck::http("web", "Web", format!("http://127.0.0.1:{port}/health"))
            .with_expected_status(204);

        let result = run_health_check(&check).await;
        assert!(result.passed, "{}", result.detail);
        assert_eq!(result.status_code, Some(204));
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn test_http_check_wrong_status_retries() {
        let port = serve_status("503 Service Unavailable", 2).await;
        let check = HealthCheck::http("web", "Web", format!("http://127.0.0.1:{port}/"))
            .with_retries(1, 0);

        let result = run_health_check(&check).await;
        assert!(!result.passed);
        assert_eq!(result.status_code, Some(503));
        assert_eq!(result.attempts, 2);
        assert!(result.detail.contains("expected 200"));
    }

    #[tokio::test]
    async fn test_tcp_check_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let result = run_health_check(&HealthCheck::tcp("db", "DB", "127.0.0.1", port)).await;
        assert!(result.passed, "{}", result.detail);
        drop(listener);
    }

    #[tokio::test]
    async fn test_tcp_check_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let check = HealthCheck::tcp("db", "DB", "127.0.0.1", port).with_retries(2, 0);
        let result = run_health_check(&check).await;
        assert!(!result.passed);
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test]
    async fn test_invalid_check_fails_without_probing() {
        let result = run_health_check(&HealthCheck::tcp("db", "DB", "", 0)).await;
        assert!(!result.passed);
        assert!(result.detail.contains("requires a host"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_http_check_real() {
        let result = run_health_check(&HealthCheck::http("g", "Google", "www.google.com")).await;
        assert!(result.passed, "{}", result.detail);
    }
}
