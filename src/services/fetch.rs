use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::{header, Client, StatusCode};
use thiserror::Error;

use crate::core::config::Settings;

/// Fixed User-Agent rotation pool; one is picked per request to vary the
/// client fingerprint.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.82 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/85.0.4183.121 Safari/537.36",
];

#[derive(Debug, Clone)]
pub(crate) struct SessionAuth {
    pub(crate) session_id: String,
    pub(crate) csrf_token: String,
}

impl SessionAuth {
    pub(crate) fn cookie_header(&self) -> String {
        format!("sessionid={}; csrftoken={}", self.session_id, self.csrf_token)
    }
}

/// Retry behavior for one fetch client, passed in at construction instead of
/// mutating a process-wide client.
#[derive(Clone)]
pub(crate) struct RetryPolicy {
    pub(crate) max_retries: u32,
    pub(crate) backoff: Arc<dyn Fn(u32) -> Duration + Send + Sync>,
    pub(crate) retry_status: Arc<dyn Fn(StatusCode) -> bool + Send + Sync>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 10,
            backoff: Arc::new(exponential_backoff),
            retry_status: Arc::new(default_retry_status),
        }
    }
}

pub(crate) fn exponential_backoff(retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(6);
    Duration::from_millis(500u64 << exponent).min(Duration::from_secs(30))
}

pub(crate) fn default_retry_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[derive(Debug, Error)]
pub(crate) enum FetchError {
    #[error("request to {url} failed after {attempts} attempts: {last}")]
    RetriesExhausted { url: String, attempts: u32, last: String },
    #[error("request to {url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("session expired: {url} redirected to the login page")]
    AuthExpired { url: String },
    #[error("failed to read response body from {url}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Seam between the orchestrator and the network, so crawls can run against
/// scripted pages in tests.
#[async_trait]
pub(crate) trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub(crate) struct FetchClient {
    client: Client,
    auth: SessionAuth,
    policy: RetryPolicy,
    login_title_marker: String,
}

impl FetchClient {
    pub(crate) fn new(
        auth: SessionAuth,
        policy: RetryPolicy,
        login_title_marker: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(20))
            .timeout(timeout)
            .build()
            .map_err(|err| anyhow::anyhow!("failed to build HTTP client: {err}"))?;

        Ok(Self { client, auth, policy, login_title_marker })
    }

    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let crawl = settings.crawl();
        Self::new(
            SessionAuth {
                session_id: crawl.session_id.clone(),
                csrf_token: crawl.csrf_token.clone(),
            },
            RetryPolicy { max_retries: crawl.max_retries, ..RetryPolicy::default() },
            crawl.login_title_marker.clone(),
            Duration::from_secs(crawl.request_timeout_seconds),
        )
    }

    fn pick_user_agent(&self) -> &'static str {
        USER_AGENTS.choose(&mut rand::thread_rng()).copied().unwrap_or(USER_AGENTS[0])
    }

    async fn fetch_with_retries(
        &self,
        url: &str,
        extra_headers: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut last_failure = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tracing::warn!(attempt, max_attempts, url, failure = %last_failure, "retrying fetch");
                tokio::time::sleep((self.policy.backoff)(attempt - 1)).await;
            }

            let mut request = self
                .client
                .get(url)
                .header(header::COOKIE, self.auth.cookie_header())
                .header(header::USER_AGENT, self.pick_user_agent());
            for (name, value) in extra_headers {
                request = request.header(*name, *value);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await.map_err(|source| FetchError::Body {
                            url: url.to_string(),
                            source,
                        })?;
                        if login_title_present(&body, &self.login_title_marker) {
                            return Err(FetchError::AuthExpired { url: url.to_string() });
                        }
                        return Ok(body);
                    }
                    if !(self.policy.retry_status)(status) {
                        return Err(FetchError::Status { url: url.to_string(), status });
                    }
                    last_failure = format!("status {status}");
                }
                // reqwest surfaces refused connections, resets and timeouts
                // here; all are transient for our purposes.
                Err(err) => last_failure = err.to_string(),
            }
        }

        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last: last_failure,
        })
    }
}

#[async_trait]
impl Fetch for FetchClient {
    async fn fetch(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, FetchError> {
        self.fetch_with_retries(url, headers).await
    }
}

/// An expired session makes the site answer 200 with its login page instead
/// of the requested content; the page title is the only reliable marker.
fn login_title_present(body: &str, marker: &str) -> bool {
    let lower = body.to_ascii_lowercase();
    let Some(open) = lower.find("<title") else {
        return false;
    };
    let Some(start) = lower[open..].find('>').map(|offset| open + offset + 1) else {
        return false;
    };
    let Some(end) = lower[start..].find("</title>").map(|offset| start + offset) else {
        return false;
    };
    lower[start..end].contains(&marker.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    async fn spawn_server(status_line: &'static str, body: &'static str) -> (SocketAddr, Arc<AtomicUsize>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len(),
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (addr, hits)
    }

    fn test_client(max_retries: u32) -> FetchClient {
        FetchClient::new(
            SessionAuth { session_id: "sid".to_string(), csrf_token: "csrf".to_string() },
            RetryPolicy {
                max_retries,
                backoff: Arc::new(|_| Duration::ZERO),
                retry_status: Arc::new(default_retry_status),
            },
            "Log in".to_string(),
            Duration::from_secs(5),
        )
        .expect("build client")
    }

    #[tokio::test]
    async fn returns_body_on_success() {
        let (addr, hits) = spawn_server("200 OK", "<html><body>listing</body></html>").await;
        let client = test_client(2);

        let body = client
            .fetch_with_retries(&format!("http://{addr}/tests/"), &[])
            .await
            .expect("fetch");

        assert!(body.contains("listing"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn persistent_server_error_stops_at_the_retry_ceiling() {
        let (addr, hits) = spawn_server("503 Service Unavailable", "busy").await;
        let client = test_client(2);

        let err = client
            .fetch_with_retries(&format!("http://{addr}/tests/"), &[])
            .await
            .expect_err("should exhaust retries");

        match err {
            FetchError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let (addr, hits) = spawn_server("404 Not Found", "missing").await;
        let client = test_client(5);

        let err = client
            .fetch_with_retries(&format!("http://{addr}/tests/"), &[])
            .await
            .expect_err("should fail fast");

        match err {
            FetchError::Status { status, .. } => assert_eq!(status, StatusCode::NOT_FOUND),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_redirect_raises_auth_expired_without_retry() {
        let (addr, hits) = spawn_server(
            "200 OK",
            "<html><head><title>Log in | Study4</title></head><body>please sign in</body></html>",
        )
        .await;
        let client = test_client(5);

        let err = client
            .fetch_with_retries(&format!("http://{addr}/tests/"), &[])
            .await
            .expect_err("should detect login page");

        assert!(matches!(err, FetchError::AuthExpired { .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn exponential_backoff_grows_and_caps() {
        assert_eq!(exponential_backoff(1), Duration::from_millis(500));
        assert_eq!(exponential_backoff(2), Duration::from_secs(1));
        assert_eq!(exponential_backoff(5), Duration::from_secs(8));
        assert_eq!(exponential_backoff(40), Duration::from_secs(30));
    }

    #[test]
    fn default_retry_status_covers_server_errors_and_throttling() {
        assert!(default_retry_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(default_retry_status(StatusCode::BAD_GATEWAY));
        assert!(default_retry_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!default_retry_status(StatusCode::NOT_FOUND));
        assert!(!default_retry_status(StatusCode::FORBIDDEN));
    }

    #[test]
    fn login_marker_matches_title_only() {
        let login = "<html><head><title>Log in | Study4</title></head></html>";
        assert!(login_title_present(login, "Log in"));

        let content = "<html><head><title>IELTS Reading</title></head><body>Log in</body></html>";
        assert!(!login_title_present(content, "Log in"));
    }
}
