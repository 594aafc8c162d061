//! HTTP connection with transport-level retry.
//!
//! The connection owns the transport configuration for one remote: the
//! resolved base URL, the shared HTTP client, and the debug sink. It builds
//! absolute URLs, retries transient transport failures with a linearly
//! growing backoff, and routes session-scoped responses through the
//! response parser.
//!
//! Only transport failures retry. Any HTTP response, whatever its status,
//! returns to the caller for classification; errors other than transport
//! propagate on first occurrence.

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as _;
use std::fmt;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result, TransportErrorKind};
use crate::observe::CallLog;
use crate::protocol::parse_response;
use crate::remote::Provider;
use crate::session::Session;

use super::envelope::{HttpRequest, HttpResponse};

// ============================================================================
// Constants
// ============================================================================

/// Maximum transport attempts per request.
const MAX_ATTEMPTS: u32 = 10;

/// Backoff step; the delay before attempt `i + 1` is `i * 100 + 100` ms,
/// growing linearly with no cap.
const RETRY_DELAY_STEP: Duration = Duration::from_millis(100);

/// Content type sent with every request body.
const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

// ============================================================================
// Retry
// ============================================================================

/// Retry policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retry {
    /// Retry transient transport failures up to the attempt budget.
    #[default]
    Transient,
    /// Exactly one attempt.
    None,
}

impl Retry {
    /// Returns the attempt budget for this policy.
    #[inline]
    #[must_use]
    pub fn attempts(self) -> u32 {
        match self {
            Self::Transient => MAX_ATTEMPTS,
            Self::None => 1,
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// HTTP transport layer for one remote.
pub struct Connection {
    /// Canonical provider, used only to specialize error messages.
    provider: Provider,

    /// Resolved base URL relative paths are prefixed with.
    base_url: Url,

    /// Shared HTTP client.
    client: reqwest::Client,

    /// Debug sink receiving per-attempt request/response reports.
    log: CallLog,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("remote", &self.provider.canonical_key())
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connection - Constructor
// ============================================================================

impl Connection {
    /// Creates a connection for the given remote.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn new(provider: Provider, base_url: Url, log: CallLog) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            provider,
            base_url,
            client,
            log,
        })
    }

    /// Returns the resolved base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the canonical provider.
    #[inline]
    #[must_use]
    pub fn provider(&self) -> &Provider {
        &self.provider
    }
}

// ============================================================================
// Connection - Requests
// ============================================================================

impl Connection {
    /// Performs one HTTP request with transport-level retry.
    ///
    /// A relative `path` is prefixed with the resolved base URL; an
    /// absolute URI is used as given. Each attempt is reported to the debug
    /// sink; failed attempts sleep a linearly growing delay before the
    /// next. After the attempt budget is exhausted the final transport
    /// error surfaces with provider-specific remediation text, its
    /// machine-readable kind preserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] after exhausting the retry budget.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        retry: Retry,
    ) -> Result<HttpResponse> {
        let url = self.absolute_url(path)?;
        let payload = body.map(|b| b.to_string());
        let attempts = retry.attempts();

        let mut last_error: Option<reqwest::Error> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                sleep(RETRY_DELAY_STEP * attempt).await;
            }

            match self.attempt(&method, &url, payload.as_deref()).await {
                Ok(response) => {
                    if attempt > 0 {
                        debug!(
                            attempt = attempt + 1,
                            url = %url,
                            "transport recovered after retry"
                        );
                    }
                    return Ok(response);
                }
                Err(error) => {
                    trace!(
                        attempt = attempt + 1,
                        url = %url,
                        error = %error,
                        "transport attempt failed"
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(self.exhausted(attempts, last_error))
    }

    /// Performs a session-scoped request and parses the response.
    ///
    /// A relative `path` is rewritten to `/session/{session_id}{path}`; an
    /// absolute URI is used as given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on exhausted retries, or whatever the
    /// response parser classifies the response as.
    pub async fn request_with_session(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let scoped;
        let path = if is_absolute_uri(path) {
            path
        } else {
            scoped = format!("/session/{}{}", session.id(), leading_slash(path));
            &scoped
        };

        let response = self.request(method, path, body, Retry::Transient).await?;
        parse_response(&response)
    }

    /// Performs one transport attempt, reporting it to the debug sink.
    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        payload: Option<&str>,
    ) -> std::result::Result<HttpResponse, reqwest::Error> {
        let mut headers = Vec::new();
        if payload.is_some() {
            headers.push((CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string()));
        }

        self.log.report_request(&HttpRequest {
            method: method.clone(),
            url: url.clone(),
            headers,
            body: payload.map(str::to_string),
        });

        let mut builder = self.client.request(method.clone(), url.clone());
        if let Some(payload) = payload {
            builder = builder
                .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(payload.to_string());
        }

        let outcome = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect();
            let body = response.text().await?;

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        }
        .await;

        match &outcome {
            Ok(response) => self.log.report_response(Some(response)),
            Err(_) => self.log.report_response(None),
        }

        outcome
    }

    /// Builds the exhaustion error, preserving the final failure kind and
    /// attaching provider remediation for refused connections.
    fn exhausted(&self, attempts: u32, last_error: Option<reqwest::Error>) -> Error {
        let remote = self.provider.canonical_key();
        let kind = last_error
            .as_ref()
            .map(classify_transport_error)
            .unwrap_or(TransportErrorKind::Other);
        let detail = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string());

        let mut message =
            format!("Request to {remote} failed after {attempts} attempt(s): {detail}.");
        if kind == TransportErrorKind::ConnectionRefused {
            message.push(' ');
            message.push_str(self.provider.connect_remediation());
        }

        Error::transport(remote, kind, message)
    }

    /// Prefixes a relative path with the resolved base URL.
    fn absolute_url(&self, path: &str) -> Result<Url> {
        if is_absolute_uri(path) {
            return Url::parse(path)
                .map_err(|e| Error::config(format!("invalid request URI \"{path}\": {e}")));
        }

        let base = self.base_url.as_str().trim_end_matches('/');
        let joined = format!("{base}{}", leading_slash(path));
        Url::parse(&joined)
            .map_err(|e| Error::config(format!("cannot join \"{path}\" onto \"{base}\": {e}")))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Returns `true` if the path is already an absolute URI.
fn is_absolute_uri(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Ensures a path carries a leading slash.
fn leading_slash(path: &str) -> std::borrow::Cow<'_, str> {
    if path.is_empty() || path.starts_with('/') {
        path.into()
    } else {
        format!("/{path}").into()
    }
}

/// Classifies a transport failure into its machine-readable kind.
fn classify_transport_error(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_timeout() {
        return TransportErrorKind::TimedOut;
    }

    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return match io.kind() {
                std::io::ErrorKind::ConnectionRefused => TransportErrorKind::ConnectionRefused,
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe => {
                    TransportErrorKind::ConnectionReset
                }
                std::io::ErrorKind::TimedOut => TransportErrorKind::TimedOut,
                _ => TransportErrorKind::Other,
            };
        }
        source = cause.source();
    }

    if error.is_connect() {
        return TransportErrorKind::ConnectionRefused;
    }

    TransportErrorKind::Other
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::options::Options;

    /// Canned HTTP/1.1 responder that drops the first `failures`
    /// connections before answering, recording every accept and the first
    /// request line of each answered request.
    struct CannedServer {
        url: Url,
        accepted: Arc<AtomicUsize>,
        request_lines: Arc<Mutex<Vec<String>>>,
    }

    async fn canned_server(failures: usize, status: u16, body: &str) -> CannedServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let accepted = Arc::new(AtomicUsize::new(0));
        let request_lines: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let counter = Arc::clone(&accepted);
        let lines = Arc::clone(&request_lines);
        let body = body.to_string();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < failures {
                    // Close before answering; the client sees a transport
                    // failure.
                    drop(socket);
                    continue;
                }

                let mut buf = vec![0u8; 8192];
                let read = socket.read(&mut buf).await.unwrap_or(0);
                let head = String::from_utf8_lossy(&buf[..read]).into_owned();
                lines.lock().push(head);

                let payload = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: {JSON_CONTENT_TYPE}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(payload.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        CannedServer {
            url: Url::parse(&format!("http://127.0.0.1:{port}/")).expect("url"),
            accepted,
            request_lines,
        }
    }

    fn connection(base_url: Url, log: CallLog) -> Connection {
        Connection::new(Provider::ChromeDriver, base_url, log).expect("connection")
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let server = canned_server(2, 200, r#"{"status":0,"value":"ok"}"#).await;
        let conn = connection(server.url.clone(), CallLog::disabled());

        let response = conn
            .request(Method::GET, "/status", None, Retry::Transient)
            .await
            .expect("success after retries");

        assert_eq!(response.status, 200);
        // Two failed attempts plus the successful one.
        assert_eq!(server.accepted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_every_attempt_is_reported_to_the_sink() {
        let requests = Arc::new(AtomicUsize::new(0));
        let responses = Arc::new(AtomicUsize::new(0));
        let absent = Arc::new(AtomicUsize::new(0));

        let request_count = Arc::clone(&requests);
        let response_count = Arc::clone(&responses);
        let absent_count = Arc::clone(&absent);

        let options = Options::new()
            .with_on_request(move |_request| {
                request_count.fetch_add(1, Ordering::SeqCst);
            })
            .with_on_response(move |response| {
                if response.is_some() {
                    response_count.fetch_add(1, Ordering::SeqCst);
                } else {
                    absent_count.fetch_add(1, Ordering::SeqCst);
                }
            });

        let server = canned_server(2, 200, r#"{"status":0,"value":null}"#).await;
        let conn = connection(server.url.clone(), CallLog::new(&options));

        conn.request(Method::GET, "/status", None, Retry::Transient)
            .await
            .expect("success");

        assert_eq!(requests.load(Ordering::SeqCst), 3);
        assert_eq!(responses.load(Ordering::SeqCst), 1);
        assert_eq!(absent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_attempt_budget() {
        // Every connection is dropped before answering.
        let server = canned_server(usize::MAX, 200, "").await;
        let conn = connection(server.url.clone(), CallLog::disabled());

        let err = conn
            .request(Method::GET, "/status", None, Retry::Transient)
            .await
            .expect_err("exhaustion");

        assert_eq!(server.accepted.load(Ordering::SeqCst), 10);
        match err {
            Error::Transport { kind, remote, .. } => {
                assert_eq!(remote, "chromedriver");
                // The final failure's machine kind is preserved.
                assert!(matches!(
                    kind,
                    TransportErrorKind::ConnectionReset | TransportErrorKind::Other
                ));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_opt_out_makes_exactly_one_attempt() {
        let server = canned_server(usize::MAX, 200, "").await;
        let conn = connection(server.url.clone(), CallLog::disabled());

        let err = conn
            .request(Method::GET, "/status", None, Retry::None)
            .await
            .expect_err("failure");

        assert!(err.is_transport());
        assert_eq!(server.accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_connection_carries_remediation() {
        // Bind then drop to obtain a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let url = Url::parse(&format!("http://127.0.0.1:{port}/")).expect("url");
        let conn = connection(url, CallLog::disabled());

        let err = conn
            .request(Method::GET, "/status", None, Retry::None)
            .await
            .expect_err("refused");

        match &err {
            Error::Transport { kind, .. } => {
                assert_eq!(*kind, TransportErrorKind::ConnectionRefused);
            }
            other => panic!("expected transport error, got {other:?}"),
        }
        assert!(err.to_string().contains("chromedriver is not running"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_linearly() {
        let server = canned_server(3, 200, r#"{"status":0,"value":null}"#).await;

        let accept_times: Arc<Mutex<Vec<tokio::time::Instant>>> =
            Arc::new(Mutex::new(Vec::new()));
        let times = Arc::clone(&accept_times);

        let options = Options::new().with_on_request(move |_request| {
            times.lock().push(tokio::time::Instant::now());
        });

        let conn = connection(server.url.clone(), CallLog::new(&options));
        conn.request(Method::GET, "/status", None, Retry::Transient)
            .await
            .expect("success");

        let times = accept_times.lock();
        assert_eq!(times.len(), 4);
        for (i, window) in times.windows(2).enumerate() {
            let gap = window[1] - window[0];
            let floor = RETRY_DELAY_STEP * (i as u32 + 1);
            assert!(gap >= floor, "attempt {i}: gap {gap:?} below {floor:?}");
        }
    }

    #[tokio::test]
    async fn test_relative_path_is_prefixed_with_base() {
        let server = canned_server(0, 200, r#"{"status":0,"value":null}"#).await;
        let base = Url::parse(&format!(
            "http://127.0.0.1:{}/wd/hub",
            server.url.port().expect("port")
        ))
        .expect("url");
        let conn = connection(base, CallLog::disabled());

        conn.request(Method::GET, "/status", None, Retry::None)
            .await
            .expect("success");

        let lines = server.request_lines.lock();
        assert!(lines[0].starts_with("GET /wd/hub/status HTTP/1.1"), "{}", lines[0]);
    }

    #[tokio::test]
    async fn test_absolute_uri_bypasses_base() {
        let server = canned_server(0, 200, r#"{"status":0,"value":null}"#).await;
        // Base points at a dead port; the absolute URI wins.
        let conn = connection(
            Url::parse("http://127.0.0.1:1/").expect("url"),
            CallLog::disabled(),
        );

        let target = format!("{}status", server.url);
        conn.request(Method::GET, &target, None, Retry::None)
            .await
            .expect("success");

        assert_eq!(server.accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_body_carries_json_content_type() {
        let server = canned_server(0, 200, r#"{"status":0,"value":null}"#).await;
        let conn = connection(server.url.clone(), CallLog::disabled());

        conn.request(
            Method::POST,
            "/session",
            Some(json!({"desiredCapabilities": {}})),
            Retry::None,
        )
        .await
        .expect("success");

        let lines = server.request_lines.lock();
        let head = lines[0].to_ascii_lowercase();
        assert!(head.contains("content-type: application/json;charset=utf-8"), "{head}");
        assert!(lines[0].contains(r#"{"desiredCapabilities":{}}"#));
    }

    #[tokio::test]
    async fn test_session_scoped_path_rewrite() {
        let server = canned_server(0, 200, r#"{"status":0,"value":"http://x/"}"#).await;
        let conn = connection(server.url.clone(), CallLog::disabled());
        let session = Session::new("abc-123", Default::default());

        let value = conn
            .request_with_session(&session, Method::GET, "/url", None)
            .await
            .expect("success");

        assert_eq!(value, Value::from("http://x/"));

        let lines = server.request_lines.lock();
        assert!(
            lines[0].starts_with("GET /session/abc-123/url HTTP/1.1"),
            "{}",
            lines[0]
        );
    }

    #[tokio::test]
    async fn test_session_request_routes_errors_through_parser() {
        let body = r#"{"status":7,"value":{"message":"no such element"}}"#;
        let server = canned_server(0, 200, body).await;
        let conn = connection(server.url.clone(), CallLog::disabled());
        let session = Session::new("abc", Default::default());

        let err = conn
            .request_with_session(&session, Method::GET, "/element", None)
            .await
            .expect_err("semantic error");

        assert!(err.is_wait_retryable());
        assert!(err.to_string().contains("no such element"));
    }

    #[test]
    fn test_retry_attempt_budgets() {
        assert_eq!(Retry::Transient.attempts(), 10);
        assert_eq!(Retry::None.attempts(), 1);
    }

    #[test]
    fn test_leading_slash_normalization() {
        assert_eq!(leading_slash("/status"), "/status");
        assert_eq!(leading_slash("status"), "/status");
        assert_eq!(leading_slash(""), "");
    }
}
