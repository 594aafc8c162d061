//! Driver coordinator.
//!
//! The [`Driver`] ties the runtime together: it resolves the remote, owns
//! the [`Connection`] and the debug sink, creates the [`Session`] lazily
//! at most once (or adopts one supplied via Options), and exposes the
//! single session-scoped request primitive every resource method funnels
//! through.
//!
//! # Example
//!
//! ```no_run
//! use jsonwire::{Driver, Method, Options};
//!
//! # async fn example() -> jsonwire::Result<()> {
//! let driver = Driver::connect("chromedriver", Options::new())?;
//!
//! let url = driver
//!     .request_json(Method::GET, "/url", None)
//!     .await?;
//! println!("current url: {url}");
//!
//! driver.dispose().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use reqwest::Method;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::Result;
use crate::observe::CallLog;
use crate::options::Options;
use crate::protocol::parse_response;
use crate::remote::{self, ResolvedRemote};
use crate::session::{self, Session, TeardownHook};
use crate::transport::{Connection, Retry};

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the driver.
struct DriverInner {
    /// Resolved remote: provider, base URL, merged options.
    remote: ResolvedRemote,

    /// Transport layer.
    connection: Connection,

    /// Debug sink shared by everything under this driver.
    log: CallLog,

    /// The session, created at most once.
    session: OnceCell<Session>,

    /// Teardown hooks run on dispose.
    teardown: Mutex<Vec<TeardownHook>>,

    /// Whether dispose already ran.
    disposed: AtomicBool,
}

// ============================================================================
// Driver
// ============================================================================

/// JSON-Wire client driver.
///
/// Cheap to clone; clones share the connection, session, and debug sink.
/// All calls through one driver serialize through its single connection
/// and single session; the runtime never issues concurrent requests on its
/// own behalf.
#[derive(Clone)]
pub struct Driver {
    inner: Arc<DriverInner>,
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("remote", &self.inner.remote.provider.canonical_key())
            .field("base_url", &self.inner.remote.base_url.as_str())
            .field("session", &self.inner.session.get().map(Session::id))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Driver - Constructors
// ============================================================================

impl Driver {
    /// Resolves a remote identifier and connects a driver to it.
    ///
    /// Resolution merges the environment and override files into the
    /// options and validates provider requirements; no network call is
    /// made. The session is created lazily on the first session-scoped
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for an unrecognized
    /// remote or missing credentials.
    pub fn connect(identifier: &str, options: Options) -> Result<Self> {
        let remote = remote::resolve(identifier, options)?;
        Self::from_resolved(remote)
    }

    /// Connects a driver to an already-resolved remote.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the transport
    /// cannot be built.
    pub fn from_resolved(remote: ResolvedRemote) -> Result<Self> {
        let log = CallLog::new(&remote.options);
        let connection = Connection::new(
            remote.provider.clone(),
            remote.base_url.clone(),
            log.clone(),
        )?;

        info!(
            remote = remote.provider.canonical_key(),
            url = %remote.base_url,
            "driver connected"
        );

        Ok(Self {
            inner: Arc::new(DriverInner {
                remote,
                connection,
                log,
                session: OnceCell::new(),
                teardown: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        })
    }
}

// ============================================================================
// Driver - Session
// ============================================================================

impl Driver {
    /// Returns the session, creating or adopting it on first use.
    ///
    /// The session is created at most once per driver lifetime; concurrent
    /// first calls serialize on the underlying cell.
    ///
    /// # Errors
    ///
    /// Whatever session bootstrap fails with; bootstrap failures are fatal
    /// and never retried.
    pub async fn session(&self) -> Result<&Session> {
        self.inner
            .session
            .get_or_try_init(|| async {
                let (session, teardown) =
                    session::negotiate(&self.inner.remote, &self.inner.connection).await?;
                if let Some(hook) = teardown {
                    self.inner.teardown.lock().push(hook);
                }
                Ok(session)
            })
            .await
    }
}

// ============================================================================
// Driver - Requests
// ============================================================================

impl Driver {
    /// Performs one session-scoped request and returns its parsed value.
    ///
    /// This is the raw request primitive resource methods funnel through.
    /// It is deliberately not instrumented; callers wrap their operations
    /// with [`CallLog::call`] themselves.
    ///
    /// # Errors
    ///
    /// Whatever session bootstrap, the transport, or the response parser
    /// fails with.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value> {
        let session = self.session().await?;
        self.inner
            .connection
            .request_with_session(session, method, path, body)
            .await
    }

    /// Queries the remote end's status (`GET /status`), session-less.
    ///
    /// # Errors
    ///
    /// Whatever the transport or response parser fails with.
    pub async fn status(&self) -> Result<Value> {
        let log = self.inner.log.clone();
        log.call("Driver", "status", Value::Null, async {
            let response = self
                .inner
                .connection
                .request(Method::GET, "/status", None, Retry::Transient)
                .await?;
            parse_response(&response)
        })
        .await
    }

    /// Lists the remote end's active sessions (`GET /sessions`),
    /// session-less.
    ///
    /// # Errors
    ///
    /// Whatever the transport or response parser fails with.
    pub async fn sessions(&self) -> Result<Value> {
        let log = self.inner.log.clone();
        log.call("Driver", "sessions", Value::Null, async {
            let response = self
                .inner
                .connection
                .request(Method::GET, "/sessions", None, Retry::Transient)
                .await?;
            parse_response(&response)
        })
        .await
    }

    /// Deletes the session (if one was created) and runs registered
    /// teardown hooks.
    ///
    /// Idempotent: only the first call issues the final request. Nothing
    /// in flight is interrupted.
    ///
    /// # Errors
    ///
    /// Whatever the final delete request fails with; teardown hooks run
    /// regardless.
    pub async fn dispose(&self) -> Result<()> {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            debug!("dispose already ran");
            return Ok(());
        }

        let log = self.inner.log.clone();
        let result = log
            .call("Driver", "dispose", Value::Null, async {
                if let Some(session) = self.inner.session.get() {
                    let path = format!("/session/{}", session.id());
                    let response = self
                        .inner
                        .connection
                        .request(Method::DELETE, &path, None, Retry::Transient)
                        .await?;
                    parse_response(&response)?;
                }
                Ok(Value::Null)
            })
            .await;

        let hooks: Vec<TeardownHook> = self.inner.teardown.lock().drain(..).collect();
        for hook in hooks {
            hook();
        }

        result.map(|_| ())
    }
}

// ============================================================================
// Driver - Accessors
// ============================================================================

impl Driver {
    /// Returns the debug sink, for composing with
    /// [`wait_for`](crate::wait_for) and instrumenting resource methods.
    #[inline]
    #[must_use]
    pub fn call_log(&self) -> &CallLog {
        &self.inner.log
    }

    /// Returns the transport layer.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Returns the canonical remote key.
    #[inline]
    #[must_use]
    pub fn remote_key(&self) -> &'static str {
        self.inner.remote.provider.canonical_key()
    }
}

// ============================================================================
// Tests
// ============================================================================
