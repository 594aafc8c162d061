//! WebDriver JSON-Wire protocol client runtime.
//!
//! This library is the runtime under a WebDriver client: given a symbolic
//! or literal remote identifier it resolves connection details, negotiates
//! a server-side session, issues retried HTTP requests, classifies
//! responses and errors into a stable taxonomy, and instruments every call
//! for observability.
//!
//! # Architecture
//!
//! ```text
//! caller
//!   │
//!   ▼
//! Resolver ──► Connection + Session Bootstrap ──► live session
//!                   │
//!                   ▼
//! Driver.request_json ──► Connection ──► Response Parser
//!                   │
//!                   ▼
//! CallLog (instrumentation, buffering) ◄── wait_for (polling)
//! ```
//!
//! Resource-specific command surfaces (elements, windows, cookies, ...)
//! build on a single primitive: make a session-scoped or session-less
//! request, get back a parsed value or a typed error.
//!
//! # Quick Start
//!
//! ```no_run
//! use jsonwire::{Driver, Method, Options};
//!
//! #[tokio::main]
//! async fn main() -> jsonwire::Result<()> {
//!     // Resolve a symbolic remote; credentials and ports merge in from
//!     // the environment and optional override files.
//!     let driver = Driver::connect("chromedriver", Options::new())?;
//!
//!     // The session is negotiated lazily, at most once.
//!     let url = driver.request_json(Method::GET, "/url", None).await?;
//!     println!("current url: {url}");
//!
//!     driver.dispose().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`driver`] | Driver coordinator and the request primitive |
//! | [`error`] | Error taxonomy and [`Result`] alias |
//! | [`observe`] | Call instrumentation and the buffered debug sink |
//! | [`options`] | Configuration bag and hooks |
//! | [`protocol`] | Wire body types and response classification |
//! | [`remote`] | Provider aliases and remote resolution |
//! | [`session`] | Session type, bootstrap, harness management |
//! | [`transport`] | HTTP envelopes and the retrying connection |
//! | [`wait`] | Polling retry combinator |

// ============================================================================
// Modules
// ============================================================================

/// Driver coordinator and the session-scoped request primitive.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Call instrumentation and the buffered debug sink.
pub mod observe;

/// Configuration options and callback hooks.
pub mod options;

/// JSON-Wire protocol types and response classification.
pub mod protocol;

/// Remote resolution: provider aliases, environment and file merging.
pub mod remote;

/// Session type and bootstrap.
pub mod session;

/// HTTP transport layer.
pub mod transport;

/// Polling retry combinator.
pub mod wait;

// ============================================================================
// Re-exports
// ============================================================================

// Driver types
pub use driver::Driver;

// Error types
pub use error::{Error, ErrorKind, Result, SemanticErrorKind, TransportErrorKind};

// Instrumentation types
pub use observe::{CallEvent, CallLog, CallOutcome};

// Option types
pub use options::{BrowserSelection, Capabilities, Options};

// Protocol types
pub use protocol::{WireBody, parse_response};

// Remote types
pub use remote::{Provider, ResolvedRemote, resolve};

// Session types
pub use session::Session;

// Transport types
pub use transport::{Connection, HttpRequest, HttpResponse, Retry};

// Polling combinator
pub use wait::{Truthy, wait_for, wait_for_default};

// The request method type, re-exported for callers of the request
// primitive.
pub use reqwest::Method;
