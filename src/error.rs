//! Error types for the JSON-Wire client runtime.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use jsonwire::{Result, Error};
//!
//! async fn example(driver: &Driver) -> Result<()> {
//!     let value = driver.request_json(Method::GET, "/url", None).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Taxonomy
//!
//! | Category | Variant | Raised by |
//! |----------|---------|-----------|
//! | Configuration | [`Error::Config`] | Remote resolver, before any network call |
//! | Transport | [`Error::Transport`] | Connection, after the retry budget is exhausted |
//! | Protocol | [`Error::InvalidRequest`] | Response parser, HTTP 4xx |
//! | Command | [`Error::CommandFailure`] | Response parser, HTTP 5xx |
//! | Semantic | [`Error::Semantic`] | Response parser, HTTP 200 with nonzero wire status |
//! | Unknown | [`Error::UnknownStatus`] | Response parser, unclassifiable HTTP status |
//! | Assertion | [`Error::Assertion`] | Caller probes, retryable in [`wait_for`](crate::wait_for) |
//! | External | [`Error::Json`], [`Error::Io`] | Serialization and IO layers |
//!
//! Every variant exposes a stable machine-readable [`ErrorKind`] via
//! [`Error::kind()`] so callers can branch without string matching.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when required options or credentials are missing or invalid.
    /// Always raised before any network call.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Transport failure after the retry budget is exhausted.
    ///
    /// The message carries provider-specific remediation guidance; the
    /// original machine-readable failure classification is preserved in
    /// `kind`, not folded into the message.
    #[error("{message}")]
    Transport {
        /// Canonical remote key the request was aimed at.
        remote: String,
        /// Machine-readable classification of the final transport failure.
        kind: TransportErrorKind,
        /// Human-readable message with remediation guidance.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The server rejected the request outright (HTTP 4xx).
    #[error("Invalid request (HTTP {status}): {body}")]
    InvalidRequest {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The server failed while executing a command (HTTP 5xx).
    ///
    /// Carries the upstream failure text, including any server-side class
    /// name and rendered stack trace.
    #[error("Command failure: {message}")]
    CommandFailure {
        /// Composed failure text from the response body.
        message: String,
    },

    /// A well-formed response carrying a nonzero wire status.
    #[error("{kind}: {message}")]
    Semantic {
        /// Stable kind translated from the wire status table.
        kind: SemanticErrorKind,
        /// Server-provided message, with any stack trace appended.
        message: String,
    },

    /// HTTP status outside every recognized band.
    #[error("Unexpected HTTP status {status}: {body}")]
    UnknownStatus {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    // ========================================================================
    // Probe Errors
    // ========================================================================
    /// A caller-level assertion failed.
    ///
    /// Probes passed to [`wait_for`](crate::wait_for) raise this kind for
    /// expected-transient conditions; the combinator treats it as retryable.
    #[error("Assertion failed: {message}")]
    Assertion {
        /// Description of the failed assertion.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(
        remote: impl Into<String>,
        kind: TransportErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            remote: remote.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates an invalid-request error.
    #[inline]
    pub fn invalid_request(status: u16, body: impl Into<String>) -> Self {
        Self::InvalidRequest {
            status,
            body: body.into(),
        }
    }

    /// Creates a command-failure error.
    #[inline]
    pub fn command_failure(message: impl Into<String>) -> Self {
        Self::CommandFailure {
            message: message.into(),
        }
    }

    /// Creates a semantic error.
    #[inline]
    pub fn semantic(kind: SemanticErrorKind, message: impl Into<String>) -> Self {
        Self::Semantic {
            kind,
            message: message.into(),
        }
    }

    /// Creates an unknown-status error.
    #[inline]
    pub fn unknown_status(status: u16, body: impl Into<String>) -> Self {
        Self::UnknownStatus {
            status,
            body: body.into(),
        }
    }

    /// Creates an assertion error.
    #[inline]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns the stable machine-readable kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Configuration,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::CommandFailure { .. } => ErrorKind::CommandFailure,
            Self::Semantic { kind, .. } => ErrorKind::Semantic(*kind),
            Self::UnknownStatus { .. } => ErrorKind::UnknownStatus,
            Self::Assertion { .. } => ErrorKind::AssertionFailure,
            Self::Json(_) => ErrorKind::Serialization,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns `true` if this is a transport error.
    #[inline]
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns `true` if this error is in the fixed retryable set of the
    /// [`wait_for`](crate::wait_for) polling combinator.
    #[must_use]
    pub fn is_wait_retryable(&self) -> bool {
        match self {
            Self::Semantic { kind, .. } => kind.is_wait_retryable(),
            Self::Assertion { .. } => true,
            _ => false,
        }
    }
}

// ============================================================================
// ErrorKind
// ============================================================================

/// Stable machine-readable error classification.
///
/// Exposed via [`Error::kind()`] so callers branch on classification
/// instead of matching message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure (retried inside Connection before surfacing).
    Transport,
    /// Missing or invalid configuration; fatal before any network call.
    Configuration,
    /// HTTP 4xx.
    InvalidRequest,
    /// HTTP 5xx.
    CommandFailure,
    /// HTTP 200 with a nonzero wire status.
    Semantic(SemanticErrorKind),
    /// HTTP status outside every recognized band.
    UnknownStatus,
    /// Caller-level assertion failure.
    AssertionFailure,
    /// JSON (de)serialization failure.
    Serialization,
    /// IO failure.
    Io,
}

// ============================================================================
// TransportErrorKind
// ============================================================================

/// Machine-readable classification of a transport failure.
///
/// Preserved on [`Error::Transport`] after the retry budget is exhausted so
/// callers can distinguish a refused connection from a timeout without
/// parsing the remediation text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The remote end refused the TCP connection.
    ConnectionRefused,
    /// The connection or request timed out.
    TimedOut,
    /// The connection was reset or closed mid-request.
    ConnectionReset,
    /// Any other transport-level failure.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConnectionRefused => "connection refused",
            Self::TimedOut => "timed out",
            Self::ConnectionReset => "connection reset",
            Self::Other => "transport failure",
        };
        f.write_str(name)
    }
}

// ============================================================================
// SemanticErrorKind
// ============================================================================

/// Stable error kinds for nonzero JSON-Wire response statuses.
///
/// The numeric mapping is fixed by the protocol and must match the remote
/// end exactly. Statuses outside the table map to
/// [`SemanticErrorKind::UnknownSeleniumError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticErrorKind {
    /// Status 6.
    NoSuchDriver,
    /// Status 7.
    NoSuchElement,
    /// Status 8.
    NoSuchFrame,
    /// Status 9.
    UnknownCommand,
    /// Status 10.
    StaleElementReference,
    /// Status 11.
    ElementNotVisible,
    /// Status 12.
    InvalidElementState,
    /// Status 13.
    UnknownError,
    /// Status 15.
    ElementIsNotSelectable,
    /// Status 17.
    JavaScriptError,
    /// Status 19.
    XPathLookupError,
    /// Status 21.
    Timeout,
    /// Status 23.
    NoSuchWindow,
    /// Status 24.
    InvalidCookieDomain,
    /// Status 25.
    UnableToSetCookie,
    /// Status 26.
    UnexpectedAlertOpen,
    /// Status 27.
    NoAlertOpenError,
    /// Status 28.
    ScriptTimeout,
    /// Status 30.
    IMENotAvailable,
    /// Status 31.
    IMEEngineActivationFailed,
    /// Status 32.
    InvalidSelector,
    /// Status 33.
    SessionNotCreatedException,
    /// Status 34.
    MoveTargetOutOfBounds,
    /// Fallback for statuses outside the fixed table.
    UnknownSeleniumError,
}

impl SemanticErrorKind {
    /// Translates a wire status through the fixed numeric table.
    ///
    /// Unrecognized statuses fall back to
    /// [`SemanticErrorKind::UnknownSeleniumError`].
    #[must_use]
    pub fn from_wire_status(status: i64) -> Self {
        match status {
            6 => Self::NoSuchDriver,
            7 => Self::NoSuchElement,
            8 => Self::NoSuchFrame,
            9 => Self::UnknownCommand,
            10 => Self::StaleElementReference,
            11 => Self::ElementNotVisible,
            12 => Self::InvalidElementState,
            13 => Self::UnknownError,
            15 => Self::ElementIsNotSelectable,
            17 => Self::JavaScriptError,
            19 => Self::XPathLookupError,
            21 => Self::Timeout,
            23 => Self::NoSuchWindow,
            24 => Self::InvalidCookieDomain,
            25 => Self::UnableToSetCookie,
            26 => Self::UnexpectedAlertOpen,
            27 => Self::NoAlertOpenError,
            28 => Self::ScriptTimeout,
            30 => Self::IMENotAvailable,
            31 => Self::IMEEngineActivationFailed,
            32 => Self::InvalidSelector,
            33 => Self::SessionNotCreatedException,
            34 => Self::MoveTargetOutOfBounds,
            _ => Self::UnknownSeleniumError,
        }
    }

    /// Returns the protocol name of this kind.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NoSuchDriver => "NoSuchDriver",
            Self::NoSuchElement => "NoSuchElement",
            Self::NoSuchFrame => "NoSuchFrame",
            Self::UnknownCommand => "UnknownCommand",
            Self::StaleElementReference => "StaleElementReference",
            Self::ElementNotVisible => "ElementNotVisible",
            Self::InvalidElementState => "InvalidElementState",
            Self::UnknownError => "UnknownError",
            Self::ElementIsNotSelectable => "ElementIsNotSelectable",
            Self::JavaScriptError => "JavaScriptError",
            Self::XPathLookupError => "XPathLookupError",
            Self::Timeout => "Timeout",
            Self::NoSuchWindow => "NoSuchWindow",
            Self::InvalidCookieDomain => "InvalidCookieDomain",
            Self::UnableToSetCookie => "UnableToSetCookie",
            Self::UnexpectedAlertOpen => "UnexpectedAlertOpen",
            Self::NoAlertOpenError => "NoAlertOpenError",
            Self::ScriptTimeout => "ScriptTimeout",
            Self::IMENotAvailable => "IMENotAvailable",
            Self::IMEEngineActivationFailed => "IMEEngineActivationFailed",
            Self::InvalidSelector => "InvalidSelector",
            Self::SessionNotCreatedException => "SessionNotCreatedException",
            Self::MoveTargetOutOfBounds => "MoveTargetOutOfBounds",
            Self::UnknownSeleniumError => "UnknownSeleniumError",
        }
    }

    /// Returns `true` if this kind is in the fixed retryable set of the
    /// polling combinator.
    #[inline]
    #[must_use]
    pub fn is_wait_retryable(self) -> bool {
        matches!(
            self,
            Self::NoSuchElement
                | Self::ElementNotVisible
                | Self::ElementIsNotSelectable
                | Self::NoAlertOpenError
        )
    }
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind as IoErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::config("missing credentials");
        assert_eq!(err.to_string(), "Configuration error: missing credentials");
    }

    #[test]
    fn test_semantic_display_includes_kind_name() {
        let err = Error::semantic(SemanticErrorKind::NoSuchElement, "not found");
        assert_eq!(err.to_string(), "NoSuchElement: not found");
    }

    #[test]
    fn test_transport_preserves_kind() {
        let err = Error::transport(
            "chromedriver",
            TransportErrorKind::ConnectionRefused,
            "could not reach chromedriver",
        );

        assert!(err.is_transport());
        match err {
            Error::Transport { kind, remote, .. } => {
                assert_eq!(kind, TransportErrorKind::ConnectionRefused);
                assert_eq!(remote, "chromedriver");
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(Error::config("x").kind(), ErrorKind::Configuration);
        assert_eq!(
            Error::invalid_request(404, "x").kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(
            Error::command_failure("x").kind(),
            ErrorKind::CommandFailure
        );
        assert_eq!(
            Error::unknown_status(700, "x").kind(),
            ErrorKind::UnknownStatus
        );
        assert_eq!(Error::assertion("x").kind(), ErrorKind::AssertionFailure);
        assert_eq!(
            Error::semantic(SemanticErrorKind::Timeout, "x").kind(),
            ErrorKind::Semantic(SemanticErrorKind::Timeout)
        );
    }

    #[test]
    fn test_wire_status_table() {
        let table = [
            (6, "NoSuchDriver"),
            (7, "NoSuchElement"),
            (8, "NoSuchFrame"),
            (9, "UnknownCommand"),
            (10, "StaleElementReference"),
            (11, "ElementNotVisible"),
            (12, "InvalidElementState"),
            (13, "UnknownError"),
            (15, "ElementIsNotSelectable"),
            (17, "JavaScriptError"),
            (19, "XPathLookupError"),
            (21, "Timeout"),
            (23, "NoSuchWindow"),
            (24, "InvalidCookieDomain"),
            (25, "UnableToSetCookie"),
            (26, "UnexpectedAlertOpen"),
            (27, "NoAlertOpenError"),
            (28, "ScriptTimeout"),
            (30, "IMENotAvailable"),
            (31, "IMEEngineActivationFailed"),
            (32, "InvalidSelector"),
            (33, "SessionNotCreatedException"),
            (34, "MoveTargetOutOfBounds"),
        ];

        for (status, name) in table {
            assert_eq!(SemanticErrorKind::from_wire_status(status).name(), name);
        }
    }

    #[test]
    fn test_wire_status_fallback() {
        assert_eq!(
            SemanticErrorKind::from_wire_status(99),
            SemanticErrorKind::UnknownSeleniumError
        );
        assert_eq!(
            SemanticErrorKind::from_wire_status(-1),
            SemanticErrorKind::UnknownSeleniumError
        );
        // Gaps in the table fall back too.
        assert_eq!(
            SemanticErrorKind::from_wire_status(14),
            SemanticErrorKind::UnknownSeleniumError
        );
        assert_eq!(
            SemanticErrorKind::from_wire_status(29),
            SemanticErrorKind::UnknownSeleniumError
        );
    }

    #[test]
    fn test_wait_retryable_set() {
        let retryable = [
            SemanticErrorKind::NoSuchElement,
            SemanticErrorKind::ElementNotVisible,
            SemanticErrorKind::ElementIsNotSelectable,
            SemanticErrorKind::NoAlertOpenError,
        ];
        for kind in retryable {
            assert!(Error::semantic(kind, "x").is_wait_retryable());
        }

        assert!(Error::assertion("probe failed").is_wait_retryable());

        assert!(
            !Error::semantic(SemanticErrorKind::StaleElementReference, "x").is_wait_retryable()
        );
        assert!(!Error::semantic(SemanticErrorKind::Timeout, "x").is_wait_retryable());
        assert!(!Error::config("x").is_wait_retryable());
        assert!(
            !Error::transport("chromedriver", TransportErrorKind::Other, "x").is_wait_retryable()
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(IoErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }
}
