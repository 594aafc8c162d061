//! HTTP request and response envelopes.
//!
//! Transport-level types, opaque to everything above the connection layer.
//! The response envelope is what the response parser classifies.

// ============================================================================
// Imports
// ============================================================================

use reqwest::Method;
use url::Url;

// ============================================================================
// HttpRequest
// ============================================================================

/// One outgoing HTTP request, as reported to the debug sink.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,

    /// Absolute request URL.
    pub url: Url,

    /// Headers sent with the request.
    pub headers: Vec<(String, String)>,

    /// Serialized JSON body, if any.
    pub body: Option<String>,
}

// ============================================================================
// HttpResponse
// ============================================================================

/// One incoming HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,

    /// Response headers.
    pub headers: Vec<(String, String)>,

    /// Raw response body text.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for a 2xx status.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// Tests
// ============================================================================
