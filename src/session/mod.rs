//! Session type and bootstrap.
//!
//! A [`Session`] is a server-side handle: the `sessionID` plus the
//! capabilities the server negotiated. Bootstrap either adopts a session
//! supplied via [`Options`] verbatim (no network call) or negotiates one
//! with `POST /session`. Bootstrap failures are fatal and never retried
//! beyond the connection's internal transport retry.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `harness` | Local test-harness companion management |

// ============================================================================
// Submodules
// ============================================================================

/// Local test-harness companion process management.
pub mod harness;

// ============================================================================
// Imports
// ============================================================================

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::options::Capabilities;
use crate::remote::{Provider, ResolvedRemote};
use crate::transport::{Connection, HttpResponse, Retry};
use crate::protocol::WireBody;

pub use harness::TeardownHook;

// ============================================================================
// Session
// ============================================================================

/// A server-side session handle.
///
/// Created at most once per Driver lifetime unless supplied via
/// [`Options`](crate::Options); immutable thereafter and shared by
/// reference with every resource object spawned from the same Driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Server-assigned session identifier.
    #[serde(rename = "sessionId")]
    session_id: String,

    /// Capabilities the server negotiated.
    #[serde(default)]
    capabilities: Capabilities,
}

impl Session {
    /// Creates a session handle.
    #[inline]
    #[must_use]
    pub fn new(session_id: impl Into<String>, capabilities: Capabilities) -> Self {
        Self {
            session_id: session_id.into(),
            capabilities,
        }
    }

    /// Returns the session identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.session_id
    }

    /// Returns the negotiated capabilities.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Creates or adopts a session for the resolved remote.
///
/// A session supplied via Options is adopted verbatim with no network
/// call. Otherwise the harness is ensured for the local test-harness
/// provider, then `POST /session` negotiates a fresh session. Returns the
/// session and, when a harness was spawned, its teardown hook.
///
/// # Errors
///
/// - [`Error::Config`] on a 401 from a hosted provider (credential
///   mismatch, naming the exact option/environment pair).
/// - [`Error::UnknownStatus`] on any other non-200 response, carrying the
///   raw body.
/// - A semantic error translated through the taxonomy when the wire status
///   is nonzero.
pub(crate) async fn negotiate(
    remote: &ResolvedRemote,
    connection: &Connection,
) -> Result<(Session, Option<TeardownHook>)> {
    let options = &remote.options;

    if let Some(session) = &options.session {
        debug!(session_id = %session.id(), "adopting existing session");
        return Ok((session.clone(), None));
    }

    let mut teardown = None;
    if remote.provider == Provider::TaxiRank {
        teardown = harness::ensure_running(&remote.base_url, options).await?;
    }

    let mut body = json!({ "desiredCapabilities": options.desired });
    if let Some(required) = &options.required {
        body["requiredCapabilities"] = serde_json::to_value(required)?;
    }

    let response = connection
        .request(Method::POST, "/session", Some(body), Retry::Transient)
        .await?;

    if response.status != 200 {
        return Err(bootstrap_failure(&remote.provider, &response));
    }

    let wire: WireBody = serde_json::from_str(&response.body)?;
    if !wire.is_success() {
        return Err(wire.to_semantic_error());
    }

    let session_id = wire
        .session_id
        .ok_or_else(|| Error::command_failure("session response carried no sessionId"))?;
    let capabilities = match wire.value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Capabilities::default(),
    };

    let session = Session::new(session_id, capabilities);
    info!(
        session_id = %session.id(),
        remote = remote.provider.canonical_key(),
        "session created"
    );

    Ok((session, teardown))
}

/// Builds the error for a non-200 session-creation response.
fn bootstrap_failure(provider: &Provider, response: &HttpResponse) -> Error {
    if response.status == 401
        && let Some(pair) = provider.credential_pair_names()
    {
        return Error::config(format!(
            "{} rejected the provided credentials (HTTP 401). Check {}.",
            provider.canonical_key(),
            pair
        ));
    }

    Error::unknown_status(response.status, &*response.body)
}

// ============================================================================
// Tests
// ============================================================================
