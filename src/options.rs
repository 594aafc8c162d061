//! Driver configuration options.
//!
//! Provides the configuration bag consumed by the remote resolver, session
//! bootstrap, and call instrumentation. Every field is optional; unset
//! credential and port fields are filled from the environment and the
//! optional override files during remote resolution (see
//! [`remote::resolve`](crate::remote::resolve)).
//!
//! # Example
//!
//! ```ignore
//! use jsonwire::{BrowserSelection, Options};
//!
//! let options = Options::new()
//!     .with_capability("javascriptEnabled", true)
//!     .with_browser(BrowserSelection::new("firefox").with_version("120"))
//!     .with_debug();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use url::Url;

use crate::observe::CallEvent;
use crate::session::Session;
use crate::transport::{HttpRequest, HttpResponse};

// ============================================================================
// Types
// ============================================================================

/// A capability map as exchanged during session negotiation.
pub type Capabilities = FxHashMap<String, Value>;

/// Hook invoked with every emitted [`CallEvent`].
pub type CallHook = Arc<dyn Fn(&CallEvent) + Send + Sync>;

/// Hook invoked with every outgoing HTTP request, once per attempt.
pub type RequestHook = Arc<dyn Fn(&HttpRequest) + Send + Sync>;

/// Hook invoked with every incoming HTTP response, once per attempt.
///
/// Receives `None` when the attempt produced no response at all.
pub type ResponseHook = Arc<dyn Fn(Option<&HttpResponse>) + Send + Sync>;

// ============================================================================
// BrowserSelection
// ============================================================================

/// Browser-selection shorthand.
///
/// Providers that support browser selection translate this into their own
/// capability keys during remote resolution; providers with a fixed browser
/// ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserSelection {
    /// Browser name, e.g. `"firefox"`.
    pub name: String,

    /// Browser version, if pinned.
    pub version: Option<String>,

    /// Platform, e.g. `"LINUX"`, if pinned.
    pub platform: Option<String>,
}

impl BrowserSelection {
    /// Creates a selection for the named browser.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            platform: None,
        }
    }

    /// Pins the browser version.
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Pins the platform.
    #[inline]
    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

// ============================================================================
// Options
// ============================================================================

/// Driver configuration bag.
///
/// Explicitly set values always win over the environment and override
/// files. Field effects are documented at the point each field is consumed:
/// credentials and `hub_port` in the remote resolver, `session` and the
/// harness binary in session bootstrap, the flags and hooks in call
/// instrumentation and the connection layer.
#[derive(Clone, Default)]
pub struct Options {
    /// Base URL override; wins over the provider's default endpoint.
    pub base_url: Option<Url>,

    /// Desired capabilities sent on session creation.
    pub desired: Capabilities,

    /// Required capabilities sent on session creation, if any.
    pub required: Option<Capabilities>,

    /// Sauce Labs user name (`SAUCE_USERNAME`).
    pub sauce_username: Option<String>,

    /// Sauce Labs access key (`SAUCE_ACCESS_KEY`).
    pub sauce_access_key: Option<String>,

    /// BrowserStack user name (`BROWSER_STACK_USERNAME`).
    pub browserstack_username: Option<String>,

    /// BrowserStack access key (`BROWSER_STACK_ACCESS_KEY`).
    pub browserstack_access_key: Option<String>,

    /// TestingBot key (`TESTING_BOT_KEY`).
    pub testingbot_key: Option<String>,

    /// TestingBot secret (`TESTING_BOT_SECRET`).
    pub testingbot_secret: Option<String>,

    /// Selenium hub port (`SELENIUM_HUB_PORT`), default 4444.
    pub hub_port: Option<u16>,

    /// Emit every CallEvent through `tracing`.
    pub debug: bool,

    /// Emit every HTTP request/response through `tracing`.
    pub http_debug: bool,

    /// Hook invoked with every emitted CallEvent.
    pub on_call: Option<CallHook>,

    /// Hook invoked with every outgoing HTTP request.
    pub on_request: Option<RequestHook>,

    /// Hook invoked with every incoming HTTP response (or its absence).
    pub on_response: Option<ResponseHook>,

    /// Pre-existing session to adopt instead of negotiating one.
    pub session: Option<Session>,

    /// Browser-selection shorthand.
    pub browser: Option<BrowserSelection>,

    /// Path to the local test-harness binary.
    pub harness_binary: Option<PathBuf>,
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("base_url", &self.base_url)
            .field("desired", &self.desired)
            .field("required", &self.required)
            .field("hub_port", &self.hub_port)
            .field("debug", &self.debug)
            .field("http_debug", &self.http_debug)
            .field("on_call", &self.on_call.is_some())
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("session", &self.session)
            .field("browser", &self.browser)
            .field("harness_binary", &self.harness_binary)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Options {
    /// Creates an empty options bag.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Options {
    /// Overrides the provider's default base URL.
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Adds one desired capability.
    #[inline]
    #[must_use]
    pub fn with_capability(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.desired.insert(key.into(), value.into());
        self
    }

    /// Replaces the desired capability map.
    #[inline]
    #[must_use]
    pub fn with_desired(mut self, capabilities: Capabilities) -> Self {
        self.desired = capabilities;
        self
    }

    /// Sets the required capability map.
    #[inline]
    #[must_use]
    pub fn with_required(mut self, capabilities: Capabilities) -> Self {
        self.required = Some(capabilities);
        self
    }

    /// Sets Sauce Labs credentials.
    #[inline]
    #[must_use]
    pub fn with_sauce_credentials(
        mut self,
        username: impl Into<String>,
        access_key: impl Into<String>,
    ) -> Self {
        self.sauce_username = Some(username.into());
        self.sauce_access_key = Some(access_key.into());
        self
    }

    /// Sets BrowserStack credentials.
    #[inline]
    #[must_use]
    pub fn with_browserstack_credentials(
        mut self,
        username: impl Into<String>,
        access_key: impl Into<String>,
    ) -> Self {
        self.browserstack_username = Some(username.into());
        self.browserstack_access_key = Some(access_key.into());
        self
    }

    /// Sets TestingBot credentials.
    #[inline]
    #[must_use]
    pub fn with_testingbot_credentials(
        mut self,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.testingbot_key = Some(key.into());
        self.testingbot_secret = Some(secret.into());
        self
    }

    /// Sets the selenium hub port.
    #[inline]
    #[must_use]
    pub fn with_hub_port(mut self, port: u16) -> Self {
        self.hub_port = Some(port);
        self
    }

    /// Enables CallEvent emission through `tracing`.
    #[inline]
    #[must_use]
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Enables HTTP request/response emission through `tracing`.
    #[inline]
    #[must_use]
    pub fn with_http_debug(mut self) -> Self {
        self.http_debug = true;
        self
    }

    /// Registers a CallEvent hook.
    #[inline]
    #[must_use]
    pub fn with_on_call(mut self, hook: impl Fn(&CallEvent) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Arc::new(hook));
        self
    }

    /// Registers an outgoing-request hook.
    #[inline]
    #[must_use]
    pub fn with_on_request(mut self, hook: impl Fn(&HttpRequest) + Send + Sync + 'static) -> Self {
        self.on_request = Some(Arc::new(hook));
        self
    }

    /// Registers an incoming-response hook.
    #[inline]
    #[must_use]
    pub fn with_on_response(
        mut self,
        hook: impl Fn(Option<&HttpResponse>) + Send + Sync + 'static,
    ) -> Self {
        self.on_response = Some(Arc::new(hook));
        self
    }

    /// Adopts a pre-existing session; no session negotiation will occur.
    #[inline]
    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Sets the browser-selection shorthand.
    #[inline]
    #[must_use]
    pub fn with_browser(mut self, selection: BrowserSelection) -> Self {
        self.browser = Some(selection);
        self
    }

    /// Sets the local test-harness binary path.
    #[inline]
    #[must_use]
    pub fn with_harness_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.harness_binary = Some(path.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
