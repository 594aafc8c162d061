//! Supported remote providers.
//!
//! Each provider is one variant of a closed enum carrying its own endpoint
//! resolution, credential validation, capability injection, and remediation
//! text, matched exhaustively so adding or removing a provider is a
//! compile-time-checked change.

// ============================================================================
// Imports
// ============================================================================

use url::Url;

use crate::error::{Error, Result};
use crate::options::{BrowserSelection, Capabilities, Options};

// ============================================================================
// Constants
// ============================================================================

/// Default chromedriver endpoint.
const CHROMEDRIVER_URL: &str = "http://localhost:9515/";

/// Default local test-harness endpoint.
const TAXIRANK_URL: &str = "http://localhost:9516";

/// Default selenium hub port.
const DEFAULT_HUB_PORT: u16 = 4444;

/// Sauce Labs hosted hub.
const SAUCELABS_HUB: &str = "http://ondemand.saucelabs.com/wd/hub";

/// BrowserStack hosted hub.
const BROWSERSTACK_HUB: &str = "http://hub.browserstack.com/wd/hub";

/// TestingBot hosted hub.
const TESTINGBOT_HUB: &str = "http://hub.testingbot.com/wd/hub";

// ============================================================================
// Provider
// ============================================================================

/// A supported remote target.
///
/// Symbolic aliases (and their dash-spelled synonyms) map to the named
/// variants; anything else must be a literal URI and maps to
/// [`Provider::Url`], which has no registered configuration: no
/// validation, capability injection, or browser selection applies to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// Local chromedriver process.
    ChromeDriver,
    /// Selenium grid hub on localhost.
    SeleniumHub,
    /// Local test harness.
    TaxiRank,
    /// Sauce Labs hosted hub.
    SauceLabs,
    /// BrowserStack hosted hub.
    BrowserStack,
    /// TestingBot hosted hub.
    TestingBot,
    /// Literal remote URI.
    Url(Url),
}

// ============================================================================
// Provider - Parsing
// ============================================================================

impl Provider {
    /// Parses a remote identifier.
    ///
    /// Accepts canonical alias names, their dash-spelled synonyms
    /// (case-insensitively), or a literal URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the identifier is neither a known alias
    /// nor a parseable URI.
    pub fn parse(identifier: &str) -> Result<Self> {
        let normalized = identifier.trim().to_ascii_lowercase();

        let provider = match normalized.as_str() {
            "chromedriver" | "chrome-driver" => Self::ChromeDriver,
            "selenium-hub" | "seleniumhub" => Self::SeleniumHub,
            "taxirank" | "taxi-rank" => Self::TaxiRank,
            "saucelabs" | "sauce-labs" => Self::SauceLabs,
            "browserstack" | "browser-stack" => Self::BrowserStack,
            "testingbot" | "testing-bot" => Self::TestingBot,
            _ => {
                let url = Url::parse(identifier).map_err(|_| {
                    Error::config(format!(
                        "Unrecognized remote \"{identifier}\". Use a known alias \
                         (chromedriver, selenium-hub, taxirank, saucelabs, \
                         browserstack, testingbot) or a literal URI."
                    ))
                })?;
                Self::Url(url)
            }
        };

        Ok(provider)
    }

    /// Returns the canonical alias for this provider.
    #[must_use]
    pub fn canonical_key(&self) -> &'static str {
        match self {
            Self::ChromeDriver => "chromedriver",
            Self::SeleniumHub => "selenium-hub",
            Self::TaxiRank => "taxirank",
            Self::SauceLabs => "saucelabs",
            Self::BrowserStack => "browserstack",
            Self::TestingBot => "testingbot",
            Self::Url(_) => "custom",
        }
    }

    /// Returns `true` if this provider has a registered configuration.
    ///
    /// Literal URIs are unregistered: no validation, capability injection,
    /// or browser selection applies.
    #[inline]
    #[must_use]
    pub fn is_registered(&self) -> bool {
        !matches!(self, Self::Url(_))
    }

    /// Returns `true` if this is a hosted (cloud) provider.
    #[inline]
    #[must_use]
    pub fn is_hosted(&self) -> bool {
        matches!(self, Self::SauceLabs | Self::BrowserStack | Self::TestingBot)
    }
}

// ============================================================================
// Provider - Validation
// ============================================================================

impl Provider {
    /// Validates that the options carry what this provider requires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the exact missing credential pair.
    pub fn validate(&self, options: &Options) -> Result<()> {
        match self {
            Self::SauceLabs => {
                if options.sauce_username.is_none() || options.sauce_access_key.is_none() {
                    return Err(self.credential_error());
                }
            }
            Self::BrowserStack => {
                if options.browserstack_username.is_none()
                    || options.browserstack_access_key.is_none()
                {
                    return Err(self.credential_error());
                }
            }
            Self::TestingBot => {
                if options.testingbot_key.is_none() || options.testingbot_secret.is_none() {
                    return Err(self.credential_error());
                }
            }
            Self::ChromeDriver | Self::SeleniumHub | Self::TaxiRank | Self::Url(_) => {}
        }

        Ok(())
    }

    /// Builds the configuration error naming this provider's credential
    /// option/environment-variable pairs.
    #[must_use]
    pub(crate) fn credential_error(&self) -> Error {
        let detail = match self {
            Self::SauceLabs => {
                "saucelabs requires credentials: set sauce_username/sauce_access_key \
                 in options or SAUCE_USERNAME/SAUCE_ACCESS_KEY in the environment"
            }
            Self::BrowserStack => {
                "browserstack requires credentials: set \
                 browserstack_username/browserstack_access_key in options or \
                 BROWSER_STACK_USERNAME/BROWSER_STACK_ACCESS_KEY in the environment"
            }
            Self::TestingBot => {
                "testingbot requires credentials: set testingbot_key/testingbot_secret \
                 in options or TESTING_BOT_KEY/TESTING_BOT_SECRET in the environment"
            }
            Self::ChromeDriver | Self::SeleniumHub | Self::TaxiRank | Self::Url(_) => {
                "this remote requires no credentials"
            }
        };
        Error::config(detail)
    }

    /// Names this provider's credential option/environment-variable pairs,
    /// for hosted providers.
    #[must_use]
    pub(crate) fn credential_pair_names(&self) -> Option<&'static str> {
        match self {
            Self::SauceLabs => {
                Some("sauce_username (SAUCE_USERNAME) and sauce_access_key (SAUCE_ACCESS_KEY)")
            }
            Self::BrowserStack => Some(
                "browserstack_username (BROWSER_STACK_USERNAME) and \
                 browserstack_access_key (BROWSER_STACK_ACCESS_KEY)",
            ),
            Self::TestingBot => {
                Some("testingbot_key (TESTING_BOT_KEY) and testingbot_secret (TESTING_BOT_SECRET)")
            }
            Self::ChromeDriver | Self::SeleniumHub | Self::TaxiRank | Self::Url(_) => None,
        }
    }
}

// ============================================================================
// Provider - URI Resolution
// ============================================================================

impl Provider {
    /// Resolves the concrete base URI for this provider.
    ///
    /// An explicit `base_url` option always wins. Hosted providers embed
    /// their credentials in the URI userinfo.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when hosted credentials are missing.
    pub fn resolve_uri(&self, options: &Options) -> Result<Url> {
        if let Some(base) = &options.base_url {
            return Ok(base.clone());
        }

        match self {
            Self::ChromeDriver => parse_endpoint(CHROMEDRIVER_URL),
            Self::SeleniumHub => {
                let port = options.hub_port.unwrap_or(DEFAULT_HUB_PORT);
                parse_endpoint(&format!("http://localhost:{port}/wd/hub"))
            }
            Self::TaxiRank => parse_endpoint(TAXIRANK_URL),
            Self::SauceLabs => {
                match (&options.sauce_username, &options.sauce_access_key) {
                    (Some(user), Some(key)) => hosted_hub(SAUCELABS_HUB, user, key),
                    _ => Err(self.credential_error()),
                }
            }
            Self::BrowserStack => {
                match (&options.browserstack_username, &options.browserstack_access_key) {
                    (Some(user), Some(key)) => hosted_hub(BROWSERSTACK_HUB, user, key),
                    _ => Err(self.credential_error()),
                }
            }
            Self::TestingBot => match (&options.testingbot_key, &options.testingbot_secret) {
                (Some(key), Some(secret)) => hosted_hub(TESTINGBOT_HUB, key, secret),
                _ => Err(self.credential_error()),
            },
            Self::Url(url) => Ok(url.clone()),
        }
    }
}

// ============================================================================
// Provider - Capabilities
// ============================================================================

impl Provider {
    /// Injects provider-specific entries into the desired capabilities.
    ///
    /// Explicitly set capabilities always win over injected ones.
    pub fn inject_capabilities(&self, options: &Options, capabilities: &mut Capabilities) {
        match self {
            Self::BrowserStack => {
                if let Some(user) = &options.browserstack_username {
                    capabilities
                        .entry("browserstack.user".to_string())
                        .or_insert_with(|| user.clone().into());
                }
                if let Some(key) = &options.browserstack_access_key {
                    capabilities
                        .entry("browserstack.key".to_string())
                        .or_insert_with(|| key.clone().into());
                }
            }
            Self::ChromeDriver
            | Self::SeleniumHub
            | Self::TaxiRank
            | Self::SauceLabs
            | Self::TestingBot
            | Self::Url(_) => {}
        }
    }

    /// Returns `true` if this provider honors the browser-selection
    /// shorthand.
    #[must_use]
    pub fn supports_browser_selection(&self) -> bool {
        match self {
            Self::SeleniumHub | Self::SauceLabs | Self::BrowserStack | Self::TestingBot => true,
            // Fixed browser; nothing to select.
            Self::ChromeDriver | Self::TaxiRank | Self::Url(_) => false,
        }
    }

    /// Merges the capability keys implied by a browser-selection shorthand.
    ///
    /// Explicitly set capabilities always win over the shorthand.
    pub fn apply_browser_selection(
        &self,
        selection: &BrowserSelection,
        capabilities: &mut Capabilities,
    ) {
        let (name_key, version_key, platform_key) = match self {
            Self::BrowserStack => ("browser", "browser_version", "os"),
            Self::SeleniumHub | Self::SauceLabs | Self::TestingBot => {
                ("browserName", "version", "platform")
            }
            Self::ChromeDriver | Self::TaxiRank | Self::Url(_) => return,
        };

        capabilities
            .entry(name_key.to_string())
            .or_insert_with(|| selection.name.clone().into());

        if let Some(version) = &selection.version {
            capabilities
                .entry(version_key.to_string())
                .or_insert_with(|| version.clone().into());
        }

        if let Some(platform) = &selection.platform {
            capabilities
                .entry(platform_key.to_string())
                .or_insert_with(|| platform.clone().into());
        }
    }
}

// ============================================================================
// Provider - Remediation
// ============================================================================

impl Provider {
    /// Returns remediation guidance for a refused connection against this
    /// provider.
    #[must_use]
    pub fn connect_remediation(&self) -> &'static str {
        match self {
            Self::ChromeDriver => {
                "chromedriver is not running. Download it from \
                 https://developer.chrome.com/docs/chromedriver/downloads and start \
                 it with `chromedriver` (listens on port 9515 by default)."
            }
            Self::SeleniumHub => {
                "the selenium hub is not running. Start it with \
                 `java -jar selenium-server-standalone.jar -role hub`, or set \
                 hub_port if it listens on a non-default port."
            }
            Self::TaxiRank => {
                "the local test harness is not running. Start it manually, or let \
                 session bootstrap spawn it by configuring harness_binary."
            }
            Self::SauceLabs | Self::BrowserStack | Self::TestingBot => {
                "the hosted hub refused the connection. Check your network \
                 connection and credentials."
            }
            Self::Url(_) => "the remote server refused the connection.",
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses a compile-time endpoint string.
fn parse_endpoint(endpoint: &str) -> Result<Url> {
    Url::parse(endpoint)
        .map_err(|e| Error::config(format!("invalid endpoint \"{endpoint}\": {e}")))
}

/// Builds a hosted hub URL with credentials embedded in the userinfo.
fn hosted_hub(endpoint: &str, username: &str, secret: &str) -> Result<Url> {
    let mut url = parse_endpoint(endpoint)?;

    url.set_username(username)
        .and_then(|()| url.set_password(Some(secret)))
        .map_err(|()| Error::config(format!("cannot embed credentials in \"{endpoint}\"")))?;

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
