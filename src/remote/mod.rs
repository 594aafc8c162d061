//! Remote resolution.
//!
//! Maps a symbolic provider alias (or literal URI) plus an [`Options`] bag
//! to a concrete base URI and an augmented capability set. No network calls
//! occur in this module.
//!
//! # Resolution Steps
//!
//! 1. Merge into Options any *unset* field for which a recognized
//!    environment variable exists, then entries of `./.webdriver.json`,
//!    then `~/.webdriver.json`. Explicit Options values always win; the
//!    first source found wins otherwise.
//! 2. Normalize dash-spelled synonyms to canonical alias names.
//! 3. Validate provider requirements (fatal configuration error naming the
//!    exact missing credential pair), resolve the base URI, inject
//!    provider capabilities, and merge the browser-selection shorthand for
//!    providers that support it.
//!
//! # Environment Variables
//!
//! | Variable | Option field |
//! |----------|--------------|
//! | `SAUCE_USERNAME` | `sauce_username` |
//! | `SAUCE_ACCESS_KEY` | `sauce_access_key` |
//! | `BROWSER_STACK_USERNAME` | `browserstack_username` |
//! | `BROWSER_STACK_ACCESS_KEY` | `browserstack_access_key` |
//! | `TESTING_BOT_KEY` | `testingbot_key` |
//! | `TESTING_BOT_SECRET` | `testingbot_secret` |
//! | `SELENIUM_HUB_PORT` | `hub_port` |
//!
//! The deprecated spellings `TESTINGBOT_KEY` / `TESTINGBOT_SECRET` are
//! consulted after the canonical ones, with a warning.

// ============================================================================
// Submodules
// ============================================================================

/// Supported remote providers.
pub mod provider;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;
use crate::options::Options;

pub use provider::Provider;

// ============================================================================
// Constants
// ============================================================================

/// Name of the optional override file, looked up in the current directory
/// and then in the home directory.
const OVERRIDE_FILE_NAME: &str = ".webdriver.json";

// ============================================================================
// ResolvedRemote
// ============================================================================

/// Output of remote resolution.
#[derive(Clone)]
pub struct ResolvedRemote {
    /// The canonical provider.
    pub provider: Provider,

    /// Concrete base URI for the remote.
    pub base_url: Url,

    /// Options with merged credentials and augmented capabilities.
    pub options: Options,
}

impl fmt::Debug for ResolvedRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedRemote")
            .field("provider", &self.provider.canonical_key())
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolves a remote identifier against an options bag.
///
/// Merges environment variables and override files into unset option
/// fields, normalizes the identifier, validates provider requirements, and
/// resolves the concrete base URI. No network calls occur here.
///
/// # Errors
///
/// Returns [`Error::Config`](crate::Error::Config) for an unrecognized
/// identifier or missing provider credentials.
pub fn resolve(identifier: &str, mut options: Options) -> Result<ResolvedRemote> {
    merge_environment(&mut options);
    merge_override_files(&mut options);
    finish_resolve(identifier, options)
}

/// Resolution after source merging; separated so tests can resolve without
/// touching the process environment.
fn finish_resolve(identifier: &str, mut options: Options) -> Result<ResolvedRemote> {
    let provider = Provider::parse(identifier)?;

    if provider.is_registered() {
        provider.validate(&options)?;
    }

    let base_url = provider.resolve_uri(&options)?;

    let mut capabilities = std::mem::take(&mut options.desired);
    provider.inject_capabilities(&options, &mut capabilities);
    if provider.supports_browser_selection()
        && let Some(selection) = &options.browser
    {
        provider.apply_browser_selection(selection, &mut capabilities);
    }
    options.desired = capabilities;

    debug!(
        remote = provider.canonical_key(),
        url = %base_url,
        "Remote resolved"
    );

    Ok(ResolvedRemote {
        provider,
        base_url,
        options,
    })
}

// ============================================================================
// Environment Merging
// ============================================================================

/// Fills unset option fields from the process environment.
fn merge_environment(options: &mut Options) {
    merge_env_with(options, |name| std::env::var(name).ok());
}

/// Environment merging against an arbitrary lookup.
fn merge_env_with(options: &mut Options, lookup: impl Fn(&str) -> Option<String>) {
    fill(&mut options.sauce_username, || lookup("SAUCE_USERNAME"));
    fill(&mut options.sauce_access_key, || lookup("SAUCE_ACCESS_KEY"));
    fill(&mut options.browserstack_username, || {
        lookup("BROWSER_STACK_USERNAME")
    });
    fill(&mut options.browserstack_access_key, || {
        lookup("BROWSER_STACK_ACCESS_KEY")
    });
    fill(&mut options.testingbot_key, || lookup("TESTING_BOT_KEY"));
    fill(&mut options.testingbot_secret, || {
        lookup("TESTING_BOT_SECRET")
    });

    // Deprecated spellings, consulted after the canonical ones.
    if options.testingbot_key.is_none()
        && let Some(key) = lookup("TESTINGBOT_KEY")
    {
        warn!("TESTINGBOT_KEY is deprecated; use TESTING_BOT_KEY");
        options.testingbot_key = Some(key);
    }
    if options.testingbot_secret.is_none()
        && let Some(secret) = lookup("TESTINGBOT_SECRET")
    {
        warn!("TESTINGBOT_SECRET is deprecated; use TESTING_BOT_SECRET");
        options.testingbot_secret = Some(secret);
    }

    if options.hub_port.is_none()
        && let Some(raw) = lookup("SELENIUM_HUB_PORT")
    {
        match raw.parse::<u16>() {
            Ok(port) => options.hub_port = Some(port),
            Err(_) => warn!(value = %raw, "Ignoring unparseable SELENIUM_HUB_PORT"),
        }
    }
}

/// Sets a slot from a source only when the slot is unset.
fn fill(slot: &mut Option<String>, source: impl FnOnce() -> Option<String>) {
    if slot.is_none() {
        *slot = source();
    }
}

// ============================================================================
// Override Files
// ============================================================================

/// Recognized override-file entries. Unrecognized keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct OverrideFile {
    #[serde(default)]
    sauce_username: Option<String>,
    #[serde(default)]
    sauce_access_key: Option<String>,
    #[serde(default)]
    browserstack_username: Option<String>,
    #[serde(default)]
    browserstack_access_key: Option<String>,
    #[serde(default)]
    testingbot_key: Option<String>,
    #[serde(default)]
    testingbot_secret: Option<String>,
    #[serde(default)]
    hub_port: Option<u16>,
}

/// Fills unset option fields from the optional override files.
///
/// The project-local file wins over the per-user file; both are read if
/// present and never required.
fn merge_override_files(options: &mut Options) {
    let mut paths = vec![PathBuf::from(OVERRIDE_FILE_NAME)];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(OVERRIDE_FILE_NAME));
    }

    for path in paths {
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };
        merge_override_contents(options, &contents, &path);
    }
}

/// Merges one override file's contents into unset option fields.
fn merge_override_contents(options: &mut Options, contents: &str, origin: &Path) {
    let overrides: OverrideFile = match serde_json::from_str(contents) {
        Ok(overrides) => overrides,
        Err(e) => {
            warn!(path = %origin.display(), error = %e, "Ignoring malformed override file");
            return;
        }
    };

    debug!(path = %origin.display(), "Merging override file");

    fill(&mut options.sauce_username, || overrides.sauce_username);
    fill(&mut options.sauce_access_key, || overrides.sauce_access_key);
    fill(&mut options.browserstack_username, || {
        overrides.browserstack_username
    });
    fill(&mut options.browserstack_access_key, || {
        overrides.browserstack_access_key
    });
    fill(&mut options.testingbot_key, || overrides.testingbot_key);
    fill(&mut options.testingbot_secret, || overrides.testingbot_secret);

    if options.hub_port.is_none() {
        options.hub_port = overrides.hub_port;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_resolve_synonym_yields_canonical_key_and_uri() {
        let resolved = finish_resolve("chrome-driver", Options::new()).expect("resolve");
        assert_eq!(resolved.provider.canonical_key(), "chromedriver");
        assert_eq!(resolved.base_url.as_str(), "http://localhost:9515/");
    }

    #[test]
    fn test_resolve_missing_credentials_is_config_error() {
        let err = finish_resolve("saucelabs", Options::new()).expect_err("config error");
        assert!(err.is_config());
    }

    #[test]
    fn test_resolve_literal_uri() {
        let resolved =
            finish_resolve("http://grid.internal:4444/wd/hub", Options::new()).expect("resolve");
        assert_eq!(resolved.base_url.as_str(), "http://grid.internal:4444/wd/hub");
        assert_eq!(resolved.provider.canonical_key(), "custom");
    }

    #[test]
    fn test_resolve_merges_browser_selection() {
        let options = Options::new()
            .with_sauce_credentials("user", "key")
            .with_browser(crate::options::BrowserSelection::new("firefox").with_version("120"));

        let resolved = finish_resolve("saucelabs", options).expect("resolve");
        assert_eq!(
            resolved.options.desired.get("browserName"),
            Some(&"firefox".into())
        );
        assert_eq!(resolved.options.desired.get("version"), Some(&"120".into()));
    }

    #[test]
    fn test_resolve_skips_selection_for_fixed_browser() {
        let options =
            Options::new().with_browser(crate::options::BrowserSelection::new("firefox"));
        let resolved = finish_resolve("chromedriver", options).expect("resolve");
        assert!(resolved.options.desired.is_empty());
    }

    #[test]
    fn test_env_fills_unset_fields() {
        let mut options = Options::new();
        merge_env_with(
            &mut options,
            env(&[
                ("SAUCE_USERNAME", "env-user"),
                ("SAUCE_ACCESS_KEY", "env-key"),
                ("SELENIUM_HUB_PORT", "5555"),
            ]),
        );

        assert_eq!(options.sauce_username.as_deref(), Some("env-user"));
        assert_eq!(options.sauce_access_key.as_deref(), Some("env-key"));
        assert_eq!(options.hub_port, Some(5555));
    }

    #[test]
    fn test_explicit_options_win_over_env() {
        let mut options = Options::new().with_sauce_credentials("explicit", "explicit-key");
        merge_env_with(
            &mut options,
            env(&[
                ("SAUCE_USERNAME", "env-user"),
                ("SAUCE_ACCESS_KEY", "env-key"),
            ]),
        );

        assert_eq!(options.sauce_username.as_deref(), Some("explicit"));
        assert_eq!(options.sauce_access_key.as_deref(), Some("explicit-key"));
    }

    #[test]
    fn test_deprecated_testingbot_spellings() {
        let mut options = Options::new();
        merge_env_with(
            &mut options,
            env(&[("TESTINGBOT_KEY", "old-key"), ("TESTINGBOT_SECRET", "old-secret")]),
        );

        assert_eq!(options.testingbot_key.as_deref(), Some("old-key"));
        assert_eq!(options.testingbot_secret.as_deref(), Some("old-secret"));
    }

    #[test]
    fn test_canonical_testingbot_spelling_wins() {
        let mut options = Options::new();
        merge_env_with(
            &mut options,
            env(&[
                ("TESTING_BOT_KEY", "new-key"),
                ("TESTINGBOT_KEY", "old-key"),
            ]),
        );

        assert_eq!(options.testingbot_key.as_deref(), Some("new-key"));
    }

    #[test]
    fn test_unparseable_hub_port_ignored() {
        let mut options = Options::new();
        merge_env_with(&mut options, env(&[("SELENIUM_HUB_PORT", "not-a-port")]));
        assert_eq!(options.hub_port, None);
    }

    #[test]
    fn test_override_file_fills_unset_fields() {
        let mut options = Options::new();
        merge_override_contents(
            &mut options,
            r#"{"testingbot_key": "file-key", "hub_port": 4544}"#,
            Path::new(".webdriver.json"),
        );

        assert_eq!(options.testingbot_key.as_deref(), Some("file-key"));
        assert_eq!(options.hub_port, Some(4544));
    }

    #[test]
    fn test_first_override_file_wins() {
        let mut options = Options::new();
        merge_override_contents(
            &mut options,
            r#"{"sauce_username": "project"}"#,
            Path::new(".webdriver.json"),
        );
        merge_override_contents(
            &mut options,
            r#"{"sauce_username": "home", "sauce_access_key": "home-key"}"#,
            Path::new("/home/user/.webdriver.json"),
        );

        // Project-local entry wins; the home file still fills the gap.
        assert_eq!(options.sauce_username.as_deref(), Some("project"));
        assert_eq!(options.sauce_access_key.as_deref(), Some("home-key"));
    }

    #[test]
    fn test_malformed_override_file_ignored() {
        let mut options = Options::new().with_hub_port(1234);
        merge_override_contents(&mut options, "{ not json", Path::new(".webdriver.json"));
        assert_eq!(options.hub_port, Some(1234));
    }

    #[test]
    fn test_unknown_override_keys_ignored() {
        let mut options = Options::new();
        merge_override_contents(
            &mut options,
            r#"{"hub_port": 9999, "unrelated": {"nested": true}}"#,
            Path::new(".webdriver.json"),
        );
        assert_eq!(options.hub_port, Some(9999));
    }
}
