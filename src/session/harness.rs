//! Local test-harness companion process management.
//!
//! The `taxirank` provider speaks to a companion process on localhost.
//! Before creating a session, the bootstrap probes the companion's version
//! endpoint; when it is absent or reports an incompatible version, the
//! harness binary is spawned: in the foreground under CI, detached
//! otherwise, with a slower foreground fallback when the detached process
//! does not come up within its probe budget. A spawned harness registers a
//! teardown hook that the Driver runs on dispose.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result, TransportErrorKind};
use crate::options::Options;

// ============================================================================
// Constants
// ============================================================================

/// Harness protocol version this runtime speaks.
const EXPECTED_HARNESS_VERSION: &str = "1";

/// Default harness binary name, resolved via `PATH`.
const DEFAULT_HARNESS_BINARY: &str = "taxirank";

/// Readiness probe budget for a detached harness.
const DETACHED_PROBE_ATTEMPTS: u32 = 10;

/// Readiness probe budget for a foreground harness.
const FOREGROUND_PROBE_ATTEMPTS: u32 = 50;

/// Delay between readiness probes.
const PROBE_DELAY: Duration = Duration::from_millis(200);

// ============================================================================
// Types
// ============================================================================

/// Hook run on dispose to stop a spawned harness.
pub type TeardownHook = Box<dyn FnOnce() + Send>;

// ============================================================================
// Harness Management
// ============================================================================

/// Ensures the harness behind `base_url` is running and compatible.
///
/// Returns a teardown hook when a harness was spawned; `None` when a
/// compatible harness was already answering.
///
/// # Errors
///
/// Returns an error when the harness binary cannot be spawned or does not
/// answer its version endpoint within the probe budget.
pub(crate) async fn ensure_running(
    base_url: &Url,
    options: &Options,
) -> Result<Option<TeardownHook>> {
    match probe_version(base_url).await {
        Some(version) if version == EXPECTED_HARNESS_VERSION => {
            debug!(version = %version, "harness already running");
            return Ok(None);
        }
        Some(version) => {
            warn!(
                found = %version,
                expected = EXPECTED_HARNESS_VERSION,
                "harness version mismatch; spawning a fresh harness"
            );
        }
        None => debug!("harness not reachable; spawning"),
    }

    spawn(base_url, options).await.map(Some)
}

/// Probes the harness version endpoint.
///
/// Returns `None` when the endpoint is unreachable or does not report a
/// version.
async fn probe_version(base_url: &Url) -> Option<String> {
    let url = base_url.join("/version").ok()?;
    let response = reqwest::get(url).await.ok()?;

    if !response.status().is_success() {
        return None;
    }

    let body: Value = response.json().await.ok()?;
    body.get("version").and_then(Value::as_str).map(str::to_string)
}

/// Spawns the harness binary, CI-aware.
async fn spawn(base_url: &Url, options: &Options) -> Result<TeardownHook> {
    let binary = options
        .harness_binary
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HARNESS_BINARY));

    if std::env::var_os("CI").is_some() {
        info!(binary = %binary.display(), "spawning harness in the foreground (CI)");
        return spawn_with(&binary, base_url, false, FOREGROUND_PROBE_ATTEMPTS).await;
    }

    match spawn_with(&binary, base_url, true, DETACHED_PROBE_ATTEMPTS).await {
        Ok(hook) => Ok(hook),
        Err(error) => {
            warn!(
                error = %error,
                "detached harness did not come up; falling back to foreground"
            );
            spawn_with(&binary, base_url, false, FOREGROUND_PROBE_ATTEMPTS).await
        }
    }
}

/// Spawns one harness process and waits for it to answer.
async fn spawn_with(
    binary: &Path,
    base_url: &Url,
    detached: bool,
    attempts: u32,
) -> Result<TeardownHook> {
    let mut command = Command::new(binary);
    if detached {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
    }

    let mut child = command.spawn().map_err(|e| {
        Error::config(format!(
            "failed to spawn harness \"{}\": {e}",
            binary.display()
        ))
    })?;

    match wait_until_ready(base_url, attempts).await {
        Ok(()) => {
            info!(pid = child.id(), detached, "harness is up");
            Ok(Box::new(move || {
                let _ = child.start_kill();
            }))
        }
        Err(error) => {
            let _ = child.start_kill();
            Err(error)
        }
    }
}

/// Polls the version endpoint until it answers or the budget runs out.
async fn wait_until_ready(base_url: &Url, attempts: u32) -> Result<()> {
    for attempt in 0..attempts {
        if attempt > 0 {
            sleep(PROBE_DELAY).await;
        }
        if probe_version(base_url).await.is_some() {
            return Ok(());
        }
    }

    Err(Error::transport(
        "taxirank",
        TransportErrorKind::TimedOut,
        format!("the local test harness did not answer its version endpoint after {attempts} probes"),
    ))
}

// ============================================================================
// Tests
// ============================================================================
