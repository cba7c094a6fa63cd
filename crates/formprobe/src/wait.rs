//! Bounded wait primitives.
//!
//! Every suspension point in a scenario goes through [`poll_until`]: probe,
//! sleep for the poll interval, probe again, and give up with
//! [`ProbeError::Timeout`] once the bound is exceeded. Nothing here retries a
//! failed assertion; callers only poll for state that may not exist yet.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::locator::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{ProbeError, ProbeResult};
use crate::session::Session;

/// Default bound for navigation waits (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Options for wait operations
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Poll `probe` until it yields a value or the bound is exceeded.
///
/// `Ok(None)` means "not yet". A fatal error ends the wait at once; any other
/// error is treated as "not yet" (a document mid-navigation cannot be
/// queried) and kept, so a timeout still reports the last one seen.
///
/// # Errors
///
/// Returns [`ProbeError::Timeout`] naming `what` when the bound is exceeded,
/// or the fatal error that ended the wait.
pub async fn poll_until<T, F, Fut>(options: &WaitOptions, what: &str, mut probe: F) -> ProbeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Option<T>>>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let mut attempts: u32 = 0;
    let mut last_error = None;

    loop {
        attempts += 1;
        match probe().await {
            Ok(Some(value)) => {
                tracing::debug!(
                    waited_for = what,
                    attempts,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "wait satisfied"
                );
                return Ok(value);
            }
            Ok(None) => last_error = None,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::debug!(waited_for = what, error = %e, "probe failed, retrying");
                last_error = Some(e.to_string());
            }
        }

        if start.elapsed() >= timeout {
            if let Some(error) = &last_error {
                tracing::warn!(waited_for = what, error = %error, attempts, "wait failed on driver errors");
            }
            return Err(ProbeError::Timeout {
                condition: what.to_string(),
                timeout_ms: options.timeout_ms,
                last_error,
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

/// Wait until the current URL contains `fragment`, returning that URL
///
/// # Errors
///
/// Returns [`ProbeError::Timeout`] if the URL never matches.
pub async fn wait_for_url_contains(
    session: &Session,
    fragment: &str,
    options: &WaitOptions,
) -> ProbeResult<String> {
    let driver = session.driver();
    let what = format!("URL containing {fragment:?}");
    poll_until(options, &what, move || async move {
        let url = driver.current_url().await?;
        Ok(url.contains(fragment).then_some(url))
    })
    .await
}

/// Sleep for a fixed settle delay (prefer a wait condition where one exists)
pub async fn settle(duration_ms: u64) {
    if duration_ms > 0 {
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    }
}
