//! One live browser plus page context.

use std::time::Duration;

use crate::driver::{Driver, Launcher};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{WaitOptions, DEFAULT_NAVIGATION_TIMEOUT_MS};

/// Options shared by every step of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Element and condition waits
    pub wait: WaitOptions,
    /// Bound for launching the browser and loading the target page
    pub navigation_timeout_ms: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            wait: WaitOptions::default(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }
}

impl SessionOptions {
    /// Create new options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wait options
    #[must_use]
    pub fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, ms: u64) -> Self {
        self.navigation_timeout_ms = ms;
        self
    }

    const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// An open browser session.
///
/// Created by [`Session::open`] and released by [`Session::close`], which
/// consumes the session.
#[derive(Debug)]
pub struct Session {
    driver: Box<dyn Driver>,
    options: SessionOptions,
    target_url: String,
}

impl Session {
    /// Launch a fresh browser and navigate it to `target_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Launch`] if the browser cannot start, or the
    /// navigation fails or exceeds the navigation timeout. A browser that
    /// started but could not navigate is closed before returning.
    pub async fn open(
        launcher: &dyn Launcher,
        target_url: &str,
        options: SessionOptions,
    ) -> ProbeResult<Self> {
        let bound = options.navigation_timeout();
        tracing::info!(launcher = %launcher.describe(), url = target_url, "opening session");

        let mut driver = match tokio::time::timeout(bound, launcher.launch()).await {
            Ok(Ok(driver)) => driver,
            Ok(Err(e)) => return Err(into_launch_error(e)),
            Err(_) => {
                return Err(ProbeError::launch(format!(
                    "browser did not start within {}ms",
                    options.navigation_timeout_ms
                )))
            }
        };

        let navigation = tokio::time::timeout(bound, driver.navigate(target_url)).await;
        let failure = match navigation {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("navigation to {target_url} failed: {e}")),
            Err(_) => Some(format!(
                "navigation to {target_url} timed out after {}ms",
                options.navigation_timeout_ms
            )),
        };

        if let Some(message) = failure {
            if let Err(e) = driver.close().await {
                tracing::warn!(error = %e, "failed to close browser after launch failure");
            }
            return Err(ProbeError::launch(message));
        }

        Ok(Self {
            driver,
            options,
            target_url: target_url.to_string(),
        })
    }

    /// Shared access to the driver
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        &*self.driver
    }

    /// Exclusive access to the driver
    pub fn driver_mut(&mut self) -> &mut dyn Driver {
        &mut *self.driver
    }

    /// Default wait options for this session
    #[must_use]
    pub const fn wait_options(&self) -> &WaitOptions {
        &self.options.wait
    }

    /// URL the session was opened on
    #[must_use]
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Release the browser.
    ///
    /// # Errors
    ///
    /// Returns the driver's error if shutdown fails; the session is gone
    /// either way.
    pub async fn close(mut self) -> ProbeResult<()> {
        tracing::info!(url = %self.target_url, "closing session");
        self.driver.close().await
    }
}

fn into_launch_error(error: ProbeError) -> ProbeError {
    match error {
        ProbeError::Launch { .. } => error,
        other => ProbeError::launch(other.to_string()),
    }
}
