//! Result and error types for Formprobe.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for Formprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur in Formprobe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Browser launch or initial navigation failed
    #[error("Failed to launch session: {message}")]
    Launch {
        /// Error message
        message: String,
    },

    /// Locator never resolved within its wait bound
    #[error("Element {locator} not found after {timeout_ms}ms{}", cause(.last_error))]
    NotFound {
        /// Locator description
        locator: String,
        /// Wait bound in milliseconds
        timeout_ms: u64,
        /// Last driver error seen while polling
        last_error: Option<String>,
    },

    /// Awaited condition never became true
    #[error("Timed out after {timeout_ms}ms waiting for {condition}{}", cause(.last_error))]
    Timeout {
        /// What was waited for
        condition: String,
        /// Wait bound in milliseconds
        timeout_ms: u64,
        /// Last driver error seen while polling
        last_error: Option<String>,
    },

    /// Observed value did not equal the expected value
    #[error("{check}: expected {expected:?}, got {actual:?}")]
    AssertionMismatch {
        /// Check description
        check: String,
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
    },

    /// Session or document was invalidated underneath a step
    #[error("Session is no longer usable: {message}")]
    StaleSession {
        /// Error message
        message: String,
    },

    /// Any other driver failure inside a step
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Scenario definition error
    #[error("Scenario error: {message}")]
    Scenario {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

fn cause(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!(" (last error: {e})"))
        .unwrap_or_default()
}

/// Coarse classification used in step results and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Session could not be created
    Launch,
    /// Locator never resolved
    NotFound,
    /// Condition never became true
    Timeout,
    /// Value mismatch
    AssertionMismatch,
    /// Session invalidated
    StaleSession,
    /// Other driver failure
    Driver,
    /// Failure outside step execution
    Internal,
}

impl ErrorKind {
    /// Whether this kind invalidates the whole scenario group
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Launch | Self::StaleSession)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Launch => "launch",
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::AssertionMismatch => "assertion_mismatch",
            Self::StaleSession => "stale_session",
            Self::Driver => "driver",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

impl ProbeError {
    /// Create a launch error
    #[must_use]
    pub fn launch(message: impl Into<String>) -> Self {
        Self::Launch {
            message: message.into(),
        }
    }

    /// Create a stale session error
    #[must_use]
    pub fn stale(message: impl Into<String>) -> Self {
        Self::StaleSession {
            message: message.into(),
        }
    }

    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a scenario error
    #[must_use]
    pub fn scenario(message: impl Into<String>) -> Self {
        Self::Scenario {
            message: message.into(),
        }
    }

    /// Create an assertion mismatch
    #[must_use]
    pub fn mismatch(
        check: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::AssertionMismatch {
            check: check.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Launch { .. } => ErrorKind::Launch,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::AssertionMismatch { .. } => ErrorKind::AssertionMismatch,
            Self::StaleSession { .. } => ErrorKind::StaleSession,
            Self::Driver { .. } => ErrorKind::Driver,
            Self::Config { .. }
            | Self::Scenario { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_)
            | Self::Url(_) => ErrorKind::Internal,
        }
    }

    /// Only session-level failures abort a scenario group
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }
}
