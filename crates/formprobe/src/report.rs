//! Step, scenario and suite reports.
//!
//! Reports are append-only records of what happened. They serialize to JSON
//! for `--report` output:
//!
//! ```json
//! {"name":"input_is_disabled","status":"passed","duration_ms":12}
//! {"name":"dropdown_has_expected_options","status":"failed",
//!  "kind":"assertion_mismatch","message":"...","expected":"8","actual":"7",
//!  "duration_ms":3}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::result::{ErrorKind, ProbeError, ProbeResult};

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Every check held
    Passed,
    /// The step failed
    Failed {
        /// Error classification
        kind: ErrorKind,
        /// Error message
        message: String,
        /// Expected value, for mismatches
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected: Option<String>,
        /// Observed value, for mismatches
        #[serde(default, skip_serializing_if = "Option::is_none")]
        actual: Option<String>,
    },
    /// Not run
    Skipped {
        /// Why the step was not run
        reason: String,
    },
}

impl From<&ProbeError> for StepOutcome {
    fn from(error: &ProbeError) -> Self {
        let (expected, actual) = match error {
            ProbeError::AssertionMismatch {
                expected, actual, ..
            } => (Some(expected.clone()), Some(actual.clone())),
            _ => (None, None),
        };
        Self::Failed {
            kind: error.kind(),
            message: error.to_string(),
            expected,
            actual,
        }
    }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name
    pub name: String,
    /// Outcome
    #[serde(flatten)]
    pub outcome: StepOutcome,
    /// Time spent in the step
    pub duration_ms: u64,
}

impl StepResult {
    /// Create a passing result
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StepOutcome::Passed,
            duration_ms: 0,
        }
    }

    /// Create a failing result from the error that ended the step
    #[must_use]
    pub fn fail(name: impl Into<String>, error: &ProbeError) -> Self {
        Self {
            name: name.into(),
            outcome: error.into(),
            duration_ms: 0,
        }
    }

    /// Create a skipped result
    #[must_use]
    pub fn skip(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: StepOutcome::Skipped {
                reason: reason.into(),
            },
            duration_ms: 0,
        }
    }

    /// Set duration
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = millis(duration);
        self
    }

    /// Whether the step passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.outcome, StepOutcome::Passed)
    }

    /// Whether the step failed
    #[must_use]
    pub const fn failed(&self) -> bool {
        matches!(self.outcome, StepOutcome::Failed { .. })
    }

    /// Whether the step was skipped
    #[must_use]
    pub const fn skipped(&self) -> bool {
        matches!(self.outcome, StepOutcome::Skipped { .. })
    }
}

/// Error that ended a scenario early
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatalError {
    /// Error classification
    pub kind: ErrorKind,
    /// Error message
    pub message: String,
}

impl From<&ProbeError> for FatalError {
    fn from(error: &ProbeError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Results of one scenario group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub scenario: String,
    /// URL the session opened on
    pub target_url: String,
    /// When the scenario started
    pub started_at: DateTime<Utc>,
    /// Total duration
    pub duration_ms: u64,
    /// Step results in execution order
    pub steps: Vec<StepResult>,
    /// Fatal error, if the scenario stopped early
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<FatalError>,
}

impl ScenarioReport {
    /// Whether every step passed and nothing was fatal
    #[must_use]
    pub fn passed(&self) -> bool {
        self.fatal.is_none() && self.steps.iter().all(StepResult::passed)
    }

    /// Count passed steps
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.passed()).count()
    }

    /// Count failed steps
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.failed()).count()
    }

    /// Count skipped steps
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.steps.iter().filter(|s| s.skipped()).count()
    }

    /// Get failed steps
    #[must_use]
    pub fn failures(&self) -> Vec<&StepResult> {
        self.steps.iter().filter(|s| s.failed()).collect()
    }

    /// Look up a step result by name
    #[must_use]
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Reports of every scenario run by one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Scenario reports in run order
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// Whether every scenario passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    /// Total step count
    #[must_use]
    pub fn total_steps(&self) -> usize {
        self.scenarios.iter().map(|s| s.steps.len()).sum()
    }

    /// Count failed steps across scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.scenarios.iter().map(ScenarioReport::failed_count).sum()
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> ProbeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write pretty-printed JSON to `path`
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the write fails
    pub fn write_json(&self, path: impl AsRef<Path>) -> ProbeResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
