//! Named, ordered groups of steps.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

use crate::form;
use crate::result::{ProbeError, ProbeResult};
use crate::step::Step;

/// A scenario group: one session, steps run strictly in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Absolute URL, or a path resolved against the base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Parse a scenario from YAML
    ///
    /// # Errors
    ///
    /// Returns error if the YAML is malformed or the scenario is invalid
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        let scenario: Self = serde_yaml_ng::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario from a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| match e {
            ProbeError::Yaml(e) => ProbeError::scenario(format!("{}: {e}", path.display())),
            other => other,
        })
    }

    /// Serialize to YAML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Reject scenarios that cannot produce a meaningful report
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Scenario`] for an empty name, no steps, or a
    /// repeated step name
    pub fn validate(&self) -> ProbeResult<()> {
        if self.name.trim().is_empty() {
            return Err(ProbeError::scenario("scenario name is empty"));
        }
        if self.steps.is_empty() {
            return Err(ProbeError::scenario(format!(
                "scenario {} has no steps",
                self.name
            )));
        }
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name.as_str()) {
                return Err(ProbeError::scenario(format!(
                    "scenario {} repeats step name {}",
                    self.name, step.name
                )));
            }
        }
        Ok(())
    }

    /// URL the scenario's session opens on
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Url`] if the target cannot be resolved
    pub fn resolve_target(&self, base_url: &str) -> ProbeResult<String> {
        let base = Url::parse(&form::normalize_base(base_url))?;
        match &self.target {
            None => Ok(base.to_string()),
            Some(target) => Ok(base.join(target)?.to_string()),
        }
    }
}
