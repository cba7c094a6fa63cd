//! Run configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional YAML file,
//! `FORMPROBE_*` environment variables, then command-line flags (applied by
//! the CLI).

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::browser::{BrowserConfig, BrowserEngine};
use crate::form::{self, FormContract, HoverMode};
use crate::locator::{DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::result::{ProbeError, ProbeResult};
use crate::scenario::Scenario;
use crate::session::SessionOptions;
use crate::wait::{WaitOptions, DEFAULT_NAVIGATION_TIMEOUT_MS};

/// Base URL of the page under test
pub const ENV_BASE_URL: &str = "FORMPROBE_BASE_URL";
/// Browser engine name
pub const ENV_BROWSER: &str = "FORMPROBE_BROWSER";
/// Browser executable path
pub const ENV_BROWSER_PATH: &str = "FORMPROBE_BROWSER_PATH";
/// `true`/`false` headless switch
pub const ENV_HEADLESS: &str = "FORMPROBE_HEADLESS";
/// `true` disables the browser sandbox
pub const ENV_NO_SANDBOX: &str = "FORMPROBE_NO_SANDBOX";
/// Element wait bound in milliseconds
pub const ENV_ELEMENT_TIMEOUT_MS: &str = "FORMPROBE_ELEMENT_TIMEOUT_MS";

/// Settle delay after typing and option interactions (500ms)
pub const DEFAULT_SETTLE_MS: u64 = 500;

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Base URL of the page under test
    pub base_url: String,
    /// Browser settings
    pub browser: BrowserConfig,
    /// Element wait bound
    pub element_timeout_ms: u64,
    /// Poll interval for bounded waits
    pub poll_interval_ms: u64,
    /// Bound for launch and initial navigation
    pub navigation_timeout_ms: u64,
    /// Settle delay after typing and option interactions
    pub settle_ms: u64,
    /// How option hover colours are produced
    pub hover_mode: HoverMode,
    /// Expected form values
    pub form: FormContract,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: form::DEFAULT_BASE_URL.to_string(),
            browser: BrowserConfig::default(),
            element_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            hover_mode: HoverMode::Inject,
            form: FormContract::default(),
        }
    }
}

impl ProbeConfig {
    /// Parse configuration from YAML; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the YAML is malformed
    pub fn from_yaml(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] naming the file if it cannot be read
    /// or parsed
    pub fn from_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
            .map_err(|e| ProbeError::config(format!("{}: {e}", path.display())))
    }

    /// Defaults, then `path` if given, then the process environment
    ///
    /// # Errors
    ///
    /// Returns error if the file or an environment variable is invalid
    pub fn load(path: Option<&Path>) -> ProbeResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `FORMPROBE_*` variables from the process environment
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an invalid value
    pub fn apply_env(&mut self) -> ProbeResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `FORMPROBE_*` variables looked up through `lookup`
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] naming the variable that holds an
    /// invalid value
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ProbeResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(engine) = lookup(ENV_BROWSER) {
            self.browser.engine = engine
                .parse::<BrowserEngine>()
                .map_err(|e| ProbeError::config(format!("{ENV_BROWSER}: {e}")))?;
        }
        if let Some(path) = lookup(ENV_BROWSER_PATH) {
            self.browser.executable_path = Some(path.into());
        }
        if let Some(value) = lookup(ENV_HEADLESS) {
            self.browser.headless = parse_bool(ENV_HEADLESS, &value)?;
        }
        if let Some(value) = lookup(ENV_NO_SANDBOX) {
            self.browser.sandbox = !parse_bool(ENV_NO_SANDBOX, &value)?;
        }
        if let Some(value) = lookup(ENV_ELEMENT_TIMEOUT_MS) {
            self.element_timeout_ms = value.trim().parse().map_err(|_| {
                ProbeError::config(format!(
                    "{ENV_ELEMENT_TIMEOUT_MS}: expected milliseconds, got {value:?}"
                ))
            })?;
        }
        Ok(())
    }

    /// Check values that would make every run fail
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] for a relative base URL or a zero poll
    /// interval
    pub fn validate(&self) -> ProbeResult<()> {
        url::Url::parse(&self.base_url).map_err(|e| {
            ProbeError::config(format!("base_url {:?} is not absolute: {e}", self.base_url))
        })?;
        if self.poll_interval_ms == 0 {
            return Err(ProbeError::config("poll_interval_ms must be positive"));
        }
        Ok(())
    }

    /// Wait and navigation bounds for sessions
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::new()
            .with_wait(
                WaitOptions::new()
                    .with_timeout(self.element_timeout_ms)
                    .with_poll_interval(self.poll_interval_ms),
            )
            .with_navigation_timeout(self.navigation_timeout_ms)
    }

    /// The built-in web form scenario for this configuration
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is not absolute
    pub fn web_form_scenario(&self) -> ProbeResult<Scenario> {
        form::web_form_scenario(&self.base_url, &self.form, self.hover_mode, self.settle_ms)
    }
}

fn parse_bool(key: &str, value: &str) -> ProbeResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ProbeError::config(format!(
            "{key}: expected true or false, got {value:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    mod defaults_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = ProbeConfig::default();
            assert_eq!(config.base_url, form::DEFAULT_BASE_URL);
            assert_eq!(config.element_timeout_ms, 5000);
            assert_eq!(config.poll_interval_ms, 50);
            assert_eq!(config.navigation_timeout_ms, 30_000);
            assert_eq!(config.hover_mode, HoverMode::Inject);
            config.validate().unwrap();
        }

        #[test]
        fn test_session_options() {
            let config = ProbeConfig {
                element_timeout_ms: 250,
                poll_interval_ms: 10,
                navigation_timeout_ms: 999,
                ..ProbeConfig::default()
            };
            let options = config.session_options();
            assert_eq!(options.wait.timeout_ms, 250);
            assert_eq!(options.wait.poll_interval_ms, 10);
            assert_eq!(options.navigation_timeout_ms, 999);
        }

        #[test]
        fn test_builtin_scenario_uses_settings() {
            let config = ProbeConfig {
                base_url: "http://localhost:8000/".to_string(),
                ..ProbeConfig::default()
            };
            let scenario = config.web_form_scenario().unwrap();
            assert_eq!(scenario.target.as_deref(), Some("http://localhost:8000/"));
            assert_eq!(scenario.steps.len(), 9);
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn test_partial_yaml_keeps_defaults() {
            let config = ProbeConfig::from_yaml(
                "base_url: http://localhost:8080/tiptop/\nhover_mode: pointer\nbrowser:\n  headless: false\n",
            )
            .unwrap();
            assert_eq!(config.base_url, "http://localhost:8080/tiptop/");
            assert_eq!(config.hover_mode, HoverMode::Pointer);
            assert!(!config.browser.headless);
            assert!(config.browser.sandbox);
            assert_eq!(config.settle_ms, DEFAULT_SETTLE_MS);
        }

        #[test]
        fn test_from_file() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(b"element_timeout_ms: 1200\nform:\n  option_count: 7\n")
                .unwrap();
            let config = ProbeConfig::from_file(file.path()).unwrap();
            assert_eq!(config.element_timeout_ms, 1200);
            assert_eq!(config.form.option_count, 7);
            assert_eq!(config.form.select_value, "white");
        }

        #[test]
        fn test_missing_file_is_config_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = ProbeConfig::from_file(dir.path().join("absent.yaml")).unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
            assert!(err.to_string().contains("absent.yaml"));
        }
    }

    mod env_tests {
        use super::*;

        #[test]
        fn test_env_overrides() {
            let mut config = ProbeConfig::default();
            config
                .apply_env_from(env(&[
                    (ENV_BASE_URL, "http://127.0.0.1:3000/"),
                    (ENV_BROWSER, "edge"),
                    (ENV_BROWSER_PATH, "/opt/edge/msedge"),
                    (ENV_HEADLESS, "false"),
                    (ENV_NO_SANDBOX, "1"),
                    (ENV_ELEMENT_TIMEOUT_MS, "750"),
                ]))
                .unwrap();
            assert_eq!(config.base_url, "http://127.0.0.1:3000/");
            assert_eq!(config.browser.engine, BrowserEngine::Edge);
            assert_eq!(
                config.browser.executable_path.as_deref(),
                Some(Path::new("/opt/edge/msedge"))
            );
            assert!(!config.browser.headless);
            assert!(!config.browser.sandbox);
            assert_eq!(config.element_timeout_ms, 750);
        }

        #[test]
        fn test_empty_env_changes_nothing() {
            let mut config = ProbeConfig::default();
            config.apply_env_from(env(&[])).unwrap();
            assert_eq!(config, ProbeConfig::default());
        }

        #[test]
        fn test_invalid_values_name_variable() {
            let mut config = ProbeConfig::default();
            let err = config
                .apply_env_from(env(&[(ENV_HEADLESS, "maybe")]))
                .unwrap_err();
            assert!(err.to_string().contains(ENV_HEADLESS));

            let err = config
                .apply_env_from(env(&[(ENV_BROWSER, "firefox")]))
                .unwrap_err();
            assert!(err.to_string().contains(ENV_BROWSER));

            let err = config
                .apply_env_from(env(&[(ENV_ELEMENT_TIMEOUT_MS, "soon")]))
                .unwrap_err();
            assert!(matches!(err, ProbeError::Config { .. }));
        }
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn test_relative_base_rejected() {
            let config = ProbeConfig {
                base_url: "tiptop/".to_string(),
                ..ProbeConfig::default()
            };
            assert!(config.validate().is_err());
        }

        #[test]
        fn test_zero_poll_interval_rejected() {
            let config = ProbeConfig {
                poll_interval_ms: 0,
                ..ProbeConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_example_file_matches_defaults() {
        let example = include_str!("../../../formprobe.example.yaml");
        assert_eq!(ProbeConfig::from_yaml(example).unwrap(), ProbeConfig::default());
    }
}
