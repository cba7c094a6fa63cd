//! CLI argument definitions using clap

use clap::{Parser, ValueEnum};
use formprobe::{BrowserEngine, ProbeConfig};
use std::path::PathBuf;

/// Formprobe: run browser-driven functional checks against a web form
#[derive(Parser, Debug)]
#[command(name = "formprobe")]
#[command(author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the form page
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Browser engine to launch
    #[arg(long, value_enum)]
    pub browser: Option<EngineArg>,

    /// Explicit browser executable
    #[arg(long, value_name = "PATH")]
    pub browser_path: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Launch without the browser sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Element wait bound in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Scenario file to run instead of the built-in one (repeatable)
    #[arg(short, long, value_name = "FILE")]
    pub scenario: Vec<PathBuf>,

    /// Write a JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Print the built-in scenario as YAML and exit
    #[arg(long)]
    pub print_scenario: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (failures only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorArg,
}

impl Cli {
    /// Layer flag overrides on top of a loaded configuration
    pub fn apply_to(&self, config: &mut ProbeConfig) {
        if let Some(url) = &self.base_url {
            config.base_url.clone_from(url);
        }
        if let Some(engine) = self.browser {
            config.browser.engine = engine.into();
        }
        if let Some(path) = &self.browser_path {
            config.browser.executable_path = Some(path.clone());
        }
        if self.headed {
            config.browser.headless = false;
        }
        if self.no_sandbox {
            config.browser.sandbox = false;
        }
        if let Some(timeout) = self.timeout {
            config.element_timeout_ms = timeout;
        }
    }
}

/// Browser engine argument
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineArg {
    /// Chromium
    Chromium,
    /// Google Chrome
    Chrome,
    /// Microsoft Edge
    Edge,
}

impl From<EngineArg> for BrowserEngine {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Chromium => Self::Chromium,
            EngineArg::Chrome => Self::Chrome,
            EngineArg::Edge => Self::Edge,
        }
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
