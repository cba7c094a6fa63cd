//! Formprobe: browser-driven functional checks for web forms
//!
//! Opens a real browser over the Chrome `DevTools` Protocol, locates form
//! elements, asserts on their attributes and computed styles, types into
//! inputs, submits, and checks the resulting navigation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   FORMPROBE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Scenario   │    │ Session    │            │
//! │   │ (YAML or   │───►│ Runner     │───►│ (Driver)   │───► page   │
//! │   │  built-in) │    │            │    │            │            │
//! │   └────────────┘    └─────┬──────┘    └─────▲──────┘            │
//! │                           │ Step::run       │ Locator::find     │
//! │                           ▼                 │                   │
//! │                     ┌────────────┐          │                   │
//! │                     │ Actions +  │──────────┘                   │
//! │                     │ Checks     │───► StepResult ───► Report   │
//! │                     └────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "browser")]
//! # async fn demo() -> formprobe::ProbeResult<()> {
//! use formprobe::{CdpLauncher, ProbeConfig, ScenarioRunner};
//!
//! let config = ProbeConfig::load(None)?;
//! let runner = ScenarioRunner::new(
//!     Box::new(CdpLauncher::new(config.browser.clone())),
//!     config.session_options(),
//!     config.base_url.clone(),
//! );
//! let report = runner.run(&config.web_form_scenario()?).await;
//! assert!(report.passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod browser;
mod config;
mod driver;
mod locator;
mod report;
mod result;
mod runner;
mod scenario;
mod session;
mod step;

/// The web form under test: selectors, expected values, built-in scenario
pub mod form;

/// In-memory driver for tests
pub mod mock;

/// Bounded waits
pub mod wait;

#[cfg(feature = "browser")]
pub use browser::{CdpDriver, CdpLauncher};
pub use browser::{BrowserConfig, BrowserEngine};
pub use config::{
    ProbeConfig, DEFAULT_SETTLE_MS, ENV_BASE_URL, ENV_BROWSER, ENV_BROWSER_PATH,
    ENV_ELEMENT_TIMEOUT_MS, ENV_HEADLESS, ENV_NO_SANDBOX,
};
pub use driver::{Driver, ElementHandle, Launcher};
pub use form::{FormContract, FormValues, HoverMode};
pub use locator::{Locator, Selector, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
pub use report::{FatalError, ScenarioReport, StepOutcome, StepResult, SuiteReport};
pub use result::{ErrorKind, ProbeError, ProbeResult};
pub use runner::ScenarioRunner;
pub use scenario::Scenario;
pub use session::{Session, SessionOptions};
pub use step::{Action, Check, Interaction, Match, Step};
pub use wait::WaitOptions;
