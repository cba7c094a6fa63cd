//! Formprobe CLI library
//!
//! Argument parsing, console output and logging setup for the `formprobe`
//! binary.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;

pub use commands::{Cli, ColorArg, EngineArg};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{step_line, ProgressReporter};
