//! Console output and progress reporting

use console::{style, Style, Term};
use formprobe::{ScenarioReport, StepOutcome, StepResult, SuiteReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress reporter for scenario execution
///
/// Step results and summaries go to stdout; the spinner draws on stderr.
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    spinner: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            spinner: None,
            use_color,
            quiet,
        }
    }

    /// Start a spinner while a scenario runs
    pub fn start_scenario(&mut self, name: &str) {
        if self.quiet {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(format!("running {name}"));
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Stop the spinner
    pub fn finish(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    /// Print every step of a finished scenario
    pub fn scenario(&self, report: &ScenarioReport) {
        self.header(&format!("{} ({})", report.scenario, report.target_url));
        if let Some(fatal) = &report.fatal {
            self.failure(&format!("{}: {}", fatal.kind, fatal.message));
        }
        for step in &report.steps {
            match &step.outcome {
                StepOutcome::Passed => self.success(&step_line(step)),
                StepOutcome::Failed { .. } => self.failure(&step_line(step)),
                StepOutcome::Skipped { .. } => self.skipped(&step_line(step)),
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Failures print even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a skipped step
    pub fn skipped(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("-").yellow().bold().to_string()
        } else {
            "SKIP".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the suite summary
    pub fn summary(&self, suite: &SuiteReport, duration: Duration) {
        let (passed, failed, skipped) = suite.scenarios.iter().fold((0, 0, 0), |acc, s| {
            (
                acc.0 + s.passed_count(),
                acc.1 + s.failed_count(),
                acc.2 + s.skipped_count(),
            )
        });
        let fatal = suite.scenarios.iter().filter(|s| s.fatal.is_some()).count();
        if self.quiet && suite.passed() {
            return;
        }

        let _ = self.term.write_line("");
        let _ = self
            .term
            .write_line(&self.summary_line(passed, failed, skipped, fatal, duration));
    }

    fn summary_line(
        &self,
        passed: usize,
        failed: usize,
        skipped: usize,
        fatal: usize,
        duration: Duration,
    ) -> String {
        let total = passed + failed + skipped;
        let duration_secs = duration.as_secs_f64();
        let ok = failed == 0 && fatal == 0;
        let fatal_note = if fatal > 0 {
            format!(", {fatal} fatal")
        } else {
            String::new()
        };

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if ok {
                passed_style.apply_to("PASSED")
            } else {
                failed_style.apply_to("FAILED")
            };

            format!(
                "{} {} steps in {:.2}s ({} passed, {} failed, {} skipped{})",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped),
                fatal_note
            )
        } else {
            let status = if ok { "PASSED" } else { "FAILED" };
            format!(
                "{status} {total} steps in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped{fatal_note})"
            )
        }
    }
}

/// One-line rendering of a step result, without the status prefix
#[must_use]
pub fn step_line(step: &StepResult) -> String {
    match &step.outcome {
        StepOutcome::Passed => format!("{} ({}ms)", step.name, step.duration_ms),
        StepOutcome::Failed { kind, message, .. } => {
            format!("{} [{kind}]: {message}", step.name)
        }
        StepOutcome::Skipped { reason } => format!("{} (skipped: {reason})", step.name),
    }
}
