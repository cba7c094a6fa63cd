//! Scenario runner.
//!
//! ```text
//! open session ──► step 1 ──► step 2 ──► ... ──► step N ──► close session
//!      │              │ fatal                                   ▲
//!      │ launch       └──────────► remaining steps skipped ─────┘
//!      └ failure ───► every step skipped, nothing to close
//! ```
//!
//! Non-fatal step failures are recorded and execution continues with the
//! next step. The session is closed on every path that opened it.

use std::time::Instant;

use chrono::Utc;

use crate::driver::Launcher;
use crate::report::{millis, FatalError, ScenarioReport, StepResult, SuiteReport};
use crate::result::ProbeError;
use crate::scenario::Scenario;
use crate::session::{Session, SessionOptions};

/// Runs scenarios, one fresh session each
#[derive(Debug)]
pub struct ScenarioRunner {
    launcher: Box<dyn Launcher>,
    options: SessionOptions,
    base_url: String,
}

impl ScenarioRunner {
    /// Create a runner
    #[must_use]
    pub fn new(
        launcher: Box<dyn Launcher>,
        options: SessionOptions,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            launcher,
            options,
            base_url: base_url.into(),
        }
    }

    /// Base URL scenario targets resolve against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one scenario to completion.
    ///
    /// Never fails: launch problems and step failures are recorded in the
    /// returned report.
    pub async fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let started_at = Utc::now();
        let start = Instant::now();
        tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "running scenario");

        let opened = match scenario.resolve_target(&self.base_url) {
            Ok(target) => Session::open(&*self.launcher, &target, self.options.clone())
                .await
                .map(|session| (session, target)),
            Err(e) => Err(ProbeError::launch(format!("cannot resolve target: {e}"))),
        };

        let (mut session, target_url) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                tracing::warn!(scenario = %scenario.name, error = %e, "session did not open");
                let reason = format!("session did not open: {e}");
                return ScenarioReport {
                    scenario: scenario.name.clone(),
                    target_url: scenario
                        .resolve_target(&self.base_url)
                        .unwrap_or_else(|_| self.base_url.clone()),
                    started_at,
                    duration_ms: millis(start.elapsed()),
                    steps: scenario
                        .steps
                        .iter()
                        .map(|step| StepResult::skip(&step.name, reason.as_str()))
                        .collect(),
                    fatal: Some(FatalError::from(&e)),
                };
            }
        };

        let mut results = Vec::with_capacity(scenario.steps.len());
        let mut fatal = None;

        for step in &scenario.steps {
            if let Some(FatalError { message, .. }) = &fatal {
                results.push(StepResult::skip(
                    &step.name,
                    format!("aborted after fatal error: {message}"),
                ));
                continue;
            }

            let step_start = Instant::now();
            let outcome = step.run(&mut session).await;
            let elapsed = step_start.elapsed();

            let result = match outcome {
                Ok(()) => {
                    tracing::info!(step = %step.name, "step passed");
                    StepResult::pass(&step.name)
                }
                Err(e) => {
                    tracing::info!(step = %step.name, kind = %e.kind(), error = %e, "step failed");
                    if e.is_fatal() {
                        fatal = Some(FatalError::from(&e));
                    }
                    StepResult::fail(&step.name, &e)
                }
            };
            results.push(result.with_duration(elapsed));
        }

        if let Err(e) = session.close().await {
            tracing::warn!(scenario = %scenario.name, error = %e, "failed to close session");
        }

        let report = ScenarioReport {
            scenario: scenario.name.clone(),
            target_url,
            started_at,
            duration_ms: millis(start.elapsed()),
            steps: results,
            fatal,
        };
        tracing::info!(
            scenario = %report.scenario,
            passed = report.passed_count(),
            failed = report.failed_count(),
            skipped = report.skipped_count(),
            "scenario finished"
        );
        report
    }

    /// Run scenarios one after another, each with its own session
    pub async fn run_all(&self, scenarios: &[Scenario]) -> SuiteReport {
        let mut suite = SuiteReport::default();
        for scenario in scenarios {
            suite.scenarios.push(self.run(scenario).await);
        }
        suite
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{self, FormContract, HoverMode};
    use crate::locator::{Locator, Selector};
    use crate::mock::{self, MockDriver, MockElement, MockEvent, MockLauncher};
    use crate::report::StepOutcome;
    use crate::result::ErrorKind;
    use crate::step::{Action, Check, Match, Step};
    use crate::wait::WaitOptions;

    const BASE: &str = "https://forms.test/tiptop/";

    fn options() -> SessionOptions {
        SessionOptions::new()
            .with_wait(WaitOptions::new().with_timeout(60).with_poll_interval(5))
            .with_navigation_timeout(1_000)
    }

    fn runner(launcher: &MockLauncher) -> ScenarioRunner {
        ScenarioRunner::new(Box::new(launcher.clone()), options(), BASE)
    }

    fn web_form(contract: &FormContract, hover: HoverMode) -> Scenario {
        form::web_form_scenario(BASE, contract, hover, 0).unwrap()
    }

    fn form_launcher(contract: FormContract) -> MockLauncher {
        MockLauncher::new(move || mock::form_page(BASE, &contract))
    }

    fn outcome_kind(report: &ScenarioReport, step: &str) -> Option<ErrorKind> {
        match &report.step(step)?.outcome {
            StepOutcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    mod web_form_tests {
        use super::*;

        #[tokio::test]
        async fn test_conforming_page_passes_every_step() {
            let launcher = form_launcher(FormContract::default());
            let report = runner(&launcher)
                .run(&web_form(&FormContract::default(), HoverMode::Inject))
                .await;
            assert!(report.passed(), "{report:#?}");
            assert_eq!(report.passed_count(), 9);
            assert_eq!(report.target_url, BASE);
            assert_eq!(launcher.launched(), 1);
            assert_eq!(launcher.closed(), 1);
        }

        #[tokio::test]
        async fn test_pointer_hover_mode_passes() {
            let launcher = form_launcher(FormContract::default());
            let report = runner(&launcher)
                .run(&web_form(&FormContract::default(), HoverMode::Pointer))
                .await;
            assert!(report.passed(), "{report:#?}");
            assert!(launcher.was_called("hover"));
        }

        #[tokio::test]
        async fn test_independent_sessions_agree() {
            let launcher = form_launcher(FormContract::default());
            let scenario = web_form(&FormContract::default(), HoverMode::Inject);
            let suite = runner(&launcher)
                .run_all(&[scenario.clone(), scenario])
                .await;
            let outcomes: Vec<Vec<StepOutcome>> = suite
                .scenarios
                .iter()
                .map(|r| r.steps.iter().map(|s| s.outcome.clone()).collect())
                .collect();
            assert_eq!(outcomes[0], outcomes[1]);
            assert!(suite.passed());
            assert_eq!(launcher.launched(), 2);
            assert_eq!(launcher.closed(), 2);
        }

        #[tokio::test]
        async fn test_seven_options_fails_only_count_step() {
            let page = FormContract {
                option_count: 7,
                ..FormContract::default()
            };
            let launcher = form_launcher(page);
            let report = runner(&launcher)
                .run(&web_form(&FormContract::default(), HoverMode::Inject))
                .await;
            assert_eq!(report.failed_count(), 1);
            match &report.step("dropdown_has_expected_options").unwrap().outcome {
                StepOutcome::Failed {
                    expected, actual, ..
                } => {
                    assert_eq!(expected.as_deref(), Some("8"));
                    assert_eq!(actual.as_deref(), Some("7"));
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
            assert!(report.step("submission_url_carries_form_data").unwrap().passed());
        }

        #[tokio::test]
        async fn test_wrong_expected_url_is_mismatch() {
            let expected = FormContract {
                select_value: "black".to_string(),
                ..FormContract::default()
            };
            let launcher = form_launcher(FormContract::default());
            let report = runner(&launcher)
                .run(&web_form(&expected, HoverMode::Inject))
                .await;
            assert_eq!(
                outcome_kind(&report, "submission_url_carries_form_data"),
                Some(ErrorKind::AssertionMismatch)
            );
        }
    }

    mod failure_tests {
        use super::*;

        fn options_page(inert_last: bool) -> MockDriver {
            let options = Locator::xpath(form::SELECT_OPTIONS);
            let mut elements = vec![MockElement::new("select").matching(Locator::xpath(form::SELECT))];
            for i in 0..3 {
                let mut option = MockElement::new("option")
                    .style("background-color", "rgba(0, 0, 0, 0)")
                    .matching(options.clone());
                if inert_last && i == 2 {
                    option = option.inert_style();
                }
                elements.push(option);
            }
            MockDriver::new().with_page(BASE, elements)
        }

        fn hover_step() -> Scenario {
            let full = web_form(&FormContract::default(), HoverMode::Inject);
            Scenario {
                steps: vec![full.steps[3].clone()],
                ..full
            }
        }

        #[tokio::test]
        async fn test_uniform_style_passes_when_all_options_take_style() {
            let launcher = MockLauncher::new(|| options_page(false));
            let report = runner(&launcher).run(&hover_step()).await;
            assert!(report.passed(), "{report:#?}");
        }

        #[tokio::test]
        async fn test_uniform_style_fails_when_one_option_differs() {
            let launcher = MockLauncher::new(|| options_page(true));
            let report = runner(&launcher).run(&hover_step()).await;
            match &report.steps[0].outcome {
                StepOutcome::Failed {
                    kind,
                    message,
                    expected,
                    actual,
                } => {
                    assert_eq!(*kind, ErrorKind::AssertionMismatch);
                    assert!(message.contains("match #3"));
                    assert_eq!(expected.as_deref(), Some("rgba(0, 123, 255, 1)"));
                    assert_eq!(actual.as_deref(), Some("rgba(0, 0, 0, 0)"));
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
            // Dropdown was closed again after the failed check.
            assert_eq!(
                launcher.history().iter().filter(|c| *c == "click 0").count(),
                2
            );
        }

        #[tokio::test]
        async fn test_missing_element_is_not_found_and_session_closed() {
            let launcher = MockLauncher::new(|| MockDriver::new().with_page(BASE, Vec::new()));
            let scenario = Scenario {
                name: "missing".to_string(),
                description: String::new(),
                target: None,
                steps: vec![
                    Step::new("never_appears").action(Action::WaitForElement {
                        target: Locator::id("message"),
                    }),
                    Step::new("still_runs").check(Check::Url {
                        expected: BASE.to_string(),
                        matching: Match::Exact,
                    }),
                ],
            };
            let report = runner(&launcher).run(&scenario).await;
            assert_eq!(outcome_kind(&report, "never_appears"), Some(ErrorKind::NotFound));
            assert!(report.step("still_runs").unwrap().passed());
            assert!(report.fatal.is_none());
            assert_eq!(launcher.closed(), 1);
        }

        #[tokio::test]
        async fn test_url_wait_timeout_does_not_stop_group() {
            let launcher = MockLauncher::new(|| MockDriver::new().with_page(BASE, Vec::new()));
            let scenario = Scenario {
                name: "no_navigation".to_string(),
                description: String::new(),
                target: None,
                steps: vec![
                    Step::new("waits_for_missing_page").action(Action::WaitForUrl {
                        contains: "never.html".to_string(),
                        timeout_ms: Some(20),
                    }),
                    Step::new("still_runs").check(Check::Url {
                        expected: BASE.to_string(),
                        matching: Match::Exact,
                    }),
                ],
            };
            let report = runner(&launcher).run(&scenario).await;
            assert_eq!(
                outcome_kind(&report, "waits_for_missing_page"),
                Some(ErrorKind::Timeout)
            );
            match &report.step("waits_for_missing_page").unwrap().outcome {
                StepOutcome::Failed { message, .. } => {
                    assert!(message.contains("after 20ms"));
                    assert!(message.contains("never.html"));
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
            assert!(report.step("still_runs").unwrap().passed());
            assert!(report.fatal.is_none());
            assert_eq!(launcher.closed(), 1);
        }

        #[tokio::test]
        async fn test_submit_that_never_enables_times_out_url_step() {
            let contract = FormContract::default();
            let launcher = MockLauncher::new(move || {
                // Page script keeps the submit button disabled.
                mock::form_page(BASE, &contract).with_hook(|dom, _| {
                    if let Some(submit) = dom.find_mut(&Selector::xpath(form::SUBMIT_BUTTON)) {
                        submit.attributes.insert("disabled".to_string(), String::new());
                    }
                })
            });
            let report = runner(&launcher)
                .run(&web_form(&FormContract::default(), HoverMode::Inject))
                .await;
            assert_eq!(
                outcome_kind(&report, "submit_enabled_with_name_and_password"),
                Some(ErrorKind::AssertionMismatch)
            );
            assert_eq!(
                outcome_kind(&report, "submit_shows_received_message"),
                Some(ErrorKind::NotFound)
            );
            assert_eq!(
                outcome_kind(&report, "submission_url_carries_form_data"),
                Some(ErrorKind::Timeout)
            );
            assert_eq!(report.failed_count(), 3);
            assert!(report.fatal.is_none());
            assert_eq!(launcher.closed(), 1);
        }

        #[tokio::test]
        async fn test_launch_failure_skips_every_step() {
            let launcher = MockLauncher::failing("no chromium on PATH");
            let scenario = web_form(&FormContract::default(), HoverMode::Inject);
            let report = runner(&launcher).run(&scenario).await;
            let fatal = report.fatal.as_ref().unwrap();
            assert_eq!(fatal.kind, ErrorKind::Launch);
            assert!(fatal.message.contains("no chromium on PATH"));
            assert_eq!(report.skipped_count(), 9);
            assert!(!report.passed());
            assert_eq!(launcher.closed(), 0);
        }

        #[tokio::test]
        async fn test_stale_session_aborts_remaining_steps() {
            let contract = FormContract::default();
            let launcher = MockLauncher::new(move || {
                // Every keystroke reloads the document.
                mock::form_page(BASE, &contract).with_hook(|dom, event| {
                    if matches!(event, MockEvent::Typed(_)) {
                        dom.generation += 1;
                    }
                })
            });
            let scenario = Scenario {
                name: "stale".to_string(),
                description: String::new(),
                target: None,
                steps: vec![
                    Step::new("type_into_reloading_page").action(Action::Type {
                        target: Locator::xpath(form::NAME_INPUT),
                        text: "ab".to_string(),
                    }),
                    Step::new("never_runs").check(Check::Url {
                        expected: BASE.to_string(),
                        matching: Match::Exact,
                    }),
                ],
            };
            let report = runner(&launcher).run(&scenario).await;
            assert_eq!(
                outcome_kind(&report, "type_into_reloading_page"),
                Some(ErrorKind::StaleSession)
            );
            assert!(report.step("never_runs").unwrap().skipped());
            assert_eq!(report.fatal.as_ref().unwrap().kind, ErrorKind::StaleSession);
            assert_eq!(launcher.closed(), 1);
        }

        #[tokio::test]
        async fn test_unreachable_target_is_launch_failure() {
            let launcher = MockLauncher::new(|| MockDriver::new().with_unreachable(BASE));
            let scenario = web_form(&FormContract::default(), HoverMode::Inject);
            let report = runner(&launcher).run(&scenario).await;
            assert_eq!(report.fatal.as_ref().unwrap().kind, ErrorKind::Launch);
            assert_eq!(launcher.launched(), 1);
            assert_eq!(launcher.closed(), 1);
        }
    }
}
