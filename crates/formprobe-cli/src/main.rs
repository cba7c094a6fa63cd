//! Formprobe: browser-driven checks for a web form
//!
//! ## Usage
//!
//! ```bash
//! formprobe                                   # Run the built-in form scenario
//! formprobe --base-url http://localhost:8000/ # Against a local copy
//! formprobe -s checks.yaml --report out.json  # Run a scenario file, write JSON
//! formprobe --print-scenario > web_form.yaml  # Dump the built-in scenario
//! ```

use clap::Parser;
use formprobe::{Launcher, ProbeConfig, Scenario, ScenarioRunner, SuiteReport};
use formprobe_cli::{logging, Cli, CliConfig, CliError, CliResult, ProgressReporter, Verbosity};
use std::process::ExitCode;
use std::time::Instant;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run() -> CliResult<bool> {
    let cli = Cli::parse();
    let output = build_config(&cli);
    logging::init(output.verbosity);
    check_arguments(&cli)?;

    let mut config = ProbeConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;

    if cli.print_scenario {
        print!("{}", config.web_form_scenario()?.to_yaml()?);
        return Ok(true);
    }

    let scenarios = load_scenarios(&cli, &config)?;
    let launcher = launcher(&config)?;
    let browser = launcher.describe();
    tracing::info!(browser = %browser, base_url = %config.base_url, "starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let runner = ScenarioRunner::new(launcher, config.session_options(), config.base_url.clone());

    let mut reporter = ProgressReporter::new(output.color.should_color(), output.verbosity.is_quiet());
    if output.verbosity.is_verbose() {
        reporter.info(&format!(
            "{} scenario(s) against {} using {}",
            scenarios.len(),
            config.base_url,
            browser
        ));
    }
    let started = Instant::now();
    let mut suite = SuiteReport::default();
    for scenario in &scenarios {
        reporter.start_scenario(&scenario.name);
        let report = runtime.block_on(runner.run(scenario));
        reporter.finish();
        reporter.scenario(&report);
        suite.scenarios.push(report);
    }
    reporter.summary(&suite, started.elapsed());

    if let Some(path) = &cli.report {
        suite
            .write_json(path)
            .map_err(|e| CliError::report_generation(format!("{}: {e}", path.display())))?;
        reporter.info(&format!("report written to {}", path.display()));
    }

    Ok(suite.passed())
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
}

fn check_arguments(cli: &Cli) -> CliResult<()> {
    if cli.print_scenario && !cli.scenario.is_empty() {
        return Err(CliError::invalid_argument(
            "--print-scenario prints the built-in scenario and cannot be combined with --scenario",
        ));
    }
    if cli.timeout == Some(0) {
        return Err(CliError::invalid_argument("--timeout must be positive"));
    }
    Ok(())
}

fn load_scenarios(cli: &Cli, config: &ProbeConfig) -> CliResult<Vec<Scenario>> {
    if cli.scenario.is_empty() {
        return Ok(vec![config.web_form_scenario()?]);
    }
    cli.scenario
        .iter()
        .map(|path| Scenario::from_file(path).map_err(CliError::from))
        .collect()
}

#[cfg(feature = "browser")]
fn launcher(config: &ProbeConfig) -> CliResult<Box<dyn Launcher>> {
    Ok(Box::new(formprobe::CdpLauncher::new(config.browser.clone())))
}

#[cfg(not(feature = "browser"))]
fn launcher(_config: &ProbeConfig) -> CliResult<Box<dyn Launcher>> {
    Err(CliError::config(
        "built without browser support; rebuild with --features browser",
    ))
}
