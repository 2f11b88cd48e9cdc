//! Command handlers

use crate::commands::{ConfigArgs, RunArgs, ScenariosArgs};
use crate::error::{CliError, CliResult};
use crate::output::Reporter;
use droidflow::{
    default_suite, AdbShell, AppiumSessionFactory, DeviceShell, LifecycleController,
    ResultRecorder, SessionFactory, SessionScope, Suite, SuiteConfig, SuiteOutcome, SuiteRunner,
};
use std::fmt::Write as _;
use std::time::Instant;

/// Exit status for runs that could not complete
pub const EXIT_FATAL: u8 = 2;

// =============================================================================
// RUN
// =============================================================================

/// Load the configuration file and environment, then apply `run` flags
pub fn resolve_config(args: &RunArgs) -> CliResult<SuiteConfig> {
    let mut config = SuiteConfig::load(args.config.as_deref())?;
    apply_overrides(&mut config, args);
    config.validate()?;
    tracing::debug!(
        server = %config.session.server_url,
        device = %config.session.device_name,
        reset = config.reset.enabled,
        close_on_teardown = config.teardown.close_on_teardown,
        "configuration resolved"
    );
    Ok(config)
}

/// Apply command-line overrides, the last configuration layer
pub fn apply_overrides(config: &mut SuiteConfig, args: &RunArgs) {
    if let Some(server) = &args.server {
        config.session.server_url.clone_from(server);
    }
    if let Some(device) = &args.device {
        config.session.device_name.clone_from(device);
    }
    if let Some(dir) = &args.report_dir {
        config.report.output_dir.clone_from(dir);
    }
    if args.close_on_teardown {
        config.teardown.close_on_teardown = true;
    }
    if args.no_reset {
        config.reset.enabled = false;
    }
}

/// The default suite narrowed by `--group` and `--filter`
pub fn select_suite(
    config: &SuiteConfig,
    group: Option<&str>,
    filter: Option<&str>,
) -> CliResult<Suite> {
    let suite = default_suite(config).filtered(group, filter);
    if suite.scenario_count() == 0 {
        let mut criteria = Vec::new();
        if let Some(group) = group {
            criteria.push(format!("group '{group}'"));
        }
        if let Some(filter) = filter {
            criteria.push(format!("filter '{filter}'"));
        }
        return Err(CliError::invalid_argument(format!(
            "no scenarios match {}",
            criteria.join(" and ")
        )));
    }
    Ok(suite)
}

/// `droidflow run` against the configured Appium server
pub async fn run(args: &RunArgs, reporter: &Reporter) -> CliResult<SuiteOutcome> {
    let config = resolve_config(args)?;
    let suite = select_suite(&config, args.group.as_deref(), args.filter.as_deref())?;
    let shell = AdbShell::from_config(&config.reset, &config.session);
    let lifecycle = LifecycleController::new(AppiumSessionFactory, shell, &config);
    execute_suite(&config, &suite, lifecycle, reporter, args.json).await
}

/// Run `suite`, write the report and print the summary.
///
/// The report is written even when the run stopped early.
pub async fn execute_suite<F: SessionFactory, S: DeviceShell>(
    config: &SuiteConfig,
    suite: &Suite,
    lifecycle: LifecycleController<F, S>,
    reporter: &Reporter,
    json: bool,
) -> CliResult<SuiteOutcome> {
    let runner = SuiteRunner::new(lifecycle, config.timeouts.wait_options());
    let mut recorder = ResultRecorder::new();
    reporter.info(&format!(
        "Running {} scenarios against {} ({})",
        suite.scenario_count(),
        config.session.server_url,
        config.session.device_name
    ));

    let started = Instant::now();
    let run = runner.run(suite, &mut recorder).await;

    reporter.header("Results");
    for result in recorder.results() {
        reporter.result(result);
    }

    let written = recorder.write_to(&config.report.output_dir, &config.report.file_prefix);
    match &written {
        Ok(path) => reporter.report_written(path),
        Err(e) => reporter.failure(&e.to_string()),
    }
    reporter.summary(&recorder.summary(), started.elapsed());
    if json {
        println!("{}", recorder.to_json()?);
    }

    let outcome = run.map_err(|e| {
        reporter.failure(&e.to_string());
        CliError::SuiteAborted(e)
    })?;
    written?;
    Ok(outcome)
}

// =============================================================================
// SCENARIOS
// =============================================================================

/// `droidflow scenarios`: groups, session scope and step counts
pub fn list_scenarios(args: &ScenariosArgs) -> CliResult<String> {
    let config = SuiteConfig::default();
    let suite = select_suite(&config, args.group.as_deref(), None)?;
    let mut out = String::new();
    for group in &suite.groups {
        let scope = match group.session {
            SessionScope::PerScenario => "fresh session per scenario",
            SessionScope::PerGroup => "shared session",
        };
        let _ = writeln!(out, "{} ({scope})", group.name);
        if let Some(prelude) = &group.prelude {
            let _ = writeln!(
                out,
                "  setup: {} [{} steps]",
                prelude.name,
                prelude.steps.len()
            );
        }
        for scenario in &group.scenarios {
            let mut line = format!("  {} [{} steps]", scenario.name, scenario.steps.len());
            if let Some(reason) = &scenario.skip_reason {
                let _ = write!(line, " skipped: {reason}");
            } else if scenario.optional {
                line.push_str(" optional");
            }
            let _ = writeln!(out, "{line}");
        }
    }
    Ok(out)
}

// =============================================================================
// CONFIG
// =============================================================================

/// `droidflow config`: print the effective configuration, or write a starter file
pub fn config(args: &ConfigArgs, reporter: &Reporter) -> CliResult<Option<String>> {
    if let Some(path) = &args.init {
        if path.exists() {
            return Err(CliError::config(format!(
                "{} already exists, refusing to overwrite",
                path.display()
            )));
        }
        std::fs::write(path, SuiteConfig::default().to_yaml()?)?;
        reporter.info(&format!("Wrote {}", path.display()));
        return Ok(None);
    }
    let config = SuiteConfig::load(args.config.as_deref())?;
    Ok(Some(config.to_yaml()?))
}
