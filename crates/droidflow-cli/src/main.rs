//! Droidflow CLI: run Android UI flow suites
//!
//! ## Usage
//!
//! ```bash
//! droidflow run                              # Run every scenario
//! droidflow run --group Login                # One group
//! droidflow run --filter invalid --json      # Matching scenarios, JSON on stdout
//! droidflow scenarios                        # List scenarios
//! droidflow config --init droidflow.yaml     # Write a starter configuration
//! ```
//!
//! Exit status: 0 when no scenario failed, 1 when any failed, 2 when the
//! run could not complete.

use clap::Parser;
use droidflow_cli::{
    handlers::{self, EXIT_FATAL},
    Cli, CliConfig, CliError, CliResult, Commands, LogFormat, Reporter, Verbosity,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(&config);

    match run(cli.command, &config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(cli.color.into())
        .with_log_format(cli.log_format.into())
}

fn init_tracing(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.filter_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.log_format {
        LogFormat::Text => builder
            .with_ansi(config.color.should_color())
            .with_target(config.verbosity.is_verbose())
            .init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn run(command: Commands, config: &CliConfig) -> CliResult<u8> {
    let reporter = Reporter::new(config.color.should_color(), config.verbosity.is_quiet());
    match command {
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| CliError::runtime(e.to_string()))?;
            let outcome = runtime.block_on(handlers::run(&args, &reporter))?;
            Ok(u8::try_from(outcome.exit_code()).unwrap_or(EXIT_FATAL))
        }
        Commands::Scenarios(args) => {
            print!("{}", handlers::list_scenarios(&args)?);
            Ok(0)
        }
        Commands::Config(args) => {
            if let Some(yaml) = handlers::config(&args, &reporter)? {
                print!("{yaml}");
            }
            Ok(0)
        }
    }
}
