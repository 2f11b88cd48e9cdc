//! CLI command definitions using clap

use crate::config::{ColorChoice, LogFormat};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Droidflow: run Android UI flow suites through Appium
#[derive(Parser, Debug)]
#[command(name = "droidflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log output format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scenario suite and write a CSV report
    Run(RunArgs),

    /// List groups and scenarios
    Scenarios(ScenariosArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Configuration file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run only this group
    #[arg(short, long)]
    pub group: Option<String>,

    /// Run only scenarios whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Appium server URL
    #[arg(long)]
    pub server: Option<String>,

    /// Device name or serial
    #[arg(long)]
    pub device: Option<String>,

    /// Directory for the CSV report
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// End driver sessions after each scenario or group
    #[arg(long)]
    pub close_on_teardown: bool,

    /// Skip the adb application reset
    #[arg(long)]
    pub no_reset: bool,

    /// Print results as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the scenarios command
#[derive(Parser, Debug, Default)]
pub struct ScenariosArgs {
    /// List only this group
    #[arg(short, long)]
    pub group: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug, Default)]
pub struct ConfigArgs {
    /// Print the effective configuration as YAML
    #[arg(long, conflicts_with = "init")]
    pub show: bool,

    /// Write a starter configuration file
    #[arg(long, value_name = "FILE")]
    pub init: Option<PathBuf>,

    /// Configuration file to resolve
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => Self::Text,
            LogFormatArg::Json => Self::Json,
        }
    }
}
