//! Suite configuration.
//!
//! Values are resolved in order: built-in defaults, an optional YAML file,
//! then `DROIDFLOW_*` environment variables. The CLI applies its flags last.

use crate::driver::WaitOptions;
use crate::result::{DroidflowError, DroidflowResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `session.server_url`
pub const ENV_SERVER_URL: &str = "DROIDFLOW_SERVER_URL";
/// Environment variable overriding `session.device_name`
pub const ENV_DEVICE: &str = "DROIDFLOW_DEVICE";
/// Environment variable overriding `session.app_package`
pub const ENV_APP_PACKAGE: &str = "DROIDFLOW_APP_PACKAGE";
/// Environment variable overriding `credentials.valid_email`
pub const ENV_EMAIL: &str = "DROIDFLOW_EMAIL";
/// Environment variable overriding `credentials.valid_password`
pub const ENV_PASSWORD: &str = "DROIDFLOW_PASSWORD";
/// Environment variable overriding `report.output_dir`
pub const ENV_REPORT_DIR: &str = "DROIDFLOW_REPORT_DIR";
/// Environment variable overriding `teardown.close_on_teardown`
pub const ENV_CLOSE_ON_TEARDOWN: &str = "DROIDFLOW_CLOSE_ON_TEARDOWN";

/// Driver session parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Appium server endpoint
    pub server_url: String,
    /// Platform name capability
    pub platform_name: String,
    /// Device identifier (adb serial)
    pub device_name: String,
    /// Platform version capability
    pub platform_version: String,
    /// Package of the application under test
    pub app_package: String,
    /// Launch activity
    pub app_activity: String,
    /// Automation engine
    pub automation_name: String,
    /// Keep app data between sessions
    pub no_reset: bool,
    /// Grant runtime permissions on install
    pub auto_grant_permissions: bool,
    /// Implicit wait applied to every lookup
    pub implicit_wait_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:4723/wd/hub".to_string(),
            platform_name: "Android".to_string(),
            device_name: "emulator-5554".to_string(),
            platform_version: "16".to_string(),
            app_package: "com.raising.prodigy".to_string(),
            app_activity: "com.raising.prodigy.MainActivity".to_string(),
            automation_name: "UiAutomator2".to_string(),
            no_reset: false,
            auto_grant_permissions: true,
            implicit_wait_secs: 15,
        }
    }
}

/// Explicit wait settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Readiness wait timeout
    pub explicit_wait_secs: u64,
    /// Delay between readiness polls
    pub poll_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            explicit_wait_secs: 20,
            poll_interval_ms: 250,
        }
    }
}

impl TimeoutConfig {
    /// Wait options for the step executor
    #[must_use]
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(Duration::from_secs(self.explicit_wait_secs))
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
    }
}

/// Application reset settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetConfig {
    /// Run the reset commands at all
    pub enabled: bool,
    /// adb executable
    pub adb_path: PathBuf,
    /// Pass `-s <device_name>` to adb
    pub target_device: bool,
    /// Delay after force-stop
    pub force_stop_settle_ms: u64,
    /// Delay after clearing app data
    pub clear_data_settle_ms: u64,
    /// Delay after resetting permissions
    pub reset_permissions_settle_ms: u64,
    /// Delay between session release and the post-teardown reset
    pub post_teardown_delay_ms: u64,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            adb_path: PathBuf::from("adb"),
            target_device: false,
            force_stop_settle_ms: 2000,
            clear_data_settle_ms: 3000,
            reset_permissions_settle_ms: 2000,
            post_teardown_delay_ms: 3000,
        }
    }
}

/// Session teardown policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeardownConfig {
    /// End the driver session on release; when false the app stays open
    pub close_on_teardown: bool,
}

/// Login credentials used by the built-in scenarios
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Registered account email
    pub valid_email: String,
    /// Registered account password
    pub valid_password: String,
    /// Email with no account
    pub invalid_email: String,
    /// Wrong password for the registered account
    pub invalid_password: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            valid_email: "program1@prodigy.baby".to_string(),
            valid_password: "123456".to_string(),
            invalid_email: "invalid@email.com".to_string(),
            invalid_password: "wrongpassword".to_string(),
        }
    }
}

/// Report output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory receiving report files
    pub output_dir: PathBuf,
    /// File name prefix
    pub file_prefix: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test-reports"),
            file_prefix: "TestReport".to_string(),
        }
    }
}

/// Complete suite configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Driver session parameters
    pub session: SessionConfig,
    /// Explicit wait settings
    pub timeouts: TimeoutConfig,
    /// Application reset settings
    pub reset: ResetConfig,
    /// Teardown policy
    pub teardown: TeardownConfig,
    /// Credentials for the login scenarios
    pub credentials: CredentialsConfig,
    /// Report output
    pub report: ReportConfig,
}

impl SuiteConfig {
    /// Parse from YAML. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> DroidflowResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        Ok(config)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> DroidflowResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Resolve defaults, the optional file and the process environment, then validate
    pub fn load(path: Option<&Path>) -> DroidflowResult<Self> {
        let mut config = match path {
            Some(path) => {
                let yaml = std::fs::read_to_string(path).map_err(|e| {
                    DroidflowError::config(format!("cannot read {}: {e}", path.display()))
                })?;
                tracing::debug!(path = %path.display(), "loaded configuration file");
                Self::from_yaml(&yaml)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DROIDFLOW_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> DroidflowResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_SERVER_URL) {
            self.session.server_url = v;
        }
        if let Some(v) = lookup(ENV_DEVICE) {
            self.session.device_name = v;
        }
        if let Some(v) = lookup(ENV_APP_PACKAGE) {
            self.session.app_package = v;
        }
        if let Some(v) = lookup(ENV_EMAIL) {
            self.credentials.valid_email = v;
        }
        if let Some(v) = lookup(ENV_PASSWORD) {
            self.credentials.valid_password = v;
        }
        if let Some(v) = lookup(ENV_REPORT_DIR) {
            self.report.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_CLOSE_ON_TEARDOWN) {
            self.teardown.close_on_teardown = parse_flag(ENV_CLOSE_ON_TEARDOWN, &v)?;
        }
        Ok(())
    }

    /// Reject values no run could succeed with
    pub fn validate(&self) -> DroidflowResult<()> {
        if self.session.server_url.trim().is_empty() {
            return Err(DroidflowError::config("session.server_url must not be empty"));
        }
        if self.session.app_package.trim().is_empty() {
            return Err(DroidflowError::config("session.app_package must not be empty"));
        }
        if self.timeouts.explicit_wait_secs == 0 {
            return Err(DroidflowError::config(
                "timeouts.explicit_wait_secs must be greater than zero",
            ));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(DroidflowError::config(
                "timeouts.poll_interval_ms must be greater than zero",
            ));
        }
        if self.report.file_prefix.contains(['/', '\\']) {
            return Err(DroidflowError::config(
                "report.file_prefix must not contain path separators",
            ));
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> DroidflowResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(DroidflowError::config(format!(
            "{key}: expected a boolean, got '{other}'"
        ))),
    }
}
