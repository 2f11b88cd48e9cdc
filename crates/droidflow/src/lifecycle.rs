//! Lifecycle controller: app reset, session acquisition and release.
//!
//! Resets are best-effort. Each adb command yields a [`ResetStepOutcome`]
//! that is logged and returned; none of them can stop the suite. Session
//! acquisition is the opposite: any failure is fatal to the run.

use crate::appium::AppiumDriver;
use crate::config::{ResetConfig, SessionConfig, SuiteConfig};
use crate::driver::AutomationDriver;
use crate::result::{DroidflowError, DroidflowResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to an open session
pub type DriverHandle = Arc<dyn AutomationDriver>;

// =============================================================================
// DEVICE SHELL
// =============================================================================

/// Result of one shell invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    /// Exit status was zero
    pub success: bool,
    /// Captured stdout and stderr, trimmed
    pub output: String,
}

/// Out-of-band command channel to the device
#[async_trait]
pub trait DeviceShell: Send + Sync {
    /// Run `adb shell <args>` (or an equivalent) and wait for it to exit
    async fn shell(&self, args: &[&str]) -> DroidflowResult<ShellOutput>;
}

/// [`DeviceShell`] backed by the adb executable
#[derive(Debug, Clone)]
pub struct AdbShell {
    adb: PathBuf,
    serial: Option<String>,
}

impl AdbShell {
    /// Use `adb` at `path`, optionally targeting one device serial
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, serial: Option<String>) -> Self {
        Self {
            adb: path.into(),
            serial,
        }
    }

    /// Build from configuration
    #[must_use]
    pub fn from_config(reset: &ResetConfig, session: &SessionConfig) -> Self {
        let serial = reset.target_device.then(|| session.device_name.clone());
        Self::new(reset.adb_path.clone(), serial)
    }

    fn arguments<'a>(&'a self, args: &[&'a str]) -> Vec<&'a str> {
        let mut argv = Vec::with_capacity(args.len() + 3);
        if let Some(serial) = &self.serial {
            argv.push("-s");
            argv.push(serial.as_str());
        }
        argv.push("shell");
        argv.extend_from_slice(args);
        argv
    }
}

#[async_trait]
impl DeviceShell for AdbShell {
    async fn shell(&self, args: &[&str]) -> DroidflowResult<ShellOutput> {
        let argv = self.arguments(args);
        tracing::debug!(adb = %self.adb.display(), args = ?argv, "running adb");
        let output = tokio::process::Command::new(&self.adb)
            .args(&argv)
            .output()
            .await?;
        let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr.trim());
        }
        Ok(ShellOutput {
            success: output.status.success(),
            output: text,
        })
    }
}

// =============================================================================
// RESET
// =============================================================================

/// One application reset command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCommand {
    /// `am force-stop <package>`
    ForceStop,
    /// `pm clear <package>`
    ClearData,
    /// `pm reset-permissions <package>`
    ResetPermissions,
}

impl ResetCommand {
    /// Commands in execution order
    pub const SEQUENCE: [Self; 3] = [Self::ForceStop, Self::ClearData, Self::ResetPermissions];

    /// Shell arguments for `package`
    #[must_use]
    pub fn args(self, package: &str) -> [&str; 3] {
        match self {
            Self::ForceStop => ["am", "force-stop", package],
            Self::ClearData => ["pm", "clear", package],
            Self::ResetPermissions => ["pm", "reset-permissions", package],
        }
    }

    /// Delay after the command
    #[must_use]
    pub const fn settle(self, config: &ResetConfig) -> Duration {
        Duration::from_millis(match self {
            Self::ForceStop => config.force_stop_settle_ms,
            Self::ClearData => config.clear_data_settle_ms,
            Self::ResetPermissions => config.reset_permissions_settle_ms,
        })
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ForceStop => "force-stop",
            Self::ClearData => "clear-data",
            Self::ResetPermissions => "reset-permissions",
        }
    }
}

/// Outcome of one reset command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetStepOutcome {
    /// Command run
    pub command: ResetCommand,
    /// Whether it succeeded
    pub succeeded: bool,
    /// Output or error text
    pub detail: String,
}

/// Outcome of a full reset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetReport {
    /// Per-command outcomes, empty when resets are disabled
    pub steps: Vec<ResetStepOutcome>,
}

impl ResetReport {
    /// Whether resets were disabled
    #[must_use]
    pub fn was_skipped(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether every command succeeded
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.succeeded)
    }

    /// Commands that failed
    #[must_use]
    pub fn warnings(&self) -> Vec<&ResetStepOutcome> {
        self.steps.iter().filter(|s| !s.succeeded).collect()
    }
}

// =============================================================================
// SESSION FACTORY
// =============================================================================

/// Opens driver sessions
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a new session
    async fn open(&self, config: &SessionConfig) -> DroidflowResult<DriverHandle>;
}

/// Opens sessions on an Appium server
#[derive(Debug, Clone, Copy, Default)]
pub struct AppiumSessionFactory;

#[async_trait]
impl SessionFactory for AppiumSessionFactory {
    async fn open(&self, config: &SessionConfig) -> DroidflowResult<DriverHandle> {
        let driver = AppiumDriver::connect(config).await?;
        Ok(Arc::new(driver))
    }
}

/// Opens sessions through a closure, e.g. handing out mock drivers
pub struct FnSessionFactory<F> {
    open: F,
}

impl<F> FnSessionFactory<F>
where
    F: Fn(&SessionConfig) -> DroidflowResult<DriverHandle> + Send + Sync,
{
    /// Wrap a closure
    pub const fn new(open: F) -> Self {
        Self { open }
    }
}

impl<F> std::fmt::Debug for FnSessionFactory<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnSessionFactory").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> SessionFactory for FnSessionFactory<F>
where
    F: Fn(&SessionConfig) -> DroidflowResult<DriverHandle> + Send + Sync,
{
    async fn open(&self, config: &SessionConfig) -> DroidflowResult<DriverHandle> {
        (self.open)(config)
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// What happened to a released session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Session ended
    Closed,
    /// Left open by policy
    KeptOpen,
    /// Quit was attempted and failed
    CloseFailed(String),
}

/// Orchestrates reset, acquisition and release around scenarios
#[derive(Debug)]
pub struct LifecycleController<F, S> {
    factory: F,
    shell: S,
    session: SessionConfig,
    reset: ResetConfig,
    close_on_teardown: bool,
}

impl<F: SessionFactory, S: DeviceShell> LifecycleController<F, S> {
    /// Create a controller from configuration
    #[must_use]
    pub fn new(factory: F, shell: S, config: &SuiteConfig) -> Self {
        Self {
            factory,
            shell,
            session: config.session.clone(),
            reset: config.reset.clone(),
            close_on_teardown: config.teardown.close_on_teardown,
        }
    }

    /// Session parameters in use
    #[must_use]
    pub const fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Open a session. Every failure is reported as `DriverAcquisition`.
    pub async fn acquire_driver(&self) -> DroidflowResult<DriverHandle> {
        match self.factory.open(&self.session).await {
            Ok(driver) => Ok(driver),
            Err(e @ DroidflowError::DriverAcquisition { .. }) => {
                tracing::error!(error = %e, "driver acquisition failed");
                Err(e)
            }
            Err(e) => {
                tracing::error!(error = %e, "driver acquisition failed");
                Err(DroidflowError::DriverAcquisition {
                    message: e.to_string(),
                })
            }
        }
    }

    /// Force-stop, clear and reset permissions of the app under test.
    ///
    /// Failures are logged at WARN and returned in the report.
    pub async fn reset_application_state(&self) -> ResetReport {
        if !self.reset.enabled {
            tracing::debug!("application reset disabled");
            return ResetReport::default();
        }

        let package = self.session.app_package.as_str();
        tracing::info!(package, "resetting application state");
        let mut report = ResetReport::default();
        for command in ResetCommand::SEQUENCE {
            let outcome = match self.shell.shell(&command.args(package)).await {
                Ok(out) => ResetStepOutcome {
                    command,
                    succeeded: out.success,
                    detail: out.output,
                },
                Err(e) => ResetStepOutcome {
                    command,
                    succeeded: false,
                    detail: e.to_string(),
                },
            };
            if outcome.succeeded {
                tracing::debug!(command = command.name(), "reset step done");
            } else {
                tracing::warn!(
                    command = command.name(),
                    detail = %outcome.detail,
                    "reset step failed, continuing with existing app state"
                );
            }
            report.steps.push(outcome);
            tokio::time::sleep(command.settle(&self.reset)).await;
        }
        report
    }

    /// Release a session according to the teardown policy
    pub async fn release_driver(&self, driver: DriverHandle) -> ReleaseOutcome {
        if !self.close_on_teardown {
            tracing::info!("session kept open for inspection");
            return ReleaseOutcome::KeptOpen;
        }
        match driver.quit().await {
            Ok(()) => ReleaseOutcome::Closed,
            Err(e) => {
                tracing::warn!(error = %e, "failed to close session");
                ReleaseOutcome::CloseFailed(e.to_string())
            }
        }
    }

    /// Pause, then reset, after a group has released its session
    pub async fn post_teardown_reset(&self) -> ResetReport {
        tokio::time::sleep(Duration::from_millis(self.reset.post_teardown_delay_ms)).await;
        self.reset_application_state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use std::sync::Mutex;

    /// Shell that records invocations and fails on a chosen subcommand
    #[derive(Debug, Default)]
    struct RecordingShell {
        calls: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl DeviceShell for RecordingShell {
        async fn shell(&self, args: &[&str]) -> DroidflowResult<ShellOutput> {
            let line = args.join(" ");
            self.calls.lock().unwrap().push(line.clone());
            if self.fail_on.is_some_and(|f| line.contains(f)) {
                return Err(DroidflowError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "adb: device offline",
                )));
            }
            Ok(ShellOutput {
                success: true,
                output: "Success".to_string(),
            })
        }
    }

    fn quick_config() -> SuiteConfig {
        let mut config = SuiteConfig::default();
        config.reset.force_stop_settle_ms = 0;
        config.reset.clear_data_settle_ms = 0;
        config.reset.reset_permissions_settle_ms = 0;
        config.reset.post_teardown_delay_ms = 0;
        config
    }

    fn mock_factory(
        driver: Arc<MockDriver>,
    ) -> FnSessionFactory<impl Fn(&SessionConfig) -> DroidflowResult<DriverHandle> + Send + Sync> {
        FnSessionFactory::new(move |_: &SessionConfig| Ok(driver.clone() as DriverHandle))
    }

    mod reset_tests {
        use super::*;

        #[tokio::test]
        async fn test_reset_runs_all_commands() {
            let controller = LifecycleController::new(
                mock_factory(Arc::new(MockDriver::new())),
                RecordingShell::default(),
                &quick_config(),
            );
            let report = controller.reset_application_state().await;
            assert!(report.all_succeeded());
            assert_eq!(
                *controller.shell.calls.lock().unwrap(),
                vec![
                    "am force-stop com.raising.prodigy",
                    "pm clear com.raising.prodigy",
                    "pm reset-permissions com.raising.prodigy",
                ]
            );
        }

        #[tokio::test]
        async fn test_reset_failure_is_best_effort() {
            let shell = RecordingShell {
                fail_on: Some("clear"),
                ..RecordingShell::default()
            };
            let controller = LifecycleController::new(
                mock_factory(Arc::new(MockDriver::new())),
                shell,
                &quick_config(),
            );
            let report = controller.reset_application_state().await;
            assert_eq!(report.steps.len(), 3);
            assert_eq!(report.warnings().len(), 1);
            assert_eq!(report.warnings()[0].command, ResetCommand::ClearData);
            assert!(report.steps[2].succeeded);
        }

        #[tokio::test]
        async fn test_reset_disabled() {
            let mut config = quick_config();
            config.reset.enabled = false;
            let controller = LifecycleController::new(
                mock_factory(Arc::new(MockDriver::new())),
                RecordingShell::default(),
                &config,
            );
            assert!(controller.reset_application_state().await.was_skipped());
            assert!(controller.shell.calls.lock().unwrap().is_empty());
        }

        #[test]
        fn test_adb_arguments_with_serial() {
            let shell = AdbShell::new("adb", Some("emulator-5554".to_string()));
            assert_eq!(
                shell.arguments(&["pm", "clear", "pkg"]),
                vec!["-s", "emulator-5554", "shell", "pm", "clear", "pkg"]
            );
            let plain = AdbShell::new("adb", None);
            assert_eq!(plain.arguments(&["am", "force-stop", "pkg"]), vec!["shell", "am", "force-stop", "pkg"]);
        }
    }

    mod session_tests {
        use super::*;

        #[tokio::test]
        async fn test_acquire_wraps_errors() {
            let factory = FnSessionFactory::new(|_: &SessionConfig| -> DroidflowResult<DriverHandle> {
                Err(DroidflowError::Protocol {
                    message: "connection refused".to_string(),
                })
            });
            let controller = LifecycleController::new(factory, RecordingShell::default(), &quick_config());
            let err = controller.acquire_driver().await.err().unwrap();
            assert!(err.is_fatal());
            assert!(err.to_string().contains("connection refused"));
        }

        #[tokio::test]
        async fn test_release_keeps_session_by_default() {
            let driver = Arc::new(MockDriver::new());
            let controller = LifecycleController::new(
                mock_factory(driver.clone()),
                RecordingShell::default(),
                &quick_config(),
            );
            let handle = controller.acquire_driver().await.unwrap();
            assert_eq!(controller.release_driver(handle).await, ReleaseOutcome::KeptOpen);
            assert!(!driver.was_called("quit"));
        }

        #[tokio::test]
        async fn test_release_closes_when_configured() {
            let driver = Arc::new(MockDriver::new());
            let mut config = quick_config();
            config.teardown.close_on_teardown = true;
            let controller =
                LifecycleController::new(mock_factory(driver.clone()), RecordingShell::default(), &config);
            let handle = controller.acquire_driver().await.unwrap();
            assert_eq!(controller.release_driver(handle).await, ReleaseOutcome::Closed);
            assert!(driver.was_called("quit"));
        }
    }
}
