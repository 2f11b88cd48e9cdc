//! Droidflow: Mobile UI Flow Testing for Android Apps
//!
//! Drives an Android application through an Appium (W3C WebDriver) server,
//! runs named multi-step flows such as sign-in, checks the terminal screen,
//! and writes a CSV report per run.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    DROIDFLOW Architecture                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐             │
//! │   │ Scenario   │    │ Flow       │    │ Step       │             │
//! │   │ (catalog + │───►│ Runner     │───►│ Executor   │──► Appium   │
//! │   │  steps)    │    │            │    │ (waits)    │    session  │
//! │   └────────────┘    └─────┬──────┘    └────────────┘             │
//! │                           │                                      │
//! │   ┌────────────┐    ┌─────▼──────┐    ┌────────────┐             │
//! │   │ Lifecycle  │◄───│ Suite      │───►│ Result     │──► CSV      │
//! │   │ (reset,    │    │ Runner     │    │ Recorder   │             │
//! │   │  sessions) │    └────────────┘    └────────────┘             │
//! │   └────────────┘                                                 │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use droidflow::{Element, FlowRunner, MockDriver, MockElement, Scenario, Step, WaitOptions};
//! use std::time::Duration;
//!
//! # tokio_test_block(async {
//! let driver = MockDriver::new()
//!     .with_element(&Element::SignIn.locator(), MockElement::new());
//! let scenario = Scenario::new("Tap sign in")
//!     .step(Step::click("Tap sign in", Element::SignIn));
//! let wait = WaitOptions::new().with_timeout(Duration::from_millis(50));
//! let mut runner = FlowRunner::new(&driver, wait);
//! let result = runner.run(&scenario).await;
//! assert!(result.status.is_passed());
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Appium W3C WebDriver session client
#[allow(clippy::missing_errors_doc)]
pub mod appium;
/// Named UI elements and their queries
pub mod catalog;
/// Suite configuration (YAML + environment)
#[allow(clippy::missing_errors_doc)]
pub mod config;
/// Driver abstraction, explicit waits and the mock driver
#[allow(clippy::missing_errors_doc)]
pub mod driver;
/// Single-step execution with explicit waits
#[allow(clippy::missing_errors_doc)]
pub mod executor;
/// Session acquisition, app state reset and teardown
#[allow(clippy::missing_errors_doc)]
pub mod lifecycle;
/// Element locators and XPath rendering
pub mod locator;
/// Result recording and CSV reports
#[allow(clippy::missing_errors_doc)]
pub mod reporter;
/// Error types
pub mod result;
/// Flow execution state machine
pub mod runner;
/// Scenario model and the built-in flows
#[allow(clippy::missing_errors_doc)]
pub mod scenario;
/// Suite orchestration
#[allow(clippy::missing_errors_doc)]
pub mod suite;

pub use appium::{capabilities, AppiumDriver, WebDriverError};
pub use catalog::{Element, AUTH_ERROR_TEXT, FEEDBACK_PROMPT_TEXT, HOME_MARKER_TEXT};
pub use config::{
    CredentialsConfig, ReportConfig, ResetConfig, SessionConfig, SuiteConfig, TeardownConfig,
    TimeoutConfig,
};
pub use driver::{
    AutomationDriver, ElementHandle, MockDriver, MockElement, Readiness, WaitOptions,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
pub use executor::{ProbeOutcome, StepExecutor, WaitOutcome};
pub use lifecycle::{
    AdbShell, AppiumSessionFactory, DeviceShell, DriverHandle, FnSessionFactory,
    LifecycleController, ReleaseOutcome, ResetCommand, ResetReport, ResetStepOutcome,
    SessionFactory, ShellOutput,
};
pub use locator::{Locator, Selector, TextMatch};
pub use reporter::{ReportDocument, ReportSummary, ResultRecorder, TestResult, TestStatus};
pub use result::{DroidflowError, DroidflowResult};
pub use runner::{FlowRunner, FlowState, StepOutcome, StepStatus, STEP_TARGET};
pub use scenario::{
    home_page_checks, invalid_email_login, invalid_password_login, login_scenarios,
    login_template, successful_login, Assertion, Expectation, Input, Scenario, Step, StepAction,
};
pub use suite::{default_suite, ScenarioGroup, SessionScope, Suite, SuiteOutcome, SuiteRunner};
