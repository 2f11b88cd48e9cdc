//! Flow runner: executes one scenario into exactly one [`TestResult`].
//!
//! ```text
//! PENDING ──start──▶ RUNNING ──last step + assertion ok──▶ COMPLETED
//!                       │
//!                       └──required step error / assertion mismatch──▶ ABORTED
//! ```
//!
//! Step progress is logged on the [`STEP_TARGET`] tracing target so it can be
//! filtered separately from general messages.

use crate::driver::{AutomationDriver, ElementHandle, Readiness, WaitOptions};
use crate::executor::{StepExecutor, WaitOutcome};
use crate::locator::{CONTENT_DESC, TEXT};
use crate::reporter::TestResult;
use crate::result::{DroidflowError, DroidflowResult};
use crate::scenario::{Assertion, Expectation, Scenario, Step, StepAction};
use std::collections::BTreeMap;

/// Tracing target for step-by-step progress
pub const STEP_TARGET: &str = "droidflow::steps";

/// Runner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Not started
    Pending,
    /// Executing steps
    Running,
    /// All steps and the assertion succeeded
    Completed,
    /// Stopped by an error
    Aborted,
}

/// Step result status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Step succeeded
    Success,
    /// Step failed
    Failed,
}

/// Outcome of one executed step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    /// 1-based step index
    pub step_index: usize,
    /// Result
    pub status: StepStatus,
    /// What happened
    pub detail: String,
}

/// Why a scenario stopped
#[derive(Debug)]
struct Abort {
    actual: String,
    error: DroidflowError,
}

impl Abort {
    fn new(actual: impl Into<String>, error: DroidflowError) -> Self {
        Self {
            actual: actual.into(),
            error,
        }
    }
}

/// Executes scenarios against one driver session
#[derive(Debug)]
pub struct FlowRunner<'a, D: AutomationDriver + ?Sized> {
    executor: StepExecutor<'a, D>,
    state: FlowState,
    outcomes: Vec<StepOutcome>,
}

impl<'a, D: AutomationDriver + ?Sized> FlowRunner<'a, D> {
    /// Create a runner
    #[must_use]
    pub fn new(driver: &'a D, wait: WaitOptions) -> Self {
        Self {
            executor: StepExecutor::new(driver, wait),
            state: FlowState::Pending,
            outcomes: Vec::new(),
        }
    }

    /// State after the last run
    #[must_use]
    pub const fn state(&self) -> FlowState {
        self.state
    }

    /// Outcomes of the steps attempted in the last run
    #[must_use]
    pub fn step_outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// Run a scenario once. Never retries.
    pub async fn run(&mut self, scenario: &Scenario) -> TestResult {
        self.state = FlowState::Pending;
        self.outcomes.clear();

        if let Some(reason) = &scenario.skip_reason {
            tracing::info!(target: STEP_TARGET, scenario = %scenario.name, %reason, "scenario skipped");
            return TestResult::skipped(&scenario.name, &scenario.expected, reason);
        }

        tracing::info!(
            target: STEP_TARGET,
            scenario = %scenario.name,
            steps = scenario.steps.len(),
            "scenario started"
        );
        self.state = FlowState::Running;
        self.executor.probe_stability().await;

        match self.execute(scenario).await {
            Ok(actual) => {
                self.state = FlowState::Completed;
                tracing::info!(target: STEP_TARGET, scenario = %scenario.name, outcome = "passed", "scenario completed");
                TestResult::passed(&scenario.name, &scenario.expected, actual)
            }
            Err(abort) => {
                self.state = FlowState::Aborted;
                if scenario.optional && abort.error.is_not_found() {
                    tracing::info!(
                        target: STEP_TARGET,
                        scenario = %scenario.name,
                        outcome = "skipped",
                        error = %abort.error,
                        "optional element not present"
                    );
                    return TestResult::skipped(
                        &scenario.name,
                        &scenario.expected,
                        format!("{} - may not always be visible", abort.actual),
                    );
                }
                tracing::error!(
                    target: STEP_TARGET,
                    scenario = %scenario.name,
                    outcome = "failed",
                    error = %abort.error,
                    "scenario aborted"
                );
                TestResult::failed(
                    &scenario.name,
                    &scenario.expected,
                    abort.actual,
                    abort.error.to_string(),
                )
            }
        }
    }

    async fn execute(&mut self, scenario: &Scenario) -> Result<String, Abort> {
        let unbound = scenario.unbound_params();
        if !unbound.is_empty() {
            return Err(Abort::new(
                "Scenario not started",
                DroidflowError::InvalidScenario {
                    message: format!("unbound parameters: {}", unbound.join(", ")),
                },
            ));
        }

        let total = scenario.steps.len();
        for (i, step) in scenario.steps.iter().enumerate() {
            let index = i + 1;
            match self.perform(step, &scenario.params).await {
                Ok(detail) => {
                    tracing::info!(
                        target: STEP_TARGET,
                        scenario = %scenario.name,
                        step = index,
                        total,
                        action = step.action.name(),
                        outcome = "success",
                        "{}: {detail}",
                        step.description
                    );
                    self.push_outcome(index, StepStatus::Success, detail);
                }
                Err(error) => {
                    tracing::warn!(
                        target: STEP_TARGET,
                        scenario = %scenario.name,
                        step = index,
                        total,
                        action = step.action.name(),
                        outcome = "failed",
                        required = step.required,
                        "{}: {error}",
                        step.description
                    );
                    self.push_outcome(index, StepStatus::Failed, error.to_string());
                    if step.required {
                        return Err(Abort::new(
                            format!("Aborted at step {index}/{total}: {}", step.description),
                            error,
                        ));
                    }
                }
            }
        }

        match &scenario.assertion {
            Some(assertion) => self.evaluate(assertion).await,
            None => Ok(format!("All {total} steps completed")),
        }
    }

    fn push_outcome(&mut self, step_index: usize, status: StepStatus, detail: String) {
        self.outcomes.push(StepOutcome {
            step_index,
            status,
            detail,
        });
    }

    async fn perform(
        &self,
        step: &Step,
        params: &BTreeMap<String, String>,
    ) -> DroidflowResult<String> {
        let locator = &step.locator;
        match &step.action {
            StepAction::Click => {
                self.executor.click(locator).await?;
                Ok(format!("clicked {}", locator.label()))
            }
            StepAction::Type(input) => {
                let text = input.resolve(params)?;
                self.executor.type_text(locator, &text).await?;
                Ok(format!(
                    "typed {} characters into {}",
                    text.chars().count(),
                    locator.label()
                ))
            }
            StepAction::WaitVisible => self.wait(step, Readiness::Visible).await,
            StepAction::WaitClickable => self.wait(step, Readiness::Clickable).await,
        }
    }

    async fn wait(&self, step: &Step, readiness: Readiness) -> DroidflowResult<String> {
        let outcome = self.executor.wait_ready(&step.locator, readiness).await?;
        Ok(match outcome {
            WaitOutcome::Ready => format!("{} {readiness}", step.locator.label()),
            WaitOutcome::TimedOut { waited } => format!(
                "{} not {readiness} after {}ms, continuing",
                step.locator.label(),
                waited.as_millis()
            ),
        })
    }

    async fn evaluate(&self, assertion: &Assertion) -> Result<String, Abort> {
        let locator = &assertion.locator;
        let label = locator.label();

        if assertion.expectation == Expectation::Absent {
            return match self.executor.locate(locator).await {
                Ok(_) => Err(Abort::new(
                    format!("{label} present"),
                    DroidflowError::AssertionMismatch {
                        expected: assertion.expectation.to_string(),
                        actual: format!("{label} present"),
                    },
                )),
                Err(e) if e.is_not_found() => Ok(format!("{label} absent")),
                Err(e) => Err(Abort::new("Assertion could not be evaluated", e)),
            };
        }

        self.executor
            .wait_ready(locator, Readiness::Visible)
            .await
            .map_err(|e| Abort::new("Assertion could not be evaluated", e))?;
        let element = self
            .executor
            .locate(locator)
            .await
            .map_err(|e| Abort::new(format!("{label} not found"), e))?;

        if assertion.expectation == Expectation::Present {
            return Ok(format!("{label} found"));
        }

        let observed = self
            .read_text(&element, assertion.attribute.as_deref())
            .await
            .map_err(|e| Abort::new("Assertion could not be evaluated", e))?;
        match observed {
            Some(text) if assertion.matches_text(&text) => Ok(text),
            other => {
                let actual = other.unwrap_or_else(|| "No text found".to_string());
                Err(Abort::new(
                    actual.clone(),
                    DroidflowError::AssertionMismatch {
                        expected: assertion.expectation.to_string(),
                        actual,
                    },
                ))
            }
        }
    }

    /// Read the named attribute, or content-desc falling back to text
    async fn read_text(
        &self,
        element: &ElementHandle,
        attribute: Option<&str>,
    ) -> DroidflowResult<Option<String>> {
        let driver = self.executor.driver();
        if let Some(name) = attribute {
            return driver.attribute(element, name).await;
        }
        match driver.attribute(element, CONTENT_DESC).await? {
            Some(text) if !text.is_empty() => Ok(Some(text)),
            _ => driver.attribute(element, TEXT).await,
        }
    }
}
