//! Suite orchestration: groups of scenarios and their session scope.

use crate::config::SuiteConfig;
use crate::driver::WaitOptions;
use crate::lifecycle::{DeviceShell, DriverHandle, LifecycleController, SessionFactory};
use crate::reporter::{ResultRecorder, TestResult, TestStatus};
use crate::result::DroidflowResult;
use crate::runner::FlowRunner;
use crate::scenario::{home_page_checks, login_scenarios, successful_login, Scenario};
use serde::{Deserialize, Serialize};

/// How scenarios of a group share driver sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionScope {
    /// Reset and open a fresh session for every scenario
    PerScenario,
    /// Reset once, run the prelude, then share one session
    PerGroup,
}

/// Scenarios sharing a lifecycle policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioGroup {
    /// Group name
    pub name: String,
    /// Run once before the group's scenarios in `PerGroup` scope; not recorded when it passes
    pub prelude: Option<Scenario>,
    /// Scenarios in run order
    pub scenarios: Vec<Scenario>,
    /// Session policy
    pub session: SessionScope,
}

impl ScenarioGroup {
    /// Create a group
    #[must_use]
    pub fn new(name: impl Into<String>, session: SessionScope) -> Self {
        Self {
            name: name.into(),
            prelude: None,
            scenarios: Vec::new(),
            session,
        }
    }

    /// Set the prelude
    #[must_use]
    pub fn with_prelude(mut self, prelude: Scenario) -> Self {
        self.prelude = Some(prelude);
        self
    }

    /// Append scenarios
    #[must_use]
    pub fn with_scenarios(mut self, scenarios: impl IntoIterator<Item = Scenario>) -> Self {
        self.scenarios.extend(scenarios);
        self
    }
}

/// Ordered groups making up one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Suite {
    /// Groups in run order
    pub groups: Vec<ScenarioGroup>,
}

impl Suite {
    /// Create an empty suite
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group
    #[must_use]
    pub fn group(mut self, group: ScenarioGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Number of scenarios across all groups (preludes excluded)
    #[must_use]
    pub fn scenario_count(&self) -> usize {
        self.groups.iter().map(|g| g.scenarios.len()).sum()
    }

    /// Keep only the named group (case-insensitive) and scenarios whose
    /// name contains `filter`. Groups left empty are dropped.
    #[must_use]
    pub fn filtered(&self, group: Option<&str>, filter: Option<&str>) -> Self {
        let filter = filter.map(str::to_lowercase);
        let groups = self
            .groups
            .iter()
            .filter(|g| group.map_or(true, |name| g.name.eq_ignore_ascii_case(name)))
            .map(|g| {
                let mut g = g.clone();
                if let Some(needle) = &filter {
                    g.scenarios
                        .retain(|s| s.name.to_lowercase().contains(needle.as_str()));
                }
                g
            })
            .filter(|g| !g.scenarios.is_empty())
            .collect();
        Self { groups }
    }
}

/// The login and home page groups
#[must_use]
pub fn default_suite(config: &SuiteConfig) -> Suite {
    let credentials = &config.credentials;
    Suite::new()
        .group(
            ScenarioGroup::new("Login", SessionScope::PerScenario)
                .with_scenarios(login_scenarios(credentials)),
        )
        .group(
            ScenarioGroup::new("Home Page", SessionScope::PerGroup)
                .with_prelude(successful_login(credentials))
                .with_scenarios(home_page_checks()),
        )
}

/// Counts for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteOutcome {
    /// Results recorded by this run
    pub total: usize,
    /// Passed results
    pub passed: usize,
    /// Failed results
    pub failed: usize,
    /// Skipped results
    pub skipped: usize,
}

impl SuiteOutcome {
    fn from_results(results: &[TestResult]) -> Self {
        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();
        Self {
            total: results.len(),
            passed: count(TestStatus::Passed),
            failed: count(TestStatus::Failed),
            skipped: count(TestStatus::Skipped),
        }
    }

    /// Process exit status: 0 when nothing failed, 1 otherwise
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            0
        } else {
            1
        }
    }
}

/// Runs a [`Suite`] through a [`LifecycleController`]
#[derive(Debug)]
pub struct SuiteRunner<F, S> {
    lifecycle: LifecycleController<F, S>,
    wait: WaitOptions,
}

impl<F: SessionFactory, S: DeviceShell> SuiteRunner<F, S> {
    /// Create a suite runner
    #[must_use]
    pub const fn new(lifecycle: LifecycleController<F, S>, wait: WaitOptions) -> Self {
        Self { lifecycle, wait }
    }

    /// The lifecycle controller
    #[must_use]
    pub const fn lifecycle(&self) -> &LifecycleController<F, S> {
        &self.lifecycle
    }

    /// Run every group in order.
    ///
    /// A driver acquisition failure stops the run and is returned; results
    /// recorded before it stay in `recorder`.
    pub async fn run(
        &self,
        suite: &Suite,
        recorder: &mut ResultRecorder,
    ) -> DroidflowResult<SuiteOutcome> {
        let first = recorder.total_count();
        tracing::info!(
            run = %recorder.run_id(),
            groups = suite.groups.len(),
            scenarios = suite.scenario_count(),
            "suite started"
        );

        for group in &suite.groups {
            tracing::info!(group = %group.name, scope = ?group.session, "group started");
            match group.session {
                SessionScope::PerScenario => self.run_isolated(group, recorder).await?,
                SessionScope::PerGroup => self.run_shared(group, recorder).await?,
            }
        }

        let outcome = SuiteOutcome::from_results(&recorder.results()[first..]);
        tracing::info!(
            passed = outcome.passed,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "suite finished"
        );
        Ok(outcome)
    }

    async fn run_isolated(
        &self,
        group: &ScenarioGroup,
        recorder: &mut ResultRecorder,
    ) -> DroidflowResult<()> {
        for scenario in &group.scenarios {
            if let Some(reason) = &scenario.skip_reason {
                recorder.record(TestResult::skipped(&scenario.name, &scenario.expected, reason));
                continue;
            }
            self.lifecycle.reset_application_state().await;
            let driver = self.lifecycle.acquire_driver().await?;
            let result = self.run_one(&driver, scenario).await;
            recorder.record(result);
            self.lifecycle.release_driver(driver).await;
        }
        Ok(())
    }

    async fn run_shared(
        &self,
        group: &ScenarioGroup,
        recorder: &mut ResultRecorder,
    ) -> DroidflowResult<()> {
        self.lifecycle.reset_application_state().await;
        let driver = self.lifecycle.acquire_driver().await?;

        let setup_failure = match &group.prelude {
            Some(prelude) => {
                let result = self.run_one(&driver, prelude).await;
                if result.status.is_passed() {
                    tracing::info!(group = %group.name, prelude = %prelude.name, "group setup passed");
                    None
                } else {
                    Some(result)
                }
            }
            None => None,
        };

        match setup_failure {
            Some(mut failure) => {
                let error = failure
                    .error_message
                    .clone()
                    .unwrap_or_else(|| failure.actual.clone());
                failure.test_name = format!("{} setup", group.name);
                recorder.record(failure);
                for scenario in &group.scenarios {
                    recorder.record(
                        TestResult::skipped(
                            &scenario.name,
                            &scenario.expected,
                            format!("Skipped: {} setup failed", group.name),
                        )
                        .with_error(error.clone()),
                    );
                }
            }
            None => {
                for scenario in &group.scenarios {
                    let result = self.run_one(&driver, scenario).await;
                    recorder.record(result);
                }
            }
        }

        self.lifecycle.release_driver(driver).await;
        self.lifecycle.post_teardown_reset().await;
        Ok(())
    }

    async fn run_one(&self, driver: &DriverHandle, scenario: &Scenario) -> TestResult {
        let mut runner = FlowRunner::new(&**driver, self.wait);
        runner.run(scenario).await
    }
}
