//! Step executor: one UI interaction per call.
//!
//! Each action locates its element afresh, performs a single driver call and
//! returns. There are no retries here; readiness waits are the only place
//! that polls.

use crate::driver::{AutomationDriver, ElementHandle, Readiness, WaitOptions};
use crate::locator::Locator;
use crate::result::{DroidflowError, DroidflowResult};
use std::time::Duration;

/// Result of a best-effort readiness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Condition held within the timeout
    Ready,
    /// Timeout elapsed; the following action decides whether that matters
    TimedOut {
        /// Time spent waiting
        waited: Duration,
    },
}

impl WaitOutcome {
    /// Whether the condition held
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Result of the advisory stability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The session answered
    Stable,
    /// Neither probe answered; carries the last error text
    Unresponsive(String),
}

/// Executes single interactions against a driver
#[derive(Debug)]
pub struct StepExecutor<'a, D: AutomationDriver + ?Sized> {
    driver: &'a D,
    wait: WaitOptions,
}

impl<'a, D: AutomationDriver + ?Sized> StepExecutor<'a, D> {
    /// Create an executor using `wait` for readiness waits
    #[must_use]
    pub const fn new(driver: &'a D, wait: WaitOptions) -> Self {
        Self { driver, wait }
    }

    /// The underlying driver
    #[must_use]
    pub const fn driver(&self) -> &'a D {
        self.driver
    }

    /// Wait options in effect
    #[must_use]
    pub const fn wait_options(&self) -> &WaitOptions {
        &self.wait
    }

    /// Locate an element. Lookup timeouts are reported as not found.
    pub async fn locate(&self, locator: &Locator) -> DroidflowResult<ElementHandle> {
        match self.driver.find_element(locator).await {
            Err(DroidflowError::Timeout { ms, .. }) => Err(DroidflowError::not_found(
                locator.query(),
                format!("lookup timed out after {ms}ms"),
            )),
            other => other,
        }
    }

    /// Wait for readiness. A timeout is logged and returned as a value,
    /// never as an error; genuine driver failures still propagate.
    pub async fn wait_ready(
        &self,
        locator: &Locator,
        readiness: Readiness,
    ) -> DroidflowResult<WaitOutcome> {
        let start = tokio::time::Instant::now();
        match self.driver.wait_until(locator, readiness, &self.wait).await {
            Ok(_) => Ok(WaitOutcome::Ready),
            Err(DroidflowError::Timeout { ms, .. }) => {
                tracing::debug!(
                    element = locator.label(),
                    %readiness,
                    timeout_ms = ms,
                    "readiness wait elapsed, continuing"
                );
                Ok(WaitOutcome::TimedOut {
                    waited: start.elapsed(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Locate then click
    pub async fn click(&self, locator: &Locator) -> DroidflowResult<()> {
        let element = self.locate(locator).await?;
        self.driver.click(&element).await
    }

    /// Locate then type
    pub async fn type_text(&self, locator: &Locator, text: &str) -> DroidflowResult<()> {
        let element = self.locate(locator).await?;
        self.driver.send_keys(&element, text).await
    }

    /// Locate then read an attribute
    pub async fn read_attribute(
        &self,
        locator: &Locator,
        name: &str,
    ) -> DroidflowResult<Option<String>> {
        let element = self.locate(locator).await?;
        self.driver.attribute(&element, name).await
    }

    /// Advisory check that the session still answers.
    ///
    /// Tries the driver's own probe, then a root lookup. Never fails.
    pub async fn probe_stability(&self) -> ProbeOutcome {
        let first = match self.driver.probe().await {
            Ok(()) => return ProbeOutcome::Stable,
            Err(e) => e,
        };
        tracing::debug!(error = %first, "stability probe failed, trying root lookup");
        match self.driver.find_element(&Locator::xpath("//*")).await {
            Ok(_) => ProbeOutcome::Stable,
            Err(e) => {
                tracing::warn!(error = %e, "application did not answer stability probe");
                ProbeOutcome::Unresponsive(e.to_string())
            }
        }
    }
}
