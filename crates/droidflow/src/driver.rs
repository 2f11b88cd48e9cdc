//! AutomationDriver - abstract UI automation session.
//!
//! Everything above this module talks to the device through the
//! [`AutomationDriver`] trait, so scenarios run unchanged against a live
//! Appium server or the scripted [`MockDriver`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  AutomationDriver (async trait)                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────┐   ┌────────────────────────────┐ │
//! │  │  AppiumDriver          │   │  MockDriver                │ │
//! │  │  W3C WebDriver over    │   │  In-memory element table,  │ │
//! │  │  HTTP (reqwest)        │   │  reveal rules, history     │ │
//! │  └────────────────────────┘   └────────────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::locator::Locator;
use crate::result::{DroidflowError, DroidflowResult, STALE_ELEMENT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default explicit wait timeout (20 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 20_000;

/// Default polling interval for readiness waits
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Message the mock returns for absent elements, worded like UiAutomator2
pub const NO_SUCH_ELEMENT_MESSAGE: &str =
    "An element could not be located on the page using the given search parameters.";

// =============================================================================
// ELEMENT HANDLE
// =============================================================================

/// Handle to an element located in the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementHandle {
    /// Backend element reference
    pub id: String,
    /// Query the element was located with
    pub query: String,
}

impl ElementHandle {
    /// Create a new element handle
    #[must_use]
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
        }
    }
}

// =============================================================================
// READINESS WAITS
// =============================================================================

/// Condition awaited before acting on an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    /// Present and displayed
    Visible,
    /// Present, displayed and enabled
    Clickable,
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visible => f.write_str("visible"),
            Self::Clickable => f.write_str("clickable"),
        }
    }
}

/// Options for readiness waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Maximum time to wait
    pub timeout: Duration,
    /// Delay between polls
    pub poll_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl WaitOptions {
    /// Create wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

// =============================================================================
// DRIVER TRAIT
// =============================================================================

/// Abstract automation session.
///
/// Implementations:
/// - `AppiumDriver` - W3C WebDriver client for an Appium server
/// - `MockDriver` - for unit and flow tests
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Locate the first element matching the locator
    async fn find_element(&self, locator: &Locator) -> DroidflowResult<ElementHandle>;

    /// Click an element
    async fn click(&self, element: &ElementHandle) -> DroidflowResult<()>;

    /// Type text into an element
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> DroidflowResult<()>;

    /// Read an attribute, `None` when the element does not carry it
    async fn attribute(&self, element: &ElementHandle, name: &str)
        -> DroidflowResult<Option<String>>;

    /// Whether the element is displayed
    async fn is_displayed(&self, element: &ElementHandle) -> DroidflowResult<bool>;

    /// Whether the element is enabled
    async fn is_enabled(&self, element: &ElementHandle) -> DroidflowResult<bool>;

    /// Cheap query confirming the session still answers
    async fn probe(&self) -> DroidflowResult<()>;

    /// End the session
    async fn quit(&self) -> DroidflowResult<()>;

    /// Check `readiness` on an element that was already located
    async fn is_ready(&self, element: &ElementHandle, readiness: Readiness) -> DroidflowResult<bool> {
        Ok(match readiness {
            Readiness::Visible => self.is_displayed(element).await?,
            Readiness::Clickable => {
                self.is_displayed(element).await? && self.is_enabled(element).await?
            }
        })
    }

    /// Poll until the element satisfies `readiness` or the timeout elapses.
    ///
    /// Absence and stale handles while polling mean "not ready yet"; any
    /// other driver error ends the wait immediately.
    async fn wait_until(
        &self,
        locator: &Locator,
        readiness: Readiness,
        options: &WaitOptions,
    ) -> DroidflowResult<ElementHandle> {
        let start = Instant::now();
        loop {
            let attempt = match self.find_element(locator).await {
                Ok(element) => match self.is_ready(&element, readiness).await {
                    Ok(true) => return Ok(element),
                    Ok(false) => Ok(()),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };
            match attempt {
                Ok(()) => {}
                Err(e) if e.is_not_found() || e.is_stale() => {
                    tracing::trace!(locator = %locator.query(), error = %e, "not ready yet");
                }
                Err(e) => return Err(e),
            }

            let elapsed = start.elapsed();
            if elapsed >= options.timeout {
                return Err(DroidflowError::Timeout {
                    ms: options.timeout.as_millis() as u64,
                    what: format!("{readiness} {}", locator.query()),
                });
            }
            tokio::time::sleep(options.poll_interval.min(options.timeout - elapsed)).await;
        }
    }
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Element state held by the [`MockDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Attribute values by name
    pub attributes: HashMap<String, String>,
    /// Whether the element reports as displayed
    pub displayed: bool,
    /// Whether the element reports as enabled
    pub enabled: bool,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            attributes: HashMap::new(),
            displayed: true,
            enabled: true,
        }
    }
}

impl MockElement {
    /// Displayed, enabled element without attributes
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the content-desc attribute
    #[must_use]
    pub fn with_content_desc(self, value: impl Into<String>) -> Self {
        self.with_attribute(crate::locator::CONTENT_DESC, value)
    }

    /// Set the text attribute
    #[must_use]
    pub fn with_text(self, value: impl Into<String>) -> Self {
        self.with_attribute(crate::locator::TEXT, value)
    }

    /// Mark as not displayed
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Mark as disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Clone)]
struct RevealRule {
    triggers: Vec<String>,
    query: String,
    element: MockElement,
}

#[derive(Debug, Default)]
struct MockState {
    elements: HashMap<String, MockElement>,
    reveal_rules: Vec<RevealRule>,
    action_failures: HashMap<String, String>,
    stale_checks: HashMap<String, usize>,
    lookup_timeouts: HashMap<String, u64>,
    typed: Vec<String>,
    probe_failure: Option<String>,
    call_history: Vec<String>,
}

impl MockState {
    fn apply_reveal_rules(&mut self) {
        let typed = &self.typed;
        let (fired, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.reveal_rules)
            .into_iter()
            .partition(|rule| rule.triggers.iter().all(|t| typed.contains(t)));
        self.reveal_rules = pending;
        for rule in fired {
            self.elements.insert(rule.query, rule.element);
        }
    }
}

/// Scripted in-memory driver.
///
/// Elements are keyed by the locator query they answer to. The mock is
/// `Sync` so it can be shared by reference between the runner and the test
/// that inspects it afterwards.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create an empty mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an element answering to `locator`
    pub fn add_element(&self, locator: &Locator, element: MockElement) {
        self.state()
            .elements
            .insert(locator.query().to_string(), element);
    }

    /// Builder form of [`Self::add_element`]
    #[must_use]
    pub fn with_element(self, locator: &Locator, element: MockElement) -> Self {
        self.add_element(locator, element);
        self
    }

    /// Remove the element answering to `locator`
    pub fn remove_element(&self, locator: &Locator) {
        self.state().elements.remove(locator.query());
    }

    /// Make an element appear once every trigger text has been typed
    pub fn reveal_when_typed(&self, triggers: &[&str], locator: &Locator, element: MockElement) {
        let mut state = self.state();
        state.reveal_rules.push(RevealRule {
            triggers: triggers.iter().map(|t| (*t).to_string()).collect(),
            query: locator.query().to_string(),
            element,
        });
        state.apply_reveal_rules();
    }

    /// Make clicks and typing on the element fail with `message`
    pub fn fail_actions_on(&self, locator: &Locator, message: impl Into<String>) {
        self.state()
            .action_failures
            .insert(locator.query().to_string(), message.into());
    }

    /// Make the next `count` displayed checks on the element report a stale handle
    pub fn go_stale(&self, locator: &Locator, count: usize) {
        self.state()
            .stale_checks
            .insert(locator.query().to_string(), count);
    }

    /// Make lookups of `locator` fail with a driver timeout of `ms`
    pub fn time_out_lookups(&self, locator: &Locator, ms: u64) {
        self.state()
            .lookup_timeouts
            .insert(locator.query().to_string(), ms);
    }

    /// Make [`AutomationDriver::probe`] fail
    pub fn fail_probe(&self, message: impl Into<String>) {
        self.state().probe_failure = Some(message.into());
    }

    /// Texts typed so far, in order
    #[must_use]
    pub fn typed_text(&self) -> Vec<String> {
        self.state().typed.clone()
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().call_history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state()
            .call_history
            .iter()
            .any(|c| c.starts_with(method))
    }

    /// Number of history entries starting with `prefix`
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .call_history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn element(&self, element: &ElementHandle) -> DroidflowResult<MockElement> {
        self.state()
            .elements
            .get(&element.query)
            .cloned()
            .ok_or_else(|| {
                DroidflowError::action_failed("lookup", &element.query, STALE_ELEMENT)
            })
    }

    fn check_action(&self, action: &str, element: &ElementHandle) -> DroidflowResult<()> {
        if let Some(message) = self.state().action_failures.get(&element.query) {
            return Err(DroidflowError::action_failed(
                action,
                &element.query,
                message.clone(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AutomationDriver for MockDriver {
    async fn find_element(&self, locator: &Locator) -> DroidflowResult<ElementHandle> {
        let mut state = self.state();
        state.call_history.push(format!("find:{}", locator.query()));
        if let Some(&ms) = state.lookup_timeouts.get(locator.query()) {
            return Err(DroidflowError::Timeout {
                ms,
                what: format!("lookup {}", locator.query()),
            });
        }
        if state.elements.contains_key(locator.query()) {
            Ok(ElementHandle::new(locator.query(), locator.query()))
        } else {
            Err(DroidflowError::not_found(
                locator.query(),
                NO_SUCH_ELEMENT_MESSAGE,
            ))
        }
    }

    async fn click(&self, element: &ElementHandle) -> DroidflowResult<()> {
        self.state()
            .call_history
            .push(format!("click:{}", element.query));
        self.check_action("click", element)?;
        self.element(element).map(|_| ())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> DroidflowResult<()> {
        self.state()
            .call_history
            .push(format!("send_keys:{}:{text}", element.query));
        self.check_action("type", element)?;
        self.element(element)?;
        let mut state = self.state();
        state.typed.push(text.to_string());
        state.apply_reveal_rules();
        Ok(())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> DroidflowResult<Option<String>> {
        self.state()
            .call_history
            .push(format!("attribute:{}:{name}", element.query));
        Ok(self.element(element)?.attributes.get(name).cloned())
    }

    async fn is_displayed(&self, element: &ElementHandle) -> DroidflowResult<bool> {
        {
            let mut state = self.state();
            state
                .call_history
                .push(format!("displayed:{}", element.query));
            if let Some(remaining) = state.stale_checks.get_mut(&element.query) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(DroidflowError::action_failed(
                        "displayed",
                        &element.query,
                        format!("{STALE_ELEMENT}: element is not attached to the page document"),
                    ));
                }
            }
        }
        Ok(self.element(element)?.displayed)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> DroidflowResult<bool> {
        Ok(self.element(element)?.enabled)
    }

    async fn probe(&self) -> DroidflowResult<()> {
        let mut state = self.state();
        state.call_history.push("probe".to_string());
        match &state.probe_failure {
            Some(message) => Err(DroidflowError::Protocol {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn quit(&self) -> DroidflowResult<()> {
        self.state().call_history.push("quit".to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;

    fn fast() -> WaitOptions {
        WaitOptions::new()
            .with_timeout(Duration::from_millis(40))
            .with_poll_interval(Duration::from_millis(5))
    }

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout, Duration::from_secs(20));
            assert_eq!(opts.poll_interval, Duration::from_millis(250));
        }

        #[test]
        fn test_builder() {
            let opts = fast();
            assert_eq!(opts.timeout, Duration::from_millis(40));
            assert_eq!(opts.poll_interval, Duration::from_millis(5));
        }

        #[test]
        fn test_readiness_display() {
            assert_eq!(Readiness::Visible.to_string(), "visible");
            assert_eq!(Readiness::Clickable.to_string(), "clickable");
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_find_missing_element() {
            let driver = MockDriver::new();
            let err = driver
                .find_element(&Locator::class("android.widget.Button"))
                .await
                .unwrap_err();
            assert!(err.is_not_found());
            assert!(err.to_string().contains(NO_SUCH_ELEMENT_MESSAGE));
            assert!(driver.was_called("find:"));
        }

        #[tokio::test]
        async fn test_attribute_lookup() {
            let loc = Locator::content_desc(None, "Continue");
            let driver = MockDriver::new().with_element(&loc, MockElement::new().with_content_desc("Continue"));
            let el = driver.find_element(&loc).await.unwrap();
            assert_eq!(
                driver.attribute(&el, "content-desc").await.unwrap().as_deref(),
                Some("Continue")
            );
            assert_eq!(driver.attribute(&el, "text").await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_reveal_after_all_triggers() {
            let input = Locator::class("android.widget.EditText");
            let home = Locator::content_desc(None, "Home");
            let driver = MockDriver::new().with_element(&input, MockElement::new());
            driver.reveal_when_typed(&["a@b.c", "pw"], &home, MockElement::new());

            let el = driver.find_element(&input).await.unwrap();
            driver.send_keys(&el, "a@b.c").await.unwrap();
            assert!(driver.find_element(&home).await.is_err());
            driver.send_keys(&el, "pw").await.unwrap();
            assert!(driver.find_element(&home).await.is_ok());
            assert_eq!(driver.typed_text(), vec!["a@b.c", "pw"]);
        }

        #[tokio::test]
        async fn test_forced_action_failure() {
            let loc = Locator::class("android.widget.Button");
            let driver = MockDriver::new().with_element(&loc, MockElement::new());
            driver.fail_actions_on(&loc, "element not interactable");
            let el = driver.find_element(&loc).await.unwrap();
            let err = driver.click(&el).await.unwrap_err();
            assert!(matches!(err, DroidflowError::ActionFailed { .. }));
            assert!(err.to_string().contains("element not interactable"));
        }

        #[tokio::test]
        async fn test_forced_lookup_timeout() {
            let loc = Locator::class("android.widget.Button");
            let driver = MockDriver::new().with_element(&loc, MockElement::new());
            driver.time_out_lookups(&loc, 1_500);
            let err = driver.find_element(&loc).await.unwrap_err();
            assert!(matches!(err, DroidflowError::Timeout { ms: 1_500, .. }));
        }

        #[tokio::test]
        async fn test_probe_and_quit_recorded() {
            let driver = MockDriver::new();
            driver.probe().await.unwrap();
            driver.quit().await.unwrap();
            assert_eq!(driver.history(), vec!["probe", "quit"]);

            driver.fail_probe("session gone");
            assert!(driver.probe().await.is_err());
        }
    }

    mod wait_until_tests {
        use super::*;

        #[tokio::test]
        async fn test_ready_immediately() {
            let loc = Locator::class("android.widget.Button");
            let driver = MockDriver::new().with_element(&loc, MockElement::new());
            let el = driver
                .wait_until(&loc, Readiness::Clickable, &fast())
                .await
                .unwrap();
            assert_eq!(el.query, loc.query());
        }

        #[tokio::test]
        async fn test_absent_times_out() {
            let loc = Locator::class("android.widget.Button");
            let driver = MockDriver::new();
            let err = driver
                .wait_until(&loc, Readiness::Visible, &fast())
                .await
                .unwrap_err();
            assert!(matches!(err, DroidflowError::Timeout { ms: 40, .. }));
            assert!(driver.call_count("find:") >= 2);
        }

        #[tokio::test]
        async fn test_disabled_not_clickable_but_visible() {
            let loc = Locator::class("android.widget.Button");
            let driver = MockDriver::new().with_element(&loc, MockElement::new().disabled());
            assert!(driver
                .wait_until(&loc, Readiness::Visible, &fast())
                .await
                .is_ok());
            assert!(driver
                .wait_until(&loc, Readiness::Clickable, &fast())
                .await
                .is_err());
        }

        #[tokio::test]
        async fn test_stale_handle_keeps_polling() {
            let loc = Locator::content_desc(Some("android.widget.Button"), "Continue");
            let driver = MockDriver::new().with_element(&loc, MockElement::new());
            driver.go_stale(&loc, 1);
            let el = driver
                .wait_until(&loc, Readiness::Clickable, &fast())
                .await
                .unwrap();
            assert_eq!(el.query, loc.query());
            assert_eq!(driver.call_count("find:"), 2);
            assert_eq!(driver.call_count("displayed:"), 2);
        }

        #[tokio::test]
        async fn test_always_stale_times_out() {
            let loc = Locator::class("android.widget.Button");
            let driver = MockDriver::new().with_element(&loc, MockElement::new());
            driver.go_stale(&loc, usize::MAX);
            let err = driver
                .wait_until(&loc, Readiness::Visible, &fast())
                .await
                .unwrap_err();
            assert!(matches!(err, DroidflowError::Timeout { .. }));
        }

        #[tokio::test]
        async fn test_other_action_errors_end_wait() {
            #[derive(Debug)]
            struct Rejecting(MockDriver);

            #[async_trait]
            impl AutomationDriver for Rejecting {
                async fn find_element(&self, locator: &Locator) -> DroidflowResult<ElementHandle> {
                    self.0.find_element(locator).await
                }
                async fn click(&self, element: &ElementHandle) -> DroidflowResult<()> {
                    self.0.click(element).await
                }
                async fn send_keys(&self, element: &ElementHandle, text: &str) -> DroidflowResult<()> {
                    self.0.send_keys(element, text).await
                }
                async fn attribute(
                    &self,
                    element: &ElementHandle,
                    name: &str,
                ) -> DroidflowResult<Option<String>> {
                    self.0.attribute(element, name).await
                }
                async fn is_displayed(&self, element: &ElementHandle) -> DroidflowResult<bool> {
                    Err(DroidflowError::action_failed(
                        "displayed",
                        &element.query,
                        "invalid element state",
                    ))
                }
                async fn is_enabled(&self, element: &ElementHandle) -> DroidflowResult<bool> {
                    self.0.is_enabled(element).await
                }
                async fn probe(&self) -> DroidflowResult<()> {
                    self.0.probe().await
                }
                async fn quit(&self) -> DroidflowResult<()> {
                    self.0.quit().await
                }
            }

            let loc = Locator::class("android.widget.Button");
            let driver = Rejecting(MockDriver::new().with_element(&loc, MockElement::new()));
            let err = driver
                .wait_until(&loc, Readiness::Visible, &fast())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("invalid element state"));
            assert_eq!(driver.0.call_count("find:"), 1);
        }

        #[tokio::test]
        async fn test_zero_timeout_polls_once() {
            let loc = Locator::class("android.widget.Button");
            let driver = MockDriver::new().with_element(&loc, MockElement::new().hidden());
            let opts = WaitOptions::new().with_timeout(Duration::ZERO);
            assert!(driver.wait_until(&loc, Readiness::Visible, &opts).await.is_err());
            assert_eq!(driver.call_count("find:"), 1);
        }
    }
}
