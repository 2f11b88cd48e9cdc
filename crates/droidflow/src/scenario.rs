//! Scenario definitions.
//!
//! A [`Scenario`] is an ordered list of [`Step`]s plus an optional terminal
//! [`Assertion`]. Variants of one flow share a step template and differ only
//! in their parameter map and assertion.

use crate::catalog::{Element, AUTH_ERROR_TEXT, HOME_MARKER_TEXT};
use crate::config::CredentialsConfig;
use crate::locator::Locator;
use crate::result::{DroidflowError, DroidflowResult};
use std::collections::BTreeMap;
use std::fmt;

/// Parameter holding the email typed by the login template
pub const EMAIL_PARAM: &str = "email";

/// Parameter holding the password typed by the login template
pub const PASSWORD_PARAM: &str = "password";

// =============================================================================
// STEPS
// =============================================================================

/// Text typed by a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Fixed text
    Literal(String),
    /// Looked up in the scenario's parameter map
    Param(String),
}

impl Input {
    /// Resolve against a parameter map
    pub fn resolve(&self, params: &BTreeMap<String, String>) -> DroidflowResult<String> {
        match self {
            Self::Literal(text) => Ok(text.clone()),
            Self::Param(name) => {
                params
                    .get(name)
                    .cloned()
                    .ok_or_else(|| DroidflowError::InvalidScenario {
                        message: format!("missing parameter '{name}'"),
                    })
            }
        }
    }
}

/// What a step does with its element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Click the element
    Click,
    /// Type text into the element
    Type(Input),
    /// Wait until the element is displayed
    WaitVisible,
    /// Wait until the element is displayed and enabled
    WaitClickable,
}

impl StepAction {
    /// Short action name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Type(_) => "type",
            Self::WaitVisible => "wait_visible",
            Self::WaitClickable => "wait_clickable",
        }
    }
}

/// One UI interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Human-readable description for step logs
    pub description: String,
    /// Target element
    pub locator: Locator,
    /// Action to perform
    pub action: StepAction,
    /// Whether a failure aborts the scenario
    pub required: bool,
}

impl Step {
    /// Create a required step
    #[must_use]
    pub fn new(description: impl Into<String>, locator: impl Into<Locator>, action: StepAction) -> Self {
        Self {
            description: description.into(),
            locator: locator.into(),
            action,
            required: true,
        }
    }

    /// Click step
    #[must_use]
    pub fn click(description: impl Into<String>, locator: impl Into<Locator>) -> Self {
        Self::new(description, locator, StepAction::Click)
    }

    /// Typing step
    #[must_use]
    pub fn type_text(description: impl Into<String>, locator: impl Into<Locator>, input: Input) -> Self {
        Self::new(description, locator, StepAction::Type(input))
    }

    /// Visibility wait step
    #[must_use]
    pub fn wait_visible(description: impl Into<String>, locator: impl Into<Locator>) -> Self {
        Self::new(description, locator, StepAction::WaitVisible)
    }

    /// Clickability wait step
    #[must_use]
    pub fn wait_clickable(description: impl Into<String>, locator: impl Into<Locator>) -> Self {
        Self::new(description, locator, StepAction::WaitClickable)
    }

    /// Mark the step as not required
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

// =============================================================================
// ASSERTIONS
// =============================================================================

/// Condition checked by the terminal assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// Attribute contains the text
    Contains(String),
    /// Attribute equals the text
    Equals(String),
    /// Element can be located
    Present,
    /// Element cannot be located
    Absent,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains(text) => write!(f, "text containing '{text}'"),
            Self::Equals(text) => write!(f, "text equal to '{text}'"),
            Self::Present => f.write_str("element present"),
            Self::Absent => f.write_str("element absent"),
        }
    }
}

/// Terminal check deciding PASSED or FAILED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    /// Element to inspect
    pub locator: Locator,
    /// Attribute to read; `None` reads content-desc, then text
    pub attribute: Option<String>,
    /// Expected condition
    pub expectation: Expectation,
}

impl Assertion {
    /// Attribute must contain `text`
    #[must_use]
    pub fn contains(locator: impl Into<Locator>, text: impl Into<String>) -> Self {
        Self::new(locator, Expectation::Contains(text.into()))
    }

    /// Attribute must equal `text`
    #[must_use]
    pub fn equals(locator: impl Into<Locator>, text: impl Into<String>) -> Self {
        Self::new(locator, Expectation::Equals(text.into()))
    }

    /// Element must be locatable
    #[must_use]
    pub fn present(locator: impl Into<Locator>) -> Self {
        Self::new(locator, Expectation::Present)
    }

    /// Element must not be locatable
    #[must_use]
    pub fn absent(locator: impl Into<Locator>) -> Self {
        Self::new(locator, Expectation::Absent)
    }

    fn new(locator: impl Into<Locator>, expectation: Expectation) -> Self {
        Self {
            locator: locator.into(),
            attribute: None,
            expectation,
        }
    }

    /// Read a specific attribute
    #[must_use]
    pub fn on_attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    /// Check observed text against the expectation
    #[must_use]
    pub fn matches_text(&self, observed: &str) -> bool {
        match &self.expectation {
            Expectation::Contains(text) => observed.contains(text.as_str()),
            Expectation::Equals(text) => observed == text,
            Expectation::Present | Expectation::Absent => true,
        }
    }
}

// =============================================================================
// SCENARIO
// =============================================================================

/// One named test flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Name written to the report
    pub name: String,
    /// Human-readable expectation written to the report
    pub expected: String,
    /// Ordered steps
    pub steps: Vec<Step>,
    /// Values for `Input::Param`
    pub params: BTreeMap<String, String>,
    /// Terminal assertion
    pub assertion: Option<Assertion>,
    /// An absent element is recorded SKIPPED instead of FAILED
    pub optional: bool,
    /// Recorded SKIPPED without running
    pub skip_reason: Option<String>,
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected: String::new(),
            steps: Vec::new(),
            params: BTreeMap::new(),
            assertion: None,
            optional: false,
            skip_reason: None,
        }
    }

    /// Set the expectation text
    #[must_use]
    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = expected.into();
        self
    }

    /// Append steps
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Append one step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Bind a parameter
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Set the terminal assertion
    #[must_use]
    pub fn assert(mut self, assertion: Assertion) -> Self {
        self.assertion = Some(assertion);
        self
    }

    /// Mark as optional
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Skip with a reason
    #[must_use]
    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.skip_reason = Some(reason.into());
        self
    }

    /// Parameters referenced by steps but not bound
    #[must_use]
    pub fn unbound_params(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| match &s.action {
                StepAction::Type(Input::Param(name)) if !self.params.contains_key(name) => {
                    Some(name.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

// =============================================================================
// BUILT-IN SCENARIOS
// =============================================================================

/// Onboarding and sign-in steps shared by every login variant
#[must_use]
pub fn login_template() -> Vec<Step> {
    vec![
        Step::wait_clickable("wait for Tap to Start", Element::TapToStart),
        Step::click("tap Tap to Start", Element::TapToStart),
        Step::wait_clickable("wait for intro button", Element::IntroButton),
        Step::click("tap intro button", Element::IntroButton),
        Step::wait_clickable("wait for attribution options", Element::SawAdvertisement),
        Step::click("select Saw an advertisement", Element::SawAdvertisement),
        Step::click("tap Continue", Element::Continue),
        Step::wait_clickable("wait for email field", Element::TextInput),
        Step::click("focus email field", Element::TextInput),
        Step::type_text("enter email", Element::TextInput, Input::Param(EMAIL_PARAM.to_string())),
        Step::wait_clickable("wait for Sign in", Element::SignIn),
        Step::click("tap Sign in", Element::SignIn),
        Step::wait_clickable("wait for Login with Password", Element::LoginWithPassword),
        Step::click("tap Login with Password", Element::LoginWithPassword),
        Step::wait_clickable("wait for password field", Element::TextInput),
        Step::click("focus password field", Element::TextInput),
        Step::type_text(
            "enter password",
            Element::TextInput,
            Input::Param(PASSWORD_PARAM.to_string()),
        ),
        Step::wait_clickable("wait for Sign in", Element::SignIn),
        Step::click("tap Sign in", Element::SignIn),
    ]
}

fn login_variant(name: &str, expected: &str, email: &str, password: &str) -> Scenario {
    Scenario::new(name)
        .expected(expected)
        .steps(login_template())
        .param(EMAIL_PARAM, email)
        .param(PASSWORD_PARAM, password)
}

/// Valid credentials reach the home screen
#[must_use]
pub fn successful_login(credentials: &CredentialsConfig) -> Scenario {
    login_variant(
        "Successful Login",
        "User should reach home page with 'Activity Streak' text",
        &credentials.valid_email,
        &credentials.valid_password,
    )
    .assert(Assertion::contains(Element::HomeMarker, HOME_MARKER_TEXT))
}

/// Unknown email is rejected with the authentication error
#[must_use]
pub fn invalid_email_login(credentials: &CredentialsConfig) -> Scenario {
    login_variant(
        "Invalid Email Login",
        "App should show error message for invalid email",
        &credentials.invalid_email,
        &credentials.valid_password,
    )
    .assert(Assertion::contains(Element::AuthError, AUTH_ERROR_TEXT))
}

/// Wrong password is rejected with the authentication error
#[must_use]
pub fn invalid_password_login(credentials: &CredentialsConfig) -> Scenario {
    login_variant(
        "Invalid Password Login",
        "App should show error message for invalid password",
        &credentials.valid_email,
        &credentials.invalid_password,
    )
    .assert(Assertion::contains(Element::AuthError, AUTH_ERROR_TEXT))
}

/// All login variants, in run order
#[must_use]
pub fn login_scenarios(credentials: &CredentialsConfig) -> Vec<Scenario> {
    vec![
        successful_login(credentials),
        invalid_email_login(credentials),
        invalid_password_login(credentials),
    ]
}

/// Checks run on the home screen after signing in
#[must_use]
pub fn home_page_checks() -> Vec<Scenario> {
    vec![
        Scenario::new("Home Page Loaded")
            .expected("Home page should load")
            .assert(Assertion::contains(Element::HomeMarker, HOME_MARKER_TEXT)),
        Scenario::new("App Bar Element")
            .expected("App bar should be visible")
            .assert(Assertion::present(Element::AppBar))
            .skip("App bar xpath not available - test skipped"),
        Scenario::new("Notification Icon")
            .expected("Notification icon should be visible")
            .assert(Assertion::present(Element::NotificationBadge)),
        Scenario::new("Activity Streak Element")
            .expected("Activity Streak should be visible")
            .assert(Assertion::present(Element::ActivityStreakText)),
        Scenario::new("Claim Medals Element")
            .expected("Claim Medals should be visible")
            .assert(Assertion::present(Element::ClaimMedals)),
        Scenario::new("Feedback Popup Element")
            .expected("Feedback Popup should be visible")
            .assert(Assertion::present(Element::FeedbackPopup))
            .optional(),
    ]
}
