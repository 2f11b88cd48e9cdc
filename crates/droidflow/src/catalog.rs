//! Catalog of the UI elements exercised by the suite.
//!
//! Every scenario refers to elements by name; the queries live here and
//! nowhere else.

use crate::locator::Locator;
use std::fmt;

/// Message shown by the app when sign-in is rejected
pub const AUTH_ERROR_TEXT: &str =
    "The supplied auth credential is incorrect, malformed or has expired.";

/// Text present on the home screen after a successful sign-in
pub const HOME_MARKER_TEXT: &str = "Activity Streak";

/// Question shown by the rating popup
pub const FEEDBACK_PROMPT_TEXT: &str = "Enjoying Prodigy Baby?";

const IMAGE_VIEW: &str = "android.widget.ImageView";
const BUTTON: &str = "android.widget.Button";
const EDIT_TEXT: &str = "android.widget.EditText";
const VIEW: &str = "android.view.View";

/// Named UI element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    /// Splash image that starts onboarding
    TapToStart,
    /// First button on the intro screen
    IntroButton,
    /// "Saw an advertisement" attribution option
    SawAdvertisement,
    /// "Continue" button on the attribution screen
    Continue,
    /// The single text field on email and password screens
    TextInput,
    /// "Sign in" button
    SignIn,
    /// "Login with Password" button
    LoginWithPassword,
    /// Home screen marker
    HomeMarker,
    /// Authentication error message
    AuthError,
    /// Home screen app bar
    AppBar,
    /// Notification icon inside the badge container
    NotificationBadge,
    /// Activity streak label (text match)
    ActivityStreakText,
    /// "Claim medals" card
    ClaimMedals,
    /// Rating popup
    FeedbackPopup,
}

impl Element {
    /// Every catalogued element, in display order
    pub const ALL: [Self; 14] = [
        Self::TapToStart,
        Self::IntroButton,
        Self::SawAdvertisement,
        Self::Continue,
        Self::TextInput,
        Self::SignIn,
        Self::LoginWithPassword,
        Self::HomeMarker,
        Self::AuthError,
        Self::AppBar,
        Self::NotificationBadge,
        Self::ActivityStreakText,
        Self::ClaimMedals,
        Self::FeedbackPopup,
    ];

    /// Stable name used in logs and listings
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TapToStart => "tap_to_start",
            Self::IntroButton => "intro_button",
            Self::SawAdvertisement => "saw_advertisement",
            Self::Continue => "continue",
            Self::TextInput => "text_input",
            Self::SignIn => "sign_in",
            Self::LoginWithPassword => "login_with_password",
            Self::HomeMarker => "home_marker",
            Self::AuthError => "auth_error",
            Self::AppBar => "app_bar",
            Self::NotificationBadge => "notification_badge",
            Self::ActivityStreakText => "activity_streak_text",
            Self::ClaimMedals => "claim_medals",
            Self::FeedbackPopup => "feedback_popup",
        }
    }

    /// Locator for this element
    #[must_use]
    pub fn locator(self) -> Locator {
        let locator = match self {
            Self::TapToStart => Locator::content_desc_contains(Some(IMAGE_VIEW), "Tap to Start"),
            Self::IntroButton => Locator::class(BUTTON),
            Self::SawAdvertisement => Locator::content_desc(None, "Saw an advertisement"),
            Self::Continue => Locator::content_desc(None, "Continue"),
            Self::TextInput => Locator::class(EDIT_TEXT),
            Self::SignIn => Locator::content_desc(Some(BUTTON), "Sign in"),
            Self::LoginWithPassword => Locator::content_desc(Some(BUTTON), "Login with Password"),
            Self::HomeMarker => Locator::content_desc_contains(Some(VIEW), HOME_MARKER_TEXT),
            Self::AuthError => Locator::content_desc(Some(VIEW), AUTH_ERROR_TEXT),
            Self::AppBar => Locator::content_desc(None, "App Bar"),
            Self::NotificationBadge => {
                let container = Locator::content_desc(Some(VIEW), "1");
                Locator::class(VIEW).nth(2).within(&container)
            }
            Self::ActivityStreakText => Locator::text_contains(None, HOME_MARKER_TEXT),
            Self::ClaimMedals => Locator::content_desc(Some(VIEW), "Claim medals"),
            Self::FeedbackPopup => Locator::content_desc(Some(VIEW), FEEDBACK_PROMPT_TEXT),
        };
        locator.named(self.name())
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Element> for Locator {
    fn from(element: Element) -> Self {
        element.locator()
    }
}
