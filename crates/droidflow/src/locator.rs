//! Locator abstraction for element selection.
//!
//! A [`Locator`] is an immutable query that renders to a single xpath
//! expression understood by UiAutomator2. Locators are built once (see
//! [`crate::catalog`]) and shared by every scenario.
//!
//! # Matching flavors
//!
//! - **Exact**: `//android.view.View[@content-desc="Continue"]`
//! - **Contains**: `//android.widget.ImageView[contains(@content-desc, "Tap to Start")]`
//! - **Relative**: a child query evaluated inside a parent element, e.g. the
//!   badge count inside the notification icon.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute holding the accessibility label on Android views
pub const CONTENT_DESC: &str = "content-desc";

/// Attribute holding the visible text on Android views
pub const TEXT: &str = "text";

/// How an attribute value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextMatch {
    /// Attribute must equal the text
    Exact,
    /// Attribute must contain the text
    Contains,
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Raw xpath expression, used verbatim
    XPath(String),
    /// Any element of a widget class (e.g., "android.widget.Button")
    Class(String),
    /// Element whose attribute matches a text
    Attribute {
        /// Widget class, `None` for any element
        class: Option<String>,
        /// Attribute name (e.g., "content-desc")
        attribute: String,
        /// Text to compare against
        text: String,
        /// Comparison flavor
        mode: TextMatch,
    },
    /// The n-th (1-based) match of the inner selector among its siblings
    Nth {
        /// Inner selector
        inner: Box<Selector>,
        /// 1-based position
        index: usize,
    },
    /// Child selector evaluated relative to a parent
    Nested {
        /// Parent selector
        parent: Box<Selector>,
        /// Child selector, rendered as a direct child step
        child: Box<Selector>,
    },
}

impl Selector {
    /// Render to an xpath expression
    #[must_use]
    pub fn to_xpath(&self) -> String {
        self.render(false)
    }

    fn render(&self, relative: bool) -> String {
        let axis = if relative { "/" } else { "//" };
        match self {
            Self::XPath(raw) => raw.clone(),
            Self::Class(class) => format!("{axis}{class}"),
            Self::Attribute {
                class,
                attribute,
                text,
                mode,
            } => {
                let node = class.as_deref().unwrap_or("*");
                let literal = xpath_literal(text);
                match mode {
                    TextMatch::Exact => format!("{axis}{node}[@{attribute}={literal}]"),
                    TextMatch::Contains => {
                        format!("{axis}{node}[contains(@{attribute}, {literal})]")
                    }
                }
            }
            Self::Nth { inner, index } => format!("{}[{index}]", inner.render(relative)),
            Self::Nested { parent, child } => {
                format!("{}{}", parent.render(relative), child.render(true))
            }
        }
    }
}

/// Quote a string as an xpath literal.
///
/// XPath 1.0 has no escape sequences, so text holding both quote kinds is
/// split and joined with `concat()`.
fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        format!("\"{text}\"")
    } else if !text.contains('\'') {
        format!("'{text}'")
    } else {
        let parts: Vec<String> = text.split('"').map(|p| format!("\"{p}\"")).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

/// A named, immutable element query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
    name: Option<String>,
    query: String,
}

impl Locator {
    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        let query = selector.to_xpath();
        Self {
            selector,
            name: None,
            query,
        }
    }

    /// Raw xpath locator
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::from_selector(Selector::XPath(expr.into()))
    }

    /// Any element of the given widget class
    #[must_use]
    pub fn class(class: impl Into<String>) -> Self {
        Self::from_selector(Selector::Class(class.into()))
    }

    /// Element whose content-desc equals `text`
    #[must_use]
    pub fn content_desc(class: Option<&str>, text: impl Into<String>) -> Self {
        Self::attribute(class, CONTENT_DESC, text, TextMatch::Exact)
    }

    /// Element whose content-desc contains `text`
    #[must_use]
    pub fn content_desc_contains(class: Option<&str>, text: impl Into<String>) -> Self {
        Self::attribute(class, CONTENT_DESC, text, TextMatch::Contains)
    }

    /// Element whose visible text contains `text`
    #[must_use]
    pub fn text_contains(class: Option<&str>, text: impl Into<String>) -> Self {
        Self::attribute(class, TEXT, text, TextMatch::Contains)
    }

    /// Element whose attribute matches `text`
    #[must_use]
    pub fn attribute(
        class: Option<&str>,
        attribute: impl Into<String>,
        text: impl Into<String>,
        mode: TextMatch,
    ) -> Self {
        Self::from_selector(Selector::Attribute {
            class: class.map(str::to_string),
            attribute: attribute.into(),
            text: text.into(),
            mode,
        })
    }

    /// Restrict to the n-th (1-based) sibling match
    #[must_use]
    pub fn nth(self, index: usize) -> Self {
        let name = self.name;
        let mut locator = Self::from_selector(Selector::Nth {
            inner: Box::new(self.selector),
            index,
        });
        locator.name = name;
        locator
    }

    /// Evaluate this locator as a direct child of `parent`
    #[must_use]
    pub fn within(self, parent: &Self) -> Self {
        let name = self.name;
        let mut locator = Self::from_selector(Selector::Nested {
            parent: Box::new(parent.selector.clone()),
            child: Box::new(self.selector),
        });
        locator.name = name;
        locator
    }

    /// Attach a human-readable name used in logs
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The rendered xpath query
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The underlying selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Name for logging, falling back to the query
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.query)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}
