//! W3C WebDriver client for an Appium server.
//!
//! Speaks the JSON wire protocol over HTTP. Only the commands the suite
//! needs are implemented: session creation, implicit wait, xpath lookup,
//! click, typing, attribute and state reads, page source and quit.

use crate::config::SessionConfig;
use crate::driver::{AutomationDriver, ElementHandle};
use crate::locator::Locator;
use crate::result::{DroidflowError, DroidflowResult};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// W3C element reference key
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Pre-W3C element reference key, still sent by older servers
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// HTTP timeout per command. Session creation installs the app, so this is generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Error payload of a failed W3C command
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WebDriverError {
    /// W3C error code (e.g., "no such element")
    pub error: String,
    /// Server message
    #[serde(default)]
    pub message: String,
}

impl WebDriverError {
    /// Map to the crate error taxonomy
    #[must_use]
    pub fn into_error(self, action: &str, query: &str) -> DroidflowError {
        match self.error.as_str() {
            "no such element" => DroidflowError::not_found(query, self.message),
            "element not interactable"
            | "stale element reference"
            | "invalid element state"
            | "element click intercepted" => {
                DroidflowError::action_failed(action, query, format!("{}: {}", self.error, self.message))
            }
            _ => DroidflowError::Protocol {
                message: format!("{action} on {query}: {}: {}", self.error, self.message),
            },
        }
    }
}

/// Build the W3C capabilities object for a new session
#[must_use]
pub fn capabilities(config: &SessionConfig) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": {
                "platformName": config.platform_name,
                "appium:deviceName": config.device_name,
                "appium:platformVersion": config.platform_version,
                "appium:appPackage": config.app_package,
                "appium:appActivity": config.app_activity,
                "appium:automationName": config.automation_name,
                "appium:noReset": config.no_reset,
                "appium:autoGrantPermissions": config.auto_grant_permissions,
            },
            "firstMatch": [{}],
        }
    })
}

/// Implicit wait in the milliseconds the timeouts endpoint expects
const fn implicit_wait_ms(secs: u64) -> u64 {
    secs.saturating_mul(1000)
}

/// Extract the session id from a `POST /session` response
fn parse_session_id(body: &Value) -> Option<String> {
    body.pointer("/value/sessionId")
        .or_else(|| body.get("sessionId"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Extract the element reference from a `POST /element` value
fn parse_element_id(value: &Value) -> Option<String> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Convert an attribute value to text; `null` means the attribute is absent
fn attribute_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Parse the error payload out of a failed response body
fn parse_error(status: u16, body: &str) -> WebDriverError {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("value").cloned())
        .and_then(|v| serde_json::from_value::<WebDriverError>(v).ok())
        .unwrap_or_else(|| WebDriverError {
            error: "unknown error".to_string(),
            message: format!("HTTP {status}: {body}"),
        })
}

/// Live session on an Appium server
#[derive(Debug, Clone)]
pub struct AppiumDriver {
    client: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl AppiumDriver {
    /// Open a session and apply the implicit wait.
    ///
    /// Any failure here is reported as `DriverAcquisition`.
    pub async fn connect(config: &SessionConfig) -> DroidflowResult<Self> {
        let base_url = config.server_url.trim_end_matches('/').to_string();
        let acquisition = |message: String| DroidflowError::DriverAcquisition { message };

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| acquisition(format!("HTTP client setup failed: {e}")))?;

        tracing::info!(
            server = %base_url,
            device = %config.device_name,
            app = %config.app_package,
            "opening automation session"
        );

        let resp = client
            .post(format!("{base_url}/session"))
            .json(&capabilities(config))
            .send()
            .await
            .map_err(|e| acquisition(format!("{base_url} unreachable: {e}")))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| acquisition(e.to_string()))?;
        if !status.is_success() {
            let err = parse_error(status.as_u16(), &text);
            return Err(acquisition(format!("{}: {}", err.error, err.message)));
        }
        let body: Value = serde_json::from_str(&text).map_err(|e| acquisition(e.to_string()))?;
        let session_id = parse_session_id(&body)
            .ok_or_else(|| acquisition("response carried no session id".to_string()))?;

        let driver = Self {
            client,
            base_url,
            session_id,
        };
        let implicit_ms = implicit_wait_ms(config.implicit_wait_secs);
        driver
            .execute(
                Method::POST,
                "timeouts",
                Some(json!({ "implicit": implicit_ms })),
                "set timeouts",
                "",
            )
            .await
            .map_err(|e| acquisition(e.to_string()))?;

        tracing::info!(session = %driver.session_id, "automation session ready");
        Ok(driver)
    }

    /// Server-assigned session id
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send one session command and return the `value` member of the reply
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        action: &str,
        query: &str,
    ) -> DroidflowResult<Value> {
        let url = if path.is_empty() {
            format!("{}/session/{}", self.base_url, self.session_id)
        } else {
            format!("{}/session/{}/{path}", self.base_url, self.session_id)
        };
        tracing::debug!(%method, %url, "webdriver command");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let resp = request.send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(parse_error(status.as_u16(), &text).into_error(action, query));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        let mut body: Value = serde_json::from_str(&text)?;
        Ok(body.get_mut("value").map(Value::take).unwrap_or(Value::Null))
    }
}

#[async_trait]
impl AutomationDriver for AppiumDriver {
    async fn find_element(&self, locator: &Locator) -> DroidflowResult<ElementHandle> {
        let value = self
            .execute(
                Method::POST,
                "element",
                Some(json!({ "using": "xpath", "value": locator.query() })),
                "find",
                locator.query(),
            )
            .await?;
        let id = parse_element_id(&value).ok_or_else(|| DroidflowError::Protocol {
            message: format!("element reference missing for {}", locator.query()),
        })?;
        Ok(ElementHandle::new(id, locator.query()))
    }

    async fn click(&self, element: &ElementHandle) -> DroidflowResult<()> {
        self.execute(
            Method::POST,
            &format!("element/{}/click", element.id),
            Some(json!({})),
            "click",
            &element.query,
        )
        .await
        .map(|_| ())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> DroidflowResult<()> {
        self.execute(
            Method::POST,
            &format!("element/{}/value", element.id),
            Some(json!({ "text": text })),
            "type",
            &element.query,
        )
        .await
        .map(|_| ())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> DroidflowResult<Option<String>> {
        let value = self
            .execute(
                Method::GET,
                &format!("element/{}/attribute/{name}", element.id),
                None,
                "attribute",
                &element.query,
            )
            .await?;
        Ok(attribute_text(value))
    }

    async fn is_displayed(&self, element: &ElementHandle) -> DroidflowResult<bool> {
        let value = self
            .execute(
                Method::GET,
                &format!("element/{}/displayed", element.id),
                None,
                "displayed",
                &element.query,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> DroidflowResult<bool> {
        let value = self
            .execute(
                Method::GET,
                &format!("element/{}/enabled", element.id),
                None,
                "enabled",
                &element.query,
            )
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn probe(&self) -> DroidflowResult<()> {
        self.execute(Method::GET, "source", None, "probe", "//*")
            .await
            .map(|_| ())
    }

    async fn quit(&self) -> DroidflowResult<()> {
        tracing::info!(session = %self.session_id, "closing automation session");
        self.execute(Method::DELETE, "", None, "quit", "")
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod capability_tests {
        use super::*;

        #[test]
        fn test_default_capabilities() {
            let caps = capabilities(&SessionConfig::default());
            let always = &caps["capabilities"]["alwaysMatch"];
            assert_eq!(always["platformName"], "Android");
            assert_eq!(always["appium:deviceName"], "emulator-5554");
            assert_eq!(always["appium:appPackage"], "com.raising.prodigy");
            assert_eq!(always["appium:automationName"], "UiAutomator2");
            assert_eq!(always["appium:noReset"], false);
            assert_eq!(always["appium:autoGrantPermissions"], true);
        }

        #[test]
        fn test_implicit_wait_conversion() {
            assert_eq!(implicit_wait_ms(15), 15_000);
            assert_eq!(implicit_wait_ms(0), 0);
            assert_eq!(implicit_wait_ms(u64::MAX), u64::MAX);
        }
    }

    mod response_tests {
        use super::*;

        #[test]
        fn test_session_id_w3c() {
            let body = json!({ "value": { "sessionId": "abc", "capabilities": {} } });
            assert_eq!(parse_session_id(&body).as_deref(), Some("abc"));
        }

        #[test]
        fn test_session_id_legacy() {
            let body = json!({ "status": 0, "sessionId": "old", "value": {} });
            assert_eq!(parse_session_id(&body).as_deref(), Some("old"));
        }

        #[test]
        fn test_element_reference_keys() {
            assert_eq!(
                parse_element_id(&json!({ ELEMENT_KEY: "e1" })).as_deref(),
                Some("e1")
            );
            assert_eq!(
                parse_element_id(&json!({ "ELEMENT": "e2" })).as_deref(),
                Some("e2")
            );
            assert_eq!(parse_element_id(&json!({})), None);
        }

        #[test]
        fn test_attribute_text() {
            assert_eq!(attribute_text(Value::Null), None);
            assert_eq!(attribute_text(json!("Sign in")).as_deref(), Some("Sign in"));
            assert_eq!(attribute_text(json!(true)).as_deref(), Some("true"));
        }
    }

    mod error_mapping_tests {
        use super::*;

        #[test]
        fn test_no_such_element() {
            let body = r#"{"value":{"error":"no such element","message":"gone","stacktrace":""}}"#;
            let err = parse_error(404, body).into_error("find", "//x");
            assert!(matches!(err, DroidflowError::ElementNotFound { .. }));
            assert!(err.to_string().contains("gone"));
        }

        #[test]
        fn test_not_interactable() {
            let body = r#"{"value":{"error":"element not interactable","message":"covered"}}"#;
            let err = parse_error(400, body).into_error("click", "//x");
            assert!(matches!(err, DroidflowError::ActionFailed { .. }));
        }

        #[test]
        fn test_unparseable_body() {
            let err = parse_error(502, "Bad Gateway");
            assert_eq!(err.error, "unknown error");
            assert!(err.message.contains("502"));
            assert!(matches!(
                err.into_error("find", "//x"),
                DroidflowError::Protocol { .. }
            ));
        }
    }
}
