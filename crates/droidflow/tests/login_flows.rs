//! End-to-end flows against the scripted mock driver.

use droidflow::{
    default_suite, invalid_email_login, invalid_password_login, successful_login, DeviceShell,
    DriverHandle, DroidflowError, DroidflowResult, Element, FlowRunner, FlowState,
    FnSessionFactory, LifecycleController, Locator, MockDriver, MockElement, ResultRecorder,
    Scenario, SessionConfig, ShellOutput, Step, StepStatus, Suite, SuiteConfig, SuiteRunner,
    TestStatus, WaitOptions, AUTH_ERROR_TEXT,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const HOME_CONTENT: &str = "Activity Streak\n0 Week Streak\nKeep going!";

fn fast() -> WaitOptions {
    WaitOptions::new()
        .with_timeout(Duration::from_millis(40))
        .with_poll_interval(Duration::from_millis(5))
}

fn quick_config() -> SuiteConfig {
    let mut config = SuiteConfig::default();
    config.reset.force_stop_settle_ms = 0;
    config.reset.clear_data_settle_ms = 0;
    config.reset.reset_permissions_settle_ms = 0;
    config.reset.post_teardown_delay_ms = 0;
    config
}

/// Onboarding screens, plus home and error screens revealed by what gets typed
fn scripted_app(config: &SuiteConfig) -> MockDriver {
    let credentials = &config.credentials;
    let driver = MockDriver::new();
    for element in [
        Element::TapToStart,
        Element::IntroButton,
        Element::SawAdvertisement,
        Element::Continue,
        Element::TextInput,
        Element::SignIn,
        Element::LoginWithPassword,
    ] {
        driver.add_element(&element.locator(), MockElement::new());
    }
    driver.reveal_when_typed(
        &[
            credentials.valid_email.as_str(),
            credentials.valid_password.as_str(),
        ],
        &Element::HomeMarker.locator(),
        MockElement::new().with_content_desc(HOME_CONTENT),
    );
    for bad in [&credentials.invalid_email, &credentials.invalid_password] {
        driver.reveal_when_typed(
            &[bad.as_str()],
            &Element::AuthError.locator(),
            MockElement::new().with_content_desc(AUTH_ERROR_TEXT),
        );
    }
    driver
}

/// Shell that accepts every command
#[derive(Debug, Default)]
struct NoopShell;

#[async_trait::async_trait]
impl DeviceShell for NoopShell {
    async fn shell(&self, _args: &[&str]) -> DroidflowResult<ShellOutput> {
        Ok(ShellOutput {
            success: true,
            output: String::new(),
        })
    }
}

mod login_tests {
    use super::*;

    #[tokio::test]
    async fn test_successful_login_passes() {
        let config = quick_config();
        let driver = scripted_app(&config);
        let mut runner = FlowRunner::new(&driver, fast());

        let result = runner.run(&successful_login(&config.credentials)).await;

        assert_eq!(result.status, TestStatus::Passed, "{result:?}");
        assert!(result.actual.contains("Activity Streak"));
        assert_eq!(runner.state(), FlowState::Completed);
        assert_eq!(
            driver.typed_text(),
            vec!["program1@prodigy.baby".to_string(), "123456".to_string()]
        );
    }

    #[tokio::test]
    async fn test_invalid_email_shows_error() {
        let config = quick_config();
        let driver = scripted_app(&config);
        let mut runner = FlowRunner::new(&driver, fast());

        let result = runner.run(&invalid_email_login(&config.credentials)).await;

        assert_eq!(result.status, TestStatus::Passed, "{result:?}");
        assert!(result.actual.contains("incorrect"));
        assert_eq!(driver.typed_text()[0], "invalid@email.com");
        assert_eq!(driver.typed_text()[1], "123456");
    }

    #[tokio::test]
    async fn test_invalid_password_shows_error() {
        let config = quick_config();
        let driver = scripted_app(&config);
        let mut runner = FlowRunner::new(&driver, fast());

        let result = runner.run(&invalid_password_login(&config.credentials)).await;

        assert_eq!(result.status, TestStatus::Passed, "{result:?}");
        assert!(!driver.was_called(&format!("find:{}", Element::HomeMarker.locator())));
    }

    #[tokio::test]
    async fn test_invalid_credentials_reaching_home_fail() {
        let config = quick_config();
        let driver = scripted_app(&config);
        // App lets anyone in
        driver.add_element(
            &Element::HomeMarker.locator(),
            MockElement::new().with_content_desc(HOME_CONTENT),
        );
        let mut credentials = config.credentials.clone();
        credentials.invalid_email = "nobody@example.com".to_string();
        let mut runner = FlowRunner::new(&driver, fast());

        let result = runner.run(&invalid_email_login(&credentials)).await;

        assert_eq!(result.status, TestStatus::Failed);
        assert!(result.actual.contains("not found"));
        assert!(result.error_message.is_some());
    }

    #[tokio::test]
    async fn test_wrong_terminal_text_is_mismatch() {
        let config = quick_config();
        let driver = scripted_app(&config);
        driver.reveal_when_typed(
            &[config.credentials.valid_password.as_str()],
            &Element::HomeMarker.locator(),
            MockElement::new().with_content_desc("Welcome back"),
        );
        let mut credentials = config.credentials.clone();
        credentials.valid_email = "someone@prodigy.baby".to_string();
        let mut runner = FlowRunner::new(&driver, fast());

        let result = runner.run(&successful_login(&credentials)).await;

        assert_eq!(result.status, TestStatus::Failed);
        assert_eq!(result.actual, "Welcome back");
        assert!(result
            .error_message
            .as_deref()
            .is_some_and(|e| e.contains("Expected:")));
    }
}

mod abort_tests {
    use super::*;

    fn button(label: &str) -> Locator {
        Locator::content_desc(Some("android.widget.Button"), label)
    }

    #[tokio::test]
    async fn test_missing_element_stops_the_flow() {
        let driver = MockDriver::new();
        for label in ["One", "Two", "Four", "Five", "Six"] {
            driver.add_element(&button(label), MockElement::new());
        }
        let scenario = Scenario::new("Six taps")
            .expected("All buttons tapped")
            .steps(
                ["One", "Two", "Three", "Four", "Five", "Six"]
                    .into_iter()
                    .map(|label| Step::click(format!("tap {label}"), button(label))),
            );
        let mut runner = FlowRunner::new(&driver, fast());

        let result = runner.run(&scenario).await;

        assert_eq!(result.status, TestStatus::Failed);
        assert_eq!(result.actual, "Aborted at step 3/6: tap Three");
        let error = result.error_message.unwrap_or_default();
        assert!(error.contains("Three"), "{error}");
        assert_eq!(runner.state(), FlowState::Aborted);

        let outcomes = runner.step_outcomes();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[2].status, StepStatus::Failed);
        for label in ["Four", "Five", "Six"] {
            assert!(!driver.was_called(&format!("click:{}", button(label))));
        }
    }

    #[tokio::test]
    async fn test_unstable_session_still_runs() {
        let config = quick_config();
        let driver = scripted_app(&config);
        driver.fail_probe("session is busy");
        let mut runner = FlowRunner::new(&driver, fast());

        let result = runner.run(&successful_login(&config.credentials)).await;

        assert_eq!(result.status, TestStatus::Passed);
        assert!(driver.was_called("find://*"));
    }
}

mod suite_tests {
    use super::*;

    fn home_screen(driver: &MockDriver) {
        for element in [
            Element::NotificationBadge,
            Element::ActivityStreakText,
            Element::ClaimMedals,
        ] {
            driver.add_element(&element.locator(), MockElement::new());
        }
    }

    #[tokio::test]
    async fn test_default_suite_records_every_scenario() {
        let config = quick_config();
        let sessions = Arc::new(AtomicUsize::new(0));
        let opened = Arc::clone(&sessions);
        let app_config = config.clone();
        let factory = FnSessionFactory::new(move |_: &SessionConfig| {
            opened.fetch_add(1, Ordering::SeqCst);
            let driver = scripted_app(&app_config);
            home_screen(&driver);
            Ok(Arc::new(driver) as DriverHandle)
        });
        let runner = SuiteRunner::new(LifecycleController::new(factory, NoopShell, &config), fast());
        let mut recorder = ResultRecorder::new();

        let outcome = runner
            .run(&default_suite(&config), &mut recorder)
            .await
            .unwrap();

        assert_eq!(outcome.total, 9);
        assert_eq!(outcome.failed, 0, "{:#?}", recorder.results());
        // App bar is skipped by definition, the feedback popup is absent
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.passed, 7);
        assert_eq!(outcome.exit_code(), 0);
        // Three login sessions and one shared home page session
        assert_eq!(sessions.load(Ordering::SeqCst), 4);

        let names: Vec<_> = recorder.results().iter().map(|r| r.test_name.as_str()).collect();
        assert_eq!(names[0], "Successful Login");
        assert_eq!(names[3], "Home Page Loaded");
        assert_eq!(names[8], "Feedback Popup Element");
    }

    #[tokio::test]
    async fn test_failed_prelude_skips_group() {
        let config = quick_config();
        // Sign-in never reaches home
        let factory = FnSessionFactory::new(|_: &SessionConfig| {
            let driver = MockDriver::new();
            driver.add_element(&Element::TapToStart.locator(), MockElement::new());
            Ok(Arc::new(driver) as DriverHandle)
        });
        let runner = SuiteRunner::new(LifecycleController::new(factory, NoopShell, &config), fast());
        let suite = default_suite(&config).filtered(Some("Home Page"), None);
        let mut recorder = ResultRecorder::new();

        let outcome = runner.run(&suite, &mut recorder).await.unwrap();

        assert_eq!(outcome.total, 7);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.skipped, 6);
        assert_eq!(recorder.results()[0].test_name, "Home Page setup");
        assert!(recorder.results()[1..]
            .iter()
            .all(|r| r.status == TestStatus::Skipped));
        assert_eq!(outcome.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_acquisition_failure_stops_run() {
        let config = quick_config();
        let factory = FnSessionFactory::new(|_: &SessionConfig| {
            Err(DroidflowError::Protocol {
                message: "connection refused".to_string(),
            })
        });
        let runner = SuiteRunner::new(LifecycleController::new(factory, NoopShell, &config), fast());
        let mut recorder = ResultRecorder::new();

        let err = runner
            .run(&default_suite(&config), &mut recorder)
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(recorder.total_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_suite() {
        let config = quick_config();
        let factory = FnSessionFactory::new(|_: &SessionConfig| {
            Ok(Arc::new(MockDriver::new()) as DriverHandle)
        });
        let runner = SuiteRunner::new(LifecycleController::new(factory, NoopShell, &config), fast());
        let mut recorder = ResultRecorder::new();

        let outcome = runner.run(&Suite::new(), &mut recorder).await.unwrap();

        assert_eq!(outcome.total, 0);
        assert_eq!(outcome.exit_code(), 0);
    }
}
