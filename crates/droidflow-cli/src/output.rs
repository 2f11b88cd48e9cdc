//! Terminal output for suite runs

use console::{style, Style, Term};
use droidflow::{ReportSummary, TestResult, TestStatus};
use std::path::Path;
use std::time::Duration;

/// Human-readable progress on stderr
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print one recorded result. Failures print even in quiet mode.
    pub fn result(&self, result: &TestResult) {
        if self.quiet && !result.status.is_failed() {
            return;
        }
        let _ = self.term.write_line(&format_result(result, self.use_color));
        if let Some(error) = result.error_message.as_deref() {
            if result.status.is_failed() {
                let _ = self.term.write_line(&format!("    {error}"));
            }
        }
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };

        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print where the report went
    pub fn report_written(&self, path: &Path) {
        self.info(&format!("Report written to {}", path.display()));
    }

    /// Print run summary
    pub fn summary(&self, summary: &ReportSummary, duration: Duration) {
        if self.quiet && summary.failed == 0 {
            return;
        }

        let _ = self.term.write_line("");

        let duration_secs = duration.as_secs_f64();
        let ReportSummary {
            total,
            passed,
            failed,
            skipped,
            success_rate,
        } = *summary;

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} skipped, {:.2}% success)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped),
                success_rate
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped, {success_rate:.2}% success)"
            ));
        }
    }
}

/// One result line: status marker, name and actual result
#[must_use]
pub fn format_result(result: &TestResult, use_color: bool) -> String {
    let marker = match (result.status, use_color) {
        (TestStatus::Passed, true) => style("✓").green().bold().to_string(),
        (TestStatus::Failed, true) => style("✗").red().bold().to_string(),
        (TestStatus::Skipped, true) => style("-").yellow().to_string(),
        (status, false) => status.label().to_string(),
    };
    let actual = result.actual.lines().next().unwrap_or_default();
    format!("{marker} {} ({actual})", result.test_name)
}
