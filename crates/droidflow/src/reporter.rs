//! Result recorder and CSV report.
//!
//! # Layout
//!
//! ```text
//! Test Name,Status,Expected Result,Actual Result,Error Message,Timestamp
//! "Successful Login","PASSED","...","...","","2026-01-05T10:00:00Z"
//! ...
//!
//! "SUMMARY","","","","",""
//! "Total Tests","3","","","",""
//! "Passed","2","","","",""
//! "Failed","1","","","",""
//! "Skipped","0","","","",""
//! "Success Rate","66.67%","","","",""
//! ```
//!
//! Rows keep `record()` order. Every timestamp comes from the result itself,
//! so rendering the same result set twice yields the same bytes.

use crate::result::{DroidflowError, DroidflowResult};
use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// CSV header row
pub const REPORT_HEADER: &str =
    "Test Name,Status,Expected Result,Actual Result,Error Message,Timestamp";

/// Timestamp format embedded in report file names
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Test result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Check if status is skipped
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Label used in the report
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Recorded outcome of one scenario execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    /// Scenario name
    pub test_name: String,
    /// Outcome
    pub status: TestStatus,
    /// What should have happened
    pub expected: String,
    /// What was observed
    pub actual: String,
    /// Triggering error, verbatim
    pub error_message: Option<String>,
    /// Completion time
    pub timestamp: DateTime<Utc>,
}

impl TestResult {
    fn new(
        test_name: impl Into<String>,
        status: TestStatus,
        expected: impl Into<String>,
        actual: impl Into<String>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            status,
            expected: expected.into(),
            actual: actual.into(),
            error_message,
            timestamp: Utc::now(),
        }
    }

    /// Create a passing result
    #[must_use]
    pub fn passed(
        test_name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(test_name, TestStatus::Passed, expected, actual, None)
    }

    /// Create a failing result
    #[must_use]
    pub fn failed(
        test_name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self::new(
            test_name,
            TestStatus::Failed,
            expected,
            actual,
            Some(error.into()),
        )
    }

    /// Create a skipped result
    #[must_use]
    pub fn skipped(
        test_name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(test_name, TestStatus::Skipped, expected, actual, None)
    }

    /// Override the completion time
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Attach an error message
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error_message = Some(error.into());
        self
    }
}

/// Rendered report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDocument {
    /// CSV text
    pub body: String,
    rows: usize,
}

impl ReportDocument {
    /// Number of result rows (excludes header and summary)
    #[must_use]
    pub const fn result_rows(&self) -> usize {
        self.rows
    }
}

/// Aggregate counts for a run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// All results
    pub total: usize,
    /// Passed results
    pub passed: usize,
    /// Failed results
    pub failed: usize,
    /// Skipped results
    pub skipped: usize,
    /// `100 * passed / total`, 0 for an empty run
    pub success_rate: f64,
}

/// Ordered, explicitly owned store of results for one run
#[derive(Debug, Clone)]
pub struct ResultRecorder {
    run_id: Uuid,
    results: Vec<TestResult>,
}

impl Default for ResultRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultRecorder {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            results: Vec::new(),
        }
    }

    /// Identifier of the current run
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Append a result
    pub fn record(&mut self, result: TestResult) {
        tracing::info!(
            run = %self.run_id,
            test = %result.test_name,
            status = %result.status,
            "recorded result"
        );
        self.results.push(result);
    }

    /// Clear all results and start a new run
    pub fn reset(&mut self) {
        self.results.clear();
        self.run_id = Uuid::new_v4();
    }

    /// Results in record order
    #[must_use]
    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Get total result count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Get number of passed results
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Get number of failed results
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_failed()).count()
    }

    /// Get number of skipped results
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_skipped()).count()
    }

    /// Percentage of passed results, 0 when nothing was recorded
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 0.0;
        }
        100.0 * self.passed_count() as f64 / self.results.len() as f64
    }

    /// Check if no result failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Aggregate counts
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total: self.total_count(),
            passed: self.passed_count(),
            failed: self.failed_count(),
            skipped: self.skipped_count(),
            success_rate: self.success_rate(),
        }
    }

    /// Render the CSV report
    #[must_use]
    pub fn render(&self) -> ReportDocument {
        let mut body = String::with_capacity(128 * (self.results.len() + 8));
        body.push_str(REPORT_HEADER);
        body.push('\n');

        for result in &self.results {
            let timestamp = result
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Secs, true);
            let fields = [
                result.test_name.as_str(),
                result.status.label(),
                result.expected.as_str(),
                result.actual.as_str(),
                result.error_message.as_deref().unwrap_or(""),
                timestamp.as_str(),
            ];
            push_row(&mut body, &fields);
        }

        let summary = self.summary();
        body.push('\n');
        push_row(&mut body, &["SUMMARY", "", "", "", "", ""]);
        for (label, value) in [
            ("Total Tests", summary.total.to_string()),
            ("Passed", summary.passed.to_string()),
            ("Failed", summary.failed.to_string()),
            ("Skipped", summary.skipped.to_string()),
            ("Success Rate", format!("{:.2}%", summary.success_rate)),
        ] {
            push_row(&mut body, &[label, &value, "", "", "", ""]);
        }

        ReportDocument {
            body,
            rows: self.results.len(),
        }
    }

    /// Write the report into `dir` under a timestamped name.
    ///
    /// Existing files are never overwritten; a `_N` counter is appended on
    /// collision.
    pub fn write_to(&self, dir: &Path, prefix: &str) -> DroidflowResult<PathBuf> {
        self.write_at(dir, prefix, Local::now())
    }

    /// Write the report using `at` for the file name timestamp
    pub fn write_at(
        &self,
        dir: &Path,
        prefix: &str,
        at: DateTime<Local>,
    ) -> DroidflowResult<PathBuf> {
        let report_error = |path: &Path, e: std::io::Error| DroidflowError::ReportWrite {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        std::fs::create_dir_all(dir).map_err(|e| report_error(dir, e))?;

        let stem = format!("{prefix}_{}", at.format(FILE_TIMESTAMP_FORMAT));
        let document = self.render();
        let mut counter = 0usize;
        loop {
            let name = if counter == 0 {
                format!("{stem}.csv")
            } else {
                format!("{stem}_{counter}.csv")
            };
            let path = dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(document.body.as_bytes())
                        .and_then(|()| file.flush())
                        .map_err(|e| report_error(path.as_path(), e))?;
                    tracing::info!(path = %path.display(), rows = self.results.len(), "report written");
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(report_error(path.as_path(), e)),
            }
        }
    }

    /// Results and summary as JSON
    pub fn to_json(&self) -> DroidflowResult<String> {
        let value = serde_json::json!({
            "run_id": self.run_id,
            "results": self.results,
            "summary": self.summary(),
        });
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// Append one CSV row with every field quoted
fn push_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    }
    out.push('\n');
}
