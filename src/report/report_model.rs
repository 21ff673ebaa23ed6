use serde::{Deserialize, Serialize};

use crate::scenario::scenario_model::TestResult;

// ============================================================================
// Suite report: aggregates TestResult instances
// ============================================================================

/// Aggregated report for one `run` invocation.
///
/// Built from a `Vec<TestResult>` via `from_results()`. Consumed by the
/// console, HTML, JUnit and JSON reporters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteReport {
    pub suite_name: String,

    /// Environment profile the run targeted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// RFC 3339 UTC time the report was built
    pub generated_at: String,

    pub total: usize,
    pub passed: usize,
    pub failed: usize,

    /// Passed, but only after at least one retry
    pub flaky: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    pub test_results: Vec<TestResult>,
}

impl TestSuiteReport {
    pub fn from_results(suite_name: &str, results: Vec<TestResult>) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let flaky = results.iter().filter(|r| r.passed && r.attempts > 1).count();
        Self {
            suite_name: suite_name.to_string(),
            environment: None,
            generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            total,
            passed,
            failed: total - passed,
            flaky,
            duration_ms: None,
            test_results: results,
        }
    }

    pub fn with_environment(mut self, environment: &str) -> Self {
        self.environment = Some(environment.to_string());
        self
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
