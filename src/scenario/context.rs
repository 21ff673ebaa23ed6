use crate::scenario::scenario_model::AssertionResult;

/// Tracks the execution state and results of a running scenario.
#[derive(Debug, Clone, Default)]
pub struct TestContext {
    /// Current step index (0-based)
    pub current_step: usize,

    /// All assertion results collected during execution
    pub assertion_results: Vec<AssertionResult>,

    /// Screenshot paths written so far
    pub screenshots: Vec<String>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_assertion(&mut self, result: AssertionResult) {
        self.assertion_results.push(result);
    }

    pub fn record_screenshot(&mut self, path: impl Into<String>) {
        self.screenshots.push(path.into());
    }

    pub fn all_passed(&self) -> bool {
        self.assertion_results.iter().all(|r| r.passed)
    }

    pub fn pass_count(&self) -> usize {
        self.assertion_results.iter().filter(|r| r.passed).count()
    }

    pub fn fail_count(&self) -> usize {
        self.assertion_results.iter().filter(|r| !r.passed).count()
    }
}
