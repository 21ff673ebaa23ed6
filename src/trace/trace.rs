use serde::Serialize;

/// One executed scenario step, written as a JSONL line.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEvent {
    /// RFC 3339 UTC time the step finished
    pub timestamp: String,
    pub scenario: String,
    pub attempt: u32,
    pub step: usize,
    /// Step action, e.g. "tap_text" or "goto"
    pub action: String,
    pub outcome: StepOutcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Ok,
    AssertionFailed,
    Error,
}

impl TraceEvent {
    pub fn now(scenario: &str, attempt: u32, step: usize, action: &str) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            scenario: scenario.to_string(),
            attempt,
            step,
            action: action.to_string(),
            outcome: StepOutcome::Ok,
            detail: None,
            duration_ms: 0,
        }
    }

    pub fn with_outcome(mut self, outcome: StepOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}
