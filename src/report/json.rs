use crate::error::DriverError;
use crate::report::report_model::TestSuiteReport;

/// Pretty-printed JSON of the whole report, for dashboards and archiving.
pub fn generate_json_report(report: &TestSuiteReport) -> Result<String, DriverError> {
    serde_json::to_string_pretty(report).map_err(|e| DriverError::JsonSerialize {
        context: "TestSuiteReport".into(),
        source: e,
    })
}
