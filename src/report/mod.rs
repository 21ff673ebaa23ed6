pub mod console;
pub mod html;
pub mod json;
pub mod junit;
pub mod report_model;

use crate::error::DriverError;
use crate::report::report_model::TestSuiteReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Console,
    Html,
    Junit,
    Json,
}

impl ReportFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "console" => Some(ReportFormat::Console),
            "html" => Some(ReportFormat::Html),
            "junit" | "xml" => Some(ReportFormat::Junit),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }

    pub fn render(self, report: &TestSuiteReport) -> Result<String, DriverError> {
        Ok(match self {
            ReportFormat::Console => console::format_console_report(report),
            ReportFormat::Html => html::generate_html_report(report),
            ReportFormat::Junit => junit::generate_junit_xml(report),
            ReportFormat::Json => json::generate_json_report(report)?,
        })
    }
}
