use crate::report::report_model::TestSuiteReport;

/// Generate a JUnit XML report for CI systems.
///
/// Assertion failures become `<failure>`, execution errors `<error>`.
/// The `classname` is the scenario platform (`mo-e2e.web`, `mo-e2e.mobile`).
pub fn generate_junit_xml(report: &TestSuiteReport) -> String {
    let time_attr = report
        .duration_ms
        .map(|ms| format!(" time=\"{:.3}\"", ms as f64 / 1000.0))
        .unwrap_or_default();

    let errors = report
        .test_results
        .iter()
        .filter(|r| r.error.is_some())
        .count();

    let mut cases = String::new();
    for result in &report.test_results {
        let case_time = result
            .duration_ms
            .map(|ms| format!(" time=\"{:.3}\"", ms as f64 / 1000.0))
            .unwrap_or_default();
        let open = format!(
            "  <testcase name=\"{}\" classname=\"mo-e2e.{}\"{}",
            escape_xml(&result.scenario_name),
            escape_xml(&result.platform),
            case_time
        );

        if result.passed {
            cases.push_str(&open);
            cases.push_str(" />\n");
            continue;
        }

        cases.push_str(&open);
        cases.push_str(">\n");

        let failed: Vec<String> = result
            .assertion_results
            .iter()
            .filter(|ar| !ar.passed)
            .map(|ar| {
                let msg = ar.message.as_deref().unwrap_or("assertion failed");
                format!("Step {}: {}: {}", ar.step_index, ar.check, msg)
            })
            .collect();

        if !failed.is_empty() {
            cases.push_str(&format!(
                "    <failure message=\"{} assertion(s) failed\" type=\"AssertionFailure\">{}</failure>\n",
                failed.len(),
                escape_xml(&failed.join("\n"))
            ));
        }

        if let Some(error) = &result.error {
            cases.push_str(&format!(
                "    <error message=\"{}\" type=\"ExecutionError\" />\n",
                escape_xml(error)
            ));
        }

        if !result.screenshots.is_empty() || result.attempts > 1 {
            let mut lines = vec![format!("attempts: {}", result.attempts)];
            lines.extend(result.screenshots.iter().map(|s| format!("[[ATTACHMENT|{}]]", s)));
            cases.push_str(&format!(
                "    <system-out>{}</system-out>\n",
                escape_xml(&lines.join("\n"))
            ));
        }

        cases.push_str("  </testcase>\n");
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuite name=\"{name}\" tests=\"{tests}\" failures=\"{failures}\" errors=\"{errors}\" timestamp=\"{timestamp}\"{time}>\n{cases}</testsuite>\n",
        name = escape_xml(&report.suite_name),
        tests = report.total,
        failures = report.failed - errors,
        errors = errors,
        timestamp = escape_xml(&report.generated_at),
        time = time_attr,
        cases = cases,
    )
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
