use crate::report::report_model::TestSuiteReport;

/// Format a suite report for terminal output.
///
/// ```text
/// === MO E2E (staging) ===
///
/// ✓ PASS  [web] TC-001 Admin onboarding (9 steps, 6 assertions)
/// ✗ FAIL  [mobile] TC-002 Mobile policies (4 steps, 1 assertions, 3 attempts)
///     [FAIL] Step 3: preferences page: Element 'Set spending limit for publishers' not found: ...
///     [SHOT] screenshots/failure-tc-002_mobile_policies.png
///
/// === Results: 1 passed, 1 failed (2 total) in 84.2s ===
/// ```
pub fn format_console_report(report: &TestSuiteReport) -> String {
    let mut out = String::new();

    match &report.environment {
        Some(env) => out.push_str(&format!("=== {} ({}) ===\n\n", report.suite_name, env)),
        None => out.push_str(&format!("=== {} ===\n\n", report.suite_name)),
    }

    for result in &report.test_results {
        let marker = if result.passed {
            "\u{2713} PASS"
        } else {
            "\u{2717} FAIL"
        };
        let attempts = if result.attempts > 1 {
            format!(", {} attempts", result.attempts)
        } else {
            String::new()
        };

        out.push_str(&format!(
            "{}  [{}] {} ({} steps, {} assertions{})\n",
            marker,
            result.platform,
            result.scenario_name,
            result.steps_run,
            result.assertion_results.len(),
            attempts
        ));

        if let Some(ref error) = result.error {
            out.push_str(&format!("    [ERROR] {}\n", error));
        }

        if !result.passed {
            for ar in result.assertion_results.iter().filter(|ar| !ar.passed) {
                let detail = ar.message.as_deref().unwrap_or("assertion failed");
                out.push_str(&format!("    [FAIL] Step {}: {}: {}\n", ar.step_index, ar.check, detail));
            }
            for shot in &result.screenshots {
                out.push_str(&format!("    [SHOT] {}\n", shot));
            }
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} passed, {} failed ({} total)",
        report.passed, report.failed, report.total
    ));

    if report.flaky > 0 {
        out.push_str(&format!(", {} flaky", report.flaky));
    }

    if let Some(ms) = report.duration_ms {
        out.push_str(&format!(" in {:.1}s", ms as f64 / 1000.0));
    }

    out.push_str(" ===\n");
    out
}
