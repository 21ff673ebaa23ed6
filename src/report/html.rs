use crate::report::report_model::TestSuiteReport;
use crate::scenario::scenario_model::TestResult;

/// Generate a self-contained HTML report (inline CSS, screenshots linked by path).
pub fn generate_html_report(report: &TestSuiteReport) -> String {
    let (header_color, status_text) = if report.all_passed() {
        ("#2e7d32", "ALL SCENARIOS PASSED")
    } else {
        ("#c62828", "SOME SCENARIOS FAILED")
    };

    let duration_text = report
        .duration_ms
        .map(|ms| format!(" in {:.1}s", ms as f64 / 1000.0))
        .unwrap_or_default();

    let environment = report
        .environment
        .as_deref()
        .map(|e| format!(" &middot; {}", escape_html(e)))
        .unwrap_or_default();

    let scenarios: String = report.test_results.iter().map(render_scenario).collect();

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{suite_name} Report</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; margin: 0; background: #fafafa; }}
.header {{ background: {header_color}; color: white; padding: 20px 30px; }}
.header h1 {{ margin: 0 0 8px 0; font-size: 22px; }}
.header p {{ margin: 0; opacity: 0.9; }}
.content {{ max-width: 960px; margin: 20px auto; padding: 0 20px; }}
.scenario {{ background: white; border-radius: 6px; padding: 14px 20px; margin-bottom: 12px; border-left: 4px solid #bdbdbd; }}
.scenario.pass {{ border-left-color: #2e7d32; }}
.scenario.fail {{ border-left-color: #c62828; }}
.scenario h3 {{ margin: 0 0 6px 0; font-size: 16px; }}
.platform {{ font-size: 11px; text-transform: uppercase; background: #eceff1; border-radius: 3px; padding: 2px 6px; margin-right: 6px; }}
.meta {{ color: #616161; font-size: 13px; margin: 4px 0; }}
.error {{ color: #c62828; font-weight: bold; }}
.failures li {{ color: #b71c1c; font-size: 13px; }}
.shots img {{ max-width: 280px; border: 1px solid #e0e0e0; margin: 6px 6px 0 0; }}
</style>
</head>
<body>
<div class="header">
<h1>{status_text}</h1>
<p>{suite_name}{environment}: {passed} passed, {failed} failed, {flaky} flaky ({total} total){duration}</p>
<p>Generated {generated_at}</p>
</div>
<div class="content">
{scenarios}</div>
</body>
</html>
"##,
        suite_name = escape_html(&report.suite_name),
        header_color = header_color,
        status_text = status_text,
        environment = environment,
        passed = report.passed,
        failed = report.failed,
        flaky = report.flaky,
        total = report.total,
        duration = duration_text,
        generated_at = escape_html(&report.generated_at),
        scenarios = scenarios,
    )
}

fn render_scenario(result: &TestResult) -> String {
    let (class, marker) = if result.passed {
        ("pass", "\u{2713}")
    } else {
        ("fail", "\u{2717}")
    };

    let mut html = format!(
        "<div class=\"scenario {class}\">\n<h3>{marker} <span class=\"platform\">{platform}</span>{name}</h3>\n<p class=\"meta\">Steps: {steps} | Assertions: {assertions} | Attempts: {attempts}</p>\n",
        class = class,
        marker = marker,
        platform = escape_html(&result.platform),
        name = escape_html(&result.scenario_name),
        steps = result.steps_run,
        assertions = result.assertion_results.len(),
        attempts = result.attempts,
    );

    if let Some(error) = &result.error {
        html.push_str(&format!("<p class=\"error\">Error: {}</p>\n", escape_html(error)));
    }

    let failed: Vec<_> = result.assertion_results.iter().filter(|ar| !ar.passed).collect();
    if !failed.is_empty() {
        html.push_str("<ul class=\"failures\">\n");
        for ar in failed {
            html.push_str(&format!(
                "<li>Step {}: {}: {}</li>\n",
                ar.step_index,
                escape_html(&ar.check),
                escape_html(ar.message.as_deref().unwrap_or("assertion failed"))
            ));
        }
        html.push_str("</ul>\n");
    }

    if !result.screenshots.is_empty() {
        html.push_str("<div class=\"shots\">\n");
        for shot in &result.screenshots {
            let src = escape_html(shot);
            html.push_str(&format!("<a href=\"{0}\"><img src=\"{0}\" alt=\"{0}\"></a>\n", src));
        }
        html.push_str("</div>\n");
    }

    html.push_str("</div>\n");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
