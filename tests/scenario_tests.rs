use std::path::{Path, PathBuf};
use std::time::Duration;

use mo_e2e::cli::config::{Credentials, WebTimeouts};
use mo_e2e::device::poll::CancelToken;
use mo_e2e::pages::admin::selectors;
use mo_e2e::scenario::context::TestContext;
use mo_e2e::scenario::runner::{RunSettings, ScenarioRunner, sanitize_filename};
use mo_e2e::scenario::scenario_model::{
    AssertionResult, MobileScenario, MobileStep, Scenario, TestResult, WebAssertion, WebScenario, WebStep,
};
use mo_e2e::scenario::{ScenarioError, load_scenario_file, load_scenarios};
use mo_e2e::trace::logger::TraceLogger;
use mo_e2e::web::locator::Locator;
use mo_e2e::web::mock::MockPage;

use crate::common::fixtures::{home_screen, preferences_screen, splash_screen};
use crate::common::{PACKAGE, attached_bridge, capture_logs, connect, focused_on_app};

mod common;

const BASE: &str = "https://mo-admin.dev.pressingly.net/";
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

// ============================================================================
// Helpers
// ============================================================================

fn run_settings(screenshot_dir: &Path) -> RunSettings {
    RunSettings {
        base_url: BASE.to_string(),
        credentials: Some(Credentials {
            email: "admin@example.com".into(),
            password: "s3cret".into(),
        }),
        environment_option: "[STG] US Airlines Staging".into(),
        environment_label: "[STG] US Airlines".into(),
        web_timeouts: WebTimeouts::default(),
        viewport: (1920, 1080),
        app_package: PACKAGE.into(),
        element_timeout: Duration::from_millis(50),
        nav_timeout: Duration::from_millis(50),
        load_attempts: 2,
        screenshot_dir: screenshot_dir.to_path_buf(),
        retries: 0,
    }
}

fn shipped(name: &str) -> PathBuf {
    Path::new("scenarios").join(name)
}

fn web_scenario() -> WebScenario {
    match load_scenario_file(&shipped("tc_001_admin_onboarding.yaml")).expect("load tc_001") {
        Scenario::Web(web) => web,
        other => panic!("expected web scenario, got {:?}", other),
    }
}

fn mobile_scenario() -> MobileScenario {
    match load_scenario_file(&shipped("tc_002_mobile_policies.yaml")).expect("load tc_002") {
        Scenario::Mobile(mobile) => mobile,
        other => panic!("expected mobile scenario, got {:?}", other),
    }
}

/// A page on which every check of the onboarding scenario succeeds.
fn admin_site() -> MockPage {
    MockPage::new()
        .with_title("MO Core Admin")
        .with_visible(selectors::admin_heading())
        .with_visible(selectors::welcome_heading())
        .with_visible(Locator::any_role("combobox").within(Locator::text("[STG] US Airlines")))
        .with_visible(selectors::users_heading())
        .with_visible(Locator::role("heading", "quy.nguyen@coderpush.com"))
        .with_visible(selectors::onboard_device_heading())
        .navigates_on_click(selectors::sign_in_button(), BASE)
        .navigates_on_click(selectors::users_link(), "https://mo-admin.dev.pressingly.net/users")
        .navigates_on_click(
            selectors::user_button("516e6462f1b6"),
            "https://mo-admin.dev.pressingly.net/users/6a1d516e6462f1b6",
        )
}

fn stub_result(name: &str, passed: bool) -> TestResult {
    let mut r = TestResult::errored(name, "web", "boom");
    if passed {
        r.passed = true;
        r.error = None;
    }
    r
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_shipped_scenarios_in_file_order() {
    let scenarios = load_scenarios(Path::new("scenarios")).expect("load directory");
    assert_eq!(scenarios.len(), 2);
    assert_eq!(scenarios[0].platform(), "web");
    assert_eq!(scenarios[0].name(), "TC-001 Admin onboarding QR code");
    assert_eq!(scenarios[0].step_count(), 13);
    assert_eq!(scenarios[1].platform(), "mobile");
    assert_eq!(scenarios[1].step_count(), 11);
}

#[test]
fn test_load_single_file() {
    let scenarios = load_scenarios(&shipped("tc_002_mobile_policies.yaml")).expect("load file");
    assert_eq!(scenarios.len(), 1);
    assert_eq!(scenarios[0].name(), "TC-002 Mobile preferences policies");
}

#[test]
fn test_onboarding_scenario_shape() {
    let web = web_scenario();
    assert_eq!(web.start_url.as_deref(), Some("/"));
    assert_eq!(web.steps[2], WebStep::Login);
    assert_eq!(web.steps[5], WebStep::SelectEnvironment { option: None });
    assert_eq!(
        web.steps[10],
        WebStep::OpenUser {
            user_id: "516e6462f1b6".into()
        }
    );
    match &web.steps[11] {
        WebStep::Assert { assertions } => {
            assert_eq!(assertions.len(), 4);
            assert_eq!(assertions[1], WebAssertion::QrCodeSection);
            assert_eq!(
                assertions[2],
                WebAssertion::Visible {
                    locator: Locator::css("img[alt=\"QR Code\"]")
                }
            );
        }
        other => panic!("expected assert step, got {:?}", other),
    }
}

#[test]
fn test_parse_optional_step_fields() {
    let yaml = r#"
platform: mobile
name: Optional fields
app_package: com.pressingly.moneta.dev
steps:
  - action: tap_text
    text: Purchases
    fallback: [480, 2756]
  - action: tap_text
    text: Explore
  - action: wait_for_element
    text: Preferences
    timeout_ms: 2500
  - action: swipe
    direction: up
  - action: back
"#;
    let scenario: Scenario = serde_yaml::from_str(yaml).expect("parse");
    let Scenario::Mobile(mobile) = scenario else {
        panic!("expected mobile scenario");
    };
    assert_eq!(mobile.app_package.as_deref(), Some("com.pressingly.moneta.dev"));
    assert_eq!(
        mobile.steps[0],
        MobileStep::TapText {
            text: "Purchases".into(),
            fallback: Some([480, 2756])
        }
    );
    assert_eq!(
        mobile.steps[1],
        MobileStep::TapText {
            text: "Explore".into(),
            fallback: None
        }
    );
    assert_eq!(mobile.steps[2].action(), "wait_for_element");
    assert_eq!(mobile.steps[4], MobileStep::Back);
}

#[test]
fn test_assertion_display() {
    assert_eq!(
        WebAssertion::UrlContains {
            expected: "/users/".into()
        }
        .to_string(),
        "url contains '/users/'"
    );
    assert_eq!(WebAssertion::HomePageLoaded.to_string(), "home page loaded");
    assert_eq!(
        WebAssertion::Visible {
            locator: Locator::css("img")
        }
        .to_string(),
        "visible css=img"
    );
}

#[test]
fn test_unknown_action_is_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "platform: web\nname: Bad\nsteps:\n  - action: teleport\n").expect("write");

    match load_scenario_file(&path) {
        Err(ScenarioError::Parse { path: p, .. }) => assert!(p.ends_with("bad.yaml")),
        other => panic!("expected Parse error, got {:?}", other),
    }
}

#[test]
fn test_missing_platform_is_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("no_platform.yml");
    std::fs::write(&path, "name: Unknown\nsteps: []\n").expect("write");
    assert!(matches!(load_scenarios(dir.path()), Err(ScenarioError::Parse { .. })));
}

#[test]
fn test_missing_path_is_read_error() {
    let result = load_scenarios(Path::new("scenarios/does-not-exist.yaml"));
    assert!(matches!(result, Err(ScenarioError::Read { .. })));
}

#[test]
fn test_directory_ignores_other_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("README.md"), "# not a scenario").expect("write");
    std::fs::write(
        dir.path().join("b.yml"),
        "platform: mobile\nname: B\nsteps:\n  - action: back\n",
    )
    .expect("write");
    std::fs::write(
        dir.path().join("a.yaml"),
        "platform: web\nname: A\nsteps:\n  - action: pause\n    ms: 10\n",
    )
    .expect("write");

    let scenarios = load_scenarios(dir.path()).expect("load");
    let names: Vec<&str> = scenarios.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["A", "B"]);
}

// ============================================================================
// Test context
// ============================================================================

#[test]
fn test_context_counts() {
    let mut ctx = TestContext::new();
    assert!(ctx.all_passed());
    for (i, passed) in [true, false, true].into_iter().enumerate() {
        ctx.record_assertion(AssertionResult {
            step_index: i,
            check: "check".into(),
            passed,
            actual: None,
            message: None,
        });
    }
    ctx.record_screenshot("screenshots/a.png");
    assert_eq!(ctx.pass_count(), 2);
    assert_eq!(ctx.fail_count(), 1);
    assert!(!ctx.all_passed());
    assert_eq!(ctx.screenshots, vec!["screenshots/a.png".to_string()]);
}

#[test]
fn test_sanitize_filename() {
    assert_eq!(sanitize_filename("TC-002 Mobile preferences policies"), "tc-002_mobile_preferences_policies");
    assert_eq!(sanitize_filename("a/b:c"), "a_b_c");
}

// ============================================================================
// Web runs
// ============================================================================

#[test]
fn test_run_web_onboarding_passes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let mut page = admin_site().with_visible(selectors::qr_code_image());

    let result = runner.run_web(&web_scenario(), &mut page, 1);

    assert!(result.passed, "error: {:?}, assertions: {:?}", result.error, result.assertion_results);
    assert_eq!(result.platform, "web");
    assert_eq!(result.steps_run, 13);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.assertion_results.len(), 8);
    assert_eq!(result.screenshots.len(), 4);
    assert!(result.duration_ms.is_some());

    assert_eq!(page.calls()[0], "set_viewport 1920x1080");
    assert_eq!(page.calls()[1], format!("goto {}", BASE));
    assert_eq!(page.count("fill role=textbox[name=\"Email\"] = admin@example.com"), 1);
    assert_eq!(page.count("click role=option[name=\"[STG] US Airlines Staging\"]"), 1);
}

#[test]
fn test_run_web_records_failed_assertions_and_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    // QR image never shows up.
    let mut page = admin_site();

    let result = runner.run_web(&web_scenario(), &mut page, 1);

    assert!(!result.passed);
    assert_eq!(result.error, None);
    assert_eq!(result.steps_run, 13);

    let failed: Vec<&AssertionResult> = result.assertion_results.iter().filter(|a| !a.passed).collect();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].check, "QR code section");
    assert_eq!(failed[0].step_index, 11);
    assert!(failed[0].message.as_deref().unwrap_or_default().contains("QR Code"));
    assert_eq!(failed[1].actual.as_deref(), Some("false"));
    // Last screenshot step still ran.
    assert_eq!(result.screenshots.len(), 4);
}

#[test]
fn test_run_web_without_credentials_stops_at_login() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let mut settings = run_settings(dir.path());
    settings.credentials = None;
    let runner = ScenarioRunner::new(settings, &tracer, CancelToken::new());
    let mut page = admin_site();

    let result = runner.run_web(&web_scenario(), &mut page, 1);

    assert!(!result.passed);
    assert_eq!(result.steps_run, 3);
    let error = result.error.expect("error");
    assert!(error.starts_with("Step 2 (login) failed:"), "{}", error);
    // One regular screenshot plus the failure capture.
    assert_eq!(result.screenshots.len(), 2);
    assert!(result.screenshots[1].contains("failure-tc-001_admin_onboarding_qr_code"));
}

#[test]
fn test_run_web_start_url_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let mut page = admin_site().failing("goto", 3);

    let result = runner.run_web(&web_scenario(), &mut page, 1);

    assert!(!result.passed);
    assert_eq!(result.steps_run, 0);
    assert!(result
        .error
        .as_deref()
        .unwrap_or_default()
        .starts_with("Failed to navigate to start_url:"));
    assert_eq!(page.count("goto"), 3);
    assert_eq!(result.screenshots.len(), 1);
}

#[test]
fn test_run_web_viewport_failure_stops_before_navigation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let mut page = admin_site().failing("set_viewport", 1);

    let result = runner.run_web(&web_scenario(), &mut page, 1);

    assert!(!result.passed);
    assert_eq!(result.steps_run, 0);
    let error = result.error.expect("error");
    assert!(error.starts_with("Failed to set viewport:"), "{}", error);
    assert_eq!(page.count("goto"), 0);
}

#[test]
fn test_run_web_writes_trace() {
    let dir = tempfile::tempdir().expect("tempdir");
    let trace_path = dir.path().join("reports").join("trace.jsonl");
    let tracer = TraceLogger::new(&trace_path);
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let mut page = admin_site();

    runner.run_web(&web_scenario(), &mut page, 2);

    let content = std::fs::read_to_string(&trace_path).expect("trace file");
    let events: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(events.len(), 13);
    assert_eq!(events[0]["scenario"], "TC-001 Admin onboarding QR code");
    assert_eq!(events[0]["attempt"], 2);
    assert_eq!(events[0]["action"], "assert");
    assert_eq!(events[0]["outcome"], "ok");
    assert_eq!(events[2]["action"], "login");
    assert_eq!(events[11]["outcome"], "assertion_failed");
    assert_eq!(events[11]["detail"], "2 assertion(s) failed");
}

#[test]
fn test_run_web_custom_steps() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let scenario: Scenario = serde_yaml::from_str(
        r#"
platform: web
name: Custom
steps:
  - action: goto
    url: /users
  - action: fill
    locator: { by: css, selector: 'input[placeholder="Search email..."]' }
    value: quy
  - action: wait_for_url
    pattern: "**/users"
  - action: assert
    assertions:
      - type: url_contains
        expected: /users
      - type: title_contains
        expected: Admin
"#,
    )
    .expect("parse");
    let Scenario::Web(web) = scenario else {
        panic!("expected web scenario");
    };
    let mut page = MockPage::new().with_title("MO Core Admin");

    let result = runner.run_web(&web, &mut page, 1);

    assert!(result.passed, "{:?}", result);
    assert_eq!(page.calls()[1], "goto https://mo-admin.dev.pressingly.net/users");
    assert_eq!(result.assertion_results[1].actual.as_deref(), Some("MO Core Admin"));
}

#[test]
fn test_run_web_wait_for_url_timeout_is_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let web = WebScenario {
        name: "Stuck".into(),
        start_url: None,
        steps: vec![WebStep::WaitForUrl {
            pattern: "**/users".into(),
            timeout_ms: Some(500),
        }],
    };
    let mut page = MockPage::new();

    let result = runner.run_web(&web, &mut page, 1);

    assert_eq!(result.steps_run, 1);
    assert!(result.error.as_deref().unwrap_or_default().contains("500ms"));
}

// ============================================================================
// Mobile runs
// ============================================================================

#[test]
fn test_run_mobile_policies_passes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let home = home_screen();
    let prefs = preferences_screen();
    let bridge = attached_bridge()
        .on("dumpsys window", &focused_on_app())
        .on_sequence("cat /sdcard/window_dump.xml", &[&home, &home, &prefs])
        .on_bytes("exec-out screencap -p", PNG);
    let mut driver = connect(bridge);

    let result = runner.run_mobile(&mobile_scenario(), &mut driver, 1);

    assert!(result.passed, "error: {:?}", result.error);
    assert_eq!(result.platform, "mobile");
    assert_eq!(result.steps_run, 11);
    assert_eq!(result.assertion_results.len(), 1);
    // The home fixture is below 15 elements, so log_elements adds a debug shot.
    assert_eq!(result.screenshots.len(), 5);
    assert!(dir.path().join("mobile-01-app-launched.png").is_file());
    assert!(dir.path().join("mobile-debug-screen.png").is_file());
    assert!(dir.path().join("mobile-03-policy-enabled.png").is_file());

    let bridge = driver.bridge();
    assert_eq!(bridge.count("dumpsys activity activities"), 1);
    assert_eq!(bridge.count("monkey -p com.pressingly.moneta.staging"), 1);
    assert_eq!(bridge.count("input tap 1200 2896"), 1);
    assert_eq!(bridge.count("input tap 640 600"), 1);
}

#[test]
fn test_run_mobile_slow_app_is_not_fatal_but_navigation_is() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let bridge = attached_bridge()
        .on("dumpsys window", &focused_on_app())
        .on("cat /sdcard/window_dump.xml", &splash_screen())
        .on_bytes("exec-out screencap -p", PNG);
    let mut driver = connect(bridge);

    let result = runner.run_mobile(&mobile_scenario(), &mut driver, 1);

    assert!(!result.passed);
    assert_eq!(result.steps_run, 5);
    let error = result.error.as_deref().unwrap_or_default();
    assert!(error.starts_with("Step 4 (navigate) failed:"), "{}", error);
    let failure_shot = dir.path().join("failure-tc-002_mobile_preferences_policies.png");
    assert!(failure_shot.is_file());
    assert_eq!(result.screenshots.last().map(String::as_str), failure_shot.to_str());
}

#[test]
fn test_log_elements_with_enough_elements_skips_diagnostics() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let scenario = MobileScenario {
        name: "Enough".into(),
        app_package: None,
        steps: vec![MobileStep::LogElements { min_elements: Some(5) }],
    };
    let mut driver = connect(attached_bridge().on("cat /sdcard/window_dump.xml", &home_screen()));

    let result = runner.run_mobile(&scenario, &mut driver, 1);

    assert!(result.passed, "{:?}", result.error);
    assert!(result.screenshots.is_empty());
    let bridge = driver.bridge();
    assert_eq!(bridge.count("rm /sdcard/window_dump.xml"), 1);
    assert_eq!(bridge.count("cat /sdcard/window_dump.xml"), 1);
    assert_eq!(bridge.count("dumpsys activity activities"), 0);
}

#[test]
fn test_log_elements_low_count_collects_device_state_and_redumps() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let scenario = MobileScenario {
        name: "Sparse".into(),
        app_package: None,
        steps: vec![MobileStep::LogElements { min_elements: Some(15) }],
    };
    let splash = splash_screen();
    let home = home_screen();
    let bridge = attached_bridge()
        .on_sequence("cat /sdcard/window_dump.xml", &[&splash, &home])
        .on_bytes("exec-out screencap -p", PNG);
    let mut driver = connect(bridge);

    let (result, logs) = capture_logs(|| runner.run_mobile(&scenario, &mut driver, 1));

    assert!(result.passed, "{:?}", result.error);
    assert_eq!(result.screenshots.len(), 1);
    assert!(dir.path().join("mobile-debug-screen.png").is_file());

    let bridge = driver.bridge();
    assert_eq!(bridge.count("rm /sdcard/window_dump.xml"), 2);
    assert_eq!(bridge.count("cat /sdcard/window_dump.xml"), 2);
    assert_eq!(bridge.count("dumpsys activity activities"), 1);
    assert_eq!(bridge.count("wm size"), 1);

    assert!(logs.contains("low element count, collecting diagnostics"), "{}", logs);
    // The retry found the richer home screen, and that is what gets logged.
    assert!(logs.contains("Quy Nguyen"), "{}", logs);
}

#[test]
fn test_log_elements_without_threshold_parses_from_yaml() {
    let step: MobileStep = serde_yaml::from_str("action: log_elements").expect("step");
    assert_eq!(step, MobileStep::LogElements { min_elements: None });
    let step: MobileStep = serde_yaml::from_str("action: log_elements\nmin_elements: 15").expect("step");
    assert_eq!(step, MobileStep::LogElements { min_elements: Some(15) });
}

#[test]
fn test_run_mobile_uses_scenario_package() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, CancelToken::new());
    let scenario = MobileScenario {
        name: "Dev build".into(),
        app_package: Some("com.pressingly.moneta.dev".into()),
        steps: vec![MobileStep::LaunchApp, MobileStep::TypeText { text: "hi there".into() }],
    };
    let mut driver = connect(attached_bridge());

    let result = runner.run_mobile(&scenario, &mut driver, 1);

    assert!(result.passed, "{:?}", result.error);
    assert_eq!(driver.bridge().count("monkey -p com.pressingly.moneta.dev"), 1);
    assert_eq!(driver.bridge().count("input text hi%sthere"), 1);
}

#[test]
fn test_run_mobile_cancelled_pause() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tracer = TraceLogger::disabled();
    let token = CancelToken::new();
    token.cancel();
    let runner = ScenarioRunner::new(run_settings(dir.path()), &tracer, token);
    let scenario = MobileScenario {
        name: "Paused".into(),
        app_package: None,
        steps: vec![MobileStep::Pause { ms: 60_000 }],
    };
    let mut driver = connect(attached_bridge());

    let result = runner.run_mobile(&scenario, &mut driver, 1);

    assert!(!result.passed);
    assert!(result.error.as_deref().unwrap_or_default().contains("Run cancelled"));
}

// ============================================================================
// Retries
// ============================================================================

#[test]
fn test_retries_stop_on_first_pass() {
    let tracer = TraceLogger::disabled();
    let mut settings = run_settings(Path::new("screenshots"));
    settings.retries = 2;
    let runner = ScenarioRunner::new(settings, &tracer, CancelToken::new());

    let mut seen = Vec::new();
    let result = runner.run_with_retries(|attempt| {
        seen.push(attempt);
        stub_result("flaky", attempt == 2)
    });

    assert!(result.passed);
    assert_eq!(result.attempts, 2);
    assert_eq!(seen, vec![1, 2]);
}

#[test]
fn test_retries_exhausted() {
    let tracer = TraceLogger::disabled();
    let mut settings = run_settings(Path::new("screenshots"));
    settings.retries = 2;
    let runner = ScenarioRunner::new(settings, &tracer, CancelToken::new());

    let mut runs = 0;
    let result = runner.run_with_retries(|_| {
        runs += 1;
        stub_result("broken", false)
    });

    assert!(!result.passed);
    assert_eq!(runs, 3);
    assert_eq!(result.attempts, 3);
}

#[test]
fn test_no_retries_runs_once() {
    let tracer = TraceLogger::disabled();
    let runner = ScenarioRunner::new(run_settings(Path::new("screenshots")), &tracer, CancelToken::new());
    let mut runs = 0;
    let result = runner.run_with_retries(|_| {
        runs += 1;
        stub_result("broken", false)
    });
    assert_eq!(runs, 1);
    assert_eq!(result.attempts, 1);
}

#[test]
fn test_retries_stop_when_cancelled() {
    let tracer = TraceLogger::disabled();
    let mut settings = run_settings(Path::new("screenshots"));
    settings.retries = 5;
    let token = CancelToken::new();
    token.cancel();
    let runner = ScenarioRunner::new(settings, &tracer, token);

    let mut runs = 0;
    runner.run_with_retries(|_| {
        runs += 1;
        stub_result("cancelled", false)
    });
    assert_eq!(runs, 1);
}
