use std::path::Path;

use tracing::{info, warn};

use crate::cli::config::Settings;
use crate::device::bridge::AdbBridge;
use crate::device::driver::MobileDriver;
use crate::device::poll::CancelToken;
use crate::report::ReportFormat;
use crate::report::report_model::TestSuiteReport;
use crate::scenario::load_scenarios;
use crate::scenario::runner::{RunSettings, ScenarioRunner};
use crate::scenario::scenario_model::{Scenario, TestResult};
use crate::suite::{SiteCheck, preflight, site_client, teardown};
use crate::trace::logger::TraceLogger;
use crate::web::page::BrowserPage;
use crate::web::session::NodeBrowser;

const SUITE_NAME: &str = "MO E2E";

// ============================================================================
// run subcommand
// ============================================================================

/// Run scenarios and return whether all passed.
pub fn cmd_run(
    settings: &Settings,
    scenario_path: &str,
    format: &str,
    output: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let format = ReportFormat::parse(format).ok_or_else(|| format!("Unknown report format: {}", format))?;
    let scenarios = load_scenarios(Path::new(scenario_path))?;

    if scenarios.is_empty() {
        eprintln!("No scenarios found at: {}", scenario_path);
        return Ok(true);
    }

    if scenarios.iter().any(|s| matches!(s, Scenario::Web(_))) {
        settings.validate_web()?;
    }

    info!(
        count = scenarios.len(),
        environment = %settings.environment,
        retries = settings.retries,
        headless = settings.headless,
        "running scenarios"
    );

    let tracer = TraceLogger::new(Path::new(&settings.run.trace_file));
    let runner = ScenarioRunner::new(RunSettings::from_settings(settings), &tracer, CancelToken::new());
    let start = std::time::Instant::now();

    // Drivers start on first use; a failed start fails that platform's scenarios.
    let mut browser: Option<Result<NodeBrowser, String>> = None;
    let mut device: Option<Result<MobileDriver<AdbBridge>, String>> = None;

    let mut results = Vec::new();
    for scenario in &scenarios {
        let result = match scenario {
            Scenario::Web(web) => {
                let slot = browser.get_or_insert_with(|| {
                    NodeBrowser::launch(&settings.browser_options()).map_err(|e| e.to_string())
                });
                match slot {
                    Ok(page) => runner.run_with_retries(|attempt| runner.run_web(web, page, attempt)),
                    Err(e) => TestResult::errored(&web.name, "web", format!("Browser launch failed: {}", e)),
                }
            }
            Scenario::Mobile(mobile) => {
                let slot = device.get_or_insert_with(|| {
                    MobileDriver::connect(
                        AdbBridge::with_program(&settings.mobile.adb),
                        &settings.mobile.device_id,
                        settings.driver_timings(),
                    )
                    .map(|d| d.with_activity(&settings.mobile.app_activity))
                    .map_err(|e| e.to_string())
                });
                match slot {
                    Ok(driver) => runner.run_with_retries(|attempt| runner.run_mobile(mobile, driver, attempt)),
                    Err(e) => TestResult::errored(&mobile.name, "mobile", format!("Device connection failed: {}", e)),
                }
            }
        };
        results.push(result);
    }

    let duration = start.elapsed().as_millis();

    if let Some(Ok(mut page)) = browser {
        if let Err(e) = page.close() {
            warn!(error = %e, "browser did not close cleanly");
        }
    }
    if let Some(Ok(mut driver)) = device {
        driver.cleanup();
    }

    let report = TestSuiteReport::from_results(SUITE_NAME, results)
        .with_environment(&settings.environment)
        .with_duration(duration);
    let all_passed = report.all_passed();
    let rendered = format.render(&report)?;

    match output {
        Some(path) => {
            let path = Path::new(path);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &rendered)?;
            info!(path = %path.display(), "report written");
        }
        None => print!("{}", rendered),
    }

    Ok(all_passed)
}

// ============================================================================
// elements subcommand
// ============================================================================

/// Print what is on the device screen right now.
pub fn cmd_elements(settings: &Settings, json: bool, refresh: bool) -> Result<(), Box<dyn std::error::Error>> {
    let driver = MobileDriver::connect(
        AdbBridge::with_program(&settings.mobile.adb),
        &settings.mobile.device_id,
        settings.driver_timings(),
    )?;
    let elements = driver.screen_elements(refresh)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&elements)?);
        return Ok(());
    }

    println!("{} elements on {}", elements.len(), settings.mobile.device_id);
    for (i, el) in elements.iter().enumerate() {
        let label = if el.label.is_empty() { "No text" } else { el.label.as_str() };
        println!(
            "  {:>3}. {}: \"{}\" at ({}, {})",
            i + 1,
            el.kind,
            label,
            el.bounds.center_x,
            el.bounds.center_y
        );
    }
    Ok(())
}

// ============================================================================
// preflight / teardown subcommands
// ============================================================================

pub fn cmd_preflight(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let client = site_client()?;
    let bridge = AdbBridge::with_program(&settings.mobile.adb);
    let report = preflight(&bridge, settings, Some(&client))?;

    let mark = |ok: bool| if ok { "\u{2713}" } else { "\u{26a0}" };
    println!("{} device {}", mark(report.device_attached), report.device_id);
    match report.app_installed {
        Some(installed) => println!("{} app {}", mark(installed), report.app_package),
        None => println!("{} app {} (not checked)", mark(false), report.app_package),
    }
    for dir in &report.created_directories {
        println!("\u{2713} created {}", dir);
    }
    match &report.site {
        SiteCheck::Reachable { code } => println!("\u{2713} {} (HTTP {})", settings.profile.base_url, code),
        SiteCheck::Unreachable { error } => println!("\u{26a0} {} ({})", settings.profile.base_url, error),
        SiteCheck::Skipped => {}
    }
    println!("{}", if report.ready() { "ready" } else { "not ready" });
    Ok(())
}

pub fn cmd_teardown(settings: &Settings) {
    teardown(&AdbBridge::with_program(&settings.mobile.adb), settings);
}
