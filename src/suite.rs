use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::cli::config::Settings;
use crate::device::bridge::{DeviceBridge, args};
use crate::device::driver::{DriverTimings, MobileDriver};
use crate::error::DriverError;

const SITE_CHECK_TIMEOUT: Duration = Duration::from_secs(15);

/// Outcome of probing the admin site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SiteCheck {
    Reachable { code: u16 },
    Unreachable { error: String },
    Skipped,
}

/// What the pre-run checks found. Only directory creation is fatal.
#[derive(Debug, Clone, Serialize)]
pub struct PreflightReport {
    pub device_id: String,
    pub device_attached: bool,
    pub app_package: String,
    /// `None` when the device was missing or the query failed
    pub app_installed: Option<bool>,
    pub created_directories: Vec<String>,
    pub site: SiteCheck,
}

impl PreflightReport {
    /// Device present, app installed and site reachable.
    pub fn ready(&self) -> bool {
        self.device_attached
            && self.app_installed == Some(true)
            && !matches!(self.site, SiteCheck::Unreachable { .. })
    }
}

/// Check device, app and admin site, and create the output directories.
///
/// `http` is the client used for the site reachability check; `None` skips it.
pub fn preflight<B: DeviceBridge>(
    bridge: &B,
    settings: &Settings,
    http: Option<&reqwest::blocking::Client>,
) -> Result<PreflightReport, DriverError> {
    info!("starting preflight checks");
    let device_id = settings.mobile.device_id.clone();
    let app_package = settings.app_package().to_string();

    let (device_attached, app_installed) =
        match MobileDriver::connect(bridge, &device_id, DriverTimings::immediate()) {
            Ok(driver) => {
                info!(device = %device_id, "device attached");
                let installed = match driver.is_package_installed(&app_package) {
                    Ok(true) => {
                        info!(package = %app_package, "app installed");
                        Some(true)
                    }
                    Ok(false) => {
                        warn!(package = %app_package, "app not installed, install it first");
                        Some(false)
                    }
                    Err(e) => {
                        warn!(error = %e, "could not check app installation status");
                        None
                    }
                };
                (true, installed)
            }
            Err(e) => {
                warn!(device = %device_id, error = %e, "device not available, start the emulator first");
                (false, None)
            }
        };

    let mut created_directories = Vec::new();
    for dir in [&settings.run.screenshot_dir, &settings.run.report_dir] {
        if ensure_dir(Path::new(dir))? {
            info!(dir = %dir, "directory created");
            created_directories.push(dir.clone());
        }
    }

    let site = match http {
        Some(client) => check_site(client, &settings.profile.base_url),
        None => SiteCheck::Skipped,
    };

    Ok(PreflightReport {
        device_id,
        device_attached,
        app_package,
        app_installed,
        created_directories,
        site,
    })
}

/// Client for [`preflight`]'s site reachability check.
pub fn site_client() -> Result<reqwest::blocking::Client, DriverError> {
    reqwest::blocking::Client::builder()
        .timeout(SITE_CHECK_TIMEOUT)
        .build()
        .map_err(|e| DriverError::SessionIO(format!("Failed to build HTTP client: {}", e)))
}

fn check_site(client: &reqwest::blocking::Client, base_url: &str) -> SiteCheck {
    match client.get(base_url).send() {
        Ok(response) => {
            let code = response.status().as_u16();
            if response.status().is_server_error() {
                warn!(url = base_url, code, "admin site answered with a server error");
                SiteCheck::Unreachable {
                    error: format!("HTTP {}", code),
                }
            } else {
                info!(url = base_url, code, "admin site reachable");
                SiteCheck::Reachable { code }
            }
        }
        Err(e) => {
            warn!(url = base_url, error = %e, "admin site unreachable");
            SiteCheck::Unreachable { error: e.to_string() }
        }
    }
}

/// Create `dir` if missing. Returns whether it was created.
fn ensure_dir(dir: &Path) -> Result<bool, DriverError> {
    if dir.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(dir).map_err(|e| DriverError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    Ok(true)
}

/// Force-stop the configured app. Failures are logged, never returned.
pub fn teardown<B: DeviceBridge>(bridge: &B, settings: &Settings) {
    info!("starting teardown");
    let package = settings.app_package();
    let cmd = args([
        "-s",
        settings.mobile.device_id.as_str(),
        "shell",
        "am",
        "force-stop",
        package,
    ]);
    match bridge.exec(&cmd) {
        Ok(_) => info!(package, "app closed"),
        Err(e) => info!(error = %e, "no app to close"),
    }
    info!("teardown completed");
}
