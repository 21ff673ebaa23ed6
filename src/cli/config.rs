use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::driver::DriverTimings;
use crate::web::session::BrowserOptions;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "mo-e2e",
    version,
    about = "End-to-end UI tests for the MO admin console and mobile app"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: mo-e2e.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Environment profile: staging, production, development
    #[arg(long, global = true)]
    pub env: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios from YAML files
    Run {
        /// Scenario YAML file or directory of YAML files
        #[arg(long, default_value = "scenarios")]
        scenario: String,

        /// Output format: console, html, junit, json
        #[arg(long)]
        format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,

        /// Re-run a failed scenario this many times
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Dump and print the elements currently on the device screen
    Elements {
        /// Print as JSON instead of a numbered list
        #[arg(long)]
        json: bool,

        /// Remove the previous dump file first
        #[arg(long)]
        refresh: bool,
    },

    /// Check device, app, directories and admin site before a run
    Preflight,

    /// Force-stop the app under test
    Teardown,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `mo-e2e.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_environments")]
    pub environments: BTreeMap<String, EnvironmentProfile>,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub mobile: MobileConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            environments: default_environments(),
            web: WebConfig::default(),
            mobile: MobileConfig::default(),
            run: RunConfig::default(),
        }
    }
}

/// Per-environment targets: which admin site and which app build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentProfile {
    pub base_url: String,
    /// Text shown in the environment combobox once selected
    pub environment_label: String,
    /// Option name in the environment dropdown (defaults to the label)
    #[serde(default)]
    pub environment_option: Option<String>,
    pub app_package: String,
}

impl EnvironmentProfile {
    pub fn option_name(&self) -> &str {
        self.environment_option
            .as_deref()
            .unwrap_or(&self.environment_label)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub timeouts: WebTimeouts,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebTimeouts {
    #[serde(default = "default_navigation_ms")]
    pub navigation_ms: u64,
    #[serde(default = "default_element_ms")]
    pub element_ms: u64,
    #[serde(default = "default_login_ms")]
    pub login_ms: u64,
}

impl Default for WebTimeouts {
    fn default() -> Self {
        Self {
            navigation_ms: default_navigation_ms(),
            element_ms: default_element_ms(),
            login_ms: default_login_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Unset means headless only on CI
    pub headless: Option<bool>,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    #[serde(default = "default_slow_mo_ms")]
    pub slow_mo_ms: u64,
    #[serde(default = "default_node")]
    pub node: String,
    #[serde(default = "default_server_script")]
    pub server_script: String,
    #[serde(default = "default_action_timeout_ms")]
    pub action_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            slow_mo_ms: default_slow_mo_ms(),
            node: default_node(),
            server_script: default_server_script(),
            action_timeout_ms: default_action_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileConfig {
    #[serde(default = "default_device_id")]
    pub device_id: String,
    #[serde(default = "default_adb")]
    pub adb: String,
    #[serde(default = "default_app_activity")]
    pub app_activity: String,
    /// Overrides the environment profile's package
    pub app_package: Option<String>,
    #[serde(default = "default_load_attempts")]
    pub load_attempts: usize,
    #[serde(default)]
    pub timeouts: MobileTimeouts,
}

impl Default for MobileConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            adb: default_adb(),
            app_activity: default_app_activity(),
            app_package: None,
            load_attempts: default_load_attempts(),
            timeouts: MobileTimeouts::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileTimeouts {
    #[serde(default = "default_element_ms")]
    pub element_wait_ms: u64,
    /// Wait for a screen title after tapping a navigation button
    #[serde(default = "default_nav_wait_ms")]
    pub nav_wait_ms: u64,
    #[serde(default = "default_tap_delay_ms")]
    pub tap_delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_dump_settle_ms")]
    pub dump_settle_ms: u64,
    #[serde(default = "default_launch_settle_ms")]
    pub launch_settle_ms: u64,
    #[serde(default = "default_foreground_settle_ms")]
    pub foreground_settle_ms: u64,
    #[serde(default = "default_load_attempt_delay_ms")]
    pub load_attempt_delay_ms: u64,
}

impl Default for MobileTimeouts {
    fn default() -> Self {
        Self {
            element_wait_ms: default_element_ms(),
            nav_wait_ms: default_nav_wait_ms(),
            tap_delay_ms: default_tap_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            dump_settle_ms: default_dump_settle_ms(),
            launch_settle_ms: default_launch_settle_ms(),
            foreground_settle_ms: default_foreground_settle_ms(),
            load_attempt_delay_ms: default_load_attempt_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_console")]
    pub format: String,
    pub output: Option<String>,
    /// Unset means 2 on CI, 0 elsewhere
    pub retries: Option<u32>,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
    #[serde(default = "default_trace_file")]
    pub trace_file: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            format: default_console(),
            output: None,
            retries: None,
            screenshot_dir: default_screenshot_dir(),
            report_dir: default_report_dir(),
            trace_file: default_trace_file(),
        }
    }
}

// Serde default helpers
fn default_environment() -> String { "staging".to_string() }
fn default_navigation_ms() -> u64 { 30_000 }
fn default_element_ms() -> u64 { 10_000 }
fn default_login_ms() -> u64 { 15_000 }
fn default_viewport_width() -> u32 { 1920 }
fn default_viewport_height() -> u32 { 1080 }
fn default_slow_mo_ms() -> u64 { 100 }
fn default_node() -> String { "node".to_string() }
fn default_server_script() -> String { "node/browser_server.js".to_string() }
fn default_action_timeout_ms() -> u64 { 60_000 }
fn default_device_id() -> String { "emulator-5554".to_string() }
fn default_adb() -> String { "adb".to_string() }
fn default_app_activity() -> String { ".MainActivity".to_string() }
fn default_load_attempts() -> usize { 5 }
fn default_nav_wait_ms() -> u64 { 30_000 }
fn default_tap_delay_ms() -> u64 { 1000 }
fn default_poll_interval_ms() -> u64 { 2000 }
fn default_dump_settle_ms() -> u64 { 500 }
fn default_launch_settle_ms() -> u64 { 5000 }
fn default_foreground_settle_ms() -> u64 { 3000 }
fn default_load_attempt_delay_ms() -> u64 { 3000 }
fn default_console() -> String { "console".to_string() }
fn default_screenshot_dir() -> String { "screenshots".to_string() }
fn default_report_dir() -> String { "reports".to_string() }
fn default_trace_file() -> String { "reports/trace.jsonl".to_string() }

fn default_environments() -> BTreeMap<String, EnvironmentProfile> {
    let mut envs = BTreeMap::new();
    envs.insert(
        "staging".to_string(),
        EnvironmentProfile {
            base_url: "https://mo-admin.dev.pressingly.net/".into(),
            environment_label: "[STG] US Airlines".into(),
            environment_option: Some("[STG] US Airlines Staging".into()),
            app_package: "com.pressingly.moneta.staging".into(),
        },
    );
    envs.insert(
        "production".to_string(),
        EnvironmentProfile {
            base_url: "https://mo-admin.pressingly.net/".into(),
            environment_label: "[PROD] US Airlines".into(),
            environment_option: None,
            app_package: "com.pressingly.moneta".into(),
        },
    );
    envs.insert(
        "development".to_string(),
        EnvironmentProfile {
            base_url: "https://mo-admin.dev.pressingly.net/".into(),
            environment_label: "[DEV] US Airlines".into(),
            environment_option: None,
            app_package: "com.pressingly.moneta.dev".into(),
        },
    );
    envs
}

// ============================================================================
// Config File Loading
// ============================================================================

pub const DEFAULT_CONFIG_PATH: &str = "mo-e2e.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unknown environment '{name}' (available: {})", available.join(", "))]
    UnknownEnvironment { name: String, available: Vec<String> },

    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

/// Load config from a YAML file.
///
/// A missing file at the default location yields defaults. An explicitly
/// named file must exist, and a malformed file is an error either way.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    let content = match std::fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) if path.is_none() && e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(AppConfig::default());
        }
        Err(e) => {
            return Err(ConfigError::Read {
                path: config_path.to_string(),
                source: e,
            });
        }
    };

    serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: config_path.to_string(),
        source: e,
    })
}

// ============================================================================
// Resolved settings (config file + environment variables + CLI)
// ============================================================================

pub const ENV_PROFILE_VAR: &str = "MO_ENV";
pub const ENV_EMAIL_VAR: &str = "MO_ADMIN_EMAIL";
pub const ENV_PASSWORD_VAR: &str = "MO_ADMIN_PASSWORD";
pub const ENV_CI_VAR: &str = "CI";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a run needs, with precedence CLI > environment > file > defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: String,
    pub profile: EnvironmentProfile,
    pub credentials: Option<Credentials>,
    pub ci: bool,
    pub headless: bool,
    pub retries: u32,
    pub web: WebConfig,
    pub mobile: MobileConfig,
    pub run: RunConfig,
}

impl Settings {
    /// Resolve using the process environment.
    pub fn from_env(config: &AppConfig, env_override: Option<&str>) -> Result<Self, ConfigError> {
        Self::resolve(config, env_override, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit variable lookup.
    pub fn resolve<F>(config: &AppConfig, env_override: Option<&str>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = env_override
            .map(str::to_string)
            .or_else(|| lookup(ENV_PROFILE_VAR).filter(|v| !v.is_empty()))
            .unwrap_or_else(|| config.environment.clone());

        let profile = config
            .environments
            .get(&environment)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                name: environment.clone(),
                available: config.environments.keys().cloned().collect(),
            })?;

        let email = lookup(ENV_EMAIL_VAR).or_else(|| config.web.credentials.email.clone());
        let password = lookup(ENV_PASSWORD_VAR).or_else(|| config.web.credentials.password.clone());
        let credentials = match (email, password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(Credentials { email, password })
            }
            _ => None,
        };

        let ci = lookup(ENV_CI_VAR).is_some_and(|v| v == "true");

        Ok(Settings {
            environment,
            profile,
            credentials,
            ci,
            headless: config.web.browser.headless.unwrap_or(ci),
            retries: config.run.retries.unwrap_or(if ci { 2 } else { 0 }),
            web: config.web.clone(),
            mobile: config.mobile.clone(),
            run: config.run.clone(),
        })
    }

    /// Check what a web run cannot do without.
    pub fn validate_web(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.profile.base_url.trim().is_empty() {
            missing.push("baseUrl".to_string());
        }
        if self.credentials.is_none() {
            missing.push("credentials".to_string());
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingFields(missing))
        }
    }

    pub fn app_package(&self) -> &str {
        self.mobile
            .app_package
            .as_deref()
            .unwrap_or(&self.profile.app_package)
    }

    pub fn driver_timings(&self) -> DriverTimings {
        let t = &self.mobile.timeouts;
        DriverTimings {
            tap_settle: Duration::from_millis(t.tap_delay_ms),
            poll_interval: Duration::from_millis(t.poll_interval_ms),
            dump_settle: Duration::from_millis(t.dump_settle_ms),
            launch_settle: Duration::from_millis(t.launch_settle_ms),
            foreground_settle: Duration::from_millis(t.foreground_settle_ms),
            load_attempt_delay: Duration::from_millis(t.load_attempt_delay_ms),
        }
    }

    pub fn browser_options(&self) -> BrowserOptions {
        let b = &self.web.browser;
        BrowserOptions {
            node: b.node.clone(),
            script: b.server_script.clone(),
            headless: self.headless,
            viewport_width: b.viewport_width,
            viewport_height: b.viewport_height,
            slow_mo_ms: b.slow_mo_ms,
            base_url: Some(self.profile.base_url.clone()),
            action_timeout_ms: b.action_timeout_ms,
            navigation_timeout_ms: b.action_timeout_ms,
        }
    }
}
