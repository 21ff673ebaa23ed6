use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pages::mobile::{NavButton, Policy};
use crate::web::locator::Locator;

/// A test scenario, deserialized from YAML.
///
/// The `platform` key selects which driver runs it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum Scenario {
    Web(WebScenario),
    Mobile(MobileScenario),
}

impl Scenario {
    pub fn name(&self) -> &str {
        match self {
            Scenario::Web(s) => &s.name,
            Scenario::Mobile(s) => &s.name,
        }
    }

    pub fn platform(&self) -> &'static str {
        match self {
            Scenario::Web(_) => "web",
            Scenario::Mobile(_) => "mobile",
        }
    }

    pub fn step_count(&self) -> usize {
        match self {
            Scenario::Web(s) => s.steps.len(),
            Scenario::Mobile(s) => s.steps.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebScenario {
    /// Human-readable name, e.g. "TC-001 Admin onboarding"
    pub name: String,

    /// Page opened before the first step; relative to the environment base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,

    pub steps: Vec<WebStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MobileScenario {
    pub name: String,

    /// Package to launch; defaults to the environment's app package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_package: Option<String>,

    pub steps: Vec<MobileStep>,
}

// ============================================================================
// Web steps
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WebStep {
    /// Open a URL (relative to the base URL unless absolute)
    Goto { url: String },

    /// Sign in with the configured credentials
    Login,

    /// Pick an environment in the header dropdown; defaults to the profile's
    SelectEnvironment {
        #[serde(default)]
        option: Option<String>,
    },

    /// Open the Users page from the navigation
    OpenUsers,

    /// Type into the user search box
    SearchUser { email: String },

    /// Open a user's details page by id
    OpenUser { user_id: String },

    Fill { locator: Locator, value: String },

    Click { locator: Locator },

    WaitForUrl {
        pattern: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Full-page screenshot named `<name>-<timestamp>.png`
    Screenshot { name: String },

    Pause { ms: u64 },

    Assert { assertions: Vec<WebAssertion> },
}

impl WebStep {
    /// The YAML `action` name.
    pub fn action(&self) -> &'static str {
        match self {
            WebStep::Goto { .. } => "goto",
            WebStep::Login => "login",
            WebStep::SelectEnvironment { .. } => "select_environment",
            WebStep::OpenUsers => "open_users",
            WebStep::SearchUser { .. } => "search_user",
            WebStep::OpenUser { .. } => "open_user",
            WebStep::Fill { .. } => "fill",
            WebStep::Click { .. } => "click",
            WebStep::WaitForUrl { .. } => "wait_for_url",
            WebStep::Screenshot { .. } => "screenshot",
            WebStep::Pause { .. } => "pause",
            WebStep::Assert { .. } => "assert",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WebAssertion {
    /// Element becomes visible within the element timeout
    Visible { locator: Locator },

    TitleContains { expected: String },

    UrlContains { expected: String },

    /// Landing page title and heading
    HomePageLoaded,

    /// Welcome heading shown after sign-in
    LoginSucceeded,

    /// Environment combobox shows the label; defaults to the profile's
    EnvironmentSelected {
        #[serde(default)]
        label: Option<String>,
    },

    UsersPageLoaded,

    UserDetails { email: String },

    QrCodeSection,

    UserInformation,
}

impl fmt::Display for WebAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebAssertion::Visible { locator } => write!(f, "visible {}", locator),
            WebAssertion::TitleContains { expected } => write!(f, "title contains '{}'", expected),
            WebAssertion::UrlContains { expected } => write!(f, "url contains '{}'", expected),
            WebAssertion::HomePageLoaded => write!(f, "home page loaded"),
            WebAssertion::LoginSucceeded => write!(f, "login succeeded"),
            WebAssertion::EnvironmentSelected { label } => match label {
                Some(l) => write!(f, "environment '{}' selected", l),
                None => write!(f, "environment selected"),
            },
            WebAssertion::UsersPageLoaded => write!(f, "users page loaded"),
            WebAssertion::UserDetails { email } => write!(f, "user details for {}", email),
            WebAssertion::QrCodeSection => write!(f, "QR code section"),
            WebAssertion::UserInformation => write!(f, "user information"),
        }
    }
}

// ============================================================================
// Mobile steps
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MobileStep {
    /// Launch the scenario's app package
    LaunchApp,

    /// Wait until the app shows content, restarting it between attempts
    WaitForApp {
        #[serde(default)]
        attempts: Option<usize>,
    },

    Tap { x: u32, y: u32 },

    /// Tap by text, then at `fallback` coordinates if nothing matched
    TapText {
        text: String,
        #[serde(default)]
        fallback: Option<[u32; 2]>,
    },

    /// Tap a bottom navigation button and wait for its screen
    Navigate { to: NavButton },

    WaitForElement {
        text: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    Swipe { direction: SwipeDirection },

    TypeText { text: String },

    Back,

    Pause { ms: u64 },

    /// Screenshot saved as `<name>.png` in the screenshot directory
    Screenshot { name: String },

    TogglePolicy { policy: Policy },

    /// Log every element on a fresh dump. Below `min_elements` the device
    /// state is logged, a debug screenshot taken and the dump retried once.
    LogElements {
        #[serde(default)]
        min_elements: Option<usize>,
    },

    Assert { assertions: Vec<MobileAssertion> },
}

impl MobileStep {
    /// The YAML `action` name.
    pub fn action(&self) -> &'static str {
        match self {
            MobileStep::LaunchApp => "launch_app",
            MobileStep::WaitForApp { .. } => "wait_for_app",
            MobileStep::Tap { .. } => "tap",
            MobileStep::TapText { .. } => "tap_text",
            MobileStep::Navigate { .. } => "navigate",
            MobileStep::WaitForElement { .. } => "wait_for_element",
            MobileStep::Swipe { .. } => "swipe",
            MobileStep::TypeText { .. } => "type_text",
            MobileStep::Back => "back",
            MobileStep::Pause { .. } => "pause",
            MobileStep::Screenshot { .. } => "screenshot",
            MobileStep::TogglePolicy { .. } => "toggle_policy",
            MobileStep::LogElements { .. } => "log_elements",
            MobileStep::Assert { .. } => "assert",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MobileAssertion {
    ElementExists { label: String },

    UserSignedIn { label: String },

    Organization { name: String },

    PreferencesPage,

    PolicySwitch { label: String },
}

impl fmt::Display for MobileAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MobileAssertion::ElementExists { label } => write!(f, "element '{}' exists", label),
            MobileAssertion::UserSignedIn { label } => write!(f, "user '{}' signed in", label),
            MobileAssertion::Organization { name } => write!(f, "organization '{}'", name),
            MobileAssertion::PreferencesPage => write!(f, "preferences page"),
            MobileAssertion::PolicySwitch { label } => write!(f, "policy switch '{}'", label),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Result of evaluating a single assertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssertionResult {
    /// Which step this assertion belongs to (0-indexed)
    pub step_index: usize,

    /// What was checked, e.g. "url contains '/users'"
    pub check: String,

    pub passed: bool,

    /// Actual value found (for debugging failed assertions)
    pub actual: Option<String>,

    /// Human-readable failure message
    pub message: Option<String>,
}

/// Result of running a complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub scenario_name: String,

    /// "web" or "mobile"
    pub platform: String,

    /// Whether all steps and assertions passed
    pub passed: bool,

    /// Number of steps that were executed
    pub steps_run: usize,

    /// Runs it took, including the reported one
    pub attempts: u32,

    pub assertion_results: Vec<AssertionResult>,

    /// Error message if the scenario stopped on an error (not an assertion failure)
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    /// Screenshots written during the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<String>,
}

impl TestResult {
    /// A scenario that could not start, e.g. because its driver failed to launch.
    pub fn errored(scenario_name: &str, platform: &str, error: impl Into<String>) -> Self {
        TestResult {
            scenario_name: scenario_name.to_string(),
            platform: platform.to_string(),
            passed: false,
            steps_run: 0,
            attempts: 1,
            assertion_results: Vec::new(),
            error: Some(error.into()),
            duration_ms: None,
            screenshots: Vec::new(),
        }
    }
}
