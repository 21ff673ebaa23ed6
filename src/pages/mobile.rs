use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::device::bridge::DeviceBridge;
use crate::device::driver::MobileDriver;
use crate::device::element::Element;
use crate::device::poll::{CancelToken, PollOutcome};
use crate::error::DriverError;

const SWITCH_CLASS: &str = "android.widget.Switch";
const SWIPE_DURATION_MS: u64 = 1000;
const SWIPE_HIGH: (u32, u32) = (500, 500);
const SWIPE_LOW: (u32, u32) = (500, 1500);

/// Bottom navigation bar buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavButton {
    Preferences,
    Explore,
    Purchases,
}

impl NavButton {
    pub fn label(self) -> &'static str {
        match self {
            NavButton::Preferences => "Preferences",
            NavButton::Explore => "Explore",
            NavButton::Purchases => "Purchases",
        }
    }

    /// Where the button sits on the reference device.
    pub fn coordinates(self) -> (u32, u32) {
        match self {
            NavButton::Preferences => (1200, 2896),
            NavButton::Explore => (0, 2756),
            NavButton::Purchases => (480, 2756),
        }
    }
}

/// Entries of the Preferences screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    ApproveFirstTransaction,
    AlertOrApprove,
    TotalSpending,
    SpendingLimit,
}

impl Policy {
    pub const ALL: [Policy; 4] = [
        Policy::ApproveFirstTransaction,
        Policy::AlertOrApprove,
        Policy::TotalSpending,
        Policy::SpendingLimit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Policy::ApproveFirstTransaction => "Approve first transaction from a publisher",
            Policy::AlertOrApprove => "Alert or approve transactions exceeding",
            Policy::TotalSpending => "Alert or approve transactions if total spending exceeds",
            Policy::SpendingLimit => "Set spending limit for publishers",
        }
    }

    /// Tap target used when the label cannot be found on screen.
    pub fn fallback(self) -> (u32, u32) {
        match self {
            Policy::ApproveFirstTransaction => (720, 600),
            Policy::AlertOrApprove => (28, 691),
            Policy::TotalSpending => (28, 873),
            Policy::SpendingLimit => (28, 1097),
        }
    }
}

/// How a tap with fallback was finally dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TapMethod {
    Text,
    Coordinates,
}

/// Page object for the mobile app, over a connected [`MobileDriver`].
pub struct MobileApp<'a, B: DeviceBridge> {
    driver: &'a mut MobileDriver<B>,
    element_timeout: Duration,
    nav_timeout: Duration,
    token: CancelToken,
}

impl<'a, B: DeviceBridge> MobileApp<'a, B> {
    pub fn new(driver: &'a mut MobileDriver<B>, element_timeout: Duration, token: CancelToken) -> Self {
        MobileApp {
            driver,
            element_timeout,
            nav_timeout: element_timeout,
            token,
        }
    }

    /// Wait used by [`MobileApp::tap_nav`]; defaults to the element timeout.
    pub fn with_nav_timeout(mut self, nav_timeout: Duration) -> Self {
        self.nav_timeout = nav_timeout;
        self
    }

    pub fn driver(&self) -> &MobileDriver<B> {
        self.driver
    }

    pub fn launch_app(&mut self, package: &str) -> Result<(), DriverError> {
        self.driver.launch_app(package)
    }

    /// Wait until the launched app shows content.
    pub fn wait_until_loaded(&self, attempts: usize) -> PollOutcome<usize> {
        self.driver.wait_for_app_to_load(attempts, &self.token)
    }

    /// Wait for an element with an explicit timeout; `TimedOut` becomes an error.
    pub fn wait_for(&self, text: &str, timeout: Duration) -> Result<Element, DriverError> {
        match self.driver.wait_for_element(text, timeout, &self.token) {
            PollOutcome::Found { value, .. } => Ok(value),
            PollOutcome::TimedOut { .. } => Err(DriverError::Timeout {
                waited_for: format!("element '{}'", text),
                timeout_ms: timeout.as_millis() as u64,
            }),
            PollOutcome::Cancelled { .. } => Err(DriverError::Cancelled(format!("element '{}'", text))),
        }
    }

    /// The signed-in user's label is on screen.
    pub fn verify_app_launched(&self, user_label: &str) -> Result<(), DriverError> {
        self.find_by_label(user_label, "app not launched, user element missing")?;
        info!(user = user_label, "app launched with user signed in");
        Ok(())
    }

    pub fn verify_organization(&self, organization: &str) -> Result<(), DriverError> {
        self.find_by_label(organization, "organization not shown")?;
        info!(organization, "organization verified");
        Ok(())
    }

    /// Tap a navigation button by coordinates and wait for its screen title.
    pub fn tap_nav(&self, button: NavButton) -> Result<(), DriverError> {
        let (x, y) = button.coordinates();
        self.driver.tap(x, y)?;
        self.wait_for(button.label(), self.nav_timeout)?;
        Ok(())
    }

    pub fn tap_preferences(&self) -> Result<(), DriverError> {
        self.tap_nav(NavButton::Preferences)
    }

    /// Every policy entry is listed.
    pub fn verify_preferences_page(&self) -> Result<(), DriverError> {
        let elements = self.driver.screen_elements(false)?;
        for policy in Policy::ALL {
            if !elements.iter().any(|e| e.label.contains(policy.label())) {
                return Err(DriverError::not_found(policy.label(), "preferences option missing"));
            }
            info!(option = policy.label(), "preferences option found");
        }
        Ok(())
    }

    /// Tap the policy by its label, falling back to its fixed coordinates.
    pub fn toggle_policy(&self, policy: Policy) -> Result<TapMethod, DriverError> {
        self.tap_with_fallback(policy.label(), Some(policy.fallback()))
    }

    /// Tap by text; when nothing matches tap `fallback`, or fail without one.
    ///
    /// A dump that cannot be taken or parsed counts as no match when a
    /// fallback exists.
    pub fn tap_with_fallback(&self, text: &str, fallback: Option<(u32, u32)>) -> Result<TapMethod, DriverError> {
        match self.driver.tap_by_text(text) {
            Ok(true) => return Ok(TapMethod::Text),
            Ok(false) => {}
            Err(e @ (DriverError::BridgeFailed { .. } | DriverError::Hierarchy(_))) if fallback.is_some() => {
                warn!(text, error = %e, "could not read the screen for text tap");
            }
            Err(e) => return Err(e),
        }
        match fallback {
            Some((x, y)) => {
                warn!(text, x, y, "text tap failed, using fallback coordinates");
                self.driver.tap(x, y)?;
                Ok(TapMethod::Coordinates)
            }
            None => Err(DriverError::not_found(text, "nothing to tap")),
        }
    }

    /// A switch whose label contains `label` is on screen.
    pub fn verify_policy_switch(&self, label: &str) -> Result<(), DriverError> {
        let elements = self.driver.screen_elements(false)?;
        if elements
            .iter()
            .any(|e| e.kind == SWITCH_CLASS && e.label.contains(label))
        {
            info!(policy = label, "policy switch verified");
            Ok(())
        } else {
            Err(DriverError::not_found(label, "no switch with this label"))
        }
    }

    pub fn verify_element_exists(&self, label: &str) -> Result<(), DriverError> {
        self.find_by_label(label, "element missing")?;
        info!(label, "element verified");
        Ok(())
    }

    pub fn swipe_up(&self) -> Result<(), DriverError> {
        self.driver.swipe(SWIPE_LOW, SWIPE_HIGH, SWIPE_DURATION_MS)
    }

    pub fn swipe_down(&self) -> Result<(), DriverError> {
        self.driver.swipe(SWIPE_HIGH, SWIPE_LOW, SWIPE_DURATION_MS)
    }

    pub fn screenshot(&self, path: &Path) -> Result<(), DriverError> {
        self.driver.take_screenshot(path)
    }

    fn find_by_label(&self, label: &str, context: &str) -> Result<Element, DriverError> {
        self.driver
            .screen_elements(false)?
            .into_iter()
            .find(|e| !e.label.is_empty() && e.label.contains(label))
            .ok_or_else(|| DriverError::not_found(label, context))
    }
}
