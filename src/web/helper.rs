use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::DriverError;
use crate::web::locator::{LoadState, Locator};
use crate::web::page::BrowserPage;

const NAVIGATION_RETRY_PAUSE_MS: u64 = 2000;
const CLICK_RETRY_PAUSE_MS: u64 = 1000;
const DROPDOWN_OPEN_PAUSE_MS: u64 = 1000;
const VERIFY_TIMEOUT_MS: u64 = 5000;

/// Result of checking one locator in [`WebHelper::verify_elements_exist`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementCheck {
    pub locator: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Retrying and logging wrappers over a [`BrowserPage`].
pub struct WebHelper<'a, P: BrowserPage> {
    page: &'a mut P,
    screenshot_dir: PathBuf,
}

impl<'a, P: BrowserPage> WebHelper<'a, P> {
    pub fn new(page: &'a mut P, screenshot_dir: &Path) -> Self {
        WebHelper {
            page,
            screenshot_dir: screenshot_dir.to_path_buf(),
        }
    }

    /// Navigate and wait for network idle, retrying up to `max_retries` times.
    ///
    /// Returns the last error once every attempt failed.
    pub fn navigate_with_retry(&mut self, url: &str, max_retries: u32) -> Result<(), DriverError> {
        let mut last_error = None;
        for attempt in 1..=max_retries.max(1) {
            let result = self
                .page
                .goto(url)
                .and_then(|_| self.page.wait_for_load_state(LoadState::NetworkIdle));
            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, error = %e, "navigation attempt failed");
                    last_error = Some(e);
                    if attempt < max_retries {
                        self.page.pause(NAVIGATION_RETRY_PAUSE_MS)?;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| DriverError::SessionIO("navigation never attempted".into())))
    }

    /// Click, retrying up to `max_retries` times with a short pause.
    pub fn click_with_retry(&mut self, locator: &Locator, max_retries: u32) -> Result<(), DriverError> {
        let mut last_error = None;
        for attempt in 1..=max_retries.max(1) {
            match self.page.click(locator) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, %locator, error = %e, "click attempt failed");
                    last_error = Some(e);
                    if attempt < max_retries {
                        self.page.pause(CLICK_RETRY_PAUSE_MS)?;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| DriverError::SessionIO("click never attempted".into())))
    }

    /// Whether the element became visible within `timeout_ms`.
    pub fn wait_for_element_visible(&mut self, locator: &Locator, timeout_ms: u64) -> bool {
        match self.page.wait_visible(locator, timeout_ms) {
            Ok(true) => true,
            Ok(false) => {
                error!(%locator, "element not found");
                false
            }
            Err(e) => {
                error!(%locator, error = %e, "element not found");
                false
            }
        }
    }

    pub fn fill_form_field(&mut self, locator: &Locator, value: &str, field_name: &str) -> Result<(), DriverError> {
        match self.page.fill(locator, value) {
            Ok(()) => {
                info!(field = field_name, "field filled");
                Ok(())
            }
            Err(e) => {
                error!(field = field_name, error = %e, "failed to fill field");
                Err(e)
            }
        }
    }

    /// Whether the URL reached `pattern` within `timeout_ms`.
    pub fn wait_for_url_change(&mut self, pattern: &str, timeout_ms: u64) -> bool {
        match self.page.wait_for_url(pattern, timeout_ms) {
            Ok(()) => true,
            Err(e) => {
                let actual = self.page.current_url().unwrap_or_default();
                error!(expected = pattern, actual = %actual, error = %e, "URL change timeout");
                false
            }
        }
    }

    /// Full-page screenshot at `<dir>/<prefix>-<timestamp>.png`.
    pub fn take_timestamped_screenshot(&mut self, prefix: &str) -> Result<PathBuf, DriverError> {
        let stamp = screenshot_timestamp(chrono::Utc::now());
        let path = self.screenshot_dir.join(format!("{}-{}.png", prefix, stamp));
        self.page.screenshot(&path.display().to_string(), true)?;
        info!(path = %path.display(), "screenshot saved");
        Ok(path)
    }

    /// Fill the email and password boxes and press "Sign in".
    pub fn perform_login(&mut self, email: &str, password: &str) -> Result<(), DriverError> {
        let result = self
            .page
            .fill(&Locator::role("textbox", "email"), email)
            .and_then(|_| self.page.fill(&Locator::role("textbox", "password"), password))
            .and_then(|_| self.page.click(&Locator::role("button", "sign in")));

        match result {
            Ok(()) => {
                info!("login form submitted");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "login failed");
                Err(e)
            }
        }
    }

    pub fn select_from_dropdown(&mut self, dropdown: &Locator, option: &Locator) -> Result<(), DriverError> {
        self.page.click(dropdown)?;
        self.page.pause(DROPDOWN_OPEN_PAUSE_MS)?;
        self.page.click(option)?;
        info!(%option, "dropdown option selected");
        Ok(())
    }

    pub fn verify_elements_exist(&mut self, locators: &[Locator]) -> Vec<ElementCheck> {
        locators
            .iter()
            .map(|locator| {
                let (exists, error) = match self.page.wait_visible(locator, VERIFY_TIMEOUT_MS) {
                    Ok(true) => (true, None),
                    Ok(false) => (false, Some(format!("{} not visible", locator))),
                    Err(e) => (false, Some(e.to_string())),
                };
                if exists {
                    info!(%locator, "element verified");
                } else {
                    warn!(%locator, "element not found");
                }
                ElementCheck {
                    locator: locator.to_string(),
                    exists,
                    error,
                }
            })
            .collect()
    }

    /// Trimmed text of the element, empty when missing or on failure.
    pub fn extract_text(&mut self, locator: &Locator) -> String {
        match self.page.text_content(locator) {
            Ok(text) => text.map(|t| t.trim().to_string()).unwrap_or_default(),
            Err(e) => {
                error!(%locator, error = %e, "failed to extract text");
                String::new()
            }
        }
    }

    pub fn wait_for_page_load(&mut self) -> Result<(), DriverError> {
        self.page.wait_for_load_state(LoadState::NetworkIdle)?;
        self.page.wait_for_load_state(LoadState::DomContentLoaded)
    }
}

/// ISO-8601 timestamp with `:` and `.` replaced so it is filename-safe.
pub fn screenshot_timestamp(now: chrono::DateTime<chrono::Utc>) -> String {
    now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}
