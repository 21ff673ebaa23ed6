use std::collections::HashMap;

use crate::error::DriverError;
use crate::web::locator::{LoadState, Locator, glob_match};
use crate::web::page::BrowserPage;

/// In-memory [`BrowserPage`] with scripted visibility, navigation and failures.
///
/// Every call is recorded as a short line ("goto <url>", "click <locator>",
/// ...) so tests can assert on the exact interaction sequence.
#[derive(Debug, Default)]
pub struct MockPage {
    url: String,
    title: String,
    visible: Vec<Locator>,
    texts: Vec<(Locator, String)>,
    click_navigations: Vec<(Locator, String)>,
    failures: HashMap<String, usize>,
    calls: Vec<String>,
    closed: bool,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_visible(mut self, locator: Locator) -> Self {
        self.visible.push(locator);
        self
    }

    pub fn with_text(mut self, locator: Locator, text: &str) -> Self {
        self.texts.push((locator, text.to_string()));
        self
    }

    /// Clicking `locator` moves the page to `url`.
    pub fn navigates_on_click(mut self, locator: Locator, url: &str) -> Self {
        self.click_navigations.push((locator, url.to_string()));
        self
    }

    /// The next `times` calls of `command` ("goto", "click", ...) fail.
    pub fn failing(mut self, command: &str, times: usize) -> Self {
        self.failures.insert(command.to_string(), times);
        self
    }

    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn record(&mut self, command: &str, detail: impl std::fmt::Display) -> Result<(), DriverError> {
        self.calls.push(format!("{} {}", command, detail).trim_end().to_string());
        if let Some(remaining) = self.failures.get_mut(command) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::SessionProtocol {
                    command: command.to_string(),
                    error: "scripted failure".into(),
                });
            }
        }
        Ok(())
    }
}

impl BrowserPage for MockPage {
    fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.record("goto", url)?;
        self.url = url.to_string();
        Ok(())
    }

    fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        self.record("fill", format!("{} = {}", locator, value))
    }

    fn click(&mut self, locator: &Locator) -> Result<(), DriverError> {
        self.record("click", locator)?;
        if let Some((_, url)) = self.click_navigations.iter().find(|(l, _)| l == locator) {
            self.url = url.clone();
        }
        Ok(())
    }

    fn wait_for_url(&mut self, pattern: &str, timeout_ms: u64) -> Result<(), DriverError> {
        self.record("wait_for_url", pattern)?;
        if glob_match(pattern, &self.url) {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                waited_for: format!("URL {}", pattern),
                timeout_ms,
            })
        }
    }

    fn wait_for_load_state(&mut self, state: LoadState) -> Result<(), DriverError> {
        self.record("wait_for_load_state", format!("{:?}", state))
    }

    fn wait_visible(&mut self, locator: &Locator, _timeout_ms: u64) -> Result<bool, DriverError> {
        self.record("wait_visible", locator)?;
        Ok(self.visible.contains(locator))
    }

    fn text_content(&mut self, locator: &Locator) -> Result<Option<String>, DriverError> {
        self.record("text_content", locator)?;
        Ok(self
            .texts
            .iter()
            .find(|(l, _)| l == locator)
            .map(|(_, t)| t.clone()))
    }

    fn title(&mut self) -> Result<String, DriverError> {
        self.record("title", "")?;
        Ok(self.title.clone())
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        self.record("current_url", "")?;
        Ok(self.url.clone())
    }

    fn screenshot(&mut self, path: &str, _full_page: bool) -> Result<(), DriverError> {
        self.record("screenshot", path)
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), DriverError> {
        self.record("set_viewport", format!("{}x{}", width, height))
    }

    fn pause(&mut self, ms: u64) -> Result<(), DriverError> {
        self.record("pause", ms)
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        Ok(())
    }
}
