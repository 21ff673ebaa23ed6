use crate::error::DriverError;
use crate::web::locator::{LoadState, Locator};

/// The browser-automation capability the suite drives.
///
/// Implemented by [`NodeBrowser`](crate::web::session::NodeBrowser) against
/// a real browser and by [`MockPage`](crate::web::mock::MockPage) in tests.
pub trait BrowserPage {
    fn goto(&mut self, url: &str) -> Result<(), DriverError>;

    fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), DriverError>;

    fn click(&mut self, locator: &Locator) -> Result<(), DriverError>;

    /// Wait until the page URL matches a glob pattern (see [`glob_match`](crate::web::locator::glob_match)).
    fn wait_for_url(&mut self, pattern: &str, timeout_ms: u64) -> Result<(), DriverError>;

    fn wait_for_load_state(&mut self, state: LoadState) -> Result<(), DriverError>;

    /// Wait until the element is visible. `Ok(false)` on timeout.
    fn wait_visible(&mut self, locator: &Locator, timeout_ms: u64) -> Result<bool, DriverError>;

    /// Text content of the first match, `None` if nothing matches.
    fn text_content(&mut self, locator: &Locator) -> Result<Option<String>, DriverError>;

    fn title(&mut self) -> Result<String, DriverError>;

    fn current_url(&mut self) -> Result<String, DriverError>;

    fn screenshot(&mut self, path: &str, full_page: bool) -> Result<(), DriverError>;

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), DriverError>;

    /// Fixed wait inside the browser (`waitForTimeout`).
    fn pause(&mut self, ms: u64) -> Result<(), DriverError>;

    fn close(&mut self) -> Result<(), DriverError>;
}
