use tracing::info;

use crate::cli::config::WebTimeouts;
use crate::error::DriverError;
use crate::web::locator::{LoadState, Locator};
use crate::web::page::BrowserPage;

const ADMIN_TITLE: &str = "MO Core Admin";
const ENVIRONMENT_SETTLE_MS: u64 = 2000;
const SEARCH_SETTLE_MS: u64 = 1000;

/// Selectors of the MO Core admin console.
pub mod selectors {
    use crate::web::locator::Locator;

    pub fn email_input() -> Locator {
        Locator::role("textbox", "Email")
    }

    pub fn password_input() -> Locator {
        Locator::role("textbox", "Password")
    }

    pub fn sign_in_button() -> Locator {
        Locator::role("button", "Sign in")
    }

    pub fn admin_heading() -> Locator {
        Locator::role("heading", "MO Core Admin")
    }

    pub fn welcome_heading() -> Locator {
        Locator::role("heading", "Welcome to MO Core Admin")
    }

    pub fn environment_dropdown() -> Locator {
        Locator::any_role("combobox")
    }

    pub fn environment_option(name: &str) -> Locator {
        Locator::role("option", name)
    }

    pub fn users_link() -> Locator {
        Locator::role_exact("link", "Users")
    }

    pub fn users_heading() -> Locator {
        Locator::role("heading", "Users")
    }

    pub fn search_input() -> Locator {
        Locator::css(r#"input[placeholder="Search email..."]"#)
    }

    pub fn user_button(user_id: &str) -> Locator {
        Locator::role("button", user_id)
    }

    pub fn onboard_device_heading() -> Locator {
        Locator::role("heading", "Onboard Device")
    }

    pub fn qr_code_image() -> Locator {
        Locator::css(r#"img[alt="QR Code"]"#)
    }

    pub fn user_information_heading() -> Locator {
        Locator::role("heading", "User Information")
    }
}

/// Absolute URL for `path` under `base_url`; absolute inputs pass through.
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Page object for the admin console, over any [`BrowserPage`].
pub struct AdminConsole<'a, P: BrowserPage> {
    page: &'a mut P,
    base_url: String,
    timeouts: WebTimeouts,
}

impl<'a, P: BrowserPage> AdminConsole<'a, P> {
    pub fn new(page: &'a mut P, base_url: &str, timeouts: WebTimeouts) -> Self {
        AdminConsole {
            page,
            base_url: base_url.to_string(),
            timeouts,
        }
    }

    pub fn resolve_url(&self, path: &str) -> String {
        resolve_url(&self.base_url, path)
    }

    pub fn navigate_to_login(&mut self) -> Result<(), DriverError> {
        let url = self.resolve_url("/");
        info!(%url, "opening admin console");
        self.page.goto(&url)?;
        self.page.wait_for_load_state(LoadState::NetworkIdle)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<(), DriverError> {
        self.page.fill(&selectors::email_input(), email)?;
        self.page.fill(&selectors::password_input(), password)?;
        self.page.click(&selectors::sign_in_button())?;
        let home = self.resolve_url("/");
        self.page.wait_for_url(&home, self.timeouts.login_ms)?;
        self.page.wait_for_load_state(LoadState::NetworkIdle)?;
        info!(email, "signed in");
        Ok(())
    }

    /// Title and main heading of the landing page.
    pub fn verify_home_page(&mut self) -> Result<(), DriverError> {
        let title = self.page.title()?;
        if !title.contains(ADMIN_TITLE) {
            return Err(DriverError::not_found(
                ADMIN_TITLE,
                format!("page title is '{}'", title),
            ));
        }
        self.expect_visible(&selectors::admin_heading(), "landing page")
    }

    pub fn verify_login_success(&mut self) -> Result<(), DriverError> {
        self.expect_visible(&selectors::welcome_heading(), "after login")
    }

    pub fn select_environment(&mut self, option_name: &str) -> Result<(), DriverError> {
        self.page.click(&selectors::environment_dropdown())?;
        self.page.click(&selectors::environment_option(option_name))?;
        self.page.pause(ENVIRONMENT_SETTLE_MS)?;
        info!(environment = option_name, "environment selected");
        Ok(())
    }

    /// The combobox shows `label` once the environment switched.
    pub fn verify_environment_selected(&mut self, label: &str) -> Result<(), DriverError> {
        let shown = selectors::environment_dropdown().within(Locator::text(label));
        self.expect_visible(&shown, "environment selector")
    }

    pub fn navigate_to_users(&mut self) -> Result<(), DriverError> {
        self.page.click(&selectors::users_link())?;
        self.page.wait_for_url("**/users", self.timeouts.navigation_ms)?;
        self.page.wait_for_load_state(LoadState::NetworkIdle)
    }

    pub fn verify_users_page_loaded(&mut self) -> Result<(), DriverError> {
        self.expect_visible(&selectors::users_heading(), "users page")
    }

    pub fn search_user(&mut self, email: &str) -> Result<(), DriverError> {
        self.page.fill(&selectors::search_input(), email)?;
        self.page.pause(SEARCH_SETTLE_MS)
    }

    /// Open a user by the id shown in the list, which may be an id suffix.
    pub fn click_user_by_id(&mut self, user_id: &str) -> Result<(), DriverError> {
        self.page.click(&selectors::user_button(user_id))?;
        self.page
            .wait_for_url(&format!("**/users/*{}", user_id), self.timeouts.navigation_ms)?;
        self.page.wait_for_load_state(LoadState::NetworkIdle)
    }

    pub fn verify_user_details_page(&mut self, email: &str) -> Result<(), DriverError> {
        self.expect_visible(&Locator::role("heading", email), "user details page")
    }

    pub fn verify_qr_code_section(&mut self) -> Result<(), DriverError> {
        self.expect_visible(&selectors::onboard_device_heading(), "user details page")?;
        self.expect_visible(&selectors::qr_code_image(), "onboard device section")
    }

    pub fn verify_user_information(&mut self) -> Result<(), DriverError> {
        self.expect_visible(&selectors::user_information_heading(), "user details page")
    }

    pub fn page_title(&mut self) -> Result<String, DriverError> {
        self.page.title()
    }

    pub fn current_url(&mut self) -> Result<String, DriverError> {
        self.page.current_url()
    }

    pub fn screenshot(&mut self, path: &str) -> Result<(), DriverError> {
        self.page.screenshot(path, true)
    }

    fn expect_visible(&mut self, locator: &Locator, context: &str) -> Result<(), DriverError> {
        if self.page.wait_visible(locator, self.timeouts.element_ms)? {
            Ok(())
        } else {
            Err(DriverError::not_found(locator.to_string(), context))
        }
    }
}
