use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::cli::config::{Credentials, Settings, WebTimeouts};
use crate::device::bridge::DeviceBridge;
use crate::device::driver::MobileDriver;
use crate::device::poll::{CancelToken, PollOutcome};
use crate::error::DriverError;
use crate::pages::admin::{AdminConsole, resolve_url};
use crate::pages::mobile::MobileApp;
use crate::scenario::context::TestContext;
use crate::scenario::scenario_model::{
    AssertionResult, MobileAssertion, MobileScenario, MobileStep, SwipeDirection, TestResult,
    WebAssertion, WebScenario, WebStep,
};
use crate::scenario::ScenarioError;
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{StepOutcome, TraceEvent};
use crate::web::helper::WebHelper;
use crate::web::page::BrowserPage;

const START_NAVIGATION_ATTEMPTS: u32 = 3;
const DEBUG_SCREENSHOT: &str = "mobile-debug-screen";

/// What the runner needs from the resolved configuration.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub base_url: String,
    pub credentials: Option<Credentials>,
    /// Dropdown option picked by `select_environment` without an argument
    pub environment_option: String,
    /// Label checked by `environment_selected` without an argument
    pub environment_label: String,
    pub web_timeouts: WebTimeouts,
    /// Viewport applied at the start of every web scenario
    pub viewport: (u32, u32),
    pub app_package: String,
    pub element_timeout: Duration,
    /// Wait for the screen title after a navigation tap
    pub nav_timeout: Duration,
    pub load_attempts: usize,
    pub screenshot_dir: PathBuf,
    /// Extra runs granted to a failing scenario
    pub retries: u32,
}

impl RunSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        RunSettings {
            base_url: settings.profile.base_url.clone(),
            credentials: settings.credentials.clone(),
            environment_option: settings.profile.option_name().to_string(),
            environment_label: settings.profile.environment_label.clone(),
            web_timeouts: settings.web.timeouts,
            viewport: (settings.web.browser.viewport_width, settings.web.browser.viewport_height),
            app_package: settings.app_package().to_string(),
            element_timeout: Duration::from_millis(settings.mobile.timeouts.element_wait_ms),
            nav_timeout: Duration::from_millis(settings.mobile.timeouts.nav_wait_ms),
            load_attempts: settings.mobile.load_attempts,
            screenshot_dir: PathBuf::from(&settings.run.screenshot_dir),
            retries: settings.retries,
        }
    }
}

/// Executes scenarios step-by-step against a browser page or a device.
pub struct ScenarioRunner<'t> {
    settings: RunSettings,
    tracer: &'t TraceLogger,
    token: CancelToken,
}

impl<'t> ScenarioRunner<'t> {
    pub fn new(settings: RunSettings, tracer: &'t TraceLogger, token: CancelToken) -> Self {
        ScenarioRunner {
            settings,
            tracer,
            token,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Run `attempt` until it passes or the retries are used up.
    ///
    /// The last attempt's result is returned with its attempt count.
    pub fn run_with_retries<F>(&self, mut attempt: F) -> TestResult
    where
        F: FnMut(u32) -> TestResult,
    {
        let max_attempts = self.settings.retries + 1;
        let mut n = 1;
        loop {
            let mut result = attempt(n);
            result.attempts = n;
            if result.passed || n >= max_attempts || self.token.is_cancelled() {
                return result;
            }
            warn!(
                scenario = %result.scenario_name,
                attempt = n,
                max_attempts,
                "scenario failed, retrying"
            );
            n += 1;
        }
    }

    // =========================================================================
    // Web
    // =========================================================================

    /// Run a web scenario. Assertion failures are recorded; an execution
    /// error stops the scenario.
    pub fn run_web<P: BrowserPage>(&self, scenario: &WebScenario, page: &mut P, attempt: u32) -> TestResult {
        let start = Instant::now();
        let mut ctx = TestContext::new();
        info!(scenario = %scenario.name, attempt, "running web scenario");

        let (width, height) = self.settings.viewport;
        if let Err(e) = page.set_viewport(width, height) {
            return self.finish(
                &scenario.name,
                "web",
                0,
                ctx,
                Some(format!("Failed to set viewport: {}", e)),
                start,
            );
        }

        if let Some(start_url) = &scenario.start_url {
            let url = resolve_url(&self.settings.base_url, start_url);
            let mut helper = WebHelper::new(&mut *page, &self.settings.screenshot_dir);
            if let Err(e) = helper.navigate_with_retry(&url, START_NAVIGATION_ATTEMPTS) {
                self.web_failure_screenshot(page, &scenario.name, &mut ctx);
                return self.finish(
                    &scenario.name,
                    "web",
                    0,
                    ctx,
                    Some(format!("Failed to navigate to start_url: {}", e)),
                    start,
                );
            }
        }

        for (i, step) in scenario.steps.iter().enumerate() {
            ctx.current_step = i;
            let step_start = Instant::now();
            let failed_before = ctx.fail_count();

            let result = self.execute_web_step(step, i, page, &mut ctx);
            self.trace_step(&scenario.name, attempt, i, step.action(), &result, &ctx, failed_before, step_start);

            if let Err(e) = result {
                self.web_failure_screenshot(page, &scenario.name, &mut ctx);
                return self.finish(
                    &scenario.name,
                    "web",
                    i + 1,
                    ctx,
                    Some(format!("Step {} ({}) failed: {}", i, step.action(), e)),
                    start,
                );
            }
        }

        self.finish(&scenario.name, "web", scenario.steps.len(), ctx, None, start)
    }

    fn execute_web_step<P: BrowserPage>(
        &self,
        step: &WebStep,
        step_index: usize,
        page: &mut P,
        ctx: &mut TestContext,
    ) -> Result<(), ScenarioError> {
        let timeouts = self.settings.web_timeouts;
        match step {
            WebStep::Goto { url } => {
                let url = resolve_url(&self.settings.base_url, url);
                WebHelper::new(page, &self.settings.screenshot_dir).navigate_with_retry(&url, 1)?;
                Ok(())
            }

            WebStep::Login => {
                let credentials = self
                    .settings
                    .credentials
                    .as_ref()
                    .ok_or(ScenarioError::MissingCredentials)?;
                let mut admin = AdminConsole::new(page, &self.settings.base_url, timeouts);
                admin.login(&credentials.email, &credentials.password)?;
                Ok(())
            }

            WebStep::SelectEnvironment { option } => {
                let option = option.as_deref().unwrap_or(&self.settings.environment_option);
                AdminConsole::new(page, &self.settings.base_url, timeouts).select_environment(option)?;
                Ok(())
            }

            WebStep::OpenUsers => {
                AdminConsole::new(page, &self.settings.base_url, timeouts).navigate_to_users()?;
                Ok(())
            }

            WebStep::SearchUser { email } => {
                AdminConsole::new(page, &self.settings.base_url, timeouts).search_user(email)?;
                Ok(())
            }

            WebStep::OpenUser { user_id } => {
                AdminConsole::new(page, &self.settings.base_url, timeouts).click_user_by_id(user_id)?;
                Ok(())
            }

            WebStep::Fill { locator, value } => {
                let field = locator.to_string();
                WebHelper::new(page, &self.settings.screenshot_dir).fill_form_field(locator, value, &field)?;
                Ok(())
            }

            WebStep::Click { locator } => {
                WebHelper::new(page, &self.settings.screenshot_dir).click_with_retry(locator, 1)?;
                Ok(())
            }

            WebStep::WaitForUrl { pattern, timeout_ms } => {
                page.wait_for_url(pattern, timeout_ms.unwrap_or(timeouts.navigation_ms))?;
                Ok(())
            }

            WebStep::Screenshot { name } => {
                let path = WebHelper::new(page, &self.settings.screenshot_dir).take_timestamped_screenshot(name)?;
                ctx.record_screenshot(path.display().to_string());
                Ok(())
            }

            WebStep::Pause { ms } => {
                page.pause(*ms)?;
                Ok(())
            }

            WebStep::Assert { assertions } => {
                for assertion in assertions {
                    let result = self.evaluate_web(assertion, step_index, page);
                    ctx.record_assertion(result);
                }
                Ok(())
            }
        }
    }

    fn evaluate_web<P: BrowserPage>(&self, assertion: &WebAssertion, step_index: usize, page: &mut P) -> AssertionResult {
        let timeouts = self.settings.web_timeouts;
        let check = assertion.to_string();

        let outcome: Result<(bool, Option<String>), DriverError> = match assertion {
            WebAssertion::Visible { locator } => page
                .wait_visible(locator, timeouts.element_ms)
                .map(|visible| (visible, Some(visible.to_string()))),

            WebAssertion::TitleContains { expected } => page
                .title()
                .map(|title| (title.contains(expected.as_str()), Some(title))),

            WebAssertion::UrlContains { expected } => page
                .current_url()
                .map(|url| (url.contains(expected.as_str()), Some(url))),

            WebAssertion::HomePageLoaded => AdminConsole::new(page, &self.settings.base_url, timeouts)
                .verify_home_page()
                .map(|_| (true, None)),

            WebAssertion::LoginSucceeded => AdminConsole::new(page, &self.settings.base_url, timeouts)
                .verify_login_success()
                .map(|_| (true, None)),

            WebAssertion::EnvironmentSelected { label } => {
                let label = label.as_deref().unwrap_or(&self.settings.environment_label);
                AdminConsole::new(page, &self.settings.base_url, timeouts)
                    .verify_environment_selected(label)
                    .map(|_| (true, None))
            }

            WebAssertion::UsersPageLoaded => AdminConsole::new(page, &self.settings.base_url, timeouts)
                .verify_users_page_loaded()
                .map(|_| (true, None)),

            WebAssertion::UserDetails { email } => AdminConsole::new(page, &self.settings.base_url, timeouts)
                .verify_user_details_page(email)
                .map(|_| (true, None)),

            WebAssertion::QrCodeSection => AdminConsole::new(page, &self.settings.base_url, timeouts)
                .verify_qr_code_section()
                .map(|_| (true, None)),

            WebAssertion::UserInformation => AdminConsole::new(page, &self.settings.base_url, timeouts)
                .verify_user_information()
                .map(|_| (true, None)),
        };

        assertion_result(step_index, check, outcome)
    }

    fn web_failure_screenshot<P: BrowserPage>(&self, page: &mut P, scenario: &str, ctx: &mut TestContext) {
        let prefix = format!("failure-{}", sanitize_filename(scenario));
        match WebHelper::new(page, &self.settings.screenshot_dir).take_timestamped_screenshot(&prefix) {
            Ok(path) => ctx.record_screenshot(path.display().to_string()),
            Err(e) => warn!(error = %e, "failure screenshot not taken"),
        }
    }

    // =========================================================================
    // Mobile
    // =========================================================================

    /// Run a mobile scenario on a connected driver.
    pub fn run_mobile<B: DeviceBridge>(
        &self,
        scenario: &MobileScenario,
        driver: &mut MobileDriver<B>,
        attempt: u32,
    ) -> TestResult {
        let start = Instant::now();
        let mut ctx = TestContext::new();
        let package = scenario
            .app_package
            .clone()
            .unwrap_or_else(|| self.settings.app_package.clone());
        info!(scenario = %scenario.name, attempt, package = %package, "running mobile scenario");

        let mut app = MobileApp::new(driver, self.settings.element_timeout, self.token.clone())
            .with_nav_timeout(self.settings.nav_timeout);

        for (i, step) in scenario.steps.iter().enumerate() {
            ctx.current_step = i;
            let step_start = Instant::now();
            let failed_before = ctx.fail_count();

            let result = self.execute_mobile_step(step, i, &package, &mut app, &mut ctx);
            self.trace_step(&scenario.name, attempt, i, step.action(), &result, &ctx, failed_before, step_start);

            if let Err(e) = result {
                let path = self
                    .settings
                    .screenshot_dir
                    .join(format!("failure-{}.png", sanitize_filename(&scenario.name)));
                match app.screenshot(&path) {
                    Ok(()) => ctx.record_screenshot(path.display().to_string()),
                    Err(shot) => warn!(error = %shot, "failure screenshot not taken"),
                }
                return self.finish(
                    &scenario.name,
                    "mobile",
                    i + 1,
                    ctx,
                    Some(format!("Step {} ({}) failed: {}", i, step.action(), e)),
                    start,
                );
            }
        }

        self.finish(&scenario.name, "mobile", scenario.steps.len(), ctx, None, start)
    }

    fn execute_mobile_step<B: DeviceBridge>(
        &self,
        step: &MobileStep,
        step_index: usize,
        package: &str,
        app: &mut MobileApp<'_, B>,
        ctx: &mut TestContext,
    ) -> Result<(), ScenarioError> {
        match step {
            MobileStep::LaunchApp => {
                app.launch_app(package)?;
                Ok(())
            }

            MobileStep::WaitForApp { attempts } => {
                let attempts = attempts.unwrap_or(self.settings.load_attempts);
                match app.wait_until_loaded(attempts) {
                    PollOutcome::Found { value, .. } => {
                        info!(elements = value, "app ready");
                        Ok(())
                    }
                    // A slow app is not fatal; later steps decide.
                    PollOutcome::TimedOut { attempts } => {
                        warn!(attempts, "app may not be fully loaded, continuing");
                        Ok(())
                    }
                    PollOutcome::Cancelled { .. } => Err(ScenarioError::Cancelled),
                }
            }

            MobileStep::Tap { x, y } => {
                app.driver().tap(*x, *y)?;
                Ok(())
            }

            MobileStep::TapText { text, fallback } => {
                let method = app.tap_with_fallback(text, fallback.map(|[x, y]| (x, y)))?;
                info!(text = %text, ?method, "tapped");
                Ok(())
            }

            MobileStep::Navigate { to } => {
                app.tap_nav(*to)?;
                Ok(())
            }

            MobileStep::WaitForElement { text, timeout_ms } => {
                let timeout = timeout_ms
                    .map(Duration::from_millis)
                    .unwrap_or(self.settings.element_timeout);
                app.wait_for(text, timeout)?;
                Ok(())
            }

            MobileStep::Swipe { direction } => {
                match direction {
                    SwipeDirection::Up => app.swipe_up()?,
                    SwipeDirection::Down => app.swipe_down()?,
                }
                Ok(())
            }

            MobileStep::TypeText { text } => {
                app.driver().type_text(text)?;
                Ok(())
            }

            MobileStep::Back => {
                app.driver().press_back()?;
                Ok(())
            }

            MobileStep::Pause { ms } => {
                if self.token.sleep(Duration::from_millis(*ms)) {
                    Ok(())
                } else {
                    Err(ScenarioError::Cancelled)
                }
            }

            MobileStep::Screenshot { name } => {
                let path = self.settings.screenshot_dir.join(format!("{}.png", name));
                app.screenshot(&path)?;
                ctx.record_screenshot(path.display().to_string());
                Ok(())
            }

            MobileStep::TogglePolicy { policy } => {
                let method = app.toggle_policy(*policy)?;
                info!(policy = policy.label(), ?method, "policy toggled");
                Ok(())
            }

            MobileStep::LogElements { min_elements } => {
                let mut elements = app.driver().screen_elements(true)?;
                info!(found = elements.len(), "fresh UI dump");

                if let Some(min) = min_elements.filter(|&min| elements.len() < min) {
                    warn!(found = elements.len(), min, "low element count, collecting diagnostics");
                    app.driver().debug_state();

                    let path = self.settings.screenshot_dir.join(format!("{}.png", DEBUG_SCREENSHOT));
                    match app.screenshot(&path) {
                        Ok(()) => ctx.record_screenshot(path.display().to_string()),
                        Err(e) => warn!(error = %e, "debug screenshot not taken"),
                    }

                    if !self.token.sleep(app.driver().timings().launch_settle) {
                        return Err(ScenarioError::Cancelled);
                    }
                    let retry = app.driver().screen_elements(true)?;
                    info!(found = retry.len(), "UI dump after retry");
                    if retry.len() > elements.len() {
                        elements = retry;
                    }
                }

                app.driver().log_elements(&elements);
                Ok(())
            }

            MobileStep::Assert { assertions } => {
                for assertion in assertions {
                    let outcome = match assertion {
                        MobileAssertion::ElementExists { label } => app.verify_element_exists(label),
                        MobileAssertion::UserSignedIn { label } => app.verify_app_launched(label),
                        MobileAssertion::Organization { name } => app.verify_organization(name),
                        MobileAssertion::PreferencesPage => app.verify_preferences_page(),
                        MobileAssertion::PolicySwitch { label } => app.verify_policy_switch(label),
                    };
                    ctx.record_assertion(assertion_result(
                        step_index,
                        assertion.to_string(),
                        outcome.map(|_| (true, None)),
                    ));
                }
                Ok(())
            }
        }
    }

    // =========================================================================
    // Shared
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    fn trace_step(
        &self,
        scenario: &str,
        attempt: u32,
        step: usize,
        action: &str,
        result: &Result<(), ScenarioError>,
        ctx: &TestContext,
        failed_before: usize,
        started: Instant,
    ) {
        let mut event = TraceEvent::now(scenario, attempt, step, action)
            .with_duration(started.elapsed().as_millis());
        match result {
            Err(e) => event = event.with_outcome(StepOutcome::Error).with_detail(e),
            Ok(()) if ctx.fail_count() > failed_before => {
                event = event
                    .with_outcome(StepOutcome::AssertionFailed)
                    .with_detail(format!("{} assertion(s) failed", ctx.fail_count() - failed_before));
            }
            Ok(()) => {}
        }
        self.tracer.log(&event);
    }

    fn finish(
        &self,
        name: &str,
        platform: &str,
        steps_run: usize,
        ctx: TestContext,
        error: Option<String>,
        started: Instant,
    ) -> TestResult {
        let passed = error.is_none() && ctx.all_passed();
        if passed {
            info!(scenario = name, "scenario passed");
        } else {
            warn!(scenario = name, error = error.as_deref().unwrap_or("assertion failures"), "scenario failed");
        }
        TestResult {
            scenario_name: name.to_string(),
            platform: platform.to_string(),
            passed,
            steps_run,
            attempts: 1,
            assertion_results: ctx.assertion_results,
            error,
            duration_ms: Some(started.elapsed().as_millis()),
            screenshots: ctx.screenshots,
        }
    }
}

fn assertion_result(
    step_index: usize,
    check: String,
    outcome: Result<(bool, Option<String>), DriverError>,
) -> AssertionResult {
    match outcome {
        Ok((passed, actual)) => AssertionResult {
            step_index,
            message: if passed { None } else { Some(format!("Expected {}", check)) },
            check,
            passed,
            actual,
        },
        Err(e) => AssertionResult {
            step_index,
            check,
            passed: false,
            actual: None,
            message: Some(e.to_string()),
        },
    }
}

/// Sanitize a scenario name into a safe filename.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .to_lowercase()
}
