use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::device::bridge::{DeviceBridge, args};
use crate::device::element::Element;
use crate::device::hierarchy::parse_hierarchy;
use crate::device::poll::{CancelToken, PollOutcome, Poller};
use crate::error::DriverError;

/// An app counts as loaded once more than this many elements carry content.
pub const MIN_LOADED_ELEMENTS: usize = 5;

const DUMP_PATH: &str = "/sdcard/window_dump.xml";
const LAUNCHER_CATEGORY: &str = "android.intent.category.LAUNCHER";
const MAIN_ACTION: &str = "android.intent.action.MAIN";
/// FLAG_ACTIVITY_NEW_TASK | FLAG_ACTIVITY_RESET_TASK_IF_NEEDED
const BRING_TO_FRONT_FLAGS: &str = "0x10200000";
const KEYCODE_BACK: &str = "4";

/// Fixed delays used by the driver. Set once per session, not per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverTimings {
    /// Pause after every tap so the UI can react
    pub tap_settle: Duration,
    /// Interval between attempts in `wait_for_element`
    pub poll_interval: Duration,
    /// Pause between `uiautomator dump` and reading the file back
    pub dump_settle: Duration,
    /// Pause after launching the app
    pub launch_settle: Duration,
    /// Pause after bringing the app to the foreground
    pub foreground_settle: Duration,
    /// Pause at the start of each `wait_for_app_to_load` attempt
    pub load_attempt_delay: Duration,
}

impl Default for DriverTimings {
    fn default() -> Self {
        DriverTimings {
            tap_settle: Duration::from_millis(1000),
            poll_interval: Duration::from_millis(2000),
            dump_settle: Duration::from_millis(500),
            launch_settle: Duration::from_millis(5000),
            foreground_settle: Duration::from_millis(3000),
            load_attempt_delay: Duration::from_millis(3000),
        }
    }
}

impl DriverTimings {
    /// All delays zero; the poll interval is kept so timeouts stay meaningful.
    pub fn immediate() -> Self {
        DriverTimings {
            tap_settle: Duration::ZERO,
            poll_interval: Duration::from_millis(10),
            dump_settle: Duration::ZERO,
            launch_settle: Duration::ZERO,
            foreground_settle: Duration::ZERO,
            load_attempt_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSession {
    pub device_id: String,
    pub app_package: Option<String>,
    /// Activity used to bring the app back to the front, e.g. ".MainActivity"
    pub app_activity: String,
    pub connected: bool,
}

/// Best-effort snapshot of what the device is doing, for diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceState {
    pub current_focus: Option<String>,
    pub running_activities: Option<String>,
    pub app_process_running: bool,
    pub screen_size: Option<String>,
}

/// Drives one Android device through the device bridge.
pub struct MobileDriver<B: DeviceBridge> {
    bridge: B,
    session: DeviceSession,
    timings: DriverTimings,
}

impl<B: DeviceBridge> MobileDriver<B> {
    /// Check that `device_id` is attached and open a session on it.
    pub fn connect(bridge: B, device_id: &str, timings: DriverTimings) -> Result<Self, DriverError> {
        let listing = bridge.exec_text(&args(["devices"]))?;
        let attached = listing
            .lines()
            .skip(1)
            .filter_map(|l| l.split_whitespace().next())
            .any(|id| id == device_id);

        if !attached {
            return Err(DriverError::DeviceNotFound(device_id.to_string()));
        }

        info!(device = device_id, "mobile device initialized");
        Ok(MobileDriver {
            bridge,
            session: DeviceSession {
                device_id: device_id.to_string(),
                app_package: None,
                app_activity: ".MainActivity".to_string(),
                connected: true,
            },
            timings,
        })
    }

    pub fn with_activity(mut self, activity: &str) -> Self {
        self.session.app_activity = activity.to_string();
        self
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn timings(&self) -> &DriverTimings {
        &self.timings
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Run `adb -s <device> <parts...>`.
    fn device_cmd<I, S>(&self, parts: I) -> Result<String, DriverError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bridge.exec_text(&self.device_args(parts))
    }

    fn device_args<I, S>(&self, parts: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut full = args(["-s", self.session.device_id.as_str()]);
        full.extend(parts.into_iter().map(Into::into));
        full
    }

    fn settle(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    fn package(&self) -> Result<&str, DriverError> {
        self.session
            .app_package
            .as_deref()
            .ok_or_else(|| DriverError::NoAppLaunched(self.session.device_id.clone()))
    }

    // =========================================================================
    // App lifecycle
    // =========================================================================

    /// Launch `package` through its launcher activity, falling back to monkey.
    pub fn launch_app(&mut self, package: &str) -> Result<(), DriverError> {
        self.session.app_package = Some(package.to_string());
        info!(package, "launching app");

        match self.resolve_launcher_activity(package) {
            Some(activity) => {
                self.device_cmd([
                    "shell", "am", "start", "-n", activity.as_str(), "-a", MAIN_ACTION, "-c",
                    LAUNCHER_CATEGORY,
                ])?;
                info!(%activity, "app launched with activity");
            }
            None => {
                warn!("falling back to generic app launch");
                self.device_cmd(["shell", "monkey", "-p", package, "-c", LAUNCHER_CATEGORY, "1"])?;
                info!("app launched using monkey");
            }
        }

        self.settle(self.timings.launch_settle);

        if !self.is_app_in_foreground() {
            warn!("app not in foreground, bringing it to front");
            self.bring_to_front()?;
            self.settle(self.timings.foreground_settle);
        }

        info!(package, "app launched");
        Ok(())
    }

    fn resolve_launcher_activity(&self, package: &str) -> Option<String> {
        let out = match self.device_cmd([
            "shell",
            "cmd",
            "package",
            "resolve-activity",
            "--brief",
            package,
        ]) {
            Ok(out) => out,
            Err(e) => {
                debug!(error = %e, "resolve-activity failed");
                return None;
            }
        };

        let activity = out.lines().map(str::trim).filter(|l| !l.is_empty()).last()?;
        if activity.contains("No activity found") {
            return None;
        }
        Some(activity.to_string())
    }

    fn bring_to_front(&self) -> Result<(), DriverError> {
        let package = self.package()?;
        let component = format!("{}/{}", package, self.session.app_activity);
        self.device_cmd(["shell", "am", "start", "-n", component.as_str(), "-f", BRING_TO_FRONT_FLAGS])?;
        Ok(())
    }

    /// Whether the launched app owns window focus. Any failure reads as `false`.
    pub fn is_app_in_foreground(&self) -> bool {
        let Some(package) = self.session.app_package.as_deref() else {
            return false;
        };

        let focus = match self.current_focus() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "could not verify app foreground status");
                return false;
            }
        };

        let in_front = focus.contains(package);
        debug!(in_front, "app foreground status");
        if !in_front {
            debug!(focus = %focus, "current focus");
        }
        in_front
    }

    fn current_focus(&self) -> Result<String, DriverError> {
        let out = self.device_cmd(["shell", "dumpsys", "window"])?;
        Ok(out
            .lines()
            .filter(|l| l.contains("mCurrentFocus"))
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Poll until the app is foregrounded and shows enough content.
    ///
    /// Each attempt waits `load_attempt_delay` first. Between failed
    /// attempts the activity is restarted. `Found` carries the number of
    /// content-bearing elements seen.
    pub fn wait_for_app_to_load(&self, max_attempts: usize, token: &CancelToken) -> PollOutcome<usize> {
        info!(max_attempts, "waiting for app to fully load");

        for attempt in 1..=max_attempts {
            if !token.sleep(self.timings.load_attempt_delay) {
                return PollOutcome::Cancelled { attempts: attempt - 1 };
            }

            if self.is_app_in_foreground() {
                let elements = self.screen_elements(false).unwrap_or_else(|e| {
                    warn!(error = %e, "screen dump failed during load check");
                    Vec::new()
                });
                let with_content = elements.iter().filter(|e| e.has_content()).count();
                debug!(
                    attempt,
                    total = elements.len(),
                    with_content,
                    "load check"
                );

                if with_content > MIN_LOADED_ELEMENTS {
                    info!(attempt, "app loaded with sufficient UI content");
                    return PollOutcome::Found {
                        value: with_content,
                        attempts: attempt,
                    };
                }
                debug!(attempt, max_attempts, "insufficient UI content, retrying");
            } else {
                debug!(attempt, max_attempts, "app not in foreground, retrying");
            }

            if attempt < max_attempts {
                match self.bring_to_front() {
                    Ok(()) => debug!("attempted to reactivate app"),
                    Err(e) => warn!(error = %e, "failed to reactivate app"),
                }
            }
        }

        warn!("app may not be fully loaded");
        PollOutcome::TimedOut {
            attempts: max_attempts,
        }
    }

    /// Force-stop the launched app. Safe to call more than once.
    pub fn cleanup(&mut self) {
        let Some(package) = self.session.app_package.clone() else {
            return;
        };
        match self.device_cmd(["shell", "am", "force-stop", package.as_str()]) {
            Ok(_) => info!(package = %package, "mobile session cleaned up"),
            Err(e) => warn!(error = %e, "failed to clean up mobile session"),
        }
        self.session.connected = false;
    }

    pub fn is_package_installed(&self, package: &str) -> Result<bool, DriverError> {
        let out = self.device_cmd(["shell", "pm", "list", "packages", package])?;
        let wanted = format!("package:{}", package);
        Ok(out.lines().any(|l| l.trim() == wanted))
    }

    pub fn install_app(&self, apk_path: &Path) -> Result<(), DriverError> {
        let apk = apk_path.display().to_string();
        self.device_cmd(["install", "-r", apk.as_str()])?;
        info!(apk = %apk, "app installed");
        Ok(())
    }

    // =========================================================================
    // Screen inspection
    // =========================================================================

    /// Dump the on-screen hierarchy and parse it.
    pub fn screen_elements(&self, force_refresh: bool) -> Result<Vec<Element>, DriverError> {
        if force_refresh {
            // A missing file is fine here.
            let _ = self.device_cmd(["shell", "rm", DUMP_PATH]);
        }

        self.device_cmd(["shell", "uiautomator", "dump", "--compressed=false"])?;
        self.settle(self.timings.dump_settle);

        let mut dump = self.device_cmd(["shell", "cat", DUMP_PATH])?;
        if dump.trim().is_empty() {
            warn!("empty UI dump, trying exec-out");
            dump = self.device_cmd(["exec-out", "uiautomator", "dump", "/dev/fd/1"])?;
        }

        let parsed = parse_hierarchy(&dump)?;
        for rejected in &parsed.rejected {
            warn!(error = %rejected, "skipping node");
        }
        debug!(
            count = parsed.elements.len(),
            rejected = parsed.rejected.len(),
            "UI elements on screen"
        );
        Ok(parsed.elements)
    }

    /// Elements whose label, text or content-desc contains `text`, ignoring case.
    pub fn find_elements_by_text(&self, text: &str) -> Result<Vec<Element>, DriverError> {
        Ok(self
            .screen_elements(false)?
            .into_iter()
            .filter(|e| e.matches_text(text))
            .collect())
    }

    pub fn element_exists_by_text(&self, text: &str) -> Result<bool, DriverError> {
        Ok(!self.find_elements_by_text(text)?.is_empty())
    }

    /// Poll fresh dumps until an element matching `text` appears.
    ///
    /// A failed dump counts as a miss. The first match in document order wins.
    pub fn wait_for_element(&self, text: &str, timeout: Duration, token: &CancelToken) -> PollOutcome<Element> {
        let poller = Poller::new(self.timings.poll_interval, timeout);

        let outcome = poller.poll(token, |attempt| {
            let found = match self.screen_elements(false) {
                Ok(elements) => elements.into_iter().find(|e| e.matches_text(text)),
                Err(e) => {
                    warn!(error = %e, attempt, "screen dump failed while waiting");
                    None
                }
            };
            if found.is_none() {
                debug!(text, attempt, "waiting for element");
            }
            found
        });

        match &outcome {
            PollOutcome::Found { attempts, .. } => info!(text, attempts, "element found"),
            PollOutcome::TimedOut { attempts } => {
                warn!(text, attempts, "element not found within timeout")
            }
            PollOutcome::Cancelled { attempts } => info!(text, attempts, "wait cancelled"),
        }
        outcome
    }

    /// Info-log every element on screen.
    pub fn log_all_elements(&self) -> Result<Vec<Element>, DriverError> {
        let elements = self.screen_elements(false)?;
        self.log_elements(&elements);
        Ok(elements)
    }

    /// Info-log `elements` with index, kind, label and center.
    pub fn log_elements(&self, elements: &[Element]) {
        info!(device = %self.session.device_id, total = elements.len(), "screen elements");
        for (i, el) in elements.iter().enumerate() {
            let label = if el.label.is_empty() { "No text" } else { el.label.as_str() };
            info!(
                "  {}. {}: \"{}\" at ({}, {})",
                i + 1,
                el.kind,
                label,
                el.bounds.center_x,
                el.bounds.center_y
            );
        }
    }

    /// Collect focus, activity, process and screen size, each best-effort.
    pub fn debug_state(&self) -> DeviceState {
        let mut state = DeviceState {
            current_focus: self.current_focus().ok(),
            ..DeviceState::default()
        };

        state.running_activities = self
            .device_cmd(["shell", "dumpsys", "activity", "activities"])
            .ok()
            .map(|out| {
                out.lines()
                    .filter(|l| l.contains("Running activities"))
                    .map(str::trim)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .filter(|s| !s.is_empty());

        if let Some(package) = self.session.app_package.as_deref() {
            state.app_process_running = self
                .device_cmd(["shell", "ps"])
                .map(|out| out.lines().any(|l| l.contains(package)))
                .unwrap_or(false);
        }

        state.screen_size = self
            .device_cmd(["shell", "wm", "size"])
            .ok()
            .map(|s| s.trim().to_string());

        info!(?state, "device state");
        state
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// Tap raw screen coordinates, then wait the tap settle delay.
    pub fn tap(&self, x: u32, y: u32) -> Result<(), DriverError> {
        let (xs, ys) = (x.to_string(), y.to_string());
        self.device_cmd(["shell", "input", "tap", xs.as_str(), ys.as_str()])?;
        info!(x, y, "tapped");
        self.settle(self.timings.tap_settle);
        Ok(())
    }

    /// Tap the center of the first element matching `text`.
    ///
    /// Returns `Ok(false)` without tapping when nothing matches.
    pub fn tap_by_text(&self, text: &str) -> Result<bool, DriverError> {
        let matches = self.find_elements_by_text(text)?;

        let Some(first) = matches.first() else {
            warn!(text, "no element found to tap");
            return Ok(false);
        };

        if matches.len() > 1 {
            warn!(text, count = matches.len(), "multiple elements match, using first one");
        }

        let (x, y) = first.center();
        info!(text, x, y, "tapping element");
        self.tap(x, y)?;
        Ok(true)
    }

    /// Tap the center of the first element whose label contains `label` (case-sensitive).
    pub fn tap_element_by_label(&self, label: &str) -> Result<(), DriverError> {
        let elements = self.screen_elements(false)?;
        let element = elements
            .iter()
            .find(|e| !e.label.is_empty() && e.label.contains(label))
            .ok_or_else(|| DriverError::not_found(label, "no element with this label on screen"))?;
        let (x, y) = element.center();
        self.tap(x, y)
    }

    pub fn swipe(&self, from: (u32, u32), to: (u32, u32), duration_ms: u64) -> Result<(), DriverError> {
        let parts = [
            from.0.to_string(),
            from.1.to_string(),
            to.0.to_string(),
            to.1.to_string(),
            duration_ms.to_string(),
        ];
        let mut cmd = vec!["shell".to_string(), "input".into(), "swipe".into()];
        cmd.extend(parts);
        self.device_cmd(cmd)?;
        info!(?from, ?to, "swiped");
        Ok(())
    }

    pub fn type_text(&self, text: &str) -> Result<(), DriverError> {
        let escaped = escape_input_text(text);
        self.device_cmd(["shell", "input", "text", escaped.as_str()])?;
        info!(text, "typed text");
        Ok(())
    }

    pub fn press_back(&self) -> Result<(), DriverError> {
        self.device_cmd(["shell", "input", "keyevent", KEYCODE_BACK])?;
        info!("back button pressed");
        Ok(())
    }

    /// Capture the screen as PNG into `path`.
    pub fn take_screenshot(&self, path: &Path) -> Result<(), DriverError> {
        let png = self
            .bridge
            .exec(&self.device_args(["exec-out", "screencap", "-p"]))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DriverError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, &png).map_err(|e| DriverError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        info!(path = %path.display(), "screenshot saved");
        Ok(())
    }
}

/// Escape text for `input text`, which runs through the device shell.
pub fn escape_input_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' ' => out.push_str("%s"),
            '\\' | '\'' | '"' | '&' | '|' | ';' | '<' | '>' | '(' | ')' | '$' | '`' | '*' | '~' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
