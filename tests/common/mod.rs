#![allow(dead_code)]

pub mod fixtures;

use std::io::Write;
use std::sync::{Arc, Mutex};

use mo_e2e::device::bridge::ScriptedBridge;
use mo_e2e::device::driver::{DriverTimings, MobileDriver};

pub const DEVICE: &str = "emulator-5554";
pub const PACKAGE: &str = "com.pressingly.moneta.staging";

/// A bridge that reports [`DEVICE`] as attached.
pub fn attached_bridge() -> ScriptedBridge {
    ScriptedBridge::new().on("devices", &format!("List of devices attached\n{}\tdevice\n", DEVICE))
}

/// Focus line from `dumpsys window` with [`PACKAGE`] in front.
pub fn focused_on_app() -> String {
    format!(
        "  mCurrentFocus=Window{{a1b2c3 u0 {}/com.pressingly.moneta.MainActivity}}\n",
        PACKAGE
    )
}

pub fn connect(bridge: ScriptedBridge) -> MobileDriver<ScriptedBridge> {
    MobileDriver::connect(bridge, DEVICE, DriverTimings::immediate()).expect("device should be attached")
}

/// Log output collected by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn text(&self) -> String {
        let bytes = self.0.lock().expect("log buffer").clone();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return its result and log text.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, logs.text())
}
