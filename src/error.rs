use std::process::ExitStatus;

use thiserror::Error;

use crate::device::hierarchy::HierarchyError;

#[derive(Debug, Error)]
pub enum DriverError {
    /// External tool failed to spawn (adb or the Node.js browser server)
    #[error("Failed to spawn {program} (is it installed and on PATH?): {source}")]
    BridgeSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External tool exited with non-zero status
    #[error("`{command}` exited with {status}: {stderr}")]
    BridgeFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// Device id not listed by `adb devices`
    #[error("Device {0} not found")]
    DeviceNotFound(String),

    /// An operation needed a launched app but none was launched
    #[error("No app launched on device {0}")]
    NoAppLaunched(String),

    /// UI hierarchy dump could not be turned into elements
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// JSON parsing failed (browser server output)
    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization failed (request to the browser server)
    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Broken pipe, early EOF, or similar on the browser server streams
    #[error("Browser session I/O error: {0}")]
    SessionIO(String),

    /// Browser server answered ok=false or omitted a required field
    #[error("Browser command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    /// A wait on the browser side ran out of time
    #[error("Timed out after {timeout_ms}ms waiting for {waited_for}")]
    Timeout { waited_for: String, timeout_ms: u64 },

    /// A wait was cancelled through its token
    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),

    /// Element not found on screen or page
    #[error("Element '{element}' not found: {context}")]
    ElementNotFound { element: String, context: String },

    /// Local filesystem failure (screenshots, reports)
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DriverError {
    pub fn not_found(element: impl Into<String>, context: impl Into<String>) -> Self {
        DriverError::ElementNotFound {
            element: element.into(),
            context: context.into(),
        }
    }
}
