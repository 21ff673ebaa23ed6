use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DriverError;
use crate::web::locator::{LoadState, Locator};
use crate::web::page::BrowserPage;

/// Request sent to browser_server.js over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BrowserRequest<'a> {
    Goto {
        url: &'a str,
    },
    Fill {
        locator: &'a Locator,
        value: &'a str,
    },
    Click {
        locator: &'a Locator,
    },
    WaitForUrl {
        pattern: &'a str,
        timeout_ms: u64,
    },
    WaitForLoadState {
        state: LoadState,
    },
    WaitVisible {
        locator: &'a Locator,
        timeout_ms: u64,
    },
    TextContent {
        locator: &'a Locator,
    },
    Title,
    CurrentUrl,
    Screenshot {
        path: &'a str,
        full_page: bool,
    },
    SetViewport {
        width: u32,
        height: u32,
    },
    Pause {
        ms: u64,
    },
    Quit,
}

impl BrowserRequest<'_> {
    fn name(&self) -> &'static str {
        match self {
            BrowserRequest::Goto { .. } => "goto",
            BrowserRequest::Fill { .. } => "fill",
            BrowserRequest::Click { .. } => "click",
            BrowserRequest::WaitForUrl { .. } => "wait_for_url",
            BrowserRequest::WaitForLoadState { .. } => "wait_for_load_state",
            BrowserRequest::WaitVisible { .. } => "wait_visible",
            BrowserRequest::TextContent { .. } => "text_content",
            BrowserRequest::Title => "title",
            BrowserRequest::CurrentUrl => "current_url",
            BrowserRequest::Screenshot { .. } => "screenshot",
            BrowserRequest::SetViewport { .. } => "set_viewport",
            BrowserRequest::Pause { .. } => "pause",
            BrowserRequest::Quit => "quit",
        }
    }
}

/// Response received from browser_server.js over stdout (one JSON line).
#[derive(Debug, Default, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub timed_out: Option<bool>,
}

/// How to start the browser server.
#[derive(Debug, Clone, Serialize)]
pub struct BrowserOptions {
    #[serde(skip)]
    pub node: String,
    #[serde(skip)]
    pub script: String,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub slow_mo_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub action_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        BrowserOptions {
            node: "node".into(),
            script: "node/browser_server.js".into(),
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            slow_mo_ms: 100,
            base_url: None,
            action_timeout_ms: 60_000,
            navigation_timeout_ms: 60_000,
        }
    }
}

/// A persistent Playwright browser driven through browser_server.js.
///
/// The Node.js process keeps one Chromium page open. Commands go out as
/// NDJSON over stdin, responses come back one line each over stdout.
pub struct NodeBrowser {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    closed: bool,
}

impl NodeBrowser {
    /// Spawn the browser server and wait for its ready line.
    pub fn launch(options: &BrowserOptions) -> Result<Self, DriverError> {
        let launch_json = serde_json::to_string(options).map_err(|e| DriverError::JsonSerialize {
            context: "BrowserOptions".into(),
            source: e,
        })?;

        let mut child = Command::new(&options.node)
            .arg(&options.script)
            .arg(&launch_json)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DriverError::BridgeSpawn {
                program: format!("{} {}", options.node, options.script),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            DriverError::SessionIO("Failed to capture stdin of browser_server.js".into())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            DriverError::SessionIO("Failed to capture stdout of browser_server.js".into())
        })?;

        let mut browser = NodeBrowser {
            child,
            stdin,
            reader: BufReader::new(stdout),
            closed: false,
        };

        let response = browser.read_response("browser_server.js ready signal")?;
        if !response.ok || response.ready != Some(true) {
            return Err(DriverError::SessionProtocol {
                command: "launch".into(),
                error: response
                    .error
                    .unwrap_or_else(|| "Did not receive ready signal from browser_server.js".into()),
            });
        }

        debug!(headless = options.headless, "browser session ready");
        Ok(browser)
    }

    fn read_response(&mut self, context: &str) -> Result<BrowserResponse, DriverError> {
        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(|e| {
            DriverError::SessionIO(format!("Failed to read from browser_server.js stdout: {}", e))
        })?;

        if line.trim().is_empty() {
            return Err(DriverError::SessionIO(
                "Empty response from browser_server.js (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| DriverError::JsonParse {
            context: context.into(),
            source: e,
        })
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest<'_>) -> Result<BrowserResponse, DriverError> {
        let json = serde_json::to_string(request).map_err(|e| DriverError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;
        debug!(cmd = request.name(), "browser request");

        writeln!(self.stdin, "{}", json).map_err(|e| {
            DriverError::SessionIO(format!("Failed to write to browser_server.js stdin: {}", e))
        })?;
        self.stdin.flush().map_err(|e| {
            DriverError::SessionIO(format!("Failed to flush browser_server.js stdin: {}", e))
        })?;

        self.read_response("browser_server.js response")
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest<'_>) -> Result<BrowserResponse, DriverError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(DriverError::SessionProtocol {
                command: request.name().into(),
                error: response.error.unwrap_or_else(|| "Unknown error".into()),
            });
        }
        Ok(response)
    }

    fn missing(command: &str, field: &str) -> DriverError {
        DriverError::SessionProtocol {
            command: command.into(),
            error: format!("No {} in response", field),
        }
    }
}

impl BrowserPage for NodeBrowser {
    fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::Goto { url })?;
        Ok(())
    }

    fn fill(&mut self, locator: &Locator, value: &str) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::Fill { locator, value })?;
        Ok(())
    }

    fn click(&mut self, locator: &Locator) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::Click { locator })?;
        Ok(())
    }

    fn wait_for_url(&mut self, pattern: &str, timeout_ms: u64) -> Result<(), DriverError> {
        let response = self.send_ok(&BrowserRequest::WaitForUrl { pattern, timeout_ms })?;
        if response.timed_out == Some(true) {
            return Err(DriverError::Timeout {
                waited_for: format!("URL {}", pattern),
                timeout_ms,
            });
        }
        Ok(())
    }

    fn wait_for_load_state(&mut self, state: LoadState) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::WaitForLoadState { state })?;
        Ok(())
    }

    fn wait_visible(&mut self, locator: &Locator, timeout_ms: u64) -> Result<bool, DriverError> {
        let response = self.send_ok(&BrowserRequest::WaitVisible { locator, timeout_ms })?;
        Ok(response.visible.unwrap_or(false))
    }

    fn text_content(&mut self, locator: &Locator) -> Result<Option<String>, DriverError> {
        let response = self.send_ok(&BrowserRequest::TextContent { locator })?;
        Ok(response.text)
    }

    fn title(&mut self) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::Title)?;
        response.title.ok_or_else(|| Self::missing("title", "title"))
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::CurrentUrl)?;
        response.url.ok_or_else(|| Self::missing("current_url", "url"))
    }

    fn screenshot(&mut self, path: &str, full_page: bool) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::Screenshot { path, full_page })?;
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::SetViewport { width, height })?;
        Ok(())
    }

    fn pause(&mut self, ms: u64) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::Pause { ms })?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // The server may already be gone.
        if let Err(e) = self.send(&BrowserRequest::Quit) {
            debug!(error = %e, "quit request not acknowledged");
        }
        if let Err(e) = self.child.wait() {
            warn!(error = %e, "browser server did not exit cleanly");
        }
        Ok(())
    }
}

impl Drop for NodeBrowser {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
