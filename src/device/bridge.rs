use std::process::Command;
use std::sync::Mutex;

use tracing::{debug, trace};

use crate::error::DriverError;

/// Something that runs device-bridge subcommands and returns their stdout.
pub trait DeviceBridge {
    fn exec(&self, args: &[String]) -> Result<Vec<u8>, DriverError>;

    fn exec_text(&self, args: &[String]) -> Result<String, DriverError> {
        let out = self.exec(args)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl<B: DeviceBridge + ?Sized> DeviceBridge for &B {
    fn exec(&self, args: &[String]) -> Result<Vec<u8>, DriverError> {
        (**self).exec(args)
    }
}

/// Build an owned argument vector from string-like parts.
pub fn args<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

/// The real `adb` executable.
#[derive(Debug, Clone)]
pub struct AdbBridge {
    program: String,
}

impl AdbBridge {
    pub fn new() -> Self {
        Self::with_program("adb")
    }

    pub fn with_program(program: &str) -> Self {
        AdbBridge {
            program: program.to_string(),
        }
    }
}

impl Default for AdbBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBridge for AdbBridge {
    fn exec(&self, args: &[String]) -> Result<Vec<u8>, DriverError> {
        let command_line = format!("{} {}", self.program, args.join(" "));
        debug!(command = %command_line, "bridge exec");

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| DriverError::BridgeSpawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(DriverError::BridgeFailed {
                command: command_line,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        trace!(bytes = output.stdout.len(), "bridge stdout");
        Ok(output.stdout)
    }
}

/// Scripted device bridge for tests and dry runs.
///
/// Each rule pairs a substring of the joined command line with a queue of
/// responses. The first rule whose pattern matches answers; its last
/// response repeats once the queue is drained. Commands that match no rule
/// succeed with empty output. Every command is recorded.
#[derive(Debug, Default)]
pub struct ScriptedBridge {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    responses: Vec<Scripted>,
    served: usize,
}

#[derive(Debug, Clone)]
enum Scripted {
    Output(Vec<u8>),
    Failure(String),
}

impl ScriptedBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `stdout`.
    pub fn on(self, pattern: &str, stdout: &str) -> Self {
        self.push(pattern, Scripted::Output(stdout.as_bytes().to_vec()))
    }

    /// Answer commands containing `pattern` with a sequence of outputs.
    pub fn on_sequence(self, pattern: &str, outputs: &[&str]) -> Self {
        let mut bridge = self;
        for out in outputs {
            bridge = bridge.push(pattern, Scripted::Output(out.as_bytes().to_vec()));
        }
        bridge
    }

    /// Answer commands containing `pattern` with raw bytes.
    pub fn on_bytes(self, pattern: &str, stdout: &[u8]) -> Self {
        self.push(pattern, Scripted::Output(stdout.to_vec()))
    }

    /// Fail commands containing `pattern` with a non-zero exit.
    pub fn fail(self, pattern: &str, stderr: &str) -> Self {
        self.push(pattern, Scripted::Failure(stderr.to_string()))
    }

    fn push(self, pattern: &str, response: Scripted) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            match rules.iter_mut().find(|r| r.pattern == pattern) {
                Some(rule) => rule.responses.push(response),
                None => rules.push(Rule {
                    pattern: pattern.to_string(),
                    responses: vec![response],
                    served: 0,
                }),
            }
        }
        self
    }

    /// All command lines executed so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of executed commands containing `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(pattern)).count()
    }
}

impl DeviceBridge for ScriptedBridge {
    fn exec(&self, args: &[String]) -> Result<Vec<u8>, DriverError> {
        let command_line = args.join(" ");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command_line.clone());
        }

        let mut rules = self
            .rules
            .lock()
            .map_err(|_| DriverError::SessionIO("scripted bridge lock poisoned".into()))?;

        let Some(rule) = rules.iter_mut().find(|r| command_line.contains(&r.pattern)) else {
            return Ok(Vec::new());
        };

        let idx = rule.served.min(rule.responses.len() - 1);
        rule.served += 1;

        match &rule.responses[idx] {
            Scripted::Output(out) => Ok(out.clone()),
            Scripted::Failure(stderr) => Err(DriverError::BridgeFailed {
                command: command_line,
                status: failed_status(),
                stderr: stderr.clone(),
            }),
        }
    }
}

#[cfg(unix)]
fn failed_status() -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(1 << 8)
}

#[cfg(windows)]
fn failed_status() -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(1)
}
