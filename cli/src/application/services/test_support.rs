//! Scripted in-memory session shared by service tests.
//!
//! Every command succeeds with empty output unless a rule matches. Rules are
//! checked in insertion order against the raw command text by substring.

use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{CommandResult, ProgressReporter, RemoteSession};

pub fn ok_result(stdout: &str) -> CommandResult {
    CommandResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        success: true,
    }
}

pub fn fail_result(stderr: &str) -> CommandResult {
    CommandResult {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: Some(1),
        success: false,
    }
}

#[derive(Default)]
pub struct ScriptedSession {
    rules: Mutex<Vec<(String, CommandResult)>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to any command containing `pattern` with `result`.
    pub fn on(self, pattern: &str, result: CommandResult) -> Self {
        self.rules
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((pattern.to_string(), result));
        self
    }

    pub fn fail_on(self, pattern: &str) -> Self {
        self.on(pattern, fail_result(&format!("{pattern}: failed")))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded commands containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    fn respond(&self, command: &str) -> CommandResult {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(command.to_string());
        self.rules
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map_or_else(|| ok_result(""), |(_, result)| result.clone())
    }
}

impl RemoteSession for ScriptedSession {
    async fn execute(&self, command: &str) -> CommandResult {
        self.respond(command)
    }

    async fn execute_with_timeout(&self, command: &str, _timeout: Duration) -> CommandResult {
        self.respond(command)
    }
}

/// Reporter that records messages for assertions.
#[derive(Default)]
pub struct RecordingReporter {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn push(&self, kind: &str, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(format!("{kind}: {message}"));
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.push("step", message);
    }

    fn success(&self, message: &str) {
        self.push("success", message);
    }

    fn warn(&self, message: &str) {
        self.push("warn", message);
    }
}
