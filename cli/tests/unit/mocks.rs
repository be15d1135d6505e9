//! Shared mock infrastructure for unit tests.
//!
//! [`FakeHost`] is a small in-memory model of a Debian host: probes answer
//! from its state and apply commands mutate it, so a second layer run sees
//! the effects of the first. Every command text is recorded.

#![allow(clippy::expect_used, dead_code)]

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use mockall::mock;
use regex::Regex;

use rpi_provisioner::application::ports::{CommandResult, KeyProvider, ProgressReporter, RemoteSession};
use rpi_provisioner::domain::error::KeyProviderError;

// ── Result helpers ────────────────────────────────────────────────────────────

pub fn ok_result(stdout: &str) -> CommandResult {
    CommandResult {
        stdout: stdout.to_string(),
        stderr: String::new(),
        exit_code: Some(0),
        success: true,
    }
}

pub fn err_result(code: i32, stderr: &str) -> CommandResult {
    CommandResult {
        stdout: String::new(),
        stderr: stderr.to_string(),
        exit_code: Some(code),
        success: false,
    }
}

fn check(satisfied: bool) -> CommandResult {
    if satisfied { ok_result("") } else { err_result(1, "") }
}

// ── Fake host ─────────────────────────────────────────────────────────────────

const BASE_SUDOERS: &str = "root ALL=(ALL:ALL) ALL\n%sudo ALL=(ALL:ALL) ALL\n";
const BASE_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

#[derive(Default)]
struct HostState {
    groups: BTreeSet<String>,
    users: BTreeSet<String>,
    sudoers_rules: Vec<String>,
    authorized_keys: Option<String>,
    sshd_hardened: bool,
    hostname: Option<String>,
    login_disabled: bool,
    static_ip: bool,
    binaries: BTreeSet<String>,
    local_bin_on_path: bool,
    root_password_changes: usize,
}

/// In-memory host that records commands and reacts to them.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<HostState>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<Vec<(String, CommandResult)>>,
}

/// Text between the inner quotes of an elevated `printf '%s\n' '<body>' > path`.
fn quoted_body(command: &str) -> Option<String> {
    command.split("'\\''").nth(3).map(ToString::to_string)
}

fn capture(pattern: &str, command: &str) -> Option<String> {
    Regex::new(pattern)
        .expect("valid regex")
        .captures(command)
        .map(|c| c[1].to_string())
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any command containing `pattern` with `result`, before the
    /// host model sees it.
    pub fn on(self, pattern: &str, result: CommandResult) -> Self {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((pattern.to_string(), result));
        self
    }

    pub fn fail_on(self, pattern: &str, stderr: &str) -> Self {
        self.on(pattern, err_result(1, stderr))
    }

    /// Stop answering `pattern` specially.
    pub fn heal(&self, pattern: &str) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(p, _)| p != pattern);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of recorded commands containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.calls().iter().filter(|c| c.contains(needle)).count()
    }

    /// Index of the first recorded command containing `needle`.
    pub fn position(&self, needle: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.contains(needle))
    }

    pub fn authorized_keys(&self) -> Option<String> {
        self.with_state(|s| s.authorized_keys.clone())
    }

    pub fn hostname(&self) -> Option<String> {
        self.with_state(|s| s.hostname.clone())
    }

    pub fn has_user(&self, user: &str) -> bool {
        self.with_state(|s| s.users.contains(user))
    }

    pub fn has_binary(&self, binary: &str) -> bool {
        self.with_state(|s| s.binaries.contains(binary))
    }

    pub fn sudoers_rules(&self) -> Vec<String> {
        self.with_state(|s| s.sudoers_rules.clone())
    }

    pub fn root_password_changes(&self) -> usize {
        self.with_state(|s| s.root_password_changes)
    }

    /// Pretend `keys` were already installed for the deployer.
    pub fn with_authorized_keys(self, keys: &str) -> Self {
        self.with_state(|s| s.authorized_keys = Some(keys.to_string()));
        self
    }

    /// Pretend `binary` is already installed.
    pub fn with_binary(self, binary: &str) -> Self {
        self.with_state(|s| {
            s.binaries.insert(binary.to_string());
        });
        self
    }

    pub fn with_local_bin_on_path(self) -> Self {
        self.with_state(|s| s.local_bin_on_path = true);
        self
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut HostState) -> T) -> T {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn respond(&self, command: &str) -> CommandResult {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command.to_string());
        let scripted = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, result)| result.clone());
        if let Some(result) = scripted {
            return result;
        }
        self.with_state(|s| Self::model(s, command))
    }

    #[allow(clippy::too_many_lines)]
    fn model(s: &mut HostState, command: &str) -> CommandResult {
        // Probes (never elevated).
        if let Some(group) = command.strip_prefix("getent group ") {
            return check(s.groups.contains(group.trim()));
        }
        if let Some(user) = command.strip_prefix("id ") {
            return check(s.users.contains(user.trim()));
        }
        if command.starts_with("test -r /etc/ssh/sshd_config") {
            return check(s.sshd_hardened);
        }
        if command.starts_with("[ \"$(cat /etc/hostname)\"") {
            let matches = s
                .hostname
                .as_ref()
                .is_some_and(|h| command.contains(&format!("= {h} ]")));
            return check(matches);
        }
        if command.starts_with("[ \"$(getent passwd") {
            return check(s.login_disabled);
        }
        if command.starts_with("grep -qF 'static ip_address=") {
            return check(s.static_ip);
        }
        if let Some(binary) = command.strip_prefix("which ") {
            return check(s.binaries.contains(binary.trim()));
        }
        if command == "bash -lc 'echo $PATH'" {
            let path = if s.local_bin_on_path {
                format!("/home/deployer/.local/bin:{BASE_PATH}")
            } else {
                BASE_PATH.to_string()
            };
            return ok_result(&format!("{path}\n"));
        }

        // Reads.
        if command.contains("cat /etc/sudoers") {
            let mut content = BASE_SUDOERS.to_string();
            for rule in &s.sudoers_rules {
                content.push('\n');
                content.push_str(rule);
                content.push('\n');
            }
            return ok_result(&content);
        }
        if command.contains("cat /home/") && command.contains("authorized_keys") {
            return match &s.authorized_keys {
                Some(keys) => ok_result(keys),
                None => err_result(1, "cat: authorized_keys: No such file or directory"),
            };
        }

        // Mutations.
        if let Some(group) = capture(r"groupadd ([a-z_][a-z0-9_-]*)", command) {
            s.groups.insert(group);
        } else if let Some(rule) =
            capture(r"([a-z_][a-z0-9_-]* ALL=\(ALL\) NOPASSWD: ALL)", command)
        {
            if command.contains(">> /etc/sudoers") {
                s.sudoers_rules.push(rule);
            }
        } else if let Some(user) =
            capture(r"useradd .* -g [a-z_][a-z0-9_-]* ([a-z_][a-z0-9_-]*)", command)
        {
            s.users.insert(user);
        } else if command.contains("chpasswd") && command.contains("root:") {
            s.root_password_changes += 1;
        } else if command.contains(" > /home/") && command.contains("authorized_keys") {
            s.authorized_keys = quoted_body(command).map(|body| format!("{body}\n"));
        } else if command.contains("service ssh reload") {
            s.sshd_hardened = true;
        } else if command.contains("> /etc/hostname") {
            s.hostname = capture(r"'\\'' ([A-Za-z0-9-]+) > /etc/hostname", command);
        } else if command.contains("usermod -s /usr/sbin/nologin") {
            s.login_disabled = true;
        } else if command.contains("service dhcpcd restart") {
            s.static_ip = true;
        } else if command.contains("apt-get install -y fish") {
            s.binaries.insert("fish".to_string());
        } else if command.contains("usermod -aG docker") {
            s.binaries.insert("docker".to_string());
        } else if command.contains("fish_add_path") {
            s.local_bin_on_path = true;
        } else if command.contains("pip install docker-compose") {
            s.binaries.insert("docker-compose".to_string());
        }
        ok_result("")
    }
}

impl RemoteSession for FakeHost {
    async fn execute(&self, command: &str) -> CommandResult {
        self.respond(command)
    }

    async fn execute_with_timeout(&self, command: &str, _timeout: Duration) -> CommandResult {
        self.respond(command)
    }
}

// ── Key provider ──────────────────────────────────────────────────────────────

mock! {
    pub Keys {}

    impl KeyProvider for Keys {
        fn fetch_keys(&self, uri: &str) -> Result<Vec<String>, KeyProviderError>;
    }
}

/// Provider that returns `keys` for every call.
pub fn keys_returning(keys: &[&str]) -> MockKeys {
    let keys: Vec<String> = keys.iter().map(ToString::to_string).collect();
    let mut provider = MockKeys::new();
    provider
        .expect_fetch_keys()
        .returning(move |_| Ok(keys.clone()));
    provider
}

// ── Reporter ──────────────────────────────────────────────────────────────────

/// Reporter that records `kind: message` lines.
#[derive(Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, kind: &str, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
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
