//! Shell command builders for every provisioning step.
//!
//! Pure functions only: each returns the exact text sent over the session,
//! already wrapped for elevation where required, plus a label that is safe
//! to show in errors and logs.

use std::net::Ipv4Addr;

use crate::domain::privilege::{elevate, quote};
use crate::domain::secret::Secret;
use crate::domain::settings::StaticNetwork;

pub const SUDOERS: &str = "/etc/sudoers";
pub const SUDOERS_BACKUP: &str = "/etc/sudoers.backup";
pub const SSHD_CONFIG: &str = "/etc/ssh/sshd_config";
pub const SSHD_CONFIG_BACKUP: &str = "/etc/ssh/sshd_config.backup";
pub const HOSTNAME_FILE: &str = "/etc/hostname";
pub const HOSTS_FILE: &str = "/etc/hosts";
pub const DHCPCD_CONF: &str = "/etc/dhcpcd.conf";
pub const NOLOGIN_SHELL: &str = "/usr/sbin/nologin";

/// Packages installed by the software layer in a single batch.
pub const PACKAGES: &[&str] = &[
    "build-essential",
    "cmake",
    "cron",
    "curl",
    "git",
    "libffi-dev",
    "nano",
    "python3-pip",
    "python3",
    "wget",
];

const FISH_REPO_LINE: &str =
    "deb http://download.opensuse.org/repositories/shells:/fish:/release:/3/Debian_10/ /";
const FISH_REPO_LIST: &str = "/etc/apt/sources.list.d/shells:fish:release:3.list";
const FISH_RELEASE_KEY: &str =
    "https://download.opensuse.org/repositories/shells:fish:release:3/Debian_10/Release.key";
const FISH_KEYRING: &str = "/etc/apt/trusted.gpg.d/shells_fish_release_3.gpg";
const OMF_INSTALLER_URL: &str = "https://get.oh-my.fish";
const OMF_INSTALLER: &str = "/tmp/omf.sh";
const OMF_THEME: &str = "agnoster";
const OMF_PLUGINS: &[&str] = &["bang-bang"];
const DOCKER_INSTALLER_URL: &str = "https://get.docker.com";
const DOCKER_INSTALLER: &str = "/tmp/get-docker.sh";

// ── ShellCommand ──────────────────────────────────────────────────────────────

/// A command ready to send, with a label that never contains secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub label: String,
    pub text: String,
    pub elevated: bool,
}

impl ShellCommand {
    pub fn plain(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            elevated: false,
        }
    }

    /// Run `text` as root, with `password` piped to sudo.
    pub fn elevated(label: impl Into<String>, text: &str, password: &Secret) -> Self {
        Self {
            label: label.into(),
            text: elevate(text, password),
            elevated: true,
        }
    }

    /// Unprivileged command whose label is the command itself.
    pub fn run(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::plain(text.clone(), text)
    }

    /// Elevated command whose label is the inner command itself.
    ///
    /// Only for commands that carry no secret.
    pub fn sudo(text: &str, password: &Secret) -> Self {
        Self::elevated(text, text, password)
    }
}

fn write_line(line: &str, path: &str, append: bool) -> String {
    let op = if append { ">>" } else { ">" };
    format!("printf '%s\\n' {} {op} {path}", quote(line))
}

fn set_password(account: &str, password: &Secret, elevation: &Secret) -> ShellCommand {
    let pair = format!("{account}:{}", password.expose());
    ShellCommand::elevated(
        format!("set password for {account}"),
        &format!("printf '%s\\n' {} | chpasswd", quote(&pair)),
        elevation,
    )
}

// ── Deployer group and sudoers ────────────────────────────────────────────────

#[must_use]
pub fn group_exists(group: &str) -> ShellCommand {
    ShellCommand::run(format!("getent group {group}"))
}

#[must_use]
pub fn create_group(group: &str, password: &Secret) -> ShellCommand {
    ShellCommand::sudo(&format!("groupadd {group}"), password)
}

#[must_use]
pub fn sudo_access(password: &Secret) -> ShellCommand {
    ShellCommand::sudo("whoami", password)
}

#[must_use]
pub fn sudoers_rule(group: &str) -> String {
    format!("{group} ALL=(ALL) NOPASSWD: ALL")
}

/// `true` when `content` already grants `group` passwordless sudo.
#[must_use]
pub fn sudoers_has_rule(content: &str, group: &str) -> bool {
    content.contains(&sudoers_rule(group))
}

#[must_use]
pub fn read_sudoers(password: &Secret) -> ShellCommand {
    ShellCommand::sudo(&format!("cat {SUDOERS}"), password)
}

#[must_use]
pub fn backup_sudoers(password: &Secret) -> ShellCommand {
    ShellCommand::sudo(&format!("cp {SUDOERS} {SUDOERS_BACKUP}"), password)
}

#[must_use]
pub fn append_sudoers_rule(group: &str, password: &Secret) -> ShellCommand {
    let text = format!(
        "printf '\\n%s\\n' {} >> {SUDOERS}",
        quote(&sudoers_rule(group))
    );
    ShellCommand::elevated(format!("append sudoers rule for {group}"), &text, password)
}

#[must_use]
pub fn check_sudoers(password: &Secret) -> ShellCommand {
    ShellCommand::sudo(&format!("visudo -c -f {SUDOERS}"), password)
}

#[must_use]
pub fn restore_sudoers(password: &Secret) -> ShellCommand {
    ShellCommand::sudo(&format!("cp {SUDOERS_BACKUP} {SUDOERS}"), password)
}

// ── Deployer user and root ────────────────────────────────────────────────────

#[must_use]
pub fn user_exists(user: &str) -> ShellCommand {
    ShellCommand::run(format!("id {user}"))
}

/// Commands that create the deployer account, in order.
#[must_use]
pub fn create_user(user: &str, group: &str, user_password: &Secret, password: &Secret) -> Vec<ShellCommand> {
    vec![
        ShellCommand::sudo(
            &format!("useradd -m -c 'deployer' -s /bin/bash -g {group} {user}"),
            password,
        ),
        set_password(user, user_password, password),
        ShellCommand::sudo(&format!("usermod -a -G {group} {user}"), password),
        ShellCommand::sudo(&format!("mkdir -p /home/{user}/.ssh"), password),
        ShellCommand::sudo(&format!("chown -R {user}:{group} /home/{user}"), password),
    ]
}

#[must_use]
pub fn set_root_password(root_password: &Secret, password: &Secret) -> ShellCommand {
    set_password("root", root_password, password)
}

// ── Authorized keys ───────────────────────────────────────────────────────────

/// `.ssh` directory of `user`.
#[must_use]
pub fn ssh_dir(user: &str) -> String {
    if user == "root" {
        "/root/.ssh".to_string()
    } else {
        format!("/home/{user}/.ssh")
    }
}

#[must_use]
pub fn authorized_keys_path(user: &str) -> String {
    format!("{}/authorized_keys", ssh_dir(user))
}

#[must_use]
pub fn create_ssh_dir(user: &str, password: &Secret) -> ShellCommand {
    ShellCommand::sudo(&format!("mkdir -p {}", ssh_dir(user)), password)
}

#[must_use]
pub fn read_authorized_keys(user: &str, password: &Secret) -> ShellCommand {
    ShellCommand::sudo(&format!("cat {}", authorized_keys_path(user)), password)
}

/// Overwrite authorized_keys with `content` plus a terminating newline.
#[must_use]
pub fn write_authorized_keys(user: &str, content: &str, password: &Secret) -> ShellCommand {
    let path = authorized_keys_path(user);
    ShellCommand::elevated(
        format!("write {path}"),
        &write_line(content, &path, false),
        password,
    )
}

#[must_use]
pub fn chmod(mode: &str, path: &str, password: &Secret) -> ShellCommand {
    ShellCommand::sudo(&format!("chmod {mode} {path}"), password)
}

#[must_use]
pub fn chown(owner: &str, group: &str, path: &str, password: &Secret) -> ShellCommand {
    ShellCommand::sudo(&format!("chown {owner}:{group} {path}"), password)
}

// ── sshd ──────────────────────────────────────────────────────────────────────

/// `(pattern, replacement)` pairs applied to `sshd_config`.
pub const SSHD_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("^UsePAM yes", "UsePAM no"),
    ("^PermitRootLogin yes", "PermitRootLogin no"),
    ("^#PasswordAuthentication yes", "PasswordAuthentication no"),
];

/// Succeeds when none of the insecure settings remain.
#[must_use]
pub fn sshd_hardened() -> ShellCommand {
    let patterns: Vec<&str> = SSHD_SUBSTITUTIONS
        .iter()
        .map(|(p, _)| p.trim_start_matches('^'))
        .collect();
    ShellCommand::run(format!(
        "test -r {SSHD_CONFIG} && ! grep -Eq '^({})' {SSHD_CONFIG}",
        patterns.join("|")
    ))
}

/// Backup (first run only), substitutions, then reload.
#[must_use]
pub fn harden_sshd(password: &Secret) -> Vec<ShellCommand> {
    let mut cmds = vec![ShellCommand::sudo(
        &format!("test -e {SSHD_CONFIG_BACKUP} || cp {SSHD_CONFIG} {SSHD_CONFIG_BACKUP}"),
        password,
    )];
    cmds.extend(SSHD_SUBSTITUTIONS.iter().map(|(pattern, replacement)| {
        ShellCommand::sudo(
            &format!("sed -i 's/{pattern}/{replacement}/' {SSHD_CONFIG}"),
            password,
        )
    }));
    cmds.push(ShellCommand::sudo("service ssh reload", password));
    cmds
}

// ── Hostname ──────────────────────────────────────────────────────────────────

#[must_use]
pub fn hosts_line(hostname: &str) -> String {
    format!("127.0.0.1\t\t{hostname}")
}

#[must_use]
pub fn hostname_set(hostname: &str) -> ShellCommand {
    ShellCommand::run(format!(
        "[ \"$(cat {HOSTNAME_FILE})\" = {} ] && grep -qxF {} {HOSTS_FILE}",
        quote(hostname),
        quote(&hosts_line(hostname))
    ))
}

#[must_use]
pub fn set_hostname(hostname: &str, password: &Secret) -> Vec<ShellCommand> {
    let line = hosts_line(hostname);
    vec![
        ShellCommand::elevated(
            format!("write {HOSTNAME_FILE}"),
            &write_line(hostname, HOSTNAME_FILE, false),
            password,
        ),
        ShellCommand::elevated(
            format!("add {hostname} to {HOSTS_FILE}"),
            &format!(
                "grep -qxF {} {HOSTS_FILE} || {}",
                quote(&line),
                write_line(&line, HOSTS_FILE, true)
            ),
            password,
        ),
    ]
}

// ── Login user ────────────────────────────────────────────────────────────────

#[must_use]
pub fn login_disabled(user: &str) -> ShellCommand {
    ShellCommand::run(format!(
        "[ \"$(getent passwd {user} | cut -d: -f7)\" = {NOLOGIN_SHELL} ]"
    ))
}

#[must_use]
pub fn disable_login(user: &str, password: &Secret) -> Vec<ShellCommand> {
    vec![
        ShellCommand::sudo(&format!("passwd -d {user}"), password),
        ShellCommand::sudo(&format!("usermod -s {NOLOGIN_SHELL} {user}"), password),
    ]
}

// ── Static network ────────────────────────────────────────────────────────────

const STATIC_INTERFACES: &[&str] = &["eth0", "wlan0"];

fn address_line(address: Ipv4Addr) -> String {
    format!("static ip_address={address}/24")
}

/// dhcpcd configuration block for every static interface.
#[must_use]
pub fn dhcpcd_block(net: &StaticNetwork) -> String {
    let dns: Vec<String> = net.dns.iter().map(ToString::to_string).collect();
    STATIC_INTERFACES
        .iter()
        .map(|iface| {
            format!(
                "interface {iface}\n{}\nstatic routers={}\nstatic domain_name_servers={}",
                address_line(net.address),
                net.router,
                dns.join(" ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[must_use]
pub fn static_ip_configured(net: &StaticNetwork) -> ShellCommand {
    ShellCommand::run(format!(
        "grep -qF {} {DHCPCD_CONF}",
        quote(&address_line(net.address))
    ))
}

#[must_use]
pub fn configure_static_ip(net: &StaticNetwork, password: &Secret) -> Vec<ShellCommand> {
    let block = format!("\n{}", dhcpcd_block(net));
    vec![
        ShellCommand::elevated(
            format!("append static ip {} to {DHCPCD_CONF}", net.address),
            &write_line(&block, DHCPCD_CONF, true),
            password,
        ),
        ShellCommand::sudo("service dhcpcd restart", password),
    ]
}

// ── Software layer ────────────────────────────────────────────────────────────

#[must_use]
pub fn update_package_index(password: &Secret) -> Vec<ShellCommand> {
    vec![
        ShellCommand::sudo("apt-get update", password),
        ShellCommand::sudo("DEBIAN_FRONTEND=noninteractive apt-get upgrade -y", password),
    ]
}

#[must_use]
pub fn install_packages(packages: &[&str], password: &Secret) -> ShellCommand {
    ShellCommand::sudo(
        &format!(
            "DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
            packages.join(" ")
        ),
        password,
    )
}

#[must_use]
pub fn binary_on_path(binary: &str) -> ShellCommand {
    ShellCommand::run(format!("which {binary}"))
}

#[must_use]
pub fn install_fish(user: &str, password: &Secret) -> Vec<ShellCommand> {
    let mut cmds = vec![
        ShellCommand::elevated(
            "register fish apt repository",
            &write_line(FISH_REPO_LINE, FISH_REPO_LIST, false),
            password,
        ),
        ShellCommand::elevated(
            "install fish repository key",
            &format!("curl -fsSL {FISH_RELEASE_KEY} | gpg --dearmor > {FISH_KEYRING}"),
            password,
        ),
        ShellCommand::sudo("apt-get update", password),
        ShellCommand::sudo("DEBIAN_FRONTEND=noninteractive apt-get install -y fish", password),
        ShellCommand::sudo(&format!("chsh -s /usr/bin/fish {user}"), password),
        ShellCommand::run(format!("curl -fsSL {OMF_INSTALLER_URL} > {OMF_INSTALLER}")),
        ShellCommand::run(format!("fish {OMF_INSTALLER} --noninteractive")),
        ShellCommand::run(format!("rm -f {OMF_INSTALLER}")),
        ShellCommand::run(format!("echo 'omf install {OMF_THEME}' | fish")),
        ShellCommand::run(format!("echo 'omf theme {OMF_THEME}' | fish")),
    ];
    cmds.extend(
        OMF_PLUGINS
            .iter()
            .map(|p| ShellCommand::run(format!("echo 'omf install {p}' | fish"))),
    );
    cmds
}

#[must_use]
pub fn install_docker(user: &str, password: &Secret) -> Vec<ShellCommand> {
    vec![
        ShellCommand::run(format!(
            "curl -fsSL {DOCKER_INSTALLER_URL} -o {DOCKER_INSTALLER}"
        )),
        ShellCommand::sudo(&format!("sh {DOCKER_INSTALLER}"), password),
        ShellCommand::run(format!("rm -f {DOCKER_INSTALLER}")),
        ShellCommand::sudo(&format!("usermod -aG docker {user}"), password),
    ]
}

#[must_use]
pub fn local_bin_dir(user: &str) -> String {
    format!("/home/{user}/.local/bin")
}

#[must_use]
pub fn create_local_bin() -> ShellCommand {
    ShellCommand::run("mkdir -p ~/.local/bin")
}

#[must_use]
pub fn read_path() -> ShellCommand {
    ShellCommand::run("bash -lc 'echo $PATH'")
}

/// `true` when `dir` is one of the `:`-separated entries in `path`.
#[must_use]
pub fn path_contains(path: &str, dir: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    path.trim()
        .split(':')
        .any(|entry| entry.trim_end_matches('/') == dir)
}

#[must_use]
pub fn persist_path(dir: &str) -> ShellCommand {
    ShellCommand::run(format!("echo {} | fish", quote(&format!("fish_add_path {dir}"))))
}

#[must_use]
pub fn install_docker_compose() -> ShellCommand {
    ShellCommand::run("python3 -m pip install docker-compose")
}
