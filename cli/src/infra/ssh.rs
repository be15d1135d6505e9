//! Infrastructure implementation of the `RemoteSession` port over `ssh2`.
//!
//! libssh2 is blocking, so connect and every command run on tokio's blocking
//! pool. Each command gets its own channel. Host keys are not verified: the
//! target is a freshly imaged device on the local network.

use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ssh2::Session;
use tracing::{debug, warn};

use crate::application::ports::{CommandResult, RemoteSession};
use crate::domain::error::ConnectionError;
use crate::domain::privilege::quote;
use crate::domain::secret::{Secret, redact};

// ── Connection parameters ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl SshTarget {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub enum SshAuth {
    Password(Secret),
    KeyFile(PathBuf),
}

impl SshAuth {
    /// Method name as advertised by the server.
    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Password(_) => "password",
            Self::KeyFile(_) => "publickey",
        }
    }
}

fn millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

/// Quoting levels a secret can sit under: a quoted argument inside an
/// elevated `bash -c` word, plus one spare.
const QUOTE_DEPTH: usize = 3;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// `word` as it reads inside a larger single-quoted shell word.
fn escaped_inner(word: &str) -> String {
    let quoted = quote(word);
    quoted
        .strip_prefix('\'')
        .and_then(|q| q.strip_suffix('\''))
        .unwrap_or(&quoted)
        .to_string()
}

/// Each secret as it appears at every quoting depth, longest first.
fn redaction_set(secrets: Vec<Secret>) -> Vec<Secret> {
    let mut forms: Vec<String> = secrets
        .into_iter()
        .filter(|s| !s.is_empty())
        .flat_map(|s| {
            std::iter::successors(Some(s.expose().to_string()), |f| Some(escaped_inner(f)))
                .take(QUOTE_DEPTH + 1)
        })
        .collect();
    forms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    forms.dedup();
    forms.into_iter().map(Secret::new).collect()
}

// ── Connector ─────────────────────────────────────────────────────────────────

/// Opens authenticated sessions.
pub struct SshConnector {
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl SshConnector {
    #[must_use]
    pub fn new(connect_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            command_timeout,
        }
    }

    /// Connect, handshake, and authenticate.
    ///
    /// `secrets` are redacted from every logged command.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::NoSupportedMethods` when the server does not
    /// offer `auth`'s method for the user, and other variants for network,
    /// handshake, key file, or credential failures.
    pub async fn connect(
        &self,
        target: &SshTarget,
        auth: &SshAuth,
        secrets: Vec<Secret>,
    ) -> Result<SshSession, ConnectionError> {
        let address = target.address();
        debug!(%address, user = %target.user, method = auth.method(), "connecting");

        let (target_owned, auth_owned) = (target.clone(), auth.clone());
        let connect_timeout = self.connect_timeout;
        let session = tokio::task::spawn_blocking(move || {
            open(&target_owned, &auth_owned, connect_timeout)
        })
        .await
        .map_err(|e| ConnectionError::Unreachable {
            address: address.clone(),
            reason: e.to_string(),
        })??;

        debug!(%address, "authenticated");
        Ok(SshSession {
            inner: session,
            address,
            command_timeout: self.command_timeout,
            secrets: redaction_set(secrets),
            closed: AtomicBool::new(false),
        })
    }
}

fn tcp_connect(address: &str, timeout: Duration) -> Result<TcpStream, ConnectionError> {
    let unreachable = |reason: String| ConnectionError::Unreachable {
        address: address.to_string(),
        reason,
    };
    let addrs = address
        .to_socket_addrs()
        .map_err(|e| unreachable(e.to_string()))?;
    let mut last = "no addresses resolved".to_string();
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last = e.to_string(),
        }
    }
    Err(unreachable(last))
}

fn open(target: &SshTarget, auth: &SshAuth, timeout: Duration) -> Result<Session, ConnectionError> {
    let address = target.address();
    let tcp = tcp_connect(&address, timeout)?;

    let handshake = |e: ssh2::Error| ConnectionError::Handshake {
        address: address.clone(),
        reason: e.to_string(),
    };
    let mut session = Session::new().map_err(handshake)?;
    session.set_timeout(millis(timeout));
    session.set_tcp_stream(tcp);
    session.handshake().map_err(handshake)?;

    let user = target.user.as_str();
    let failed = |reason: String| ConnectionError::AuthenticationFailed {
        user: user.to_string(),
        reason,
    };

    // Querying methods attempts "none" auth, which some servers accept.
    let allowed = session
        .auth_methods(user)
        .map_err(|e| failed(e.to_string()))?
        .to_string();
    if session.authenticated() {
        return Ok(session);
    }
    if !allowed.split(',').any(|m| m == auth.method()) {
        return Err(ConnectionError::NoSupportedMethods {
            user: user.to_string(),
            attempted: auth.method().to_string(),
            allowed,
        });
    }

    match auth {
        SshAuth::Password(password) => session
            .userauth_password(user, password.expose())
            .map_err(|e| failed(e.to_string()))?,
        SshAuth::KeyFile(path) => {
            if !path.is_file() {
                return Err(ConnectionError::KeyFile {
                    path: path.display().to_string(),
                    reason: "file not found".to_string(),
                });
            }
            session
                .userauth_pubkey_file(user, None, path, None)
                .map_err(|e| failed(e.to_string()))?;
        }
    }
    if !session.authenticated() {
        return Err(failed("server rejected credentials".to_string()));
    }
    Ok(session)
}

// ── Session ───────────────────────────────────────────────────────────────────

/// One authenticated connection. Closed on `close()` or drop, whichever
/// comes first.
pub struct SshSession {
    inner: Session,
    address: String,
    command_timeout: Duration,
    secrets: Vec<Secret>,
    closed: AtomicBool,
}

impl SshSession {
    /// Disconnect. Later calls are no-ops.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(address = %self.address, "closing session");
        if let Err(e) = self.inner.disconnect(None, "provisioning finished", None) {
            warn!(address = %self.address, error = %e, "ssh disconnect failed");
        }
    }

    fn redacted(&self, text: &str) -> String {
        redact(text, &self.secrets)
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Move whatever `stream` has buffered into `sink`, returning the byte count.
fn read_ready(stream: &mut impl Read, sink: &mut Vec<u8>) -> io::Result<usize> {
    let mut buf = [0u8; 8192];
    let mut total = 0;
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => {
                sink.extend_from_slice(&buf[..n]);
                total += n;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(total),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

/// Read both streams in turn until the remote end signals EOF, so neither
/// can fill the channel window while the other is being waited on.
///
/// The streams must be non-blocking.
fn drain(
    stdout: &mut impl Read,
    stderr: &mut impl Read,
    eof: impl Fn() -> bool,
    deadline: Instant,
) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let (mut out, mut err) = (Vec::new(), Vec::new());
    loop {
        // EOF is sampled first: data sent before it is in the buffers by now.
        let finished = eof();
        let read = read_ready(stdout, &mut out)? + read_ready(stderr, &mut err)?;
        if read > 0 {
            continue;
        }
        if finished {
            return Ok((out, err));
        }
        if Instant::now() >= deadline {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "remote command did not finish in time",
            ));
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn run_channel(session: &Session, command: &str, timeout: Duration) -> CommandResult {
    session.set_timeout(millis(timeout));
    let mut channel = match session.channel_session() {
        Ok(channel) => channel,
        Err(e) => return CommandResult::failed(format!("cannot open ssh channel: {e}")),
    };
    if let Err(e) = channel.exec(command) {
        return CommandResult::failed(format!("ssh exec failed: {e}"));
    }

    session.set_blocking(false);
    let drained = drain(
        &mut channel.stream(0),
        &mut channel.stderr(),
        || channel.eof(),
        Instant::now() + timeout,
    );
    session.set_blocking(true);
    let (stdout, stderr) = match drained {
        Ok((out, err)) => (text(&out), text(&err)),
        Err(e) => return CommandResult::failed(format!("ssh read failed: {e}")),
    };
    if let Err(e) = channel.wait_close() {
        return CommandResult {
            stdout,
            stderr: format!("{stderr}\nssh channel close failed: {e}"),
            exit_code: None,
            success: false,
        };
    }

    match channel.exit_status() {
        Ok(code) => CommandResult {
            stdout,
            stderr,
            exit_code: Some(code),
            success: code == 0,
        },
        Err(e) => CommandResult {
            stdout,
            stderr: format!("{stderr}\nno exit status: {e}"),
            exit_code: None,
            success: false,
        },
    }
}

impl RemoteSession for SshSession {
    async fn execute(&self, command: &str) -> CommandResult {
        self.execute_with_timeout(command, self.command_timeout).await
    }

    async fn execute_with_timeout(&self, command: &str, timeout: Duration) -> CommandResult {
        if self.closed.load(Ordering::SeqCst) {
            return CommandResult::failed("ssh session is closed");
        }
        debug!(address = %self.address, command = %self.redacted(command), "executing");

        let session = self.inner.clone();
        let owned = command.to_string();
        let task = tokio::task::spawn_blocking(move || run_channel(&session, &owned, timeout));
        let result = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => CommandResult::failed(format!("ssh task failed: {e}")),
            Err(_) => CommandResult::failed(format!(
                "command timed out after {}s",
                timeout.as_secs()
            )),
        };

        debug!(
            address = %self.address,
            exit_code = ?result.exit_code,
            success = result.success,
            stderr = %self.redacted(result.stderr.trim()),
            "command finished"
        );
        result
    }
}
