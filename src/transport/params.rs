//! Connection parameters and credential selection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::inventory::{Host, DEFAULT_PORT};

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credential chosen for a connection attempt.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// Public key authentication with an optional passphrase.
    KeyFile {
        path: PathBuf,
        passphrase: Option<String>,
    },
    /// Password authentication.
    Password(String),
    /// Whatever the running SSH agent offers.
    Agent,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyFile { path, passphrase } => f
                .debug_struct("KeyFile")
                .field("path", path)
                .field("passphrase", &passphrase.as_ref().map(|_| "<redacted>"))
                .finish(),
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::Agent => f.write_str("Agent"),
        }
    }
}

/// Everything needed to open a session to one host.
#[derive(Clone)]
pub struct ConnectParams {
    pub hostname: String,
    pub username: String,
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
    pub port: u16,
    /// Bound on establishing the session. Commands themselves are unbounded.
    pub timeout: Duration,
}

impl ConnectParams {
    /// Create parameters with the default port and timeout.
    pub fn new(hostname: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: None,
            key_file: None,
            port: DEFAULT_PORT,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Take hostname, port and credentials from an inventory host.
    pub fn from_host(host: &Host) -> Self {
        Self {
            hostname: host.hostname.clone(),
            username: host.username.clone(),
            password: host.password.clone(),
            key_file: host.key_file.clone(),
            port: host.port,
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the private key file.
    pub fn key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connect timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pick the credential to present.
    ///
    /// A key file always wins over a password; when both are set the
    /// password becomes the key passphrase. With neither, the agent is used.
    pub fn auth(&self) -> Auth {
        match (&self.key_file, &self.password) {
            (Some(path), passphrase) => Auth::KeyFile {
                path: expand_home(path),
                passphrase: passphrase.clone(),
            },
            (None, Some(password)) => Auth::Password(password.clone()),
            (None, None) => Auth::Agent,
        }
    }

    /// `host:port` for log lines.
    pub fn address(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .field("port", &self.port)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Expand a leading `~/` to the current user's home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
