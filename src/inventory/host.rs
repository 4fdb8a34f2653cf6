//! A single inventory host.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::variable::{Variable, Variables};

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// How to reach and authenticate to one remote machine.
///
/// The field names match the keys of a `hosts` entry in the inventory
/// document, so an entry deserializes straight into a `Host`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    /// Hostname or address to connect to.
    pub hostname: String,
    /// Login user.
    pub username: String,
    /// Password, also used as the key passphrase when a key file is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Private key file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    /// SSH port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Names of the groups this host belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Passthrough metadata.
    #[serde(default)]
    pub variables: Variables,
}

impl Host {
    /// Create a host with default port and no credentials.
    pub fn new(hostname: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: None,
            key_file: None,
            port: DEFAULT_PORT,
            groups: Vec::new(),
            variables: Variables::new(),
        }
    }

    /// Set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the private key file.
    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Add a group membership.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.join_group(group);
        self
    }

    /// Add a variable.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Variable>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Check group membership.
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Append a group unless already present. Returns whether it was added.
    pub fn join_group(&mut self, group: impl Into<String>) -> bool {
        let group = group.into();
        if self.in_group(&group) {
            return false;
        }
        self.groups.push(group);
        true
    }

    /// Drop repeated group names, keeping the first occurrence.
    pub(crate) fn dedup_groups(&mut self) {
        let mut seen = Vec::with_capacity(self.groups.len());
        self.groups.retain(|g| {
            if seen.contains(g) {
                false
            } else {
                seen.push(g.clone());
                true
            }
        });
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .field("port", &self.port)
            .field("groups", &self.groups)
            .field("variables", &self.variables)
            .finish()
    }
}
