//! Remote-shell transport capability.
//!
//! The [`Executor`](crate::execution::Executor) never talks to the network
//! itself. It asks a [`Transport`] for a [`RemoteSession`] and drives that:
//! - [`SshTransport`] for real hosts (libssh2 via the `ssh2` crate)
//! - [`mock::MockTransport`] for tests

pub mod mock;
mod params;
mod ssh;

use std::path::Path;

use crate::error::TransportError;

pub use params::{Auth, ConnectParams, DEFAULT_CONNECT_TIMEOUT};
pub use ssh::{SshSession, SshTransport};

/// Raw output of a remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub status: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>, status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status,
        }
    }
}

/// Something that can open authenticated sessions to hosts.
pub trait Transport {
    type Session: RemoteSession;

    /// Establish and authenticate a session.
    fn open(&self, params: &ConnectParams) -> Result<Self::Session, TransportError>;
}

/// An open, authenticated session to a single host.
pub trait RemoteSession {
    /// Run a command and wait for it to exit.
    fn exec(&mut self, command: &str) -> Result<CommandOutput, TransportError>;

    /// Copy a local file to the remote host, optionally setting its mode.
    fn upload(&mut self, local: &Path, remote: &Path, mode: Option<u32>)
        -> Result<(), TransportError>;

    /// Copy a remote file to the local machine.
    fn download(&mut self, remote: &Path, local: &Path) -> Result<(), TransportError>;

    /// Disconnect.
    fn close(&mut self) -> Result<(), TransportError>;
}
