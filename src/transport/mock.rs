//! In-memory transport for tests.
//!
//! A [`MockTransport`] never touches the network. It records every call so
//! tests can assert on connect counts, rendered commands and transfers, and
//! replies with canned [`CommandOutput`]s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Auth, CommandOutput, ConnectParams, RemoteSession, Transport};
use crate::error::TransportError;

/// A recorded upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub local: PathBuf,
    pub remote: PathBuf,
    pub mode: Option<u32>,
}

/// A recorded download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub remote: PathBuf,
    pub local: PathBuf,
}

#[derive(Debug, Default)]
struct MockState {
    opens: usize,
    closes: usize,
    auths: Vec<Auth>,
    commands: Vec<String>,
    uploads: Vec<Upload>,
    downloads: Vec<Download>,
    responses: HashMap<String, CommandOutput>,
    default_response: CommandOutput,
    fail_connect: Option<String>,
    fail_exec: Option<String>,
    fail_transfer: Option<String>,
}

/// Scriptable transport. Clones share the same recorded state.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Transport that answers every command with empty output and status 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that answers every command with the given output.
    pub fn replying(stdout: &str, stderr: &str, status: i32) -> Self {
        let mock = Self::new();
        mock.state().default_response = CommandOutput::new(stdout, stderr, status);
        mock
    }

    /// Answer one exact (rendered) command line with a specific output.
    pub fn respond_to(self, command: &str, output: CommandOutput) -> Self {
        self.state().responses.insert(command.to_string(), output);
        self
    }

    /// Make every `open` fail.
    pub fn failing_connect(self, message: &str) -> Self {
        self.state().fail_connect = Some(message.to_string());
        self
    }

    /// Make every `exec` fail.
    pub fn failing_exec(self, message: &str) -> Self {
        self.state().fail_exec = Some(message.to_string());
        self
    }

    /// Make every upload and download fail.
    pub fn failing_transfer(self, message: &str) -> Self {
        self.state().fail_transfer = Some(message.to_string());
        self
    }

    /// Number of sessions opened.
    pub fn opens(&self) -> usize {
        self.state().opens
    }

    /// Number of sessions closed.
    pub fn closes(&self) -> usize {
        self.state().closes
    }

    /// Credentials presented, one per `open` attempt.
    pub fn auths(&self) -> Vec<Auth> {
        self.state().auths.clone()
    }

    /// Command lines executed, in order.
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state().uploads.clone()
    }

    pub fn downloads(&self) -> Vec<Download> {
        self.state().downloads.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Transport for MockTransport {
    type Session = MockSession;

    fn open(&self, params: &ConnectParams) -> Result<MockSession, TransportError> {
        let mut state = self.state();
        state.auths.push(params.auth());
        if let Some(message) = &state.fail_connect {
            return Err(TransportError::Other(message.clone()));
        }
        state.opens += 1;
        Ok(MockSession {
            state: Arc::clone(&self.state),
        })
    }
}

/// Session handed out by [`MockTransport`].
#[derive(Debug)]
pub struct MockSession {
    state: Arc<Mutex<MockState>>,
}

impl RemoteSession for MockSession {
    fn exec(&mut self, command: &str) -> Result<CommandOutput, TransportError> {
        let mut state = lock(&self.state);
        if let Some(message) = &state.fail_exec {
            return Err(TransportError::Other(message.clone()));
        }
        state.commands.push(command.to_string());
        Ok(state
            .responses
            .get(command)
            .unwrap_or(&state.default_response)
            .clone())
    }

    fn upload(
        &mut self,
        local: &Path,
        remote: &Path,
        mode: Option<u32>,
    ) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if let Some(message) = &state.fail_transfer {
            return Err(TransportError::Other(message.clone()));
        }
        state.uploads.push(Upload {
            local: local.to_path_buf(),
            remote: remote.to_path_buf(),
            mode,
        });
        Ok(())
    }

    fn download(&mut self, remote: &Path, local: &Path) -> Result<(), TransportError> {
        let mut state = lock(&self.state);
        if let Some(message) = &state.fail_transfer {
            return Err(TransportError::Other(message.clone()));
        }
        state.downloads.push(Download {
            remote: remote.to_path_buf(),
            local: local.to_path_buf(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        lock(&self.state).closes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reply() {
        let mock = MockTransport::replying("ok", "", 0);
        let mut session = mock.open(&ConnectParams::new("h", "u")).unwrap();
        let output = session.exec("anything").unwrap();
        assert_eq!(output, CommandOutput::new("ok", "", 0));
        assert_eq!(mock.opens(), 1);
        assert_eq!(mock.commands(), vec!["anything".to_string()]);
    }

    #[test]
    fn test_specific_reply() {
        let mock = MockTransport::new().respond_to("false", CommandOutput::new("", "", 1));
        let mut session = mock.open(&ConnectParams::new("h", "u")).unwrap();
        assert_eq!(session.exec("false").unwrap().status, 1);
        assert_eq!(session.exec("true").unwrap().status, 0);
    }

    #[test]
    fn test_failing_connect_records_attempt() {
        let mock = MockTransport::new().failing_connect("refused");
        assert!(mock.open(&ConnectParams::new("h", "u")).is_err());
        assert_eq!(mock.opens(), 0);
        assert_eq!(mock.auths(), vec![Auth::Agent]);
    }
}
