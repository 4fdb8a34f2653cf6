//! Remote command execution engine.

use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::command::Command;
use super::result::ExecutionResult;
use super::state::{ConnectionEvent, ConnectionState, SessionAction};
use crate::error::{ExecutionError, TransportError};
use crate::inventory::Host;
use crate::transport::{ConnectParams, RemoteSession, SshTransport, Transport};

/// Runs commands and transfers against one host over one session.
///
/// The session is opened on first use and reused until [`close`](Self::close).
pub struct Executor<T: Transport = SshTransport> {
    params: ConnectParams,
    transport: T,
    session: Option<T::Session>,
}

impl Executor<SshTransport> {
    /// Create an executor that connects over SSH.
    pub fn new(params: ConnectParams) -> Self {
        Self::with_transport(params, SshTransport::new())
    }

    /// Create an SSH executor for an inventory host.
    pub fn for_host(host: &Host) -> Self {
        Self::new(ConnectParams::from_host(host))
    }
}

impl<T: Transport> Executor<T> {
    /// Create an executor on top of any transport.
    pub fn with_transport(params: ConnectParams, transport: T) -> Self {
        Self {
            params,
            transport,
            session: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.session.is_some() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn params(&self) -> &ConnectParams {
        &self.params
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open the session now instead of on first use. No-op when connected.
    pub fn connect(&mut self) -> Result<(), ExecutionError> {
        self.session_for(ConnectionEvent::Connect).map(|_| ())
    }

    /// Run a plain command line.
    pub fn execute(&mut self, command: &str) -> Result<ExecutionResult, ExecutionError> {
        self.run(&Command::new(command))
    }

    /// Run a command, blocking until the remote process exits.
    pub fn run(&mut self, command: &Command) -> Result<ExecutionResult, ExecutionError> {
        let host = self.params.hostname.clone();
        let line = command.render();
        let session = self.session_for(ConnectionEvent::Use)?;

        debug!("Executing command on {}: {}", host, line);
        let start = Instant::now();
        let result = session
            .exec(&line)
            .and_then(ExecutionResult::from_output)
            .map_err(|source| {
                error!("Command execution failed on {}: {}", host, source);
                ExecutionError::Execution {
                    host: host.clone(),
                    source,
                }
            })?;

        if result.success() {
            debug!("Command executed successfully in {:?}", start.elapsed());
        } else {
            warn!(
                "Command on {} exited with status {}: {}",
                host, result.status, result.stderr
            );
        }
        Ok(result)
    }

    /// Copy a local file to the host, optionally setting its permission bits.
    pub fn upload_file(
        &mut self,
        local: impl AsRef<Path>,
        remote: impl AsRef<Path>,
        mode: Option<u32>,
    ) -> Result<(), ExecutionError> {
        let (local, remote) = (local.as_ref(), remote.as_ref());
        let host = self.params.hostname.clone();
        let session = self.session_for(ConnectionEvent::Use)?;

        info!("Uploading {} to {}:{}", local.display(), host, remote.display());
        session
            .upload(local, remote, mode)
            .map_err(|source| transfer_failed(&host, "upload", source))?;
        info!("File uploaded successfully");
        Ok(())
    }

    /// Copy a file from the host to a local path.
    pub fn download_file(
        &mut self,
        remote: impl AsRef<Path>,
        local: impl AsRef<Path>,
    ) -> Result<(), ExecutionError> {
        let (remote, local) = (remote.as_ref(), local.as_ref());
        let host = self.params.hostname.clone();
        let session = self.session_for(ConnectionEvent::Use)?;

        info!("Downloading {}:{} to {}", host, remote.display(), local.display());
        session
            .download(remote, local)
            .map_err(|source| transfer_failed(&host, "download", source))?;
        info!("File downloaded successfully");
        Ok(())
    }

    /// Close the session if one is open. Safe to call repeatedly.
    pub fn close(&mut self) {
        let (_, action) = self.state().on(ConnectionEvent::Close);
        if action != SessionAction::Release {
            return;
        }
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close() {
                warn!("Error while closing connection to {}: {}", self.params.hostname, e);
            }
            info!("Closed connection to {}", self.params.hostname);
        }
    }

    /// Drive the state machine and hand back the session it leaves open.
    fn session_for(&mut self, event: ConnectionEvent) -> Result<&mut T::Session, ExecutionError> {
        let (_, action) = self.state().on(event);
        let session = match (action, self.session.take()) {
            (SessionAction::Reuse, Some(session)) => session,
            _ => self.open()?,
        };
        Ok(self.session.insert(session))
    }

    fn open(&self) -> Result<T::Session, ExecutionError> {
        info!(
            "Connecting to {} as {}",
            self.params.address(),
            self.params.username
        );
        match self.transport.open(&self.params) {
            Ok(session) => {
                info!("Successfully connected to {}", self.params.hostname);
                Ok(session)
            }
            Err(source) => {
                error!("Failed to connect to {}: {}", self.params.hostname, source);
                Err(ExecutionError::Connection {
                    host: self.params.hostname.clone(),
                    source,
                })
            }
        }
    }
}

fn transfer_failed(host: &str, what: &str, source: TransportError) -> ExecutionError {
    error!("File {} failed on {}: {}", what, host, source);
    ExecutionError::Transfer {
        host: host.to_string(),
        source,
    }
}
