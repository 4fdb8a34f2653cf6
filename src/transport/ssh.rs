//! SSH transport backed by libssh2.

use std::fs::File;
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::thread;
use std::time::Duration;

use ssh2::{Channel, FileStat, Session};
use tracing::debug;

use super::{Auth, CommandOutput, ConnectParams, RemoteSession, Transport};
use crate::error::TransportError;

/// Opens sessions with the `ssh2` crate.
///
/// Host keys are not checked against `known_hosts`; any key the server
/// presents is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshTransport;

impl SshTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for SshTransport {
    type Session = SshSession;

    fn open(&self, params: &ConnectParams) -> Result<SshSession, TransportError> {
        let addr = (params.hostname.as_str(), params.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::Resolve(params.address()))?;

        let tcp = TcpStream::connect_timeout(&addr, params.timeout)?;
        let mut session = Session::new()?;
        session.set_timeout(millis(params.timeout));
        session.set_tcp_stream(tcp);
        session.handshake()?;

        let auth = params.auth();
        debug!("Authenticating {} with {:?}", params.username, auth);
        match auth {
            Auth::KeyFile { path, passphrase } => session.userauth_pubkey_file(
                &params.username,
                None,
                &path,
                passphrase.as_deref(),
            )?,
            Auth::Password(password) => session.userauth_password(&params.username, &password)?,
            Auth::Agent => session.userauth_agent(&params.username)?,
        }
        if !session.authenticated() {
            return Err(TransportError::Auth(params.username.clone()));
        }

        // The connect timeout must not bound long-running commands.
        session.set_timeout(0);
        Ok(SshSession { session })
    }
}

/// An authenticated libssh2 session.
pub struct SshSession {
    session: Session,
}

impl RemoteSession for SshSession {
    fn exec(&mut self, command: &str) -> Result<CommandOutput, TransportError> {
        let mut channel = self.session.channel_session()?;
        channel.exec(command)?;

        // Both streams share one window; reading them in turn keeps a
        // chatty stderr from stalling stdout.
        self.session.set_blocking(false);
        let drained = drain(&mut channel);
        self.session.set_blocking(true);
        let (stdout, stderr) = drained?;

        channel.wait_close()?;
        let status = channel.exit_status()?;
        Ok(CommandOutput {
            stdout,
            stderr,
            status,
        })
    }

    fn upload(
        &mut self,
        local: &Path,
        remote: &Path,
        mode: Option<u32>,
    ) -> Result<(), TransportError> {
        let sftp = self.session.sftp()?;
        let mut source = File::open(local)?;
        let mut target = sftp.create(remote)?;
        io::copy(&mut source, &mut target)?;
        drop(target);

        if let Some(mode) = mode {
            sftp.setstat(
                remote,
                FileStat {
                    size: None,
                    uid: None,
                    gid: None,
                    perm: Some(mode),
                    atime: None,
                    mtime: None,
                },
            )?;
        }
        Ok(())
    }

    fn download(&mut self, remote: &Path, local: &Path) -> Result<(), TransportError> {
        let sftp = self.session.sftp()?;
        let mut source = sftp.open(remote)?;
        let mut target = File::create(local)?;
        io::copy(&mut source, &mut target)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.session.disconnect(None, "closed by client", None)?;
        Ok(())
    }
}

/// Pause between polls when neither stream had data.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// The two output streams of a running command.
trait OutputStreams {
    fn read_stdout(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn read_stderr(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// Remote side has sent EOF.
    fn finished(&self) -> bool;
}

impl OutputStreams for Channel {
    fn read_stdout(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn read_stderr(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stderr().read(buf)
    }

    fn finished(&self) -> bool {
        self.eof()
    }
}

/// Read both streams in turn until EOF and nothing is left to read.
fn drain(streams: &mut impl OutputStreams) -> io::Result<(Vec<u8>, Vec<u8>)> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut buf = [0u8; 8192];

    loop {
        let out = read_available(|b| streams.read_stdout(b), &mut stdout, &mut buf)?;
        let err = read_available(|b| streams.read_stderr(b), &mut stderr, &mut buf)?;
        if out + err == 0 {
            if streams.finished() {
                return Ok((stdout, stderr));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Copy whatever `read` has ready into `sink`. Returns the bytes copied.
fn read_available(
    mut read: impl FnMut(&mut [u8]) -> io::Result<usize>,
    sink: &mut Vec<u8>,
    buf: &mut [u8],
) -> io::Result<usize> {
    let mut total = 0;
    loop {
        match read(buf) {
            Ok(0) => return Ok(total),
            Ok(n) => {
                sink.extend_from_slice(&buf[..n]);
                total += n;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(total),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
