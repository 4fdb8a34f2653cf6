//! Executor integration tests.
//!
//! These tests drive an [`Executor`] through the in-memory transport, so no
//! SSH server is needed.

use std::sync::{Arc, Mutex};

use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use catalyst::transport::mock::{Download, MockTransport, Upload};
use catalyst::transport::CommandOutput;
use catalyst::{
    Auth, Command, ConnectParams, ConnectionState, ExecutionErrorKind, ExecutionResult, Executor,
    Host,
};

fn executor(mock: &MockTransport) -> Executor<MockTransport> {
    Executor::with_transport(ConnectParams::new("web1.example.com", "admin"), mock.clone())
}

/// Records the level of every event it sees.
#[derive(Clone, Default)]
struct CaptureLayer {
    levels: Arc<Mutex<Vec<Level>>>,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.levels.lock().unwrap().push(*event.metadata().level());
    }
}

/// Run `f` under a capturing subscriber and return what it logged.
fn with_capture<T>(f: impl FnOnce() -> T) -> (T, Vec<Level>) {
    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let value = tracing::subscriber::with_default(subscriber, f);
    let levels = capture.levels.lock().unwrap().clone();
    (value, levels)
}

// ============================================================================
// Command execution
// ============================================================================

#[test]
fn test_execute_captures_output() {
    let mock = MockTransport::replying("ok\n", "", 0);
    let mut exec = executor(&mock);

    let result = exec.execute("echo hi").unwrap();

    assert_eq!(result, ExecutionResult::new("ok", "", 0));
    assert_eq!(mock.commands(), vec!["echo hi".to_string()]);
}

#[test]
fn test_nonzero_status_is_not_an_error() {
    let mock = MockTransport::new().respond_to("false", CommandOutput::new("", "boom\n", 1));
    let mut exec = executor(&mock);

    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let result = tracing::subscriber::with_default(subscriber, || exec.execute("false"));

    let result = result.unwrap();
    assert_eq!(result.status, 1);
    assert_eq!(result.stderr, "boom");
    assert!(!result.success());
    assert!(capture.levels.lock().unwrap().contains(&Level::WARN));
}

#[test]
fn test_command_rendering_reaches_session() {
    let mock = MockTransport::new();
    let mut exec = executor(&mock);

    let command = Command::new("systemctl restart nginx")
        .sudo(true)
        .env("LANG", "C");
    exec.run(&command).unwrap();

    assert_eq!(
        mock.commands(),
        vec!["LANG=C sudo systemctl restart nginx".to_string()]
    );
}

#[test]
fn test_exec_failure_keeps_session() {
    let mock = MockTransport::new().failing_exec("channel closed");
    let mut exec = executor(&mock);

    let err = exec.execute("uptime").unwrap_err();
    assert_eq!(err.kind(), ExecutionErrorKind::ExecutionFailure);
    assert_eq!(err.host(), "web1.example.com");
    assert_eq!(exec.state(), ConnectionState::Connected);
}

// ============================================================================
// Session lifecycle
// ============================================================================

#[test]
fn test_session_opened_once_for_many_operations() {
    let mock = MockTransport::new();
    let mut exec = executor(&mock);

    exec.execute("uptime").unwrap();
    exec.execute("hostname").unwrap();
    exec.upload_file("app.conf", "/etc/app.conf", None).unwrap();
    exec.download_file("/var/log/app.log", "app.log").unwrap();

    assert_eq!(mock.opens(), 1);
    assert_eq!(mock.commands().len(), 2);
}

#[test]
fn test_close_twice_is_safe() {
    let mock = MockTransport::new();
    let mut exec = executor(&mock);

    exec.execute("true").unwrap();
    exec.close();
    exec.close();

    assert_eq!(mock.closes(), 1);
    assert_eq!(exec.state(), ConnectionState::Disconnected);
}

#[test]
fn test_close_without_session() {
    let mock = MockTransport::new();
    let mut exec = executor(&mock);
    exec.close();
    assert_eq!(mock.opens(), 0);
    assert_eq!(mock.closes(), 0);
}

#[test]
fn test_reconnects_after_close() {
    let mock = MockTransport::new();
    let mut exec = executor(&mock);

    exec.execute("true").unwrap();
    exec.close();
    exec.execute("true").unwrap();

    assert_eq!(mock.opens(), 2);
    assert!(exec.state().is_connected());
}

#[test]
fn test_connect_failure_leaves_disconnected() {
    let mock = MockTransport::new().failing_connect("connection refused");
    let mut exec = executor(&mock);

    let err = exec.execute("true").unwrap_err();
    assert_eq!(err.kind(), ExecutionErrorKind::ConnectionFailure);
    assert!(err.to_string().contains("web1.example.com"));
    assert_eq!(exec.state(), ConnectionState::Disconnected);
    assert!(mock.commands().is_empty());
}

// ============================================================================
// Credentials
// ============================================================================

#[test]
fn test_key_file_wins_over_password() {
    let host = Host::new("db1.example.com", "dbadmin")
        .with_password("secret")
        .with_key_file("/keys/id_ed25519");
    let mock = MockTransport::new();
    let mut exec = Executor::with_transport(ConnectParams::from_host(&host), mock.clone());

    exec.connect().unwrap();

    assert_eq!(
        mock.auths(),
        vec![Auth::KeyFile {
            path: "/keys/id_ed25519".into(),
            passphrase: Some("secret".to_string()),
        }]
    );
}

#[test]
fn test_password_and_agent_auth() {
    let mock = MockTransport::new();

    let params = ConnectParams::new("h", "u").password("pw");
    Executor::with_transport(params, mock.clone()).connect().unwrap();
    Executor::with_transport(ConnectParams::new("h", "u"), mock.clone())
        .connect()
        .unwrap();

    assert_eq!(
        mock.auths(),
        vec![Auth::Password("pw".to_string()), Auth::Agent]
    );
}

#[test]
fn test_host_port_carried_into_params() {
    let host = Host::new("db1.example.com", "dbadmin").with_port(2222);
    let params = ConnectParams::from_host(&host);
    assert_eq!(params.address(), "db1.example.com:2222");
}

// ============================================================================
// File transfer
// ============================================================================

#[test]
fn test_upload_and_download_recorded() {
    let mock = MockTransport::new();
    let mut exec = executor(&mock);

    exec.upload_file("deploy.sh", "/tmp/deploy.sh", Some(0o755))
        .unwrap();
    exec.download_file("/etc/hosts", "hosts.web1").unwrap();

    assert_eq!(
        mock.uploads(),
        vec![Upload {
            local: "deploy.sh".into(),
            remote: "/tmp/deploy.sh".into(),
            mode: Some(0o755),
        }]
    );
    assert_eq!(
        mock.downloads(),
        vec![Download {
            remote: "/etc/hosts".into(),
            local: "hosts.web1".into(),
        }]
    );
}

#[test]
fn test_transfer_failure_kind() {
    let mock = MockTransport::new().failing_transfer("no such file");
    let mut exec = executor(&mock);

    let err = exec.upload_file("missing", "/tmp/missing", None).unwrap_err();
    assert_eq!(err.kind(), ExecutionErrorKind::TransferFailure);

    let err = exec.download_file("/missing", "missing").unwrap_err();
    assert_eq!(err.kind(), ExecutionErrorKind::TransferFailure);
    assert!(err.to_string().contains("web1.example.com"));
}

// ============================================================================
// Error logging
// ============================================================================

#[test]
fn test_connect_failure_logged_at_error() {
    let mock = MockTransport::new().failing_connect("connection refused");
    let mut exec = executor(&mock);

    let (result, levels) = with_capture(|| exec.connect());

    assert!(result.is_err());
    assert!(levels.contains(&Level::ERROR));
}

#[test]
fn test_exec_failure_logged_at_error() {
    let mock = MockTransport::new().failing_exec("channel closed");
    let mut exec = executor(&mock);
    exec.connect().unwrap();

    let (result, levels) = with_capture(|| exec.execute("uptime"));

    assert!(result.is_err());
    assert!(levels.contains(&Level::ERROR));
}

#[test]
fn test_transfer_failure_logged_at_error() {
    let mock = MockTransport::new().failing_transfer("permission denied");
    let mut exec = executor(&mock);
    exec.connect().unwrap();

    let (result, levels) = with_capture(|| exec.upload_file("a.txt", "/root/a.txt", None));
    assert!(result.is_err());
    assert!(levels.contains(&Level::ERROR));

    let (result, levels) = with_capture(|| exec.download_file("/root/a.txt", "a.txt"));
    assert!(result.is_err());
    assert!(levels.contains(&Level::ERROR));
}

#[test]
fn test_success_logs_no_errors() {
    let mock = MockTransport::replying("ok", "", 0);
    let mut exec = executor(&mock);

    let (result, levels) = with_capture(|| exec.execute("true"));

    assert!(result.is_ok());
    assert!(!levels.contains(&Level::ERROR));
}
