//! Executor connection state machine.

/// Whether an executor currently holds an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session. Initial state, and the state after `close`.
    #[default]
    Disconnected,
    /// A session is open and will be reused.
    Connected,
}

/// Something the executor is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Explicit `connect()`.
    Connect,
    /// A command or transfer needs a session.
    Use,
    /// Explicit `close()`.
    Close,
}

/// What has to happen to the session for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a new session through the transport.
    Open,
    /// Keep using the current session.
    Reuse,
    /// Close and drop the current session.
    Release,
    /// Nothing to do.
    Nothing,
}

impl ConnectionState {
    /// Pure transition function.
    ///
    /// Transitions:
    /// - Disconnected + Connect/Use -> Connected (Open)
    /// - Disconnected + Close -> Disconnected (Nothing)
    /// - Connected + Connect/Use -> Connected (Reuse)
    /// - Connected + Close -> Disconnected (Release)
    ///
    /// An `Open` only lands in `Connected` if the transport succeeds; the
    /// caller stays `Disconnected` otherwise.
    pub fn on(self, event: ConnectionEvent) -> (ConnectionState, SessionAction) {
        use ConnectionEvent::*;
        use ConnectionState::*;
        match (self, event) {
            (Disconnected, Connect | Use) => (Connected, SessionAction::Open),
            (Disconnected, Close) => (Disconnected, SessionAction::Nothing),
            (Connected, Connect | Use) => (Connected, SessionAction::Reuse),
            (Connected, Close) => (Disconnected, SessionAction::Release),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}
