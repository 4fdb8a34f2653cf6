//! Error types for catalyst.

use std::path::PathBuf;

use thiserror::Error;

/// Broad classification of an [`InventoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryErrorKind {
    /// A host or group lookup missed.
    NotFound,
    /// A host or group entry is structurally invalid.
    MalformedEntry,
    /// The inventory document could not be read or parsed.
    UnreadableFile,
}

/// Errors raised while loading or querying an inventory.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// The inventory file could not be read.
    #[error("failed to read inventory {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML or has the wrong top-level shape.
    #[error("failed to parse inventory: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The document parsed but contains nothing.
    #[error("inventory document is empty")]
    Empty,

    /// A host entry is missing required fields or has mistyped values.
    #[error("malformed host entry '{name}': {reason}")]
    MalformedHost { name: String, reason: String },

    /// A group entry has mistyped values.
    #[error("malformed group entry '{name}': {reason}")]
    MalformedGroup { name: String, reason: String },

    /// Host with the given name was not found.
    #[error("host not found: {0}")]
    HostNotFound(String),

    /// Group with the given name was not found.
    #[error("group not found: {0}")]
    GroupNotFound(String),
}

impl InventoryError {
    /// Classify this error.
    pub fn kind(&self) -> InventoryErrorKind {
        match self {
            Self::HostNotFound(_) | Self::GroupNotFound(_) => InventoryErrorKind::NotFound,
            Self::MalformedHost { .. } | Self::MalformedGroup { .. } => {
                InventoryErrorKind::MalformedEntry
            }
            Self::Unreadable { .. } | Self::Parse(_) | Self::Empty => {
                InventoryErrorKind::UnreadableFile
            }
        }
    }
}

/// Failures reported by a [`Transport`](crate::transport::Transport) or its sessions.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Error from the SSH library.
    #[error("ssh: {0}")]
    Ssh(#[from] ssh2::Error),

    /// I/O error on the socket or a local file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The hostname did not resolve to any address.
    #[error("could not resolve {0}")]
    Resolve(String),

    /// The server rejected every offered credential.
    #[error("authentication rejected for {0}")]
    Auth(String),

    /// Remote output was not valid UTF-8.
    #[error("output is not valid UTF-8: {0}")]
    Decode(#[from] std::string::FromUtf8Error),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Broad classification of an [`ExecutionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    ConnectionFailure,
    ExecutionFailure,
    TransferFailure,
}

/// Errors raised by an [`Executor`](crate::execution::Executor).
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The session could not be established.
    #[error("connection to {host} failed: {source}")]
    Connection {
        host: String,
        #[source]
        source: TransportError,
    },

    /// The command could not be run or its output could not be read.
    #[error("execution on {host} failed: {source}")]
    Execution {
        host: String,
        #[source]
        source: TransportError,
    },

    /// A file upload or download failed.
    #[error("transfer with {host} failed: {source}")]
    Transfer {
        host: String,
        #[source]
        source: TransportError,
    },
}

impl ExecutionError {
    /// Classify this error.
    pub fn kind(&self) -> ExecutionErrorKind {
        match self {
            Self::Connection { .. } => ExecutionErrorKind::ConnectionFailure,
            Self::Execution { .. } => ExecutionErrorKind::ExecutionFailure,
            Self::Transfer { .. } => ExecutionErrorKind::TransferFailure,
        }
    }

    /// Host the failing operation targeted.
    pub fn host(&self) -> &str {
        match self {
            Self::Connection { host, .. }
            | Self::Execution { host, .. }
            | Self::Transfer { host, .. } => host,
        }
    }
}

/// Main error type for catalyst operations.
#[derive(Error, Debug)]
pub enum CatalystError {
    /// Inventory loading or lookup error.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Remote execution or transfer error.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Command-line usage error.
    #[error(transparent)]
    Args(#[from] crate::cli::ArgsError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A task cannot be applied to the selected hosts.
    #[error("invalid task: {0}")]
    InvalidTask(String),
}

/// Convenience Result type for catalyst operations.
pub type Result<T> = std::result::Result<T, CatalystError>;
