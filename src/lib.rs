//! # catalyst
//!
//! Inventory-driven remote command execution over SSH.
//!
//! This crate loads a static inventory of hosts and groups from YAML and
//! runs shell commands or file transfers against those hosts, returning
//! captured stdout, stderr and exit status.
//!
//! ## Features
//!
//! - **Inventory**: hosts, groups and passthrough variables from one YAML file
//! - **Executor**: one lazily opened, reusable SSH session per host
//! - **Transport seam**: swap SSH for the in-memory mock in tests
//! - **Logging**: `tracing` console output plus named file sinks
//!
//! ## Quick Start
//!
//! ```no_run
//! use catalyst::{Executor, Inventory};
//!
//! fn main() -> catalyst::Result<()> {
//!     // Initialize logging
//!     catalyst::logging::try_init().ok();
//!
//!     let inventory = Inventory::from_source("inventory.yaml")?;
//!
//!     for (name, host) in inventory.hosts() {
//!         let mut executor = Executor::for_host(host);
//!         let result = executor.execute("uname -a");
//!         executor.close();
//!
//!         match result {
//!             Ok(r) if r.success() => println!("{name}: {}", r.stdout),
//!             Ok(r) => eprintln!("{name}: exit {}: {}", r.status, r.stderr),
//!             Err(e) => eprintln!("{name}: {e}"),
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod execution;
pub mod inventory;
pub mod logging;
pub mod transport;

// Re-export commonly used types
pub use error::{
    CatalystError, ExecutionError, ExecutionErrorKind, InventoryError, InventoryErrorKind,
    Result, TransportError,
};
pub use execution::{Command, ConnectionState, ExecutionResult, Executor};
pub use inventory::{Host, Inventory, Variable, Variables};
pub use logging::{get_logger, Logger};
pub use transport::{Auth, ConnectParams, RemoteSession, SshTransport, Transport};
