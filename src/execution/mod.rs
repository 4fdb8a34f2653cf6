//! Command execution engine.
//!
//! This module provides remote execution on a single host:
//! - Lazy, reusable sessions driven by an explicit state machine
//! - Commands with `sudo` and environment prefixes
//! - File upload and download over the same session
//!
//! # Example
//!
//! ```no_run
//! use catalyst::execution::{Command, Executor};
//! use catalyst::transport::ConnectParams;
//!
//! let params = ConnectParams::new("web1.example.com", "admin").key_file("~/.ssh/id_rsa");
//! let mut executor = Executor::new(params);
//!
//! let result = executor.execute("uname -a")?;
//! println!("{}", result.stdout);
//!
//! let cmd = Command::new("systemctl restart nginx").sudo(true);
//! executor.run(&cmd)?;
//! executor.close();
//! # Ok::<(), catalyst::ExecutionError>(())
//! ```

mod command;
mod executor;
mod result;
mod state;

pub use command::Command;
pub use executor::Executor;
pub use result::ExecutionResult;
pub use state::{ConnectionEvent, ConnectionState, SessionAction};
