//! Execution result types.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::transport::CommandOutput;

/// Result of a remote command.
///
/// A non-zero `status` is an ordinary result, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Standard output, trimmed.
    pub stdout: String,
    /// Standard error, trimmed.
    pub stderr: String,
    /// Exit status of the remote process.
    pub status: i32,
}

impl ExecutionResult {
    /// Create a new execution result.
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, status: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            status,
        }
    }

    /// Decode and trim raw transport output.
    pub fn from_output(output: CommandOutput) -> Result<Self, TransportError> {
        let stdout = String::from_utf8(output.stdout)?;
        let stderr = String::from_utf8(output.stderr)?;
        Ok(Self {
            stdout: stdout.trim().to_string(),
            stderr: stderr.trim().to_string(),
            status: output.status,
        })
    }

    /// Check if command succeeded (exit status 0).
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Get stdout lines.
    pub fn stdout_lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines()
    }
}
