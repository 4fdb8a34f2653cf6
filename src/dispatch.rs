//! Per-host task dispatch for the command-line front end.
//!
//! Hosts are visited one after another. Each gets a fresh [`Executor`],
//! runs the task, reports, and is closed before the next host starts. A
//! failure on one host is reported and does not stop the loop.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use crate::cli::{Action, Args};
use crate::error::{CatalystError, ExecutionError, InventoryError};
use crate::execution::{Command, ExecutionResult, Executor};
use crate::inventory::{Host, Inventory};
use crate::transport::{ConnectParams, Transport};

/// Placeholder in a download's local path replaced by the host name.
pub const HOST_PLACEHOLDER: &str = "{host}";

/// Work to perform on each host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Run(Command),
    Upload {
        local: PathBuf,
        remote: PathBuf,
        mode: Option<u32>,
    },
    Download {
        remote: PathBuf,
        local: PathBuf,
    },
}

/// What a successful task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    Command(ExecutionResult),
    Transferred,
}

impl Task {
    /// Build the task for a CLI action. `hosts` has no remote work.
    pub fn from_args(args: &Args) -> Option<Self> {
        match args.action.as_ref()? {
            Action::Run { command } => Some(Task::Run(
                Command::new(command.as_str())
                    .sudo(args.sudo)
                    .envs(args.env.iter().cloned()),
            )),
            Action::Upload { local, remote } => Some(Task::Upload {
                local: local.clone(),
                remote: remote.clone(),
                mode: args.mode,
            }),
            Action::Download { remote, local } => Some(Task::Download {
                remote: remote.clone(),
                local: local.clone(),
            }),
            Action::Hosts => None,
        }
    }

    /// Reject tasks that cannot run on `count` hosts.
    pub fn check_target_count(&self, count: usize) -> Result<(), CatalystError> {
        if let Task::Download { local, .. } = self {
            if count > 1 && !local.to_string_lossy().contains(HOST_PLACEHOLDER) {
                return Err(CatalystError::InvalidTask(format!(
                    "downloading from {count} hosts needs {HOST_PLACEHOLDER} in the local path"
                )));
            }
        }
        Ok(())
    }

    /// The task as it applies to one host.
    pub fn for_host(&self, name: &str) -> Task {
        match self {
            Task::Download { remote, local } => Task::Download {
                remote: remote.clone(),
                local: PathBuf::from(
                    local
                        .to_string_lossy()
                        .replace(HOST_PLACEHOLDER, name),
                ),
            },
            other => other.clone(),
        }
    }

    /// One-line description used by `--dry-run`.
    pub fn describe(&self) -> String {
        match self {
            Task::Run(command) => format!("run: {}", command.render()),
            Task::Upload {
                local,
                remote,
                mode,
            } => match mode {
                Some(mode) => format!(
                    "upload: {} -> {} (mode {:o})",
                    local.display(),
                    remote.display(),
                    mode
                ),
                None => format!("upload: {} -> {}", local.display(), remote.display()),
            },
            Task::Download { remote, local } => {
                format!("download: {} -> {}", remote.display(), local.display())
            }
        }
    }
}

/// Run one task on an executor.
pub fn run_task<T: Transport>(
    executor: &mut Executor<T>,
    task: &Task,
) -> Result<TaskOutput, ExecutionError> {
    match task {
        Task::Run(command) => executor.run(command).map(TaskOutput::Command),
        Task::Upload {
            local,
            remote,
            mode,
        } => executor
            .upload_file(local, remote, *mode)
            .map(|_| TaskOutput::Transferred),
        Task::Download { remote, local } => executor
            .download_file(remote, local)
            .map(|_| TaskOutput::Transferred),
    }
}

/// Select hosts by host name, then by group name. `None` selects every host.
pub fn resolve_targets<'a>(
    inventory: &'a Inventory,
    target: Option<&str>,
) -> Result<Vec<(&'a str, &'a Host)>, InventoryError> {
    let Some(target) = target else {
        return Ok(inventory.hosts().collect());
    };

    if let Some((name, host)) = inventory.hosts().find(|(name, _)| *name == target) {
        return Ok(vec![(name, host)]);
    }

    match inventory.group_members(target) {
        Ok(members) => members
            .iter()
            .map(|name| inventory.get_host(name).map(|host| (name.as_str(), host)))
            .collect(),
        Err(_) => Err(InventoryError::HostNotFound(target.to_string())),
    }
}

/// Outcome for one host, ready to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostReport {
    pub host: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HostReport {
    pub fn new(host: &str, outcome: Result<TaskOutput, ExecutionError>) -> Self {
        match outcome {
            Ok(TaskOutput::Command(result)) => Self {
                host: host.to_string(),
                ok: result.success(),
                result: Some(result),
                error: None,
            },
            Ok(TaskOutput::Transferred) => Self {
                host: host.to_string(),
                ok: true,
                result: None,
                error: None,
            },
            Err(e) => Self {
                host: host.to_string(),
                ok: false,
                result: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Human-readable block.
    pub fn render_text(&self) -> String {
        let mut out = match (&self.result, &self.error) {
            (Some(result), _) => format!("[{}] status={}", self.host, result.status),
            (None, Some(error)) => format!("[{}] error: {}", self.host, error),
            (None, None) => format!("[{}] ok", self.host),
        };
        if let Some(result) = &self.result {
            for line in result.stdout_lines() {
                out.push('\n');
                out.push_str(line);
            }
            if !result.stderr.is_empty() {
                out.push_str("\nstderr: ");
                out.push_str(&result.stderr);
            }
        }
        out
    }

    /// Single-line JSON.
    pub fn render_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"host":{:?},"ok":false,"error":{:?}}}"#, self.host, e.to_string())
        })
    }
}

/// Run a task on every target, one host at a time.
///
/// `transport` is called once per host. Each report is handed to
/// `on_report` as soon as the host is done. Returns the number of hosts
/// that failed or exited non-zero.
pub fn run_on_targets<T, F, R>(
    targets: &[(&str, &Host)],
    task: &Task,
    connect_timeout: Duration,
    mut transport: F,
    mut on_report: R,
) -> usize
where
    T: Transport,
    F: FnMut() -> T,
    R: FnMut(&HostReport),
{
    let mut failures = 0;
    for (name, host) in targets {
        info!("Running on {}", name);
        let params = ConnectParams::from_host(host).timeout(connect_timeout);
        let mut executor = Executor::with_transport(params, transport());

        let outcome = run_task(&mut executor, &task.for_host(name));
        executor.close();

        if let Err(e) = &outcome {
            error!("Failed to execute on {}: {}", name, e);
        }
        let report = HostReport::new(name, outcome);
        if !report.ok {
            failures += 1;
        }
        on_report(&report);
    }
    failures
}
