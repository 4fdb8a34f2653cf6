//! Command-line interface for catalyst.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// What to do on each target host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run a shell command.
    Run { command: String },
    /// Upload a local file.
    Upload { local: PathBuf, remote: PathBuf },
    /// Download a remote file. `{host}` in `local` becomes the host name.
    Download { remote: PathBuf, local: PathBuf },
    /// List the target hosts.
    Hosts,
}

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to the inventory file.
    pub inventory: Option<PathBuf>,
    /// Host or group to target. All hosts when unset.
    pub target: Option<String>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Run commands through sudo.
    pub sudo: bool,
    /// Environment assignments, in order.
    pub env: Vec<(String, String)>,
    /// Permission bits for uploaded files.
    pub mode: Option<u32>,
    /// Connect timeout in seconds.
    pub timeout: Option<u64>,
    /// Print one JSON object per host.
    pub json: bool,
    /// Print what would be done without connecting.
    pub dry_run: bool,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Also append logs to this file.
    pub log_file: Option<PathBuf>,
    /// Subcommand.
    pub action: Option<Action>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut positionals: Vec<String> = Vec::new();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('i') | Long("inventory") => {
                result.inventory = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("target") => {
                result.target = Some(parser.value()?.parse()?);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('s') | Long("sudo") => {
                result.sudo = true;
            }
            Short('e') | Long("env") => {
                let value: String = parser.value()?.parse()?;
                let (key, val) = value
                    .split_once('=')
                    .filter(|(k, _)| !k.is_empty())
                    .ok_or_else(|| ArgsError::InvalidValue("env", value.clone()))?;
                result.env.push((key.to_string(), val.to_string()));
            }
            Short('m') | Long("mode") => {
                let value: String = parser.value()?.parse()?;
                result.mode =
                    Some(parse_mode(&value).ok_or(ArgsError::InvalidValue("mode", value))?);
            }
            Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                result.timeout = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("timeout", value))?,
                );
            }
            Long("json") => {
                result.json = true;
            }
            Long("dry-run") => {
                result.dry_run = true;
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Long("log-file") => {
                result.log_file = Some(parser.value()?.parse()?);
            }
            Value(val) if positionals.is_empty() && val == "run" => {
                // Everything after `run` belongs to the remote command.
                let words: Vec<String> = parser
                    .raw_args()?
                    .map(|w| w.to_string_lossy().into_owned())
                    .skip_while(|w| w == "--")
                    .collect();
                if words.is_empty() {
                    return Err(ArgsError::MissingArgument("command"));
                }
                result.action = Some(Action::Run {
                    command: words.join(" "),
                });
                return Ok(result);
            }
            Value(val) => {
                positionals.push(val.string()?);
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    if !positionals.is_empty() {
        result.action = Some(action_from(positionals)?);
    }
    Ok(result)
}

fn action_from(positionals: Vec<String>) -> Result<Action, ArgsError> {
    let mut words = positionals.into_iter();
    let name = words.next().unwrap_or_default();
    let mut next = |what: &'static str| words.next().ok_or(ArgsError::MissingArgument(what));

    let action = match name.as_str() {
        "upload" => Action::Upload {
            local: next("local path")?.into(),
            remote: next("remote path")?.into(),
        },
        "download" => Action::Download {
            remote: next("remote path")?.into(),
            local: next("local path")?.into(),
        },
        "hosts" => Action::Hosts,
        _ => return Err(ArgsError::UnknownCommand(name)),
    };

    if let Some(extra) = words.next() {
        return Err(ArgsError::UnexpectedArgument(extra));
    }
    Ok(action)
}

/// Parse an octal permission such as `644`, `0644` or `0o644`.
pub fn parse_mode(value: &str) -> Option<u32> {
    let digits = value.strip_prefix("0o").unwrap_or(value);
    u32::from_str_radix(digits, 8).ok().filter(|m| *m <= 0o7777)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"catalyst {version}
Run commands and transfer files on inventory hosts over SSH

USAGE:
    catalyst [OPTIONS] run <COMMAND>...
    catalyst [OPTIONS] upload <LOCAL> <REMOTE>
    catalyst [OPTIONS] download <REMOTE> <LOCAL>
    catalyst [OPTIONS] hosts

OPTIONS:
    -i, --inventory <FILE>  Inventory file (YAML) [default: inventory.yaml]
    -t, --target <NAME>     Host or group to target [default: all hosts]
    -c, --config <FILE>     Path to configuration file (JSON)
    -s, --sudo              Run the command through sudo
    -e, --env <KEY=VALUE>   Set an environment variable (repeatable)
    -m, --mode <OCTAL>      Permission bits for uploaded files
        --timeout <SECS>    Connect timeout [default: 30]
        --json              Print one JSON object per host
        --dry-run           Show what would run without connecting
    -l, --log-level <LVL>   Log level (error, warn, info, debug, trace)
        --log-file <FILE>   Also append logs to FILE
    -h, --help              Print help
    -V, --version           Print version

ENVIRONMENT VARIABLES:
    CATALYST_INVENTORY        Inventory file (overrides config)
    CATALYST_CONNECT_TIMEOUT  Connect timeout in seconds (overrides config)
    CATALYST_LOG_LEVEL        Log level (overrides config)
    CATALYST_LOG_FILE         Log file (overrides config)
    RUST_LOG                  Alternative log level setting

EXAMPLES:
    # Kernel version on every host
    catalyst run uname -a

    # Restart nginx on the webservers group
    catalyst -t webservers --sudo run systemctl restart nginx

    # Push a config file with mode 0644
    catalyst -t web1 -m 644 upload nginx.conf /etc/nginx/nginx.conf

    # Fetch a file from every database host
    catalyst -t databases download /etc/postgresql.conf 'backup/{{host}}.conf'
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("catalyst {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
    /// A subcommand is missing an argument.
    MissingArgument(&'static str),
    /// Unknown subcommand.
    UnknownCommand(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
            Self::MissingArgument(what) => write!(f, "missing {}", what),
            Self::UnknownCommand(name) => write!(f, "unknown command: '{}'", name),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
