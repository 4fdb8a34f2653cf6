//! Logging initialization and named log sinks.
//!
//! Console output goes through a `tracing-subscriber` compact formatter on
//! stderr. On top of that, [`get_logger`] registers named sinks in a
//! process-wide registry: every event whose origin is the logger's name (or
//! a descendant of it, `catalyst` covers `catalyst::executor`) is also
//! appended to the logger's file, if it has one.

use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

/// Console filter used when neither `RUST_LOG` nor a config level is set.
const DEFAULT_FILTER: &str = "catalyst=info";

/// Target of events emitted through a [`Logger`] handle.
const LOGGER_TARGET: &str = "catalyst::logger";

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `catalyst=info`.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init() {
    subscriber(env_filter(None)).init();
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init() -> Result<(), TryInitError> {
    subscriber(env_filter(None)).try_init()
}

/// Try to initialize with an explicit console filter such as `debug` or
/// `catalyst=debug`. `RUST_LOG` is ignored.
pub fn try_init_with(filter: &str) -> Result<(), TryInitError> {
    subscriber(env_filter(Some(filter))).try_init()
}

fn env_filter(directives: Option<&str>) -> EnvFilter {
    let filter = match directives {
        Some(d) => EnvFilter::try_new(d).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };
    // Logger handles apply their own level before emitting.
    match format!("{LOGGER_TARGET}=trace").parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_filter(filter),
        )
        .with(SinkLayer)
}

/// Parse a level name: `trace`, `debug`, `info`, `warn`/`warning`, `error`.
pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Level a filter string such as `warn,catalyst=debug` gives the logger
/// `name`.
///
/// The most specific directive whose target is `name` or one of its
/// ancestors wins; a bare level applies to everything. `None` when no
/// directive applies or the winning one is not a plain level.
pub fn level_for(filter: &str, name: &str) -> Option<Level> {
    let name = normalize(name);
    let mut best: Option<(usize, &str)> = None;

    for directive in filter.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        let (target, level) = match directive.split_once('=') {
            Some((target, level)) => (target.trim(), level),
            None if parse_level(directive).is_some() => ("", directive),
            None => (directive, "trace"),
        };
        if target.contains('[') {
            continue;
        }
        let applies = target.is_empty()
            || name
                .strip_prefix(target)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"));
        if applies && best.map_or(true, |(len, _)| target.len() >= len) {
            best = Some((target.len(), level));
        }
    }

    best.and_then(|(_, level)| parse_level(level))
}

struct LoggerInner {
    name: String,
    level: Level,
    file: Option<Mutex<File>>,
    path: Option<PathBuf>,
}

impl LoggerInner {
    fn accepts(&self, origin: &str, level: Level) -> bool {
        level <= self.level
            && origin
                .strip_prefix(self.name.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }

    fn write_line(&self, origin: &str, level: Level, message: &str) {
        let Some(file) = &self.file else {
            return;
        };
        let mut file = file.lock().unwrap_or_else(PoisonError::into_inner);
        let time = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        // A failing sink must never take the caller down.
        let _ = writeln!(file, "{time} - {origin} - {level} - {message}");
    }
}

type Registry = RwLock<HashMap<String, Arc<LoggerInner>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

fn normalize(name: &str) -> String {
    name.replace('.', "::")
}

/// Handle to a named logger.
///
/// Cheap to clone. Logging calls never fail. Every handle with the same name
/// follows the latest [`get_logger`] configuration for that name.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn level(&self) -> Level {
        self.current().level
    }

    /// File this logger appends to, if any.
    pub fn log_file(&self) -> Option<PathBuf> {
        self.current().path.clone()
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::DEBUG, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::INFO, message);
    }

    pub fn warning(&self, message: impl fmt::Display) {
        self.log(Level::WARN, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::ERROR, message);
    }

    /// Registered configuration for this name, or the one this handle was
    /// created with once the registry has been reset.
    fn current(&self) -> Arc<LoggerInner> {
        registry()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.inner.name)
            .map_or_else(|| Arc::clone(&self.inner), Arc::clone)
    }

    fn log(&self, level: Level, message: impl fmt::Display) {
        if level > self.current().level {
            return;
        }
        let logger = self.inner.name.as_str();
        match level {
            Level::ERROR => tracing::error!(target: LOGGER_TARGET, logger, "{}", message),
            Level::WARN => tracing::warn!(target: LOGGER_TARGET, logger, "{}", message),
            Level::INFO => tracing::info!(target: LOGGER_TARGET, logger, "{}", message),
            Level::DEBUG => tracing::debug!(target: LOGGER_TARGET, logger, "{}", message),
            _ => tracing::trace!(target: LOGGER_TARGET, logger, "{}", message),
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.inner.name)
            .field("level", &self.level())
            .field("log_file", &self.log_file())
            .finish()
    }
}

/// Configure the named logger and return a handle to it.
///
/// Calling this again with the same name replaces the previous level and
/// file; sinks never stack. Parent directories of `log_file` are created.
/// Installs the console subscriber if nothing else has.
pub fn get_logger(name: &str, level: Level, log_file: Option<&Path>) -> io::Result<Logger> {
    let _ = try_init();

    let file = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(Mutex::new(file))
        }
        None => None,
    };

    let name = normalize(name);
    let inner = Arc::new(LoggerInner {
        name: name.clone(),
        level,
        file,
        path: log_file.map(Path::to_path_buf),
    });
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name, Arc::clone(&inner));

    Ok(Logger { inner })
}

/// Forget every configured logger.
pub fn reset() {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

/// Routes events to the file sinks of matching named loggers.
struct SinkLayer;

impl<S: Subscriber> Layer<S> for SinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let loggers = registry().read().unwrap_or_else(PoisonError::into_inner);
        if loggers.is_empty() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let metadata = event.metadata();
        let origin = visitor.logger.as_deref().unwrap_or(metadata.target());
        let level = *metadata.level();

        for logger in loggers.values() {
            if logger.accepts(origin, level) {
                logger.write_line(origin, level, &visitor.message);
            }
        }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    logger: Option<String>,
}

impl MessageVisitor {
    fn push_field(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        match field.name() {
            "message" => {
                let _ = self.message.write_fmt(value);
            }
            name => {
                let _ = write!(self.message, " {name}={value}");
            }
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "logger" {
            self.logger = Some(value.to_string());
        } else {
            self.push_field(field, format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push_field(field, format_args!("{value:?}"));
    }
}
