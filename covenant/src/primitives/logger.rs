use std::cell::RefCell;
use std::{sync::Arc, sync::OnceLock};

thread_local! {
    static THREAD_LOG_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

tokio::task_local! {
    /// Task-local logging context, set by the `covenant_export` proc macro for async functions.
    pub static LOG_CONTEXT: RefCell<Option<String>>;
}

/// Sink for covenant's log records, implemented by the host app.
///
/// Records arrive already prefixed with their context, e.g.
/// `[Covenant][LocalDelegator] Created erc20TransferAmount delegation ...`.
///
/// ```rust
/// use covenant::primitives::logger::{Logger, LogLevel};
///
/// struct StdoutLogger;
///
/// impl Logger for StdoutLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         println!("[{:?}] {}", level, message);
///     }
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// class CovenantLogger : Logger {
///     override fun log(level: LogLevel, message: String) {
///         Log.println(level.toPriority(), "Covenant", message)
///     }
/// }
///
/// setLogger(CovenantLogger()) // once, at startup
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Receives one record.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a forwarded record, mirroring [`log::Level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
#[allow(missing_docs)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// Forwards `log` crate records to the foreign `Logger`.
struct ForeignLogger;

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !should_forward(record.level(), record.module_path()) {
            return;
        }

        match LOGGER_INSTANCE.get() {
            Some(logger) => logger.log(record.level().into(), record.args().to_string()),
            None => eprintln!("[covenant] {}", record.args()),
        }
    }

    fn flush(&self) {}
}

/// Debug and trace records from dependencies (alloy, tokio) are dropped.
fn should_forward(level: log::Level, module_path: Option<&str>) -> bool {
    let is_debug_or_trace = matches!(level, log::Level::Debug | log::Level::Trace);
    let is_from_covenant = module_path.is_some_and(|path| path.starts_with("covenant"));
    !is_debug_or_trace || is_from_covenant
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs the host's logger. Only the first call has an effect.
#[allow(clippy::module_name_repetitions)]
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    static FORWARDER: ForeignLogger = ForeignLogger;

    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("[covenant] logger already installed, ignoring");
        return;
    }
    match log::set_logger(&FORWARDER) {
        Ok(()) => log::set_max_level(log::LevelFilter::Trace),
        Err(e) => eprintln!("[covenant] another `log` backend is active: {e}"),
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __covenant_log {
    ($level:expr, $($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::log!($level, "{} {}", ctx, format_args!($($arg)*)),
            None => log::log!($level, $($arg)*),
        }
    };
}

/// `log::trace!` prefixed with the active [`LogContext`](crate::primitives::logger::LogContext).
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => { $crate::__covenant_log!(log::Level::Trace, $($arg)*) };
}

/// `log::debug!` prefixed with the active log context.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::__covenant_log!(log::Level::Debug, $($arg)*) };
}

/// `log::info!` prefixed with the active log context.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::__covenant_log!(log::Level::Info, $($arg)*) };
}

/// `log::warn!` prefixed with the active log context.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::__covenant_log!(log::Level::Warn, $($arg)*) };
}

/// `log::error!` prefixed with the active log context.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::__covenant_log!(log::Level::Error, $($arg)*) };
}

enum LogContextStorage {
    TaskLocal,
    ThreadLocal,
}

/// Prefixes every record logged while it is alive with `[Covenant][<module>]`.
///
/// Nested guards stack: dropping one restores the context it replaced.
///
/// # Examples
///
/// ```rust
/// use covenant::primitives::logger::{get_context, LogContext};
///
/// {
///     let _covenant_logger_ctx = LogContext::new("CaveatBuilder");
///     assert_eq!(get_context().as_deref(), Some("[Covenant][CaveatBuilder]"));
/// }
/// assert_eq!(get_context(), None);
/// ```
pub struct LogContext {
    previous: Option<String>,
    storage: LogContextStorage,
}

impl LogContext {
    /// Activates the context for `module`.
    #[must_use]
    pub fn new(module: &str) -> Self {
        let new_context = Some(format!("[Covenant][{module}]"));

        // task_local survives .await points; sync callers get the thread_local
        match LOG_CONTEXT.try_with(|ctx| ctx.replace(new_context.clone())) {
            Ok(previous) => Self {
                previous,
                storage: LogContextStorage::TaskLocal,
            },
            Err(_) => Self {
                previous: THREAD_LOG_CONTEXT.with(|ctx| ctx.replace(new_context)),
                storage: LogContextStorage::ThreadLocal,
            },
        }
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        match self.storage {
            LogContextStorage::TaskLocal => {
                let _ = LOG_CONTEXT.try_with(|ctx| {
                    (*ctx.borrow_mut()).clone_from(&self.previous);
                });
            }
            LogContextStorage::ThreadLocal => {
                THREAD_LOG_CONTEXT.with(|ctx| {
                    (*ctx.borrow_mut()).clone_from(&self.previous);
                });
            }
        }
    }
}

/// The active context prefix, if any.
#[must_use]
pub fn get_context() -> Option<String> {
    LOG_CONTEXT
        .try_with(|ctx| ctx.borrow().clone())
        .unwrap_or_else(|_| THREAD_LOG_CONTEXT.with(|ctx| ctx.borrow().clone()))
}

/// Runs a block inside a scoped logging context.
///
/// ```rust
/// use covenant::with_log_context;
///
/// let n = with_log_context!("ScopeResolver" => {
///     covenant::primitives::logger::get_context().map(|c| c.len())
/// });
/// assert_eq!(n, Some("[Covenant][ScopeResolver]".len()));
/// ```
#[macro_export]
macro_rules! with_log_context {
    ($module:expr => $block:block) => {{
        let _covenant_logger_ctx = $crate::primitives::logger::LogContext::new($module);
        $block
    }};
}
