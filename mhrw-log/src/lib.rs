//! A small logger abstraction the rest of the engine depends on instead of
//! talking to `log` directly. Worker threads in `mhrw-dispatch` hold a
//! `Arc<dyn Logger>`; back-ends that aren't internally thread-safe get
//! wrapped in [`ThreadSafeLoggerWrapper`] so emission is serialized.

mod wrapper;

pub use wrapper::ThreadSafeLoggerWrapper;

/// Severity levels a [`Logger`] can be asked to emit at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Error,
    Warning,
    Info,
    Debug,
    LongDebug,
}

impl Level {
    fn to_log_level(self) -> log::Level {
        match self {
            Level::Error => log::Level::Error,
            Level::Warning => log::Level::Warn,
            Level::Info => log::Level::Info,
            Level::Debug => log::Level::Debug,
            Level::LongDebug => log::Level::Trace,
        }
    }
}

/// A log sink. `origin` is a short dotted/colon-separated component name
/// (e.g. `"mhrw_core::driver"`) so a single back-end can filter per module.
pub trait Logger: Send + Sync {
    fn emit(&self, level: Level, origin: &str, message: &str);

    /// Whether `emit` should even be called for this (level, origin) pair.
    /// Defaults to accepting everything; back-ends may override to filter
    /// at the source instead of formatting a message that gets discarded.
    fn filter_by_origin(&self, _level: Level, _origin: &str) -> bool {
        true
    }

    /// Whether concurrent calls to `emit` from multiple threads are safe
    /// without external synchronization. Dispatcher workers only wrap
    /// loggers that report `false` here.
    fn is_thread_safe(&self) -> bool {
        false
    }
}

/// Adapts the `log` crate's global logger (as configured by e.g.
/// `simplelog::TermLogger::init`) to the [`Logger`] trait. The `log`
/// facade's logger is itself thread-safe, so this adapter reports as much.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalLogAdapter;

impl Logger for GlobalLogAdapter {
    fn emit(&self, level: Level, origin: &str, message: &str) {
        log::log!(target: "mhrw", level.to_log_level(), "[{origin}] {message}");
    }

    fn is_thread_safe(&self) -> bool {
        true
    }
}

/// Convenience no-op sink for tests that don't care about log output.
#[derive(Debug, Default, Clone, Copy)]
pub struct VacuumLogger;

impl Logger for VacuumLogger {
    fn emit(&self, _level: Level, _origin: &str, _message: &str) {}

    fn filter_by_origin(&self, _level: Level, _origin: &str) -> bool {
        false
    }

    fn is_thread_safe(&self) -> bool {
        true
    }
}
