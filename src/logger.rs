//! Structured logging contract.
//!
//! The engine logs through a `Logger` trait object rather than calling
//! `tracing` macros directly at every call site that needs to report a
//! recoverable failure (risk rejection, skipped candle, strategy callback
//! error) — callers embedding this crate can route those events into
//! whatever subscriber they already run. [`TracingLogger`] is the default,
//! forwarding straight to `tracing`.

/// Severity of a logged engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// A sink for engine-emitted log events. Implementors must be `Send + Sync`
/// since the engine may be embedded in a multi-threaded host even though the
/// backtest loop itself is single-threaded (see the concurrency model).
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Default `Logger` forwarding to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => tracing::trace!("{message}"),
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }
}
