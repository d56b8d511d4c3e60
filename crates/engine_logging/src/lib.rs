#![deny(missing_docs)]
//! Shared logging utilities for the one-click workspace.
//!
//! This crate provides the `engine_*` logging macros used by the engine and
//! the command-line front end, plus a minimal test initializer for the
//! global logger that can also capture records per thread.

use std::cell::RefCell;

use log::{Level, LevelFilter, Log, Metadata, Record};
use simplelog::{Config, SharedLogger};

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Picks the default verbosity: debug in debug builds, info otherwise.
pub fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Initializes a simple terminal logger for use in tests.
///
/// Safe to call from every test; later calls no-op once a logger is set.
/// Warnings and errors are also offered to [`capture_records`].
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, TermLogger, TerminalMode};

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![
        TermLogger::new(
            default_level(),
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        Box::new(CaptureLogger {
            config: Config::default(),
        }),
    ]);
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<(Level, String)>>> = const { RefCell::new(None) };
}

/// Runs `f` and returns the warnings and errors it logged on this thread.
///
/// Records only arrive once [`initialize_for_tests`] installed the logger.
pub fn capture_records<T>(f: impl FnOnce() -> T) -> (T, Vec<(Level, String)>) {
    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
    let out = f();
    let records = CAPTURED
        .with(|captured| captured.borrow_mut().take())
        .unwrap_or_default();
    (out, records)
}

struct CaptureLogger {
    config: Config,
}

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = CAPTURED.try_with(|captured| {
            if let Some(records) = captured.borrow_mut().as_mut() {
                records.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

impl SharedLogger for CaptureLogger {
    fn level(&self) -> LevelFilter {
        LevelFilter::Warn
    }

    fn config(&self) -> Option<&Config> {
        Some(&self.config)
    }

    fn as_log(self: Box<Self>) -> Box<dyn Log> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_only_this_threads_warnings_and_errors() {
        initialize_for_tests();
        let ((), records) = capture_records(|| {
            engine_info!("not captured");
            engine_warn!("careful");
            engine_error!("broken");
            std::thread::spawn(|| engine_error!("elsewhere"))
                .join()
                .unwrap();
        });
        assert_eq!(
            records,
            vec![
                (Level::Warn, "careful".to_string()),
                (Level::Error, "broken".to_string()),
            ]
        );
    }
}
