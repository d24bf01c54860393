//! Global subscriber installation.
//!
//! Kept to a single test: the global subscriber can only be set once per
//! process and tests in this file share one.

use bridge_traits::time::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;
use std::sync::Arc;

#[test]
fn test_init_logging_installs_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }));

    init_logging(config.clone()).expect("first init succeeds");
    tracing::warn!(target: "core_library::query", "forwarded to console sink");

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Logging(_))));
}
