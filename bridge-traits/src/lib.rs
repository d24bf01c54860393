//! # Host Bridge Traits
//!
//! Contracts between the library core and whatever the host provides.
//!
//! ## Overview
//!
//! The library core compiles filter specifications into positional SQL and
//! hands them to a store it does not own. This crate names the capabilities
//! the core relies on so that hosts (desktop, mobile, tests) can plug in their
//! own implementations:
//!
//! - [`DatabaseAdapter`](database::DatabaseAdapter) - executes query text with
//!   positional placeholders and an ordered argument list
//! - [`SettingsStore`](settings::SettingsStore) - key-value preferences, used
//!   for persisted filter presets
//! - [`LoggerSink`](time::LoggerSink) - forwards structured logs to the host
//!
//! ## Error Handling
//!
//! Every bridge returns [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep the message actionable
//! (include the statement or key that failed, never the bound values).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single handle can be shared
//! across async tasks behind an `Arc`.

pub mod database;
pub mod error;
pub mod settings;
pub mod time;

pub use error::BridgeError;

pub use database::{DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue};
pub use settings::{InMemorySettingsStore, SettingsStore};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
