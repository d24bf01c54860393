//! # Core Runtime
//!
//! Ambient infrastructure shared by the library crates:
//! - tracing subscriber setup with optional forwarding to a host `LoggerSink`
//! - `CoreConfig`, the validated settings a host passes at bootstrap
//!
//! Nothing here knows about albums or tracks.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
