//! Workspace umbrella crate.
//!
//! Host applications can depend on `eara-workspace` and pick a feature instead
//! of wiring the member crates one by one:
//!
//! - `service` (default): the bootstrapped [`core_service::CoreService`] plus
//!   the library crate.
//! - `compiler-only`: just `core-library`, for hosts that bring their own
//!   store and only need compiled queries.

#[cfg(feature = "service")]
pub use core_service;

#[cfg(any(feature = "service", feature = "compiler-only"))]
pub use core_library;
