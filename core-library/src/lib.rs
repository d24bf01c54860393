//! # Library Query Module
//!
//! Compiles user-composed library filters into parameterized SQL and runs
//! them against the album/track store.
//!
//! ## Overview
//!
//! This module manages:
//! - The [`FilterSpec`] value and its state transitions
//! - Voice-actor normalization shared by Rust and SQL
//! - The query compiler for album rows, track rows, one album's tracks and
//!   album headers of matching tracks
//! - SQLite schema, migrations and the native adapter
//! - Paged query execution, facet listings and saved filter presets
//!
//! ## Usage
//!
//! ```ignore
//! use core_library::{FilterSpec, LibraryQueryService, PageRequest, SortOrder};
//!
//! let spec = FilterSpec::new()
//!     .with_text_query("yuki")
//!     .with_sort(SortOrder::TitleAsc);
//! let page = service.query_albums(&spec, PageRequest::first(50)).await?;
//! ```

pub mod adapters;
pub mod compiler;
pub mod error;
pub mod filter;
pub mod models;
pub mod normalize;
pub mod pagination;
pub mod presets;
pub mod query;

pub use adapters::SqliteAdapter;
pub use compiler::{
    compile_album_tracks, compile_albums, compile_track_album_headers, compile_tracks, BindValue,
    CompiledQuery, QueryShape,
};
pub use error::{LibraryError, Result};
pub use filter::{FilterSpec, SortOrder, SourceFilter};
pub use models::{
    Album, AlbumId, LibraryAlbumHeaderRow, LibraryTrackRow, TagId, TagWithCount, TrackId,
};
pub use pagination::{Page, PageRequest};
pub use presets::{FilterPreset, FilterPresetStore};
pub use query::LibraryQueryService;
