//! Domain models for the library
//!
//! Row types returned by the query service, plus the mapping from untyped
//! [`QueryRow`]s. Column names follow the aliases emitted by the compiler.

use crate::error::{LibraryError, Result};
use bridge_traits::database::{QueryRow, QueryValue};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// ID Types
// =============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for QueryValue {
            fn from(id: $name) -> Self {
                QueryValue::Integer(id.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Row id of an album
    AlbumId
);
define_id!(
    /// Row id of a track
    TrackId
);
define_id!(
    /// Row id of a tag
    TagId
);

// =============================================================================
// Album
// =============================================================================

/// One album with every stored attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    pub path: String,
    pub local_path: Option<String>,
    pub download_path: Option<String>,
    pub circle: String,
    /// Comma-separated voice-actor credits as entered
    pub cv: String,
    /// Denormalized tag names
    pub tags: String,
    pub cover_url: String,
    pub cover_path: String,
    pub cover_thumb_path: String,
    pub work_id: String,
    pub rj_code: String,
    pub rating_value: Option<f64>,
    pub rating_count: i64,
    pub release_date: String,
    pub dl_count: i64,
    pub price_jpy: i64,
    /// Listed in the external catalog
    pub has_asmr_one: bool,
    pub description: String,
}

impl Album {
    /// Cover to display: the thumbnail when one exists.
    pub fn display_cover_path(&self) -> &str {
        if self.cover_thumb_path.is_empty() {
            &self.cover_path
        } else {
            &self.cover_thumb_path
        }
    }

    pub fn has_local_copy(&self) -> bool {
        self.local_path.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn has_download_copy(&self) -> bool {
        self.download_path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

// =============================================================================
// Track rows
// =============================================================================

/// A track joined to the album fields the track list displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryTrackRow {
    pub track_id: TrackId,
    pub album_id: AlbumId,
    pub track_title: String,
    pub track_path: String,
    /// Seconds
    pub duration: f64,
    /// At least one local subtitle or one remote subtitle source
    pub has_subtitles: bool,
    pub track_group: String,
    pub album_title: String,
    pub circle: String,
    pub cv: String,
    pub cover_url: String,
    /// Thumbnail path when present, else the full cover path
    pub cover_path: String,
    pub work_id: String,
    pub rj_code: String,
}

/// Album header for the grouped track view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryAlbumHeaderRow {
    pub album_id: AlbumId,
    pub album_title: String,
    pub circle: String,
    pub cv: String,
    pub cover_url: String,
    pub cover_path: String,
    pub work_id: String,
    pub rj_code: String,
}

/// Tag with the number of distinct albums carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagWithCount {
    pub id: TagId,
    pub name: String,
    pub name_normalized: String,
    pub album_count: i64,
}

// =============================================================================
// Row mapping
// =============================================================================

pub(crate) fn row_to_album(row: &QueryRow) -> Result<Album> {
    Ok(Album {
        id: AlbumId(get_i64(row, "id")?),
        title: get_string(row, "title")?,
        path: get_string(row, "path")?,
        local_path: get_optional_string(row, "local_path")?,
        download_path: get_optional_string(row, "download_path")?,
        circle: get_string_or_empty(row, "circle"),
        cv: get_string_or_empty(row, "cv"),
        tags: get_string_or_empty(row, "tags"),
        cover_url: get_string_or_empty(row, "cover_url"),
        cover_path: get_string_or_empty(row, "cover_path"),
        cover_thumb_path: get_string_or_empty(row, "cover_thumb_path"),
        work_id: get_string_or_empty(row, "work_id"),
        rj_code: get_string_or_empty(row, "rj_code"),
        rating_value: row.get("rating_value").and_then(QueryValue::as_f64),
        rating_count: get_i64_or_zero(row, "rating_count"),
        release_date: get_string_or_empty(row, "release_date"),
        dl_count: get_i64_or_zero(row, "dl_count"),
        price_jpy: get_i64_or_zero(row, "price_jpy"),
        has_asmr_one: get_i64_or_zero(row, "has_asmr_one") != 0,
        description: get_string_or_empty(row, "description"),
    })
}

pub(crate) fn row_to_track_row(row: &QueryRow) -> Result<LibraryTrackRow> {
    Ok(LibraryTrackRow {
        track_id: TrackId(get_i64(row, "track_id")?),
        album_id: AlbumId(get_i64(row, "album_id")?),
        track_title: get_string(row, "track_title")?,
        track_path: get_string(row, "track_path")?,
        duration: row
            .get("duration")
            .and_then(QueryValue::as_f64)
            .unwrap_or_default(),
        has_subtitles: get_i64_or_zero(row, "has_subtitles") != 0,
        track_group: get_string_or_empty(row, "track_group"),
        album_title: get_string(row, "album_title")?,
        circle: get_string_or_empty(row, "circle"),
        cv: get_string_or_empty(row, "cv"),
        cover_url: get_string_or_empty(row, "cover_url"),
        cover_path: get_string_or_empty(row, "cover_path"),
        work_id: get_string_or_empty(row, "work_id"),
        rj_code: get_string_or_empty(row, "rj_code"),
    })
}

pub(crate) fn row_to_album_header(row: &QueryRow) -> Result<LibraryAlbumHeaderRow> {
    Ok(LibraryAlbumHeaderRow {
        album_id: AlbumId(get_i64(row, "album_id")?),
        album_title: get_string(row, "album_title")?,
        circle: get_string_or_empty(row, "circle"),
        cv: get_string_or_empty(row, "cv"),
        cover_url: get_string_or_empty(row, "cover_url"),
        cover_path: get_string_or_empty(row, "cover_path"),
        work_id: get_string_or_empty(row, "work_id"),
        rj_code: get_string_or_empty(row, "rj_code"),
    })
}

pub(crate) fn row_to_tag_with_count(row: &QueryRow) -> Result<TagWithCount> {
    Ok(TagWithCount {
        id: TagId(get_i64(row, "id")?),
        name: get_string(row, "name")?,
        name_normalized: get_string(row, "name_normalized")?,
        album_count: get_i64(row, "album_count")?,
    })
}

pub(crate) fn get_string(row: &QueryRow, key: &str) -> Result<String> {
    row.get(key)
        .and_then(QueryValue::as_string)
        .ok_or_else(|| missing_column(key))
}

fn get_optional_string(row: &QueryRow, key: &str) -> Result<Option<String>> {
    Ok(match row.get(key) {
        Some(QueryValue::Null) | None => None,
        Some(value) => Some(value.as_string().ok_or_else(|| missing_column(key))?),
    })
}

fn get_string_or_empty(row: &QueryRow, key: &str) -> String {
    row.get(key)
        .and_then(QueryValue::as_string)
        .unwrap_or_default()
}

pub(crate) fn get_i64(row: &QueryRow, key: &str) -> Result<i64> {
    row.get(key)
        .and_then(QueryValue::as_i64)
        .ok_or_else(|| missing_column(key))
}

fn get_i64_or_zero(row: &QueryRow, key: &str) -> i64 {
    row.get(key).and_then(QueryValue::as_i64).unwrap_or_default()
}

fn missing_column(column: &str) -> LibraryError {
    LibraryError::InvalidInput {
        field: column.to_string(),
        message: "missing column in result set".to_string(),
    }
}
