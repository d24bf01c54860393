//! The user-composable library filter.
//!
//! [`FilterSpec`] is a plain value: every operation returns a new spec and
//! leaves the receiver untouched, so a spec can be shared between the query
//! layer, the preset store and the UI without coordination.

use crate::models::TagId;
use crate::normalize::is_stripped;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which storage locations an album must (or must not) have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFilter {
    /// Local copy present, no download copy
    LocalOnly,
    /// Download copy present, no local copy
    DownloadOnly,
    /// Both copies present
    LocalAndDownload,
    /// No restriction
    Both,
}

/// Result ordering. Every variant ends in an id-descending tiebreaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Most recently added first
    #[default]
    AddedDesc,
    TitleAsc,
    RjAsc,
    CircleAsc,
    CvAsc,
    /// Most recently played first; never-played albums last
    LastPlayedDesc,
}

/// Filter and sort request for the library views.
///
/// Sets are ordered so that compiled queries bind their arguments in a
/// stable order for equal specs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    text_query: Option<String>,
    include_tag_ids: BTreeSet<TagId>,
    exclude_tag_ids: BTreeSet<TagId>,
    voice_actors: BTreeSet<String>,
    circles: BTreeSet<String>,
    source: Option<SourceFilter>,
    sort: SortOrder,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text query, if it has any non-blank content.
    pub fn text_query(&self) -> Option<&str> {
        self.text_query
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn include_tag_ids(&self) -> &BTreeSet<TagId> {
        &self.include_tag_ids
    }

    pub fn exclude_tag_ids(&self) -> &BTreeSet<TagId> {
        &self.exclude_tag_ids
    }

    pub fn voice_actors(&self) -> &BTreeSet<String> {
        &self.voice_actors
    }

    pub fn circles(&self) -> &BTreeSet<String> {
        &self.circles
    }

    pub fn source(&self) -> Option<SourceFilter> {
        self.source
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    /// Replace the text query. Input is trimmed; blank input clears it.
    pub fn with_text_query(&self, text: impl AsRef<str>) -> Self {
        let trimmed = text.as_ref().trim();
        Self {
            text_query: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            ..self.clone()
        }
    }

    pub fn without_text_query(&self) -> Self {
        Self {
            text_query: None,
            ..self.clone()
        }
    }

    pub fn with_sort(&self, sort: SortOrder) -> Self {
        Self {
            sort,
            ..self.clone()
        }
    }

    pub fn with_source(&self, source: Option<SourceFilter>) -> Self {
        Self {
            source,
            ..self.clone()
        }
    }

    pub fn with_include_tags(&self, tags: impl IntoIterator<Item = TagId>) -> Self {
        Self {
            include_tag_ids: tags.into_iter().collect(),
            ..self.clone()
        }
    }

    pub fn with_exclude_tags(&self, tags: impl IntoIterator<Item = TagId>) -> Self {
        Self {
            exclude_tag_ids: tags.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Add the tag to the include set, or remove it if already there.
    pub fn toggle_include_tag(&self, tag: TagId) -> Self {
        let mut next = self.clone();
        toggle(&mut next.include_tag_ids, tag);
        next
    }

    /// Add the tag to the exclude set, or remove it if already there.
    ///
    /// The include set is left alone; a tag in both sets matches nothing.
    pub fn toggle_exclude_tag(&self, tag: TagId) -> Self {
        let mut next = self.clone();
        toggle(&mut next.exclude_tag_ids, tag);
        next
    }

    /// Toggle a circle. Blank names are ignored.
    pub fn toggle_circle(&self, circle: &str) -> Self {
        let trimmed = circle.trim();
        if trimmed.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        toggle(&mut next.circles, trimmed.to_string());
        next
    }

    /// Toggle a voice actor. Blank names are ignored.
    pub fn toggle_voice_actor(&self, actor: &str) -> Self {
        let trimmed = actor.trim_matches(is_stripped);
        if trimmed.is_empty() {
            return self.clone();
        }
        let mut next = self.clone();
        toggle(&mut next.voice_actors, trimmed.to_string());
        next
    }

    /// Drop every filter dimension, keeping the text query and sort.
    pub fn cleared_filters(&self) -> Self {
        Self {
            text_query: self.text_query.clone(),
            sort: self.sort,
            ..Self::default()
        }
    }

    /// Whether any dimension other than text and sort restricts results.
    pub fn has_filters(&self) -> bool {
        !self.include_tag_ids.is_empty()
            || !self.exclude_tag_ids.is_empty()
            || !self.voice_actors.is_empty()
            || !self.circles.is_empty()
            || matches!(
                self.source,
                Some(SourceFilter::LocalOnly)
                    | Some(SourceFilter::DownloadOnly)
                    | Some(SourceFilter::LocalAndDownload)
            )
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if set.contains(&value) {
        set.remove(&value);
    } else {
        set.insert(value);
    }
}
