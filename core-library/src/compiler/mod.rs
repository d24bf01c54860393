//! # Library Query Compiler
//!
//! Turns a [`FilterSpec`] into parameterized SQL for one of the library's
//! result shapes:
//!
//! | shape | rows | tag filters read |
//! |---|---|---|
//! | [`compile_albums`] | one per album | album tags |
//! | [`compile_tracks`] | one per track, joined to its album | effective tags |
//! | [`compile_album_tracks`] | tracks of one album | effective tags |
//! | [`compile_track_album_headers`] | one per album with a matching track | effective tags |
//!
//! Effective tags of a track are its own tags plus its album's tags.
//!
//! Compilation is pure and infallible. Every predicate is ANDed in a fixed
//! order (album scope, text, include tags, exclude tags, voice actors,
//! circles, source) and the argument list matches the placeholders one to
//! one, left to right. User input only ever travels as an argument.
//!
//! ```
//! use core_library::compiler::compile_albums;
//! use core_library::filter::{FilterSpec, SortOrder};
//! use core_library::models::TagId;
//!
//! let spec = FilterSpec::new()
//!     .with_text_query("yuki")
//!     .toggle_include_tag(TagId(3))
//!     .with_sort(SortOrder::TitleAsc);
//! let query = compile_albums(&spec);
//! assert_eq!(query.placeholder_count(), query.args().len());
//! ```

mod fragment;

use crate::filter::{FilterSpec, SortOrder, SourceFilter};
use crate::models::AlbumId;
use crate::normalize::normalize_token;
use bridge_traits::database::QueryValue;
use std::collections::BTreeSet;
use tracing::trace;

use fragment::{escape_like, fold_and, Predicate, TagSource};

/// A single positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindValue {
    Integer(i64),
    Text(String),
}

impl From<&BindValue> for QueryValue {
    fn from(value: &BindValue) -> Self {
        match value {
            BindValue::Integer(i) => QueryValue::Integer(*i),
            BindValue::Text(s) => QueryValue::Text(s.clone()),
        }
    }
}

/// Which result shape a query produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    AlbumRows,
    TrackRows,
    AlbumTracks(AlbumId),
    TrackAlbumHeaders,
}

/// Query text with `?` placeholders and its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    sql: String,
    args: Vec<BindValue>,
    shape: QueryShape,
}

impl CompiledQuery {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[BindValue] {
        &self.args
    }

    pub fn shape(&self) -> QueryShape {
        self.shape
    }

    /// Number of `?` placeholders outside string literals.
    pub fn placeholder_count(&self) -> usize {
        let mut in_literal = false;
        let mut count = 0;
        for c in self.sql.chars() {
            match c {
                '\'' => in_literal = !in_literal,
                '?' if !in_literal => count += 1,
                _ => {}
            }
        }
        count
    }

    pub fn to_query_values(&self) -> Vec<QueryValue> {
        self.args.iter().map(QueryValue::from).collect()
    }

    /// The same query restricted to one window of rows.
    pub fn paginated(&self, limit: u32, offset: u32) -> CompiledQuery {
        let mut args = self.args.clone();
        args.push(BindValue::Integer(i64::from(limit)));
        args.push(BindValue::Integer(i64::from(offset)));
        CompiledQuery {
            sql: format!("{} LIMIT ? OFFSET ?", self.sql),
            args,
            shape: self.shape,
        }
    }

    /// `SELECT COUNT(*) AS count` over the rows this query returns.
    pub fn count_query(&self) -> CompiledQuery {
        CompiledQuery {
            sql: format!("SELECT COUNT(*) AS count FROM ({}) counted", self.sql),
            args: self.args.clone(),
            shape: self.shape,
        }
    }
}

const ALBUM_TEXT_COLUMNS: &[&str] = &["a.title", "a.circle", "a.cv", "a.rj_code", "a.work_id"];

const TRACK_TEXT_COLUMNS: &[&str] = &[
    "a.title",
    "a.circle",
    "a.cv",
    "a.rj_code",
    "a.work_id",
    "t.title",
];

const COVER_PATH: &str = "CASE WHEN a.cover_thumb_path IS NOT NULL AND a.cover_thumb_path != '' \
     THEN a.cover_thumb_path ELSE a.cover_path END AS cover_path";

const ALBUM_HEADER_COLUMNS: &str = "a.id AS album_id, a.title AS album_title, a.circle AS circle, \
     a.cv AS cv, a.cover_url AS cover_url";

const ALBUM_CODE_COLUMNS: &str = "a.work_id AS work_id, a.rj_code AS rj_code";

const TRACKS_FROM: &str = " FROM tracks t JOIN albums a ON a.id = t.album_id";

const PLAY_STATS_JOIN: &str = " LEFT JOIN album_play_stats ps ON ps.album_id = a.id";

fn track_projection() -> String {
    format!(
        "SELECT t.id AS track_id, t.album_id AS album_id, t.title AS track_title, \
         t.path AS track_path, t.duration AS duration, \
         (EXISTS (SELECT 1 FROM subtitles s WHERE s.track_id = t.id) \
         OR EXISTS (SELECT 1 FROM remote_subtitle_sources rs WHERE rs.track_id = t.id)) AS has_subtitles, \
         t.group_label AS track_group, a.title AS album_title, a.circle AS circle, a.cv AS cv, \
         a.cover_url AS cover_url, {COVER_PATH}, {ALBUM_CODE_COLUMNS}"
    )
}

fn header_projection() -> String {
    format!("SELECT {ALBUM_HEADER_COLUMNS}, {COVER_PATH}, {ALBUM_CODE_COLUMNS}")
}

/// ORDER BY terms for album-level ordering.
fn album_order(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::AddedDesc => "a.id DESC",
        SortOrder::TitleAsc => "a.title COLLATE NOCASE ASC, a.id DESC",
        SortOrder::RjAsc => "a.rj_code COLLATE NOCASE ASC, a.id DESC",
        SortOrder::CircleAsc => "a.circle COLLATE NOCASE ASC, a.id DESC",
        SortOrder::CvAsc => "a.cv COLLATE NOCASE ASC, a.id DESC",
        SortOrder::LastPlayedDesc => {
            "CASE WHEN ps.last_played_at IS NULL THEN 1 ELSE 0 END ASC, \
             ps.last_played_at DESC, a.id DESC"
        }
    }
}

/// Album ordering, then file order inside each album.
fn track_order(sort: SortOrder) -> String {
    format!(
        "{}, t.path COLLATE NOCASE ASC, t.id ASC",
        album_order(sort)
    )
}

/// Predicates for `spec` in their fixed order.
fn collect_predicates(
    spec: &FilterSpec,
    scope: Option<AlbumId>,
    tags: TagSource,
    text_columns: &'static [&'static str],
) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    if let Some(album_id) = scope {
        predicates.push(Predicate::AlbumScope(album_id));
    }

    if let Some(text) = spec.text_query() {
        predicates.push(Predicate::TextMatch {
            pattern: format!("%{}%", escape_like(text)),
            columns: text_columns,
            tags,
        });
    }

    if !spec.include_tag_ids().is_empty() {
        predicates.push(Predicate::TagAllOf {
            tags,
            ids: spec.include_tag_ids().iter().copied().collect(),
        });
    }

    if !spec.exclude_tag_ids().is_empty() {
        predicates.push(Predicate::TagNoneOf {
            tags,
            ids: spec.exclude_tag_ids().iter().copied().collect(),
        });
    }

    let tokens: BTreeSet<String> = spec
        .voice_actors()
        .iter()
        .map(|actor| normalize_token(actor))
        .filter(|token| !token.is_empty())
        .collect();
    if !tokens.is_empty() {
        predicates.push(Predicate::ActorAnyOf {
            tokens: tokens.into_iter().collect(),
        });
    }

    if !spec.circles().is_empty() {
        predicates.push(Predicate::CircleIn {
            circles: spec.circles().iter().cloned().collect(),
        });
    }

    if let Some(source) = spec.source() {
        if source != SourceFilter::Both {
            predicates.push(Predicate::SourcePresence(source));
        }
    }

    predicates
}

fn assemble(
    head: String,
    predicates: &[Predicate],
    group_by: Option<&str>,
    order_by: &str,
    shape: QueryShape,
) -> CompiledQuery {
    let mut sql = head;
    let mut args = Vec::new();
    fold_and(predicates, &mut sql, &mut args);
    if let Some(group) = group_by {
        sql.push_str(" GROUP BY ");
        sql.push_str(group);
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(order_by);

    let query = CompiledQuery { sql, args, shape };
    trace!(
        shape = ?query.shape,
        predicates = predicates.len(),
        args = query.args.len(),
        "Compiled library query"
    );
    query
}

fn with_play_stats(mut head: String, sort: SortOrder) -> String {
    if sort == SortOrder::LastPlayedDesc {
        head.push_str(PLAY_STATS_JOIN);
    }
    head
}

/// Album rows matching `spec`.
pub fn compile_albums(spec: &FilterSpec) -> CompiledQuery {
    let head = with_play_stats("SELECT a.* FROM albums a".to_string(), spec.sort());
    let predicates = collect_predicates(spec, None, TagSource::AlbumTags, ALBUM_TEXT_COLUMNS);
    assemble(
        head,
        &predicates,
        None,
        album_order(spec.sort()),
        QueryShape::AlbumRows,
    )
}

/// Track rows across the whole library.
pub fn compile_tracks(spec: &FilterSpec) -> CompiledQuery {
    compile_track_rows(spec, None)
}

/// Track rows of one album. The album predicate is always present.
pub fn compile_album_tracks(spec: &FilterSpec, album_id: AlbumId) -> CompiledQuery {
    compile_track_rows(spec, Some(album_id))
}

fn compile_track_rows(spec: &FilterSpec, scope: Option<AlbumId>) -> CompiledQuery {
    let head = with_play_stats(format!("{}{TRACKS_FROM}", track_projection()), spec.sort());
    let predicates = collect_predicates(
        spec,
        scope,
        TagSource::TrackEffectiveTags,
        TRACK_TEXT_COLUMNS,
    );
    let shape = match scope {
        Some(album_id) => QueryShape::AlbumTracks(album_id),
        None => QueryShape::TrackRows,
    };
    assemble(head, &predicates, None, &track_order(spec.sort()), shape)
}

/// One header per album owning at least one matching track.
pub fn compile_track_album_headers(spec: &FilterSpec) -> CompiledQuery {
    let head = with_play_stats(format!("{}{TRACKS_FROM}", header_projection()), spec.sort());
    let predicates = collect_predicates(
        spec,
        None,
        TagSource::TrackEffectiveTags,
        TRACK_TEXT_COLUMNS,
    );
    assemble(
        head,
        &predicates,
        Some("a.id"),
        album_order(spec.sort()),
        QueryShape::TrackAlbumHeaders,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TagId;

    fn text(value: &str) -> BindValue {
        BindValue::Text(value.to_string())
    }

    fn all_shapes(spec: &FilterSpec) -> Vec<CompiledQuery> {
        vec![
            compile_albums(spec),
            compile_tracks(spec),
            compile_album_tracks(spec, AlbumId(11)),
            compile_track_album_headers(spec),
        ]
    }

    fn sample_specs() -> Vec<FilterSpec> {
        let full = FilterSpec::new()
            .with_text_query("rain")
            .with_include_tags([TagId(1), TagId(2)])
            .with_exclude_tags([TagId(9)])
            .toggle_voice_actor("Aoi Yuki")
            .toggle_voice_actor("Sato，Hana")
            .toggle_circle("Circle A")
            .toggle_circle("Circle B")
            .with_source(Some(SourceFilter::DownloadOnly))
            .with_sort(SortOrder::LastPlayedDesc);
        vec![
            FilterSpec::new(),
            FilterSpec::new().with_text_query("100%"),
            FilterSpec::new().toggle_include_tag(TagId(4)),
            FilterSpec::new().toggle_exclude_tag(TagId(4)),
            FilterSpec::new().toggle_voice_actor("x"),
            FilterSpec::new().with_source(Some(SourceFilter::LocalAndDownload)),
            full,
        ]
    }

    #[test]
    fn placeholders_match_arguments_for_every_shape() {
        for spec in sample_specs() {
            for query in all_shapes(&spec) {
                assert_eq!(
                    query.placeholder_count(),
                    query.args().len(),
                    "{:?}: {}",
                    query.shape(),
                    query.sql()
                );
                let paged = query.paginated(20, 40);
                assert_eq!(paged.placeholder_count(), paged.args().len());
                let count = query.count_query();
                assert_eq!(count.placeholder_count(), count.args().len());
            }
        }
    }

    #[test]
    fn empty_spec_selects_everything_in_sort_order() {
        let query = compile_albums(&FilterSpec::new());
        assert_eq!(query.sql(), "SELECT a.* FROM albums a ORDER BY a.id DESC");
        assert!(query.args().is_empty());
    }

    #[test]
    fn text_and_include_tags_on_album_rows() {
        let spec = FilterSpec::new()
            .with_text_query("yuki")
            .with_include_tags([TagId(7), TagId(3)])
            .with_sort(SortOrder::TitleAsc);
        let query = compile_albums(&spec);

        let mut expected = vec![text("%yuki%"); 6];
        expected.extend([
            BindValue::Integer(3),
            BindValue::Integer(7),
            BindValue::Integer(2),
        ]);
        assert_eq!(query.args(), expected.as_slice());

        let sql = query.sql();
        let text_at = sql.find("a.title LIKE ?").unwrap();
        let tags_at = sql.find("HAVING COUNT(DISTINCT et.tag_id) = ?").unwrap();
        assert!(text_at < tags_at);
        assert!(sql.contains(") AND a.id IN (SELECT"));
        assert!(sql.ends_with("ORDER BY a.title COLLATE NOCASE ASC, a.id DESC"));
    }

    #[test]
    fn local_only_is_one_predicate_without_arguments() {
        let spec = FilterSpec::new().with_source(Some(SourceFilter::LocalOnly));
        let query = compile_albums(&spec);

        assert!(query.args().is_empty());
        assert_eq!(query.sql().matches(" WHERE ").count(), 1);
        let where_clause = &query.sql()[query.sql().find(" WHERE ").unwrap()..];
        let where_clause = &where_clause[..where_clause.find(" ORDER BY").unwrap()];
        assert!(!where_clause.contains(") AND ("));
    }

    #[test]
    fn source_both_and_none_emit_nothing() {
        let both = compile_albums(&FilterSpec::new().with_source(Some(SourceFilter::Both)));
        assert_eq!(both, compile_albums(&FilterSpec::new()));
    }

    #[test]
    fn blank_text_equals_absent_text() {
        let blank: FilterSpec = serde_json::from_str(r#"{"text_query":"   "}"#).unwrap();
        for (a, b) in all_shapes(&blank).iter().zip(all_shapes(&FilterSpec::new())) {
            assert_eq!(a.sql(), b.sql());
            assert_eq!(a.args(), b.args());
        }
    }

    #[test]
    fn empty_tag_sets_equal_no_tag_filtering() {
        let spec = FilterSpec::new()
            .with_include_tags(Vec::new())
            .with_exclude_tags(Vec::new());
        assert_eq!(compile_tracks(&spec), compile_tracks(&FilterSpec::new()));
    }

    #[test]
    fn track_shapes_search_seven_sites() {
        let spec = FilterSpec::new().with_text_query("  yuki ");
        for query in [compile_tracks(&spec), compile_track_album_headers(&spec)] {
            assert_eq!(query.args(), vec![text("%yuki%"); 7].as_slice());
            assert!(query.sql().contains("t.title LIKE ?"));
            assert!(query.sql().contains("UNION ALL"));
        }
    }

    #[test]
    fn text_wildcards_are_escaped() {
        let query = compile_albums(&FilterSpec::new().with_text_query("50%_off"));
        assert_eq!(query.args()[0], text("%50\\%\\_off%"));
        assert!(query.sql().contains("ESCAPE '\\'"));
    }

    #[test]
    fn album_scope_comes_first() {
        let spec = FilterSpec::new().with_text_query("a");
        let query = compile_album_tracks(&spec, AlbumId(42));

        assert!(query.sql().contains(" WHERE t.album_id = ? AND ("));
        assert_eq!(query.args()[0], BindValue::Integer(42));
        assert_eq!(query.shape(), QueryShape::AlbumTracks(AlbumId(42)));

        let bare = compile_album_tracks(&FilterSpec::new(), AlbumId(42));
        assert_eq!(bare.args(), &[BindValue::Integer(42)]);
    }

    #[test]
    fn predicate_order_is_fixed() {
        let spec = FilterSpec::new()
            .with_source(Some(SourceFilter::LocalOnly))
            .toggle_circle("C")
            .toggle_voice_actor("V")
            .toggle_exclude_tag(TagId(2))
            .toggle_include_tag(TagId(1))
            .with_text_query("t");
        let sql = compile_albums(&spec).sql().to_string();

        let positions: Vec<usize> = [
            "a.title LIKE ?",
            "HAVING COUNT(DISTINCT",
            "a.id NOT IN",
            "(',' || LOWER(",
            "a.circle IN (",
            "a.local_path IS NOT NULL",
        ]
        .iter()
        .map(|needle| sql.find(needle).unwrap_or_else(|| panic!("{needle} missing")))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{sql}");
    }

    #[test]
    fn voice_actor_tokens_are_normalized_and_deduplicated() {
        let spec = FilterSpec::new()
            .toggle_voice_actor("Aoi Yuki")
            .toggle_voice_actor("aoiyuki")
            .toggle_voice_actor(",");
        let query = compile_albums(&spec);
        assert_eq!(query.args(), &[text("%,aoiyuki,%")]);
    }

    #[test]
    fn voice_actor_filter_of_only_separators_is_dropped() {
        let spec = FilterSpec::new().toggle_voice_actor("，");
        assert_eq!(compile_albums(&spec), compile_albums(&FilterSpec::new()));
    }

    #[test]
    fn last_played_joins_play_stats_and_puts_unplayed_last() {
        let spec = FilterSpec::new().with_sort(SortOrder::LastPlayedDesc);
        for query in all_shapes(&spec) {
            assert!(query
                .sql()
                .contains("LEFT JOIN album_play_stats ps ON ps.album_id = a.id"));
            assert!(query.sql().contains(
                "ORDER BY CASE WHEN ps.last_played_at IS NULL THEN 1 ELSE 0 END ASC, ps.last_played_at DESC, a.id DESC"
            ));
        }
        assert!(!compile_albums(&FilterSpec::new()).sql().contains("album_play_stats"));
    }

    #[test]
    fn every_sort_has_an_id_tiebreaker() {
        for sort in [
            SortOrder::AddedDesc,
            SortOrder::TitleAsc,
            SortOrder::RjAsc,
            SortOrder::CircleAsc,
            SortOrder::CvAsc,
            SortOrder::LastPlayedDesc,
        ] {
            let spec = FilterSpec::new().with_sort(sort);
            assert!(compile_albums(&spec).sql().ends_with("a.id DESC"));
            assert!(compile_track_album_headers(&spec).sql().ends_with("a.id DESC"));
            assert!(compile_tracks(&spec)
                .sql()
                .ends_with("a.id DESC, t.path COLLATE NOCASE ASC, t.id ASC"));
        }
    }

    #[test]
    fn headers_group_by_album() {
        let query = compile_track_album_headers(&FilterSpec::new());
        assert!(query.sql().starts_with("SELECT a.id AS album_id"));
        assert!(query.sql().contains(" GROUP BY a.id ORDER BY "));
        assert!(query.sql().contains("AS cover_path"));
    }

    #[test]
    fn paginated_and_count_wrap_the_query() {
        let query = compile_albums(&FilterSpec::new().toggle_circle("C"));
        let paged = query.paginated(25, 50);
        assert!(paged.sql().ends_with(" LIMIT ? OFFSET ?"));
        assert_eq!(
            &paged.args()[1..],
            &[BindValue::Integer(25), BindValue::Integer(50)]
        );

        let count = query.count_query();
        assert!(count.sql().starts_with("SELECT COUNT(*) AS count FROM (SELECT a.*"));
        assert_eq!(count.args(), query.args());
        assert_eq!(
            query.to_query_values(),
            vec![QueryValue::Text("C".to_string())]
        );
    }

    #[test]
    fn equal_specs_compile_identically() {
        let a = FilterSpec::new()
            .toggle_circle("B")
            .toggle_circle("A")
            .toggle_include_tag(TagId(5))
            .toggle_include_tag(TagId(1));
        let b = FilterSpec::new()
            .toggle_include_tag(TagId(1))
            .toggle_include_tag(TagId(5))
            .toggle_circle("A")
            .toggle_circle("B");
        assert_eq!(compile_tracks(&a), compile_tracks(&b));
    }
}
