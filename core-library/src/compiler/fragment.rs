//! WHERE-clause fragments.
//!
//! Each [`Predicate`] renders its own SQL and pushes its own arguments, in
//! the same left-to-right order as its placeholders. [`fold_and`] is the only
//! place fragments are joined, so the argument list always lines up with the
//! text.

use super::BindValue;
use crate::filter::SourceFilter;
use crate::models::{AlbumId, TagId};
use crate::normalize::sql_field_expr;

/// Escape character used by every `LIKE` the compiler emits.
const LIKE_ESCAPE: char = '\\';

/// Where tag membership is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagSource {
    /// Album-level tags, keyed by album id
    AlbumTags,
    /// Track tags plus the owning album's tags, keyed by track id
    TrackEffectiveTags,
}

const EFFECTIVE_TRACK_TAGS: &str = "(SELECT track_id AS item_id, tag_id FROM track_tag \
     UNION ALL \
     SELECT t2.id AS item_id, at2.tag_id AS tag_id FROM tracks t2 \
     JOIN album_tag at2 ON at2.album_id = t2.album_id)";

impl TagSource {
    /// Outer column the membership test applies to.
    fn subject(self) -> &'static str {
        match self {
            TagSource::AlbumTags => "a.id",
            TagSource::TrackEffectiveTags => "t.id",
        }
    }

    fn relation(self) -> &'static str {
        match self {
            TagSource::AlbumTags => "album_tag",
            TagSource::TrackEffectiveTags => EFFECTIVE_TRACK_TAGS,
        }
    }

    fn item_column(self) -> &'static str {
        match self {
            TagSource::AlbumTags => "album_id",
            TagSource::TrackEffectiveTags => "item_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Predicate {
    /// `t.album_id = ?`
    AlbumScope(AlbumId),
    /// Substring match over plain columns plus tag display names
    TextMatch {
        pattern: String,
        columns: &'static [&'static str],
        tags: TagSource,
    },
    /// Carries every listed tag
    TagAllOf { tags: TagSource, ids: Vec<TagId> },
    /// Carries none of the listed tags
    TagNoneOf { tags: TagSource, ids: Vec<TagId> },
    /// Voice-actor field holds any of the normalized tokens
    ActorAnyOf { tokens: Vec<String> },
    CircleIn { circles: Vec<String> },
    SourcePresence(SourceFilter),
}

impl Predicate {
    fn render(&self, sql: &mut String, args: &mut Vec<BindValue>) {
        match self {
            Predicate::AlbumScope(album_id) => {
                sql.push_str("t.album_id = ?");
                args.push(BindValue::Integer(album_id.value()));
            }
            Predicate::TextMatch {
                pattern,
                columns,
                tags,
            } => {
                let mut sites: Vec<String> = columns
                    .iter()
                    .map(|column| format!("{column} LIKE ? ESCAPE '{LIKE_ESCAPE}'"))
                    .collect();
                sites.push(format!(
                    "EXISTS (SELECT 1 FROM {relation} et JOIN tags tg ON tg.id = et.tag_id \
                     WHERE et.{item} = {subject} AND tg.name LIKE ? ESCAPE '{LIKE_ESCAPE}')",
                    relation = tags.relation(),
                    item = tags.item_column(),
                    subject = tags.subject(),
                ));
                sql.push('(');
                sql.push_str(&sites.join(" OR "));
                sql.push(')');
                for _ in 0..sites.len() {
                    args.push(BindValue::Text(pattern.clone()));
                }
            }
            Predicate::TagAllOf { tags, ids } => {
                sql.push_str(&format!(
                    "{subject} IN (SELECT et.{item} FROM {relation} et WHERE et.tag_id IN ({placeholders}) \
                     GROUP BY et.{item} HAVING COUNT(DISTINCT et.tag_id) = ?)",
                    subject = tags.subject(),
                    item = tags.item_column(),
                    relation = tags.relation(),
                    placeholders = placeholders(ids.len()),
                ));
                args.extend(ids.iter().map(|id| BindValue::Integer(id.value())));
                args.push(BindValue::Integer(ids.len() as i64));
            }
            Predicate::TagNoneOf { tags, ids } => {
                sql.push_str(&format!(
                    "{subject} NOT IN (SELECT et.{item} FROM {relation} et WHERE et.tag_id IN ({placeholders}))",
                    subject = tags.subject(),
                    item = tags.item_column(),
                    relation = tags.relation(),
                    placeholders = placeholders(ids.len()),
                ));
                args.extend(ids.iter().map(|id| BindValue::Integer(id.value())));
            }
            Predicate::ActorAnyOf { tokens } => {
                let field = sql_field_expr("a.cv");
                let clauses: Vec<String> = tokens
                    .iter()
                    .map(|_| format!("{field} LIKE ? ESCAPE '{LIKE_ESCAPE}'"))
                    .collect();
                sql.push('(');
                sql.push_str(&clauses.join(" OR "));
                sql.push(')');
                args.extend(
                    tokens
                        .iter()
                        .map(|token| BindValue::Text(format!("%,{},%", escape_like(token)))),
                );
            }
            Predicate::CircleIn { circles } => {
                sql.push_str(&format!("a.circle IN ({})", placeholders(circles.len())));
                args.extend(circles.iter().cloned().map(BindValue::Text));
            }
            Predicate::SourcePresence(source) => {
                sql.push_str(source_clause(*source));
            }
        }
    }
}

fn source_clause(source: SourceFilter) -> &'static str {
    match source {
        SourceFilter::LocalOnly => {
            "(a.local_path IS NOT NULL AND a.local_path != '' \
             AND (a.download_path IS NULL OR a.download_path = ''))"
        }
        SourceFilter::DownloadOnly => {
            "(a.download_path IS NOT NULL AND a.download_path != '' \
             AND (a.local_path IS NULL OR a.local_path = ''))"
        }
        SourceFilter::LocalAndDownload => {
            "(a.local_path IS NOT NULL AND a.local_path != '' \
             AND a.download_path IS NOT NULL AND a.download_path != '')"
        }
        SourceFilter::Both => "1 = 1",
    }
}

/// `?, ?, ?` with `n` placeholders.
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Escape `LIKE` wildcards so user text matches literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Append ` WHERE p1 AND p2 ...` (nothing for an empty list).
pub(crate) fn fold_and(predicates: &[Predicate], sql: &mut String, args: &mut Vec<BindValue>) {
    for (index, predicate) in predicates.iter().enumerate() {
        sql.push_str(if index == 0 { " WHERE " } else { " AND " });
        predicate.render(sql, args);
    }
}
