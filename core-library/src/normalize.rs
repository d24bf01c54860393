//! Voice-actor text normalization.
//!
//! Album `cv` fields hold free-form, comma-separated credit lists typed by
//! humans and scraped from catalogs: `"Aoi Yuki，Sato Hana"`,
//! `"aoi yuki, sato hana"`, `"AoiYuki,SatoHana"`. Membership tests compare
//! normalized keys so that all three forms agree.
//!
//! Two modes share one rule set:
//! - [`normalize_field`] turns a whole field into `,tok1,tok2,...,`
//! - [`normalize_token`] turns a single name into a bare key
//!
//! For every token `x` present in a field `f`,
//! `normalize_field(f)` contains `,normalize_token(x),`.
//!
//! The SQL side of the comparison is generated by [`sql_field_expr`] from the
//! same character table, so the store and Rust normalize identically.

/// Separator between names inside a normalized field.
pub const SEPARATOR: char = ',';

/// Full-width comma, folded into [`SEPARATOR`].
pub const FULLWIDTH_COMMA: char = '\u{FF0C}';

/// Whitespace removed during normalization, paired with its SQL literal.
const STRIPPED_WHITESPACE: &[(char, &str)] = &[
    (' ', "' '"),
    ('\u{A0}', "'\u{A0}'"),
    ('\u{3000}', "'\u{3000}'"),
    ('\t', "char(9)"),
    ('\n', "char(10)"),
    ('\r', "char(13)"),
];

/// Whether normalization drops `c`. Also the trim rule for display names.
pub(crate) fn is_stripped(c: char) -> bool {
    STRIPPED_WHITESPACE.iter().any(|(w, _)| *w == c)
}

/// Fold separators and drop whitespace, keeping commas.
fn fold(input: &str) -> String {
    input
        .chars()
        .filter(|c| !is_stripped(*c))
        .map(|c| if c == FULLWIDTH_COMMA { SEPARATOR } else { c })
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Normalize one name into a bare comparison key.
///
/// ```
/// use core_library::normalize::normalize_token;
///
/// assert_eq!(normalize_token(" Aoi Yuki "), "aoiyuki");
/// assert_eq!(normalize_token("A，B"), "ab");
/// ```
pub fn normalize_token(input: &str) -> String {
    fold(input).chars().filter(|c| *c != SEPARATOR).collect()
}

/// Normalize a whole credit field into `,tok1,tok2,...,`.
///
/// Empty segments are dropped, so `"A,,B"` and `"A, ,B"` both give `,a,b,`.
/// An empty field gives `,,`, which contains no token.
///
/// ```
/// use core_library::normalize::{normalize_field, normalize_token};
///
/// let field = normalize_field("A，B C");
/// assert_eq!(field, ",a,bc,");
/// assert!(field.contains(&format!(",{},", normalize_token("a"))));
/// ```
pub fn normalize_field(field: &str) -> String {
    let folded = fold(field);
    let tokens: Vec<&str> = folded
        .split(SEPARATOR)
        .filter(|token| !token.is_empty())
        .collect();

    let mut out = String::with_capacity(folded.len() + 2);
    out.push(SEPARATOR);
    out.push_str(&tokens.join(","));
    out.push(SEPARATOR);
    out
}

/// Split a credit field into trimmed display names (original casing).
///
/// Used for facet listings; comparison should still go through
/// [`normalize_token`].
pub fn split_display_tokens(field: &str) -> Vec<String> {
    field
        .split([SEPARATOR, FULLWIDTH_COMMA])
        .map(|part| part.trim_matches(is_stripped))
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// SQL expression evaluating to the normalized form of `column`.
///
/// Mirrors [`normalize_field`]: null becomes empty, the full-width comma is
/// folded, whitespace is removed, doubled separators collapse once and the
/// result is lower-cased and wrapped in separators.
pub(crate) fn sql_field_expr(column: &str) -> String {
    let mut expr = format!("REPLACE(IFNULL({column}, ''), '{FULLWIDTH_COMMA}', ',')");
    for (_, literal) in STRIPPED_WHITESPACE {
        expr = format!("REPLACE({expr}, {literal}, '')");
    }
    expr = format!("REPLACE({expr}, ',,', ',')");
    format!("(',' || LOWER({expr}) || ',')")
}
