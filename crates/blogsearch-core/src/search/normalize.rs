//! Text normalization and input sanitization
//!
//! `normalize` folds case and strips diacritics so that "Nguyễn Đức" and
//! "nguyen duc" compare equal. `sanitize` runs first on raw keystrokes.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Longest raw query accepted by `sanitize`, in characters
pub const MAX_QUERY_LENGTH: usize = 100;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Lowercase, decompose, drop combining marks, map đ to d, trim.
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' | 'Đ' => 'd',
            other => other,
        })
        .collect();
    folded.trim().to_string()
}

/// Strip tag-like substrings and `< > ' " &`, trim, cap at
/// [`MAX_QUERY_LENGTH`] characters.
pub fn sanitize(text: &str) -> String {
    sanitize_with_limit(text, MAX_QUERY_LENGTH)
}

/// `sanitize` with a caller-chosen length cap
pub fn sanitize_with_limit(text: &str, max_chars: usize) -> String {
    let without_tags = HTML_TAG.replace_all(text, "");
    let cleaned: String = without_tags
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '\'' | '"' | '&'))
        .collect();
    cleaned.trim().chars().take(max_chars).collect()
}

/// Sanitize then normalize, the pipeline every query goes through
pub fn prepare_query(raw: &str, max_chars: usize) -> String {
    normalize(&sanitize_with_limit(raw, max_chars))
}
