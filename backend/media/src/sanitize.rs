//! File name sanitization for track titles.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest file stem we produce, in characters.
pub const MAX_FILENAME_CHARS: usize = 200;

static RESERVED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());
static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\-.]").unwrap());

/// Turn an arbitrary title into a safe, bounded file name.
///
/// Reserved path characters become `_`, anything else outside word characters,
/// whitespace, `-`, `_` and `.` is dropped, and the result is trimmed and cut to
/// [`MAX_FILENAME_CHARS`]. May return an empty string.
pub fn sanitize_filename(raw: &str) -> String {
    let replaced = RESERVED_CHARS.replace_all(raw, "_");
    let stripped = DISALLOWED_CHARS.replace_all(&replaced, "");
    let trimmed = stripped.trim();

    match trimmed.char_indices().nth(MAX_FILENAME_CHARS) {
        // Cutting can expose trailing whitespace, which a second pass would trim.
        Some((cut, _)) => trimmed[..cut].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}
