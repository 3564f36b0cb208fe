//! Track link recognition.

use once_cell::sync::Lazy;
use regex::Regex;

/// `http(s)://[www.]soundcloud.com/<owner>/<slug>`, segments of word chars, `-` and `.`.
static TRACK_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?soundcloud\.com/[\w\-.]+/[\w\-.]+").unwrap()
});

/// Return the first track URL found in `text`, if any.
pub fn match_track_url(text: &str) -> Option<&str> {
    TRACK_URL_PATTERN.find(text).map(|m| m.as_str())
}
