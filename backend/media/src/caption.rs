//! Caption text for delivered tracks.

use soundrelay_core::TrackMetadata;

/// `MM:SS`, minutes not wrapped into hours; `unknown` when absent.
pub fn format_duration(seconds: Option<u32>) -> String {
    match seconds {
        Some(s) => format!("{:02}:{:02}", s / 60, s % 60),
        None => "unknown".to_string(),
    }
}

pub fn format_size_mb(size_bytes: u64) -> String {
    format!("{:.1} MB", size_bytes as f64 / (1024.0 * 1024.0))
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// HTML caption shown under the audio attachment.
pub fn build_caption(meta: &TrackMetadata, size_bytes: u64) -> String {
    format!(
        "🎵 <b>{title}</b>\n\
         👤 <b>Artist:</b> {uploader}\n\
         ⏱ <b>Duration:</b> {duration}\n\
         💾 <b>Size:</b> {size}\n\n\
         <i>Downloaded from SoundCloud</i>",
        title = escape_html(&meta.title),
        uploader = escape_html(&meta.uploader),
        duration = format_duration(meta.duration_seconds),
        size = format_size_mb(size_bytes),
    )
}
