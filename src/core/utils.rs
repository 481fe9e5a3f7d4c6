/// Bytes in one megabyte (binary, as shown to users).
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Converts a byte count to megabytes.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Formats a duration as `H:MM:SS`.
///
/// # Example
///
/// ```
/// use upmirror::core::utils::format_hms;
///
/// assert_eq!(format_hms(0), "0:00:00");
/// assert_eq!(format_hms(3725), "1:02:05");
/// ```
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// Truncates text to at most `max_chars` characters, appending an ellipsis.
///
/// Telegram rejects messages over 4096 characters; raw backend responses are
/// cut with this before they reach a status message.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
