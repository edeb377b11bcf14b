//! Shared utility functions for uterm
//!
//! Small string helpers used by the context buffer and the prompt renderer.

use std::path::Path;

/// Safely truncate a string to max_chars characters (not bytes)
/// Avoids panic on multi-byte UTF-8 characters
///
/// # Examples
/// ```
/// use uterm::utils::truncate_str;
///
/// assert_eq!(truncate_str("hello world", 5), "hello");
///
/// let emoji = "hello 🌍 world";
/// assert_eq!(truncate_str(emoji, 7), "hello 🌍");
/// ```
#[inline]
pub fn truncate_str(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Cut `text` down to `max_chars` characters and append a marker saying how
/// many characters were dropped. Text within the limit is returned unchanged.
pub fn truncate_with_marker(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }

    format!(
        "{}\n... (truncated, {} chars omitted)",
        truncate_str(text, max_chars),
        total - max_chars
    )
}

/// Display `path` with a leading `home` replaced by `~`.
pub fn abbreviate_home(path: &Path, home: Option<&str>) -> String {
    let display = path.display().to_string();
    match home {
        Some(home) if !home.is_empty() && home != "/" => match display.strip_prefix(home) {
            Some("") => "~".to_string(),
            Some(rest) if rest.starts_with('/') => format!("~{}", rest),
            _ => display,
        },
        _ => display,
    }
}
