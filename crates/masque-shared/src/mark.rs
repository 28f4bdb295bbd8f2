//! The mark toggle applied to delivered message text or captions.
//!
//! The marker is a fixed suffix, so toggling is an exact inverse:
//! `toggle_mark(&toggle_mark(t).0).0 == t` for every `t`.

use crate::constants::MARK_SUFFIX;

/// Append the marker, or strip it if `text` already ends with it.
///
/// Returns the new text and whether it is now marked.
pub fn toggle_mark(text: &str) -> (String, bool) {
    match text.strip_suffix(MARK_SUFFIX) {
        Some(original) => (original.to_string(), false),
        None => (format!("{text}{MARK_SUFFIX}"), true),
    }
}

pub fn is_marked(text: &str) -> bool {
    text.ends_with(MARK_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_twice_is_identity() {
        for text in [
            "",
            "hello",
            "  padded  \n",
            "multi\nline\n",
            "ends with #mark",
            "emoji 🌹 text",
        ] {
            let (marked, is_marked_now) = toggle_mark(text);
            assert!(is_marked_now);
            assert!(is_marked(&marked));
            let (restored, still_marked) = toggle_mark(&marked);
            assert!(!still_marked);
            assert_eq!(restored.as_bytes(), text.as_bytes());
        }
    }

    #[test]
    fn test_toggle_from_marked_state() {
        let already = format!("note{MARK_SUFFIX}");
        let (stripped, marked) = toggle_mark(&already);
        assert_eq!(stripped, "note");
        assert!(!marked);
        assert_eq!(toggle_mark(&stripped).0, already);
    }

    #[test]
    fn test_marker_in_middle_is_not_a_mark() {
        let text = format!("a{MARK_SUFFIX} b");
        assert!(!is_marked(&text));
        let (marked, _) = toggle_mark(&text);
        assert_eq!(toggle_mark(&marked).0, text);
    }
}
