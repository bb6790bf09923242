//! Character budget helpers.
//!
//! Budgets are counted in Unicode scalar values, not bytes, so a cut never
//! lands inside a multi-byte character.

/// Length of `text` in characters.
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Keep the last `max_chars` characters of `text`.
pub fn truncate_front(text: &str, max_chars: usize) -> &str {
    let len = char_len(text);
    if len <= max_chars {
        return text;
    }
    match text.char_indices().nth(len - max_chars) {
        Some((cut, _)) => &text[cut..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(char_len("héllo"), 5);
        assert_eq!(char_len(""), 0);
    }

    #[test]
    fn short_text_untouched() {
        assert_eq!(truncate_front("abc", 10), "abc");
        assert_eq!(truncate_front("abc", 3), "abc");
    }

    #[test]
    fn keeps_the_tail() {
        assert_eq!(truncate_front("abcdef", 4), "cdef");
        assert_eq!(truncate_front("abc", 0), "");
    }

    #[test]
    fn cuts_on_char_boundary() {
        assert_eq!(truncate_front("ééééé", 2), "éé");
        assert_eq!(truncate_front("a🙂b🙂", 3), "🙂b🙂");
    }
}
