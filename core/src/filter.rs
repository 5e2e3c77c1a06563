//! Export eligibility heuristic for leaf text.

/// Returns `true` when `text` is worth offering for translation.
///
/// Text is eligible when it is non-empty and contains at least one
/// character outside ASCII letters, digits, ASCII punctuation and space.
/// Identifiers, codes and plain ASCII prose are skipped.
///
/// # Examples
///
/// ```
/// use record_lens_core::needs_translation;
///
/// assert!(!needs_translation(""));
/// assert!(!needs_translation("hello world!"));
/// assert!(needs_translation("こんにちは"));
/// assert!(needs_translation("tab\tseparated"));
/// ```
pub fn needs_translation(text: &str) -> bool {
    text.chars().any(|c| !is_plain(c))
}

fn is_plain(c: char) -> bool {
    c.is_ascii_alphanumeric() || c.is_ascii_punctuation() || c == ' '
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifiers_are_skipped() {
        assert!(!needs_translation("p_card-01-act-1_001"));
        assert!(!needs_translation("ProduceDescriptionType_Text"));
        assert!(!needs_translation("{{value}} + 10%"));
    }

    #[test]
    fn test_single_foreign_character_is_enough() {
        assert!(needs_translation("Lv.1 ★"));
        assert!(needs_translation("line\nbreak"));
        assert!(needs_translation("é"));
    }

    #[test]
    fn test_whitespace_other_than_space_is_not_plain() {
        assert!(needs_translation("\u{3000}"));
        assert!(!needs_translation("   "));
    }
}
