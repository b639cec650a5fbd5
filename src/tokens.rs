//! Token estimation for prompt budgeting.
//!
//! A fixed characters-per-token ratio keeps the count deterministic and cheap.
//! It approximates BPE tokenizers on English prose.

/// Characters per token.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of a text (rounded up, 0 for empty text).
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Truncate a text so that its estimated token count is at most `max_tokens`.
///
/// Leading whitespace is dropped. Cuts on a character boundary, preferring the
/// last word boundary when one keeps at least half of the allowed characters.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> &str {
    let text = text.trim_start();
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    let end = match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => byte_idx,
        None => return text,
    };

    let head = &text[..end];
    match head.rfind(char::is_whitespace) {
        Some(cut) if head[..cut].chars().count() >= max_chars / 2 => {
            let word_cut = head[..cut].trim_end();
            if word_cut.is_empty() {
                head
            } else {
                word_cut
            }
        }
        _ => head,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("a"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("Goodbye."), 2);
    }

    #[test]
    fn test_estimate_counts_chars_not_bytes() {
        assert_eq!(estimate_tokens("çğıö"), 1);
    }

    #[test]
    fn test_truncate_fits_budget() {
        let text = "The quick brown fox jumps over the lazy dog";
        for budget in 1..12 {
            let truncated = truncate_to_tokens(text, budget);
            assert!(!truncated.is_empty());
            assert!(estimate_tokens(truncated) <= budget, "budget {}", budget);
        }
        assert_eq!(truncate_to_tokens(text, 100), text);
    }

    #[test]
    fn test_truncate_prefers_word_boundary() {
        assert_eq!(truncate_to_tokens("Hello wonderful world", 4), "Hello wonderful");
        assert_eq!(truncate_to_tokens("Hello wonderful world", 3), "Hello wonder");
        assert_eq!(truncate_to_tokens("Supercalifragilistic", 1), "Supe");
    }

    #[test]
    fn test_truncate_leading_whitespace_keeps_text() {
        assert_eq!(truncate_to_tokens("   indented caption that is long", 1), "inde");
        assert_eq!(truncate_to_tokens("        xyz and more", 1), "xyz");
        assert_eq!(truncate_to_tokens("  a bcdefgh", 2), "a bcdefg");
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "çğıöşüçğıöşü";
        let truncated = truncate_to_tokens(text, 1);
        assert_eq!(truncated, "çğıö");
    }

    #[test]
    fn test_truncate_zero_budget() {
        assert_eq!(truncate_to_tokens("abc", 0), "");
    }
}
