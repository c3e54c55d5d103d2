//! Acceptance checks for generated statements.

use once_cell::sync::Lazy;
use regex::Regex;

/// Phrases that mark a canned failure message instead of an argument.
const FALLBACK_PATTERNS: [&str; 4] = [
    "i apologize",
    "unable to",
    "please try again later",
    "failed after multiple retries",
];

/// Minimum length of an acceptable closing statement, in characters.
pub const MIN_CLOSING_CHARS: usize = 50;

static THINK_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

/// Remove `<think>...</think>` reasoning blocks and surrounding whitespace.
#[must_use]
pub fn strip_think(text: &str) -> String {
    THINK_BLOCK.replace_all(text, "").trim().to_string()
}

/// True when `text` is a real statement rather than an empty or canned
/// fallback reply.
#[must_use]
pub fn is_valid_response(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_lowercase();
    !FALLBACK_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Closings must also be substantial and free of apologies.
#[must_use]
pub fn is_valid_closing(text: &str) -> bool {
    is_valid_response(text)
        && text.trim().chars().count() >= MIN_CLOSING_CHARS
        && !text.to_lowercase().contains("apologize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert!(!is_valid_response(""));
        assert!(!is_valid_response("   \n\t"));
    }

    #[test]
    fn test_rejects_fallback_phrases_case_insensitively() {
        assert!(!is_valid_response(
            "I Apologize, but I'm unable to generate an opening statement."
        ));
        assert!(!is_valid_response("Please try again later."));
        assert!(!is_valid_response("Request FAILED after multiple retries"));
        assert!(!is_valid_response("The accused was unable to explain the stains."));
    }

    #[test]
    fn test_accepts_plain_argument() {
        assert!(is_valid_response(
            "My Lord, the prosecution has proved motive beyond reasonable doubt."
        ));
    }

    #[test]
    fn test_closing_needs_length() {
        assert!(!is_valid_closing("I rest my case here."));
        let long = "The evidence on record shows a clear chain of events. I rest my case here.";
        assert!(is_valid_closing(long));
        assert!(!is_valid_closing(
            "We must apologize to the court for the delay in filing. I rest my case here."
        ));
    }

    #[test]
    fn test_strip_think_spans_lines() {
        let raw = "<think>\nweigh the facts\nthen answer\n</think>\n\n  Final argument.  ";
        assert_eq!(strip_think(raw), "Final argument.");
        assert_eq!(strip_think("a <think>x</think>b<think>y</think>"), "a b");
        assert_eq!(strip_think("no blocks"), "no blocks");
    }
}
