//! Running argument history passed to round and closing prompts.

use moot_utils::types::{STATEMENTS_PER_SIDE, Side};

/// Blocks kept from the end of a condensed transcript.
const CONDENSED_TAIL: usize = 5;

/// Interleaved statements of both sides, plaintiff first in each slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    blocks: Vec<String>,
}

impl Transcript {
    #[must_use]
    pub fn from_arguments(plaintiff: &[String], defendant: &[String]) -> Self {
        let slots = plaintiff.len().max(defendant.len()).max(STATEMENTS_PER_SIDE);
        let mut blocks = Vec::with_capacity(plaintiff.len() + defendant.len());
        for slot in 0..slots {
            if let Some(text) = plaintiff.get(slot) {
                blocks.push(block(Side::Plaintiff, text));
            }
            if let Some(text) = defendant.get(slot) {
                blocks.push(block(Side::Defendant, text));
            }
        }
        Self { blocks }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.blocks.join("\n\n")
    }

    /// Render, keeping only the first block and the last five when the full
    /// text is longer than `limit` characters.
    #[must_use]
    pub fn render_condensed(&self, limit: usize) -> String {
        let full = self.render();
        if full.chars().count() <= limit || self.blocks.len() <= CONDENSED_TAIL + 1 {
            return full;
        }

        let tail = &self.blocks[self.blocks.len() - CONDENSED_TAIL..];
        let mut kept = Vec::with_capacity(CONDENSED_TAIL + 1);
        kept.push(self.blocks[0].as_str());
        kept.extend(tail.iter().map(String::as_str));
        let condensed = kept.join("\n\n");
        tracing::debug!(
            full_chars = full.chars().count(),
            condensed_chars = condensed.chars().count(),
            "Condensed transcript for closing prompt"
        );
        condensed
    }
}

fn block(side: Side, text: &str) -> String {
    format!("{}: {}", side.label(), text.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn test_interleaves_plaintiff_first() {
        let t = Transcript::from_arguments(&args("p", 2), &args("d", 1));
        assert_eq!(t.render(), "Plaintiff: p0\n\nDefendant: d0\n\nPlaintiff: p1");
    }

    #[test]
    fn test_short_history_is_not_condensed() {
        let t = Transcript::from_arguments(&args("p", 3), &args("d", 3));
        assert_eq!(t.render_condensed(10), t.render());
    }

    #[test]
    fn test_long_history_keeps_first_and_last_five() {
        let p: Vec<String> = (0..4).map(|i| format!("p{i} {}", "x".repeat(40))).collect();
        let d: Vec<String> = (0..3).map(|i| format!("d{i} {}", "y".repeat(40))).collect();
        let t = Transcript::from_arguments(&p, &d);
        assert_eq!(t.len(), 7);

        let condensed = t.render_condensed(100);
        let blocks: Vec<&str> = condensed.split("\n\n").collect();
        assert_eq!(blocks.len(), 6);
        assert!(blocks[0].starts_with("Plaintiff: p0"));
        assert!(blocks[1].starts_with("Plaintiff: p1"));
        assert!(blocks[5].starts_with("Plaintiff: p3"));
        assert!(!condensed.contains("d0"));
    }
}
