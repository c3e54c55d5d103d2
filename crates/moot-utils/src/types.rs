use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of statements each side contributes to a finished case:
/// one opening, two rounds and one closing.
pub const STATEMENTS_PER_SIDE: usize = 4;

/// Number of argument rounds between the openings and the closings.
pub const ARGUMENT_ROUNDS: u8 = 2;

/// Statute section a case is generated for (e.g. `"302"`).
///
/// Section codes are opaque strings; ordering and equality are textual.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionCode(String);

impl SectionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SectionCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SectionCode {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Lifecycle status of a case record.
///
/// Serializes to the kebab-case names stored in case documents:
/// `details-only`, `in-progress`, `resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseStatus {
    /// Case content exists but no statement has been generated yet.
    DetailsOnly,
    /// At least one statement has been accepted; the case is not finished.
    InProgress,
    /// Both sides hold exactly four statements.
    Resolved,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 3] = [Self::DetailsOnly, Self::InProgress, Self::Resolved];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DetailsOnly => "details-only",
            Self::InProgress => "in-progress",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Party a statement is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Plaintiff,
    Defendant,
}

impl Side {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintiff => "plaintiff",
            Self::Defendant => "defendant",
        }
    }

    #[must_use]
    pub const fn opponent(&self) -> Side {
        match self {
            Self::Plaintiff => Self::Defendant,
            Self::Defendant => Self::Plaintiff,
        }
    }

    /// Title-case label used in transcripts.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Plaintiff => "Plaintiff",
            Self::Defendant => "Defendant",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of statement a stage produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Opening,
    Round,
    Closing,
}

/// One generation step in a case's fixed stage sequence.
///
/// The eight stages run in the order of [`Stage::ORDER`]:
///
/// ```text
/// plaintiff-opening → defendant-opening
///   → plaintiff-round-1 → defendant-round-1
///   → plaintiff-round-2 → defendant-round-2
///   → plaintiff-closing → defendant-closing
/// ```
///
/// Each stage owns one slot in its side's statement sequence
/// (see [`Stage::slot`]), so a stage is already satisfied when that
/// slot is filled.
///
/// ```rust
/// use moot_utils::types::{Side, Stage};
///
/// assert_eq!(Stage::PlaintiffRound(2).slot(), 2);
/// assert_eq!(Stage::DefendantClosing.side(), Side::Defendant);
/// assert_eq!(Stage::DefendantRound(1).to_string(), "defendant-round-1");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PlaintiffOpening,
    DefendantOpening,
    PlaintiffRound(u8),
    DefendantRound(u8),
    PlaintiffClosing,
    DefendantClosing,
}

impl Stage {
    pub const ORDER: [Stage; 8] = [
        Self::PlaintiffOpening,
        Self::DefendantOpening,
        Self::PlaintiffRound(1),
        Self::DefendantRound(1),
        Self::PlaintiffRound(2),
        Self::DefendantRound(2),
        Self::PlaintiffClosing,
        Self::DefendantClosing,
    ];

    #[must_use]
    pub const fn side(&self) -> Side {
        match self {
            Self::PlaintiffOpening | Self::PlaintiffRound(_) | Self::PlaintiffClosing => {
                Side::Plaintiff
            }
            Self::DefendantOpening | Self::DefendantRound(_) | Self::DefendantClosing => {
                Side::Defendant
            }
        }
    }

    #[must_use]
    pub const fn kind(&self) -> StageKind {
        match self {
            Self::PlaintiffOpening | Self::DefendantOpening => StageKind::Opening,
            Self::PlaintiffRound(_) | Self::DefendantRound(_) => StageKind::Round,
            Self::PlaintiffClosing | Self::DefendantClosing => StageKind::Closing,
        }
    }

    /// Index of this stage's statement in its side's sequence.
    #[must_use]
    pub const fn slot(&self) -> usize {
        match self {
            Self::PlaintiffOpening | Self::DefendantOpening => 0,
            Self::PlaintiffRound(n) | Self::DefendantRound(n) => *n as usize,
            Self::PlaintiffClosing | Self::DefendantClosing => STATEMENTS_PER_SIDE - 1,
        }
    }

    /// Round number for round stages, `None` otherwise.
    #[must_use]
    pub const fn round(&self) -> Option<u8> {
        match self {
            Self::PlaintiffRound(n) | Self::DefendantRound(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            StageKind::Opening => write!(f, "{}-opening", self.side()),
            StageKind::Round => write!(f, "{}-round-{}", self.side(), self.slot()),
            StageKind::Closing => write!(f, "{}-closing", self.side()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_status_serialization() {
        assert_eq!(
            serde_json::to_string(&CaseStatus::DetailsOnly).unwrap(),
            "\"details-only\""
        );
        assert_eq!(
            serde_json::to_string(&CaseStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        let parsed: CaseStatus = serde_json::from_str("\"resolved\"").unwrap();
        assert_eq!(parsed, CaseStatus::Resolved);
    }

    #[test]
    fn test_stage_order_alternates_sides_and_fills_slots() {
        let mut plaintiff_slots = Vec::new();
        let mut defendant_slots = Vec::new();
        for (i, stage) in Stage::ORDER.iter().enumerate() {
            let expected_side = if i % 2 == 0 {
                Side::Plaintiff
            } else {
                Side::Defendant
            };
            assert_eq!(stage.side(), expected_side);
            match stage.side() {
                Side::Plaintiff => plaintiff_slots.push(stage.slot()),
                Side::Defendant => defendant_slots.push(stage.slot()),
            }
        }
        assert_eq!(plaintiff_slots, vec![0, 1, 2, 3]);
        assert_eq!(defendant_slots, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_stage_display() {
        let names: Vec<String> = Stage::ORDER.iter().map(ToString::to_string).collect();
        assert_eq!(
            names,
            vec![
                "plaintiff-opening",
                "defendant-opening",
                "plaintiff-round-1",
                "defendant-round-1",
                "plaintiff-round-2",
                "defendant-round-2",
                "plaintiff-closing",
                "defendant-closing",
            ]
        );
    }

    #[test]
    fn test_section_code_trims() {
        assert_eq!(SectionCode::new(" 302 ").as_str(), "302");
        assert_eq!(SectionCode::from("420"), SectionCode::new("420"));
    }
}
