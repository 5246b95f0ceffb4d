//! Canonical extraction rows and the report produced while cleaning them.

/// Where a batch of rows came from. Manual rows get the strict team-name rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrigin {
    Vision,
    Manual,
}

/// One validated player or team row read off a result screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRecord {
    /// Finishing rank, only present in per-race reads.
    pub rank: Option<i64>,
    /// Player handle as read.
    pub name: String,
    /// Team label; empty until the identity resolver fills it in.
    pub team: String,
    /// Race-total score or absolute team total, depending on the read mode.
    pub score: i64,
    pub is_current_player: bool,
}

impl ExtractionRecord {
    pub fn new(name: impl Into<String>, team: impl Into<String>, score: i64) -> Self {
        Self {
            rank: None,
            name: name.into(),
            team: team.into(),
            score,
            is_current_player: false,
        }
    }

    pub fn with_rank(mut self, rank: i64) -> Self {
        self.rank = Some(rank);
        self
    }
}

/// A raw row that was excluded from the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    /// Position in the raw input (0-based).
    pub index: usize,
    pub reason: String,
}

/// Result of normalizing one raw batch.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<ExtractionRecord>,
    pub dropped: Vec<DroppedRow>,
    /// Repairs applied to kept rows (score coercion, duplicate current player).
    pub warnings: Vec<String>,
}
