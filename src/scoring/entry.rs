//! Ledger row type plus the score and team-name rules shared by every mutation.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScoreError;

/// Lowest score a team can hold.
pub const MIN_SCORE: i64 = -999_999;
/// Highest score a team can hold.
pub const MAX_SCORE: i64 = 999_999;
/// Maximum team name length, in characters.
pub const MAX_TEAM_NAME_CHARS: usize = 50;

/// Characters accepted in a manually entered team name:
/// letters, digits, Han/Hiragana/Katakana, hyphen, underscore and spaces.
const TEAM_NAME_PATTERN: &str =
    r"^[\p{L}\p{N}\p{Han}\p{Hiragana}\p{Katakana}\u{30FC}\-_ \u{3000}]+$";

/// One team's row in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamScoreEntry {
    /// Stable identity across renames. Generated when missing from storage.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Display name; compared case-insensitively via [`team_key`].
    pub team: String,
    /// Cumulative total, always within `MIN_SCORE..=MAX_SCORE`.
    #[serde(default)]
    pub score: i64,
    /// Delta applied by the most recent race result, 0 otherwise.
    #[serde(default)]
    pub added_score: i64,
    #[serde(default)]
    pub is_current_player: bool,
}

impl TeamScoreEntry {
    pub fn new(team: impl Into<String>, score: i64, is_current_player: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            team: team.into(),
            score: clamp_score(score),
            added_score: 0,
            is_current_player,
        }
    }

    /// Case-insensitive comparison key.
    pub fn key(&self) -> String {
        team_key(&self.team)
    }
}

/// Normalizes a team name into its comparison key.
pub fn team_key(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Clamps any score into the ledger range.
pub fn clamp_score(score: i64) -> i64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Rejects scores outside the ledger range instead of clamping them.
pub fn validate_score(score: i64) -> Result<i64, ScoreError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(score)
    } else {
        Err(ScoreError::validation(
            "score",
            format!("{} is outside {}..={}", score, MIN_SCORE, MAX_SCORE),
        ))
    }
}

/// Parses a score typed by the user. Only plain integers are accepted.
pub fn parse_score(text: &str) -> Result<i64, ScoreError> {
    let trimmed = text.trim();
    let score = trimmed.parse::<i64>().map_err(|_| {
        ScoreError::validation("score", format!("'{}' is not an integer", trimmed))
    })?;
    validate_score(score)
}

fn team_name_regex() -> Result<&'static Regex, &'static regex::Error> {
    static RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TEAM_NAME_PATTERN)).as_ref()
}

/// Validates a manually entered team name and returns it trimmed.
pub fn validate_team_name(name: &str) -> Result<String, ScoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ScoreError::validation("team", "name must not be empty"));
    }

    let len = trimmed.chars().count();
    if len > MAX_TEAM_NAME_CHARS {
        return Err(ScoreError::validation(
            "team",
            format!(
                "'{}' is {} characters, the limit is {}",
                trimmed, len, MAX_TEAM_NAME_CHARS
            ),
        ));
    }

    let pattern = team_name_regex()
        .map_err(|e| ScoreError::validation("team", format!("name pattern: {}", e)))?;
    if !pattern.is_match(trimmed) {
        return Err(ScoreError::validation(
            "team",
            format!(
                "'{}' may only contain letters, digits, CJK characters, '-', '_' and spaces",
                trimmed
            ),
        ));
    }

    Ok(trimmed.to_string())
}
