//! Error kinds surfaced by the score ledger.
//!
//! Every public ledger mutation is all-or-nothing: when one of these is
//! returned the ledger is exactly what it was before the call.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ScoreError {
    /// Malformed user input to a mutation (score range, team name rules).
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// A mutation referenced a team or index that is not in the ledger.
    #[error("no such team: {0}")]
    InvalidTeamKey(String),

    /// The vision-model payload produced no usable rows.
    #[error("extraction rejected: {0}")]
    ExtractionFormat(String),

    /// Loading or saving through the ledger store failed.
    #[error("could not persist ledger ({0}); the previous scores are kept, please retry")]
    Persistence(#[from] StoreError),
}

impl ScoreError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ScoreError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_field() {
        let err = ScoreError::validation("score", "1000000 is outside -999999..=999999");
        assert_eq!(
            err.to_string(),
            "invalid score: 1000000 is outside -999999..=999999"
        );
    }

    #[test]
    fn test_persistence_wraps_store_error() {
        let err: ScoreError = StoreError::Http("503 Service Unavailable".to_string()).into();
        assert!(matches!(err, ScoreError::Persistence(_)));
        assert!(err.to_string().contains("retry"));
    }
}
