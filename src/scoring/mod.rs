//! Team-score aggregation.
//!
//! This module provides:
//! - Race point lookup (`points`)
//! - The ledger row type and its validation rules (`entry`)
//! - The ledger value and its mutations (`ledger`)
//! - Snapshot comparison for the overlay (`diff`)
//! - The serialised, persisted service the rest of the app talks to (`service`)

pub mod diff;
pub mod entry;
pub mod ledger;
pub mod points;
pub mod service;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use diff::{compute_diff, DiffEvent};
pub use entry::TeamScoreEntry;
pub use ledger::Ledger;
pub use service::{Mutation, ScoreLedgerService};

/// How a result screen is folded into the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Rank-derived points added to running totals.
    Race,
    /// Absolute team totals replacing the ledger.
    Overall,
}

impl fmt::Display for ScoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringMode::Race => write!(f, "race"),
            ScoringMode::Overall => write!(f, "overall"),
        }
    }
}

/// Whether extraction rows carry their team or it must be inferred from names.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TeamGrouping {
    Supplied,
    InferFromNames,
}

impl TeamGrouping {
    pub fn from_infer_flag(infer: bool) -> Self {
        if infer {
            TeamGrouping::InferFromNames
        } else {
            TeamGrouping::Supplied
        }
    }
}
