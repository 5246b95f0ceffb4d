//! The persisted, serialised score ledger shared by the capture worker and the CLI.
//!
//! Writers take turns on a mutex, compute on a copy of the published ledger,
//! save it, and only then publish it. Readers never wait for a save and see
//! either the old or the new ledger.

use std::sync::{Mutex, RwLock};

use log::{debug, info, warn};
use serde_json::Value;

use super::diff::{compute_diff, DiffEvent};
use super::entry::TeamScoreEntry;
use super::ledger::Ledger;
use super::{ScoringMode, TeamGrouping};
use crate::error::ScoreError;
use crate::extraction::{
    normalize, resolve_teams, ExtractionRecord, NormalizeOptions, RecordOrigin,
};
use crate::store::{LedgerStore, StoreError};
use crate::vision::Extraction;

/// One completed mutation: the ledger before and after, and what changed.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub previous: Ledger,
    pub next: Ledger,
    pub events: Vec<DiffEvent>,
}

pub struct ScoreLedgerService<S: LedgerStore> {
    store: S,
    writer: Mutex<()>,
    state: RwLock<Ledger>,
}

impl<S: LedgerStore> ScoreLedgerService<S> {
    /// Loads the ledger from `store`.
    ///
    /// Corrupt stored data is logged and replaced by an empty ledger on the
    /// next save. Any other load failure is returned.
    pub fn open(store: S) -> Result<Self, ScoreError> {
        let ledger = match store.load() {
            Ok(entries) => Ledger::from_entries(entries),
            Err(StoreError::Corrupt(reason)) => {
                warn!(
                    "Stored ledger at {} is unreadable ({}); starting empty",
                    store.describe(),
                    reason
                );
                Ledger::new()
            }
            Err(e) => return Err(e.into()),
        };
        info!("Loaded {} teams from {}", ledger.len(), store.describe());

        Ok(Self {
            store,
            writer: Mutex::new(()),
            state: RwLock::new(ledger),
        })
    }

    /// Read-only copy of the current entries.
    pub fn snapshot(&self) -> Vec<TeamScoreEntry> {
        self.ledger().entries().to_vec()
    }

    pub fn ledger(&self) -> Ledger {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Adds race points for one race's result rows.
    pub fn apply_race_result(
        &self,
        raw: &[Value],
        origin: RecordOrigin,
        grouping: TeamGrouping,
    ) -> Result<Mutation, ScoreError> {
        self.apply_batch(raw, ScoringMode::Race, origin, grouping)
    }

    /// Replaces the ledger with the team totals in `raw`.
    pub fn apply_overall_sync(
        &self,
        raw: &[Value],
        origin: RecordOrigin,
        grouping: TeamGrouping,
    ) -> Result<Mutation, ScoreError> {
        self.apply_batch(raw, ScoringMode::Overall, origin, grouping)
    }

    /// Applies a batch the way `mode` says.
    pub fn apply_mode(
        &self,
        raw: &[Value],
        mode: ScoringMode,
        origin: RecordOrigin,
        grouping: TeamGrouping,
    ) -> Result<Mutation, ScoreError> {
        match mode {
            ScoringMode::Race => self.apply_race_result(raw, origin, grouping),
            ScoringMode::Overall => self.apply_overall_sync(raw, origin, grouping),
        }
    }

    fn apply_batch(
        &self,
        raw: &[Value],
        mode: ScoringMode,
        origin: RecordOrigin,
        grouping: TeamGrouping,
    ) -> Result<Mutation, ScoreError> {
        let options = NormalizeOptions::new(origin, grouping == TeamGrouping::Supplied);
        let normalized = normalize(raw, options)?;
        if !normalized.dropped.is_empty() {
            info!(
                "{} batch: kept {} rows, dropped {}",
                mode,
                normalized.records.len(),
                normalized.dropped.len()
            );
        }
        let records = normalized.records;

        self.mutate(&format!("{} batch", mode), move |ledger| {
            // Supplied teams only adopt known casing; empty ones are inferred.
            let records: Vec<ExtractionRecord> = resolve_teams(records, &ledger.team_names());
            match mode {
                ScoringMode::Race => ledger.apply_race_result(&records),
                ScoringMode::Overall => ledger.apply_overall_sync(&records),
            }
            Ok(())
        })
    }

    /// Applies what the vision model returned. A reported failure changes nothing.
    pub fn apply_extraction(
        &self,
        extraction: Extraction,
        mode: ScoringMode,
        grouping: TeamGrouping,
    ) -> Result<Option<Mutation>, ScoreError> {
        match extraction {
            Extraction::Records(rows) => self
                .apply_mode(&rows, mode, RecordOrigin::Vision, grouping)
                .map(Some),
            Extraction::Failed(reason) => {
                warn!("Vision model reported an error, ledger unchanged: {}", reason);
                Ok(None)
            }
        }
    }

    pub fn reset_ledger(&self) -> Result<Mutation, ScoreError> {
        self.mutate("reset", |ledger| {
            ledger.reset();
            Ok(())
        })
    }

    pub fn set_current_player(&self, team: &str) -> Result<Mutation, ScoreError> {
        self.mutate("set current player", |ledger| ledger.set_current_player(team))
    }

    pub fn rename_team(&self, index: usize, new_name: &str) -> Result<Mutation, ScoreError> {
        self.mutate("rename", |ledger| ledger.rename_team(index, new_name))
    }

    pub fn set_score(&self, index: usize, score: i64) -> Result<Mutation, ScoreError> {
        self.mutate("set score", |ledger| ledger.set_score(index, score))
    }

    pub fn remove_team(&self, index: usize) -> Result<Mutation, ScoreError> {
        self.mutate("remove", |ledger| ledger.remove_team(index).map(|_| ()))
    }

    pub fn add_team(
        &self,
        name: &str,
        score: i64,
        is_current_player: bool,
    ) -> Result<Mutation, ScoreError> {
        self.mutate("add", |ledger| ledger.add_team(name, score, is_current_player))
    }

    /// Runs one all-or-nothing mutation.
    fn mutate<F>(&self, op: &str, apply: F) -> Result<Mutation, ScoreError>
    where
        F: FnOnce(&mut Ledger) -> Result<(), ScoreError>,
    {
        let _writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let previous = self.ledger();
        let mut next = previous.clone();
        apply(&mut next)?;

        if let Err(e) = self.store.save(next.entries()) {
            warn!(
                "{}: save to {} failed, keeping previous ledger: {}",
                op,
                self.store.describe(),
                e
            );
            return Err(e.into());
        }

        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = next.clone();

        let events = compute_diff(previous.entries(), next.entries());
        debug!("{}: {} teams, {} change events", op, next.len(), events.len());

        Ok(Mutation {
            previous,
            next,
            events,
        })
    }
}
