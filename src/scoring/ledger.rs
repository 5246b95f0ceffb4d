//! The team-score ledger and every mutation it supports.
//!
//! A `Ledger` is a plain value. It is always sorted by score, descending,
//! with ties kept in their prior order, and at most one entry has
//! `is_current_player` set. Persistence and locking live in the service.

use super::entry::{
    clamp_score, team_key, validate_score, validate_team_name, TeamScoreEntry,
};
use super::points::points_for_rank;
use crate::error::ScoreError;
use crate::extraction::ExtractionRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: Vec<TeamScoreEntry>,
}

/// One team's contribution from a single batch.
struct BatchTeam {
    key: String,
    display: String,
    total: i64,
    is_current_player: bool,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from stored rows, re-establishing every invariant.
    ///
    /// Blank team names are dropped, duplicate team keys keep only their
    /// first row, scores are clamped and only the first current player is kept.
    pub fn from_entries(entries: Vec<TeamScoreEntry>) -> Self {
        let mut kept: Vec<TeamScoreEntry> = Vec::with_capacity(entries.len());
        for mut entry in entries {
            entry.team = entry.team.trim().to_string();
            if entry.team.is_empty() {
                log::warn!("Ignoring stored entry with an empty team name");
                continue;
            }
            if kept.iter().any(|e| e.key() == entry.key()) {
                log::warn!("Ignoring duplicate stored entry for team '{}'", entry.team);
                continue;
            }
            entry.score = clamp_score(entry.score);
            kept.push(entry);
        }

        let mut ledger = Self { entries: kept };
        ledger.keep_single_current(None);
        ledger.sort_by_score();
        ledger
    }

    pub fn entries(&self) -> &[TeamScoreEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display names of all teams, in ledger order.
    pub fn team_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.team.clone()).collect()
    }

    /// Index of a team, matched case-insensitively.
    pub fn position_of(&self, team: &str) -> Option<usize> {
        let key = team_key(team);
        self.entries.iter().position(|e| e.key() == key)
    }

    /// The team flagged as the local player, if any.
    pub fn current_player(&self) -> Option<&TeamScoreEntry> {
        self.entries.iter().find(|e| e.is_current_player)
    }

    /// Adds rank-derived race points to each team in the batch.
    ///
    /// Teams missing from the batch keep their score with `added_score`
    /// reset to 0. Applying the same batch twice counts it twice.
    pub fn apply_race_result(&mut self, records: &[ExtractionRecord]) {
        let batch = aggregate(records, |r| r.rank.map(points_for_rank).unwrap_or(0));

        for entry in &mut self.entries {
            entry.added_score = 0;
        }

        let mut flagged = None;
        for team in batch {
            let is_current = match self.entries.iter_mut().find(|e| e.key() == team.key) {
                Some(entry) => {
                    entry.score = clamp_score(entry.score.saturating_add(team.total));
                    entry.added_score = team.total;
                    entry.is_current_player |= team.is_current_player;
                    entry.is_current_player
                }
                None => {
                    let mut entry =
                        TeamScoreEntry::new(team.display, team.total, team.is_current_player);
                    entry.added_score = team.total;
                    self.entries.push(entry);
                    team.is_current_player
                }
            };
            if is_current && flagged.is_none() {
                flagged = Some(team.key);
            }
        }

        self.keep_single_current(flagged.as_deref());
        self.sort_by_score();
    }

    /// Replaces the ledger with the absolute totals read from the batch.
    ///
    /// Same-team rows are summed. Teams not in the batch are dropped. Teams
    /// that already existed keep their identity and display name.
    pub fn apply_overall_sync(&mut self, records: &[ExtractionRecord]) {
        let batch = aggregate(records, |r| r.score);
        let previous_len = self.entries.len();

        let mut flagged = None;
        let mut next: Vec<(usize, TeamScoreEntry)> = Vec::with_capacity(batch.len());
        for (batch_pos, team) in batch.into_iter().enumerate() {
            let (order, entry) = match self.entries.iter().position(|e| e.key() == team.key) {
                Some(idx) => {
                    let existing = &self.entries[idx];
                    let entry = TeamScoreEntry {
                        id: existing.id,
                        team: existing.team.clone(),
                        score: clamp_score(team.total),
                        added_score: 0,
                        is_current_player: existing.is_current_player || team.is_current_player,
                    };
                    (idx, entry)
                }
                None => (
                    previous_len + batch_pos,
                    TeamScoreEntry::new(team.display, team.total, team.is_current_player),
                ),
            };
            if entry.is_current_player && flagged.is_none() {
                flagged = Some(team.key);
            }
            next.push((order, entry));
        }

        // Prior order first so equal scores keep their previous relative order.
        next.sort_by_key(|(order, _)| *order);
        self.entries = next.into_iter().map(|(_, entry)| entry).collect();

        self.keep_single_current(flagged.as_deref());
        self.sort_by_score();
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Flags exactly one team as the local player.
    pub fn set_current_player(&mut self, team: &str) -> Result<(), ScoreError> {
        let idx = self
            .position_of(team)
            .ok_or_else(|| ScoreError::InvalidTeamKey(team.trim().to_string()))?;
        self.clear_added();
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.is_current_player = i == idx;
        }
        Ok(())
    }

    /// Renames a team in place. Order is not changed.
    pub fn rename_team(&mut self, index: usize, new_name: &str) -> Result<(), ScoreError> {
        self.check_index(index)?;
        let name = validate_team_name(new_name)?;
        let key = team_key(&name);
        if let Some(other) = self
            .entries
            .iter()
            .enumerate()
            .find(|(i, e)| *i != index && e.key() == key)
        {
            return Err(ScoreError::validation(
                "team",
                format!("'{}' is already used by team '{}'", name, other.1.team),
            ));
        }
        self.clear_added();
        self.entries[index].team = name;
        Ok(())
    }

    /// Overwrites a team's score and re-sorts.
    pub fn set_score(&mut self, index: usize, score: i64) -> Result<(), ScoreError> {
        self.check_index(index)?;
        let score = validate_score(score)?;
        self.clear_added();
        self.entries[index].score = score;
        self.sort_by_score();
        Ok(())
    }

    /// Removes a team; the remaining order is preserved.
    pub fn remove_team(&mut self, index: usize) -> Result<TeamScoreEntry, ScoreError> {
        self.check_index(index)?;
        self.clear_added();
        Ok(self.entries.remove(index))
    }

    /// Inserts a new team and re-sorts.
    pub fn add_team(
        &mut self,
        name: &str,
        score: i64,
        is_current_player: bool,
    ) -> Result<(), ScoreError> {
        let name = validate_team_name(name)?;
        if let Some(existing) = self.position_of(&name) {
            return Err(ScoreError::validation(
                "team",
                format!("'{}' already exists as '{}'", name, self.entries[existing].team),
            ));
        }
        let score = validate_score(score)?;

        if is_current_player {
            for entry in &mut self.entries {
                entry.is_current_player = false;
            }
        }
        self.clear_added();
        self.entries.push(TeamScoreEntry::new(name, score, is_current_player));
        self.sort_by_score();
        Ok(())
    }

    /// A manual edit starts a new cycle, so no team shows race points.
    fn clear_added(&mut self) {
        for entry in &mut self.entries {
            entry.added_score = 0;
        }
    }

    fn check_index(&self, index: usize) -> Result<(), ScoreError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(ScoreError::InvalidTeamKey(format!(
                "index {} (ledger has {} teams)",
                index + 1,
                self.entries.len()
            )))
        }
    }

    /// Clears every current-player flag except one: the `preferred` team if it
    /// is flagged, otherwise the first flagged entry in ledger order.
    fn keep_single_current(&mut self, preferred: Option<&str>) {
        let winner = preferred
            .and_then(|key| {
                self.entries
                    .iter()
                    .position(|e| e.is_current_player && e.key() == key)
            })
            .or_else(|| self.entries.iter().position(|e| e.is_current_player));

        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.is_current_player = Some(i) == winner;
        }
    }

    /// Stable sort by score, descending.
    fn sort_by_score(&mut self) {
        self.entries.sort_by(|a, b| b.score.cmp(&a.score));
    }
}

/// Groups records by team key in first-seen order, summing `value` per team.
fn aggregate<F>(records: &[ExtractionRecord], value: F) -> Vec<BatchTeam>
where
    F: Fn(&ExtractionRecord) -> i64,
{
    let mut teams: Vec<BatchTeam> = Vec::new();
    for record in records {
        let key = team_key(&record.team);
        if key.is_empty() {
            continue;
        }
        let amount = value(record);
        match teams.iter_mut().find(|t| t.key == key) {
            Some(team) => {
                team.total = team.total.saturating_add(amount);
                team.is_current_player |= record.is_current_player;
            }
            None => teams.push(BatchTeam {
                key,
                display: record.team.trim().to_string(),
                total: amount,
                is_current_player: record.is_current_player,
            }),
        }
    }
    teams
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race(rows: &[(i64, &str)]) -> Vec<ExtractionRecord> {
        rows.iter()
            .enumerate()
            .map(|(i, (rank, team))| {
                ExtractionRecord::new(format!("p{}", i), *team, 0).with_rank(*rank)
            })
            .collect()
    }

    fn totals(rows: &[(&str, i64)]) -> Vec<ExtractionRecord> {
        rows.iter()
            .map(|(team, score)| ExtractionRecord::new("p", *team, *score))
            .collect()
    }

    fn summary(ledger: &Ledger) -> Vec<(&str, i64, i64)> {
        ledger
            .entries()
            .iter()
            .map(|e| (e.team.as_str(), e.score, e.added_score))
            .collect()
    }

    fn current_count(ledger: &Ledger) -> usize {
        ledger.entries().iter().filter(|e| e.is_current_player).count()
    }

    fn is_sorted(ledger: &Ledger) -> bool {
        ledger.entries().windows(2).all(|w| w[0].score >= w[1].score)
    }

    #[test]
    fn test_race_result_on_empty_ledger() {
        let mut ledger = Ledger::new();
        ledger.apply_race_result(&race(&[(1, "X"), (2, "Y")]));
        assert_eq!(summary(&ledger), vec![("X", 15, 15), ("Y", 12, 12)]);
    }

    #[test]
    fn test_race_result_sums_team_members() {
        let mut ledger = Ledger::new();
        ledger.apply_race_result(&race(&[(1, "X"), (2, "Y"), (3, "x"), (13, "Y")]));
        assert_eq!(summary(&ledger), vec![("X", 25, 25), ("Y", 12, 12)]);
    }

    #[test]
    fn test_race_result_carries_absent_teams() {
        let mut ledger = Ledger::new();
        ledger.apply_race_result(&race(&[(1, "X"), (2, "Y")]));
        ledger.apply_race_result(&race(&[(1, "Y")]));
        assert_eq!(summary(&ledger), vec![("Y", 27, 15), ("X", 15, 0)]);
    }

    #[test]
    fn test_same_race_batch_twice_double_counts() {
        let batch = race(&[(1, "X"), (2, "Y")]);
        let mut ledger = Ledger::new();
        ledger.apply_race_result(&batch);
        ledger.apply_race_result(&batch);
        assert_eq!(summary(&ledger), vec![("X", 30, 15), ("Y", 24, 12)]);
    }

    #[test]
    fn test_race_result_without_rank_scores_zero() {
        let mut ledger = Ledger::new();
        ledger.apply_race_result(&[ExtractionRecord::new("p", "X", 99)]);
        assert_eq!(summary(&ledger), vec![("X", 0, 0)]);
    }

    #[test]
    fn test_race_ties_keep_prior_order() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 10, false).unwrap();
        ledger.add_team("B", 5, false).unwrap();
        // B draws level with A; A stays first because it was first before.
        ledger.apply_race_result(&race(&[(8, "B")]));
        assert_eq!(summary(&ledger), vec![("A", 10, 0), ("B", 10, 5)]);
        ledger.apply_race_result(&race(&[(12, "B")]));
        assert_eq!(ledger.team_names(), vec!["B", "A"]);
        ledger.apply_race_result(&race(&[(12, "A")]));
        assert_eq!(summary(&ledger), vec![("B", 11, 0), ("A", 11, 1)]);
    }

    #[test]
    fn test_race_result_current_player_first_in_batch_wins() {
        let mut ledger = Ledger::new();
        ledger.add_team("X", 0, true).unwrap();
        ledger.add_team("Y", 0, false).unwrap();

        // X keeps its stored flag and comes before the freshly flagged Y.
        let mut batch = race(&[(1, "X"), (2, "Y")]);
        batch[1].is_current_player = true;
        ledger.apply_race_result(&batch);

        assert_eq!(current_count(&ledger), 1);
        assert_eq!(ledger.current_player().unwrap().team, "X");
    }

    #[test]
    fn test_race_result_batch_flag_beats_absent_team() {
        let mut ledger = Ledger::new();
        ledger.add_team("Z", 0, true).unwrap();

        let mut batch = race(&[(1, "X"), (2, "Y")]);
        batch[1].is_current_player = true;
        ledger.apply_race_result(&batch);

        assert_eq!(current_count(&ledger), 1);
        assert_eq!(ledger.current_player().unwrap().team, "Y");
    }

    #[test]
    fn test_race_result_current_player_carried_forward() {
        let mut ledger = Ledger::new();
        ledger.add_team("X", 0, true).unwrap();
        ledger.apply_race_result(&race(&[(1, "Y")]));
        assert_eq!(ledger.current_player().unwrap().team, "X");
    }

    #[test]
    fn test_race_result_keeps_first_seen_casing() {
        let mut ledger = Ledger::new();
        ledger.apply_race_result(&race(&[(1, "Alpha"), (2, "ALPHA")]));
        assert_eq!(summary(&ledger), vec![("Alpha", 27, 27)]);
        ledger.apply_race_result(&race(&[(1, "alpha")]));
        assert_eq!(summary(&ledger), vec![("Alpha", 42, 15)]);
    }

    #[test]
    fn test_race_result_clamps_score() {
        let mut ledger = Ledger::new();
        ledger.add_team("X", 999_990, false).unwrap();
        ledger.apply_race_result(&race(&[(1, "X")]));
        assert_eq!(ledger.entries()[0].score, 999_999);
    }

    #[test]
    fn test_overall_sync_replaces_scores() {
        let mut ledger = Ledger::new();
        ledger.apply_race_result(&race(&[(1, "X"), (2, "Y")]));
        let x_id = ledger.entries()[0].id;

        ledger.apply_overall_sync(&totals(&[("X", 100), ("Y", 50)]));

        assert_eq!(summary(&ledger), vec![("X", 100, 0), ("Y", 50, 0)]);
        assert_eq!(ledger.entries()[0].id, x_id);
    }

    #[test]
    fn test_overall_sync_drops_absent_teams_and_sums_rows() {
        let mut ledger = Ledger::new();
        ledger.apply_race_result(&race(&[(1, "X"), (2, "Y"), (3, "Z")]));
        ledger.apply_overall_sync(&totals(&[("Y", 30), ("W", 70), ("y", 45)]));
        assert_eq!(summary(&ledger), vec![("Y", 75, 0), ("W", 70, 0)]);
    }

    #[test]
    fn test_overall_sync_ties_keep_prior_order() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 20, false).unwrap();
        ledger.add_team("B", 10, false).unwrap();
        ledger.apply_overall_sync(&totals(&[("New", 40), ("B", 40), ("A", 40)]));
        assert_eq!(ledger.team_names(), vec!["A", "B", "New"]);
    }

    #[test]
    fn test_overall_sync_current_player() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 20, true).unwrap();
        ledger.add_team("B", 10, false).unwrap();

        let mut batch = totals(&[("A", 5), ("B", 50)]);
        batch[1].is_current_player = true;
        ledger.apply_overall_sync(&batch);

        assert_eq!(current_count(&ledger), 1);
        assert_eq!(ledger.current_player().unwrap().team, "A");

        // Flag order follows the batch, not the sorted result.
        let mut batch = totals(&[("B", 50), ("A", 5)]);
        batch[0].is_current_player = true;
        ledger.apply_overall_sync(&batch);
        assert_eq!(ledger.current_player().unwrap().team, "B");
        assert_eq!(current_count(&ledger), 1);
    }

    #[test]
    fn test_set_current_player() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 20, true).unwrap();
        ledger.add_team("B", 10, false).unwrap();

        ledger.set_current_player("b").unwrap();
        assert_eq!(ledger.current_player().unwrap().team, "B");
        assert_eq!(current_count(&ledger), 1);

        let before = ledger.clone();
        let err = ledger.set_current_player("C").unwrap_err();
        assert!(matches!(err, ScoreError::InvalidTeamKey(_)));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_rename_team() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 20, false).unwrap();
        ledger.add_team("B", 10, false).unwrap();

        ledger.rename_team(1, "Bravo").unwrap();
        assert_eq!(ledger.team_names(), vec!["A", "Bravo"]);

        // Changing only the casing of the same team is fine.
        ledger.rename_team(0, "a").unwrap();
        assert_eq!(ledger.team_names(), vec!["a", "Bravo"]);
    }

    #[test]
    fn test_rename_team_rejections() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 20, false).unwrap();
        ledger.add_team("B", 10, false).unwrap();
        let before = ledger.clone();
        let long = "n".repeat(51);

        for bad in ["", "  ", "bravo!", long.as_str(), "b"] {
            let err = ledger.rename_team(0, bad).unwrap_err();
            assert!(matches!(err, ScoreError::Validation { .. }), "{:?}", bad);
        }
        assert!(matches!(
            ledger.rename_team(5, "C").unwrap_err(),
            ScoreError::InvalidTeamKey(_)
        ));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_set_score_resorts() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 20, false).unwrap();
        ledger.add_team("B", 10, false).unwrap();

        ledger.set_score(1, 30).unwrap();
        assert_eq!(ledger.team_names(), vec!["B", "A"]);
    }

    #[test]
    fn test_set_score_out_of_range_rejected() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 20, false).unwrap();
        let before = ledger.clone();

        let err = ledger.set_score(0, 1_000_000).unwrap_err();
        assert!(matches!(err, ScoreError::Validation { .. }));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_remove_team_preserves_order() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 30, false).unwrap();
        ledger.add_team("B", 20, false).unwrap();
        ledger.add_team("C", 10, false).unwrap();

        let removed = ledger.remove_team(1).unwrap();
        assert_eq!(removed.team, "B");
        assert_eq!(ledger.team_names(), vec!["A", "C"]);
        assert!(ledger.remove_team(2).is_err());
    }

    #[test]
    fn test_add_team_duplicate_rejected() {
        let mut ledger = Ledger::new();
        ledger.add_team("X", 0, false).unwrap();
        let err = ledger.add_team("x", 0, false).unwrap_err();
        assert!(matches!(err, ScoreError::Validation { .. }));
        assert!(ledger.add_team("", 0, false).is_err());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_add_team_current_clears_others() {
        let mut ledger = Ledger::new();
        ledger.add_team("A", 0, true).unwrap();
        ledger.add_team("B", 5, true).unwrap();
        assert_eq!(current_count(&ledger), 1);
        assert_eq!(ledger.current_player().unwrap().team, "B");
        assert_eq!(ledger.team_names(), vec!["B", "A"]);
    }

    #[test]
    fn test_manual_edits_clear_race_points() {
        let fresh = || {
            let mut ledger = Ledger::new();
            ledger.apply_race_result(&race(&[(1, "X"), (2, "Y")]));
            ledger
        };
        let no_points = |ledger: &Ledger| ledger.entries().iter().all(|e| e.added_score == 0);

        let mut ledger = fresh();
        ledger.rename_team(1, "Yankee").unwrap();
        assert!(no_points(&ledger));

        let mut ledger = fresh();
        ledger.set_score(0, 40).unwrap();
        assert!(no_points(&ledger));

        let mut ledger = fresh();
        ledger.set_current_player("Y").unwrap();
        assert!(no_points(&ledger));

        let mut ledger = fresh();
        ledger.remove_team(0).unwrap();
        assert!(no_points(&ledger));

        let mut ledger = fresh();
        ledger.add_team("Z", 3, false).unwrap();
        assert!(no_points(&ledger));

        // A rejected edit leaves the race points alone.
        let mut ledger = fresh();
        assert!(ledger.rename_team(1, "x").is_err());
        assert_eq!(summary(&ledger), vec![("X", 15, 15), ("Y", 12, 12)]);
    }

    #[test]
    fn test_from_entries_restores_invariants() {
        let entries = vec![
            TeamScoreEntry::new("low", 1, true),
            TeamScoreEntry::new("high", 50, true),
            TeamScoreEntry::new("HIGH", 70, false),
            TeamScoreEntry::new("  ", 90, false),
            TeamScoreEntry {
                score: 9_000_000,
                ..TeamScoreEntry::new("big", 0, false)
            },
        ];
        let ledger = Ledger::from_entries(entries);

        assert_eq!(
            summary(&ledger),
            vec![("big", 999_999, 0), ("high", 50, 0), ("low", 1, 0)]
        );
        assert_eq!(ledger.current_player().unwrap().team, "low");
        assert_eq!(current_count(&ledger), 1);
    }

    #[test]
    fn test_invariants_hold_across_mixed_mutations() {
        let mut ledger = Ledger::new();
        let mut race_batch = race(&[(3, "A"), (1, "B"), (2, "C"), (4, "A")]);
        race_batch[0].is_current_player = true;

        ledger.apply_race_result(&race_batch);
        assert!(is_sorted(&ledger) && current_count(&ledger) <= 1);
        ledger.add_team("D", 100, true).unwrap();
        assert!(is_sorted(&ledger) && current_count(&ledger) <= 1);
        ledger.apply_race_result(&race_batch);
        assert!(is_sorted(&ledger) && current_count(&ledger) <= 1);
        ledger.set_score(3, -5).unwrap();
        assert!(is_sorted(&ledger) && current_count(&ledger) <= 1);
        ledger.apply_overall_sync(&totals(&[("C", 3), ("A", 9)]));
        assert!(is_sorted(&ledger) && current_count(&ledger) <= 1);
        ledger.set_current_player("C").unwrap();
        assert!(is_sorted(&ledger) && current_count(&ledger) == 1);
        ledger.reset();
        assert!(ledger.is_empty());
    }
}
