//! Change signals between two ledger snapshots, for the overlay animation.

use serde::Serialize;

use super::entry::TeamScoreEntry;

/// What happened to one team between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DiffKind {
    /// Moved to a smaller index (higher on the board).
    Up,
    Down,
    ScoreDelta { amount: i64 },
    NameChanged { previous: String },
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffEvent {
    /// Current display name, or the last known one for removed teams.
    pub team: String,
    #[serde(flatten)]
    pub kind: DiffKind,
}

impl DiffEvent {
    fn new(team: &str, kind: DiffKind) -> Self {
        Self {
            team: team.to_string(),
            kind,
        }
    }
}

/// Compares two snapshots and returns the change events.
///
/// Entries are matched by their stable id, falling back to the
/// case-insensitive team key for rows stored without one. The order of the
/// returned events carries no meaning.
pub fn compute_diff(previous: &[TeamScoreEntry], next: &[TeamScoreEntry]) -> Vec<DiffEvent> {
    let mut matched = vec![false; previous.len()];
    let mut events = Vec::new();

    for (next_idx, entry) in next.iter().enumerate() {
        let by_id = (0..previous.len()).find(|&i| !matched[i] && previous[i].id == entry.id);
        let prev_idx = by_id.or_else(|| {
            let key = entry.key();
            (0..previous.len()).find(|&i| !matched[i] && previous[i].key() == key)
        });

        let Some(prev_idx) = prev_idx else {
            events.push(DiffEvent::new(&entry.team, DiffKind::Added));
            continue;
        };
        matched[prev_idx] = true;
        let before = &previous[prev_idx];

        if before.team != entry.team {
            events.push(DiffEvent::new(
                &entry.team,
                DiffKind::NameChanged {
                    previous: before.team.clone(),
                },
            ));
        }
        if next_idx < prev_idx {
            events.push(DiffEvent::new(&entry.team, DiffKind::Up));
        } else if next_idx > prev_idx {
            events.push(DiffEvent::new(&entry.team, DiffKind::Down));
        }
        if entry.added_score > 0 {
            events.push(DiffEvent::new(
                &entry.team,
                DiffKind::ScoreDelta {
                    amount: entry.added_score,
                },
            ));
        }
    }

    for (entry, _) in previous.iter().zip(&matched).filter(|(_, m)| !**m) {
        events.push(DiffEvent::new(&entry.team, DiffKind::Removed));
    }

    events
}
