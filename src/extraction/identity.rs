//! Team inference from player names.
//!
//! Players on the same team usually share a tag at the start of their name
//! ("パンチ" and "パンダ" both play for "パン"). Names are bucketed by their
//! first character and, within a bucket, clustered greedily on the longest
//! prefix shared by at least two names. Teams already in the ledger take
//! precedence so a team's name never drifts between batches.

use super::record::ExtractionRecord;
use crate::scoring::entry::team_key;

/// Team assigned to rows whose name has nothing to group on.
pub const UNKNOWN_TEAM: &str = "UNKNOWN";

/// Shortest shared prefix that counts as a team tag.
const MIN_PREFIX_CHARS: usize = 2;

/// Fills in the `team` of every record that has none.
///
/// Records that already carry a team keep it, adopting the display casing of
/// a matching known team. `known_teams` are the display names currently in
/// the ledger.
pub fn resolve_teams(
    mut records: Vec<ExtractionRecord>,
    known_teams: &[String],
) -> Vec<ExtractionRecord> {
    let known: Vec<(Vec<char>, &str)> = known_teams
        .iter()
        .map(|t| (fold(t.trim()), t.as_str()))
        .filter(|(folded, _)| !folded.is_empty())
        .collect();

    let mut pending: Vec<usize> = Vec::new();

    for (idx, record) in records.iter_mut().enumerate() {
        if !record.team.is_empty() {
            let key = team_key(&record.team);
            if let Some(display) = known_teams.iter().find(|t| team_key(t) == key) {
                record.team = display.clone();
            }
            continue;
        }

        let name = fold(record.name.trim());
        if name.is_empty() {
            record.team = UNKNOWN_TEAM.to_string();
            continue;
        }

        let known_match = known
            .iter()
            .filter(|(folded, _)| name.starts_with(folded))
            .max_by_key(|(folded, _)| folded.len());
        match known_match {
            Some((_, display)) => record.team = display.to_string(),
            None => pending.push(idx),
        }
    }

    // Bucket the rest by first character, keeping first-seen bucket order.
    let mut buckets: Vec<(char, Vec<usize>)> = Vec::new();
    for idx in pending {
        let Some(first) = fold(records[idx].name.trim()).first().copied() else {
            continue;
        };
        match buckets.iter_mut().find(|(c, _)| *c == first) {
            Some((_, members)) => members.push(idx),
            None => buckets.push((first, vec![idx])),
        }
    }

    for (_, members) in buckets {
        for (idx, team) in cluster_bucket(&records, members) {
            records[idx].team = team;
        }
    }

    records
}

/// Assigns a team to every member of one first-character bucket.
fn cluster_bucket(records: &[ExtractionRecord], mut unassigned: Vec<usize>) -> Vec<(usize, String)> {
    let names: Vec<(usize, Vec<char>, Vec<char>)> = unassigned
        .iter()
        .map(|&idx| {
            let original: Vec<char> = records[idx].name.trim().chars().collect();
            let folded = original.iter().map(|c| fold_char(*c)).collect();
            (idx, original, folded)
        })
        .collect();
    let lookup = |idx: usize| names.iter().find(|(i, _, _)| *i == idx);

    let mut assigned = Vec::new();

    loop {
        // Longest prefix shared by two unassigned names; earliest name wins ties.
        let mut best: Option<(usize, usize)> = None;
        for (a_pos, &a) in unassigned.iter().enumerate() {
            for &b in &unassigned[a_pos + 1..] {
                let (Some((_, _, fa)), Some((_, _, fb))) = (lookup(a), lookup(b)) else {
                    continue;
                };
                let len = common_prefix_len(fa, fb);
                if len >= MIN_PREFIX_CHARS && best.is_none_or(|(_, best_len)| len > best_len) {
                    best = Some((a, len));
                }
            }
        }

        let Some((leader, len)) = best else {
            break;
        };
        let Some((_, original, folded)) = lookup(leader) else {
            break;
        };
        let team: String = original[..len].iter().collect();
        let prefix = &folded[..len];

        unassigned.retain(|&idx| match lookup(idx) {
            Some((_, _, f)) if f.starts_with(prefix) => {
                assigned.push((idx, team.clone()));
                false
            }
            _ => true,
        });
    }

    for idx in unassigned {
        let team = lookup(idx)
            .and_then(|(_, original, _)| original.first())
            .map(|c| c.to_uppercase().collect::<String>())
            .unwrap_or_else(|| UNKNOWN_TEAM.to_string());
        assigned.push((idx, team));
    }

    assigned
}

fn common_prefix_len(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Case-folds per character so folded and original names stay aligned.
fn fold(text: &str) -> Vec<char> {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    c.to_uppercase().next().unwrap_or(c)
}
