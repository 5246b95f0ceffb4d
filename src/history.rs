//! Append-only CSV log of every applied batch.
//!
//! Each row records one team touched by a batch:
//! timestamp, mode, team, points added, new total.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};

use crate::scoring::{Mutation, ScoringMode};

pub const HISTORY_HEADER: &str = "timestamp,mode,team,added,total";

/// Creates the file with a header if it doesn't exist or is empty.
pub fn init_history(path: &Path) -> Result<()> {
    if path.exists() {
        let file = File::open(path).context("Failed to open existing history CSV")?;
        if BufReader::new(file).lines().next().is_some() {
            return Ok(());
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("Failed to create history directory")?;
    }
    let mut file = File::create(path).context("Failed to create history CSV")?;
    writeln!(file, "{}", HISTORY_HEADER).context("Failed to write history header")?;
    Ok(())
}

/// Appends the teams a batch touched. Returns the number of rows written.
///
/// Race batches log teams that scored. Overall syncs log every team, with
/// `added` being the change from the previous total.
pub fn append_batch(
    path: &Path,
    mode: ScoringMode,
    mutation: &Mutation,
    at: DateTime<Local>,
) -> Result<usize> {
    let timestamp = at.format("%Y-%m-%dT%H:%M:%S");
    let mut lines = String::new();
    let mut rows = 0;

    for entry in mutation.next.entries() {
        let added = match mode {
            ScoringMode::Race => {
                if entry.added_score == 0 {
                    continue;
                }
                entry.added_score
            }
            ScoringMode::Overall => {
                let before = mutation
                    .previous
                    .entries()
                    .iter()
                    .find(|e| e.id == entry.id)
                    .map(|e| e.score)
                    .unwrap_or(0);
                entry.score - before
            }
        };
        lines.push_str(&format!(
            "{},{},{},{},{}\n",
            timestamp,
            mode,
            csv_field(&entry.team),
            added,
            entry.score
        ));
        rows += 1;
    }

    if rows == 0 {
        return Ok(0);
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("Failed to open history CSV for append")?;
    file.write_all(lines.as_bytes())
        .context("Failed to write history rows")?;
    Ok(rows)
}

/// Quotes a field if it contains a comma, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
