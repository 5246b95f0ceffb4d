//! Text rendering of the ledger for an overlay text source, and the atomic
//! writer that keeps the overlay file in step with the ledger.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::OverlayConfig;
use crate::scoring::TeamScoreEntry;
use crate::store::file::write_atomic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayStyle {
    /// Append `(+N)` to teams that scored in the last batch.
    pub show_added: bool,
    /// Suffix for the local player's team; empty disables it.
    pub current_marker: String,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            show_added: true,
            current_marker: "<<".to_string(),
        }
    }
}

impl From<&OverlayConfig> for OverlayStyle {
    fn from(config: &OverlayConfig) -> Self {
        Self {
            show_added: config.show_added,
            current_marker: config.current_marker.clone(),
        }
    }
}

/// An overlay file plus how to render into it.
#[derive(Debug, Clone)]
pub struct OverlayTarget {
    pub path: PathBuf,
    pub style: OverlayStyle,
}

impl OverlayTarget {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            path: config.overlay_path(),
            style: OverlayStyle::from(config),
        }
    }

    pub fn publish(&self, entries: &[TeamScoreEntry]) -> Result<()> {
        write_overlay(&self.path, entries, &self.style)
    }
}

/// One line per team: position, name, score, last gain and current marker.
pub fn render_text(entries: &[TeamScoreEntry], style: &OverlayStyle) -> String {
    let name_width = entries
        .iter()
        .map(|e| e.team.chars().count())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        let padding = name_width - entry.team.chars().count();
        let mut line = format!(
            "{:>2}. {}{}  {:>6}",
            i + 1,
            entry.team,
            " ".repeat(padding),
            entry.score
        );
        if style.show_added && entry.added_score > 0 {
            line.push_str(&format!(" (+{})", entry.added_score));
        }
        if entry.is_current_player && !style.current_marker.is_empty() {
            line.push(' ');
            line.push_str(&style.current_marker);
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Renders and atomically replaces the overlay file.
pub fn write_overlay(
    path: &Path,
    entries: &[TeamScoreEntry],
    style: &OverlayStyle,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    write_atomic(path, render_text(entries, style).as_bytes())
        .with_context(|| format!("Failed to write overlay {}", path.display()))
}
