//! Polls a ledger store and reports changes.
//!
//! Used when another process owns the ledger (the capture worker, or the
//! overlay server). A read that races a write may fail or see stale data;
//! it is retried on the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::scoring::{compute_diff, DiffEvent, Ledger, TeamScoreEntry};
use crate::store::LedgerStore;

/// A ledger that differs from the last one seen.
#[derive(Debug, Clone)]
pub struct WatchUpdate {
    pub entries: Vec<TeamScoreEntry>,
    pub events: Vec<DiffEvent>,
}

pub struct LedgerWatcher<S: LedgerStore> {
    store: S,
    last: Option<Vec<TeamScoreEntry>>,
}

impl<S: LedgerStore> LedgerWatcher<S> {
    pub fn new(store: S) -> Self {
        Self { store, last: None }
    }

    /// Loads the store once. The first successful load is always an update.
    pub fn poll(&mut self) -> Option<WatchUpdate> {
        let entries = match self.store.load() {
            Ok(entries) => Ledger::from_entries(entries).entries().to_vec(),
            Err(e) => {
                warn!("Overlay poll of {} failed, retrying: {}", self.store.describe(), e);
                return None;
            }
        };

        let previous = self.last.as_deref().unwrap_or(&[]);
        if self.last.is_some() && same_contents(previous, &entries) {
            return None;
        }

        let events = compute_diff(previous, &entries);
        debug!("Overlay poll: {} teams, {} events", entries.len(), events.len());
        self.last = Some(entries.clone());
        Some(WatchUpdate { entries, events })
    }

    /// Polls every `interval` until `stop` is set.
    pub fn run<F>(&mut self, interval: Duration, stop: &AtomicBool, mut on_change: F)
    where
        F: FnMut(&WatchUpdate),
    {
        while !stop.load(Ordering::SeqCst) {
            if let Some(update) = self.poll() {
                on_change(&update);
            }
            thread::sleep(interval);
        }
    }
}

/// Compares what the overlay shows. Stored rows without an id get a fresh
/// one on every load, so ids are ignored.
fn same_contents(a: &[TeamScoreEntry], b: &[TeamScoreEntry]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.team == y.team
                && x.score == y.score
                && x.added_score == y.added_score
                && x.is_current_player == y.is_current_player
        })
}
