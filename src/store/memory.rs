//! In-memory store for tests, with a switch to make saves fail.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{LedgerStore, StoreError};
use crate::scoring::TeamScoreEntry;

#[derive(Default)]
pub struct MemoryLedgerStore {
    entries: Mutex<Vec<TeamScoreEntry>>,
    fail_saves: AtomicBool,
    corrupt: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryLedgerStore {
    pub fn with_entries(entries: Vec<TeamScoreEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            ..Self::default()
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_corrupt(&self, corrupt: bool) {
        self.corrupt.store(corrupt, Ordering::SeqCst);
    }

    pub fn saved(&self) -> Vec<TeamScoreEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Result<Vec<TeamScoreEntry>, StoreError> {
        if self.corrupt.load(Ordering::SeqCst) {
            return Err(StoreError::Corrupt("test corruption".to_string()));
        }
        Ok(self.saved())
    }

    fn save(&self, entries: &[TeamScoreEntry]) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Http("save disabled for test".to_string()));
        }
        *self.entries.lock().unwrap() = entries.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
