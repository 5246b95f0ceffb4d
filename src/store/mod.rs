//! Where the ledger lives between runs.
//!
//! The score service only needs load and save. A JSON file is the default;
//! the HTTP store talks to the local overlay server instead.

pub mod file;
pub mod http;
#[cfg(test)]
pub mod memory;

use std::path::PathBuf;

use thiserror::Error;

use crate::scoring::TeamScoreEntry;

pub use file::FileLedgerStore;
pub use http::HttpLedgerStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Stored data exists but cannot be read as a ledger.
    #[error("stored ledger is corrupt: {0}")]
    Corrupt(String),
    #[error("ledger server: {0}")]
    Http(String),
}

/// Load/save contract for ledger persistence.
///
/// `load` returns an empty list when nothing has been stored yet.
pub trait LedgerStore: Send + Sync {
    fn load(&self) -> Result<Vec<TeamScoreEntry>, StoreError>;
    fn save(&self, entries: &[TeamScoreEntry]) -> Result<(), StoreError>;
    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}

impl<T: LedgerStore + ?Sized> LedgerStore for Box<T> {
    fn load(&self) -> Result<Vec<TeamScoreEntry>, StoreError> {
        (**self).load()
    }

    fn save(&self, entries: &[TeamScoreEntry]) -> Result<(), StoreError> {
        (**self).save(entries)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
