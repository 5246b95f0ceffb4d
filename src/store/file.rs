//! JSON file ledger store.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{LedgerStore, StoreError};
use crate::scoring::TeamScoreEntry;

/// Stores the ledger as a pretty-printed JSON array.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl LedgerStore for FileLedgerStore {
    fn load(&self) -> Result<Vec<TeamScoreEntry>, StoreError> {
        if !self.path.exists() {
            log::debug!("No ledger at {}, starting empty", self.path.display());
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    fn save(&self, entries: &[TeamScoreEntry]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Corrupt(format!("serialize ledger: {}", e)))?;
        write_atomic(&self.path, json.as_bytes())
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Writes `contents` to `path` through a temporary file in the same
/// directory, so readers never see a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(io_err)?;

    let mut temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    temp.write_all(contents).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = FileLedgerStore::new(dir.path().join("scores.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileLedgerStore::new(dir.path().join("nested").join("scores.json"));

        let mut second = TeamScoreEntry::new("チームB", 12, true);
        second.added_score = 12;
        let entries = vec![TeamScoreEntry::new("Alpha", 15, false), second];

        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn test_save_overwrites_previous() {
        let dir = tempdir().unwrap();
        let store = FileLedgerStore::new(dir.path().join("scores.json"));

        store.save(&[TeamScoreEntry::new("A", 1, false)]).unwrap();
        store.save(&[]).unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = FileLedgerStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_reads_entries_written_without_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.json");
        std::fs::write(
            &path,
            r#"[{"team":"X","score":100,"addedScore":0,"isCurrentPlayer":true}]"#,
        )
        .unwrap();

        let entries = FileLedgerStore::new(&path).load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].team, "X");
        assert!(entries[0].is_current_player);
    }

    #[test]
    fn test_write_atomic_writes_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("overlay.txt");
        write_atomic(&path, b"1. X 15").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1. X 15");
    }
}
