//! Durable per-chain height checkpoints.
//!
//! A single sled database, opened once per process lifetime, holds the last
//! fully-processed height for each monitored chain under fixed keys in the
//! `Height` tree. Absence of a key reads as height 0 ("no checkpoint yet").
//! Writes flush before returning so a crash never rolls a checkpoint back
//! past the last acknowledged update.

use std::path::Path;

use thiserror::Error;

const HEIGHT_TREE: &str = "Height";
const SOURCE_HEIGHT_KEY: &[u8] = b"source_height";
const RELAY_HEIGHT_KEY: &[u8] = b"relay_height";

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint store i/o: {0}")]
    Store(#[from] sled::Error),
    #[error("creating checkpoint directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored {key} is {len} byte(s), expected {expected}")]
    Corrupt {
        key: &'static str,
        len: usize,
        expected: usize,
    },
}

/// Handle to the checkpoint store. Cheap to clone; all clones share the
/// same underlying database.
#[derive(Clone)]
pub struct CheckpointStore {
    db: sled::Db,
    heights: sled::Tree,
}

impl CheckpointStore {
    /// Open (or create) the store under `dir`.
    pub fn open(dir: &Path) -> Result<Self, CheckpointError> {
        std::fs::create_dir_all(dir)?;
        let db = sled::open(dir.join("checkpoints"))?;
        let heights = db.open_tree(HEIGHT_TREE)?;
        Ok(Self { db, heights })
    }

    /// Last fully-processed source-chain height, 0 if never set.
    pub fn last_source_height(&self) -> Result<u64, CheckpointError> {
        match self.heights.get(SOURCE_HEIGHT_KEY)? {
            None => Ok(0),
            Some(raw) => raw
                .as_ref()
                .try_into()
                .map(u64::from_le_bytes)
                .map_err(|_| CheckpointError::Corrupt {
                    key: "source_height",
                    len: raw.len(),
                    expected: 8,
                }),
        }
    }

    pub fn update_source_height(&self, height: u64) -> Result<(), CheckpointError> {
        self.heights
            .insert(SOURCE_HEIGHT_KEY, &height.to_le_bytes())?;
        self.heights.flush()?;
        Ok(())
    }

    /// Last fully-processed relay-chain height, 0 if never set.
    pub fn last_relay_height(&self) -> Result<u32, CheckpointError> {
        match self.heights.get(RELAY_HEIGHT_KEY)? {
            None => Ok(0),
            Some(raw) => raw
                .as_ref()
                .try_into()
                .map(u32::from_le_bytes)
                .map_err(|_| CheckpointError::Corrupt {
                    key: "relay_height",
                    len: raw.len(),
                    expected: 4,
                }),
        }
    }

    pub fn update_relay_height(&self, height: u32) -> Result<(), CheckpointError> {
        self.heights
            .insert(RELAY_HEIGHT_KEY, &height.to_le_bytes())?;
        self.heights.flush()?;
        Ok(())
    }

    /// Flush any buffered writes. Called once at shutdown.
    pub fn flush(&self) -> Result<(), CheckpointError> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, CheckpointStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_absent_keys_read_zero() {
        let (_dir, store) = open_temp();
        assert_eq!(store.last_source_height().unwrap(), 0);
        assert_eq!(store.last_relay_height().unwrap(), 0);
    }

    #[test]
    fn test_roundtrip_both_chains() {
        let (_dir, store) = open_temp();

        store.update_source_height(1_234_567).unwrap();
        store.update_relay_height(42).unwrap();

        assert_eq!(store.last_source_height().unwrap(), 1_234_567);
        assert_eq!(store.last_relay_height().unwrap(), 42);

        // Keys are disjoint: updating one never disturbs the other.
        store.update_source_height(1_234_568).unwrap();
        assert_eq!(store.last_relay_height().unwrap(), 42);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = CheckpointStore::open(dir.path()).unwrap();
            store.update_source_height(900).unwrap();
            store.update_relay_height(77).unwrap();
            store.flush().unwrap();
        }
        let store = CheckpointStore::open(dir.path()).unwrap();
        assert_eq!(store.last_source_height().unwrap(), 900);
        assert_eq!(store.last_relay_height().unwrap(), 77);
    }

    #[test]
    fn test_wrong_width_is_corrupt_not_panic() {
        let (_dir, store) = open_temp();
        store.heights.insert(SOURCE_HEIGHT_KEY, &[1u8, 2, 3]).unwrap();

        match store.last_source_height() {
            Err(CheckpointError::Corrupt { key, len, expected }) => {
                assert_eq!(key, "source_height");
                assert_eq!(len, 3);
                assert_eq!(expected, 8);
            }
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }

    #[test]
    fn test_clones_share_state() {
        let (_dir, store) = open_temp();
        let other = store.clone();
        store.update_relay_height(5).unwrap();
        assert_eq!(other.last_relay_height().unwrap(), 5);
    }
}
