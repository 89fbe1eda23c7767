//! Persisted traversal checkpoint
//!
//! The warm-up job persists a single `(mIdx, cIdx, pIdx)` triple between
//! invocations. Loading is tolerant: a missing or corrupt record falls back to
//! the start-of-catalog position, so the worst case is re-warming from the
//! top, never a crash.
//!
//! The checkpoint indexes the catalog by array position while the catalog is
//! re-fetched fresh every run; if the feed reorders or shrinks between runs
//! the checkpoint can point at a different manga than the one it was taken
//! against. That gap is inherited from the upstream system and deliberately
//! not papered over here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Traversal resume position: 0-based catalog index, 1-based chapter number,
/// 0-based offset of the next page to warm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(rename = "mIdx")]
    pub manga_idx: usize,
    #[serde(rename = "cIdx")]
    pub chapter_idx: u32,
    #[serde(rename = "pIdx")]
    pub page_idx: u32,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            manga_idx: 0,
            chapter_idx: 1,
            page_idx: 0,
        }
    }
}

pub trait CheckpointStore: Send + Sync {
    /// Load the stored checkpoint; missing or malformed records yield the
    /// default start-of-catalog position.
    fn load(&self) -> Checkpoint;
    fn save(&self, checkpoint: &Checkpoint) -> io::Result<()>;
}

/// JSON-file-backed store, one key, overwritten in place
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Checkpoint {
        if self.path.exists() {
            if let Ok(raw) = fs::read_to_string(&self.path) {
                if let Ok(checkpoint) = serde_json::from_str::<Checkpoint>(&raw) {
                    return checkpoint;
                }
            }
        }
        Checkpoint::default()
    }

    fn save(&self, checkpoint: &Checkpoint) -> io::Result<()> {
        let raw = serde_json::to_string(checkpoint)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        fs::write(&self.path, raw)
    }
}

/// In-memory store for tests and embedded use
#[derive(Default)]
pub struct MemoryCheckpointStore {
    slot: Mutex<Option<Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last saved checkpoint, if any save happened
    pub fn last(&self) -> Option<Checkpoint> {
        *self.slot.lock().unwrap()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Checkpoint {
        self.slot.lock().unwrap().unwrap_or_default()
    }

    fn save(&self, checkpoint: &Checkpoint) -> io::Result<()> {
        *self.slot.lock().unwrap() = Some(*checkpoint);
        Ok(())
    }
}
