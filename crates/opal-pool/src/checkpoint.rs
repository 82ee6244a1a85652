//! Rotation checkpoint persistence.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use opal_models::RotationCheckpoint;

use crate::error::{PoolError, PoolResult};

/// Persistence seam for the harvester's rotation index.
///
/// Single-writer: only the harvester loop ever saves, so last-write-wins
/// semantics are sufficient and no transactional guarantees are needed.
pub trait CheckpointStore: Send + Sync {
    /// Load the stored checkpoint, `None` when none was ever saved.
    fn load(&self) -> PoolResult<Option<RotationCheckpoint>>;

    /// Persist the checkpoint.
    fn save(&self, checkpoint: &RotationCheckpoint) -> PoolResult<()>;
}

/// JSON file checkpoint store with atomic writes.
///
/// Saves go through a temp file in the same directory followed by a rename,
/// so a crash mid-write can never leave a corrupt checkpoint behind.
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> PoolResult<Option<RotationCheckpoint>> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let checkpoint = serde_json::from_str(&data)?;
        Ok(Some(checkpoint))
    }

    fn save(&self, checkpoint: &RotationCheckpoint) -> PoolResult<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer(&mut tmp, checkpoint)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| PoolError::checkpoint_persist(e.to_string()))?;

        debug!(index = checkpoint.last_account_index, path = %self.path.display(), "checkpoint saved");
        Ok(())
    }
}

/// In-memory checkpoint store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    inner: Mutex<Option<RotationCheckpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing checkpoint.
    pub fn with_checkpoint(checkpoint: RotationCheckpoint) -> Self {
        Self {
            inner: Mutex::new(Some(checkpoint)),
        }
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> PoolResult<Option<RotationCheckpoint>> {
        Ok(*self.inner.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn save(&self, checkpoint: &RotationCheckpoint) -> PoolResult<()> {
        *self.inner.lock().unwrap_or_else(|e| e.into_inner()) = Some(*checkpoint);
        Ok(())
    }
}
