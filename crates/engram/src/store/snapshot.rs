//! Snapshot persistence
//!
//! A snapshot is the full serializable state of one owner's store. The
//! `SnapshotStore` trait abstracts where snapshots live; the default
//! implementation writes one JSON file per owner under the configured data
//! directory.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngramError, Result};
use crate::memory::Memory;
use crate::store::{Goal, Relationship};

/// Serializable state of one owner's store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub owner_id: String,
    pub memories: Vec<Memory>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// Backend for loading and saving owner snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot for an owner, or `None` when the owner has no
    /// saved state.
    async fn load(&self, owner_id: &str) -> Result<Option<StoreSnapshot>>;

    /// Persist a snapshot, replacing any previous one for the same owner.
    async fn save(&self, snapshot: &StoreSnapshot) -> Result<()>;
}

/// One JSON file per owner under a data directory.
pub struct JsonSnapshotStore {
    dir: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, owner_id: &str) -> PathBuf {
        // Owner ids come from callers; keep the filename filesystem-safe.
        let safe: String = owner_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load(&self, owner_id: &str) -> Result<Option<StoreSnapshot>> {
        let path = self.path_for(owner_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EngramError::Io(e)),
        };

        let snapshot: StoreSnapshot = serde_json::from_str(&raw)
            .map_err(|e| EngramError::Persistence(format!("corrupt snapshot {path:?}: {e}")))?;
        debug!(owner_id, memories = snapshot.memories.len(), "Loaded snapshot");
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&snapshot.owner_id);
        let raw = serde_json::to_string_pretty(snapshot)
            .map_err(|e| EngramError::Serialization(e.to_string()))?;

        // Write to a sibling temp file then rename, so a crash mid-write
        // never leaves a truncated snapshot behind.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(owner_id = %snapshot.owner_id, memories = snapshot.memories.len(), "Saved snapshot");
        Ok(())
    }
}
