//! Project snapshots on disk
//!
//! The snapshot is the CLI's project file: imports write it, exports and
//! offline partial rewrites read it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

use super::{MemoryStore, ProjectRepository, ProjectState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Milliseconds since epoch
    pub timestamp: u64,
    pub version: String,
    pub project: ProjectState,
}

impl ProjectSnapshot {
    /// Current snapshot format version
    pub const VERSION: &'static str = "1.0.0";

    pub fn from_state(project: ProjectState) -> Self {
        Self {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
            version: Self::VERSION.to_string(),
            project,
        }
    }

    /// Save snapshot to JSON file
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize project snapshot")?;

        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write project snapshot: {}", path.display()))?;

        Ok(())
    }

    /// Load snapshot from JSON file
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read project snapshot: {}", path.display()))?;

        let snapshot: ProjectSnapshot =
            serde_json::from_str(&json).context("Failed to parse project snapshot JSON")?;

        debug!(
            "Project snapshot loaded (version: {}, timestamp: {})",
            snapshot.version, snapshot.timestamp
        );

        Ok(snapshot)
    }
}

impl MemoryStore {
    /// Save current state to JSON file
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
        ProjectSnapshot::from_state(self.get_state())
            .save_to_file(path)
            .await
    }

    /// Create a store from a JSON file
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self> {
        let snapshot = ProjectSnapshot::load_from_file(path).await?;
        Ok(Self::with_state(snapshot.project))
    }

    /// Load from file if present, otherwise start empty
    pub async fn load_or_empty(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load_snapshot(path).await
        } else {
            Ok(Self::new())
        }
    }
}
