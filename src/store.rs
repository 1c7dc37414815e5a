//! Project state and the repository the scanner and exporter work against
//!
//! The protocol core only needs a synchronous get/set contract; the CLI backs
//! it with an in-memory store hydrated from and saved to a JSON snapshot.

mod snapshot;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use snapshot::ProjectSnapshot;

use crate::model::{DisplaySettings, GlobalSettings, JackConfig, Macro, Partial, Setlist, Song};

/// Everything a project knows about one pedal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub songs: Vec<Song>,
    #[serde(default)]
    pub macros: Vec<Macro>,
    #[serde(default)]
    pub setlists: Vec<Setlist>,
    /// Catalog order is match priority during compression
    #[serde(default)]
    pub partials: Vec<Partial>,
    #[serde(default)]
    pub global: GlobalSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub jacks: Vec<JackConfig>,
}

/// Partial update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub firmware_version: Option<String>,
    pub songs: Option<Vec<Song>>,
    pub macros: Option<Vec<Macro>>,
    pub setlists: Option<Vec<Setlist>>,
    pub partials: Option<Vec<Partial>>,
    pub global: Option<GlobalSettings>,
    pub display: Option<DisplaySettings>,
    pub jacks: Option<Vec<JackConfig>>,
}

impl StatePatch {
    pub fn is_empty(&self) -> bool {
        *self == StatePatch::default()
    }

    pub fn apply(self, state: &mut ProjectState) {
        if let Some(version) = self.firmware_version {
            state.firmware_version = Some(version);
        }
        if let Some(songs) = self.songs {
            state.songs = songs;
        }
        if let Some(macros) = self.macros {
            state.macros = macros;
        }
        if let Some(setlists) = self.setlists {
            state.setlists = setlists;
        }
        if let Some(partials) = self.partials {
            state.partials = partials;
        }
        if let Some(global) = self.global {
            state.global = global;
        }
        if let Some(display) = self.display {
            state.display = display;
        }
        if let Some(jacks) = self.jacks {
            state.jacks = jacks;
        }
    }
}

/// Injected application store
pub trait ProjectRepository: Send + Sync {
    fn get_state(&self) -> ProjectState;
    fn set_state(&self, patch: StatePatch);
}

/// Thread-safe in-memory project store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<ProjectState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: ProjectState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Run `f` against the state without cloning it
    pub fn read<R>(&self, f: impl FnOnce(&ProjectState) -> R) -> R {
        f(&self.state.read())
    }
}

impl ProjectRepository for MemoryStore {
    fn get_state(&self) -> ProjectState {
        self.state.read().clone()
    }

    fn set_state(&self, patch: StatePatch) {
        patch.apply(&mut self.state.write());
    }
}
