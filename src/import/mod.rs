//! Slot scanner
//!
//! Reads songs, macros, setlists, settings and jacks from the pedal one slot
//! at a time. Per-slot and per-key failures become report warnings; only a
//! transport failure aborts the run.

mod macros;
mod settings;
mod setlists;
mod songs;
pub mod version;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::category::{Category, CategorySet};
use crate::config::{ImportConfig, ImportMode};
use crate::device::DeviceClient;
use crate::error::{BridgeError, SyncError};
use crate::protocol::CommandResponse;
use crate::store::{ProjectRepository, StatePatch};

/// What to import and how
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOptions {
    pub policy: ImportConfig,
    pub categories: CategorySet,
}

impl ImportOptions {
    pub fn import_all(mut self) -> Self {
        self.policy.mode = ImportMode::All;
        self
    }
}

/// Counts and warnings from one import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub firmware_version: Option<String>,
    pub songs: usize,
    pub macros: usize,
    pub setlists: usize,
    pub settings: usize,
    pub jacks: usize,
    /// Populated slots left out as untouched defaults
    pub defaults_skipped: usize,
    pub warnings: Vec<String>,
}

impl ImportReport {
    pub(crate) fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Tracks consecutive default records during a configured-only scan
#[derive(Debug)]
pub(crate) struct DefaultRun {
    limit: Option<usize>,
    count: usize,
}

impl DefaultRun {
    pub(crate) fn new(mode: ImportMode, limit: usize) -> Self {
        Self {
            limit: match mode {
                ImportMode::Configured => Some(limit),
                ImportMode::All => None,
            },
            count: 0,
        }
    }

    /// Whether default records are kept
    pub(crate) fn keeps_defaults(&self) -> bool {
        self.limit.is_none()
    }

    /// Record a populated slot; returns `true` when the scan should stop
    pub(crate) fn observe(&mut self, is_default: bool) -> bool {
        if !is_default {
            self.count = 0;
            return false;
        }
        self.count += 1;
        self.limit.is_some_and(|limit| self.count >= limit)
    }
}

pub struct Importer<'a> {
    device: &'a dyn DeviceClient,
    store: &'a dyn ProjectRepository,
    options: ImportOptions,
}

impl<'a> Importer<'a> {
    pub fn new(
        device: &'a dyn DeviceClient,
        store: &'a dyn ProjectRepository,
        options: ImportOptions,
    ) -> Self {
        Self {
            device,
            store,
            options,
        }
    }

    /// Scan every selected category and write the results to the store
    pub async fn run(&self) -> Result<ImportReport, SyncError> {
        let mut report = ImportReport::default();
        let categories = &self.options.categories;
        info!("Import started (mode: {})", self.options.policy.mode.as_str());

        let firmware_version =
            version::detect_firmware_version(self.device, &mut report.warnings).await?;
        report.firmware_version = firmware_version.clone();

        let mut patch = StatePatch {
            firmware_version,
            ..Default::default()
        };

        if categories.contains(Category::Songs) {
            let songs = self.scan_songs(&mut report).await?;
            report.songs = songs.len();
            patch.songs = Some(songs);
        }
        if categories.contains(Category::Macros) {
            let macros = self.scan_macros(&mut report).await?;
            report.macros = macros.len();
            patch.macros = Some(macros);
        }
        if categories.contains(Category::Setlists) {
            let sectioned = version::supports_sectioned_setlists(report.firmware_version.as_deref());
            let setlists = self.scan_setlists(sectioned, &mut report).await?;
            report.setlists = setlists.len();
            patch.setlists = Some(setlists);
        }
        if categories.contains(Category::Global) {
            let (global, applied) = self.scan_global(&mut report).await?;
            report.settings += applied;
            patch.global = Some(global);
        }
        if categories.contains(Category::Display) {
            let (display, applied) = self.scan_display(&mut report).await?;
            report.settings += applied;
            patch.display = Some(display);
        }
        if categories.contains(Category::Jacks) {
            let jacks = self.scan_jacks(&mut report).await?;
            report.jacks = jacks.len();
            patch.jacks = Some(jacks);
        }

        self.store.set_state(patch);
        info!(
            "Import finished: {} songs, {} macros, {} setlists, {} settings, {} jacks, {} warnings",
            report.songs,
            report.macros,
            report.setlists,
            report.settings,
            report.jacks,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Send a query; fatal bridge errors abort, anything else is returned
    pub(crate) async fn request(
        &self,
        body: Value,
    ) -> Result<Result<CommandResponse, BridgeError>, SyncError> {
        match self.device.send_command(body).await {
            Err(err) if err.is_fatal() => Err(SyncError::Bridge(err)),
            Err(err) => {
                debug!("Query failed: {}", err);
                Ok(Err(err))
            }
            Ok(response) => Ok(Ok(response)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_stops_at_limit() {
        let mut run = DefaultRun::new(ImportMode::Configured, 3);
        assert!(!run.observe(true));
        assert!(!run.observe(true));
        assert!(!run.observe(false), "non-default resets");
        assert!(!run.observe(true));
        assert!(!run.observe(true));
        assert!(run.observe(true));
        assert!(!run.keeps_defaults());
    }

    #[test]
    fn test_import_all_never_stops() {
        let mut run = DefaultRun::new(ImportMode::All, 1);
        for _ in 0..200 {
            assert!(!run.observe(true));
        }
        assert!(run.keeps_defaults());
    }
}
