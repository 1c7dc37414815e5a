//! Exporter
//!
//! Writes project records back to their firmware slots, one command at a time.
//! A rejected write becomes a report warning and the run moves on; transport
//! loss and precondition failures abort.

mod macros;
mod settings;
mod setlists;
mod songs;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::category::{Category, CategorySet};
use crate::device::DeviceClient;
use crate::error::SyncError;
use crate::import::version;
use crate::store::ProjectRepository;

/// What to export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    pub categories: CategorySet,
    /// Clear macro slots that hold no macro in the project
    pub clear_missing_macros: bool,
}

/// Counts and warnings from one export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub firmware_version: Option<String>,
    pub songs: usize,
    pub macros: usize,
    pub setlists: usize,
    pub settings: usize,
    pub jacks: usize,
    pub cleared_macros: usize,
    /// Commands the firmware accepted
    pub writes: usize,
    pub warnings: Vec<String>,
}

impl ExportReport {
    pub(crate) fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

pub struct Exporter<'a> {
    device: &'a dyn DeviceClient,
    store: &'a dyn ProjectRepository,
    options: ExportOptions,
}

impl<'a> Exporter<'a> {
    pub fn new(
        device: &'a dyn DeviceClient,
        store: &'a dyn ProjectRepository,
        options: ExportOptions,
    ) -> Self {
        Self {
            device,
            store,
            options,
        }
    }

    /// Write every selected category from the store to the pedal
    pub async fn run(&self) -> Result<ExportReport, SyncError> {
        let mut report = ExportReport::default();
        let state = self.store.get_state();
        let categories = &self.options.categories;
        info!("Export started");

        if categories.contains(Category::Macros) {
            self.export_macros(&state.macros, &state.partials, &mut report).await?;
            if self.options.clear_missing_macros {
                self.clear_missing_macros(&state.macros, &mut report).await?;
            }
        }
        if categories.contains(Category::Songs) {
            self.export_songs(&state.songs, &mut report).await?;
        }
        if categories.contains(Category::Setlists) {
            let detected = version::detect_firmware_version(self.device, &mut report.warnings).await?;
            report.firmware_version = detected.or_else(|| state.firmware_version.clone());
            let sectioned = version::supports_sectioned_setlists(report.firmware_version.as_deref());
            self.export_setlists(&state.setlists, sectioned, &mut report).await?;
        }
        if categories.contains(Category::Global) {
            self.export_settings(&state.global, "Global", &mut report).await?;
        }
        if categories.contains(Category::Display) {
            self.export_settings(&state.display, "Display", &mut report).await?;
        }
        if categories.contains(Category::Jacks) {
            self.export_jacks(&state.jacks, &mut report).await?;
        }

        info!(
            "Export finished: {} songs, {} macros, {} setlists, {} settings, {} jacks, \
             {} writes, {} warnings",
            report.songs,
            report.macros,
            report.setlists,
            report.settings,
            report.jacks,
            report.writes,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Send one write.
    ///
    /// Returns `Ok(false)` when the firmware rejected it; the rejection is
    /// recorded as a warning prefixed with `context`.
    pub(crate) async fn write(
        &self,
        body: Value,
        context: &str,
        report: &mut ExportReport,
    ) -> Result<bool, SyncError> {
        match self.device.send_command(body).await {
            Ok(_) => {
                report.writes += 1;
                Ok(true)
            }
            Err(err) if err.is_fatal() => Err(SyncError::Bridge(err)),
            Err(err) => {
                debug!("Write failed: {}", err);
                report.warn(format!("{}: {}", context, err));
                Ok(false)
            }
        }
    }
}
