use tracing::debug;

use super::{DefaultRun, ImportReport, Importer};
use crate::error::SyncError;
use crate::model::{Setlist, SetlistEntry, SETLIST_SECTIONS, SETLIST_SECTION_SIZE};
use crate::protocol::command;

impl Importer<'_> {
    pub(crate) async fn scan_setlists(
        &self,
        sectioned: bool,
        report: &mut ImportReport,
    ) -> Result<Vec<Setlist>, SyncError> {
        let policy = &self.options.policy;
        let mut run = DefaultRun::new(policy.mode, policy.default_run.setlists);
        let mut setlists = Vec::new();
        debug!(
            "Scanning setlists with {} membership queries",
            if sectioned { "sectioned" } else { "legacy" }
        );

        for slot in 0..policy.capacity.setlists {
            let response = match self.request(command::get_setlist_name(slot)).await? {
                Ok(response) => response,
                Err(_) => continue,
            };
            let Some(name) = response.value_str().or_else(|| response.str_field("name")) else {
                report.warn(format!("Setlist slot {}: reply has no name", slot));
                continue;
            };
            let mut setlist = Setlist::new(slot, name)?;
            if let Some(description) = response.str_field("description") {
                setlist.description = description.to_string();
            }

            let indices = if sectioned {
                self.read_sectioned_songs(slot, report).await?
            } else {
                self.read_legacy_songs(slot, report).await?
            };
            setlist.entries = entries_from_indices(slot, &indices, report);

            let is_default = setlist.is_default(slot);
            if is_default && !run.keeps_defaults() {
                report.defaults_skipped += 1;
            } else {
                setlists.push(setlist);
            }
            if run.observe(is_default) {
                debug!("Stopping setlist scan after slot {}: run of default slots", slot);
                break;
            }
        }

        Ok(setlists)
    }

    /// Query membership section by section; a short section ends the list
    async fn read_sectioned_songs(
        &self,
        slot: usize,
        report: &mut ImportReport,
    ) -> Result<Vec<i64>, SyncError> {
        let mut indices = Vec::new();
        for section in 0..SETLIST_SECTIONS {
            let values = match self.request(command::get_setlist_songs_sect(slot, section)).await? {
                Ok(response) => response.value_ints().unwrap_or_default(),
                Err(err) => {
                    report.warn(format!("Setlist slot {} section {}: {}", slot, section, err));
                    break;
                }
            };
            let (items, complete) = section_items(&values);
            indices.extend(items);
            if !complete {
                break;
            }
        }
        Ok(indices)
    }

    async fn read_legacy_songs(
        &self,
        slot: usize,
        report: &mut ImportReport,
    ) -> Result<Vec<i64>, SyncError> {
        match self.request(command::get_setlist_songs(slot)).await? {
            Ok(response) => Ok(response.value_ints().unwrap_or_default()),
            Err(err) => {
                report.warn(format!("Setlist slot {} songs: {}", slot, err));
                Ok(Vec::new())
            }
        }
    }
}

/// Entries of one section up to the first negative terminator.
///
/// The flag is `true` when the section was full and more may follow.
pub(crate) fn section_items(values: &[i64]) -> (Vec<i64>, bool) {
    let items: Vec<i64> = values
        .iter()
        .take(SETLIST_SECTION_SIZE)
        .take_while(|v| **v >= 0)
        .copied()
        .collect();
    let complete = items.len() == SETLIST_SECTION_SIZE;
    (items, complete)
}

fn entries_from_indices(slot: usize, indices: &[i64], report: &mut ImportReport) -> Vec<SetlistEntry> {
    indices
        .iter()
        .take_while(|i| **i >= 0)
        .filter_map(|&index| match SetlistEntry::for_slot(index as usize) {
            Ok(entry) => Some(entry),
            Err(err) => {
                report.warn(format!("Setlist slot {}: {}", slot, err));
                None
            }
        })
        .collect()
}
