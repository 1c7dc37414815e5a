use tracing::debug;

use super::{DefaultRun, ImportReport, Importer};
use crate::error::{ModelError, SyncError};
use crate::model::{Macro, MidiStep, MACRO_COMMAND_CAPACITY};
use crate::partials;
use crate::protocol::{command, CommandResponse, FirmwareCommand};

impl Importer<'_> {
    pub(crate) async fn scan_macros(&self, report: &mut ImportReport) -> Result<Vec<Macro>, SyncError> {
        let policy = &self.options.policy;
        let catalog = if policy.compress_partials {
            self.store.get_state().partials
        } else {
            Vec::new()
        };
        let mut run = DefaultRun::new(policy.mode, policy.default_run.macros);
        let mut macros = Vec::new();

        for slot in 0..policy.capacity.macros {
            let name = match self.request(command::get_macro_name(slot)).await? {
                Ok(response) => match response.value_str().or_else(|| response.str_field("name")) {
                    Some(name) => name.to_string(),
                    None => {
                        report.warn(format!("Macro slot {}: reply has no name", slot));
                        continue;
                    }
                },
                Err(_) => continue,
            };

            let steps = self.read_macro_steps(slot, report).await?;
            let mut record = Macro::new(slot, name, steps)?;

            let is_default = record.is_default(slot);
            if is_default && !run.keeps_defaults() {
                report.defaults_skipped += 1;
            } else {
                if !catalog.is_empty() {
                    record.steps = partials::compress(&record.steps, &catalog);
                }
                macros.push(record);
            }
            if run.observe(is_default) {
                debug!("Stopping macro scan after slot {}: run of default slots", slot);
                break;
            }
        }

        Ok(macros)
    }

    /// Fetch the active command slots listed in the macro's slot map
    async fn read_macro_steps(
        &self,
        slot: usize,
        report: &mut ImportReport,
    ) -> Result<Vec<MidiStep>, SyncError> {
        let active = match self.request(command::get_macro_map(slot)).await? {
            Ok(response) => response.value_ints().unwrap_or_default(),
            Err(err) => {
                report.warn(format!("Macro slot {}: slot map unavailable: {}", slot, err));
                return Ok(Vec::new());
            }
        };

        let mut steps = Vec::new();
        for index in active_indices(&active) {
            let response = match self.request(command::get_macro_cmd(slot, index)).await? {
                Ok(response) => response,
                Err(err) => {
                    report.warn(format!("Macro slot {} command {}: {}", slot, index, err));
                    continue;
                }
            };
            match firmware_command_from(&response).and_then(|c| MidiStep::from_firmware_command(&c)) {
                Ok(Some(step)) => steps.push(step),
                Ok(None) => {}
                Err(err) => report.warn(format!("Macro slot {} command {}: {}", slot, index, err)),
            }
        }
        Ok(steps)
    }
}

/// Indices flagged active, limited to the per-macro command capacity
pub(crate) fn active_indices(map: &[i64]) -> Vec<usize> {
    map.iter()
        .take(MACRO_COMMAND_CAPACITY)
        .enumerate()
        .filter(|(_, flag)| **flag != 0)
        .map(|(i, _)| i)
        .collect()
}

/// Read the command fields of a `get_macro_cmd` reply
pub(crate) fn firmware_command_from(response: &CommandResponse) -> Result<FirmwareCommand, ModelError> {
    let kind = response
        .str_field("type")
        .ok_or(ModelError::MissingField("type"))?;
    Ok(FirmwareCommand {
        kind: kind.to_string(),
        channel: byte_field(response, "channel")?.unwrap_or(1),
        num: byte_field(response, "num")?.unwrap_or(0),
        val: byte_field(response, "val")?.unwrap_or(0),
        msb: byte_field(response, "msb")?,
        lsb: byte_field(response, "lsb")?,
        delay: response
            .int_field("delay")
            .map(|d| u32::try_from(d).map_err(|_| ModelError::ValueOutOfRange { field: "delay", value: d }))
            .transpose()?,
    })
}

fn byte_field(response: &CommandResponse, field: &'static str) -> Result<Option<u8>, ModelError> {
    response
        .int_field(field)
        .map(|v| u8::try_from(v).map_err(|_| ModelError::ValueOutOfRange { field, value: v }))
        .transpose()
}
