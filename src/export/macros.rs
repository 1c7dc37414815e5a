use tracing::debug;

use super::{ExportReport, Exporter};
use crate::error::SyncError;
use crate::midi::format_hex;
use crate::model::{Macro, Partial, SlotKind, MACRO_COMMAND_CAPACITY};
use crate::partials;
use crate::protocol::{command, FirmwareCommand};

impl Exporter<'_> {
    pub(crate) async fn export_macros(
        &self,
        macros: &[Macro],
        catalog: &[Partial],
        report: &mut ExportReport,
    ) -> Result<(), SyncError> {
        for record in macros {
            if self.export_macro(record, catalog, report).await? {
                report.macros += 1;
            }
        }
        Ok(())
    }

    /// Write every command slot of one macro, then its name.
    ///
    /// Returns `true` when every write was accepted.
    async fn export_macro(
        &self,
        record: &Macro,
        catalog: &[Partial],
        report: &mut ExportReport,
    ) -> Result<bool, SyncError> {
        let slot = record.slot()?;
        let label = format!("Macro '{}'", record.name);
        let commands = firmware_commands(record, catalog, report)?;

        let mut accepted = true;
        for index in 0..MACRO_COMMAND_CAPACITY {
            let fields = commands.get(index).cloned().unwrap_or_else(FirmwareCommand::empty);
            let context = format!("{} command {}", label, index);
            accepted &= self
                .write(command::set_macro_cmd(slot, index, &fields), &context, report)
                .await?;
        }
        // The firmware commits the slot map when the name arrives
        accepted &= self
            .write(command::set_macro_name(slot, &record.name), &label, report)
            .await?;
        Ok(accepted)
    }

    /// Erase one macro slot on the pedal
    pub async fn clear_macro(&self, slot: usize, report: &mut ExportReport) -> Result<bool, SyncError> {
        let slot = SlotKind::Macro.check(slot)?;
        let context = format!("Clear macro slot {}", slot);
        self.write(command::clear_macro(slot), &context, report).await
    }

    pub(crate) async fn clear_missing_macros(
        &self,
        macros: &[Macro],
        report: &mut ExportReport,
    ) -> Result<(), SyncError> {
        let occupied = macros
            .iter()
            .map(Macro::slot)
            .collect::<Result<Vec<_>, _>>()?;
        for slot in (0..SlotKind::Macro.capacity()).filter(|s| !occupied.contains(s)) {
            if self.clear_macro(slot, report).await? {
                report.cleared_macros += 1;
            }
        }
        Ok(())
    }
}

/// Expand partials and convert steps to firmware commands.
///
/// Dangling references and custom steps are dropped with a warning; anything
/// past the per-macro capacity is truncated.
fn firmware_commands(
    record: &Macro,
    catalog: &[Partial],
    report: &mut ExportReport,
) -> Result<Vec<FirmwareCommand>, SyncError> {
    let (steps, dangling) = partials::expand_reporting(&record.steps, catalog);
    for partial_id in dangling {
        report.warn(format!(
            "Macro '{}': dropped reference to unknown partial '{}'",
            record.name, partial_id
        ));
    }

    let mut commands = Vec::with_capacity(steps.len());
    for step in &steps {
        if let Some(bytes) = step.wire_bytes() {
            debug!("Macro '{}': {} [{}]", record.name, step, format_hex(&bytes));
        }
        match step.to_firmware_command()? {
            Some(fields) => commands.push(fields),
            None => report.warn(format!(
                "Macro '{}': skipped step '{}' with no firmware encoding",
                record.name, step
            )),
        }
    }

    if commands.len() > MACRO_COMMAND_CAPACITY {
        report.warn(format!(
            "Macro '{}': {} commands exceed the {}-command limit; extra commands dropped",
            record.name,
            commands.len(),
            MACRO_COMMAND_CAPACITY
        ));
        commands.truncate(MACRO_COMMAND_CAPACITY);
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::recording::RecordingDevice;
    use crate::error::BridgeError;
    use crate::export::ExportOptions;
    use crate::model::MidiStep;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn exporter<'a>(device: &'a RecordingDevice, store: &'a MemoryStore) -> Exporter<'a> {
        Exporter::new(device, store, ExportOptions::default())
    }

    #[tokio::test]
    async fn test_every_slot_written_then_name() {
        let device = RecordingDevice::accepting();
        let store = MemoryStore::new();
        let record = Macro::new(2, "Verse", vec![MidiStep::cc(1, 7, 100), MidiStep::pc(2, 5)]).unwrap();
        let mut report = ExportReport::default();

        exporter(&device, &store)
            .export_macros(&[record], &[], &mut report)
            .await
            .unwrap();

        let sent = device.sent();
        assert_eq!(sent.len(), MACRO_COMMAND_CAPACITY + 1);
        assert_eq!(sent[0]["type"], "CC");
        assert_eq!(sent[1]["type"], "PC");
        for body in &sent[2..MACRO_COMMAND_CAPACITY] {
            assert_eq!(body["type"], "-");
            assert_eq!(body["channel"], 1);
            assert_eq!(body["num"], 0);
            assert_eq!(body["val"], 0);
        }
        let last = sent.last().unwrap();
        assert_eq!(last["cmd"], "set_macro_name");
        assert_eq!(last["macro"], 2);
        assert_eq!(last["value"], "Verse");
        assert_eq!(report.macros, 1);
    }

    #[tokio::test]
    async fn test_partials_expanded_and_dangling_dropped() {
        let device = RecordingDevice::accepting();
        let store = MemoryStore::new();
        let catalog = vec![Partial::new(
            "p-amp",
            "Amp",
            vec![MidiStep::cc(1, 20, 1), MidiStep::cc(1, 21, 2)],
        )
        .unwrap()];
        let record = Macro::new(
            0,
            "Chorus",
            vec![
                MidiStep::partial_ref("p-amp", "Amp"),
                MidiStep::partial_ref("p-gone", "Gone"),
                MidiStep::pc(1, 9),
            ],
        )
        .unwrap();
        let mut report = ExportReport::default();

        exporter(&device, &store)
            .export_macros(&[record], &catalog, &mut report)
            .await
            .unwrap();

        let sent = device.sent();
        assert_eq!(sent[0]["num"], 20);
        assert_eq!(sent[1]["num"], 21);
        assert_eq!(sent[2]["type"], "PC");
        assert_eq!(sent[3]["type"], "-");
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("p-gone"));
    }

    #[tokio::test]
    async fn test_custom_steps_skipped_with_warning() {
        let device = RecordingDevice::accepting();
        let store = MemoryStore::new();
        let record = Macro::new(
            1,
            "Sysex",
            vec![MidiStep::custom(vec![0xF0, 0x7D, 0x01, 0xF7]), MidiStep::cc(3, 1, 64)],
        )
        .unwrap();
        let mut report = ExportReport::default();

        exporter(&device, &store)
            .export_macros(&[record], &[], &mut report)
            .await
            .unwrap();

        let sent = device.sent();
        assert_eq!(sent[0]["type"], "CC");
        assert_eq!(sent[0]["channel"], 3);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_overlong_macro_truncated() {
        let device = RecordingDevice::accepting();
        let store = MemoryStore::new();
        let steps = (0..20).map(|i| MidiStep::cc(1, i, 0)).collect();
        let record = Macro::new(4, "Long", steps).unwrap();
        let mut report = ExportReport::default();

        exporter(&device, &store)
            .export_macros(&[record], &[], &mut report)
            .await
            .unwrap();

        assert_eq!(device.sent().len(), MACRO_COMMAND_CAPACITY + 1);
        assert_eq!(device.sent()[MACRO_COMMAND_CAPACITY - 1]["num"], 15);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_macro_id_is_fatal() {
        let device = RecordingDevice::accepting();
        let store = MemoryStore::new();
        let mut record = Macro::new(0, "Broken", Vec::new()).unwrap();
        record.id = "macro-xyz".to_string();
        let mut report = ExportReport::default();

        let result = exporter(&device, &store)
            .export_macros(&[record], &[], &mut report)
            .await;
        assert!(matches!(result, Err(SyncError::Model(_))));
        assert!(device.sent().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_command_still_writes_name() {
        let device = RecordingDevice::new(|body| {
            if body["slot"] == 3 {
                Err(BridgeError::Nack { code: 2 })
            } else {
                Ok(json!({"status": "success"}))
            }
        });
        let store = MemoryStore::new();
        let record = Macro::new(0, "Intro", Vec::new()).unwrap();
        let mut report = ExportReport::default();

        exporter(&device, &store)
            .export_macros(&[record], &[], &mut report)
            .await
            .unwrap();

        assert_eq!(device.command_names().last().unwrap(), "set_macro_name");
        assert_eq!(report.macros, 0);
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_macro() {
        let device = RecordingDevice::accepting();
        let store = MemoryStore::new();
        let mut report = ExportReport::default();
        let exporter = exporter(&device, &store);

        assert!(exporter.clear_macro(7, &mut report).await.unwrap());
        assert_eq!(device.sent()[0], json!({"cmd": "clear_macro", "macro": 7}));
        assert!(matches!(
            exporter.clear_macro(500, &mut report).await,
            Err(SyncError::Model(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_missing_skips_occupied_slots() {
        let device = RecordingDevice::accepting();
        let store = MemoryStore::new();
        let mut report = ExportReport::default();
        let macros = vec![Macro::new(0, "A", Vec::new()).unwrap(), Macro::new(5, "B", Vec::new()).unwrap()];

        exporter(&device, &store)
            .clear_missing_macros(&macros, &mut report)
            .await
            .unwrap();

        let cleared: Vec<_> = device.sent().iter().map(|b| b["macro"].as_u64().unwrap()).collect();
        assert_eq!(cleared.len(), SlotKind::Macro.capacity() - 2);
        assert!(!cleared.contains(&0) && !cleared.contains(&5));
        assert_eq!(report.cleared_macros, cleared.len());
    }
}
