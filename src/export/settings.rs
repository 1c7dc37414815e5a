use super::{ExportReport, Exporter};
use crate::error::SyncError;
use crate::model::{JackConfig, SettingsRecord, SlotKind};
use crate::protocol::command;

impl Exporter<'_> {
    /// Write a settings record key by key
    pub(crate) async fn export_settings<S: SettingsRecord + Sync>(
        &self,
        settings: &S,
        label: &str,
        report: &mut ExportReport,
    ) -> Result<(), SyncError> {
        let codes = match settings.to_codes() {
            Ok(codes) => codes,
            Err(err) => {
                report.warn(format!("{} settings not written: {}", label, err));
                return Ok(());
            }
        };
        for (key, code) in codes {
            let context = format!("{} setting '{}'", label, key);
            if self.write(command::set_global_var(key, code), &context, report).await? {
                report.settings += 1;
            }
        }
        Ok(())
    }

    /// Replay each jack's captured key/value map
    pub(crate) async fn export_jacks(
        &self,
        jacks: &[JackConfig],
        report: &mut ExportReport,
    ) -> Result<(), SyncError> {
        for config in jacks {
            let jack = SlotKind::Jack.check(config.jack)?;
            let mut accepted = true;
            for (key, value) in &config.values {
                let context = format!("Jack {} '{}'", jack + 1, key);
                accepted &= self
                    .write(command::set_jack_cfg(jack, key, value.clone()), &context, report)
                    .await?;
            }
            if accepted {
                report.jacks += 1;
            }
        }
        Ok(())
    }
}
