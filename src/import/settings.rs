use serde_json::{Map, Value};

use super::{ImportReport, Importer};
use crate::error::SyncError;
use crate::model::{DisplaySettings, GlobalSettings, JackConfig, SettingsRecord};
use crate::protocol::{command, CommandResponse};

impl Importer<'_> {
    pub(crate) async fn scan_global(
        &self,
        report: &mut ImportReport,
    ) -> Result<(GlobalSettings, usize), SyncError> {
        let mut settings = self.store.get_state().global;
        let applied = self.read_settings(&mut settings, "Global", report).await?;
        Ok((settings, applied))
    }

    pub(crate) async fn scan_display(
        &self,
        report: &mut ImportReport,
    ) -> Result<(DisplaySettings, usize), SyncError> {
        let mut settings = self.store.get_state().display;
        let applied = self.read_settings(&mut settings, "Display", report).await?;
        Ok((settings, applied))
    }

    /// Read every key of a settings record; failed keys keep their current value
    async fn read_settings<S: SettingsRecord + Send>(
        &self,
        settings: &mut S,
        label: &str,
        report: &mut ImportReport,
    ) -> Result<usize, SyncError> {
        let mut applied = 0;
        for &key in S::KEYS {
            let response = match self.request(command::get_global_var(key)).await? {
                Ok(response) => response,
                Err(err) => {
                    report.warn(format!("{} setting '{}': {}", label, key, err));
                    continue;
                }
            };
            let Some(code) = response.value_int() else {
                report.warn(format!("{} setting '{}': reply has no value", label, key));
                continue;
            };
            match settings.apply_code(key, code) {
                Ok(()) => applied += 1,
                Err(err) => report.warn(format!("{} setting '{}': {}", label, key, err)),
            }
        }
        Ok(applied)
    }

    pub(crate) async fn scan_jacks(&self, report: &mut ImportReport) -> Result<Vec<JackConfig>, SyncError> {
        let mut jacks = Vec::new();
        for jack in 0..self.options.policy.capacity.jacks {
            match self.request(command::get_jack_cfg(jack)).await? {
                Ok(response) => jacks.push(JackConfig {
                    jack,
                    values: jack_values(&response).into_iter().collect(),
                }),
                Err(err) => report.warn(format!("Jack {}: {}", jack + 1, err)),
            }
        }
        Ok(jacks)
    }
}

/// Key/value map of a `get_jack_cfg` reply, from `value` or the top level
fn jack_values(response: &CommandResponse) -> Map<String, Value> {
    match &response.value {
        Some(Value::Object(map)) => map.clone(),
        _ => response.extra.clone(),
    }
}
