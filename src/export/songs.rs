use serde_json::{json, Value};

use super::{ExportReport, Exporter};
use crate::error::SyncError;
use crate::model::{SlotKind, Song};
use crate::protocol::command;

/// Macro slot value meaning "no macro"
const NO_MACRO: i64 = -1;

impl Exporter<'_> {
    pub(crate) async fn export_songs(
        &self,
        songs: &[Song],
        report: &mut ExportReport,
    ) -> Result<(), SyncError> {
        for song in songs {
            let slot = song.slot()?;
            let label = format!("Song '{}'", song.title);
            let mut accepted = true;
            for (param, value) in song_params(song, report) {
                let context = format!("{} {}", label, param);
                accepted &= self
                    .write(command::set_param_value(slot, param, value), &context, report)
                    .await?;
            }
            if accepted {
                report.songs += 1;
            }
        }
        Ok(())
    }
}

/// Parameter writes for one song, in firmware order
fn song_params(song: &Song, report: &mut ExportReport) -> Vec<(&'static str, Value)> {
    let mut params = vec![("name", json!(song.title)), ("tempo", json!(song.tempo))];

    match song.time_signature.code() {
        Ok(code) => params.push(("time_sig", json!(code))),
        Err(err) => report.warn(format!("Song '{}': {}", song.title, err)),
    }

    let macro_slot = match song.active_macro() {
        Some(reference) => match SlotKind::Macro.parse(&reference.macro_id) {
            Ok(slot) => slot as i64,
            Err(err) => {
                report.warn(format!("Song '{}': {}; macro cleared", song.title, err));
                NO_MACRO
            }
        },
        None => NO_MACRO,
    };
    params.push(("macro", json!(macro_slot)));
    params
}
