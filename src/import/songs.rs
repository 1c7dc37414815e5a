use tracing::debug;

use super::{DefaultRun, ImportReport, Importer};
use crate::error::{ModelError, SyncError};
use crate::model::{MacroRef, SlotKind, Song, TimeSignature, DEFAULT_TEMPO};
use crate::protocol::{command, CommandResponse};

const TEMPO_RANGE: std::ops::RangeInclusive<i64> = 20..=300;

impl Importer<'_> {
    pub(crate) async fn scan_songs(&self, report: &mut ImportReport) -> Result<Vec<Song>, SyncError> {
        let policy = &self.options.policy;
        let mut run = DefaultRun::new(policy.mode, policy.default_run.songs);
        let mut songs = Vec::new();

        for slot in 0..policy.capacity.songs {
            let response = match self.request(command::get_song_details(slot)).await? {
                Ok(response) => response,
                Err(_) => continue,
            };
            let song = match song_from_response(slot, &response) {
                Ok(song) => song,
                Err(err) => {
                    report.warn(format!("Song slot {}: {}", slot, err));
                    continue;
                }
            };

            let is_default = song.is_default(slot);
            if is_default && !run.keeps_defaults() {
                report.defaults_skipped += 1;
            } else {
                songs.push(song);
            }
            if run.observe(is_default) {
                debug!("Stopping song scan after slot {}: run of default slots", slot);
                break;
            }
        }

        Ok(songs)
    }
}

/// Map a `get_song_details` reply onto a song record
pub(crate) fn song_from_response(slot: usize, response: &CommandResponse) -> Result<Song, ModelError> {
    let title = response
        .str_field("name")
        .ok_or(ModelError::MissingField("name"))?;
    let mut song = Song::new(slot, title)?;

    if let Some(tempo) = response.int_field("tempo") {
        if !TEMPO_RANGE.contains(&tempo) {
            return Err(ModelError::ValueOutOfRange {
                field: "tempo",
                value: tempo,
            });
        }
        song.tempo = tempo as u16;
    } else {
        song.tempo = DEFAULT_TEMPO;
    }

    if let Some(code) = response.int_field("time_sig") {
        song.time_signature = TimeSignature::from_code(code)?;
    }

    song.macro_ref = match response.int_field("macro") {
        Some(index) if index >= 0 => Some(MacroRef {
            macro_id: SlotKind::Macro.id(index as usize)?,
            enabled: true,
        }),
        _ => None,
    };

    Ok(song)
}
