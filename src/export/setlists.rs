use super::{ExportReport, Exporter};
use crate::error::SyncError;
use crate::model::{Setlist, SETLIST_SECTIONS, SETLIST_SECTION_SIZE};
use crate::protocol::command;

impl Exporter<'_> {
    pub(crate) async fn export_setlists(
        &self,
        setlists: &[Setlist],
        sectioned: bool,
        report: &mut ExportReport,
    ) -> Result<(), SyncError> {
        for setlist in setlists {
            let slot = setlist.slot()?;
            let label = format!("Setlist '{}'", setlist.name);
            let songs = member_slots(setlist, report);

            let mut accepted = self
                .write(
                    command::set_setlist_name(slot, &setlist.name, Some(&setlist.description)),
                    &label,
                    report,
                )
                .await?;

            if sectioned {
                // Every section is written so stale entries past the end are cleared
                for (section, chunk) in sections(&songs).into_iter().enumerate() {
                    let context = format!("{} section {}", label, section);
                    accepted &= self
                        .write(command::set_setlist_songs_sect(slot, section, chunk), &context, report)
                        .await?;
                }
            } else {
                let context = format!("{} songs", label);
                accepted &= self
                    .write(command::set_setlist_songs(slot, &songs), &context, report)
                    .await?;
            }

            if accepted {
                report.setlists += 1;
            }
        }
        Ok(())
    }
}

/// Song slots of a setlist in order; unparseable entries and overflow are dropped
fn member_slots(setlist: &Setlist, report: &mut ExportReport) -> Vec<usize> {
    let mut songs = Vec::with_capacity(setlist.entries.len());
    for entry in &setlist.entries {
        match entry.song_slot() {
            Ok(slot) => songs.push(slot),
            Err(err) => report.warn(format!("Setlist '{}': {}", setlist.name, err)),
        }
    }

    let limit = SETLIST_SECTIONS * SETLIST_SECTION_SIZE;
    if songs.len() > limit {
        report.warn(format!(
            "Setlist '{}': {} songs exceed the {}-song limit; extra songs dropped",
            setlist.name,
            songs.len(),
            limit
        ));
        songs.truncate(limit);
    }
    songs
}

/// Split membership into the fixed number of firmware sections
fn sections(songs: &[usize]) -> Vec<&[usize]> {
    (0..SETLIST_SECTIONS)
        .map(|section| {
            let start = (section * SETLIST_SECTION_SIZE).min(songs.len());
            let end = (start + SETLIST_SECTION_SIZE).min(songs.len());
            &songs[start..end]
        })
        .collect()
}
