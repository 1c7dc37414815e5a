//! Project records: partials, macros, songs, setlists and jacks

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::slot::SlotKind;
use super::step::{MidiStep, StepKind};
use crate::error::ModelError;

/// Tempo the firmware assigns to an untouched song
pub const DEFAULT_TEMPO: u16 = 120;

/// A named, reusable group of raw commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub steps: Vec<MidiStep>,
}

impl Partial {
    /// Create a partial; nested partial references are rejected
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        steps: Vec<MidiStep>,
    ) -> Result<Self, ModelError> {
        if let Some(StepKind::Partial { partial_id, .. }) =
            steps.iter().map(|s| &s.kind).find(|k| matches!(k, StepKind::Partial { .. }))
        {
            return Err(ModelError::UnexpandedPartial(partial_id.clone()));
        }
        Ok(Self {
            id: id.into(),
            name: name.into(),
            description: None,
            device: None,
            tags: Vec::new(),
            steps,
        })
    }

    /// Partials loaded from disk are only usable if every step is raw
    pub fn is_raw(&self) -> bool {
        !self.steps.iter().any(MidiStep::is_partial_ref)
    }
}

/// A macro: ordered steps stored in one firmware macro slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macro {
    pub id: String,
    pub name: String,
    pub steps: Vec<MidiStep>,
    /// Device associated with a MIDI channel (1-16)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub devices: BTreeMap<u8, String>,
}

impl Macro {
    pub fn new(slot: usize, name: impl Into<String>, steps: Vec<MidiStep>) -> Result<Self, ModelError> {
        Ok(Self {
            id: SlotKind::Macro.id(slot)?,
            name: name.into(),
            steps,
            devices: BTreeMap::new(),
        })
    }

    pub fn slot(&self) -> Result<usize, ModelError> {
        SlotKind::Macro.parse(&self.id)
    }

    /// Untouched firmware slot: no steps and the synthesized name
    pub fn is_default(&self, slot: usize) -> bool {
        self.steps.is_empty() && self.name == SlotKind::Macro.default_name(slot)
    }
}

/// Reference from a song to a macro slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroRef {
    pub macro_id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Beats per bar and beat unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub unit: u8,
}

impl TimeSignature {
    /// Firmware time-signature codes, in code order
    pub const TABLE: [TimeSignature; 10] = [
        TimeSignature { beats: 4, unit: 4 },
        TimeSignature { beats: 3, unit: 4 },
        TimeSignature { beats: 2, unit: 4 },
        TimeSignature { beats: 6, unit: 8 },
        TimeSignature { beats: 5, unit: 4 },
        TimeSignature { beats: 7, unit: 8 },
        TimeSignature { beats: 12, unit: 8 },
        TimeSignature { beats: 9, unit: 8 },
        TimeSignature { beats: 5, unit: 8 },
        TimeSignature { beats: 6, unit: 4 },
    ];

    pub fn from_code(code: i64) -> Result<Self, ModelError> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::TABLE.get(i).copied())
            .ok_or(ModelError::UnknownCode {
                table: "time signature",
                code,
            })
    }

    pub fn code(&self) -> Result<i64, ModelError> {
        Self::TABLE
            .iter()
            .position(|ts| ts == self)
            .map(|i| i as i64)
            .ok_or(ModelError::ValueOutOfRange {
                field: "time signature",
                value: i64::from(self.beats) * 100 + i64::from(self.unit),
            })
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::TABLE[0]
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.unit)
    }
}

/// A song slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub tempo: u16,
    #[serde(default)]
    pub time_signature: TimeSignature,
    /// The firmware holds a single macro per song
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_ref: Option<MacroRef>,
}

impl Song {
    pub fn new(slot: usize, title: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            id: SlotKind::Song.id(slot)?,
            title: title.into(),
            key: None,
            tempo: DEFAULT_TEMPO,
            time_signature: TimeSignature::default(),
            macro_ref: None,
        })
    }

    pub fn slot(&self) -> Result<usize, ModelError> {
        SlotKind::Song.parse(&self.id)
    }

    /// The attached macro, if any and enabled
    pub fn active_macro(&self) -> Option<&MacroRef> {
        self.macro_ref.as_ref().filter(|m| m.enabled)
    }

    /// Untouched firmware slot: synthesized title, no macro, default tempo
    pub fn is_default(&self, slot: usize) -> bool {
        self.title == SlotKind::Song.default_name(slot)
            && self.active_macro().is_none()
            && self.tempo == DEFAULT_TEMPO
    }
}

/// One setlist position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetlistEntry {
    pub song_id: String,
}

impl SetlistEntry {
    pub fn for_slot(song_slot: usize) -> Result<Self, ModelError> {
        Ok(Self {
            song_id: SlotKind::Song.id(song_slot)?,
        })
    }

    pub fn song_slot(&self) -> Result<usize, ModelError> {
        SlotKind::Song.parse(&self.song_id)
    }
}

/// A setlist slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub entries: Vec<SetlistEntry>,
}

impl Setlist {
    pub fn new(slot: usize, name: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            id: SlotKind::Setlist.id(slot)?,
            name: name.into(),
            description: String::new(),
            entries: Vec::new(),
        })
    }

    pub fn slot(&self) -> Result<usize, ModelError> {
        SlotKind::Setlist.parse(&self.id)
    }

    pub fn is_default(&self, slot: usize) -> bool {
        self.entries.is_empty() && self.name == SlotKind::Setlist.default_name(slot)
    }
}

/// Raw jack configuration as read from the pedal, replayed verbatim on export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JackConfig {
    pub jack: usize,
    pub values: BTreeMap<String, Value>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_signature_table() {
        assert_eq!(TimeSignature::from_code(3).unwrap().to_string(), "6/8");
        assert_eq!(TimeSignature { beats: 12, unit: 8 }.code().unwrap(), 6);
        assert!(TimeSignature::from_code(10).is_err());
        assert!(TimeSignature::from_code(-1).is_err());
        assert!(TimeSignature { beats: 11, unit: 8 }.code().is_err());
    }

    #[test]
    fn test_song_default_classification() {
        let mut song = Song::new(4, "Song 5").unwrap();
        assert!(song.is_default(4));

        song.macro_ref = Some(MacroRef {
            macro_id: "macro-001".to_string(),
            enabled: false,
        });
        assert!(song.is_default(4), "disabled macro does not count");

        song.macro_ref.as_mut().unwrap().enabled = true;
        assert!(!song.is_default(4));

        let mut song = Song::new(4, "Song 5").unwrap();
        song.tempo = 96;
        assert!(!song.is_default(4));
    }

    #[test]
    fn test_macro_default_classification() {
        let m = Macro::new(2, "Macro 3", vec![]).unwrap();
        assert!(m.is_default(2));
        let m = Macro::new(2, "Macro 3", vec![MidiStep::cc(1, 1, 1)]).unwrap();
        assert!(!m.is_default(2));
        let m = Macro::new(2, "Verse FX", vec![]).unwrap();
        assert!(!m.is_default(2));
    }

    #[test]
    fn test_setlist_entries_parse_song_slots() {
        let entry = SetlistEntry::for_slot(17).unwrap();
        assert_eq!(entry.song_id, "song-017");
        assert_eq!(entry.song_slot().unwrap(), 17);
    }

    #[test]
    fn test_partial_rejects_nested_references() {
        let nested = vec![MidiStep::cc(1, 2, 3), MidiStep::partial_ref("p0", "Other")];
        assert!(Partial::new("p1", "Bad", nested).is_err());
        assert!(Partial::new("p1", "Good", vec![MidiStep::pc(1, 4)]).unwrap().is_raw());
    }
}
