//! Firmware slot identities
//!
//! Every record id encodes its firmware slot index (`song-000`, `macro-003`,
//! `setlist-02`). This is the join key between the project model and the
//! pedal's flat slot arrays, so formatting and parsing live in one place.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModelError;

/// Song slots in firmware
pub const SONG_CAPACITY: usize = 128;
/// Macro slots in firmware
pub const MACRO_CAPACITY: usize = 128;
/// Setlist slots in firmware
pub const SETLIST_CAPACITY: usize = 10;
/// Configurable jacks
pub const JACK_COUNT: usize = 4;
/// Command slots per macro
pub const MACRO_COMMAND_CAPACITY: usize = 16;
/// Song indices per setlist section query
pub const SETLIST_SECTION_SIZE: usize = 32;
/// Sections per setlist
pub const SETLIST_SECTIONS: usize = 4;

/// Kind of firmware slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Song,
    Macro,
    Setlist,
    Jack,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Song => "song",
            SlotKind::Macro => "macro",
            SlotKind::Setlist => "setlist",
            SlotKind::Jack => "jack",
        }
    }

    /// Firmware capacity for this kind
    pub fn capacity(&self) -> usize {
        match self {
            SlotKind::Song => SONG_CAPACITY,
            SlotKind::Macro => MACRO_CAPACITY,
            SlotKind::Setlist => SETLIST_CAPACITY,
            SlotKind::Jack => JACK_COUNT,
        }
    }

    /// Zero-padded digit count used in ids
    fn width(&self) -> usize {
        match self {
            SlotKind::Song | SlotKind::Macro => 3,
            SlotKind::Setlist => 2,
            SlotKind::Jack => 1,
        }
    }

    /// Check an index against the firmware capacity
    pub fn check(&self, index: usize) -> Result<usize, ModelError> {
        if index >= self.capacity() {
            return Err(ModelError::SlotOutOfRange {
                kind: self.as_str(),
                index,
                capacity: self.capacity(),
            });
        }
        Ok(index)
    }

    /// Format the record id for a slot index
    pub fn id(&self, index: usize) -> Result<String, ModelError> {
        self.check(index)?;
        Ok(format!("{}-{:0width$}", self.as_str(), index, width = self.width()))
    }

    /// Parse the slot index back out of a record id
    pub fn parse(&self, id: &str) -> Result<usize, ModelError> {
        let digits = id
            .strip_prefix(self.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| ModelError::InvalidSlotId(id.to_string()))?;
        let index = digits
            .parse::<usize>()
            .map_err(|_| ModelError::InvalidSlotId(id.to_string()))?;
        self.check(index)
    }

    /// Name the firmware synthesizes for an untouched slot
    pub fn default_name(&self, index: usize) -> String {
        match self {
            SlotKind::Song => format!("Song {}", index + 1),
            SlotKind::Macro => format!("Macro {}", index + 1),
            SlotKind::Setlist => format!("Setlist {}", index + 1),
            SlotKind::Jack => format!("Jack {}", index + 1),
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_formatting() {
        assert_eq!(SlotKind::Song.id(0).unwrap(), "song-000");
        assert_eq!(SlotKind::Macro.id(3).unwrap(), "macro-003");
        assert_eq!(SlotKind::Setlist.id(2).unwrap(), "setlist-02");
        assert_eq!(SlotKind::Song.id(127).unwrap(), "song-127");
    }

    #[test]
    fn test_id_parsing_round_trip() {
        for index in [0, 9, 64, 127] {
            let id = SlotKind::Macro.id(index).unwrap();
            assert_eq!(SlotKind::Macro.parse(&id).unwrap(), index);
        }
        assert_eq!(SlotKind::Setlist.parse("setlist-09").unwrap(), 9);
    }

    #[test]
    fn test_invalid_ids_rejected() {
        assert!(matches!(
            SlotKind::Song.parse("macro-001"),
            Err(ModelError::InvalidSlotId(_))
        ));
        assert!(SlotKind::Song.parse("song-").is_err());
        assert!(SlotKind::Song.parse("song-1a").is_err());
        assert!(SlotKind::Song.parse("song001").is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(matches!(
            SlotKind::Setlist.parse("setlist-10"),
            Err(ModelError::SlotOutOfRange { index: 10, .. })
        ));
        assert!(SlotKind::Song.id(128).is_err());
    }

    #[test]
    fn test_default_names_are_one_based() {
        assert_eq!(SlotKind::Song.default_name(0), "Song 1");
        assert_eq!(SlotKind::Setlist.default_name(9), "Setlist 10");
    }
}
