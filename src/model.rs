//! Domain model for the pedal's configuration
//!
//! Records are plain values. Their ids encode the firmware slot they live in.

mod records;
mod settings;
mod slot;
mod step;

pub use records::{
    JackConfig, Macro, MacroRef, Partial, Setlist, SetlistEntry, Song, TimeSignature,
    DEFAULT_TEMPO,
};
pub use settings::{
    bool_code, bool_from_code, ClockSync, ColorTheme, DisplaySettings, FootswitchMode,
    GlobalSettings, MetronomeSound, ScreenTimeout, SettingsRecord,
};
pub use slot::{
    SlotKind, JACK_COUNT, MACRO_CAPACITY, MACRO_COMMAND_CAPACITY, SETLIST_CAPACITY,
    SETLIST_SECTIONS, SETLIST_SECTION_SIZE, SONG_CAPACITY,
};
pub use step::{BankSelect, MidiStep, StepId, StepKind};
