//! Global and display settings
//!
//! Each field is stored in firmware as a small integer under a fixed key.
//! Enumerations map through fixed code tables; booleans use the firmware
//! convention of `1` (off) / `2` (on).

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A flat settings record addressed key by key
pub trait SettingsRecord {
    /// Firmware keys, in the order they are read and written
    const KEYS: &'static [&'static str];

    /// Every field as a `(key, code)` pair
    fn to_codes(&self) -> Result<Vec<(&'static str, i64)>, ModelError>;

    /// Apply one firmware value
    fn apply_code(&mut self, key: &str, code: i64) -> Result<(), ModelError>;
}

/// Encode a boolean in the firmware's 1/2 convention
pub fn bool_code(value: bool) -> i64 {
    if value {
        2
    } else {
        1
    }
}

/// Decode a firmware boolean; `0` is accepted as off
pub fn bool_from_code(code: i64) -> Result<bool, ModelError> {
    match code {
        0 | 1 => Ok(false),
        2 => Ok(true),
        _ => Err(ModelError::UnknownCode {
            table: "boolean",
            code,
        }),
    }
}

fn ranged(field: &'static str, code: i64, min: i64, max: i64) -> Result<u8, ModelError> {
    if code < min || code > max {
        return Err(ModelError::ValueOutOfRange { field, value: code });
    }
    Ok(code as u8)
}

macro_rules! code_table {
    ($(#[$meta:meta])* $name:ident, $table:literal, { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub fn code(&self) -> i64 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn from_code(code: i64) -> Result<Self, ModelError> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(ModelError::UnknownCode { table: $table, code }),
                }
            }
        }
    };
}

code_table!(
    /// Metronome click sample
    MetronomeSound, "metronome sound", { Click = 0, Beep = 1, Woodblock = 2, Cowbell = 3 }
);

code_table!(
    /// Tempo clock source
    ClockSync, "clock sync", { Internal = 0, External = 1, Auto = 2 }
);

code_table!(
    /// Footswitch behaviour
    FootswitchMode, "footswitch mode", { Momentary = 0, Latching = 1, Preset = 2 }
);

code_table!(
    /// Display sleep delay
    ScreenTimeout, "screen timeout", { Never = 0, Seconds30 = 1, Minutes1 = 2, Minutes5 = 3 }
);

code_table!(
    /// Display colour theme
    ColorTheme, "color theme", { Dark = 0, Light = 1, HighContrast = 2 }
);

/// Metronome, sync, tap tempo, MIDI routing and footswitch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSettings {
    pub metronome_enabled: bool,
    /// 0-100
    pub metronome_volume: u8,
    pub metronome_sound: MetronomeSound,
    pub clock_sync: ClockSync,
    pub tap_tempo_enabled: bool,
    /// Footswitch number (1-4) acting as tap tempo
    pub tap_tempo_footswitch: u8,
    pub midi_thru: bool,
    pub usb_to_din: bool,
    pub din_to_usb: bool,
    pub footswitch_mode: FootswitchMode,
    /// Pedal's own receive channel (1-16)
    pub midi_channel: u8,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            metronome_enabled: false,
            metronome_volume: 50,
            metronome_sound: MetronomeSound::default(),
            clock_sync: ClockSync::default(),
            tap_tempo_enabled: true,
            tap_tempo_footswitch: 4,
            midi_thru: false,
            usb_to_din: true,
            din_to_usb: true,
            footswitch_mode: FootswitchMode::default(),
            midi_channel: 1,
        }
    }
}

impl SettingsRecord for GlobalSettings {
    const KEYS: &'static [&'static str] = &[
        "metro_en",
        "metro_vol",
        "metro_sound",
        "clock_sync",
        "tap_en",
        "tap_fs",
        "midi_thru",
        "usb_to_din",
        "din_to_usb",
        "fs_mode",
        "midi_channel",
    ];

    fn to_codes(&self) -> Result<Vec<(&'static str, i64)>, ModelError> {
        Ok(vec![
            ("metro_en", bool_code(self.metronome_enabled)),
            ("metro_vol", i64::from(self.metronome_volume)),
            ("metro_sound", self.metronome_sound.code()),
            ("clock_sync", self.clock_sync.code()),
            ("tap_en", bool_code(self.tap_tempo_enabled)),
            ("tap_fs", i64::from(self.tap_tempo_footswitch)),
            ("midi_thru", bool_code(self.midi_thru)),
            ("usb_to_din", bool_code(self.usb_to_din)),
            ("din_to_usb", bool_code(self.din_to_usb)),
            ("fs_mode", self.footswitch_mode.code()),
            ("midi_channel", i64::from(ranged("midi_channel", i64::from(self.midi_channel), 1, 16)?)),
        ])
    }

    fn apply_code(&mut self, key: &str, code: i64) -> Result<(), ModelError> {
        match key {
            "metro_en" => self.metronome_enabled = bool_from_code(code)?,
            "metro_vol" => self.metronome_volume = ranged("metro_vol", code, 0, 100)?,
            "metro_sound" => self.metronome_sound = MetronomeSound::from_code(code)?,
            "clock_sync" => self.clock_sync = ClockSync::from_code(code)?,
            "tap_en" => self.tap_tempo_enabled = bool_from_code(code)?,
            "tap_fs" => self.tap_tempo_footswitch = ranged("tap_fs", code, 1, 4)?,
            "midi_thru" => self.midi_thru = bool_from_code(code)?,
            "usb_to_din" => self.usb_to_din = bool_from_code(code)?,
            "din_to_usb" => self.din_to_usb = bool_from_code(code)?,
            "fs_mode" => self.footswitch_mode = FootswitchMode::from_code(code)?,
            "midi_channel" => self.midi_channel = ranged("midi_channel", code, 1, 16)?,
            other => return Err(ModelError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

/// Display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// 1-10
    pub brightness: u8,
    pub screen_timeout: ScreenTimeout,
    pub show_tempo: bool,
    pub show_setlist: bool,
    pub color_theme: ColorTheme,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            brightness: 8,
            screen_timeout: ScreenTimeout::default(),
            show_tempo: true,
            show_setlist: true,
            color_theme: ColorTheme::default(),
        }
    }
}

impl SettingsRecord for DisplaySettings {
    const KEYS: &'static [&'static str] = &[
        "disp_bright",
        "disp_timeout",
        "disp_tempo",
        "disp_setlist",
        "disp_theme",
    ];

    fn to_codes(&self) -> Result<Vec<(&'static str, i64)>, ModelError> {
        Ok(vec![
            ("disp_bright", i64::from(ranged("disp_bright", i64::from(self.brightness), 1, 10)?)),
            ("disp_timeout", self.screen_timeout.code()),
            ("disp_tempo", bool_code(self.show_tempo)),
            ("disp_setlist", bool_code(self.show_setlist)),
            ("disp_theme", self.color_theme.code()),
        ])
    }

    fn apply_code(&mut self, key: &str, code: i64) -> Result<(), ModelError> {
        match key {
            "disp_bright" => self.brightness = ranged("disp_bright", code, 1, 10)?,
            "disp_timeout" => self.screen_timeout = ScreenTimeout::from_code(code)?,
            "disp_tempo" => self.show_tempo = bool_from_code(code)?,
            "disp_setlist" => self.show_setlist = bool_from_code(code)?,
            "disp_theme" => self.color_theme = ColorTheme::from_code(code)?,
            other => return Err(ModelError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booleans_use_one_two() {
        assert_eq!(bool_code(false), 1);
        assert_eq!(bool_code(true), 2);
        assert_eq!(bool_from_code(2), Ok(true));
        assert_eq!(bool_from_code(1), Ok(false));
        assert_eq!(bool_from_code(0), Ok(false));
        assert!(bool_from_code(3).is_err());
    }

    #[test]
    fn test_code_tables() {
        assert_eq!(ClockSync::from_code(1), Ok(ClockSync::External));
        assert_eq!(ColorTheme::HighContrast.code(), 2);
        assert!(MetronomeSound::from_code(9).is_err());
    }

    #[test]
    fn test_global_codes_cover_every_key() {
        let codes = GlobalSettings::default().to_codes().unwrap();
        let keys: Vec<_> = codes.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, GlobalSettings::KEYS);
    }

    #[test]
    fn test_display_codes_cover_every_key() {
        let codes = DisplaySettings::default().to_codes().unwrap();
        let keys: Vec<_> = codes.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, DisplaySettings::KEYS);
    }

    #[test]
    fn test_apply_then_encode() {
        let mut settings = GlobalSettings::default();
        settings.apply_code("metro_en", 2).unwrap();
        settings.apply_code("clock_sync", 2).unwrap();
        settings.apply_code("midi_channel", 10).unwrap();
        assert!(settings.metronome_enabled);
        assert_eq!(settings.clock_sync, ClockSync::Auto);

        let codes = settings.to_codes().unwrap();
        assert!(codes.contains(&("metro_en", 2)));
        assert!(codes.contains(&("clock_sync", 2)));
        assert!(codes.contains(&("midi_channel", 10)));
    }

    #[test]
    fn test_apply_rejects_bad_input() {
        let mut settings = DisplaySettings::default();
        assert!(matches!(
            settings.apply_code("disp_bright", 0),
            Err(ModelError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            settings.apply_code("disp_unknown", 1),
            Err(ModelError::UnknownKey(_))
        ));
    }
}
