//! A simulated pedal answering the JSON command set from in-memory slots

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use pedal_link::model::{
    DisplaySettings, GlobalSettings, SettingsRecord, SlotKind, DEFAULT_TEMPO, JACK_COUNT,
    MACRO_COMMAND_CAPACITY, SETLIST_SECTION_SIZE,
};
use pedal_link::{BridgeError, DeviceClient};
use pedal_link::protocol::CommandResponse;

#[derive(Debug, Clone, PartialEq)]
pub struct SimSong {
    pub name: String,
    pub tempo: i64,
    pub time_sig: i64,
    pub macro_slot: i64,
}

impl SimSong {
    pub fn untouched(slot: usize) -> Self {
        Self {
            name: SlotKind::Song.default_name(slot),
            tempo: i64::from(DEFAULT_TEMPO),
            time_sig: 0,
            macro_slot: -1,
        }
    }

    pub fn named(name: &str, tempo: i64) -> Self {
        Self {
            name: name.to_string(),
            tempo,
            time_sig: 0,
            macro_slot: -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimMacro {
    pub name: String,
    pub commands: Vec<Map<String, Value>>,
}

impl SimMacro {
    pub fn untouched(slot: usize) -> Self {
        Self {
            name: SlotKind::Macro.default_name(slot),
            commands: vec![empty_command(); MACRO_COMMAND_CAPACITY],
        }
    }

    /// A macro whose first command slots hold `commands`
    pub fn with_commands(name: &str, commands: Vec<Value>) -> Self {
        let mut record = Self::untouched(0);
        record.name = name.to_string();
        for (slot, command) in commands.into_iter().enumerate() {
            if let Value::Object(fields) = command {
                record.commands[slot] = fields;
            }
        }
        record
    }

    fn active_map(&self) -> Vec<i64> {
        self.commands
            .iter()
            .map(|c| i64::from(c.get("type").and_then(Value::as_str) != Some("-")))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimSetlist {
    pub name: String,
    pub description: String,
    pub songs: Vec<usize>,
}

impl SimSetlist {
    pub fn untouched(slot: usize) -> Self {
        Self {
            name: SlotKind::Setlist.default_name(slot),
            description: String::new(),
            songs: Vec::new(),
        }
    }
}

/// Everything the simulated firmware stores
#[derive(Debug, Clone, PartialEq)]
pub struct PedalState {
    pub firmware: String,
    /// Populated song slots; queries past the end are rejected
    pub songs: Vec<SimSong>,
    pub macros: Vec<SimMacro>,
    pub setlists: Vec<SimSetlist>,
    pub globals: Map<String, Value>,
    pub jacks: Vec<Map<String, Value>>,
}

impl PedalState {
    pub fn new(firmware: &str, songs: usize, macros: usize, setlists: usize) -> Self {
        let mut globals = Map::new();
        let codes = GlobalSettings::default()
            .to_codes()
            .into_iter()
            .chain(DisplaySettings::default().to_codes())
            .flatten();
        for (key, code) in codes {
            globals.insert(key.to_string(), json!(code));
        }
        Self {
            firmware: firmware.to_string(),
            songs: (0..songs).map(SimSong::untouched).collect(),
            macros: (0..macros).map(SimMacro::untouched).collect(),
            setlists: (0..setlists).map(SimSetlist::untouched).collect(),
            globals,
            jacks: (0..JACK_COUNT)
                .map(|jack| {
                    let mut values = Map::new();
                    values.insert("mode".to_string(), json!(0));
                    values.insert("label".to_string(), json!(format!("Jack {}", jack + 1)));
                    values
                })
                .collect(),
        }
    }

    fn sectioned(&self) -> bool {
        let fields: Vec<u64> = self.firmware.split('.').filter_map(|f| f.parse().ok()).collect();
        fields >= vec![1, 0, 2]
    }
}

pub struct SimulatedPedal {
    state: Mutex<PedalState>,
    log: Mutex<Vec<Value>>,
    /// Fail with a disconnect once this many commands were answered
    disconnect_after: Mutex<Option<usize>>,
}

impl SimulatedPedal {
    pub fn new(state: PedalState) -> Self {
        Self {
            state: Mutex::new(state),
            log: Mutex::new(Vec::new()),
            disconnect_after: Mutex::new(None),
        }
    }

    pub fn state(&self) -> PedalState {
        self.state.lock().clone()
    }

    pub fn log(&self) -> Vec<Value> {
        self.log.lock().clone()
    }

    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    /// Commands named `cmd` that were sent, in order
    pub fn sent(&self, cmd: &str) -> Vec<Value> {
        self.log
            .lock()
            .iter()
            .filter(|body| body["cmd"] == cmd)
            .cloned()
            .collect()
    }

    pub fn disconnect_after(&self, commands: usize) {
        *self.disconnect_after.lock() = Some(commands);
    }

    fn answer(&self, body: &Value) -> Result<Value, String> {
        let mut state = self.state.lock();
        let cmd = body["cmd"].as_str().ok_or("missing cmd")?;
        let index = |field: &str| -> Result<usize, String> {
            body[field]
                .as_u64()
                .map(|v| v as usize)
                .ok_or_else(|| format!("missing {}", field))
        };
        let ok = |fields: Value| {
            let mut reply = json!({"status": "success"});
            if let (Value::Object(target), Value::Object(extra)) = (&mut reply, fields) {
                target.extend(extra);
            }
            reply
        };

        match cmd {
            "get_fw_version" => Ok(ok(json!({"value": state.firmware}))),

            "get_song_details" => {
                let song = state.songs.get(index("song")?).ok_or("invalid song")?;
                Ok(ok(json!({
                    "name": song.name,
                    "tempo": song.tempo,
                    "time_sig": song.time_sig,
                    "macro": song.macro_slot,
                })))
            }
            "set_param_value" => {
                let song = state.songs.get_mut(index("song")?).ok_or("invalid song")?;
                let value = &body["value"];
                match body["param"].as_str() {
                    Some("name") => song.name = value.as_str().unwrap_or_default().to_string(),
                    Some("tempo") => song.tempo = value.as_i64().ok_or("bad tempo")?,
                    Some("time_sig") => song.time_sig = value.as_i64().ok_or("bad time_sig")?,
                    Some("macro") => song.macro_slot = value.as_i64().ok_or("bad macro")?,
                    _ => return Err("unknown param".to_string()),
                }
                Ok(ok(json!({})))
            }

            "get_macro_name" => {
                let record = state.macros.get(index("macro")?).ok_or("invalid macro")?;
                Ok(ok(json!({"value": record.name})))
            }
            "set_macro_name" => {
                let record = state.macros.get_mut(index("macro")?).ok_or("invalid macro")?;
                record.name = body["value"].as_str().unwrap_or_default().to_string();
                Ok(ok(json!({})))
            }
            "get_macro_map" => {
                let record = state.macros.get(index("macro")?).ok_or("invalid macro")?;
                Ok(ok(json!({"value": record.active_map()})))
            }
            "get_macro_cmd" => {
                let record = state.macros.get(index("macro")?).ok_or("invalid macro")?;
                let command = record.commands.get(index("slot")?).ok_or("invalid slot")?;
                Ok(ok(Value::Object(command.clone())))
            }
            "set_macro_cmd" => {
                let slot = index("slot")?;
                let record = state.macros.get_mut(index("macro")?).ok_or("invalid macro")?;
                let mut fields = body.as_object().cloned().unwrap_or_default();
                for key in ["cmd", "macro", "slot"] {
                    fields.remove(key);
                }
                *record.commands.get_mut(slot).ok_or("invalid slot")? = fields;
                Ok(ok(json!({})))
            }
            "clear_macro" => {
                let slot = index("macro")?;
                let record = state.macros.get_mut(slot).ok_or("invalid macro")?;
                *record = SimMacro::untouched(slot);
                Ok(ok(json!({})))
            }

            "get_setlist_name" => {
                let setlist = state.setlists.get(index("setlist")?).ok_or("invalid setlist")?;
                Ok(ok(json!({"value": setlist.name, "description": setlist.description})))
            }
            "set_setlist_name" => {
                let setlist = state.setlists.get_mut(index("setlist")?).ok_or("invalid setlist")?;
                setlist.name = body["value"].as_str().unwrap_or_default().to_string();
                setlist.description = body["description"].as_str().unwrap_or_default().to_string();
                Ok(ok(json!({})))
            }
            "get_setlist_songs_sect" if state.sectioned() => {
                let section = index("section")?;
                let setlist = state.setlists.get(index("setlist")?).ok_or("invalid setlist")?;
                let start = (section * SETLIST_SECTION_SIZE).min(setlist.songs.len());
                let end = (start + SETLIST_SECTION_SIZE).min(setlist.songs.len());
                Ok(ok(json!({"value": setlist.songs[start..end]})))
            }
            "set_setlist_songs_sect" if state.sectioned() => {
                let section = index("section")?;
                let setlist = state.setlists.get_mut(index("setlist")?).ok_or("invalid setlist")?;
                setlist.songs.truncate(section * SETLIST_SECTION_SIZE);
                setlist.songs.extend(songs_of(&body["value"]));
                Ok(ok(json!({})))
            }
            "get_setlist_songs" => {
                let setlist = state.setlists.get(index("setlist")?).ok_or("invalid setlist")?;
                Ok(ok(json!({"value": setlist.songs})))
            }
            "set_setlist_songs" => {
                let setlist = state.setlists.get_mut(index("setlist")?).ok_or("invalid setlist")?;
                setlist.songs = songs_of(&body["value"]);
                Ok(ok(json!({})))
            }

            "get_global_var" => {
                let key = body["key"].as_str().ok_or("missing key")?;
                let value = state.globals.get(key).ok_or("unknown key")?;
                Ok(ok(json!({"value": value})))
            }
            "set_global_var" => {
                let key = body["key"].as_str().ok_or("missing key")?;
                state.globals.insert(key.to_string(), body["value"].clone());
                Ok(ok(json!({})))
            }

            "get_jack_cfg" => {
                let values = state.jacks.get(index("jack")?).ok_or("invalid jack")?;
                Ok(ok(json!({"value": values})))
            }
            "set_jack_cfg" => {
                let key = body["key"].as_str().ok_or("missing key")?.to_string();
                let values = state.jacks.get_mut(index("jack")?).ok_or("invalid jack")?;
                values.insert(key, body["value"].clone());
                Ok(ok(json!({})))
            }

            other => Err(format!("unknown command {}", other)),
        }
    }
}

#[async_trait]
impl DeviceClient for SimulatedPedal {
    async fn send_command(&self, body: Value) -> Result<CommandResponse, BridgeError> {
        {
            let mut limit = self.disconnect_after.lock();
            if let Some(remaining) = limit.as_mut() {
                if *remaining == 0 {
                    return Err(BridgeError::Disconnected);
                }
                *remaining -= 1;
            }
        }
        self.log.lock().push(body.clone());
        self.answer(&body)
            .map(CommandResponse::from_value)
            .map_err(|reason| BridgeError::Application { reason })
    }
}

pub fn empty_command() -> Map<String, Value> {
    match json!({"type": "-", "channel": 1, "num": 0, "val": 0}) {
        Value::Object(fields) => fields,
        _ => Map::new(),
    }
}

fn songs_of(value: &Value) -> Vec<usize> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(Value::as_u64).map(|v| v as usize).collect())
        .unwrap_or_default()
}
