//! JSON command envelopes understood by the pedal firmware
//!
//! Requests are `{"cmd": <name>, ...fields}`. Responses carry
//! `{"status": "success"|"error", "reason"?, "value"?, ...}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Firmware command names
pub mod names {
    pub const GET_FW_VERSION: &str = "get_fw_version";
    pub const GET_SONG_DETAILS: &str = "get_song_details";
    pub const SET_PARAM_VALUE: &str = "set_param_value";
    pub const GET_SETLIST_NAME: &str = "get_setlist_name";
    pub const SET_SETLIST_NAME: &str = "set_setlist_name";
    pub const GET_SETLIST_SONGS_SECT: &str = "get_setlist_songs_sect";
    pub const GET_SETLIST_SONGS: &str = "get_setlist_songs";
    pub const SET_SETLIST_SONGS_SECT: &str = "set_setlist_songs_sect";
    pub const SET_SETLIST_SONGS: &str = "set_setlist_songs";
    pub const GET_MACRO_MAP: &str = "get_macro_map";
    pub const GET_MACRO_NAME: &str = "get_macro_name";
    pub const SET_MACRO_NAME: &str = "set_macro_name";
    pub const GET_MACRO_CMD: &str = "get_macro_cmd";
    pub const SET_MACRO_CMD: &str = "set_macro_cmd";
    pub const CLEAR_MACRO: &str = "clear_macro";
    pub const GET_GLOBAL_VAR: &str = "get_global_var";
    pub const SET_GLOBAL_VAR: &str = "set_global_var";
    pub const GET_JACK_CFG: &str = "get_jack_cfg";
    pub const SET_JACK_CFG: &str = "set_jack_cfg";
}

/// Build a command envelope from a name and a list of fields
pub fn command(name: &str, fields: &[(&str, Value)]) -> Value {
    let mut body = Map::new();
    body.insert("cmd".to_string(), Value::String(name.to_string()));
    for (key, value) in fields {
        body.insert((*key).to_string(), value.clone());
    }
    Value::Object(body)
}

pub fn get_fw_version() -> Value {
    command(names::GET_FW_VERSION, &[])
}

pub fn get_song_details(song: usize) -> Value {
    command(names::GET_SONG_DETAILS, &[("song", json!(song))])
}

pub fn set_param_value(song: usize, param: &str, value: Value) -> Value {
    command(
        names::SET_PARAM_VALUE,
        &[("song", json!(song)), ("param", json!(param)), ("value", value)],
    )
}

pub fn get_setlist_name(setlist: usize) -> Value {
    command(names::GET_SETLIST_NAME, &[("setlist", json!(setlist))])
}

pub fn set_setlist_name(setlist: usize, name: &str, description: Option<&str>) -> Value {
    let mut fields = vec![("setlist", json!(setlist)), ("value", json!(name))];
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        fields.push(("description", json!(description)));
    }
    command(names::SET_SETLIST_NAME, &fields)
}

pub fn get_setlist_songs_sect(setlist: usize, section: usize) -> Value {
    command(
        names::GET_SETLIST_SONGS_SECT,
        &[("setlist", json!(setlist)), ("section", json!(section))],
    )
}

pub fn get_setlist_songs(setlist: usize) -> Value {
    command(names::GET_SETLIST_SONGS, &[("setlist", json!(setlist))])
}

pub fn set_setlist_songs_sect(setlist: usize, section: usize, songs: &[usize]) -> Value {
    command(
        names::SET_SETLIST_SONGS_SECT,
        &[
            ("setlist", json!(setlist)),
            ("section", json!(section)),
            ("value", json!(songs)),
        ],
    )
}

pub fn set_setlist_songs(setlist: usize, songs: &[usize]) -> Value {
    command(
        names::SET_SETLIST_SONGS,
        &[("setlist", json!(setlist)), ("value", json!(songs))],
    )
}

pub fn get_macro_name(slot: usize) -> Value {
    command(names::GET_MACRO_NAME, &[("macro", json!(slot))])
}

pub fn set_macro_name(slot: usize, name: &str) -> Value {
    command(
        names::SET_MACRO_NAME,
        &[("macro", json!(slot)), ("value", json!(name))],
    )
}

pub fn get_macro_map(slot: usize) -> Value {
    command(names::GET_MACRO_MAP, &[("macro", json!(slot))])
}

pub fn get_macro_cmd(slot: usize, index: usize) -> Value {
    command(
        names::GET_MACRO_CMD,
        &[("macro", json!(slot)), ("slot", json!(index))],
    )
}

/// `set_macro_cmd`: the firmware command fields are merged into the envelope
pub fn set_macro_cmd(slot: usize, index: usize, fields: &FirmwareCommand) -> Value {
    let mut body = command(
        names::SET_MACRO_CMD,
        &[("macro", json!(slot)), ("slot", json!(index))],
    );
    if let (Value::Object(target), Ok(Value::Object(extra))) =
        (&mut body, serde_json::to_value(fields))
    {
        target.extend(extra);
    }
    body
}

pub fn clear_macro(slot: usize) -> Value {
    command(names::CLEAR_MACRO, &[("macro", json!(slot))])
}

pub fn get_global_var(key: &str) -> Value {
    command(names::GET_GLOBAL_VAR, &[("key", json!(key))])
}

pub fn set_global_var(key: &str, value: i64) -> Value {
    command(
        names::SET_GLOBAL_VAR,
        &[("key", json!(key)), ("value", json!(value))],
    )
}

pub fn get_jack_cfg(jack: usize) -> Value {
    command(names::GET_JACK_CFG, &[("jack", json!(jack))])
}

pub fn set_jack_cfg(jack: usize, key: &str, value: Value) -> Value {
    command(
        names::SET_JACK_CFG,
        &[("jack", json!(jack)), ("key", json!(key)), ("value", value)],
    )
}

/// One macro command slot as the firmware stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareCommand {
    /// `CC`, `PC`, or `-` for an empty slot
    #[serde(rename = "type")]
    pub kind: String,
    pub channel: u8,
    pub num: u8,
    pub val: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msb: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsb: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u32>,
}

impl FirmwareCommand {
    pub const EMPTY_KIND: &'static str = "-";

    /// Sentinel the firmware needs in every vacant command slot
    pub fn empty() -> Self {
        Self {
            kind: Self::EMPTY_KIND.to_string(),
            channel: 1,
            num: 0,
            val: 0,
            msb: None,
            lsb: None,
            delay: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind == Self::EMPTY_KIND
    }
}

/// Response status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Typed view of a JSON response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CommandResponse {
    /// Parse a JSON payload; non-objects are wrapped as a bare value
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<CommandResponse>(value.clone()) {
            Ok(response) => response,
            Err(_) => Self {
                status: None,
                reason: None,
                value: Some(value),
                extra: Map::new(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Some(Status::Success)
    }

    /// The application-level error reason, if the firmware reported one
    pub fn error_reason(&self) -> Option<String> {
        match self.status {
            Some(Status::Error) => Some(
                self.reason
                    .clone()
                    .unwrap_or_else(|| "unspecified error".to_string()),
            ),
            _ => None,
        }
    }

    /// Look up a field, checking `value` objects before top-level extras
    pub fn field(&self, key: &str) -> Option<&Value> {
        if let Some(Value::Object(map)) = &self.value {
            if let Some(v) = map.get(key) {
                return Some(v);
            }
        }
        self.extra.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    pub fn int_field(&self, key: &str) -> Option<i64> {
        self.field(key).and_then(as_int)
    }

    pub fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }

    pub fn value_int(&self) -> Option<i64> {
        self.value.as_ref().and_then(as_int)
    }

    /// `value` as a list of integers
    pub fn value_ints(&self) -> Option<Vec<i64>> {
        match &self.value {
            Some(Value::Array(items)) => Some(items.iter().filter_map(as_int).collect()),
            _ => None,
        }
    }
}

/// Integers may arrive as numbers, booleans, or numeric strings
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = get_macro_cmd(3, 7);
        assert_eq!(body, json!({"cmd": "get_macro_cmd", "macro": 3, "slot": 7}));
    }

    #[test]
    fn test_set_macro_cmd_merges_fields() {
        let body = set_macro_cmd(2, 0, &FirmwareCommand::empty());
        assert_eq!(
            body,
            json!({"cmd": "set_macro_cmd", "macro": 2, "slot": 0,
                   "type": "-", "channel": 1, "num": 0, "val": 0})
        );
    }

    #[test]
    fn test_setlist_description_is_optional() {
        assert_eq!(
            set_setlist_name(1, "Friday", None),
            json!({"cmd": "set_setlist_name", "setlist": 1, "value": "Friday"})
        );
        assert_eq!(
            set_setlist_name(1, "Friday", Some("Club set"))["description"],
            "Club set"
        );
        assert!(set_setlist_name(1, "Friday", Some("")).get("description").is_none());
    }

    #[test]
    fn test_response_status() {
        let ok = CommandResponse::from_value(json!({"status": "success", "value": "Intro"}));
        assert!(ok.is_success());
        assert_eq!(ok.value_str(), Some("Intro"));
        assert_eq!(ok.error_reason(), None);

        let err = CommandResponse::from_value(json!({"status": "error", "reason": "bad slot"}));
        assert!(!err.is_success());
        assert_eq!(err.error_reason().as_deref(), Some("bad slot"));
    }

    #[test]
    fn test_field_lookup_prefers_value_object() {
        let resp = CommandResponse::from_value(json!({
            "status": "success",
            "value": {"tempo": 98},
            "tempo": 120,
            "name": "Encore"
        }));
        assert_eq!(resp.int_field("tempo"), Some(98));
        assert_eq!(resp.str_field("name"), Some("Encore"));
    }

    #[test]
    fn test_loose_integers() {
        let resp = CommandResponse::from_value(json!({"status": "success", "value": [1, "2", true, 4.0]}));
        assert_eq!(resp.value_ints(), Some(vec![1, 2, 1, 4]));
    }

    #[test]
    fn test_unknown_status_is_not_success() {
        let resp = CommandResponse::from_value(json!({"status": "pending"}));
        assert!(!resp.is_success());
    }
}
