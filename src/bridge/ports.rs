//! MIDI port discovery and selection
//!
//! Output precedence: exact preferred name, manufacturer substring, name hint
//! substring, then the first port. Inputs follow the same order but prefer the
//! port paired with the chosen output and never fall back to an arbitrary port.

use midir::{MidiInput, MidiOutput};

use crate::error::BridgeError;

/// Port selection hints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortPreferences {
    pub preferred: Option<String>,
    pub manufacturer: String,
    pub name_hint: String,
}

/// Information about a MIDI port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
    pub is_virtual: bool,
}

impl PortInfo {
    fn new(index: usize, name: String) -> Self {
        let is_virtual =
            name.contains("Virtual") || name.contains("loopMIDI") || name.contains("IAC");
        Self {
            index,
            name,
            is_virtual,
        }
    }
}

/// Discover input and output ports
pub fn discover_all_ports() -> Result<(Vec<PortInfo>, Vec<PortInfo>), BridgeError> {
    Ok((discover_input_ports()?, discover_output_ports()?))
}

pub fn discover_input_ports() -> Result<Vec<PortInfo>, BridgeError> {
    let midi_in = MidiInput::new("pedal-link-discovery").map_err(midi_error)?;
    Ok(midi_in
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| midi_in.port_name(port).ok().map(|name| PortInfo::new(index, name)))
        .collect())
}

pub fn discover_output_ports() -> Result<Vec<PortInfo>, BridgeError> {
    let midi_out = MidiOutput::new("pedal-link-discovery").map_err(midi_error)?;
    Ok(midi_out
        .ports()
        .iter()
        .enumerate()
        .filter_map(|(index, port)| midi_out.port_name(port).ok().map(|name| PortInfo::new(index, name)))
        .collect())
}

pub(crate) fn midi_error(err: impl std::fmt::Display) -> BridgeError {
    BridgeError::Midi(err.to_string())
}

/// Pick the output port; returns an index into `names`
pub fn select_output(names: &[String], prefs: &PortPreferences) -> Result<usize, BridgeError> {
    if names.is_empty() {
        return Err(BridgeError::NoPorts);
    }
    Ok(exact(names, prefs.preferred.as_deref())
        .or_else(|| containing(names, &prefs.manufacturer))
        .or_else(|| containing(names, &prefs.name_hint))
        .unwrap_or(0))
}

/// Pick the input port that belongs with `output`; returns an index into `names`
pub fn select_input(
    names: &[String],
    output: &str,
    prefs: &PortPreferences,
) -> Result<usize, BridgeError> {
    let output_key = pair_key(output);
    exact(names, prefs.preferred.as_deref())
        .or_else(|| names.iter().position(|n| pair_key(n) == output_key))
        .or_else(|| containing(names, &prefs.manufacturer))
        .or_else(|| containing(names, &prefs.name_hint))
        .ok_or_else(|| BridgeError::NoMatchingInput {
            output: output.to_string(),
        })
}

fn exact(names: &[String], wanted: Option<&str>) -> Option<usize> {
    let wanted = wanted?;
    names.iter().position(|n| n == wanted)
}

fn containing(names: &[String], needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let needle = needle.to_lowercase();
    names.iter().position(|n| n.to_lowercase().contains(&needle))
}

/// Port name with direction words removed, so "Pedal Out" pairs with "Pedal In"
fn pair_key(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .filter(|word| !matches!(*word, "in" | "out" | "input" | "output"))
        .collect::<Vec<_>>()
        .join(" ")
}
