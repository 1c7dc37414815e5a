//! MIDI utilities
//!
//! SysEx framing for the pedal's private configuration channel, plus the
//! channel-message encodings used when describing macro steps in logs.

/// Start of System Exclusive
pub const SYSEX_START: u8 = 0xF0;

/// End of System Exclusive
pub const SYSEX_END: u8 = 0xF7;

/// Manufacturer id byte the pedal expects right after `F0`
pub const MANUFACTURER_ID: u8 = 0x00;

/// Wrap packed words into a complete SysEx message: `F0 00 <data> F7`
pub fn wrap_sysex(data: &[u8]) -> Vec<u8> {
    let mut msg = Vec::with_capacity(data.len() + 3);
    msg.push(SYSEX_START);
    msg.push(MANUFACTURER_ID);
    msg.extend_from_slice(data);
    msg.push(SYSEX_END);
    msg
}

/// Strip SysEx start/end bytes and any leading zero bytes.
///
/// The leading-zero pass also removes the manufacturer id.
pub fn strip_sysex_framing(data: &[u8]) -> &[u8] {
    let mut body = data;
    if let Some((&SYSEX_START, rest)) = body.split_first() {
        body = rest;
    }
    if let Some((&SYSEX_END, rest)) = body.split_last() {
        body = rest;
    }
    let first = body.iter().position(|&b| b != 0).unwrap_or(body.len());
    &body[first..]
}

/// Strip `F0`, one manufacturer byte and `F7`, leaving packed data intact.
///
/// Continuation chunks may legitimately start with zero bytes, so this is the
/// form used when stitching multi-chunk messages together.
pub fn sysex_body(data: &[u8]) -> &[u8] {
    match data {
        [SYSEX_START, MANUFACTURER_ID, body @ .., SYSEX_END] => body,
        [SYSEX_START, MANUFACTURER_ID, body @ ..] => body,
        [SYSEX_START, body @ .., SYSEX_END] => body,
        _ => data,
    }
}

/// Control Change bytes; `channel` is 1-based (1-16)
pub fn control_change(channel: u8, controller: u8, value: u8) -> [u8; 3] {
    [
        0xB0 | (channel.saturating_sub(1) & 0x0F),
        controller & 0x7F,
        value & 0x7F,
    ]
}

/// Program Change bytes; `channel` is 1-based (1-16)
pub fn program_change(channel: u8, program: u8) -> [u8; 2] {
    [0xC0 | (channel.saturating_sub(1) & 0x0F), program & 0x7F]
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
