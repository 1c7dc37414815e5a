//! Packet codec for the pedal's SysEx configuration channel
//!
//! A logical packet is `DE AD <len-1> <type> <payload> <zero padding>` with the
//! total padded to a multiple of 4. SysEx data bytes must stay below 0x80, so
//! every 4 logical bytes travel as a 5-byte word: the 4 bytes with their high
//! bit cleared, followed by a mask byte whose bit `i` records the high bit of
//! byte `i`.
//!
//! Encoding is strict (oversized payloads are a caller bug). Decoding is
//! defensive: it never panics and degrades to `Raw` or `None`.

use serde_json::Value;
use tracing::warn;

use super::message::{type_byte, DeviceMessage, FirmwareDomain, FirmwareVersion};
use crate::error::CodecError;
use crate::midi::strip_sysex_framing;

/// Packet header
pub const HEADER: [u8; 2] = [0xDE, 0xAD];

/// Largest payload the firmware accepts
pub const MAX_PAYLOAD: usize = 256;

/// Logical bytes per packed word
pub const WORD_DATA_LEN: usize = 4;

/// Wire bytes per packed word
pub const WORD_LEN: usize = 5;

/// Packed words carried by one SysEx chunk
pub const WORDS_PER_CHUNK: usize = 4;

/// Header, length and type bytes in front of the payload
const PREAMBLE_LEN: usize = 4;

/// A decoded packet before type dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: u8,
    pub payload: Vec<u8>,
}

/// Build the unpacked logical buffer for a payload
pub fn build_buffer(payload: &[u8], message_type: u8) -> Result<Vec<u8>, CodecError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(CodecError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let len_byte = payload.len().saturating_sub(1) as u8;
    let mut buffer = Vec::with_capacity(PREAMBLE_LEN + payload.len() + WORD_DATA_LEN);
    buffer.extend_from_slice(&HEADER);
    buffer.push(len_byte);
    buffer.push(message_type);
    buffer.extend_from_slice(payload);
    while buffer.len() % WORD_DATA_LEN != 0 {
        buffer.push(0);
    }
    Ok(buffer)
}

/// Pack a buffer 4 bytes at a time into 7-bit clean 5-byte words.
///
/// A trailing partial group is zero-filled.
pub fn pack_words(buffer: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(buffer.len().div_ceil(WORD_DATA_LEN) * WORD_LEN);
    for group in buffer.chunks(WORD_DATA_LEN) {
        let mut mask = 0u8;
        for i in 0..WORD_DATA_LEN {
            let byte = group.get(i).copied().unwrap_or(0);
            if byte & 0x80 != 0 {
                mask |= 1 << i;
            }
            packed.push(byte & 0x7F);
        }
        packed.push(mask);
    }
    packed
}

/// Reverse of [`pack_words`]. Incomplete trailing words are ignored.
pub fn unpack_words(data: &[u8]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(data.len() / WORD_LEN * WORD_DATA_LEN);
    for word in data.chunks_exact(WORD_LEN) {
        let mask = word[WORD_DATA_LEN];
        for (i, &byte) in word[..WORD_DATA_LEN].iter().enumerate() {
            let high = if mask & (1 << i) != 0 { 0x80 } else { 0 };
            buffer.push(byte | high);
        }
    }
    buffer
}

/// Encode a payload into SysEx-ready chunks (without `F0`/`F7` framing)
pub fn encode_payload(payload: &[u8], message_type: u8) -> Result<Vec<Vec<u8>>, CodecError> {
    let buffer = build_buffer(payload, message_type)?;
    let packed = pack_words(&buffer);
    Ok(packed
        .chunks(WORDS_PER_CHUNK * WORD_LEN)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Encode a JSON command body
pub fn encode_json(body: &Value) -> Result<Vec<Vec<u8>>, CodecError> {
    encode_payload(body.to_string().as_bytes(), type_byte::JSON)
}

/// Find the packet header in raw or packed form and split it into type and payload
pub fn decode_frame(bytes: &[u8]) -> Option<Frame> {
    let body = strip_sysex_framing(bytes);
    if body.is_empty() {
        return None;
    }
    if let Some(frame) = split_frame(body) {
        return Some(frame);
    }
    if body.len() >= WORD_LEN {
        let unpacked = unpack_words(body);
        return split_frame(&unpacked);
    }
    None
}

/// Decode a received SysEx message into a typed message
pub fn decode_message(bytes: &[u8]) -> Option<DeviceMessage> {
    if let Some(frame) = decode_frame(bytes) {
        return dispatch(frame.message_type, &frame.payload);
    }

    let body = strip_sysex_framing(bytes);
    let (&first, rest) = body.split_first()?;
    if is_known_type(first) {
        return dispatch(first, rest);
    }
    if let Some(version) = firmware_announcement(body) {
        return Some(DeviceMessage::Firmware(version));
    }
    Some(DeviceMessage::Raw(body.to_vec()))
}

fn split_frame(data: &[u8]) -> Option<Frame> {
    if data.len() < PREAMBLE_LEN || !data.starts_with(&HEADER) {
        return None;
    }
    let len_byte = data[2] as usize;
    let message_type = data[3];
    let rest = &data[PREAMBLE_LEN..];

    let declared = len_byte + 1;
    let payload = if len_byte > 0 && rest.len() >= declared {
        &rest[..declared]
    } else {
        let trimmed = trim_trailing_zeros(rest);
        if len_byte == 0 {
            &trimmed[..trimmed.len().min(1)]
        } else {
            trimmed
        }
    };

    Some(Frame {
        message_type,
        payload: payload.to_vec(),
    })
}

fn trim_trailing_zeros(data: &[u8]) -> &[u8] {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &data[..end]
}

fn is_known_type(byte: u8) -> bool {
    matches!(
        byte,
        type_byte::ACK
            | type_byte::ACK_ALT
            | type_byte::NACK
            | type_byte::NACK_ALT
            | type_byte::MICRO_FIRMWARE
            | type_byte::DSP_FIRMWARE
            | type_byte::PRINTF
            | type_byte::JSON
    )
}

/// Unframed raw bytes may still announce a firmware version in bytes 3..5
fn firmware_announcement(raw: &[u8]) -> Option<FirmwareVersion> {
    if raw.len() < 5 {
        return None;
    }
    let domain = FirmwareDomain::from_type_byte(raw[2])?;
    Some(FirmwareVersion {
        domain,
        major: raw[3],
        minor: raw[4],
    })
}

fn text_until_nul(payload: &[u8]) -> &[u8] {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    &payload[..end]
}

fn dispatch(message_type: u8, payload: &[u8]) -> Option<DeviceMessage> {
    let message = match message_type {
        type_byte::ACK | type_byte::ACK_ALT => DeviceMessage::Ack,
        type_byte::NACK | type_byte::NACK_ALT => DeviceMessage::Nack {
            code: payload.first().copied().unwrap_or(0),
        },
        type_byte::MICRO_FIRMWARE | type_byte::DSP_FIRMWARE => match (
            FirmwareDomain::from_type_byte(message_type),
            payload,
        ) {
            (Some(domain), [major, minor, ..]) => DeviceMessage::Firmware(FirmwareVersion {
                domain,
                major: *major,
                minor: *minor,
            }),
            _ => DeviceMessage::Raw(payload.to_vec()),
        },
        type_byte::PRINTF => {
            let text = String::from_utf8_lossy(text_until_nul(payload));
            DeviceMessage::Printf(text.trim_end().to_string())
        }
        type_byte::JSON => {
            let text = text_until_nul(payload);
            match serde_json::from_slice::<Value>(text) {
                Ok(value) => DeviceMessage::Json(value),
                Err(e) => {
                    warn!(
                        "Dropping malformed JSON packet ({} bytes): {}",
                        text.len(),
                        e
                    );
                    return None;
                }
            }
        }
        _ => DeviceMessage::Raw(payload.to_vec()),
    };
    Some(message)
}
