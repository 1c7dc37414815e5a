//! Reassembly of packets split across several SysEx messages
//!
//! The pedal sends long responses as consecutive `F0 00 <words> F7` chunks.
//! A chunk whose first word unpacks to the packet header starts a new packet;
//! following chunks are appended until the declared length is covered or a
//! short chunk arrives. Anything else passes straight through to the decoder.

use tracing::{debug, warn};

use crate::midi::sysex_body;
use crate::protocol::codec::{unpack_words, HEADER, MAX_PAYLOAD, WORDS_PER_CHUNK, WORD_DATA_LEN, WORD_LEN};

const CHUNK_LEN: usize = WORDS_PER_CHUNK * WORD_LEN;

/// Largest packed packet: preamble plus maximum payload, padded to whole words
const MAX_PACKED_LEN: usize = (MAX_PAYLOAD + WORD_DATA_LEN).div_ceil(WORD_DATA_LEN) * WORD_LEN;

#[derive(Debug, Default)]
pub struct ChunkAssembler {
    packed: Vec<u8>,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one received MIDI message; returns bytes ready for decoding
    pub fn push(&mut self, message: &[u8]) -> Option<Vec<u8>> {
        let body = sysex_body(message);

        if starts_packed_frame(body) {
            if !self.packed.is_empty() {
                debug!("Discarding incomplete packet ({} bytes)", self.packed.len());
            }
            self.packed.clear();
            self.packed.extend_from_slice(body);
        } else if !self.packed.is_empty() {
            self.packed.extend_from_slice(body);
        } else {
            return Some(message.to_vec());
        }

        if self.is_complete(body.len()) {
            return Some(std::mem::take(&mut self.packed));
        }
        if self.packed.len() > MAX_PACKED_LEN {
            warn!(
                "Dropping oversized packet ({} packed bytes)",
                self.packed.len()
            );
            self.packed.clear();
        }
        None
    }

    pub fn is_idle(&self) -> bool {
        self.packed.is_empty()
    }

    pub fn reset(&mut self) {
        self.packed.clear();
    }

    fn is_complete(&self, last_chunk_len: usize) -> bool {
        if last_chunk_len < CHUNK_LEN {
            return true;
        }
        let first = unpack_words(&self.packed[..WORD_LEN]);
        let len_byte = first[2] as usize;
        // len bytes 0 and 1 both fit in the first chunk
        let declared = if len_byte == 0 { 0 } else { len_byte + 1 };
        let needed_words = (WORD_DATA_LEN + declared).div_ceil(WORD_DATA_LEN);
        self.packed.len() / WORD_LEN >= needed_words
    }
}

/// Packed data is 7-bit clean and its first word unpacks to the header
fn starts_packed_frame(body: &[u8]) -> bool {
    body.len() >= WORD_LEN
        && body[..WORD_LEN].iter().all(|b| b & 0x80 == 0)
        && unpack_words(&body[..WORD_LEN]).starts_with(&HEADER)
}
