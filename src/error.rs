//! Error taxonomy for the pedal link
//!
//! Transport errors abort a whole operation, application errors are per request,
//! and precondition errors signal programming mistakes that must never be swallowed.

use thiserror::Error;

/// Errors raised while building wire packets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Payload exceeds the firmware receive buffer
    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Errors raised by the MIDI bridge
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("no MIDI output ports available")]
    NoPorts,

    #[error("no MIDI input port matches output '{output}'")]
    NoMatchingInput { output: String },

    #[error("bridge is not connected")]
    NotConnected,

    #[error("MIDI error: {0}")]
    Midi(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("no response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("device rejected command (NACK code {code})")]
    Nack { code: u8 },

    #[error("device reported error: {reason}")]
    Application { reason: String },

    #[error("request superseded by a newer command")]
    Superseded,

    #[error("bridge disconnected")]
    Disconnected,
}

impl BridgeError {
    /// Whether another attempt may succeed.
    ///
    /// Timeouts and NACKs are transient. A JSON error status is the firmware's
    /// final answer, and cancellation or precondition failures end the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Timeout { .. } | BridgeError::Nack { .. })
    }

    /// Whether the error means the link itself is gone
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BridgeError::NoPorts
                | BridgeError::NoMatchingInput { .. }
                | BridgeError::NotConnected
                | BridgeError::Midi(_)
                | BridgeError::Disconnected
        )
    }

    /// Whether the error must abort an import or export run.
    ///
    /// Transport loss ends the session; an oversized payload is a caller bug.
    pub fn is_fatal(&self) -> bool {
        self.is_transport() || matches!(self, BridgeError::Codec(_))
    }
}

/// Errors raised by the domain model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid slot id '{0}'")]
    InvalidSlotId(String),

    #[error("{kind} slot {index} is out of range (capacity {capacity})")]
    SlotOutOfRange {
        kind: &'static str,
        index: usize,
        capacity: usize,
    },

    #[error("partial reference '{0}' must be expanded before encoding")]
    UnexpandedPartial(String),

    #[error("unknown {table} code {code}")]
    UnknownCode { table: &'static str, code: i64 },

    #[error("missing field '{0}' in device response")]
    MissingField(&'static str),

    #[error("{field} value {value} is out of range")]
    ValueOutOfRange { field: &'static str, value: i64 },

    #[error("unknown command type '{0}'")]
    UnknownCommandType(String),

    #[error("unknown settings key '{0}'")]
    UnknownKey(String),
}

/// Fatal errors for import and export runs.
///
/// Per-slot failures never surface here; they are collected as warnings.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
