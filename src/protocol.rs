//! Pedal configuration protocol
//!
//! Packet codec, decoded message types, and the JSON command envelopes that
//! ride on top of them.

pub mod codec;
pub mod command;
pub mod message;

pub use codec::{decode_frame, decode_message, encode_json, encode_payload, Frame, MAX_PAYLOAD};
pub use command::{CommandResponse, FirmwareCommand, Status};
pub use message::{DeviceMessage, FirmwareDomain, FirmwareVersion};
