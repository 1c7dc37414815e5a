//! Decoded device messages and their type bytes

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Message type bytes found after the packet header (or first byte of legacy messages)
pub mod type_byte {
    pub const MICRO_FIRMWARE: u8 = 1;
    pub const DSP_FIRMWARE: u8 = 2;
    pub const PRINTF: u8 = 4;
    pub const ACK: u8 = 5;
    pub const NACK: u8 = 6;
    pub const JSON: u8 = 100;
    pub const ACK_ALT: u8 = 200;
    pub const NACK_ALT: u8 = 201;
}

/// One of the two independent firmware images on the pedal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirmwareDomain {
    Micro,
    Dsp,
}

impl FirmwareDomain {
    /// Map a type byte to its firmware domain
    pub fn from_type_byte(byte: u8) -> Option<Self> {
        match byte {
            type_byte::MICRO_FIRMWARE => Some(FirmwareDomain::Micro),
            type_byte::DSP_FIRMWARE => Some(FirmwareDomain::Dsp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FirmwareDomain::Micro => "micro",
            FirmwareDomain::Dsp => "dsp",
        }
    }
}

impl fmt::Display for FirmwareDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Firmware version announced by one domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub domain: FirmwareDomain,
    pub major: u8,
    pub minor: u8,
}

impl FirmwareVersion {
    /// Numeric `major.minor` without the domain tag
    pub fn number(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}.{}", self.domain, self.major, self.minor)
    }
}

/// Message received from the pedal
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceMessage {
    /// Firmware accepted the packet
    Ack,
    /// Firmware rejected the packet with a reason code
    Nack { code: u8 },
    /// Firmware version announcement (micro or DSP)
    Firmware(FirmwareVersion),
    /// Debug text printed by the firmware
    Printf(String),
    /// JSON response to a command
    Json(Value),
    /// Anything else, bytes as received
    Raw(Vec<u8>),
}

impl DeviceMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceMessage::Ack => "ack",
            DeviceMessage::Nack { .. } => "nack",
            DeviceMessage::Firmware(_) => "firmware",
            DeviceMessage::Printf(_) => "printf",
            DeviceMessage::Json(_) => "json",
            DeviceMessage::Raw(_) => "raw",
        }
    }
}
