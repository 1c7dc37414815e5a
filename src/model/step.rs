//! Macro steps
//!
//! A step is a closed variant: Control Change, Program Change, a custom byte
//! string, or a reference to a partial. Each step carries an identity used by
//! editors for diffing; it is never compared when matching commands and never
//! sent to the pedal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ModelError;
use crate::midi::{control_change, format_hex, program_change};
use crate::protocol::FirmwareCommand;

static NEXT_STEP_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a step within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub u64);

impl StepId {
    /// Allocate a process-unique id
    pub fn next() -> Self {
        StepId(NEXT_STEP_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Bank select sent ahead of a Program Change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BankSelect {
    pub msb: u8,
    pub lsb: u8,
}

/// What a step does
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepKind {
    /// Control Change; channel is 1-16
    Cc { channel: u8, controller: u8, value: u8 },
    /// Program Change with optional bank select
    Pc {
        channel: u8,
        program: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bank: Option<BankSelect>,
    },
    /// Raw bytes (SysEx or anything the firmware has no command for)
    Custom {
        #[serde(with = "serde_bytes")]
        bytes: Vec<u8>,
    },
    /// Reference to a partial in the catalog; `name` is a display cache
    Partial { partial_id: String, name: String },
}

/// One macro step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiStep {
    #[serde(default = "StepId::next")]
    pub id: StepId,
    /// Delay before the next step, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u32>,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl MidiStep {
    pub fn new(kind: StepKind) -> Self {
        Self {
            id: StepId::next(),
            delay_ms: None,
            kind,
        }
    }

    pub fn cc(channel: u8, controller: u8, value: u8) -> Self {
        Self::new(StepKind::Cc {
            channel,
            controller,
            value,
        })
    }

    pub fn pc(channel: u8, program: u8) -> Self {
        Self::new(StepKind::Pc {
            channel,
            program,
            bank: None,
        })
    }

    pub fn pc_with_bank(channel: u8, program: u8, msb: u8, lsb: u8) -> Self {
        Self::new(StepKind::Pc {
            channel,
            program,
            bank: Some(BankSelect { msb, lsb }),
        })
    }

    pub fn custom(bytes: Vec<u8>) -> Self {
        Self::new(StepKind::Custom { bytes })
    }

    pub fn partial_ref(partial_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(StepKind::Partial {
            partial_id: partial_id.into(),
            name: name.into(),
        })
    }

    pub fn with_delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Same step under a fresh identity
    pub fn fresh_copy(&self) -> Self {
        Self {
            id: StepId::next(),
            ..self.clone()
        }
    }

    pub fn is_partial_ref(&self) -> bool {
        matches!(self.kind, StepKind::Partial { .. })
    }

    /// Structural equality over the command itself.
    ///
    /// Identity and delay are ignored: two CC steps with the same channel,
    /// controller and value are interchangeable.
    pub fn same_command(&self, other: &MidiStep) -> bool {
        self.kind == other.kind
    }

    /// Bytes this step puts on the MIDI wire; `None` for partial references
    pub fn wire_bytes(&self) -> Option<Vec<u8>> {
        match &self.kind {
            StepKind::Cc {
                channel,
                controller,
                value,
            } => Some(control_change(*channel, *controller, *value).to_vec()),
            StepKind::Pc {
                channel,
                program,
                bank,
            } => {
                let mut bytes = Vec::with_capacity(8);
                if let Some(bank) = bank {
                    bytes.extend_from_slice(&control_change(*channel, 0, bank.msb));
                    bytes.extend_from_slice(&control_change(*channel, 32, bank.lsb));
                }
                bytes.extend_from_slice(&program_change(*channel, *program));
                Some(bytes)
            }
            StepKind::Custom { bytes } => Some(bytes.clone()),
            StepKind::Partial { .. } => None,
        }
    }

    /// Encode as a firmware macro command.
    ///
    /// Custom steps have no firmware command and yield `Ok(None)`. Partial
    /// references must be expanded first; encoding one is a caller bug.
    pub fn to_firmware_command(&self) -> Result<Option<FirmwareCommand>, ModelError> {
        let command = match &self.kind {
            StepKind::Cc {
                channel,
                controller,
                value,
            } => FirmwareCommand {
                kind: "CC".to_string(),
                channel: *channel,
                num: *controller,
                val: *value,
                msb: None,
                lsb: None,
                delay: self.delay_ms,
            },
            StepKind::Pc {
                channel,
                program,
                bank,
            } => FirmwareCommand {
                kind: "PC".to_string(),
                channel: *channel,
                num: *program,
                val: 0,
                msb: bank.map(|b| b.msb),
                lsb: bank.map(|b| b.lsb),
                delay: self.delay_ms,
            },
            StepKind::Custom { .. } => return Ok(None),
            StepKind::Partial { partial_id, .. } => {
                return Err(ModelError::UnexpandedPartial(partial_id.clone()))
            }
        };
        Ok(Some(command))
    }

    /// Decode a firmware macro command; empty sentinels yield `Ok(None)`
    pub fn from_firmware_command(command: &FirmwareCommand) -> Result<Option<Self>, ModelError> {
        if command.is_empty() {
            return Ok(None);
        }
        let channel = checked("channel", command.channel, 1..=16)?;
        let num = checked("num", command.num, 0..=127)?;
        let kind = match command.kind.to_ascii_uppercase().as_str() {
            "CC" => StepKind::Cc {
                channel,
                controller: num,
                value: checked("val", command.val, 0..=127)?,
            },
            "PC" => StepKind::Pc {
                channel,
                program: num,
                bank: match (command.msb, command.lsb) {
                    (None, None) => None,
                    (msb, lsb) => Some(BankSelect {
                        msb: msb.unwrap_or(0),
                        lsb: lsb.unwrap_or(0),
                    }),
                },
            },
            _ => return Err(ModelError::UnknownCommandType(command.kind.clone())),
        };
        Ok(Some(Self {
            id: StepId::next(),
            delay_ms: command.delay.filter(|d| *d > 0),
            kind,
        }))
    }
}

fn checked(field: &'static str, value: u8, range: RangeInclusive<u8>) -> Result<u8, ModelError> {
    if !range.contains(&value) {
        return Err(ModelError::ValueOutOfRange {
            field,
            value: i64::from(value),
        });
    }
    Ok(value)
}

impl fmt::Display for MidiStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StepKind::Cc {
                channel,
                controller,
                value,
            } => write!(f, "CC ch:{} cc:{} v:{}", channel, controller, value)?,
            StepKind::Pc {
                channel,
                program,
                bank: Some(bank),
            } => write!(
                f,
                "PC ch:{} p:{} bank:{}/{}",
                channel, program, bank.msb, bank.lsb
            )?,
            StepKind::Pc {
                channel, program, ..
            } => write!(f, "PC ch:{} p:{}", channel, program)?,
            StepKind::Custom { bytes } => write!(f, "Custom [{}]", format_hex(bytes))?,
            StepKind::Partial { name, .. } => write!(f, "Partial '{}'", name)?,
        }
        if let Some(delay) = self.delay_ms {
            write!(f, " +{}ms", delay)?;
        }
        Ok(())
    }
}
