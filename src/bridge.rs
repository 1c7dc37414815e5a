//! MIDI bridge to the pedal
//!
//! Owns the MIDI connections, frames outgoing commands into SysEx chunks and
//! routes decoded replies to the single pending request. Firmware version
//! announcements are cached as they arrive, independently of any request.

mod assembler;
mod firmware;
mod pending;
pub mod ports;

use async_trait::async_trait;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, trace, warn};

pub use assembler::ChunkAssembler;
pub use firmware::FirmwareCache;
pub use pending::{PendingSlot, PendingState};
pub use ports::{PortInfo, PortPreferences};

use crate::config::BridgeConfig;
use crate::device::DeviceClient;
use crate::error::BridgeError;
use crate::midi::{format_hex, wrap_sysex};
use crate::protocol::{command, decode_message, encode_json, CommandResponse, DeviceMessage};
use crate::protocol::{FirmwareDomain, FirmwareVersion};

/// Anything SysEx messages can be written to
pub trait SysexOutput: Send {
    fn send(&mut self, message: &[u8]) -> Result<(), BridgeError>;
}

impl SysexOutput for MidiOutputConnection {
    fn send(&mut self, message: &[u8]) -> Result<(), BridgeError> {
        MidiOutputConnection::send(self, message).map_err(ports::midi_error)
    }
}

/// Per-call overrides for [`PedalBridge::send_command`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub timeout_ms: Option<u64>,
    pub retries: Option<u32>,
}

/// State shared with the MIDI input callback
struct Shared {
    output: Mutex<Option<Box<dyn SysexOutput>>>,
    input: Mutex<Option<MidiInputConnection<()>>>,
    port_name: RwLock<Option<String>>,
    pending: Mutex<PendingSlot>,
    firmware: RwLock<FirmwareCache>,
    assembler: Mutex<ChunkAssembler>,
}

/// Request/response link to one pedal
pub struct PedalBridge {
    config: BridgeConfig,
    shared: Arc<Shared>,
}

impl PedalBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                output: Mutex::new(None),
                input: Mutex::new(None),
                port_name: RwLock::new(None),
                pending: Mutex::new(PendingSlot::new()),
                firmware: RwLock::new(FirmwareCache::default()),
                assembler: Mutex::new(ChunkAssembler::new()),
            }),
        }
    }

    /// Open the pedal's output and input ports; returns the output port name
    pub fn connect(&self, prefs: &PortPreferences) -> Result<String, BridgeError> {
        let midi_out = MidiOutput::new("pedal-link-out").map_err(ports::midi_error)?;
        let out_ports: Vec<_> = midi_out
            .ports()
            .into_iter()
            .filter_map(|p| midi_out.port_name(&p).ok().map(|name| (p, name)))
            .collect();
        let out_names: Vec<String> = out_ports.iter().map(|(_, n)| n.clone()).collect();
        let out_index = ports::select_output(&out_names, prefs)?;
        let (out_port, out_name) = &out_ports[out_index];

        let mut midi_in = MidiInput::new("pedal-link-in").map_err(ports::midi_error)?;
        midi_in.ignore(Ignore::None);
        let in_ports: Vec<_> = midi_in
            .ports()
            .into_iter()
            .filter_map(|p| midi_in.port_name(&p).ok().map(|name| (p, name)))
            .collect();
        let in_names: Vec<String> = in_ports.iter().map(|(_, n)| n.clone()).collect();
        let in_index = ports::select_input(&in_names, out_name, prefs)?;
        let (in_port, in_name) = &in_ports[in_index];

        let weak = Arc::downgrade(&self.shared);
        let input = midi_in
            .connect(
                in_port,
                "pedal-link-in",
                move |_timestamp, data, _| dispatch_incoming(&weak, data),
                (),
            )
            .map_err(ports::midi_error)?;
        let output = midi_out
            .connect(out_port, "pedal-link-out")
            .map_err(ports::midi_error)?;

        *self.shared.input.lock() = Some(input);
        self.attach_output(Box::new(output));
        *self.shared.port_name.write() = Some(out_name.clone());

        info!("Connected to pedal: out='{}' in='{}'", out_name, in_name);
        Ok(out_name.clone())
    }

    /// Use an already-open output; replies are fed through [`Self::handle_incoming`]
    pub fn attach_output(&self, output: Box<dyn SysexOutput>) {
        *self.shared.output.lock() = Some(output);
        self.shared.assembler.lock().reset();
    }

    /// Drop both ports and cancel the pending request
    pub fn disconnect(&self) {
        let had_input = self.shared.input.lock().take().is_some();
        let had_output = self.shared.output.lock().take().is_some();
        self.shared.port_name.write().take();
        self.shared.assembler.lock().reset();

        if self.shared.pending.lock().fail(BridgeError::Disconnected) {
            debug!("Pending request cancelled by disconnect");
        }
        if had_input || had_output {
            info!("Disconnected from pedal");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.output.lock().is_some()
    }

    pub fn port_name(&self) -> Option<String> {
        self.shared.port_name.read().clone()
    }

    /// Feed one received MIDI message
    pub fn handle_incoming(&self, data: &[u8]) {
        handle_incoming(&self.shared, data);
    }

    /// Latest announced version for a firmware domain
    pub fn firmware_version(&self, domain: FirmwareDomain) -> Option<FirmwareVersion> {
        self.shared.firmware.read().get(domain)
    }

    pub fn firmware_versions(&self) -> FirmwareCache {
        self.shared.firmware.read().clone()
    }

    /// Response timeout for a request of `chunks` SysEx chunks
    pub fn compute_timeout(&self, chunks: usize) -> u64 {
        self.config.timeout_for(chunks)
    }

    /// Send a JSON command and wait for its JSON reply.
    ///
    /// Timeouts and NACKs are retried up to the retry budget; a JSON error
    /// status, supersession and disconnection end the call immediately.
    pub async fn send_command(&self, body: &Value, options: SendOptions) -> Result<Value, BridgeError> {
        let chunks = encode_json(body)?;
        let timeout_ms = options
            .timeout_ms
            .unwrap_or_else(|| self.compute_timeout(chunks.len()));
        let attempts = options.retries.unwrap_or(self.config.retries).max(1);
        let name = body.get("cmd").and_then(Value::as_str).unwrap_or("?");

        let mut attempt = 1;
        loop {
            match self.attempt(&chunks, timeout_ms).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying",
                        name, attempt, attempts, err
                    );
                    sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    attempt += 1;
                }
                Err(err) => {
                    debug!("{} failed after {} attempt(s): {}", name, attempt, err);
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, chunks: &[Vec<u8>], timeout_ms: u64) -> Result<Value, BridgeError> {
        if !self.is_connected() {
            return Err(BridgeError::NotConnected);
        }

        let wait = Duration::from_millis(timeout_ms);
        let (id, receiver) = self.shared.pending.lock().begin();

        if let Err(err) = self.write_chunks(chunks).await {
            self.shared.pending.lock().expire(id);
            return Err(err);
        }

        match timeout(wait, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(BridgeError::Disconnected),
            Err(_) => {
                self.shared.pending.lock().expire(id);
                Err(BridgeError::Timeout { timeout_ms })
            }
        }
    }

    async fn write_chunks(&self, chunks: &[Vec<u8>]) -> Result<(), BridgeError> {
        let delay = Duration::from_millis(self.config.chunk_delay_ms);
        for (i, chunk) in chunks.iter().enumerate() {
            let message = wrap_sysex(chunk);
            trace!("TX -> {}", format_hex(&message));
            {
                let mut output = self.shared.output.lock();
                let output = output.as_mut().ok_or(BridgeError::NotConnected)?;
                output.send(&message)?;
            }
            if i + 1 < chunks.len() && !delay.is_zero() {
                sleep(delay).await;
            }
        }
        debug!("Sent {} chunk(s)", chunks.len());
        Ok(())
    }

    /// Ask the firmware for its version string
    pub async fn query_firmware_version(&self) -> Result<String, BridgeError> {
        let reply = self
            .send_command(&command::get_fw_version(), SendOptions::default())
            .await?;
        let response = CommandResponse::from_value(reply);
        match response.value_str() {
            Some(version) => Ok(version.to_string()),
            None => self
                .firmware_version(FirmwareDomain::Micro)
                .map(|v| v.number())
                .ok_or_else(|| BridgeError::Application {
                    reason: "firmware version missing from reply".to_string(),
                }),
        }
    }
}

impl Drop for PedalBridge {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[async_trait]
impl DeviceClient for PedalBridge {
    async fn send_command(&self, body: Value) -> Result<CommandResponse, BridgeError> {
        let reply = PedalBridge::send_command(self, &body, SendOptions::default()).await?;
        Ok(CommandResponse::from_value(reply))
    }

    fn cached_firmware(&self, domain: FirmwareDomain) -> Option<FirmwareVersion> {
        self.firmware_version(domain)
    }
}

fn dispatch_incoming(shared: &Weak<Shared>, data: &[u8]) {
    if let Some(shared) = shared.upgrade() {
        handle_incoming(&shared, data);
    }
}

fn handle_incoming(shared: &Shared, data: &[u8]) {
    trace!("RX <- {}", format_hex(data));

    let Some(bytes) = shared.assembler.lock().push(data) else {
        return;
    };
    let Some(message) = decode_message(&bytes) else {
        debug!("Ignoring undecodable message ({} bytes)", bytes.len());
        return;
    };

    match message {
        DeviceMessage::Json(value) => {
            let outcome = match CommandResponse::from_value(value.clone()).error_reason() {
                Some(reason) => Err(BridgeError::Application { reason }),
                None => Ok(value),
            };
            if !shared.pending.lock().resolve(outcome) {
                debug!("Unsolicited JSON reply dropped");
            }
        }
        DeviceMessage::Nack { code } => {
            debug!("NACK code {}", code);
            if !shared.pending.lock().fail(BridgeError::Nack { code }) {
                debug!("Unsolicited NACK dropped");
            }
        }
        DeviceMessage::Ack => trace!("ACK"),
        DeviceMessage::Printf(text) => debug!("Pedal: {}", text.trim_end()),
        DeviceMessage::Firmware(version) => {
            if shared.firmware.write().update(version) {
                info!("Firmware {}", version);
            }
        }
        DeviceMessage::Raw(raw) => trace!("Raw message: {}", format_hex(&raw)),
    }
}
