//! Device client seam
//!
//! The scanner and exporter talk to the pedal only through this trait, so they
//! can run against the MIDI bridge or against a simulated pedal.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BridgeError;
use crate::protocol::{CommandResponse, FirmwareDomain, FirmwareVersion};

#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Send one JSON command and return the firmware's reply.
    ///
    /// A reply with `status: "error"` is returned as
    /// [`BridgeError::Application`], never as `Ok`.
    async fn send_command(&self, body: Value) -> Result<CommandResponse, BridgeError>;

    /// Last version announced by a firmware domain, if any
    fn cached_firmware(&self, _domain: FirmwareDomain) -> Option<FirmwareVersion> {
        None
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;

    type Reply = Box<dyn Fn(&Value) -> Result<Value, BridgeError> + Send + Sync>;

    /// Records every command and answers through a closure
    pub(crate) struct RecordingDevice {
        sent: Mutex<Vec<Value>>,
        reply: Reply,
    }

    impl RecordingDevice {
        pub(crate) fn new(
            reply: impl Fn(&Value) -> Result<Value, BridgeError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                reply: Box::new(reply),
            }
        }

        /// Acknowledge everything with a bare success
        pub(crate) fn accepting() -> Self {
            Self::new(|_| Ok(json!({"status": "success"})))
        }

        pub(crate) fn sent(&self) -> Vec<Value> {
            self.sent.lock().clone()
        }

        pub(crate) fn command_names(&self) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .filter_map(|body| body["cmd"].as_str().map(str::to_string))
                .collect()
        }
    }

    #[async_trait]
    impl DeviceClient for RecordingDevice {
        async fn send_command(&self, body: Value) -> Result<CommandResponse, BridgeError> {
            self.sent.lock().push(body.clone());
            (self.reply)(&body).map(CommandResponse::from_value)
        }
    }
}
