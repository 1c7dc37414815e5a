//! Pedal Link
//!
//! SysEx configuration bridge for MIDI-controlled effects pedals: a packed
//! 7-bit wire codec, a request/response bridge over MIDI, a slot scanner that
//! imports songs, macros, setlists and settings, an exporter that writes them
//! back, and partial compression for macro steps.

pub mod bridge;
pub mod category;
pub mod config;
pub mod device;
pub mod error;
pub mod export;
pub mod import;
pub mod midi;
pub mod model;
pub mod partials;
pub mod protocol;
pub mod store;

pub use bridge::PedalBridge;
pub use device::DeviceClient;
pub use error::{BridgeError, CodecError, ModelError, SyncError};
pub use export::{ExportOptions, ExportReport, Exporter};
pub use import::{ImportOptions, ImportReport, Importer};
pub use store::{MemoryStore, ProjectRepository, ProjectState, StatePatch};
