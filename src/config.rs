//! Configuration management for pedal-link
//!
//! Handles loading, parsing, and validation of the YAML configuration file.
//! Every section is optional; a missing file means built-in defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::bridge::PortPreferences;
use crate::model::{JACK_COUNT, MACRO_CAPACITY, SETLIST_CAPACITY, SONG_CAPACITY};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

/// Which MIDI ports to talk to
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Exact output port name; wins over every other rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    /// Substring identifying the pedal maker in port names
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    /// Substring identifying the pedal model in port names
    #[serde(default = "default_name_hint")]
    pub name_hint: String,
}

/// Request timing and retry policy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BridgeConfig {
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Pause between SysEx chunks so the firmware buffer keeps up
    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
    #[serde(default = "default_min_timeout_ms")]
    pub min_timeout_ms: u64,
    #[serde(default = "default_base_timeout_ms")]
    pub base_timeout_ms: u64,
    #[serde(default = "default_per_chunk_timeout_ms")]
    pub per_chunk_timeout_ms: u64,
}

/// How much of the pedal an import visits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Stop each category after a run of untouched slots
    #[default]
    Configured,
    /// Visit every slot up to capacity and keep defaults too
    All,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::Configured => "configured",
            ImportMode::All => "all",
        }
    }
}

/// Slot scanner policy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub mode: ImportMode,
    /// Fold imported macro steps into references to known partials
    #[serde(default = "default_true")]
    pub compress_partials: bool,
    #[serde(default)]
    pub default_run: DefaultRunConfig,
    #[serde(default)]
    pub capacity: CapacityConfig,
}

/// Consecutive default records that end a category scan
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DefaultRunConfig {
    #[serde(default = "default_run_songs")]
    pub songs: usize,
    #[serde(default = "default_run_macros")]
    pub macros: usize,
    #[serde(default = "default_run_setlists")]
    pub setlists: usize,
}

/// Slots visited per category
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CapacityConfig {
    #[serde(default = "default_song_capacity")]
    pub songs: usize,
    #[serde(default = "default_macro_capacity")]
    pub macros: usize,
    #[serde(default = "default_setlist_capacity")]
    pub setlists: usize,
    #[serde(default = "default_jack_count")]
    pub jacks: usize,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// Load from file if it exists, otherwise fall back to defaults
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path).await
        } else {
            tracing::debug!("Config file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if let Some(port) = &self.device.port {
            if port.trim().is_empty() {
                anyhow::bail!("device.port cannot be empty when set");
            }
        }
        if self.device.manufacturer.trim().is_empty() && self.device.name_hint.trim().is_empty() {
            anyhow::bail!("device.manufacturer and device.name_hint cannot both be empty");
        }

        if self.bridge.retries == 0 {
            anyhow::bail!("bridge.retries must be at least 1");
        }
        if self.bridge.min_timeout_ms == 0 {
            anyhow::bail!("bridge.min_timeout_ms must be greater than 0");
        }

        let run = &self.import.default_run;
        if run.songs == 0 || run.macros == 0 || run.setlists == 0 {
            anyhow::bail!("import.default_run thresholds must be at least 1");
        }

        let cap = &self.import.capacity;
        check_capacity("songs", cap.songs, SONG_CAPACITY)?;
        check_capacity("macros", cap.macros, MACRO_CAPACITY)?;
        check_capacity("setlists", cap.setlists, SETLIST_CAPACITY)?;
        check_capacity("jacks", cap.jacks, JACK_COUNT)?;

        Ok(())
    }
}

fn check_capacity(name: &str, value: usize, max: usize) -> Result<()> {
    if value > max {
        anyhow::bail!(
            "import.capacity.{} is {} but the pedal only has {} slots",
            name,
            value,
            max
        );
    }
    Ok(())
}

impl DeviceConfig {
    pub fn port_preferences(&self) -> PortPreferences {
        PortPreferences {
            preferred: self.port.clone(),
            manufacturer: self.manufacturer.clone(),
            name_hint: self.name_hint.clone(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: None,
            manufacturer: default_manufacturer(),
            name_hint: default_name_hint(),
        }
    }
}

impl BridgeConfig {
    /// Response timeout for a request of `chunks` SysEx chunks
    pub fn timeout_for(&self, chunks: usize) -> u64 {
        let scaled = self.base_timeout_ms + self.per_chunk_timeout_ms * chunks as u64;
        scaled.max(self.min_timeout_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            chunk_delay_ms: default_chunk_delay_ms(),
            min_timeout_ms: default_min_timeout_ms(),
            base_timeout_ms: default_base_timeout_ms(),
            per_chunk_timeout_ms: default_per_chunk_timeout_ms(),
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            mode: ImportMode::default(),
            compress_partials: true,
            default_run: DefaultRunConfig::default(),
            capacity: CapacityConfig::default(),
        }
    }
}

impl Default for DefaultRunConfig {
    fn default() -> Self {
        Self {
            songs: default_run_songs(),
            macros: default_run_macros(),
            setlists: default_run_setlists(),
        }
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            songs: default_song_capacity(),
            macros: default_macro_capacity(),
            setlists: default_setlist_capacity(),
            jacks: default_jack_count(),
        }
    }
}

fn default_manufacturer() -> String { "Pedal".to_string() }
fn default_name_hint() -> String { "MIDI".to_string() }
fn default_true() -> bool { true }
fn default_retries() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 500 }
fn default_chunk_delay_ms() -> u64 { 5 }
fn default_min_timeout_ms() -> u64 { 5000 }
fn default_base_timeout_ms() -> u64 { 1200 }
fn default_per_chunk_timeout_ms() -> u64 { 250 }
fn default_run_songs() -> usize { 5 }
fn default_run_macros() -> usize { 5 }
fn default_run_setlists() -> usize { 3 }
fn default_song_capacity() -> usize { SONG_CAPACITY }
fn default_macro_capacity() -> usize { MACRO_CAPACITY }
fn default_setlist_capacity() -> usize { SETLIST_CAPACITY }
fn default_jack_count() -> usize { JACK_COUNT }
