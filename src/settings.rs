// Settings - Persisted sequence defaults
// Stored as RON in the user's config directory; missing fields take the built-in defaults

use crate::sequencer::{Key, Mode, Scale, ScaleSpec, SequenceParams, SequencerError};
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR: &str = "random_note_gen";
const SETTINGS_FILE: &str = "settings.ron";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed settings file: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),
}

/// Everything the user enters before a run, as entered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceSettings {
    /// Output port index
    pub port: usize,
    /// MIDI channel, 1-16
    pub channel: u8,
    pub bpm: u32,
    pub bars: u32,
    pub note_value: u32,
    pub octave_range: u8,
    /// Gate modulation, 0-100 %
    pub gate_mod: u8,
    /// Micro-timing, 0-100 %
    pub time_mod: u8,
    pub key: String,
    pub scale: String,
    pub every_step: bool,
    pub quantise: bool,
    pub start_external_clock: bool,
    pub send_clock_stop: bool,
}

impl Default for SequenceSettings {
    fn default() -> Self {
        Self {
            port: 0,
            channel: 1,
            bpm: 120,
            bars: 8,
            note_value: 16,
            octave_range: 2,
            gate_mod: 0,
            time_mod: 0,
            key: "c".to_string(),
            scale: "maj".to_string(),
            every_step: false,
            quantise: false,
            start_external_clock: false,
            send_clock_stop: false,
        }
    }
}

/// `<config dir>/random_note_gen/settings.ron`, if the platform has a config dir
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}

impl SequenceSettings {
    /// Reads settings from `path`
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path)?;
        Ok(ron::from_str(&contents)?)
    }

    /// Reads settings from `path`, falling back to the defaults when the file
    /// is missing or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!(target: "settings", "no settings at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    target: "settings",
                    "ignoring settings {}: {}",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Writes settings to `path`, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = ron::ser::to_string_pretty(self, PrettyConfig::default())?;
        fs::write(path, contents)?;
        log::info!(target: "settings", "saved settings to {}", path.display());
        Ok(())
    }

    /// Turns the entered values into run parameters and a scale
    pub fn assemble(&self) -> Result<(SequenceParams, Scale), SequencerError> {
        if !(1..=16).contains(&self.channel) {
            return Err(SequencerError::InvalidConfig(format!(
                "channel must be 1-16, got {}",
                self.channel
            )));
        }

        let params = SequenceParams::new(self.channel - 1, self.bpm, self.note_value, self.bars)?
            .with_gate_mod(self.gate_mod, self.quantise)
            .with_time_mod(self.time_mod)
            .with_every_step(self.every_step)
            .with_external_clock(self.start_external_clock, self.send_clock_stop);
        params.validate()?;

        let key: Key = self.key.parse()?;
        let mode: Mode = self.scale.parse()?;
        let scale = ScaleSpec::new(key, mode, self.octave_range).build()?;

        Ok((params, scale))
    }
}
