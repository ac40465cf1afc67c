// MIDI output port discovery and opening

use crate::midi::output::MidirSink;
use crate::sequencer::SequencerError;
use midir::MidiOutput;
use std::fmt;

const CLIENT_NAME: &str = "Random Note Gen";
const CONNECTION_NAME: &str = "random-note-gen-out";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiPortInfo {
    pub index: usize,
    pub name: String,
}

impl fmt::Display for MidiPortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.index, self.name)
    }
}

/// How the user picked an output port
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortSelector {
    Index(usize),
    Name(String),
}

impl fmt::Display for PortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSelector::Index(index) => write!(f, "#{}", index),
            PortSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

pub struct MidiDeviceManager;

impl MidiDeviceManager {
    pub fn new() -> Self {
        Self
    }

    /// Lists every MIDI output port currently available
    pub fn list_output_ports(&self) -> Vec<MidiPortInfo> {
        let mut ports = Vec::new();

        match MidiOutput::new(CLIENT_NAME) {
            Ok(midi_out) => {
                for (index, port) in midi_out.ports().iter().enumerate() {
                    if let Ok(name) = midi_out.port_name(port) {
                        ports.push(MidiPortInfo { index, name });
                    }
                }
            }
            Err(e) => log::warn!(target: "midi", "MIDI output unavailable: {}", e),
        }

        ports
    }

    /// Opens the selected output port
    pub fn open(&self, selector: &PortSelector) -> Result<MidirSink, SequencerError> {
        let midi_out = MidiOutput::new(CLIENT_NAME).map_err(|e| {
            SequencerError::PortUnavailable(format!("MIDI output init failed: {}", e))
        })?;

        let ports = midi_out.ports();
        let found = match selector {
            PortSelector::Index(index) => ports.get(*index).map(|port| {
                let name = midi_out
                    .port_name(port)
                    .unwrap_or_else(|_| "Unknown".to_string());
                (port.clone(), name)
            }),
            PortSelector::Name(wanted) => ports.iter().find_map(|port| {
                midi_out
                    .port_name(port)
                    .ok()
                    .filter(|name| name == wanted)
                    .map(|name| (port.clone(), name))
            }),
        };

        let (port, port_name) = found.ok_or_else(|| {
            SequencerError::PortUnavailable(format!(
                "no MIDI output port {} ({} available)",
                selector,
                ports.len()
            ))
        })?;

        let connection = midi_out.connect(&port, CONNECTION_NAME).map_err(|e| {
            SequencerError::PortUnavailable(format!("could not connect to '{}': {}", port_name, e))
        })?;

        log::info!(target: "midi", "MIDI output connected: {}", port_name);
        Ok(MidirSink::new(connection, port_name))
    }
}

impl Default for MidiDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
