// MIDI Output - Sink backed by a midir output connection

use crate::midi::event::MidiMessage;
use crate::midi::sink::MidiSink;
use crate::sequencer::SequencerError;
use midir::MidiOutputConnection;

/// Live hardware/virtual MIDI output
pub struct MidirSink {
    connection: Option<MidiOutputConnection>,
    port_name: String,
}

impl MidirSink {
    pub(crate) fn new(connection: MidiOutputConnection, port_name: String) -> Self {
        Self {
            connection: Some(connection),
            port_name,
        }
    }

    /// Name of the port this sink writes to
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiSink for MidirSink {
    fn send(&mut self, message: MidiMessage) -> Result<(), SequencerError> {
        let connection = self.connection.as_mut().ok_or_else(|| {
            SequencerError::TransportFailure(format!("port '{}' is closed", self.port_name))
        })?;

        connection.send(&message.to_bytes()).map_err(|e| {
            SequencerError::TransportFailure(format!(
                "failed to send '{}' to '{}': {}",
                message, self.port_name, e
            ))
        })
    }

    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            log::info!(target: "midi", "closed MIDI output '{}'", self.port_name);
        }
    }
}

impl Drop for MidirSink {
    fn drop(&mut self) {
        self.close();
    }
}
