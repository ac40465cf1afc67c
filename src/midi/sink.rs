// MIDI sinks - Destination for everything the sequencer emits

use crate::midi::event::MidiMessage;
use crate::sequencer::SequencerError;
use std::sync::{Arc, Mutex};

/// Anything able to receive sequencer output.
///
/// `send` is fire-and-forget; an error is fatal to the run. `close` must be
/// idempotent and any `send` after it must fail.
pub trait MidiSink: Send {
    fn send(&mut self, message: MidiMessage) -> Result<(), SequencerError>;

    fn close(&mut self);
}

/// Sends through a sink shared between the step loop and the clock.
/// The lock is held for the duration of one send only.
pub fn send_locked<S: MidiSink + ?Sized>(
    sink: &Mutex<S>,
    message: MidiMessage,
) -> Result<(), SequencerError> {
    sink.lock()
        .map_err(|_| SequencerError::TransportFailure("MIDI sink lock poisoned".to_string()))?
        .send(message)
}

impl<S: MidiSink + ?Sized> MidiSink for Box<S> {
    fn send(&mut self, message: MidiMessage) -> Result<(), SequencerError> {
        (**self).send(message)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[derive(Debug, Default)]
struct MemoryLog {
    messages: Vec<MidiMessage>,
    close_calls: usize,
    closed: bool,
    fail_after: Option<usize>,
}

/// Records messages in memory.
///
/// Clones share the same log, so a caller can hand one clone to a run and
/// inspect the other once the run is over.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<MemoryLog>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose sends start failing once `count` messages were accepted
    pub fn failing_after(count: usize) -> Self {
        let sink = Self::new();
        if let Ok(mut log) = sink.log.lock() {
            log.fail_after = Some(count);
        }
        sink
    }

    /// Snapshot of every message received so far
    pub fn messages(&self) -> Vec<MidiMessage> {
        self.log
            .lock()
            .map(|log| log.messages.clone())
            .unwrap_or_default()
    }

    /// Number of note-on messages received so far
    pub fn note_on_count(&self) -> usize {
        self.messages().iter().filter(|m| m.is_note_on()).count()
    }

    /// Number of times `close` was called
    pub fn close_calls(&self) -> usize {
        self.log.lock().map(|log| log.close_calls).unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.log.lock().map(|log| log.closed).unwrap_or(false)
    }
}

impl MidiSink for MemorySink {
    fn send(&mut self, message: MidiMessage) -> Result<(), SequencerError> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| SequencerError::TransportFailure("memory sink poisoned".to_string()))?;

        if log.closed {
            return Err(SequencerError::TransportFailure(
                "send on a closed sink".to_string(),
            ));
        }
        if log.fail_after.is_some_and(|limit| log.messages.len() >= limit) {
            return Err(SequencerError::TransportFailure(format!(
                "sink refused '{}'",
                message
            )));
        }

        log.messages.push(message);
        Ok(())
    }

    fn close(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.close_calls += 1;
            log.closed = true;
        }
    }
}

/// Writes every message to the log instead of a device
#[derive(Debug, Default)]
pub struct LogSink {
    sent: u64,
    closed: bool,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MidiSink for LogSink {
    fn send(&mut self, message: MidiMessage) -> Result<(), SequencerError> {
        if self.closed {
            return Err(SequencerError::TransportFailure(
                "send on a closed sink".to_string(),
            ));
        }

        self.sent += 1;
        if message.is_clock() {
            log::trace!(target: "midi", "{}", message);
        } else {
            log::info!(target: "midi", "{}", message);
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            log::debug!(target: "midi", "log sink closed after {} messages", self.sent);
        }
    }
}
