// Transport clock - MIDI start + 24 PPQN clock output for an external recorder
// Mirrors the run switch; it never decides when the sequence ends

use crate::midi::event::MidiMessage;
use crate::midi::sink::{MidiSink, send_locked};
use crate::sequencer::switch::RunSwitch;
use crate::sequencer::timing;
use crate::sequencer::SequencerError;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Periodic clock pulse emitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportClock {
    bpm: u32,
    send_stop: bool,
}

impl TransportClock {
    pub fn new(bpm: u32, send_stop: bool) -> Self {
        Self { bpm, send_stop }
    }

    /// Time between two clock ticks
    pub fn tick_interval(&self) -> Duration {
        timing::to_duration(timing::clock_tick_interval(self.bpm))
    }

    /// Sends a start message, then ticks until the switch is turned off.
    ///
    /// Ticks are scheduled against absolute deadlines so sleep overshoot does
    /// not accumulate. A stalled send restarts the schedule one interval
    /// later. Returns the number of ticks sent. A failed send
    /// flips the switch so the step loop stops too.
    pub fn run<S: MidiSink + ?Sized>(
        &self,
        sink: &Mutex<S>,
        switch: &RunSwitch,
    ) -> Result<u64, SequencerError> {
        let result = self.pulse(sink, switch);

        if let Err(e) = &result {
            log::error!(target: "clock", "external clock failed: {}", e);
            switch.stop();
        }
        result
    }

    fn pulse<S: MidiSink + ?Sized>(
        &self,
        sink: &Mutex<S>,
        switch: &RunSwitch,
    ) -> Result<u64, SequencerError> {
        let interval = self.tick_interval();
        let mut ticks = 0u64;

        send_locked(sink, MidiMessage::ClockStart)?;
        log::info!(target: "clock", "external clock started at {} BPM", self.bpm);

        let mut deadline = Instant::now();
        while switch.is_running() {
            send_locked(sink, MidiMessage::ClockTick)?;
            ticks += 1;

            deadline += interval;
            let now = Instant::now();
            if deadline <= now {
                // Missed ticks are dropped, never sent back-to-back
                deadline = now + interval;
            }
            thread::sleep(deadline - now);
        }

        if self.send_stop {
            send_locked(sink, MidiMessage::ClockStop)?;
        }
        log::debug!(target: "clock", "external clock stopped after {} ticks", ticks);
        Ok(ticks)
    }

    /// Runs the clock on its own thread
    pub fn spawn<S: MidiSink + 'static>(
        self,
        sink: Arc<Mutex<S>>,
        switch: RunSwitch,
    ) -> Result<JoinHandle<Result<u64, SequencerError>>, SequencerError> {
        thread::Builder::new()
            .name("transport-clock".to_string())
            .spawn(move || self.run(&sink, &switch))
            .map_err(|e| {
                SequencerError::TransportFailure(format!("could not start clock thread: {}", e))
            })
    }
}
