// Step player - Generates one note decision per step and paces the output
// The heart of the run: pitch draw, scale check, gate hold, tempo pacing

use crate::midi::event::MidiMessage;
use crate::midi::sink::{MidiSink, send_locked};
use crate::sequencer::params::SequenceParams;
use crate::sequencer::scale::Scale;
use crate::sequencer::switch::RunSwitch;
use crate::sequencer::timing;
use crate::sequencer::SequencerError;
use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

/// Why a run stopped without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionReason {
    /// Every step of the pattern was played
    EndOfPattern,
    /// The run switch was flipped while steps remained
    Cancelled,
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionReason::EndOfPattern => f.write_str("end of pattern"),
            CompletionReason::Cancelled => f.write_str("ended by user"),
        }
    }
}

/// Decision taken for a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The drawn pitch is in the scale and is played
    Play(u8),
    /// Off-scale draw, the previous pitch is played again
    Repeat(u8),
    /// Off-scale draw, nothing is emitted
    Rest,
}

impl StepOutcome {
    /// Pitch to emit for this step, if any
    pub fn pitch(&self) -> Option<u8> {
        match *self {
            StepOutcome::Play(pitch) | StepOutcome::Repeat(pitch) => Some(pitch),
            StepOutcome::Rest => None,
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Play(pitch) => write!(f, "play {}", pitch),
            StepOutcome::Repeat(pitch) => write!(f, "repeat {}", pitch),
            StepOutcome::Rest => f.write_str("rest"),
        }
    }
}

/// Turns a drawn candidate into a step decision.
///
/// Only `Play` changes what counts as the last played pitch.
pub fn resolve_candidate(
    scale: &Scale,
    candidate: i32,
    last_played: u8,
    play_every_step: bool,
) -> StepOutcome {
    if scale.contains(candidate) {
        StepOutcome::Play(candidate as u8)
    } else if play_every_step {
        StepOutcome::Repeat(last_played)
    } else {
        StepOutcome::Rest
    }
}

/// Mutable state of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    remaining_steps: u64,
    steps_taken: u64,
    last_played: u8,
}

impl RunState {
    pub fn new(step_count: u64, seed_pitch: u8) -> Self {
        Self {
            remaining_steps: step_count,
            steps_taken: 0,
            last_played: seed_pitch,
        }
    }

    pub fn remaining_steps(&self) -> u64 {
        self.remaining_steps
    }

    /// Number of note decisions made so far
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn last_played(&self) -> u8 {
        self.last_played
    }
}

/// Generative step sequencer
pub struct StepSequencer<R: Rng> {
    params: SequenceParams,
    scale: Scale,
    state: RunState,
    interval: f64,
    rng: R,
}

impl<R: Rng> StepSequencer<R> {
    /// Creates a sequencer ready to run; the last played pitch is seeded with
    /// a random scale member.
    pub fn new(params: SequenceParams, scale: Scale, mut rng: R) -> Result<Self, SequencerError> {
        params.validate()?;

        let seed_pitch = *scale
            .pitches()
            .choose(&mut rng)
            .ok_or_else(|| SequencerError::InvalidConfig("scale has no pitches".to_string()))?;

        Ok(Self {
            state: RunState::new(params.step_count(), seed_pitch),
            interval: params.interval(),
            params,
            scale,
            rng,
        })
    }

    pub fn params(&self) -> &SequenceParams {
        &self.params
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Draws a candidate over the full numeric span of the scale, one past
    /// the top included. Non-members are misses.
    pub fn draw_candidate(&mut self) -> i32 {
        let low = self.scale.min() as i32;
        let high = self.scale.max() as i32 + 1;
        self.rng.gen_range(low..=high)
    }

    /// Draws and resolves the next step, updating the last played pitch
    pub fn next_step(&mut self) -> StepOutcome {
        let candidate = self.draw_candidate();
        let outcome = resolve_candidate(
            &self.scale,
            candidate,
            self.state.last_played,
            self.params.play_every_step,
        );

        if let StepOutcome::Play(pitch) = outcome {
            self.state.last_played = pitch;
        }
        outcome
    }

    /// Gate length for the next note, in seconds
    fn gate_length(&mut self) -> f64 {
        if self.params.quantize_gate {
            timing::gate_length_quantized(&mut self.rng, self.interval, self.params.gate_mod_pct)
        } else {
            timing::gate_length(&mut self.rng, self.interval, self.params.gate_mod_pct)
        }
    }

    /// Emits note-on, holds for the gate length, emits note-off
    fn play_note<S: MidiSink + ?Sized>(
        &mut self,
        sink: &Mutex<S>,
        pitch: u8,
    ) -> Result<(), SequencerError> {
        let channel = self.params.channel;
        let gate = self.gate_length();

        send_locked(sink, MidiMessage::NoteOn { channel, note: pitch })?;
        thread::sleep(timing::to_duration(gate));
        send_locked(sink, MidiMessage::NoteOff { channel, note: pitch })
    }

    /// Runs until the pattern is exhausted or the switch is flipped.
    ///
    /// Cancellation is polled between steps only, so an in-flight gate
    /// always completes. A send failure aborts the loop immediately.
    pub fn run<S: MidiSink + ?Sized>(
        &mut self,
        sink: &Mutex<S>,
        switch: &RunSwitch,
    ) -> Result<CompletionReason, SequencerError> {
        log::info!(
            target: "sequencer",
            "playing {} steps at {} BPM (1/{} notes, {:.4}s per step)",
            self.state.remaining_steps,
            self.params.bpm,
            self.params.note_value,
            self.interval
        );

        while self.state.remaining_steps > 0 && switch.is_running() {
            let started = Instant::now();
            let rest = timing::micro_time(&mut self.rng, self.interval, self.params.time_mod_pct);

            let outcome = self.next_step();
            log::debug!(target: "sequencer", "step {}: {}", self.state.steps_taken + 1, outcome);

            if let Some(pitch) = outcome.pitch() {
                if let Err(e) = self.play_note(sink, pitch) {
                    log::error!(target: "sequencer", "aborting run: {}", e);
                    return Err(e);
                }
            }

            // Overruns are not caught up beyond this step
            if let Some(wait) = timing::to_duration(rest).checked_sub(started.elapsed()) {
                thread::sleep(wait);
            }

            self.state.remaining_steps -= 1;
            self.state.steps_taken += 1;
        }

        if self.state.remaining_steps == 0 {
            Ok(CompletionReason::EndOfPattern)
        } else {
            Ok(CompletionReason::Cancelled)
        }
    }
}
