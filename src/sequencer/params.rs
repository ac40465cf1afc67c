// Sequence parameters - Immutable configuration for one run
// Constructed once from validated input, read-only thereafter

use super::SequencerError;
use super::timing;

/// Configuration of a generative run
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceParams {
    /// Output channel (0-15)
    pub channel: u8,

    /// Tempo in beats per minute
    pub bpm: u32,

    /// Step subdivision of a whole note (16 = sixteenth notes)
    pub note_value: u32,

    /// Number of bars to play
    pub bars: u32,

    /// Gate-length modulation depth, 0-100 %
    pub gate_mod_pct: u8,

    /// Micro-timing depth, 0-100 % of the nominal interval
    pub time_mod_pct: u8,

    /// Restrict gate modulation to fixed fractions
    pub quantize_gate: bool,

    /// Repeat the previous pitch when the draw falls outside the scale
    pub play_every_step: bool,

    /// Drive an external recorder with start + clock messages
    pub start_external_clock: bool,

    /// Send a clock stop once the external clock winds down
    pub send_clock_stop: bool,

    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl SequenceParams {
    /// Creates parameters with every modulation and option turned off
    pub fn new(channel: u8, bpm: u32, note_value: u32, bars: u32) -> Result<Self, SequencerError> {
        let params = Self {
            channel,
            bpm,
            note_value,
            bars,
            gate_mod_pct: 0,
            time_mod_pct: 0,
            quantize_gate: false,
            play_every_step: false,
            start_external_clock: false,
            send_clock_stop: false,
            seed: None,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn with_gate_mod(mut self, pct: u8, quantize: bool) -> Self {
        self.gate_mod_pct = pct;
        self.quantize_gate = quantize;
        self
    }

    pub fn with_time_mod(mut self, pct: u8) -> Self {
        self.time_mod_pct = pct;
        self
    }

    pub fn with_every_step(mut self, enabled: bool) -> Self {
        self.play_every_step = enabled;
        self
    }

    pub fn with_external_clock(mut self, enabled: bool, send_stop: bool) -> Self {
        self.start_external_clock = enabled;
        self.send_clock_stop = send_stop;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Checks every field against its allowed range
    pub fn validate(&self) -> Result<(), SequencerError> {
        if self.channel > 15 {
            return Err(invalid(format!("channel {} is outside 0-15", self.channel)));
        }
        if self.bpm == 0 {
            return Err(invalid("BPM must be greater than 0".to_string()));
        }
        if self.note_value == 0 {
            return Err(invalid("note value must be greater than 0".to_string()));
        }
        if self.bars == 0 {
            return Err(invalid("bar count must be at least 1".to_string()));
        }
        if self.gate_mod_pct > 100 {
            return Err(invalid(format!("gate mod {}% exceeds 100%", self.gate_mod_pct)));
        }
        if self.time_mod_pct > 100 {
            return Err(invalid(format!("time mod {}% exceeds 100%", self.time_mod_pct)));
        }
        Ok(())
    }

    /// Nominal time between step triggers, in seconds
    pub fn interval(&self) -> f64 {
        timing::nominal_interval(self.bpm, self.note_value)
    }

    /// Total number of steps in the pattern
    pub fn step_count(&self) -> u64 {
        self.note_value as u64 * self.bars as u64
    }
}

fn invalid(message: String) -> SequencerError {
    SequencerError::InvalidConfig(message)
}
