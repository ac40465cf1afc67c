// Sequencer module - Scale building, timing, and the generative step loop
// Run control and the optional external transport clock live here too

pub mod clock;
pub mod params;
pub mod player;
pub mod scale;
pub mod switch;
pub mod timing;
pub mod transport;

use thiserror::Error;

pub use clock::TransportClock;
pub use params::SequenceParams;
pub use player::{CompletionReason, RunState, StepOutcome, StepSequencer};
pub use scale::{Key, Mode, Scale, ScaleSpec};
pub use switch::RunSwitch;
pub use transport::{RunHandle, RunOutcome, RunStatus, Transport, start};

/// Errors raised while configuring or running a sequence
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("MIDI port unavailable: {0}")]
    PortUnavailable(String),

    #[error("MIDI transport failure: {0}")]
    TransportFailure(String),

    #[error("A sequence is already running")]
    AlreadyRunning,
}
