// Random Note Gen - Library exports for the CLI, tests and benchmarks

pub mod midi;
pub mod sequencer;
pub mod settings;

// Re-export commonly used types for convenience
pub use midi::{LogSink, MemorySink, MidiDeviceManager, MidiMessage, MidiSink, PortSelector};
pub use sequencer::{
    CompletionReason, Key, Mode, RunHandle, RunOutcome, RunStatus, RunSwitch, Scale, ScaleSpec,
    SequenceParams, SequencerError, StepSequencer, Transport, TransportClock,
};
pub use settings::{SequenceSettings, SettingsError};
