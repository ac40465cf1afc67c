// MIDI module - Message model, sinks and output devices

pub mod device;
pub mod event;
pub mod output;
pub mod sink;

pub use device::{MidiDeviceManager, MidiPortInfo, PortSelector};
pub use event::MidiMessage;
pub use output::MidirSink;
pub use sink::{LogSink, MemorySink, MidiSink};
