// MIDI message types sent by the sequencer

use std::fmt;

/// Velocity used for every generated note
pub const DEFAULT_VELOCITY: u8 = 64;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const TIMING_CLOCK: u8 = 0xF8;
const START: u8 = 0xFA;
const STOP: u8 = 0xFC;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8 },
    NoteOff { channel: u8, note: u8 },
    ClockStart,
    ClockTick,
    ClockStop,
}

impl MidiMessage {
    /// Encodes the message as raw MIDI bytes.
    /// Channel is masked to 4 bits and note to 7 bits.
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn { channel, note } => {
                vec![NOTE_ON | (channel & 0x0F), note & 0x7F, DEFAULT_VELOCITY]
            }
            MidiMessage::NoteOff { channel, note } => {
                vec![NOTE_OFF | (channel & 0x0F), note & 0x7F, 0]
            }
            MidiMessage::ClockStart => vec![START],
            MidiMessage::ClockTick => vec![TIMING_CLOCK],
            MidiMessage::ClockStop => vec![STOP],
        }
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self, MidiMessage::NoteOn { .. })
    }

    pub fn is_clock(&self) -> bool {
        matches!(
            self,
            MidiMessage::ClockStart | MidiMessage::ClockTick | MidiMessage::ClockStop
        )
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiMessage::NoteOn { channel, note } => {
                write!(f, "note_on ch={} note={}", channel + 1, note)
            }
            MidiMessage::NoteOff { channel, note } => {
                write!(f, "note_off ch={} note={}", channel + 1, note)
            }
            MidiMessage::ClockStart => f.write_str("start"),
            MidiMessage::ClockTick => f.write_str("clock"),
            MidiMessage::ClockStop => f.write_str("stop"),
        }
    }
}
