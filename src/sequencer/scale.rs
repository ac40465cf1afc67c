// Scale - Pitch sets built from a root, a mode template and an octave span
// The generated list is the vocabulary the step sequencer draws from

use super::SequencerError;
use std::fmt;
use std::str::FromStr;

/// Lowest note of the unmodified one-octave window (middle C)
const BASE_LOW: i32 = 60;

/// Upper bound of the unmodified one-octave window
const BASE_HIGH: i32 = 72;

/// Highest representable MIDI pitch
const MAX_PITCH: i32 = 127;

/// Root pitch class, 0 = C … 11 = B
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Key(u8);

impl Key {
    const NAMES: [&'static str; 12] = [
        "c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "b",
    ];

    /// Creates a key from a pitch class in [0, 11]
    pub fn new(pitch_class: u8) -> Result<Self, SequencerError> {
        if pitch_class < 12 {
            Ok(Self(pitch_class))
        } else {
            Err(SequencerError::InvalidConfig(format!(
                "root pitch class {} is outside 0-11",
                pitch_class
            )))
        }
    }

    /// Semitone offset from C
    pub fn pitch_class(&self) -> u8 {
        self.0
    }

    pub fn name(&self) -> &'static str {
        Self::NAMES[self.0 as usize]
    }
}

impl FromStr for Key {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let pitch_class = match name.as_str() {
            "db" => Some(1),
            "eb" => Some(3),
            "gb" => Some(6),
            "ab" => Some(8),
            "bb" => Some(10),
            other => Self::NAMES.iter().position(|n| *n == other).map(|i| i as u8),
        };

        pitch_class
            .map(Self)
            .ok_or_else(|| SequencerError::InvalidConfig(format!("unknown key '{}'", s)))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name().to_ascii_uppercase())
    }
}

/// Fixed vocabulary of mode templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Major,
    Minor,
    Pentatonic,
    WholeTone,
    Chromatic,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Self::Major,
        Self::Minor,
        Self::Pentatonic,
        Self::WholeTone,
        Self::Chromatic,
    ];

    /// Semitone offsets from the root (root = 0)
    pub fn intervals(self) -> &'static [u8] {
        match self {
            Self::Major      => &[0, 2, 4, 5, 7, 9, 11],
            Self::Minor      => &[0, 2, 3, 5, 7, 9, 10],
            Self::Pentatonic => &[0, 3, 5, 7, 10],
            Self::WholeTone  => &[0, 2, 4, 6, 8, 10],
            Self::Chromatic  => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    /// Short name used in settings files and on the command line
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Major      => "maj",
            Self::Minor      => "min",
            Self::Pentatonic => "penta",
            Self::WholeTone  => "whole",
            Self::Chromatic  => "chrom",
        }
    }
}

impl FromStr for Mode {
    type Err = SequencerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "maj" | "major" => Ok(Self::Major),
            "min" | "minor" => Ok(Self::Minor),
            "penta" | "pentatonic" => Ok(Self::Pentatonic),
            "whole" | "whole-tone" | "wholetone" => Ok(Self::WholeTone),
            "chrom" | "chromatic" => Ok(Self::Chromatic),
            _ => Err(SequencerError::InvalidConfig(format!("unknown scale '{}'", s))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Root + mode + octave span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleSpec {
    pub key: Key,
    pub mode: Mode,
    pub octave_span: u8,
}

impl ScaleSpec {
    pub fn new(key: Key, mode: Mode, octave_span: u8) -> Self {
        Self {
            key,
            mode,
            octave_span,
        }
    }

    /// Builds the pitch list for this root, mode and span
    pub fn build(&self) -> Result<Scale, SequencerError> {
        build(self.key, self.mode, self.octave_span)
    }
}

/// Ordered, duplicate-free set of playable pitches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    pitches: Vec<u8>,
}

impl Scale {
    /// Pitches in ascending order
    pub fn pitches(&self) -> &[u8] {
        &self.pitches
    }

    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    /// Lowest pitch of the scale
    pub fn min(&self) -> u8 {
        self.pitches[0]
    }

    /// Highest pitch of the scale
    pub fn max(&self) -> u8 {
        self.pitches[self.pitches.len() - 1]
    }

    /// Scale membership test. Candidates may lie outside the MIDI range,
    /// hence the wide integer.
    pub fn contains(&self, candidate: i32) -> bool {
        u8::try_from(candidate)
            .map(|pitch| self.pitches.binary_search(&pitch).is_ok())
            .unwrap_or(false)
    }
}

/// Computes the [low, high] window for an octave span, before the root shift
fn note_range(octave_span: u8) -> (i32, i32) {
    if octave_span == 1 {
        return (BASE_LOW, BASE_HIGH);
    }

    let half = (octave_span / 2) as i32;
    let odd = (octave_span % 2) as i32;
    (BASE_LOW - 12 * half, BASE_LOW + 12 * half + 12 * odd)
}

/// Builds the ascending pitch list for `key`/`mode` spanning `octave_span`.
///
/// The mode pattern is tiled upward from the low end of the window one
/// octave at a time until the running maximum reaches the high end.
pub fn build(key: Key, mode: Mode, octave_span: u8) -> Result<Scale, SequencerError> {
    if octave_span == 0 {
        return Err(SequencerError::InvalidConfig(
            "octave range must be at least 1".to_string(),
        ));
    }

    let (low, high) = note_range(octave_span);
    let offset = key.pitch_class() as i32;
    let (low, high) = (low + offset, high + offset);

    if low < 0 || high > MAX_PITCH {
        return Err(SequencerError::InvalidConfig(format!(
            "octave range {} in key {} leaves the MIDI note range ({}..{})",
            octave_span, key, low, high
        )));
    }

    let intervals = mode.intervals();
    let mut pitches: Vec<i32> = intervals.iter().map(|&iv| low + iv as i32).collect();
    let mut octave = 0;

    while pitches.last().is_some_and(|&last| last < high) {
        octave += 12;
        for &iv in intervals {
            if pitches.last().is_some_and(|&last| last < high) {
                pitches.push(low + octave + iv as i32);
            }
        }
    }

    Ok(Scale {
        pitches: pitches.into_iter().map(|p| p as u8).collect(),
    })
}
