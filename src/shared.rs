// Types and constants every layer agrees on: the vowel symbols samples get
// tagged with, note identities, and the hard limits on scale settings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
pub const MIN_OCTAVE: i32 = 1;
pub const MAX_OCTAVE: i32 = 8;
pub const MAX_SEMITONES: usize = 128;
pub const MAX_GAP_SECONDS: f64 = 5.0;
pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 192_000;

pub const AUDIO_EXTENSION: &str = "wav";
pub const CHROMATIC_FILE: &str = "chromatic.wav"; // our own output, never scanned back in

// One of the fixed vowel-ish tags. Case-insensitive when parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Symbol {
    A,
    E,
    I,
    O,
    U,
    Ay,
}

impl Symbol {
    pub const ALL: [Symbol; 6] = [Symbol::A, Symbol::E, Symbol::I, Symbol::O, Symbol::U, Symbol::Ay];

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::A => "A",
            Symbol::E => "E",
            Symbol::I => "I",
            Symbol::O => "O",
            Symbol::U => "U",
            Symbol::Ay => "AY",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownSymbol(pub String);

impl fmt::Display for UnknownSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown symbol `{}` (expected one of A, E, I, O, U, AY)", self.0)
    }
}

impl std::error::Error for UnknownSymbol {}

impl FromStr for Symbol {
    type Err = UnknownSymbol;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Symbol::ALL
            .into_iter()
            .find(|sym| sym.as_str() == upper)
            .ok_or_else(|| UnknownSymbol(s.to_string()))
    }
}

impl TryFrom<String> for Symbol {
    type Error = UnknownSymbol;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Symbol> for &'static str {
    fn from(sym: Symbol) -> Self {
        sym.as_str()
    }
}

// Where a sample's symbol came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    Filename,
    Folder,
}

// A pitch class, 0 = C .. 11 = B. Stored as its name ("C#") in json.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteName(u8);

impl NoteName {
    pub const C: NoteName = NoteName(0);

    pub fn new(pitch_class: u8) -> Option<Self> {
        (pitch_class < 12).then_some(Self(pitch_class))
    }

    pub fn pitch_class(self) -> u8 {
        self.0
    }

    pub fn as_str(self) -> &'static str {
        NOTE_NAMES[self.0 as usize]
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for NoteName {
    type Err = String;

    // accepts sharps ("C#") and flats ("Db"), any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        let letter = chars.next().map(|c| c.to_ascii_uppercase());
        let natural: i32 = match letter {
            Some('C') => 0,
            Some('D') => 2,
            Some('E') => 4,
            Some('F') => 5,
            Some('G') => 7,
            Some('A') => 9,
            Some('B') => 11,
            _ => return Err(format!("invalid note name `{trimmed}`")),
        };
        let accidental = match chars.as_str() {
            "" => 0,
            "#" | "s" | "S" => 1,
            "b" | "B" => -1,
            _ => return Err(format!("invalid note name `{trimmed}`")),
        };
        Ok(Self((natural + accidental).rem_euclid(12) as u8))
    }
}

impl TryFrom<String> for NoteName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoteName> for String {
    fn from(note: NoteName) -> Self {
        note.as_str().to_string()
    }
}

// A concrete note: pitch class plus octave, scientific pitch notation (C4 = MIDI 60)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawNoteId")]
pub struct NoteId {
    pitch_class: u8,
    octave: i32,
}

#[derive(Deserialize)]
struct RawNoteId {
    pitch_class: u8,
    octave: i32,
}

impl TryFrom<RawNoteId> for NoteId {
    type Error = String;

    fn try_from(raw: RawNoteId) -> Result<Self, String> {
        let name = NoteName::new(raw.pitch_class).ok_or_else(|| format!("pitch class {} is not in 0..12", raw.pitch_class))?;
        Ok(Self::new(name, raw.octave))
    }
}

impl NoteId {
    pub fn new(name: NoteName, octave: i32) -> Self {
        Self { pitch_class: name.pitch_class(), octave }
    }

    pub fn pitch_class(self) -> u8 {
        self.pitch_class
    }

    pub fn octave(self) -> i32 {
        self.octave
    }

    // the note `semitones` above this one, carrying into the next octave
    pub fn transpose(self, semitones: i32) -> Self {
        let total = self.pitch_class as i32 + semitones;
        Self {
            pitch_class: total.rem_euclid(12) as u8,
            octave: self.octave + total.div_euclid(12),
        }
    }

    pub fn midi(self) -> i32 {
        (self.octave + 1) * 12 + self.pitch_class as i32
    }

    // equal temperament, A4 = 440 Hz
    pub fn frequency(self) -> f64 {
        440.0 * 2f64.powf((self.midi() - 69) as f64 / 12.0)
    }

    pub fn label(self) -> String {
        format!("{}{}", NOTE_NAMES[self.pitch_class as usize], self.octave)
    }

    // deterministic output filename, sorts in pitch order
    pub fn file_name(self) -> String {
        format!("{:03}_{}.{}", self.midi().max(0), self.label(), AUDIO_EXTENSION)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.label())
    }
}
