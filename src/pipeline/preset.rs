// The user-owned configuration the resolver reads: a preset (tokens + policies)
// and a template (a preset plus everything needed to render the scale).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PresetError;
use crate::shared::{
    DEFAULT_SAMPLE_RATE, MAX_GAP_SECONDS, MAX_OCTAVE, MAX_SAMPLE_RATE, MAX_SEMITONES, MIN_OCTAVE,
    MIN_SAMPLE_RATE, NoteId, NoteName, Symbol,
};

// Closed policy enums. json accepts any case, writes lower case.
macro_rules! policy_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "&'static str")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lower = s.trim().to_ascii_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|p| p.as_str() == lower)
                    .ok_or_else(|| {
                        let allowed: Vec<&str> = $name::ALL.iter().map(|p| p.as_str()).collect();
                        format!("unsupported {} `{}` (expected one of {})", stringify!($name), s, allowed.join(", "))
                    })
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, String> {
                value.parse()
            }
        }

        impl From<$name> for &'static str {
            fn from(p: $name) -> Self {
                p.as_str()
            }
        }
    };
}

policy_enum! {
    /// How one sample is picked out of a bucket holding several.
    SelectionPolicy { First => "first", Cycle => "cycle", Random => "random" } default First
}

policy_enum! {
    /// How a token list of the wrong length is reconciled with the note count.
    LengthPolicy { Pad => "pad", Truncate => "truncate", Error => "error" } default Pad
}

policy_enum! {
    /// What happens when a token's bucket is empty.
    MissingPolicy { Skip => "skip", Ask => "ask", Error => "error" } default Skip
}

policy_enum! {
    /// `normal` reads numbered samples (1.wav, 2.wav, ...), `custom` resolves tokens against tagged buckets.
    Mode { Normal => "normal", Custom => "custom" } default Custom
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: String,
    pub name: String,
    pub tokens: Vec<Symbol>, // duplicates allowed, order matters
    #[serde(default)]
    pub selection_policy: SelectionPolicy,
    #[serde(default)]
    pub length_policy: LengthPolicy,
    #[serde(default)]
    pub missing_policy: MissingPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Preset {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tokens: Vec<Symbol>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tokens,
            selection_policy: SelectionPolicy::default(),
            length_policy: LengthPolicy::default(),
            missing_policy: MissingPolicy::default(),
            seed: None,
        }
    }

    pub fn with_policies(mut self, selection: SelectionPolicy, length: LengthPolicy, missing: MissingPolicy) -> Self {
        self.selection_policy = selection;
        self.length_policy = length;
        self.missing_policy = missing;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        if self.id.trim().is_empty() {
            return Err(PresetError::EmptyId);
        }
        if self.tokens.is_empty() {
            return Err(PresetError::EmptyTokens(self.id.clone()));
        }
        Ok(())
    }

    pub fn token_string(&self) -> String {
        let names: Vec<&str> = self.tokens.iter().map(|t| t.as_str()).collect();
        format!("[{}]", names.join(", "))
    }
}

// Presets every install ships with
pub fn builtin_presets() -> Vec<Preset> {
    use Symbol::*;
    vec![
        Preset::new("standard_cycle", "Standard Cycle", vec![A, E, I, O, U, Ay])
            .with_policies(SelectionPolicy::Cycle, LengthPolicy::Pad, MissingPolicy::Skip),
        Preset::new("random_bounce", "Random Bounce", vec![A, O, A, U])
            .with_policies(SelectionPolicy::Random, LengthPolicy::Pad, MissingPolicy::Skip)
            .with_seed(Some(128)),
    ]
}

pub fn builtin_preset(id: &str) -> Option<Preset> {
    builtin_presets().into_iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleSettings {
    pub base_note: NoteName,
    pub octave: i32,
    pub semitone_count: usize,
    pub normalize: bool,
    pub gap: f64, // seconds of silence after each note in chromatic.wav
    pub mode: Mode,
    pub randomize: bool, // normal mode only
    pub pitched: bool,
    pub slice_markers: bool,
    pub sample_rate: u32,
}

impl Default for ScaleSettings {
    fn default() -> Self {
        Self {
            base_note: NoteName::C,
            octave: 3,
            semitone_count: 36,
            normalize: false,
            gap: 0.3,
            mode: Mode::Custom,
            randomize: false,
            pitched: true,
            slice_markers: false,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl ScaleSettings {
    pub fn base(&self) -> NoteId {
        NoteId::new(self.base_note, self.octave)
    }

    // note at a given position of the run
    pub fn note_at(&self, position: usize) -> NoteId {
        self.base().transpose(position as i32)
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&self.octave) {
            return Err(invalid("octave", format!("{} is outside {MIN_OCTAVE}..={MAX_OCTAVE}", self.octave)));
        }
        if !(1..=MAX_SEMITONES).contains(&self.semitone_count) {
            return Err(invalid(
                "semitone_count",
                format!("{} is outside 1..={MAX_SEMITONES}", self.semitone_count),
            ));
        }
        if !self.gap.is_finite() || !(0.0..=MAX_GAP_SECONDS).contains(&self.gap) {
            return Err(invalid("gap", format!("{} is outside 0..={MAX_GAP_SECONDS} seconds", self.gap)));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(invalid(
                "sample_rate",
                format!("{} is outside {MIN_SAMPLE_RATE}..={MAX_SAMPLE_RATE}", self.sample_rate),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> PresetError {
    PresetError::InvalidSetting { field, reason }
}

// A preset plus scale settings, saved and restored as one flat record.
// The preset's seed doubles as the template seed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(flatten)]
    pub preset: Preset,
    #[serde(flatten)]
    pub settings: ScaleSettings,
}

impl Template {
    pub fn new(preset: Preset, settings: ScaleSettings) -> Self {
        Self { preset, settings }
    }

    pub fn seed(&self) -> Option<u64> {
        self.preset.seed
    }

    pub fn validate(&self) -> Result<(), PresetError> {
        self.preset.validate()?;
        self.settings.validate()
    }
}

impl Default for Template {
    fn default() -> Self {
        let preset = builtin_presets().into_iter().next().unwrap_or_else(|| Preset::new("default", "Default", vec![Symbol::A]));
        Self { preset, settings: ScaleSettings::default() }
    }
}
