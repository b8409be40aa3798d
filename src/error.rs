use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::preset::LengthPolicy;
use crate::shared::Symbol;

/// Scanning a sample folder failed as a whole.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot read sample folder {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no sequential samples found in {0} (expected 1.wav, 2.wav, ...)")]
    NoSequentialSamples(PathBuf),
}

/// Resolution of a token sequence into assignments was aborted.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("preset has no tokens")]
    EmptyTokens,
    #[error("{tokens} token(s) cannot satisfy {required} note(s) under the {policy} length policy")]
    LengthMismatch {
        policy: LengthPolicy,
        tokens: usize,
        required: usize,
    },
    #[error("no samples tagged {symbol} (needed at position {position})")]
    MissingSymbol { symbol: Symbol, position: usize },
    #[error("resolution aborted at position {position} (missing {symbol})")]
    Aborted { symbol: Symbol, position: usize },
}

impl ResolveError {
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::EmptyTokens => "empty_tokens",
            ResolveError::LengthMismatch { .. } => "length_mismatch",
            ResolveError::MissingSymbol { .. } => "missing_symbol",
            ResolveError::Aborted { .. } => "aborted",
        }
    }
}

/// A preset or template value is invalid or could not be loaded / saved.
#[derive(Debug, Error)]
pub enum PresetError {
    #[error("preset `{0}` has an empty token list")]
    EmptyTokens(String),
    #[error("preset id must not be empty")]
    EmptyId,
    #[error("invalid setting `{field}`: {reason}")]
    InvalidSetting { field: &'static str, reason: String },
    #[error("no preset named `{0}`")]
    NotFound(String),
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed preset file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One note failed to transform; recorded in the run report, the run goes on.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("unsupported sample format in {path}: {detail}")]
    Unsupported { path: PathBuf, detail: String },
    #[error("{0} holds no audio")]
    Empty(PathBuf),
}

/// The generation run itself could not proceed.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("a generation run is already active for this session")]
    AlreadyRunning,
    #[error("cannot write output {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode output {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("cannot start generation thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("generation thread panicked")]
    WorkerPanicked,
}

impl GenerationError {
    // hound folds io failures into its own error type; surface them as io
    pub(crate) fn from_hound(path: PathBuf, err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(source) => GenerationError::Io { path, source },
            other => GenerationError::Encode { path, source: other },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Scan,
    Preset,
    Resolve,
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Scan => "scan",
            Stage::Preset => "preset",
            Stage::Resolve => "resolve",
            Stage::Generate => "generate",
        })
    }
}

/// Any fatal error, tagged with the stage it came from.
#[derive(Debug, Error)]
pub enum Error {
    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("preset rejected: {0}")]
    Preset(#[from] PresetError),
    #[error("resolution failed [{code}]: {0}", code = .0.code())]
    Resolve(#[from] ResolveError),
    #[error("generation failed: {0}")]
    Generate(#[from] GenerationError),
}

impl Error {
    pub fn stage(&self) -> Stage {
        match self {
            Error::Scan(_) => Stage::Scan,
            Error::Preset(_) => Stage::Preset,
            Error::Resolve(_) => Stage::Resolve,
            Error::Generate(_) => Stage::Generate,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_errors_carry_stable_codes() {
        let err = ResolveError::LengthMismatch { policy: LengthPolicy::Truncate, tokens: 2, required: 5 };
        assert_eq!(err.code(), "length_mismatch");
        let wrapped = Error::from(err);
        assert_eq!(wrapped.stage(), Stage::Resolve);
        assert!(wrapped.to_string().contains("[length_mismatch]"));
        assert!(wrapped.to_string().contains("truncate"));
    }

    #[test]
    fn hound_io_errors_become_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = GenerationError::from_hound(PathBuf::from("/out/x.wav"), hound::Error::IoError(io));
        assert!(matches!(err, GenerationError::Io { .. }));
    }
}
