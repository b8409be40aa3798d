use std::path::Path;

use super::sample_buffer::SampleBuffer;
use crate::error::TransformError;

/// The audio work done per note: load a sample, optionally normalize it,
/// then shift it by some semitones. Runs on the generation thread.
pub trait Transform: Send + Sync {
    fn load(&self, sample: &Path) -> Result<SampleBuffer, TransformError>;

    fn shift(&self, audio: SampleBuffer, semitones: f64) -> Result<SampleBuffer, TransformError>;

    fn normalize(&self, mut audio: SampleBuffer) -> Result<SampleBuffer, TransformError> {
        audio.peak_normalize();
        Ok(audio)
    }

    fn transform(&self, sample: &Path, semitones: f64) -> Result<SampleBuffer, TransformError> {
        let audio = self.load(sample)?;
        self.shift(audio, semitones)
    }
}

// Tape-style shift: resample so the pitch moves by 2^(st/12). Duration moves with it.
#[derive(Clone, Copy, Debug)]
pub struct Varispeed {
    sample_rate: u32,
}

impl Varispeed {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn ratio(semitones: f64) -> f64 {
        2f64.powf(semitones / 12.0)
    }
}

impl Transform for Varispeed {
    fn load(&self, sample: &Path) -> Result<SampleBuffer, TransformError> {
        SampleBuffer::load_wav(sample, self.sample_rate)
    }

    fn shift(&self, audio: SampleBuffer, semitones: f64) -> Result<SampleBuffer, TransformError> {
        Ok(audio.varispeed(Self::ratio(semitones)))
    }
}
