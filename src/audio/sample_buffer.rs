use std::path::Path;

use crate::error::TransformError;

// Mono audio at a known rate; everything in a run is rendered at one rate
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    pub data: Vec<f32>,
    pub sample_rate: u32,
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

impl SampleBuffer {
    pub fn new(data: Vec<f32>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    pub fn silence(seconds: f64, sample_rate: u32) -> Self {
        let len = (seconds.max(0.0) * sample_rate as f64).round() as usize;
        Self { data: vec![0.0; len], sample_rate }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Load a WAV from disk, downmix to mono and bring it to `target_rate`
    pub fn load_wav(path: &Path, target_rate: u32) -> Result<Self, TransformError> {
        let decode = |source| TransformError::Decode { path: path.to_path_buf(), source };
        let mut reader = hound::WavReader::open(path).map_err(decode)?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(TransformError::Unsupported { path: path.to_path_buf(), detail: "sample rate of 0 Hz".into() });
        }
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode)?,
            hound::SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(TransformError::Unsupported {
                        path: path.to_path_buf(),
                        detail: format!("{}-bit integer samples", spec.bits_per_sample),
                    });
                }
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(decode)?
            }
        };

        // average the channels into one
        let mono: Vec<f32> = if channels == 1 {
            samples
        } else {
            samples
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };
        if mono.is_empty() {
            return Err(TransformError::Empty(path.to_path_buf()));
        }

        let buffer = Self { data: mono, sample_rate: spec.sample_rate };
        Ok(buffer.resampled(target_rate))
    }

    // 16-bit PCM mono
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &s in &self.data {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)?;
        }
        writer.finalize()
    }

    pub fn resampled(self, target_rate: u32) -> Self {
        if self.sample_rate == target_rate || target_rate == 0 || self.sample_rate == 0 {
            return self;
        }
        let step = self.sample_rate as f64 / target_rate as f64;
        Self { data: read_at_rate(&self.data, step), sample_rate: target_rate }
    }

    // Play the buffer back `step` times faster, keeping the sample rate.
    // step 2.0 = an octave up and half as long.
    pub fn varispeed(self, step: f64) -> Self {
        if step <= 0.0 || !step.is_finite() || (step - 1.0).abs() < 1e-9 {
            return self;
        }
        Self { data: read_at_rate(&self.data, step), sample_rate: self.sample_rate }
    }

    pub fn peak(&self) -> f32 {
        self.data.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    pub fn peak_normalize(&mut self) {
        let peak = self.peak();
        if peak > 0.0 {
            for s in &mut self.data {
                *s /= peak;
            }
        }
    }

    pub fn append(&mut self, other: &SampleBuffer) {
        self.data.extend_from_slice(&other.data);
    }
}

// Linear-interpolated read of `frames`, advancing `step` source frames per output frame
fn read_at_rate(frames: &[f32], step: f64) -> Vec<f32> {
    if frames.is_empty() || !step.is_finite() || step <= 0.0 {
        return frames.to_vec();
    }
    let out_len = ((frames.len() as f64) / step).ceil().max(1.0) as usize;
    let mut out = Vec::with_capacity(out_len);
    let last = frames.len() - 1;

    for i in 0..out_len {
        let src_pos = i as f64 * step; // ex. 3.7
        let idx = src_pos.floor() as usize; // ex. 3
        let frac = (src_pos - idx as f64) as f32; // ex. 0.7
        if idx >= last {
            out.push(frames[last]);
        } else {
            out.push(lerp(frames[idx], frames[idx + 1], frac));
        }
    }
    out
}
