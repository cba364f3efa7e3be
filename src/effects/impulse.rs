use std::{fmt, path::Path};

use log::info;

use crate::dsp::convolution::Convolver;

/// Scaling applied after equal-power normalization, so a typical room
/// impulse sits at roughly the level of the dry signal.
const GAIN_CALIBRATION: f32 = 0.00125;
/// Floor for the measured power, so a near-silent file is not blown up.
const MIN_POWER: f32 = 0.000125;

/// A mono, normalized impulse response at a fixed sample rate
#[derive(Debug, Clone)]
pub struct ImpulseResponse {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl ImpulseResponse {
    /// Read a WAV file, mix it down to mono and resample it to `sample_rate`.
    pub fn load<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self, ImpulseError> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples: Result<Vec<f32>, _> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let max_value = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_value))
                    .collect()
            }
        };
        let interleaved = samples?;

        let channels = spec.channels.max(1) as usize;
        let mono: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        let impulse = Self::from_samples(mono, spec.sample_rate)?.resampled(sample_rate);
        info!(
            "loaded impulse {} ({} samples at {} Hz)",
            path.display(),
            impulse.samples.len(),
            impulse.sample_rate
        );
        Ok(impulse)
    }

    /// Build from mono samples, normalizing their power.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Result<Self, ImpulseError> {
        if samples.is_empty() || sample_rate == 0 {
            return Err(ImpulseError::Empty);
        }
        let mut impulse = Self {
            samples,
            sample_rate,
        };
        impulse.normalize();
        Ok(impulse)
    }

    fn normalize(&mut self) {
        let power = (self.samples.iter().map(|s| s * s).sum::<f32>() / self.samples.len() as f32)
            .sqrt()
            .max(MIN_POWER);
        let scale = GAIN_CALIBRATION / power;
        for sample in &mut self.samples {
            *sample *= scale;
        }
    }

    /// Linear-interpolation resample to `sample_rate`.
    pub fn resampled(self, sample_rate: u32) -> Self {
        if sample_rate == self.sample_rate || sample_rate == 0 {
            return self;
        }
        let ratio = self.sample_rate as f64 / sample_rate as f64;
        let len = ((self.samples.len() as f64) / ratio).ceil().max(1.0) as usize;
        let last = self.samples.len() - 1;

        let samples = (0..len)
            .map(|i| {
                let position = i as f64 * ratio;
                let index = (position.floor() as usize).min(last);
                let next = (index + 1).min(last);
                let t = (position - index as f64) as f32;
                self.samples[index] * (1.0 - t) + self.samples[next] * t
            })
            .collect();

        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// Plan a convolver for this impulse. Allocates; call off the audio thread.
    pub fn convolver(&self) -> Box<Convolver> {
        Box::new(Convolver::new(&self.samples))
    }
}

/// Errors from loading an impulse response
#[derive(Debug)]
pub enum ImpulseError {
    /// The file could not be opened or decoded
    Read(hound::Error),
    /// The file holds no audio
    Empty,
}

impl fmt::Display for ImpulseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpulseError::Read(err) => write!(f, "cannot read impulse response: {}", err),
            ImpulseError::Empty => write!(f, "impulse response contains no samples"),
        }
    }
}

impl std::error::Error for ImpulseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImpulseError::Read(err) => Some(err),
            ImpulseError::Empty => None,
        }
    }
}

impl From<hound::Error> for ImpulseError {
    fn from(err: hound::Error) -> Self {
        ImpulseError::Read(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_error() {
        let result = ImpulseResponse::load("does/not/exist.wav", 48_000);
        assert!(matches!(result, Err(ImpulseError::Read(_))));
    }

    #[test]
    fn empty_samples_are_rejected() {
        assert!(matches!(
            ImpulseResponse::from_samples(Vec::new(), 48_000),
            Err(ImpulseError::Empty)
        ));
    }

    #[test]
    fn normalization_is_independent_of_input_level() {
        let quiet = ImpulseResponse::from_samples(vec![0.01, 0.005, 0.0025], 48_000).unwrap();
        let loud = ImpulseResponse::from_samples(vec![0.8, 0.4, 0.2], 48_000).unwrap();
        for (a, b) in quiet.samples().iter().zip(loud.samples()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn resampling_keeps_duration() {
        let impulse = ImpulseResponse::from_samples(vec![1.0; 441], 44_100)
            .unwrap()
            .resampled(48_000);
        assert_eq!(impulse.sample_rate(), 48_000);
        assert!((impulse.duration_secs() - 0.01).abs() < 1e-3);
    }

    #[test]
    fn reads_stereo_wav_as_mono() {
        let path = std::env::temp_dir().join("keyroll-impulse-test.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..480 {
            let value = if i % 2 == 0 { 16_000 } else { -16_000 };
            writer.write_sample(value as i16).unwrap();
            writer.write_sample(value as i16).unwrap();
        }
        writer.finalize().unwrap();

        let impulse = ImpulseResponse::load(&path, 48_000).unwrap();
        assert_eq!(impulse.samples().len(), 480);
        let _ = std::fs::remove_file(path);
    }
}
