//! Feed-forward soft-knee compressor for the master bus.
//!
//! A peak follower tracks the input level with separate attack and release
//! times. The static curve works in dB:
//!
//! ```text
//!   below  threshold - knee/2   no reduction
//!   inside the knee             quadratic blend into the ratio
//!   above  threshold + knee/2   (level - threshold) · (1 - 1/ratio)
//! ```
//!
//! The bus defaults (threshold -6 dB, 40 dB knee, 12:1, 100 ms attack and
//! release) act as a gentle safety limiter: a single voice passes almost
//! untouched, a full chord with overdrive is held near full scale.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorParams {
    pub threshold_db: f32,
    pub knee_db: f32,
    pub ratio: f32,
    pub attack: f32,
    pub release: f32,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            threshold_db: -6.0,
            knee_db: 40.0,
            ratio: 12.0,
            attack: 0.1,
            release: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Compressor {
    params: CompressorParams,
    sample_rate: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

#[inline]
fn lin_to_db(linear: f32) -> f32 {
    20.0 * linear.max(1.0e-6).log10()
}

#[inline]
fn db_to_lin(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

fn smoothing_coeff(time: f32, sample_rate: f32) -> f32 {
    1.0 - (-1.0 / (time.max(1.0e-4) * sample_rate)).exp()
}

impl Compressor {
    pub fn new(sample_rate: f32, params: CompressorParams) -> Self {
        Self {
            params,
            sample_rate,
            attack_coeff: smoothing_coeff(params.attack, sample_rate),
            release_coeff: smoothing_coeff(params.release, sample_rate),
            envelope: 0.0,
        }
    }

    pub fn params(&self) -> CompressorParams {
        self.params
    }

    /// Gain reduction in dB (positive number) for a given input level.
    pub fn gain_reduction_db(&self, level_db: f32) -> f32 {
        let CompressorParams {
            threshold_db,
            knee_db,
            ratio,
            ..
        } = self.params;
        let slope = 1.0 - 1.0 / ratio.max(1.0);
        let over = level_db - threshold_db;

        if knee_db > 0.0 && over.abs() <= knee_db / 2.0 {
            let x = over + knee_db / 2.0;
            slope * x * x / (2.0 * knee_db)
        } else if over > 0.0 {
            slope * over
        } else {
            0.0
        }
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32) -> f32 {
        let rectified = input.abs();
        let coeff = if rectified > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope += (rectified - self.envelope) * coeff;

        let reduction = self.gain_reduction_db(lin_to_db(self.envelope));
        input * db_to_lin(-reduction)
    }

    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}
