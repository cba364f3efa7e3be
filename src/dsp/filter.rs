use std::f32::consts::TAU;

/*
Peaking (Bell) Biquad
=====================

Each equalizer band is one peaking filter: it boosts or cuts a bell-shaped
region around a center frequency and leaves the rest of the spectrum alone.

| parameter | meaning                                          |
| --------- | ------------------------------------------------ |
| center    | frequency at the top of the bell (Hz)            |
| q         | center / bandwidth; higher = narrower bell       |
| gain_db   | boost (> 0) or cut (< 0) at the center, in dB    |

Coefficients follow Robert Bristow-Johnson's Audio EQ Cookbook:

    A     = 10^(gain_db / 40)
    w0    = 2π · center / sample_rate
    alpha = sin(w0) / (2 · q)

    b0 = 1 + alpha·A     a0 = 1 + alpha/A
    b1 = -2·cos(w0)      a1 = -2·cos(w0)
    b2 = 1 - alpha·A     a2 = 1 - alpha/A

At 0 dB, A = 1 and the numerator equals the denominator: the filter is an
exact passthrough, so a flat EQ costs nothing audible.

The difference equation is run in transposed direct form II, which keeps
two state variables instead of four.
*/

#[derive(Debug, Clone)]
pub struct PeakingFilter {
    center: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,

    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    z1: f32,
    z2: f32,
}

impl PeakingFilter {
    pub fn new(sample_rate: f32, center: f32, q: f32) -> Self {
        let mut filter = Self {
            center,
            q: q.max(0.01),
            gain_db: 0.0,
            sample_rate,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    /// Build a band spanning `low..high` Hz: centered between them with
    /// `q = center / width`.
    pub fn for_band(sample_rate: f32, low: f32, high: f32) -> Self {
        let center = (low + high) / 2.0;
        let width = (high - low).max(1.0);
        Self::new(sample_rate, center, center / width)
    }

    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain_db = gain_db;
        self.update_coefficients();
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    pub fn center(&self) -> f32 {
        self.center
    }

    pub fn q(&self) -> f32 {
        self.q
    }

    fn update_coefficients(&mut self) {
        let center = self.center.clamp(1.0, self.sample_rate * 0.49);
        let a = 10.0_f32.powf(self.gain_db / 40.0);
        let w0 = TAU * center / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * self.q);

        let a0 = 1.0 + alpha / a;
        self.b0 = (1.0 + alpha * a) / a0;
        self.b1 = (-2.0 * cos_w0) / a0;
        self.b2 = (1.0 - alpha * a) / a0;
        self.a1 = (-2.0 * cos_w0) / a0;
        self.a2 = (1.0 - alpha / a) / a0;
    }

    #[inline]
    pub fn next_sample(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample);
        }
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
