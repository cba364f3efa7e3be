//! Overdrive via a normalized tunable sigmoid.
//!
//! The transfer function for the positive half is
//!
//! ```text
//!   y(x) = (k·x - x) / (2k·|x| - k - 1)        0 <= x <= 1
//! ```
//!
//! mirrored for negative input and scaled by `1 - k`. At `k = 0` the curve is
//! the identity. Negative `k` bends it into a saturating knee: quiet input is
//! lifted towards full scale, which is the overdrive sound. Positive `k` bends
//! the other way and behaves like an expander. The `1 - k` factor makes the
//! peak follow the drive, so heavy drive is also louder; the bus compressor
//! downstream catches that.
//!
//! Input outside [-1, 1] is clamped first, matching a table-based waveshaper
//! whose table spans exactly that range.

/// Largest magnitude of `k` that keeps the curve well defined.
const MAX_DRIVE: f32 = 0.99;

#[derive(Debug, Clone, Copy)]
pub struct DriveCurve {
    k: f32,
}

impl DriveCurve {
    pub fn new(k: f32) -> Self {
        Self {
            k: k.clamp(-MAX_DRIVE, MAX_DRIVE),
        }
    }

    /// A curve that passes the signal through unchanged.
    pub fn clean() -> Self {
        Self::new(0.0)
    }

    pub fn drive(&self) -> f32 {
        self.k
    }

    pub fn set_drive(&mut self, k: f32) {
        self.k = k.clamp(-MAX_DRIVE, MAX_DRIVE);
    }

    pub fn is_clean(&self) -> bool {
        self.k == 0.0
    }

    #[inline]
    pub fn shape(&self, sample: f32) -> f32 {
        let k = self.k;
        let x = sample.clamp(-1.0, 1.0);
        let magnitude = x.abs();
        let y = (k * magnitude - magnitude) / (2.0 * k * magnitude - k - 1.0);
        y.copysign(x) * (1.0 - k)
    }

    /// Apply the curve to an entire buffer in place.
    pub fn process(&self, buffer: &mut [f32]) {
        if self.is_clean() {
            // identity, apart from the clamp
            for sample in buffer.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
            }
            return;
        }
        for sample in buffer.iter_mut() {
            *sample = self.shape(*sample);
        }
    }
}

impl Default for DriveCurve {
    fn default() -> Self {
        Self::clean()
    }
}
