use crate::dsp::{convolution::Convolver, distortion::DriveCurve};

/// Reverb and overdrive in series.
///
/// ```text
///   reverb on:   input ──▶ convolver ──▶ drive ──▶ output
///   reverb off:  input ──────────────────▶ drive ──▶ output
/// ```
///
/// The reverb is fully wet: with an impulse loaded, only the convolved
/// signal continues down the chain.
#[derive(Debug, Default)]
pub struct EffectRack {
    reverb: Option<Box<Convolver>>,
    drive: DriveCurve,
}

impl EffectRack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a reverb, or disable it with `None`. Returns the previous one.
    pub fn set_reverb(&mut self, reverb: Option<Box<Convolver>>) -> Option<Box<Convolver>> {
        std::mem::replace(&mut self.reverb, reverb)
    }

    pub fn reverb_enabled(&self) -> bool {
        self.reverb.is_some()
    }

    pub fn set_overdrive(&mut self, k: f32) {
        self.drive.set_drive(k);
    }

    pub fn overdrive(&self) -> f32 {
        self.drive.drive()
    }

    pub fn process(&mut self, buffer: &mut [f32]) {
        if let Some(reverb) = self.reverb.as_mut() {
            reverb.process(buffer);
        }
        self.drive.process(buffer);
    }
}
