use std::f32::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Phase-Accumulator Oscillator
============================

Each voice owns two of these (the main tone and its detuned chorus partner),
and the voice pool owns one more as its vibrato LFO. All three share the
same math:

    phase    in [0, 1), advanced by frequency / sample_rate per sample
    sine     sin(2π · phase)
    saw      2 · phase - 1                 (rising ramp)
    square   +1 for the first half cycle, -1 for the second
    triangle 1 - 4 · |phase - 0.5|         (starts at -1, peaks at 0.5)

The frequency is passed per sample instead of stored, so pitch bend and
vibrato can move it without the oscillator knowing about either.

The waveforms are naive (not band-limited). At the pitches a keyboard
practice tool plays this aliasing stays well under the mix.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorWaveform {
    Sine,
    #[default]
    Saw,
    Square,
    Triangle,
}

#[derive(Debug, Clone)]
pub struct OscillatorBlock {
    waveform: OscillatorWaveform,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: OscillatorWaveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn sine() -> Self {
        Self::new(OscillatorWaveform::Sine)
    }

    pub fn sawtooth() -> Self {
        Self::new(OscillatorWaveform::Saw)
    }

    pub fn square() -> Self {
        Self::new(OscillatorWaveform::Square)
    }

    pub fn triangle() -> Self {
        Self::new(OscillatorWaveform::Triangle)
    }

    pub fn waveform(&self) -> OscillatorWaveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: OscillatorWaveform) {
        self.waveform = waveform;
    }

    /// Produce one sample and advance the phase.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let phase = self.phase;
        let value = match self.waveform {
            OscillatorWaveform::Sine => (TAU * phase).sin(),
            OscillatorWaveform::Saw => 2.0 * phase - 1.0,
            OscillatorWaveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            OscillatorWaveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        };

        self.phase += frequency / sample_rate;
        self.phase -= self.phase.floor();

        value
    }

    /// Fill a buffer at a fixed frequency.
    pub fn render(&mut self, out: &mut [f32], frequency: f32, sample_rate: f32) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(frequency, sample_rate);
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

impl Default for OscillatorBlock {
    fn default() -> Self {
        Self::new(OscillatorWaveform::default())
    }
}
