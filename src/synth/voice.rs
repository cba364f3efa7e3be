use std::time::Duration;

use crate::dsp::{
    envelope::Envelope,
    oscillator::{OscillatorBlock, OscillatorWaveform},
};

/// Frequency ratio of the chorus partner oscillator.
pub const DEFAULT_DETUNE: f32 = 1.012;
/// Time constant of a key press.
pub const DEFAULT_ATTACK: f32 = 0.01;
/// Time constant of a key release.
pub const DEFAULT_DECAY: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,       // Silent, free to be retuned
    Attacking,  // Gain heading up towards the velocity
    Sustaining, // Gain settled at the velocity
    Releasing,  // Gain heading down to silence
}

/// Velocities above 1 are MIDI values.
pub(crate) fn normalize_velocity(velocity: f32) -> f32 {
    if velocity > 1.0 {
        velocity / 127.0
    } else {
        velocity.max(0.0)
    }
}

/// One note's worth of sound: a main oscillator plus a detuned partner
/// that only speaks when chorus is on, each behind its own gain envelope.
///
/// A voice is either *sustained* (held by a key until `stop`) or *timed*
/// (started by `play` and released after a countdown). A timed voice never
/// interrupts a sustained one.
pub struct Voice {
    main: OscillatorBlock,
    partner: OscillatorBlock,
    main_gain: Envelope,
    partner_gain: Envelope,

    sample_rate: f32,
    base: f32,
    frequency: f32,
    detune: f32,
    chorus: bool,
    sustained: bool,
    /// Samples left before a timed note releases itself
    hold: Option<u64>,
}

impl Voice {
    pub fn new(sample_rate: f32, detune: f32) -> Self {
        Self {
            main: OscillatorBlock::new(OscillatorWaveform::Saw),
            partner: OscillatorBlock::new(OscillatorWaveform::Saw),
            main_gain: Envelope::new(),
            partner_gain: Envelope::new(),
            sample_rate,
            base: 1.0,
            frequency: 1.0,
            detune,
            chorus: false,
            sustained: false,
            hold: None,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.base = frequency;
        self.frequency = frequency;
    }

    /// Bend away from the base frequency: `ratio` 0 is the base, 1 is `frequency`.
    pub fn tune_towards(&mut self, frequency: f32, ratio: f32) {
        let ratio = ratio.clamp(0.0, 1.0);
        self.frequency = (1.0 - ratio) * self.base + ratio * frequency;
    }

    /// Begin a held note. Cancels a pending timed release.
    pub fn start(&mut self, velocity: f32, attack: f32) {
        self.sustained = true;
        self.hold = None;
        self.enable(normalize_velocity(velocity), attack, 0);
    }

    pub fn stop(&mut self, decay: f32) {
        self.disable(decay);
        self.sustained = false;
    }

    /// Begin a timed note. Returns false, doing nothing, while the voice is held.
    pub fn play(&mut self, duration: Duration, velocity: f32, delay: Duration) -> bool {
        if self.sustained {
            return false;
        }
        let delay_samples = self.samples(delay);
        self.enable(normalize_velocity(velocity), DEFAULT_ATTACK, delay_samples as u32);
        self.hold = Some(delay_samples + self.samples(duration));
        true
    }

    fn enable(&mut self, velocity: f32, attack: f32, delay_samples: u32) {
        if self.chorus {
            self.main_gain
                .set_target_after(velocity / 2.0, attack, delay_samples);
            self.partner_gain
                .set_target_after(velocity / 2.0, attack, delay_samples);
        } else {
            self.main_gain.set_target_after(velocity, attack, delay_samples);
        }
    }

    fn disable(&mut self, decay: f32) {
        self.hold = None;
        self.main_gain.set_target(0.0, decay);
        self.partner_gain.set_target(0.0, decay);
    }

    /// Flip chorus, splitting or merging the current level between oscillators.
    pub fn toggle_chorus(&mut self) {
        self.chorus = !self.chorus;
        if self.main_gain.level() <= 0.0 && self.main_gain.target() <= 0.0 {
            return;
        }
        if self.chorus {
            self.main_gain.rescale(0.5);
            self.partner_gain = self.main_gain.clone();
        } else {
            self.main_gain.rescale(2.0);
            self.partner_gain.set_value(0.0);
        }
    }

    /// Mix this voice into `out`. `vibrato` holds one frequency ratio per
    /// sample for the main oscillator.
    ///
    /// Returns true when a timed note released itself during the block.
    pub fn render_add(&mut self, out: &mut [f32], vibrato: &[f32]) -> bool {
        let sample_rate = self.sample_rate;
        let partner_frequency = self.frequency * self.detune;
        let mut timed_out = false;

        for (sample, ratio) in out.iter_mut().zip(vibrato) {
            if let Some(left) = self.hold.as_mut() {
                if *left == 0 {
                    self.disable(DEFAULT_DECAY);
                    timed_out = true;
                } else {
                    *left -= 1;
                }
            }

            let main = self.main.next_sample(self.frequency * ratio, sample_rate);
            let partner = self.partner.next_sample(partner_frequency, sample_rate);
            *sample += main * self.main_gain.next_sample(sample_rate)
                + partner * self.partner_gain.next_sample(sample_rate);
        }

        timed_out
    }

    pub fn state(&self) -> VoiceState {
        let gain = &self.main_gain;
        if gain.target() > 0.0 {
            if gain.has_settled() {
                VoiceState::Sustaining
            } else {
                VoiceState::Attacking
            }
        } else if gain.level() > 0.0 || self.partner_gain.level() > 0.0 {
            VoiceState::Releasing
        } else {
            VoiceState::Idle
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state() == VoiceState::Idle && self.hold.is_none()
    }

    pub fn is_sustained(&self) -> bool {
        self.sustained
    }

    pub fn has_chorus(&self) -> bool {
        self.chorus
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Current gain of both oscillators combined.
    pub fn level(&self) -> f32 {
        self.main_gain.level() + self.partner_gain.level()
    }

    fn samples(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * self.sample_rate as f64).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn render(voice: &mut Voice, samples: usize) -> bool {
        let mut out = vec![0.0; samples];
        let vibrato = vec![1.0; samples];
        voice.render_add(&mut out, &vibrato)
    }

    #[test]
    fn start_attacks_then_sustains() {
        let mut voice = Voice::new(SAMPLE_RATE, DEFAULT_DETUNE);
        voice.set_frequency(110.0);
        assert_eq!(voice.state(), VoiceState::Idle);

        voice.start(127.0, DEFAULT_ATTACK);
        assert_eq!(voice.state(), VoiceState::Attacking);

        render(&mut voice, 200);
        assert_eq!(voice.state(), VoiceState::Sustaining);
        assert!((voice.level() - 1.0).abs() < 0.01);
    }

    #[test]
    fn stop_releases_to_idle() {
        let mut voice = Voice::new(SAMPLE_RATE, DEFAULT_DETUNE);
        voice.start(0.8, DEFAULT_ATTACK);
        render(&mut voice, 100);

        voice.stop(DEFAULT_DECAY);
        assert_eq!(voice.state(), VoiceState::Releasing);
        assert!(!voice.is_sustained());

        render(&mut voice, 300);
        assert!(voice.is_idle());
    }

    #[test]
    fn timed_note_releases_itself() {
        let mut voice = Voice::new(SAMPLE_RATE, DEFAULT_DETUNE);
        assert!(voice.play(Duration::from_millis(50), 64.0, Duration::ZERO));

        assert!(!render(&mut voice, 40));
        assert!(render(&mut voice, 20));
        assert_eq!(voice.state(), VoiceState::Releasing);
    }

    #[test]
    fn timed_note_does_not_interrupt_held_note() {
        let mut voice = Voice::new(SAMPLE_RATE, DEFAULT_DETUNE);
        voice.start(0.5, DEFAULT_ATTACK);
        assert!(!voice.play(Duration::from_millis(50), 1.0, Duration::ZERO));
        render(&mut voice, 200);
        assert!((voice.level() - 0.5).abs() < 0.01);
    }

    #[test]
    fn chorus_splits_level_between_oscillators() {
        let mut voice = Voice::new(SAMPLE_RATE, DEFAULT_DETUNE);
        voice.start(0.8, DEFAULT_ATTACK);
        render(&mut voice, 200);

        voice.toggle_chorus();
        assert!(voice.has_chorus());
        assert!((voice.level() - 0.8).abs() < 0.01);

        voice.toggle_chorus();
        assert!((voice.level() - 0.8).abs() < 0.01);
    }

    #[test]
    fn pitch_bend_interpolates_from_base() {
        let mut voice = Voice::new(SAMPLE_RATE, DEFAULT_DETUNE);
        voice.set_frequency(440.0);
        voice.tune_towards(880.0, 0.25);
        assert_eq!(voice.frequency(), 550.0);

        voice.tune_towards(880.0, 0.0);
        assert_eq!(voice.frequency(), 440.0);
    }
}
