/*
Target-Chasing Envelope
=======================

The practice synth never describes a note as a fixed ADSR shape. A key press
asks the gain to head towards the velocity, a key release asks it to head
towards zero, and the gain moves there exponentially with a time constant.
This is the classic "set target at time" automation curve.

Vocabulary
----------

  level          The envelope's current output value (0.0 to 1.0).

  target         Where the level is heading.

  time constant  Seconds for the remaining distance to shrink to 1/e (~37%).
                 After 5 time constants the level is within 1% of target.

  delay          Samples to wait before the ramp starts. Timed notes use it
                 to start "a little in the future" without a second timer.


The Math
--------

Per sample:

    level += (target - level) * coeff
    coeff  = 1 - exp(-1 / (time_constant * sample_rate))

The coefficient only depends on the time constant and sample rate, so it is
cached and recomputed when either changes.

    Level
      v ┤     ╭──────────────╮
        │    ╱                ╲
        │   │                  ╲
      0 ┼───╯                   ╰─────── Time
          set_target(v)      set_target(0)

An exponential approach never reaches its target exactly. When heading to
zero, levels below SILENCE snap to 0.0 so voices can be recycled. When
heading anywhere else, `has_settled` reports the point where the level is
within SETTLED of the target.
*/

use crate::MIN_TIME;

/// Level below which a zero-bound envelope counts as silent.
pub const SILENCE: f32 = 1.0e-4;
/// Distance from the target at which the ramp counts as finished.
pub const SETTLED: f32 = 1.0e-3;

#[derive(Debug, Clone)]
pub struct Envelope {
    level: f32,
    target: f32,
    time_constant: f32,
    delay_samples: u32,

    // Cached per-sample coefficient and the inputs it was computed from
    coeff: f32,
    coeff_sample_rate: f32,
    coeff_time_constant: f32,
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            level: 0.0,
            target: 0.0,
            time_constant: 0.01,
            delay_samples: 0,
            coeff: 0.0,
            coeff_sample_rate: 0.0,
            coeff_time_constant: 0.0,
        }
    }

    /// Start moving towards `target` now.
    pub fn set_target(&mut self, target: f32, time_constant: f32) {
        self.set_target_after(target, time_constant, 0);
    }

    /// Start moving towards `target` after `delay_samples` samples.
    pub fn set_target_after(&mut self, target: f32, time_constant: f32, delay_samples: u32) {
        self.target = target.max(0.0);
        self.time_constant = time_constant.max(MIN_TIME);
        self.delay_samples = delay_samples;
    }

    /// Jump straight to a value, cancelling any pending ramp.
    pub fn set_value(&mut self, value: f32) {
        let value = value.max(0.0);
        self.level = value;
        self.target = value;
        self.delay_samples = 0;
    }

    /// Scale both the current level and the target, keeping any pending ramp.
    pub fn rescale(&mut self, factor: f32) {
        let factor = factor.max(0.0);
        self.level *= factor;
        self.target *= factor;
    }

    /// Advance by one sample and return the new level.
    #[inline]
    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        if self.delay_samples > 0 {
            self.delay_samples -= 1;
            return self.level;
        }

        if self.coeff_sample_rate != sample_rate || self.coeff_time_constant != self.time_constant
        {
            self.coeff = 1.0 - (-1.0 / (self.time_constant * sample_rate)).exp();
            self.coeff_sample_rate = sample_rate;
            self.coeff_time_constant = self.time_constant;
        }

        self.level += (self.target - self.level) * self.coeff;

        if self.target == 0.0 && self.level < SILENCE {
            self.level = 0.0;
        }

        self.level
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample(sample_rate);
        }
    }

    /// True once a zero-bound envelope has died away.
    pub fn is_silent(&self) -> bool {
        self.target == 0.0 && self.level == 0.0
    }

    /// True when no delay is pending and the level sits at the target.
    pub fn has_settled(&self) -> bool {
        self.delay_samples == 0 && (self.level - self.target).abs() <= SETTLED
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
        self.target = 0.0;
        self.delay_samples = 0;
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 1_000.0;

    fn render_samples(env: &mut Envelope, samples: usize) {
        for _ in 0..samples {
            env.next_sample(SAMPLE_RATE);
        }
    }

    #[test]
    fn one_time_constant_covers_most_of_the_distance() {
        let mut env = Envelope::new();
        env.set_target(1.0, 0.1);
        render_samples(&mut env, 100);

        // 1 - 1/e ≈ 0.632
        assert!((env.level() - 0.632).abs() < 0.01, "level {}", env.level());
    }

    #[test]
    fn attack_settles_on_target() {
        let mut env = Envelope::new();
        env.set_target(0.8, 0.01);
        render_samples(&mut env, 100);

        assert!(env.has_settled());
        assert!((env.level() - 0.8).abs() <= SETTLED);
    }

    #[test]
    fn release_reaches_silence() {
        let mut env = Envelope::new();
        env.set_value(0.7);
        env.set_target(0.0, 0.01);
        render_samples(&mut env, 200);

        assert!(env.is_silent());
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn rescale_keeps_ramp_heading_to_scaled_target() {
        let mut env = Envelope::new();
        env.set_target(0.8, 0.01);
        render_samples(&mut env, 5);
        let before = env.level();

        env.rescale(0.5);
        assert!((env.level() - before / 2.0).abs() < 1e-6);
        assert_eq!(env.target(), 0.4);

        render_samples(&mut env, 100);
        assert!((env.level() - 0.4).abs() <= SETTLED);
    }

    #[test]
    fn delay_holds_level_before_ramping() {
        let mut env = Envelope::new();
        env.set_target_after(1.0, 0.01, 50);
        render_samples(&mut env, 50);
        assert_eq!(env.level(), 0.0);

        render_samples(&mut env, 1);
        assert!(env.level() > 0.0);
    }
}
