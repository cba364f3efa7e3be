use std::time::Duration;

use log::debug;

use crate::{
    dsp::{envelope::Envelope, oscillator::OscillatorBlock},
    graph::node::{GraphNode, RenderCtx},
    synth::voice::{Voice, VoiceState, DEFAULT_DECAY, DEFAULT_DETUNE},
    MAX_BLOCK_SIZE,
};

/*
Voice Pool
==========

A fixed set of voices handed out round-robin:

    allocate ──▶ [ v0 v1 v2 ... v11 ] ──▶ wraps around
                   ^ cursor

The cursor always points at the voice that was allocated longest ago. If that
voice is still held by a key it is stopped first (stolen), so a thirteenth
note on a twelve-voice pool cuts off the oldest one.

The pool keeps a separate *active* list: a voice joins it when it starts
sounding and leaves it the moment it is released. The output is scaled by

    gain = 1 / sqrt(max(active, 1))

so a chord is not twelve times louder than a single note. Releasing voices
no longer count, which lets the tail of a released chord swell slightly as
the remaining notes take over the mix.

Vibrato comes from one shared sine LFO. Its depth (0..1) maps onto up to
MAX_VIBRATO_CENTS of pitch deviation on every voice's main oscillator.
Depth and rate glide towards new values with a 20 ms time constant so the
mod wheel never zips.
*/

/// Vibrato deviation at full LFO strength.
pub const MAX_VIBRATO_CENTS: f32 = 100.0;
const LFO_SMOOTHING: f32 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub(crate) usize);

impl VoiceId {
    pub fn index(&self) -> usize {
        self.0
    }
}

pub struct VoicePool {
    voices: Vec<Voice>,
    cursor: usize,
    active: Vec<VoiceId>,
    gain: f32,
    chorus: bool,
    sample_rate: f32,

    lfo: OscillatorBlock,
    lfo_rate: Envelope,
    lfo_depth: Envelope,
    vibrato: Vec<f32>,
}

impl VoicePool {
    pub fn new(sample_rate: f32, polyphony: usize) -> Self {
        Self::with_detune(sample_rate, polyphony, DEFAULT_DETUNE)
    }

    pub fn with_detune(sample_rate: f32, polyphony: usize, detune: f32) -> Self {
        let polyphony = polyphony.max(1);
        let mut lfo_rate = Envelope::new();
        lfo_rate.set_value(3.0);

        Self {
            voices: (0..polyphony)
                .map(|_| Voice::new(sample_rate, detune))
                .collect(),
            cursor: 0,
            active: Vec::with_capacity(polyphony),
            gain: 1.0,
            chorus: false,
            sample_rate,
            lfo: OscillatorBlock::sine(),
            lfo_rate,
            lfo_depth: Envelope::new(),
            vibrato: vec![1.0; MAX_BLOCK_SIZE],
        }
    }

    pub fn polyphony(&self) -> usize {
        self.voices.len()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Hand out the least recently allocated voice, retuned to `frequency`.
    /// A voice still held by a key is stopped first.
    pub fn allocate(&mut self, frequency: f32) -> VoiceId {
        let id = VoiceId(self.cursor);
        self.cursor = (self.cursor + 1) % self.voices.len();

        if self.voices[id.0].is_sustained() {
            debug!("stealing voice {}", id.0);
            self.stop(id, DEFAULT_DECAY);
        }
        self.voices[id.0].set_frequency(frequency);
        id
    }

    pub fn start(&mut self, id: VoiceId, velocity: f32, attack: f32) {
        self.voices[id.0].start(velocity, attack);
        self.mark_active(id);
    }

    pub fn stop(&mut self, id: VoiceId, decay: f32) {
        self.voices[id.0].stop(decay);
        self.mark_suspended(id);
    }

    /// Timed note. Ignored while the voice is held by a key.
    pub fn play(&mut self, id: VoiceId, duration: Duration, velocity: f32, delay: Duration) {
        if self.voices[id.0].play(duration, velocity, delay) {
            self.mark_active(id);
        }
    }

    pub fn set_frequency(&mut self, id: VoiceId, frequency: f32) {
        self.voices[id.0].set_frequency(frequency);
    }

    pub fn tune_towards(&mut self, id: VoiceId, frequency: f32, ratio: f32) {
        self.voices[id.0].tune_towards(frequency, ratio);
    }

    pub fn voice(&self, id: VoiceId) -> &Voice {
        &self.voices[id.0]
    }

    pub fn is_sustained(&self, id: VoiceId) -> bool {
        self.voices[id.0].is_sustained()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn output_gain(&self) -> f32 {
        self.gain
    }

    /// Voices currently making any sound, including release tails.
    pub fn sounding_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| v.state() != VoiceState::Idle)
            .count()
    }

    pub fn toggle_chorus(&mut self) -> bool {
        self.chorus = !self.chorus;
        for voice in &mut self.voices {
            voice.toggle_chorus();
        }
        self.chorus
    }

    pub fn chorus(&self) -> bool {
        self.chorus
    }

    pub fn set_lfo_frequency(&mut self, frequency: f32) {
        self.lfo_rate.set_target(frequency, LFO_SMOOTHING);
    }

    pub fn set_lfo_strength(&mut self, strength: f32) {
        self.lfo_depth
            .set_target(strength.clamp(0.0, 1.0), LFO_SMOOTHING);
    }

    pub fn lfo_strength(&self) -> f32 {
        self.lfo_depth.target()
    }

    pub fn mod_wheel(&mut self, value: u8) {
        self.set_lfo_strength(value.min(127) as f32 / 127.0);
    }

    fn mark_active(&mut self, id: VoiceId) {
        if !self.active.contains(&id) {
            self.active.push(id);
        }
        self.update_gain();
    }

    fn mark_suspended(&mut self, id: VoiceId) {
        self.active.retain(|v| *v != id);
        self.update_gain();
    }

    fn update_gain(&mut self) {
        self.gain = 1.0 / (self.active.len().max(1) as f32).sqrt();
    }

    fn render_chunk(&mut self, out: &mut [f32]) {
        let vibrato = &mut self.vibrato[..out.len()];
        for ratio in vibrato.iter_mut() {
            let rate = self.lfo_rate.next_sample(self.sample_rate);
            let depth = self.lfo_depth.next_sample(self.sample_rate);
            let lfo = self.lfo.next_sample(rate, self.sample_rate);
            *ratio = (depth * lfo * MAX_VIBRATO_CENTS / 1200.0).exp2();
        }

        out.fill(0.0);
        for index in 0..self.voices.len() {
            let voice = &mut self.voices[index];
            if voice.is_idle() {
                continue;
            }
            if voice.render_add(out, &self.vibrato[..out.len()]) {
                self.mark_suspended(VoiceId(index));
            }
        }

        let gain = self.gain;
        for sample in out.iter_mut() {
            *sample *= gain;
        }
    }
}

impl GraphNode for VoicePool {
    fn render_block(&mut self, out: &mut [f32], _ctx: &RenderCtx) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.render_chunk(chunk);
        }
    }

    fn is_active(&self) -> bool {
        self.voices.iter().any(|v| !v.is_idle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::voice::DEFAULT_ATTACK;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn render(pool: &mut VoicePool, samples: usize) -> Vec<f32> {
        let mut out = vec![0.0; samples];
        pool.render_block(&mut out, &RenderCtx::bus(SAMPLE_RATE));
        out
    }

    #[test]
    fn allocates_round_robin() {
        let mut pool = VoicePool::new(SAMPLE_RATE, 3);
        let ids: Vec<_> = (0..4).map(|_| pool.allocate(440.0).index()).collect();
        assert_eq!(ids, vec![0, 1, 2, 0]);
    }

    #[test]
    fn steals_oldest_held_voice() {
        let mut pool = VoicePool::new(SAMPLE_RATE, 2);
        let first = pool.allocate(220.0);
        pool.start(first, 1.0, DEFAULT_ATTACK);
        let second = pool.allocate(330.0);
        pool.start(second, 1.0, DEFAULT_ATTACK);

        let third = pool.allocate(440.0);
        assert_eq!(third, first);
        assert!(!pool.is_sustained(first));
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn active_voices_never_exceed_polyphony() {
        let mut pool = VoicePool::new(SAMPLE_RATE, 4);
        for note in 0..40 {
            let id = pool.allocate(100.0 + note as f32);
            pool.start(id, 0.5, DEFAULT_ATTACK);
            assert!(pool.active_count() <= pool.polyphony());
        }
        assert_eq!(pool.active_count(), 4);
    }

    #[test]
    fn output_gain_follows_active_count() {
        let mut pool = VoicePool::new(SAMPLE_RATE, 12);
        assert_eq!(pool.output_gain(), 1.0);

        let ids: Vec<_> = (0..4)
            .map(|i| {
                let id = pool.allocate(200.0 * (i + 1) as f32);
                pool.start(id, 1.0, DEFAULT_ATTACK);
                id
            })
            .collect();
        assert!((pool.output_gain() - 0.5).abs() < 1e-6);

        for id in ids {
            pool.stop(id, 0.01);
        }
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.output_gain(), 1.0);
    }

    #[test]
    fn timed_note_leaves_active_list_when_done() {
        let mut pool = VoicePool::new(SAMPLE_RATE, 4);
        let id = pool.allocate(880.0);
        pool.play(id, Duration::from_millis(10), 64.0, Duration::ZERO);
        assert_eq!(pool.active_count(), 1);

        render(&mut pool, 960);
        assert_eq!(pool.active_count(), 0);

        render(&mut pool, 9_600);
        assert!(!pool.is_active());
    }

    #[test]
    fn renders_sound_while_held() {
        let mut pool = VoicePool::new(SAMPLE_RATE, 4);
        let id = pool.allocate(440.0);
        pool.start(id, 1.0, DEFAULT_ATTACK);
        let out = render(&mut pool, 4_800);

        let peak = out.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        assert!(peak > 0.5 && peak <= 1.0, "peak {peak}");
    }

    #[test]
    fn mod_wheel_sets_lfo_strength() {
        let mut pool = VoicePool::new(SAMPLE_RATE, 1);
        pool.mod_wheel(127);
        assert_eq!(pool.lfo_strength(), 1.0);
        pool.mod_wheel(0);
        assert_eq!(pool.lfo_strength(), 0.0);
    }
}
