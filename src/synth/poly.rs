use log::debug;

use crate::{
    graph::node::{GraphNode, RenderCtx},
    io::converter::midi_note_to_freq,
    synth::{
        message::{MessageReceiver, SynthMessage},
        pool::{VoiceId, VoicePool},
        voice::{DEFAULT_ATTACK, DEFAULT_DECAY},
    },
};

/// Semitones covered by a full pitch wheel deflection.
pub const DEFAULT_BEND_RANGE: u8 = 2;

/// Keyboard layer over a [`VoicePool`]: remembers which voice each held
/// note is sounding on and applies queued [`SynthMessage`]s at the start of
/// every block.
pub struct PolySynth<R> {
    pool: VoicePool,
    rx: R,
    held: [Option<VoiceId>; 128],
    bend: i16,
    bend_range: u8,
    attack: f32,
    decay: f32,
}

impl<R: MessageReceiver<SynthMessage>> PolySynth<R> {
    pub fn new(pool: VoicePool, rx: R) -> Self {
        Self {
            pool,
            rx,
            held: [None; 128],
            bend: 0,
            bend_range: DEFAULT_BEND_RANGE,
            attack: DEFAULT_ATTACK,
            decay: DEFAULT_DECAY,
        }
    }

    pub fn bend_range(mut self, semitones: u8) -> Self {
        self.bend_range = semitones;
        self
    }

    pub fn envelope(mut self, attack: f32, decay: f32) -> Self {
        self.attack = attack;
        self.decay = decay;
        self
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut VoicePool {
        &mut self.pool
    }

    pub fn is_held(&self, note: u8) -> bool {
        self.held
            .get(note as usize)
            .is_some_and(|voice| voice.is_some())
    }

    pub fn handle(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::NoteOn { note, velocity: 0 } => self.note_off(note),
            SynthMessage::NoteOn { note, velocity } => self.note_on(note, velocity),
            SynthMessage::NoteOff { note, .. } => self.note_off(note),
            SynthMessage::Play {
                note,
                velocity,
                duration,
            } => {
                if note > 127 {
                    return;
                }
                let id = self.allocate(note);
                self.pool
                    .play(id, duration, velocity as f32, std::time::Duration::ZERO);
            }
            SynthMessage::PitchBend { value } => {
                self.bend = value;
                for note in 0..128u8 {
                    if let Some(id) = self.held[note as usize] {
                        self.apply_bend(note, id);
                    }
                }
            }
            SynthMessage::ModWheel { value } => self.pool.mod_wheel(value),
            SynthMessage::ToggleChorus => {
                self.pool.toggle_chorus();
            }
            SynthMessage::AllNotesOff => {
                for slot in self.held.iter_mut() {
                    if let Some(id) = slot.take() {
                        self.pool.stop(id, self.decay);
                    }
                }
            }
        }
    }

    fn note_on(&mut self, note: u8, velocity: u8) {
        if note > 127 || self.is_held(note) {
            return;
        }
        let id = self.allocate(note);
        self.pool.start(id, velocity as f32, self.attack);
        self.held[note as usize] = Some(id);
        if self.bend != 0 {
            self.apply_bend(note, id);
        }
    }

    fn note_off(&mut self, note: u8) {
        let Some(slot) = self.held.get_mut(note as usize) else {
            return;
        };
        match slot.take() {
            Some(id) => self.pool.stop(id, self.decay),
            None => debug!("note off for {} without a voice", note),
        }
    }

    /// Allocate a voice and forget any note that was holding it.
    fn allocate(&mut self, note: u8) -> VoiceId {
        let id = self.pool.allocate(midi_note_to_freq(note));
        for slot in self.held.iter_mut() {
            if *slot == Some(id) {
                *slot = None;
            }
        }
        id
    }

    fn apply_bend(&mut self, note: u8, id: VoiceId) {
        let ratio = self.bend as f32 / 8192.0;
        let range = self.bend_range as i32;
        let target = if ratio < 0.0 {
            bent_frequency(note, -range)
        } else {
            bent_frequency(note, range)
        };
        self.pool.tune_towards(id, target, ratio.abs());
    }
}

fn bent_frequency(note: u8, semitones: i32) -> f32 {
    440.0 * 2.0_f32.powf((note as i32 + semitones - 69) as f32 / 12.0)
}

impl<R: MessageReceiver<SynthMessage> + Send> GraphNode for PolySynth<R> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        while let Some(message) = self.rx.pop() {
            self.handle(message);
        }
        self.pool.render_block(out, ctx);
    }

    fn is_active(&self) -> bool {
        self.pool.is_active()
    }
}
