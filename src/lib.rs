pub mod clock; // Tick clock, metronome and the clock thread
pub mod dsp;
pub mod effects; // Master bus: reverb, overdrive, EQ, compressor
pub mod engine;
pub mod graph; // Composable audio graph nodes
pub mod io;
pub mod recorder; // Note recording and playback
pub mod settings;
pub mod synth; // Voice pool and polyphony

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
