//! Low-level DSP primitives used by the synth and the master bus.
//!
//! These components are allocation-free once constructed and realtime-safe,
//! so they can live directly inside voices and effect chains.

/// Soft-knee dynamics compressor.
pub mod compressor;
/// Partitioned FFT convolution for impulse-response reverb.
pub mod convolution;
/// Waveshaping overdrive curve.
pub mod distortion;
/// Exponential target-chasing envelope.
pub mod envelope;
/// Peaking biquad for the equalizer bands.
pub mod filter;
/// Phase-accumulator oscillator waveforms.
pub mod oscillator;

pub use compressor::{Compressor, CompressorParams};
pub use convolution::Convolver;
pub use distortion::DriveCurve;
pub use envelope::Envelope;
pub use filter::PeakingFilter;
pub use oscillator::{OscillatorBlock, OscillatorWaveform};
