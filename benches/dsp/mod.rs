//! Benchmarks for low-level DSP primitives.

mod convolution;
mod effects;
mod envelope;
mod oscillator;

pub use convolution::bench_convolution;
pub use effects::bench_effects;
pub use envelope::bench_envelope;
pub use oscillator::bench_oscillator;
