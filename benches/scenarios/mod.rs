//! Scenario benchmarks: chords on the voice pool and the master bus.

mod bus;
mod chords;

pub use bus::bench_bus;
pub use chords::bench_chords;
