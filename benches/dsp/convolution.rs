//! Benchmarks for the partitioned convolver at typical impulse lengths.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keyroll::dsp::convolution::Convolver;

use crate::SAMPLE_RATE;

const BLOCK: usize = 256;

/// Decaying noise-like impulse of `seconds` length.
fn impulse(seconds: f32) -> Vec<f32> {
    let len = (seconds * SAMPLE_RATE) as usize;
    let mut state = 0x1234_5678u32;
    (0..len)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let noise = state as f32 / u32::MAX as f32 * 2.0 - 1.0;
            noise * (-6.0 * i as f32 / len as f32).exp()
        })
        .collect()
}

pub fn bench_convolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/convolution");

    for seconds in [0.25f32, 1.0, 2.5] {
        let mut convolver = Convolver::new(&impulse(seconds));
        let mut buffer = vec![0.0f32; BLOCK];
        buffer[0] = 1.0;

        group.bench_with_input(
            BenchmarkId::new("ir_seconds", seconds),
            &seconds,
            |b, _| b.iter(|| convolver.process(black_box(&mut buffer))),
        );
    }

    group.finish();
}
