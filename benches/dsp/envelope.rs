use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keyroll::dsp::envelope::Envelope;

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // chasing a target: the attack of every note
        let mut env = Envelope::new();
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.reset();
                env.set_target(1.0, 0.01);
                env.render(black_box(&mut buffer), SAMPLE_RATE);
            })
        });

        // settled: a held note
        let mut env = Envelope::new();
        env.set_value(0.8);
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer), SAMPLE_RATE))
        });
    }

    group.finish();
}
