//! Benchmarks for the per-sample bus effects.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use keyroll::dsp::{Compressor, CompressorParams, DriveCurve, PeakingFilter};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

pub fn bench_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/effects");

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();
        let mut buffer = input.clone();

        let mut peaking = PeakingFilter::for_band(SAMPLE_RATE, 400.0, 4_000.0);
        peaking.set_gain_db(6.0);
        group.bench_with_input(BenchmarkId::new("peaking", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                peaking.process(black_box(&mut buffer));
            })
        });

        let drive = DriveCurve::new(-0.7);
        group.bench_with_input(BenchmarkId::new("overdrive", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                drive.process(black_box(&mut buffer));
            })
        });

        let mut compressor = Compressor::new(SAMPLE_RATE, CompressorParams::default());
        group.bench_with_input(BenchmarkId::new("compressor", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                compressor.process(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
