//! Benchmarks for the master bus, dry and with a reverb loaded.

use std::{collections::VecDeque, hint::black_box};

use criterion::{BenchmarkId, Criterion};
use keyroll::{
    dsp::convolution::Convolver,
    effects::{BusMessage, EqBand, MasterBus},
    graph::{GraphNode, RenderCtx},
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn bus(messages: Vec<BusMessage>) -> MasterBus<VecDeque<BusMessage>, VecDeque<Box<Convolver>>> {
    MasterBus::new(SAMPLE_RATE, messages.into(), VecDeque::new())
}

pub fn bench_bus(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/bus");
    let ctx = RenderCtx::bus(SAMPLE_RATE);

    // one second of exponentially decaying impulse
    let impulse: Vec<f32> = (0..SAMPLE_RATE as usize)
        .map(|i| (-5.0 * i as f32 / SAMPLE_RATE).exp() * if i % 7 == 0 { 1.0 } else { -0.5 })
        .collect();

    for &size in BLOCK_SIZES {
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        let mut buffer = input.clone();

        let mut dry = bus(Vec::new());
        group.bench_with_input(BenchmarkId::new("dry", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                dry.render_block(black_box(&mut buffer), &ctx);
            })
        });

        let mut shaped = bus(vec![
            BusMessage::SetOverdrive(-0.5),
            BusMessage::SetEqBand {
                band: EqBand::Low,
                gain_db: 6.0,
            },
            BusMessage::SetEqBand {
                band: EqBand::High,
                gain_db: -3.0,
            },
        ]);
        group.bench_with_input(BenchmarkId::new("drive_eq", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                shaped.render_block(black_box(&mut buffer), &ctx);
            })
        });

        let mut wet = bus(vec![BusMessage::SetReverb(Some(Box::new(Convolver::new(
            &impulse,
        ))))]);
        group.bench_with_input(BenchmarkId::new("reverb", size), &size, |b, _| {
            b.iter(|| {
                buffer.copy_from_slice(&input);
                wet.render_block(black_box(&mut buffer), &ctx);
            })
        });
    }

    group.finish();
}
