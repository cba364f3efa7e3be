//! Benchmarks for the poly synth with increasing numbers of held notes.

use std::{collections::VecDeque, hint::black_box};

use criterion::{BenchmarkId, Criterion};
use keyroll::{
    graph::{GraphNode, RenderCtx},
    synth::{PolySynth, SynthMessage, VoicePool},
};

use crate::{BLOCK_SIZES, SAMPLE_RATE};

fn synth(notes: u8, chorus: bool) -> PolySynth<VecDeque<SynthMessage>> {
    let mut queue: VecDeque<SynthMessage> = (0..notes)
        .map(|i| SynthMessage::NoteOn {
            note: 48 + i * 3,
            velocity: 100,
        })
        .collect();
    if chorus {
        queue.push_back(SynthMessage::ToggleChorus);
    }
    queue.push_back(SynthMessage::ModWheel { value: 64 });
    PolySynth::new(VoicePool::new(SAMPLE_RATE, 12), queue)
}

pub fn bench_chords(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/chords");
    let ctx = RenderCtx::bus(SAMPLE_RATE);

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for notes in [1u8, 4, 12] {
            let mut plain = synth(notes, false);
            group.bench_with_input(
                BenchmarkId::new(format!("notes_{}", notes), size),
                &size,
                |b, _| b.iter(|| plain.render_block(black_box(&mut buffer), &ctx)),
            );
        }

        let mut chorus = synth(12, true);
        group.bench_with_input(BenchmarkId::new("notes_12_chorus", size), &size, |b, _| {
            b.iter(|| chorus.render_block(black_box(&mut buffer), &ctx))
        });
    }

    group.finish();
}
