use crate::{
    graph::node::{GraphNode, RenderCtx},
    MAX_BLOCK_SIZE,
};

/*
Parallel Signal Summing (Mix)
=============================

Mix renders two sources side by side and adds them:

    output = (A × gain_a) + (B × gain_b)

In the practice synth this joins the keyboard synth and the metronome
beeper before the master bus, so both share one effect chain while
keeping separate voice pools:

    PolySynth (keys) ────┐
                         ├─▶ Mix ──▶ MasterBus ──▶ device
    PolySynth (beeper) ──┘

The sum is not normalized. Each pool already scales its own output, and
the bus compressor catches the peaks when both are loud at once.
*/

pub struct Mix<A, B> {
    pub source_a: A,
    pub source_b: B,
    pub gain_a: f32,
    pub gain_b: f32,
    temp_buffer: Vec<f32>,
}

impl<A, B> Mix<A, B> {
    pub fn new(source_a: A, source_b: B) -> Self {
        Self::with_gains(source_a, source_b, 1.0, 1.0)
    }

    pub fn with_gains(source_a: A, source_b: B, gain_a: f32, gain_b: f32) -> Self {
        Mix {
            source_a,
            source_b,
            gain_a,
            gain_b,
            temp_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }
}

impl<A: GraphNode, B: GraphNode> GraphNode for Mix<A, B> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            self.source_a.render_block(chunk, ctx);

            let frames = &mut self.temp_buffer[..chunk.len()];
            frames.fill(0.0);
            self.source_b.render_block(frames, ctx);

            for (o, b) in chunk.iter_mut().zip(frames.iter()) {
                *o = *o * self.gain_a + *b * self.gain_b;
            }
        }
    }

    fn is_active(&self) -> bool {
        self.source_a.is_active() || self.source_b.is_active()
    }
}
