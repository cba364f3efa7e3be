use crate::graph::node::{GraphNode, RenderCtx};

/*
Serial Signal Chain (Through)
=============================

Through connects two nodes in series, passing the output of the first (source)
into the second (effect). The practice synth's whole output path is built
from it:

    PolySynth ──→ MasterBus (volume → rack → EQ → compressor) ──→ device

How It Works:
-------------
1. Render the source into the output buffer
2. Pass that buffer through the effect (in-place processing)

  Source renders:  [0.5, 0.8, -0.3, 0.9, ...]
  Effect processes in-place (e.g., EQ)
  Final output:    [0.4, 0.6, -0.2, 0.7, ...]

The chain counts as active while either side is, so a reverb tail keeps the
chain alive after the synth has gone quiet.
*/

pub struct Through<S, F> {
    source: S,
    effect: F,
}

impl<S, F> Through<S, F> {
    pub fn new(source: S, effect: F) -> Self {
        Self { source, effect }
    }
}

impl<S: GraphNode, F: GraphNode> GraphNode for Through<S, F> {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx) {
        self.source.render_block(out, ctx);
        self.effect.render_block(out, ctx);
    }

    fn is_active(&self) -> bool {
        self.source.is_active() || self.effect.is_active()
    }
}
