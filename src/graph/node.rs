/// Context passed to graph nodes during rendering
///
/// Nodes own their pitch and level state, so the block only carries the
/// output rate.
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx {
    pub sample_rate: f32,
}

impl RenderCtx {
    /// Context for a whole output block (synth, effects, buses)
    pub fn bus(sample_rate: f32) -> Self {
        Self { sample_rate }
    }
}

/// Core trait for audio processing graph nodes
///
/// Sources render into `out`; effects process `out` in place.
pub trait GraphNode: Send {
    fn render_block(&mut self, out: &mut [f32], ctx: &RenderCtx);

    /// False once a source has gone quiet and will stay quiet until it
    /// receives another note.
    fn is_active(&self) -> bool {
        true
    }
}
