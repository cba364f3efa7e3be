//! Block-rendering seam shared by the synth and the master bus.
//!
//! A `GraphNode` either produces audio (the poly synth) or processes it in
//! place (bus effects). `Through` chains them serially, `Mix` sums two
//! sources.

/// Fluent combinators (`.through()`, `.mix()`).
pub mod extensions;
/// Parallel summing of two sources.
pub mod mix;
/// Core traits shared by all graph nodes.
pub mod node;
/// Serial chaining of two nodes (source → effect).
pub mod through;

pub use extensions::NodeExt;
pub use mix::Mix;
pub use node::{GraphNode, RenderCtx};
pub use through::Through;
