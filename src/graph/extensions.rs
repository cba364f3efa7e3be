use crate::graph::{mix::Mix, node::GraphNode, through::Through};

pub trait NodeExt: GraphNode + Sized {
    /// Feed this node's output into `effect`.
    fn through<F: GraphNode>(self, effect: F) -> Through<Self, F> {
        Through::new(self, effect)
    }

    /// Sum this node with `other` at unity gain.
    fn mix<B: GraphNode>(self, other: B) -> Mix<Self, B> {
        Mix::new(self, other)
    }
}

impl<T: GraphNode> NodeExt for T {}
