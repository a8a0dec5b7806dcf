//! Evaluation Context
//!
//! Forcing a dirty node means forcing its dirty inputs first, which means
//! forcing theirs, and so on. Doing that with plain recursion ties the
//! deepest graph we can evaluate to the size of the call stack, so the
//! evaluation engine walks an explicit stack of frames instead.
//!
//! # Implementation
//!
//! Each frame is visited twice. The first visit expands the frame: its dirty
//! inputs are pushed on top of it. When the frame is on top again, every
//! input has been dealt with and the node itself can be computed.
//!
//! A node may be pushed more than once (a diamond, or an input listed
//! twice). The engine skips frames whose node is already clean, so each
//! node still computes at most once.

use crate::graph::NodeId;

/// An entry in the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    node: NodeId,
    /// Inputs of this node have already been pushed.
    expanded: bool,
}

/// Explicit stack used to force a node and its stale ancestors.
#[derive(Debug)]
pub(crate) struct EvalStack {
    frames: Vec<Frame>,
    max_depth: usize,
}

impl EvalStack {
    /// Start forcing `root`.
    pub(crate) fn new(root: NodeId) -> Self {
        Self {
            frames: vec![Frame {
                node: root,
                expanded: false,
            }],
            max_depth: 1,
        }
    }

    /// The frame on top of the stack, as `(node, expanded)`.
    pub(crate) fn top(&self) -> Option<(NodeId, bool)> {
        self.frames.last().map(|frame| (frame.node, frame.expanded))
    }

    /// Mark the top frame as expanded.
    pub(crate) fn expand_top(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.expanded = true;
        }
    }

    pub(crate) fn push(&mut self, node: NodeId) {
        self.frames.push(Frame {
            node,
            expanded: false,
        });
        self.max_depth = self.max_depth.max(self.frames.len());
    }

    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        self.frames.pop().map(|frame| frame.node)
    }

    /// Deepest the stack has been since it was created.
    pub(crate) fn max_depth(&self) -> usize {
        self.max_depth
    }
}

impl Extend<NodeId> for EvalStack {
    fn extend<I: IntoIterator<Item = NodeId>>(&mut self, nodes: I) {
        for node in nodes {
            self.push(node);
        }
    }
}
