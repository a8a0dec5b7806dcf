//! Graph Nodes
//!
//! This module defines the topology record kept for every node in the
//! dependency graph. Cached values live in the reactive layer; a `Node` only
//! carries what the scheduler needs to mark and order the graph.

use std::fmt;

use indexmap::IndexSet;
use smallvec::SmallVec;

/// Handle of a node in the dependency graph.
///
/// Nodes live in an arena owned by the graph, so a handle is just the node's
/// index in that arena. Handles are only meaningful for the graph that
/// created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of the node in the graph's arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A source node. Its value is supplied from outside the graph and it
    /// never has inputs.
    Source,

    /// A derived node. Its value is computed from an ordered list of inputs.
    Op,
}

impl NodeKind {
    /// Prefix used when generating a name for an unnamed node.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::Op => "op",
        }
    }
}

/// Ordered input list of an op node. Most operations take a handful of
/// arguments, so they stay inline.
pub type Inputs = SmallVec<[NodeId; 4]>;

/// A node in the dependency graph.
#[derive(Debug)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// What kind of node this is.
    kind: NodeKind,

    /// Human readable label, used in logs and errors.
    name: String,

    /// Whether the cached value must be recomputed before it is trusted.
    dirty: bool,

    /// Evaluate eagerly when an upstream source changes.
    triggered: bool,

    /// Nodes this node reads from, in argument order.
    inputs: Inputs,

    /// Nodes that read from this node. Insertion order keeps traversals
    /// deterministic.
    dependents: IndexSet<NodeId>,
}

impl Node {
    /// Create a source node. Sources are authoritative and never dirty.
    pub(crate) fn source(id: NodeId, name: String) -> Self {
        Self {
            id,
            kind: NodeKind::Source,
            name,
            dirty: false,
            triggered: false,
            inputs: Inputs::new(),
            dependents: IndexSet::new(),
        }
    }

    /// Create an op node. It starts dirty so the first read computes it.
    pub(crate) fn op(id: NodeId, name: String, inputs: Inputs, triggered: bool) -> Self {
        Self {
            id,
            kind: NodeKind::Op,
            name,
            dirty: true,
            triggered,
            inputs,
            dependents: IndexSet::new(),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Mark the node as clean.
    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Mark the node as needing recomputation.
    ///
    /// Sources are never dirty; marking one is a no-op.
    pub(crate) fn mark_dirty(&mut self) {
        if self.kind == NodeKind::Op {
            self.dirty = true;
        }
    }

    /// Get the ordered inputs.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Add a dependent (a node that reads from this node).
    pub(crate) fn add_dependent(&mut self, node_id: NodeId) {
        self.dependents.insert(node_id);
    }

    /// Get all dependents.
    pub fn dependents(&self) -> &IndexSet<NodeId> {
        &self.dependents
    }
}
