//! Graph Runtime
//!
//! The runtime is the central coordinator that connects sources, op nodes
//! and triggered nodes. It owns the topology (through the scheduler) and one
//! value slot per node, and it is the only place values change.
//!
//! # How It Works
//!
//! 1. Sources and op nodes are created through builders and get a `NodeId`.
//!
//! 2. `update_sources` applies a batch of source values. Sources whose value
//!    actually changed become the roots of one propagation pass.
//!
//! 3. The propagation pass:
//!    a. Marks everything reachable from the roots dirty
//!    b. Orders the affected nodes topologically
//!    c. Forces the triggered ones, exactly once each
//!    d. Leaves the rest dirty; they recompute on next read
//!
//! # Revisions
//!
//! The runtime keeps a revision counter that advances whenever any node's
//! value changes. Every slot records the revision of its own last change,
//! and every op slot records the input revisions it last computed from.
//! Comparing those is how a dirty node learns that nothing it reads has
//! actually changed.
//!
//! # Thread Safety
//!
//! Everything that mutates or forces takes `&mut self`, so a batch update
//! and its push phase always run as one exclusive borrow. See
//! [`SharedGraph`](super::SharedGraph) for use across threads.

use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::operation::{Equality, Operation, Verifier};
use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::graph::{NodeId, NodeKind, UpdateScheduler};

/// Input revisions an op node last computed from.
pub(crate) type Revisions = SmallVec<[u64; 4]>;

/// The computation half of an op node's slot.
pub(crate) struct Compute<V> {
    pub(crate) operation: Box<dyn Operation<V>>,
    pub(crate) verify: Option<Verifier<V>>,
    pub(crate) computed_from: Option<Revisions>,
}

/// Value storage for one node.
pub(crate) struct Slot<V> {
    /// Cached value; `None` is unset.
    pub(crate) value: Option<V>,

    /// Revision at which `value` last changed.
    pub(crate) changed_at: u64,

    pub(crate) equals: Option<Equality<V>>,

    /// `None` for sources.
    pub(crate) compute: Option<Compute<V>>,
}

/// A dependency graph of sources and derived values.
///
/// # Example
///
/// ```rust
/// use ripple_core::Graph;
///
/// let mut graph = Graph::<i64>::new();
/// let a = graph.add_source();
/// let b = graph.add_source();
/// let sum = graph.op([a, b], |v: &[i64]| v.iter().sum()).build().unwrap();
///
/// graph.update_sources([(a, 2), (b, 3)]).unwrap();
/// assert_eq!(graph.value(sum).unwrap(), Some(5));
/// ```
pub struct Graph<V> {
    pub(crate) scheduler: UpdateScheduler,
    pub(crate) slots: Vec<Slot<V>>,
    pub(crate) config: GraphConfig,
    pub(crate) revision: u64,
}

impl<V> Graph<V>
where
    V: Clone + PartialEq + 'static,
{
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            scheduler: UpdateScheduler::new(),
            slots: Vec::new(),
            config,
            revision: 0,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Read-only view of the topology.
    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    /// Current revision. Advances whenever any node's value changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node_count(&self) -> usize {
        self.scheduler.node_count()
    }

    pub fn name(&self, id: NodeId) -> Result<&str> {
        Ok(self.scheduler.node(id)?.name())
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.scheduler.node(id)?.kind())
    }

    pub fn is_dirty(&self, id: NodeId) -> Result<bool> {
        Ok(self.scheduler.node(id)?.is_dirty())
    }

    pub fn is_triggered(&self, id: NodeId) -> Result<bool> {
        Ok(self.scheduler.node(id)?.is_triggered())
    }

    pub fn inputs(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.scheduler.node(id)?.inputs())
    }

    pub fn dependents(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.scheduler.node(id)?.dependents().iter().copied().collect())
    }

    /// Find the first node with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.scheduler.find(name)
    }

    /// Cached value of a node, without forcing evaluation.
    ///
    /// The value may be stale if the node is dirty. Meant for debugging and
    /// tests; use [`Graph::value`] to read.
    pub fn peek(&self, id: NodeId) -> Option<&V> {
        self.slots.get(id.index()).and_then(|slot| slot.value.as_ref())
    }

    /// Apply a batch of source values and push the change through the graph.
    ///
    /// Pairs are applied in order. A source listed more than once takes its
    /// last value. All sources that changed are propagated together, so a
    /// triggered node reachable from several of them runs once.
    ///
    /// Returns the triggered nodes that were evaluated, in evaluation order.
    /// Every handle is validated before any value is applied; an invalid
    /// handle leaves the graph untouched.
    pub fn update_sources<I>(&mut self, pairs: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = (NodeId, V)>,
    {
        let mut batch: IndexMap<NodeId, V> = IndexMap::new();
        for (id, value) in pairs {
            let node = self.scheduler.node(id)?;
            if node.kind() != NodeKind::Source {
                return Err(GraphError::NotASource {
                    node: node.name().to_owned(),
                });
            }
            if batch.insert(id, value).is_some() {
                tracing::warn!(
                    node = %node.name(),
                    "source listed more than once in one batch, last value wins"
                );
            }
        }

        let roots: Vec<NodeId> = batch
            .into_iter()
            .filter_map(|(id, value)| self.assign(id, value).then_some(id))
            .collect();

        if roots.is_empty() {
            tracing::debug!("batch changed no sources");
            return Ok(Vec::new());
        }

        self.propagate(&roots)
    }

    /// Set a single source. Shorthand for a one-pair batch.
    pub fn set(&mut self, source: NodeId, value: V) -> Result<Vec<NodeId>> {
        self.update_sources([(source, value)])
    }

    /// Record that a slot's value changed at a new revision.
    pub(crate) fn bump(&mut self, id: NodeId) {
        self.revision += 1;
        self.slots[id.index()].changed_at = self.revision;
    }
}

impl<V> Default for Graph<V>
where
    V: Clone + PartialEq + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Graph<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.scheduler.node_count())
            .field("revision", &self.revision)
            .field("config", &self.config)
            .finish()
    }
}
