//! Update Scheduler
//!
//! The scheduler owns the graph topology and determines which nodes are
//! affected by a change, and in which order they may be evaluated.
//!
//! # Algorithm
//!
//! 1. When one or more source nodes change, walk their dependents
//!    breadth-first and mark every reachable op node dirty. A visited set
//!    makes diamond shapes cost O(edges) instead of O(paths).
//! 2. Sort the affected nodes topologically (Kahn's algorithm restricted to
//!    the affected subset), so every node comes after all affected nodes it
//!    reads from.
//!
//! The caller picks the triggered nodes out of that order and forces them;
//! anything they read is pulled in lazily.

use std::collections::{HashMap, VecDeque};
use std::ops::Index;

use indexmap::IndexSet;

use super::node::{Inputs, Node, NodeId, NodeKind};
use crate::error::{GraphError, Result};

/// The update scheduler manages the dependency graph topology.
#[derive(Debug, Default)]
pub struct UpdateScheduler {
    /// All nodes in the graph, indexed by `NodeId`.
    nodes: Vec<Node>,

    /// Per-kind counters used to generate names for unnamed nodes.
    name_counters: HashMap<NodeKind, usize>,
}

impl UpdateScheduler {
    /// Create a new empty scheduler.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add a source node.
    pub(crate) fn add_source(&mut self, name: Option<String>) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        let name = self.name_or_generate(name, NodeKind::Source);
        self.nodes.push(Node::source(id, name));
        id
    }

    /// Add an op node and wire the back-edges from each of its inputs.
    ///
    /// Inputs must already exist in this graph, so the only cycle a new node
    /// can close is one through itself.
    pub(crate) fn add_op(
        &mut self,
        name: Option<String>,
        inputs: Inputs,
        triggered: bool,
    ) -> Result<NodeId> {
        let id = NodeId::from_index(self.nodes.len());
        for &input in &inputs {
            if input == id {
                return Err(GraphError::Cycle { node: id });
            }
            if self.get_node(input).is_none() {
                return Err(GraphError::UnknownNode(input));
            }
        }

        let name = self.name_or_generate(name, NodeKind::Op);
        for &input in &inputs {
            self.nodes[input.index()].add_dependent(id);
        }
        self.nodes.push(Node::op(id, name, inputs, triggered));
        Ok(id)
    }

    fn name_or_generate(&mut self, name: Option<String>, kind: NodeKind) -> String {
        match name {
            Some(name) => name,
            None => {
                let counter = self.name_counters.entry(kind).or_insert(0);
                *counter += 1;
                format!("{}-{}", kind.label(), counter)
            }
        }
    }

    /// Get a reference to a node.
    pub fn get_node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(node_id.index())
    }

    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> &mut Node {
        &mut self.nodes[node_id.index()]
    }

    /// Get a node, failing with `UnknownNode` for foreign handles.
    pub fn node(&self, node_id: NodeId) -> Result<&Node> {
        self.get_node(node_id)
            .ok_or(GraphError::UnknownNode(node_id))
    }

    /// Find the first node carrying the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| node.name() == name)
            .map(Node::id)
    }

    /// Mark everything reachable from the changed sources dirty.
    ///
    /// Returns the affected nodes in topological order.
    pub(crate) fn mark_changed(&mut self, roots: &[NodeId]) -> Vec<NodeId> {
        let mut affected = IndexSet::new();
        let mut queue = VecDeque::new();

        for root in roots {
            if let Some(node) = self.nodes.get(root.index()) {
                queue.extend(node.dependents().iter().copied());
            }
        }

        while let Some(node_id) = queue.pop_front() {
            if !affected.insert(node_id) {
                continue;
            }

            let node = &mut self.nodes[node_id.index()];
            node.mark_dirty();
            tracing::trace!(node = %node.name(), "marked dirty");
            queue.extend(node.dependents().iter().copied());
        }

        self.topological_sort(&affected)
    }

    /// Perform a topological sort of the given nodes.
    ///
    /// Only edges between members of `nodes` are considered. In-degrees are
    /// counted over dependents rather than inputs, so a node listing the
    /// same input twice still reaches zero.
    fn topological_sort(&self, nodes: &IndexSet<NodeId>) -> Vec<NodeId> {
        let mut in_degree: HashMap<NodeId, usize> =
            nodes.iter().map(|&id| (id, 0)).collect();

        for &node_id in nodes {
            for dependent_id in self.nodes[node_id.index()].dependents() {
                if let Some(degree) = in_degree.get_mut(dependent_id) {
                    *degree += 1;
                }
            }
        }

        let mut queue: VecDeque<NodeId> = nodes
            .iter()
            .copied()
            .filter(|id| in_degree[id] == 0)
            .collect();
        let mut result = Vec::with_capacity(nodes.len());

        // Kahn's algorithm
        while let Some(node_id) = queue.pop_front() {
            result.push(node_id);

            for dependent_id in self.nodes[node_id.index()].dependents() {
                if let Some(degree) = in_degree.get_mut(dependent_id) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*dependent_id);
                    }
                }
            }
        }

        debug_assert_eq!(result.len(), nodes.len(), "affected subgraph has a cycle");
        result
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Index<NodeId> for UpdateScheduler {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn clean_all(scheduler: &mut UpdateScheduler) {
        for index in 0..scheduler.node_count() {
            scheduler.node_mut(NodeId::from_index(index)).mark_clean();
        }
    }

    #[test]
    fn add_nodes_and_edges() {
        let mut scheduler = UpdateScheduler::new();

        let source_id = scheduler.add_source(None);
        let derived_id = scheduler
            .add_op(None, smallvec![source_id], false)
            .unwrap();

        assert_eq!(scheduler.node_count(), 2);
        assert!(scheduler[source_id].dependents().contains(&derived_id));
        assert_eq!(scheduler[derived_id].inputs(), &[source_id]);
    }

    #[test]
    fn generated_names_count_per_kind() {
        let mut scheduler = UpdateScheduler::new();

        let a = scheduler.add_source(None);
        let b = scheduler.add_source(Some("pressure".into()));
        let c = scheduler.add_source(None);
        let d = scheduler.add_op(None, smallvec![a, c], false).unwrap();

        assert_eq!(scheduler[a].name(), "source-1");
        assert_eq!(scheduler[b].name(), "pressure");
        assert_eq!(scheduler[c].name(), "source-2");
        assert_eq!(scheduler[d].name(), "op-1");
        assert_eq!(scheduler.find("pressure"), Some(b));
        assert_eq!(scheduler.find("missing"), None);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut scheduler = UpdateScheduler::new();
        let source_id = scheduler.add_source(None);

        let next = NodeId::from(1);
        let err = scheduler
            .add_op(None, smallvec![source_id, next], false)
            .unwrap_err();

        assert!(matches!(err, GraphError::Cycle { node } if node == next));
        // Graph is unchanged
        assert_eq!(scheduler.node_count(), 1);
        assert!(scheduler[source_id].dependents().is_empty());
    }

    #[test]
    fn unknown_input_is_rejected() {
        let mut scheduler = UpdateScheduler::new();
        let source_id = scheduler.add_source(None);

        let err = scheduler
            .add_op(None, smallvec![source_id, NodeId::from(9)], false)
            .unwrap_err();

        assert!(matches!(err, GraphError::UnknownNode(id) if id == NodeId::from(9)));
        assert!(scheduler[source_id].dependents().is_empty());
    }

    #[test]
    fn mark_changed_propagates() {
        let mut scheduler = UpdateScheduler::new();

        // Create a chain: source -> derived1 -> derived2
        let source_id = scheduler.add_source(None);
        let derived1_id = scheduler.add_op(None, smallvec![source_id], false).unwrap();
        let derived2_id = scheduler.add_op(None, smallvec![derived1_id], false).unwrap();
        clean_all(&mut scheduler);

        let to_process = scheduler.mark_changed(&[source_id]);

        assert_eq!(to_process, vec![derived1_id, derived2_id]);
        assert!(scheduler[derived1_id].is_dirty());
        assert!(scheduler[derived2_id].is_dirty());
        assert!(!scheduler[source_id].is_dirty());
    }

    #[test]
    fn diamond_visits_each_node_once_in_order() {
        let mut scheduler = UpdateScheduler::new();

        let a = scheduler.add_source(None);
        let b = scheduler.add_op(None, smallvec![a], false).unwrap();
        let c = scheduler.add_op(None, smallvec![a], false).unwrap();
        let d = scheduler.add_op(None, smallvec![c, b], true).unwrap();
        clean_all(&mut scheduler);

        let order = scheduler.mark_changed(&[a]);

        assert_eq!(order.len(), 3);
        assert_eq!(order.last(), Some(&d));
    }

    #[test]
    fn repeated_input_still_sorts() {
        let mut scheduler = UpdateScheduler::new();

        let a = scheduler.add_source(None);
        let b = scheduler.add_op(None, smallvec![a], false).unwrap();
        let square = scheduler.add_op(None, smallvec![b, b], false).unwrap();

        let order = scheduler.mark_changed(&[a]);
        assert_eq!(order, vec![b, square]);
    }

    #[test]
    fn unrelated_nodes_stay_clean() {
        let mut scheduler = UpdateScheduler::new();

        let a = scheduler.add_source(None);
        let e = scheduler.add_source(None);
        let from_a = scheduler.add_op(None, smallvec![a], false).unwrap();
        let from_e = scheduler.add_op(None, smallvec![e], false).unwrap();
        clean_all(&mut scheduler);

        let order = scheduler.mark_changed(&[e]);

        assert_eq!(order, vec![from_e]);
        assert!(!scheduler[from_a].is_dirty());
    }
}
