//! Dependency Graph
//!
//! This module implements the topology of the computational graph: which
//! nodes exist, which nodes read from which, and which nodes are dirty.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are either sources (values supplied from outside) or ops
//!   (values computed from other nodes)
//! - Edges represent dependencies: if A reads B, there is an edge from B to A
//!
//! When a source changes, we traverse the graph to find all affected nodes
//! and mark them as dirty. The evaluation engine in `reactive` then decides
//! which dirty nodes actually need to run their operation.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena and refer to each other by `NodeId`, so the
//!    forward (inputs) and reverse (dependents) edges never form ownership
//!    cycles.
//!
//! 2. Topology is fixed once a node is created. A node can only read nodes
//!    that already exist, which keeps the graph acyclic by construction.
//!
//! 3. We maintain both forward and reverse edges to enable efficient
//!    traversal in both directions.

mod node;
mod scheduler;

pub use node::{Inputs, Node, NodeId, NodeKind};
pub use scheduler::UpdateScheduler;
