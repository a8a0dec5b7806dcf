//! Evaluation Engine
//!
//! This module implements the value side of the graph: sources, op nodes,
//! triggered nodes, and the engines that keep their cached values correct.
//!
//! # Concepts
//!
//! ## Sources
//!
//! A source holds a value supplied from outside the graph. Setting it to a
//! value that differs from the current one (by its equality rule) makes it a
//! changed root of the next propagation pass.
//!
//! ## Op Nodes
//!
//! An op node computes its value from an ordered list of inputs. It caches
//! the result and recomputes only when it is dirty and read (lazy pull).
//!
//! ## Triggered Nodes
//!
//! A triggered node is an op node that is forced as part of the batch update
//! that affected it (eager push). Use them for side effects.
//!
//! # Implementation Notes
//!
//! Dirtiness is set pessimistically for everything downstream of a change.
//! Wasted work is avoided at evaluation time instead: a dirty node whose
//! inputs all kept their revision does not call its operation, and a node
//! that recomputes to an equal value keeps its revision.

mod context;
mod effect;
mod memo;
mod operation;
mod runtime;
mod shared;
mod signal;

pub use memo::OpBuilder;
pub use operation::{Equality, Infallible, Operation, Verifier};
pub use runtime::Graph;
pub use shared::SharedGraph;
pub use signal::SourceBuilder;
