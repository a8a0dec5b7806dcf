//! Ripple Core
//!
//! This crate provides an incremental dependency graph: sources hold values
//! supplied from outside, op nodes derive values from other nodes, and only
//! the parts affected by a change are ever recomputed.
//!
//! It implements:
//!
//! - Lazy pull evaluation: reading a node recomputes exactly the stale
//!   ancestors it needs
//! - Eager push evaluation: triggered nodes recompute as part of the batch
//!   update that affected them
//! - Change suppression: a node whose inputs did not really change does not
//!   run its operation
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Topology, dirty marking and topological ordering
//! - `reactive`: Value slots, lazy and push evaluation, batch updates
//! - `value`: A dynamic value type and equality rules for it
//! - `config`: Evaluation settings
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust
//! use ripple_core::{Graph, Value};
//!
//! let mut graph = Graph::<Value>::new();
//!
//! let t1 = graph.source().name("temperature_1").build();
//! let t2 = graph.source().name("temperature_2").build();
//!
//! let avg = graph
//!     .op([t1, t2], |v: &[Value]| {
//!         let sum: f64 = v.iter().filter_map(Value::as_float).sum();
//!         Value::Float(sum / v.len() as f64)
//!     })
//!     .name("avg")
//!     .build()
//!     .unwrap();
//!
//! let heater = graph
//!     .op([avg], |v: &[Value]| {
//!         let warm = v[0].as_float().map_or(false, |avg| avg > 20.0);
//!         Value::from(if warm { "Heater off" } else { "Heater on" })
//!     })
//!     .name("heater")
//!     .triggered()
//!     .build()
//!     .unwrap();
//!
//! // The triggered heater runs as part of the update
//! let evaluated = graph
//!     .update_sources([(t1, Value::Float(25.0)), (t2, Value::Float(22.5))])
//!     .unwrap();
//! assert_eq!(evaluated, vec![heater]);
//! assert_eq!(graph.peek(heater), Some(&Value::from("Heater off")));
//! assert_eq!(graph.value(avg).unwrap(), Some(Value::Float(23.75)));
//! ```
//!
//! Operations must be pure functions of their inputs: the graph skips
//! operations whose inputs did not change and runs each affected node at most
//! once per batch.

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod value;

pub use config::GraphConfig;
pub use error::{GraphError, OpError, Result};
pub use graph::{NodeId, NodeKind};
pub use reactive::{Graph, Infallible, OpBuilder, Operation, SharedGraph, SourceBuilder};
pub use value::{Value, ValueKind};
