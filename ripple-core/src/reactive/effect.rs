//! Triggered Nodes and Push Evaluation
//!
//! A triggered node is an op node that runs as soon as a batch update could
//! affect it, instead of waiting for a read. Triggered nodes are where side
//! effects belong: switching an actuator, writing a log line, notifying a
//! client.
//!
//! # How a Push Works
//!
//! 1. The scheduler marks everything reachable from the changed sources
//!    dirty and returns the affected nodes in topological order.
//!
//! 2. The triggered nodes are picked out of that order and forced one by
//!    one. Forcing pulls in whatever non-triggered ancestors are stale; their
//!    dirty flag guarantees each computes once even when several triggered
//!    nodes share them.
//!
//! 3. Since a triggered node always comes after the triggered nodes it
//!    reads from, no triggered node is forced twice.
//!
//! # Failures
//!
//! The first failing node aborts the rest of the push and its error is
//! returned. Marking has already completed, so nodes that were not reached
//! stay dirty and compute on their next read.
//!
//! # Differences from Lazy Nodes
//!
//! - Lazy op nodes compute on read; triggered nodes compute on change.
//! - Both share the same cache, equality rule and short circuit, so a
//!   triggered node whose inputs did not really change does not run its
//!   operation either.

use super::runtime::Graph;
use crate::error::Result;
use crate::graph::NodeId;

impl<V> Graph<V>
where
    V: Clone + PartialEq + 'static,
{
    /// Run one propagation pass for the given changed sources.
    ///
    /// Returns the triggered nodes that were evaluated, in order.
    pub(crate) fn propagate(&mut self, roots: &[NodeId]) -> Result<Vec<NodeId>> {
        let affected = self.scheduler.mark_changed(roots);
        let triggered: Vec<NodeId> = affected
            .iter()
            .copied()
            .filter(|id| self.scheduler[*id].is_triggered())
            .collect();

        tracing::debug!(
            roots = roots.len(),
            affected = affected.len(),
            triggered = triggered.len(),
            "propagating batch"
        );

        let mut evaluated = Vec::with_capacity(triggered.len());
        for id in triggered {
            if let Err(err) = self.force(id) {
                tracing::warn!(
                    node = %self.scheduler[id].name(),
                    error = %err,
                    "triggered evaluation failed, aborting push"
                );
                return Err(err);
            }
            evaluated.push(id);
        }

        Ok(evaluated)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
