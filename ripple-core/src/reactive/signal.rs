//! Source Nodes
//!
//! A source is a leaf of the graph. Its value is supplied from outside, it
//! has no inputs, and it is never dirty: whatever was last assigned is
//! authoritative.
//!
//! # How Sources Work
//!
//! 1. A source starts unset, or with the initial value given to its builder.
//!
//! 2. Assigning a value equal to the current one (by the source's equality
//!    rule) does nothing.
//!
//! 3. Assigning a different value, or the first value, stores it, advances
//!    the revision, and makes the source a root of the next propagation pass.

use super::operation::{same_value, Equality};
use super::runtime::{Graph, Slot};
use crate::graph::NodeId;

/// Builder for a source node. Finish with [`SourceBuilder::build`].
pub struct SourceBuilder<'g, V> {
    graph: &'g mut Graph<V>,
    name: Option<String>,
    value: Option<V>,
    equals: Option<Equality<V>>,
}

impl<'g, V> SourceBuilder<'g, V>
where
    V: Clone + PartialEq + 'static,
{
    /// Label used in logs and errors. Generated when omitted.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Initial value. Without one the source starts unset.
    pub fn value(mut self, value: V) -> Self {
        self.value = Some(value);
        self
    }

    /// Equality rule deciding whether a new value is a change.
    pub fn equals<F>(mut self, equals: F) -> Self
    where
        F: Fn(&V, &V) -> bool + Send + 'static,
    {
        self.equals = Some(Box::new(equals));
        self
    }

    /// Add the source to the graph.
    pub fn build(self) -> NodeId {
        let graph = self.graph;
        let id = graph.scheduler.add_source(self.name);
        let changed_at = if self.value.is_some() {
            graph.revision += 1;
            graph.revision
        } else {
            0
        };
        graph.slots.push(Slot {
            value: self.value,
            changed_at,
            equals: self.equals,
            compute: None,
        });
        tracing::debug!(node = %graph.scheduler[id].name(), "added source");
        id
    }
}

impl<V> Graph<V>
where
    V: Clone + PartialEq + 'static,
{
    /// Start building a source node.
    pub fn source(&mut self) -> SourceBuilder<'_, V> {
        SourceBuilder {
            graph: self,
            name: None,
            value: None,
            equals: None,
        }
    }

    /// Add an unnamed, unset source.
    pub fn add_source(&mut self) -> NodeId {
        self.source().build()
    }

    /// Store a new source value.
    ///
    /// Returns whether the value changed, i.e. whether the source must be
    /// propagated.
    pub(crate) fn assign(&mut self, id: NodeId, value: V) -> bool {
        let slot = &mut self.slots[id.index()];
        if slot.value.is_some()
            && same_value(slot.equals.as_ref(), slot.value.as_ref(), Some(&value))
        {
            return false;
        }

        slot.value = Some(value);
        self.bump(id);
        tracing::trace!(node = %self.scheduler[id].name(), "source changed");
        true
    }
}
