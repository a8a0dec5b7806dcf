//! Shared Graph
//!
//! The graph itself is single threaded: reads and batch updates take
//! `&mut self`. `SharedGraph` puts it behind a mutex so several threads can
//! drive it, with every batch update (marking and the whole push phase) and
//! every read running under one lock acquisition.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::runtime::Graph;
use crate::error::Result;
use crate::graph::NodeId;

/// A cloneable, thread-safe handle to a [`Graph`].
pub struct SharedGraph<V> {
    inner: Arc<Mutex<Graph<V>>>,
}

impl<V> SharedGraph<V>
where
    V: Clone + PartialEq + 'static,
{
    pub fn new(graph: Graph<V>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(graph)),
        }
    }

    /// Lock the graph for a sequence of calls, e.g. building nodes.
    pub fn lock(&self) -> MutexGuard<'_, Graph<V>> {
        self.inner.lock()
    }

    /// Run a closure with exclusive access to the graph.
    pub fn with<R>(&self, f: impl FnOnce(&mut Graph<V>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn update_sources<I>(&self, pairs: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator<Item = (NodeId, V)>,
    {
        self.inner.lock().update_sources(pairs)
    }

    pub fn set(&self, source: NodeId, value: V) -> Result<Vec<NodeId>> {
        self.inner.lock().set(source, value)
    }

    pub fn value(&self, id: NodeId) -> Result<Option<V>> {
        self.inner.lock().value(id)
    }

    pub fn require(&self, id: NodeId) -> Result<V> {
        self.inner.lock().require(id)
    }
}

impl<V> Clone for SharedGraph<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> From<Graph<V>> for SharedGraph<V>
where
    V: Clone + PartialEq + 'static,
{
    fn from(graph: Graph<V>) -> Self {
        Self::new(graph)
    }
}

impl<V> std::fmt::Debug for SharedGraph<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedGraph")
            .field("graph", &*self.inner.lock())
            .finish()
    }
}
