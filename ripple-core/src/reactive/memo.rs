//! Op Nodes and Lazy Evaluation
//!
//! An op node is a cached derived value. It is computed from an ordered list
//! of inputs and recomputed only when it is dirty and read.
//!
//! # How Reads Work
//!
//! 1. A clean node returns its cached value. The operation is not called.
//!
//! 2. A dirty node first forces its dirty inputs, depth first, using the
//!    explicit stack from `context`.
//!
//! 3. If every input still carries the revision the node last computed
//!    from, nothing it reads has changed: the node is cleaned and keeps its
//!    value without calling the operation.
//!
//! 4. If any input is unset, the node becomes unset without calling the
//!    operation.
//!
//! 5. Otherwise the operation runs on the ordered input values and the
//!    result is cached. A result equal to the previous value (by the node's
//!    equality rule) keeps the previous revision, so dependents
//!    short-circuit in turn.
//!
//! A failing operation leaves the node dirty with its previous value, so the
//! next read tries again.

use super::context::EvalStack;
use super::operation::{same_value, Equality, Infallible, Operation, Verifier};
use super::runtime::{Compute, Graph, Revisions, Slot};
use crate::error::{GraphError, OpError, Result};
use crate::graph::{Inputs, NodeId};
use crate::value::{Value, ValueKind};

/// Builder for an op node. Finish with [`OpBuilder::build`].
pub struct OpBuilder<'g, V> {
    graph: &'g mut Graph<V>,
    inputs: Inputs,
    operation: Box<dyn Operation<V>>,
    name: Option<String>,
    triggered: bool,
    equals: Option<Equality<V>>,
    verify: Option<Verifier<V>>,
}

impl<'g, V> OpBuilder<'g, V>
where
    V: Clone + PartialEq + 'static,
{
    /// Label used in logs and errors. Generated when omitted.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Evaluate this node eagerly whenever a batch update could affect it.
    ///
    /// Building the node does not evaluate it; the first batch that reaches
    /// it (or the first read) does.
    pub fn triggered(self) -> Self {
        self.triggered_if(true)
    }

    pub fn triggered_if(mut self, triggered: bool) -> Self {
        self.triggered = triggered;
        self
    }

    /// Equality rule deciding whether a recomputed value is a change.
    pub fn equals<F>(mut self, equals: F) -> Self
    where
        F: Fn(&V, &V) -> bool + Send + 'static,
    {
        self.equals = Some(Box::new(equals));
        self
    }

    /// Output check, run after each operation call when
    /// [`GraphConfig::verify_outputs`](crate::GraphConfig) is enabled.
    pub fn verify<F>(mut self, verify: F) -> Self
    where
        F: Fn(&V) -> std::result::Result<(), String> + Send + 'static,
    {
        self.verify = Some(Box::new(verify));
        self
    }

    /// Add the node to the graph.
    ///
    /// Fails with `UnknownNode` if an input is not part of this graph, and
    /// with `Cycle` if the node would read from itself. On failure the
    /// graph is unchanged.
    pub fn build(self) -> Result<NodeId> {
        let graph = self.graph;
        let id = graph
            .scheduler
            .add_op(self.name, self.inputs, self.triggered)?;
        graph.slots.push(Slot {
            value: None,
            changed_at: 0,
            equals: self.equals,
            compute: Some(Compute {
                operation: self.operation,
                verify: self.verify,
                computed_from: None,
            }),
        });
        debug_assert_eq!(graph.slots.len(), graph.scheduler.node_count());
        tracing::debug!(
            node = %graph.scheduler[id].name(),
            triggered = graph.scheduler[id].is_triggered(),
            "added op node"
        );
        Ok(id)
    }
}

impl<'g> OpBuilder<'g, Value> {
    /// Require outputs of the given kind when verification is enabled.
    pub fn output_kind(self, kind: ValueKind) -> Self {
        self.verify(move |value: &Value| {
            if value.kind() == kind {
                Ok(())
            } else {
                Err(format!("expected {kind} output, got {}", value.kind()))
            }
        })
    }
}

impl<V> Graph<V>
where
    V: Clone + PartialEq + 'static,
{
    /// Start building an op node from an operation that cannot fail.
    pub fn op<I, F>(&mut self, inputs: I, operation: F) -> OpBuilder<'_, V>
    where
        I: IntoIterator<Item = NodeId>,
        F: Fn(&[V]) -> V + Send + 'static,
    {
        self.op_with(inputs, Box::new(Infallible(operation)))
    }

    /// Start building an op node from a fallible operation.
    pub fn try_op<I, F>(&mut self, inputs: I, operation: F) -> OpBuilder<'_, V>
    where
        I: IntoIterator<Item = NodeId>,
        F: Fn(&[V]) -> std::result::Result<V, OpError> + Send + 'static,
    {
        self.op_with(inputs, Box::new(operation))
    }

    /// Start building an op node from any [`Operation`].
    pub fn op_with<I>(&mut self, inputs: I, operation: Box<dyn Operation<V>>) -> OpBuilder<'_, V>
    where
        I: IntoIterator<Item = NodeId>,
    {
        OpBuilder {
            graph: self,
            inputs: inputs.into_iter().collect(),
            operation,
            name: None,
            triggered: false,
            equals: None,
            verify: None,
        }
    }

    /// Read a node's value, recomputing stale ancestors as needed.
    ///
    /// Returns `None` when the node is unset: a source that was never set,
    /// or an op node that transitively reads one.
    pub fn value(&mut self, id: NodeId) -> Result<Option<V>> {
        self.force(id)?;
        Ok(self.slots[id.index()].value.clone())
    }

    /// Like [`Graph::value`], but an unset result is an error.
    pub fn require(&mut self, id: NodeId) -> Result<V> {
        match self.value(id)? {
            Some(value) => Ok(value),
            None => Err(GraphError::UnresolvedValue {
                node: self.scheduler[id].name().to_owned(),
            }),
        }
    }

    /// Bring a node up to date.
    pub(crate) fn force(&mut self, id: NodeId) -> Result<()> {
        if !self.scheduler.node(id)?.is_dirty() {
            return Ok(());
        }

        let mut stack = EvalStack::new(id);
        while let Some((node_id, expanded)) = stack.top() {
            let node = &self.scheduler[node_id];
            if !node.is_dirty() {
                stack.pop();
                continue;
            }

            if !expanded {
                let pending: Inputs = node
                    .inputs()
                    .iter()
                    .rev()
                    .copied()
                    .filter(|input| self.scheduler[*input].is_dirty())
                    .collect();
                stack.expand_top();
                stack.extend(pending);
                continue;
            }

            stack.pop();
            self.recompute(node_id)?;
        }

        tracing::trace!(
            node = %self.scheduler[id].name(),
            depth = stack.max_depth(),
            "forced"
        );
        Ok(())
    }

    /// Compute a dirty node whose inputs are all clean.
    fn recompute(&mut self, id: NodeId) -> Result<()> {
        let node = &self.scheduler[id];
        let slot = &self.slots[id.index()];
        let Some(compute) = slot.compute.as_ref() else {
            // Sources are never dirty
            self.scheduler.node_mut(id).mark_clean();
            return Ok(());
        };

        let revisions: Revisions = node
            .inputs()
            .iter()
            .map(|input| self.slots[input.index()].changed_at)
            .collect();

        if self.config.short_circuit && compute.computed_from.as_ref() == Some(&revisions) {
            tracing::debug!(node = %node.name(), "inputs unchanged, operation skipped");
            self.scheduler.node_mut(id).mark_clean();
            return Ok(());
        }

        let arguments: Option<Vec<V>> = node
            .inputs()
            .iter()
            .map(|input| self.slots[input.index()].value.clone())
            .collect();

        let result = match arguments {
            None => None,
            Some(arguments) => {
                let value = compute
                    .operation
                    .apply(&arguments)
                    .map_err(|source| GraphError::Operation {
                        node: node.name().to_owned(),
                        source,
                    })?;

                if self.config.verify_outputs {
                    if let Some(verify) = &compute.verify {
                        verify(&value).map_err(|message| GraphError::OutputMismatch {
                            node: node.name().to_owned(),
                            message,
                        })?;
                    }
                }
                Some(value)
            }
        };

        let changed = !same_value(slot.equals.as_ref(), slot.value.as_ref(), result.as_ref());
        tracing::debug!(node = %node.name(), changed, unset = result.is_none(), "evaluated");

        // An equal result is stored without a new revision
        let slot = &mut self.slots[id.index()];
        if let Some(compute) = slot.compute.as_mut() {
            compute.computed_from = Some(revisions);
        }
        slot.value = result;
        if changed {
            self.bump(id);
        }
        self.scheduler.node_mut(id).mark_clean();
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicI32>, Arc<AtomicI32>) {
        let count = Arc::new(AtomicI32::new(0));
        (count.clone(), count)
    }

    #[test]
    fn op_computes_on_first_access() {
        let (call_count, call_count_clone) = counter();
        let mut graph = Graph::<i64>::new();
        let a = graph.source().value(21).build();
        let double = graph
            .op([a], move |v: &[i64]| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
                v[0] * 2
            })
            .build()
            .unwrap();

        // Not computed yet
        assert_eq!(graph.peek(double), None);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        assert_eq!(graph.value(double).unwrap(), Some(42));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(!graph.is_dirty(double).unwrap());
    }

    #[test]
    fn op_caches_value_when_clean() {
        let (call_count, call_count_clone) = counter();
        let mut graph = Graph::<i64>::new();
        let a = graph.source().value(1).build();
        let node = graph
            .op([a], move |v: &[i64]| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
                v[0] + 41
            })
            .build()
            .unwrap();

        assert_eq!(graph.value(node).unwrap(), Some(42));
        assert_eq!(graph.value(node).unwrap(), Some(42));
        assert_eq!(graph.value(node).unwrap(), Some(42));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inputs_are_passed_in_declared_order() {
        let mut graph = Graph::<i64>::new();
        let a = graph.source().value(10).build();
        let b = graph.source().value(3).build();
        let diff = graph.op([a, b], |v: &[i64]| v[0] - v[1]).build().unwrap();
        let reversed = graph.op([b, a], |v: &[i64]| v[0] - v[1]).build().unwrap();

        assert_eq!(graph.value(diff).unwrap(), Some(7));
        assert_eq!(graph.value(reversed).unwrap(), Some(-7));
    }

    #[test]
    fn same_input_twice() {
        let mut graph = Graph::<i64>::new();
        let a = graph.source().value(3).build();
        let square = graph.op([a, a], |v: &[i64]| v[0] * v[1]).build().unwrap();

        assert_eq!(graph.value(square).unwrap(), Some(9));
        graph.set(a, 4).unwrap();
        assert_eq!(graph.value(square).unwrap(), Some(16));
    }

    #[test]
    fn constant_op_without_inputs() {
        let (call_count, call_count_clone) = counter();
        let mut graph = Graph::<i64>::new();
        let seven = graph
            .op([], move |_: &[i64]| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
                7
            })
            .build()
            .unwrap();

        assert_eq!(graph.value(seven).unwrap(), Some(7));
        assert_eq!(graph.value(seven).unwrap(), Some(7));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unset_input_propagates_without_calling_operation() {
        let (call_count, call_count_clone) = counter();
        let mut graph = Graph::<i64>::new();
        let a = graph.source().value(1).build();
        let b = graph.add_source();
        let sum = graph
            .op([a, b], move |v: &[i64]| {
                call_count_clone.fetch_add(1, Ordering::SeqCst);
                v.iter().sum()
            })
            .build()
            .unwrap();
        let downstream = graph.op([sum], |v: &[i64]| v[0] + 1).build().unwrap();

        assert_eq!(graph.value(downstream).unwrap(), None);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        assert!(!graph.is_dirty(sum).unwrap());

        let err = graph.require(downstream).unwrap_err();
        assert!(matches!(err, GraphError::UnresolvedValue { .. }));

        graph.set(b, 2).unwrap();
        assert_eq!(graph.require(downstream).unwrap(), 4);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_operation_keeps_previous_state() {
        let mut graph = Graph::<i64>::new();
        let a = graph.source().value(4).build();
        let half = graph
            .try_op([a], |v: &[i64]| {
                if v[0] % 2 == 0 {
                    Ok(v[0] / 2)
                } else {
                    Err(format!("{} is odd", v[0]).into())
                }
            })
            .name("half")
            .build()
            .unwrap();

        assert_eq!(graph.value(half).unwrap(), Some(2));

        graph.set(a, 5).unwrap();
        let err = graph.value(half).unwrap_err();
        assert_eq!(err.to_string(), "operation of node `half` failed: 5 is odd");
        assert!(graph.is_dirty(half).unwrap());
        assert_eq!(graph.peek(half), Some(&2));

        // The next read retries
        graph.set(a, 10).unwrap();
        assert_eq!(graph.value(half).unwrap(), Some(5));
    }

    #[test]
    fn unchanged_result_short_circuits_dependents() {
        let (sign_calls, sign_calls_clone) = counter();
        let (label_calls, label_calls_clone) = counter();
        let mut graph = Graph::<i64>::new();
        let a = graph.source().value(5).build();
        let sign = graph
            .op([a], move |v: &[i64]| {
                sign_calls_clone.fetch_add(1, Ordering::SeqCst);
                v[0].signum()
            })
            .build()
            .unwrap();
        let label = graph
            .op([sign], move |v: &[i64]| {
                label_calls_clone.fetch_add(1, Ordering::SeqCst);
                v[0] * 100
            })
            .build()
            .unwrap();

        assert_eq!(graph.value(label).unwrap(), Some(100));

        graph.set(a, 9).unwrap();
        assert!(graph.is_dirty(label).unwrap());
        assert_eq!(graph.value(label).unwrap(), Some(100));
        assert_eq!(sign_calls.load(Ordering::SeqCst), 2);
        assert_eq!(label_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn equal_result_is_stored_without_new_revision() {
        let (dependent_calls, dependent_calls_clone) = counter();
        let mut graph = Graph::<i64>::new();
        let a = graph.source().value(10).build();
        let coarse = graph
            .op([a], |v: &[i64]| v[0])
            .equals(|x: &i64, y: &i64| (x - y).abs() <= 5)
            .build()
            .unwrap();
        let dependent = graph
            .op([coarse], move |v: &[i64]| {
                dependent_calls_clone.fetch_add(1, Ordering::SeqCst);
                v[0]
            })
            .build()
            .unwrap();

        assert_eq!(graph.value(dependent).unwrap(), Some(10));
        let revision = graph.revision();

        graph.set(a, 12).unwrap();
        assert_eq!(graph.value(coarse).unwrap(), Some(12));
        assert_eq!(graph.value(dependent).unwrap(), Some(10));
        assert_eq!(dependent_calls.load(Ordering::SeqCst), 1);
        // Only the source advanced the revision
        assert_eq!(graph.revision(), revision + 1);
    }

    #[test]
    fn disabling_short_circuit_reruns_operations() {
        let (label_calls, label_calls_clone) = counter();
        let mut graph = Graph::<i64>::with_config(GraphConfig::default().with_short_circuit(false));
        let a = graph.source().value(5).build();
        let sign = graph.op([a], |v: &[i64]| v[0].signum()).build().unwrap();
        let label = graph
            .op([sign], move |v: &[i64]| {
                label_calls_clone.fetch_add(1, Ordering::SeqCst);
                v[0] * 100
            })
            .build()
            .unwrap();

        graph.value(label).unwrap();
        graph.set(a, 9).unwrap();
        graph.value(label).unwrap();
        assert_eq!(label_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn output_verification() {
        let config = GraphConfig::default().with_verify_outputs(true);
        let mut graph = Graph::<Value>::with_config(config);
        let a = graph.source().value(Value::Float(2.0)).build();
        let wrong = graph
            .op([a], |v: &[Value]| Value::Bool(v[0].as_float().unwrap_or(0.0) > 1.0))
            .name("wrong")
            .output_kind(ValueKind::Float)
            .build()
            .unwrap();

        let err = graph.value(wrong).unwrap_err();
        assert!(matches!(err, GraphError::OutputMismatch { ref node, .. } if node == "wrong"));
        assert!(graph.is_dirty(wrong).unwrap());
        assert_eq!(graph.peek(wrong), None);
    }

    #[test]
    fn verification_is_off_by_default() {
        let mut graph = Graph::<Value>::new();
        let a = graph.source().value(Value::Float(2.0)).build();
        let wrong = graph
            .op([a], |_: &[Value]| Value::Unit)
            .output_kind(ValueKind::Float)
            .build()
            .unwrap();

        assert_eq!(graph.value(wrong).unwrap(), Some(Value::Unit));
    }

    #[test]
    fn custom_operation_type() {
        struct Scale(i64);

        impl Operation<i64> for Scale {
            fn apply(&self, inputs: &[i64]) -> std::result::Result<i64, OpError> {
                Ok(inputs[0] * self.0)
            }
        }

        let mut graph = Graph::<i64>::new();
        let a = graph.source().value(3).build();
        let scaled = graph.op_with([a], Box::new(Scale(4))).build().unwrap();

        assert_eq!(graph.value(scaled).unwrap(), Some(12));
    }

    #[test]
    fn value_of_unknown_node() {
        let mut graph = Graph::<i64>::new();
        assert!(matches!(
            graph.value(NodeId::from(3)),
            Err(GraphError::UnknownNode(_))
        ));
    }
}
