//! Operations and per-node rules.
//!
//! An operation is the function an op node computes: it receives the values
//! of the node's inputs, in the order the inputs were declared, and returns
//! the node's new value.
//!
//! Operations must be pure functions of their inputs. Change suppression
//! skips operations whose inputs did not change, and each affected node is
//! evaluated at most once per batch; both rely on this.

use crate::error::OpError;

/// The computation behind an op node.
///
/// Any `Fn(&[V]) -> Result<V, OpError>` closure is an operation. Wrap
/// infallible closures in [`Infallible`], or use `Graph::op`, which does it
/// for you.
pub trait Operation<V>: Send {
    /// Compute a value from the ordered input values.
    fn apply(&self, inputs: &[V]) -> Result<V, OpError>;
}

impl<V, F> Operation<V> for F
where
    F: Fn(&[V]) -> Result<V, OpError> + Send,
{
    fn apply(&self, inputs: &[V]) -> Result<V, OpError> {
        self(inputs)
    }
}

/// Adapter for operations that cannot fail.
#[derive(Debug, Clone, Copy)]
pub struct Infallible<F>(pub F);

impl<V, F> Operation<V> for Infallible<F>
where
    F: Fn(&[V]) -> V + Send,
{
    fn apply(&self, inputs: &[V]) -> Result<V, OpError> {
        Ok((self.0)(inputs))
    }
}

/// Per-node equality rule deciding whether a value actually changed.
pub type Equality<V> = Box<dyn Fn(&V, &V) -> bool + Send>;

/// Per-node output check, run when output verification is enabled.
pub type Verifier<V> = Box<dyn Fn(&V) -> Result<(), String> + Send>;

/// Compare two cached slots using `equals`, falling back to `PartialEq`.
///
/// `Unset` only equals `Unset`.
pub(crate) fn same_value<V: PartialEq>(
    equals: Option<&Equality<V>>,
    a: Option<&V>,
    b: Option<&V>,
) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => match equals {
            Some(equals) => equals(a, b),
            None => a == b,
        },
        _ => false,
    }
}
