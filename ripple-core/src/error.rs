//! Error types for graph construction and evaluation.

use thiserror::Error;

use crate::graph::NodeId;

/// Error returned by an operation. Any error type can be boxed into it,
/// including plain strings via `.into()`.
pub type OpError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The requested inputs would close a cycle. The graph is unchanged.
    #[error("op node {node} would read from itself")]
    Cycle { node: NodeId },

    /// The handle does not belong to this graph.
    #[error("unknown node handle {0}")]
    UnknownNode(NodeId),

    /// A batch update targeted a node that is not a source.
    #[error("node `{node}` is not a source node")]
    NotASource { node: String },

    /// An operation failed while the node was being forced. The node stays
    /// dirty and keeps its previous value.
    #[error("operation of node `{node}` failed: {source}")]
    Operation {
        node: String,
        #[source]
        source: OpError,
    },

    /// A value was required but a source it depends on was never set.
    #[error("node `{node}` depends on a source that was never set")]
    UnresolvedValue { node: String },

    /// An output verifier rejected the value an operation produced.
    #[error("output of node `{node}` failed verification: {message}")]
    OutputMismatch { node: String, message: String },

    #[error("invalid graph configuration: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
