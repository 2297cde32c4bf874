// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for script editing, persistence and execution.

use crate::node::NodeId;
use crate::pin::PinRef;
use thiserror::Error;

/// Error when linking two pins
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Pin not found on its node
    #[error("Pin not found: {0:?}")]
    PinNotFound(PinRef),

    /// Both pins point the same way
    #[error("Pins have the same direction")]
    SameDirection,

    /// Execution pin linked to a data pin
    #[error("Cannot link an execution pin to a data pin")]
    ExecutionMismatch,

    /// Data types are not compatible
    #[error("Incompatible pin types: {from} -> {to}")]
    IncompatibleTypes {
        /// Source pin type
        from: crate::value::VariantType,
        /// Target pin type
        to: crate::value::VariantType,
    },

    /// Self-loop not allowed
    #[error("Self-loop not allowed")]
    SelfLoop,

    /// The two pins are already linked
    #[error("Pins are already linked")]
    AlreadyLinked,

    /// Pin only accepts a single link and already has one
    #[error("Pin already connected: {0:?}")]
    PinAlreadyConnected(PinRef),
}

/// Error when editing the graphs of an orchestration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Graph not found
    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    /// A graph with this name already exists
    #[error("Graph already exists: {0}")]
    DuplicateGraph(String),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Another node already holds this id
    #[error("Node id already in use: {0}")]
    NodeIdTaken(NodeId),

    /// No fresh node id is left
    #[error("No node ids left")]
    NodeIdsExhausted,

    /// Node refuses to live in the graph
    #[error("Node {node} is not compatible with graph {graph}")]
    IncompatibleNode {
        /// The rejected node
        node: NodeId,
        /// The graph name
        graph: String,
    },
}

/// Error when an orchestration fails build validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// One or more nodes reported an invalid configuration
    #[error("Invalid nodes: {0:?}")]
    InvalidNodes(Vec<NodeId>),
}

/// Error when saving or loading an orchestration
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// RON serialization error
    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),

    /// RON parse error
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file names a node kind the registry does not know
    #[error("Unknown node kind: {0}")]
    UnknownNodeKind(String),

    /// Two node records share an id
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    /// A node record carries no usable id
    #[error("Invalid node id: {0}")]
    InvalidNodeId(NodeId),

    /// The orchestration could not take a node
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// File written by a newer format
    #[error("Orchestration version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the file
        found: u32,
        /// Newest supported version
        supported: u32,
    },
}

/// Error raised by the execution driver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Execution did not finish within the configured number of steps
    #[error("Step limit of {0} exceeded")]
    StepLimitExceeded(usize),

    /// Pure data evaluation looped back on itself
    #[error("Data dependency cycle at node {0}")]
    DataCycle(NodeId),

    /// A step returned an exit the node does not have
    #[error("Node {node} returned exit {exit} but has {count} execution outputs")]
    ExitOutOfRange {
        /// Stepping node
        node: NodeId,
        /// Returned exit index
        exit: usize,
        /// Number of execution outputs
        count: usize,
    },

    /// A node raised an error through the execution context
    #[error("Node {node} failed: {message}")]
    NodeFailed {
        /// Failing node
        node: NodeId,
        /// Error message
        message: String,
    },
}
