// SPDX-License-Identifier: MIT OR Apache-2.0
//! Directed view of a link between two pins.

use crate::node::NodeId;
use crate::pin::PinRef;
use serde::{Deserialize, Serialize};

/// A link seen from its output side.
///
/// Links live on the pins themselves; a `Connection` is computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Output pin
    pub source: PinRef,
    /// Input pin
    pub target: PinRef,
}

impl Connection {
    /// Create a new connection
    pub fn new(source: PinRef, target: PinRef) -> Self {
        Self { source, target }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.source.node == node_id || self.target.node == node_id
    }

    /// Check if this connection involves a specific pin
    pub fn involves_pin(&self, pin: PinRef) -> bool {
        self.source == pin || self.target == pin
    }
}
