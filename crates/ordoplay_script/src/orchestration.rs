// SPDX-License-Identifier: MIT OR Apache-2.0
//! The orchestration: the container that owns a script's nodes and graphs.
//!
//! Every edit that touches more than one node goes through here. Links are
//! recorded on both pins, and this module keeps the two sides in step when
//! pins are linked, unlinked, removed or rebuilt by a reconstruction.

use crate::connection::Connection;
use crate::context::NodeInitContext;
use crate::error::{BuildError, GraphError, LinkError};
use crate::flags::GraphFlags;
use crate::graph::ScriptGraph;
use crate::node::{NodeCore, NodeId, NodeRegistry, ScriptNode};
use crate::pin::{Pin, PinDirection, PinId, PinRef};
use crate::value::{Variant, VariantType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an orchestration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrchestrationId(pub Uuid);

impl OrchestrationId {
    /// Create a new random orchestration ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrchestrationId {
    fn default() -> Self {
        Self::new()
    }
}

/// A script: nodes, the links between their pins and the graphs that group
/// them.
#[derive(Debug)]
pub struct Orchestration {
    id: OrchestrationId,
    /// Orchestration name
    pub name: String,
    nodes: IndexMap<NodeId, ScriptNode>,
    graphs: IndexMap<String, ScriptGraph>,
    next_node_id: i32,
}

impl Orchestration {
    /// Create an empty orchestration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: OrchestrationId::new(),
            name: name.into(),
            nodes: IndexMap::new(),
            graphs: IndexMap::new(),
            next_node_id: 1,
        }
    }

    /// Orchestration id
    pub fn id(&self) -> OrchestrationId {
        self.id
    }

    // ---- Nodes ----

    /// Take ownership of a node.
    ///
    /// An unassigned node receives the next free id; a node that already has
    /// an id keeps it, provided no other node holds it.
    pub fn add_node(&mut self, mut node: ScriptNode) -> Result<NodeId, GraphError> {
        let id = node.id();
        let id = if id.is_assigned() {
            if self.nodes.contains_key(&id) {
                return Err(GraphError::NodeIdTaken(id));
            }
            id
        } else {
            let id = NodeId(self.next_node_id);
            if self.nodes.contains_key(&id) {
                tracing::warn!("no fresh node id left");
                return Err(GraphError::NodeIdsExhausted);
            }
            node.core_mut().set_id(id);
            id
        };
        self.next_node_id = self.next_node_id.max(id.0.saturating_add(1));

        node.core_mut().set_owner(Some(self.id));
        tracing::debug!(node = %id, kind = node.kind().type_name(), "node added");
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Create a node from the catalog and place it at `position`
    pub fn create_node(
        &mut self,
        registry: &NodeRegistry,
        kind: &str,
        context: &NodeInitContext,
        position: [f32; 2],
    ) -> Option<NodeId> {
        let Some(mut node) = registry.create_node(kind, context) else {
            tracing::warn!(kind, "unknown node kind");
            return None;
        };
        node.core_mut().set_position(position);
        let id = self.add_node(node).ok()?;

        if let Some(node) = self.nodes.get_mut(&id) {
            let (core, kind) = node.split_mut();
            kind.post_placed_new_node(core);
        }
        self.apply_pending_reconstruction(id);
        Some(id)
    }

    /// Remove a node, unlinking every pin and dropping it from all graphs
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<ScriptNode> {
        {
            let node = self.nodes.get_mut(&node_id)?;
            let (core, kind) = node.split_mut();
            kind.pre_remove(core);
        }

        let pins: Vec<PinRef> = self.nodes.get(&node_id)?.core().find_pins(None).map(Pin::pin_ref).collect();
        for pin in pins {
            self.unlink_all(pin);
        }
        for graph in self.graphs.values_mut() {
            graph.remove(node_id);
        }

        let mut node = self.nodes.shift_remove(&node_id)?;
        node.core_mut().set_owner(None);
        tracing::debug!(node = %node_id, "node removed");
        Some(node)
    }

    /// Paste a copy of a node, offset from the original.
    ///
    /// The copy joins every graph the original belongs to.
    pub fn duplicate_node(&mut self, node_id: NodeId, offset: [f32; 2]) -> Option<NodeId> {
        let source = self.nodes.get(&node_id)?;
        let mut copy = source.duplicate();
        let [x, y] = source.core().position();
        copy.core_mut().set_position([x + offset[0], y + offset[1]]);

        let id = self.add_node(copy).ok()?;
        for graph in self.graphs.values_mut() {
            if graph.contains(node_id) {
                graph.insert(id);
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            let (core, kind) = node.split_mut();
            kind.post_paste_node(core);
        }
        self.apply_pending_reconstruction(id);
        Some(id)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&ScriptNode> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut ScriptNode> {
        self.nodes.get_mut(&node_id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &ScriptNode> {
        self.nodes.values()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes drawn as entry points
    pub fn entry_nodes(&self) -> impl Iterator<Item = &ScriptNode> {
        self.nodes.values().filter(|node| node.kind().draw_node_as_entry())
    }

    /// Look up a pin
    pub fn pin(&self, pin: PinRef) -> Option<&Pin> {
        self.nodes.get(&pin.node)?.core().pin(pin.pin)
    }

    fn pin_mut(&mut self, pin: PinRef) -> Option<&mut Pin> {
        self.nodes.get_mut(&pin.node)?.core_mut().pin_mut(pin.pin)
    }

    // ---- Links ----

    /// Link two pins. Either may be the output.
    pub fn link(&mut self, a: PinRef, b: PinRef) -> Result<(), LinkError> {
        let pin_a = self.require_pin(a)?;
        let pin_b = self.require_pin(b)?;
        if let Err(error) = check_link(pin_a, pin_b) {
            tracing::warn!(%error, ?a, ?b, "link rejected");
            return Err(error);
        }

        if let Some(pin) = self.pin_mut(a) {
            pin.add_link(b);
        }
        if let Some(pin) = self.pin_mut(b) {
            pin.add_link(a);
        }
        self.notify_connected(a);
        self.notify_connected(b);
        tracing::debug!(from = %a.node, to = %b.node, "pins linked");
        Ok(())
    }

    /// Remove the link between two pins. Returns whether it existed.
    pub fn unlink(&mut self, a: PinRef, b: PinRef) -> bool {
        let removed_a = self.pin_mut(a).is_some_and(|pin| pin.remove_link(b));
        let removed_b = self.pin_mut(b).is_some_and(|pin| pin.remove_link(a));
        if removed_a {
            self.notify_disconnected(a);
        }
        if removed_b {
            self.notify_disconnected(b);
        }
        if removed_a || removed_b {
            tracing::debug!(from = %a.node, to = %b.node, "pins unlinked");
        }
        removed_a || removed_b
    }

    /// Remove every link of a pin. Returns how many were removed.
    pub fn unlink_all(&mut self, pin: PinRef) -> usize {
        let partners = self.pin(pin).map(|p| p.connections().to_vec()).unwrap_or_default();
        partners
            .into_iter()
            .filter(|partner| self.unlink(pin, *partner))
            .count()
    }

    /// Remove a pin from its node, unlinking it first
    pub fn remove_pin(&mut self, pin: PinRef) -> bool {
        if self.pin(pin).is_none() {
            return false;
        }
        self.unlink_all(pin);
        let removed = self
            .nodes
            .get_mut(&pin.node)
            .and_then(|node| node.core_mut().take_pin(pin.pin));
        if let Some(removed) = &removed {
            tracing::debug!(node = %pin.node, pin = removed.name(), "pin removed");
        }
        removed.is_some()
    }

    /// Set an input pin's default value and notify its node
    pub fn set_pin_default_value(&mut self, pin: PinRef, value: Variant) -> bool {
        let Some(node) = self.nodes.get_mut(&pin.node) else {
            return false;
        };
        let (core, kind) = node.split_mut();
        let changed = core
            .pin_mut(pin.pin)
            .is_some_and(|p| p.is_input() && p.set_default_value(value));
        if changed {
            kind.pin_default_value_changed(core, pin.pin);
        }
        changed
    }

    /// Every link, seen from its output pin
    pub fn connections(&self) -> Vec<Connection> {
        self.nodes
            .values()
            .flat_map(|node| node.core().find_pins(Some(PinDirection::Output)))
            .flat_map(|pin| {
                pin.connections()
                    .iter()
                    .map(move |target| Connection::new(pin.pin_ref(), *target))
            })
            .collect()
    }

    fn require_pin(&self, pin: PinRef) -> Result<&Pin, LinkError> {
        let node = self.nodes.get(&pin.node).ok_or(LinkError::NodeNotFound(pin.node))?;
        node.core().pin(pin.pin).ok_or(LinkError::PinNotFound(pin))
    }

    fn notify_connected(&mut self, pin: PinRef) {
        if let Some(node) = self.nodes.get_mut(&pin.node) {
            let (core, kind) = node.split_mut();
            kind.on_pin_connected(core, pin.pin);
        }
    }

    fn notify_disconnected(&mut self, pin: PinRef) {
        if let Some(node) = self.nodes.get_mut(&pin.node) {
            let (core, kind) = node.split_mut();
            kind.on_pin_disconnected(core, pin.pin);
        }
    }

    // ---- Editing ----

    /// Rebuild a node's pins and carry surviving links across.
    ///
    /// Links whose new local pin no longer accepts the remote pin are
    /// removed from both ends. Returns false when the node is missing or
    /// already reconstructing.
    pub fn reconstruct_node(&mut self, node_id: NodeId) -> bool {
        let Some(outcome) = self.nodes.get_mut(&node_id).and_then(ScriptNode::rebuild_pins) else {
            return false;
        };
        let mut lost = Vec::new();

        for (remote, old, new) in outcome.retargeted {
            let old_ref = PinRef::new(node_id, old);
            let new_ref = PinRef::new(node_id, new);
            let still_valid = match (self.pin(new_ref), self.pin(remote)) {
                (Some(local), Some(remote_pin)) => local.can_link_to(remote_pin).is_ok(),
                _ => false,
            };

            if still_valid {
                if let Some(pin) = self.pin_mut(remote) {
                    pin.replace_link(old_ref, new_ref);
                }
            } else {
                if let Some(pin) = self.pin_mut(remote) {
                    pin.remove_link(old_ref);
                }
                if let Some(pin) = self.pin_mut(new_ref) {
                    pin.remove_link(remote);
                }
                tracing::debug!(node = %node_id, remote = %remote.node, "link dropped by reconstruction");
                self.notify_disconnected(remote);
                lost.push(new);
            }
        }

        for (remote, old) in outcome.dropped {
            if let Some(pin) = self.pin_mut(remote) {
                pin.remove_link(PinRef::new(node_id, old));
            }
            tracing::debug!(node = %node_id, remote = %remote.node, "link dropped by reconstruction");
            self.notify_disconnected(remote);
            lost.push(old);
        }

        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.finish_reconstruction();
        }
        for pin in lost {
            self.notify_disconnected(PinRef::new(node_id, pin));
        }
        true
    }

    /// Reconstruct a node if one of its hooks asked for it
    pub(crate) fn apply_pending_reconstruction(&mut self, node_id: NodeId) -> bool {
        let pending = self
            .nodes
            .get_mut(&node_id)
            .is_some_and(|node| node.core_mut().take_pins_changed());
        pending && self.reconstruct_node(node_id)
    }

    /// Set a kind property, reconstructing when the pin shape depends on it
    pub fn set_node_property(&mut self, node_id: NodeId, name: &str, value: &Variant) -> bool {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return false;
        };
        let (core, kind) = node.split_mut();
        if !kind.set_property(core, name, value) {
            return false;
        }
        self.apply_pending_reconstruction(node_id);
        true
    }

    /// Retype a node's pins
    pub fn change_pin_types(&mut self, node_id: NodeId, value_type: VariantType) -> bool {
        let Some(node) = self.nodes.get_mut(&node_id) else {
            return false;
        };
        let (core, kind) = node.split_mut();
        if !kind.can_change_pin_type() || !kind.change_pin_types(core, value_type) {
            return false;
        }
        self.apply_pending_reconstruction(node_id);
        true
    }

    /// Let `node_id` wire itself to the freshly connected `other`.
    ///
    /// `direction` is the direction of the pin on `other` the user dragged
    /// from.
    pub fn autowire_node(&mut self, node_id: NodeId, other: NodeId, direction: PinDirection) -> bool {
        if node_id == other || !self.nodes.contains_key(&other) {
            return false;
        }
        let Some((index, _, mut node)) = self.nodes.shift_remove_full(&node_id) else {
            return false;
        };

        let (changed, connected) = {
            let (core, kind) = node.split_mut();
            let mut scope = AutowireScope {
                node: core,
                orchestration: self,
                other,
                connected: Vec::new(),
            };
            let changed = kind.post_node_autowired(&mut scope, direction);
            (changed, scope.connected)
        };
        self.nodes.shift_insert(index, node_id, node);
        for pin in connected {
            self.notify_connected(PinRef::new(node_id, pin));
        }

        tracing::debug!(node = %node_id, %other, changed, "node autowired");
        if changed {
            self.reconstruct_node(node_id);
        } else {
            self.apply_pending_reconstruction(node_id);
        }
        true
    }

    /// Run build validation on every node
    pub fn validate(&self) -> Result<(), BuildError> {
        let invalid: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| !node.validate_node_during_build())
            .map(ScriptNode::id)
            .collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            tracing::warn!(?invalid, "orchestration failed validation");
            Err(BuildError::InvalidNodes(invalid))
        }
    }

    // ---- Graphs ----

    /// Create an empty graph
    pub fn create_graph(&mut self, name: impl Into<String>, flags: GraphFlags) -> Result<(), GraphError> {
        let name = name.into();
        if self.graphs.contains_key(&name) {
            return Err(GraphError::DuplicateGraph(name));
        }
        self.graphs.insert(name.clone(), ScriptGraph::new(name, flags));
        Ok(())
    }

    /// Remove a graph. Its nodes stay in the orchestration.
    pub fn remove_graph(&mut self, name: &str) -> Result<ScriptGraph, GraphError> {
        self.graphs
            .shift_remove(name)
            .ok_or_else(|| GraphError::GraphNotFound(name.to_string()))
    }

    /// Get a graph by name
    pub fn graph(&self, name: &str) -> Option<&ScriptGraph> {
        self.graphs.get(name)
    }

    /// All graphs
    pub fn graphs(&self) -> impl Iterator<Item = &ScriptGraph> {
        self.graphs.values()
    }

    /// Add a node to a graph if the node accepts it
    pub fn add_node_to_graph(&mut self, graph: &str, node_id: NodeId) -> Result<(), GraphError> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let target = self
            .graphs
            .get_mut(graph)
            .ok_or_else(|| GraphError::GraphNotFound(graph.to_string()))?;
        if !node.kind().is_compatible_with_graph(target) {
            return Err(GraphError::IncompatibleNode {
                node: node_id,
                graph: graph.to_string(),
            });
        }
        target.insert(node_id);
        Ok(())
    }

    /// Remove a node from a graph. Returns whether it was a member.
    pub fn remove_node_from_graph(&mut self, graph: &str, node_id: NodeId) -> Result<bool, GraphError> {
        self.graphs
            .get_mut(graph)
            .map(|target| target.remove(node_id))
            .ok_or_else(|| GraphError::GraphNotFound(graph.to_string()))
    }

    pub(crate) fn insert_graph(&mut self, graph: ScriptGraph) {
        self.graphs.insert(graph.name().to_string(), graph);
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut ScriptNode> {
        self.nodes.values_mut()
    }
}

/// Checks shared by every way of creating a link
fn check_link(a: &Pin, b: &Pin) -> Result<(), LinkError> {
    if a.owning_node() == b.owning_node() {
        return Err(LinkError::SelfLoop);
    }
    a.can_link_to(b)?;
    if a.is_linked_to(b.pin_ref()) {
        return Err(LinkError::AlreadyLinked);
    }
    for pin in [a, b] {
        if !pin.accepts_multiple_links() && pin.has_any_connections() {
            return Err(LinkError::PinAlreadyConnected(pin.pin_ref()));
        }
    }
    Ok(())
}

/// What a node may touch while it autowires itself to a neighbor.
pub struct AutowireScope<'a> {
    node: &'a mut NodeCore,
    orchestration: &'a mut Orchestration,
    other: NodeId,
    connected: Vec<PinId>,
}

impl AutowireScope<'_> {
    /// The node being autowired
    pub fn node(&self) -> &NodeCore {
        self.node
    }

    /// The neighbor it was connected to
    pub fn other(&self) -> Option<&NodeCore> {
        self.orchestration.node(self.other).map(ScriptNode::core)
    }

    /// The neighbor's pins in one direction
    pub fn other_pins(&self, direction: PinDirection) -> impl Iterator<Item = &Pin> + '_ {
        self.other()
            .into_iter()
            .flat_map(move |core| core.find_pins(Some(direction)))
    }

    /// Link one of the node's pins to a pin elsewhere in the orchestration
    pub fn link(&mut self, own: PinId, remote: PinRef) -> Result<(), LinkError> {
        let local = self
            .node
            .pin(own)
            .ok_or(LinkError::PinNotFound(PinRef::new(self.node.id(), own)))?;
        let remote_pin = self.orchestration.require_pin(remote)?;
        check_link(local, remote_pin)?;

        let local_ref = local.pin_ref();
        if let Some(pin) = self.node.pin_mut(own) {
            pin.add_link(remote);
        }
        if let Some(pin) = self.orchestration.pin_mut(remote) {
            pin.add_link(local_ref);
        }
        self.orchestration.notify_connected(remote);
        self.connected.push(own);
        Ok(())
    }

    /// Ask the owner of `pin` which class it implies
    pub fn resolve_type_class(&self, pin: PinRef) -> Option<String> {
        let node = self.orchestration.node(pin.node)?;
        let target = node.core().pin(pin.pin)?;
        node.kind().resolve_type_class(node.core(), target)
    }
}
