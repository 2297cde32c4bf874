// SPDX-License-Identifier: MIT OR Apache-2.0
//! Script nodes: the persistent, user-editable vertices of an orchestration.
//!
//! A [`ScriptNode`] pairs a [`NodeCore`] (identity, presentation and the pins
//! it owns) with a boxed [`NodeKind`] that supplies the kind-specific behavior:
//! pin allocation, lifecycle callbacks and the runtime instance.

use crate::context::{NodeInitContext, PropertyInfo};
use crate::flags::NodeFlags;
use crate::graph::ScriptGraph;
use crate::instance::{NodeInstance, ScriptInstance};
use crate::orchestration::{AutowireScope, OrchestrationId};
use crate::pin::{Pin, PinDirection, PinId, PinRef};
use crate::rewire::{self, PinRewire};
use crate::value::{Variant, VariantType};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;

/// Unique identifier for a node, assigned by the owning orchestration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub i32);

impl NodeId {
    /// Sentinel for a node that has not been added to an orchestration yet
    pub const UNASSIGNED: NodeId = NodeId(-1);

    /// Whether a real id has been assigned
    pub fn is_assigned(&self) -> bool {
        self.0 >= 0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node type category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Entry points
    Events,
    /// Branching and selection
    FlowControl,
    /// Data conversion and access
    Data,
    /// Utility nodes
    Utility,
    /// Custom/user-defined
    Custom,
}

/// The state every node carries regardless of its kind.
#[derive(Debug, Clone)]
pub struct NodeCore {
    id: NodeId,
    size: [f32; 2],
    position: [f32; 2],
    flags: NodeFlags,
    pins: Vec<Pin>,
    owner: Option<OrchestrationId>,
    initialized: bool,
    reconstructing: bool,
    pins_changed: bool,
}

impl Default for NodeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeCore {
    /// Create an empty, unassigned node core
    pub fn new() -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            size: [0.0, 0.0],
            position: [0.0, 0.0],
            flags: NodeFlags::empty(),
            pins: Vec::new(),
            owner: None,
            initialized: false,
            reconstructing: false,
            pins_changed: false,
        }
    }

    /// The node's unique identifier
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Assign the node id.
    ///
    /// Once a real id is set it never changes; later attempts are ignored.
    pub(crate) fn set_id(&mut self, id: NodeId) -> bool {
        if self.id.is_assigned() && self.id != id {
            tracing::warn!(current = %self.id, requested = %id, "node id is already assigned");
            return false;
        }
        self.id = id;
        for pin in &mut self.pins {
            pin.set_owning_node(id);
        }
        true
    }

    /// The orchestration that owns this node, if any
    pub fn owner(&self) -> Option<OrchestrationId> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Option<OrchestrationId>) {
        self.owner = owner;
    }

    /// Size on the canvas
    pub fn size(&self) -> [f32; 2] {
        self.size
    }

    /// Set the size
    pub fn set_size(&mut self, size: [f32; 2]) {
        self.size = size;
    }

    /// Position on the canvas
    pub fn position(&self) -> [f32; 2] {
        self.position
    }

    /// Set the position
    pub fn set_position(&mut self, position: [f32; 2]) {
        self.position = position;
    }

    /// Node flags
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Set the node flags
    pub fn set_flags(&mut self, flags: NodeFlags) {
        self.flags = flags;
    }

    /// Whether the node finished initialization or loading
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether a reconstruction is in flight
    pub fn is_reconstructing(&self) -> bool {
        self.reconstructing
    }

    /// Create a pin on this node.
    ///
    /// `index` is the slot among pins of the same direction; the new pin is
    /// inserted before the pin currently holding that slot, or appended when
    /// the slot does not exist.
    pub fn create_pin(
        &mut self,
        direction: PinDirection,
        name: impl Into<String>,
        value_type: VariantType,
        default_value: Variant,
        index: Option<usize>,
    ) -> &mut Pin {
        let pin = Pin::new(self.id, direction, name, value_type, default_value);
        let at = index
            .and_then(|slot| {
                self.pins
                    .iter()
                    .position(|p| p.direction() == direction && p.pin_index() == slot)
            })
            .unwrap_or(self.pins.len());

        self.pins.insert(at, pin);
        self.cache_pin_indices();
        &mut self.pins[at]
    }

    /// Find a pin by name. `None` searches both directions.
    pub fn find_pin(&self, name: &str, direction: Option<PinDirection>) -> Option<&Pin> {
        self.find_pins(direction).find(|p| p.name() == name)
    }

    /// Find a pin by name for editing. `None` searches both directions.
    pub fn find_pin_mut(&mut self, name: &str, direction: Option<PinDirection>) -> Option<&mut Pin> {
        self.pins
            .iter_mut()
            .filter(|p| direction.map_or(true, |d| p.direction() == d))
            .find(|p| p.name() == name)
    }

    /// Find a pin by slot index
    pub fn find_pin_at(&self, index: usize, direction: PinDirection) -> Option<&Pin> {
        self.find_pins(Some(direction)).find(|p| p.pin_index() == index)
    }

    /// Pins in declaration order matching the direction filter.
    ///
    /// The iterator is lazy and can be cloned to restart it.
    pub fn find_pins(
        &self,
        direction: Option<PinDirection>,
    ) -> impl Iterator<Item = &Pin> + Clone + '_ {
        self.pins
            .iter()
            .filter(move |p| direction.map_or(true, |d| p.direction() == d))
    }

    /// Get a pin by ID
    pub fn pin(&self, pin_id: PinId) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id() == pin_id)
    }

    /// Get a mutable pin by ID
    pub fn pin_mut(&mut self, pin_id: PinId) -> Option<&mut Pin> {
        self.pins.iter_mut().find(|p| p.id() == pin_id)
    }

    /// All pins, inputs and outputs in declaration order
    pub fn all_pins(&self) -> &[Pin] {
        &self.pins
    }

    /// Check whether any pin is linked
    pub fn has_any_connections(&self) -> bool {
        self.pins.iter().any(Pin::has_any_connections)
    }

    /// Position of a data pin among the data pins of its direction.
    ///
    /// This is the slot the pin occupies in an execution context.
    pub fn data_slot(&self, pin_id: PinId) -> Option<usize> {
        let pin = self.pin(pin_id).filter(|p| p.is_data())?;
        self.find_pins(Some(pin.direction()))
            .filter(|p| p.is_data())
            .position(|p| p.id() == pin_id)
    }

    /// Execution output pins in exit order
    pub fn execution_outputs(&self) -> impl Iterator<Item = &Pin> + Clone + '_ {
        self.find_pins(Some(PinDirection::Output)).filter(|p| p.is_execution())
    }

    /// Data pins of one direction in slot order
    pub fn data_pins(&self, direction: PinDirection) -> impl Iterator<Item = &Pin> + Clone + '_ {
        self.find_pins(Some(direction)).filter(|p| p.is_data())
    }

    /// Ask the owner to rebuild this node's pins.
    ///
    /// Requests made while a reconstruction is in flight are coalesced into
    /// the running one.
    pub fn notify_pins_changed(&mut self) {
        if self.reconstructing {
            tracing::debug!(node = %self.id, "pin change coalesced into running reconstruction");
            return;
        }
        self.pins_changed = true;
    }

    pub(crate) fn take_pins_changed(&mut self) -> bool {
        std::mem::take(&mut self.pins_changed)
    }

    pub(crate) fn take_pin(&mut self, pin_id: PinId) -> Option<Pin> {
        let at = self.pins.iter().position(|p| p.id() == pin_id)?;
        let pin = self.pins.remove(at);
        self.cache_pin_indices();
        Some(pin)
    }

    pub(crate) fn replace_pins(&mut self, pins: Vec<Pin>) {
        self.pins = pins;
        for pin in &mut self.pins {
            pin.set_owning_node(self.id);
        }
        self.cache_pin_indices();
    }

    /// Reset input defaults that no longer fit their pin type.
    pub(crate) fn validate_input_default_values(&mut self) {
        for pin in self.pins.iter_mut().filter(|p| p.is_input() && p.is_data()) {
            if !pin.default_value().is_assignable_to(pin.value_type()) {
                let value = pin.value_type().default_value();
                pin.set_default_value(value);
            }
        }
    }

    fn cache_pin_indices(&mut self) {
        let (mut inputs, mut outputs) = (0, 0);
        for pin in &mut self.pins {
            let counter = match pin.direction() {
                PinDirection::Input => &mut inputs,
                PinDirection::Output => &mut outputs,
            };
            pin.set_pin_index(*counter);
            *counter += 1;
        }
    }
}

/// Behavior of one kind of script node.
///
/// Every hook has a default so that a kind only overrides what it needs.
/// Hooks receive the node's [`NodeCore`] explicitly; the kind itself holds
/// only its own configuration (a target class, a selected type, ...).
pub trait NodeKind: fmt::Debug {
    /// Stable kind name used by the catalog and persistence
    fn type_name(&self) -> &'static str;

    /// Upcast for downcasting to the concrete kind
    fn as_any(&self) -> &dyn Any;

    /// Clone into a new box, used when pasting
    fn clone_kind(&self) -> Box<dyn NodeKind>;

    /// Title bar text
    fn node_title(&self) -> String {
        self.type_name().to_string()
    }

    /// Compact title bar text
    fn compact_node_title(&self) -> String {
        self.node_title()
    }

    /// Tooltip shown when hovering the node
    fn tooltip_text(&self) -> String {
        String::new()
    }

    /// Icon name
    fn icon(&self) -> String {
        "Object".to_string()
    }

    /// Extra words matched by catalog searches
    fn keywords(&self) -> Vec<String> {
        Vec::new()
    }

    /// Title color setting name, empty for the theme default
    fn node_title_color_name(&self) -> &'static str {
        ""
    }

    /// Whether the user may delete the node
    fn can_user_delete_node(&self) -> bool {
        true
    }

    /// Whether to draw the node as an entry point
    fn draw_node_as_entry(&self) -> bool {
        false
    }

    /// Whether to draw the node as an exit point
    fn draw_node_as_exit(&self) -> bool {
        false
    }

    /// Whether to draw the node compact
    fn should_draw_compact(&self) -> bool {
        false
    }

    /// Whether the node may live in the given graph
    fn is_compatible_with_graph(&self, _graph: &ScriptGraph) -> bool {
        true
    }

    /// Editable properties of this kind
    fn property_list(&self) -> Vec<PropertyInfo> {
        Vec::new()
    }

    /// Read a property
    fn get_property(&self, _name: &str) -> Option<Variant> {
        None
    }

    /// Write a property. Returns whether the property exists.
    ///
    /// Kinds whose pin shape depends on the property call
    /// [`NodeCore::notify_pins_changed`].
    fn set_property(&mut self, _core: &mut NodeCore, _name: &str, _value: &Variant) -> bool {
        false
    }

    /// Read kind-specific seed data. Pins are allocated right after.
    fn initialize(&mut self, _core: &mut NodeCore, _context: &NodeInitContext) {}

    /// Called once the node has been loaded
    fn post_initialize(&mut self, _core: &mut NodeCore) {}

    /// Declare the node's canonical pin shape
    fn allocate_default_pins(&self, _core: &mut NodeCore) {}

    /// Rebuild pins during reconstruction. The core holds no pins on entry.
    fn reallocate_pins_during_reconstruction(&self, core: &mut NodeCore, _old_pins: &[Pin]) {
        self.allocate_default_pins(core);
    }

    /// Decide which old pins carry their links and defaults onto which new pins
    fn rewire_old_pins_to_new_pins(&self, old_pins: &[Pin], new_pins: &[Pin]) -> Vec<PinRewire> {
        rewire::match_by_name_and_type(old_pins, new_pins)
    }

    /// Called after the pin shape has been rebuilt
    fn post_reconstruct_node(&mut self, _core: &NodeCore) {}

    /// Called before the node is saved
    fn pre_save(&mut self, _core: &NodeCore) {}

    /// Called after the node is saved
    fn post_save(&mut self, _core: &NodeCore) {}

    /// Called before the node is removed from its orchestration
    fn pre_remove(&mut self, _core: &NodeCore) {}

    /// Called after the user placed a freshly created node
    fn post_placed_new_node(&mut self, _core: &mut NodeCore) {}

    /// Called after the node has been pasted
    fn post_paste_node(&mut self, _core: &mut NodeCore) {}

    /// Called after the node was wired to a neighbor.
    ///
    /// Returns true when the kind changed its configuration and the node
    /// must be reconstructed.
    fn post_node_autowired(&mut self, _scope: &mut AutowireScope<'_>, _direction: PinDirection) -> bool {
        false
    }

    /// Called when a pin's default value changed
    fn pin_default_value_changed(&mut self, _core: &NodeCore, _pin: PinId) {}

    /// Called when one of the node's pins gained a link
    fn on_pin_connected(&mut self, _core: &NodeCore, _pin: PinId) {}

    /// Called when one of the node's pins lost a link. After a
    /// reconstruction the pin may no longer exist.
    fn on_pin_disconnected(&mut self, _core: &NodeCore, _pin: PinId) {}

    /// Whether the user may add a pin, with the reason when not
    fn can_create_user_defined_pin(&self, _direction: PinDirection) -> Result<(), String> {
        Err("This node does not support user-defined pins".to_string())
    }

    /// Whether the node supports retyping its pins
    fn can_change_pin_type(&self) -> bool {
        false
    }

    /// Types the node can be retyped to
    fn possible_pin_types(&self) -> Vec<VariantType> {
        Vec::new()
    }

    /// Retype the node's pins. Returns whether the type changed.
    fn change_pin_types(&mut self, _core: &mut NodeCore, _value_type: VariantType) -> bool {
        false
    }

    /// Build-time validation; false reports a build error on this node
    fn validate_node_during_build(&self, _core: &NodeCore) -> bool {
        true
    }

    /// Resolve the class implied by one of this node's pins
    fn resolve_type_class(&self, _core: &NodeCore, pin: &Pin) -> Option<String> {
        (!pin.target_class().is_empty()).then(|| pin.target_class().to_string())
    }

    /// Produce the runtime instance for this node
    fn instantiate(&self, core: &NodeCore, container: &ScriptInstance) -> Box<dyn NodeInstance>;
}

/// Local result of a reconstruction that the owning container must mirror on
/// the remote side of each link.
#[derive(Debug, Default)]
pub(crate) struct Reconstruction {
    /// Links carried over: remote pin, old local pin, new local pin
    pub retargeted: Vec<(PinRef, PinId, PinId)>,
    /// Links that no longer fit: remote pin, old local pin
    pub dropped: Vec<(PinRef, PinId)>,
}

/// A node in an orchestration
#[derive(Debug)]
pub struct ScriptNode {
    core: NodeCore,
    kind: Box<dyn NodeKind>,
}

impl ScriptNode {
    /// Default-construct a node of the given kind. No pins are allocated
    /// until [`ScriptNode::initialize`] or a load.
    pub fn new(kind: Box<dyn NodeKind>) -> Self {
        Self {
            core: NodeCore::new(),
            kind,
        }
    }

    /// Node id
    pub fn id(&self) -> NodeId {
        self.core.id
    }

    /// Shared node state
    pub fn core(&self) -> &NodeCore {
        &self.core
    }

    /// Shared node state, for presentation edits and pin lookups
    pub fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    /// The node's kind
    pub fn kind(&self) -> &dyn NodeKind {
        self.kind.as_ref()
    }

    /// Downcast the kind
    pub fn kind_as<T: NodeKind + 'static>(&self) -> Option<&T> {
        self.kind.as_any().downcast_ref::<T>()
    }

    /// Title bar text
    pub fn title(&self) -> String {
        self.kind.node_title()
    }

    /// Initialize a freshly created node from catalog seed data.
    ///
    /// A second call is ignored and returns false.
    pub fn initialize(&mut self, context: &NodeInitContext) -> bool {
        if self.core.initialized {
            tracing::warn!(node = %self.core.id, kind = self.kind.type_name(), "node already initialized");
            return false;
        }
        self.kind.initialize(&mut self.core, context);
        self.kind.allocate_default_pins(&mut self.core);
        self.core.pins_changed = false;
        self.core.initialized = true;
        true
    }

    /// Finish loading: validate restored pins and let the kind react.
    pub fn post_initialize(&mut self) {
        self.core.validate_input_default_values();
        self.kind.post_initialize(&mut self.core);
        self.core.initialized = true;
    }

    /// Rebuild the pin shape of a node that is not part of an orchestration.
    ///
    /// Linked nodes must go through
    /// [`Orchestration::reconstruct_node`](crate::orchestration::Orchestration::reconstruct_node)
    /// so the remote side of each link follows.
    pub fn reconstruct_node(&mut self) -> bool {
        match self.rebuild_pins() {
            Some(_) => {
                self.finish_reconstruction();
                true
            }
            None => false,
        }
    }

    /// Steps 1 to 3 of a reconstruction: snapshot, reallocate, rewire.
    pub(crate) fn rebuild_pins(&mut self) -> Option<Reconstruction> {
        if self.core.reconstructing {
            tracing::warn!(node = %self.core.id, "reconstruction already in progress, request ignored");
            return None;
        }
        self.core.reconstructing = true;

        let old_pins = std::mem::take(&mut self.core.pins);
        self.kind.reallocate_pins_during_reconstruction(&mut self.core, &old_pins);
        self.core.cache_pin_indices();
        let plan = self.kind.rewire_old_pins_to_new_pins(&old_pins, &self.core.pins);

        let mut outcome = Reconstruction::default();
        let mut carried: HashSet<(PinId, PinRef)> = HashSet::new();
        for PinRewire { old, new } in plan {
            let (Some(old_pin), Some(new_pin)) = (old_pins.get(old), self.core.pins.get_mut(new)) else {
                continue;
            };
            if old_pin.direction() != new_pin.direction() || old_pin.is_execution() != new_pin.is_execution() {
                continue;
            }
            if !old_pin.default_value().is_nil() {
                new_pin.set_default_value(old_pin.default_value().clone());
            }
            for link in old_pin.connections() {
                if new_pin.is_linked_to(*link) {
                    continue;
                }
                if !new_pin.accepts_multiple_links() && new_pin.has_any_connections() {
                    continue;
                }
                new_pin.add_link(*link);
                carried.insert((old_pin.id(), *link));
                outcome.retargeted.push((*link, old_pin.id(), new_pin.id()));
            }
        }

        for old_pin in &old_pins {
            for link in old_pin.connections() {
                if !carried.contains(&(old_pin.id(), *link)) {
                    outcome.dropped.push((*link, old_pin.id()));
                }
            }
        }

        self.core.validate_input_default_values();
        self.core.pins_changed = false;
        self.core.reconstructing = false;

        tracing::debug!(
            node = %self.core.id,
            pins = self.core.pins.len(),
            carried = outcome.retargeted.len(),
            dropped = outcome.dropped.len(),
            "node reconstructed"
        );
        Some(outcome)
    }

    /// Step 4 of a reconstruction.
    pub(crate) fn finish_reconstruction(&mut self) {
        self.kind.post_reconstruct_node(&self.core);
    }

    pub(crate) fn split_mut(&mut self) -> (&mut NodeCore, &mut dyn NodeKind) {
        (&mut self.core, self.kind.as_mut())
    }

    /// Run build validation
    pub fn validate_node_during_build(&self) -> bool {
        self.kind.validate_node_during_build(&self.core)
    }

    /// Produce the runtime instance bound to this node and `container`
    pub fn instantiate(&self, container: &ScriptInstance) -> Box<dyn NodeInstance> {
        self.kind.instantiate(&self.core, container)
    }

    /// Copy this node for pasting: same kind configuration, pins and
    /// defaults, no id and no links.
    pub fn duplicate(&self) -> ScriptNode {
        let mut core = NodeCore::new();
        core.size = self.core.size;
        core.position = self.core.position;
        core.flags = self.core.flags;
        core.initialized = self.core.initialized;
        core.replace_pins(
            self.core
                .pins
                .iter()
                .map(|pin| Pin::from_record(NodeId::UNASSIGNED, &pin.to_record()))
                .collect(),
        );
        ScriptNode {
            core,
            kind: self.kind.clone_kind(),
        }
    }
}

/// Factory producing a default-constructed kind
pub type NodeFactory = fn() -> Box<dyn NodeKind>;

/// Catalog entry for a node kind
#[derive(Debug, Clone)]
pub struct NodeType {
    /// Unique kind identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Category
    pub category: NodeCategory,
    /// Description
    pub description: String,
    /// Flags applied to created nodes
    pub flags: NodeFlags,
    /// Kind factory
    pub factory: NodeFactory,
}

impl NodeType {
    /// Create a catalogable node type
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: NodeCategory, factory: NodeFactory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: String::new(),
            flags: NodeFlags::CATALOGABLE,
            factory,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the flags
    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Registry of available node kinds
pub struct NodeRegistry {
    /// Registered node types by ID
    types: indexmap::IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            types: indexmap::IndexMap::new(),
        }
    }

    /// Register a node type
    pub fn register(&mut self, node_type: NodeType) {
        self.types.insert(node_type.id.clone(), node_type);
    }

    /// Get a node type by ID
    pub fn get(&self, id: &str) -> Option<&NodeType> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Get types by category
    pub fn types_in_category(&self, category: NodeCategory) -> impl Iterator<Item = &NodeType> {
        self.types.values().filter(move |t| t.category == category)
    }

    /// Types that should appear in the action catalog
    pub fn catalogable(&self) -> impl Iterator<Item = &NodeType> {
        self.types
            .values()
            .filter(|t| t.flags.contains(NodeFlags::CATALOGABLE))
    }

    /// Case-insensitive search over ids, names, descriptions and kind keywords
    pub fn search(&self, text: &str) -> Vec<&NodeType> {
        let needle = text.to_lowercase();
        self.types
            .values()
            .filter(|t| {
                t.id.to_lowercase().contains(&needle)
                    || t.name.to_lowercase().contains(&needle)
                    || t.description.to_lowercase().contains(&needle)
                    || (t.factory)()
                        .keywords()
                        .iter()
                        .any(|k| k.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Default-construct the kind registered under `id`
    pub fn create_kind(&self, id: &str) -> Option<Box<dyn NodeKind>> {
        self.get(id).map(|t| (t.factory)())
    }

    /// Create and initialize a node from a type ID
    pub fn create_node(&self, id: &str, context: &NodeInitContext) -> Option<ScriptNode> {
        let node_type = self.get(id)?;
        let mut node = ScriptNode::new((node_type.factory)());
        node.core.flags = node_type.flags;
        node.initialize(context);
        Some(node)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
