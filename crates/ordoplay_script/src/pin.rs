// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pins: typed connection points owned by script nodes.

use crate::error::LinkError;
use crate::flags::PinFlags;
use crate::node::NodeId;
use crate::value::{Variant, VariantType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinId(pub Uuid);

impl PinId {
    /// Create a new random pin ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PinId {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning handle to a pin: the owning node plus the pin's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef {
    /// Owning node
    pub node: NodeId,
    /// Pin on that node
    pub pin: PinId,
}

impl PinRef {
    /// Create a new pin handle
    pub fn new(node: NodeId, pin: PinId) -> Self {
        Self { node, pin }
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin
    Input,
    /// Output pin
    Output,
}

impl PinDirection {
    /// The other direction
    pub fn opposite(&self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// A pin on a node
#[derive(Debug, Clone)]
pub struct Pin {
    id: PinId,
    owner: NodeId,
    direction: PinDirection,
    name: String,
    label: String,
    value_type: VariantType,
    target_class: String,
    default_value: Variant,
    flags: PinFlags,
    index: usize,
    links: Vec<PinRef>,
}

impl Pin {
    /// Create a new data pin.
    ///
    /// A default value that does not fit `value_type` is replaced by the
    /// type's default.
    pub fn new(
        owner: NodeId,
        direction: PinDirection,
        name: impl Into<String>,
        value_type: VariantType,
        default_value: Variant,
    ) -> Self {
        let default_value = if storable_default(&default_value, value_type) && !default_value.is_nil() {
            default_value
        } else {
            value_type.default_value()
        };
        Self {
            id: PinId::new(),
            owner,
            direction,
            name: name.into(),
            label: String::new(),
            value_type,
            target_class: String::new(),
            default_value,
            flags: PinFlags::DATA,
            index: 0,
            links: Vec::new(),
        }
    }

    /// Unique pin ID
    pub fn id(&self) -> PinId {
        self.id
    }

    /// Handle to this pin
    pub fn pin_ref(&self) -> PinRef {
        PinRef::new(self.owner, self.id)
    }

    /// The node that owns this pin
    pub fn owning_node(&self) -> NodeId {
        self.owner
    }

    pub(crate) fn set_owning_node(&mut self, owner: NodeId) {
        self.owner = owner;
    }

    /// Pin direction
    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    /// Whether this is an input pin
    pub fn is_input(&self) -> bool {
        self.direction == PinDirection::Input
    }

    /// Whether this is an output pin
    pub fn is_output(&self) -> bool {
        self.direction == PinDirection::Output
    }

    /// Pin name, unique per direction on its node
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit label, empty when the name is shown
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Set the label
    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.label = label.into();
        self
    }

    /// The text shown next to the pin.
    ///
    /// Falls back to the name, capitalized unless `NO_CAPITALIZE` is set.
    pub fn display_label(&self) -> String {
        let text = if self.label.is_empty() { &self.name } else { &self.label };
        if self.flags.contains(PinFlags::NO_CAPITALIZE) {
            text.clone()
        } else {
            capitalize(text)
        }
    }

    /// Value type tag
    pub fn value_type(&self) -> VariantType {
        self.value_type
    }

    /// Change the value type, resetting a default that no longer fits
    pub fn set_value_type(&mut self, value_type: VariantType) -> &mut Self {
        self.value_type = value_type;
        if !self.default_value.is_assignable_to(value_type) {
            self.default_value = value_type.default_value();
        }
        self
    }

    /// Class name carried by object pins, empty when unknown
    pub fn target_class(&self) -> &str {
        &self.target_class
    }

    /// Set the class name carried by an object pin
    pub fn set_target_class(&mut self, class_name: impl Into<String>) -> &mut Self {
        self.target_class = class_name.into();
        self
    }

    /// Default value used when the pin is not linked
    pub fn default_value(&self) -> &Variant {
        &self.default_value
    }

    /// Set the default value.
    ///
    /// Returns false if the pin is an execution pin, the value does not
    /// fit the pin type, or it is a runtime object, which cannot be saved.
    pub fn set_default_value(&mut self, value: Variant) -> bool {
        if self.is_execution() || !storable_default(&value, self.value_type) {
            return false;
        }
        self.default_value = value;
        true
    }

    /// Pin flags
    pub fn flags(&self) -> PinFlags {
        self.flags
    }

    /// Replace the pin flags.
    ///
    /// Execution pins carry no value, so their type and default are cleared.
    pub fn set_flags(&mut self, flags: PinFlags) -> &mut Self {
        self.flags = flags;
        if flags.contains(PinFlags::EXECUTION) {
            self.value_type = VariantType::Nil;
            self.default_value = Variant::Nil;
        }
        self
    }

    /// Whether this pin transfers control flow
    pub fn is_execution(&self) -> bool {
        self.flags.contains(PinFlags::EXECUTION)
    }

    /// Whether this pin carries data
    pub fn is_data(&self) -> bool {
        !self.is_execution()
    }

    /// Whether this pin carries an object reference
    pub fn is_object(&self) -> bool {
        self.flags.contains(PinFlags::OBJECT) || self.value_type == VariantType::Object
    }

    /// Whether the pin is hidden from the canvas
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(PinFlags::HIDDEN)
    }

    /// Slot index within its node and direction
    pub fn pin_index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_pin_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Pins this pin is linked to
    pub fn connections(&self) -> &[PinRef] {
        &self.links
    }

    /// Whether the pin has at least one link
    pub fn has_any_connections(&self) -> bool {
        !self.links.is_empty()
    }

    /// Whether the pin is linked to `other`
    pub fn is_linked_to(&self, other: PinRef) -> bool {
        self.links.contains(&other)
    }

    /// Whether this pin accepts more than one link.
    ///
    /// Execution inputs and data outputs fan in/out; execution outputs and
    /// data inputs take a single link.
    pub fn accepts_multiple_links(&self) -> bool {
        match self.direction {
            PinDirection::Input => self.is_execution(),
            PinDirection::Output => self.is_data(),
        }
    }

    /// Check whether this pin may be linked to `other`.
    ///
    /// Only direction and type are checked here; ownership and link
    /// multiplicity are the container's concern.
    pub fn can_link_to(&self, other: &Pin) -> Result<(), LinkError> {
        if self.direction == other.direction {
            return Err(LinkError::SameDirection);
        }
        if self.is_execution() != other.is_execution() {
            return Err(LinkError::ExecutionMismatch);
        }
        if self.is_execution() {
            return Ok(());
        }

        let (source, target) = match self.direction {
            PinDirection::Output => (self, other),
            PinDirection::Input => (other, self),
        };
        if source.value_type.can_connect_to(&target.value_type) {
            Ok(())
        } else {
            Err(LinkError::IncompatibleTypes {
                from: source.value_type,
                to: target.value_type,
            })
        }
    }

    pub(crate) fn add_link(&mut self, other: PinRef) {
        if !self.links.contains(&other) {
            self.links.push(other);
        }
    }

    pub(crate) fn remove_link(&mut self, other: PinRef) -> bool {
        let before = self.links.len();
        self.links.retain(|link| *link != other);
        self.links.len() != before
    }

    pub(crate) fn replace_link(&mut self, old: PinRef, new: PinRef) -> bool {
        match self.links.iter_mut().find(|link| **link == old) {
            Some(link) => {
                *link = new;
                true
            }
            None => false,
        }
    }

    pub(crate) fn take_links(&mut self) -> Vec<PinRef> {
        std::mem::take(&mut self.links)
    }

    /// Flatten the pin into a persistence record.
    pub fn to_record(&self) -> PinRecord {
        PinRecord {
            pin_name: self.name.clone(),
            label: self.label.clone(),
            direction: self.direction,
            value_type: self.value_type,
            flags: self.flags.bits(),
            default_value: self.default_value.clone(),
            target_class: self.target_class.clone(),
        }
    }

    /// Rebuild a pin from a persistence record.
    pub fn from_record(owner: NodeId, record: &PinRecord) -> Self {
        let mut pin = Pin::new(
            owner,
            record.direction,
            record.pin_name.clone(),
            record.value_type,
            Variant::Nil,
        );
        pin.label.clone_from(&record.label);
        pin.target_class.clone_from(&record.target_class);
        pin.set_flags(PinFlags::from_bits_retain(record.flags));
        pin.set_default_value(record.default_value.clone());
        pin
    }
}

/// Flat key-value record of a pin, as written by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinRecord {
    /// Pin name
    pub pin_name: String,
    /// Explicit label
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    /// Direction
    pub direction: PinDirection,
    /// Value type tag
    #[serde(rename = "type")]
    pub value_type: VariantType,
    /// Raw flag bits
    pub flags: u32,
    /// Default value
    #[serde(default)]
    pub default_value: Variant,
    /// Class name carried by object pins
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_class: String,
}

/// Turn `snake_case` or `camelCase` names into "Title Case".
fn capitalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut word_start = true;
    let mut prev_lower = false;
    for ch in text.chars() {
        if ch == '_' || ch == ' ' {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            word_start = true;
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower {
            out.push(' ');
            word_start = true;
        }
        if word_start {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        word_start = false;
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
    }
    out
}

/// Defaults are persisted with the pin, so runtime objects never qualify
fn storable_default(value: &Variant, value_type: VariantType) -> bool {
    value.as_object().is_none() && value.is_assignable_to(value_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectRef;

    fn data(direction: PinDirection, ty: VariantType) -> Pin {
        Pin::new(NodeId(1), direction, "value", ty, Variant::Nil)
    }

    fn exec(direction: PinDirection) -> Pin {
        let mut pin = Pin::new(NodeId(2), direction, "exec", VariantType::Nil, Variant::Nil);
        pin.set_flags(PinFlags::EXECUTION);
        pin
    }

    #[test]
    fn test_link_rules() {
        let out_int = data(PinDirection::Output, VariantType::Int);
        let in_float = data(PinDirection::Input, VariantType::Float);
        let in_string = data(PinDirection::Input, VariantType::String);
        let in_any = data(PinDirection::Input, VariantType::Nil);

        assert_eq!(out_int.can_link_to(&in_float), Ok(()));
        assert_eq!(in_float.can_link_to(&out_int), Ok(()));
        assert_eq!(out_int.can_link_to(&in_any), Ok(()));
        assert!(matches!(
            out_int.can_link_to(&in_string),
            Err(LinkError::IncompatibleTypes { .. })
        ));
        assert_eq!(out_int.can_link_to(&out_int.clone()), Err(LinkError::SameDirection));
    }

    #[test]
    fn test_execution_links_only_to_execution() {
        let exec_out = exec(PinDirection::Output);
        let exec_in = exec(PinDirection::Input);
        let data_in = data(PinDirection::Input, VariantType::Nil);

        assert_eq!(exec_out.can_link_to(&exec_in), Ok(()));
        assert_eq!(exec_out.can_link_to(&data_in), Err(LinkError::ExecutionMismatch));
    }

    #[test]
    fn test_execution_pin_carries_no_value() {
        let mut pin = data(PinDirection::Input, VariantType::Int);
        assert!(pin.set_default_value(Variant::Int(4)));
        pin.set_flags(PinFlags::EXECUTION);
        assert_eq!(pin.default_value(), &Variant::Nil);
        assert!(!pin.set_default_value(Variant::Int(4)));
    }

    #[test]
    fn test_default_value_follows_type() {
        let mut pin = Pin::new(NodeId(1), PinDirection::Input, "a", VariantType::Int, Variant::from("x"));
        assert_eq!(pin.default_value(), &Variant::Int(0));

        pin.set_default_value(Variant::Int(7));
        pin.set_value_type(VariantType::String);
        assert_eq!(pin.default_value(), &Variant::String(String::new()));
    }

    #[test]
    fn test_object_default_is_refused() {
        let mut pin = data(PinDirection::Input, VariantType::Object);
        assert!(!pin.set_default_value(Variant::from(ObjectRef::new("Node"))));
        assert_eq!(pin.default_value(), &Variant::Nil);

        let pin = Pin::new(NodeId(1), PinDirection::Input, "target", VariantType::Nil, Variant::from(ObjectRef::new("Node")));
        assert!(pin.default_value().is_nil());
    }

    #[test]
    fn test_multiplicity() {
        assert!(exec(PinDirection::Input).accepts_multiple_links());
        assert!(!exec(PinDirection::Output).accepts_multiple_links());
        assert!(data(PinDirection::Output, VariantType::Int).accepts_multiple_links());
        assert!(!data(PinDirection::Input, VariantType::Int).accepts_multiple_links());
    }

    #[test]
    fn test_display_label() {
        let mut pin = Pin::new(NodeId(1), PinDirection::Input, "pick_a", VariantType::Bool, Variant::Nil);
        assert_eq!(pin.display_label(), "Pick A");

        pin.set_label("as Sprite2D");
        pin.set_flags(PinFlags::DATA | PinFlags::NO_CAPITALIZE);
        assert_eq!(pin.display_label(), "as Sprite2D");

        assert_eq!(capitalize("ExecIn"), "Exec In");
    }

    #[test]
    fn test_record_round_trip_keeps_shape() {
        let mut pin = Pin::new(NodeId(3), PinDirection::Output, "output", VariantType::Object, Variant::Nil);
        pin.set_flags(PinFlags::DATA | PinFlags::OBJECT).set_label("as Node2D");
        pin.set_target_class("Node2D");

        let restored = Pin::from_record(NodeId(3), &pin.to_record());
        assert_eq!(restored.name(), "output");
        assert_eq!(restored.label(), "as Node2D");
        assert_eq!(restored.flags(), pin.flags());
        assert_eq!(restored.target_class(), "Node2D");
        assert_ne!(restored.id(), pin.id());
    }

    #[test]
    fn test_link_bookkeeping() {
        let mut pin = data(PinDirection::Output, VariantType::Int);
        let a = PinRef::new(NodeId(5), PinId::new());
        let b = PinRef::new(NodeId(6), PinId::new());
        pin.add_link(a);
        pin.add_link(a);
        assert_eq!(pin.connections(), &[a]);

        assert!(pin.replace_link(a, b));
        assert!(pin.is_linked_to(b));
        assert!(!pin.remove_link(a));
        assert!(pin.remove_link(b));
        assert!(!pin.has_any_connections());
    }
}
