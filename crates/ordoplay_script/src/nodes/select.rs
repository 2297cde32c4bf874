// SPDX-License-Identifier: MIT OR Apache-2.0
//! Select: picks one of two values by a boolean.

use crate::context::PropertyInfo;
use crate::instance::{ExecutionContext, NodeInstance, ScriptInstance};
use crate::node::{NodeCore, NodeId, NodeKind};
use crate::pin::PinDirection;
use crate::value::{Variant, VariantType};
use std::any::Any;

/// Outputs `a` when `pick_a` is true and `b` otherwise.
#[derive(Debug, Clone, Default)]
pub struct Select {
    value_type: VariantType,
}

impl Select {
    /// Create a select over values of `value_type`
    pub fn new(value_type: VariantType) -> Self {
        Self { value_type }
    }

    /// Type of `a`, `b` and `result`
    pub fn value_type(&self) -> VariantType {
        self.value_type
    }
}

impl NodeKind for Select {
    fn type_name(&self) -> &'static str {
        "select"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_kind(&self) -> Box<dyn NodeKind> {
        Box::new(self.clone())
    }

    fn node_title(&self) -> String {
        "Select".to_string()
    }

    fn tooltip_text(&self) -> String {
        "If 'Pick A' is true, A is returned, otherwise B is.".to_string()
    }

    fn icon(&self) -> String {
        "ClassList".to_string()
    }

    fn keywords(&self) -> Vec<String> {
        vec!["choose".to_string(), "ternary".to_string()]
    }

    fn property_list(&self) -> Vec<PropertyInfo> {
        let names: Vec<&str> = VariantType::ALL[1..].iter().map(VariantType::name).collect();
        vec![PropertyInfo::new("type", VariantType::Int).with_hint(names.join(","))]
    }

    // The property counts from the first concrete type; the "any" tag is skipped.
    fn get_property(&self, name: &str) -> Option<Variant> {
        (name == "type").then(|| Variant::Int(self.value_type.index() - 1))
    }

    fn set_property(&mut self, core: &mut NodeCore, name: &str, value: &Variant) -> bool {
        if name != "type" {
            return false;
        }
        let Some(value_type) = value
            .as_int()
            .and_then(|tag| tag.checked_add(1))
            .and_then(VariantType::from_index)
        else {
            tracing::warn!(node = %core.id(), ?value, "select type tag out of range");
            return false;
        };
        self.value_type = value_type;
        core.notify_pins_changed();
        true
    }

    fn post_initialize(&mut self, core: &mut NodeCore) {
        core.notify_pins_changed();
    }

    fn allocate_default_pins(&self, core: &mut NodeCore) {
        core.create_pin(PinDirection::Input, "a", self.value_type, Variant::Nil, None);
        core.create_pin(PinDirection::Input, "b", self.value_type, Variant::Nil, None);
        core.create_pin(PinDirection::Input, "pick_a", VariantType::Bool, Variant::Bool(false), None);
        core.create_pin(PinDirection::Output, "result", self.value_type, Variant::Nil, None);
    }

    fn can_change_pin_type(&self) -> bool {
        true
    }

    fn possible_pin_types(&self) -> Vec<VariantType> {
        VariantType::ALL
            .iter()
            .copied()
            .filter(|ty| !matches!(ty, VariantType::Nil | VariantType::Object))
            .collect()
    }

    fn change_pin_types(&mut self, core: &mut NodeCore, value_type: VariantType) -> bool {
        if !self.possible_pin_types().contains(&value_type) {
            tracing::warn!(node = %core.id(), %value_type, "select cannot hold this type");
            return false;
        }
        if self.value_type == value_type {
            return false;
        }
        self.value_type = value_type;
        core.notify_pins_changed();
        true
    }

    fn instantiate(&self, core: &NodeCore, _container: &ScriptInstance) -> Box<dyn NodeInstance> {
        Box::new(SelectInstance { node: core.id() })
    }
}

/// Runtime side of [`Select`]
#[derive(Debug)]
pub struct SelectInstance {
    node: NodeId,
}

impl NodeInstance for SelectInstance {
    fn node_id(&self) -> NodeId {
        self.node
    }

    fn step(&mut self, context: &mut ExecutionContext<'_>) -> usize {
        let picked = if context.input(2).booleanize() {
            context.input(0).clone()
        } else {
            context.input(1).clone()
        };
        context.set_output(0, picked);
        0
    }
}
