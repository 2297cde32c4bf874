// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type cast: routes control by whether an object is an instance of a class.

use crate::class_db::ROOT_CLASS;
use crate::context::{NodeInitContext, PropertyInfo};
use crate::flags::PinFlags;
use crate::instance::{ExecutionContext, NodeInstance, ScriptInstance};
use crate::node::{NodeCore, NodeId, NodeKind};
use crate::orchestration::AutowireScope;
use crate::pin::{Pin, PinDirection};
use crate::value::{Variant, VariantType};
use std::any::Any;

/// Casts its `instance` input to a target class.
///
/// Control leaves through `yes` with the object on `output` when the cast
/// succeeds, and through `no` otherwise.
#[derive(Debug, Clone, Default)]
pub struct TypeCast {
    target_type: String,
}

impl TypeCast {
    /// Create a cast to `target_type`
    pub fn new(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
        }
    }

    /// Configured target, `Object` when unset
    pub fn target_type(&self) -> &str {
        if self.target_type.is_empty() {
            ROOT_CLASS
        } else {
            &self.target_type
        }
    }
}

impl NodeKind for TypeCast {
    fn type_name(&self) -> &'static str {
        "type_cast"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_kind(&self) -> Box<dyn NodeKind> {
        Box::new(self.clone())
    }

    fn node_title(&self) -> String {
        format!("Cast To {}", self.target_type())
    }

    fn tooltip_text(&self) -> String {
        format!(
            "Tries to access the object as a '{}', it may be an instance of.",
            self.target_type()
        )
    }

    fn icon(&self) -> String {
        self.target_type().to_string()
    }

    fn keywords(&self) -> Vec<String> {
        vec!["cast".to_string(), "convert".to_string(), "as".to_string()]
    }

    fn property_list(&self) -> Vec<PropertyInfo> {
        vec![PropertyInfo::new("type", VariantType::String).with_hint(ROOT_CLASS)]
    }

    fn get_property(&self, name: &str) -> Option<Variant> {
        (name == "type").then(|| Variant::from(self.target_type.as_str()))
    }

    fn set_property(&mut self, core: &mut NodeCore, name: &str, value: &Variant) -> bool {
        if name != "type" {
            return false;
        }
        self.target_type = value.as_str().unwrap_or_default().to_string();
        core.notify_pins_changed();
        true
    }

    fn initialize(&mut self, _core: &mut NodeCore, context: &NodeInitContext) {
        if let Some(class_name) = context.non_empty_class_name() {
            self.target_type = class_name.to_string();
        }
    }

    fn allocate_default_pins(&self, core: &mut NodeCore) {
        core.create_pin(PinDirection::Input, "ExecIn", VariantType::Nil, Variant::Nil, None)
            .set_flags(PinFlags::EXECUTION);
        core.create_pin(PinDirection::Input, "instance", VariantType::Object, Variant::Nil, None)
            .set_flags(PinFlags::DATA | PinFlags::OBJECT);
        core.create_pin(PinDirection::Output, "yes", VariantType::Nil, Variant::Nil, None)
            .set_flags(PinFlags::EXECUTION | PinFlags::SHOW_LABEL);
        core.create_pin(PinDirection::Output, "no", VariantType::Nil, Variant::Nil, None)
            .set_flags(PinFlags::EXECUTION | PinFlags::SHOW_LABEL);
        core.create_pin(PinDirection::Output, "output", VariantType::Object, Variant::Nil, None)
            .set_flags(PinFlags::DATA | PinFlags::OBJECT | PinFlags::NO_CAPITALIZE)
            .set_label(format!("as {}", self.target_type()))
            .set_target_class(self.target_type());
    }

    fn post_node_autowired(&mut self, scope: &mut AutowireScope<'_>, direction: PinDirection) -> bool {
        if direction != PinDirection::Output {
            return false;
        }

        let exec_in = scope
            .node()
            .find_pin("ExecIn", Some(PinDirection::Input))
            .filter(|pin| !pin.has_any_connections())
            .map(Pin::id);
        if let Some(exec_in) = exec_in {
            let source = scope
                .other_pins(PinDirection::Output)
                .find(|pin| pin.is_execution())
                .map(Pin::pin_ref);
            if let Some(source) = source {
                if let Err(error) = scope.link(exec_in, source) {
                    tracing::debug!(%error, "could not autowire execution input");
                }
            }
        }

        let Some(instance) = scope.node().find_pin("instance", Some(PinDirection::Input)) else {
            return false;
        };
        let instance_id = instance.id();
        if !instance.has_any_connections() {
            let source = scope
                .other_pins(PinDirection::Output)
                .find(|pin| pin.is_data() && pin.value_type() == VariantType::Object)
                .map(Pin::pin_ref);
            if let Some(source) = source {
                if let Err(error) = scope.link(instance_id, source) {
                    tracing::debug!(%error, "could not autowire instance input");
                }
            }
        }

        let upstream = scope
            .node()
            .pin(instance_id)
            .and_then(|pin| pin.connections().first().copied());
        match upstream {
            Some(upstream) => {
                self.target_type = scope.resolve_type_class(upstream).unwrap_or_default();
                true
            }
            None => false,
        }
    }

    fn resolve_type_class(&self, _core: &NodeCore, pin: &Pin) -> Option<String> {
        if !pin.is_output() {
            return None;
        }
        match pin.pin_index() {
            1 => Some(ROOT_CLASS.to_string()),
            0 | 2 => Some(self.target_type().to_string()),
            _ => None,
        }
    }

    fn instantiate(&self, core: &NodeCore, _container: &ScriptInstance) -> Box<dyn NodeInstance> {
        Box::new(TypeCastInstance {
            node: core.id(),
            target_class: self.target_type().to_string(),
        })
    }
}

/// Runtime side of [`TypeCast`]
#[derive(Debug)]
pub struct TypeCastInstance {
    node: NodeId,
    target_class: String,
}

impl NodeInstance for TypeCastInstance {
    fn node_id(&self) -> NodeId {
        self.node
    }

    fn step(&mut self, context: &mut ExecutionContext<'_>) -> usize {
        let Some(object) = context.input(0).as_object().cloned() else {
            return 1;
        };
        if !context
            .instance()
            .classes()
            .is_parent_class(object.class_name(), &self.target_class)
        {
            return 1;
        }
        context.set_output(0, Variant::Object(object));
        0
    }
}
