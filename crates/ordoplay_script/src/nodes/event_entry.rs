// SPDX-License-Identifier: MIT OR Apache-2.0
//! Event entry: where execution of an event graph begins.

use crate::class_db::ROOT_CLASS;
use crate::context::{NodeInitContext, PropertyInfo};
use crate::flags::PinFlags;
use crate::graph::ScriptGraph;
use crate::instance::{ExecutionContext, NodeInstance, ScriptInstance};
use crate::node::{NodeCore, NodeId, NodeKind};
use crate::pin::PinDirection;
use crate::value::{Variant, VariantType};
use std::any::Any;

/// Entry point fired when the host raises an event
#[derive(Debug, Clone)]
pub struct EventEntry {
    event_name: String,
    owner_class: String,
}

impl Default for EventEntry {
    fn default() -> Self {
        Self {
            event_name: "_ready".to_string(),
            owner_class: ROOT_CLASS.to_string(),
        }
    }
}

impl EventEntry {
    /// Name of the event
    pub fn event_name(&self) -> &str {
        &self.event_name
    }
}

impl NodeKind for EventEntry {
    fn type_name(&self) -> &'static str {
        "event_entry"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_kind(&self) -> Box<dyn NodeKind> {
        Box::new(self.clone())
    }

    fn node_title(&self) -> String {
        format!("Event {}", self.event_name)
    }

    fn compact_node_title(&self) -> String {
        self.event_name.clone()
    }

    fn icon(&self) -> String {
        "PlayStart".to_string()
    }

    fn node_title_color_name(&self) -> &'static str {
        "events"
    }

    fn draw_node_as_entry(&self) -> bool {
        true
    }

    fn is_compatible_with_graph(&self, graph: &ScriptGraph) -> bool {
        !graph.is_function_graph()
    }

    fn property_list(&self) -> Vec<PropertyInfo> {
        vec![
            PropertyInfo::new("event_name", VariantType::String),
            PropertyInfo::new("owner_class", VariantType::String).with_class_name(ROOT_CLASS),
        ]
    }

    fn get_property(&self, name: &str) -> Option<Variant> {
        match name {
            "event_name" => Some(Variant::from(self.event_name.as_str())),
            "owner_class" => Some(Variant::from(self.owner_class.as_str())),
            _ => None,
        }
    }

    fn set_property(&mut self, core: &mut NodeCore, name: &str, value: &Variant) -> bool {
        let Some(text) = value.as_str() else {
            return matches!(name, "event_name" | "owner_class");
        };
        match name {
            "event_name" => self.event_name = text.to_string(),
            "owner_class" => {
                self.owner_class = text.to_string();
                core.notify_pins_changed();
            }
            _ => return false,
        }
        true
    }

    fn initialize(&mut self, _core: &mut NodeCore, context: &NodeInitContext) {
        if let Some(method) = &context.method {
            self.event_name.clone_from(&method.name);
        }
        if let Some(class_name) = context.non_empty_class_name() {
            self.owner_class = class_name.to_string();
        }
    }

    fn allocate_default_pins(&self, core: &mut NodeCore) {
        core.create_pin(PinDirection::Output, "ExecOut", VariantType::Nil, Variant::Nil, None)
            .set_flags(PinFlags::EXECUTION);
        core.create_pin(PinDirection::Output, "owner", VariantType::Object, Variant::Nil, None)
            .set_flags(PinFlags::DATA | PinFlags::OBJECT)
            .set_target_class(self.owner_class.as_str());
    }

    fn instantiate(&self, core: &NodeCore, _container: &ScriptInstance) -> Box<dyn NodeInstance> {
        Box::new(EventEntryInstance { node: core.id() })
    }
}

#[derive(Debug)]
struct EventEntryInstance {
    node: NodeId,
}

impl NodeInstance for EventEntryInstance {
    fn node_id(&self) -> NodeId {
        self.node
    }

    fn step(&mut self, context: &mut ExecutionContext<'_>) -> usize {
        let owner = context
            .instance()
            .owner()
            .cloned()
            .map_or(Variant::Nil, Variant::Object);
        context.set_output(0, owner);
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MethodInfo;
    use crate::flags::GraphFlags;
    use crate::node::ScriptNode;
    use crate::pin::Pin;

    #[test]
    fn test_seeded_from_context() {
        let mut node = ScriptNode::new(Box::new(EventEntry::default()));
        node.initialize(
            &NodeInitContext::new()
                .with_method(MethodInfo::new("_process"))
                .with_class_name("Sprite2D"),
        );

        assert_eq!(node.title(), "Event _process");
        assert!(node.kind().draw_node_as_entry());
        let owner = node.core().find_pin("owner", Some(PinDirection::Output));
        assert_eq!(owner.map(Pin::target_class), Some("Sprite2D"));
        assert_eq!(
            owner.and_then(|pin| node.kind().resolve_type_class(node.core(), pin)).as_deref(),
            Some("Sprite2D")
        );
    }

    #[test]
    fn test_rejected_by_function_graphs() {
        let kind = EventEntry::default();
        assert!(kind.is_compatible_with_graph(&ScriptGraph::new("EventGraph", GraphFlags::EVENT)));
        assert!(!kind.is_compatible_with_graph(&ScriptGraph::new("helper", GraphFlags::FUNCTION)));
    }
}
