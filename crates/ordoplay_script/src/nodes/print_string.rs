// SPDX-License-Identifier: MIT OR Apache-2.0
//! Print string: writes text to the execution log.

use crate::flags::PinFlags;
use crate::instance::{ExecutionContext, NodeInstance, ScriptInstance};
use crate::node::{NodeCore, NodeId, NodeKind};
use crate::pin::PinDirection;
use crate::value::{Variant, VariantType};
use std::any::Any;

/// Prints its `text` input and continues
#[derive(Debug, Clone, Default)]
pub struct PrintString;

impl NodeKind for PrintString {
    fn type_name(&self) -> &'static str {
        "print_string"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_kind(&self) -> Box<dyn NodeKind> {
        Box::new(self.clone())
    }

    fn node_title(&self) -> String {
        "Print String".to_string()
    }

    fn tooltip_text(&self) -> String {
        "Prints the text to the output log.".to_string()
    }

    fn icon(&self) -> String {
        "Info".to_string()
    }

    fn keywords(&self) -> Vec<String> {
        vec!["log".to_string(), "debug".to_string()]
    }

    fn allocate_default_pins(&self, core: &mut NodeCore) {
        core.create_pin(PinDirection::Input, "ExecIn", VariantType::Nil, Variant::Nil, None)
            .set_flags(PinFlags::EXECUTION);
        core.create_pin(PinDirection::Input, "text", VariantType::String, Variant::Nil, None)
            .set_flags(PinFlags::DATA | PinFlags::MULTILINE);
        core.create_pin(PinDirection::Output, "ExecOut", VariantType::Nil, Variant::Nil, None)
            .set_flags(PinFlags::EXECUTION);
    }

    fn instantiate(&self, core: &NodeCore, _container: &ScriptInstance) -> Box<dyn NodeInstance> {
        Box::new(PrintStringInstance { node: core.id() })
    }
}

#[derive(Debug)]
struct PrintStringInstance {
    node: NodeId,
}

impl NodeInstance for PrintStringInstance {
    fn node_id(&self) -> NodeId {
        self.node
    }

    fn step(&mut self, context: &mut ExecutionContext<'_>) -> usize {
        let text = context.input(0).to_string();
        tracing::info!(node = %self.node, "{text}");
        context.print(text);
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_db::ClassDb;
    use crate::context::NodeInitContext;
    use crate::node::ScriptNode;
    use std::sync::Arc;

    #[test]
    fn test_prints_any_value() {
        let mut node = ScriptNode::new(Box::new(PrintString));
        node.initialize(&NodeInitContext::new());

        let container = ScriptInstance::new(Arc::new(ClassDb::new()));
        let mut instance = node.instantiate(&container);
        let mut context = ExecutionContext::new(&container);

        context.prepare(node.id(), vec![Variant::from("hello")], 0);
        assert_eq!(instance.step(&mut context), 0);
        context.prepare(node.id(), vec![Variant::Int(42)], 0);
        instance.step(&mut context);
        assert_eq!(context.log(), &["hello".to_string(), "42".to_string()]);
    }
}
