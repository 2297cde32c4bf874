// SPDX-License-Identifier: MIT OR Apache-2.0
//! Branch: if/else on a boolean condition.

use crate::flags::PinFlags;
use crate::instance::{ExecutionContext, NodeInstance, ScriptInstance};
use crate::node::{NodeCore, NodeId, NodeKind};
use crate::pin::PinDirection;
use crate::value::{Variant, VariantType};
use std::any::Any;

/// Continues through `true` or `false`
#[derive(Debug, Clone, Default)]
pub struct Branch;

impl NodeKind for Branch {
    fn type_name(&self) -> &'static str {
        "branch"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_kind(&self) -> Box<dyn NodeKind> {
        Box::new(self.clone())
    }

    fn node_title(&self) -> String {
        "Branch".to_string()
    }

    fn tooltip_text(&self) -> String {
        "Continues through True or False depending on the condition.".to_string()
    }

    fn icon(&self) -> String {
        "VcsBranches".to_string()
    }

    fn keywords(&self) -> Vec<String> {
        vec!["if".to_string(), "else".to_string()]
    }

    fn node_title_color_name(&self) -> &'static str {
        "flow_control"
    }

    fn allocate_default_pins(&self, core: &mut NodeCore) {
        core.create_pin(PinDirection::Input, "ExecIn", VariantType::Nil, Variant::Nil, None)
            .set_flags(PinFlags::EXECUTION);
        core.create_pin(PinDirection::Input, "condition", VariantType::Bool, Variant::Bool(true), None);
        core.create_pin(PinDirection::Output, "true", VariantType::Nil, Variant::Nil, None)
            .set_flags(PinFlags::EXECUTION | PinFlags::SHOW_LABEL);
        core.create_pin(PinDirection::Output, "false", VariantType::Nil, Variant::Nil, None)
            .set_flags(PinFlags::EXECUTION | PinFlags::SHOW_LABEL);
    }

    fn instantiate(&self, core: &NodeCore, _container: &ScriptInstance) -> Box<dyn NodeInstance> {
        Box::new(BranchInstance { node: core.id() })
    }
}

#[derive(Debug)]
struct BranchInstance {
    node: NodeId,
}

impl NodeInstance for BranchInstance {
    fn node_id(&self) -> NodeId {
        self.node
    }

    fn step(&mut self, context: &mut ExecutionContext<'_>) -> usize {
        if context.input(0).booleanize() {
            0
        } else {
            1
        }
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
    fn test_condition_selects_exit() {
        let mut node = ScriptNode::new(Box::new(Branch));
        node.initialize(&NodeInitContext::new());
        assert_eq!(node.core().execution_outputs().count(), 2);

        let container = ScriptInstance::new(Arc::new(ClassDb::new()));
        let mut instance = node.instantiate(&container);
        let mut context = ExecutionContext::new(&container);

        context.prepare(node.id(), vec![Variant::Bool(true)], 0);
        assert_eq!(instance.step(&mut context), 0);
        context.prepare(node.id(), vec![Variant::Bool(false)], 0);
        assert_eq!(instance.step(&mut context), 1);
        context.prepare(node.id(), vec![Variant::Nil], 0);
        assert_eq!(instance.step(&mut context), 1);
    }
}
