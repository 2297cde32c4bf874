// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node kinds.

mod branch;
mod event_entry;
mod print_string;
mod select;
mod type_cast;

pub use branch::Branch;
pub use event_entry::EventEntry;
pub use print_string::PrintString;
pub use select::{Select, SelectInstance};
pub use type_cast::{TypeCast, TypeCastInstance};

use crate::node::{NodeCategory, NodeKind, NodeRegistry, NodeType};

/// Create a registry with every built-in kind
pub fn create_builtin_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();

    registry.register(
        NodeType::new("event_entry", "Event", NodeCategory::Events, || {
            Box::new(EventEntry::default()) as Box<dyn NodeKind>
        })
        .with_description("Entry point raised by the host"),
    );
    registry.register(
        NodeType::new("branch", "Branch", NodeCategory::FlowControl, || {
            Box::new(Branch) as Box<dyn NodeKind>
        })
        .with_description("Continue through True or False"),
    );
    registry.register(
        NodeType::new("select", "Select", NodeCategory::FlowControl, || {
            Box::new(Select::default()) as Box<dyn NodeKind>
        })
        .with_description("Return A or B depending on a boolean"),
    );
    registry.register(
        NodeType::new("type_cast", "Cast To", NodeCategory::Data, || {
            Box::new(TypeCast::default()) as Box<dyn NodeKind>
        })
        .with_description("Access an object as a given class"),
    );
    registry.register(
        NodeType::new("print_string", "Print String", NodeCategory::Utility, || {
            Box::new(PrintString) as Box<dyn NodeKind>
        })
        .with_description("Print text to the output log"),
    );

    registry
}
