// SPDX-License-Identifier: MIT OR Apache-2.0
//! Initialization context used to seed newly spawned nodes.

use crate::value::{Variant, VariantType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Description of a property, used both for seeding nodes and for listing
/// a node kind's editable properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyInfo {
    /// Property name
    pub name: String,
    /// Value type
    pub value_type: VariantType,
    /// Class name for object properties
    #[serde(default)]
    pub class_name: String,
    /// Editor hint, such as an enum list
    #[serde(default)]
    pub hint: String,
}

impl PropertyInfo {
    /// Create a new property description
    pub fn new(name: impl Into<String>, value_type: VariantType) -> Self {
        Self {
            name: name.into(),
            value_type,
            ..Default::default()
        }
    }

    /// Set the editor hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    /// Set the class name
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }
}

/// Description of a method signature
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Method name
    pub name: String,
    /// Arguments in order
    #[serde(default)]
    pub arguments: Vec<PropertyInfo>,
    /// Return value, if any
    #[serde(default)]
    pub return_value: Option<PropertyInfo>,
}

impl MethodInfo {
    /// Create a method with no arguments and no return value
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append an argument
    pub fn with_argument(mut self, argument: PropertyInfo) -> Self {
        self.arguments.push(argument);
        self
    }
}

/// Seed data handed to a node once, when it is first created from the catalog.
///
/// Every field is optional. A node kind reads only the fields relevant to it
/// and ignores the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeInitContext {
    /// Method details
    pub method: Option<MethodInfo>,
    /// Property details
    pub property: Option<PropertyInfo>,
    /// Path to a scene node
    pub node_path: Option<String>,
    /// Class name
    pub class_name: Option<String>,
    /// Variable name
    pub variable_name: Option<String>,
    /// Resource path
    pub resource_path: Option<String>,
    /// Free-form data
    pub user_data: Option<IndexMap<String, Variant>>,
}

impl NodeInitContext {
    /// An empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the method details
    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the property details
    pub fn with_property(mut self, property: PropertyInfo) -> Self {
        self.property = Some(property);
        self
    }

    /// Set the node path
    pub fn with_node_path(mut self, node_path: impl Into<String>) -> Self {
        self.node_path = Some(node_path.into());
        self
    }

    /// Set the class name
    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Set the variable name
    pub fn with_variable_name(mut self, variable_name: impl Into<String>) -> Self {
        self.variable_name = Some(variable_name.into());
        self
    }

    /// Set the resource path
    pub fn with_resource_path(mut self, resource_path: impl Into<String>) -> Self {
        self.resource_path = Some(resource_path.into());
        self
    }

    /// Add one entry of free-form data
    pub fn with_user_data(mut self, key: impl Into<String>, value: Variant) -> Self {
        self.user_data
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value);
        self
    }

    /// The class name, if present and not empty
    pub fn non_empty_class_name(&self) -> Option<&str> {
        self.class_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Look up one entry of free-form data
    pub fn user_value(&self, key: &str) -> Option<&Variant> {
        self.user_data.as_ref().and_then(|data| data.get(key))
    }
}
