// SPDX-License-Identifier: MIT OR Apache-2.0
//! Class hierarchy used for object-type checks at edit and run time.

use indexmap::IndexMap;
use std::fmt;

/// Name of the root class every registered class descends from
pub const ROOT_CLASS: &str = "Object";

/// Answers class hierarchy questions for object-typed values
pub trait ClassResolver: fmt::Debug + Send + Sync {
    /// Whether `class` is `parent` or inherits from it
    fn is_parent_class(&self, class: &str, parent: &str) -> bool;

    /// Whether the class is known
    fn class_exists(&self, class: &str) -> bool;
}

/// A parent table of class names
#[derive(Debug, Clone)]
pub struct ClassDb {
    parents: IndexMap<String, Option<String>>,
}

impl Default for ClassDb {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassDb {
    /// Create a database holding only the root class
    pub fn new() -> Self {
        let mut parents = IndexMap::new();
        parents.insert(ROOT_CLASS.to_string(), None);
        Self { parents }
    }

    /// Register a class under an existing parent.
    ///
    /// Returns false when the parent is unknown or the class already exists.
    pub fn register_class(&mut self, name: impl Into<String>, parent: &str) -> bool {
        let name = name.into();
        if self.parents.contains_key(&name) {
            tracing::warn!(class = %name, "class already registered");
            return false;
        }
        if !self.parents.contains_key(parent) {
            tracing::warn!(class = %name, parent, "parent class is not registered");
            return false;
        }
        self.parents.insert(name, Some(parent.to_string()));
        true
    }

    /// Direct parent of a class
    pub fn parent_of(&self, class: &str) -> Option<&str> {
        self.parents.get(class)?.as_deref()
    }

    /// Registered class names in registration order
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.parents.keys().map(String::as_str)
    }
}

impl ClassResolver for ClassDb {
    fn is_parent_class(&self, class: &str, parent: &str) -> bool {
        let mut current = Some(class);
        while let Some(name) = current {
            if name == parent {
                return true;
            }
            current = self.parent_of(name);
        }
        false
    }

    fn class_exists(&self, class: &str) -> bool {
        self.parents.contains_key(class)
    }
}
