// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner settings, stored as RON next to the orchestrations they run.

use indexmap::IndexMap;
use ordoplay_script::class_db::ROOT_CLASS;
use ordoplay_script::{ClassDb, DriverConfig, ObjectRef, ScriptInstance};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Settings for one runner invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Driver limits
    pub driver: DriverConfig,
    /// Class hierarchy as `class -> parent`, parents listed first
    pub classes: IndexMap<String, String>,
    /// Class of the object that owns the running script, if any
    pub owner_class: Option<String>,
}

impl RunnerConfig {
    /// Load settings from a RON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        ron::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Build the class database described by `classes`
    pub fn class_db(&self) -> ClassDb {
        let mut db = ClassDb::new();
        for (name, parent) in &self.classes {
            let parent = if parent.is_empty() { ROOT_CLASS } else { parent.as_str() };
            db.register_class(name.as_str(), parent);
        }
        db
    }

    /// Build the script container for a run
    pub fn container(&self) -> ScriptInstance {
        let container = ScriptInstance::new(Arc::new(self.class_db()));
        match &self.owner_class {
            Some(class_name) => container.with_owner(ObjectRef::new(class_name.as_str())),
            None => container,
        }
    }
}
