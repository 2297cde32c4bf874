// SPDX-License-Identifier: MIT OR Apache-2.0
//! Saving and loading orchestrations as RON or JSON.
//!
//! Nodes are stored as flat records keyed by kind name. Links are stored
//! once, as connection records between pin slots, and replayed through
//! [`Orchestration::link`] on load.

use crate::error::{GraphError, PersistenceError};
use crate::flags::{GraphFlags, NodeFlags};
use crate::graph::ScriptGraph;
use crate::node::{NodeId, NodeRegistry, ScriptNode};
use crate::orchestration::Orchestration;
use crate::pin::{Pin, PinDirection, PinRecord, PinRef};
use crate::value::Variant;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current orchestration file format version
pub const ORCHESTRATION_FORMAT_VERSION: u32 = 1;

/// A saved node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id
    pub id: NodeId,
    /// Registered kind name
    pub kind: String,
    /// Canvas position
    #[serde(default)]
    pub position: [f32; 2],
    /// Canvas size
    #[serde(default)]
    pub size: [f32; 2],
    /// Node flags
    #[serde(default)]
    pub flags: NodeFlags,
    /// Kind properties
    #[serde(default)]
    pub properties: IndexMap<String, Variant>,
    /// Pins in declaration order. Empty means the kind's default pins.
    #[serde(default)]
    pub pins: Vec<PinRecord>,
}

/// A saved link between an output slot and an input slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Node owning the output pin
    pub source_node: NodeId,
    /// Output slot index
    pub source_port: usize,
    /// Node owning the input pin
    pub target_node: NodeId,
    /// Input slot index
    pub target_port: usize,
}

/// A saved graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRecord {
    /// Graph name
    pub name: String,
    /// Graph flags
    #[serde(default)]
    pub flags: GraphFlags,
    /// Member node ids
    #[serde(default)]
    pub nodes: Vec<NodeId>,
}

/// A saved orchestration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationRecord {
    /// Format version
    pub version: u32,
    /// Orchestration name
    pub name: String,
    /// Nodes
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Links
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
    /// Graphs
    #[serde(default)]
    pub graphs: Vec<GraphRecord>,
}

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Rusty Object Notation
    #[default]
    Ron,
    /// JSON
    Json,
}

impl Format {
    /// Pick the format from a file extension, RON unless it is `.json`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Ron,
        }
    }
}

impl OrchestrationRecord {
    /// Serialize to RON
    pub fn to_ron(&self) -> Result<String, PersistenceError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    /// Deserialize from RON
    pub fn from_ron(s: &str) -> Result<Self, PersistenceError> {
        Ok(ron::from_str(s)?)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON
    pub fn from_json(s: &str) -> Result<Self, PersistenceError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Serialize in the given format
    pub fn encode(&self, format: Format) -> Result<String, PersistenceError> {
        match format {
            Format::Ron => self.to_ron(),
            Format::Json => self.to_json(),
        }
    }

    /// Deserialize from the given format
    pub fn decode(s: &str, format: Format) -> Result<Self, PersistenceError> {
        match format {
            Format::Ron => Self::from_ron(s),
            Format::Json => Self::from_json(s),
        }
    }
}

impl Orchestration {
    /// Flatten the orchestration into a record.
    ///
    /// Every node sees `pre_save` before and `post_save` after.
    pub fn to_record(&mut self) -> OrchestrationRecord {
        for node in self.nodes_mut() {
            let (core, kind) = node.split_mut();
            kind.pre_save(core);
        }

        let nodes = self.nodes().map(node_record).collect();
        let connections = self
            .connections()
            .into_iter()
            .filter_map(|connection| {
                Some(ConnectionRecord {
                    source_node: connection.source.node,
                    source_port: self.pin(connection.source)?.pin_index(),
                    target_node: connection.target.node,
                    target_port: self.pin(connection.target)?.pin_index(),
                })
            })
            .collect();
        let graphs = self
            .graphs()
            .map(|graph| GraphRecord {
                name: graph.name().to_string(),
                flags: graph.flags(),
                nodes: graph.nodes().collect(),
            })
            .collect();

        for node in self.nodes_mut() {
            let (core, kind) = node.split_mut();
            kind.post_save(core);
        }

        OrchestrationRecord {
            version: ORCHESTRATION_FORMAT_VERSION,
            name: self.name.clone(),
            nodes,
            connections,
            graphs,
        }
    }

    /// Rebuild an orchestration from a record.
    ///
    /// Connection records that point at missing pins or that the pins
    /// reject are skipped with a warning.
    pub fn from_record(record: &OrchestrationRecord, registry: &NodeRegistry) -> Result<Self, PersistenceError> {
        if record.version > ORCHESTRATION_FORMAT_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: record.version,
                supported: ORCHESTRATION_FORMAT_VERSION,
            });
        }

        let mut orchestration = Orchestration::new(record.name.clone());
        for node_record in &record.nodes {
            if !node_record.id.is_assigned() {
                return Err(PersistenceError::InvalidNodeId(node_record.id));
            }
            let node = restore_node(node_record, registry)?;
            orchestration.add_node(node).map_err(|error| match error {
                GraphError::NodeIdTaken(id) => PersistenceError::DuplicateNodeId(id),
                other => PersistenceError::Graph(other),
            })?;
        }

        for connection in &record.connections {
            let source = find_slot(&orchestration, connection.source_node, connection.source_port, PinDirection::Output);
            let target = find_slot(&orchestration, connection.target_node, connection.target_port, PinDirection::Input);
            match (source, target) {
                (Some(source), Some(target)) => {
                    if let Err(error) = orchestration.link(source, target) {
                        tracing::warn!(%error, ?connection, "skipping connection");
                    }
                }
                _ => tracing::warn!(?connection, "skipping connection to a missing pin"),
            }
        }

        for graph_record in &record.graphs {
            let mut graph = ScriptGraph::new(graph_record.name.clone(), graph_record.flags);
            for &node_id in &graph_record.nodes {
                if orchestration.node(node_id).is_some() {
                    graph.insert(node_id);
                } else {
                    tracing::warn!(graph = %graph_record.name, node = %node_id, "graph references a missing node");
                }
            }
            orchestration.insert_graph(graph);
        }

        let ids: Vec<NodeId> = orchestration.nodes().map(ScriptNode::id).collect();
        for id in ids {
            if let Some(node) = orchestration.node_mut(id) {
                node.post_initialize();
            }
            orchestration.apply_pending_reconstruction(id);
        }

        tracing::debug!(
            name = %orchestration.name,
            nodes = orchestration.node_count(),
            "orchestration loaded"
        );
        Ok(orchestration)
    }

    /// Save to a file
    pub fn save(&mut self, path: &Path, format: Format) -> Result<(), PersistenceError> {
        let content = self.to_record().encode(format)?;
        std::fs::write(path, content)?;
        tracing::info!(path = %path.display(), "orchestration saved");
        Ok(())
    }

    /// Load from a file, picking the format from its extension
    pub fn load(path: &Path, registry: &NodeRegistry) -> Result<Self, PersistenceError> {
        let content = std::fs::read_to_string(path)?;
        let record = OrchestrationRecord::decode(&content, Format::from_path(path))?;
        Self::from_record(&record, registry)
    }
}

fn node_record(node: &ScriptNode) -> NodeRecord {
    let core = node.core();
    let properties = node
        .kind()
        .property_list()
        .into_iter()
        .filter_map(|info| {
            let value = node.kind().get_property(&info.name)?;
            Some((info.name, value))
        })
        .collect();

    NodeRecord {
        id: core.id(),
        kind: node.kind().type_name().to_string(),
        position: core.position(),
        size: core.size(),
        flags: core.flags(),
        properties,
        pins: core.all_pins().iter().map(Pin::to_record).collect(),
    }
}

fn restore_node(record: &NodeRecord, registry: &NodeRegistry) -> Result<ScriptNode, PersistenceError> {
    let kind = registry
        .create_kind(&record.kind)
        .ok_or_else(|| PersistenceError::UnknownNodeKind(record.kind.clone()))?;

    let mut node = ScriptNode::new(kind);
    let (core, kind) = node.split_mut();
    core.set_id(record.id);
    core.set_position(record.position);
    core.set_size(record.size);
    core.set_flags(record.flags);
    for (name, value) in &record.properties {
        if !kind.set_property(core, name, value) {
            tracing::warn!(node = %record.id, kind = %record.kind, property = %name, "unknown property ignored");
        }
    }

    if record.pins.is_empty() {
        kind.allocate_default_pins(core);
    } else {
        core.replace_pins(
            record
                .pins
                .iter()
                .map(|pin| Pin::from_record(record.id, pin))
                .collect(),
        );
    }
    Ok(node)
}

fn find_slot(
    orchestration: &Orchestration,
    node: NodeId,
    slot: usize,
    direction: PinDirection,
) -> Option<PinRef> {
    orchestration
        .node(node)?
        .core()
        .find_pin_at(slot, direction)
        .map(Pin::pin_ref)
}
