// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visual scripting core for `OrdoPlay`.
//!
//! This crate provides the node/pin model behind orchestrations:
//! - Typed pins with symmetric links
//! - Node kinds with lifecycle hooks and reconstruction on edit
//! - Orchestrations that own nodes and graphs
//! - Runtime node instances stepped by an execution driver
//!
//! ## Architecture
//!
//! Editing and execution are kept apart:
//! - [`ScriptNode`] is persistent and editable; it pairs a [`NodeCore`] with
//!   a boxed [`NodeKind`]
//! - [`NodeInstance`] is produced per execution session and only sees the
//!   [`ExecutionContext`] handed to its `step`
//! - [`ExecutionDriver`] sequences `step` calls by following exit indices

pub mod class_db;
pub mod connection;
pub mod context;
pub mod driver;
pub mod error;
pub mod flags;
pub mod graph;
pub mod instance;
pub mod node;
pub mod nodes;
pub mod orchestration;
pub mod persistence;
pub mod pin;
pub mod rewire;
pub mod value;

pub use class_db::{ClassDb, ClassResolver};
pub use connection::Connection;
pub use context::{MethodInfo, NodeInitContext, PropertyInfo};
pub use driver::{DriverConfig, ExecutionDriver, RunReport};
pub use error::{BuildError, ExecutionError, GraphError, LinkError, PersistenceError};
pub use flags::{GraphFlags, NodeFlags, PinFlags};
pub use graph::ScriptGraph;
pub use instance::{ExecutionContext, FlowSignal, NodeInstance, ScriptInstance};
pub use node::{NodeCategory, NodeCore, NodeId, NodeKind, NodeRegistry, NodeType, ScriptNode};
pub use nodes::create_builtin_registry;
pub use orchestration::{AutowireScope, Orchestration, OrchestrationId};
pub use persistence::{Format, OrchestrationRecord, ORCHESTRATION_FORMAT_VERSION};
pub use pin::{Pin, PinDirection, PinId, PinRef};
pub use rewire::PinRewire;
pub use value::{ObjectRef, Variant, VariantType};
