// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runtime side of a script: node instances, their container and the
//! execution context threaded through `step` calls.
//!
//! A [`NodeInstance`] is produced from a node for one execution session. It
//! refers to its node by id and reads everything else from the
//! [`ExecutionContext`] handed to [`NodeInstance::step`], so it never holds
//! on to editor state.

use crate::class_db::ClassResolver;
use crate::node::NodeId;
use crate::value::{ObjectRef, Variant};
use std::fmt;
use std::sync::Arc;

/// Runtime counterpart of a node.
pub trait NodeInstance: fmt::Debug {
    /// Id of the node this instance was produced from
    fn node_id(&self) -> NodeId;

    /// Read the input slots, write the output slots and return the ordinal
    /// of the execution output that receives control next.
    ///
    /// Runtime problems such as a null object pick a failure exit rather
    /// than raising an error.
    fn step(&mut self, context: &mut ExecutionContext<'_>) -> usize;
}

/// Runtime container a script executes inside of
#[derive(Debug, Clone)]
pub struct ScriptInstance {
    owner: Option<ObjectRef>,
    classes: Arc<dyn ClassResolver>,
}

impl ScriptInstance {
    /// Create a container without an owner object
    pub fn new(classes: Arc<dyn ClassResolver>) -> Self {
        Self { owner: None, classes }
    }

    /// Attach the object the script runs on
    pub fn with_owner(mut self, owner: ObjectRef) -> Self {
        self.owner = Some(owner);
        self
    }

    /// The object the script runs on
    pub fn owner(&self) -> Option<&ObjectRef> {
        self.owner.as_ref()
    }

    /// Class hierarchy used for object checks
    pub fn classes(&self) -> &dyn ClassResolver {
        self.classes.as_ref()
    }
}

/// Control flow state recorded in the execution context
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FlowSignal {
    /// No step has finished yet
    #[default]
    None,
    /// The last step selected this exit
    Exit(usize),
    /// A node reported an error; the driver stops
    Error(String),
}

static NIL: Variant = Variant::Nil;

/// Per-session state shared by every `step` call.
///
/// Input and output slots belong to the node currently stepping and are
/// indexed by data pin order.
#[derive(Debug)]
pub struct ExecutionContext<'a> {
    instance: &'a ScriptInstance,
    current: NodeId,
    inputs: Vec<Variant>,
    outputs: Vec<Variant>,
    call_stack: Vec<NodeId>,
    signal: FlowSignal,
    steps: usize,
    log: Vec<String>,
}

impl<'a> ExecutionContext<'a> {
    /// Create a context for one execution session
    pub fn new(instance: &'a ScriptInstance) -> Self {
        Self {
            instance,
            current: NodeId::UNASSIGNED,
            inputs: Vec::new(),
            outputs: Vec::new(),
            call_stack: Vec::new(),
            signal: FlowSignal::None,
            steps: 0,
            log: Vec::new(),
        }
    }

    /// The runtime container
    pub fn instance(&self) -> &'a ScriptInstance {
        self.instance
    }

    /// Node currently stepping
    pub fn current_node(&self) -> NodeId {
        self.current
    }

    /// Input slot value; missing slots read as nil
    pub fn input(&self, index: usize) -> &Variant {
        self.inputs.get(index).unwrap_or(&NIL)
    }

    /// All input slots
    pub fn inputs(&self) -> &[Variant] {
        &self.inputs
    }

    /// Output slot value; missing slots read as nil
    pub fn output(&self, index: usize) -> &Variant {
        self.outputs.get(index).unwrap_or(&NIL)
    }

    /// All output slots
    pub fn outputs(&self) -> &[Variant] {
        &self.outputs
    }

    /// Write an output slot. Writes past the node's outputs are dropped.
    pub fn set_output(&mut self, index: usize, value: Variant) {
        match self.outputs.get_mut(index) {
            Some(slot) => *slot = value,
            None => tracing::warn!(node = %self.current, index, "output slot out of range"),
        }
    }

    /// Report a host error; the driver stops after this step
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.signal = FlowSignal::Error(message.into());
    }

    /// Current control flow signal
    pub fn signal(&self) -> &FlowSignal {
        &self.signal
    }

    /// Append a line to the output log
    pub fn print(&mut self, text: impl Into<String>) {
        self.log.push(text.into());
    }

    /// Lines printed so far
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Number of steps taken
    pub fn step_count(&self) -> usize {
        self.steps
    }

    /// Nodes entered but not yet finished, innermost last
    pub fn call_stack(&self) -> &[NodeId] {
        &self.call_stack
    }

    /// Load the slots for `node` before its step
    pub fn prepare(&mut self, node: NodeId, inputs: Vec<Variant>, output_count: usize) {
        self.current = node;
        self.inputs = inputs;
        self.outputs = vec![Variant::Nil; output_count];
    }

    /// Enter a node
    pub fn push_frame(&mut self, node: NodeId) {
        self.call_stack.push(node);
    }

    /// Leave the innermost node
    pub fn pop_frame(&mut self) -> Option<NodeId> {
        self.call_stack.pop()
    }

    /// Record the exit chosen by the step that just finished
    pub fn finish_step(&mut self, exit: usize) {
        self.steps += 1;
        if !matches!(self.signal, FlowSignal::Error(_)) {
            self.signal = FlowSignal::Exit(exit);
        }
    }

    /// Hand the output slots over, leaving them empty
    pub fn take_outputs(&mut self) -> Vec<Variant> {
        std::mem::take(&mut self.outputs)
    }
}
