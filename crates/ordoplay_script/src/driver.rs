// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reference execution driver: walks an orchestration from an entry node.
//!
//! Before each `step` the driver fills the node's input slots. A linked data
//! input reads the latest output of its upstream node, evaluating pure data
//! nodes (nodes without execution pins) on demand. An unlinked input reads
//! the pin's default value. Control then follows the link attached to the
//! execution output the step returned.

use crate::error::ExecutionError;
use crate::instance::{ExecutionContext, FlowSignal, NodeInstance, ScriptInstance};
use crate::node::NodeId;
use crate::orchestration::Orchestration;
use crate::pin::{PinDirection, PinRef};
use crate::value::Variant;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Limits and diagnostics for the execution driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Steps allowed in one run, pure evaluations included
    pub max_steps: usize,
    /// Nesting allowed when evaluating pure data nodes
    pub max_data_depth: usize,
    /// Log every step at info level instead of trace
    pub trace_steps: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            max_data_depth: 64,
            trace_steps: false,
        }
    }
}

impl DriverConfig {
    /// Load driver settings from a RON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        ron::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save driver settings to a RON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Steps taken, pure evaluations included
    pub steps: usize,
    /// Nodes that received control, in order
    pub path: Vec<NodeId>,
    /// Lines printed during the run
    pub log: Vec<String>,
    /// Latest outputs of every node that stepped
    pub outputs: HashMap<NodeId, Vec<Variant>>,
}

struct Session<'a> {
    instances: IndexMap<NodeId, Box<dyn NodeInstance>>,
    outputs: HashMap<NodeId, Vec<Variant>>,
    evaluating: Vec<NodeId>,
    context: ExecutionContext<'a>,
}

/// Drives `step` calls across an orchestration
#[derive(Debug)]
pub struct ExecutionDriver<'o> {
    orchestration: &'o Orchestration,
    config: DriverConfig,
}

impl<'o> ExecutionDriver<'o> {
    /// Create a driver over an orchestration
    pub fn new(orchestration: &'o Orchestration, config: DriverConfig) -> Self {
        Self { orchestration, config }
    }

    /// Driver settings
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Run from `entry` until control reaches an unlinked exit.
    ///
    /// Every node is instantiated once for the run; the instances are
    /// dropped when it ends.
    pub fn run(&self, container: &ScriptInstance, entry: NodeId) -> Result<RunReport, ExecutionError> {
        if self.orchestration.node(entry).is_none() {
            return Err(ExecutionError::NodeNotFound(entry));
        }

        let mut session = Session {
            instances: self
                .orchestration
                .nodes()
                .map(|node| (node.id(), node.instantiate(container)))
                .collect(),
            outputs: HashMap::new(),
            evaluating: Vec::new(),
            context: ExecutionContext::new(container),
        };
        tracing::debug!(%entry, nodes = session.instances.len(), "run started");

        let mut path = Vec::new();
        let mut current = Some(entry);
        while let Some(node_id) = current {
            path.push(node_id);
            let exit = self.step_node(&mut session, node_id)?;
            current = self.follow_exit(node_id, exit)?;
        }

        tracing::debug!(steps = session.context.step_count(), "run finished");
        Ok(RunReport {
            steps: session.context.step_count(),
            path,
            log: session.context.log().to_vec(),
            outputs: session.outputs,
        })
    }

    fn step_node(&self, session: &mut Session<'_>, node_id: NodeId) -> Result<usize, ExecutionError> {
        if session.context.step_count() >= self.config.max_steps {
            return Err(ExecutionError::StepLimitExceeded(self.config.max_steps));
        }
        let node = self
            .orchestration
            .node(node_id)
            .ok_or(ExecutionError::NodeNotFound(node_id))?;

        let mut inputs = Vec::new();
        for pin in node.core().data_pins(PinDirection::Input) {
            let upstream = match pin.connections().first() {
                Some(source) => self.pull(session, *source)?,
                None => None,
            };
            inputs.push(upstream.unwrap_or_else(|| pin.default_value().clone()));
        }
        let output_count = node.core().data_pins(PinDirection::Output).count();

        let instance = session
            .instances
            .get_mut(&node_id)
            .ok_or(ExecutionError::NodeNotFound(node_id))?;
        session.context.prepare(node_id, inputs, output_count);
        session.context.push_frame(node_id);
        let exit = instance.step(&mut session.context);
        session.context.pop_frame();
        session.context.finish_step(exit);
        session.outputs.insert(node_id, session.context.take_outputs());

        if self.config.trace_steps {
            tracing::info!(node = %node_id, title = %node.title(), exit, "step");
        } else {
            tracing::trace!(node = %node_id, exit, "step");
        }

        if let FlowSignal::Error(message) = session.context.signal() {
            return Err(ExecutionError::NodeFailed {
                node: node_id,
                message: message.clone(),
            });
        }
        Ok(exit)
    }

    /// Value of an upstream output, evaluating pure nodes first
    fn pull(&self, session: &mut Session<'_>, source: PinRef) -> Result<Option<Variant>, ExecutionError> {
        let node = self
            .orchestration
            .node(source.node)
            .ok_or(ExecutionError::NodeNotFound(source.node))?;

        let pure = node.core().all_pins().iter().all(|pin| !pin.is_execution());
        if pure {
            if session.evaluating.contains(&source.node) || session.evaluating.len() >= self.config.max_data_depth {
                return Err(ExecutionError::DataCycle(source.node));
            }
            session.evaluating.push(source.node);
            let result = self.step_node(session, source.node);
            session.evaluating.pop();
            result?;
        }

        let Some(slot) = node.core().data_slot(source.pin) else {
            return Ok(None);
        };
        Ok(session
            .outputs
            .get(&source.node)
            .and_then(|outputs| outputs.get(slot))
            .cloned())
    }

    fn follow_exit(&self, node_id: NodeId, exit: usize) -> Result<Option<NodeId>, ExecutionError> {
        let node = self
            .orchestration
            .node(node_id)
            .ok_or(ExecutionError::NodeNotFound(node_id))?;
        let exits: Vec<_> = node.core().execution_outputs().collect();
        if exits.is_empty() {
            return Ok(None);
        }
        let pin = exits.get(exit).ok_or(ExecutionError::ExitOutOfRange {
            node: node_id,
            exit,
            count: exits.len(),
        })?;
        Ok(pin.connections().first().map(|target| target.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_db::ClassDb;
    use crate::context::NodeInitContext;
    use crate::flags::PinFlags;
    use crate::node::{NodeCore, NodeKind, ScriptNode};
    use crate::nodes::create_builtin_registry;
    use crate::pin::Pin;
    use crate::value::VariantType;
    use std::any::Any;
    use std::sync::Arc;

    fn container() -> ScriptInstance {
        ScriptInstance::new(Arc::new(ClassDb::new()))
    }

    fn add(orchestration: &mut Orchestration, kind: &str) -> NodeId {
        orchestration
            .create_node(&create_builtin_registry(), kind, &NodeInitContext::new(), [0.0, 0.0])
            .unwrap()
    }

    fn pin(orchestration: &Orchestration, node: NodeId, name: &str, direction: PinDirection) -> PinRef {
        orchestration
            .node(node)
            .and_then(|n| n.core().find_pin(name, Some(direction)))
            .map(Pin::pin_ref)
            .unwrap()
    }

    #[test]
    fn test_branch_routes_to_print() {
        let mut orchestration = Orchestration::new("branching");
        let entry = add(&mut orchestration, "event_entry");
        let branch = add(&mut orchestration, "branch");
        let yes = add(&mut orchestration, "print_string");
        let no = add(&mut orchestration, "print_string");

        let links = [
            (pin(&orchestration, entry, "ExecOut", PinDirection::Output), pin(&orchestration, branch, "ExecIn", PinDirection::Input)),
            (pin(&orchestration, branch, "true", PinDirection::Output), pin(&orchestration, yes, "ExecIn", PinDirection::Input)),
            (pin(&orchestration, branch, "false", PinDirection::Output), pin(&orchestration, no, "ExecIn", PinDirection::Input)),
        ];
        for (a, b) in links {
            orchestration.link(a, b).unwrap();
        }
        orchestration.set_pin_default_value(pin(&orchestration, yes, "text", PinDirection::Input), Variant::from("yes"));
        orchestration.set_pin_default_value(pin(&orchestration, no, "text", PinDirection::Input), Variant::from("no"));
        let condition = pin(&orchestration, branch, "condition", PinDirection::Input);

        let driver = ExecutionDriver::new(&orchestration, DriverConfig::default());
        let report = driver.run(&container(), entry).unwrap();
        assert_eq!(report.path, [entry, branch, yes]);
        assert_eq!(report.log, ["yes"]);

        orchestration.set_pin_default_value(condition, Variant::Bool(false));
        let driver = ExecutionDriver::new(&orchestration, DriverConfig::default());
        let report = driver.run(&container(), entry).unwrap();
        assert_eq!(report.log, ["no"]);
        assert_eq!(report.steps, 3);
    }

    #[test]
    fn test_pure_nodes_evaluate_on_demand() {
        let mut orchestration = Orchestration::new("pure");
        let entry = add(&mut orchestration, "event_entry");
        let print = add(&mut orchestration, "print_string");
        let select = add(&mut orchestration, "select");
        orchestration.change_pin_types(select, VariantType::String);

        orchestration
            .link(pin(&orchestration, entry, "ExecOut", PinDirection::Output), pin(&orchestration, print, "ExecIn", PinDirection::Input))
            .unwrap();
        orchestration
            .link(pin(&orchestration, select, "result", PinDirection::Output), pin(&orchestration, print, "text", PinDirection::Input))
            .unwrap();
        orchestration.set_pin_default_value(pin(&orchestration, select, "a", PinDirection::Input), Variant::from("x"));
        orchestration.set_pin_default_value(pin(&orchestration, select, "b", PinDirection::Input), Variant::from("y"));

        let driver = ExecutionDriver::new(&orchestration, DriverConfig::default());
        let report = driver.run(&container(), entry).unwrap();
        assert_eq!(report.log, ["y"]);
        assert_eq!(report.path, [entry, print]);
        assert_eq!(report.steps, 3);
        assert_eq!(report.outputs.get(&select), Some(&vec![Variant::from("y")]));
    }

    #[test]
    fn test_data_cycle_detected() {
        let mut orchestration = Orchestration::new("cycle");
        let entry = add(&mut orchestration, "event_entry");
        let print = add(&mut orchestration, "print_string");
        let first = add(&mut orchestration, "select");
        let second = add(&mut orchestration, "select");

        orchestration
            .link(pin(&orchestration, entry, "ExecOut", PinDirection::Output), pin(&orchestration, print, "ExecIn", PinDirection::Input))
            .unwrap();
        orchestration
            .link(pin(&orchestration, first, "result", PinDirection::Output), pin(&orchestration, print, "text", PinDirection::Input))
            .unwrap();
        orchestration
            .link(pin(&orchestration, second, "result", PinDirection::Output), pin(&orchestration, first, "b", PinDirection::Input))
            .unwrap();
        orchestration
            .link(pin(&orchestration, first, "result", PinDirection::Output), pin(&orchestration, second, "b", PinDirection::Input))
            .unwrap();

        let driver = ExecutionDriver::new(&orchestration, DriverConfig::default());
        assert_eq!(driver.run(&container(), entry), Err(ExecutionError::DataCycle(first)));
    }

    #[test]
    fn test_step_limit() {
        let mut orchestration = Orchestration::new("loop");
        let first = add(&mut orchestration, "print_string");
        let second = add(&mut orchestration, "print_string");
        orchestration
            .link(pin(&orchestration, first, "ExecOut", PinDirection::Output), pin(&orchestration, second, "ExecIn", PinDirection::Input))
            .unwrap();
        orchestration
            .link(pin(&orchestration, second, "ExecOut", PinDirection::Output), pin(&orchestration, first, "ExecIn", PinDirection::Input))
            .unwrap();

        let config = DriverConfig {
            max_steps: 10,
            ..DriverConfig::default()
        };
        let driver = ExecutionDriver::new(&orchestration, config);
        assert_eq!(driver.run(&container(), first), Err(ExecutionError::StepLimitExceeded(10)));
    }

    #[derive(Debug, Clone)]
    struct Faulty {
        exit: usize,
        error: bool,
    }

    #[derive(Debug)]
    struct FaultyInstance {
        node: NodeId,
        exit: usize,
        error: bool,
    }

    impl NodeInstance for FaultyInstance {
        fn node_id(&self) -> NodeId {
            self.node
        }

        fn step(&mut self, context: &mut ExecutionContext<'_>) -> usize {
            if self.error {
                context.set_error("no target");
            }
            self.exit
        }
    }

    impl NodeKind for Faulty {
        fn type_name(&self) -> &'static str {
            "faulty"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn clone_kind(&self) -> Box<dyn NodeKind> {
            Box::new(self.clone())
        }

        fn allocate_default_pins(&self, core: &mut NodeCore) {
            core.create_pin(PinDirection::Output, "ExecOut", VariantType::Nil, Variant::Nil, None)
                .set_flags(PinFlags::EXECUTION);
        }

        fn instantiate(&self, core: &NodeCore, _container: &ScriptInstance) -> Box<dyn NodeInstance> {
            Box::new(FaultyInstance {
                node: core.id(),
                exit: self.exit,
                error: self.error,
            })
        }
    }

    fn faulty(exit: usize, error: bool) -> (Orchestration, NodeId) {
        let mut orchestration = Orchestration::new("faulty");
        let mut node = ScriptNode::new(Box::new(Faulty { exit, error }));
        node.initialize(&NodeInitContext::new());
        let id = orchestration.add_node(node).unwrap();
        (orchestration, id)
    }

    #[test]
    fn test_exit_out_of_range() {
        let (orchestration, id) = faulty(3, false);
        let driver = ExecutionDriver::new(&orchestration, DriverConfig::default());
        assert_eq!(
            driver.run(&container(), id),
            Err(ExecutionError::ExitOutOfRange { node: id, exit: 3, count: 1 })
        );
    }

    #[test]
    fn test_node_error_stops_run() {
        let (orchestration, id) = faulty(0, true);
        let driver = ExecutionDriver::new(&orchestration, DriverConfig::default());
        assert_eq!(
            driver.run(&container(), id),
            Err(ExecutionError::NodeFailed {
                node: id,
                message: "no target".to_string()
            })
        );
    }

    #[test]
    fn test_missing_entry() {
        let orchestration = Orchestration::new("empty");
        let driver = ExecutionDriver::new(&orchestration, DriverConfig::default());
        assert_eq!(driver.run(&container(), NodeId(5)), Err(ExecutionError::NodeNotFound(NodeId(5))));
    }

    #[test]
    fn test_config_file_round_trip() {
        let path = std::env::temp_dir().join(format!("ordoplay_driver_{}.ron", std::process::id()));
        let config = DriverConfig {
            max_steps: 25,
            max_data_depth: 4,
            trace_steps: true,
        };
        config.save(&path).unwrap();
        let loaded = DriverConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);

        let partial: DriverConfig = ron::from_str("(max_steps: 7)").unwrap();
        assert_eq!(partial.max_steps, 7);
        assert_eq!(partial.max_data_depth, 64);
    }
}
