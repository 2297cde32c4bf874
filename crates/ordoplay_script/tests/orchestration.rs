// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end tests: build an orchestration, edit it, save, load and run it.

use ordoplay_script::class_db::ROOT_CLASS;
use ordoplay_script::nodes::TypeCast;
use ordoplay_script::*;
use std::any::Any;
use std::sync::Arc;

fn classes() -> Arc<ClassDb> {
    let mut db = ClassDb::new();
    db.register_class("Node", ROOT_CLASS);
    db.register_class("Node2D", "Node");
    db.register_class("Sprite2D", "Node2D");
    db.register_class("AudioPlayer", "Node");
    Arc::new(db)
}

fn pin(orchestration: &Orchestration, node: NodeId, name: &str, direction: PinDirection) -> PinRef {
    orchestration
        .node(node)
        .and_then(|n| n.core().find_pin(name, Some(direction)))
        .map(Pin::pin_ref)
        .unwrap_or_else(|| panic!("node {node} has no pin {name}"))
}

fn exec_link(orchestration: &mut Orchestration, from: NodeId, exit: &str, to: NodeId) {
    let source = pin(orchestration, from, exit, PinDirection::Output);
    let target = pin(orchestration, to, "ExecIn", PinDirection::Input);
    orchestration.link(source, target).unwrap();
}

fn assert_links_consistent(orchestration: &Orchestration) {
    for node in orchestration.nodes() {
        for local in node.core().all_pins() {
            assert_eq!(local.owning_node(), node.id());
            for partner in local.connections() {
                let remote = orchestration
                    .pin(*partner)
                    .unwrap_or_else(|| panic!("dangling link from {}", node.id()));
                assert!(remote.is_linked_to(local.pin_ref()), "link recorded on one side only");
                assert_ne!(remote.direction(), local.direction());
            }
        }
    }
}

/// Event entry -> cast to Sprite2D -> print "sprite" / print "other"
fn cast_script(registry: &NodeRegistry) -> (Orchestration, NodeId, NodeId) {
    let mut orchestration = Orchestration::new("cast_demo");
    orchestration.create_graph("EventGraph", GraphFlags::EVENT | GraphFlags::EDITABLE).unwrap();

    let entry = orchestration
        .create_node(
            registry,
            "event_entry",
            &NodeInitContext::new()
                .with_method(MethodInfo::new("_ready"))
                .with_class_name("Sprite2D"),
            [0.0, 0.0],
        )
        .unwrap();
    let cast = orchestration
        .create_node(registry, "type_cast", &NodeInitContext::new(), [200.0, 0.0])
        .unwrap();
    let sprite = orchestration
        .create_node(registry, "print_string", &NodeInitContext::new(), [400.0, 0.0])
        .unwrap();
    let other = orchestration
        .create_node(registry, "print_string", &NodeInitContext::new(), [400.0, 100.0])
        .unwrap();
    for id in [entry, cast, sprite, other] {
        orchestration.add_node_to_graph("EventGraph", id).unwrap();
    }

    assert!(orchestration.autowire_node(cast, entry, PinDirection::Output));
    exec_link(&mut orchestration, cast, "yes", sprite);
    exec_link(&mut orchestration, cast, "no", other);

    let sprite_text = pin(&orchestration, sprite, "text", PinDirection::Input);
    let other_text = pin(&orchestration, other, "text", PinDirection::Input);
    assert!(orchestration.set_pin_default_value(sprite_text, Variant::from("sprite")));
    assert!(orchestration.set_pin_default_value(other_text, Variant::from("other")));

    (orchestration, entry, cast)
}

fn run_with_owner(orchestration: &Orchestration, entry: NodeId, owner: Option<ObjectRef>) -> RunReport {
    let mut container = ScriptInstance::new(classes());
    if let Some(owner) = owner {
        container = container.with_owner(owner);
    }
    ExecutionDriver::new(orchestration, DriverConfig::default())
        .run(&container, entry)
        .unwrap()
}

#[test]
fn test_cast_script_routes_by_runtime_class() {
    let registry = create_builtin_registry();
    let (orchestration, entry, cast) = cast_script(&registry);
    assert_links_consistent(&orchestration);
    assert_eq!(
        orchestration.node(cast).and_then(|n| n.kind_as::<TypeCast>()).map(TypeCast::target_type),
        Some("Sprite2D")
    );

    let sprite = ObjectRef::new("Sprite2D");
    let report = run_with_owner(&orchestration, entry, Some(sprite.clone()));
    assert_eq!(report.log, ["sprite"]);
    let output = report.outputs.get(&cast).and_then(|o| o.first());
    assert!(output.and_then(Variant::as_object).is_some_and(|o| o.ptr_eq(&sprite)));

    let report = run_with_owner(&orchestration, entry, Some(ObjectRef::new("AudioPlayer")));
    assert_eq!(report.log, ["other"]);
    assert!(report.outputs.get(&cast).and_then(|o| o.first()).map_or(true, Variant::is_nil));

    let report = run_with_owner(&orchestration, entry, None);
    assert_eq!(report.log, ["other"]);
}

#[test]
fn test_save_load_run() {
    let registry = create_builtin_registry();
    let (mut orchestration, entry, _) = cast_script(&registry);

    let path = std::env::temp_dir().join(format!("ordoplay_script_it_{}.json", std::process::id()));
    orchestration.save(&path, Format::from_path(&path)).unwrap();
    let loaded = Orchestration::load(&path, &registry).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.node_count(), 4);
    assert_eq!(loaded.connections().len(), orchestration.connections().len());
    assert_eq!(loaded.graph("EventGraph").map(ScriptGraph::len), Some(4));
    assert_links_consistent(&loaded);
    assert_eq!(loaded.validate(), Ok(()));
    assert_eq!(loaded.entry_nodes().map(ScriptNode::id).collect::<Vec<_>>(), [entry]);

    let report = run_with_owner(&loaded, entry, Some(ObjectRef::new("Sprite2D")));
    assert_eq!(report.log, ["sprite"]);
}

#[test]
fn test_select_feeds_print() {
    let registry = create_builtin_registry();
    let mut orchestration = Orchestration::new("select_demo");
    let entry = orchestration
        .create_node(&registry, "event_entry", &NodeInitContext::new(), [0.0, 0.0])
        .unwrap();
    let print = orchestration
        .create_node(&registry, "print_string", &NodeInitContext::new(), [200.0, 0.0])
        .unwrap();
    let select = orchestration
        .create_node(&registry, "select", &NodeInitContext::new(), [100.0, 100.0])
        .unwrap();
    assert!(orchestration.set_node_property(select, "type", &Variant::Int(VariantType::String.index() - 1)));

    exec_link(&mut orchestration, entry, "ExecOut", print);
    let result = pin(&orchestration, select, "result", PinDirection::Output);
    let text = pin(&orchestration, print, "text", PinDirection::Input);
    orchestration.link(result, text).unwrap();

    for (name, value) in [("a", "x"), ("b", "y")] {
        let input = pin(&orchestration, select, name, PinDirection::Input);
        assert!(orchestration.set_pin_default_value(input, Variant::from(value)));
    }
    let pick_a = pin(&orchestration, select, "pick_a", PinDirection::Input);

    assert!(orchestration.set_pin_default_value(pick_a, Variant::Bool(true)));
    assert_eq!(run_with_owner(&orchestration, entry, None).log, ["x"]);

    assert!(orchestration.set_pin_default_value(pick_a, Variant::Bool(false)));
    assert_eq!(run_with_owner(&orchestration, entry, None).log, ["y"]);
}

#[test]
fn test_instantiate_leaves_node_untouched() {
    let registry = create_builtin_registry();
    let (orchestration, _, cast) = cast_script(&registry);
    let node = orchestration.node(cast).unwrap();

    let snapshot = |node: &ScriptNode| {
        let core = node.core();
        let pins: Vec<_> = core
            .all_pins()
            .iter()
            .map(|p| (p.id(), p.to_record(), p.connections().to_vec()))
            .collect();
        (core.size(), core.position(), core.flags(), pins)
    };

    let before = snapshot(node);
    let container = ScriptInstance::new(classes());
    let instance = node.instantiate(&container);
    assert_eq!(instance.node_id(), cast);
    assert_eq!(snapshot(node), before);
}

#[test]
fn test_pin_queries_are_idempotent() {
    let registry = create_builtin_registry();
    let (orchestration, _, cast) = cast_script(&registry);
    let core = orchestration.node(cast).unwrap().core();

    for direction in [None, Some(PinDirection::Input), Some(PinDirection::Output)] {
        let first: Vec<PinId> = core.find_pins(direction).map(Pin::id).collect();
        let second: Vec<PinId> = core.find_pins(direction).map(Pin::id).collect();
        assert_eq!(first, second);
    }
    assert_eq!(
        core.find_pin("output", None).map(Pin::id),
        core.find_pin_at(2, PinDirection::Output).map(Pin::id)
    );
}

#[test]
fn test_removing_linked_pin_clears_partner() {
    let registry = create_builtin_registry();
    let (mut orchestration, entry, cast) = cast_script(&registry);
    let instance = pin(&orchestration, cast, "instance", PinDirection::Input);
    let owner = pin(&orchestration, entry, "owner", PinDirection::Output);
    assert!(orchestration.pin(owner).is_some_and(|p| p.is_linked_to(instance)));

    assert!(orchestration.remove_pin(instance));
    assert!(orchestration.pin(owner).is_some_and(|p| !p.has_any_connections()));
    assert_links_consistent(&orchestration);
}

/// A node whose second input changes from `b: bool` to `c: String`
#[derive(Debug, Clone, Default)]
struct Reshaping {
    reshaped: bool,
}

#[derive(Debug)]
struct ReshapingInstance(NodeId);

impl NodeInstance for ReshapingInstance {
    fn node_id(&self) -> NodeId {
        self.0
    }

    fn step(&mut self, _context: &mut ExecutionContext<'_>) -> usize {
        0
    }
}

impl NodeKind for Reshaping {
    fn type_name(&self) -> &'static str {
        "reshaping"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_kind(&self) -> Box<dyn NodeKind> {
        Box::new(self.clone())
    }

    fn set_property(&mut self, core: &mut NodeCore, name: &str, value: &Variant) -> bool {
        if name != "reshaped" {
            return false;
        }
        self.reshaped = value.booleanize();
        core.notify_pins_changed();
        true
    }

    fn allocate_default_pins(&self, core: &mut NodeCore) {
        core.create_pin(PinDirection::Input, "a", VariantType::Int, Variant::Int(5), None);
        if self.reshaped {
            core.create_pin(PinDirection::Input, "c", VariantType::String, Variant::Nil, None);
        } else {
            core.create_pin(PinDirection::Input, "b", VariantType::Bool, Variant::Nil, None);
        }
    }

    fn instantiate(&self, core: &NodeCore, _container: &ScriptInstance) -> Box<dyn NodeInstance> {
        Box::new(ReshapingInstance(core.id()))
    }
}

#[test]
fn test_reconstruction_keeps_surviving_links_only() {
    let mut registry = create_builtin_registry();
    registry.register(NodeType::new("reshaping", "Reshaping", NodeCategory::Custom, || {
        Box::new(Reshaping::default()) as Box<dyn NodeKind>
    }));

    let mut orchestration = Orchestration::new("reshape");
    let context = NodeInitContext::new();
    let node = orchestration.create_node(&registry, "reshaping", &context, [0.0, 0.0]).unwrap();
    let ints = orchestration.create_node(&registry, "select", &context, [0.0, 0.0]).unwrap();
    let bools = orchestration.create_node(&registry, "select", &context, [0.0, 0.0]).unwrap();
    assert!(orchestration.change_pin_types(ints, VariantType::Int));
    assert!(orchestration.change_pin_types(bools, VariantType::Bool));

    let int_out = pin(&orchestration, ints, "result", PinDirection::Output);
    let bool_out = pin(&orchestration, bools, "result", PinDirection::Output);
    let a = pin(&orchestration, node, "a", PinDirection::Input);
    let b = pin(&orchestration, node, "b", PinDirection::Input);
    orchestration.link(int_out, a).unwrap();
    orchestration.link(bool_out, b).unwrap();
    assert!(orchestration.set_pin_default_value(a, Variant::Int(9)));

    assert!(orchestration.set_node_property(node, "reshaped", &Variant::Bool(true)));

    let core = orchestration.node(node).unwrap().core();
    let names: Vec<_> = core.find_pins(None).map(Pin::name).collect();
    assert_eq!(names, ["a", "c"]);
    assert!(!core.is_reconstructing());

    let new_a = core.find_pin("a", Some(PinDirection::Input)).unwrap();
    assert_eq!(new_a.connections(), [int_out]);
    assert_eq!(new_a.default_value(), &Variant::Int(9));
    assert!(core.find_pin("c", None).is_some_and(|c| !c.has_any_connections()));

    assert!(orchestration.pin(int_out).is_some_and(|p| p.is_linked_to(new_a.pin_ref())));
    assert!(orchestration.pin(bool_out).is_some_and(|p| !p.has_any_connections()));
    assert!(orchestration.pin(a).is_none());
    assert_links_consistent(&orchestration);
}
