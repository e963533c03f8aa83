use super::*;
use crate::store::{IdCounters, ModelOverrides};
use std::sync::Mutex;

#[derive(Default)]
struct RecordingSink {
    commands: Mutex<Vec<ModelCommand>>,
    local: Mutex<Vec<LocalEdit>>,
    closed: bool,
}

impl CommandSink for RecordingSink {
    fn emit(&self, command: ModelCommand) -> Result<(), BridgeError> {
        if self.closed {
            return Err(BridgeError::CommandChannelClosed {
                command: command.name(),
            });
        }
        self.commands.lock().expect("lock").push(command);
        Ok(())
    }

    fn emit_local(&self, edit: LocalEdit) -> Result<(), BridgeError> {
        if self.closed {
            return Err(BridgeError::LocalChannelClosed);
        }
        self.local.lock().expect("lock").push(edit);
        Ok(())
    }
}

impl RecordingSink {
    fn commands(&self) -> Vec<ModelCommand> {
        self.commands.lock().expect("lock").clone()
    }

    fn local(&self) -> Vec<LocalEdit> {
        self.local.lock().expect("lock").clone()
    }
}

fn dispatcher_over(
    snapshot: ModelSnapshot,
) -> (
    CommandDispatcher,
    Arc<RecordingSink>,
    watch::Sender<ModelSnapshot>,
) {
    let sink = Arc::new(RecordingSink::default());
    let (tx, rx) = watch::channel(snapshot);
    (CommandDispatcher::new(sink.clone(), rx), sink, tx)
}

fn layout() -> LayoutId {
    LayoutId::new("default")
}

#[test]
fn add_variable_carries_the_initial_position() {
    let (dispatcher, sink, _tx) = dispatcher_over(ModelSnapshot::default());

    dispatcher
        .add_variable("A", "GeneA", layout(), 10.0, -4.5)
        .expect("dispatch");

    assert_eq!(
        sink.commands(),
        vec![ModelCommand::AddVariable {
            id: "A".into(),
            name: "GeneA".into(),
            position: NodePlacement {
                layout: layout(),
                px: 10.0,
                py: -4.5,
            },
        }]
    );
}

#[test]
fn non_finite_positions_are_rejected_before_emitting() {
    let (dispatcher, sink, _tx) = dispatcher_over(ModelSnapshot::default());

    let err = dispatcher
        .add_variable("A", "GeneA", layout(), f64::NAN, 0.0)
        .expect_err("nan");
    assert!(matches!(err, DispatchError::NonFinitePosition { .. }));

    let err = dispatcher
        .change_node_position(layout(), "A", 0.0, f64::INFINITY)
        .expect_err("infinite");
    assert!(matches!(err, DispatchError::NonFinitePosition { .. }));

    assert!(sink.commands().is_empty());
}

#[test]
fn regulation_commands_use_wire_strings() {
    let (dispatcher, sink, _tx) = dispatcher_over(ModelSnapshot::default());

    dispatcher
        .add_regulation("A", "B", Monotonicity::Activation, true)
        .expect("add");
    dispatcher
        .set_regulation_observable("A", "B", false)
        .expect("observable");
    dispatcher
        .set_regulation_sign("A", "B", Monotonicity::Unspecified)
        .expect("sign");

    assert_eq!(
        sink.commands(),
        vec![
            ModelCommand::AddRegulation {
                regulator: "A".into(),
                target: "B".into(),
                sign: "Activation".into(),
                observable: "True".into(),
            },
            ModelCommand::SetRegulationObservable {
                regulator: "A".into(),
                target: "B".into(),
                observable: "False".into(),
            },
            ModelCommand::SetRegulationSign {
                regulator: "A".into(),
                target: "B".into(),
                sign: "Unknown".into(),
            },
        ]
    );
}

#[test]
fn variable_function_text_is_a_local_edit() {
    let (dispatcher, sink, _tx) = dispatcher_over(ModelSnapshot::default());

    dispatcher
        .set_variable_function("A", "B & !C")
        .expect("local");

    assert!(sink.commands().is_empty());
    assert_eq!(
        sink.local(),
        vec![LocalEdit::SetVariableFunction {
            id: "A".into(),
            function: "B & !C".into(),
        }]
    );
}

#[test]
fn property_ids_count_up_per_family() {
    let (dispatcher, sink, _tx) = dispatcher_over(ModelSnapshot::default());

    let first = dispatcher
        .add_default_dynamic(DynamicVariant::FixedPoint)
        .expect("first");
    let second = dispatcher
        .add_default_dynamic(DynamicVariant::AttractorCount)
        .expect("second");
    let other_family = dispatcher
        .add_default_static(StaticVariant::Generic)
        .expect("static");

    assert_eq!(first.as_str(), "dynamic0");
    assert_eq!(second.as_str(), "dynamic1");
    assert_eq!(other_family.as_str(), "static0");
    assert_eq!(
        sink.commands()[1],
        ModelCommand::AddDefaultDynamic {
            id: "dynamic1".into(),
            variant: DynamicVariant::AttractorCount,
        }
    );
}

#[test]
fn property_ids_start_at_the_snapshot_floor_and_skip_taken_ids() {
    let taken = DynamicProperty::default_for("dynamic3".into(), DynamicVariant::Generic);
    let snapshot = ModelSnapshot::create(ModelOverrides {
        dynamic_properties: Some(vec![taken]),
        counters: Some(IdCounters {
            dynamic: 3,
            ..IdCounters::default()
        }),
        ..ModelOverrides::default()
    });
    let (dispatcher, _sink, _tx) = dispatcher_over(snapshot);

    let id = dispatcher
        .add_default_dynamic(DynamicVariant::Generic)
        .expect("dispatch");
    assert_eq!(id.as_str(), "dynamic4");

    let id = dispatcher
        .add_default_dynamic(DynamicVariant::Generic)
        .expect("dispatch");
    assert_eq!(id.as_str(), "dynamic5");
}

#[test]
fn later_snapshots_raise_the_floor() {
    let (dispatcher, _sink, tx) = dispatcher_over(ModelSnapshot::default());
    assert_eq!(
        dispatcher
            .add_default_static(StaticVariant::Generic)
            .expect("dispatch")
            .as_str(),
        "static0"
    );

    tx.send_replace(ModelSnapshot::default().with_counters(IdCounters {
        statics: 7,
        ..IdCounters::default()
    }));

    assert_eq!(
        dispatcher
            .add_default_static(StaticVariant::Generic)
            .expect("dispatch")
            .as_str(),
        "static7"
    );
}

#[test]
fn add_function_generates_func_ids_locally() {
    let (dispatcher, sink, _tx) = dispatcher_over(ModelSnapshot::default());

    let first = dispatcher.add_function().expect("first");
    let second = dispatcher.add_function().expect("second");

    assert_eq!(first.as_str(), "func0");
    assert_eq!(second.as_str(), "func1");
    assert!(sink.commands().is_empty());
    assert_eq!(
        sink.local(),
        vec![
            LocalEdit::AddFunction { id: first },
            LocalEdit::AddFunction { id: second },
        ]
    );
}

#[test]
fn set_content_replaces_by_the_property_id() {
    let (dispatcher, sink, _tx) = dispatcher_over(ModelSnapshot::default());
    let property = StaticProperty::default_for("static2".into(), StaticVariant::Generic);

    dispatcher
        .set_static_content(property.clone())
        .expect("dispatch");

    assert_eq!(
        sink.commands(),
        vec![ModelCommand::SetStaticContent {
            id: "static2".into(),
            property,
        }]
    );
}

#[test]
fn refresh_all_requests_every_collection_in_order() {
    let (dispatcher, sink, _tx) = dispatcher_over(ModelSnapshot::default());

    dispatcher.refresh_all(layout()).expect("refresh");

    assert_eq!(
        sink.commands(),
        vec![
            ModelCommand::RefreshVariables,
            ModelCommand::RefreshLayoutNodes { layout: layout() },
            ModelCommand::RefreshRegulations,
            ModelCommand::RefreshDynamicProps,
            ModelCommand::RefreshStaticProps,
        ]
    );
}

#[test]
fn destructive_actions_route_to_backend_or_local_loop() {
    let (dispatcher, sink, _tx) = dispatcher_over(ModelSnapshot::default());

    dispatcher
        .dispatch_destructive(&DestructiveAction::RemoveRegulation {
            source: "A".into(),
            target: "B".into(),
        })
        .expect("regulation");
    dispatcher
        .dispatch_destructive(&DestructiveAction::RemoveFunctionInput {
            function: "func0".into(),
            slot: 1,
        })
        .expect("input");

    assert_eq!(
        sink.commands(),
        vec![ModelCommand::RemoveRegulation {
            regulator: "A".into(),
            target: "B".into(),
        }]
    );
    assert_eq!(
        sink.local(),
        vec![LocalEdit::RemoveFunctionInput {
            function: "func0".into(),
            slot: 1,
        }]
    );
}

#[test]
fn closed_channel_surfaces_as_bridge_error() {
    let sink = Arc::new(RecordingSink {
        closed: true,
        ..RecordingSink::default()
    });
    let (_tx, rx) = watch::channel(ModelSnapshot::default());
    let dispatcher = CommandDispatcher::new(sink, rx);

    let err = dispatcher.refresh_variables().expect_err("closed");
    assert!(matches!(
        err,
        DispatchError::Bridge(BridgeError::CommandChannelClosed {
            command: "refresh_variables"
        })
    ));
}
