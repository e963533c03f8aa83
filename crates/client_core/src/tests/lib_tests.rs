use super::*;
use shared::{
    domain::Monotonicity,
    protocol::{LayoutNodeData, ModelCommand, RegulationData, VariableData},
};
use std::time::Duration;

fn quiet_settings() -> ClientSettings {
    ClientSettings {
        bootstrap_refresh: false,
        ..ClientSettings::default()
    }
}

async fn next_command(link: &mut AuthorityLink) -> ModelCommand {
    tokio::time::timeout(Duration::from_secs(1), link.recv_command())
        .await
        .expect("command within timeout")
        .expect("bridge open")
}

#[tokio::test]
async fn start_issues_bootstrap_refreshes() {
    let (client, mut link) =
        ModelClient::start(&ClientSettings::default(), Arc::new(FixedAnswer(true)))
            .expect("start");

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(next_command(&mut link).await);
    }
    assert_eq!(
        seen,
        vec![
            ModelCommand::RefreshVariables,
            ModelCommand::RefreshLayoutNodes {
                layout: client.layout().clone()
            },
            ModelCommand::RefreshRegulations,
            ModelCommand::RefreshDynamicProps,
            ModelCommand::RefreshStaticProps,
        ]
    );
}

#[tokio::test]
async fn variable_appears_only_after_confirmation() {
    let (client, mut link) =
        ModelClient::start(&quiet_settings(), Arc::new(FixedAnswer(true))).expect("start");

    client
        .dispatcher()
        .add_variable("A", "GeneA", client.layout().clone(), 0.0, 0.0)
        .expect("dispatch");
    let command = next_command(&mut link).await;
    assert!(matches!(command, ModelCommand::AddVariable { .. }));
    assert!(client.snapshot().variables().is_empty());

    link.publish(ModelEvent::VariableCreated(VariableData {
        id: "A".into(),
        name: "GeneA".into(),
    }));
    let snapshot = client
        .wait_until(|s| !s.variables().is_empty())
        .await
        .expect("snapshot");

    assert_eq!(
        snapshot.variables(),
        &[shared::domain::Variable::new("A", "GeneA")]
    );
    assert_eq!(snapshot.variables()[0].function, "");
}

#[tokio::test]
async fn regulations_sort_by_concatenated_id() {
    let (client, mut link) =
        ModelClient::start(&quiet_settings(), Arc::new(FixedAnswer(true))).expect("start");
    for id in ["A", "B"] {
        link.publish(ModelEvent::VariableCreated(VariableData {
            id: id.into(),
            name: format!("Gene{id}"),
        }));
    }
    client
        .wait_until(|s| s.variables().len() == 2)
        .await
        .expect("variables");
    let dispatcher = client.dispatcher();
    dispatcher
        .add_regulation("A", "B", Monotonicity::Activation, true)
        .expect("first");
    dispatcher
        .add_regulation("B", "A", Monotonicity::Inhibition, false)
        .expect("second");

    // Confirm in reverse order.
    let first = next_command(&mut link).await;
    let second = next_command(&mut link).await;
    for command in [second, first] {
        if let ModelCommand::AddRegulation {
            regulator,
            target,
            sign,
            observable,
        } = command
        {
            link.publish(ModelEvent::RegulationCreated(RegulationData {
                regulator,
                target,
                sign,
                observable,
            }));
        }
    }

    let snapshot = client
        .wait_until(|s| s.regulations().len() == 2)
        .await
        .expect("snapshot");
    let ids: Vec<_> = snapshot
        .regulations()
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["AB", "BA"]);
    assert_eq!(snapshot.regulations()[0].monotonicity, Monotonicity::Activation);
    assert!(snapshot.regulations()[0].observable);
    assert_eq!(snapshot.regulations()[1].monotonicity, Monotonicity::Inhibition);
    assert!(!snapshot.regulations()[1].observable);
}

#[tokio::test]
async fn declined_removal_changes_nothing() {
    let (client, mut link) =
        ModelClient::start(&quiet_settings(), Arc::new(FixedAnswer(false))).expect("start");
    link.publish(ModelEvent::VariableCreated(VariableData {
        id: "A".into(),
        name: "GeneA".into(),
    }));
    let before = client
        .wait_until(|s| s.has_variable(&"A".into()))
        .await
        .expect("snapshot");

    let outcome = client.remove_variable("A").await.expect("gate");

    assert_eq!(outcome, GateOutcome::Cancelled);
    assert_eq!(link.try_recv_command(), None);
    assert_eq!(client.snapshot(), before);
}

#[tokio::test]
async fn accepted_removal_cascades_on_confirmation() {
    let (client, mut link) =
        ModelClient::start(&quiet_settings(), Arc::new(FixedAnswer(true))).expect("start");
    for id in ["A", "B"] {
        link.publish(ModelEvent::VariableCreated(VariableData {
            id: id.into(),
            name: format!("Gene{id}"),
        }));
        link.publish(ModelEvent::NodePositionChanged(LayoutNodeData {
            layout: client.layout().clone(),
            variable: id.into(),
            px: 1.0,
            py: 1.0,
        }));
    }
    link.publish(ModelEvent::RegulationCreated(RegulationData {
        regulator: "A".into(),
        target: "B".into(),
        sign: "Activation".into(),
        observable: "True".into(),
    }));
    client
        .wait_until(|s| s.regulations().len() == 1 && s.layout().len() == 2)
        .await
        .expect("seeded");

    let outcome = client.remove_variable("A").await.expect("gate");
    assert_eq!(outcome, GateOutcome::Dispatched);
    assert_eq!(
        next_command(&mut link).await,
        ModelCommand::RemoveVariable { id: "A".into() }
    );

    link.publish(ModelEvent::VariableRemoved { id: "A".into() });
    let snapshot = client
        .wait_until(|s| !s.has_variable(&"A".into()))
        .await
        .expect("snapshot");
    assert!(snapshot.regulations().is_empty());
    assert!(snapshot.position(&"A".into()).is_none());
    assert!(snapshot.position(&"B".into()).is_some());
}

#[tokio::test]
async fn local_function_edits_round_trip_through_the_session() {
    let (client, mut link) =
        ModelClient::start(&quiet_settings(), Arc::new(FixedAnswer(true))).expect("start");
    link.publish(ModelEvent::VariableCreated(VariableData {
        id: "A".into(),
        name: "GeneA".into(),
    }));

    let function = client.dispatcher().add_function().expect("add");
    client
        .dispatcher()
        .add_function_input(function.clone(), "A")
        .expect("input");
    let snapshot = client
        .wait_until(|s| {
            s.functions()
                .first()
                .is_some_and(|f| f.variables.len() == 1)
        })
        .await
        .expect("snapshot");
    assert_eq!(snapshot.functions()[0].id, function);

    let outcome = client
        .remove_function_input(function.clone(), 0)
        .await
        .expect("gate");
    assert_eq!(outcome, GateOutcome::Dispatched);
    client
        .wait_until(|s| s.functions()[0].variables.is_empty())
        .await
        .expect("input removed");

    client.remove_function(function).await.expect("gate");
    client
        .wait_until(|s| s.functions().is_empty())
        .await
        .expect("function removed");
    assert_eq!(link.try_recv_command(), None);
}

#[tokio::test]
async fn shutdown_stops_publishing_snapshots() {
    let (client, _link) =
        ModelClient::start(&quiet_settings(), Arc::new(FixedAnswer(true))).expect("start");
    let mut snapshots = client.subscribe();
    client.shutdown();

    // Aborting the task drops the only sender.
    assert!(snapshots.changed().await.is_err());
}
