use super::*;
use crate::bridge::{AuthorityLink, EventHub};
use shared::protocol::{LayoutNodeData, ModelCommand, VariableData};

fn session(capacity: usize) -> (ModelSession, AuthorityLink, Arc<CommandDispatcher>) {
    let (hub, inbox, link) = EventHub::new(capacity);
    let (tx, rx) = watch::channel(ModelSnapshot::default());
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::new(hub), rx));
    (
        ModelSession::new(tx, inbox, dispatcher.clone()),
        link,
        dispatcher,
    )
}

fn created(id: &str, name: &str) -> ModelEvent {
    ModelEvent::VariableCreated(VariableData {
        id: id.into(),
        name: name.into(),
    })
}

#[tokio::test]
async fn events_are_folded_in_arrival_order() {
    let (mut session, link, _dispatcher) = session(16);
    assert!(link.publish(created("B", "GeneB")));
    assert!(link.publish(created("A", "GeneA")));
    assert!(link.publish(ModelEvent::NodePositionChanged(LayoutNodeData {
        layout: "default".into(),
        variable: "A".into(),
        px: 1.0,
        py: 2.0,
    })));

    for _ in 0..3 {
        assert_eq!(session.step().await, SessionStep::Event);
    }

    let snapshot = session.snapshot();
    let ids: Vec<_> = snapshot
        .variables()
        .iter()
        .map(|v| v.id.as_str().to_string())
        .collect();
    assert_eq!(ids, vec!["A", "B"]);
    assert!(snapshot.position(&"A".into()).is_some());
}

#[tokio::test]
async fn local_edits_flow_through_the_same_loop() {
    let (mut session, link, dispatcher) = session(16);
    link.publish(created("A", "GeneA"));
    assert_eq!(session.step().await, SessionStep::Event);

    dispatcher
        .set_variable_function("A", "!A")
        .expect("local edit");
    assert_eq!(session.step().await, SessionStep::Local);

    let snapshot = session.snapshot();
    assert_eq!(
        snapshot.variable(&"A".into()).map(|v| v.function.as_str()),
        Some("!A")
    );
}

#[tokio::test]
async fn observers_see_each_published_snapshot() {
    let (hub, inbox, link) = EventHub::new(16);
    let (tx, mut rx) = watch::channel(ModelSnapshot::default());
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::new(hub), tx.subscribe()));
    let mut session = ModelSession::new(tx, inbox, dispatcher);

    link.publish(created("A", "GeneA"));
    session.step().await;

    assert!(rx.has_changed().expect("sender alive"));
    assert_eq!(rx.borrow_and_update().variables().len(), 1);
}

#[tokio::test]
async fn lagging_behind_requests_a_full_refresh() {
    let (mut session, mut link, _dispatcher) = session(2);
    for index in 0..5 {
        link.publish(created(&format!("V{index}"), "gene"));
    }

    let step = session.step().await;
    assert!(matches!(step, SessionStep::Resynced { skipped } if skipped > 0));

    let mut requested = Vec::new();
    while let Some(command) = link.try_recv_command() {
        requested.push(command);
    }
    assert_eq!(
        requested,
        vec![
            ModelCommand::RefreshVariables,
            ModelCommand::RefreshLayoutNodes {
                layout: "default".into()
            },
            ModelCommand::RefreshRegulations,
            ModelCommand::RefreshDynamicProps,
            ModelCommand::RefreshStaticProps,
        ]
    );

    // The retained tail is still delivered after the resync request.
    assert_eq!(session.step().await, SessionStep::Event);
}

#[tokio::test]
async fn unknown_targets_leave_the_snapshot_unchanged() {
    let (session, _link, _dispatcher) = session(16);
    let before = session.snapshot();

    session.apply_event(&ModelEvent::VariableRemoved { id: "ghost".into() });

    assert_eq!(session.snapshot(), before);
}
