use super::*;
use crate::{
    bridge::{AuthorityLink, EventHub, SessionInbox},
    store::ModelSnapshot,
};
use shared::protocol::ModelCommand;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tokio::sync::{mpsc, watch, Mutex};

/// Waits for the test to feed each answer.
struct ChannelPrompt {
    answers: Mutex<mpsc::UnboundedReceiver<bool>>,
    asked: AtomicUsize,
    last_options: Mutex<Option<(String, PromptOptions)>>,
}

#[async_trait]
impl Prompt for ChannelPrompt {
    async fn ask(&self, message: &str, options: &PromptOptions) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().await = Some((message.to_string(), options.clone()));
        self.answers.lock().await.recv().await.unwrap_or(false)
    }
}

struct Harness {
    gate: Arc<ConfirmationGate>,
    prompt: Arc<ChannelPrompt>,
    answers: mpsc::UnboundedSender<bool>,
    link: AuthorityLink,
    inbox: SessionInbox,
    _snapshots: watch::Sender<ModelSnapshot>,
}

fn harness() -> Harness {
    let (hub, inbox, link) = EventHub::new(16);
    let (snapshots, snapshot_rx) = watch::channel(ModelSnapshot::default());
    let dispatcher = Arc::new(CommandDispatcher::new(Arc::new(hub), snapshot_rx));
    let (answers, answer_rx) = mpsc::unbounded_channel();
    let prompt = Arc::new(ChannelPrompt {
        answers: Mutex::new(answer_rx),
        asked: AtomicUsize::new(0),
        last_options: Mutex::new(None),
    });
    let gate = Arc::new(ConfirmationGate::new(
        prompt.clone(),
        dispatcher,
        &PromptSettings::default(),
    ));
    Harness {
        gate,
        prompt,
        answers,
        link,
        inbox,
        _snapshots: snapshots,
    }
}

fn remove_a() -> DestructiveAction {
    DestructiveAction::RemoveVariable { id: "A".into() }
}

async fn wait_until_awaiting(gate: &ConfirmationGate, action: &DestructiveAction) {
    for _ in 0..100 {
        if gate.state(action) == GateState::AwaitingUser {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("prompt never opened for {action:?}");
}

#[tokio::test]
async fn accepted_prompt_dispatches_exactly_one_command() {
    let mut h = harness();
    h.answers.send(true).expect("answer");

    let outcome = h.gate.confirm(remove_a()).await.expect("confirm");

    assert_eq!(outcome, GateOutcome::Dispatched);
    assert_eq!(
        h.link.try_recv_command(),
        Some(ModelCommand::RemoveVariable { id: "A".into() })
    );
    assert_eq!(h.link.try_recv_command(), None);
    assert_eq!(h.gate.state(&remove_a()), GateState::Idle);
}

#[tokio::test]
async fn declined_prompt_emits_nothing() {
    let mut h = harness();
    h.answers.send(false).expect("answer");

    let outcome = h.gate.confirm(remove_a()).await.expect("confirm");

    assert_eq!(outcome, GateOutcome::Cancelled);
    assert_eq!(h.link.try_recv_command(), None);
    assert_eq!(h.gate.state(&remove_a()), GateState::Idle);
}

#[tokio::test]
async fn prompt_uses_configured_texts() {
    let h = harness();
    h.answers.send(false).expect("answer");

    h.gate.confirm(remove_a()).await.expect("confirm");

    let (message, options) = h
        .prompt
        .last_options
        .lock()
        .await
        .clone()
        .expect("prompt was shown");
    assert_eq!(message, "Are you sure?");
    assert_eq!(options.kind, "warning");
    assert_eq!(options.ok_label, "Delete");
    assert_eq!(options.cancel_label, "Keep");
    assert_eq!(options.title, "Delete");
}

#[tokio::test]
async fn second_request_for_same_target_is_refused_while_open() {
    let mut h = harness();
    let gate = h.gate.clone();
    let first = tokio::spawn(async move { gate.confirm(remove_a()).await });
    wait_until_awaiting(&h.gate, &remove_a()).await;

    let second = h.gate.confirm(remove_a()).await.expect("second");
    assert_eq!(second, GateOutcome::AlreadyPending);
    assert_eq!(h.prompt.asked.load(Ordering::SeqCst), 1);

    h.answers.send(true).expect("answer");
    let first = first.await.expect("join").expect("confirm");
    assert_eq!(first, GateOutcome::Dispatched);
    assert_eq!(
        h.link.try_recv_command(),
        Some(ModelCommand::RemoveVariable { id: "A".into() })
    );
    assert_eq!(h.link.try_recv_command(), None);
}

#[tokio::test]
async fn prompts_for_different_targets_may_overlap() {
    let mut h = harness();
    let regulation = DestructiveAction::RemoveRegulation {
        source: "A".into(),
        target: "B".into(),
    };

    let gate = h.gate.clone();
    let first = tokio::spawn(async move { gate.confirm(remove_a()).await });
    wait_until_awaiting(&h.gate, &remove_a()).await;

    let gate = h.gate.clone();
    let pending_regulation = regulation.clone();
    let second = tokio::spawn(async move { gate.confirm(pending_regulation).await });
    wait_until_awaiting(&h.gate, &regulation).await;
    assert_eq!(h.prompt.asked.load(Ordering::SeqCst), 2);

    h.answers.send(false).expect("answer");
    h.answers.send(true).expect("answer");
    let outcomes = [
        first.await.expect("join").expect("confirm"),
        second.await.expect("join").expect("confirm"),
    ];

    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == GateOutcome::Dispatched)
            .count(),
        1
    );
    assert!(h.link.try_recv_command().is_some());
    assert_eq!(h.link.try_recv_command(), None);
}

#[tokio::test]
async fn local_destructive_actions_loop_back_instead_of_reaching_the_authority() {
    let mut h = harness();
    h.answers.send(true).expect("answer");

    let outcome = h
        .gate
        .confirm(DestructiveAction::RemoveFunction { id: "func0".into() })
        .await
        .expect("confirm");

    assert_eq!(outcome, GateOutcome::Dispatched);
    assert_eq!(h.link.try_recv_command(), None);
    assert_eq!(
        h.inbox.local.try_recv().expect("local edit"),
        crate::bridge::LocalEdit::RemoveFunction { id: "func0".into() }
    );
}

#[tokio::test]
async fn abandoned_prompt_releases_its_target() {
    let mut h = harness();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(50), h.gate.confirm(remove_a())).await;
    assert!(abandoned.is_err());
    assert_eq!(h.gate.state(&remove_a()), GateState::Idle);

    h.answers.send(true).expect("answer");
    let outcome = h.gate.confirm(remove_a()).await.expect("confirm");

    assert_eq!(outcome, GateOutcome::Dispatched);
    assert_eq!(
        h.link.try_recv_command(),
        Some(ModelCommand::RemoveVariable { id: "A".into() })
    );
}

#[tokio::test]
async fn aborted_prompt_task_releases_its_target() {
    let h = harness();
    let gate = h.gate.clone();
    let task = tokio::spawn(async move { gate.confirm(remove_a()).await });
    wait_until_awaiting(&h.gate, &remove_a()).await;

    task.abort();
    assert!(task.await.expect_err("aborted").is_cancelled());

    assert_eq!(h.gate.state(&remove_a()), GateState::Idle);
}
