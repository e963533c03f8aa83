//! The single writer of the published snapshot.
//!
//! Inbound events and local edits are folded one at a time on this loop, so
//! every transition is atomic from an observer's point of view.

use std::sync::Arc;

use shared::{domain::LayoutId, protocol::ModelEvent};
use tokio::sync::{broadcast::error::RecvError, watch};
use tracing::{debug, info, warn};

use crate::{
    bridge::{LocalEdit, SessionInbox},
    dispatcher::CommandDispatcher,
    reconciler,
    store::ModelSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Event,
    Local,
    /// The inbound stream dropped events; every collection was re-requested.
    Resynced { skipped: u64 },
    Closed,
}

pub struct ModelSession {
    snapshots: watch::Sender<ModelSnapshot>,
    inbox: SessionInbox,
    dispatcher: Arc<CommandDispatcher>,
    layout: LayoutId,
}

impl ModelSession {
    pub fn new(
        snapshots: watch::Sender<ModelSnapshot>,
        inbox: SessionInbox,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Self {
        let layout = snapshots.borrow().layout_id().clone();
        Self {
            snapshots,
            inbox,
            dispatcher,
            layout,
        }
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn apply_event(&self, event: &ModelEvent) {
        let current = self.snapshot();
        let next = reconciler::reconcile(&current, event);
        debug!(
            event = event.name(),
            refresh = event.is_refresh(),
            "reconciled model event"
        );
        self.snapshots.send_replace(next);
    }

    pub fn apply_local(&self, edit: &LocalEdit) {
        let current = self.snapshot();
        let next = reconciler::apply_local(&current, edit);
        debug!(edit = edit.name(), "applied local edit");
        self.snapshots.send_replace(next);
    }

    /// Waits for the next inbound item and folds it in.
    pub async fn step(&mut self) -> SessionStep {
        tokio::select! {
            received = self.inbox.events.recv() => match received {
                Ok(event) => {
                    self.apply_event(&event);
                    SessionStep::Event
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged; requesting full refresh");
                    if let Err(err) = self.dispatcher.refresh_all(self.layout.clone()) {
                        warn!(error = %err, "failed to request refresh after lag");
                    }
                    SessionStep::Resynced { skipped }
                }
                Err(RecvError::Closed) => SessionStep::Closed,
            },
            edit = self.inbox.local.recv() => match edit {
                Some(edit) => {
                    self.apply_local(&edit);
                    SessionStep::Local
                }
                None => SessionStep::Closed,
            },
        }
    }

    pub async fn run(mut self) {
        info!(layout = %self.layout, "model session started");
        while self.step().await != SessionStep::Closed {}
        info!("model session stopped");
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
