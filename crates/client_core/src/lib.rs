//! Client-side synchronization engine for a gene-regulatory-network editor.
//!
//! Every mutation is requested through the [`CommandDispatcher`] (destructive
//! ones through the [`ConfirmationGate`] first) and becomes visible only once
//! the matching confirmation has been folded into a new [`ModelSnapshot`].

use std::sync::Arc;

use shared::{
    domain::{FunctionId, LayoutId, PropertyId, VariableId},
    protocol::ModelEvent,
};
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::info;

pub mod bridge;
pub mod config;
pub mod dispatcher;
pub mod gate;
pub mod reconciler;
pub mod session;
pub mod store;

pub use bridge::{AuthorityLink, BridgeError, CommandSink, EventHub, LocalEdit, SessionInbox};
pub use config::{load_settings, load_settings_from, ClientSettings, PromptSettings};
pub use dispatcher::{CommandDispatcher, DispatchError};
pub use gate::{
    ConfirmationGate, DestructiveAction, FixedAnswer, GateOutcome, GateState, Prompt,
    PromptOptions,
};
pub use session::{ModelSession, SessionStep};
pub use store::{IdCounters, Layout, ModelOverrides, ModelSnapshot, DEFAULT_LAYOUT};

/// A running client: the session loop plus handles to request changes and
/// observe snapshots.
pub struct ModelClient {
    hub: EventHub,
    dispatcher: Arc<CommandDispatcher>,
    gate: ConfirmationGate,
    snapshots: watch::Receiver<ModelSnapshot>,
    layout: LayoutId,
    session_task: JoinHandle<()>,
}

impl ModelClient {
    /// Spawns the session on the current runtime and returns the client with
    /// the authority side of its bridge.
    pub fn start(
        settings: &ClientSettings,
        prompt: Arc<dyn Prompt>,
    ) -> Result<(Self, AuthorityLink), DispatchError> {
        let (hub, inbox, link) = EventHub::new(settings.event_buffer);
        let initial = ModelSnapshot::for_layout(settings.layout_id.clone());
        let (snapshot_tx, snapshots) = watch::channel(initial);

        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::new(hub.clone()),
            snapshots.clone(),
        ));
        let gate = ConfirmationGate::new(prompt, dispatcher.clone(), &settings.prompt);
        let session = ModelSession::new(snapshot_tx, inbox, dispatcher.clone());
        let session_task = tokio::spawn(session.run());

        let client = Self {
            hub,
            dispatcher,
            gate,
            snapshots,
            layout: settings.layout_id.clone(),
            session_task,
        };
        if settings.bootstrap_refresh {
            client.bootstrap()?;
        }
        info!(layout = %client.layout, "model client started");
        Ok((client, link))
    }

    /// Requests every collection from the authority.
    pub fn bootstrap(&self) -> Result<(), DispatchError> {
        self.dispatcher.refresh_all(self.layout.clone())
    }

    pub fn layout(&self) -> &LayoutId {
        &self.layout
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ModelSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ModelEvent> {
        self.hub.subscribe_events()
    }

    /// Non-destructive intents.
    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }

    /// Resolves with the first published snapshot satisfying `ready`.
    pub async fn wait_until(
        &self,
        ready: impl FnMut(&ModelSnapshot) -> bool,
    ) -> Result<ModelSnapshot, BridgeError> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(ready)
            .await
            .map_err(|_| BridgeError::SessionStopped)?;
        Ok(snapshot.clone())
    }

    pub async fn remove_variable(
        &self,
        id: impl Into<VariableId>,
    ) -> Result<GateOutcome, DispatchError> {
        self.gate
            .confirm(DestructiveAction::RemoveVariable { id: id.into() })
            .await
    }

    pub async fn remove_regulation(
        &self,
        source: impl Into<VariableId>,
        target: impl Into<VariableId>,
    ) -> Result<GateOutcome, DispatchError> {
        self.gate
            .confirm(DestructiveAction::RemoveRegulation {
                source: source.into(),
                target: target.into(),
            })
            .await
    }

    pub async fn remove_dynamic(
        &self,
        id: impl Into<PropertyId>,
    ) -> Result<GateOutcome, DispatchError> {
        self.gate
            .confirm(DestructiveAction::RemoveDynamic { id: id.into() })
            .await
    }

    pub async fn remove_static(
        &self,
        id: impl Into<PropertyId>,
    ) -> Result<GateOutcome, DispatchError> {
        self.gate
            .confirm(DestructiveAction::RemoveStatic { id: id.into() })
            .await
    }

    pub async fn remove_function(
        &self,
        id: impl Into<FunctionId>,
    ) -> Result<GateOutcome, DispatchError> {
        self.gate
            .confirm(DestructiveAction::RemoveFunction { id: id.into() })
            .await
    }

    pub async fn remove_function_input(
        &self,
        function: impl Into<FunctionId>,
        slot: usize,
    ) -> Result<GateOutcome, DispatchError> {
        self.gate
            .confirm(DestructiveAction::RemoveFunctionInput {
                function: function.into(),
                slot,
            })
            .await
    }

    pub fn shutdown(self) {
        self.session_task.abort();
    }
}

impl Drop for ModelClient {
    fn drop(&mut self) {
        self.session_task.abort();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
