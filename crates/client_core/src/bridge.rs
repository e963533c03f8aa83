//! Named-event channel between the client and the authoritative process.
//!
//! Outbound commands are fire-and-forget; inbound confirmations and refreshes
//! are fanned out over a broadcast channel. Client-local edits (function
//! definitions and the like) travel over a loop back to the session so that the
//! reconciler stays the only place a snapshot is derived.

use shared::{
    domain::{FunctionId, ObservationSet, VariableId},
    protocol::{ModelCommand, ModelEvent},
};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("outbound command channel closed; `{command}` was not delivered")]
    CommandChannelClosed { command: &'static str },
    #[error("local edit channel closed; session is no longer running")]
    LocalChannelClosed,
    #[error("model session stopped")]
    SessionStopped,
}

/// Edits to client-local entities. They have no backend counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalEdit {
    SetVariableFunction {
        id: VariableId,
        function: String,
    },
    AddFunction {
        id: FunctionId,
    },
    RemoveFunction {
        id: FunctionId,
    },
    RenameFunction {
        original_id: FunctionId,
        new_id: FunctionId,
    },
    SetFunctionExpression {
        id: FunctionId,
        function: String,
    },
    AddFunctionInput {
        function: FunctionId,
        variable: VariableId,
    },
    ToggleInputMonotonicity {
        function: FunctionId,
        slot: usize,
    },
    ToggleInputEssentiality {
        function: FunctionId,
        slot: usize,
    },
    RemoveFunctionInput {
        function: FunctionId,
        slot: usize,
    },
    ReplaceObservations {
        sets: Vec<ObservationSet>,
    },
}

impl LocalEdit {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetVariableFunction { .. } => "set_variable_function",
            Self::AddFunction { .. } => "add_function",
            Self::RemoveFunction { .. } => "remove_function",
            Self::RenameFunction { .. } => "rename_function",
            Self::SetFunctionExpression { .. } => "set_function_expression",
            Self::AddFunctionInput { .. } => "add_function_input",
            Self::ToggleInputMonotonicity { .. } => "toggle_input_monotonicity",
            Self::ToggleInputEssentiality { .. } => "toggle_input_essentiality",
            Self::RemoveFunctionInput { .. } => "remove_function_input",
            Self::ReplaceObservations { .. } => "replace_observations",
        }
    }
}

/// Where the dispatcher sends intents. Emission never suspends the caller.
pub trait CommandSink: Send + Sync {
    fn emit(&self, command: ModelCommand) -> Result<(), BridgeError>;
    fn emit_local(&self, edit: LocalEdit) -> Result<(), BridgeError>;
}

/// Client half of the bridge. Cheap to clone; every clone feeds the same channels.
#[derive(Clone)]
pub struct EventHub {
    commands: mpsc::UnboundedSender<ModelCommand>,
    local: mpsc::UnboundedSender<LocalEdit>,
    events: broadcast::Sender<ModelEvent>,
}

/// Receiving ends consumed by the single-writer session.
pub struct SessionInbox {
    pub events: broadcast::Receiver<ModelEvent>,
    pub local: mpsc::UnboundedReceiver<LocalEdit>,
}

/// The authoritative side of the bridge, or a test double standing in for it.
pub struct AuthorityLink {
    commands: mpsc::UnboundedReceiver<ModelCommand>,
    events: broadcast::Sender<ModelEvent>,
}

impl EventHub {
    /// Builds a connected hub. `capacity` bounds how many inbound events may be
    /// buffered before a slow session starts lagging.
    pub fn new(capacity: usize) -> (Self, SessionInbox, AuthorityLink) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (local_tx, local_rx) = mpsc::unbounded_channel();
        let (events, session_events) = broadcast::channel(capacity.max(1));

        let hub = Self {
            commands: command_tx,
            local: local_tx,
            events: events.clone(),
        };
        let inbox = SessionInbox {
            events: session_events,
            local: local_rx,
        };
        let link = AuthorityLink {
            commands: command_rx,
            events,
        };
        (hub, inbox, link)
    }

    /// Additional observer of inbound events, e.g. for a render layer.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ModelEvent> {
        self.events.subscribe()
    }
}

impl CommandSink for EventHub {
    fn emit(&self, command: ModelCommand) -> Result<(), BridgeError> {
        let name = command.name();
        let destructive = command.is_destructive();
        self.commands
            .send(command)
            .map_err(|_| BridgeError::CommandChannelClosed { command: name })?;
        debug!(command = name, destructive, "emitted model command");
        Ok(())
    }

    fn emit_local(&self, edit: LocalEdit) -> Result<(), BridgeError> {
        let name = edit.name();
        self.local
            .send(edit)
            .map_err(|_| BridgeError::LocalChannelClosed)?;
        debug!(edit = name, "queued local edit");
        Ok(())
    }
}

impl AuthorityLink {
    pub async fn recv_command(&mut self) -> Option<ModelCommand> {
        self.commands.recv().await
    }

    pub fn try_recv_command(&mut self) -> Option<ModelCommand> {
        self.commands.try_recv().ok()
    }

    /// Publishes an inbound event. Returns `false` when nobody is listening.
    pub fn publish(&self, event: ModelEvent) -> bool {
        let name = event.name();
        match self.events.send(event) {
            Ok(receivers) => {
                debug!(event = name, receivers, "published model event");
                true
            }
            Err(_) => false,
        }
    }

    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedReceiver<ModelCommand>,
        broadcast::Sender<ModelEvent>,
    ) {
        (self.commands, self.events)
    }
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
