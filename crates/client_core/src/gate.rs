//! Yes/no confirmation in front of destructive actions.
//!
//! Each invocation walks `Idle -> AwaitingUser -> Idle`, dispatching on the way
//! out only when the user accepted. Prompts for different targets may overlap;
//! a second request for a target whose prompt is still open is refused.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use shared::domain::{FunctionId, PropertyId, VariableId};
use tracing::{debug, info};

use crate::{
    config::PromptSettings,
    dispatcher::{CommandDispatcher, DispatchError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    pub kind: String,
    pub ok_label: String,
    pub cancel_label: String,
    pub title: String,
}

impl From<&PromptSettings> for PromptOptions {
    fn from(settings: &PromptSettings) -> Self {
        Self {
            kind: settings.kind.clone(),
            ok_label: settings.ok_label.clone(),
            cancel_label: settings.cancel_label.clone(),
            title: settings.title.clone(),
        }
    }
}

/// The surface that actually asks the user.
#[async_trait]
pub trait Prompt: Send + Sync {
    async fn ask(&self, message: &str, options: &PromptOptions) -> bool;
}

/// Answers every prompt the same way. Handy for headless runs.
pub struct FixedAnswer(pub bool);

#[async_trait]
impl Prompt for FixedAnswer {
    async fn ask(&self, _message: &str, _options: &PromptOptions) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DestructiveAction {
    RemoveVariable { id: VariableId },
    RemoveRegulation { source: VariableId, target: VariableId },
    RemoveDynamic { id: PropertyId },
    RemoveStatic { id: PropertyId },
    RemoveFunction { id: FunctionId },
    RemoveFunctionInput { function: FunctionId, slot: usize },
}

impl DestructiveAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RemoveVariable { .. } => "remove_variable",
            Self::RemoveRegulation { .. } => "remove_regulation",
            Self::RemoveDynamic { .. } => "remove_dynamic",
            Self::RemoveStatic { .. } => "remove_static",
            Self::RemoveFunction { .. } => "remove_function",
            Self::RemoveFunctionInput { .. } => "remove_function_input",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    AwaitingUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Dispatched,
    Cancelled,
    AlreadyPending,
}

pub struct ConfirmationGate {
    prompt: Arc<dyn Prompt>,
    dispatcher: Arc<CommandDispatcher>,
    message: String,
    options: PromptOptions,
    pending: Mutex<HashSet<DestructiveAction>>,
}

impl ConfirmationGate {
    pub fn new(
        prompt: Arc<dyn Prompt>,
        dispatcher: Arc<CommandDispatcher>,
        settings: &PromptSettings,
    ) -> Self {
        Self {
            prompt,
            dispatcher,
            message: settings.message.clone(),
            options: PromptOptions::from(settings),
            pending: Mutex::new(HashSet::new()),
        }
    }

    pub fn state(&self, action: &DestructiveAction) -> GateState {
        if self.pending().contains(action) {
            GateState::AwaitingUser
        } else {
            GateState::Idle
        }
    }

    pub async fn confirm(&self, action: DestructiveAction) -> Result<GateOutcome, DispatchError> {
        let Some(slot) = self.claim(&action) else {
            debug!(action = action.name(), "prompt already open for this target");
            return Ok(GateOutcome::AlreadyPending);
        };

        let accepted = self.prompt.ask(&self.message, &self.options).await;
        drop(slot);

        if !accepted {
            info!(action = action.name(), "destructive action declined");
            return Ok(GateOutcome::Cancelled);
        }

        self.dispatcher.dispatch_destructive(&action)?;
        Ok(GateOutcome::Dispatched)
    }

    fn pending(&self) -> MutexGuard<'_, HashSet<DestructiveAction>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn claim(&self, action: &DestructiveAction) -> Option<PendingSlot<'_>> {
        self.pending().insert(action.clone()).then(|| PendingSlot {
            gate: self,
            action: action.clone(),
        })
    }
}

/// Holds a target's in-flight marker; released even if `confirm` is dropped
/// while the prompt is open.
struct PendingSlot<'a> {
    gate: &'a ConfirmationGate,
    action: DestructiveAction,
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        self.gate.pending().remove(&self.action);
    }
}

#[cfg(test)]
#[path = "tests/gate_tests.rs"]
mod tests;
