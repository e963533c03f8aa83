//! Translates user intents into outbound commands.
//!
//! The dispatcher validates shape only and never derives a snapshot itself.
//! Destructive intents are reachable only through the confirmation gate.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use shared::{
    domain::{
        observable_to_wire, FunctionId, LayoutId, Monotonicity, ObservationSet, PropertyId,
        VariableId,
    },
    property::{DynamicProperty, DynamicVariant, StaticProperty, StaticVariant},
    protocol::{ModelCommand, NodePlacement},
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    bridge::{BridgeError, CommandSink, LocalEdit},
    gate::DestructiveAction,
    store::ModelSnapshot,
};

const DYNAMIC_PREFIX: &str = "dynamic";
const STATIC_PREFIX: &str = "static";
const FUNCTION_PREFIX: &str = "func";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("node position must be finite, got ({x}, {y})")]
    NonFinitePosition { x: f64, y: f64 },
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub struct CommandDispatcher {
    sink: Arc<dyn CommandSink>,
    snapshots: watch::Receiver<ModelSnapshot>,
    next_dynamic: AtomicUsize,
    next_static: AtomicUsize,
    next_function: AtomicUsize,
}

fn check_position(x: f64, y: f64) -> Result<(), DispatchError> {
    if x.is_finite() && y.is_finite() {
        Ok(())
    } else {
        Err(DispatchError::NonFinitePosition { x, y })
    }
}

fn note_empty(kind: &'static str, id: &str) {
    if id.is_empty() {
        warn!(kind, "forwarding command with an empty id");
    }
}

impl CommandDispatcher {
    pub fn new(sink: Arc<dyn CommandSink>, snapshots: watch::Receiver<ModelSnapshot>) -> Self {
        Self {
            sink,
            snapshots,
            next_dynamic: AtomicUsize::new(0),
            next_static: AtomicUsize::new(0),
            next_function: AtomicUsize::new(0),
        }
    }

    fn emit(&self, command: ModelCommand) -> Result<(), DispatchError> {
        self.sink.emit(command)?;
        Ok(())
    }

    fn emit_local(&self, edit: LocalEdit) -> Result<(), DispatchError> {
        self.sink.emit_local(edit)?;
        Ok(())
    }

    fn current(&self) -> ModelSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn add_variable(
        &self,
        id: impl Into<VariableId>,
        name: impl Into<String>,
        layout: LayoutId,
        x: f64,
        y: f64,
    ) -> Result<(), DispatchError> {
        check_position(x, y)?;
        let id = id.into();
        note_empty("variable", id.as_str());
        self.emit(ModelCommand::AddVariable {
            id,
            name: name.into(),
            position: NodePlacement {
                layout,
                px: x,
                py: y,
            },
        })
    }

    pub fn set_variable_id(
        &self,
        original_id: impl Into<VariableId>,
        new_id: impl Into<VariableId>,
    ) -> Result<(), DispatchError> {
        let new_id = new_id.into();
        note_empty("variable", new_id.as_str());
        self.emit(ModelCommand::SetVariableId {
            original_id: original_id.into(),
            new_id,
        })
    }

    pub fn set_variable_name(
        &self,
        id: impl Into<VariableId>,
        name: impl Into<String>,
    ) -> Result<(), DispatchError> {
        self.emit(ModelCommand::SetVariableName {
            id: id.into(),
            name: name.into(),
        })
    }

    /// The function text has no backend counterpart; it is a local edit.
    pub fn set_variable_function(
        &self,
        id: impl Into<VariableId>,
        function: impl Into<String>,
    ) -> Result<(), DispatchError> {
        self.emit_local(LocalEdit::SetVariableFunction {
            id: id.into(),
            function: function.into(),
        })
    }

    pub fn change_node_position(
        &self,
        layout: LayoutId,
        id: impl Into<VariableId>,
        x: f64,
        y: f64,
    ) -> Result<(), DispatchError> {
        check_position(x, y)?;
        self.emit(ModelCommand::ChangeNodePosition {
            layout,
            variable: id.into(),
            px: x,
            py: y,
        })
    }

    pub fn add_regulation(
        &self,
        source: impl Into<VariableId>,
        target: impl Into<VariableId>,
        monotonicity: Monotonicity,
        observable: bool,
    ) -> Result<(), DispatchError> {
        self.emit(ModelCommand::AddRegulation {
            regulator: source.into(),
            target: target.into(),
            sign: monotonicity.as_wire().to_string(),
            observable: observable_to_wire(observable).to_string(),
        })
    }

    pub fn set_regulation_observable(
        &self,
        source: impl Into<VariableId>,
        target: impl Into<VariableId>,
        observable: bool,
    ) -> Result<(), DispatchError> {
        self.emit(ModelCommand::SetRegulationObservable {
            regulator: source.into(),
            target: target.into(),
            observable: observable_to_wire(observable).to_string(),
        })
    }

    pub fn set_regulation_sign(
        &self,
        source: impl Into<VariableId>,
        target: impl Into<VariableId>,
        monotonicity: Monotonicity,
    ) -> Result<(), DispatchError> {
        self.emit(ModelCommand::SetRegulationSign {
            regulator: source.into(),
            target: target.into(),
            sign: monotonicity.as_wire().to_string(),
        })
    }

    /// Requests a new dynamic property with the variant's default payload and
    /// returns the id it was requested under.
    pub fn add_default_dynamic(
        &self,
        variant: DynamicVariant,
    ) -> Result<PropertyId, DispatchError> {
        let snapshot = self.current();
        let id = next_id(
            &self.next_dynamic,
            snapshot.counters().dynamic,
            DYNAMIC_PREFIX,
            |candidate| {
                snapshot
                    .dynamic_properties()
                    .iter()
                    .any(|p| p.id.as_str() == candidate)
            },
        );
        let id = PropertyId::new(id);
        self.emit(ModelCommand::AddDefaultDynamic {
            id: id.clone(),
            variant,
        })?;
        Ok(id)
    }

    pub fn add_default_static(&self, variant: StaticVariant) -> Result<PropertyId, DispatchError> {
        let snapshot = self.current();
        let id = next_id(
            &self.next_static,
            snapshot.counters().statics,
            STATIC_PREFIX,
            |candidate| {
                snapshot
                    .static_properties()
                    .iter()
                    .any(|p| p.id.as_str() == candidate)
            },
        );
        let id = PropertyId::new(id);
        self.emit(ModelCommand::AddDefaultStatic {
            id: id.clone(),
            variant,
        })?;
        Ok(id)
    }

    pub fn set_dynamic_content(&self, property: DynamicProperty) -> Result<(), DispatchError> {
        self.emit(ModelCommand::SetDynamicContent {
            id: property.id.clone(),
            property,
        })
    }

    pub fn set_static_content(&self, property: StaticProperty) -> Result<(), DispatchError> {
        self.emit(ModelCommand::SetStaticContent {
            id: property.id.clone(),
            property,
        })
    }

    pub fn add_function(&self) -> Result<FunctionId, DispatchError> {
        let snapshot = self.current();
        let id = next_id(
            &self.next_function,
            snapshot.counters().functions,
            FUNCTION_PREFIX,
            |candidate| {
                snapshot
                    .functions()
                    .iter()
                    .any(|f| f.id.as_str() == candidate)
            },
        );
        let id = FunctionId::new(id);
        self.emit_local(LocalEdit::AddFunction { id: id.clone() })?;
        Ok(id)
    }

    pub fn rename_function(
        &self,
        original_id: impl Into<FunctionId>,
        new_id: impl Into<FunctionId>,
    ) -> Result<(), DispatchError> {
        self.emit_local(LocalEdit::RenameFunction {
            original_id: original_id.into(),
            new_id: new_id.into(),
        })
    }

    pub fn set_function_expression(
        &self,
        id: impl Into<FunctionId>,
        function: impl Into<String>,
    ) -> Result<(), DispatchError> {
        self.emit_local(LocalEdit::SetFunctionExpression {
            id: id.into(),
            function: function.into(),
        })
    }

    pub fn add_function_input(
        &self,
        function: impl Into<FunctionId>,
        variable: impl Into<VariableId>,
    ) -> Result<(), DispatchError> {
        self.emit_local(LocalEdit::AddFunctionInput {
            function: function.into(),
            variable: variable.into(),
        })
    }

    pub fn toggle_input_monotonicity(
        &self,
        function: impl Into<FunctionId>,
        slot: usize,
    ) -> Result<(), DispatchError> {
        self.emit_local(LocalEdit::ToggleInputMonotonicity {
            function: function.into(),
            slot,
        })
    }

    pub fn toggle_input_essentiality(
        &self,
        function: impl Into<FunctionId>,
        slot: usize,
    ) -> Result<(), DispatchError> {
        self.emit_local(LocalEdit::ToggleInputEssentiality {
            function: function.into(),
            slot,
        })
    }

    pub fn replace_observations(&self, sets: Vec<ObservationSet>) -> Result<(), DispatchError> {
        self.emit_local(LocalEdit::ReplaceObservations { sets })
    }

    pub fn refresh_variables(&self) -> Result<(), DispatchError> {
        self.emit(ModelCommand::RefreshVariables)
    }

    pub fn refresh_layout_nodes(&self, layout: LayoutId) -> Result<(), DispatchError> {
        self.emit(ModelCommand::RefreshLayoutNodes { layout })
    }

    pub fn refresh_regulations(&self) -> Result<(), DispatchError> {
        self.emit(ModelCommand::RefreshRegulations)
    }

    pub fn refresh_dynamic_props(&self) -> Result<(), DispatchError> {
        self.emit(ModelCommand::RefreshDynamicProps)
    }

    pub fn refresh_static_props(&self) -> Result<(), DispatchError> {
        self.emit(ModelCommand::RefreshStaticProps)
    }

    /// Requests every collection the snapshot mirrors.
    pub fn refresh_all(&self, layout: LayoutId) -> Result<(), DispatchError> {
        self.refresh_variables()?;
        self.refresh_layout_nodes(layout)?;
        self.refresh_regulations()?;
        self.refresh_dynamic_props()?;
        self.refresh_static_props()
    }

    pub(crate) fn dispatch_destructive(
        &self,
        action: &DestructiveAction,
    ) -> Result<(), DispatchError> {
        debug!(action = action.name(), "dispatching confirmed destructive action");
        match action.clone() {
            DestructiveAction::RemoveVariable { id } => {
                self.emit(ModelCommand::RemoveVariable { id })
            }
            DestructiveAction::RemoveRegulation { source, target } => {
                self.emit(ModelCommand::RemoveRegulation {
                    regulator: source,
                    target,
                })
            }
            DestructiveAction::RemoveDynamic { id } => {
                self.emit(ModelCommand::RemoveDynamic { id })
            }
            DestructiveAction::RemoveStatic { id } => self.emit(ModelCommand::RemoveStatic { id }),
            DestructiveAction::RemoveFunction { id } => {
                self.emit_local(LocalEdit::RemoveFunction { id })
            }
            DestructiveAction::RemoveFunctionInput { function, slot } => {
                self.emit_local(LocalEdit::RemoveFunctionInput { function, slot })
            }
        }
    }
}

/// Picks `<prefix><n>` with `n` at or above both the local counter and the
/// snapshot floor, skipping ids already taken, then moves the counter past it.
fn next_id(
    counter: &AtomicUsize,
    floor: usize,
    prefix: &str,
    taken: impl Fn(&str) -> bool,
) -> String {
    let mut index = counter.load(Ordering::Relaxed).max(floor);
    let mut candidate = format!("{prefix}{index}");
    while taken(&candidate) {
        index += 1;
        candidate = format!("{prefix}{index}");
    }
    counter.fetch_max(index + 1, Ordering::Relaxed);
    candidate
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
