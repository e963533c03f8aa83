//! Folds inbound confirmations, refreshes and local edits into new snapshots.
//!
//! Every handler is a pure function of the current snapshot and one payload.
//! A lookup miss returns an unchanged copy of the input. After every step:
//! variables are unique and sorted by id, regulations are unique per ordered
//! pair, sorted by `source + target`, and only connect known variables after a
//! confirmation. Each property counter is at least its family length.

use std::collections::BTreeMap;

use shared::{
    domain::{
        observable_from_wire, Essentiality, FunctionDefinition, FunctionId, FunctionInput,
        Monotonicity, NodePosition, PropertyId, Regulation, Variable, VariableId,
    },
    property::{DynamicProperty, StaticProperty},
    protocol::{ChangeIdData, LayoutNodeData, ModelEvent, RegulationData, VariableData},
};
use tracing::{debug, warn};

use crate::{
    bridge::LocalEdit,
    store::{IdCounters, Layout, ModelSnapshot},
};

pub fn reconcile(snapshot: &ModelSnapshot, event: &ModelEvent) -> ModelSnapshot {
    match event {
        ModelEvent::VariableCreated(data) => variable_created(snapshot, data),
        ModelEvent::VariableIdChanged(data) => variable_id_changed(snapshot, data),
        ModelEvent::VariableNameChanged(data) => variable_name_changed(snapshot, data),
        ModelEvent::VariableRemoved { id } => variable_removed(snapshot, id),
        ModelEvent::NodePositionChanged(node) => node_position_changed(snapshot, node),
        ModelEvent::RegulationCreated(data) => regulation_created(snapshot, data),
        ModelEvent::RegulationObservableChanged {
            regulator,
            target,
            observable,
        } => update_regulation(snapshot, regulator, target, |regulation| {
            regulation.observable = observable_from_wire(observable);
        }),
        ModelEvent::RegulationSignChanged {
            regulator,
            target,
            sign,
        } => update_regulation(snapshot, regulator, target, |regulation| {
            regulation.monotonicity = Monotonicity::parse(sign);
        }),
        ModelEvent::RegulationRemoved { regulator, target } => {
            regulation_removed(snapshot, regulator, target)
        }
        ModelEvent::DynamicCreated(property) => dynamic_created(snapshot, property),
        ModelEvent::StaticCreated(property) => static_created(snapshot, property),
        ModelEvent::DynamicContentChanged(property) => dynamic_changed(snapshot, property),
        ModelEvent::StaticContentChanged(property) => static_changed(snapshot, property),
        ModelEvent::DynamicRemoved { id } => dynamic_removed(snapshot, id),
        ModelEvent::StaticRemoved { id } => static_removed(snapshot, id),
        ModelEvent::VariablesRefreshed { variables } => variables_refreshed(snapshot, variables),
        ModelEvent::LayoutNodesRefreshed { layout, nodes } => {
            if layout != snapshot.layout_id() {
                debug!(%layout, "ignoring refresh of an untracked layout");
                return snapshot.clone();
            }
            layout_nodes_refreshed(snapshot, nodes)
        }
        ModelEvent::RegulationsRefreshed { regulations } => {
            regulations_refreshed(snapshot, regulations)
        }
        ModelEvent::DynamicPropsRefreshed { properties } => {
            dynamic_refreshed(snapshot, properties)
        }
        ModelEvent::StaticPropsRefreshed { properties } => static_refreshed(snapshot, properties),
    }
}

pub fn apply_local(snapshot: &ModelSnapshot, edit: &LocalEdit) -> ModelSnapshot {
    match edit {
        LocalEdit::SetVariableFunction { id, function } => {
            update_variable(snapshot, id, |variable| variable.function = function.clone())
        }
        LocalEdit::AddFunction { id } => function_added(snapshot, id),
        LocalEdit::RemoveFunction { id } => {
            let functions = retain_functions(snapshot, |function| &function.id != id);
            snapshot.with_functions(functions)
        }
        LocalEdit::RenameFunction {
            original_id,
            new_id,
        } => function_renamed(snapshot, original_id, new_id),
        LocalEdit::SetFunctionExpression { id, function } => {
            update_function(snapshot, id, |definition| {
                definition.function = function.clone();
            })
        }
        LocalEdit::AddFunctionInput { function, variable } => {
            update_function(snapshot, function, |definition| {
                let slot = definition.variables.len();
                definition.variables.push(FunctionInput {
                    id: slot,
                    source: variable.clone(),
                    target: definition.id.clone(),
                    essential: Essentiality::Unknown,
                    monotonicity: Monotonicity::Unspecified,
                });
            })
        }
        LocalEdit::ToggleInputMonotonicity { function, slot } => {
            update_function_input(snapshot, function, *slot, |input| {
                input.monotonicity = input.monotonicity.next();
            })
        }
        LocalEdit::ToggleInputEssentiality { function, slot } => {
            update_function_input(snapshot, function, *slot, |input| {
                input.essential = input.essential.next();
            })
        }
        LocalEdit::RemoveFunctionInput { function, slot } => {
            update_function(snapshot, function, |definition| {
                if *slot < definition.variables.len() {
                    definition.variables.remove(*slot);
                    renumber_inputs(&mut definition.variables);
                }
            })
        }
        LocalEdit::ReplaceObservations { sets } => snapshot.with_observations(sets.clone()),
    }
}

fn sort_variables(variables: &mut [Variable]) {
    variables.sort_by(|a, b| a.id.cmp(&b.id));
}

/// Distinct pairs may share a concatenated id (`A`+`BC`, `AB`+`C`), so the
/// pair itself breaks ties.
fn sort_regulations(regulations: &mut [Regulation]) {
    regulations.sort_by(|a, b| {
        a.id.cmp(&b.id)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.target.cmp(&b.target))
    });
}

fn same_pair(a: &Regulation, b: &Regulation) -> bool {
    a.connects(&b.source, &b.target)
}

fn regulation_from_wire(data: &RegulationData) -> Regulation {
    Regulation::new(
        data.regulator.clone(),
        data.target.clone(),
        observable_from_wire(&data.observable),
        Monotonicity::parse(&data.sign),
    )
}

fn variable_created(snapshot: &ModelSnapshot, data: &VariableData) -> ModelSnapshot {
    let mut variables = snapshot.variables().to_vec();
    match variables.iter_mut().find(|variable| variable.id == data.id) {
        Some(existing) => {
            debug!(id = %data.id, "variable already present; keeping a single entry");
            existing.name = data.name.clone();
        }
        None => variables.push(Variable::new(data.id.clone(), data.name.clone())),
    }
    sort_variables(&mut variables);
    snapshot.with_variables(variables)
}

fn variable_id_changed(snapshot: &ModelSnapshot, data: &ChangeIdData) -> ModelSnapshot {
    let original = VariableId::new(data.original_id.as_str());
    let renamed = VariableId::new(data.new_id.as_str());
    if original == renamed || !snapshot.has_variable(&original) {
        return snapshot.clone();
    }
    if snapshot.has_variable(&renamed) {
        warn!(%original, %renamed, "id change collides with an existing variable; ignoring");
        return snapshot.clone();
    }

    let mut variables = snapshot.variables().to_vec();
    for variable in variables.iter_mut().filter(|v| v.id == original) {
        variable.id = renamed.clone();
    }
    sort_variables(&mut variables);

    let rekey = |id: &VariableId| {
        if id == &original {
            renamed.clone()
        } else {
            id.clone()
        }
    };

    let mut regulations: Vec<Regulation> = snapshot
        .regulations()
        .iter()
        .map(|regulation| {
            if regulation.touches(&original) {
                Regulation::new(
                    rekey(&regulation.source),
                    rekey(&regulation.target),
                    regulation.observable,
                    regulation.monotonicity,
                )
            } else {
                regulation.clone()
            }
        })
        .collect();
    sort_regulations(&mut regulations);

    let mut layout = snapshot.layout().clone();
    if let Some(position) = layout.remove(&original) {
        layout.insert(renamed.clone(), position);
    }

    let functions = map_function_inputs(snapshot, |inputs| {
        for input in inputs.iter_mut() {
            input.source = rekey(&input.source);
        }
    });

    snapshot
        .with_variables(variables)
        .with_regulations(regulations)
        .with_layout(layout)
        .with_functions(functions)
}

fn variable_name_changed(snapshot: &ModelSnapshot, data: &VariableData) -> ModelSnapshot {
    update_variable(snapshot, &data.id, |variable| variable.name = data.name.clone())
}

fn update_variable(
    snapshot: &ModelSnapshot,
    id: &VariableId,
    change: impl FnOnce(&mut Variable),
) -> ModelSnapshot {
    let Some(index) = snapshot.variables().iter().position(|v| &v.id == id) else {
        return snapshot.clone();
    };
    let mut variables = snapshot.variables().to_vec();
    change(&mut variables[index]);
    snapshot.with_variables(variables)
}

fn variable_removed(snapshot: &ModelSnapshot, id: &VariableId) -> ModelSnapshot {
    if !snapshot.has_variable(id) {
        return snapshot.clone();
    }

    let variables = snapshot
        .variables()
        .iter()
        .filter(|variable| &variable.id != id)
        .cloned()
        .collect();
    let regulations: Vec<Regulation> = snapshot
        .regulations()
        .iter()
        .filter(|regulation| !regulation.touches(id))
        .cloned()
        .collect();
    let dropped = snapshot.regulations().len() - regulations.len();
    if dropped > 0 {
        debug!(%id, dropped, "dropped regulations of removed variable");
    }

    let mut layout = snapshot.layout().clone();
    layout.remove(id);

    let functions = map_function_inputs(snapshot, |inputs| {
        inputs.retain(|input| &input.source != id);
        renumber_inputs(inputs);
    });

    snapshot
        .with_variables(variables)
        .with_regulations(regulations)
        .with_layout(layout)
        .with_functions(functions)
}

fn node_position_changed(snapshot: &ModelSnapshot, node: &LayoutNodeData) -> ModelSnapshot {
    if &node.layout != snapshot.layout_id() {
        debug!(layout = %node.layout, "ignoring position change on an untracked layout");
        return snapshot.clone();
    }
    if !snapshot.has_variable(&node.variable) {
        return snapshot.clone();
    }
    let mut layout = snapshot.layout().clone();
    layout.insert(node.variable.clone(), NodePosition::new(node.px, node.py));
    snapshot.with_layout(layout)
}

fn regulation_created(snapshot: &ModelSnapshot, data: &RegulationData) -> ModelSnapshot {
    let created = regulation_from_wire(data);
    if !snapshot.has_variable(&created.source) || !snapshot.has_variable(&created.target) {
        debug!(
            source = %created.source,
            target = %created.target,
            "regulation references an unknown variable; waiting for a refresh"
        );
        return snapshot.clone();
    }

    let mut regulations = snapshot.regulations().to_vec();
    match regulations.iter_mut().find(|r| same_pair(r, &created)) {
        Some(existing) => *existing = created,
        None => regulations.push(created),
    }
    sort_regulations(&mut regulations);
    snapshot.with_regulations(regulations)
}

fn update_regulation(
    snapshot: &ModelSnapshot,
    source: &VariableId,
    target: &VariableId,
    change: impl FnOnce(&mut Regulation),
) -> ModelSnapshot {
    let Some(index) = snapshot
        .regulations()
        .iter()
        .position(|regulation| regulation.connects(source, target))
    else {
        return snapshot.clone();
    };
    let mut regulations = snapshot.regulations().to_vec();
    change(&mut regulations[index]);
    snapshot.with_regulations(regulations)
}

fn regulation_removed(
    snapshot: &ModelSnapshot,
    source: &VariableId,
    target: &VariableId,
) -> ModelSnapshot {
    if snapshot.regulation(source, target).is_none() {
        return snapshot.clone();
    }
    let regulations = snapshot
        .regulations()
        .iter()
        .filter(|regulation| !regulation.connects(source, target))
        .cloned()
        .collect();
    snapshot.with_regulations(regulations)
}

fn with_dynamic_floor(snapshot: &ModelSnapshot, len: usize) -> IdCounters {
    let mut counters = snapshot.counters();
    counters.dynamic = counters.dynamic.max(len);
    counters
}

fn with_static_floor(snapshot: &ModelSnapshot, len: usize) -> IdCounters {
    let mut counters = snapshot.counters();
    counters.statics = counters.statics.max(len);
    counters
}

fn dynamic_created(snapshot: &ModelSnapshot, property: &DynamicProperty) -> ModelSnapshot {
    let mut properties = snapshot.dynamic_properties().to_vec();
    match properties.iter_mut().find(|p| p.id == property.id) {
        Some(existing) => *existing = property.clone(),
        None => properties.push(property.clone()),
    }
    let counters = with_dynamic_floor(snapshot, properties.len());
    snapshot
        .with_dynamic_properties(properties)
        .with_counters(counters)
}

fn static_created(snapshot: &ModelSnapshot, property: &StaticProperty) -> ModelSnapshot {
    let mut properties = snapshot.static_properties().to_vec();
    match properties.iter_mut().find(|p| p.id == property.id) {
        Some(existing) => *existing = property.clone(),
        None => properties.push(property.clone()),
    }
    let counters = with_static_floor(snapshot, properties.len());
    snapshot
        .with_static_properties(properties)
        .with_counters(counters)
}

fn dynamic_changed(snapshot: &ModelSnapshot, property: &DynamicProperty) -> ModelSnapshot {
    let Some(index) = snapshot
        .dynamic_properties()
        .iter()
        .position(|p| p.id == property.id)
    else {
        return snapshot.clone();
    };
    let mut properties = snapshot.dynamic_properties().to_vec();
    properties[index] = property.clone();
    snapshot.with_dynamic_properties(properties)
}

fn static_changed(snapshot: &ModelSnapshot, property: &StaticProperty) -> ModelSnapshot {
    let Some(index) = snapshot
        .static_properties()
        .iter()
        .position(|p| p.id == property.id)
    else {
        return snapshot.clone();
    };
    let mut properties = snapshot.static_properties().to_vec();
    properties[index] = property.clone();
    snapshot.with_static_properties(properties)
}

fn dynamic_removed(snapshot: &ModelSnapshot, id: &PropertyId) -> ModelSnapshot {
    if !snapshot.dynamic_properties().iter().any(|p| &p.id == id) {
        return snapshot.clone();
    }
    let properties = snapshot
        .dynamic_properties()
        .iter()
        .filter(|p| &p.id != id)
        .cloned()
        .collect();
    snapshot.with_dynamic_properties(properties)
}

fn static_removed(snapshot: &ModelSnapshot, id: &PropertyId) -> ModelSnapshot {
    if !snapshot.static_properties().iter().any(|p| &p.id == id) {
        return snapshot.clone();
    }
    let properties = snapshot
        .static_properties()
        .iter()
        .filter(|p| &p.id != id)
        .cloned()
        .collect();
    snapshot.with_static_properties(properties)
}

fn variables_refreshed(snapshot: &ModelSnapshot, refreshed: &[VariableData]) -> ModelSnapshot {
    let mut variables: Vec<Variable> = refreshed
        .iter()
        .map(|data| Variable::new(data.id.clone(), data.name.clone()))
        .collect();
    sort_variables(&mut variables);
    variables.dedup_by(|a, b| a.id == b.id);
    snapshot.with_variables(variables)
}

fn layout_nodes_refreshed(snapshot: &ModelSnapshot, nodes: &[LayoutNodeData]) -> ModelSnapshot {
    let layout: Layout = nodes
        .iter()
        .map(|node| (node.variable.clone(), NodePosition::new(node.px, node.py)))
        .collect::<BTreeMap<_, _>>();
    snapshot.with_layout(layout)
}

fn regulations_refreshed(snapshot: &ModelSnapshot, refreshed: &[RegulationData]) -> ModelSnapshot {
    let mut regulations: Vec<Regulation> = refreshed.iter().map(regulation_from_wire).collect();
    sort_regulations(&mut regulations);
    regulations.dedup_by(|a, b| same_pair(a, b));
    snapshot.with_regulations(regulations)
}

fn dynamic_refreshed(snapshot: &ModelSnapshot, properties: &[DynamicProperty]) -> ModelSnapshot {
    let counters = with_dynamic_floor(snapshot, properties.len());
    snapshot
        .with_dynamic_properties(properties.to_vec())
        .with_counters(counters)
}

fn static_refreshed(snapshot: &ModelSnapshot, properties: &[StaticProperty]) -> ModelSnapshot {
    let counters = with_static_floor(snapshot, properties.len());
    snapshot
        .with_static_properties(properties.to_vec())
        .with_counters(counters)
}

fn function_added(snapshot: &ModelSnapshot, id: &FunctionId) -> ModelSnapshot {
    if snapshot.functions().iter().any(|function| &function.id == id) {
        return snapshot.clone();
    }
    let mut functions = snapshot.functions().to_vec();
    functions.push(FunctionDefinition::empty(id.clone()));
    let mut counters = snapshot.counters();
    counters.functions = counters.functions.max(functions.len());
    snapshot.with_functions(functions).with_counters(counters)
}

fn function_renamed(
    snapshot: &ModelSnapshot,
    original_id: &FunctionId,
    new_id: &FunctionId,
) -> ModelSnapshot {
    if snapshot.functions().iter().any(|function| &function.id == new_id) {
        return snapshot.clone();
    }
    update_function(snapshot, original_id, |definition| {
        definition.id = new_id.clone();
        for input in definition.variables.iter_mut() {
            input.target = new_id.clone();
        }
    })
}

fn update_function(
    snapshot: &ModelSnapshot,
    id: &FunctionId,
    change: impl FnOnce(&mut FunctionDefinition),
) -> ModelSnapshot {
    let Some(index) = snapshot.functions().iter().position(|f| &f.id == id) else {
        return snapshot.clone();
    };
    let mut functions = snapshot.functions().to_vec();
    change(&mut functions[index]);
    snapshot.with_functions(functions)
}

fn update_function_input(
    snapshot: &ModelSnapshot,
    id: &FunctionId,
    slot: usize,
    change: impl FnOnce(&mut FunctionInput),
) -> ModelSnapshot {
    update_function(snapshot, id, |definition| {
        if let Some(input) = definition.variables.get_mut(slot) {
            change(input);
        }
    })
}

fn retain_functions(
    snapshot: &ModelSnapshot,
    keep: impl Fn(&FunctionDefinition) -> bool,
) -> Vec<FunctionDefinition> {
    snapshot
        .functions()
        .iter()
        .filter(|function| keep(function))
        .cloned()
        .collect()
}

fn map_function_inputs(
    snapshot: &ModelSnapshot,
    change: impl Fn(&mut Vec<FunctionInput>),
) -> Vec<FunctionDefinition> {
    snapshot
        .functions()
        .iter()
        .cloned()
        .map(|mut definition| {
            change(&mut definition.variables);
            definition
        })
        .collect()
}

fn renumber_inputs(inputs: &mut [FunctionInput]) {
    for (slot, input) in inputs.iter_mut().enumerate() {
        input.id = slot;
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
