//! Immutable, render-ready snapshot of the editable model.
//!
//! Every collection sits behind its own `Arc`, so a `with_*` copy shares all the
//! collections it does not touch with the snapshot it was derived from. Nothing
//! here mutates a snapshot in place.

use std::{collections::BTreeMap, sync::Arc};

use shared::{
    domain::{
        FunctionDefinition, LayoutId, NodePosition, ObservationSet, Regulation, Variable,
        VariableId,
    },
    property::{DynamicProperty, StaticProperty},
};

pub const DEFAULT_LAYOUT: &str = "default";

pub type Layout = BTreeMap<VariableId, NodePosition>;

/// Id-generation floors per entity family.
///
/// The reconciler keeps each property floor at or above its family's length;
/// the dispatcher never generates an id below these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdCounters {
    pub dynamic: usize,
    pub statics: usize,
    pub functions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSnapshot {
    layout_id: LayoutId,
    variables: Arc<Vec<Variable>>,
    regulations: Arc<Vec<Regulation>>,
    layout: Arc<Layout>,
    functions: Arc<Vec<FunctionDefinition>>,
    dynamic_properties: Arc<Vec<DynamicProperty>>,
    static_properties: Arc<Vec<StaticProperty>>,
    observations: Arc<Vec<ObservationSet>>,
    counters: IdCounters,
}

/// Fields to substitute into a default snapshot; see [`ModelSnapshot::create`].
#[derive(Debug, Clone, Default)]
pub struct ModelOverrides {
    pub layout_id: Option<LayoutId>,
    pub variables: Option<Vec<Variable>>,
    pub regulations: Option<Vec<Regulation>>,
    pub layout: Option<Layout>,
    pub functions: Option<Vec<FunctionDefinition>>,
    pub dynamic_properties: Option<Vec<DynamicProperty>>,
    pub static_properties: Option<Vec<StaticProperty>>,
    pub observations: Option<Vec<ObservationSet>>,
    pub counters: Option<IdCounters>,
}

impl Default for ModelSnapshot {
    fn default() -> Self {
        Self::create(ModelOverrides::default())
    }
}

impl ModelSnapshot {
    pub fn create(overrides: ModelOverrides) -> Self {
        Self {
            layout_id: overrides
                .layout_id
                .unwrap_or_else(|| LayoutId::new(DEFAULT_LAYOUT)),
            variables: Arc::new(overrides.variables.unwrap_or_default()),
            regulations: Arc::new(overrides.regulations.unwrap_or_default()),
            layout: Arc::new(overrides.layout.unwrap_or_default()),
            functions: Arc::new(overrides.functions.unwrap_or_default()),
            dynamic_properties: Arc::new(overrides.dynamic_properties.unwrap_or_default()),
            static_properties: Arc::new(overrides.static_properties.unwrap_or_default()),
            observations: Arc::new(overrides.observations.unwrap_or_default()),
            counters: overrides.counters.unwrap_or_default(),
        }
    }

    pub fn for_layout(layout_id: LayoutId) -> Self {
        Self::create(ModelOverrides {
            layout_id: Some(layout_id),
            ..ModelOverrides::default()
        })
    }

    pub fn layout_id(&self) -> &LayoutId {
        &self.layout_id
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn regulations(&self) -> &[Regulation] {
        &self.regulations
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn functions(&self) -> &[FunctionDefinition] {
        &self.functions
    }

    pub fn dynamic_properties(&self) -> &[DynamicProperty] {
        &self.dynamic_properties
    }

    pub fn static_properties(&self) -> &[StaticProperty] {
        &self.static_properties
    }

    pub fn observations(&self) -> &[ObservationSet] {
        &self.observations
    }

    pub fn counters(&self) -> IdCounters {
        self.counters
    }

    pub fn variable(&self, id: &VariableId) -> Option<&Variable> {
        self.variables.iter().find(|variable| &variable.id == id)
    }

    pub fn has_variable(&self, id: &VariableId) -> bool {
        self.variable(id).is_some()
    }

    pub fn regulation(&self, source: &VariableId, target: &VariableId) -> Option<&Regulation> {
        self.regulations
            .iter()
            .find(|regulation| regulation.connects(source, target))
    }

    /// Regulations whose target is `variable`, i.e. its regulators.
    pub fn regulators_of(&self, variable: &VariableId) -> Vec<&Regulation> {
        self.regulations
            .iter()
            .filter(|regulation| &regulation.target == variable)
            .collect()
    }

    pub fn position(&self, variable: &VariableId) -> Option<NodePosition> {
        self.layout.get(variable).copied()
    }

    pub fn with_variables(&self, variables: Vec<Variable>) -> Self {
        Self {
            variables: Arc::new(variables),
            ..self.clone()
        }
    }

    pub fn with_regulations(&self, regulations: Vec<Regulation>) -> Self {
        Self {
            regulations: Arc::new(regulations),
            ..self.clone()
        }
    }

    pub fn with_layout(&self, layout: Layout) -> Self {
        Self {
            layout: Arc::new(layout),
            ..self.clone()
        }
    }

    pub fn with_functions(&self, functions: Vec<FunctionDefinition>) -> Self {
        Self {
            functions: Arc::new(functions),
            ..self.clone()
        }
    }

    pub fn with_dynamic_properties(&self, properties: Vec<DynamicProperty>) -> Self {
        Self {
            dynamic_properties: Arc::new(properties),
            ..self.clone()
        }
    }

    pub fn with_static_properties(&self, properties: Vec<StaticProperty>) -> Self {
        Self {
            static_properties: Arc::new(properties),
            ..self.clone()
        }
    }

    pub fn with_observations(&self, observations: Vec<ObservationSet>) -> Self {
        Self {
            observations: Arc::new(observations),
            ..self.clone()
        }
    }

    pub fn with_counters(&self, counters: IdCounters) -> Self {
        Self {
            counters,
            ..self.clone()
        }
    }

    /// True when both snapshots hold the very same variable collection.
    pub fn shares_variables_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.variables, &other.variables)
    }

    pub fn shares_regulations_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.regulations, &other.regulations)
    }

    pub fn shares_layout_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.layout, &other.layout)
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
