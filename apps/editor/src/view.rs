use client_core::{Layout, ModelSnapshot};
use serde::Serialize;
use shared::{
    domain::{FunctionDefinition, LayoutId, ObservationSet, Regulation, Variable},
    property::{DynamicProperty, StaticProperty},
};

#[derive(Debug, Serialize)]
pub struct SnapshotView<'a> {
    pub layout_id: &'a LayoutId,
    pub variables: &'a [Variable],
    pub regulations: &'a [Regulation],
    pub layout: &'a Layout,
    pub functions: &'a [FunctionDefinition],
    pub dynamic_properties: &'a [DynamicProperty],
    pub static_properties: &'a [StaticProperty],
    pub observations: &'a [ObservationSet],
}

impl<'a> From<&'a ModelSnapshot> for SnapshotView<'a> {
    fn from(snapshot: &'a ModelSnapshot) -> Self {
        Self {
            layout_id: snapshot.layout_id(),
            variables: snapshot.variables(),
            regulations: snapshot.regulations(),
            layout: snapshot.layout(),
            functions: snapshot.functions(),
            dynamic_properties: snapshot.dynamic_properties(),
            static_properties: snapshot.static_properties(),
            observations: snapshot.observations(),
        }
    }
}
