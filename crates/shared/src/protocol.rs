use serde::{Deserialize, Serialize};

use crate::{
    domain::{LayoutId, PropertyId, VariableId},
    property::{DynamicProperty, DynamicVariant, StaticProperty, StaticVariant},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableData {
    pub id: VariableId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeIdData {
    pub original_id: String,
    pub new_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNodeData {
    pub layout: LayoutId,
    pub variable: VariableId,
    pub px: f64,
    pub py: f64,
}

/// Regulation as the authoritative process reports it: sign and observability
/// are plain strings and are mapped to enums only when reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegulationData {
    pub regulator: VariableId,
    pub target: VariableId,
    pub sign: String,
    pub observable: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePlacement {
    pub layout: LayoutId,
    pub px: f64,
    pub py: f64,
}

/// Outbound intents. None of these changes client state by itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ModelCommand {
    AddVariable {
        id: VariableId,
        name: String,
        position: NodePlacement,
    },
    SetVariableId {
        original_id: VariableId,
        new_id: VariableId,
    },
    SetVariableName {
        id: VariableId,
        name: String,
    },
    RemoveVariable {
        id: VariableId,
    },
    ChangeNodePosition {
        layout: LayoutId,
        variable: VariableId,
        px: f64,
        py: f64,
    },
    AddRegulation {
        regulator: VariableId,
        target: VariableId,
        sign: String,
        observable: String,
    },
    SetRegulationObservable {
        regulator: VariableId,
        target: VariableId,
        observable: String,
    },
    SetRegulationSign {
        regulator: VariableId,
        target: VariableId,
        sign: String,
    },
    RemoveRegulation {
        regulator: VariableId,
        target: VariableId,
    },
    AddDefaultDynamic {
        id: PropertyId,
        variant: DynamicVariant,
    },
    AddDefaultStatic {
        id: PropertyId,
        variant: StaticVariant,
    },
    SetDynamicContent {
        id: PropertyId,
        property: DynamicProperty,
    },
    SetStaticContent {
        id: PropertyId,
        property: StaticProperty,
    },
    RemoveDynamic {
        id: PropertyId,
    },
    RemoveStatic {
        id: PropertyId,
    },
    RefreshVariables,
    RefreshLayoutNodes {
        layout: LayoutId,
    },
    RefreshRegulations,
    RefreshDynamicProps,
    RefreshStaticProps,
}

impl ModelCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddVariable { .. } => "add_variable",
            Self::SetVariableId { .. } => "set_variable_id",
            Self::SetVariableName { .. } => "set_variable_name",
            Self::RemoveVariable { .. } => "remove_variable",
            Self::ChangeNodePosition { .. } => "change_node_position",
            Self::AddRegulation { .. } => "add_regulation",
            Self::SetRegulationObservable { .. } => "set_regulation_observable",
            Self::SetRegulationSign { .. } => "set_regulation_sign",
            Self::RemoveRegulation { .. } => "remove_regulation",
            Self::AddDefaultDynamic { .. } => "add_default_dynamic",
            Self::AddDefaultStatic { .. } => "add_default_static",
            Self::SetDynamicContent { .. } => "set_dynamic_content",
            Self::SetStaticContent { .. } => "set_static_content",
            Self::RemoveDynamic { .. } => "remove_dynamic",
            Self::RemoveStatic { .. } => "remove_static",
            Self::RefreshVariables => "refresh_variables",
            Self::RefreshLayoutNodes { .. } => "refresh_layout_nodes",
            Self::RefreshRegulations => "refresh_regulations",
            Self::RefreshDynamicProps => "refresh_dynamic_props",
            Self::RefreshStaticProps => "refresh_static_props",
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Self::RemoveVariable { .. }
                | Self::RemoveRegulation { .. }
                | Self::RemoveDynamic { .. }
                | Self::RemoveStatic { .. }
        )
    }
}

/// Inbound facts: confirmations of single changes and bulk refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ModelEvent {
    VariableCreated(VariableData),
    VariableIdChanged(ChangeIdData),
    VariableNameChanged(VariableData),
    VariableRemoved {
        id: VariableId,
    },
    NodePositionChanged(LayoutNodeData),
    RegulationCreated(RegulationData),
    RegulationObservableChanged {
        regulator: VariableId,
        target: VariableId,
        observable: String,
    },
    RegulationSignChanged {
        regulator: VariableId,
        target: VariableId,
        sign: String,
    },
    RegulationRemoved {
        regulator: VariableId,
        target: VariableId,
    },
    DynamicCreated(DynamicProperty),
    StaticCreated(StaticProperty),
    DynamicContentChanged(DynamicProperty),
    StaticContentChanged(StaticProperty),
    DynamicRemoved {
        id: PropertyId,
    },
    StaticRemoved {
        id: PropertyId,
    },
    VariablesRefreshed {
        variables: Vec<VariableData>,
    },
    LayoutNodesRefreshed {
        layout: LayoutId,
        nodes: Vec<LayoutNodeData>,
    },
    RegulationsRefreshed {
        regulations: Vec<RegulationData>,
    },
    DynamicPropsRefreshed {
        properties: Vec<DynamicProperty>,
    },
    StaticPropsRefreshed {
        properties: Vec<StaticProperty>,
    },
}

impl ModelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::VariableCreated(_) => "variable_created",
            Self::VariableIdChanged(_) => "variable_id_changed",
            Self::VariableNameChanged(_) => "variable_name_changed",
            Self::VariableRemoved { .. } => "variable_removed",
            Self::NodePositionChanged(_) => "node_position_changed",
            Self::RegulationCreated(_) => "regulation_created",
            Self::RegulationObservableChanged { .. } => "regulation_observable_changed",
            Self::RegulationSignChanged { .. } => "regulation_sign_changed",
            Self::RegulationRemoved { .. } => "regulation_removed",
            Self::DynamicCreated(_) => "dynamic_created",
            Self::StaticCreated(_) => "static_created",
            Self::DynamicContentChanged(_) => "dynamic_content_changed",
            Self::StaticContentChanged(_) => "static_content_changed",
            Self::DynamicRemoved { .. } => "dynamic_removed",
            Self::StaticRemoved { .. } => "static_removed",
            Self::VariablesRefreshed { .. } => "variables_refreshed",
            Self::LayoutNodesRefreshed { .. } => "layout_nodes_refreshed",
            Self::RegulationsRefreshed { .. } => "regulations_refreshed",
            Self::DynamicPropsRefreshed { .. } => "dynamic_props_refreshed",
            Self::StaticPropsRefreshed { .. } => "static_props_refreshed",
        }
    }

    pub fn is_refresh(&self) -> bool {
        matches!(
            self,
            Self::VariablesRefreshed { .. }
                | Self::LayoutNodesRefreshed { .. }
                | Self::RegulationsRefreshed { .. }
                | Self::DynamicPropsRefreshed { .. }
                | Self::StaticPropsRefreshed { .. }
        )
    }
}
