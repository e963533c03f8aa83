//! Verification properties. Two independent families: dynamic (about the
//! network's behaviour) and static (about its structure).

use serde::{Deserialize, Serialize};

use crate::domain::{DatasetId, Essentiality, FunctionId, Monotonicity, PropertyId, VariableId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicVariant {
    FixedPoint,
    TrapSpace,
    ExistsTrajectory,
    AttractorCount,
    HasAttractor,
    Generic,
}

impl DynamicVariant {
    pub const ALL: [DynamicVariant; 6] = [
        DynamicVariant::TrapSpace,
        DynamicVariant::FixedPoint,
        DynamicVariant::ExistsTrajectory,
        DynamicVariant::AttractorCount,
        DynamicVariant::HasAttractor,
        DynamicVariant::Generic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::FixedPoint => "Fixed point",
            Self::TrapSpace => "Trap space",
            Self::ExistsTrajectory => "Exists trajectory",
            Self::AttractorCount => "Attractor count",
            Self::HasAttractor => "Has attractor",
            Self::Generic => "Generic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaticVariant {
    FunctionInputEssential,
    FunctionInputEssentialWithCondition,
    VariableRegulationEssentialWithCondition,
    FunctionInputMonotonic,
    FunctionInputMonotonicWithCondition,
    VariableRegulationMonotonicWithCondition,
    Generic,
}

impl StaticVariant {
    pub const ALL: [StaticVariant; 7] = [
        StaticVariant::FunctionInputEssential,
        StaticVariant::FunctionInputEssentialWithCondition,
        StaticVariant::VariableRegulationEssentialWithCondition,
        StaticVariant::FunctionInputMonotonic,
        StaticVariant::FunctionInputMonotonicWithCondition,
        StaticVariant::VariableRegulationMonotonicWithCondition,
        StaticVariant::Generic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::FunctionInputEssential => "Essential function input",
            Self::FunctionInputEssentialWithCondition => "Essential function input (conditional)",
            Self::VariableRegulationEssentialWithCondition => "Essential variable regulation",
            Self::FunctionInputMonotonic => "Monotonic function input",
            Self::FunctionInputMonotonicWithCondition => "Monotonic function input (conditional)",
            Self::VariableRegulationMonotonicWithCondition => "Monotonic variable regulation",
            Self::Generic => "Generic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum DynamicPropertyKind {
    FixedPoint {
        dataset: Option<DatasetId>,
        observation: Option<String>,
    },
    TrapSpace {
        dataset: Option<DatasetId>,
        observation: Option<String>,
        minimal: bool,
        nonpercolable: bool,
    },
    ExistsTrajectory {
        dataset: Option<DatasetId>,
    },
    AttractorCount {
        lower: u32,
        upper: u32,
    },
    HasAttractor {
        dataset: Option<DatasetId>,
        observation: Option<String>,
    },
    Generic {
        value: String,
    },
}

impl DynamicPropertyKind {
    pub fn default_for(variant: DynamicVariant) -> Self {
        match variant {
            DynamicVariant::FixedPoint => Self::FixedPoint {
                dataset: None,
                observation: None,
            },
            DynamicVariant::TrapSpace => Self::TrapSpace {
                dataset: None,
                observation: None,
                minimal: false,
                nonpercolable: false,
            },
            DynamicVariant::ExistsTrajectory => Self::ExistsTrajectory { dataset: None },
            DynamicVariant::AttractorCount => Self::AttractorCount { lower: 1, upper: 1 },
            DynamicVariant::HasAttractor => Self::HasAttractor {
                dataset: None,
                observation: None,
            },
            DynamicVariant::Generic => Self::Generic {
                value: String::new(),
            },
        }
    }

    pub fn variant(&self) -> DynamicVariant {
        match self {
            Self::FixedPoint { .. } => DynamicVariant::FixedPoint,
            Self::TrapSpace { .. } => DynamicVariant::TrapSpace,
            Self::ExistsTrajectory { .. } => DynamicVariant::ExistsTrajectory,
            Self::AttractorCount { .. } => DynamicVariant::AttractorCount,
            Self::HasAttractor { .. } => DynamicVariant::HasAttractor,
            Self::Generic { .. } => DynamicVariant::Generic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicProperty {
    pub id: PropertyId,
    pub name: String,
    #[serde(flatten)]
    pub kind: DynamicPropertyKind,
}

impl DynamicProperty {
    pub fn default_for(id: PropertyId, variant: DynamicVariant) -> Self {
        Self {
            id,
            name: variant.label().to_string(),
            kind: DynamicPropertyKind::default_for(variant),
        }
    }

    pub fn variant(&self) -> DynamicVariant {
        self.kind.variant()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum StaticPropertyKind {
    FunctionInputEssential {
        function: Option<FunctionId>,
        variable: Option<VariableId>,
        essential: Essentiality,
    },
    FunctionInputEssentialWithCondition {
        function: Option<FunctionId>,
        variable: Option<VariableId>,
        essential: Essentiality,
        context: String,
    },
    VariableRegulationEssentialWithCondition {
        target: Option<VariableId>,
        variable: Option<VariableId>,
        essential: Essentiality,
        context: String,
    },
    FunctionInputMonotonic {
        function: Option<FunctionId>,
        variable: Option<VariableId>,
        monotonic: Monotonicity,
    },
    FunctionInputMonotonicWithCondition {
        function: Option<FunctionId>,
        variable: Option<VariableId>,
        monotonic: Monotonicity,
        context: String,
    },
    VariableRegulationMonotonicWithCondition {
        target: Option<VariableId>,
        variable: Option<VariableId>,
        monotonic: Monotonicity,
        context: String,
    },
    Generic {
        value: String,
    },
}

impl StaticPropertyKind {
    pub fn default_for(variant: StaticVariant) -> Self {
        match variant {
            StaticVariant::FunctionInputEssential => Self::FunctionInputEssential {
                function: None,
                variable: None,
                essential: Essentiality::Unknown,
            },
            StaticVariant::FunctionInputEssentialWithCondition => {
                Self::FunctionInputEssentialWithCondition {
                    function: None,
                    variable: None,
                    essential: Essentiality::Unknown,
                    context: String::new(),
                }
            }
            StaticVariant::VariableRegulationEssentialWithCondition => {
                Self::VariableRegulationEssentialWithCondition {
                    target: None,
                    variable: None,
                    essential: Essentiality::Unknown,
                    context: String::new(),
                }
            }
            StaticVariant::FunctionInputMonotonic => Self::FunctionInputMonotonic {
                function: None,
                variable: None,
                monotonic: Monotonicity::Unspecified,
            },
            StaticVariant::FunctionInputMonotonicWithCondition => {
                Self::FunctionInputMonotonicWithCondition {
                    function: None,
                    variable: None,
                    monotonic: Monotonicity::Unspecified,
                    context: String::new(),
                }
            }
            StaticVariant::VariableRegulationMonotonicWithCondition => {
                Self::VariableRegulationMonotonicWithCondition {
                    target: None,
                    variable: None,
                    monotonic: Monotonicity::Unspecified,
                    context: String::new(),
                }
            }
            StaticVariant::Generic => Self::Generic {
                value: String::new(),
            },
        }
    }

    pub fn variant(&self) -> StaticVariant {
        match self {
            Self::FunctionInputEssential { .. } => StaticVariant::FunctionInputEssential,
            Self::FunctionInputEssentialWithCondition { .. } => {
                StaticVariant::FunctionInputEssentialWithCondition
            }
            Self::VariableRegulationEssentialWithCondition { .. } => {
                StaticVariant::VariableRegulationEssentialWithCondition
            }
            Self::FunctionInputMonotonic { .. } => StaticVariant::FunctionInputMonotonic,
            Self::FunctionInputMonotonicWithCondition { .. } => {
                StaticVariant::FunctionInputMonotonicWithCondition
            }
            Self::VariableRegulationMonotonicWithCondition { .. } => {
                StaticVariant::VariableRegulationMonotonicWithCondition
            }
            Self::Generic { .. } => StaticVariant::Generic,
        }
    }

    /// The variable the assertion is about, if one has been picked.
    pub fn variable(&self) -> Option<&VariableId> {
        match self {
            Self::FunctionInputEssential { variable, .. }
            | Self::FunctionInputEssentialWithCondition { variable, .. }
            | Self::VariableRegulationEssentialWithCondition { variable, .. }
            | Self::FunctionInputMonotonic { variable, .. }
            | Self::FunctionInputMonotonicWithCondition { variable, .. }
            | Self::VariableRegulationMonotonicWithCondition { variable, .. } => variable.as_ref(),
            Self::Generic { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticProperty {
    pub id: PropertyId,
    pub name: String,
    #[serde(flatten)]
    pub kind: StaticPropertyKind,
}

impl StaticProperty {
    pub fn default_for(id: PropertyId, variant: StaticVariant) -> Self {
        Self {
            id,
            name: variant.label().to_string(),
            kind: StaticPropertyKind::default_for(variant),
        }
    }

    pub fn variant(&self) -> StaticVariant {
        self.kind.variant()
    }
}
