use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(VariableId);
id_newtype!(LayoutId);
id_newtype!(FunctionId);
id_newtype!(PropertyId);
id_newtype!(DatasetId);

/// Sign of a regulation or of a function input.
///
/// On the wire this travels as a case-insensitive string; anything that is not
/// one of the known signs reads back as [`Monotonicity::Unspecified`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Monotonicity {
    #[default]
    Unspecified,
    Activation,
    Inhibition,
    Dual,
}

impl Monotonicity {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACTIVATION" => Self::Activation,
            "INHIBITION" => Self::Inhibition,
            "DUAL" => Self::Dual,
            _ => Self::Unspecified,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Unspecified => "Unknown",
            Self::Activation => "Activation",
            Self::Inhibition => "Inhibition",
            Self::Dual => "Dual",
        }
    }

    /// Toggle order used by the function editor.
    pub fn next(self) -> Self {
        match self {
            Self::Activation => Self::Inhibition,
            Self::Inhibition => Self::Dual,
            Self::Dual => Self::Unspecified,
            Self::Unspecified => Self::Activation,
        }
    }
}

impl From<String> for Monotonicity {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Monotonicity> for String {
    fn from(value: Monotonicity) -> Self {
        value.as_wire().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Essentiality {
    False,
    True,
    #[default]
    Unknown,
}

impl Essentiality {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "TRUE" => Self::True,
            "FALSE" => Self::False,
            _ => Self::Unknown,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::False => "False",
            Self::True => "True",
            Self::Unknown => "Unknown",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::False => Self::True,
            Self::True => Self::Unknown,
            Self::Unknown => Self::False,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::False => "non-essential",
            Self::True => "essential",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for Essentiality {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Essentiality> for String {
    fn from(value: Essentiality) -> Self {
        value.as_wire().to_string()
    }
}

/// Observability flags travel as the literal strings `"True"` / `"False"`.
pub fn observable_to_wire(observable: bool) -> &'static str {
    if observable {
        "True"
    } else {
        "False"
    }
}

pub fn observable_from_wire(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: VariableId,
    pub name: String,
    /// Update-function text. Client-local; the authoritative process never sends it.
    pub function: String,
}

impl Variable {
    pub fn new(id: impl Into<VariableId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            function: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regulation {
    /// Always `source + target`; at most one regulation per ordered pair.
    pub id: String,
    pub source: VariableId,
    pub target: VariableId,
    pub observable: bool,
    pub monotonicity: Monotonicity,
}

impl Regulation {
    pub fn new(
        source: VariableId,
        target: VariableId,
        observable: bool,
        monotonicity: Monotonicity,
    ) -> Self {
        Self {
            id: Self::key(&source, &target),
            source,
            target,
            observable,
            monotonicity,
        }
    }

    pub fn key(source: &VariableId, target: &VariableId) -> String {
        format!("{source}{target}")
    }

    pub fn connects(&self, source: &VariableId, target: &VariableId) -> bool {
        &self.source == source && &self.target == target
    }

    pub fn touches(&self, variable: &VariableId) -> bool {
        &self.source == variable || &self.target == variable
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
}

impl NodePosition {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One input slot of a client-local function definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionInput {
    /// Positional slot within the owning definition.
    pub id: usize,
    pub source: VariableId,
    pub target: FunctionId,
    pub essential: Essentiality,
    pub monotonicity: Monotonicity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub id: FunctionId,
    pub function: String,
    pub variables: Vec<FunctionInput>,
}

impl FunctionDefinition {
    pub fn empty(id: FunctionId) -> Self {
        Self {
            id,
            function: String::new(),
            variables: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataCategory {
    Attractor,
    FixedPoint,
    TimeSeries,
    #[default]
    Unspecified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub name: String,
    pub selected: bool,
    /// `None` marks an unobserved (free) value.
    pub values: BTreeMap<VariableId, Option<bool>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSet {
    pub id: DatasetId,
    pub observations: Vec<Observation>,
    pub variables: BTreeSet<VariableId>,
    pub category: DataCategory,
}
