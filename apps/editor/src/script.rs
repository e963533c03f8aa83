use anyhow::{Context, Result};
use client_core::{GateOutcome, ModelClient};
use serde::Deserialize;
use shared::{
    domain::Monotonicity,
    property::{DynamicVariant, StaticVariant},
};
use tracing::info;

fn observable_by_default() -> bool {
    true
}

/// One scripted user intent. Scripts are JSON arrays of these, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    AddVariable {
        id: String,
        name: String,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    RenameVariable {
        id: String,
        name: String,
    },
    SetVariableId {
        original_id: String,
        new_id: String,
    },
    MoveNode {
        id: String,
        x: f64,
        y: f64,
    },
    SetFunction {
        id: String,
        function: String,
    },
    AddRegulation {
        source: String,
        target: String,
        #[serde(default)]
        sign: Monotonicity,
        #[serde(default = "observable_by_default")]
        observable: bool,
    },
    SetRegulationSign {
        source: String,
        target: String,
        sign: Monotonicity,
    },
    SetRegulationObservable {
        source: String,
        target: String,
        observable: bool,
    },
    AddDynamic {
        variant: DynamicVariant,
    },
    AddStatic {
        variant: StaticVariant,
    },
    AddFunction,
    AddFunctionInput {
        function: String,
        variable: String,
    },
    RemoveVariable {
        id: String,
    },
    RemoveRegulation {
        source: String,
        target: String,
    },
    RemoveDynamic {
        id: String,
    },
    RemoveStatic {
        id: String,
    },
    Refresh,
}

pub fn parse_script(raw: &str) -> Result<Vec<ScriptStep>> {
    serde_json::from_str(raw).context("script must be a JSON array of steps")
}

/// A small regulatory network built from the sample genes.
pub fn demo_script() -> Vec<ScriptStep> {
    let variable = |id: &str, name: &str, x: f64, y: f64| ScriptStep::AddVariable {
        id: id.into(),
        name: name.into(),
        x,
        y,
    };
    let regulation = |source: &str, target: &str, sign: Monotonicity| ScriptStep::AddRegulation {
        source: source.into(),
        target: target.into(),
        sign,
        observable: true,
    };

    vec![
        variable("A", "GeneA", 0.0, 0.0),
        variable("B", "GeneB", 120.0, 0.0),
        variable("C", "GeneC", 60.0, 100.0),
        variable("D", "GeneD", -120.0, 0.0),
        regulation("A", "B", Monotonicity::Activation),
        regulation("B", "C", Monotonicity::Inhibition),
        regulation("D", "A", Monotonicity::Inhibition),
        regulation("C", "A", Monotonicity::Unspecified),
        ScriptStep::SetRegulationObservable {
            source: "C".into(),
            target: "A".into(),
            observable: false,
        },
        ScriptStep::SetFunction {
            id: "A".into(),
            function: "!D & C".into(),
        },
        ScriptStep::AddFunction,
        ScriptStep::AddFunctionInput {
            function: "func0".into(),
            variable: "A".into(),
        },
        ScriptStep::AddDynamic {
            variant: DynamicVariant::FixedPoint,
        },
        ScriptStep::AddDynamic {
            variant: DynamicVariant::AttractorCount,
        },
        ScriptStep::AddStatic {
            variant: StaticVariant::FunctionInputEssential,
        },
        ScriptStep::SetVariableId {
            original_id: "D".into(),
            new_id: "R".into(),
        },
        ScriptStep::MoveNode {
            id: "C".into(),
            x: 60.0,
            y: 140.0,
        },
        ScriptStep::RemoveVariable { id: "B".into() },
    ]
}

pub async fn run_step(client: &ModelClient, step: &ScriptStep) -> Result<()> {
    let dispatcher = client.dispatcher();
    match step {
        ScriptStep::AddVariable { id, name, x, y } => {
            dispatcher.add_variable(id.as_str(), name.as_str(), client.layout().clone(), *x, *y)?
        }
        ScriptStep::RenameVariable { id, name } => {
            dispatcher.set_variable_name(id.as_str(), name.as_str())?
        }
        ScriptStep::SetVariableId {
            original_id,
            new_id,
        } => dispatcher.set_variable_id(original_id.as_str(), new_id.as_str())?,
        ScriptStep::MoveNode { id, x, y } => {
            dispatcher.change_node_position(client.layout().clone(), id.as_str(), *x, *y)?
        }
        ScriptStep::SetFunction { id, function } => {
            dispatcher.set_variable_function(id.as_str(), function.as_str())?
        }
        ScriptStep::AddRegulation {
            source,
            target,
            sign,
            observable,
        } => dispatcher.add_regulation(source.as_str(), target.as_str(), *sign, *observable)?,
        ScriptStep::SetRegulationSign {
            source,
            target,
            sign,
        } => dispatcher.set_regulation_sign(source.as_str(), target.as_str(), *sign)?,
        ScriptStep::SetRegulationObservable {
            source,
            target,
            observable,
        } => dispatcher.set_regulation_observable(source.as_str(), target.as_str(), *observable)?,
        ScriptStep::AddDynamic { variant } => {
            let id = dispatcher.add_default_dynamic(*variant)?;
            info!(%id, "requested dynamic property");
        }
        ScriptStep::AddStatic { variant } => {
            let id = dispatcher.add_default_static(*variant)?;
            info!(%id, "requested static property");
        }
        ScriptStep::AddFunction => {
            let id = dispatcher.add_function()?;
            info!(%id, "added function definition");
        }
        ScriptStep::AddFunctionInput { function, variable } => {
            dispatcher.add_function_input(function.as_str(), variable.as_str())?
        }
        ScriptStep::RemoveVariable { id } => {
            report(client.remove_variable(id.as_str()).await?, "variable", id)
        }
        ScriptStep::RemoveRegulation { source, target } => report(
            client
                .remove_regulation(source.as_str(), target.as_str())
                .await?,
            "regulation",
            &format!("{source}{target}"),
        ),
        ScriptStep::RemoveDynamic { id } => report(
            client.remove_dynamic(id.as_str()).await?,
            "dynamic property",
            id,
        ),
        ScriptStep::RemoveStatic { id } => report(
            client.remove_static(id.as_str()).await?,
            "static property",
            id,
        ),
        ScriptStep::Refresh => client.bootstrap()?,
    }
    Ok(())
}

fn report(outcome: GateOutcome, kind: &str, id: &str) {
    match outcome {
        GateOutcome::Dispatched => info!(kind, id, "removal requested"),
        GateOutcome::Cancelled => info!(kind, id, "removal declined"),
        GateOutcome::AlreadyPending => info!(kind, id, "removal already awaiting an answer"),
    }
}

#[cfg(test)]
#[path = "tests/script_tests.rs"]
mod tests;
