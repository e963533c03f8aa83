//! In-memory stand-in for the authoritative model process.
//!
//! Consumes commands, applies them to its own canonical model and answers with
//! confirmations or refreshes. A rejected command produces no event at all.

use std::collections::{BTreeMap, HashMap};

use shared::{
    domain::{
        observable_from_wire, observable_to_wire, LayoutId, Monotonicity, NodePosition, PropertyId,
        VariableId,
    },
    error::ModelRejection,
    property::{DynamicProperty, StaticProperty},
    protocol::{
        ChangeIdData, LayoutNodeData, ModelCommand, ModelEvent, RegulationData, VariableData,
    },
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

type RegulationKey = (VariableId, VariableId);

#[derive(Debug, Default)]
pub struct InMemoryAuthority {
    variables: BTreeMap<VariableId, String>,
    regulations: BTreeMap<RegulationKey, RegulationData>,
    layouts: HashMap<LayoutId, BTreeMap<VariableId, NodePosition>>,
    dynamic: Vec<DynamicProperty>,
    statics: Vec<StaticProperty>,
}

impl InMemoryAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_variable(&self, id: &VariableId) -> bool {
        self.variables.contains_key(id)
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn regulation(&self, source: &VariableId, target: &VariableId) -> Option<&RegulationData> {
        self.regulations.get(&(source.clone(), target.clone()))
    }

    pub fn position(&self, layout: &LayoutId, variable: &VariableId) -> Option<NodePosition> {
        self.layouts.get(layout)?.get(variable).copied()
    }

    pub fn dynamic_properties(&self) -> &[DynamicProperty] {
        &self.dynamic
    }

    pub fn static_properties(&self) -> &[StaticProperty] {
        &self.statics
    }

    /// Applies one command and returns the events that confirm it, in the
    /// order they must be published.
    pub fn handle(&mut self, command: ModelCommand) -> Result<Vec<ModelEvent>, ModelRejection> {
        match command {
            ModelCommand::AddVariable { id, name, position } => {
                self.add_variable(id, name, position.layout, position.px, position.py)
            }
            ModelCommand::SetVariableId {
                original_id,
                new_id,
            } => self.set_variable_id(original_id, new_id),
            ModelCommand::SetVariableName { id, name } => {
                self.require_variable(&id)?;
                self.variables.insert(id.clone(), name.clone());
                Ok(vec![ModelEvent::VariableNameChanged(VariableData {
                    id,
                    name,
                })])
            }
            ModelCommand::RemoveVariable { id } => self.remove_variable(id),
            ModelCommand::ChangeNodePosition {
                layout,
                variable,
                px,
                py,
            } => {
                self.require_variable(&variable)?;
                self.layouts
                    .entry(layout.clone())
                    .or_default()
                    .insert(variable.clone(), NodePosition::new(px, py));
                Ok(vec![ModelEvent::NodePositionChanged(LayoutNodeData {
                    layout,
                    variable,
                    px,
                    py,
                })])
            }
            ModelCommand::AddRegulation {
                regulator,
                target,
                sign,
                observable,
            } => self.add_regulation(regulator, target, &sign, &observable),
            ModelCommand::SetRegulationObservable {
                regulator,
                target,
                observable,
            } => {
                let observable = observable_to_wire(observable_from_wire(&observable)).to_string();
                self.require_regulation(&regulator, &target)?.observable = observable.clone();
                Ok(vec![ModelEvent::RegulationObservableChanged {
                    regulator,
                    target,
                    observable,
                }])
            }
            ModelCommand::SetRegulationSign {
                regulator,
                target,
                sign,
            } => {
                let sign = Monotonicity::parse(&sign).as_wire().to_string();
                self.require_regulation(&regulator, &target)?.sign = sign.clone();
                Ok(vec![ModelEvent::RegulationSignChanged {
                    regulator,
                    target,
                    sign,
                }])
            }
            ModelCommand::RemoveRegulation { regulator, target } => {
                self.require_regulation(&regulator, &target)?;
                self.regulations.remove(&(regulator.clone(), target.clone()));
                Ok(vec![ModelEvent::RegulationRemoved { regulator, target }])
            }
            ModelCommand::AddDefaultDynamic { id, variant } => {
                require_id(&id)?;
                if self.dynamic.iter().any(|p| p.id == id) {
                    return Err(ModelRejection::conflict(format!(
                        "dynamic property '{id}' already exists"
                    )));
                }
                let property = DynamicProperty::default_for(id, variant);
                self.dynamic.push(property.clone());
                Ok(vec![ModelEvent::DynamicCreated(property)])
            }
            ModelCommand::AddDefaultStatic { id, variant } => {
                require_id(&id)?;
                if self.statics.iter().any(|p| p.id == id) {
                    return Err(ModelRejection::conflict(format!(
                        "static property '{id}' already exists"
                    )));
                }
                let property = StaticProperty::default_for(id, variant);
                self.statics.push(property.clone());
                Ok(vec![ModelEvent::StaticCreated(property)])
            }
            ModelCommand::SetDynamicContent { id, property } => {
                check_same_id(&id, &property.id)?;
                let slot = self
                    .dynamic
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| missing_property("dynamic", &id))?;
                *slot = property.clone();
                Ok(vec![ModelEvent::DynamicContentChanged(property)])
            }
            ModelCommand::SetStaticContent { id, property } => {
                check_same_id(&id, &property.id)?;
                let slot = self
                    .statics
                    .iter_mut()
                    .find(|p| p.id == id)
                    .ok_or_else(|| missing_property("static", &id))?;
                *slot = property.clone();
                Ok(vec![ModelEvent::StaticContentChanged(property)])
            }
            ModelCommand::RemoveDynamic { id } => {
                let before = self.dynamic.len();
                self.dynamic.retain(|p| p.id != id);
                if self.dynamic.len() == before {
                    return Err(missing_property("dynamic", &id));
                }
                Ok(vec![ModelEvent::DynamicRemoved { id }])
            }
            ModelCommand::RemoveStatic { id } => {
                let before = self.statics.len();
                self.statics.retain(|p| p.id != id);
                if self.statics.len() == before {
                    return Err(missing_property("static", &id));
                }
                Ok(vec![ModelEvent::StaticRemoved { id }])
            }
            ModelCommand::RefreshVariables => Ok(vec![ModelEvent::VariablesRefreshed {
                variables: self
                    .variables
                    .iter()
                    .map(|(id, name)| VariableData {
                        id: id.clone(),
                        name: name.clone(),
                    })
                    .collect(),
            }]),
            ModelCommand::RefreshLayoutNodes { layout } => {
                let nodes = self
                    .layouts
                    .get(&layout)
                    .map(|positions| {
                        positions
                            .iter()
                            .map(|(variable, position)| LayoutNodeData {
                                layout: layout.clone(),
                                variable: variable.clone(),
                                px: position.x,
                                py: position.y,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(vec![ModelEvent::LayoutNodesRefreshed { layout, nodes }])
            }
            ModelCommand::RefreshRegulations => Ok(vec![ModelEvent::RegulationsRefreshed {
                regulations: self.regulations.values().cloned().collect(),
            }]),
            ModelCommand::RefreshDynamicProps => Ok(vec![ModelEvent::DynamicPropsRefreshed {
                properties: self.dynamic.clone(),
            }]),
            ModelCommand::RefreshStaticProps => Ok(vec![ModelEvent::StaticPropsRefreshed {
                properties: self.statics.clone(),
            }]),
        }
    }

    fn add_variable(
        &mut self,
        id: VariableId,
        name: String,
        layout: LayoutId,
        px: f64,
        py: f64,
    ) -> Result<Vec<ModelEvent>, ModelRejection> {
        require_variable_id(&id)?;
        if self.variables.contains_key(&id) {
            return Err(ModelRejection::conflict(format!(
                "variable '{id}' already exists"
            )));
        }
        self.variables.insert(id.clone(), name.clone());
        self.layouts
            .entry(layout.clone())
            .or_default()
            .insert(id.clone(), NodePosition::new(px, py));
        Ok(vec![
            ModelEvent::VariableCreated(VariableData {
                id: id.clone(),
                name,
            }),
            ModelEvent::NodePositionChanged(LayoutNodeData {
                layout,
                variable: id,
                px,
                py,
            }),
        ])
    }

    fn set_variable_id(
        &mut self,
        original_id: VariableId,
        new_id: VariableId,
    ) -> Result<Vec<ModelEvent>, ModelRejection> {
        require_variable_id(&new_id)?;
        self.require_variable(&original_id)?;
        if self.variables.contains_key(&new_id) {
            return Err(ModelRejection::conflict(format!(
                "variable '{new_id}' already exists"
            )));
        }

        if let Some(name) = self.variables.remove(&original_id) {
            self.variables.insert(new_id.clone(), name);
        }
        for positions in self.layouts.values_mut() {
            if let Some(position) = positions.remove(&original_id) {
                positions.insert(new_id.clone(), position);
            }
        }
        let regulations = std::mem::take(&mut self.regulations);
        self.regulations = regulations
            .into_values()
            .map(|mut data| {
                if data.regulator == original_id {
                    data.regulator = new_id.clone();
                }
                if data.target == original_id {
                    data.target = new_id.clone();
                }
                ((data.regulator.clone(), data.target.clone()), data)
            })
            .collect();

        Ok(vec![ModelEvent::VariableIdChanged(ChangeIdData {
            original_id: original_id.0,
            new_id: new_id.0,
        })])
    }

    /// Regulations touching the variable are removed first, each with its own
    /// confirmation, then the variable itself.
    fn remove_variable(&mut self, id: VariableId) -> Result<Vec<ModelEvent>, ModelRejection> {
        self.require_variable(&id)?;
        let touching: Vec<RegulationKey> = self
            .regulations
            .keys()
            .filter(|(source, target)| source == &id || target == &id)
            .cloned()
            .collect();

        let mut events = Vec::with_capacity(touching.len() + 1);
        for key in touching {
            self.regulations.remove(&key);
            let (regulator, target) = key;
            events.push(ModelEvent::RegulationRemoved { regulator, target });
        }
        self.variables.remove(&id);
        for positions in self.layouts.values_mut() {
            positions.remove(&id);
        }
        events.push(ModelEvent::VariableRemoved { id });
        Ok(events)
    }

    fn add_regulation(
        &mut self,
        regulator: VariableId,
        target: VariableId,
        sign: &str,
        observable: &str,
    ) -> Result<Vec<ModelEvent>, ModelRejection> {
        self.require_variable(&regulator)?;
        self.require_variable(&target)?;
        let key = (regulator.clone(), target.clone());
        if self.regulations.contains_key(&key) {
            return Err(ModelRejection::conflict(format!(
                "regulation '{regulator}' -> '{target}' already exists"
            )));
        }
        let data = RegulationData {
            regulator,
            target,
            sign: Monotonicity::parse(sign).as_wire().to_string(),
            observable: observable_to_wire(observable_from_wire(observable)).to_string(),
        };
        self.regulations.insert(key, data.clone());
        Ok(vec![ModelEvent::RegulationCreated(data)])
    }

    fn require_variable(&self, id: &VariableId) -> Result<(), ModelRejection> {
        if self.variables.contains_key(id) {
            Ok(())
        } else {
            Err(ModelRejection::not_found(format!("variable '{id}' not found")))
        }
    }

    fn require_regulation(
        &mut self,
        regulator: &VariableId,
        target: &VariableId,
    ) -> Result<&mut RegulationData, ModelRejection> {
        self.regulations
            .get_mut(&(regulator.clone(), target.clone()))
            .ok_or_else(|| {
                ModelRejection::not_found(format!(
                    "regulation '{regulator}' -> '{target}' not found"
                ))
            })
    }

    /// Drains commands until every client handle is gone, publishing the
    /// confirmations of each accepted command. Returns the final model.
    pub async fn serve(
        mut self,
        mut commands: mpsc::UnboundedReceiver<ModelCommand>,
        events: broadcast::Sender<ModelEvent>,
    ) -> Self {
        info!("authority serving commands");
        while let Some(command) = commands.recv().await {
            let name = command.name();
            match self.handle(command) {
                Ok(confirmations) => {
                    for event in confirmations {
                        let event_name = event.name();
                        if events.send(event).is_err() {
                            debug!(command = name, event = event_name, "no listeners for event");
                        }
                    }
                }
                Err(rejection) => {
                    warn!(
                        command = name,
                        code = ?rejection.code,
                        message = %rejection.message,
                        "command rejected"
                    );
                }
            }
        }
        info!("command channel closed; authority stopped");
        self
    }
}

fn require_variable_id(id: &VariableId) -> Result<(), ModelRejection> {
    if id.is_empty() {
        return Err(ModelRejection::validation("variable id must not be empty"));
    }
    Ok(())
}

fn require_id(id: &PropertyId) -> Result<(), ModelRejection> {
    if id.is_empty() {
        return Err(ModelRejection::validation("property id must not be empty"));
    }
    Ok(())
}

fn check_same_id(id: &PropertyId, payload: &PropertyId) -> Result<(), ModelRejection> {
    if id != payload {
        return Err(ModelRejection::validation(format!(
            "property payload id '{payload}' does not match '{id}'"
        )));
    }
    Ok(())
}

fn missing_property(family: &str, id: &PropertyId) -> ModelRejection {
    ModelRejection::not_found(format!("{family} property '{id}' not found"))
}
