//! Model validation logic.
//!
//! Checks that need nothing but the model description. Connection rules and
//! parameter evaluation are left to the component system when it is built.

use crate::schema::{Endpoint, ModelDef};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

pub fn validate_model(model: &ModelDef) -> Result<(), ValidationError> {
    model
        .options
        .validate()
        .map_err(|e| ValidationError::InvalidValue {
            field: format!("{}.options", model.name),
            value: String::new(),
            reason: e.to_string(),
        })?;

    let mut ports = HashSet::new();
    for port in &model.ports {
        if port.is_empty() || port.contains('.') {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.ports", model.name),
                value: port.clone(),
                reason: "port names must be non-empty and contain no '.'".into(),
            });
        }
        if !ports.insert(port.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: port.clone(),
                context: format!("{} ports", model.name),
            });
        }
    }

    let mut names = HashSet::new();
    for comp in &model.components {
        if comp.name.is_empty() || comp.name.contains('.') {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.components", model.name),
                value: comp.name.clone(),
                reason: "component names must be non-empty and contain no '.'".into(),
            });
        }
        if !names.insert(comp.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: comp.name.clone(),
                context: format!("{} components", model.name),
            });
        }
        match (&comp.type_name, &comp.subsystem) {
            (Some(_), None) => {}
            (None, Some(inner)) => validate_model(inner)?,
            (Some(t), Some(_)) if t == "Subsystem" => {}
            (Some(t), Some(_)) => {
                return Err(ValidationError::InvalidValue {
                    field: format!("{}.type", comp.name),
                    value: t.clone(),
                    reason: "a component with a subsystem must not name another type".into(),
                });
            }
            (None, None) => {
                return Err(ValidationError::InvalidValue {
                    field: format!("{}.type", comp.name),
                    value: String::new(),
                    reason: "type or subsystem is required".into(),
                });
            }
        }
        if let Some(ts) = comp.timestep
            && !(ts.is_finite() && ts > 0.0)
        {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.timestep", comp.name),
                value: ts.to_string(),
                reason: "timestep must be positive".into(),
            });
        }
    }

    for conn in &model.connections {
        let from = Endpoint::parse(&conn.from);
        let to = Endpoint::parse(&conn.to);
        for end in [from, to] {
            let known = match end {
                Endpoint::Port { component, .. } => names.contains(component),
                Endpoint::SystemPort(port) => ports.contains(port),
            };
            if !known {
                return Err(ValidationError::MissingReference {
                    name: end.to_string(),
                    context: format!("{} connections", model.name),
                });
            }
        }
        if matches!(
            (from, to),
            (Endpoint::SystemPort(_), Endpoint::SystemPort(_))
        ) {
            return Err(ValidationError::InvalidValue {
                field: format!("{} connections", model.name),
                value: format!("{} -> {}", conn.from, conn.to),
                reason: "system ports can only connect to component ports".into(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ComponentDef, ConnectionDef};

    fn two_volumes() -> ModelDef {
        let mut model = ModelDef::new("Test");
        model.components = vec![
            ComponentDef::new("V1", "HydraulicVolume"),
            ComponentDef::new("Orifice", "HydraulicLaminarOrifice"),
        ];
        model.connections = vec![ConnectionDef::new("V1.P2", "Orifice.P1")];
        model
    }

    #[test]
    fn valid_model_passes() {
        validate_model(&two_volumes()).unwrap();
    }

    #[test]
    fn duplicate_component_names_are_rejected() {
        let mut model = two_volumes();
        model.components.push(ComponentDef::new("V1", "HydraulicTank"));
        assert!(matches!(
            validate_model(&model),
            Err(ValidationError::DuplicateName { .. })
        ));
    }

    #[test]
    fn unknown_endpoints_are_rejected() {
        let mut model = two_volumes();
        model.connections.push(ConnectionDef::new("V2.P1", "Orifice.P2"));
        let err = validate_model(&model).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingReference {
                name: "V2.P1".into(),
                context: "Test connections".into()
            }
        );

        let mut model = two_volumes();
        model.connections.push(ConnectionDef::new("A", "Orifice.P2"));
        assert!(validate_model(&model).is_err());
        model.ports.push("A".into());
        validate_model(&model).unwrap();
    }

    #[test]
    fn component_needs_type_or_subsystem() {
        let mut model = two_volumes();
        model.components[0].type_name = None;
        assert!(validate_model(&model).is_err());

        model.components[0].subsystem = Some(Box::new(ModelDef::new("Inner")));
        validate_model(&model).unwrap();
    }

    #[test]
    fn bad_options_are_rejected() {
        let mut model = two_volumes();
        model.options.timestep = 0.0;
        assert!(matches!(
            validate_model(&model),
            Err(ValidationError::InvalidValue { .. })
        ));
    }
}
