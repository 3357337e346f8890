//! Building a component system from a model description.

use crate::schema::{ComponentDef, ConnectionDef, Endpoint, ModelDef};
use crate::{ModelError, ModelResult};
use tlm_sim::{ComponentSystem, Engine};
use tracing::{debug, info, warn};

/// Build `model` into a new system through `engine`'s factory.
///
/// The model is not validated here; use [`crate::validate_model`] or the
/// loading functions for that. Options are applied to the returned system.
pub fn build_system(engine: &Engine, model: &ModelDef) -> ModelResult<ComponentSystem> {
    info!(
        model = %model.name,
        components = model.components.len(),
        connections = model.connections.len(),
        "building model"
    );
    let mut system = engine.create_system(&model.name);
    system.set_options(&model.options)?;
    for (name, value) in &model.parameters {
        system.set_system_parameter(name, *value);
    }
    for port in &model.ports {
        system.add_system_port(port)?;
    }
    for comp in &model.components {
        add_component(engine, &mut system, comp)?;
    }
    for conn in &model.connections {
        connect(&mut system, conn)?;
    }
    debug!(model = %model.name, "model built");
    Ok(system)
}

fn add_component(engine: &Engine, system: &mut ComponentSystem, def: &ComponentDef) -> ModelResult<()> {
    let name = match &def.subsystem {
        Some(inner) => {
            let mut sub = build_system(engine, inner)?;
            if let Some(ts) = def.timestep {
                sub.set_timestep(ts)?;
            }
            system.add_subsystem(&def.name, sub)
        }
        None => {
            let type_name = def.type_name.as_deref().unwrap_or_default();
            engine.add_component(system, type_name, &def.name)?
        }
    };
    if name != def.name {
        warn!(requested = %def.name, name = %name, "component was renamed");
        return Err(ModelError::NameTaken {
            name: def.name.clone(),
        });
    }
    for (param, value) in &def.parameters {
        system.set_parameter(&name, param, &value.to_text())?;
    }
    for (port, slots) in &def.start_values {
        for (slot, value) in slots {
            system.set_start_value(&name, port, slot, *value)?;
        }
    }
    if def.disabled {
        system.set_disabled(&name, true)?;
    }
    Ok(())
}

fn connect(system: &mut ComponentSystem, conn: &ConnectionDef) -> ModelResult<()> {
    match (Endpoint::parse(&conn.from), Endpoint::parse(&conn.to)) {
        (Endpoint::Port { component: a, port: ap }, Endpoint::Port { component: b, port: bp }) => {
            system.connect(a, ap, b, bp)?;
        }
        (Endpoint::SystemPort(s), Endpoint::Port { component, port })
        | (Endpoint::Port { component, port }, Endpoint::SystemPort(s)) => {
            system.connect_system_port(s, component, port)?;
        }
        (Endpoint::SystemPort(_), Endpoint::SystemPort(_)) => {
            return Err(ModelError::BadConnection {
                from: conn.from.clone(),
                to: conn.to.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ConnectionDef;
    use tlm_sim::SimError;

    fn source_and_tank() -> ModelDef {
        let mut model = ModelDef::new("Pipe");
        model.components = vec![
            ComponentDef::new("Source", "HydraulicFlowSourceQ").with_param("q", 1e-4),
            ComponentDef::new("Tank", "HydraulicTank").with_param("p", "pTank"),
        ];
        model.parameters.insert("pTank".into(), 2e5);
        model.connections = vec![ConnectionDef::new("Source.P1", "Tank.P1")];
        model
    }

    #[test]
    fn builds_components_parameters_and_connections() {
        let engine = Engine::new();
        let system = build_system(&engine, &source_and_tank()).unwrap();
        assert_eq!(system.name(), "Pipe");
        assert_eq!(system.component_names(), vec!["Source", "Tank"]);
        assert_eq!(system.parameter("Tank", "p").unwrap().text(), "pTank");
        assert_eq!(system.system_parameter("pTank"), Some(2e5));
        assert!(system.node_of("Source", "P1").is_some());
        assert_eq!(system.node_of("Source", "P1"), system.node_of("Tank", "P1"));
    }

    #[test]
    fn unknown_type_fails() {
        let engine = Engine::new();
        let mut model = source_and_tank();
        model.components[0].type_name = Some("NoSuchThing".into());
        assert!(matches!(
            build_system(&engine, &model),
            Err(ModelError::Sim(SimError::UnknownComponentType { .. }))
        ));
    }

    #[test]
    fn unknown_parameter_fails() {
        let engine = Engine::new();
        let mut model = source_and_tank();
        model.components[1] = ComponentDef::new("Tank", "HydraulicTank").with_param("volume", 1.0);
        assert!(matches!(build_system(&engine, &model), Err(ModelError::Sim(_))));
    }

    #[test]
    fn start_values_and_disabled_flag_are_applied() {
        let engine = Engine::new();
        let mut model = source_and_tank();
        model.components[0] = ComponentDef::new("Source", "HydraulicFlowSourceQ")
            .with_start_value("P1", "Pressure", 3e5);
        model.components[0].disabled = true;
        let system = build_system(&engine, &model).unwrap();
        assert_eq!(system.is_disabled("Source"), Some(true));
        assert_eq!(system.parameter("Source", "P1#Pressure").unwrap().text(), "300000");
    }
}
