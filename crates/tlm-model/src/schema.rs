//! Model file schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tlm_core::Real;
use tlm_sim::SimOptions;

/// A component system as stored in a model file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDef {
    pub name: String,
    #[serde(default)]
    pub options: SimOptions,
    /// System parameters, usable by name in component parameters.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Real>,
    /// System ports. Only meaningful for models used as subsystems.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    #[serde(default)]
    pub connections: Vec<ConnectionDef>,
}

impl ModelDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: SimOptions::default(),
            parameters: BTreeMap::new(),
            ports: Vec::new(),
            components: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn component(&self, name: &str) -> Option<&ComponentDef> {
        self.components.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentDef {
    pub name: String,
    /// Factory key, e.g. `HydraulicVolume`. Left out for subsystems.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParamValue>,
    /// Start values per port and slot, e.g. `P1: { Pressure: 2e5 }`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub start_values: BTreeMap<String, BTreeMap<String, Real>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    /// Inner model of a subsystem component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<Box<ModelDef>>,
    /// Desired subsystem timestep; the parent's timestep when left out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestep: Option<Real>,
}

impl ComponentDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            parameters: BTreeMap::new(),
            start_values: BTreeMap::new(),
            disabled: false,
            subsystem: None,
            timestep: None,
        }
    }

    pub fn subsystem(name: impl Into<String>, model: ModelDef) -> Self {
        Self {
            name: name.into(),
            type_name: None,
            parameters: BTreeMap::new(),
            start_values: BTreeMap::new(),
            disabled: false,
            subsystem: Some(Box::new(model)),
            timestep: None,
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn with_start_value(mut self, port: &str, slot: &str, value: Real) -> Self {
        self.start_values
            .entry(port.to_string())
            .or_default()
            .insert(slot.to_string(), value);
        self
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// A parameter given as a number or as text (a literal or a system
/// parameter name).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Number(Real),
    Text(String),
}

impl ParamValue {
    /// Text form handed to the component's parameter set.
    pub fn to_text(&self) -> String {
        match self {
            ParamValue::Number(v) => v.to_string(),
            ParamValue::Text(s) => s.clone(),
        }
    }
}

impl From<Real> for ParamValue {
    fn from(v: Real) -> Self {
        ParamValue::Number(v)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

/// Connection between two endpoints.
///
/// An endpoint is `<component>.<port>`, or the bare name of a system port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionDef {
    pub from: String,
    pub to: String,
}

impl ConnectionDef {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Parsed connection endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Port { component: &'a str, port: &'a str },
    SystemPort(&'a str),
}

impl<'a> Endpoint<'a> {
    pub fn parse(text: &'a str) -> Self {
        match text.split_once('.') {
            Some((component, port)) => Endpoint::Port { component, port },
            None => Endpoint::SystemPort(text),
        }
    }
}

impl fmt::Display for Endpoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Port { component, port } => write!(f, "{component}.{port}"),
            Endpoint::SystemPort(name) => write!(f, "{name}"),
        }
    }
}
