//! Port and parameter declaration.

use crate::parameter::{ParamIdx, ParamKind, ParameterSet};
use tlm_core::Real;
use tlm_graph::{NodeType, PortKind, PortSpec};

/// Index of a port within its component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PortIdx(pub usize);

/// Collects the ports and parameters a component declares in
/// [`Component::configure`](crate::Component::configure).
///
/// Every power and write port gets one start-value parameter per user-settable
/// slot, named `<port>#<Slot>`.
#[derive(Debug, Default)]
pub struct Configurator {
    ports: Vec<PortSpec>,
    params: ParameterSet,
    problems: Vec<String>,
}

impl Configurator {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_port(&mut self, spec: PortSpec, start_values: bool) -> PortIdx {
        if self.ports.iter().any(|p| p.name == spec.name) {
            self.problems
                .push(format!("Port name {} is already in use", spec.name));
        }
        let idx = self.ports.len();
        if start_values && let Some(node_type) = spec.node_type {
            for slot in node_type.start_value_slots() {
                let info = &node_type.slots()[slot];
                self.params.add(
                    format!("{}#{}", spec.name, info.name),
                    format!("Start value for {}", info.name),
                    info.unit,
                    info.default,
                    ParamKind::StartValue { port: idx, slot },
                );
            }
        }
        self.ports.push(spec);
        PortIdx(idx)
    }

    pub fn add_power_port(&mut self, name: &str, node_type: NodeType) -> PortIdx {
        self.add_port(PortSpec::new(name, PortKind::Power, node_type), true)
    }

    pub fn add_power_multi_port(&mut self, name: &str, node_type: NodeType) -> PortIdx {
        self.add_port(PortSpec::new(name, PortKind::PowerMulti, node_type), false)
    }

    pub fn add_read_port(&mut self, name: &str, node_type: NodeType) -> PortIdx {
        self.add_port(PortSpec::new(name, PortKind::Read, node_type), false)
    }

    pub fn add_read_multi_port(&mut self, name: &str, node_type: NodeType) -> PortIdx {
        self.add_port(PortSpec::new(name, PortKind::ReadMulti, node_type), false)
    }

    pub fn add_write_port(&mut self, name: &str, node_type: NodeType) -> PortIdx {
        self.add_port(PortSpec::new(name, PortKind::Write, node_type), true)
    }

    /// Add an already built port declaration (used by subsystems).
    pub fn add_port_spec(&mut self, spec: PortSpec) -> PortIdx {
        let start_values = matches!(spec.kind, PortKind::Power | PortKind::Write);
        self.add_port(spec, start_values)
    }

    /// Optional signal input. When unconnected it reads its start value,
    /// which is exposed as a parameter named `name`.
    pub fn add_input_variable(
        &mut self,
        name: &str,
        description: &str,
        unit: &str,
        default: Real,
    ) -> PortIdx {
        let port = self.add_port(
            PortSpec::new(name, PortKind::Read, NodeType::Signal)
                .not_required()
                .with_description(description),
            false,
        );
        self.params.add(
            name,
            description,
            unit,
            default,
            ParamKind::StartValue {
                port: port.0,
                slot: 0,
            },
        );
        port
    }

    /// Optional signal output.
    pub fn add_output_variable(&mut self, name: &str, description: &str) -> PortIdx {
        self.add_port(
            PortSpec::new(name, PortKind::Write, NodeType::Signal)
                .not_required()
                .with_description(description),
            false,
        )
    }

    pub fn set_not_required(&mut self, port: PortIdx) {
        if let Some(p) = self.ports.get_mut(port.0) {
            p.required = false;
        }
    }

    pub fn set_port_description(&mut self, port: PortIdx, description: &str) {
        if let Some(p) = self.ports.get_mut(port.0) {
            p.description = description.to_string();
        }
    }

    pub fn add_parameter(
        &mut self,
        name: &str,
        description: &str,
        unit: &str,
        default: Real,
    ) -> ParamIdx {
        if self.params.find(name).is_some() {
            self.problems
                .push(format!("Parameter name {} is already in use", name));
        }
        self.params
            .add(name, description, unit, default, ParamKind::Constant)
    }

    /// Free-text parameter, read with [`SimContext::param_text`](crate::SimContext::param_text).
    pub fn add_text_parameter(&mut self, name: &str, description: &str, default: &str) -> ParamIdx {
        if self.params.find(name).is_some() {
            self.problems
                .push(format!("Parameter name {} is already in use", name));
        }
        self.params.add_text(name, description, default)
    }

    pub fn ports(&self) -> &[PortSpec] {
        &self.ports
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Declaration problems (duplicate names).
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    pub fn finish(self) -> (Vec<PortSpec>, ParameterSet, Vec<String>) {
        (self.ports, self.params, self.problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_port_registers_start_values() {
        let mut cfg = Configurator::new();
        let p1 = cfg.add_power_port("P1", NodeType::Hydraulic);
        assert_eq!(p1, PortIdx(0));
        let names: Vec<&str> = cfg.params().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["P1#Flow", "P1#Pressure"]);
        assert_eq!(cfg.params().get("P1#Pressure").unwrap().value(), 1e5);
    }

    #[test]
    fn input_variable_is_optional_read_port_with_alias() {
        let mut cfg = Configurator::new();
        let k = cfg.add_input_variable("k", "Gain", "-", 2.5);
        let spec = &cfg.ports()[k.0];
        assert_eq!(spec.kind, PortKind::Read);
        assert!(!spec.required);
        let param = cfg.params().get("k").unwrap();
        assert_eq!(param.kind, ParamKind::StartValue { port: 0, slot: 0 });
        assert_eq!(param.value(), 2.5);
    }

    #[test]
    fn duplicate_names_are_problems() {
        let mut cfg = Configurator::new();
        cfg.add_power_port("P1", NodeType::Hydraulic);
        cfg.add_power_port("P1", NodeType::Hydraulic);
        cfg.add_parameter("a", "", "", 1.0);
        cfg.add_parameter("a", "", "", 1.0);
        assert_eq!(cfg.problems().len(), 2);
    }
}
