//! Pre-simulation model checks.

use crate::error::GraphError;
use crate::port::{CqsType, PortKey, PortKind};
use crate::topology::Topology;
use tlm_core::CompId;

impl Topology {
    /// Collect every problem that prevents simulation.
    ///
    /// `is_active` filters out disabled components: their unconnected
    /// required ports and causality are not checked.
    pub fn check_model(&self, is_active: impl Fn(CompId) -> bool) -> Vec<GraphError> {
        let mut issues = Vec::new();

        for comp in self.component_ids() {
            if !is_active(comp) {
                continue;
            }
            if self.cqs(comp).is_ok_and(|c| c == CqsType::Undefined) {
                issues.push(GraphError::UndefinedCqs { comp });
            }
            let Ok(ports) = self.component_ports(comp) else {
                continue;
            };
            for (idx, port) in ports.iter().enumerate() {
                if port.spec.required && !port.is_connected() {
                    issues.push(GraphError::RequiredPortUnconnected {
                        port: PortKey::component(comp, idx),
                        name: port.spec.name.clone(),
                    });
                }
            }
        }

        for (node, entry) in self.nodes() {
            if entry.node_type.is_signal() {
                continue;
            }
            let mut power = entry.members().iter().filter(|key| {
                self.port(**key)
                    .is_ok_and(|p| p.spec.kind.is_power() || p.spec.kind == PortKind::System)
            });
            let first = power.next();
            if power.next().is_none() {
                let port = first.or(entry.members().first()).copied();
                if let Some(port) = port {
                    issues.push(GraphError::LonelyPowerPort { node, port });
                }
            }
        }

        issues
    }
}
