//! A component system used as a component of another system.
//!
//! The subsystem's ports are its inner system ports. Each parent step it
//! copies the boundary node values in, runs the inner system up to the
//! parent time and copies its results back out.

use crate::system::{ComponentSystem, SimOutcome};
use std::collections::BTreeSet;
use tlm_components::{Component, ComponentError, ComponentResult, Configurator, PortIdx, SimContext};
use tlm_core::Real;
use tlm_graph::{CqsType, NodeType, PortKey, PortKind, PortSpec, SlotHandle, SlotKind};

#[derive(Debug, Clone)]
struct BoundaryPort {
    name: String,
    kind: PortKind,
    node_type: Option<NodeType>,
    outer: Option<SlotHandle>,
    inner: Option<SlotHandle>,
    copy_in: Vec<usize>,
    copy_out: Vec<usize>,
}

/// Slots copied into and out of the subsystem for one boundary port.
///
/// A C-type subsystem receives flow and intensity and returns wave
/// variables and impedances; a Q-type subsystem the other way round. Read
/// ports only copy in and write ports only copy out.
fn copy_slots(kind: PortKind, cqs: CqsType, node_type: NodeType) -> (Vec<usize>, Vec<usize>) {
    let all: Vec<usize> = (0..node_type.num_slots()).collect();
    match kind {
        PortKind::Power | PortKind::PowerMulti => {
            let (tlm, other): (Vec<usize>, Vec<usize>) = all
                .into_iter()
                .partition(|s| node_type.slots()[*s].kind == SlotKind::Tlm);
            if cqs == CqsType::C {
                (other, tlm)
            } else {
                (tlm, other)
            }
        }
        PortKind::Write => (Vec::new(), all),
        _ => (all, Vec::new()),
    }
}

/// Boundary ports and causality derived from the inner connections.
fn boundary(system: &ComponentSystem) -> (Vec<BoundaryPort>, CqsType) {
    let topo = system.topology();
    let mut causalities = BTreeSet::new();
    let mut ports = Vec::new();
    for (i, entry) in topo.system_ports().iter().enumerate() {
        let key = PortKey::system(i);
        let inner: Vec<(PortKind, Option<CqsType>)> = topo
            .connected_ports(key)
            .iter()
            .filter_map(|k| Some((topo.port(*k).ok()?.spec.kind, topo.owner_cqs(*k))))
            .collect();
        let kind = if inner.iter().any(|(k, _)| k.is_power()) {
            PortKind::Power
        } else if inner.iter().any(|(k, _)| *k == PortKind::Write) {
            PortKind::Write
        } else {
            PortKind::Read
        };
        causalities.extend(
            inner
                .iter()
                .filter(|(k, _)| k.is_power())
                .filter_map(|(_, cqs)| *cqs),
        );
        ports.push(BoundaryPort {
            name: entry.spec.name.clone(),
            kind,
            node_type: topo.node_type_of(key).ok().flatten(),
            outer: None,
            inner: None,
            copy_in: Vec::new(),
            copy_out: Vec::new(),
        });
    }
    let cqs = match causalities.len() {
        0 => CqsType::S,
        1 => causalities.pop_first().unwrap_or(CqsType::Undefined),
        _ => CqsType::Undefined,
    };
    (ports, cqs)
}

/// Wraps a [`ComponentSystem`] so it can be added to a parent system.
///
/// Build the inner system completely before wrapping it: ports and
/// causality are taken from its system ports when the subsystem is created.
#[derive(Debug)]
pub struct Subsystem {
    system: ComponentSystem,
    ports: Vec<BoundaryPort>,
    cqs: CqsType,
}

impl Subsystem {
    pub fn new(mut system: ComponentSystem) -> Self {
        system.settings.num_log_samples = 0;
        system.settings.threads = None;
        let (ports, cqs) = boundary(&system);
        Self { system, ports, cqs }
    }

    pub fn system(&self) -> &ComponentSystem {
        &self.system
    }

    pub fn system_mut(&mut self) -> &mut ComponentSystem {
        &mut self.system
    }

    fn fail(&self, err: impl std::fmt::Display) -> ComponentError {
        ComponentError::Subsystem {
            name: self.system.name().to_string(),
            message: err.to_string(),
        }
    }

    fn copy_in(&self, ctx: &SimContext<'_>) {
        let arena = self.system.arena();
        for p in &self.ports {
            let (Some(outer), Some(inner)) = (p.outer, p.inner) else {
                continue;
            };
            for &s in &p.copy_in {
                arena.set(inner.offset(s), ctx.read(outer.offset(s)));
            }
        }
    }

    fn copy_out(&self, ctx: &SimContext<'_>) {
        let arena = self.system.arena();
        for p in &self.ports {
            let (Some(outer), Some(inner)) = (p.outer, p.inner) else {
                continue;
            };
            for &s in &p.copy_out {
                ctx.write(outer.offset(s), arena.get(inner.offset(s)));
            }
        }
    }

    /// Inner timestep: the desired one, clamped to the parent's.
    fn inner_timestep(&self, ctx: &SimContext<'_>) -> Real {
        let parent = ctx.timestep();
        match self.system.desired_timestep() {
            Some(ts) if ts > parent => {
                ctx.add_warning_message(format!(
                    "Subsystem timestep {ts} is larger than the parent timestep, using {parent}"
                ));
                parent
            }
            Some(ts) => ts,
            None => parent,
        }
    }
}

impl Component for Subsystem {
    fn type_name(&self) -> &'static str {
        "Subsystem"
    }

    fn cqs_type(&self) -> CqsType {
        self.cqs
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        for p in &self.ports {
            let spec = match p.node_type {
                Some(t) => PortSpec::new(p.name.as_str(), p.kind, t),
                None => PortSpec::system(p.name.as_str()),
            };
            cfg.add_port_spec(spec);
        }
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let timestep = self.inner_timestep(ctx);
        self.system.use_timestep(timestep);
        self.system
            .initialize(ctx.time(), ctx.time())
            .map_err(|e| self.fail(e))?;

        let cqs = self.cqs;
        for (i, p) in self.ports.iter_mut().enumerate() {
            p.outer = ctx.slot_handle(PortIdx(i), 0, 0).ok();
            p.inner = self.system.system_port_block(i);
            let (copy_in, copy_out) = match p.node_type {
                Some(t) => copy_slots(p.kind, cqs, t),
                None => (Vec::new(), Vec::new()),
            };
            p.copy_in = copy_in;
            p.copy_out = copy_out;
        }
        self.copy_out(ctx);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        self.copy_in(ctx);
        match self.system.simulate(ctx.time()) {
            Ok(SimOutcome::Finished) => {}
            Ok(SimOutcome::Stopped { at }) => {
                ctx.stop_simulation(&format!(
                    "Subsystem {} was stopped at t={at}",
                    self.system.name()
                ));
            }
            Err(e) => {
                ctx.add_error_message(e.to_string());
                ctx.stop_simulation("");
            }
        }
        self.copy_out(ctx);
    }

    fn finalize(&mut self, ctx: &SimContext<'_>) {
        if let Err(e) = self.system.finalize() {
            ctx.add_warning_message(e.to_string());
        }
    }

    fn check_model(&self) -> Vec<String> {
        self.system
            .check_model_before_simulation()
            .into_iter()
            .map(|p| format!("{}: {}", self.system.name(), p))
            .collect()
    }
}

impl ComponentSystem {
    /// Add a finished system as a subsystem component.
    pub fn add_subsystem(&mut self, name: &str, system: ComponentSystem) -> String {
        let name = if name.is_empty() { system.name().to_string() } else { name.to_string() };
        self.add_component(&name, Box::new(Subsystem::new(system)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_subsystem_receives_flow_and_returns_waves() {
        let (cin, cout) = copy_slots(PortKind::Power, CqsType::C, NodeType::Hydraulic);
        assert_eq!(cin, vec![0, 1, 2, 5]);
        assert_eq!(cout, vec![3, 4]);
        let (qin, qout) = copy_slots(PortKind::Power, CqsType::Q, NodeType::Hydraulic);
        assert_eq!((qin, qout), (cout, cin));
    }

    #[test]
    fn signal_ports_copy_one_way() {
        assert_eq!(
            copy_slots(PortKind::Read, CqsType::S, NodeType::Signal),
            (vec![0], vec![])
        );
        assert_eq!(
            copy_slots(PortKind::Write, CqsType::S, NodeType::Signal),
            (vec![], vec![0])
        );
    }
}
