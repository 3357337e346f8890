//! Stand-alone rig for stepping a single component in unit tests.

use crate::configure::{Configurator, PortIdx};
use crate::context::{ResolvedPort, SimContext, StepEnv};
use crate::error::ComponentResult;
use crate::parameter::ParameterSet;
use crate::traits::Component;
use std::sync::atomic::AtomicBool;
use tlm_core::{MessageHandler, Real};
use tlm_graph::{NodeArena, NodeSlot, PortSpec};

pub(crate) struct Rig {
    pub arena: NodeArena,
    pub messages: MessageHandler,
    pub stop: AtomicBool,
    pub specs: Vec<PortSpec>,
    pub ports: Vec<ResolvedPort>,
    pub params: ParameterSet,
    pub time: Real,
    pub timestep: Real,
}

impl Rig {
    /// Configure `comp` and give every single port its own node block.
    /// Multiports start with no connections.
    pub fn new(comp: &mut dyn Component, timestep: Real) -> Self {
        let mut cfg = Configurator::new();
        comp.configure(&mut cfg);
        let (specs, params, problems) = cfg.finish();
        assert!(problems.is_empty(), "{problems:?}");

        let mut arena = NodeArena::new();
        let ports = specs
            .iter()
            .map(|spec| {
                let node_type = spec.node_type;
                let blocks = match node_type {
                    Some(t) if !spec.kind.is_multi() => vec![arena.allocate(&t.default_values())],
                    _ => Vec::new(),
                };
                ResolvedPort {
                    name: spec.name.clone(),
                    node_type,
                    connected: blocks.len(),
                    blocks,
                }
            })
            .collect();
        Self {
            arena,
            messages: MessageHandler::new(),
            stop: AtomicBool::new(false),
            specs,
            ports,
            params,
            time: 0.0,
            timestep,
        }
    }

    /// Add `n` connections to a multiport.
    pub fn connect_multi(&mut self, port: PortIdx, n: usize) {
        let t = self.ports[port.0].node_type.unwrap();
        for _ in 0..n {
            let block = self.arena.allocate(&t.default_values());
            self.ports[port.0].blocks.push(block);
            self.ports[port.0].connected += 1;
        }
    }

    pub fn disconnect(&mut self, port: PortIdx) {
        self.ports[port.0].connected = 0;
    }

    pub fn set_param(&mut self, name: &str, text: &str) {
        self.params.set_text(name, text).unwrap();
    }

    pub fn ctx(&self) -> SimContext<'_> {
        let env = StepEnv {
            arena: &self.arena,
            messages: &self.messages,
            stop: &self.stop,
            time: self.time,
            timestep: self.timestep,
        };
        SimContext::new(env, "Comp", &self.ports, &self.params)
    }

    /// Load start values into single-port blocks, then initialize.
    pub fn initialize(&mut self, comp: &mut dyn Component) -> ComponentResult<()> {
        self.params.evaluate(&|_| None)?;
        for (idx, port) in self.ports.iter().enumerate() {
            let (Some(t), false) = (port.node_type, self.specs[idx].kind.is_multi()) else {
                continue;
            };
            let mut values = t.default_values();
            for (slot, v) in self.params.start_values(idx) {
                values[slot] = v;
            }
            t.apply_special_start_values(&mut values);
            self.arena.write_block(port.blocks[0], &values);
        }
        let ctx = self.ctx();
        comp.initialize(&ctx)
    }

    pub fn step(&mut self, comp: &mut dyn Component) {
        self.time += self.timestep;
        let ctx = self.ctx();
        comp.simulate_one_timestep(&ctx);
    }

    pub fn get<S: NodeSlot>(&self, port: PortIdx, slot: S) -> Real {
        self.get_sub(port, 0, slot)
    }

    pub fn set<S: NodeSlot>(&self, port: PortIdx, slot: S, value: Real) {
        self.set_sub(port, 0, slot, value);
    }

    pub fn get_sub<S: NodeSlot>(&self, port: PortIdx, sub: usize, slot: S) -> Real {
        self.arena
            .get(self.ports[port.0].blocks[sub].offset(slot.index()))
    }

    pub fn set_sub<S: NodeSlot>(&self, port: PortIdx, sub: usize, slot: S, value: Real) {
        self.arena
            .set(self.ports[port.0].blocks[sub].offset(slot.index()), value);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(std::sync::atomic::Ordering::Acquire)
    }
}
