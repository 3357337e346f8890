//! Integration tests for tlm-components wired by hand through shared node blocks.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tlm_components::{
    Component, Configurator, Factory, ParameterSet, ResolvedPort, SimContext, StepEnv,
    register_default_components,
};
use tlm_core::{MessageHandler, Real};
use tlm_graph::node::{Hydraulic, Signal};
use tlm_graph::{NodeArena, NodeSlot, NodeType, SlotHandle};

struct Bound {
    comp: Box<dyn Component>,
    ports: Vec<ResolvedPort>,
    params: ParameterSet,
}

impl Bound {
    fn new(factory: &Factory, key: &str, blocks: &[(NodeType, SlotHandle)]) -> Self {
        let mut comp = factory.create(key).unwrap();
        let mut cfg = Configurator::new();
        comp.configure(&mut cfg);
        let (specs, mut params, problems) = cfg.finish();
        assert!(problems.is_empty(), "{problems:?}");
        assert_eq!(specs.len(), blocks.len(), "{key}");
        params.evaluate(&|_| None).unwrap();
        let ports = specs
            .iter()
            .zip(blocks)
            .map(|(spec, (t, block))| ResolvedPort {
                name: spec.name.clone(),
                node_type: Some(*t),
                blocks: vec![*block],
                connected: 1,
            })
            .collect();
        Self { comp, ports, params }
    }

    fn initialize(&mut self, env: StepEnv<'_>) {
        let ctx = SimContext::new(env, "Comp", &self.ports, &self.params);
        self.comp.initialize(&ctx).unwrap();
    }

    fn step(&mut self, env: StepEnv<'_>) {
        let ctx = SimContext::new(env, "Comp", &self.ports, &self.params);
        self.comp.simulate_one_timestep(&ctx);
    }
}

fn factory() -> Factory {
    let mut factory = Factory::new(Arc::new(MessageHandler::new()));
    register_default_components(&mut factory);
    factory
}

fn hydraulic(arena: &mut NodeArena) -> (NodeType, SlotHandle) {
    (
        NodeType::Hydraulic,
        arena.allocate(&NodeType::Hydraulic.default_values()),
    )
}

fn signal(arena: &mut NodeArena, value: Real) -> (NodeType, SlotHandle) {
    (NodeType::Signal, arena.allocate(&[value]))
}

#[test]
fn laminar_orifice_between_two_tanks() {
    let factory = factory();
    let mut arena = NodeArena::new();
    let high = hydraulic(&mut arena);
    let low = hydraulic(&mut arena);
    let kc = signal(&mut arena, 2e-11);

    let mut tank_high = Bound::new(&factory, "HydraulicTank", &[high]);
    tank_high.params.set_text("p", "1e6").unwrap();
    let mut tank_low = Bound::new(&factory, "HydraulicTank", &[low]);
    let mut orifice = Bound::new(&factory, "HydraulicLaminarOrifice", &[high, low, kc]);

    let messages = MessageHandler::new();
    let stop = AtomicBool::new(false);
    let env = |time: Real| StepEnv {
        arena: &arena,
        messages: &messages,
        stop: &stop,
        time,
        timestep: 1e-3,
    };

    tank_high.initialize(env(0.0));
    tank_low.initialize(env(0.0));
    orifice.initialize(env(0.0));
    for k in 1..=3 {
        let t = k as Real * 1e-3;
        tank_high.step(env(t));
        tank_low.step(env(t));
        orifice.step(env(t));
    }

    let q = 2e-11 * (1e6 - 1e5);
    let at = |node: (NodeType, SlotHandle), slot: Hydraulic| arena.get(node.1.offset(slot.index()));
    assert!((at(low, Hydraulic::Flow) - q).abs() < 1e-18);
    assert!((at(high, Hydraulic::Flow) + q).abs() < 1e-18);
    assert_eq!(at(high, Hydraulic::Pressure), 1e6);
    assert_eq!(at(low, Hydraulic::Pressure), 1e5);
    assert_eq!(messages.num_waiting(), 0);
}

#[test]
fn signal_chain_through_sensor_and_gain() {
    let factory = factory();
    let mut arena = NodeArena::new();
    let line = hydraulic(&mut arena);
    let measured = signal(&mut arena, 0.0);
    let scaled = signal(&mut arena, 0.0);
    arena.set(line.1.offset(Hydraulic::Pressure.index()), 3e5);

    let mut sensor = Bound::new(&factory, "HydraulicPressureSensor", &[line, measured]);
    let mut gain = Bound::new(&factory, "SignalGain", &[measured, scaled]);
    gain.params.set_text("k", "1e-5").unwrap();

    let messages = MessageHandler::new();
    let stop = AtomicBool::new(false);
    let env = StepEnv {
        arena: &arena,
        messages: &messages,
        stop: &stop,
        time: 0.0,
        timestep: 1e-3,
    };
    sensor.initialize(env);
    gain.initialize(env);
    sensor.step(env);
    gain.step(env);

    assert_eq!(arena.get(measured.1.offset(Signal::Value.index())), 3e5);
    assert!((arena.get(scaled.1.offset(Signal::Value.index())) - 3.0).abs() < 1e-12);
}
