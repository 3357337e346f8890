//! Pressure and flow sources.

use crate::common::{HydraulicHandles, signal_handle};
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::ComponentResult;
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_core::Real;
use tlm_graph::{CqsType, NodeType, SlotHandle};

#[derive(Debug, Clone, Copy)]
struct SourceNodes {
    port: HydraulicHandles,
    input: SlotHandle,
}

/// Stiff pressure source: `c = p`, `Zc = 0`.
#[derive(Debug, Default)]
pub struct HydraulicPressureSourceC {
    port: PortIdx,
    pressure: PortIdx,
    nodes: Option<SourceNodes>,
}

impl HydraulicPressureSourceC {
    fn write(&self, ctx: &SimContext<'_>) {
        if let Some(n) = self.nodes {
            ctx.write(n.port.c, ctx.read(n.input));
            ctx.write(n.port.zc, 0.0);
        }
    }
}

impl Component for HydraulicPressureSourceC {
    fn type_name(&self) -> &'static str {
        "HydraulicPressureSourceC"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::C
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.pressure = cfg.add_input_variable("p", "Set pressure", "Pa", 1e5);
        self.port = cfg.add_power_port("P1", NodeType::Hydraulic);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.nodes = Some(SourceNodes {
            port: HydraulicHandles::resolve(ctx, self.port)?,
            input: signal_handle(ctx, self.pressure)?,
        });
        self.write(ctx);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        self.write(ctx);
    }
}

/// Tank at constant pressure.
#[derive(Debug, Default)]
pub struct HydraulicTank {
    port: PortIdx,
    pressure: ParamIdx,
    handles: Option<HydraulicHandles>,
}

impl Component for HydraulicTank {
    fn type_name(&self) -> &'static str {
        "HydraulicTank"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::C
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.port = cfg.add_power_port("P1", NodeType::Hydraulic);
        self.pressure = cfg.add_parameter("p", "Tank pressure", "Pa", 1e5);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let h = HydraulicHandles::resolve(ctx, self.port)?;
        let p = ctx.param(self.pressure);
        ctx.write(h.c, p);
        ctx.write(h.zc, 0.0);
        ctx.write(h.p, p);
        self.handles = Some(h);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some(h) = self.handles {
            ctx.write(h.c, ctx.param(self.pressure));
            ctx.write(h.zc, 0.0);
        }
    }
}

/// Flow that holds pressure `p` against the connected wave: `q = (p - c) / Zc`.
pub fn pressure_source_flow(p: Real, c: Real, zc: Real) -> Real {
    if zc == 0.0 { 0.0 } else { (p - c) / zc }
}

/// Pressure source on a C-type neighbour.
#[derive(Debug, Default)]
pub struct HydraulicPressureSourceQ {
    port: PortIdx,
    pressure: PortIdx,
    nodes: Option<SourceNodes>,
}

impl Component for HydraulicPressureSourceQ {
    fn type_name(&self) -> &'static str {
        "HydraulicPressureSourceQ"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::Q
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.pressure = cfg.add_input_variable("p", "Set pressure", "Pa", 1e5);
        self.port = cfg.add_power_port("P1", NodeType::Hydraulic);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.nodes = Some(SourceNodes {
            port: HydraulicHandles::resolve(ctx, self.port)?,
            input: signal_handle(ctx, self.pressure)?,
        });
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        let Some(n) = self.nodes else {
            return;
        };
        let c = ctx.read(n.port.c);
        let zc = ctx.read(n.port.zc);
        let q = pressure_source_flow(ctx.read(n.input), c, zc);
        ctx.write(n.port.q, q);
        ctx.write(n.port.p, c + zc * q);
    }
}

/// Prescribed flow out of the source.
#[derive(Debug, Default)]
pub struct HydraulicFlowSourceQ {
    port: PortIdx,
    flow: PortIdx,
    nodes: Option<SourceNodes>,
}

impl Component for HydraulicFlowSourceQ {
    fn type_name(&self) -> &'static str {
        "HydraulicFlowSourceQ"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::Q
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.flow = cfg.add_input_variable("q", "Set flow", "m^3/s", 1e-3);
        self.port = cfg.add_power_port("P1", NodeType::Hydraulic);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.nodes = Some(SourceNodes {
            port: HydraulicHandles::resolve(ctx, self.port)?,
            input: signal_handle(ctx, self.flow)?,
        });
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        let Some(n) = self.nodes else {
            return;
        };
        let q = ctx.read(n.input);
        ctx.write(n.port.q, q);
        ctx.write(n.port.p, ctx.read(n.port.c) + ctx.read(n.port.zc) * q);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Rig;
    use tlm_graph::node::{Hydraulic, Signal};

    const TS: Real = 0.001;

    #[test]
    fn pressure_source_c_follows_input() {
        let mut src = HydraulicPressureSourceC::default();
        let mut rig = Rig::new(&mut src, TS);
        rig.set_param("p", "2e6");
        rig.initialize(&mut src).unwrap();
        assert_eq!(rig.get(PortIdx(1), Hydraulic::WaveVariable), 2e6);

        rig.set(PortIdx(0), Signal::Value, 3e6);
        rig.step(&mut src);
        assert_eq!(rig.get(PortIdx(1), Hydraulic::WaveVariable), 3e6);
        assert_eq!(rig.get(PortIdx(1), Hydraulic::CharImpedance), 0.0);
    }

    #[test]
    fn pressure_source_q_holds_pressure() {
        let mut src = HydraulicPressureSourceQ::default();
        let mut rig = Rig::new(&mut src, TS);
        rig.initialize(&mut src).unwrap();
        rig.set(PortIdx(1), Hydraulic::WaveVariable, 5e4);
        rig.set(PortIdx(1), Hydraulic::CharImpedance, 1e9);
        rig.step(&mut src);
        assert!((rig.get(PortIdx(1), Hydraulic::Pressure) - 1e5).abs() < 1e-6);
        assert!((rig.get(PortIdx(1), Hydraulic::Flow) - 5e-5).abs() < 1e-15);
    }

    #[test]
    fn pressure_source_q_on_stiff_node_gives_no_flow() {
        assert_eq!(pressure_source_flow(1e5, 2e5, 0.0), 0.0);
    }

    #[test]
    fn flow_source_sets_pressure_from_wave() {
        let mut src = HydraulicFlowSourceQ::default();
        let mut rig = Rig::new(&mut src, TS);
        rig.initialize(&mut src).unwrap();
        rig.set(PortIdx(1), Hydraulic::WaveVariable, 1e6);
        rig.set(PortIdx(1), Hydraulic::CharImpedance, 1e9);
        rig.step(&mut src);
        assert_eq!(rig.get(PortIdx(1), Hydraulic::Flow), 1e-3);
        assert!((rig.get(PortIdx(1), Hydraulic::Pressure) - 2e6).abs() < 1e-6);
    }

    #[test]
    fn tank_is_stiff() {
        let mut tank = HydraulicTank::default();
        let mut rig = Rig::new(&mut tank, TS);
        rig.set_param("p", "3e5");
        rig.initialize(&mut tank).unwrap();
        rig.step(&mut tank);
        assert_eq!(rig.get(PortIdx(0), Hydraulic::WaveVariable), 3e5);
        assert_eq!(rig.get(PortIdx(0), Hydraulic::CharImpedance), 0.0);
    }
}
