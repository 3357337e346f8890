//! Spring and force source (C-type).

use crate::common::{MechanicHandles, check_positive, signal_handle};
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::ComponentResult;
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_core::Real;
use tlm_graph::{CqsType, NodeType, SlotHandle};

/// Ideal translational spring, `Zc = k Ts`.
#[derive(Debug, Default)]
pub struct MechanicSpring {
    p1: PortIdx,
    p2: PortIdx,
    stiffness: ParamIdx,
    nodes: Option<[MechanicHandles; 2]>,
    zc: Real,
}

impl Component for MechanicSpring {
    fn type_name(&self) -> &'static str {
        "MechanicSpring"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::C
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.p1 = cfg.add_power_port("P1", NodeType::Mechanic);
        self.p2 = cfg.add_power_port("P2", NodeType::Mechanic);
        self.stiffness = cfg.add_parameter("k", "Spring coefficient", "N/m", 100.0);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let k = ctx.param(self.stiffness);
        check_positive(k, "k")?;
        self.zc = k * ctx.timestep();
        let nodes = [
            MechanicHandles::resolve(ctx, self.p1)?,
            MechanicHandles::resolve(ctx, self.p2)?,
        ];
        for h in &nodes {
            ctx.write(h.c, ctx.read(h.f) - self.zc * ctx.read(h.v));
            ctx.write(h.zc, self.zc);
        }
        self.nodes = Some(nodes);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        let Some([h1, h2]) = self.nodes else {
            return;
        };
        let zc = self.zc;
        let (c1, v1) = (ctx.read(h1.c), ctx.read(h1.v));
        let (c2, v2) = (ctx.read(h2.c), ctx.read(h2.v));
        ctx.write(h1.c, c2 + 2.0 * zc * v2);
        ctx.write(h2.c, c1 + 2.0 * zc * v1);
        ctx.write(h1.zc, zc);
        ctx.write(h2.zc, zc);
    }
}

/// Prescribed force: `c = F`, `Zc = 0`.
#[derive(Debug, Default)]
pub struct MechanicForceSource {
    port: PortIdx,
    force: PortIdx,
    handles: Option<(MechanicHandles, SlotHandle)>,
}

impl MechanicForceSource {
    fn write(&self, ctx: &SimContext<'_>) {
        if let Some((h, f)) = self.handles {
            ctx.write(h.c, ctx.read(f));
            ctx.write(h.zc, 0.0);
        }
    }
}

impl Component for MechanicForceSource {
    fn type_name(&self) -> &'static str {
        "MechanicForceSource"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::C
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.force = cfg.add_input_variable("F", "Generated force", "N", 0.0);
        self.port = cfg.add_power_port("P1", NodeType::Mechanic);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.handles = Some((
            MechanicHandles::resolve(ctx, self.port)?,
            signal_handle(ctx, self.force)?,
        ));
        self.write(ctx);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        self.write(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Rig;
    use tlm_graph::node::Mechanic;

    const TS: Real = 0.001;

    #[test]
    fn spring_reflects_velocity_into_waves() {
        let mut spring = MechanicSpring::default();
        let mut rig = Rig::new(&mut spring, TS);
        rig.initialize(&mut spring).unwrap();
        assert!((rig.get(PortIdx(0), Mechanic::CharImpedance) - 0.1).abs() < 1e-12);

        rig.set(PortIdx(0), Mechanic::Velocity, 0.1);
        rig.step(&mut spring);
        assert!((rig.get(PortIdx(1), Mechanic::WaveVariable) - 0.02).abs() < 1e-12);
        assert_eq!(rig.get(PortIdx(0), Mechanic::WaveVariable), 0.0);
    }

    #[test]
    fn force_source_sets_wave() {
        let mut src = MechanicForceSource::default();
        let mut rig = Rig::new(&mut src, TS);
        rig.set_param("F", "250");
        rig.initialize(&mut src).unwrap();
        rig.step(&mut src);
        assert_eq!(rig.get(PortIdx(1), Mechanic::WaveVariable), 250.0);
        assert_eq!(rig.get(PortIdx(1), Mechanic::CharImpedance), 0.0);
    }
}
