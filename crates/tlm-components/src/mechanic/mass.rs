//! Translational mass (Q-type).

use crate::common::{MechanicHandles, check_finite, check_positive};
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::{ComponentError, ComponentResult};
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_core::Real;
use tlm_graph::{CqsType, NodeType};
use tlm_utilities::{FirstOrderTransferFunction, SecondOrderTransferFunction};

const VELOCITY_NUM: [Real; 3] = [0.0, 1.0, 0.0];
const INTEGRATOR_NUM: [Real; 2] = [1.0, 0.0];
const INTEGRATOR_DEN: [Real; 2] = [0.0, 1.0];

/// Mass with viscous friction `B` and spring `k` to ground.
///
/// The port-2 velocity is `s / (m s^2 + (B + Zc1 + Zc2) s + k)` applied to
/// `c1 - c2`; the connected impedances enter the damping so the coupling
/// with the C-type neighbours stays implicit.
#[derive(Debug, Default)]
pub struct MechanicTranslationalMass {
    p1: PortIdx,
    p2: PortIdx,
    mass: ParamIdx,
    damping: ParamIdx,
    stiffness: ParamIdx,
    nodes: Option<[MechanicHandles; 2]>,
    velocity: SecondOrderTransferFunction,
    position: FirstOrderTransferFunction,
}

impl MechanicTranslationalMass {
    fn denominator(&self, ctx: &SimContext<'_>, zc1: Real, zc2: Real) -> [Real; 3] {
        [
            ctx.param(self.stiffness),
            ctx.param(self.damping) + zc1 + zc2,
            ctx.param(self.mass),
        ]
    }
}

impl Component for MechanicTranslationalMass {
    fn type_name(&self) -> &'static str {
        "MechanicTranslationalMass"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::Q
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.p1 = cfg.add_power_port("P1", NodeType::Mechanic);
        self.p2 = cfg.add_power_port("P2", NodeType::Mechanic);
        self.mass = cfg.add_parameter("m", "Mass", "kg", 1.0);
        self.damping = cfg.add_parameter("B", "Viscous friction coefficient", "Ns/m", 10.0);
        self.stiffness = cfg.add_parameter("k", "Spring coefficient", "N/m", 0.0);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        check_positive(ctx.param(self.mass), "m")?;
        check_finite(ctx.param(self.damping), "B")?;
        check_finite(ctx.param(self.stiffness), "k")?;
        if ctx.param(self.damping) < 0.0 || ctx.param(self.stiffness) < 0.0 {
            return Err(ComponentError::NonPhysical {
                what: "B and k must not be negative".into(),
            });
        }

        let h1 = MechanicHandles::resolve(ctx, self.p1)?;
        let h2 = MechanicHandles::resolve(ctx, self.p2)?;
        let ts = ctx.timestep();
        let v2 = ctx.read(h2.v);
        let x2 = ctx.read(h2.x);
        let den = self.denominator(ctx, ctx.read(h1.zc), ctx.read(h2.zc));

        // Seed the input history with the force that keeps v2 steady.
        let u0 = den[1] * v2 + den[0] * x2;
        self.velocity
            .initialize(ts, VELOCITY_NUM, den, u0, v2, Real::NEG_INFINITY, Real::INFINITY)?;
        self.position.initialize(
            ts,
            INTEGRATOR_NUM,
            INTEGRATOR_DEN,
            v2,
            x2,
            Real::NEG_INFINITY,
            Real::INFINITY,
        )?;

        let m = ctx.param(self.mass);
        ctx.write(h1.me, m);
        ctx.write(h2.me, m);
        self.nodes = Some([h1, h2]);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        let Some([h1, h2]) = self.nodes else {
            return;
        };
        let (c1, zc1) = (ctx.read(h1.c), ctx.read(h1.zc));
        let (c2, zc2) = (ctx.read(h2.c), ctx.read(h2.zc));

        let den = self.denominator(ctx, zc1, zc2);
        if let Err(e) = self.velocity.set_num_den(VELOCITY_NUM, den) {
            ctx.add_error_message(e.to_string());
            ctx.stop_simulation("invalid mass dynamics");
            return;
        }
        let v2 = self.velocity.update(c1 - c2);
        let x2 = self.position.update(v2);
        let v1 = -v2;

        ctx.write(h1.v, v1);
        ctx.write(h1.x, -x2);
        ctx.write(h1.f, c1 + zc1 * v1);
        ctx.write(h2.v, v2);
        ctx.write(h2.x, x2);
        ctx.write(h2.f, c2 + zc2 * v2);
        let m = ctx.param(self.mass);
        ctx.write(h1.me, m);
        ctx.write(h2.me, m);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Rig;
    use tlm_graph::node::Mechanic;

    const TS: Real = 0.001;

    #[test]
    fn damped_mass_reaches_terminal_velocity() {
        let mut mass = MechanicTranslationalMass::default();
        let mut rig = Rig::new(&mut mass, TS);
        rig.set_param("P1#Force", "100");
        rig.set_param("P2#Force", "0");
        rig.initialize(&mut mass).unwrap();

        for _ in 0..2000 {
            rig.step(&mut mass);
        }
        let v2 = rig.get(PortIdx(1), Mechanic::Velocity);
        assert!((v2 - 10.0).abs() < 1e-3, "v2 = {v2}");
        assert_eq!(rig.get(PortIdx(0), Mechanic::Velocity), -v2);
        assert!(rig.get(PortIdx(1), Mechanic::Position) > 0.0);
        assert_eq!(rig.get(PortIdx(1), Mechanic::EquivalentMass), 1.0);
    }

    #[test]
    fn free_mass_accelerates_uniformly() {
        let mut mass = MechanicTranslationalMass::default();
        let mut rig = Rig::new(&mut mass, TS);
        rig.set_param("B", "0");
        rig.set_param("P1#Force", "100");
        rig.initialize(&mut mass).unwrap();

        for _ in 0..10 {
            rig.step(&mut mass);
        }
        // The force step at t = 0 is averaged into the first step.
        assert!((rig.get(PortIdx(1), Mechanic::Velocity) - 0.95).abs() < 1e-9);
        assert!((rig.get(PortIdx(1), Mechanic::Position) - 0.004525).abs() < 1e-9);
    }

    #[test]
    fn zero_mass_is_rejected() {
        let mut mass = MechanicTranslationalMass::default();
        let mut rig = Rig::new(&mut mass, TS);
        rig.set_param("m", "0");
        assert!(rig.initialize(&mut mass).is_err());
    }
}
