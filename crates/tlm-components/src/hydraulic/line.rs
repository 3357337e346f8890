//! Lossless transmission line (C-type).

use crate::common::{HydraulicHandles, check_finite};
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::{ComponentError, ComponentResult};
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_core::Real;
use tlm_graph::{CqsType, NodeType};
use tlm_utilities::Delay;

/// Delay slots for a line with time delay `td` at timestep `ts`.
///
/// A wave sent at step `k` reaches the far port at step
/// `k + round(td / ts) - 1`. One of those steps is the C/Q exchange itself,
/// so the buffer holds `round(td / ts) - 2` samples, never fewer than zero.
/// `None` if `td < ts`.
pub fn line_delay_steps(td: Real, ts: Real) -> Option<usize> {
    if !(td.is_finite() && ts.is_finite() && ts > 0.0) || td < ts {
        return None;
    }
    let total = (td / ts + 0.5).floor() as usize;
    Some(total.saturating_sub(2))
}

/// Waves travel between the ports with a fixed time delay and no damping
/// other than the optional `alpha` filter.
///
/// When the delay is at most two timesteps the buffers are bypassed.
#[derive(Debug, Default)]
pub struct HydraulicTLMlossless {
    p1: PortIdx,
    p2: PortIdx,
    time_delay: ParamIdx,
    zc: ParamIdx,
    alpha: ParamIdx,
    nodes: Option<[HydraulicHandles; 2]>,
    /// Waves arriving at port 1 and port 2.
    delayed_c1: Delay,
    delayed_c2: Delay,
    bypass: bool,
}

impl HydraulicTLMlossless {
    fn propagate(&mut self, c10: Real, c20: Real) -> (Real, Real) {
        if self.bypass {
            (c10, c20)
        } else {
            (self.delayed_c1.update(c10), self.delayed_c2.update(c20))
        }
    }
}

impl Component for HydraulicTLMlossless {
    fn type_name(&self) -> &'static str {
        "HydraulicTLMlossless"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::C
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.p1 = cfg.add_power_port("P1", NodeType::Hydraulic);
        self.p2 = cfg.add_power_port("P2", NodeType::Hydraulic);
        self.time_delay = cfg.add_parameter("TD", "Time delay", "s", 0.1);
        self.zc = cfg.add_parameter("Zc", "Characteristic impedance", "Pa s/m^3", 1e9);
        self.alpha = cfg.add_parameter("alpha", "Low pass coefficient", "-", 0.0);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let zc = ctx.param(self.zc);
        let alpha = ctx.param(self.alpha);
        check_finite(zc, "Zc")?;
        if zc < 0.0 {
            return Err(ComponentError::NonPhysical {
                what: format!("Zc must not be negative, got {zc}"),
            });
        }
        if !(0.0..1.0).contains(&alpha) {
            return Err(ComponentError::NonPhysical {
                what: format!("alpha must be in [0, 1), got {alpha}"),
            });
        }
        let steps = line_delay_steps(ctx.param(self.time_delay), ctx.timestep()).ok_or(
            ComponentError::NonPhysical {
                what: "TD must be at least one timestep".into(),
            },
        )?;

        let h1 = HydraulicHandles::resolve(ctx, self.p1)?;
        let h2 = HydraulicHandles::resolve(ctx, self.p2)?;
        let c1 = ctx.read(h1.p) - zc * ctx.read(h1.q);
        let c2 = ctx.read(h2.p) - zc * ctx.read(h2.q);

        self.bypass = steps == 0;
        if !self.bypass {
            self.delayed_c1.initialize_steps(steps, c1)?;
            self.delayed_c2.initialize_steps(steps, c2)?;
        }
        ctx.write(h1.c, c1);
        ctx.write(h2.c, c2);
        ctx.write(h1.zc, zc);
        ctx.write(h2.zc, zc);
        self.nodes = Some([h1, h2]);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        let Some([h1, h2]) = self.nodes else {
            return;
        };
        let zc = ctx.param(self.zc);
        let alpha = ctx.param(self.alpha);

        let c10 = ctx.read(h2.p) + zc * ctx.read(h2.q);
        let c20 = ctx.read(h1.p) + zc * ctx.read(h1.q);
        let (c1_new, c2_new) = self.propagate(c10, c20);

        let c1 = alpha * ctx.read(h1.c) + (1.0 - alpha) * c1_new;
        let c2 = alpha * ctx.read(h2.c) + (1.0 - alpha) * c2_new;
        ctx.write(h1.c, c1);
        ctx.write(h2.c, c2);
        ctx.write(h1.zc, zc);
        ctx.write(h2.zc, zc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Rig;
    use tlm_graph::node::Hydraulic;

    const TS: Real = 0.001;

    #[test]
    fn delay_steps_exclude_exchange_step() {
        assert_eq!(line_delay_steps(0.1, TS), Some(98));
        assert_eq!(line_delay_steps(0.003, TS), Some(1));
        assert_eq!(line_delay_steps(0.002, TS), Some(0));
        assert_eq!(line_delay_steps(TS, TS), Some(0));
        assert_eq!(line_delay_steps(0.0005, TS), None);
    }

    #[test]
    fn wave_arrives_after_time_delay() {
        let mut line = HydraulicTLMlossless::default();
        let mut rig = Rig::new(&mut line, TS);
        rig.set_param("TD", "0.01");
        rig.set_param("P2#Pressure", "0");
        rig.initialize(&mut line).unwrap();
        assert_eq!(rig.get(PortIdx(1), Hydraulic::WaveVariable), 0.0);

        // Port 1 held at 1e5 with no flow; arrival after TD / Ts - 1 steps.
        for step in 1..=9 {
            rig.step(&mut line);
            let c2 = rig.get(PortIdx(1), Hydraulic::WaveVariable);
            if step < 9 {
                assert_eq!(c2, 0.0, "step {step}");
            } else {
                assert_eq!(c2, 1e5);
            }
        }
    }

    #[test]
    fn one_step_delay_bypasses_buffer() {
        let mut line = HydraulicTLMlossless::default();
        let mut rig = Rig::new(&mut line, TS);
        rig.set_param("TD", "0.001");
        rig.set_param("P2#Pressure", "0");
        rig.initialize(&mut line).unwrap();
        rig.step(&mut line);
        assert_eq!(rig.get(PortIdx(1), Hydraulic::WaveVariable), 1e5);
    }

    #[test]
    fn too_short_delay_is_an_error() {
        let mut line = HydraulicTLMlossless::default();
        let mut rig = Rig::new(&mut line, TS);
        rig.set_param("TD", "0.0001");
        assert!(rig.initialize(&mut line).is_err());
    }
}
