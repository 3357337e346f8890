//! Hydraulic volumes (C-type).
//!
//! A volume of oil with bulk modulus `Be` behaves as a short lossless line:
//! each port's wave variable is derived from the other ports' waves and
//! low-pass filtered with `alpha` to damp the delay-line oscillation.

use crate::common::{HydraulicHandles, check_positive};
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::{ComponentError, ComponentResult};
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_core::Real;
use tlm_graph::{CqsType, NodeType};

/// Characteristic impedance of a volume shared by `num_ports` ports.
pub fn volume_impedance(
    num_ports: usize,
    bulk_modulus: Real,
    volume: Real,
    timestep: Real,
    alpha: Real,
) -> Real {
    num_ports as Real / 2.0 * bulk_modulus / volume * timestep / (1.0 - alpha)
}

/// Wave averaging over a junction.
///
/// Returns the mean pressure `sum(c_i + 2 Zc q_i) / n` and writes the
/// unfiltered new wave variable `2 p_mean - c_i - 2 Zc q_i` of every port
/// into `c_new`.
pub fn wave_average(c: &[Real], q: &[Real], zc: Real, c_new: &mut [Real]) -> Real {
    let n = c.len().min(q.len()).min(c_new.len());
    if n == 0 {
        return 0.0;
    }
    let p_mean = c
        .iter()
        .zip(q)
        .take(n)
        .map(|(c, q)| c + 2.0 * zc * q)
        .sum::<Real>()
        / n as Real;
    for ((out, c), q) in c_new.iter_mut().zip(c).zip(q) {
        *out = 2.0 * p_mean - c - 2.0 * zc * q;
    }
    p_mean
}

fn check_alpha(alpha: Real) -> ComponentResult<()> {
    if !(0.0..1.0).contains(&alpha) {
        return Err(ComponentError::NonPhysical {
            what: format!("alpha must be in [0, 1), got {alpha}"),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
struct VolumeParams {
    volume: ParamIdx,
    bulk_modulus: ParamIdx,
    alpha: ParamIdx,
}

impl VolumeParams {
    fn register(cfg: &mut Configurator) -> Self {
        Self {
            volume: cfg.add_parameter("V", "Volume", "m^3", 1e-3),
            bulk_modulus: cfg.add_parameter("Beta_e", "Bulk modulus", "Pa", 1e9),
            alpha: cfg.add_parameter("alpha", "Low pass coefficient to dampen standing delay waves", "-", 0.1),
        }
    }

    fn check(&self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        check_positive(ctx.param(self.volume), "V")?;
        check_positive(ctx.param(self.bulk_modulus), "Beta_e")?;
        check_alpha(ctx.param(self.alpha))
    }

    fn impedance(&self, ctx: &SimContext<'_>, num_ports: usize) -> Real {
        volume_impedance(
            num_ports,
            ctx.param(self.bulk_modulus),
            ctx.param(self.volume),
            ctx.timestep(),
            ctx.param(self.alpha),
        )
    }
}

/// Write start wave variables `c = p - Zc q` and the impedance to every port.
fn initialize_ports(ctx: &SimContext<'_>, ports: &[HydraulicHandles], zc: Real) {
    for h in ports {
        let c = ctx.read(h.p) - zc * ctx.read(h.q);
        ctx.write(h.c, c);
        ctx.write(h.zc, zc);
    }
}

/// Volume with any number of connected lines on one multiport.
#[derive(Debug, Default)]
pub struct HydraulicVolumeMultiPort {
    port: PortIdx,
    params: VolumeParams,
    nodes: Vec<HydraulicHandles>,
    zc: Real,
    c_old: Vec<Real>,
    q: Vec<Real>,
    c_new: Vec<Real>,
}

impl Component for HydraulicVolumeMultiPort {
    fn type_name(&self) -> &'static str {
        "HydraulicVolumeMultiPort"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::C
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.port = cfg.add_power_multi_port("P1", NodeType::Hydraulic);
        self.params = VolumeParams::register(cfg);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.params.check(ctx)?;
        self.nodes = HydraulicHandles::resolve_multi(ctx, self.port)?;
        let n = self.nodes.len();
        self.zc = self.params.impedance(ctx, n.max(1));
        self.c_old = vec![0.0; n];
        self.q = vec![0.0; n];
        self.c_new = vec![0.0; n];
        initialize_ports(ctx, &self.nodes, self.zc);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if self.nodes.is_empty() {
            return;
        }
        let alpha = ctx.param(self.params.alpha);
        for (i, h) in self.nodes.iter().enumerate() {
            self.c_old[i] = ctx.read(h.c);
            self.q[i] = ctx.read(h.q);
        }
        wave_average(&self.c_old, &self.q, self.zc, &mut self.c_new);
        for (i, h) in self.nodes.iter().enumerate() {
            ctx.write(h.c, alpha * self.c_old[i] + (1.0 - alpha) * self.c_new[i]);
            ctx.write(h.zc, self.zc);
        }
    }
}

/// Two-port volume.
#[derive(Debug, Default)]
pub struct HydraulicVolume {
    p1: PortIdx,
    p2: PortIdx,
    params: VolumeParams,
    nodes: Option<[HydraulicHandles; 2]>,
    zc: Real,
}

impl Component for HydraulicVolume {
    fn type_name(&self) -> &'static str {
        "HydraulicVolume"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::C
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.p1 = cfg.add_power_port("P1", NodeType::Hydraulic);
        self.p2 = cfg.add_power_port("P2", NodeType::Hydraulic);
        self.params = VolumeParams::register(cfg);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.params.check(ctx)?;
        let nodes = [
            HydraulicHandles::resolve(ctx, self.p1)?,
            HydraulicHandles::resolve(ctx, self.p2)?,
        ];
        self.zc = self.params.impedance(ctx, 2);
        initialize_ports(ctx, &nodes, self.zc);
        self.nodes = Some(nodes);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        let Some([h1, h2]) = self.nodes else {
            return;
        };
        let alpha = ctx.param(self.params.alpha);
        let zc = self.zc;
        let (c1, q1) = (ctx.read(h1.c), ctx.read(h1.q));
        let (c2, q2) = (ctx.read(h2.c), ctx.read(h2.q));

        let c10 = c2 + 2.0 * zc * q2;
        let c20 = c1 + 2.0 * zc * q1;
        ctx.write(h1.c, alpha * c1 + (1.0 - alpha) * c10);
        ctx.write(h2.c, alpha * c2 + (1.0 - alpha) * c20);
        ctx.write(h1.zc, zc);
        ctx.write(h2.zc, zc);
    }
}
