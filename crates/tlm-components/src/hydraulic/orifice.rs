//! Laminar and turbulent orifices (Q-type).

use crate::common::{HydraulicHandles, check_positive, signal_handle};
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::{ComponentError, ComponentResult};
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_core::numeric::{d_signed_sqrt_l, signed_sqrt_l};
use tlm_core::Real;
use tlm_graph::{CqsType, NodeType, SlotHandle};
use tlm_utilities::{EquationSystemSolver, Matrix, Vector};

/// Wave variables and impedances seen from both ports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub c1: Real,
    pub zc1: Real,
    pub c2: Real,
    pub zc2: Real,
}

/// Port pressures and the flow out of port 2 (`q1 = -q2`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrificeSolution {
    pub q2: Real,
    pub p1: Real,
    pub p2: Real,
}

fn laminar_solution(kc: Real, b: Boundary) -> OrificeSolution {
    let q2 = kc * (b.c1 - b.c2) / (1.0 + kc * (b.zc1 + b.zc2));
    OrificeSolution {
        q2,
        p1: b.c1 - b.zc1 * q2,
        p2: b.c2 + b.zc2 * q2,
    }
}

/// Zero the wave variable and impedance of every port with negative pressure.
/// Returns true if any port cavitated.
fn cavitation_boundary(b: &mut Boundary, s: &OrificeSolution) -> bool {
    let mut cav = false;
    if s.p1 < 0.0 {
        b.c1 = 0.0;
        b.zc1 = 0.0;
        cav = true;
    }
    if s.p2 < 0.0 {
        b.c2 = 0.0;
        b.zc2 = 0.0;
        cav = true;
    }
    cav
}

/// Laminar flow `q = Kc (p1 - p2)`, with a single cavitation re-solve.
pub fn solve_laminar(kc: Real, boundary: Boundary) -> OrificeSolution {
    let mut b = boundary;
    let mut s = laminar_solution(kc, b);
    if cavitation_boundary(&mut b, &s) {
        s = laminar_solution(kc, b);
        s.p1 = s.p1.max(0.0);
        s.p2 = s.p2.max(0.0);
    }
    s
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Nodes {
    p1: HydraulicHandles,
    p2: HydraulicHandles,
}

impl Nodes {
    fn boundary(&self, ctx: &SimContext<'_>) -> Boundary {
        Boundary {
            c1: ctx.read(self.p1.c),
            zc1: ctx.read(self.p1.zc),
            c2: ctx.read(self.p2.c),
            zc2: ctx.read(self.p2.zc),
        }
    }

    fn write(&self, ctx: &SimContext<'_>, s: &OrificeSolution) {
        ctx.write(self.p1.q, -s.q2);
        ctx.write(self.p1.p, s.p1);
        ctx.write(self.p2.q, s.q2);
        ctx.write(self.p2.p, s.p2);
    }
}

/// Orifice with a flow-pressure coefficient `Kc`, readable as an input signal.
#[derive(Debug, Default)]
pub struct HydraulicLaminarOrifice {
    p1: PortIdx,
    p2: PortIdx,
    kc: PortIdx,
    nodes: Option<Nodes>,
    kc_handle: Option<SlotHandle>,
}

impl Component for HydraulicLaminarOrifice {
    fn type_name(&self) -> &'static str {
        "HydraulicLaminarOrifice"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::Q
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.p1 = cfg.add_power_port("P1", NodeType::Hydraulic);
        self.p2 = cfg.add_power_port("P2", NodeType::Hydraulic);
        self.kc = cfg.add_input_variable("Kc", "Pressure-Flow Coefficient", "m^5/Ns", 1e-11);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.nodes = Some(Nodes {
            p1: HydraulicHandles::resolve(ctx, self.p1)?,
            p2: HydraulicHandles::resolve(ctx, self.p2)?,
        });
        self.kc_handle = Some(signal_handle(ctx, self.kc)?);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        let (Some(nodes), Some(kc)) = (self.nodes, self.kc_handle) else {
            return;
        };
        let s = solve_laminar(ctx.read(kc), nodes.boundary(ctx));
        nodes.write(ctx, &s);
    }
}

/// Turbulent orifice `q = Cq A sqrt(2/rho) ssqrt(p1 - p2)`.
///
/// The port pressures are found with a damped Newton iteration, warm-started
/// from the previous step.
#[derive(Debug)]
pub struct HydraulicTurbulentOrifice {
    p1: PortIdx,
    p2: PortIdx,
    cq: ParamIdx,
    area: ParamIdx,
    rho: ParamIdx,
    p_lin: ParamIdx,
    tolerance: ParamIdx,
    max_iterations: ParamIdx,
    nodes: Option<Nodes>,
    solver: EquationSystemSolver,
    jacobian: Matrix,
    equations: Vector,
    pressures: Vector,
}

impl Default for HydraulicTurbulentOrifice {
    fn default() -> Self {
        Self {
            p1: PortIdx::default(),
            p2: PortIdx::default(),
            cq: ParamIdx::default(),
            area: ParamIdx::default(),
            rho: ParamIdx::default(),
            p_lin: ParamIdx::default(),
            tolerance: ParamIdx::default(),
            max_iterations: ParamIdx::default(),
            nodes: None,
            solver: EquationSystemSolver::new(2),
            jacobian: Matrix::zeros(2, 2),
            equations: Vector::zeros(2),
            pressures: Vector::zeros(2),
        }
    }
}

impl HydraulicTurbulentOrifice {
    fn ks(&self, ctx: &SimContext<'_>) -> Real {
        ctx.param(self.cq) * ctx.param(self.area) * (2.0 / ctx.param(self.rho)).sqrt()
    }

    /// Newton solve of `p1 = c1 - Zc1 q2`, `p2 = c2 + Zc2 q2`.
    /// Returns None if the Jacobian was singular.
    fn solve(&mut self, ctx: &SimContext<'_>, b: Boundary) -> Option<OrificeSolution> {
        let ks = self.ks(ctx);
        let p_lin = ctx.param(self.p_lin);
        let tol = ctx.param(self.tolerance);
        let max_iter = ctx.param(self.max_iterations).max(1.0) as usize;

        for iteration in 1..=max_iter {
            let dp = self.pressures[0] - self.pressures[1];
            let q2 = ks * signed_sqrt_l(dp, p_lin);
            let g = ks * d_signed_sqrt_l(dp, p_lin);

            self.equations[0] = self.pressures[0] - b.c1 + b.zc1 * q2;
            self.equations[1] = self.pressures[1] - b.c2 - b.zc2 * q2;
            if self.equations.amax() < tol {
                break;
            }
            self.jacobian[(0, 0)] = 1.0 + b.zc1 * g;
            self.jacobian[(0, 1)] = -b.zc1 * g;
            self.jacobian[(1, 0)] = -b.zc2 * g;
            self.jacobian[(1, 1)] = 1.0 + b.zc2 * g;

            if !self.solver.solve(
                ctx,
                &self.jacobian,
                &self.equations,
                &mut self.pressures,
                iteration,
            ) {
                return None;
            }
        }

        let (p1, p2) = (self.pressures[0], self.pressures[1]);
        Some(OrificeSolution {
            q2: ks * signed_sqrt_l(p1 - p2, p_lin),
            p1,
            p2,
        })
    }
}

impl Component for HydraulicTurbulentOrifice {
    fn type_name(&self) -> &'static str {
        "HydraulicTurbulentOrifice"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::Q
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.p1 = cfg.add_power_port("P1", NodeType::Hydraulic);
        self.p2 = cfg.add_power_port("P2", NodeType::Hydraulic);
        self.cq = cfg.add_parameter("Cq", "Flow coefficient", "-", 0.67);
        self.area = cfg.add_parameter("A", "Orifice area", "m^2", 1e-5);
        self.rho = cfg.add_parameter("rho", "Oil density", "kg/m^3", 870.0);
        self.p_lin = cfg.add_parameter(
            "p_lin",
            "Pressure difference below which the flow is linearized",
            "Pa",
            10.0,
        );
        self.tolerance = cfg.add_parameter("tol", "Newton residual tolerance", "Pa", 1e-6);
        self.max_iterations = cfg.add_parameter("maxIter", "Newton iteration limit", "-", 20.0);
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        check_positive(ctx.param(self.area), "A")?;
        check_positive(ctx.param(self.rho), "rho")?;
        check_positive(ctx.param(self.p_lin), "p_lin")?;
        check_positive(ctx.param(self.tolerance), "tol")?;
        if ctx.param(self.cq) < 0.0 {
            return Err(ComponentError::NonPhysical {
                what: "Cq must not be negative".into(),
            });
        }
        let nodes = Nodes {
            p1: HydraulicHandles::resolve(ctx, self.p1)?,
            p2: HydraulicHandles::resolve(ctx, self.p2)?,
        };
        self.pressures[0] = ctx.read(nodes.p1.p);
        self.pressures[1] = ctx.read(nodes.p2.p);
        self.nodes = Some(nodes);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        let Some(nodes) = self.nodes else {
            return;
        };
        let mut b = nodes.boundary(ctx);
        let Some(mut s) = self.solve(ctx, b) else {
            return;
        };
        if cavitation_boundary(&mut b, &s) {
            let Some(resolved) = self.solve(ctx, b) else {
                return;
            };
            s = resolved;
            s.p1 = s.p1.max(0.0);
            s.p2 = s.p2.max(0.0);
        }
        nodes.write(ctx, &s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Rig;
    use tlm_graph::node::Hydraulic;

    const TS: Real = 0.001;

    #[test]
    fn laminar_flow_without_cavitation() {
        let b = Boundary {
            c1: 2e6,
            zc1: 1e9,
            c2: 1e6,
            zc2: 1e9,
        };
        let s = solve_laminar(1e-11, b);
        let expected_q = 1e-11 * 1e6 / (1.0 + 1e-11 * 2e9);
        assert!((s.q2 - expected_q).abs() < 1e-15);
        assert!((s.p1 - (b.c1 - b.zc1 * s.q2)).abs() < 1e-6);
        assert!((s.p2 - (b.c2 + b.zc2 * s.q2)).abs() < 1e-6);
    }

    #[test]
    fn cavitation_resolve_gives_non_negative_pressures() {
        let b = Boundary {
            c1: -1e5,
            zc1: 1e9,
            c2: 1e6,
            zc2: 1e9,
        };
        let first = laminar_solution(1e-11, b);
        assert!(first.p1 < 0.0);

        let s = solve_laminar(1e-11, b);
        assert_eq!(s.p1, 0.0);
        assert!(s.p2 > 0.0);
        assert!(s.q2 < 0.0);
    }

    #[test]
    fn laminar_component_writes_both_ports() {
        let mut orifice = HydraulicLaminarOrifice::default();
        let mut rig = Rig::new(&mut orifice, TS);
        rig.initialize(&mut orifice).unwrap();
        rig.set(PortIdx(0), Hydraulic::WaveVariable, 2e6);
        rig.set(PortIdx(0), Hydraulic::CharImpedance, 1e9);
        rig.set(PortIdx(1), Hydraulic::WaveVariable, 1e6);
        rig.set(PortIdx(1), Hydraulic::CharImpedance, 1e9);
        rig.step(&mut orifice);

        let q1 = rig.get(PortIdx(0), Hydraulic::Flow);
        let q2 = rig.get(PortIdx(1), Hydraulic::Flow);
        assert!(q2 > 0.0);
        assert_eq!(q1, -q2);
        assert!(rig.get(PortIdx(0), Hydraulic::Pressure) > rig.get(PortIdx(1), Hydraulic::Pressure));
    }

    #[test]
    fn laminar_kc_follows_input_signal() {
        let mut orifice = HydraulicLaminarOrifice::default();
        let mut rig = Rig::new(&mut orifice, TS);
        rig.set_param("Kc", "0");
        rig.initialize(&mut orifice).unwrap();
        rig.set(PortIdx(0), Hydraulic::WaveVariable, 2e6);
        rig.step(&mut orifice);
        assert_eq!(rig.get(PortIdx(1), Hydraulic::Flow), 0.0);
    }

    #[test]
    fn turbulent_orifice_matches_square_root_law() {
        let mut orifice = HydraulicTurbulentOrifice::default();
        let mut rig = Rig::new(&mut orifice, TS);
        rig.initialize(&mut orifice).unwrap();
        // Stiff sources: pressures equal wave variables.
        rig.set(PortIdx(0), Hydraulic::WaveVariable, 1e6);
        rig.set(PortIdx(1), Hydraulic::WaveVariable, 1e5);
        rig.step(&mut orifice);

        let ks = 0.67 * 1e-5 * (2.0 / 870.0 as Real).sqrt();
        let q2 = rig.get(PortIdx(1), Hydraulic::Flow);
        assert!((q2 - ks * (9e5 as Real).sqrt()).abs() < 1e-9);
        assert!(!rig.is_stopped());
    }

    #[test]
    fn turbulent_orifice_converges_with_impedance() {
        let mut orifice = HydraulicTurbulentOrifice::default();
        let mut rig = Rig::new(&mut orifice, TS);
        rig.set_param("maxIter", "200");
        rig.initialize(&mut orifice).unwrap();
        rig.set(PortIdx(0), Hydraulic::WaveVariable, 1e7);
        rig.set(PortIdx(0), Hydraulic::CharImpedance, 1e8);
        rig.set(PortIdx(1), Hydraulic::WaveVariable, 1e6);
        rig.set(PortIdx(1), Hydraulic::CharImpedance, 1e8);
        for _ in 0..5 {
            rig.step(&mut orifice);
        }
        let p1 = rig.get(PortIdx(0), Hydraulic::Pressure);
        let p2 = rig.get(PortIdx(1), Hydraulic::Pressure);
        let q2 = rig.get(PortIdx(1), Hydraulic::Flow);
        assert!((p1 - (1e7 - 1e8 * q2)).abs() < 1e-3);
        assert!((p2 - (1e6 + 1e8 * q2)).abs() < 1e-3);
        assert!(p1 > p2);
    }

    #[test]
    fn negative_area_is_rejected() {
        let mut orifice = HydraulicTurbulentOrifice::default();
        let mut rig = Rig::new(&mut orifice, TS);
        rig.set_param("A", "-1");
        assert!(rig.initialize(&mut orifice).is_err());
    }
}
