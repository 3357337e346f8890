//! Linear filters on signals.

use crate::common::{check_positive, signal_handle};
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::ComponentResult;
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_core::Real;
use tlm_core::numeric::limit;
use tlm_graph::{CqsType, SlotHandle};
use tlm_utilities::{FirstOrderTransferFunction, SecondOrderTransferFunction};

#[derive(Debug, Clone, Copy, Default)]
struct Limits {
    min: ParamIdx,
    max: ParamIdx,
}

impl Limits {
    fn register(cfg: &mut Configurator) -> Self {
        Self {
            min: cfg.add_parameter("y_min", "Lower output limit", "-", -1.5e300),
            max: cfg.add_parameter("y_max", "Upper output limit", "-", 1.5e300),
        }
    }

    fn get(&self, ctx: &SimContext<'_>) -> (Real, Real) {
        (ctx.param(self.min), ctx.param(self.max))
    }
}

/// `k (1 + s/wnum) / (1 + s/wden)` with output limits.
#[derive(Debug, Default)]
pub struct SignalFirstOrderFilter {
    input: PortIdx,
    out: PortIdx,
    gain: ParamIdx,
    w_num: ParamIdx,
    w_den: ParamIdx,
    limits: Limits,
    handles: Option<(SlotHandle, SlotHandle)>,
    tf: FirstOrderTransferFunction,
}

impl Component for SignalFirstOrderFilter {
    fn type_name(&self) -> &'static str {
        "SignalFirstOrderFilter"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.input = cfg.add_input_variable("in", "Input", "-", 0.0);
        self.gain = cfg.add_parameter("k", "Gain", "-", 1.0);
        self.w_num = cfg.add_parameter("omega_num", "Numerator break frequency", "rad/s", 1e10);
        self.w_den = cfg.add_parameter("omega_den", "Denominator break frequency", "rad/s", 1000.0);
        self.limits = Limits::register(cfg);
        self.out = cfg.add_output_variable("out", "Filtered output");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let k = ctx.param(self.gain);
        let w_num = ctx.param(self.w_num);
        let w_den = ctx.param(self.w_den);
        check_positive(w_num, "omega_num")?;
        check_positive(w_den, "omega_den")?;
        let (min, max) = self.limits.get(ctx);

        let input = signal_handle(ctx, self.input)?;
        let out = signal_handle(ctx, self.out)?;
        let u0 = ctx.read(input);
        let y0 = limit(k * u0, min, max);
        self.tf.initialize(
            ctx.timestep(),
            [k, k / w_num],
            [1.0, 1.0 / w_den],
            u0,
            y0,
            min,
            max,
        )?;
        ctx.write(out, y0);
        self.handles = Some((input, out));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some((input, out)) = self.handles {
            ctx.write(out, self.tf.update(ctx.read(input)));
        }
    }
}

/// `k (1 + 2 dnum s/wnum + s^2/wnum^2) / (1 + 2 dden s/wden + s^2/wden^2)`.
#[derive(Debug, Default)]
pub struct SignalSecondOrderFilter {
    input: PortIdx,
    out: PortIdx,
    gain: ParamIdx,
    w_num: ParamIdx,
    d_num: ParamIdx,
    w_den: ParamIdx,
    d_den: ParamIdx,
    limits: Limits,
    handles: Option<(SlotHandle, SlotHandle)>,
    tf: SecondOrderTransferFunction,
}

impl Component for SignalSecondOrderFilter {
    fn type_name(&self) -> &'static str {
        "SignalSecondOrderFilter"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.input = cfg.add_input_variable("in", "Input", "-", 0.0);
        self.gain = cfg.add_parameter("k", "Gain", "-", 1.0);
        self.w_num = cfg.add_parameter("omega_num", "Numerator break frequency", "rad/s", 1e10);
        self.d_num = cfg.add_parameter("delta_num", "Numerator damping", "-", 1.0);
        self.w_den = cfg.add_parameter("omega_den", "Denominator break frequency", "rad/s", 1000.0);
        self.d_den = cfg.add_parameter("delta_den", "Denominator damping", "-", 1.0);
        self.limits = Limits::register(cfg);
        self.out = cfg.add_output_variable("out", "Filtered output");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let k = ctx.param(self.gain);
        let w_num = ctx.param(self.w_num);
        let w_den = ctx.param(self.w_den);
        check_positive(w_num, "omega_num")?;
        check_positive(w_den, "omega_den")?;
        let d_num = ctx.param(self.d_num);
        let d_den = ctx.param(self.d_den);
        let (min, max) = self.limits.get(ctx);

        let input = signal_handle(ctx, self.input)?;
        let out = signal_handle(ctx, self.out)?;
        let u0 = ctx.read(input);
        let y0 = limit(k * u0, min, max);
        self.tf.initialize(
            ctx.timestep(),
            [k, 2.0 * k * d_num / w_num, k / (w_num * w_num)],
            [1.0, 2.0 * d_den / w_den, 1.0 / (w_den * w_den)],
            u0,
            y0,
            min,
            max,
        )?;
        ctx.write(out, y0);
        self.handles = Some((input, out));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some((input, out)) = self.handles {
            ctx.write(out, self.tf.update(ctx.read(input)));
        }
    }
}
