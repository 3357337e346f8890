//! Signal sources.

use crate::common::signal_handle;
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::ComponentResult;
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_core::Real;
use tlm_graph::{CqsType, SlotHandle};

#[derive(Debug, Default)]
pub struct SignalConstant {
    out: PortIdx,
    value: ParamIdx,
    handle: Option<SlotHandle>,
}

impl Component for SignalConstant {
    fn type_name(&self) -> &'static str {
        "SignalConstant"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.value = cfg.add_parameter("y", "Constant value", "-", 1.0);
        self.out = cfg.add_output_variable("out", "Constant output");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let out = signal_handle(ctx, self.out)?;
        ctx.write(out, ctx.param(self.value));
        self.handle = Some(out);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some(out) = self.handle {
            ctx.write(out, ctx.param(self.value));
        }
    }
}

/// Value of a step of height `y_a` from `y_0` at `t_step`.
pub fn step_value(time: Real, y_0: Real, y_a: Real, t_step: Real) -> Real {
    if time < t_step { y_0 } else { y_0 + y_a }
}

#[derive(Debug, Default)]
pub struct SignalStep {
    out: PortIdx,
    base: ParamIdx,
    amplitude: ParamIdx,
    step_time: ParamIdx,
    handle: Option<SlotHandle>,
}

impl SignalStep {
    fn value(&self, ctx: &SimContext<'_>) -> Real {
        step_value(
            ctx.time(),
            ctx.param(self.base),
            ctx.param(self.amplitude),
            ctx.param(self.step_time),
        )
    }
}

impl Component for SignalStep {
    fn type_name(&self) -> &'static str {
        "SignalStep"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.base = cfg.add_parameter("y_0", "Base value", "-", 0.0);
        self.amplitude = cfg.add_parameter("y_A", "Amplitude", "-", 1.0);
        self.step_time = cfg.add_parameter("t_step", "Step time", "s", 1.0);
        self.out = cfg.add_output_variable("out", "Step output");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let out = signal_handle(ctx, self.out)?;
        ctx.write(out, self.value(ctx));
        self.handle = Some(out);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some(out) = self.handle {
            ctx.write(out, self.value(ctx));
        }
    }
}
