//! Signal delays.
//!
//! The fixed delays have no direct feedthrough, so signal loops closed
//! through them can still be ordered.

use crate::common::signal_handle;
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::ComponentResult;
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_core::Real;
use tlm_graph::{CqsType, SlotHandle};
use tlm_utilities::Delay;
use tlm_utilities::delay::delay_steps_for;

#[derive(Debug, Clone, Copy)]
struct InOut {
    input: SlotHandle,
    out: SlotHandle,
}

fn resolve(ctx: &SimContext<'_>, input: PortIdx, out: PortIdx) -> ComponentResult<InOut> {
    Ok(InOut {
        input: signal_handle(ctx, input)?,
        out: signal_handle(ctx, out)?,
    })
}

/// Output is the input of the previous step.
#[derive(Debug, Default)]
pub struct SignalUnitDelay {
    input: PortIdx,
    out: PortIdx,
    handles: Option<InOut>,
    delay: Delay,
}

impl Component for SignalUnitDelay {
    fn type_name(&self) -> &'static str {
        "SignalUnitDelay"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.input = cfg.add_input_variable("in", "Input", "-", 0.0);
        self.out = cfg.add_output_variable("out", "Delayed output");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let io = resolve(ctx, self.input, self.out)?;
        let u0 = ctx.read(io.input);
        self.delay.initialize_steps(1, u0)?;
        ctx.write(io.out, u0);
        self.handles = Some(io);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some(io) = self.handles {
            ctx.write(io.out, self.delay.update(ctx.read(io.input)));
        }
    }

    fn has_direct_feedthrough(&self) -> bool {
        false
    }
}

/// Fixed time delay of `round(deltat / Ts)` steps; zero steps is an error.
#[derive(Debug, Default)]
pub struct SignalTimeDelay {
    input: PortIdx,
    out: PortIdx,
    time_delay: ParamIdx,
    handles: Option<InOut>,
    delay: Delay,
}

impl Component for SignalTimeDelay {
    fn type_name(&self) -> &'static str {
        "SignalTimeDelay"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.input = cfg.add_input_variable("in", "Input", "-", 0.0);
        self.time_delay = cfg.add_parameter("deltat", "Time delay", "s", 1.0);
        self.out = cfg.add_output_variable("out", "Delayed output");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let io = resolve(ctx, self.input, self.out)?;
        let u0 = ctx.read(io.input);
        self.delay
            .initialize_time(ctx.param(self.time_delay), ctx.timestep(), u0)?;
        ctx.write(io.out, u0);
        self.handles = Some(io);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some(io) = self.handles {
            ctx.write(io.out, self.delay.update(ctx.read(io.input)));
        }
    }

    fn has_direct_feedthrough(&self) -> bool {
        false
    }
}

/// Delay set by a signal each step.
///
/// A delay that rounds to zero steps passes the input straight through and
/// leaves the buffer untouched. Length changes resize the buffer, keeping
/// the oldest samples when shrinking.
#[derive(Debug, Default)]
pub struct SignalVariableTimeDelay {
    input: PortIdx,
    time_delay: PortIdx,
    out: PortIdx,
    handles: Option<(InOut, SlotHandle)>,
    delay: Delay,
}

impl SignalVariableTimeDelay {
    fn steps(ctx: &SimContext<'_>, time_delay: Real) -> usize {
        delay_steps_for(time_delay.max(0.0), ctx.timestep()).unwrap_or(0)
    }

    pub fn delay_steps(&self) -> usize {
        self.delay.get_size()
    }
}

impl Component for SignalVariableTimeDelay {
    fn type_name(&self) -> &'static str {
        "SignalVariableTimeDelay"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.input = cfg.add_input_variable("in", "Input", "-", 0.0);
        self.time_delay = cfg.add_input_variable("deltat", "Time delay", "s", 1.0);
        self.out = cfg.add_output_variable("out", "Delayed output");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let io = resolve(ctx, self.input, self.out)?;
        let td = signal_handle(ctx, self.time_delay)?;
        let u0 = ctx.read(io.input);
        self.delay = Delay::default();
        let steps = Self::steps(ctx, ctx.read(td));
        if steps > 0 {
            self.delay.initialize_steps(steps, u0)?;
        }
        ctx.write(io.out, u0);
        self.handles = Some((io, td));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        let Some((io, td)) = self.handles else {
            return;
        };
        let u = ctx.read(io.input);
        let steps = Self::steps(ctx, ctx.read(td));
        if steps == 0 {
            ctx.write(io.out, u);
            return;
        }
        let resized = if self.delay.is_empty() {
            self.delay.initialize_steps(steps, u)
        } else if self.delay.get_size() != steps {
            self.delay.resize(steps)
        } else {
            Ok(())
        };
        if let Err(e) = resized {
            ctx.add_error_message(e.to_string());
            ctx.stop_simulation("could not resize delay buffer");
            return;
        }
        ctx.write(io.out, self.delay.update(u));
    }
}
