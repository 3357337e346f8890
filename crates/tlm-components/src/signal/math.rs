//! Gain and summation.

use crate::common::{signal_handle, signal_handles};
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::ComponentResult;
use crate::parameter::ParamIdx;
use crate::traits::Component;
use tlm_graph::{CqsType, NodeType, SlotHandle};

#[derive(Debug, Default)]
pub struct SignalGain {
    input: PortIdx,
    out: PortIdx,
    gain: ParamIdx,
    handles: Option<(SlotHandle, SlotHandle)>,
}

impl Component for SignalGain {
    fn type_name(&self) -> &'static str {
        "SignalGain"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.input = cfg.add_input_variable("in", "Input", "-", 0.0);
        self.gain = cfg.add_parameter("k", "Gain", "-", 1.0);
        self.out = cfg.add_output_variable("out", "Amplified output");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.handles = Some((
            signal_handle(ctx, self.input)?,
            signal_handle(ctx, self.out)?,
        ));
        self.simulate_one_timestep(ctx);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some((input, out)) = self.handles {
            ctx.write(out, ctx.param(self.gain) * ctx.read(input));
        }
    }
}

/// Sum of every signal connected to the `in` multiport.
#[derive(Debug, Default)]
pub struct SignalSum {
    input: PortIdx,
    out: PortIdx,
    inputs: Vec<SlotHandle>,
    handle: Option<SlotHandle>,
}

impl Component for SignalSum {
    fn type_name(&self) -> &'static str {
        "SignalSum"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.input = cfg.add_read_multi_port("in", NodeType::Signal);
        cfg.set_not_required(self.input);
        self.out = cfg.add_output_variable("out", "Sum of inputs");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        self.inputs = signal_handles(ctx, self.input)?;
        self.handle = Some(signal_handle(ctx, self.out)?);
        self.simulate_one_timestep(ctx);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some(out) = self.handle {
            let sum = self.inputs.iter().map(|&h| ctx.read(h)).sum();
            ctx.write(out, sum);
        }
    }
}
