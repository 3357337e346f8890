//! Hydraulic sensors (S-type).

use crate::common::signal_handle;
use crate::configure::{Configurator, PortIdx};
use crate::context::SimContext;
use crate::error::ComponentResult;
use crate::traits::Component;
use tlm_graph::node::Hydraulic;
use tlm_graph::{CqsType, NodeType, SlotHandle};

/// Publishes the pressure of a hydraulic node as a signal.
#[derive(Debug, Default)]
pub struct HydraulicPressureSensor {
    port: PortIdx,
    out: PortIdx,
    handles: Option<(SlotHandle, SlotHandle)>,
}

impl Component for HydraulicPressureSensor {
    fn type_name(&self) -> &'static str {
        "HydraulicPressureSensor"
    }

    fn cqs_type(&self) -> CqsType {
        CqsType::S
    }

    fn configure(&mut self, cfg: &mut Configurator) {
        self.port = cfg.add_read_port("P1", NodeType::Hydraulic);
        self.out = cfg.add_output_variable("out", "Pressure");
    }

    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()> {
        let p = ctx.handle(self.port, Hydraulic::Pressure)?;
        let out = signal_handle(ctx, self.out)?;
        ctx.write(out, ctx.read(p));
        self.handles = Some((p, out));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>) {
        if let Some((p, out)) = self.handles {
            ctx.write(out, ctx.read(p));
        }
    }
}
