//! The component contract.

use crate::configure::Configurator;
use crate::context::SimContext;
use crate::error::ComponentResult;
use tlm_graph::CqsType;

/// A simulation component.
///
/// Lifecycle: `configure` once after creation, then for every simulation
/// `initialize` (idempotent: resets all internal state from the current start
/// values and parameters), `simulate_one_timestep` once per step, and
/// `finalize`.
///
/// Failures during a step are reported through the context's message helpers
/// and [`SimContext::stop_simulation`]; the step itself never fails.
pub trait Component: Send {
    /// Factory key and display type, e.g. `HydraulicLaminarOrifice`.
    fn type_name(&self) -> &'static str;

    fn cqs_type(&self) -> CqsType;

    /// Declare ports and parameters.
    fn configure(&mut self, cfg: &mut Configurator);

    /// Resolve node handles and reset internal state.
    fn initialize(&mut self, ctx: &SimContext<'_>) -> ComponentResult<()>;

    fn simulate_one_timestep(&mut self, ctx: &SimContext<'_>);

    fn finalize(&mut self, _ctx: &SimContext<'_>) {}

    /// Whether outputs depend on inputs of the same step. Signal components
    /// without feedthrough (delays) break algebraic loops when sorting.
    fn has_direct_feedthrough(&self) -> bool {
        true
    }

    /// Problems found before simulation by components that contain a model
    /// of their own.
    fn check_model(&self) -> Vec<String> {
        Vec::new()
    }
}
