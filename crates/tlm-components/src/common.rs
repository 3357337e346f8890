//! Common utilities for component calculations.

use crate::configure::PortIdx;
use crate::context::SimContext;
use crate::error::{ComponentError, ComponentResult};
use tlm_core::Real;
use tlm_core::numeric::ensure_finite;
use tlm_graph::SlotHandle;
use tlm_graph::node::{Hydraulic, Mechanic, Signal};

/// Ensure a parameter value is finite, returning ComponentError if not.
pub fn check_finite(value: Real, what: &'static str) -> ComponentResult<()> {
    ensure_finite(value, what).map_err(|_| ComponentError::NonPhysical {
        what: what.to_string(),
    })?;
    Ok(())
}

/// Ensure a parameter value is finite and strictly positive.
pub fn check_positive(value: Real, what: &'static str) -> ComponentResult<()> {
    check_finite(value, what)?;
    if value <= 0.0 {
        return Err(ComponentError::NonPhysical {
            what: format!("{what} must be positive, got {value}"),
        });
    }
    Ok(())
}

/// Slots of one hydraulic port a TLM component touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HydraulicHandles {
    pub q: SlotHandle,
    pub p: SlotHandle,
    pub c: SlotHandle,
    pub zc: SlotHandle,
}

impl HydraulicHandles {
    pub fn resolve(ctx: &SimContext<'_>, port: PortIdx) -> ComponentResult<Self> {
        Ok(Self {
            q: ctx.handle(port, Hydraulic::Flow)?,
            p: ctx.handle(port, Hydraulic::Pressure)?,
            c: ctx.handle(port, Hydraulic::WaveVariable)?,
            zc: ctx.handle(port, Hydraulic::CharImpedance)?,
        })
    }

    /// One bundle per connection of a multiport.
    pub fn resolve_multi(ctx: &SimContext<'_>, port: PortIdx) -> ComponentResult<Vec<Self>> {
        let q = ctx.multi_handles(port, Hydraulic::Flow)?;
        let p = ctx.multi_handles(port, Hydraulic::Pressure)?;
        let c = ctx.multi_handles(port, Hydraulic::WaveVariable)?;
        let zc = ctx.multi_handles(port, Hydraulic::CharImpedance)?;
        Ok(q.into_iter()
            .zip(p)
            .zip(c.into_iter().zip(zc))
            .map(|((q, p), (c, zc))| Self { q, p, c, zc })
            .collect())
    }
}

/// Slots of one mechanic port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MechanicHandles {
    pub v: SlotHandle,
    pub f: SlotHandle,
    pub x: SlotHandle,
    pub c: SlotHandle,
    pub zc: SlotHandle,
    pub me: SlotHandle,
}

impl MechanicHandles {
    pub fn resolve(ctx: &SimContext<'_>, port: PortIdx) -> ComponentResult<Self> {
        Ok(Self {
            v: ctx.handle(port, Mechanic::Velocity)?,
            f: ctx.handle(port, Mechanic::Force)?,
            x: ctx.handle(port, Mechanic::Position)?,
            c: ctx.handle(port, Mechanic::WaveVariable)?,
            zc: ctx.handle(port, Mechanic::CharImpedance)?,
            me: ctx.handle(port, Mechanic::EquivalentMass)?,
        })
    }
}

/// Value slot of a signal port.
pub fn signal_handle(ctx: &SimContext<'_>, port: PortIdx) -> ComponentResult<SlotHandle> {
    ctx.handle(port, Signal::Value)
}

/// Value slots of every connection of a signal multiport.
pub fn signal_handles(ctx: &SimContext<'_>, port: PortIdx) -> ComponentResult<Vec<SlotHandle>> {
    ctx.multi_handles(port, Signal::Value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_positive() {
        assert!(check_positive(1.0, "volume").is_ok());
        assert!(check_positive(0.0, "volume").is_err());
        assert!(check_positive(Real::NAN, "volume").is_err());
    }
}
