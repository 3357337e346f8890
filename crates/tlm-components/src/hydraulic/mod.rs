//! Hydraulic component library.

pub mod line;
pub mod orifice;
pub mod sensor;
pub mod sources;
pub mod volume;

pub use line::HydraulicTLMlossless;
pub use orifice::{HydraulicLaminarOrifice, HydraulicTurbulentOrifice};
pub use sensor::HydraulicPressureSensor;
pub use sources::{
    HydraulicFlowSourceQ, HydraulicPressureSourceC, HydraulicPressureSourceQ, HydraulicTank,
};
pub use volume::{HydraulicVolume, HydraulicVolumeMultiPort};
