//! Translational mechanic component library.

pub mod mass;
pub mod springs;

pub use mass::MechanicTranslationalMass;
pub use springs::{MechanicForceSource, MechanicSpring};
