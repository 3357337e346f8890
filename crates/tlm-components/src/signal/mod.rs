//! Signal component library.

pub mod delay;
pub mod filter;
pub mod lookup;
pub mod math;
pub mod sources;

pub use delay::{SignalTimeDelay, SignalUnitDelay, SignalVariableTimeDelay};
pub use filter::{SignalFirstOrderFilter, SignalSecondOrderFilter};
pub use lookup::{Signal1DLookupTable, Signal2DLookupTable};
pub use math::{SignalGain, SignalSum};
pub use sources::{SignalConstant, SignalStep};
