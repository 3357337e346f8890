//! tlm-utilities: numerical building blocks shared by TLM components.
//!
//! Provides:
//! - `Delay`: fixed-length circular delay buffer
//! - First- and second-order bilinear transfer functions (fixed and variable timestep)
//! - Dense LU decomposition with partial pivoting (`ludcmp`, `pivot`, `solvlu`)
//! - `EquationSystemSolver` for damped Newton steps inside Q-type components
//! - 1D and 2D lookup tables with linear interpolation, fed from numeric CSV data
//!
//! # Example
//!
//! ```
//! use tlm_utilities::Delay;
//!
//! let mut delay = Delay::new_steps(2, 0.0).unwrap();
//! assert_eq!(delay.update(1.0), 0.0);
//! assert_eq!(delay.update(2.0), 0.0);
//! assert_eq!(delay.update(3.0), 1.0);
//! ```

pub mod csv;
pub mod delay;
pub mod equation_solver;
pub mod error;
pub mod linalg;
pub mod lookup;
pub mod second_order;
pub mod transfer;

// Re-exports
pub use csv::{CsvData, CsvOptions};
pub use delay::Delay;
pub use equation_solver::{
    DAMPING_WEIGHTS, EquationSystemSolver, FailureReporter, SINGULAR_JACOBIAN_MESSAGE, damping_weight,
};
pub use error::{UtilError, UtilResult};
pub use linalg::{Matrix, Vector, ludcmp, pivot, solvlu};
pub use lookup::{LookupTable1D, LookupTable2D, is_strictly_increasing};
pub use second_order::{SecondOrderTransferFunction, SecondOrderTransferFunctionVariable};
pub use transfer::{
    FirstOrderLowPassFilter, FirstOrderTransferFunction, FirstOrderTransferFunctionVariable,
};
