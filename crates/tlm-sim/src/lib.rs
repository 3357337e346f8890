//! tlm-sim: component systems and the simulation loop.
//!
//! Provides:
//! - `ComponentSystem`: building, model checks, initialize and the S/C/Q
//!   tier loop with a cooperative stop flag
//! - `Subsystem`: a system used as a component of another system
//! - `Engine`: owns the component factory and the shared message queue
//! - `SimOptions` and node data logging
//!
//! # Example
//!
//! ```
//! use tlm_sim::{Engine, SimOptions};
//!
//! let engine = Engine::new();
//! let mut sys = engine.create_system("Root");
//! engine.add_component(&mut sys, "HydraulicPressureSourceQ", "Source").unwrap();
//! engine.add_component(&mut sys, "HydraulicVolume", "Volume").unwrap();
//! engine.add_component(&mut sys, "HydraulicTank", "Tank").unwrap();
//! engine.add_component(&mut sys, "HydraulicLaminarOrifice", "Orifice").unwrap();
//! sys.connect("Source", "P1", "Volume", "P1").unwrap();
//! sys.connect("Volume", "P2", "Orifice", "P1").unwrap();
//! sys.connect("Orifice", "P2", "Tank", "P1").unwrap();
//!
//! let opts = SimOptions { stop_time: 0.1, ..Default::default() };
//! let run = engine.run(&mut sys, &opts).unwrap();
//! assert!(run.outcome.is_finished());
//! ```

pub mod engine;
pub mod error;
pub mod logdata;
pub mod options;
pub mod subsystem;
pub mod system;

// Re-exports
pub use engine::Engine;
pub use error::{SimError, SimResult};
pub use logdata::{LogData, NodeLog};
pub use options::SimOptions;
pub use subsystem::Subsystem;
pub use system::{ComponentSystem, Measured, SimOutcome, SystemState};
