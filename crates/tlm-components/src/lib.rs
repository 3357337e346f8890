//! tlm-components: the component contract and a reference component library.
//!
//! Provides:
//! - The `Component` trait with its configure/initialize/step lifecycle
//! - Port and parameter declaration through `Configurator`
//! - `SimContext`, the typed view of node data a component gets while stepping
//! - A string-keyed `Factory` and the built-in hydraulic, mechanic and signal
//!   components
//!
//! Components never fail during a step. They report problems on the message
//! queue and raise the owning system's stop flag through the context.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tlm_components::{Configurator, Factory, register_default_components};
//! use tlm_core::MessageHandler;
//!
//! let mut factory = Factory::new(Arc::new(MessageHandler::new()));
//! register_default_components(&mut factory);
//!
//! let mut orifice = factory.create("HydraulicLaminarOrifice").unwrap();
//! let mut cfg = Configurator::new();
//! orifice.configure(&mut cfg);
//! assert_eq!(cfg.ports().len(), 3);
//! assert!(cfg.params().get("Kc").is_some());
//! ```

pub mod common;
pub mod configure;
pub mod context;
pub mod error;
pub mod factory;
pub mod hydraulic;
pub mod library;
pub mod mechanic;
pub mod parameter;
pub mod signal;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use configure::{Configurator, PortIdx};
pub use context::{ResolvedPort, SimContext, StepEnv, stop_with_message};
pub use error::{ComponentError, ComponentResult};
pub use factory::Factory;
pub use library::register_default_components;
pub use parameter::{ParamIdx, ParamKind, Parameter, ParameterSet};
pub use traits::Component;
