//! Error types for building, checking and running component systems.

use thiserror::Error;
use tlm_components::ComponentError;
use tlm_core::TlmError;
use tlm_graph::GraphError;

/// Errors raised before or between simulations.
///
/// Failures inside a running simulation are never errors: they stop the run
/// and are reported through the message queue and [`SimOutcome`](crate::SimOutcome).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid simulation options: {what}")]
    InvalidOptions { what: &'static str },

    #[error("Component type {type_name} is not registered")]
    UnknownComponentType { type_name: String },

    #[error("There is no component named {name}")]
    UnknownComponent { name: String },

    #[error("Component {component} has no port named {port}")]
    UnknownPort { component: String, port: String },

    #[error("There is no system port named {name}")]
    UnknownSystemPort { name: String },

    #[error("Connection error: {0}")]
    Graph(#[from] GraphError),

    #[error("Component {name}: {source}")]
    Component {
        name: String,
        #[source]
        source: ComponentError,
    },

    #[error("Model check failed with {} problem(s)", problems.len())]
    ModelCheck { problems: Vec<String> },

    #[error("Algebraic loops was found, signal components could not be sorted")]
    AlgebraicLoop,

    #[error("Initialization was stopped: {reason}")]
    InitializationStopped { reason: String },

    #[error("Operation not allowed in state {state}")]
    InvalidState { state: &'static str },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<SimError> for TlmError {
    fn from(e: SimError) -> Self {
        match e {
            SimError::InvalidArg { what } | SimError::InvalidOptions { what } => {
                TlmError::InvalidArg { what }
            }
            other => TlmError::Invariant {
                what: other.to_string(),
            },
        }
    }
}
