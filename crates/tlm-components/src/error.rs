//! Error types for component configuration and initialization.

use thiserror::Error;
use tlm_core::TlmError;
use tlm_graph::NodeType;
use tlm_utilities::UtilError;

/// Errors a component can raise before simulation starts.
///
/// Failures during a timestep are not errors: components report them on the
/// message queue and raise the stop flag instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: String },

    #[error("Parameter {name} with value \"{text}\" could not be evaluated")]
    ParameterEvaluation { name: String, text: String },

    #[error("There is no parameter named {name}")]
    UnknownParameter { name: String },

    #[error("There is no port with index {index}")]
    UnknownPort { index: usize },

    #[error("Port {port} is a {actual} port, expected {expected}")]
    NodeTypeMismatch {
        port: String,
        expected: NodeType,
        actual: NodeType,
    },

    #[error("Subsystem {name}: {message}")]
    Subsystem { name: String, message: String },

    #[error("Utility error: {0}")]
    Utility(#[from] UtilError),
}

pub type ComponentResult<T> = Result<T, ComponentError>;

impl From<ComponentError> for TlmError {
    fn from(e: ComponentError) -> Self {
        match e {
            ComponentError::InvalidArg { what } => TlmError::InvalidArg { what },
            ComponentError::Utility(u) => u.into(),
            other => TlmError::Invariant {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ComponentError::ParameterEvaluation {
            name: "Kc".into(),
            text: "oops".into(),
        };
        assert_eq!(
            err.to_string(),
            "Parameter Kc with value \"oops\" could not be evaluated"
        );
    }

    #[test]
    fn error_conversion() {
        let err: ComponentError = UtilError::InvalidArg { what: "steps" }.into();
        let tlm: TlmError = err.into();
        assert!(matches!(tlm, TlmError::InvalidArg { what: "steps" }));
    }
}
