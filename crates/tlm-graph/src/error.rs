//! Graph-specific error types.

use crate::node::NodeType;
use crate::port::{CqsType, Owner, PortKey};
use thiserror::Error;
use tlm_core::{CompId, NodeId, TlmError};

/// Connection and model-check errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("You can not connect a port to itself ({port})")]
    SelfConnection { port: PortKey },

    #[error("You can not connect a MultiPort to another MultiPort")]
    MultiToMulti,

    #[error("You can not connect a ReadPort to a MultiPort")]
    ReadToMulti,

    #[error("You can not connect two blank system ports to each other")]
    BlankSystemPorts,

    #[error("You can not connect a {a} port to a {b} port")]
    NodeTypeMismatch { a: NodeType, b: NodeType },

    #[error("These ports are already connected")]
    AlreadyConnected,

    #[error("The multiport {port} is already connected to this node")]
    MultiportAlreadyInNode { port: PortKey },

    /// The node would get two power ports of the same causality.
    #[error("You can not connect two {cqs}-type power ports to each other")]
    CqsConflict { cqs: CqsType },

    #[error("You can not connect two write ports to the same signal node")]
    MultipleWriters,

    #[error("These ports are not connected")]
    NotConnected,

    #[error("Unknown component {comp}")]
    UnknownComponent { comp: CompId },

    #[error("Unknown port: {port}")]
    UnknownPort { port: PortKey },

    #[error("Unknown node {node}")]
    UnknownNode { node: NodeId },

    /// A required port has no connection.
    #[error("{}", unconnected_message(.port, .name))]
    RequiredPortUnconnected { port: PortKey, name: String },

    #[error(
        "Node {node} has only one power port ({port}), connect it to a power port of another component"
    )]
    LonelyPowerPort { node: NodeId, port: PortKey },

    #[error("Component {comp} has an undefined CQS type")]
    UndefinedCqs { comp: CompId },
}

pub type GraphResult<T> = Result<T, GraphError>;

fn unconnected_message(port: &PortKey, name: &str) -> String {
    match port.owner {
        Owner::System => format!("System port {name} is not connected"),
        Owner::Component(c) => format!("Port {name} on component {c} is not connected"),
    }
}

impl From<GraphError> for TlmError {
    fn from(err: GraphError) -> Self {
        TlmError::Invariant {
            what: err.to_string(),
        }
    }
}
