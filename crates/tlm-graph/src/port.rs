//! Port kinds and port declarations.

use crate::node::NodeType;
use tlm_core::CompId;

/// Causality class of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CqsType {
    /// Produces wave variables and characteristic impedances.
    C,
    /// Consumes `c`/`Zc` and produces flow and intensity.
    Q,
    /// Signal component.
    S,
    Undefined,
}

impl CqsType {
    pub fn as_str(self) -> &'static str {
        match self {
            CqsType::C => "C",
            CqsType::Q => "Q",
            CqsType::S => "S",
            CqsType::Undefined => "UndefinedCQSType",
        }
    }
}

impl std::fmt::Display for CqsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PortKind {
    /// Bidirectional physical port.
    Power,
    /// Reads a node without writing it.
    Read,
    /// Writes a signal node.
    Write,
    /// Power port that may bind to any number of nodes.
    PowerMulti,
    /// Read port that may bind to any number of nodes.
    ReadMulti,
    /// Boundary port of a system, mapped onto an inner port.
    System,
}

impl PortKind {
    pub fn is_multi(self) -> bool {
        matches!(self, PortKind::PowerMulti | PortKind::ReadMulti)
    }

    pub fn is_read(self) -> bool {
        matches!(self, PortKind::Read | PortKind::ReadMulti)
    }

    pub fn is_power(self) -> bool {
        matches!(self, PortKind::Power | PortKind::PowerMulti)
    }

    pub fn name(self) -> &'static str {
        match self {
            PortKind::Power => "PowerPort",
            PortKind::Read => "ReadPort",
            PortKind::Write => "WritePort",
            PortKind::PowerMulti => "PowerMultiPort",
            PortKind::ReadMulti => "ReadMultiPort",
            PortKind::System => "SystemPort",
        }
    }
}

/// Declaration of a port, made once when a component is configured.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub name: String,
    pub kind: PortKind,
    /// `None` for a system port until something is connected to it.
    pub node_type: Option<NodeType>,
    pub required: bool,
    pub description: String,
}

impl PortSpec {
    pub fn new(name: impl Into<String>, kind: PortKind, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            kind,
            node_type: Some(node_type),
            required: true,
            description: String::new(),
        }
    }

    pub fn system(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::System,
            node_type: None,
            required: false,
            description: String::new(),
        }
    }

    pub fn not_required(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Who owns a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    /// The enclosing system (boundary ports).
    System,
    Component(CompId),
}

/// Address of a port: owner plus port index within the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortKey {
    pub owner: Owner,
    pub port: usize,
}

impl PortKey {
    pub fn component(comp: CompId, port: usize) -> Self {
        Self {
            owner: Owner::Component(comp),
            port,
        }
    }

    pub fn system(port: usize) -> Self {
        Self {
            owner: Owner::System,
            port,
        }
    }
}

impl std::fmt::Display for PortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.owner {
            Owner::System => write!(f, "system port {}", self.port),
            Owner::Component(c) => write!(f, "component {} port {}", c, self.port),
        }
    }
}
