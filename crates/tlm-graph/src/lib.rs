//! tlm-graph: nodes, ports and connection topology for TLM systems.
//!
//! Provides:
//! - Node domains with their stable, ordered data slots
//! - A flat node data arena addressed by slot handles
//! - Port kinds and declarations
//! - Connection topology enforcing the connect rules
//! - Pre-simulation model checks
//!
//! # Example
//!
//! ```
//! use tlm_graph::{CqsType, NodeType, PortKey, PortKind, PortSpec, Topology};
//!
//! let mut topo = Topology::new();
//! let volume = topo.add_component(
//!     CqsType::C,
//!     vec![PortSpec::new("P1", PortKind::Power, NodeType::Hydraulic)],
//! );
//! let orifice = topo.add_component(
//!     CqsType::Q,
//!     vec![PortSpec::new("P1", PortKind::Power, NodeType::Hydraulic)],
//! );
//! let node = topo
//!     .connect(PortKey::component(volume, 0), PortKey::component(orifice, 0))
//!     .unwrap();
//! assert_eq!(topo.node(node).unwrap().members().len(), 2);
//! assert!(topo.check_model(|_| true).is_empty());
//! ```

pub mod arena;
pub mod error;
pub mod node;
pub mod port;
pub mod topology;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use arena::{NodeArena, SlotHandle};
pub use error::{GraphError, GraphResult};
pub use node::{NodeSlot, NodeType, SlotInfo, SlotKind};
pub use port::{CqsType, Owner, PortKey, PortKind, PortSpec};
pub use topology::{NodeEntry, PortEntry, Topology};
