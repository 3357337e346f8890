//! tlm-core: stable foundation for the TLM simulation kernel.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for nodes, components and ports)
//! - messages (bounded, thread-safe message queue)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod messages;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{TlmError, TlmResult};
pub use ids::*;
pub use messages::{DEFAULT_MAX_QUEUE_SIZE, Message, MessageHandler, MessageKind};
pub use numeric::*;
