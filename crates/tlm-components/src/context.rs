//! What a component sees while it initializes and steps.

use crate::configure::PortIdx;
use crate::error::{ComponentError, ComponentResult};
use crate::parameter::{ParamIdx, ParameterSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tlm_core::{MessageHandler, MessageKind, Real};
use tlm_graph::{NodeArena, NodeSlot, NodeType, SlotHandle};
use tlm_utilities::FailureReporter;

/// Node data blocks a port is bound to.
///
/// A single port always has exactly one block: its node's, or a private
/// block holding its start values when unconnected. A multiport has one block
/// per connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPort {
    pub name: String,
    pub node_type: Option<NodeType>,
    pub blocks: Vec<SlotHandle>,
    pub connected: usize,
}

/// System-wide state shared by every component during one step.
#[derive(Debug, Clone, Copy)]
pub struct StepEnv<'a> {
    pub arena: &'a NodeArena,
    pub messages: &'a MessageHandler,
    pub stop: &'a AtomicBool,
    pub time: Real,
    pub timestep: Real,
}

/// Per-component view of the running system.
#[derive(Debug, Clone, Copy)]
pub struct SimContext<'a> {
    env: StepEnv<'a>,
    name: &'a str,
    ports: &'a [ResolvedPort],
    params: &'a ParameterSet,
}

impl<'a> SimContext<'a> {
    pub fn new(
        env: StepEnv<'a>,
        name: &'a str,
        ports: &'a [ResolvedPort],
        params: &'a ParameterSet,
    ) -> Self {
        Self {
            env,
            name,
            ports,
            params,
        }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn time(&self) -> Real {
        self.env.time
    }

    pub fn timestep(&self) -> Real {
        self.env.timestep
    }

    pub fn messages(&self) -> &'a MessageHandler {
        self.env.messages
    }

    pub fn arena(&self) -> &'a NodeArena {
        self.env.arena
    }

    // ---- Ports ----

    pub fn port(&self, port: PortIdx) -> ComponentResult<&'a ResolvedPort> {
        self.ports
            .get(port.0)
            .ok_or(ComponentError::UnknownPort { index: port.0 })
    }

    fn checked_port<S: NodeSlot>(&self, port: PortIdx) -> ComponentResult<&'a ResolvedPort> {
        let resolved = self.port(port)?;
        match resolved.node_type {
            Some(t) if t == S::NODE_TYPE => Ok(resolved),
            Some(actual) => Err(ComponentError::NodeTypeMismatch {
                port: resolved.name.clone(),
                expected: S::NODE_TYPE,
                actual,
            }),
            None => Err(ComponentError::InvalidArg {
                what: "port has no node type",
            }),
        }
    }

    /// Handle of one slot of a single port's node.
    pub fn handle<S: NodeSlot>(&self, port: PortIdx, slot: S) -> ComponentResult<SlotHandle> {
        let resolved = self.checked_port::<S>(port)?;
        resolved
            .blocks
            .first()
            .map(|b| b.offset(slot.index()))
            .ok_or(ComponentError::InvalidArg {
                what: "port has no node data",
            })
    }

    /// Handles of one slot in every node of a multiport.
    pub fn multi_handles<S: NodeSlot>(
        &self,
        port: PortIdx,
        slot: S,
    ) -> ComponentResult<Vec<SlotHandle>> {
        let resolved = self.checked_port::<S>(port)?;
        Ok(resolved
            .blocks
            .iter()
            .map(|b| b.offset(slot.index()))
            .collect())
    }

    /// Untyped handle of slot `slot` in sub-connection `sub` of `port`.
    pub fn slot_handle(&self, port: PortIdx, sub: usize, slot: usize) -> ComponentResult<SlotHandle> {
        let resolved = self.port(port)?;
        resolved
            .blocks
            .get(sub)
            .map(|b| b.offset(slot))
            .ok_or(ComponentError::UnknownPort { index: port.0 })
    }

    pub fn num_connected(&self, port: PortIdx) -> usize {
        self.ports.get(port.0).map_or(0, |p| p.connected)
    }

    pub fn is_connected(&self, port: PortIdx) -> bool {
        self.num_connected(port) > 0
    }

    #[inline]
    pub fn read(&self, handle: SlotHandle) -> Real {
        self.env.arena.get(handle)
    }

    #[inline]
    pub fn write(&self, handle: SlotHandle, value: Real) {
        self.env.arena.set(handle, value);
    }

    // ---- Parameters ----

    pub fn param(&self, idx: ParamIdx) -> Real {
        self.params.value(idx)
    }

    pub fn param_text(&self, idx: ParamIdx) -> &'a str {
        self.params.text(idx)
    }

    /// Parameter by name, for components with dynamic parameter lists.
    pub fn param_by_name(&self, name: &str) -> Option<Real> {
        self.params.get(name).map(|p| p.value())
    }

    // ---- Messages and stopping ----

    pub fn add_message(&self, kind: MessageKind, text: impl AsRef<str>) {
        self.env.messages.add_message(kind, text, self.name);
    }

    pub fn add_info_message(&self, text: impl AsRef<str>) {
        self.add_message(MessageKind::Info, text);
    }

    pub fn add_warning_message(&self, text: impl AsRef<str>) {
        self.add_message(MessageKind::Warning, text);
    }

    pub fn add_error_message(&self, text: impl AsRef<str>) {
        self.add_message(MessageKind::Error, text);
    }

    pub fn add_debug_message(&self, text: impl AsRef<str>) {
        self.add_message(MessageKind::Debug, text);
    }

    /// Raise the system's stop flag; the scheduler aborts after the current tier.
    pub fn stop_simulation(&self, reason: &str) {
        stop_with_message(self.env, reason, self.name);
    }

    pub fn is_stopped(&self) -> bool {
        self.env.stop.load(Ordering::Acquire)
    }
}

/// Raise the stop flag and queue the stop notice, once.
pub fn stop_with_message(env: StepEnv<'_>, reason: &str, tag: &str) {
    if !env.stop.swap(true, Ordering::AcqRel) {
        let text = if reason.is_empty() {
            format!("Simulation was stopped at t={}", env.time)
        } else {
            format!("Simulation was stopped at t={} : {}", env.time, reason)
        };
        env.messages.add_message(MessageKind::Info, text, tag);
    }
}

impl FailureReporter for SimContext<'_> {
    fn add_error_message(&self, message: &str) {
        SimContext::add_error_message(self, message);
    }

    fn stop_simulation(&self, reason: &str) {
        SimContext::stop_simulation(self, reason);
    }
}
