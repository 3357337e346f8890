//! Component systems: build, check, initialize and step a TLM model.
//!
//! A system owns its components, the connection topology and the node data
//! arena. Every timestep runs three tiers: signal components in dependency
//! order, then all C-type and finally all Q-type components. The stop flag is
//! checked between tiers.

use crate::error::{SimError, SimResult};
use crate::logdata::{LogData, LogSchedule, NodeLog};
use crate::options::{SimOptions, steps_between};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tlm_components::{
    Component, ComponentResult, Configurator, Parameter, ParameterSet, ResolvedPort, SimContext,
    StepEnv, stop_with_message,
};
use tlm_core::{CompId, MessageHandler, MessageKind, NodeId, Real};
use tlm_graph::{
    CqsType, GraphError, NodeArena, NodeType, Owner, PortKey, PortKind, PortSpec, SlotHandle,
    Topology,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Unconfigured,
    Initialized,
    Simulating,
    Finalized,
}

impl SystemState {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemState::Unconfigured => "unconfigured",
            SystemState::Initialized => "initialized",
            SystemState::Simulating => "simulating",
            SystemState::Finalized => "finalized",
        }
    }
}

/// How a call to [`ComponentSystem::simulate`] ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimOutcome {
    Finished,
    /// A component raised the stop flag during the step at `at`.
    Stopped { at: Real },
}

impl SimOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, SimOutcome::Finished)
    }
}

/// Outcome of a run plus its wall-clock duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measured {
    pub outcome: SimOutcome,
    pub elapsed: Duration,
}

struct Entry {
    name: String,
    id: CompId,
    cqs: CqsType,
    comp: Box<dyn Component>,
    params: ParameterSet,
    problems: Vec<String>,
    resolved: Vec<ResolvedPort>,
    disabled: bool,
}

impl Entry {
    fn runs_in(&self, cqs: CqsType) -> bool {
        !self.disabled && self.cqs == cqs
    }

    fn initialize(&mut self, env: StepEnv<'_>) -> ComponentResult<()> {
        let ctx = SimContext::new(env, &self.name, &self.resolved, &self.params);
        self.comp.initialize(&ctx)
    }

    fn step(&mut self, env: StepEnv<'_>) {
        let ctx = SimContext::new(env, &self.name, &self.resolved, &self.params);
        self.comp.simulate_one_timestep(&ctx);
    }

    fn finalize(&mut self, env: StepEnv<'_>) {
        let ctx = SimContext::new(env, &self.name, &self.resolved, &self.params);
        self.comp.finalize(&ctx);
    }
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("name", &self.name)
            .field("type_name", &self.comp.type_name())
            .field("cqs", &self.cqs)
            .field("disabled", &self.disabled)
            .finish()
    }
}

/// Run one C or Q tier, in parallel when a pool is available.
fn run_tier(
    entries: &mut [Entry],
    cqs: CqsType,
    order: &[usize],
    pool: Option<&rayon::ThreadPool>,
    env: StepEnv<'_>,
) {
    match pool {
        Some(pool) if order.len() > 1 => {
            let mut tier: Vec<&mut Entry> = entries.iter_mut().filter(|e| e.runs_in(cqs)).collect();
            pool.install(|| tier.par_iter_mut().for_each(|e| e.step(env)));
        }
        _ => {
            for &i in order {
                entries[i].step(env);
            }
        }
    }
}

/// A simulatable system of connected components.
pub struct ComponentSystem {
    name: String,
    messages: Arc<MessageHandler>,
    stop: AtomicBool,
    arena: NodeArena,
    topology: Topology,
    entries: Vec<Entry>,
    system_params: BTreeMap<String, Real>,
    desired_timestep: Option<Real>,
    timestep: Real,
    pub(crate) settings: SimOptions,
    state: SystemState,
    start_time: Real,
    stop_time: Real,
    time: Real,
    step_count: u64,
    s_order: Vec<usize>,
    c_order: Vec<usize>,
    q_order: Vec<usize>,
    node_blocks: HashMap<NodeId, SlotHandle>,
    pool: Option<rayon::ThreadPool>,
    schedule: LogSchedule,
    log: LogData,
    snapshot: HashMap<NodeId, Vec<Real>>,
}

impl std::fmt::Debug for ComponentSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSystem")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("components", &self.entries)
            .field("nodes", &self.topology.num_nodes())
            .field("timestep", &self.timestep)
            .field("time", &self.time)
            .finish()
    }
}

impl ComponentSystem {
    pub fn new(name: impl Into<String>, messages: Arc<MessageHandler>) -> Self {
        let settings = SimOptions::default();
        Self {
            name: name.into(),
            messages,
            stop: AtomicBool::new(false),
            arena: NodeArena::new(),
            topology: Topology::new(),
            entries: Vec::new(),
            system_params: BTreeMap::new(),
            desired_timestep: None,
            timestep: settings.timestep,
            settings,
            state: SystemState::Unconfigured,
            start_time: 0.0,
            stop_time: 0.0,
            time: 0.0,
            step_count: 0,
            s_order: Vec::new(),
            c_order: Vec::new(),
            q_order: Vec::new(),
            node_blocks: HashMap::new(),
            pool: None,
            schedule: LogSchedule::default(),
            log: LogData::default(),
            snapshot: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn messages(&self) -> &Arc<MessageHandler> {
        &self.messages
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn time(&self) -> Real {
        self.time
    }

    pub fn timestep(&self) -> Real {
        self.timestep
    }

    /// Timestep set explicitly on this system, if any. A subsystem without
    /// one runs at its parent's timestep.
    pub fn desired_timestep(&self) -> Option<Real> {
        self.desired_timestep
    }

    pub fn set_timestep(&mut self, timestep: Real) -> SimResult<()> {
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(SimError::InvalidArg {
                what: "timestep must be positive",
            });
        }
        self.desired_timestep = Some(timestep);
        self.timestep = timestep;
        self.settings.timestep = timestep;
        self.invalidate();
        Ok(())
    }

    /// Timestep for the next run without changing the desired timestep.
    pub(crate) fn use_timestep(&mut self, timestep: Real) {
        self.timestep = timestep;
    }

    pub fn options(&self) -> &SimOptions {
        &self.settings
    }

    /// Apply run options: timestep, logging, threads and start value policy.
    pub fn set_options(&mut self, options: &SimOptions) -> SimResult<()> {
        options.validate()?;
        self.set_timestep(options.timestep)?;
        self.settings = options.clone();
        Ok(())
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn log_data(&self) -> &LogData {
        &self.log
    }

    pub fn num_components(&self) -> usize {
        self.entries.len()
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn component_type(&self, name: &str) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.comp.type_name())
    }

    pub fn component_cqs(&self, name: &str) -> Option<CqsType> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.cqs)
    }

    fn invalidate(&mut self) {
        if self.state != SystemState::Unconfigured {
            debug!(system = %self.name, "model changed, initialization required");
            self.state = SystemState::Unconfigured;
        }
    }

    fn entry_index(&self, name: &str) -> SimResult<usize> {
        self.entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| SimError::UnknownComponent {
                name: name.to_string(),
            })
    }

    fn index_by_id(&self) -> HashMap<CompId, usize> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect()
    }

    fn unique_name(&self, base: &str) -> String {
        if !self.has_component(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.has_component(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    // ---- Building ----

    /// Configure `comp` and add it under a unique name derived from `name`
    /// (the type name when empty). Returns the name actually used.
    pub fn add_component(&mut self, name: &str, mut comp: Box<dyn Component>) -> String {
        let base = if name.is_empty() { comp.type_name() } else { name };
        let name = self.unique_name(base);
        let mut cfg = Configurator::new();
        comp.configure(&mut cfg);
        let (ports, params, problems) = cfg.finish();
        for problem in &problems {
            self.messages
                .add_message(MessageKind::Error, problem, name.as_str());
        }
        let cqs = comp.cqs_type();
        let id = self.topology.add_component(cqs, ports);
        debug!(system = %self.name, component = %name, type_name = comp.type_name(), %cqs, "component added");
        self.entries.push(Entry {
            name: name.clone(),
            id,
            cqs,
            comp,
            params,
            problems,
            resolved: Vec::new(),
            disabled: false,
        });
        self.invalidate();
        name
    }

    pub fn remove_component(&mut self, name: &str) -> SimResult<()> {
        let idx = self.entry_index(name)?;
        self.topology.remove_component(self.entries[idx].id)?;
        self.entries.remove(idx);
        self.invalidate();
        Ok(())
    }

    /// A disabled component is skipped by checks, initialize and simulate.
    pub fn set_disabled(&mut self, name: &str, disabled: bool) -> SimResult<()> {
        let idx = self.entry_index(name)?;
        self.entries[idx].disabled = disabled;
        self.invalidate();
        Ok(())
    }

    pub fn is_disabled(&self, name: &str) -> Option<bool> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.disabled)
    }

    pub fn set_parameter(&mut self, component: &str, parameter: &str, text: &str) -> SimResult<()> {
        let idx = self.entry_index(component)?;
        let entry = &mut self.entries[idx];
        entry
            .params
            .set_text(parameter, text)
            .map_err(|source| SimError::Component {
                name: entry.name.clone(),
                source,
            })?;
        self.invalidate();
        Ok(())
    }

    /// Start value of one slot of a port, e.g. `("Volume", "P1", "Pressure")`.
    pub fn set_start_value(
        &mut self,
        component: &str,
        port: &str,
        slot: &str,
        value: Real,
    ) -> SimResult<()> {
        self.set_parameter(component, &format!("{port}#{slot}"), &value.to_string())
    }

    pub fn parameter(&self, component: &str, parameter: &str) -> Option<&Parameter> {
        self.entries
            .iter()
            .find(|e| e.name == component)?
            .params
            .get(parameter)
    }

    pub fn parameters(&self, component: &str) -> SimResult<&ParameterSet> {
        Ok(&self.entries[self.entry_index(component)?].params)
    }

    pub fn set_system_parameter(&mut self, name: &str, value: Real) {
        self.system_params.insert(name.to_string(), value);
        self.invalidate();
    }

    pub fn system_parameter(&self, name: &str) -> Option<Real> {
        self.system_params.get(name).copied()
    }

    pub fn system_parameters(&self) -> &BTreeMap<String, Real> {
        &self.system_params
    }

    // ---- Ports and connections ----

    pub fn add_system_port(&mut self, name: &str) -> SimResult<usize> {
        if self.system_port_index(name).is_some() {
            return Err(SimError::InvalidArg {
                what: "system port name already in use",
            });
        }
        self.invalidate();
        Ok(self.topology.add_system_port(PortSpec::system(name)))
    }

    pub fn system_port_index(&self, name: &str) -> Option<usize> {
        self.topology
            .system_ports()
            .iter()
            .position(|p| p.spec.name == name)
    }

    pub fn system_port_names(&self) -> Vec<&str> {
        self.topology
            .system_ports()
            .iter()
            .map(|p| p.spec.name.as_str())
            .collect()
    }

    fn port_key(&self, component: &str, port: &str) -> SimResult<PortKey> {
        let id = self.entries[self.entry_index(component)?].id;
        let idx = self
            .topology
            .component_ports(id)?
            .iter()
            .position(|p| p.spec.name == port)
            .ok_or_else(|| SimError::UnknownPort {
                component: component.to_string(),
                port: port.to_string(),
            })?;
        Ok(PortKey::component(id, idx))
    }

    fn system_port_key(&self, name: &str) -> SimResult<PortKey> {
        self.system_port_index(name)
            .map(PortKey::system)
            .ok_or_else(|| SimError::UnknownSystemPort {
                name: name.to_string(),
            })
    }

    fn port_label(&self, key: PortKey) -> String {
        let port = self
            .topology
            .port(key)
            .map_or("?", |p| p.spec.name.as_str());
        match key.owner {
            Owner::System => format!("{}.{}", self.name, port),
            Owner::Component(id) => {
                let comp = self
                    .entries
                    .iter()
                    .find(|e| e.id == id)
                    .map_or("?", |e| e.name.as_str());
                format!("{comp}.{port}")
            }
        }
    }

    fn connect_keys(&mut self, a: PortKey, b: PortKey) -> SimResult<NodeId> {
        match self.topology.connect(a, b) {
            Ok(node) => {
                self.invalidate();
                Ok(node)
            }
            Err(e) => {
                let text = format!(
                    "Could not connect {} and {}: {e}",
                    self.port_label(a),
                    self.port_label(b)
                );
                self.messages
                    .add_message(MessageKind::Error, text, self.name.as_str());
                Err(e.into())
            }
        }
    }

    /// Connect two component ports by name.
    pub fn connect(
        &mut self,
        a_component: &str,
        a_port: &str,
        b_component: &str,
        b_port: &str,
    ) -> SimResult<NodeId> {
        let a = self.port_key(a_component, a_port)?;
        let b = self.port_key(b_component, b_port)?;
        self.connect_keys(a, b)
    }

    pub fn connect_system_port(
        &mut self,
        system_port: &str,
        component: &str,
        port: &str,
    ) -> SimResult<NodeId> {
        let a = self.system_port_key(system_port)?;
        let b = self.port_key(component, port)?;
        self.connect_keys(a, b)
    }

    pub fn disconnect(
        &mut self,
        a_component: &str,
        a_port: &str,
        b_component: &str,
        b_port: &str,
    ) -> SimResult<()> {
        let a = self.port_key(a_component, a_port)?;
        let b = self.port_key(b_component, b_port)?;
        self.topology.disconnect(a, b)?;
        self.invalidate();
        Ok(())
    }

    pub fn disconnect_system_port(
        &mut self,
        system_port: &str,
        component: &str,
        port: &str,
    ) -> SimResult<()> {
        let a = self.system_port_key(system_port)?;
        let b = self.port_key(component, port)?;
        self.topology.disconnect(a, b)?;
        self.invalidate();
        Ok(())
    }

    /// Node a component port is bound to, if connected.
    pub fn node_of(&self, component: &str, port: &str) -> Option<NodeId> {
        let key = self.port_key(component, port).ok()?;
        self.topology.port(key).ok()?.nodes().first().copied()
    }

    // ---- Checks ----

    fn describe(&self, issue: &GraphError) -> String {
        match issue {
            GraphError::RequiredPortUnconnected { port, .. } => {
                format!("Port {} is not connected", self.port_label(*port))
            }
            GraphError::LonelyPowerPort { port, .. } => format!(
                "Port {} is the only power port in its node, connect it to a power port of another component",
                self.port_label(*port)
            ),
            GraphError::UndefinedCqs { comp } => {
                let name = self
                    .entries
                    .iter()
                    .find(|e| e.id == *comp)
                    .map_or("?", |e| e.name.as_str());
                format!("Component {name} has an undefined CQS type")
            }
            other => other.to_string(),
        }
    }

    /// Every problem that prevents simulation: unconnected required ports,
    /// lonely power ports, undefined causality, declaration problems,
    /// parameters that do not evaluate and problems inside subsystems.
    pub fn check_model_before_simulation(&self) -> Vec<String> {
        let by_id = self.index_by_id();
        let is_active = |id: CompId| by_id.get(&id).is_some_and(|i| !self.entries[*i].disabled);
        let mut problems: Vec<String> = self
            .topology
            .check_model(is_active)
            .iter()
            .map(|issue| self.describe(issue))
            .collect();

        let lookup = |name: &str| self.system_params.get(name).copied();
        for entry in self.entries.iter().filter(|e| !e.disabled) {
            let prefixed = |p: &dyn std::fmt::Display| format!("{}: {}", entry.name, p);
            problems.extend(entry.problems.iter().map(|p| prefixed(p)));
            problems.extend(entry.params.check(&lookup).iter().map(|e| prefixed(e)));
            problems.extend(entry.comp.check_model().iter().map(|p| prefixed(p)));
        }
        problems
    }

    // ---- Initialize ----

    /// Prepare a run from `start_time` to `stop_time`.
    ///
    /// Checks the model, evaluates parameters, sorts the signal components,
    /// loads start values into the nodes and initializes every component
    /// (signal, then C, then Q). Problems are reported on the message queue
    /// and returned; the system stays unconfigured.
    pub fn initialize(&mut self, start_time: Real, stop_time: Real) -> SimResult<()> {
        info!(system = %self.name, start_time, stop_time, timestep = self.timestep, "initializing");
        self.state = SystemState::Unconfigured;
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(SimError::InvalidArg {
                what: "timestep must be positive",
            });
        }
        if !(start_time.is_finite() && stop_time.is_finite()) || stop_time < start_time {
            return Err(SimError::InvalidArg {
                what: "stop time must not be before start time",
            });
        }
        self.stop.store(false, Ordering::Release);
        self.start_time = start_time;
        self.stop_time = stop_time;
        self.time = start_time;
        self.step_count = 0;

        let problems = self.check_model_before_simulation();
        if !problems.is_empty() {
            for p in &problems {
                self.messages
                    .add_message(MessageKind::Error, p, self.name.as_str());
            }
            warn!(system = %self.name, problems = problems.len(), "model check failed");
            return Err(SimError::ModelCheck { problems });
        }

        self.evaluate_parameters()?;
        self.sort_tiers()?;
        self.allocate_nodes();
        self.resolve_ports()?;
        self.build_pool();
        self.initialize_components()?;
        self.setup_logging();

        self.state = SystemState::Initialized;
        debug!(
            system = %self.name,
            nodes = self.node_blocks.len(),
            slots = self.arena.len(),
            "initialized"
        );
        Ok(())
    }

    fn evaluate_parameters(&mut self) -> SimResult<()> {
        let system_params = &self.system_params;
        let lookup = |name: &str| system_params.get(name).copied();
        for entry in self.entries.iter_mut().filter(|e| !e.disabled) {
            if let Err(source) = entry.params.evaluate(&lookup) {
                self.messages
                    .add_message(MessageKind::Error, source.to_string(), entry.name.as_str());
                return Err(SimError::Component {
                    name: entry.name.clone(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// Signal components that must run before `idx` in the same step.
    ///
    /// Writers without direct feedthrough impose no ordering, so delays
    /// break loops.
    fn signal_dependencies(
        &self,
        idx: usize,
        by_id: &HashMap<CompId, usize>,
    ) -> SimResult<Vec<usize>> {
        let mut deps = Vec::new();
        for port in self.topology.component_ports(self.entries[idx].id)? {
            if !port.spec.kind.is_read() {
                continue;
            }
            for node in port.nodes() {
                let Some(entry) = self.topology.node(*node) else {
                    continue;
                };
                for member in entry.members() {
                    let Owner::Component(id) = member.owner else {
                        continue;
                    };
                    let Some(&j) = by_id.get(&id) else {
                        continue;
                    };
                    let writer = &self.entries[j];
                    let writes = self
                        .topology
                        .port(*member)
                        .is_ok_and(|p| p.spec.kind == PortKind::Write);
                    if writes && writer.runs_in(CqsType::S) && writer.comp.has_direct_feedthrough() {
                        deps.push(j);
                    }
                }
            }
        }
        Ok(deps)
    }

    fn sort_tiers(&mut self) -> SimResult<()> {
        let tier = |cqs: CqsType| -> Vec<usize> {
            self.entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.runs_in(cqs))
                .map(|(i, _)| i)
                .collect()
        };
        let c_order = tier(CqsType::C);
        let q_order = tier(CqsType::Q);
        let signal = tier(CqsType::S);

        let by_id = self.index_by_id();
        let mut deps: HashMap<usize, Vec<usize>> = HashMap::with_capacity(signal.len());
        for &i in &signal {
            deps.insert(i, self.signal_dependencies(i, &by_id)?);
        }

        // Repeated passes in insertion order; a pass that sorts nothing
        // leaves only components on loops.
        let mut sorted: Vec<usize> = Vec::with_capacity(signal.len());
        let mut remaining = signal;
        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|i| {
                let ready = deps
                    .get(i)
                    .is_none_or(|d| d.iter().all(|j| sorted.contains(j)));
                if ready {
                    sorted.push(*i);
                }
                !ready
            });
            if remaining.len() == before {
                break;
            }
        }

        if !remaining.is_empty() {
            let tag = self.name.as_str();
            self.messages.add_message(
                MessageKind::Error,
                "Initialize: Algebraic loops was found, signal components could not be sorted.",
                tag,
            );
            if let Some(&last) = sorted.last() {
                self.messages.add_message(
                    MessageKind::Info,
                    format!(
                        "Last component that was successfully sorted: {}",
                        self.entries[last].name
                    ),
                    tag,
                );
            }
            self.messages.add_message(
                MessageKind::Info,
                "Initialize: Hint: Use unit delay components to resolve loops.",
                tag,
            );
            return Err(SimError::AlgebraicLoop);
        }

        let order: Vec<&str> = sorted.iter().map(|i| self.entries[*i].name.as_str()).collect();
        if !order.is_empty() {
            self.messages.add_message(
                MessageKind::Debug,
                format!("Sorted signal components: {}", order.join(", ")),
                self.name.as_str(),
            );
        }
        debug!(system = %self.name, order = ?order, "signal components sorted");

        self.s_order = sorted;
        self.c_order = c_order;
        self.q_order = q_order;
        Ok(())
    }

    /// The port whose start values seed a node: a C-type power port first,
    /// then a write port, then any other power port.
    fn start_value_source(
        &self,
        members: &[PortKey],
        by_id: &HashMap<CompId, usize>,
    ) -> Option<(usize, usize)> {
        let rank = |cqs: CqsType, kind: PortKind| match (kind, cqs) {
            (PortKind::Power, CqsType::C) => 0,
            (PortKind::Write, _) => 1,
            _ => 2,
        };
        members
            .iter()
            .filter_map(|key| {
                let Owner::Component(id) = key.owner else {
                    return None;
                };
                let idx = *by_id.get(&id)?;
                let entry = &self.entries[idx];
                let kind = self.topology.port(*key).ok()?.spec.kind;
                let eligible = !entry.disabled && matches!(kind, PortKind::Power | PortKind::Write);
                eligible.then_some((rank(entry.cqs, kind), idx, key.port))
            })
            .min_by_key(|(rank, _, _)| *rank)
            .map(|(_, idx, port)| (idx, port))
    }

    fn port_start_values(&self, node_type: NodeType, source: Option<(usize, usize)>) -> Vec<Real> {
        let mut values = node_type.default_values();
        if let Some((idx, port)) = source {
            for (slot, v) in self.entries[idx].params.start_values(port) {
                if let Some(x) = values.get_mut(slot) {
                    *x = v;
                }
            }
        }
        node_type.apply_special_start_values(&mut values);
        values
    }

    fn allocate_nodes(&mut self) {
        self.arena.clear();
        self.node_blocks.clear();
        let by_id = self.index_by_id();
        let nodes: Vec<(NodeId, NodeType, Vec<PortKey>)> = self
            .topology
            .nodes()
            .map(|(id, n)| (id, n.node_type, n.members().to_vec()))
            .collect();
        for (node, node_type, members) in nodes {
            let kept = self
                .snapshot
                .get(&node)
                .filter(|v| self.settings.keep_values_as_start && v.len() == node_type.num_slots());
            let values = match kept {
                Some(v) => v.clone(),
                None => {
                    let source = self.start_value_source(&members, &by_id);
                    self.port_start_values(node_type, source)
                }
            };
            let base = self.arena.allocate(&values);
            self.node_blocks.insert(node, base);
        }
    }

    /// Bind every port to its node blocks. Unconnected single ports get a
    /// private block holding their start values.
    fn resolve_ports(&mut self) -> SimResult<()> {
        for idx in 0..self.entries.len() {
            if self.entries[idx].disabled {
                self.entries[idx].resolved.clear();
                continue;
            }
            let ports: Vec<(PortSpec, Vec<NodeId>)> = self
                .topology
                .component_ports(self.entries[idx].id)?
                .iter()
                .map(|p| (p.spec.clone(), p.nodes().to_vec()))
                .collect();
            let mut resolved = Vec::with_capacity(ports.len());
            for (port, (spec, nodes)) in ports.into_iter().enumerate() {
                let node_type = spec.node_type.or_else(|| {
                    nodes
                        .first()
                        .and_then(|n| self.topology.node(*n))
                        .map(|n| n.node_type)
                });
                let mut blocks: Vec<SlotHandle> = nodes
                    .iter()
                    .filter_map(|n| self.node_blocks.get(n).copied())
                    .collect();
                let connected = blocks.len();
                if blocks.is_empty()
                    && !spec.kind.is_multi()
                    && let Some(t) = node_type
                {
                    let values = self.port_start_values(t, Some((idx, port)));
                    blocks.push(self.arena.allocate(&values));
                }
                resolved.push(ResolvedPort {
                    name: spec.name,
                    node_type,
                    blocks,
                    connected,
                });
            }
            self.entries[idx].resolved = resolved;
        }
        Ok(())
    }

    fn build_pool(&mut self) {
        let threads = self.settings.thread_count();
        if threads <= 1 {
            self.pool = None;
            return;
        }
        if self
            .pool
            .as_ref()
            .is_some_and(|p| p.current_num_threads() == threads)
        {
            return;
        }
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => {
                debug!(system = %self.name, threads, "worker pool started");
                self.pool = Some(pool);
            }
            Err(e) => {
                self.pool = None;
                self.messages.add_message(
                    MessageKind::Warning,
                    format!("Could not start {threads} worker threads, simulating single-threaded: {e}"),
                    self.name.as_str(),
                );
            }
        }
    }

    fn initialize_components(&mut self) -> SimResult<()> {
        let env = StepEnv {
            arena: &self.arena,
            messages: &self.messages,
            stop: &self.stop,
            time: self.start_time,
            timestep: self.timestep,
        };
        let order = self
            .s_order
            .iter()
            .chain(self.c_order.iter())
            .chain(self.q_order.iter());
        for &i in order {
            let entry = &mut self.entries[i];
            if let Err(source) = entry.initialize(env) {
                self.messages.add_message(
                    MessageKind::Error,
                    format!("Initialize failed: {source}"),
                    entry.name.as_str(),
                );
                return Err(SimError::Component {
                    name: entry.name.clone(),
                    source,
                });
            }
            if self.stop.load(Ordering::Acquire) {
                return Err(SimError::InitializationStopped {
                    reason: format!("{} stopped the simulation", entry.name),
                });
            }
        }
        Ok(())
    }

    fn setup_logging(&mut self) {
        self.log = LogData::default();
        self.schedule = LogSchedule::default();
        let requested = self.settings.num_log_samples;
        if requested == 0 {
            return;
        }
        let last = steps_between(self.start_time, self.stop_time, self.timestep);
        let first = steps_between(self.start_time, self.settings.log_start_time, self.timestep);
        let (schedule, used) = LogSchedule::new(first, last, requested);
        if used < requested {
            self.messages.add_message(
                MessageKind::Warning,
                format!(
                    "Requested {requested} log samples but the simulation has only {used} logged steps, logging {used} samples"
                ),
                self.name.as_str(),
            );
        }
        if used == 0 {
            return;
        }

        let mut nodes: Vec<(NodeId, SlotHandle)> =
            self.node_blocks.iter().map(|(n, b)| (*n, *b)).collect();
        nodes.sort();
        let logs = nodes
            .into_iter()
            .filter_map(|(node, base)| {
                let entry = self.topology.node(node)?;
                let label = entry
                    .members()
                    .iter()
                    .find(|k| matches!(k.owner, Owner::Component(_)))
                    .or(entry.members().first())
                    .map_or_else(|| format!("node{node}"), |k| self.port_label(*k));
                Some(NodeLog::new(node, entry.node_type, label, base))
            })
            .collect();
        self.log = LogData::new(logs, used);
        self.schedule = schedule;
        if self.schedule.take(0) {
            self.log.sample(self.time, &self.arena);
        }
    }

    // ---- Simulate ----

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Raise the stop flag from outside the step loop.
    pub fn stop_simulation(&self, reason: &str) {
        let env = StepEnv {
            arena: &self.arena,
            messages: &self.messages,
            stop: &self.stop,
            time: self.time,
            timestep: self.timestep,
        };
        stop_with_message(env, reason, &self.name);
    }

    /// Advance one timestep. Returns false if the step was aborted.
    fn simulate_one_timestep(&mut self) -> bool {
        let step = self.step_count + 1;
        let time = self.start_time + step as Real * self.timestep;
        self.time = time;
        let env = StepEnv {
            arena: &self.arena,
            messages: &self.messages,
            stop: &self.stop,
            time,
            timestep: self.timestep,
        };

        for &i in &self.s_order {
            self.entries[i].step(env);
        }
        if self.stop.load(Ordering::Acquire) {
            return false;
        }
        run_tier(&mut self.entries, CqsType::C, &self.c_order, self.pool.as_ref(), env);
        if self.stop.load(Ordering::Acquire) {
            return false;
        }
        run_tier(&mut self.entries, CqsType::Q, &self.q_order, self.pool.as_ref(), env);
        if self.stop.load(Ordering::Acquire) {
            return false;
        }

        self.step_count = step;
        if self.schedule.take(step) {
            self.log.sample(time, &self.arena);
        }
        true
    }

    /// Step until `stop_time`. Can be called again to continue a run.
    pub fn simulate(&mut self, stop_time: Real) -> SimResult<SimOutcome> {
        match self.state {
            SystemState::Initialized | SystemState::Simulating => {}
            other => {
                return Err(SimError::InvalidState {
                    state: other.as_str(),
                });
            }
        }
        self.state = SystemState::Simulating;
        if self.is_stopped() {
            return Ok(SimOutcome::Stopped { at: self.time });
        }
        let target = steps_between(self.start_time, stop_time, self.timestep);
        while self.step_count < target {
            if !self.simulate_one_timestep() {
                warn!(system = %self.name, time = self.time, "simulation stopped");
                return Ok(SimOutcome::Stopped { at: self.time });
            }
        }
        Ok(SimOutcome::Finished)
    }

    pub fn simulate_and_measure(&mut self, stop_time: Real) -> SimResult<Measured> {
        let started = Instant::now();
        let outcome = self.simulate(stop_time)?;
        let elapsed = started.elapsed();
        info!(
            system = %self.name,
            steps = self.step_count,
            elapsed_ms = elapsed.as_secs_f64() * 1e3,
            "simulation done"
        );
        Ok(Measured { outcome, elapsed })
    }

    /// Finalize every component and remember the node values for
    /// `keep_values_as_start`.
    pub fn finalize(&mut self) -> SimResult<()> {
        match self.state {
            SystemState::Initialized | SystemState::Simulating => {}
            other => {
                return Err(SimError::InvalidState {
                    state: other.as_str(),
                });
            }
        }
        let env = StepEnv {
            arena: &self.arena,
            messages: &self.messages,
            stop: &self.stop,
            time: self.time,
            timestep: self.timestep,
        };
        let order = self
            .s_order
            .iter()
            .chain(self.c_order.iter())
            .chain(self.q_order.iter());
        for &i in order {
            self.entries[i].finalize(env);
        }
        self.snapshot = self
            .node_blocks
            .iter()
            .filter_map(|(node, base)| {
                let n = self.topology.node(*node)?.node_type.num_slots();
                Some((*node, self.arena.read_block(*base, n)))
            })
            .collect();
        self.state = SystemState::Finalized;
        debug!(system = %self.name, time = self.time, "finalized");
        Ok(())
    }

    /// Initialize, simulate and finalize with `options`.
    pub fn run(&mut self, options: &SimOptions) -> SimResult<Measured> {
        self.set_options(options)?;
        self.initialize(options.start_time, options.stop_time)?;
        let measured = self.simulate_and_measure(options.stop_time)?;
        self.finalize()?;
        Ok(measured)
    }

    // ---- Node data access ----

    /// Current value of a slot (full or short name) of a component port.
    pub fn node_value(&self, component: &str, port: &str, slot: &str) -> Option<Real> {
        let entry = self.entries.iter().find(|e| e.name == component)?;
        let resolved = entry.resolved.iter().find(|p| p.name == port)?;
        let idx = resolved.node_type?.slot_index(slot)?;
        Some(self.arena.get(resolved.blocks.first()?.offset(idx)))
    }

    /// Logged values of the node a component port is bound to.
    pub fn port_log(&self, component: &str, port: &str) -> Option<&NodeLog> {
        self.log.node(self.node_of(component, port)?)
    }

    /// Node block behind an inner system port, once initialized.
    pub(crate) fn system_port_block(&self, port: usize) -> Option<SlotHandle> {
        let node = self.topology.system_ports().get(port)?.nodes().first()?;
        self.node_blocks.get(node).copied()
    }
}
