//! Connection topology: which ports share which node.
//!
//! Connecting two ports either creates a node, adds one port to the other's
//! node, or merges two nodes. A multiport gets a fresh sub-connection for
//! every connection, so it can sit in any number of nodes.

use crate::error::{GraphError, GraphResult};
use crate::node::NodeType;
use crate::port::{CqsType, Owner, PortKey, PortKind, PortSpec};
use tlm_core::{CompId, Id, NodeId};

/// A declared port and the nodes it is bound to.
#[derive(Debug, Clone, PartialEq)]
pub struct PortEntry {
    pub spec: PortSpec,
    nodes: Vec<NodeId>,
}

impl PortEntry {
    fn new(spec: PortSpec) -> Self {
        Self {
            spec,
            nodes: Vec::new(),
        }
    }

    /// Bound nodes; at most one unless this is a multiport.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn is_connected(&self) -> bool {
        !self.nodes.is_empty()
    }
}

/// A node shared by two or more ports.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEntry {
    pub node_type: NodeType,
    members: Vec<PortKey>,
}

impl NodeEntry {
    pub fn members(&self) -> &[PortKey] {
        &self.members
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ComponentEntry {
    cqs: CqsType,
    ports: Vec<PortEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Topology {
    components: Vec<Option<ComponentEntry>>,
    system_ports: Vec<PortEntry>,
    nodes: Vec<Option<NodeEntry>>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Components and ports ----

    pub fn add_component(&mut self, cqs: CqsType, ports: Vec<PortSpec>) -> CompId {
        let id = Id::from_index(self.components.len() as u32);
        self.components.push(Some(ComponentEntry {
            cqs,
            ports: ports.into_iter().map(PortEntry::new).collect(),
        }));
        id
    }

    /// Disconnect every port of `comp` and forget it.
    pub fn remove_component(&mut self, comp: CompId) -> GraphResult<()> {
        let num_ports = self.component(comp)?.ports.len();
        for port in 0..num_ports {
            self.detach_port(PortKey::component(comp, port))?;
        }
        self.components[comp.slot()] = None;
        Ok(())
    }

    pub fn set_cqs(&mut self, comp: CompId, cqs: CqsType) -> GraphResult<()> {
        self.component_mut(comp)?.cqs = cqs;
        Ok(())
    }

    pub fn cqs(&self, comp: CompId) -> GraphResult<CqsType> {
        Ok(self.component(comp)?.cqs)
    }

    pub fn component_ids(&self) -> impl Iterator<Item = CompId> + '_ {
        self.components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_some())
            .map(|(i, _)| Id::from_index(i as u32))
    }

    pub fn component_ports(&self, comp: CompId) -> GraphResult<&[PortEntry]> {
        Ok(&self.component(comp)?.ports)
    }

    pub fn add_system_port(&mut self, spec: PortSpec) -> usize {
        self.system_ports.push(PortEntry::new(spec));
        self.system_ports.len() - 1
    }

    pub fn system_ports(&self) -> &[PortEntry] {
        &self.system_ports
    }

    pub fn port(&self, key: PortKey) -> GraphResult<&PortEntry> {
        let found = match key.owner {
            Owner::System => self.system_ports.get(key.port),
            Owner::Component(c) => self.component(c)?.ports.get(key.port),
        };
        found.ok_or(GraphError::UnknownPort { port: key })
    }

    fn port_mut(&mut self, key: PortKey) -> GraphResult<&mut PortEntry> {
        let found = match key.owner {
            Owner::System => self.system_ports.get_mut(key.port),
            Owner::Component(c) => self.component_mut(c)?.ports.get_mut(key.port),
        };
        found.ok_or(GraphError::UnknownPort { port: key })
    }

    fn component(&self, comp: CompId) -> GraphResult<&ComponentEntry> {
        self.components
            .get(comp.slot())
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownComponent { comp })
    }

    fn component_mut(&mut self, comp: CompId) -> GraphResult<&mut ComponentEntry> {
        self.components
            .get_mut(comp.slot())
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownComponent { comp })
    }

    /// Causality of the component owning `key`; system ports have none.
    pub fn owner_cqs(&self, key: PortKey) -> Option<CqsType> {
        match key.owner {
            Owner::System => None,
            Owner::Component(c) => self.cqs(c).ok(),
        }
    }

    /// Declared node type, or for a system port the type of its node.
    pub fn node_type_of(&self, key: PortKey) -> GraphResult<Option<NodeType>> {
        let entry = self.port(key)?;
        if let Some(t) = entry.spec.node_type {
            return Ok(Some(t));
        }
        Ok(entry
            .nodes
            .first()
            .and_then(|n| self.node(*n))
            .map(|n| n.node_type))
    }

    // ---- Nodes ----

    pub fn node(&self, id: NodeId) -> Option<&NodeEntry> {
        self.nodes.get(id.slot()).and_then(Option::as_ref)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeEntry)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (Id::from_index(i as u32), n)))
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Node shared by both ports, if any.
    pub fn shared_node(&self, a: PortKey, b: PortKey) -> Option<NodeId> {
        let pa = self.port(a).ok()?;
        let pb = self.port(b).ok()?;
        pa.nodes.iter().copied().find(|n| pb.nodes.contains(n))
    }

    /// Every other port sharing a node with `key`.
    pub fn connected_ports(&self, key: PortKey) -> Vec<PortKey> {
        let Ok(entry) = self.port(key) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for node in &entry.nodes {
            if let Some(n) = self.node(*node) {
                out.extend(n.members.iter().copied().filter(|m| *m != key));
            }
        }
        out
    }

    /// The node a non-multiport would join; multiports always start a new
    /// sub-connection.
    fn joinable_node(&self, key: PortKey) -> GraphResult<Option<NodeId>> {
        let entry = self.port(key)?;
        if entry.spec.kind.is_multi() {
            Ok(None)
        } else {
            Ok(entry.nodes.first().copied())
        }
    }

    // ---- Connect / disconnect ----

    /// Connect two ports, returning the node they now share.
    pub fn connect(&mut self, a: PortKey, b: PortKey) -> GraphResult<NodeId> {
        if a == b {
            return Err(GraphError::SelfConnection { port: a });
        }
        let ka = self.port(a)?.spec.kind;
        let kb = self.port(b)?.spec.kind;
        if ka.is_multi() && kb.is_multi() {
            return Err(GraphError::MultiToMulti);
        }
        if (ka.is_read() && kb.is_multi()) || (kb.is_read() && ka.is_multi()) {
            return Err(GraphError::ReadToMulti);
        }

        let node_type = match (self.node_type_of(a)?, self.node_type_of(b)?) {
            (None, None) => return Err(GraphError::BlankSystemPorts),
            (Some(x), Some(y)) if x != y => return Err(GraphError::NodeTypeMismatch { a: x, b: y }),
            (Some(x), _) | (_, Some(x)) => x,
        };

        if self.shared_node(a, b).is_some() {
            return Err(GraphError::AlreadyConnected);
        }

        let na = self.joinable_node(a)?;
        let nb = self.joinable_node(b)?;
        for (multi, kind, other) in [(a, ka, nb), (b, kb, na)] {
            if let (true, Some(n)) = (kind.is_multi(), other)
                && self.node(n).is_some_and(|n| n.members.contains(&multi))
            {
                return Err(GraphError::MultiportAlreadyInNode { port: multi });
            }
        }

        let mut members: Vec<PortKey> = Vec::new();
        for n in [na, nb].into_iter().flatten() {
            if let Some(node) = self.node(n) {
                for key in &node.members {
                    // A multiport sitting in both nodes would end up in the merged node twice.
                    if members.contains(key) {
                        return Err(GraphError::MultiportAlreadyInNode { port: *key });
                    }
                    members.push(*key);
                }
            }
        }
        for key in [a, b] {
            if !members.contains(&key) {
                members.push(key);
            }
        }
        self.check_members(node_type, &members)?;

        let node = match (na, nb) {
            (None, None) => {
                let id = Id::from_index(self.nodes.len() as u32);
                self.nodes.push(Some(NodeEntry {
                    node_type,
                    members: vec![a, b],
                }));
                self.port_mut(a)?.nodes.push(id);
                self.port_mut(b)?.nodes.push(id);
                id
            }
            (Some(n), None) => {
                self.add_member(n, b)?;
                n
            }
            (None, Some(n)) => {
                self.add_member(n, a)?;
                n
            }
            (Some(x), Some(y)) => {
                self.merge(x, y)?;
                x
            }
        };
        tracing::debug!(%a, %b, %node, %node_type, "connected");
        Ok(node)
    }

    fn check_members(&self, node_type: NodeType, members: &[PortKey]) -> GraphResult<()> {
        let mut num_c = 0;
        let mut num_q = 0;
        let mut writers = 0;
        for key in members {
            let kind = self.port(*key)?.spec.kind;
            if kind == PortKind::Write {
                writers += 1;
            }
            if !node_type.is_signal() && kind.is_power() {
                match self.owner_cqs(*key) {
                    Some(CqsType::C) => num_c += 1,
                    Some(CqsType::Q) => num_q += 1,
                    _ => {}
                }
            }
        }
        if num_c > 1 {
            return Err(GraphError::CqsConflict { cqs: CqsType::C });
        }
        if num_q > 1 {
            return Err(GraphError::CqsConflict { cqs: CqsType::Q });
        }
        if writers > 1 {
            return Err(GraphError::MultipleWriters);
        }
        Ok(())
    }

    fn add_member(&mut self, node: NodeId, key: PortKey) -> GraphResult<()> {
        self.nodes
            .get_mut(node.slot())
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownNode { node })?
            .members
            .push(key);
        self.port_mut(key)?.nodes.push(node);
        Ok(())
    }

    /// Move every member of `from` into `into` and delete `from`.
    fn merge(&mut self, into: NodeId, from: NodeId) -> GraphResult<()> {
        let moved = self
            .nodes
            .get_mut(from.slot())
            .and_then(Option::take)
            .ok_or(GraphError::UnknownNode { node: from })?;
        for key in moved.members {
            let entry = self.port_mut(key)?;
            for n in entry.nodes.iter_mut().filter(|n| **n == from) {
                *n = into;
            }
            self.nodes
                .get_mut(into.slot())
                .and_then(Option::as_mut)
                .ok_or(GraphError::UnknownNode { node: into })?
                .members
                .push(key);
        }
        Ok(())
    }

    /// Undo a connection between two ports.
    ///
    /// A two-port node is deleted. In a larger node the multiport (if any)
    /// or else `b` leaves the node.
    pub fn disconnect(&mut self, a: PortKey, b: PortKey) -> GraphResult<()> {
        if a == b {
            return Err(GraphError::NotConnected);
        }
        let node = self.shared_node(a, b).ok_or(GraphError::NotConnected)?;
        let num_members = self.node(node).map_or(0, |n| n.members.len());
        if num_members <= 2 {
            self.delete_node(node)?;
        } else {
            let victim = if self.port(a)?.spec.kind.is_multi() { a } else { b };
            self.leave_node(node, victim)?;
        }
        tracing::debug!(%a, %b, %node, "disconnected");
        Ok(())
    }

    /// Remove `key` from every node it belongs to.
    pub fn detach_port(&mut self, key: PortKey) -> GraphResult<()> {
        let nodes = self.port(key)?.nodes.clone();
        for node in nodes {
            self.leave_node(node, key)?;
        }
        Ok(())
    }

    fn leave_node(&mut self, node: NodeId, key: PortKey) -> GraphResult<()> {
        let entry = self
            .nodes
            .get_mut(node.slot())
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownNode { node })?;
        entry.members.retain(|m| *m != key);
        let remaining = entry.members.len();
        self.port_mut(key)?.nodes.retain(|n| *n != node);
        if remaining < 2 {
            self.delete_node(node)?;
        }
        Ok(())
    }

    fn delete_node(&mut self, node: NodeId) -> GraphResult<()> {
        let entry = self
            .nodes
            .get_mut(node.slot())
            .and_then(Option::take)
            .ok_or(GraphError::UnknownNode { node })?;
        for key in entry.members {
            self.port_mut(key)?.nodes.retain(|n| *n != node);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hyd(name: &str) -> PortSpec {
        PortSpec::new(name, PortKind::Power, NodeType::Hydraulic)
    }

    #[test]
    fn connect_creates_and_reuses_nodes() {
        let mut t = Topology::new();
        let q = t.add_component(CqsType::Q, vec![hyd("P1"), hyd("P2")]);
        let c = t.add_component(CqsType::C, vec![hyd("P1")]);
        let sensor = t.add_component(
            CqsType::S,
            vec![PortSpec::new("P1", PortKind::Read, NodeType::Hydraulic)],
        );

        let n = t.connect(PortKey::component(q, 0), PortKey::component(c, 0)).unwrap();
        let n2 = t
            .connect(PortKey::component(sensor, 0), PortKey::component(c, 0))
            .unwrap();
        assert_eq!(n, n2);
        assert_eq!(t.node(n).unwrap().members().len(), 3);
        assert_eq!(t.num_nodes(), 1);
        assert_eq!(t.connected_ports(PortKey::component(q, 0)).len(), 2);
    }

    #[test]
    fn merge_two_nodes_through_system_port() {
        let mut t = Topology::new();
        let q = t.add_component(CqsType::Q, vec![hyd("P1")]);
        let c = t.add_component(CqsType::C, vec![hyd("P1")]);
        let sp = t.add_system_port(PortSpec::system("S"));
        let ssp = PortKey::system(sp);

        let n1 = t.connect(ssp, PortKey::component(q, 0)).unwrap();
        assert_eq!(t.node_type_of(ssp).unwrap(), Some(NodeType::Hydraulic));
        let n2 = t.connect(ssp, PortKey::component(c, 0)).unwrap();
        assert_eq!(n1, n2);
        assert_eq!(t.num_nodes(), 1);
    }

    #[test]
    fn merging_existing_nodes() {
        let mut t = Topology::new();
        let q = t.add_component(CqsType::Q, vec![hyd("P1")]);
        let c = t.add_component(CqsType::C, vec![hyd("P1")]);
        let s1 = PortKey::system(t.add_system_port(PortSpec::system("A")));
        let s2 = PortKey::system(t.add_system_port(PortSpec::system("B")));
        t.connect(s1, PortKey::component(q, 0)).unwrap();
        t.connect(s2, PortKey::component(c, 0)).unwrap();
        assert_eq!(t.num_nodes(), 2);
        let merged = t.connect(s1, s2).unwrap();
        assert_eq!(t.num_nodes(), 1);
        assert_eq!(t.node(merged).unwrap().members().len(), 4);
        assert_eq!(t.port(PortKey::component(c, 0)).unwrap().nodes(), &[merged]);
    }

    #[test]
    fn multiport_gets_one_node_per_connection() {
        let mut t = Topology::new();
        let vol = t.add_component(
            CqsType::C,
            vec![PortSpec::new("P1", PortKind::PowerMulti, NodeType::Hydraulic)],
        );
        let a = t.add_component(CqsType::Q, vec![hyd("P1")]);
        let b = t.add_component(CqsType::Q, vec![hyd("P1")]);
        let mp = PortKey::component(vol, 0);
        t.connect(mp, PortKey::component(a, 0)).unwrap();
        t.connect(PortKey::component(b, 0), mp).unwrap();
        assert_eq!(t.port(mp).unwrap().nodes().len(), 2);
        assert_eq!(t.num_nodes(), 2);

        t.disconnect(mp, PortKey::component(a, 0)).unwrap();
        assert_eq!(t.port(mp).unwrap().nodes().len(), 1);
        assert!(!t.port(PortKey::component(a, 0)).unwrap().is_connected());
    }

    #[test]
    fn connect_rules() {
        let mut t = Topology::new();
        let c1 = t.add_component(CqsType::C, vec![hyd("P1")]);
        let c2 = t.add_component(CqsType::C, vec![hyd("P1")]);
        let q1 = t.add_component(CqsType::Q, vec![hyd("P1"), hyd("P2")]);
        let m1 = t.add_component(
            CqsType::C,
            vec![PortSpec::new("P1", PortKind::PowerMulti, NodeType::Hydraulic)],
        );
        let m2 = t.add_component(
            CqsType::C,
            vec![PortSpec::new("P1", PortKind::PowerMulti, NodeType::Hydraulic)],
        );
        let r = t.add_component(
            CqsType::S,
            vec![PortSpec::new("in", PortKind::Read, NodeType::Hydraulic)],
        );
        let sig = t.add_component(
            CqsType::S,
            vec![PortSpec::new("out", PortKind::Write, NodeType::Signal)],
        );
        let s1 = PortKey::system(t.add_system_port(PortSpec::system("A")));
        let s2 = PortKey::system(t.add_system_port(PortSpec::system("B")));

        let p = PortKey::component;
        assert_eq!(
            t.connect(p(c1, 0), p(c1, 0)),
            Err(GraphError::SelfConnection { port: p(c1, 0) })
        );
        assert_eq!(t.connect(p(m1, 0), p(m2, 0)), Err(GraphError::MultiToMulti));
        assert_eq!(t.connect(p(r, 0), p(m1, 0)), Err(GraphError::ReadToMulti));
        assert_eq!(t.connect(s1, s2), Err(GraphError::BlankSystemPorts));
        assert!(matches!(
            t.connect(p(c1, 0), p(sig, 0)),
            Err(GraphError::NodeTypeMismatch { .. })
        ));
        assert_eq!(
            t.connect(p(c1, 0), p(c2, 0)),
            Err(GraphError::CqsConflict { cqs: CqsType::C })
        );

        t.connect(p(c1, 0), p(q1, 0)).unwrap();
        assert_eq!(t.connect(p(q1, 0), p(c1, 0)), Err(GraphError::AlreadyConnected));

        t.connect(p(m1, 0), p(q1, 1)).unwrap();
        assert_eq!(
            t.connect(p(m1, 0), p(q1, 1)),
            Err(GraphError::AlreadyConnected)
        );
    }

    #[test]
    fn single_writer_per_signal_node() {
        let mut t = Topology::new();
        let w = |t: &mut Topology| {
            t.add_component(
                CqsType::S,
                vec![PortSpec::new("out", PortKind::Write, NodeType::Signal)],
            )
        };
        let a = w(&mut t);
        let b = w(&mut t);
        assert_eq!(
            t.connect(PortKey::component(a, 0), PortKey::component(b, 0)),
            Err(GraphError::MultipleWriters)
        );
    }

    #[test]
    fn read_multiport_cannot_join_a_node_twice_through_a_merge() {
        let mut t = Topology::new();
        let gauge = t.add_component(
            CqsType::S,
            vec![PortSpec::new("in", PortKind::ReadMulti, NodeType::Hydraulic)],
        );
        let q = t.add_component(CqsType::Q, vec![hyd("P1")]);
        let c = t.add_component(CqsType::C, vec![hyd("P1")]);
        let s1 = PortKey::system(t.add_system_port(PortSpec::system("A")));
        let s2 = PortKey::system(t.add_system_port(PortSpec::system("B")));
        let mp = PortKey::component(gauge, 0);
        t.connect(s1, PortKey::component(q, 0)).unwrap();
        t.connect(s2, PortKey::component(c, 0)).unwrap();
        t.connect(mp, s1).unwrap();
        t.connect(mp, s2).unwrap();

        assert_eq!(
            t.connect(s1, s2),
            Err(GraphError::MultiportAlreadyInNode { port: mp })
        );
        assert_eq!(t.num_nodes(), 2);
        assert_eq!(t.port(mp).unwrap().nodes().len(), 2);
    }

    #[test]
    fn disconnecting_a_port_from_itself_is_rejected() {
        let mut t = Topology::new();
        let c = t.add_component(CqsType::C, vec![hyd("P1")]);
        let q = t.add_component(CqsType::Q, vec![hyd("P1")]);
        let p = PortKey::component;
        t.connect(p(c, 0), p(q, 0)).unwrap();
        assert_eq!(t.disconnect(p(c, 0), p(c, 0)), Err(GraphError::NotConnected));
        assert_eq!(t.num_nodes(), 1);
    }

    #[test]
    fn disconnect_and_remove_component() {
        let mut t = Topology::new();
        let c = t.add_component(CqsType::C, vec![hyd("P1")]);
        let q = t.add_component(CqsType::Q, vec![hyd("P1")]);
        let r = t.add_component(
            CqsType::S,
            vec![PortSpec::new("in", PortKind::Read, NodeType::Hydraulic)],
        );
        let p = PortKey::component;
        let n = t.connect(p(c, 0), p(q, 0)).unwrap();
        t.connect(p(r, 0), p(c, 0)).unwrap();

        t.disconnect(p(c, 0), p(r, 0)).unwrap();
        assert_eq!(t.node(n).unwrap().members().len(), 2);
        assert_eq!(t.disconnect(p(c, 0), p(r, 0)), Err(GraphError::NotConnected));

        t.remove_component(q).unwrap();
        assert_eq!(t.num_nodes(), 0);
        assert!(!t.port(p(c, 0)).unwrap().is_connected());
        assert_eq!(t.component_ids().count(), 2);
        assert!(matches!(t.cqs(q), Err(GraphError::UnknownComponent { .. })));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Connect(usize, usize),
        Disconnect(usize, usize),
        Detach(usize),
    }

    fn op(num_ports: usize) -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0..num_ports, 0..num_ports).prop_map(|(a, b)| Op::Connect(a, b)),
            2 => (0..num_ports, 0..num_ports).prop_map(|(a, b)| Op::Disconnect(a, b)),
            1 => (0..num_ports).prop_map(Op::Detach),
        ]
    }

    /// Volume with a power multiport, two orifices, a sensor with a read
    /// multiport, a gauge and two system ports.
    fn network() -> (Topology, Vec<PortKey>) {
        let hyd = |name: &str, kind| PortSpec::new(name, kind, NodeType::Hydraulic);
        let mut t = Topology::new();
        let volume = t.add_component(CqsType::C, vec![hyd("P1", PortKind::PowerMulti)]);
        let in_orifice = t.add_component(
            CqsType::Q,
            vec![hyd("P1", PortKind::Power), hyd("P2", PortKind::Power)],
        );
        let out_orifice = t.add_component(
            CqsType::Q,
            vec![hyd("P1", PortKind::Power), hyd("P2", PortKind::Power)],
        );
        let sensor = t.add_component(CqsType::S, vec![hyd("in", PortKind::ReadMulti)]);
        let gauge = t.add_component(CqsType::S, vec![hyd("in", PortKind::Read)]);
        let a = t.add_system_port(PortSpec::system("A"));
        let b = t.add_system_port(PortSpec::system("B"));
        let p = PortKey::component;
        let ports = vec![
            p(volume, 0),
            p(in_orifice, 0),
            p(in_orifice, 1),
            p(out_orifice, 0),
            p(out_orifice, 1),
            p(sensor, 0),
            p(gauge, 0),
            PortKey::system(a),
            PortKey::system(b),
        ];
        (t, ports)
    }

    fn check_consistent(t: &Topology, ports: &[PortKey]) -> Result<(), TestCaseError> {
        for (id, node) in t.nodes() {
            prop_assert!(node.members().len() >= 2, "node {} has {:?}", id, node.members());
            for m in node.members() {
                prop_assert_eq!(node.members().iter().filter(|k| *k == m).count(), 1);
                prop_assert!(t.port(*m).unwrap().nodes().contains(&id));
            }
        }
        for key in ports {
            let entry = t.port(*key).unwrap();
            if !entry.spec.kind.is_multi() {
                prop_assert!(entry.nodes().len() <= 1, "{} in {:?}", key, entry.nodes());
            }
            for n in entry.nodes() {
                prop_assert!(t.node(*n).is_some_and(|node| node.members().contains(key)));
            }
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn ports_and_nodes_agree_after_any_edit_sequence(
            ops in prop::collection::vec(op(9), 1..60)
        ) {
            let (mut t, ports) = network();
            for op in ops {
                match op {
                    Op::Connect(a, b) => {
                        if let Ok(node) = t.connect(ports[a], ports[b]) {
                            prop_assert_eq!(t.shared_node(ports[a], ports[b]), Some(node));
                        }
                    }
                    Op::Disconnect(a, b) => {
                        if t.disconnect(ports[a], ports[b]).is_ok() {
                            prop_assert_eq!(t.shared_node(ports[a], ports[b]), None);
                        }
                    }
                    Op::Detach(a) => {
                        t.detach_port(ports[a]).unwrap();
                        prop_assert!(!t.port(ports[a]).unwrap().is_connected());
                    }
                }
                check_consistent(&t, &ports)?;
            }
        }
    }
}
