//! Node data logging.
//!
//! A run logs `num_log_samples` evenly spaced samples of every node between
//! the log start time and the stop time. Samples are taken from the node
//! arena after a full step, so a stopped run keeps everything logged so far.

use std::io::Write;
use tlm_core::{NodeId, Real};
use tlm_graph::{NodeArena, NodeType, SlotHandle};

/// Logged values of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeLog {
    pub node: NodeId,
    pub node_type: NodeType,
    /// Human readable name, `<component>.<port>` of the first member port.
    pub label: String,
    base: SlotHandle,
    /// One row of slot values per sample.
    rows: Vec<Vec<Real>>,
}

impl NodeLog {
    pub fn new(node: NodeId, node_type: NodeType, label: String, base: SlotHandle) -> Self {
        Self {
            node,
            node_type,
            label,
            base,
            rows: Vec::new(),
        }
    }

    /// Time series of one slot.
    pub fn series(&self, slot: usize) -> Option<Vec<Real>> {
        if slot >= self.node_type.num_slots() {
            return None;
        }
        Some(self.rows.iter().map(|r| r[slot]).collect())
    }

    /// Time series of a slot given by full or short name.
    pub fn series_by_name(&self, slot: &str) -> Option<Vec<Real>> {
        self.series(self.node_type.slot_index(slot)?)
    }

    pub fn rows(&self) -> &[Vec<Real>] {
        &self.rows
    }
}

/// Which steps of a run are sampled.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct LogSchedule {
    steps: Vec<u64>,
    next: usize,
}

impl LogSchedule {
    /// Spread `samples` log points over steps `first..=last`.
    ///
    /// Returns the schedule and the number of samples actually used, which
    /// is smaller than requested when there are too few steps.
    pub(crate) fn new(first: u64, last: u64, samples: usize) -> (Self, usize) {
        if samples == 0 || last < first {
            return (Self::default(), 0);
        }
        let available = (last - first + 1) as usize;
        let used = samples.min(available);
        let steps = if used == 1 {
            vec![first]
        } else {
            let span = (last - first) as f64;
            (0..used)
                .map(|i| first + (i as f64 * span / (used - 1) as f64).round() as u64)
                .collect()
        };
        (Self { steps, next: 0 }, used)
    }

    /// True once for every scheduled step.
    pub(crate) fn take(&mut self, step: u64) -> bool {
        while self.steps.get(self.next).is_some_and(|s| *s < step) {
            self.next += 1;
        }
        if self.steps.get(self.next) == Some(&step) {
            self.next += 1;
            true
        } else {
            false
        }
    }
}

/// Logged node data of the last run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogData {
    times: Vec<Real>,
    nodes: Vec<NodeLog>,
}

impl LogData {
    pub(crate) fn new(nodes: Vec<NodeLog>, capacity: usize) -> Self {
        let mut nodes = nodes;
        for n in &mut nodes {
            n.rows.reserve(capacity);
        }
        Self {
            times: Vec::with_capacity(capacity),
            nodes,
        }
    }

    pub(crate) fn sample(&mut self, time: Real, arena: &NodeArena) {
        self.times.push(time);
        for n in &mut self.nodes {
            n.rows.push(arena.read_block(n.base, n.node_type.num_slots()));
        }
    }

    pub fn times(&self) -> &[Real] {
        &self.times
    }

    pub fn num_samples(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn nodes(&self) -> &[NodeLog] {
        &self.nodes
    }

    pub fn node(&self, node: NodeId) -> Option<&NodeLog> {
        self.nodes.iter().find(|n| n.node == node)
    }

    /// Write every logged slot as CSV, one row per sample.
    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        let mut header = vec!["time".to_string()];
        for n in &self.nodes {
            for slot in n.node_type.slots() {
                header.push(format!("{}.{}", n.label, slot.name));
            }
        }
        writeln!(out, "{}", header.join(","))?;
        for (i, t) in self.times.iter().enumerate() {
            let mut row = vec![t.to_string()];
            for n in &self.nodes {
                row.extend(n.rows[i].iter().map(|v| v.to_string()));
            }
            writeln!(out, "{}", row.join(","))?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn schedule_hits_each_step_once_within_range(
            first in 0u64..500,
            span in 0u64..2000,
            samples in 0usize..300,
        ) {
            let last = first + span;
            let (mut s, used) = LogSchedule::new(first, last, samples);
            let hits: Vec<u64> = (0..=last + 1).filter(|k| s.take(*k)).collect();

            prop_assert_eq!(hits.len(), used);
            prop_assert_eq!(used, samples.min(span as usize + 1));
            prop_assert!(hits.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(hits.iter().all(|k| (first..=last).contains(k)));
            if used > 0 {
                prop_assert_eq!(hits.first(), Some(&first));
            }
            if used > 1 {
                prop_assert_eq!(hits.last(), Some(&last));
            }
        }
    }
}
