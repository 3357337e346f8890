//! Flat storage for node data.
//!
//! All node slots of a system live in one vector. Components resolve a
//! [`SlotHandle`] once at initialize and read/write through it every step.
//! Slots are atomics holding `f64` bits so that components of the same tier
//! can run on different threads; the connect rules guarantee that each slot
//! has a single writer per tier.

use std::sync::atomic::{AtomicU64, Ordering};
use tlm_core::Real;

/// Index of one `f64` in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotHandle(usize);

impl SlotHandle {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Handle `offset` slots further on (the n-th slot of a node block).
    pub fn offset(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

#[derive(Debug, Default)]
pub struct NodeArena {
    data: Vec<AtomicU64>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a contiguous block initialized with `values`; returns its first slot.
    pub fn allocate(&mut self, values: &[Real]) -> SlotHandle {
        let base = SlotHandle(self.data.len());
        self.data
            .extend(values.iter().map(|v| AtomicU64::new(v.to_bits())));
        base
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Read a slot. Out-of-range handles read as zero.
    #[inline]
    pub fn get(&self, handle: SlotHandle) -> Real {
        self.data
            .get(handle.0)
            .map_or(0.0, |a| Real::from_bits(a.load(Ordering::Relaxed)))
    }

    /// Write a slot. Out-of-range handles are ignored.
    #[inline]
    pub fn set(&self, handle: SlotHandle, value: Real) {
        if let Some(a) = self.data.get(handle.0) {
            a.store(value.to_bits(), Ordering::Relaxed);
        }
    }

    /// Copy of `len` slots starting at `base`.
    pub fn read_block(&self, base: SlotHandle, len: usize) -> Vec<Real> {
        (0..len).map(|i| self.get(base.offset(i))).collect()
    }

    pub fn write_block(&self, base: SlotHandle, values: &[Real]) {
        for (i, v) in values.iter().enumerate() {
            self.set(base.offset(i), *v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_contiguous() {
        let mut arena = NodeArena::new();
        let a = arena.allocate(&[1.0, 2.0]);
        let b = arena.allocate(&[3.0]);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 2);
        assert_eq!(arena.get(a.offset(1)), 2.0);
        arena.set(b, -4.5);
        assert_eq!(arena.read_block(a, 3), vec![1.0, 2.0, -4.5]);
    }

    #[test]
    fn out_of_range_is_harmless() {
        let arena = NodeArena::new();
        arena.set(SlotHandle::new(3), 1.0);
        assert_eq!(arena.get(SlotHandle::new(3)), 0.0);
    }

    #[test]
    fn shared_writes_across_threads() {
        let mut arena = NodeArena::new();
        let base = arena.allocate(&[0.0; 8]);
        std::thread::scope(|s| {
            for i in 0..8 {
                let arena = &arena;
                s.spawn(move || arena.set(base.offset(i), i as f64));
            }
        });
        assert_eq!(arena.read_block(base, 8), (0..8).map(|i| i as f64).collect::<Vec<_>>());
    }
}
