//! Fixed-length circular delay buffer.
//!
//! A buffer of `n` slots delays its input by exactly `n` calls to
//! [`Delay::update`]: `update(x_k)` returns `x_{k-n}`. Each call represents one
//! timestep of flight time, so a buffer must be updated exactly once per step.

use crate::error::{UtilError, UtilResult};
use tlm_core::Real;

/// Circular delay buffer.
///
/// The default value is an empty buffer that passes its input straight
/// through; use [`Delay::new_steps`] or [`Delay::new_time`] to get a real delay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delay {
    values: Vec<Real>,
    newest: usize,
    oldest: usize,
}

/// Number of delay steps for a time delay, rounded to nearest.
pub fn delay_steps_for(time_delay: Real, timestep: Real) -> UtilResult<usize> {
    if !(timestep.is_finite() && timestep > 0.0) {
        return Err(UtilError::InvalidArg {
            what: "timestep must be positive and finite",
        });
    }
    if !(time_delay.is_finite() && time_delay >= 0.0) {
        return Err(UtilError::InvalidArg {
            what: "time delay must be non-negative and finite",
        });
    }
    Ok((time_delay / timestep + 0.5).floor() as usize)
}

impl Delay {
    /// Buffer delaying by `delay_steps` samples, filled with `init_value`.
    pub fn new_steps(delay_steps: usize, init_value: Real) -> UtilResult<Self> {
        let mut delay = Self::default();
        delay.initialize_steps(delay_steps, init_value)?;
        Ok(delay)
    }

    /// Buffer delaying by `round(time_delay / timestep)` samples.
    pub fn new_time(time_delay: Real, timestep: Real, init_value: Real) -> UtilResult<Self> {
        let mut delay = Self::default();
        delay.initialize_time(time_delay, timestep, init_value)?;
        Ok(delay)
    }

    /// Reallocate for `delay_steps` samples. Zero steps is rejected; callers
    /// wanting a zero delay must bypass the buffer.
    pub fn initialize_steps(&mut self, delay_steps: usize, init_value: Real) -> UtilResult<()> {
        if delay_steps == 0 {
            return Err(UtilError::InvalidArg {
                what: "delay steps must be at least one",
            });
        }
        self.values = vec![init_value; delay_steps];
        self.oldest = 0;
        self.newest = delay_steps - 1;
        Ok(())
    }

    pub fn initialize_time(
        &mut self,
        time_delay: Real,
        timestep: Real,
        init_value: Real,
    ) -> UtilResult<()> {
        let steps = delay_steps_for(time_delay, timestep)?;
        self.initialize_steps(steps, init_value)
    }

    /// Overwrite every slot with `value` without changing the length.
    pub fn fill(&mut self, value: Real) {
        self.values.fill(value);
    }

    /// Overwrite every slot with zero.
    pub fn clear(&mut self) {
        self.fill(0.0);
    }

    /// Push `value` and return the sample that was oldest before the push.
    pub fn update(&mut self, value: Real) -> Real {
        let n = self.values.len();
        if n == 0 {
            return value;
        }
        let oldest = self.values[self.oldest];
        self.oldest = (self.oldest + 1) % n;
        self.newest = (self.newest + 1) % n;
        self.values[self.newest] = value;
        oldest
    }

    pub fn get_oldest(&self) -> Real {
        self.values.get(self.oldest).copied().unwrap_or(0.0)
    }

    pub fn get_newest(&self) -> Real {
        self.values.get(self.newest).copied().unwrap_or(0.0)
    }

    /// Sample `i` steps back from the newest (0 = newest). Wraps modulo the length.
    pub fn get_idx(&self, i: usize) -> Real {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        self.values[(self.newest + n - i % n) % n]
    }

    /// Sample `i` steps forward from the oldest (0 = oldest). Wraps modulo the length.
    pub fn get_old_idx(&self, i: usize) -> Real {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        self.values[(self.oldest + i % n) % n]
    }

    /// Number of delay steps.
    pub fn get_size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Samples from oldest to newest.
    pub fn to_vec(&self) -> Vec<Real> {
        (0..self.values.len()).map(|i| self.get_old_idx(i)).collect()
    }

    /// Change the delay length between timesteps.
    ///
    /// Shrinking keeps the oldest `delay_steps` samples; growing keeps all
    /// samples and pads with the newest one.
    pub fn resize(&mut self, delay_steps: usize) -> UtilResult<()> {
        if delay_steps == 0 {
            return Err(UtilError::InvalidArg {
                what: "delay steps must be at least one",
            });
        }
        if self.values.is_empty() {
            return self.initialize_steps(delay_steps, 0.0);
        }
        let newest = self.get_newest();
        let mut values = self.to_vec();
        values.resize(delay_steps, newest);
        self.values = values;
        self.oldest = 0;
        self.newest = delay_steps - 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_steps_is_rejected() {
        assert!(Delay::new_steps(0, 1.0).is_err());
        assert!(Delay::new_time(0.0004, 0.001, 1.0).is_err());
        assert!(Delay::new_time(0.1, 0.0, 1.0).is_err());
    }

    #[test]
    fn time_delay_rounds_to_nearest() {
        assert_eq!(Delay::new_time(0.1, 0.001, 0.0).unwrap().get_size(), 100);
        assert_eq!(Delay::new_time(0.0026, 0.001, 0.0).unwrap().get_size(), 3);
        assert_eq!(Delay::new_time(0.0024, 0.001, 0.0).unwrap().get_size(), 2);
    }

    #[test]
    fn indexing_from_both_ends() {
        let mut d = Delay::new_steps(3, 0.0).unwrap();
        d.update(1.0);
        d.update(2.0);
        d.update(3.0);
        assert_eq!(d.get_newest(), 3.0);
        assert_eq!(d.get_oldest(), 1.0);
        assert_eq!(d.get_idx(0), 3.0);
        assert_eq!(d.get_idx(1), 2.0);
        assert_eq!(d.get_idx(2), 1.0);
        assert_eq!(d.get_idx(3), 3.0);
        assert_eq!(d.get_old_idx(0), 1.0);
        assert_eq!(d.get_old_idx(2), 3.0);
        assert_eq!(d.get_old_idx(4), 2.0);
        assert_eq!(d.to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn single_slot_delays_by_one() {
        let mut d = Delay::new_steps(1, 5.0).unwrap();
        assert_eq!(d.update(1.0), 5.0);
        assert_eq!(d.update(2.0), 1.0);
        assert_eq!(d.get_oldest(), 2.0);
        assert_eq!(d.get_newest(), 2.0);
    }

    #[test]
    fn empty_buffer_passes_through() {
        let mut d = Delay::default();
        assert!(d.is_empty());
        assert_eq!(d.update(4.0), 4.0);
        assert_eq!(d.get_oldest(), 0.0);
        assert_eq!(d.get_idx(3), 0.0);
    }

    #[test]
    fn resize_shrink_keeps_oldest() {
        let mut d = Delay::new_steps(4, 0.0).unwrap();
        for x in [1.0, 2.0, 3.0, 4.0] {
            d.update(x);
        }
        d.resize(2).unwrap();
        assert_eq!(d.to_vec(), vec![1.0, 2.0]);
        assert_eq!(d.update(9.0), 1.0);
        assert_eq!(d.update(9.0), 2.0);
    }

    #[test]
    fn resize_grow_pads_with_newest() {
        let mut d = Delay::new_steps(2, 0.0).unwrap();
        d.update(1.0);
        d.update(2.0);
        d.resize(4).unwrap();
        assert_eq!(d.to_vec(), vec![1.0, 2.0, 2.0, 2.0]);
        assert_eq!(d.get_size(), 4);
        assert!(d.resize(0).is_err());
    }

    #[test]
    fn fill_and_clear() {
        let mut d = Delay::new_steps(3, 1.0).unwrap();
        d.fill(7.0);
        assert_eq!(d.to_vec(), vec![7.0; 3]);
        d.clear();
        assert_eq!(d.get_oldest(), 0.0);
    }

    proptest! {
        #[test]
        fn round_trip_after_n_updates(n in 1usize..64, v0 in -1e6f64..1e6, xs in proptest::collection::vec(-1e6f64..1e6, 64)) {
            let mut d = Delay::new_steps(n, v0).unwrap();
            prop_assert_eq!(d.get_size(), n);
            for x in xs.iter().take(n - 1) {
                prop_assert_eq!(d.update(*x), v0);
            }
            prop_assert_eq!(d.get_oldest(), v0);
            prop_assert_eq!(d.update(xs[n - 1]), v0);
            prop_assert_eq!(d.get_oldest(), xs[0]);
        }

        #[test]
        fn update_returns_input_from_n_steps_back(n in 1usize..16, xs in proptest::collection::vec(-1e3f64..1e3, 16..64)) {
            let mut d = Delay::new_steps(n, 0.0).unwrap();
            let outputs: Vec<f64> = xs.iter().map(|x| d.update(*x)).collect();
            for k in n..xs.len() {
                prop_assert_eq!(outputs[k], xs[k - n]);
            }
        }
    }
}
