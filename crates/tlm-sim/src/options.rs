//! Simulation options.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use tlm_core::Real;

/// Options for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Start time (seconds)
    pub start_time: Real,
    /// Stop time (seconds)
    pub stop_time: Real,
    /// Fixed timestep (seconds)
    pub timestep: Real,
    /// Number of evenly spaced log samples between `log_start_time` and `stop_time`
    pub num_log_samples: usize,
    /// Time of the first log sample (seconds)
    pub log_start_time: Real,
    /// Worker threads for the C and Q tiers; `None` or `Some(1)` runs single-threaded
    pub threads: Option<usize>,
    /// Start from the node values of the previous run instead of start values
    pub keep_values_as_start: bool,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 10.0,
            timestep: 1e-3,
            num_log_samples: 2048,
            log_start_time: 0.0,
            threads: None,
            keep_values_as_start: false,
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(SimError::InvalidOptions {
                what: "timestep must be positive",
            });
        }
        if !(self.start_time.is_finite() && self.stop_time.is_finite()) {
            return Err(SimError::InvalidOptions {
                what: "start and stop time must be finite",
            });
        }
        if self.stop_time < self.start_time {
            return Err(SimError::InvalidOptions {
                what: "stop time must not be before start time",
            });
        }
        if self.threads == Some(0) {
            return Err(SimError::InvalidOptions {
                what: "threads must be at least one",
            });
        }
        Ok(())
    }

    /// Number of worker threads, 1 when single-threaded.
    pub fn thread_count(&self) -> usize {
        self.threads.unwrap_or(1).max(1)
    }

    /// Number of whole timesteps between start and stop.
    pub fn num_steps(&self) -> u64 {
        steps_between(self.start_time, self.stop_time, self.timestep)
    }
}

/// Whole timesteps from `start` to `stop`, rounded to nearest.
pub fn steps_between(start: Real, stop: Real, timestep: Real) -> u64 {
    if !(timestep > 0.0) || stop <= start {
        return 0;
    }
    ((stop - start) / timestep + 0.5).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let opts = SimOptions::default();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.thread_count(), 1);
        assert_eq!(opts.num_steps(), 10_000);
    }

    #[test]
    fn bad_options_are_rejected() {
        let mut opts = SimOptions {
            timestep: 0.0,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
        opts.timestep = 1e-3;
        opts.stop_time = -1.0;
        assert!(opts.validate().is_err());
        opts.stop_time = 1.0;
        opts.threads = Some(0);
        assert!(opts.validate().is_err());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: SimOptions =
            serde_json::from_str(r#"{ "stop_time": 0.5, "threads": 4 }"#).unwrap();
        assert_eq!(opts.stop_time, 0.5);
        assert_eq!(opts.thread_count(), 4);
        assert_eq!(opts.timestep, 1e-3);
    }
}
