//! First-order transfer functions discretized with the bilinear transform.
//!
//! Continuous form: `G(s) = (num[1]*s + num[0]) / (den[1]*s + den[0])`.
//! Coefficient arrays are indexed by power of `s`, so the DC gain is
//! `num[0] / den[0]`.
//!
//! Substituting `s -> (2/Ts)(1 - z^-1)/(1 + z^-1)` gives the recurrence
//!
//! ```text
//! y = (cu[1]*u + cu[0]*u_prev - cy[0]*y_prev) / cy[1]
//! ```
//!
//! Output saturation is sticky: the clamped value becomes the stored history.

use crate::delay::Delay;
use crate::error::{UtilError, UtilResult};
use tlm_core::{Real, limit};

pub(crate) fn check_timestep(timestep: Real) -> UtilResult<()> {
    if timestep.is_finite() && timestep > 0.0 {
        Ok(())
    } else {
        Err(UtilError::InvalidArg {
            what: "timestep must be positive and finite",
        })
    }
}

/// Discrete coefficients for one polynomial `[p0, p1]`.
fn bilinear(poly: &[Real; 2], timestep: Real) -> [Real; 2] {
    [
        poly[0] * timestep - 2.0 * poly[1],
        poly[0] * timestep + 2.0 * poly[1],
    ]
}

fn check_den(den: &[Real; 2], timestep: Real) -> UtilResult<()> {
    let coeff_y = bilinear(den, timestep);
    if coeff_y[1] == 0.0 || !coeff_y[1].is_finite() {
        return Err(UtilError::InvalidArg {
            what: "denominator is degenerate at this timestep",
        });
    }
    Ok(())
}

/// Fixed-timestep first-order transfer function.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstOrderTransferFunction {
    timestep: Real,
    num: [Real; 2],
    den: [Real; 2],
    coeff_u: [Real; 2],
    coeff_y: [Real; 2],
    delayed_u: Real,
    delayed_y: Real,
    value: Real,
    min: Real,
    max: Real,
    saturated: bool,
    /// Saved `(delayed_u, delayed_y)` histories, newest first.
    backup_u: Delay,
    backup_y: Delay,
}

impl Default for FirstOrderTransferFunction {
    /// Unity static gain until initialized.
    fn default() -> Self {
        let mut tf = Self {
            timestep: 1.0,
            num: [1.0, 0.0],
            den: [1.0, 0.0],
            coeff_u: [0.0; 2],
            coeff_y: [0.0; 2],
            delayed_u: 0.0,
            delayed_y: 0.0,
            value: 0.0,
            min: Real::NEG_INFINITY,
            max: Real::INFINITY,
            saturated: false,
            backup_u: Delay::default(),
            backup_y: Delay::default(),
        };
        tf.recompute();
        tf
    }
}

impl FirstOrderTransferFunction {
    /// Create and initialize with unbounded output.
    pub fn new(
        timestep: Real,
        num: [Real; 2],
        den: [Real; 2],
        u0: Real,
        y0: Real,
    ) -> UtilResult<Self> {
        let mut tf = Self::default();
        tf.initialize(timestep, num, den, u0, y0, Real::NEG_INFINITY, Real::INFINITY)?;
        Ok(tf)
    }

    pub fn initialize(
        &mut self,
        timestep: Real,
        num: [Real; 2],
        den: [Real; 2],
        u0: Real,
        y0: Real,
        min: Real,
        max: Real,
    ) -> UtilResult<()> {
        check_timestep(timestep)?;
        self.timestep = timestep;
        self.min = min;
        self.max = max;
        self.set_num_den(num, den)?;
        self.initialize_values(u0, y0);
        if self.backup_u.is_empty() {
            self.set_backup_length(1)?;
        }
        Ok(())
    }

    /// Seed one step of history.
    pub fn initialize_values(&mut self, u0: Real, y0: Real) {
        self.delayed_u = u0;
        self.delayed_y = limit(y0, self.min, self.max);
        self.value = y0;
        self.saturated = false;
    }

    pub fn set_min_max(&mut self, min: Real, max: Real) {
        self.min = min;
        self.max = max;
    }

    pub fn set_num(&mut self, num: [Real; 2]) {
        self.num = num;
        self.recompute();
    }

    pub fn set_den(&mut self, den: [Real; 2]) -> UtilResult<()> {
        check_den(&den, self.timestep)?;
        self.den = den;
        self.recompute();
        Ok(())
    }

    /// Replace both polynomials. Nothing changes if the denominator is rejected.
    pub fn set_num_den(&mut self, num: [Real; 2], den: [Real; 2]) -> UtilResult<()> {
        check_den(&den, self.timestep)?;
        self.num = num;
        self.den = den;
        self.recompute();
        Ok(())
    }

    pub(crate) fn set_timestep(&mut self, timestep: Real) {
        self.timestep = timestep;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.coeff_u = bilinear(&self.num, self.timestep);
        self.coeff_y = bilinear(&self.den, self.timestep);
    }

    /// Keep the last `steps` histories saved by [`Self::backup`].
    /// Earlier backups are discarded.
    pub fn set_backup_length(&mut self, steps: usize) -> UtilResult<()> {
        self.backup_u.initialize_steps(steps, self.delayed_u)?;
        self.backup_y.initialize_steps(steps, self.delayed_y)?;
        Ok(())
    }

    /// Save the current history so steps can be retried.
    pub fn backup(&mut self) {
        self.backup_u.update(self.delayed_u);
        self.backup_y.update(self.delayed_y);
    }

    /// Restore the history saved `steps` backups ago (1 = most recent).
    pub fn restore_backup(&mut self, steps: usize) -> UtilResult<()> {
        if steps == 0 || steps > self.backup_u.get_size() {
            return Err(UtilError::InvalidArg {
                what: "restore depth exceeds the backup length",
            });
        }
        self.delayed_u = self.backup_u.get_idx(steps - 1);
        self.delayed_y = self.backup_y.get_idx(steps - 1);
        Ok(())
    }

    /// Raw recurrence output before saturation.
    fn raw(&self, u: Real) -> Real {
        (self.coeff_u[1] * u + self.coeff_u[0] * self.delayed_u - self.coeff_y[0] * self.delayed_y)
            / self.coeff_y[1]
    }

    fn saturate(&mut self, y: Real) -> Real {
        if y >= self.max {
            self.saturated = true;
            self.max
        } else if y <= self.min {
            self.saturated = true;
            self.min
        } else {
            self.saturated = false;
            y
        }
    }

    pub fn update(&mut self, u: Real) -> Real {
        let raw = self.raw(u);
        let y = self.saturate(raw);
        self.delayed_y = y;
        self.delayed_u = u;
        self.value = y;
        y
    }

    /// Overwrite the history, then step.
    pub fn update_with_state(&mut self, u: Real, delayed_u: Real, delayed_y: Real) -> Real {
        self.delayed_u = delayed_u;
        self.delayed_y = delayed_y;
        self.update(u)
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn delayed_u(&self) -> Real {
        self.delayed_u
    }

    pub fn delayed_y(&self) -> Real {
        self.delayed_y
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn timestep(&self) -> Real {
        self.timestep
    }

    pub fn coefficients(&self) -> ([Real; 2], [Real; 2]) {
        (self.coeff_u, self.coeff_y)
    }
}

/// First-order transfer function whose timestep may change between calls.
///
/// Coefficients are recomputed whenever the supplied timestep differs from
/// the previous one. On saturation both input and output history are pinned
/// to the limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirstOrderTransferFunctionVariable {
    tf: FirstOrderTransferFunction,
}

impl FirstOrderTransferFunctionVariable {
    pub fn initialize(
        &mut self,
        timestep: Real,
        num: [Real; 2],
        den: [Real; 2],
        u0: Real,
        y0: Real,
        min: Real,
        max: Real,
    ) -> UtilResult<()> {
        self.tf.initialize(timestep, num, den, u0, y0, min, max)
    }

    pub fn initialize_values(&mut self, u0: Real, y0: Real) {
        self.tf.initialize_values(u0, y0);
    }

    pub fn set_min_max(&mut self, min: Real, max: Real) {
        self.tf.set_min_max(min, max);
    }

    pub fn set_num_den(&mut self, num: [Real; 2], den: [Real; 2]) -> UtilResult<()> {
        self.tf.set_num_den(num, den)
    }

    pub fn update(&mut self, u: Real, timestep: Real) -> Real {
        if timestep != self.tf.timestep && timestep > 0.0 {
            self.tf.set_timestep(timestep);
        }
        let raw = self.tf.raw(u);
        let y = self.tf.saturate(raw);
        if self.tf.saturated {
            self.tf.delayed_u = y;
        } else {
            self.tf.delayed_u = u;
        }
        self.tf.delayed_y = y;
        self.tf.value = y;
        y
    }

    pub fn value(&self) -> Real {
        self.tf.value
    }

    pub fn is_saturated(&self) -> bool {
        self.tf.saturated
    }

    pub fn timestep(&self) -> Real {
        self.tf.timestep
    }
}

/// First-order low-pass filter `1 / (1 + s/wc)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirstOrderLowPassFilter {
    tf: FirstOrderTransferFunction,
}

impl FirstOrderLowPassFilter {
    pub fn new(timestep: Real, wc: Real, u0: Real, y0: Real) -> UtilResult<Self> {
        let mut filter = Self::default();
        filter.initialize(timestep, wc, u0, y0, Real::NEG_INFINITY, Real::INFINITY)?;
        Ok(filter)
    }

    pub fn initialize(
        &mut self,
        timestep: Real,
        wc: Real,
        u0: Real,
        y0: Real,
        min: Real,
        max: Real,
    ) -> UtilResult<()> {
        if !(wc.is_finite() && wc > 0.0) {
            return Err(UtilError::InvalidArg {
                what: "break frequency must be positive",
            });
        }
        self.tf
            .initialize(timestep, [1.0, 0.0], [1.0, 1.0 / wc], u0, y0, min, max)
    }

    pub fn set_break_frequency(&mut self, wc: Real) -> UtilResult<()> {
        if !(wc.is_finite() && wc > 0.0) {
            return Err(UtilError::InvalidArg {
                what: "break frequency must be positive",
            });
        }
        self.tf.set_den([1.0, 1.0 / wc])
    }

    /// Break frequency recovered from the discrete coefficients (rad/s).
    pub fn break_frequency(&self) -> Real {
        let (_, coeff_y) = self.tf.coefficients();
        4.0 / (coeff_y[1] - coeff_y[0])
    }

    pub fn update(&mut self, u: Real) -> Real {
        self.tf.update(u)
    }

    pub fn value(&self) -> Real {
        self.tf.value()
    }

    pub fn is_saturated(&self) -> bool {
        self.tf.is_saturated()
    }
}
