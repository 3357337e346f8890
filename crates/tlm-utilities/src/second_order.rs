//! Second-order transfer functions discretized with the bilinear transform.
//!
//! `G(s) = (num[2]*s^2 + num[1]*s + num[0]) / (den[2]*s^2 + den[1]*s + den[0])`,
//! coefficient arrays indexed by power of `s`. Used by Q-type components to
//! realize mass-spring-damper dynamics without re-deriving z-domain
//! coefficients per component.

use crate::error::{UtilError, UtilResult};
use crate::transfer::check_timestep;
use tlm_core::{Real, limit};

fn bilinear(poly: &[Real; 3], ts: Real) -> [Real; 3] {
    let ts2 = ts * ts;
    [
        poly[0] * ts2 + 2.0 * poly[1] * ts + 4.0 * poly[2],
        2.0 * poly[0] * ts2 - 8.0 * poly[2],
        poly[0] * ts2 - 2.0 * poly[1] * ts + 4.0 * poly[2],
    ]
}

fn check_den(den: &[Real; 3], ts: Real) -> UtilResult<()> {
    let coeff_y = bilinear(den, ts);
    if coeff_y[0] == 0.0 || !coeff_y[0].is_finite() {
        return Err(UtilError::InvalidArg {
            what: "denominator is degenerate at this timestep",
        });
    }
    Ok(())
}

/// Fixed-timestep second-order transfer function.
#[derive(Debug, Clone, PartialEq)]
pub struct SecondOrderTransferFunction {
    timestep: Real,
    num: [Real; 3],
    den: [Real; 3],
    coeff_u: [Real; 3],
    coeff_y: [Real; 3],
    /// `[u_{k-1}, u_{k-2}]`
    delayed_u: [Real; 2],
    /// `[y_{k-1}, y_{k-2}]`
    delayed_y: [Real; 2],
    value: Real,
    min: Real,
    max: Real,
    saturated: bool,
}

impl Default for SecondOrderTransferFunction {
    fn default() -> Self {
        let mut tf = Self {
            timestep: 1.0,
            num: [1.0, 0.0, 0.0],
            den: [1.0, 0.0, 0.0],
            coeff_u: [0.0; 3],
            coeff_y: [0.0; 3],
            delayed_u: [0.0; 2],
            delayed_y: [0.0; 2],
            value: 0.0,
            min: Real::NEG_INFINITY,
            max: Real::INFINITY,
            saturated: false,
        };
        tf.recompute();
        tf
    }
}

impl SecondOrderTransferFunction {
    pub fn new(
        timestep: Real,
        num: [Real; 3],
        den: [Real; 3],
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
        num: [Real; 3],
        den: [Real; 3],
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
        self.initialize_values(u0, y0, 0.0);
        Ok(())
    }

    /// Seed two steps of history from an initial input, output and output slope.
    pub fn initialize_values(&mut self, u0: Real, y0: Real, slope0: Real) {
        let y = limit(y0, self.min, self.max);
        self.delayed_u = [u0, u0];
        self.delayed_y = [y, y - slope0 * self.timestep];
        self.value = y0;
        self.saturated = false;
    }

    pub fn set_min_max(&mut self, min: Real, max: Real) {
        self.min = min;
        self.max = max;
    }

    pub fn set_num(&mut self, num: [Real; 3]) {
        self.num = num;
        self.recompute();
    }

    pub fn set_den(&mut self, den: [Real; 3]) -> UtilResult<()> {
        check_den(&den, self.timestep)?;
        self.den = den;
        self.recompute();
        Ok(())
    }

    /// Replace both polynomials. Nothing changes if the denominator is rejected.
    pub fn set_num_den(&mut self, num: [Real; 3], den: [Real; 3]) -> UtilResult<()> {
        check_den(&den, self.timestep)?;
        self.num = num;
        self.den = den;
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.coeff_u = bilinear(&self.num, self.timestep);
        self.coeff_y = bilinear(&self.den, self.timestep);
    }

    fn raw(&self, u: Real) -> Real {
        let cu = &self.coeff_u;
        let cy = &self.coeff_y;
        (cu[0] * u + cu[1] * self.delayed_u[0] + cu[2] * self.delayed_u[1]
            - cy[1] * self.delayed_y[0]
            - cy[2] * self.delayed_y[1])
            / cy[0]
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
        self.delayed_u = [u, self.delayed_u[0]];
        self.delayed_y = [y, self.delayed_y[0]];
        self.value = y;
        y
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn delayed_u(&self) -> Real {
        self.delayed_u[0]
    }

    pub fn delayed_y(&self) -> Real {
        self.delayed_y[0]
    }

    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn coefficients(&self) -> ([Real; 3], [Real; 3]) {
        (self.coeff_u, self.coeff_y)
    }
}

/// Second-order transfer function whose timestep may change between calls.
/// On saturation all history is pinned to the limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecondOrderTransferFunctionVariable {
    tf: SecondOrderTransferFunction,
}

impl SecondOrderTransferFunctionVariable {
    pub fn initialize(
        &mut self,
        timestep: Real,
        num: [Real; 3],
        den: [Real; 3],
        u0: Real,
        y0: Real,
        min: Real,
        max: Real,
    ) -> UtilResult<()> {
        self.tf.initialize(timestep, num, den, u0, y0, min, max)
    }

    pub fn set_num_den(&mut self, num: [Real; 3], den: [Real; 3]) -> UtilResult<()> {
        self.tf.set_num_den(num, den)
    }

    pub fn update(&mut self, u: Real, timestep: Real) -> Real {
        if timestep != self.tf.timestep && timestep > 0.0 {
            self.tf.timestep = timestep;
            self.tf.recompute();
        }
        let raw = self.tf.raw(u);
        let y = self.tf.saturate(raw);
        if self.tf.saturated {
            self.tf.delayed_u = [y, y];
            self.tf.delayed_y = [y, y];
        } else {
            self.tf.delayed_u = [u, self.tf.delayed_u[0]];
            self.tf.delayed_y = [y, self.tf.delayed_y[0]];
        }
        self.tf.value = y;
        y
    }

    pub fn value(&self) -> Real {
        self.tf.value
    }

    pub fn is_saturated(&self) -> bool {
        self.tf.saturated
    }
}
