use crate::TlmError;

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, TlmError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TlmError::NonFinite { what, value: v })
    }
}

/// Clamp `value` into `[min, max]`.
///
/// Unlike `f64::clamp` this never panics when `min > max`; `max` wins.
pub fn limit(value: Real, min: Real, max: Real) -> Real {
    if value > max {
        max
    } else if value < min {
        min
    } else {
        value
    }
}

/// Sign of `x`, with `sign(0.0) == 1.0`.
pub fn sign(x: Real) -> Real {
    if x < 0.0 { -1.0 } else { 1.0 }
}

/// Signed square root, linearized below `x0` so the derivative stays finite at zero.
pub fn signed_sqrt_l(x: Real, x0: Real) -> Real {
    let ax = x.abs();
    if ax < x0 {
        x / x0.sqrt()
    } else {
        sign(x) * ax.sqrt()
    }
}

/// Derivative of [`signed_sqrt_l`] with respect to `x`.
pub fn d_signed_sqrt_l(x: Real, x0: Real) -> Real {
    let ax = x.abs();
    if ax < x0 {
        1.0 / x0.sqrt()
    } else {
        0.5 / ax.sqrt()
    }
}
