//! Dense LU decomposition with partial pivoting.
//!
//! `ludcmp` factors a square matrix in place into a unit lower triangle (below
//! the diagonal) and an upper triangle (on and above it). The row permutation
//! is recorded in `order`, so that row `i` of the factored matrix came from
//! row `order[i]` of the original. `solvlu` then solves `A x = b`.

use crate::error::{UtilError, UtilResult};
use nalgebra::{DMatrix, DVector};
use tlm_core::Real;

pub type Matrix = DMatrix<Real>;
pub type Vector = DVector<Real>;

/// Move the largest-magnitude entry on or below the diagonal of column `jcol`
/// onto the diagonal. Returns false when that entry is not strictly positive
/// in magnitude.
pub fn pivot(a: &mut Matrix, order: &mut [usize], jcol: usize) -> bool {
    let n = a.nrows();
    if jcol >= n || jcol >= a.ncols() || order.len() != n {
        return false;
    }

    let mut ipvt = jcol;
    let mut big = a[(jcol, jcol)].abs();
    for i in (jcol + 1)..n {
        let candidate = a[(i, jcol)].abs();
        if candidate > big {
            big = candidate;
            ipvt = i;
        }
    }

    if big.is_nan() || big <= 0.0 {
        return false;
    }

    if ipvt != jcol {
        a.swap_rows(ipvt, jcol);
        order.swap(ipvt, jcol);
    }
    true
}

/// In-place LU decomposition. Returns false (leaving `a` partially factored)
/// when the matrix is singular.
pub fn ludcmp(a: &mut Matrix, order: &mut [usize]) -> bool {
    let n = a.nrows();
    if a.ncols() != n || order.len() != n {
        return false;
    }
    for (i, slot) in order.iter_mut().enumerate() {
        *slot = i;
    }

    for k in 0..n {
        if !pivot(a, order, k) {
            return false;
        }
        let diag = a[(k, k)];
        for i in (k + 1)..n {
            let factor = a[(i, k)] / diag;
            a[(i, k)] = factor;
            for j in (k + 1)..n {
                a[(i, j)] -= factor * a[(k, j)];
            }
        }
    }
    true
}

/// Solve `A x = b` using the factors produced by [`ludcmp`].
pub fn solvlu(a: &Matrix, b: &Vector, x: &mut Vector, order: &[usize]) -> UtilResult<()> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(UtilError::DimensionMismatch {
            what: "matrix columns",
            expected: n,
            actual: a.ncols(),
        });
    }
    for (what, len) in [("rhs", b.len()), ("solution", x.len()), ("order", order.len())] {
        if len != n {
            return Err(UtilError::DimensionMismatch {
                what,
                expected: n,
                actual: len,
            });
        }
    }

    // Forward substitution through the unit lower triangle.
    let mut y = Vector::zeros(n);
    for i in 0..n {
        let mut sum = b[order[i]];
        for j in 0..i {
            sum -= a[(i, j)] * y[j];
        }
        y[i] = sum;
    }

    // Back substitution through the upper triangle.
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= a[(i, j)] * x[j];
        }
        x[i] = sum / a[(i, i)];
    }
    Ok(())
}

/// Factor a copy of `a` and solve `A x = b`.
pub fn solve(a: &Matrix, b: &Vector) -> UtilResult<Vector> {
    let n = a.nrows();
    let mut lu = a.clone();
    let mut order = vec![0; n];
    if !ludcmp(&mut lu, &mut order) {
        return Err(UtilError::Singular);
    }
    let mut x = Vector::zeros(n);
    solvlu(&lu, b, &mut x, &order)?;
    Ok(x)
}
