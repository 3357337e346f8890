//! Lookup tables with linear interpolation.
//!
//! Table data is sorted by index on construction. After sorting every index
//! vector must be strictly increasing. Inputs outside the index range are
//! clamped to the first or last index.

use crate::error::{UtilError, UtilResult};
use tlm_core::Real;

pub fn is_strictly_increasing(index: &[Real]) -> bool {
    index.windows(2).all(|w| w[0] < w[1])
}

fn interp1(x: Real, i1: Real, i2: Real, v1: Real, v2: Real) -> Real {
    v1 + (x - i1) * (v2 - v1) / (i2 - i1)
}

/// Lower end `i` of the interval `index[i]..=index[i + 1]` holding `x`.
/// `index` has at least two entries and `x` is within its range.
fn interval(index: &[Real], x: Real) -> usize {
    index
        .partition_point(|v| *v < x)
        .saturating_sub(1)
        .min(index.len() - 2)
}

fn check_index(index: &[Real], what: &'static str) -> UtilResult<()> {
    if index.len() < 2 {
        return Err(UtilError::InvalidArg {
            what: "lookup table index needs at least two values",
        });
    }
    if index.iter().any(|v| !v.is_finite()) {
        return Err(UtilError::InvalidArg {
            what: "lookup table index must be finite",
        });
    }
    if !is_strictly_increasing(index) {
        return Err(UtilError::NotStrictlyIncreasing { what });
    }
    Ok(())
}

/// Permutation that sorts `index` increasingly; ties keep their order.
fn sorted_order(index: &[Real]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..index.len()).collect();
    order.sort_by(|a, b| index[*a].total_cmp(&index[*b]));
    order
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable1D {
    index: Vec<Real>,
    values: Vec<Real>,
}

impl LookupTable1D {
    /// Build from an index column and a value column in any row order.
    pub fn new(index: Vec<Real>, values: Vec<Real>) -> UtilResult<Self> {
        if index.len() != values.len() {
            return Err(UtilError::DimensionMismatch {
                what: "lookup table values",
                expected: index.len(),
                actual: values.len(),
            });
        }
        let order = sorted_order(&index);
        let index: Vec<Real> = order.iter().map(|&i| index[i]).collect();
        let values: Vec<Real> = order.iter().map(|&i| values[i]).collect();
        check_index(&index, "index column")?;
        Ok(Self { index, values })
    }

    pub fn index(&self) -> &[Real] {
        &self.index
    }

    pub fn values(&self) -> &[Real] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Zero for an empty table.
    pub fn interpolate(&self, x: Real) -> Real {
        let (Some(first), Some(last)) = (self.index.first(), self.index.last()) else {
            return 0.0;
        };
        let n = self.values.len();
        if x <= *first {
            return self.values[0];
        }
        if x >= *last {
            return self.values[n - 1];
        }
        let i = interval(&self.index, x);
        interp1(x, self.index[i], self.index[i + 1], self.values[i], self.values[i + 1])
    }
}

/// Bilinear table over a row index and a column index.
///
/// Values are stored row-major: the value at `(r, c)` is
/// `values[r * cols.len() + c]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable2D {
    rows: Vec<Real>,
    cols: Vec<Real>,
    values: Vec<Real>,
}

impl LookupTable2D {
    /// Build from row-major values over unsorted row and column indices.
    pub fn new(rows: Vec<Real>, cols: Vec<Real>, values: Vec<Real>) -> UtilResult<Self> {
        if values.len() != rows.len() * cols.len() {
            return Err(UtilError::DimensionMismatch {
                what: "lookup table values",
                expected: rows.len() * cols.len(),
                actual: values.len(),
            });
        }
        let row_order = sorted_order(&rows);
        let col_order = sorted_order(&cols);
        let nc = cols.len();
        let sorted_values = row_order
            .iter()
            .flat_map(|&r| col_order.iter().map(move |&c| r * nc + c))
            .map(|k| values[k])
            .collect();
        let rows: Vec<Real> = row_order.iter().map(|&i| rows[i]).collect();
        let cols: Vec<Real> = col_order.iter().map(|&i| cols[i]).collect();
        check_index(&rows, "row index")?;
        check_index(&cols, "column index")?;
        Ok(Self {
            rows,
            cols,
            values: sorted_values,
        })
    }

    /// Build from `[row, col, value]` points covering a full grid once each.
    pub fn from_points(points: &[[Real; 3]]) -> UtilResult<Self> {
        let axis = |k: usize| {
            let mut v: Vec<Real> = points.iter().map(|p| p[k]).collect();
            v.sort_by(Real::total_cmp);
            v.dedup();
            v
        };
        let rows = axis(0);
        let cols = axis(1);
        check_index(&rows, "row index")?;
        check_index(&cols, "column index")?;
        if points.len() != rows.len() * cols.len() {
            return Err(UtilError::DimensionMismatch {
                what: "lookup table grid points",
                expected: rows.len() * cols.len(),
                actual: points.len(),
            });
        }

        let mut grid: Vec<Option<Real>> = vec![None; points.len()];
        for p in points {
            let r = rows.partition_point(|v| *v < p[0]);
            let c = cols.partition_point(|v| *v < p[1]);
            let slot = &mut grid[r * cols.len() + c];
            if slot.is_some() {
                return Err(UtilError::InvalidArg {
                    what: "lookup table grid point given twice",
                });
            }
            *slot = Some(p[2]);
        }
        // Equal counts and no repeats leave no gaps.
        let values = grid.into_iter().map(|v| v.unwrap_or(Real::NAN)).collect();
        Ok(Self { rows, cols, values })
    }

    pub fn rows(&self) -> &[Real] {
        &self.rows
    }

    pub fn cols(&self) -> &[Real] {
        &self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn at(&self, r: usize, c: usize) -> Real {
        self.values[r * self.cols.len() + c]
    }

    /// Zero for an empty table.
    pub fn interpolate(&self, row: Real, col: Real) -> Real {
        if self.is_empty() {
            return 0.0;
        }
        let (rows, cols) = (&self.rows, &self.cols);
        let row = row.clamp(rows[0], rows[rows.len() - 1]);
        let col = col.clamp(cols[0], cols[cols.len() - 1]);
        let r = interval(rows, row);
        let c = interval(cols, col);

        let left = interp1(row, rows[r], rows[r + 1], self.at(r, c), self.at(r + 1, c));
        let right = interp1(row, rows[r], rows[r + 1], self.at(r, c + 1), self.at(r + 1, c + 1));
        interp1(col, cols[c], cols[c + 1], left, right)
    }
}
