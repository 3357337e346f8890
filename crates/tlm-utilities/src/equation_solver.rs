//! Damped Newton steps for small implicit systems inside Q-type components.

use crate::linalg::{Matrix, Vector, ludcmp, solvlu};
use tlm_core::Real;

/// Newton step weights for iterations 1, 2, 3, 4 (and later).
pub const DAMPING_WEIGHTS: [Real; 4] = [1.0, 0.67, 0.5, 0.5];

pub const SINGULAR_JACOBIAN_MESSAGE: &str =
    "Unable to perform LU-decomposition: Jacobian matrix is probably singular.";

/// Weight applied to the Newton step on the given 1-based iteration.
/// Iterations past the end of the schedule reuse the last weight.
pub fn damping_weight(iteration: usize) -> Real {
    let idx = iteration.saturating_sub(1).min(DAMPING_WEIGHTS.len() - 1);
    DAMPING_WEIGHTS[idx]
}

/// Where a solver reports an unrecoverable failure.
///
/// Implemented by the component step context: the error lands on the message
/// queue and the owning system's stop flag is raised.
pub trait FailureReporter {
    fn add_error_message(&self, message: &str);
    fn stop_simulation(&self, reason: &str);
}

/// Solves `J dx = f` by LU decomposition and applies `x -= w * dx`.
#[derive(Debug, Clone)]
pub struct EquationSystemSolver {
    size: usize,
    work: Matrix,
    order: Vec<usize>,
    delta: Vector,
}

impl EquationSystemSolver {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            work: Matrix::zeros(size, size),
            order: vec![0; size],
            delta: Vector::zeros(size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Last computed step `dx`.
    pub fn delta(&self) -> &Vector {
        &self.delta
    }

    fn factor_and_solve(
        &mut self,
        reporter: &dyn FailureReporter,
        jacobian: &Matrix,
        rhs: &Vector,
    ) -> bool {
        let n = self.size;
        if jacobian.nrows() != n || jacobian.ncols() != n || rhs.len() != n {
            reporter.add_error_message(&format!(
                "Equation system size mismatch: expected {n}x{n}, got {}x{} with {} equations",
                jacobian.nrows(),
                jacobian.ncols(),
                rhs.len()
            ));
            reporter.stop_simulation("equation system size mismatch");
            return false;
        }

        self.work.copy_from(jacobian);
        if !ludcmp(&mut self.work, &mut self.order) {
            tracing::debug!(size = n, "singular jacobian");
            reporter.add_error_message(SINGULAR_JACOBIAN_MESSAGE);
            reporter.stop_simulation("singular Jacobian");
            return false;
        }
        match solvlu(&self.work, rhs, &mut self.delta, &self.order) {
            Ok(()) => true,
            Err(e) => {
                reporter.add_error_message(&e.to_string());
                reporter.stop_simulation("LU back substitution failed");
                false
            }
        }
    }

    /// One damped Newton update `x -= w(iteration) * J^-1 f`.
    ///
    /// Returns false, leaving `variables` untouched, when the Jacobian is
    /// singular; the failure has then been reported.
    pub fn solve(
        &mut self,
        reporter: &dyn FailureReporter,
        jacobian: &Matrix,
        equations: &Vector,
        variables: &mut Vector,
        iteration: usize,
    ) -> bool {
        if variables.len() != self.size {
            reporter.add_error_message("Equation system variable count mismatch");
            reporter.stop_simulation("equation system size mismatch");
            return false;
        }
        if !self.factor_and_solve(reporter, jacobian, equations) {
            return false;
        }
        let w = damping_weight(iteration);
        variables.axpy(-w, &self.delta, 1.0);
        true
    }

    /// Undamped Newton update `x -= J^-1 f`.
    pub fn solve_undamped(
        &mut self,
        reporter: &dyn FailureReporter,
        jacobian: &Matrix,
        equations: &Vector,
        variables: &mut Vector,
    ) -> bool {
        self.solve(reporter, jacobian, equations, variables, 1)
    }

    /// Linear solve `x = J^-1 b`.
    pub fn solve_direct(
        &mut self,
        reporter: &dyn FailureReporter,
        jacobian: &Matrix,
        rhs: &Vector,
        solution: &mut Vector,
    ) -> bool {
        if !self.factor_and_solve(reporter, jacobian, rhs) {
            return false;
        }
        solution.clone_from(&self.delta);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        errors: RefCell<Vec<String>>,
        stops: RefCell<Vec<String>>,
    }

    impl FailureReporter for Recorder {
        fn add_error_message(&self, message: &str) {
            self.errors.borrow_mut().push(message.to_string());
        }
        fn stop_simulation(&self, reason: &str) {
            self.stops.borrow_mut().push(reason.to_string());
        }
    }

    #[test]
    fn damping_schedule() {
        assert_eq!(damping_weight(1), 1.0);
        assert_eq!(damping_weight(2), 0.67);
        assert_eq!(damping_weight(3), 0.5);
        assert_eq!(damping_weight(4), 0.5);
        assert_eq!(damping_weight(9), 0.5);
        assert_eq!(damping_weight(0), 1.0);
    }

    #[test]
    fn newton_converges_on_quadratic_system() {
        // f1 = x^2 + y^2 - 5, f2 = x - y + 1, root (1, 2)
        let rec = Recorder::default();
        let mut solver = EquationSystemSolver::new(2);
        let mut x = Vector::from_vec(vec![2.0, 3.0]);
        for iteration in 1..=80 {
            let f = Vector::from_vec(vec![x[0] * x[0] + x[1] * x[1] - 5.0, x[0] - x[1] + 1.0]);
            let j = Matrix::from_row_slice(2, 2, &[2.0 * x[0], 2.0 * x[1], 1.0, -1.0]);
            assert!(solver.solve(&rec, &j, &f, &mut x, iteration));
        }
        assert!((x[0] - 1.0).abs() < 1e-9);
        assert!((x[1] - 2.0).abs() < 1e-9);
        assert!(rec.errors.borrow().is_empty());
    }

    #[test]
    fn second_iteration_is_damped() {
        let rec = Recorder::default();
        let mut solver = EquationSystemSolver::new(1);
        let j = Matrix::from_element(1, 1, 2.0);
        let f = Vector::from_element(1, 4.0);
        let mut x = Vector::from_element(1, 10.0);
        assert!(solver.solve(&rec, &j, &f, &mut x, 2));
        assert!((x[0] - (10.0 - 0.67 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn singular_jacobian_reports_and_leaves_state() {
        let rec = Recorder::default();
        let mut solver = EquationSystemSolver::new(2);
        let j = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let f = Vector::from_vec(vec![1.0, 1.0]);
        let mut x = Vector::from_vec(vec![3.0, 4.0]);
        assert!(!solver.solve_undamped(&rec, &j, &f, &mut x));
        assert_eq!(x, Vector::from_vec(vec![3.0, 4.0]));
        assert_eq!(rec.errors.borrow().as_slice(), [SINGULAR_JACOBIAN_MESSAGE]);
        assert_eq!(rec.stops.borrow().len(), 1);
    }

    #[test]
    fn direct_solve() {
        let rec = Recorder::default();
        let mut solver = EquationSystemSolver::new(2);
        let j = Matrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let b = Vector::from_vec(vec![1.0, 2.0]);
        let mut x = Vector::zeros(2);
        assert!(solver.solve_direct(&rec, &j, &b, &mut x));
        assert!((&j * &x - &b).norm() < 1e-12);
    }

    #[test]
    fn size_mismatch_is_reported() {
        let rec = Recorder::default();
        let mut solver = EquationSystemSolver::new(3);
        let j = Matrix::identity(2, 2);
        let mut x = Vector::zeros(3);
        assert!(!solver.solve(&rec, &j, &Vector::zeros(2), &mut x, 1));
        assert_eq!(rec.stops.borrow().len(), 1);
    }
}
