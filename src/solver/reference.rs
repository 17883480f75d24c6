//! Single-process Gauss-Jacobi on `A·x = b`, used to cross-check the distributed engine.

use crate::error::JError;
use crate::matrix::CsrMatrix;
use crate::solver::LinearSolver;
use crate::utils::convergence::{Convergence, SolveStats, Step};

/// Textbook Jacobi: `x_new[i] = (b[i] − Σ_{j≠i} a_ij·x[j]) / a_ii`.
pub struct SerialJacobi {
    pub conv: Convergence<f64>,
}

impl SerialJacobi {
    pub fn new(tol: f64, max_iters: Option<usize>) -> Self {
        Self { conv: Convergence { tol, max_iters } }
    }
}

impl LinearSolver<CsrMatrix, Vec<f64>> for SerialJacobi {
    type Error = JError;
    type Scalar = f64;

    fn solve(&mut self, a: &CsrMatrix, b: &Vec<f64>, x: &mut Vec<f64>) -> Result<SolveStats<f64>, JError> {
        let n = a.n();
        if b.len() != n {
            return Err(JError::DimensionMismatch { expected: n, found: b.len() });
        }
        if x.len() != n {
            return Err(JError::DimensionMismatch { expected: n, found: x.len() });
        }
        let diag: Vec<f64> = (0..n).map(|i| a.diagonal(i)).collect();
        if let Some(i) = diag.iter().position(|&d| d == 0.0) {
            return Err(JError::ZeroDiagonal(i));
        }
        let mut x_new = vec![0.0; n];
        let mut iterations = 0;
        loop {
            for i in 0..n {
                let (cols, vals) = a.row(i);
                let off: f64 = cols
                    .iter()
                    .zip(vals)
                    .filter(|&(&c, _)| c != i)
                    .map(|(&c, &v)| v * x[c])
                    .sum();
                x_new[i] = (b[i] - off) / diag[i];
            }
            let error = x_new
                .iter()
                .zip(x.iter())
                .map(|(p, q)| (p - q) * (p - q))
                .sum::<f64>()
                .sqrt();
            std::mem::swap(x, &mut x_new);
            iterations += 1;
            if let Step::Stop(stats) = self.conv.check(error, iterations) {
                return Ok(stats);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn solves_two_by_two() {
        let a = CsrMatrix::from_dense_rows(&[vec![4.0, 1.0], vec![2.0, 3.0]]).unwrap();
        let b = vec![1.0, 2.0];
        let mut x = vec![0.0; 2];
        let stats = SerialJacobi::new(1e-12, Some(1000)).solve(&a, &b, &mut x).unwrap();
        assert!(stats.converged, "Jacobi did not converge");
        assert_abs_diff_eq!(x[0], 0.1, epsilon = 1e-10);
        assert_abs_diff_eq!(x[1], 0.6, epsilon = 1e-10);
    }

    #[test]
    fn rejects_zero_diagonal() {
        let a = CsrMatrix::from_dense_rows(&[vec![0.0, 1.0], vec![1.0, 1.0]]).unwrap();
        let mut x = vec![0.0; 2];
        let err = SerialJacobi::new(1e-12, Some(10)).solve(&a, &vec![1.0, 1.0], &mut x);
        assert!(matches!(err, Err(JError::ZeroDiagonal(0))));
    }
}
