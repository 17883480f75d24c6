// Compressed sparse row storage and the linear systems built on it

use crate::core::traits::MatVec;
use crate::error::JError;
use faer::sparse::{
    SparseRowMat,         // owning numeric CSR alias
    SymbolicSparseRowMat, // owning symbolic CSR alias
};

/// Square sparse matrix in CSR form.
///
/// `offsets[i]..offsets[i + 1]` bounds the entries of row `i` in `columns`
/// and `weights`. Entries of a row are kept in the order they were given;
/// nothing is sorted or merged, so products follow storage order.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n: usize,
    offsets: Vec<usize>,
    columns: Vec<usize>,
    weights: Vec<f64>,
}

impl CsrMatrix {
    /// Build a CSR matrix from raw offsets, column indices and values,
    /// checking the structural invariants.
    pub fn try_new(
        n: usize,
        offsets: Vec<usize>,
        columns: Vec<usize>,
        weights: Vec<f64>,
    ) -> Result<Self, JError> {
        let boundaries = n
            .checked_add(1)
            .ok_or_else(|| JError::InvalidMatrix(format!("row count {n} is too large")))?;
        if offsets.len() != boundaries {
            return Err(JError::InvalidMatrix(format!(
                "expected {boundaries} offsets, found {}",
                offsets.len()
            )));
        }
        if offsets[0] != 0 {
            return Err(JError::InvalidMatrix(format!(
                "first offset must be 0, found {}",
                offsets[0]
            )));
        }
        if let Some(row) = offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(JError::InvalidMatrix(format!(
                "offsets decrease at row {row}"
            )));
        }
        let nnz = offsets[n];
        if columns.len() != nnz || weights.len() != nnz {
            return Err(JError::InvalidMatrix(format!(
                "offsets announce {nnz} entries, found {} columns and {} weights",
                columns.len(),
                weights.len()
            )));
        }
        if let Some(k) = columns.iter().position(|&c| c >= n) {
            return Err(JError::InvalidMatrix(format!(
                "column index {} at entry {k} is out of range for n = {n}",
                columns[k]
            )));
        }
        Ok(Self { n, offsets, columns, weights })
    }

    /// Build a CSR matrix from a dense row-major array, skipping zeros.
    pub fn from_dense_rows(rows: &[Vec<f64>]) -> Result<Self, JError> {
        let n = rows.len();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut columns = Vec::new();
        let mut weights = Vec::new();
        offsets.push(0);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(JError::InvalidMatrix(format!(
                    "row {i} has {} columns, expected {n}",
                    row.len()
                )));
            }
            for (j, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    columns.push(j);
                    weights.push(v);
                }
            }
            offsets.push(columns.len());
        }
        Self::try_new(n, offsets, columns, weights)
    }

    /// Number of rows (and columns).
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.columns.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Column indices and values of row `i`, in storage order.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let range = self.offsets[i]..self.offsets[i + 1];
        (&self.columns[range.clone()], &self.weights[range])
    }

    /// Sum of the stored entries on the diagonal of row `i`.
    pub fn diagonal(&self, i: usize) -> f64 {
        let (cols, vals) = self.row(i);
        cols.iter()
            .zip(vals)
            .filter(|&(&c, _)| c == i)
            .map(|(_, &v)| v)
            .sum()
    }

    /// Strict row diagonal dominance: |a_ii| > Σ_{j≠i} |a_ij| for every row.
    pub fn is_diagonally_dominant(&self) -> bool {
        (0..self.n).all(|i| {
            let (cols, vals) = self.row(i);
            let off: f64 = cols
                .iter()
                .zip(vals)
                .filter(|&(&c, _)| c != i)
                .map(|(_, v)| v.abs())
                .sum();
            self.diagonal(i).abs() > off
        })
    }

    /// Compute y = A * x.
    pub fn spmv(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n);
        assert_eq!(y.len(), self.n);
        for (i, yi) in y.iter_mut().enumerate() {
            let (cols, vals) = self.row(i);
            *yi = cols.iter().zip(vals).map(|(&c, &v)| v * x[c]).sum();
        }
    }

    /// Copy with each row sorted by column and duplicate entries summed.
    pub fn canonicalized(&self) -> Self {
        let mut offsets = Vec::with_capacity(self.n + 1);
        let mut columns = Vec::with_capacity(self.nnz());
        let mut weights = Vec::with_capacity(self.nnz());
        offsets.push(0);
        for i in 0..self.n {
            let (cols, vals) = self.row(i);
            let mut entries: Vec<(usize, f64)> = cols.iter().copied().zip(vals.iter().copied()).collect();
            entries.sort_by_key(|&(c, _)| c);
            for (c, v) in entries {
                match columns.last() {
                    Some(&last) if last == c && columns.len() > offsets[i] => {
                        if let Some(w) = weights.last_mut() {
                            *w += v;
                        }
                    }
                    _ => {
                        columns.push(c);
                        weights.push(v);
                    }
                }
            }
            offsets.push(columns.len());
        }
        Self { n: self.n, offsets, columns, weights }
    }

    /// Convert to a faer sparse row matrix (canonicalized).
    pub fn to_faer(&self) -> SparseRowMat<usize, f64> {
        let canon = self.canonicalized();
        // Build symbolic structure; `None` means no separate row_nnz
        let symbolic = SymbolicSparseRowMat::new_checked(
            canon.n,
            canon.n,
            canon.offsets,
            None,
            canon.columns,
        );
        SparseRowMat::new(symbolic, canon.weights)
    }

    /// Dense copy, mainly for cross-checks against direct factorizations.
    pub fn to_dense(&self) -> faer::Mat<f64> {
        self.to_faer().to_dense()
    }
}

impl MatVec<[f64]> for CsrMatrix {
    fn matvec(&self, x: &[f64], y: &mut [f64]) {
        self.spmv_parallel(x, y);
    }
}

#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "rayon")]
impl CsrMatrix {
    /// Parallel SpMV using Rayon
    pub fn spmv_parallel(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n);
        assert_eq!(y.len(), self.n);
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            let (cols, vals) = self.row(i);
            *yi = cols.iter().zip(vals).map(|(&c, &v)| v * x[c]).sum();
        });
    }
}

#[cfg(not(feature = "rayon"))]
impl CsrMatrix {
    /// Serial fallback when Rayon is disabled.
    pub fn spmv_parallel(&self, x: &[f64], y: &mut [f64]) {
        self.spmv(x, y);
    }
}

/// A square sparse system `A·x = b`, or an iteration system `x ← c + T·x`
/// when produced by [`LinearSystem::jacobi_iteration`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem {
    pub matrix: CsrMatrix,
    pub rhs: Vec<f64>,
}

impl LinearSystem {
    pub fn new(matrix: CsrMatrix, rhs: Vec<f64>) -> Result<Self, JError> {
        if rhs.len() != matrix.n() {
            return Err(JError::DimensionMismatch {
                expected: matrix.n(),
                found: rhs.len(),
            });
        }
        Ok(Self { matrix, rhs })
    }

    pub fn n(&self) -> usize {
        self.matrix.n()
    }

    /// Jacobi splitting of `A = D + R`: returns `T = -D⁻¹R` and `c = D⁻¹b`,
    /// so that the fixed point of `x ← c + T·x` solves `A·x = b`.
    ///
    /// Off-diagonal entries keep their storage order; diagonal entries are dropped.
    pub fn jacobi_iteration(&self) -> Result<Self, JError> {
        let a = &self.matrix;
        let n = a.n();
        let mut offsets = Vec::with_capacity(n + 1);
        let mut columns = Vec::with_capacity(a.nnz());
        let mut weights = Vec::with_capacity(a.nnz());
        let mut rhs = Vec::with_capacity(n);
        offsets.push(0);
        for i in 0..n {
            let d = a.diagonal(i);
            if d == 0.0 || !d.is_finite() {
                return Err(JError::ZeroDiagonal(i));
            }
            let (cols, vals) = a.row(i);
            for (&c, &v) in cols.iter().zip(vals) {
                if c != i {
                    columns.push(c);
                    weights.push(-v / d);
                }
            }
            offsets.push(columns.len());
            rhs.push(self.rhs[i] / d);
        }
        let matrix = CsrMatrix::try_new(n, offsets, columns, weights)?;
        Ok(Self { matrix, rhs })
    }

    /// ‖A·x − b‖₂
    pub fn residual_norm(&self, x: &[f64]) -> f64 {
        let mut ax = vec![0.0; self.n()];
        self.matrix.matvec(x, &mut ax[..]);
        ax.iter()
            .zip(&self.rhs)
            .map(|(axi, bi)| (axi - bi) * (axi - bi))
            .sum::<f64>()
            .sqrt()
    }
}
