//! One Gauss-Jacobi sweep over the rows a rank owns.

use crate::partition::LocalBlock;

/// Compute `x_new[i] = c[i] + Σ_k T[i,k]·x[k]` for every owned row `i`.
///
/// `x` is the previous iterate and is only read; `x_new` holds the owned
/// block (`x_new[i]` is global row `block.start() + i`). Products are summed
/// in the row's storage order and the right-hand side is added last.
pub fn sweep(block: &LocalBlock, x: &[f64], x_new: &mut [f64]) {
    assert_eq!(x_new.len(), block.count(), "scratch must cover the owned rows");
    for (i, xi) in x_new.iter_mut().enumerate() {
        let (cols, vals) = block.row(i);
        let mut acc = 0.0;
        for (&c, &v) in cols.iter().zip(vals) {
            acc += v * x[c];
        }
        *xi = acc + block.rhs()[i];
    }
}
