//! Core linear-algebra traits for gauss-jacobi.

/// Matrix–vector product: y ← A x.
pub trait MatVec<V: ?Sized> {
    /// Compute y = A · x.
    fn matvec(&self, x: &V, y: &mut V);
}
