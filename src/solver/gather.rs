//! Redistribution of freshly computed blocks into every rank's copy of `x`.

use crate::parallel::Comm;
use crate::partition::BlockLayout;

/// Collective. Place every rank's block of `x_new` into `x` on all ranks.
///
/// Blocks land in ascending rank order at the offsets given by `layout`, so
/// uneven block sizes are fine. Afterwards all replicas of `x` are identical.
pub fn gather<C: Comm>(comm: &C, layout: &BlockLayout, x_new: &[f64], x: &mut [f64]) {
    debug_assert_eq!(x.len(), layout.n());
    debug_assert_eq!(x_new.len(), layout.counts()[comm.rank()]);
    comm.all_gather_varcount(x_new, layout.counts(), layout.displs(), x);
}
