//! Row-block decomposition of a CSR system across ranks.
//!
//! The coordinator holds the whole system; every rank ends up with a
//! self-contained [`LocalBlock`] covering a contiguous range of rows. Block
//! sizes are fixed once in a [`BlockLayout`] that every rank computes from
//! `n` and the group size alone, so no rank ever has to guess another's share.
//!
//! Offsets are distributed as-is, not rebased: a block's first offset is the
//! global index of its first entry and serves as the local zero when indexing
//! the block's `columns` and `weights`.

use crate::config::PartitionPolicy;
use crate::error::JError;
use crate::matrix::LinearSystem;
use crate::parallel::{Comm, ROOT, agree};
use std::ops::Range;

/// Sizes the coordinator announces before any data moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProblemSizes {
    /// Rows (and columns) of the matrix
    pub n: usize,
    /// Stored entries of the matrix
    pub nnz: usize,
    /// Length of the right-hand side
    pub rhs_len: usize,
}

impl ProblemSizes {
    pub fn of(system: &LinearSystem) -> Self {
        Self {
            n: system.n(),
            nnz: system.matrix.nnz(),
            rhs_len: system.rhs.len(),
        }
    }
}

/// Per-rank row counts and first rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    n: usize,
    counts: Vec<usize>,
    displs: Vec<usize>,
}

impl BlockLayout {
    pub fn new(n: usize, ranks: usize, policy: PartitionPolicy) -> Result<Self, JError> {
        if ranks == 0 {
            return Err(JError::Partition("cannot partition over zero ranks".into()));
        }
        match policy {
            PartitionPolicy::Balanced => Ok(Self::balanced(n, ranks)),
            PartitionPolicy::Strict => Self::strict(n, ranks),
        }
    }

    /// `n / P` rows each, plus one extra row for the first `n mod P` ranks.
    pub fn balanced(n: usize, ranks: usize) -> Self {
        let (div, rem) = (n / ranks, n % ranks);
        let counts: Vec<usize> = (0..ranks).map(|r| div + usize::from(r < rem)).collect();
        Self::from_counts(n, counts)
    }

    /// Exactly `n / P` rows each; fails when that would leave rows unassigned.
    pub fn strict(n: usize, ranks: usize) -> Result<Self, JError> {
        if n % ranks != 0 {
            return Err(JError::Partition(format!(
                "{n} rows cannot be split evenly over {ranks} ranks ({} left over)",
                n % ranks
            )));
        }
        Ok(Self::from_counts(n, vec![n / ranks; ranks]))
    }

    fn from_counts(n: usize, counts: Vec<usize>) -> Self {
        let displs = counts
            .iter()
            .scan(0, |acc, &c| {
                let d = *acc;
                *acc += c;
                Some(d)
            })
            .collect();
        Self { n, counts, displs }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn ranks(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn displs(&self) -> &[usize] {
        &self.displs
    }

    /// Global rows owned by `rank`.
    pub fn range(&self, rank: usize) -> Range<usize> {
        self.displs[rank]..self.displs[rank] + self.counts[rank]
    }
}

/// The rows of the system owned by one rank.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalBlock {
    start: usize,
    offsets: Vec<usize>,
    columns: Vec<usize>,
    weights: Vec<f64>,
    rhs: Vec<f64>,
}

impl LocalBlock {
    /// Global index of the first owned row.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of owned rows.
    pub fn count(&self) -> usize {
        self.rhs.len()
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.start + self.count()
    }

    /// Boundary offsets of the owned rows, still in global entry numbering.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }

    /// Column indices and values of local row `i`.
    pub fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let base = self.offsets[0];
        let range = self.offsets[i] - base..self.offsets[i + 1] - base;
        (&self.columns[range.clone()], &self.weights[range])
    }
}

/// Splits a system into row blocks and hands one to every rank.
#[derive(Debug, Clone, Copy, Default)]
pub struct Partitioner {
    pub policy: PartitionPolicy,
}

impl Partitioner {
    pub fn new(policy: PartitionPolicy) -> Self {
        Self { policy }
    }

    /// Collective. `system` is read on the root rank only; pass `None` elsewhere.
    pub fn distribute<C: Comm>(
        &self,
        comm: &C,
        sizes: ProblemSizes,
        system: Option<&LinearSystem>,
    ) -> Result<(BlockLayout, LocalBlock), JError> {
        let held = match system {
            Some(sys) if ProblemSizes::of(sys) != sizes => Err(JError::Partition(format!(
                "announced sizes {sizes:?} do not match the held system"
            ))),
            None if comm.is_root() => Err(JError::Partition("root rank holds no system".into())),
            _ => Ok(()),
        };
        agree(comm, held, ROOT)?;

        // offsets need n + 1 slots; checked on every rank from the shared sizes
        let largest = sizes.nnz.max(sizes.n.saturating_add(1));
        if largest > comm.max_count() {
            return Err(JError::Partition(format!(
                "{largest} elements exceed what one collective can address ({})",
                comm.max_count()
            )));
        }

        // identical on every rank, so a rejected layout fails everywhere at once
        let layout = BlockLayout::new(sizes.n, comm.size(), self.policy)?;
        let rank = comm.rank();

        let (offsets, columns, weights, rhs): (&[usize], &[usize], &[f64], &[f64]) = match system {
            Some(sys) if comm.is_root() => (
                sys.matrix.offsets(),
                sys.matrix.columns(),
                sys.matrix.weights(),
                sys.rhs.as_slice(),
            ),
            _ => (&[][..], &[][..], &[][..], &[][..]),
        };

        let mut entry_counts = vec![0usize; layout.ranks()];
        let mut entry_displs = vec![0usize; layout.ranks()];
        if comm.is_root() {
            for r in 0..layout.ranks() {
                let rows = layout.range(r);
                entry_displs[r] = offsets[rows.start];
                entry_counts[r] = offsets[rows.end] - offsets[rows.start];
            }
        }
        comm.broadcast(&mut entry_counts, ROOT);
        comm.broadcast(&mut entry_displs, ROOT);

        let mut local_columns = vec![0usize; entry_counts[rank]];
        let mut local_weights = vec![0.0f64; entry_counts[rank]];
        comm.scatter_varcount(columns, &entry_counts, &entry_displs, &mut local_columns, ROOT);
        comm.scatter_varcount(weights, &entry_counts, &entry_displs, &mut local_weights, ROOT);

        // each rank needs count + 1 boundaries; neighbouring windows share one
        let offset_counts: Vec<usize> = layout.counts().iter().map(|c| c + 1).collect();
        let mut local_offsets = vec![0usize; offset_counts[rank]];
        comm.scatter_varcount(offsets, &offset_counts, layout.displs(), &mut local_offsets, ROOT);

        let mut local_rhs = vec![0.0f64; layout.counts()[rank]];
        comm.scatter_varcount(rhs, layout.counts(), layout.displs(), &mut local_rhs, ROOT);

        tracing::debug!(
            rank,
            start = layout.displs()[rank],
            rows = layout.counts()[rank],
            entries = entry_counts[rank],
            first_entry = local_offsets[0],
            "received row block"
        );

        let block = LocalBlock {
            start: layout.displs()[rank],
            offsets: local_offsets,
            columns: local_columns,
            weights: local_weights,
            rhs: local_rhs,
        };
        Ok((layout, block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::CsrMatrix;
    use crate::parallel::{Payload, ThreadComm};

    #[test]
    fn balanced_gives_remainder_to_first_ranks() {
        let layout = BlockLayout::balanced(10, 4);
        assert_eq!(layout.counts(), &[3, 3, 2, 2]);
        assert_eq!(layout.displs(), &[0, 3, 6, 8]);
        assert_eq!(layout.range(3), 8..10);
    }

    #[test]
    fn balanced_with_more_ranks_than_rows() {
        let layout = BlockLayout::balanced(2, 3);
        assert_eq!(layout.counts(), &[1, 1, 0]);
        assert_eq!(layout.range(2), 2..2);
    }

    #[test]
    fn strict_rejects_remainder() {
        assert!(matches!(BlockLayout::strict(10, 4), Err(JError::Partition(_))));
        let layout = BlockLayout::strict(8, 4).unwrap();
        assert_eq!(layout.counts(), &[2, 2, 2, 2]);
        assert!(matches!(
            BlockLayout::new(3, 0, PartitionPolicy::Balanced),
            Err(JError::Partition(_))
        ));
    }

    #[test]
    fn every_row_is_owned_exactly_once() {
        for n in 0..40 {
            for p in 1..9 {
                let layout = BlockLayout::balanced(n, p);
                let mut next = 0;
                for r in 0..p {
                    let rows = layout.range(r);
                    assert_eq!(rows.start, next);
                    next = rows.end;
                }
                assert_eq!(next, n, "n = {n}, p = {p}");
            }
        }
    }

    fn tridiagonal(n: usize) -> LinearSystem {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| match i.abs_diff(j) {
                        0 => 4.0,
                        1 => -1.0 - i as f64,
                        _ => 0.0,
                    })
                    .collect()
            })
            .collect();
        let a = CsrMatrix::from_dense_rows(&rows).unwrap();
        LinearSystem::new(a, (0..n).map(|i| i as f64).collect()).unwrap()
    }

    #[test]
    fn blocks_reproduce_global_rows() {
        let system = tridiagonal(7);
        let sizes = ProblemSizes::of(&system);
        let blocks = ThreadComm::run(3, |comm| {
            let held = if comm.is_root() { Some(&system) } else { None };
            Partitioner::new(PartitionPolicy::Balanced)
                .distribute(&comm, sizes, held)
                .unwrap()
        });
        for (rank, (layout, block)) in blocks.iter().enumerate() {
            assert_eq!(layout.counts(), &[3, 2, 2]);
            assert_eq!(block.rows(), layout.range(rank));
            // not rebased
            assert_eq!(block.offsets()[0], system.matrix.offsets()[block.start()]);
            for i in 0..block.count() {
                assert_eq!(block.row(i), system.matrix.row(block.start() + i));
                assert_eq!(block.rhs()[i], system.rhs[block.start() + i]);
            }
        }
    }

    #[test]
    fn strict_layout_fails_on_every_rank() {
        let system = tridiagonal(5);
        let sizes = ProblemSizes::of(&system);
        let results = ThreadComm::run(2, |comm| {
            let held = if comm.is_root() { Some(&system) } else { None };
            Partitioner::new(PartitionPolicy::Strict)
                .distribute(&comm, sizes, held)
                .map(|_| ())
        });
        assert!(results.iter().all(|r| matches!(r, Err(JError::Partition(_)))));
    }

    /// A thread rank whose collectives address at most `cap` elements.
    struct Capped {
        inner: ThreadComm,
        cap: usize,
    }

    impl Comm for Capped {
        fn rank(&self) -> usize {
            self.inner.rank()
        }
        fn size(&self) -> usize {
            self.inner.size()
        }
        fn barrier(&self) {
            self.inner.barrier()
        }
        fn broadcast<T: Payload>(&self, buf: &mut [T], root: usize) {
            self.inner.broadcast(buf, root)
        }
        fn scatter_varcount<T: Payload>(
            &self,
            send: &[T],
            counts: &[usize],
            displs: &[usize],
            out: &mut [T],
            root: usize,
        ) {
            assert!(counts.iter().chain(displs).all(|&c| c <= self.cap), "count over the cap");
            self.inner.scatter_varcount(send, counts, displs, out, root)
        }
        fn all_gather_varcount<T: Payload>(
            &self,
            local: &[T],
            counts: &[usize],
            displs: &[usize],
            out: &mut [T],
        ) {
            self.inner.all_gather_varcount(local, counts, displs, out)
        }
        fn all_reduce(&self, x: f64) -> f64 {
            self.inner.all_reduce(x)
        }
        fn max_count(&self) -> usize {
            self.cap
        }
    }

    #[test]
    fn oversized_system_is_rejected_before_scatter() {
        // 7 rows need 8 offsets, 19 entries
        let system = tridiagonal(7);
        let sizes = ProblemSizes::of(&system);
        let distribute = |cap: usize| {
            ThreadComm::run(2, |inner| {
                let comm = Capped { inner, cap };
                let held = if comm.is_root() { Some(&system) } else { None };
                Partitioner::new(PartitionPolicy::Balanced)
                    .distribute(&comm, sizes, held)
                    .map(|_| ())
            })
        };
        assert!(distribute(18).iter().all(|r| matches!(r, Err(JError::Partition(_)))));
        assert!(distribute(19).iter().all(|r| r.is_ok()));
    }
}
