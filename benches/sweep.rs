use criterion::{black_box, Criterion, criterion_group, criterion_main};
use gauss_jacobi::config::PartitionPolicy;
use gauss_jacobi::matrix::{CsrMatrix, LinearSystem};
use gauss_jacobi::parallel::UniverseComm;
use gauss_jacobi::partition::{Partitioner, ProblemSizes};
use gauss_jacobi::solver::sweep::sweep;
use gauss_jacobi::solver::{LinearSolver, SerialJacobi};

/// Tridiagonal 1D Laplacian shifted to be strictly diagonally dominant.
fn banded(n: usize) -> LinearSystem {
    let mut offsets = vec![0];
    let mut columns = Vec::new();
    let mut weights = Vec::new();
    for i in 0..n {
        if i > 0 {
            columns.push(i - 1);
            weights.push(-1.0);
        }
        columns.push(i);
        weights.push(4.0);
        if i + 1 < n {
            columns.push(i + 1);
            weights.push(-1.0);
        }
        offsets.push(columns.len());
    }
    let a = CsrMatrix::try_new(n, offsets, columns, weights).unwrap();
    let b = (0..n).map(|i| (i as f64).cos()).collect();
    LinearSystem::new(a, b).unwrap()
}

fn bench_sweep(c: &mut Criterion) {
    let n = 100_000;
    let system = banded(n);
    let iteration = system.jacobi_iteration().unwrap();
    let sizes = ProblemSizes::of(&iteration);
    let (_, block) = Partitioner::new(PartitionPolicy::Balanced)
        .distribute(&UniverseComm::Serial, sizes, Some(&iteration))
        .unwrap();
    let x: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
    let mut x_new = vec![0.0; n];

    c.bench_function("block sweep", |ben| {
        ben.iter(|| sweep(black_box(&block), black_box(&x), black_box(&mut x_new)))
    });

    c.bench_function("csr spmv", |ben| {
        ben.iter(|| iteration.matrix.spmv(black_box(&x), black_box(&mut x_new)))
    });

    c.bench_function("csr spmv parallel", |ben| {
        ben.iter(|| iteration.matrix.spmv_parallel(black_box(&x), black_box(&mut x_new)))
    });
}

fn bench_serial_solve(c: &mut Criterion) {
    let system = banded(2_000);
    c.bench_function("serial jacobi n=2000", |ben| {
        let mut solver = SerialJacobi::new(1e-10, Some(10_000));
        ben.iter(|| {
            let mut x = vec![0.0; system.n()];
            let _stats = solver.solve(black_box(&system.matrix), black_box(&system.rhs), &mut x).unwrap();
        })
    });
}

criterion_group!(benches, bench_sweep, bench_serial_solve);
criterion_main!(benches);
