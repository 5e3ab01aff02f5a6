use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dense_plu::{lu, plu};
use ndarray::{Array, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

// Random dense matrix with a boosted diagonal so both LU and PLU succeed.
fn generate_matrix(n: usize) -> Array2<f64> {
    let mut a = Array::random((n, n), Uniform::new(-1., 1.));
    for i in 0..n {
        a[[i, i]] += n as f64;
    }
    a
}

fn bench_plu(c: &mut Criterion) {
    let mut group = c.benchmark_group("plu");

    for &n in [8usize, 32, 128, 256].iter() {
        let data = generate_matrix(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("plu", format!("{}x{}", n, n)), &data, |b, a| {
            b.iter(|| plu(a).unwrap());
        });
    }
    group.finish();
}

fn bench_lu(c: &mut Criterion) {
    let mut group = c.benchmark_group("lu");

    for &n in [8usize, 32, 128, 256].iter() {
        let data = generate_matrix(n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("lu", format!("{}x{}", n, n)), &data, |b, a| {
            b.iter(|| lu(a).unwrap());
        });
    }
    group.finish();
}

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("plu_solve");

    for &n in [32usize, 128].iter() {
        let data = generate_matrix(n);
        let rhs = Array::random(n, Uniform::new(-1., 1.));
        let decomposition = plu(&data).unwrap();
        group.bench_with_input(BenchmarkId::new("solve", n), &rhs, |b, rhs| {
            b.iter(|| decomposition.solve(rhs).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_plu, bench_lu, bench_solve);
criterion_main!(benches);
