use criterion::{black_box, criterion_group, criterion_main, Criterion};
use engset::{solve, Algorithm, ProblemParameters, SolverConfig};

fn bench_algorithms(c: &mut Criterion) {
    let config = SolverConfig::default();
    let params = ProblemParameters::new(20, 60, 18.0).expect("valid parameters");

    let mut group = c.benchmark_group("blocking_prob");
    for algorithm in [
        Algorithm::FastNewton,
        Algorithm::ClassicNewton,
        Algorithm::Bisection,
    ] {
        group.bench_function(format!("{algorithm:?}"), |b| {
            b.iter(|| solve(black_box(&params), algorithm, &config))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_algorithms);
criterion_main!(benches);
