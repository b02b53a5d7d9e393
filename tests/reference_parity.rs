use approx::assert_relative_eq;
use engset::{
    n_servers, n_sources, solve_blocking_probability, total_traffic, Algorithm, SolveStatus,
    SolverConfig, TrafficAlgorithm,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const ALGORITHMS: [Algorithm; 4] = [
    Algorithm::FastNewton,
    Algorithm::ClassicNewton,
    Algorithm::FixedPoint,
    Algorithm::Bisection,
];

/// Reference values published by the erlang.com Engset calculator (three decimals).
#[test]
fn blocking_matches_published_calculator() {
    let config = SolverConfig::default();
    let cases = [
        (0.016, 5, 10, 2.0),
        (0.181, 5, 20, 4.0),
        (0.471, 5, 20, 8.0),
        (0.709, 5, 20, 16.0),
        (0.764, 5, 40, 20.0),
    ];

    for (expected, m, n, e) in cases {
        let mut values = Vec::new();
        for algorithm in ALGORITHMS {
            let result = solve_blocking_probability(m, n, e, algorithm, &config).unwrap();
            assert_eq!(result.status, SolveStatus::Converged);
            assert!(result.iterations <= config.max_iterations);
            values.push(result.value().unwrap());
        }
        assert_relative_eq!(values[0], expected, epsilon = 1e-3);
        for value in &values[1..] {
            assert_relative_eq!(values[0], *value, max_relative = 1e-6);
        }
    }
}

/// Inverse queries must land on the parameters a forward solve started from.
#[test]
fn inverse_queries_recover_random_parameters() {
    let config = SolverConfig::default();
    let mut rng = SmallRng::seed_from_u64(20_240_601);
    let mut checked = 0;

    while checked < 100 {
        let sources: usize = rng.gen_range(2..100);
        let servers: usize = rng.gen_range(1..sources);
        let traffic: f64 = rng.gen_range(0.05..servers as f64 + 0.05);

        let result =
            solve_blocking_probability(servers, sources, traffic, Algorithm::FastNewton, &config)
                .unwrap();
        let Some(p) = result.value() else { continue };
        if p < 1e-6 {
            continue;
        }
        checked += 1;

        let below = n_servers(p - 1e-9, sources, traffic, &config).unwrap();
        assert_eq!(below.value(), Some(servers + 1), "{servers} {sources} {traffic}");
        let above = n_servers(p + 1e-9, sources, traffic, &config).unwrap();
        assert_eq!(above.value(), Some(servers), "{servers} {sources} {traffic}");

        let below = n_sources(p - 1e-9, servers, traffic, &config).unwrap();
        assert_eq!(below.value(), Some(sources - 1), "{servers} {sources} {traffic}");
        let above = n_sources(p + 1e-9, servers, traffic, &config).unwrap();
        assert_eq!(above.value(), Some(sources), "{servers} {sources} {traffic}");

        let recovered =
            total_traffic(p, servers, sources, TrafficAlgorithm::Bisection, &config).unwrap();
        assert!(recovered.iterations <= config.max_iterations);
        assert_relative_eq!(recovered.value().unwrap(), traffic, epsilon = 1e-6);
    }
}

#[test]
fn single_server_at_one_erlang_supports_unlimited_sources() {
    let config = SolverConfig::default();
    for sources in [2, 100, 10_000, 1_000_000] {
        let p = solve_blocking_probability(1, sources, 1.0, Algorithm::FastNewton, &config)
            .unwrap()
            .value()
            .unwrap();
        assert!(p < 0.5);
    }
    let result = n_sources(0.5, 1, 1.0, &config).unwrap();
    assert_eq!(result.status, SolveStatus::Unbounded);
}

#[test]
fn results_serialize_for_recording() {
    let result =
        solve_blocking_probability(4, 10, 2.0, Algorithm::ClassicNewton, &SolverConfig::default())
            .unwrap();
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"Converged\""));
    let back: engset::SolveResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back.status, SolveStatus::Converged);
    assert_relative_eq!(back.value().unwrap(), 0.06495282643260683, epsilon = 1e-12);
}
