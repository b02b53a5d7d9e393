//! Derived queries that invert the blocking probability.
//!
//! Each query fixes a target blocking probability `P` and searches over one
//! of the remaining parameters. Because `P` is held at the target, the
//! predicate "blocking is below `P`" reduces to the sign of the residual
//! `1/h(P) - P` at the candidate parameters, so no inner solve is needed.

use log::{debug, warn};

use crate::error::Result;
use crate::options::{SolverConfig, TrafficAlgorithm};
use crate::params::{
    validate_probability, validate_servers, validate_sources, validate_traffic,
    TRAFFIC_EXCEEDS_SOURCES_WARNING,
};
use crate::series::SeriesCoefficients;
use crate::solving::{SolveResult, SolveStatus};

/// `1/h` for `(servers, sources)` at series argument `x`.
fn blocking_at(servers: usize, sources: usize, x: f64, tolerance: f64) -> Result<f64> {
    let coefficients = SeriesCoefficients::new(servers, sources)?;
    Ok(coefficients.evaluate(x, tolerance).recip())
}

/// Minimum number of servers for which the blocking probability of
/// `sources` sources offering `traffic` Erlangs is below `probability`.
///
/// Integer bisection over `[1, N]`.
pub fn n_servers(
    probability: f64,
    sources: usize,
    traffic: f64,
    config: &SolverConfig,
) -> Result<SolveResult<usize>> {
    validate_probability(probability)?;
    validate_sources(sources, 1)?;
    validate_traffic(traffic)?;
    config.validate()?;
    if traffic > sources as f64 {
        warn!("{TRAFFIC_EXCEEDS_SOURCES_WARNING} (E = {traffic}, N = {sources})");
    }

    let x = probability + sources as f64 / traffic - 1.0;
    let (mut lo, mut hi) = (1_usize, sources);
    let mut candidate = lo;

    for iteration in 1..=config.max_iterations {
        if lo == hi {
            debug!("n_servers converged to {lo} after {iteration} iterations");
            return Ok(SolveResult::converged(lo, iteration));
        }
        candidate = lo + (hi - lo) / 2;
        if blocking_at(candidate, sources, x, config.tolerance)? < probability {
            hi = candidate;
        } else {
            lo = candidate + 1;
        }
    }

    Ok(SolveResult::failed(
        SolveStatus::MaxIterationsExceeded,
        candidate,
        config.max_iterations,
    ))
}

/// Maximum number of sources that `servers` servers can take while the
/// blocking probability at `traffic` Erlangs stays below `probability`.
///
/// Some configurations never reach `probability` however many sources are
/// added (a single server at one Erlang tends to one half). Those report
/// [`SolveStatus::Unbounded`] without a value.
pub fn n_sources(
    probability: f64,
    servers: usize,
    traffic: f64,
    config: &SolverConfig,
) -> Result<SolveResult<usize>> {
    validate_probability(probability)?;
    validate_servers(servers)?;
    validate_traffic(traffic)?;
    config.validate()?;

    let y = probability - 1.0;
    let blocking = |sources: usize| {
        blocking_at(
            servers,
            sources,
            y + sources as f64 / traffic,
            config.tolerance,
        )
    };

    // Grow the upper bound until it overshoots the target.
    let mut lo = servers;
    let Some(mut hi) = servers.checked_mul(2) else {
        return Ok(SolveResult::unbounded(0));
    };
    let mut previous = f64::NAN;
    let mut iteration = 0;
    loop {
        if iteration == config.max_iterations {
            return Ok(SolveResult::failed(
                SolveStatus::MaxIterationsExceeded,
                hi,
                iteration,
            ));
        }
        iteration += 1;
        let value = blocking(hi)?;
        if value >= probability {
            break;
        }
        if (value - previous).abs() <= value.abs() * config.tolerance {
            debug!("n_sources unbounded: blocking settles at {value} below {probability}");
            return Ok(SolveResult::unbounded(iteration));
        }
        previous = value;
        hi = match hi.checked_mul(2) {
            Some(doubled) => doubled,
            None => return Ok(SolveResult::unbounded(iteration)),
        };
    }

    let mut candidate = hi;
    while iteration < config.max_iterations {
        iteration += 1;
        if lo == hi {
            return Ok(SolveResult::converged(lo, iteration));
        }
        candidate = lo + (hi - lo).div_ceil(2);
        if blocking(candidate)? < probability {
            lo = candidate;
        } else {
            hi = candidate - 1;
        }
    }

    Ok(SolveResult::failed(
        SolveStatus::MaxIterationsExceeded,
        candidate,
        iteration,
    ))
}

/// Total offered traffic at which `servers` servers and `sources` sources
/// have blocking probability `probability`.
///
/// High targets may only be reachable with more traffic than sources; a
/// warning is logged when that happens.
pub fn total_traffic(
    probability: f64,
    servers: usize,
    sources: usize,
    algorithm: TrafficAlgorithm,
    config: &SolverConfig,
) -> Result<SolveResult> {
    validate_probability(probability)?;
    validate_servers(servers)?;
    validate_sources(sources, servers)?;
    config.validate()?;

    let coefficients = SeriesCoefficients::new(servers, sources)?;
    let result = match algorithm {
        TrafficAlgorithm::Bisection => {
            traffic_bisection(&coefficients, probability, sources, config)
        }
        TrafficAlgorithm::Newton { initial_traffic } => {
            validate_traffic(initial_traffic)?;
            warn!("Newton's method for the total traffic can be unstable; use at your own risk");
            traffic_newton(&coefficients, probability, sources, initial_traffic, config)
        }
    };

    if let Some(traffic) = result.value() {
        if traffic > sources as f64 {
            warn!("{TRAFFIC_EXCEEDS_SOURCES_WARNING} (E = {traffic}, N = {sources})");
        }
    }
    debug!(
        "total_traffic finished with {:?} after {} iterations",
        result.status, result.iterations
    );
    Ok(result)
}

fn traffic_bisection(
    coefficients: &SeriesCoefficients,
    probability: f64,
    sources: usize,
    config: &SolverConfig,
) -> SolveResult {
    let n = sources as f64;
    let y = probability - 1.0;
    let blocking = |traffic: f64| coefficients.evaluate(y + n / traffic, config.tolerance).recip();

    let mut lo = 0.0_f64;
    let mut hi = n;
    let mut iteration = 0;
    loop {
        if iteration == config.max_iterations {
            return SolveResult::failed(SolveStatus::MaxIterationsExceeded, hi, iteration);
        }
        iteration += 1;
        if blocking(hi) >= probability {
            break;
        }
        hi *= 2.0;
    }

    let mut midpoint = 0.5 * (lo + hi);
    while iteration < config.max_iterations {
        iteration += 1;
        midpoint = 0.5 * (lo + hi);
        if 0.5 * (hi - lo) <= config.tolerance {
            return SolveResult::converged(midpoint, iteration);
        }
        if blocking(midpoint) < probability {
            lo = midpoint;
        } else {
            hi = midpoint;
        }
    }

    SolveResult::failed(SolveStatus::MaxIterationsExceeded, midpoint, iteration)
}

fn traffic_newton(
    coefficients: &SeriesCoefficients,
    probability: f64,
    sources: usize,
    initial_traffic: f64,
    config: &SolverConfig,
) -> SolveResult {
    let n = sources as f64;
    let y = probability - 1.0;
    let tolerance = config.tolerance;
    let blocking = |traffic: f64| coefficients.evaluate(y + n / traffic, tolerance).recip();

    let mut traffic = initial_traffic;
    for iteration in 1..=config.max_iterations {
        let step = traffic * tolerance;
        let current = blocking(traffic);
        let derivative = (current - blocking(traffic + step)) / step;
        if derivative == 0.0 {
            return SolveResult::failed(SolveStatus::Unstable, traffic, iteration);
        }
        let next = traffic + (current - probability) / derivative;
        if !next.is_finite() || next <= 0.0 {
            return SolveResult::failed(SolveStatus::Unstable, traffic, iteration);
        }
        if (traffic - next).abs() / next.abs() <= tolerance {
            return SolveResult::converged(next, iteration);
        }
        traffic = next;
    }

    SolveResult::failed(
        SolveStatus::MaxIterationsExceeded,
        traffic,
        config.max_iterations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::solve_blocking_probability;
    use crate::error::EngsetError;
    use crate::options::Algorithm;
    use approx::assert_relative_eq;

    fn reference(m: usize, n: usize, e: f64) -> f64 {
        solve_blocking_probability(m, n, e, Algorithm::FastNewton, &SolverConfig::default())
            .unwrap()
            .value()
            .unwrap()
    }

    #[test]
    fn servers_bracket_the_blocking_probability() {
        let config = SolverConfig::default();
        let p = reference(5, 10, 2.0);

        let result = n_servers(p - 1e-9, 10, 2.0, &config).unwrap();
        assert_eq!(result.value(), Some(6));
        let result = n_servers(p + 1e-9, 10, 2.0, &config).unwrap();
        assert_eq!(result.value(), Some(5));
        assert!(result.iterations <= config.max_iterations);
    }

    #[test]
    fn sources_bracket_the_blocking_probability() {
        let config = SolverConfig::default();
        let p = reference(5, 10, 2.0);

        assert_eq!(n_sources(p - 1e-9, 5, 2.0, &config).unwrap().value(), Some(9));
        assert_eq!(n_sources(p + 1e-9, 5, 2.0, &config).unwrap().value(), Some(10));
    }

    #[test]
    fn sources_can_be_unbounded() {
        let config = SolverConfig::default();

        let result = n_sources(0.5, 1, 1.0, &config).unwrap();
        assert_eq!(result.status, SolveStatus::Unbounded);
        assert_eq!(result.value(), None);

        // With E fixed, more sources approach Erlang B(5, 2) which is below 0.1.
        let result = n_sources(0.1, 5, 2.0, &config).unwrap();
        assert_eq!(result.status, SolveStatus::Unbounded);
    }

    #[test]
    fn traffic_recovers_the_offered_load() {
        let config = SolverConfig::default();
        let p = reference(5, 10, 2.0);

        let result = total_traffic(p, 5, 10, TrafficAlgorithm::Bisection, &config).unwrap();
        assert_relative_eq!(result.value().unwrap(), 2.0, epsilon = 1e-6);

        let result = total_traffic(p, 5, 10, TrafficAlgorithm::newton(), &config).unwrap();
        assert!(result.is_converged());
        assert_relative_eq!(result.value().unwrap(), 2.0, epsilon = 1e-6);
    }

    #[test]
    fn traffic_may_exceed_the_number_of_sources() {
        let config = SolverConfig::default();
        let result = total_traffic(0.95, 2, 3, TrafficAlgorithm::Bisection, &config).unwrap();
        let traffic = result.value().unwrap();
        assert!(traffic > 3.0);
        assert_relative_eq!(reference(2, 3, traffic), 0.95, epsilon = 1e-6);
    }

    #[test]
    fn traffic_newton_stops_when_the_derivative_vanishes() {
        // At one Erlang the series overflows, so blocking is zero on both
        // sides of the finite difference.
        let config = SolverConfig::default();
        let algorithm = TrafficAlgorithm::Newton {
            initial_traffic: 1.0,
        };
        let result = total_traffic(0.5, 200, 400, algorithm, &config).unwrap();
        assert_eq!(result.status, SolveStatus::Unstable);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.last_iterate(), Some(1.0));

        let result = total_traffic(0.5, 200, 400, TrafficAlgorithm::Bisection, &config).unwrap();
        assert!(result.is_converged());
    }

    #[test]
    fn traffic_newton_stops_when_an_iterate_turns_negative() {
        let config = SolverConfig::default();
        let algorithm = TrafficAlgorithm::Newton {
            initial_traffic: 50.0,
        };
        let result = total_traffic(0.5, 5, 10, algorithm, &config).unwrap();
        assert_eq!(result.status, SolveStatus::Unstable);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.last_iterate(), Some(50.0));
    }

    #[test]
    fn servers_and_traffic_beyond_the_number_of_sources() {
        let config = SolverConfig::default();
        let p = reference(60, 61, 200.0);
        assert_relative_eq!(p, 0.7009397924186574, epsilon = 1e-6);

        assert_eq!(n_servers(p + 1e-6, 61, 200.0, &config).unwrap().value(), Some(60));
        let result = total_traffic(p, 60, 61, TrafficAlgorithm::Bisection, &config).unwrap();
        assert_relative_eq!(result.value().unwrap(), 200.0, max_relative = 1e-5);
    }

    #[test]
    fn rejects_invalid_queries() {
        let config = SolverConfig::default();

        for (p, n, e) in [(0.0, 2, 1.0), (1.0, 2, 1.0), (0.5, 1, 1.0), (0.5, 2, 0.0)] {
            assert!(n_servers(p, n, e, &config).is_err());
        }
        for (p, m, e) in [(0.0, 1, 1.0), (1.0, 1, 1.0), (0.5, 0, 1.0), (0.5, 1, 0.0)] {
            assert!(n_sources(p, m, e, &config).is_err());
        }
        for (p, m, n) in [(0.0, 1, 2), (1.0, 1, 2), (0.5, 0, 2), (0.5, 1, 1)] {
            assert!(total_traffic(p, m, n, TrafficAlgorithm::Bisection, &config).is_err());
        }
        assert!(matches!(
            total_traffic(
                0.5,
                1,
                2,
                TrafficAlgorithm::Newton {
                    initial_traffic: -1.0
                },
                &config
            ),
            Err(EngsetError::InvalidTraffic { .. })
        ));
    }
}
