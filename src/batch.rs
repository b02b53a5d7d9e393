//! Element-wise application of the scalar solver over arrays of inputs.
//!
//! Every element is an independent solve with no shared state, so the work
//! is spread across the rayon thread pool.

use nalgebra::DVector;
use rayon::prelude::*;

use crate::blocking::solve;
use crate::error::{EngsetError, Result};
use crate::options::{Algorithm, SolverConfig};
use crate::params::ProblemParameters;
use crate::solving::SolveResult;

/// Solves every parameter triple in parallel, preserving input order.
pub fn solve_batch(
    cases: &[ProblemParameters],
    algorithm: Algorithm,
    config: &SolverConfig,
) -> Result<Vec<SolveResult>> {
    config.validate()?;
    cases
        .par_iter()
        .map(|params| solve(params, algorithm, config))
        .collect()
}

/// Blocking probabilities for parallel arrays of servers, sources and traffic.
///
/// Fails on mismatched lengths, on any invalid triple, and on the first
/// element (by index) whose solve did not converge.
pub fn blocking_probabilities(
    servers: &[usize],
    sources: &[usize],
    traffic: &DVector<f64>,
    algorithm: Algorithm,
    config: &SolverConfig,
) -> Result<DVector<f64>> {
    let n = servers.len();
    if sources.len() != n {
        return Err(EngsetError::dimension_mismatch(
            "sources length",
            n,
            sources.len(),
        ));
    }
    if traffic.len() != n {
        return Err(EngsetError::dimension_mismatch(
            "traffic length",
            n,
            traffic.len(),
        ));
    }

    let cases = servers
        .iter()
        .zip(sources.iter())
        .zip(traffic.iter())
        .map(|((&servers, &sources), &traffic)| ProblemParameters::new(servers, sources, traffic))
        .collect::<Result<Vec<_>>>()?;

    let results = solve_batch(&cases, algorithm, config)?;
    let mut probabilities = DVector::zeros(n);
    for (index, result) in results.iter().enumerate() {
        probabilities[index] = result.value().ok_or(EngsetError::DidNotConverge {
            index,
            iterations: result.iterations,
            status: result.status,
        })?;
    }
    Ok(probabilities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocking::fast_newton;
    use crate::solving::SolveStatus;
    use approx::assert_relative_eq;

    #[test]
    fn batch_matches_scalar_solves() {
        let config = SolverConfig::default();
        let cases: Vec<_> = (1..30)
            .map(|m| ProblemParameters::new(m, 30, 0.5 * m as f64).unwrap())
            .collect();
        let results = solve_batch(&cases, Algorithm::FastNewton, &config).unwrap();
        assert_eq!(results.len(), cases.len());
        for (params, result) in cases.iter().zip(results.iter()) {
            assert_eq!(*result, fast_newton(params, &config).unwrap());
        }
    }

    #[test]
    fn arrays_include_trivial_cases() {
        let traffic = DVector::from_vec(vec![2.0, 2.0, 2.0, 2.0]);
        let probabilities = blocking_probabilities(
            &[5, 0, 5, 4],
            &[10, 10, 5, 10],
            &traffic,
            Algorithm::FastNewton,
            &SolverConfig::default(),
        )
        .unwrap();
        assert_relative_eq!(probabilities[0], 0.016349962386312377, epsilon = 1e-12);
        assert_eq!(probabilities[1], 1.0);
        assert_eq!(probabilities[2], 0.0);
        assert_relative_eq!(probabilities[3], 0.06495282643260683, epsilon = 1e-12);
    }

    #[test]
    fn arrays_validate_lengths_and_values() {
        let config = SolverConfig::default();
        let traffic = DVector::from_vec(vec![2.0]);
        assert!(matches!(
            blocking_probabilities(&[5, 4], &[10, 10], &traffic, Algorithm::FastNewton, &config),
            Err(EngsetError::DimensionMismatch { .. })
        ));

        let traffic = DVector::from_vec(vec![2.0, 0.0]);
        assert!(matches!(
            blocking_probabilities(&[5, 4], &[10, 10], &traffic, Algorithm::FastNewton, &config),
            Err(EngsetError::InvalidTraffic { .. })
        ));
    }

    #[test]
    fn arrays_surface_non_convergence() {
        let config = SolverConfig::default().with_max_iterations(1);
        let traffic = DVector::from_vec(vec![2.0, 2.0]);
        let error =
            blocking_probabilities(&[0, 5], &[10, 10], &traffic, Algorithm::Bisection, &config)
                .unwrap_err();
        assert!(matches!(
            error,
            EngsetError::DidNotConverge {
                index: 1,
                iterations: 1,
                status: SolveStatus::MaxIterationsExceeded,
            }
        ));
    }
}
