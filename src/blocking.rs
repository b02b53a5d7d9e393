//! Blocking probability solvers for the Engset equation `P = 1/h(P)`.
//!
//! Four interchangeable strategies share the same root equation:
//!
//! - [`fast_newton`]: Newton steps on the truncated series with a
//!   finite-difference derivative taken from a single series pass,
//! - [`classic_newton`]: Newton steps with the analytic derivative of the
//!   hypergeometric form,
//! - [`fixed_point`]: the plain iteration `P <- 1/h(P)`, which may diverge,
//! - [`bisection`]: bracketing on `[0, 1]`, slow but unconditional.
//!
//! [`solve`] dispatches on [`Algorithm`]. Every solver handles the
//! closed-form regimes `N <= m` (`P = 0`) and `m = 0` (`P = 1`) without
//! iterating.

use log::{debug, trace, warn};

use crate::error::Result;
use crate::hypergeometric::hyp2f1;
use crate::options::{Algorithm, SolverConfig};
use crate::params::ProblemParameters;
use crate::series::SeriesCoefficients;
use crate::solving::{IterationState, SolveResult, SolveStatus};

/// Solves for the blocking probability with the chosen algorithm.
pub fn solve(
    params: &ProblemParameters,
    algorithm: Algorithm,
    config: &SolverConfig,
) -> Result<SolveResult> {
    let result = match algorithm {
        Algorithm::FastNewton => fast_newton(params, config),
        Algorithm::ClassicNewton => classic_newton(params, config),
        Algorithm::FixedPoint => {
            warn!("the fixed point method for the blocking probability can be unstable; use at your own risk");
            fixed_point(params, config)
        }
        Algorithm::Bisection => bisection(params, config),
    }?;
    debug!(
        "{algorithm:?} on (m = {}, N = {}, E = {}) finished with {:?} after {} iterations",
        params.servers(),
        params.sources(),
        params.traffic(),
        result.status,
        result.iterations
    );
    Ok(result)
}

/// Validates `(m, N, E)` and solves for the blocking probability.
pub fn solve_blocking_probability(
    servers: usize,
    sources: usize,
    traffic: f64,
    algorithm: Algorithm,
    config: &SolverConfig,
) -> Result<SolveResult> {
    let params = ProblemParameters::new(servers, sources, traffic)?;
    solve(&params, algorithm, config)
}

fn shortcut(params: &ProblemParameters) -> Option<SolveResult> {
    params.trivial_blocking().map(SolveResult::exact)
}

/// Final check on a settled iterate: it must be a probability whose residual
/// `1/h(P) - P` is within `bound`, otherwise the iteration broke down.
fn accept(value: f64, residual: f64, bound: f64, iterations: usize) -> SolveResult {
    if (0.0..=1.0).contains(&value) && residual.abs() <= bound {
        return SolveResult::converged(value, iterations);
    }
    debug!("rejecting settled iterate P = {value} with residual {residual}");
    SolveResult::failed(SolveStatus::Unstable, value, iterations)
}

/// Newton iteration on the truncated series.
///
/// With `r = 1/h(P)` and `r_e = 1/h(P + tol)` the update is
/// `P + (r - P) / ((r - r_e)/tol + 1)`. Since `1/h` is decreasing in `P` the
/// denominator is at least one.
pub fn fast_newton(params: &ProblemParameters, config: &SolverConfig) -> Result<SolveResult> {
    config.validate()?;
    if let Some(result) = shortcut(params) {
        return Ok(result);
    }

    let coefficients = SeriesCoefficients::new(params.servers(), params.sources())?;
    let offset = params.offset();
    let tolerance = config.tolerance;
    let mut state = IterationState::start(config.initial_guess);

    while state.iteration < config.max_iterations {
        state.iteration += 1;
        let pair = coefficients.evaluate_pair(state.value + offset, tolerance);
        let target = pair.value.recip();
        let slope = (target - pair.shifted.recip()) / tolerance;
        let next = state.value + (target - state.value) / (slope + 1.0);
        trace!(
            "fast newton iteration {}: P = {next}, {} series terms",
            state.iteration,
            pair.terms
        );

        if !next.is_finite() {
            return Ok(SolveResult::failed(
                SolveStatus::Unstable,
                state.value,
                state.iteration,
            ));
        }
        if state.advance(next) <= tolerance {
            let residual = coefficients.evaluate(next + offset, tolerance).recip() - next;
            let bound = 2.0 * (1.0 + slope) * tolerance;
            return Ok(accept(next, residual, bound, state.iteration));
        }
    }

    Ok(SolveResult::failed(
        SolveStatus::MaxIterationsExceeded,
        state.value,
        state.iteration,
    ))
}

/// The two hypergeometric terms of the Engset equation at `p`:
/// `h1 = 2F1(1, -m; N-m; -x)` and `h2 = 2F1(2, 1-m; N-m+1; -x)` with
/// `x = p + N/E - 1`. `dh1/dp = m/(N-m) * h2`.
fn hypergeometric_terms(params: &ProblemParameters, p: f64) -> Result<(f64, f64)> {
    let m = params.servers() as f64;
    let c = (params.sources() - params.servers()) as f64;
    let z = -(p + params.offset());
    let h1 = hyp2f1(1.0, -m, c, z)?;
    let h2 = hyp2f1(2.0, 1.0 - m, c + 1.0, z)?;
    Ok((h1, h2))
}

/// Newton iteration with the analytic derivative of the hypergeometric form.
pub fn classic_newton(params: &ProblemParameters, config: &SolverConfig) -> Result<SolveResult> {
    config.validate()?;
    if let Some(result) = shortcut(params) {
        return Ok(result);
    }

    let ratio = params.servers() as f64 / (params.sources() - params.servers()) as f64;
    let mut state = IterationState::start(config.initial_guess);

    while state.iteration < config.max_iterations {
        state.iteration += 1;
        let (h1, h2) = hypergeometric_terms(params, state.value)?;
        let slope = ratio * h2 / (h1 * h1);
        let next = state.value + (h1.recip() - state.value) / (slope + 1.0);
        trace!("classic newton iteration {}: P = {next}", state.iteration);

        if !next.is_finite() {
            return Ok(SolveResult::failed(
                SolveStatus::Unstable,
                state.value,
                state.iteration,
            ));
        }
        if state.advance(next) <= config.tolerance {
            let (h1, _) = hypergeometric_terms(params, next)?;
            let bound = 2.0 * (1.0 + slope) * config.tolerance;
            return Ok(accept(next, h1.recip() - next, bound, state.iteration));
        }
    }

    Ok(SolveResult::failed(
        SolveStatus::MaxIterationsExceeded,
        state.value,
        state.iteration,
    ))
}

/// Plain fixed-point iteration `P <- 1/h1(P)`.
///
/// Converges locally only when [`lipschitz_constant`] is below one at the
/// root; otherwise it oscillates or diverges and reports
/// [`SolveStatus::MaxIterationsExceeded`].
pub fn fixed_point(params: &ProblemParameters, config: &SolverConfig) -> Result<SolveResult> {
    fixed_point_observed(params, config, |_| {})
}

/// Runs [`fixed_point`] and also returns every iterate visited, starting
/// with the initial guess.
pub fn fixed_point_trajectory(
    params: &ProblemParameters,
    config: &SolverConfig,
) -> Result<(SolveResult, Vec<f64>)> {
    let mut trajectory = Vec::new();
    let result = fixed_point_observed(params, config, |p| trajectory.push(p))?;
    Ok((result, trajectory))
}

fn fixed_point_observed<F>(
    params: &ProblemParameters,
    config: &SolverConfig,
    mut observe: F,
) -> Result<SolveResult>
where
    F: FnMut(f64),
{
    config.validate()?;
    if let Some(result) = shortcut(params) {
        if let Some(value) = result.value() {
            observe(value);
        }
        return Ok(result);
    }

    let mut state = IterationState::start(config.initial_guess);
    observe(state.value);

    while state.iteration < config.max_iterations {
        state.iteration += 1;
        let (h1, _) = hypergeometric_terms(params, state.value)?;
        let next = h1.recip();
        observe(next);
        trace!("fixed point iteration {}: P = {next}", state.iteration);

        if !next.is_finite() {
            return Ok(SolveResult::failed(
                SolveStatus::Unstable,
                state.value,
                state.iteration,
            ));
        }
        // The step is the residual at the previous iterate.
        let step = state.advance(next);
        if step <= config.tolerance {
            return Ok(accept(next, step, config.tolerance, state.iteration));
        }
    }

    Ok(SolveResult::failed(
        SolveStatus::MaxIterationsExceeded,
        state.value,
        state.iteration,
    ))
}

/// Bisection of the residual `1/h(P) - P` on `[0, 1]`.
///
/// The residual is decreasing in `P` and changes sign on the bracket for
/// every valid parameter triple, which is assumed rather than checked.
/// The initial guess is ignored.
pub fn bisection(params: &ProblemParameters, config: &SolverConfig) -> Result<SolveResult> {
    bisection_observed(params, config, |_, _| {})
}

pub(crate) fn bisection_observed<F>(
    params: &ProblemParameters,
    config: &SolverConfig,
    mut observe: F,
) -> Result<SolveResult>
where
    F: FnMut(f64, f64),
{
    config.validate()?;
    if let Some(result) = shortcut(params) {
        return Ok(result);
    }

    let coefficients = SeriesCoefficients::new(params.servers(), params.sources())?;
    let offset = params.offset();
    let tolerance = config.tolerance;
    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    let mut state = IterationState::start(0.5);

    while state.iteration < config.max_iterations {
        state.iteration += 1;
        observe(lo, hi);
        state.value = 0.5 * (lo + hi);
        if 0.5 * (hi - lo) <= tolerance {
            return Ok(SolveResult::converged(state.value, state.iteration));
        }

        let residual = coefficients.evaluate(state.value + offset, tolerance).recip() - state.value;
        if residual.is_nan() {
            return Ok(SolveResult::failed(
                SolveStatus::Unstable,
                state.value,
                state.iteration,
            ));
        }
        if residual < 0.0 {
            hi = state.value;
        } else {
            lo = state.value;
        }
    }

    Ok(SolveResult::failed(
        SolveStatus::MaxIterationsExceeded,
        state.value,
        state.iteration,
    ))
}

/// Local contraction factor `q = (m/(N-m)) * h2/h1^2` of the fixed-point map
/// at `p`. Zero for the closed-form regimes.
pub fn lipschitz_constant(params: &ProblemParameters, p: f64) -> Result<f64> {
    if params.trivial_blocking().is_some() {
        return Ok(0.0);
    }
    let ratio = params.servers() as f64 / (params.sources() - params.servers()) as f64;
    let (h1, h2) = hypergeometric_terms(params, p)?;
    Ok(ratio * h2 / (h1 * h1))
}
