//! Solver configuration and algorithm selection.

use serde::{Deserialize, Serialize};

use crate::error::{EngsetError, Result};

/// Default error tolerance, `2^-24`.
pub const DEFAULT_TOLERANCE: f64 = 1.0 / 16_777_216.0;

/// Default starting point for the blocking probability iterations.
pub const DEFAULT_INITIAL_GUESS: f64 = 0.5;

/// Default iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 1024;

/// Default starting traffic, in Erlangs, for the Newton traffic search.
pub const DEFAULT_INITIAL_TRAFFIC: f64 = 1.0;

/// Root-finding strategy used for the blocking probability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// Newton iteration on the truncated series with a finite-difference derivative.
    #[default]
    FastNewton,
    /// Newton iteration with the analytic derivative of the hypergeometric form.
    ClassicNewton,
    /// Plain fixed-point iteration `P <- 1/h(P)`; may diverge or oscillate.
    FixedPoint,
    /// Bisection of the residual on `[0, 1]`.
    Bisection,
}

/// Root-finding strategy used by [`total_traffic`](crate::inverse::total_traffic).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrafficAlgorithm {
    /// Doubling search for an upper bracket followed by bisection.
    Bisection,
    /// Finite-difference Newton iteration started from `initial_traffic`.
    Newton { initial_traffic: f64 },
}

impl TrafficAlgorithm {
    /// Newton search started from [`DEFAULT_INITIAL_TRAFFIC`].
    pub fn newton() -> Self {
        Self::Newton {
            initial_traffic: DEFAULT_INITIAL_TRAFFIC,
        }
    }
}

impl Default for TrafficAlgorithm {
    fn default() -> Self {
        Self::Bisection
    }
}

/// Tolerance, starting point and iteration budget shared by every solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Absolute tolerance on successive iterates (or on the bracket half-width).
    /// Also bounds the relative size of the last series term kept.
    pub tolerance: f64,
    /// Starting blocking probability. Ignored by bisection.
    pub initial_guess: f64,
    /// Maximum number of passes before giving up.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            initial_guess: DEFAULT_INITIAL_GUESS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SolverConfig {
    /// Override the tolerance while preserving other defaults.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Override the starting blocking probability.
    pub fn with_initial_guess(mut self, guess: f64) -> Self {
        self.initial_guess = guess;
        self
    }

    /// Set the maximum number of iterations that should be attempted.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Checks that the configuration can drive an iteration.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(EngsetError::InvalidTolerance {
                tolerance: self.tolerance,
            });
        }
        if !self.initial_guess.is_finite() || !(0.0..=1.0).contains(&self.initial_guess) {
            return Err(EngsetError::InvalidInitialGuess {
                guess: self.initial_guess,
            });
        }
        if self.max_iterations == 0 {
            return Err(EngsetError::InvalidMaxIterations);
        }
        Ok(())
    }
}
