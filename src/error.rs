use thiserror::Error;

use crate::solving::SolveStatus;

/// Unified error type for `engset` operations.
#[derive(Debug, Error)]
pub enum EngsetError {
    /// Raised when the offered traffic is not a finite positive number.
    #[error("total traffic must be finite and positive, found {traffic}")]
    InvalidTraffic { traffic: f64 },

    /// Raised when a target blocking probability lies outside `(0, 1)`.
    #[error("blocking probability must lie strictly between 0 and 1, found {probability}")]
    InvalidBlockingProbability { probability: f64 },

    /// Raised when a derived query needs at least one server.
    #[error("number of servers must be a positive integer, found {servers}")]
    InvalidServers { servers: usize },

    /// Raised when a derived query needs more sources than servers.
    #[error("number of sources must exceed the number of servers ({servers}), found {sources}")]
    InvalidSources { sources: usize, servers: usize },

    /// Raised when the solver tolerance is not finite and positive.
    #[error("tolerance must be finite and positive, found {tolerance}")]
    InvalidTolerance { tolerance: f64 },

    /// Raised when the initial blocking probability guess is outside `[0, 1]`.
    #[error("initial guess must lie in [0, 1], found {guess}")]
    InvalidInitialGuess { guess: f64 },

    /// Raised when the iteration budget is zero.
    #[error("maximum number of iterations must be at least one")]
    InvalidMaxIterations,

    /// Raised when provided arrays have incompatible lengths.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required length, usually the length of the first input.
        expected: usize,
        /// The length that was actually supplied.
        found: usize,
    },

    /// Raised when the lower parameter `c` of `2F1(a, b; c; z)` hits a pole.
    #[error("hypergeometric series has a pole at c = {c}")]
    HypergeometricPole { c: f64 },

    /// Raised when a non-terminating hypergeometric series is evaluated outside `|z| < 1`.
    #[error("hypergeometric series does not converge at z = {z}")]
    HypergeometricDivergence { z: f64 },

    /// Raised when numerical routines produce NaN.
    #[error("encountered NaN during {context}")]
    NumericalError { context: &'static str },

    /// Raised by array helpers when an element fails to produce a probability.
    #[error("solve for element {index} stopped with status {status:?} after {iterations} iterations")]
    DidNotConverge {
        /// Position of the offending element in the input arrays.
        index: usize,
        /// Number of iterations performed before termination.
        iterations: usize,
        /// Terminal status reported by the scalar solver.
        status: SolveStatus,
    },
}

impl EngsetError {
    /// Helper to format a [`DimensionMismatch`](EngsetError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper to raise when a numerical routine produces NaN.
    pub fn numerical(context: &'static str) -> Self {
        Self::NumericalError { context }
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, EngsetError>;
