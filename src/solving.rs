//! Solver outcomes and per-solve iteration state.

use serde::{Deserialize, Serialize};

/// Describes whether a solve succeeded and, if not, how it stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveStatus {
    /// The tolerance criterion was met.
    Converged,
    /// The searched quantity grows without bound (e.g. unlimited sources).
    Unbounded,
    /// The iteration budget ran out before the tolerance criterion was met.
    MaxIterationsExceeded,
    /// The iteration broke down, e.g. a vanishing derivative.
    Unstable,
}

impl SolveStatus {
    /// True only for [`SolveStatus::Converged`].
    pub fn is_converged(self) -> bool {
        matches!(self, SolveStatus::Converged)
    }
}

/// Result of a scalar solve.
///
/// The last iterate is kept for diagnostics, but [`SolveResult::value`] only
/// hands it out when the solve converged.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolveResult<T = f64> {
    /// Number of passes performed (zero for closed-form shortcuts).
    pub iterations: usize,
    /// Terminal status.
    pub status: SolveStatus,
    last_iterate: Option<T>,
}

impl<T: Copy> SolveResult<T> {
    /// Successful result.
    pub fn converged(value: T, iterations: usize) -> Self {
        Self {
            iterations,
            status: SolveStatus::Converged,
            last_iterate: Some(value),
        }
    }

    /// Result of a closed-form shortcut that needed no iteration.
    pub fn exact(value: T) -> Self {
        Self::converged(value, 0)
    }

    /// Unsuccessful result that remembers where the iteration stopped.
    pub fn failed(status: SolveStatus, last_iterate: T, iterations: usize) -> Self {
        debug_assert!(!status.is_converged());
        Self {
            iterations,
            status,
            last_iterate: Some(last_iterate),
        }
    }

    /// Result for a quantity that grows without bound.
    pub fn unbounded(iterations: usize) -> Self {
        Self {
            iterations,
            status: SolveStatus::Unbounded,
            last_iterate: None,
        }
    }

    /// The solution, if the solve converged.
    pub fn value(&self) -> Option<T> {
        if self.status.is_converged() {
            self.last_iterate
        } else {
            None
        }
    }

    /// The final iterate regardless of status. Not a solution unless converged.
    pub fn last_iterate(&self) -> Option<T> {
        self.last_iterate
    }

    /// Convenience accessor mirroring [`SolveStatus::is_converged`].
    pub fn is_converged(&self) -> bool {
        self.status.is_converged()
    }
}

/// Current iterate and pass count owned by a single solver loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationState {
    /// Current iterate.
    pub value: f64,
    /// Passes completed so far.
    pub iteration: usize,
}

impl IterationState {
    /// Starts an iteration at `value`.
    pub fn start(value: f64) -> Self {
        Self {
            value,
            iteration: 0,
        }
    }

    /// Moves to `next`, returning the absolute step taken.
    pub fn advance(&mut self, next: f64) -> f64 {
        let step = (self.value - next).abs();
        self.value = next;
        step
    }
}
