//! Fast and accurate blocking probability computations for the Engset model.
//!
//! In an Engset queue `N` independent sources offer a total of `E` Erlangs
//! of traffic to `m` servers. The probability `P` that an arriving request
//! finds every server busy has no closed form: it solves the implicit
//! equation `P = 1/2F1(1, -m; N - m; 1 - N/E - P)`. This crate offers
//!
//! - a fast Newton solver built on a purpose-made truncated series whose
//!   derivative comes almost for free (`blocking` and `series` modules),
//! - reference solvers (analytic Newton, fixed point, bisection) for
//!   cross-validation (`blocking` and `hypergeometric` modules),
//! - inverse queries for the number of servers, number of sources, and
//!   total traffic that achieve a target blocking probability (`inverse`
//!   module), and
//! - parallel application over arrays of inputs (`batch` module).
//!
//! Non-convergence is reported through [`SolveStatus`] rather than as an
//! error, so callers can retry with another [`Algorithm`] or a looser
//! tolerance. Only invalid inputs produce an [`EngsetError`].
//!
//! # Quick start
//!
//! ```
//! use engset::{solve_blocking_probability, Algorithm, SolverConfig};
//!
//! let m = 5; // servers
//! let n = 10; // sources
//! let e = 2.0; // total offered traffic in Erlangs
//!
//! let result = solve_blocking_probability(m, n, e, Algorithm::FastNewton, &SolverConfig::default())
//!     .expect("valid parameters");
//! let p = result.value().expect("converged");
//! assert!((p - 0.016349962386312377).abs() < 1e-9);
//! ```

pub mod batch;
pub mod blocking;
pub mod error;
pub mod hypergeometric;
pub mod inverse;
pub mod options;
pub mod params;
pub mod series;
pub mod solving;

pub use batch::{blocking_probabilities, solve_batch};
pub use blocking::{solve, solve_blocking_probability};
pub use error::{EngsetError, Result};
pub use inverse::{n_servers, n_sources, total_traffic};
pub use options::{Algorithm, SolverConfig, TrafficAlgorithm};
pub use params::ProblemParameters;
pub use solving::{SolveResult, SolveStatus};
