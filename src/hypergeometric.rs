//! Gauss hypergeometric series `2F1(a, b; c; z)`.
//!
//! The Engset equation only ever needs a terminating series (`b` is a
//! non-positive integer). For `z <= 0` its terms share one sign and are
//! summed directly. For `0 < z < 1` they alternate, and a high-degree
//! polynomial would cancel catastrophically, so it is summed after the Pfaff
//! transformation
//!
//! ```text
//! 2F1(a, b; c; z) = (1 - z)^(-b) 2F1(c - a, b; c; z / (z - 1)),
//! ```
//!
//! whose terms are non-negative whenever `c > 0` and `c >= a`. Very large
//! `|z|` can still overflow to infinity. The non-terminating case is
//! supported for `|z| < 1` so the routine can be checked against textbook
//! identities.

use crate::error::{EngsetError, Result};
use crate::series::ScaledSum;

const MAX_TERMS: usize = 100_000;

/// Number of terms after which the series terminates, if `p` is a
/// non-positive integer.
fn terminating_length(p: f64) -> Option<usize> {
    if p <= 0.0 && p.fract() == 0.0 {
        Some((-p) as usize)
    } else {
        None
    }
}

/// Pfaff-transformed sum of a terminating series at `0 < z < 1`, when every
/// transformed term is non-negative.
fn pfaff_terminating(a: f64, b: f64, c: f64, z: f64) -> Option<f64> {
    let (a, b, length) = match (terminating_length(a), terminating_length(b)) {
        (_, Some(length)) => (a, b, length),
        (Some(length), None) => (b, a, length),
        (None, None) => return None,
    };
    let non_negative_terms = z > 0.0 && z < 1.0 && c > 0.0 && c >= a;
    if !non_negative_terms {
        return None;
    }

    let w = z / (z - 1.0);
    let mut sum = ScaledSum::new();
    for k in 0..length {
        let k = k as f64;
        sum.push((c - a + k) * (b + k) / ((c + k) * (k + 1.0)) * w);
    }
    Some(sum.scaled_by(1.0 - z, -b))
}

/// Evaluates `2F1(a, b; c; z)` by summation, switching to the Pfaff form
/// for terminating series at `0 < z < 1`.
pub fn hyp2f1(a: f64, b: f64, c: f64, z: f64) -> Result<f64> {
    let terminates = match (terminating_length(a), terminating_length(b)) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (x, y) => x.or(y),
    };

    if let Some(pole) = terminating_length(c) {
        if terminates.map_or(true, |length| length > pole) {
            return Err(EngsetError::HypergeometricPole { c });
        }
    }
    if terminates.is_none() && z.abs() >= 1.0 {
        return Err(EngsetError::HypergeometricDivergence { z });
    }
    if let Some(value) = pfaff_terminating(a, b, c, z) {
        return Ok(value);
    }

    let limit = terminates.unwrap_or(MAX_TERMS);
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 0..limit {
        let k = k as f64;
        term *= (a + k) * (b + k) / ((c + k) * (k + 1.0)) * z;
        sum += term;
        if terminates.is_none() && term.abs() <= f64::EPSILON * sum.abs() {
            break;
        }
    }

    if sum.is_nan() {
        return Err(EngsetError::numerical("hypergeometric summation"));
    }
    if terminates.is_none() && term.abs() > f64::EPSILON * sum.abs() {
        return Err(EngsetError::HypergeometricDivergence { z });
    }
    Ok(sum)
}
