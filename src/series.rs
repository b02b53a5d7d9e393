//! Truncated power series for the Engset equation.
//!
//! For `N > m > 0` the blocking probability `P` satisfies `P = 1/f(P)` with
//!
//! ```text
//! f(P) = sum_{k=0}^{m} c_k x^k,   x = P + N/E - 1,
//! c_0 = 1,   c_k = c_{k-1} (m - k + 1) / (N - m + k - 1),
//! ```
//!
//! which is `2F1(1, -m; N - m; -x)` written as a polynomial. The coefficients
//! depend only on `(m, N)`, so they are computed once per solve and reused by
//! every evaluation.
//!
//! When traffic exceeds the number of sources `x` can be negative and the
//! polynomial alternates in sign. For `-1 < x < 0` it is evaluated in the
//! reflected form
//!
//! ```text
//! f = (1 + x)^m 2F1(N - m - 1, -m; N - m; x / (1 + x)),
//! ```
//!
//! whose terms are all non-negative.

use std::f64::consts::LN_2;

use nalgebra::DVector;

use crate::error::Result;
use crate::params::validate_sources;

const RESCALE_EXPONENT: i32 = 600;

/// Running sum of non-negative terms that rescales by `2^-600` instead of
/// overflowing.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScaledSum {
    sum: f64,
    term: f64,
    rescales: i32,
}

impl ScaledSum {
    pub(crate) fn new() -> Self {
        Self {
            sum: 1.0,
            term: 1.0,
            rescales: 0,
        }
    }

    /// Multiplies the last term by `ratio`, adds it, and returns its size
    /// relative to the sum.
    pub(crate) fn push(&mut self, ratio: f64) -> f64 {
        self.term *= ratio;
        self.sum += self.term;
        let threshold = 2.0_f64.powi(RESCALE_EXPONENT);
        if self.sum > threshold {
            self.sum /= threshold;
            self.term /= threshold;
            self.rescales += 1;
        }
        (self.term / self.sum).abs()
    }

    /// `sum * base^power`, undoing any rescaling.
    pub(crate) fn scaled_by(&self, base: f64, power: f64) -> f64 {
        if self.rescales == 0 {
            return self.sum * base.powf(power);
        }
        let exponent = f64::from(self.rescales * RESCALE_EXPONENT) * LN_2;
        (power * base.ln() + self.sum.ln() + exponent).exp()
    }
}

/// Coefficients `c_0, ..., c_m` of the Engset polynomial, together with the
/// term ratios of its reflected form.
#[derive(Clone, Debug)]
pub struct SeriesCoefficients {
    coefficients: DVector<f64>,
    reflected_ratios: DVector<f64>,
}

/// Two partial sums sharing one truncation point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeriesPair {
    /// Partial sum at `x`.
    pub value: f64,
    /// Partial sum at `x + tolerance`.
    pub shifted: f64,
    /// Index of the last term added.
    pub terms: usize,
}

impl SeriesCoefficients {
    /// Precomputes the coefficients for `servers` servers and `sources` sources.
    ///
    /// Fails with [`EngsetError::InvalidSources`](crate::EngsetError::InvalidSources)
    /// unless `sources > servers`.
    pub fn new(servers: usize, sources: usize) -> Result<Self> {
        validate_sources(sources, servers)?;
        let m = servers as f64;
        let gap = (sources - servers) as f64;

        let mut coefficients = DVector::from_element(servers + 1, 1.0);
        let mut reflected_ratios = DVector::zeros(servers + 1);
        for k in 1..=servers {
            let k_f = k as f64;
            coefficients[k] = coefficients[k - 1] * (m - k_f + 1.0) / (gap + k_f - 1.0);
            reflected_ratios[k] = (gap + k_f - 2.0) * (m - k_f + 1.0) / ((gap + k_f - 1.0) * k_f);
        }
        Ok(Self {
            coefficients,
            reflected_ratios,
        })
    }

    /// Polynomial degree `m`.
    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    /// Read-only view of the coefficients.
    pub fn as_slice(&self) -> &[f64] {
        self.coefficients.as_slice()
    }

    /// Partial sum at `x`, stopping once the last term is at most `tolerance`
    /// relative to the running sum.
    pub fn evaluate(&self, x: f64, tolerance: f64) -> f64 {
        if is_reflected(x) {
            return self.evaluate_reflected(x, tolerance);
        }
        let degree = self.degree();
        let mut sum = 1.0;
        let mut power = x;
        for k in 1..=degree {
            let term = self.coefficients[k] * power;
            sum += term;
            if k == degree || (term / sum).abs() <= tolerance {
                break;
            }
            power *= x;
        }
        sum
    }

    /// Partial sums at `x` and `x + tolerance` computed in a single pass.
    ///
    /// Truncation happens only once both relative term sizes are within
    /// `tolerance`, so the two sums always contain the same terms and their
    /// difference is a usable finite-difference numerator.
    pub fn evaluate_pair(&self, x: f64, tolerance: f64) -> SeriesPair {
        if is_reflected(x) {
            return self.evaluate_pair_reflected(x, tolerance);
        }
        let degree = self.degree();
        let shifted_x = x + tolerance;
        let mut value = 1.0;
        let mut shifted = 1.0;
        let mut power = x;
        let mut shifted_power = shifted_x;
        let mut terms = 0;
        for k in 1..=degree {
            let term = self.coefficients[k] * power;
            let shifted_term = self.coefficients[k] * shifted_power;
            value += term;
            shifted += shifted_term;
            terms = k;
            let settled = (term / value).abs() <= tolerance;
            let shifted_settled = (shifted_term / shifted).abs() <= tolerance;
            if k == degree || (settled && shifted_settled) {
                break;
            }
            power *= x;
            shifted_power *= shifted_x;
        }
        SeriesPair {
            value,
            shifted,
            terms,
        }
    }

    fn evaluate_reflected(&self, x: f64, tolerance: f64) -> f64 {
        let degree = self.degree();
        let w = reflected_argument(x);
        let mut sum = ScaledSum::new();
        for k in 1..=degree {
            if sum.push(self.reflected_ratios[k] * w) <= tolerance {
                break;
            }
        }
        sum.scaled_by(1.0 + x, degree as f64)
    }

    fn evaluate_pair_reflected(&self, x: f64, tolerance: f64) -> SeriesPair {
        let degree = self.degree();
        let shifted_x = x + tolerance;
        let (w, shifted_w) = (reflected_argument(x), reflected_argument(shifted_x));
        let mut value = ScaledSum::new();
        let mut shifted = ScaledSum::new();
        let mut terms = 0;
        for k in 1..=degree {
            let settled = value.push(self.reflected_ratios[k] * w) <= tolerance;
            let shifted_settled = shifted.push(self.reflected_ratios[k] * shifted_w) <= tolerance;
            terms = k;
            if settled && shifted_settled {
                break;
            }
        }
        SeriesPair {
            value: value.scaled_by(1.0 + x, degree as f64),
            shifted: shifted.scaled_by(1.0 + shifted_x, degree as f64),
            terms,
        }
    }
}

fn is_reflected(x: f64) -> bool {
    x < 0.0 && x > -1.0
}

/// `-x / (1 + x)`, positive for `-1 < x < 0`.
fn reflected_argument(x: f64) -> f64 {
    -x / (1.0 + x)
}
