//! Validated Engset model parameters.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{EngsetError, Result};

pub(crate) const TRAFFIC_EXCEEDS_SOURCES_WARNING: &str =
    "total traffic exceeds the number of sources; the Engset formula is still well-defined \
     but each source is generally assumed to offer at most one Erlang";

/// Servers `m`, sources `N` and total offered traffic `E` of one Engset queue.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProblemParameters {
    servers: usize,
    sources: usize,
    traffic: f64,
}

/// How a parameter triple is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regime {
    /// `N <= m`: every request finds a free server, `P = 0`.
    NoBlocking,
    /// `m = 0`: every request is blocked, `P = 1`.
    FullBlocking,
    /// `N > m > 0`: the blocking probability solves the implicit Engset equation.
    Iterative,
}

impl ProblemParameters {
    /// Validates and stores a parameter triple.
    ///
    /// The counts are unsigned, so only the traffic can be rejected here.
    pub fn new(servers: usize, sources: usize, traffic: f64) -> Result<Self> {
        validate_traffic(traffic)?;
        if traffic > sources as f64 {
            warn!("{TRAFFIC_EXCEEDS_SOURCES_WARNING} (E = {traffic}, N = {sources})");
        }
        Ok(Self {
            servers,
            sources,
            traffic,
        })
    }

    /// Number of servers `m`.
    pub fn servers(&self) -> usize {
        self.servers
    }

    /// Number of sources `N`.
    pub fn sources(&self) -> usize {
        self.sources
    }

    /// Total offered traffic `E` in Erlangs.
    pub fn traffic(&self) -> f64 {
        self.traffic
    }

    /// Offset `N/E - 1` such that the series argument is `x = P + N/E - 1`.
    pub fn offset(&self) -> f64 {
        self.sources as f64 / self.traffic - 1.0
    }

    /// Classifies the triple. `N <= m` takes precedence over `m = 0`.
    pub fn regime(&self) -> Regime {
        if self.sources <= self.servers {
            Regime::NoBlocking
        } else if self.servers == 0 {
            Regime::FullBlocking
        } else {
            Regime::Iterative
        }
    }

    /// Closed-form blocking probability for the degenerate regimes.
    pub fn trivial_blocking(&self) -> Option<f64> {
        match self.regime() {
            Regime::NoBlocking => Some(0.0),
            Regime::FullBlocking => Some(1.0),
            Regime::Iterative => None,
        }
    }
}

pub(crate) fn validate_traffic(traffic: f64) -> Result<()> {
    if !traffic.is_finite() || traffic <= 0.0 {
        return Err(EngsetError::InvalidTraffic { traffic });
    }
    Ok(())
}

pub(crate) fn validate_probability(probability: f64) -> Result<()> {
    if !(probability > 0.0 && probability < 1.0) {
        return Err(EngsetError::InvalidBlockingProbability { probability });
    }
    Ok(())
}

pub(crate) fn validate_servers(servers: usize) -> Result<()> {
    if servers == 0 {
        return Err(EngsetError::InvalidServers { servers });
    }
    Ok(())
}

pub(crate) fn validate_sources(sources: usize, servers: usize) -> Result<()> {
    if sources <= servers {
        return Err(EngsetError::InvalidSources { sources, servers });
    }
    Ok(())
}
