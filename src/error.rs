//! Error taxonomy for a single scenario run.
//!
//! Every variant aborts the scenario it occurs in. The harness decides whether
//! the remaining scenarios keep running.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Dispatch errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Series '{series}' does not cover the horizon: {reason}")]
    MisalignedSeries { series: String, reason: String },

    #[error("Infeasible problem ({} snapshot(s) violate power balance in the closest relaxation)", violations.len())]
    InfeasibleProblem { violations: Vec<BalanceViolation> },

    #[error("Unbounded problem: {0}")]
    UnboundedProblem(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Solver timed out after {0}s")]
    Timeout(u64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid series: {0}")]
    Series(#[from] crate::timeseries::SeriesError),
}

impl DispatchError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn misaligned(series: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MisalignedSeries {
            series: series.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable tag, used in comparison reports
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Configuration(_) => "configuration",
            DispatchError::MisalignedSeries { .. } => "misaligned_series",
            DispatchError::InfeasibleProblem { .. } => "infeasible",
            DispatchError::UnboundedProblem(_) => "unbounded",
            DispatchError::Solver(_) => "solver",
            DispatchError::Timeout(_) => "timeout",
            DispatchError::Io(_) => "io",
            DispatchError::Csv(_) => "csv",
            DispatchError::Series(_) => "series",
        }
    }
}

/// Power balance violation at one snapshot of the relaxed problem.
///
/// `shortfall` is load that could not be served, `surplus` is forced
/// injection that could not be absorbed (e.g. a must-run floor).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceViolation {
    pub snapshot: usize,
    pub shortfall: f64,
    pub surplus: f64,
}

impl fmt::Display for BalanceViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot {}: shortfall {:.3}, surplus {:.3}",
            self.snapshot, self.shortfall, self.surplus
        )
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
