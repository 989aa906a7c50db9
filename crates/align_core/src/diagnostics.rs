//! Alignment diagnostics and the shared non-convergence policy.
//!
//! Every entry point returns an [`AlignmentReport`] on success, including when
//! the attempt or iteration budget ran out. Whether running out is an error is
//! decided per algorithm by its [`FailurePolicy`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AlignError, Result};

/// Algorithm that produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlgorithmKind {
    Resampling,
    ResamplingWeighted,
    MultiplicativeScaling,
    SortByDifference,
    Sidewalk,
    LogitScalingBinary,
    LogitScaling,
    LogitScalingStrict,
}

impl AlgorithmKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resampling => "resampling",
            Self::ResamplingWeighted => "resampling-weighted",
            Self::MultiplicativeScaling => "multiplicative-scaling",
            Self::SortByDifference => "sbd",
            Self::Sidewalk => "sidewalk",
            Self::LogitScalingBinary => "logit-scaling-binary",
            Self::LogitScaling => "logit-scaling",
            Self::LogitScalingStrict => "logit-scaling-strict",
        }
    }
}

/// What happens when the budget runs out before the target is met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Return the best-effort result, logging a warning if enabled
    Warn,
    /// Fail the call with [`AlignError::NotConverged`]
    Fail,
}

/// Result of one alignment call.
///
/// `targets` and `achieved` hold one entry per aligned margin: a single count
/// for the resampling algorithms, a single share for binary scaling, one share
/// per choice for K-choice scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentReport {
    pub algorithm: AlgorithmKind,
    pub targets: Vec<f64>,
    pub achieved: Vec<f64>,
    /// Final error magnitude (|delta| for resampling, convergence metric for scaling)
    pub error: f64,
    /// Iterations for scaling, resampling attempts for outcome alignment
    pub iterations: usize,
    pub converged: bool,
}

impl AlignmentReport {
    /// Signed difference between achieved and target for the first margin.
    pub fn delta(&self) -> f64 {
        match (self.achieved.first(), self.targets.first()) {
            (Some(a), Some(t)) => a - t,
            _ => 0.0,
        }
    }

    /// Largest per-margin deviation, as a percentage of the target.
    ///
    /// A zero target reports the absolute deviation times 100.
    pub fn percentage_error(&self) -> f64 {
        self.targets
            .iter()
            .zip(&self.achieved)
            .map(|(t, a)| {
                let diff = (a - t).abs();
                if *t > 0.0 {
                    100.0 * diff / t
                } else {
                    100.0 * diff
                }
            })
            .fold(0.0, f64::max)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} [{}]: error={:.3e} ({:.2}%) iterations={}",
            self.algorithm.as_str(),
            if self.converged { "CONVERGED" } else { "EXHAUSTED" },
            self.error,
            self.percentage_error(),
            self.iterations,
        )
    }
}

/// Resolve the end state of an iterative algorithm.
///
/// A converged report passes through. An exhausted one is returned with a
/// warning under [`FailurePolicy::Warn`] and turned into an error under
/// [`FailurePolicy::Fail`].
pub(crate) fn settle(
    report: AlignmentReport,
    policy: FailurePolicy,
    warnings_enabled: bool,
    precision: f64,
) -> Result<AlignmentReport> {
    if report.converged {
        return Ok(report);
    }
    match policy {
        FailurePolicy::Warn => {
            if warnings_enabled {
                warn!("Alignment did not reach its target: {}", report.summary());
            }
            Ok(report)
        }
        FailurePolicy::Fail => Err(AlignError::NotConverged {
            iterations: report.iterations,
            error: report.error,
            precision,
        }),
    }
}
