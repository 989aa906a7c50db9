//! Probability Scaling Alignment
//!
//! Closed-form, single-pass alignment of per-agent probabilities:
//! - [`MultiplicativeScaling`]: rescale every probability by one factor
//! - [`SortByDifference`]: allocate 1 to the agents with the highest `p - u`
//! - [`Sidewalk`]: allocate 1 wherever the running probability mass crosses an integer

pub mod multiplicative;
pub mod sbd;
pub mod sidewalk;

pub use multiplicative::MultiplicativeScaling;
pub use sbd::SortByDifference;
pub use sidewalk::Sidewalk;

use crate::closure::ProbabilityClosure;
use crate::error::{ensure_finite, AlignError, Result};
use crate::validation::ProbabilityValidator;

/// Slack for float sums that should land on an integer.
const ALLOCATION_EPSILON: f64 = 1e-9;

/// Read and validate every selected agent's probability.
fn read_probabilities<T, C>(agents: &[&mut T], closure: &C) -> Result<Vec<f64>>
where
    C: ProbabilityClosure<T> + ?Sized,
{
    let validator = ProbabilityValidator::new();
    agents
        .iter()
        .enumerate()
        .map(|(index, agent)| validator.validate_probability(index, closure.probability(agent)))
        .collect()
}

/// Factor that brings the mean of `probabilities` to `target_share`.
///
/// Zero mass can only be scaled to a zero target.
pub fn multiplicative_factor(probabilities: &[f64], target_share: f64) -> Result<f64> {
    let total: f64 = probabilities.iter().sum();
    let target = target_share * probabilities.len() as f64;
    if total > 0.0 {
        ensure_finite(target / total, "scaling factor")
    } else if target == 0.0 {
        Ok(1.0)
    } else {
        Err(AlignError::Numeric(format!(
            "cannot scale zero probability mass to target {}",
            target
        )))
    }
}

/// Number of positive outcomes for `share` of `n` agents, rounded down.
pub fn allocation_count(share: f64, n: usize) -> usize {
    (((share * n as f64) + ALLOCATION_EPSILON).floor() as usize).min(n)
}
