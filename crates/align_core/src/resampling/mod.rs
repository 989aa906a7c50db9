//! Outcome Resampling Alignment
//!
//! Aligns realized boolean outcomes. Agents on the side with too many members
//! are re-drawn through [`OutcomeClosure::resample`] until the aggregate
//! matches the target or the attempt budget runs out.
//!
//! This module provides:
//! - [`ResamplingAlignment`] (unweighted, share or absolute-count target)
//! - [`ResamplingWeightedAlignment`] (weight-proportional selection, weighted target)
//!
//! Running out of attempts is not an error here: the partially aligned
//! population is kept and the report says `converged == false`.

pub mod unweighted;
pub mod weighted;

pub use unweighted::ResamplingAlignment;
pub use weighted::ResamplingWeightedAlignment;

use rand::Rng;

use crate::closure::OutcomeClosure;

/// Re-draw `agent` if it sits on the `surplus` side. Returns true when the
/// re-draw moved it to the other side.
fn try_flip<T, C, R>(closure: &C, agent: &mut T, surplus: bool, rng: &mut R) -> bool
where
    C: OutcomeClosure<T> + ?Sized,
    R: Rng,
{
    if closure.outcome(agent) != surplus {
        return false;
    }
    closure.resample(agent, rng);
    closure.outcome(agent) != surplus
}
