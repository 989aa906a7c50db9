//! Sidewalk allocation.
//!
//! Agents are shuffled, then walked while accumulating their probabilities.
//! An agent is allocated 1 when the integer part of the running sum goes up
//! at that agent, else 0, so the number of ones equals the integer part of the
//! total mass. With a target share the probabilities are first rescaled
//! multiplicatively so the total mass is `target_share * n`. Rescaled
//! probabilities must stay at or below 1.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::{multiplicative_factor, read_probabilities, ALLOCATION_EPSILON};
use crate::closure::ProbabilityClosure;
use crate::diagnostics::{AlgorithmKind, AlignmentReport};
use crate::error::{AlignError, Result};
use crate::population::{extract_at_least, Filter};
use crate::validation::validate_share;

#[derive(Debug, Clone, Copy, Default)]
pub struct Sidewalk;

impl Sidewalk {
    /// Allocate outcomes by walking the shuffled agents.
    ///
    /// `target_share = None` walks the raw probabilities.
    pub fn align<'a, T, I, C, R>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        target_share: Option<f64>,
        rng: &mut R,
    ) -> Result<AlignmentReport>
    where
        T: 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: ProbabilityClosure<T> + ?Sized,
        R: Rng,
    {
        let target_share = target_share.map(validate_share).transpose()?;
        let mut agents = extract_at_least(population, filter, 1)?;
        agents.shuffle(rng);

        let n = agents.len();
        let mut probabilities = read_probabilities(&agents, closure)?;
        if let Some(share) = target_share {
            let factor = multiplicative_factor(&probabilities, share)?;
            probabilities.iter_mut().for_each(|p| *p *= factor);
            if let Some(p) = probabilities.iter().find(|p| **p > 1.0 + ALLOCATION_EPSILON) {
                return Err(AlignError::InvalidTarget(format!(
                    "target share {} rescales a probability to {:.6}, above 1",
                    share, p
                )));
            }
        }
        let mass: f64 = probabilities.iter().sum();
        debug!("Sidewalk over {} agents with mass {:.4}", n, mass);

        let mut running = 0.0;
        let mut units = 0usize;
        let mut allocated = 0usize;
        for (agent, p) in agents.iter_mut().zip(&probabilities) {
            running += p;
            let reached = (running + ALLOCATION_EPSILON).floor() as usize;
            if reached > units {
                units = reached;
                allocated += 1;
                closure.align(agent, 1.0);
            } else {
                closure.align(agent, 0.0);
            }
        }

        let expected = (mass + ALLOCATION_EPSILON).floor() as usize;
        let target = target_share.unwrap_or(mass / n as f64);
        let achieved = allocated as f64 / n as f64;
        Ok(AlignmentReport {
            algorithm: AlgorithmKind::Sidewalk,
            targets: vec![target],
            achieved: vec![achieved],
            error: (achieved - target).abs(),
            iterations: 1,
            converged: allocated == expected,
        })
    }
}
