//! Sort-by-difference allocation (SBD).
//!
//! Each agent is scored `p - u` with `u ~ U[0, 1)` drawn in population order.
//! The `floor(target_share * n)` best-scored agents are allocated 1, the rest
//! 0. The sort is stable, so ties keep population order.

use rand::Rng;
use tracing::debug;

use super::{allocation_count, read_probabilities};
use crate::closure::ProbabilityClosure;
use crate::diagnostics::{AlgorithmKind, AlignmentReport};
use crate::error::Result;
use crate::population::{extract_at_least, Filter};
use crate::validation::validate_share;

#[derive(Debug, Clone, Copy, Default)]
pub struct SortByDifference;

impl SortByDifference {
    pub fn align<'a, T, I, C, R>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        target_share: f64,
        rng: &mut R,
    ) -> Result<AlignmentReport>
    where
        T: 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: ProbabilityClosure<T> + ?Sized,
        R: Rng,
    {
        let target_share = validate_share(target_share)?;
        let mut agents = extract_at_least(population, filter, 1)?;
        let probabilities = read_probabilities(&agents, closure)?;

        let scores: Vec<f64> = probabilities.iter().map(|p| p - rng.gen::<f64>()).collect();
        let mut ranking: Vec<usize> = (0..agents.len()).collect();
        ranking.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let n = agents.len();
        let allocated = allocation_count(target_share, n);
        debug!("SBD allocating {} of {} agents", allocated, n);

        for (rank, &index) in ranking.iter().enumerate() {
            let outcome = if rank < allocated { 1.0 } else { 0.0 };
            closure.align(&mut *agents[index], outcome);
        }

        let achieved = allocated as f64 / n as f64;
        Ok(AlignmentReport {
            algorithm: AlgorithmKind::SortByDifference,
            targets: vec![target_share],
            achieved: vec![achieved],
            error: (achieved - target_share).abs(),
            iterations: 1,
            converged: true,
        })
    }
}
