//! Multiplicative scaling.
//!
//! `factor = target_share * n / sum(p)`, applied to every probability. The
//! result is not clamped: a factor above 1 can push probabilities past 1.0.
//! Callers that need valid probabilities should use logit scaling instead.

use tracing::debug;

use super::{multiplicative_factor, read_probabilities};
use crate::closure::ProbabilityClosure;
use crate::diagnostics::{AlgorithmKind, AlignmentReport};
use crate::error::Result;
use crate::population::{extract_at_least, Filter};
use crate::validation::validate_share;

#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplicativeScaling;

impl MultiplicativeScaling {
    pub fn align<'a, T, I, C>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        target_share: f64,
    ) -> Result<AlignmentReport>
    where
        T: 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: ProbabilityClosure<T> + ?Sized,
    {
        let target_share = validate_share(target_share)?;
        let mut agents = extract_at_least(population, filter, 1)?;
        let probabilities = read_probabilities(&agents, closure)?;
        let factor = multiplicative_factor(&probabilities, target_share)?;
        debug!("Multiplicative scaling {} agents by {:.6}", agents.len(), factor);

        let mut mass = 0.0;
        for (agent, p) in agents.iter_mut().zip(&probabilities) {
            let scaled = p * factor;
            mass += scaled;
            closure.align(agent, scaled);
        }

        let achieved = mass / agents.len() as f64;
        Ok(AlignmentReport {
            algorithm: AlgorithmKind::MultiplicativeScaling,
            targets: vec![target_share],
            achieved: vec![achieved],
            error: (achieved - target_share).abs(),
            iterations: 1,
            converged: true,
        })
    }
}
