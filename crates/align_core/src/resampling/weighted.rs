//! Weight-proportional outcome resampling.
//!
//! The target is a weighted count. Agents are drawn with probability
//! proportional to their weight from the partition on the surplus side. An
//! agent heavier than the remaining `|delta|` would overshoot the target, so it
//! leaves the partition instead; the lightest of those is kept aside and gets
//! a few extra attempts once the main loop is done, if flipping it still
//! brings the weighted sum closer to the target.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::try_flip;
use crate::closure::{OutcomeClosure, Weighted};
use crate::config::ResamplingConfig;
use crate::diagnostics::{settle, AlgorithmKind, AlignmentReport, FailurePolicy};
use crate::error::{AlignError, Result};
use crate::population::{collect_weights, extract_at_least, Filter};
use crate::validation::validate_share;

/// Relative slack below which the weighted delta counts as closed.
const DELTA_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub struct ResamplingWeightedAlignment {
    pub config: ResamplingConfig,
}

impl ResamplingWeightedAlignment {
    pub const FAILURE_POLICY: FailurePolicy = FailurePolicy::Warn;

    pub fn new(config: ResamplingConfig) -> Self {
        Self { config }
    }

    /// Align the weighted share of `true` agents to `target_share`.
    pub fn align_share<'a, T, I, C, R>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        target_share: f64,
        rng: &mut R,
    ) -> Result<AlignmentReport>
    where
        T: Weighted + 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: OutcomeClosure<T> + ?Sized,
        R: Rng,
    {
        self.config.validate()?;
        let target_share = validate_share(target_share)?;
        let agents = extract_at_least(population, filter, 1)?;
        let weights = collect_weights(&agents)?;
        let total_weight: f64 = weights.iter().sum();
        self.run(agents, weights, target_share * total_weight, closure, rng)
    }

    /// Align the total weight of `true` agents to `target_weight`.
    pub fn align_weight<'a, T, I, C, R>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        target_weight: f64,
        rng: &mut R,
    ) -> Result<AlignmentReport>
    where
        T: Weighted + 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: OutcomeClosure<T> + ?Sized,
        R: Rng,
    {
        self.config.validate()?;
        let agents = extract_at_least(population, filter, 1)?;
        let weights = collect_weights(&agents)?;
        let total_weight: f64 = weights.iter().sum();
        if !target_weight.is_finite() || target_weight < 0.0 || target_weight > total_weight {
            return Err(AlignError::InvalidTarget(format!(
                "target weight {} outside [0, {}]",
                target_weight, total_weight
            )));
        }
        self.run(agents, weights, target_weight, closure, rng)
    }

    fn run<T, C, R>(
        &self,
        agents: Vec<&mut T>,
        weights: Vec<f64>,
        target: f64,
        closure: &C,
        rng: &mut R,
    ) -> Result<AlignmentReport>
    where
        C: OutcomeClosure<T> + ?Sized,
        R: Rng,
    {
        let mut pool: Vec<(&mut T, f64)> = agents.into_iter().zip(weights).collect();
        pool.shuffle(rng);

        let total_weight: f64 = pool.iter().map(|(_, w)| w).sum();
        let tolerance = DELTA_TOLERANCE * total_weight.max(1.0);
        let sum: f64 =
            pool.iter().filter(|(agent, _)| closure.outcome(agent)).map(|(_, w)| w).sum();
        let mut delta = sum - target;
        let surplus = delta > 0.0;

        let mut active: Vec<usize> =
            (0..pool.len()).filter(|&i| closure.outcome(&*pool[i].0) == surplus).collect();
        let mut active_weight: f64 = active.iter().map(|&i| pool[i].1).sum();
        let budget = self.config.attempt_budget(active.len());
        debug!(
            "Weighted resampling {} agents: true weight {:.3}, target {:.3}, budget {}",
            pool.len(),
            sum,
            target,
            budget
        );

        let mut oversized: Option<usize> = None;
        let mut attempts = 0;
        let mut unproductive = 0;
        while delta.abs() > tolerance && !active.is_empty() && unproductive < budget {
            let slot = pick_weighted(&active, &pool, active_weight, rng);
            let index = active[slot];
            let weight = pool[index].1;

            if weight > delta.abs() {
                active.swap_remove(slot);
                active_weight -= weight;
                if oversized.map_or(true, |best| weight < pool[best].1) {
                    oversized = Some(index);
                }
                continue;
            }

            attempts += 1;
            if try_flip(closure, &mut *pool[index].0, surplus, rng) {
                delta += if surplus { -weight } else { weight };
                active.swap_remove(slot);
                active_weight -= weight;
                unproductive = 0;
            } else {
                unproductive += 1;
            }
        }
        let exhausted = delta.abs() > tolerance && !active.is_empty();

        if delta.abs() > tolerance {
            if let Some(index) = oversized {
                let weight = pool[index].1;
                if weight < 2.0 * delta.abs() {
                    for _ in 0..self.config.final_attempts {
                        attempts += 1;
                        if try_flip(closure, &mut *pool[index].0, surplus, rng) {
                            delta += if surplus { -weight } else { weight };
                            break;
                        }
                    }
                }
            }
        }

        let report = AlignmentReport {
            algorithm: AlgorithmKind::ResamplingWeighted,
            targets: vec![target],
            achieved: vec![target + delta],
            error: delta.abs(),
            iterations: attempts,
            converged: !exhausted,
        };
        debug!("{}", report.summary());
        settle(report, Self::FAILURE_POLICY, self.config.warnings_enabled, tolerance)
    }
}

/// Position in `active` drawn with probability proportional to weight.
fn pick_weighted<T, R: Rng>(
    active: &[usize],
    pool: &[(&mut T, f64)],
    total: f64,
    rng: &mut R,
) -> usize {
    let mut remaining = rng.gen::<f64>() * total;
    for (slot, &index) in active.iter().enumerate() {
        remaining -= pool[index].1;
        if remaining < 0.0 {
            return slot;
        }
    }
    active.len() - 1
}
