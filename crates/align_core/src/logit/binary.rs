//! Binary logit scaling.
//!
//! Two parallel buffers per call: `prob[i] = p_i * w_i` and its complement
//! `not_prob[i] = w_i - prob[i]`. The error of an iteration is the larger of
//! the change of their aggregates since the previous iteration and the
//! distance of the aggregate from the target, both relative to the total
//! weight. A population that stalls short of the target does not converge.

use tracing::{debug, trace};

use super::{alpha_factor, gamma_factor};
use crate::closure::{ProbabilityClosure, Weighted};
use crate::config::AlignmentConfig;
use crate::diagnostics::{settle, AlgorithmKind, AlignmentReport, FailurePolicy};
use crate::error::{ensure_finite, AlignError, Result};
use crate::population::{collect_weights, extract_at_least, Filter};
use crate::validation::{validate_share, ProbabilityValidator};

#[derive(Debug, Clone, Default)]
pub struct LogitScalingBinary {
    pub config: AlignmentConfig,
}

impl LogitScalingBinary {
    pub const FAILURE_POLICY: FailurePolicy = FailurePolicy::Warn;

    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Align probabilities so their mean matches `target_share`.
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
        self.config.validate()?;
        let target_share = validate_share(target_share)?;
        let agents = extract_at_least(population, filter, 1)?;
        let weights = vec![1.0; agents.len()];
        self.run(agents, weights, closure, target_share)
    }

    /// Align probabilities so their weighted mean matches `target_share`.
    pub fn align_weighted<'a, T, I, C>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        target_share: f64,
    ) -> Result<AlignmentReport>
    where
        T: Weighted + 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: ProbabilityClosure<T> + ?Sized,
    {
        self.config.validate()?;
        let target_share = validate_share(target_share)?;
        let agents = extract_at_least(population, filter, 1)?;
        let weights = collect_weights(&agents)?;
        self.run(agents, weights, closure, target_share)
    }

    fn run<T, C>(
        &self,
        mut agents: Vec<&mut T>,
        weights: Vec<f64>,
        closure: &C,
        target_share: f64,
    ) -> Result<AlignmentReport>
    where
        C: ProbabilityClosure<T> + ?Sized,
    {
        let validator = ProbabilityValidator::new();
        let mut prob = Vec::with_capacity(agents.len());
        for (index, agent) in agents.iter().enumerate() {
            let p = validator.validate_probability(index, closure.probability(agent))?;
            prob.push(p * weights[index]);
        }
        // Probabilities of exactly 0 or 1 are fixed points of both transforms
        if prob.iter().zip(&weights).all(|(p, w)| *p == 0.0 || p == w) {
            return Err(AlignError::DegenerateInput);
        }
        let mut not_prob: Vec<f64> = weights.iter().zip(&prob).map(|(w, p)| w - p).collect();

        let total_weight: f64 = weights.iter().sum();
        let target = target_share * total_weight;
        let not_target = total_weight - target;
        debug!(
            "Logit scaling {} agents (total weight {:.3}) to share {:.4}",
            agents.len(),
            total_weight,
            target_share
        );

        let mut previous = (prob.iter().sum::<f64>(), not_prob.iter().sum::<f64>());
        let mut error = f64::INFINITY;
        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.config.max_iterations {
            iterations += 1;

            // Gamma transform
            let gamma = gamma_factor(target, previous.0)?;
            let not_gamma = gamma_factor(not_target, previous.1)?;
            prob.iter_mut().for_each(|p| *p *= gamma);
            not_prob.iter_mut().for_each(|p| *p *= not_gamma);

            // Alpha transform
            for ((p, q), w) in prob.iter_mut().zip(not_prob.iter_mut()).zip(&weights) {
                let alpha = alpha_factor(*w, *p + *q)?;
                *p *= alpha;
                *q *= alpha;
            }

            let current = (prob.iter().sum::<f64>(), not_prob.iter().sum::<f64>());
            let change = 0.5 * ((current.0 - previous.0).abs() + (current.1 - previous.1).abs());
            let gap = (current.0 - target).abs();
            error = ensure_finite(change.max(gap) / total_weight, "convergence metric")?;
            trace!("iteration {}: gamma={:.6} error={:.3e}", iterations, gamma, error);
            previous = current;

            if error < self.config.precision {
                converged = true;
                break;
            }
        }

        for ((agent, p), w) in agents.iter_mut().zip(&prob).zip(&weights) {
            closure.align(agent, p / w);
        }

        let report = AlignmentReport {
            algorithm: AlgorithmKind::LogitScalingBinary,
            targets: vec![target_share],
            achieved: vec![previous.0 / total_weight],
            error,
            iterations,
            converged,
        };
        debug!("{}", report.summary());
        settle(report, Self::FAILURE_POLICY, self.config.warnings_enabled, self.config.precision)
    }
}


#[cfg(all(test, feature = "proptest"))]
mod proptests {
    use super::*;
    use crate::logit::testing::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: aligned probabilities stay in [0, 1] and match the target mean
        #[test]
        fn prop_binary_hits_target(
            probabilities in prop::collection::vec(0.02f64..0.98, 2..40),
            share in 0.05f64..0.95
        ) {
            let n = probabilities.len() as f64;
            let mut population = graduates(&probabilities);
            let config = AlignmentConfig::new(2000, 1e-10).with_warnings(false);
            let scaling = LogitScalingBinary::new(config);
            let report = scaling.align(&mut population, None, &Graduation, share).unwrap();

            prop_assert!(report.converged);
            prop_assert!(population.iter().all(|s| (0.0..=1.0).contains(&s.p_graduate)));
            let mean = population.iter().map(|s| s.p_graduate).sum::<f64>() / n;
            prop_assert!((mean - share).abs() < 1e-5, "mean {} vs {}", mean, share);
        }
    }
}
