//! Unweighted outcome resampling.
//!
//! Two entry points with different agent selection:
//! - [`ResamplingAlignment::align_share`] picks a uniformly random agent per attempt
//! - [`ResamplingAlignment::align_count`] scans the shuffled agents cyclically

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::try_flip;
use crate::closure::OutcomeClosure;
use crate::config::ResamplingConfig;
use crate::diagnostics::{settle, AlgorithmKind, AlignmentReport, FailurePolicy};
use crate::error::{AlignError, Result};
use crate::population::{extract_at_least, Filter};
use crate::validation::validate_share;

#[derive(Debug, Clone, Default)]
pub struct ResamplingAlignment {
    pub config: ResamplingConfig,
}

impl ResamplingAlignment {
    pub const FAILURE_POLICY: FailurePolicy = FailurePolicy::Warn;

    pub fn new(config: ResamplingConfig) -> Self {
        Self { config }
    }

    /// Resample outcomes until the number of `true` agents is within one of
    /// `target_share * n`.
    pub fn align_share<'a, T, I, C, R>(
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
        C: OutcomeClosure<T> + ?Sized,
        R: Rng,
    {
        self.config.validate()?;
        let target_share = validate_share(target_share)?;
        let mut agents = extract_at_least(population, filter, 1)?;
        agents.shuffle(rng);

        let n = agents.len();
        let target = target_share * n as f64;
        let positives = agents.iter().filter(|agent| closure.outcome(agent)).count();
        let mut delta = positives as f64 - target;

        let surplus = delta > 0.0;
        let opposing = if surplus { positives } else { n - positives };
        let budget = self.config.attempt_budget(opposing);
        debug!(
            "Resampling {} agents: {} true, target {:.2}, budget {}",
            n, positives, target, budget
        );

        let mut attempts = 0;
        let mut unproductive = 0;
        while delta.abs() > 1.0 && unproductive < budget {
            let agent = &mut *agents[rng.gen_range(0..n)];
            attempts += 1;
            if try_flip(closure, agent, surplus, rng) {
                delta += if surplus { -1.0 } else { 1.0 };
                unproductive = 0;
            } else {
                unproductive += 1;
            }
        }

        let report = AlignmentReport {
            algorithm: AlgorithmKind::Resampling,
            targets: vec![target],
            achieved: vec![target + delta],
            error: delta.abs(),
            iterations: attempts,
            converged: delta.abs() <= 1.0,
        };
        debug!("{}", report.summary());
        settle(report, Self::FAILURE_POLICY, self.config.warnings_enabled, 1.0)
    }

    /// Resample outcomes until exactly `target_count` agents are `true`.
    pub fn align_count<'a, T, I, C, R>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        target_count: usize,
        rng: &mut R,
    ) -> Result<AlignmentReport>
    where
        T: 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: OutcomeClosure<T> + ?Sized,
        R: Rng,
    {
        self.config.validate()?;
        let mut agents = extract_at_least(population, filter, 1)?;
        let n = agents.len();
        if target_count > n {
            return Err(AlignError::InvalidTarget(format!(
                "target count {} exceeds the {} selected agents",
                target_count, n
            )));
        }
        agents.shuffle(rng);

        let positives = agents.iter().filter(|agent| closure.outcome(agent)).count();
        let mut delta = positives as i64 - target_count as i64;

        let surplus = delta > 0;
        let opposing = if surplus { positives } else { n - positives };
        let budget = self.config.attempt_budget(opposing);
        debug!(
            "Resampling {} agents: {} true, target count {}, budget {}",
            n, positives, target_count, budget
        );

        let mut cursor = 0;
        let mut attempts = 0;
        let mut unproductive = 0;
        while delta != 0 && unproductive < budget {
            let agent = &mut *agents[cursor];
            cursor = (cursor + 1) % n;
            attempts += 1;
            if try_flip(closure, agent, surplus, rng) {
                delta += if surplus { -1 } else { 1 };
                unproductive = 0;
            } else {
                unproductive += 1;
            }
        }

        let report = AlignmentReport {
            algorithm: AlgorithmKind::Resampling,
            targets: vec![target_count as f64],
            achieved: vec![(target_count as i64 + delta) as f64],
            error: delta.unsigned_abs() as f64,
            iterations: attempts,
            converged: delta == 0,
        };
        debug!("{}", report.summary());
        settle(report, Self::FAILURE_POLICY, self.config.warnings_enabled, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resampling::testing::*;
    use crate::rng::seeded_rng;

    fn quiet() -> ResamplingAlignment {
        ResamplingAlignment::new(ResamplingConfig::default().with_warnings(false))
    }

    #[test]
    fn test_share_converges_when_flips_always_succeed() {
        let mut population = people(100, false, 1.0);
        let report = quiet()
            .align_share(&mut population, None, &Employment, 0.3, &mut seeded_rng(42))
            .unwrap();

        let count = employed_count(&population);
        assert!(report.converged, "{}", report.summary());
        assert!((28..=32).contains(&count), "count = {}", count);
        assert_eq!(report.achieved[0], count as f64);
    }

    #[test]
    fn test_share_reports_exhaustion_when_no_flip_possible() {
        let mut population = people(100, false, 0.0);
        let report = quiet()
            .align_share(&mut population, None, &Employment, 0.3, &mut seeded_rng(42))
            .unwrap();

        assert!(!report.converged);
        assert_eq!(employed_count(&population), 0);
        // Default budget: 20 x 100 opposing agents
        assert_eq!(report.iterations, 2000);
        assert!((report.error - 30.0).abs() < 1e-9);
        assert!((report.percentage_error() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_share_reduces_surplus() {
        let mut population = people(50, true, 1.0);
        let report = quiet()
            .align_share(&mut population, None, &Employment, 0.2, &mut seeded_rng(5))
            .unwrap();
        let count = employed_count(&population);
        assert!(report.converged);
        assert!((9..=11).contains(&count), "count = {}", count);
    }

    #[test]
    fn test_share_respects_filter() {
        let mut population = people(40, false, 1.0);
        let even: &dyn Fn(&Person) -> bool = &|p| p.id % 2 == 0;
        let report = quiet()
            .align_share(&mut population, Some(even), &Employment, 0.5, &mut seeded_rng(9))
            .unwrap();

        assert!(report.converged);
        assert!(population.iter().filter(|p| p.id % 2 == 1).all(|p| !p.employed));
        let count = employed_count(&population);
        assert!((9..=11).contains(&count), "count = {}", count);
    }

    #[test]
    fn test_share_already_aligned_is_untouched() {
        let mut population = people(10, false, 1.0);
        for p in population.iter_mut().take(5) {
            p.employed = true;
        }
        let report = quiet()
            .align_share(&mut population, None, &Employment, 0.5, &mut seeded_rng(1))
            .unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 0);
        assert_eq!(employed_count(&population), 5);
    }

    #[test]
    fn test_share_explicit_budget() {
        let mut population = people(100, false, 0.0);
        let alignment =
            ResamplingAlignment::new(ResamplingConfig::with_max_attempts(25).with_warnings(false));
        let report = alignment
            .align_share(&mut population, None, &Employment, 0.3, &mut seeded_rng(2))
            .unwrap();
        assert!(!report.converged);
        assert_eq!(report.iterations, 25);
    }

    #[test]
    fn test_zero_attempt_budget_is_rejected() {
        let mut population = people(10, false, 1.0);
        let alignment = ResamplingAlignment::new(ResamplingConfig::with_max_attempts(0));
        let err = alignment
            .align_count(&mut population, None, &Employment, 4, &mut seeded_rng(1))
            .unwrap_err();
        assert!(matches!(err, AlignError::InvalidParameter(_)));
        assert_eq!(employed_count(&population), 0);
    }

    #[test]
    fn test_share_rejects_invalid_input() {
        let mut population = people(10, false, 1.0);
        let err = quiet()
            .align_share(&mut population, None, &Employment, 1.5, &mut seeded_rng(1))
            .unwrap_err();
        assert!(matches!(err, AlignError::InvalidTarget(_)));

        let nobody: &dyn Fn(&Person) -> bool = &|_| false;
        let err = quiet()
            .align_share(&mut population, Some(nobody), &Employment, 0.5, &mut seeded_rng(1))
            .unwrap_err();
        assert!(matches!(err, AlignError::EmptyPopulation { .. }));
    }

    #[test]
    fn test_count_hits_exact_target() {
        let mut population = people(60, false, 0.5);
        let report = quiet()
            .align_count(&mut population, None, &Employment, 17, &mut seeded_rng(11))
            .unwrap();
        assert!(report.converged, "{}", report.summary());
        assert_eq!(employed_count(&population), 17);
        assert_eq!(report.error, 0.0);
    }

    #[test]
    fn test_count_scan_is_cyclic() {
        // One sweep over every agent, flipping each, reaches a full target
        let mut population = people(8, false, 1.0);
        let report = quiet()
            .align_count(&mut population, None, &Employment, 8, &mut seeded_rng(4))
            .unwrap();
        assert!(report.converged);
        assert_eq!(report.iterations, 8);
        assert_eq!(employed_count(&population), 8);
    }

    #[test]
    fn test_count_rejects_target_above_population() {
        let mut population = people(5, false, 1.0);
        let err = quiet()
            .align_count(&mut population, None, &Employment, 6, &mut seeded_rng(1))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_count_exhaustion() {
        let mut population = people(20, true, 0.0);
        let report = quiet()
            .align_count(&mut population, None, &Employment, 5, &mut seeded_rng(1))
            .unwrap();
        assert!(!report.converged);
        assert_eq!(report.error, 15.0);
        assert_eq!(report.iterations, 400);
    }

    #[test]
    fn test_same_seed_same_result() {
        let run = |seed| {
            let mut population = people(200, false, 0.35);
            quiet()
                .align_share(&mut population, None, &Employment, 0.4, &mut seeded_rng(seed))
                .unwrap();
            population.iter().map(|p| p.employed).collect::<Vec<_>>()
        };
        assert_eq!(run(77), run(77));
    }
}
