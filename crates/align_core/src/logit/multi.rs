//! K-choice logit scaling.
//!
//! [`LogitScaling`] is the generalized variant: targets may sum to less than
//! 1, convergence requires the per-choice margins to stop moving and to sit
//! on their targets, and running out of iterations only warns. [`LogitScalingStrict`] requires a
//! complete target distribution and complete probability rows, measures the
//! KL divergence between target and realized distribution, and fails when it
//! does not converge.

use tracing::{debug, trace};

use super::{alpha_factor, gamma_factor};
use crate::closure::{MultiProbabilityClosure, Weighted};
use crate::config::AlignmentConfig;
use crate::diagnostics::{settle, AlgorithmKind, AlignmentReport, FailurePolicy};
use crate::error::{ensure_finite, AlignError, Result};
use crate::population::{collect_weights, extract_at_least, Filter};
use crate::validation::{is_one_hot, ProbabilityValidator};

/// Fewest agents a K-choice alignment accepts.
const MIN_AGENTS: usize = 2;

/// How the distance to convergence is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    /// Mean absolute change of the column masses or the largest distance of
    /// a column mass from its target, whichever is larger, relative to total
    /// weight
    MarginDistance,
    /// KL divergence of the target from the realized distribution
    KullbackLeibler,
}

/// Weighted probability matrix for one call.
struct ChoiceMatrix {
    rows: Vec<Vec<f64>>,
    weights: Vec<f64>,
    total_weight: f64,
}

struct Fit {
    iterations: usize,
    error: f64,
    converged: bool,
    column_mass: Vec<f64>,
}

impl ChoiceMatrix {
    /// Scale probability rows by agent weight.
    fn new(rows: Vec<Vec<f64>>, weights: Vec<f64>) -> Self {
        let rows = rows
            .into_iter()
            .zip(&weights)
            .map(|(row, w)| row.into_iter().map(|p| p * w).collect::<Vec<f64>>())
            .collect();
        let total_weight = weights.iter().sum();
        Self { rows, weights, total_weight }
    }

    fn column_mass(&self, choices: usize) -> Vec<f64> {
        let mut mass = vec![0.0; choices];
        for row in &self.rows {
            for (m, p) in mass.iter_mut().zip(row) {
                *m += p;
            }
        }
        mass
    }

    /// Alternate gamma and alpha transforms until `metric` drops below `precision`.
    fn fit(
        &mut self,
        target_mass: &[f64],
        metric: Metric,
        config: &AlignmentConfig,
    ) -> Result<Fit> {
        let choices = target_mass.len();
        let mut previous = self.column_mass(choices);
        let mut error = f64::INFINITY;

        for iteration in 1..=config.max_iterations {
            // Gamma transform
            let gammas = target_mass
                .iter()
                .zip(&previous)
                .map(|(&target, &current)| gamma_factor(target, current))
                .collect::<Result<Vec<f64>>>()?;
            for row in self.rows.iter_mut() {
                for (p, gamma) in row.iter_mut().zip(&gammas) {
                    *p *= gamma;
                }
            }

            // Alpha transform
            for (row, &w) in self.rows.iter_mut().zip(&self.weights) {
                let alpha = alpha_factor(w, row.iter().sum())?;
                row.iter_mut().for_each(|p| *p *= alpha);
            }

            let current = self.column_mass(choices);
            let distance = match metric {
                Metric::MarginDistance => {
                    let change: f64 =
                        current.iter().zip(&previous).map(|(c, p)| (c - p).abs()).sum();
                    let gap = current
                        .iter()
                        .zip(target_mass)
                        .map(|(c, t)| (c - t).abs())
                        .fold(0.0, f64::max);
                    (change / choices as f64).max(gap) / self.total_weight
                }
                Metric::KullbackLeibler => kl_divergence(target_mass, &current, self.total_weight),
            };
            error = ensure_finite(distance, "convergence metric")?;
            trace!("iteration {}: error={:.3e}", iteration, error);
            previous = current;

            if error < config.precision {
                return Ok(Fit {
                    iterations: iteration,
                    error,
                    converged: true,
                    column_mass: previous,
                });
            }
        }

        Ok(Fit {
            iterations: config.max_iterations,
            error,
            converged: false,
            column_mass: previous,
        })
    }

    /// Hand each agent its first `choices` entries as probabilities.
    fn write_back<T, C>(&self, agents: &mut [&mut T], closure: &C, choices: usize)
    where
        C: MultiProbabilityClosure<T> + ?Sized,
    {
        for ((agent, row), w) in agents.iter_mut().zip(&self.rows).zip(&self.weights) {
            closure.align(agent, row[..choices].iter().map(|p| p / w).collect());
        }
    }
}

/// `sum_k t_k ln(t_k / r_k)` over the normalized target and realized masses.
fn kl_divergence(target_mass: &[f64], realized_mass: &[f64], total_weight: f64) -> f64 {
    target_mass
        .iter()
        .zip(realized_mass)
        .filter(|(t, _)| **t > 0.0)
        .map(|(t, r)| {
            let t = t / total_weight;
            let r = r / total_weight;
            t * (t / r).ln()
        })
        .sum()
}

/// Read, validate and collect probability rows. Rejects all-one-hot input.
fn read_rows<T, C>(
    agents: &[&mut T],
    closure: &C,
    choices: usize,
    exact: bool,
) -> Result<(Vec<Vec<f64>>, Vec<f64>)>
where
    C: MultiProbabilityClosure<T> + ?Sized,
{
    let validator = ProbabilityValidator::new();
    let mut rows = Vec::with_capacity(agents.len());
    let mut sums = Vec::with_capacity(agents.len());
    for (index, agent) in agents.iter().enumerate() {
        let row = closure.probabilities(agent);
        sums.push(validator.validate_row(index, &row, choices, exact)?);
        rows.push(row);
    }
    if rows.iter().all(|row| is_one_hot(row)) {
        return Err(AlignError::DegenerateInput);
    }
    Ok((rows, sums))
}

// ============================================================================
// Generalized variant
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LogitScaling {
    pub config: AlignmentConfig,
}

impl LogitScaling {
    pub const FAILURE_POLICY: FailurePolicy = FailurePolicy::Warn;

    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Align each agent's choice probabilities to the `targets` distribution.
    pub fn align<'a, T, I, C>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        targets: &[f64],
    ) -> Result<AlignmentReport>
    where
        T: 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: MultiProbabilityClosure<T> + ?Sized,
    {
        self.config.validate()?;
        let agents = extract_at_least(population, filter, MIN_AGENTS)?;
        let weights = vec![1.0; agents.len()];
        self.run(agents, weights, closure, targets)
    }

    /// Weighted version of [`align`](Self::align).
    pub fn align_weighted<'a, T, I, C>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        targets: &[f64],
    ) -> Result<AlignmentReport>
    where
        T: Weighted + 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: MultiProbabilityClosure<T> + ?Sized,
    {
        self.config.validate()?;
        let agents = extract_at_least(population, filter, MIN_AGENTS)?;
        let weights = collect_weights(&agents)?;
        self.run(agents, weights, closure, targets)
    }

    fn run<T, C>(
        &self,
        mut agents: Vec<&mut T>,
        weights: Vec<f64>,
        closure: &C,
        targets: &[f64],
    ) -> Result<AlignmentReport>
    where
        C: MultiProbabilityClosure<T> + ?Sized,
    {
        let validator = ProbabilityValidator::new();
        let target_sum = validator.validate_distribution(targets, false)?;
        let choices = targets.len();
        let (mut rows, sums) = read_rows(&agents, closure, choices, false)?;

        // Unassigned target mass becomes an implicit residual choice
        let mut shares = targets.to_vec();
        if target_sum < 1.0 - validator.tolerance() {
            shares.push(1.0 - target_sum);
            for (row, sum) in rows.iter_mut().zip(&sums) {
                let residual = 1.0 - sum;
                row.push(if residual > validator.tolerance() { residual } else { 0.0 });
            }
        }

        let mut matrix = ChoiceMatrix::new(rows, weights);
        let target_mass: Vec<f64> = shares.iter().map(|s| s * matrix.total_weight).collect();
        let initial_mass = matrix.column_mass(shares.len());
        for (choice, (&target, &mass)) in target_mass.iter().zip(&initial_mass).enumerate() {
            if target > 0.0 && mass == 0.0 {
                if choice == choices {
                    return Err(AlignError::InvalidTarget(format!(
                        "targets leave {:.6} unassigned but no agent has residual mass",
                        1.0 - target_sum
                    )));
                }
                return Err(AlignError::ImpossibleEvent { choice });
            }
        }
        debug!(
            "Logit scaling {} agents over {} choices (total weight {:.3})",
            agents.len(),
            choices,
            matrix.total_weight
        );

        let fit = matrix.fit(&target_mass, Metric::MarginDistance, &self.config)?;
        matrix.write_back(&mut agents, closure, choices);

        let report = AlignmentReport {
            algorithm: AlgorithmKind::LogitScaling,
            targets: targets.to_vec(),
            achieved: fit.column_mass[..choices].iter().map(|m| m / matrix.total_weight).collect(),
            error: fit.error,
            iterations: fit.iterations,
            converged: fit.converged,
        };
        debug!("{}", report.summary());
        settle(report, Self::FAILURE_POLICY, self.config.warnings_enabled, self.config.precision)
    }
}

// ============================================================================
// Strict variant
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LogitScalingStrict {
    pub config: AlignmentConfig,
}

impl LogitScalingStrict {
    pub const FAILURE_POLICY: FailurePolicy = FailurePolicy::Fail;

    pub fn new(config: AlignmentConfig) -> Self {
        Self { config }
    }

    /// Align each agent's choice probabilities to the `targets` distribution,
    /// failing unless the KL divergence drops below the precision.
    pub fn align<'a, T, I, C>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        targets: &[f64],
    ) -> Result<AlignmentReport>
    where
        T: 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: MultiProbabilityClosure<T> + ?Sized,
    {
        self.config.validate()?;
        let agents = extract_at_least(population, filter, MIN_AGENTS)?;
        let weights = vec![1.0; agents.len()];
        self.run(agents, weights, closure, targets)
    }

    /// Weighted version of [`align`](Self::align).
    pub fn align_weighted<'a, T, I, C>(
        &self,
        population: I,
        filter: Filter<'_, T>,
        closure: &C,
        targets: &[f64],
    ) -> Result<AlignmentReport>
    where
        T: Weighted + 'a,
        I: IntoIterator<Item = &'a mut T>,
        C: MultiProbabilityClosure<T> + ?Sized,
    {
        self.config.validate()?;
        let agents = extract_at_least(population, filter, MIN_AGENTS)?;
        let weights = collect_weights(&agents)?;
        self.run(agents, weights, closure, targets)
    }

    fn run<T, C>(
        &self,
        mut agents: Vec<&mut T>,
        weights: Vec<f64>,
        closure: &C,
        targets: &[f64],
    ) -> Result<AlignmentReport>
    where
        C: MultiProbabilityClosure<T> + ?Sized,
    {
        let validator = ProbabilityValidator::new();
        validator.validate_distribution(targets, true)?;
        let choices = targets.len();
        let (rows, _) = read_rows(&agents, closure, choices, true)?;

        let mut matrix = ChoiceMatrix::new(rows, weights);
        if let Some(choice) = matrix.column_mass(choices).iter().position(|&m| m == 0.0) {
            return Err(AlignError::ImpossibleEvent { choice });
        }
        let target_mass: Vec<f64> = targets.iter().map(|t| t * matrix.total_weight).collect();
        debug!(
            "Strict logit scaling {} agents over {} choices (total weight {:.3})",
            agents.len(),
            choices,
            matrix.total_weight
        );

        let fit = matrix.fit(&target_mass, Metric::KullbackLeibler, &self.config)?;
        let report = AlignmentReport {
            algorithm: AlgorithmKind::LogitScalingStrict,
            targets: targets.to_vec(),
            achieved: fit.column_mass.iter().map(|m| m / matrix.total_weight).collect(),
            error: fit.error,
            iterations: fit.iterations,
            converged: fit.converged,
        };
        debug!("{}", report.summary());

        // Agents keep their original probabilities when the fit fails
        let precision = self.config.precision;
        let report =
            settle(report, Self::FAILURE_POLICY, self.config.warnings_enabled, precision)?;
        matrix.write_back(&mut agents, closure, choices);
        Ok(report)
    }
}
