// ============================================================================
// Input Validation
// ============================================================================
//
// Contract: every check here runs before an algorithm iterates. A failure is
// always fatal to the call and never clamped or repaired.
//
// - Shares and probabilities lie in [0, 1] and are finite
// - Weights are positive and finite
// - Probability rows have the declared length and do not exceed 1
// - Target distributions do not exceed 1 (exactly 1 where required)

use crate::error::{AlignError, Result};

/// Validator for probability rows and target distributions.
///
/// `tolerance` is the allowed deviation of a sum from 1.0.
#[derive(Debug, Clone)]
pub struct ProbabilityValidator {
    tolerance: f64,
}

impl ProbabilityValidator {
    /// Default tolerance (1e-6)
    pub const DEFAULT_TOLERANCE: f64 = 1e-6;

    pub fn new() -> Self {
        Self { tolerance: Self::DEFAULT_TOLERANCE }
    }

    /// # Examples
    /// ```
    /// use align_core::validation::ProbabilityValidator;
    ///
    /// let strict = ProbabilityValidator::with_tolerance(1e-9);
    /// assert!(strict.validate_row(0, &[0.25, 0.75], 2, true).is_ok());
    /// assert!(strict.validate_row(0, &[0.25, 0.70], 2, true).is_err());
    /// ```
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// A single probability must be finite and inside [0, 1].
    pub fn validate_probability(&self, index: usize, value: f64) -> Result<f64> {
        if !value.is_finite() {
            return Err(AlignError::InvalidProbability {
                index,
                value,
                reason: "not a finite number".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AlignError::InvalidProbability {
                index,
                value,
                reason: "outside [0, 1]".to_string(),
            });
        }
        Ok(value)
    }

    /// Validate one agent's probability row and return its sum.
    ///
    /// # Validation Rules
    /// 1. Row length equals `choices`
    /// 2. Every entry is a valid probability
    /// 3. Sum does not exceed 1.0 (within tolerance)
    /// 4. With `exact`, sum equals 1.0 (within tolerance)
    pub fn validate_row(
        &self,
        index: usize,
        row: &[f64],
        choices: usize,
        exact: bool,
    ) -> Result<f64> {
        if row.len() != choices {
            return Err(AlignError::DimensionMismatch {
                index,
                expected: choices,
                found: row.len(),
            });
        }
        for &p in row {
            self.validate_probability(index, p)?;
        }

        let sum: f64 = row.iter().sum();
        if sum > 1.0 + self.tolerance {
            return Err(AlignError::InvalidProbability {
                index,
                value: sum,
                reason: format!("row sum exceeds 1.0 (tolerance {:e})", self.tolerance),
            });
        }
        if exact && (sum - 1.0).abs() > self.tolerance {
            return Err(AlignError::InvalidProbability {
                index,
                value: sum,
                reason: format!("row sum deviates from 1.0 by {:.6}", (sum - 1.0).abs()),
            });
        }
        Ok(sum)
    }

    /// Validate a K-choice target distribution and return its sum.
    pub fn validate_distribution(&self, targets: &[f64], exact: bool) -> Result<f64> {
        if targets.len() < 2 {
            return Err(AlignError::TooFewChoices { found: targets.len() });
        }
        if let Some(bad) = targets.iter().find(|t| !t.is_finite() || !(0.0..=1.0).contains(*t)) {
            return Err(AlignError::InvalidTarget(format!("target share {} outside [0, 1]", bad)));
        }

        let sum: f64 = targets.iter().sum();
        if sum > 1.0 + self.tolerance {
            return Err(AlignError::InvalidTarget(format!(
                "target shares sum to {:.6}, more than 1.0",
                sum
            )));
        }
        if exact && (sum - 1.0).abs() > self.tolerance {
            return Err(AlignError::InvalidTarget(format!(
                "target shares sum to {:.6}, expected exactly 1.0",
                sum
            )));
        }
        Ok(sum)
    }
}

impl Default for ProbabilityValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// A target share must be finite and inside [0, 1].
pub fn validate_share(share: f64) -> Result<f64> {
    if !share.is_finite() || !(0.0..=1.0).contains(&share) {
        return Err(AlignError::InvalidTarget(format!("target share {} outside [0, 1]", share)));
    }
    Ok(share)
}

/// Weights must be positive and finite.
pub fn validate_weight(index: usize, weight: f64) -> Result<f64> {
    if !weight.is_finite() || weight <= 0.0 {
        return Err(AlignError::InvalidWeight { index, weight });
    }
    Ok(weight)
}

/// True when every entry is exactly 0 or 1.
pub fn is_one_hot(row: &[f64]) -> bool {
    row.iter().all(|&p| p == 0.0 || p == 1.0)
}

// ============================================================================
// Tests
// ============================================================================
