use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("Empty population: {selected} agent(s) selected, at least {required} required")]
    EmptyPopulation { selected: usize, required: usize },

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid weight {weight} for agent at position {index}: must be positive and finite")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("Invalid probability {value} for agent at position {index}: {reason}")]
    InvalidProbability { index: usize, value: f64, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Too few choices: found {found}, at least 2 required")]
    TooFewChoices { found: usize },

    #[error("Dimension mismatch at position {index}: expected {expected} choices, found {found}")]
    DimensionMismatch { index: usize, expected: usize, found: usize },

    #[error("Choice {choice} has zero probability mass across all agents")]
    ImpossibleEvent { choice: usize },

    #[error("Degenerate input: every probability row is one-hot, scaling cannot move it")]
    DegenerateInput,

    #[error("Not converged after {iterations} iterations: error {error:e} > {precision:e}")]
    NotConverged { iterations: usize, error: f64, precision: f64 },

    #[error("Numeric failure: {0}")]
    Numeric(String),

    #[error("Config IO error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl AlignError {
    /// True for errors raised before any iteration started.
    pub fn is_validation(&self) -> bool {
        match self {
            AlignError::EmptyPopulation { .. }
            | AlignError::InvalidTarget(_)
            | AlignError::InvalidWeight { .. }
            | AlignError::InvalidProbability { .. }
            | AlignError::InvalidParameter(_)
            | AlignError::TooFewChoices { .. }
            | AlignError::DimensionMismatch { .. }
            | AlignError::ImpossibleEvent { .. }
            | AlignError::DegenerateInput => true,
            AlignError::NotConverged { .. } | AlignError::Numeric(_) => false,
            AlignError::ConfigIo(_) | AlignError::ConfigParse(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AlignError>;

/// Returns `value` unchanged when finite, otherwise a numeric failure naming `what`.
pub(crate) fn ensure_finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AlignError::Numeric(format!("{} is {}", what, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(AlignError::DegenerateInput.is_validation());
        assert!(AlignError::EmptyPopulation { selected: 0, required: 2 }.is_validation());
        assert!(!AlignError::Numeric("gamma is NaN".to_string()).is_validation());
        assert!(!AlignError::NotConverged { iterations: 100, error: 0.1, precision: 1e-5 }
            .is_validation());
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite(0.5, "x").unwrap(), 0.5);
        let err = ensure_finite(f64::NAN, "gamma").unwrap_err();
        assert!(err.to_string().contains("gamma is NaN"));
        assert!(ensure_finite(f64::INFINITY, "alpha").is_err());
    }

    #[test]
    fn test_display_messages() {
        let err = AlignError::InvalidWeight { index: 3, weight: -1.0 };
        assert!(err.to_string().contains("position 3"));

        let err = AlignError::TooFewChoices { found: 1 };
        assert_eq!(err.to_string(), "Too few choices: found 1, at least 2 required");
    }
}
