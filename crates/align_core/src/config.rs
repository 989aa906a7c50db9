//! # Alignment Parameters
//!
//! Convergence and budget parameters for the alignment algorithms, loadable
//! from a JSON file so a simulation run can tune them without recompiling.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let settings = AlignmentSettings::load("alignment.json")?;
//! let scaling = LogitScalingBinary::new(settings.scaling);
//! ```
//!
//! ## Parameter Groups
//!
//! - **AlignmentConfig**: iteration cap, precision, warnings (scaling algorithms)
//! - **ResamplingConfig**: attempt budgets, warnings (resampling algorithms)

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{AlignError, Result};

/// Environment variable naming an [`AlignmentSettings`] JSON file.
pub const CONFIG_PATH_ENV: &str = "ALIGN_CONFIG_PATH";

// ========== Iterative Scaling Parameters ==========

/// Convergence parameters for the iterative scaling algorithms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Maximum number of gamma/alpha iterations (default: 100)
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Convergence tolerance (default: 1e-5)
    /// Scaled by the population size or total weight where the metric is a mass
    #[serde(default = "default_precision")]
    pub precision: f64,

    /// Log a warning when the budget runs out (default: true)
    #[serde(default = "default_true")]
    pub warnings_enabled: bool,
}

fn default_max_iterations() -> usize {
    100
}
fn default_precision() -> f64 {
    1e-5
}
fn default_true() -> bool {
    true
}
fn default_final_attempts() -> usize {
    20
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self { max_iterations: 100, precision: 1e-5, warnings_enabled: true }
    }
}

impl AlignmentConfig {
    pub fn new(max_iterations: usize, precision: f64) -> Self {
        Self { max_iterations, precision, ..Default::default() }
    }

    pub fn with_warnings(mut self, enabled: bool) -> Self {
        self.warnings_enabled = enabled;
        self
    }

    /// Validate configuration bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations < 1 {
            return Err(AlignError::InvalidParameter(format!(
                "max_iterations must be at least 1, got {}",
                self.max_iterations
            )));
        }
        if !self.precision.is_finite() || self.precision <= 0.0 {
            return Err(AlignError::InvalidParameter(format!(
                "precision must be positive and finite, got {}",
                self.precision
            )));
        }
        Ok(())
    }
}

// ========== Resampling Parameters ==========

/// Attempt budgets for the outcome resampling algorithms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResamplingConfig {
    /// Unproductive attempts tolerated before giving up.
    /// `None` = 20 x the agents whose outcome opposes the required direction
    #[serde(default)]
    pub max_attempts: Option<usize>,

    /// Extra attempts on the smallest over-sized agent once the weighted
    /// main loop has run out of usable agents (default: 20)
    #[serde(default = "default_final_attempts")]
    pub final_attempts: usize,

    /// Log a warning when the budget runs out (default: true)
    #[serde(default = "default_true")]
    pub warnings_enabled: bool,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self { max_attempts: None, final_attempts: 20, warnings_enabled: true }
    }
}

impl ResamplingConfig {
    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self { max_attempts: Some(max_attempts), ..Default::default() }
    }

    pub fn with_warnings(mut self, enabled: bool) -> Self {
        self.warnings_enabled = enabled;
        self
    }

    /// Validate configuration bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == Some(0) {
            return Err(AlignError::InvalidParameter(
                "max_attempts must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Attempt budget for a call with `opposing` agents that could move the aggregate.
    pub fn attempt_budget(&self, opposing: usize) -> usize {
        self.max_attempts.unwrap_or(20 * opposing)
    }
}

// ========== Settings File ==========

/// All alignment parameters of a simulation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSettings {
    #[serde(default)]
    pub scaling: AlignmentConfig,
    #[serde(default)]
    pub resampling: ResamplingConfig,
}

impl AlignmentSettings {
    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: AlignmentSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from the file named by [`CONFIG_PATH_ENV`], or defaults when unset.
    pub fn from_env() -> Result<Self> {
        let Ok(path) = env::var(CONFIG_PATH_ENV) else {
            return Ok(Self::default());
        };

        let path = path.trim();
        if path.is_empty() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<()> {
        self.scaling.validate()?;
        self.resampling.validate()
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
