//! Logit Scaling Alignment (iterative proportional fitting)
//!
//! Per-agent probabilities form a matrix with one row per agent and one
//! column per choice, each row scaled by the agent's weight. Every iteration
//! applies two transforms:
//! - gamma: scale each column so its mass matches `target_share * total_weight`
//! - alpha: scale each row back to the agent's weight
//!
//! Calls move through `Validating -> Iterating -> {Converged, Exhausted}`.
//! What `Exhausted` means depends on the variant:
//!
//! | Variant | Metric | Exhausted |
//! |---------|--------|-----------|
//! | [`LogitScalingBinary`] | change of the two margins or distance from target | warning |
//! | [`LogitScaling`] | mean change of the K margins or distance from target | warning |
//! | [`LogitScalingStrict`] | KL divergence from the target distribution | error |

pub mod binary;
pub mod multi;

pub use binary::LogitScalingBinary;
pub use multi::{LogitScaling, LogitScalingStrict};

use crate::error::{ensure_finite, AlignError, Result};

/// Column factor for the gamma transform.
///
/// A column without mass can only match a zero target, in which case it is
/// left alone.
fn gamma_factor(target_mass: f64, current_mass: f64) -> Result<f64> {
    if current_mass > 0.0 {
        ensure_finite(target_mass / current_mass, "gamma")
    } else if target_mass == 0.0 {
        Ok(1.0)
    } else {
        Err(AlignError::Numeric(format!(
            "no probability mass left to scale to target mass {}",
            target_mass
        )))
    }
}

/// Row factor for the alpha transform.
fn alpha_factor(weight: f64, row_mass: f64) -> Result<f64> {
    if row_mass > 0.0 {
        ensure_finite(weight / row_mass, "alpha")
    } else {
        Err(AlignError::Numeric(
            "agent row lost all probability mass during the gamma transform".to_string(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::closure::{MultiProbabilityClosure, ProbabilityClosure, Weighted};

    /// Agent with a binary and a K-choice probability.
    #[derive(Debug, Clone)]
    pub struct Student {
        pub p_graduate: f64,
        pub track: Vec<f64>,
        pub weight: f64,
    }

    impl Weighted for Student {
        fn weight(&self) -> f64 {
            self.weight
        }
    }

    pub struct Graduation;

    impl ProbabilityClosure<Student> for Graduation {
        fn probability(&self, agent: &Student) -> f64 {
            agent.p_graduate
        }

        fn align(&self, agent: &mut Student, probability: f64) {
            agent.p_graduate = probability;
        }
    }

    pub struct Track;

    impl MultiProbabilityClosure<Student> for Track {
        fn probabilities(&self, agent: &Student) -> Vec<f64> {
            agent.track.clone()
        }

        fn align(&self, agent: &mut Student, probabilities: Vec<f64>) {
            agent.track = probabilities;
        }
    }

    pub fn graduates(probabilities: &[f64]) -> Vec<Student> {
        probabilities
            .iter()
            .map(|&p_graduate| Student { p_graduate, track: vec![], weight: 1.0 })
            .collect()
    }

    pub fn tracks(rows: &[&[f64]]) -> Vec<Student> {
        rows.iter()
            .map(|row| Student { p_graduate: 0.0, track: row.to_vec(), weight: 1.0 })
            .collect()
    }
}
