//! # align_core - Alignment Algorithms for Agent-Based Microsimulation
//!
//! Aligns the simulated outcomes or probabilities of a population of agents
//! to externally given aggregate targets (e.g. "30% of the selected persons
//! are employed"). Agents stay owned by the caller; every algorithm reads and
//! writes them through the accessor traits in [`closure`].
//!
//! ## Algorithm families
//! - **Resampling**: re-draw realized binary outcomes until the count, share
//!   or weight of `true` agents hits the target ([`ResamplingAlignment`],
//!   [`ResamplingWeightedAlignment`])
//! - **Scaling**: rescale probabilities or allocate 0/1 outcomes from them
//!   ([`MultiplicativeScaling`], [`SortByDifference`], [`Sidewalk`])
//! - **Logit scaling**: iterative proportional fitting of binary or K-choice
//!   probabilities to target margins ([`LogitScalingBinary`],
//!   [`LogitScaling`], [`LogitScalingStrict`])
//!
//! All randomness comes from a caller-supplied RNG, so a fixed seed replays
//! the same alignment. Every call returns an [`AlignmentReport`].
//!
//! ## Example
//! ```
//! use align_core::{seeded_rng, ProbabilityFns, SortByDifference};
//!
//! let mut p_exit = vec![0.9, 0.8, 0.3, 0.2];
//! let closure = ProbabilityFns::new(|p: &f64| *p, |p: &mut f64, v| *p = v);
//! let report = SortByDifference
//!     .align(&mut p_exit, None, &closure, 0.5, &mut seeded_rng(7))
//!     .unwrap();
//!
//! assert_eq!(p_exit.iter().filter(|p| **p == 1.0).count(), 2);
//! assert!(report.converged);
//! ```

// Generic entry points take population, filter, closure, target and rng
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

pub mod closure;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logit;
pub mod population;
pub mod resampling;
pub mod rng;
pub mod scaling;
pub mod validation;

pub use closure::{
    MultiProbabilityClosure, MultiProbabilityFns, OutcomeClosure, OutcomeFns, ProbabilityClosure,
    ProbabilityFns, Weighted,
};
pub use config::{AlignmentConfig, AlignmentSettings, ResamplingConfig, CONFIG_PATH_ENV};
pub use diagnostics::{AlgorithmKind, AlignmentReport, FailurePolicy};
pub use error::{AlignError, Result};
pub use logit::{LogitScaling, LogitScalingBinary, LogitScalingStrict};
pub use population::{extract, Filter};
pub use resampling::{ResamplingAlignment, ResamplingWeightedAlignment};
pub use rng::{seeded_rng, AlignRng};
pub use scaling::{MultiplicativeScaling, Sidewalk, SortByDifference};
pub use validation::ProbabilityValidator;
