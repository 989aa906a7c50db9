//! Random source shared by the stochastic alignment algorithms.
//!
//! The stream is owned by the caller's simulation context and passed by
//! `&mut` reference into every entry point, so a run is reproducible from its
//! seed as long as calls happen in the same order.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Reproducible generator used across a simulation run.
pub type AlignRng = ChaCha8Rng;

/// Create the run-wide random stream from a seed.
pub fn seeded_rng(seed: u64) -> AlignRng {
    ChaCha8Rng::seed_from_u64(seed)
}
