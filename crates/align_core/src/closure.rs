//! Accessor contracts between the alignment algorithms and caller-owned agents.
//!
//! The algorithms never look inside an agent. They read a probability, an
//! outcome or a weight through these traits and hand aligned values back the
//! same way. Any type can implement the traits; the `*Fns` adapters wrap a pair
//! of plain closures.

use rand::RngCore;

/// Realized binary outcome of an agent, plus a way to re-draw it.
pub trait OutcomeClosure<T> {
    fn outcome(&self, agent: &T) -> bool;

    /// Re-draw the agent's underlying random event. A subsequent
    /// [`outcome`](Self::outcome) may differ.
    fn resample(&self, agent: &mut T, rng: &mut dyn RngCore);
}

/// Probability of a binary event, before any outcome is drawn.
pub trait ProbabilityClosure<T> {
    fn probability(&self, agent: &T) -> f64;

    fn align(&self, agent: &mut T, probability: f64);
}

/// Probabilities over K mutually exclusive choices.
pub trait MultiProbabilityClosure<T> {
    /// One entry per choice, in a fixed choice order.
    fn probabilities(&self, agent: &T) -> Vec<f64>;

    fn align(&self, agent: &mut T, probabilities: Vec<f64>);
}

/// Weight capability. Only agent types that carry a weight implement it; the
/// weighted entry points require it at compile time.
pub trait Weighted {
    /// Number of real-world units this agent stands for. Must be positive and finite.
    fn weight(&self) -> f64;
}

/// [`OutcomeClosure`] from a getter and a resampler closure.
pub struct OutcomeFns<G, S> {
    get: G,
    resample: S,
}

impl<G, S> OutcomeFns<G, S> {
    pub fn new(get: G, resample: S) -> Self {
        Self { get, resample }
    }
}

impl<T, G, S> OutcomeClosure<T> for OutcomeFns<G, S>
where
    G: Fn(&T) -> bool,
    S: Fn(&mut T, &mut dyn RngCore),
{
    fn outcome(&self, agent: &T) -> bool {
        (self.get)(agent)
    }

    fn resample(&self, agent: &mut T, rng: &mut dyn RngCore) {
        (self.resample)(agent, rng)
    }
}

/// [`ProbabilityClosure`] from a getter and a setter closure.
pub struct ProbabilityFns<G, A> {
    get: G,
    align: A,
}

impl<G, A> ProbabilityFns<G, A> {
    pub fn new(get: G, align: A) -> Self {
        Self { get, align }
    }
}

impl<T, G, A> ProbabilityClosure<T> for ProbabilityFns<G, A>
where
    G: Fn(&T) -> f64,
    A: Fn(&mut T, f64),
{
    fn probability(&self, agent: &T) -> f64 {
        (self.get)(agent)
    }

    fn align(&self, agent: &mut T, probability: f64) {
        (self.align)(agent, probability)
    }
}

/// [`MultiProbabilityClosure`] from a getter and a setter closure.
pub struct MultiProbabilityFns<G, A> {
    get: G,
    align: A,
}

impl<G, A> MultiProbabilityFns<G, A> {
    pub fn new(get: G, align: A) -> Self {
        Self { get, align }
    }
}

impl<T, G, A> MultiProbabilityClosure<T> for MultiProbabilityFns<G, A>
where
    G: Fn(&T) -> Vec<f64>,
    A: Fn(&mut T, Vec<f64>),
{
    fn probabilities(&self, agent: &T) -> Vec<f64> {
        (self.get)(agent)
    }

    fn align(&self, agent: &mut T, probabilities: Vec<f64>) {
        (self.align)(agent, probabilities)
    }
}
