//! Working-population extraction.

use crate::closure::Weighted;
use crate::error::{AlignError, Result};
use crate::validation::validate_weight;

/// Optional selection predicate. `None` selects every agent.
pub type Filter<'f, T> = Option<&'f dyn Fn(&T) -> bool>;

/// Collect the agents selected by `filter`, in source iteration order.
///
/// No deduplication happens; the same agent yielded twice is aligned twice.
pub fn extract<'a, T, I>(population: I, filter: Filter<'_, T>) -> Vec<&'a mut T>
where
    T: 'a,
    I: IntoIterator<Item = &'a mut T>,
{
    population
        .into_iter()
        .filter(|agent| filter.map_or(true, |select| select(&**agent)))
        .collect()
}

/// [`extract`], failing when fewer than `required` agents are selected.
pub(crate) fn extract_at_least<'a, T, I>(
    population: I,
    filter: Filter<'_, T>,
    required: usize,
) -> Result<Vec<&'a mut T>>
where
    T: 'a,
    I: IntoIterator<Item = &'a mut T>,
{
    let agents = extract(population, filter);
    if agents.len() < required {
        return Err(AlignError::EmptyPopulation { selected: agents.len(), required });
    }
    Ok(agents)
}

/// Read and validate every agent's weight.
pub(crate) fn collect_weights<T: Weighted>(agents: &[&mut T]) -> Result<Vec<f64>> {
    agents
        .iter()
        .enumerate()
        .map(|(index, agent)| validate_weight(index, agent.weight()))
        .collect()
}
