//! Tour representation used by the genetic algorithm.
//!
//! An [`Individual`] is a permutation of city indices together with a cached
//! tour cost. The cache is private: every mutable access to the genes goes
//! through [`Individual::genes_mut`], which clears it.

use crate::error::{GaError, GaResult};
use crate::instance::TspInstance;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A candidate tour in the population
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    genes: Vec<usize>,
    fitness: Option<f64>,
}

/// A generation of individuals, all over the same instance.
pub type Population = Vec<Individual>;

impl Individual {
    /// Wrap a genome; the fitness starts unevaluated.
    pub fn new(genes: Vec<usize>) -> Self {
        Individual { genes, fitness: None }
    }

    /// Uniformly random permutation of `0..tour_size`.
    pub fn random<R: Rng + ?Sized>(tour_size: usize, rng: &mut R) -> Self {
        let mut genes: Vec<usize> = (0..tour_size).collect();
        genes.shuffle(rng);
        Individual::new(genes)
    }

    pub fn genes(&self) -> &[usize] {
        &self.genes
    }

    /// Mutable access to the genome. Clears the cached fitness.
    pub fn genes_mut(&mut self) -> &mut [usize] {
        self.fitness = None;
        &mut self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Cached tour cost, `None` until evaluated.
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }

    pub fn invalidate(&mut self) {
        self.fitness = None;
    }

    /// Compute and cache the tour cost. Returns the cached value when the
    /// genome has not changed since the last evaluation.
    pub fn evaluate(&mut self, instance: &TspInstance) -> GaResult<f64> {
        if let Some(fitness) = self.fitness {
            return Ok(fitness);
        }
        let fitness = instance.evaluate(&self.genes)?;
        self.fitness = Some(fitness);
        Ok(fitness)
    }

    pub fn is_permutation(&self) -> bool {
        is_permutation(&self.genes)
    }

    /// Fails with [`GaError::InvalidPermutation`] when a city is missing or
    /// duplicated.
    pub fn validate(&self) -> GaResult<()> {
        if self.is_permutation() {
            Ok(())
        } else {
            Err(GaError::InvalidPermutation { len: self.genes.len() })
        }
    }
}

/// Check that `genes` holds every value of `0..genes.len()` exactly once.
pub fn is_permutation(genes: &[usize]) -> bool {
    let mut seen = vec![false; genes.len()];
    for &gene in genes {
        match seen.get_mut(gene) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

/// Seed `size` random permutations of `0..tour_size`.
pub fn random_population<R: Rng + ?Sized>(size: usize, tour_size: usize, rng: &mut R) -> Population {
    (0..size).map(|_| Individual::random(tour_size, rng)).collect()
}

/// Cached tour costs of a population, in population order.
pub fn fitness_values(population: &[Individual]) -> GaResult<Vec<f64>> {
    population
        .iter()
        .enumerate()
        .map(|(index, ind)| ind.fitness().ok_or(GaError::UnevaluatedIndividual { index }))
        .collect()
}
