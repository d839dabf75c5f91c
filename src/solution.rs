//! Outcome of a single genetic algorithm run.
//!
//! The reported cost of a run is the lowest cost in its final population.
//! The best tour seen in any generation is kept alongside it.

use crate::error::{GaError, GaResult};
use crate::individual::is_permutation;
use crate::instance::TspInstance;
use serde::{Deserialize, Serialize};

/// Represents the result of one engine run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Best tour of the final population
    pub tour: Vec<usize>,
    /// Cost of `tour`, the minimum over the final population
    pub cost: f64,
    /// Best tour evaluated during the whole run
    pub best_ever_tour: Vec<usize>,
    /// Cost of `best_ever_tour`, never above `cost`
    pub best_ever_cost: f64,
    /// Selection strategy that produced this solution
    pub algorithm: String,
    /// Noise factor applied during selection
    pub noise_factor: f64,
    /// Computation time in seconds
    pub computation_time: f64,
    /// Number of generations evolved
    pub generations: usize,
    /// Number of fitness evaluations performed
    pub evaluations: usize,
}

impl Solution {
    /// Create a solution from a single tour
    pub fn from_tour(instance: &TspInstance, tour: Vec<usize>, algorithm: &str) -> GaResult<Self> {
        if tour.len() != instance.tour_size || !is_permutation(&tour) {
            return Err(GaError::InvalidPermutation { len: tour.len() });
        }
        let cost = instance.evaluate(&tour)?;

        Ok(Solution {
            best_ever_tour: tour.clone(),
            tour,
            cost,
            best_ever_cost: cost,
            algorithm: algorithm.to_string(),
            noise_factor: 0.0,
            computation_time: 0.0,
            generations: 0,
            evaluations: 1,
        })
    }

    /// Relative distance to a reference cost, in percent.
    pub fn gap_to(&self, reference: f64) -> f64 {
        if reference == 0.0 {
            return 0.0;
        }
        (self.cost - reference) / reference * 100.0
    }

    /// Check that the tour visits every city of the instance exactly once
    pub fn is_complete(&self, instance: &TspInstance) -> bool {
        self.tour.len() == instance.tour_size && is_permutation(&self.tour)
    }
}

impl std::fmt::Display for Solution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({}, noise {})", self.algorithm, self.noise_factor)?;
        writeln!(f, "  Cost: {:.2}", self.cost)?;
        writeln!(f, "  Best ever: {:.2}", self.best_ever_cost)?;
        writeln!(f, "  Generations: {}", self.generations)?;
        writeln!(f, "  Evaluations: {}", self.evaluations)?;
        writeln!(f, "  Time: {:.4}s", self.computation_time)?;
        writeln!(f, "  Tour: {:?}", self.tour)
    }
}
