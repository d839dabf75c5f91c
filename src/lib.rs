//! Noisy TSP GA Library
//!
//! A genetic algorithm for the Travelling Salesman Problem, built to study how
//! tournament and rank-based selection cope with noisy fitness.
//!
//! # Features
//!
//! - Distance-matrix instances loaded from JSON, symmetric or asymmetric
//! - Tournament and linear rank-based roulette selection
//! - Gaussian selection noise scaled by the population's fitness spread
//! - PMX crossover and shuffle-indexes mutation
//! - Noise sweeps over several trials, in parallel, with CSV export
//!
//! # Example
//!
//! ```no_run
//! use noisy_tsp_ga::instance::TspInstance;
//! use noisy_tsp_ga::heuristics::genetic::{GAConfig, GeneticAlgorithm};
//! use noisy_tsp_ga::heuristics::selection::Selection;
//!
//! let instance = TspInstance::from_file("burma14.json").unwrap();
//!
//! let config = GAConfig {
//!     selection: Selection::rank_based(1.5, 2.0).unwrap(),
//!     seed: Some(42),
//!     ..GAConfig::for_instance(&instance)
//! };
//!
//! let mut ga = GeneticAlgorithm::new(&instance, config).unwrap();
//! let solution = ga.run().unwrap();
//! println!("Tour cost: {:.2}", solution.cost);
//! ```

pub mod error;
pub mod instance;
pub mod individual;
pub mod solution;
pub mod heuristics;
pub mod benchmark;

pub use error::{GaError, GaResult};
pub use instance::TspInstance;
pub use individual::Individual;
pub use solution::Solution;
