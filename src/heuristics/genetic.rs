//! Genetic Algorithm for the TSP.
//!
//! The engine owns its generational loop:
//!
//! ```text
//! Created -> Seeded -> Evaluated -> { Selecting -> Varying -> Evaluated }* -> Terminated
//! ```
//!
//! Every generation selects `population_size` parents (with noise when the
//! selection carries a positive noise factor), pairs them for PMX crossover
//! with probability `crossover_prob`, applies shuffle-indexes mutation to each
//! offspring with probability `mutation_prob`, re-evaluates the changed
//! offspring and replaces the whole population. No elitism is applied.

use crate::error::{GaError, GaResult};
use crate::heuristics::operators::{crossover, mutate};
use crate::heuristics::selection::{Selection, SelectionOperator};
use crate::individual::{fitness_values, random_population, Individual, Population};
use crate::instance::TspInstance;
use crate::solution::Solution;
use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::time::Instant;

/// Genetic Algorithm configuration
#[derive(Debug, Clone)]
pub struct GAConfig {
    /// Population size
    pub population_size: usize,
    /// Number of generations
    pub num_generations: usize,
    /// Parent selection, including its noise factor
    pub selection: Selection,
    /// Probability of recombining a pair of parents
    pub crossover_prob: f64,
    /// Probability of mutating an offspring
    pub mutation_prob: f64,
    /// Probability of each gene being swapped inside a mutation
    pub gene_mutation_prob: f64,
    /// Random seed; `None` seeds from OS entropy
    pub seed: Option<u64>,
}

impl Default for GAConfig {
    fn default() -> Self {
        GAConfig {
            population_size: 140,
            num_generations: 100,
            selection: Selection::default(),
            crossover_prob: 0.6,
            mutation_prob: 0.1,
            gene_mutation_prob: 0.05,
            seed: None,
        }
    }
}

fn check_probability(name: &str, value: f64) -> GaResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GaError::configuration(format!(
            "{} must lie in [0, 1], got {}",
            name, value
        )))
    }
}

impl GAConfig {
    /// Default operators with the generation and population sizes of the
    /// instance's preset, or 100 generations of `10 * tour_size` individuals.
    pub fn for_instance(instance: &TspInstance) -> Self {
        let (num_generations, population_size) = match instance.preset() {
            Some(p) => (p.num_generations, p.population_size),
            None => (100, 10 * instance.tour_size),
        };
        GAConfig {
            num_generations,
            population_size,
            ..Default::default()
        }
    }

    pub fn with_noise_factor(mut self, noise_factor: f64) -> GaResult<Self> {
        self.selection = self.selection.with_noise_factor(noise_factor)?;
        Ok(self)
    }

    pub fn noise_factor(&self) -> f64 {
        self.selection.noise_factor()
    }

    pub fn validate(&self) -> GaResult<()> {
        if self.population_size < 2 {
            return Err(GaError::configuration("population_size must be at least 2"));
        }
        if self.num_generations == 0 {
            return Err(GaError::configuration("num_generations must be at least 1"));
        }
        check_probability("crossover_prob", self.crossover_prob)?;
        check_probability("mutation_prob", self.mutation_prob)?;
        check_probability("gene_mutation_prob", self.gene_mutation_prob)?;
        self.selection.validate()
    }
}

/// Where the engine is in its generational cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Constructed, no population yet
    Created,
    /// Random population generated, not yet evaluated
    Seeded,
    /// Every individual has a cached fitness
    Evaluated,
    /// Drawing parents
    Selecting,
    /// Applying crossover and mutation to the offspring
    Varying,
    /// Requested number of generations reached
    Terminated,
}

/// Fitness summary of one evaluated generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: usize,
    /// Individuals evaluated in this generation
    pub evaluations: usize,
    pub min: f64,
    pub mean: f64,
    pub std: f64,
    pub max: f64,
}

/// Genetic Algorithm implementation
pub struct GeneticAlgorithm<'a> {
    config: GAConfig,
    instance: &'a TspInstance,
    population: Population,
    best_individual: Option<Individual>,
    rng: ChaCha8Rng,
    generation: usize,
    state: EngineState,
    history: Vec<GenerationStats>,
}

impl<'a> GeneticAlgorithm<'a> {
    /// Validate the instance and configuration, and seed the random source
    /// from `config.seed`.
    pub fn new(instance: &'a TspInstance, config: GAConfig) -> GaResult<Self> {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self::with_rng(instance, config, rng)
    }

    /// Same as [`new`](Self::new) with an explicit random source.
    pub fn with_rng(instance: &'a TspInstance, config: GAConfig, rng: ChaCha8Rng) -> GaResult<Self> {
        instance.validate()?;
        config.validate()?;

        Ok(GeneticAlgorithm {
            config,
            instance,
            population: Vec::new(),
            best_individual: None,
            rng,
            generation: 0,
            state: EngineState::Created,
            history: Vec::new(),
        })
    }

    /// Generate a random population and evaluate it
    pub fn initialize(&mut self) -> GaResult<()> {
        let population = random_population(
            self.config.population_size,
            self.instance.tour_size,
            &mut self.rng,
        );
        self.seed_population(population)
    }

    /// Start from a caller-supplied population. Every genome must be a
    /// permutation over the instance's cities.
    pub fn seed_population(&mut self, population: Population) -> GaResult<()> {
        if population.is_empty() {
            return Err(GaError::configuration("cannot seed an empty population"));
        }
        for individual in &population {
            if individual.len() != self.instance.tour_size {
                return Err(GaError::InvalidPermutation { len: individual.len() });
            }
            individual.validate()?;
        }

        self.population = population;
        self.best_individual = None;
        self.generation = 0;
        self.history.clear();
        self.state = EngineState::Seeded;

        self.evaluate_population()?;
        Ok(())
    }

    /// Evaluate every individual without a cached fitness, record the
    /// generation statistics and update the best individual seen so far.
    fn evaluate_population(&mut self) -> GaResult<usize> {
        let mut evaluations = 0;
        for individual in self.population.iter_mut() {
            if !individual.is_evaluated() {
                individual.evaluate(self.instance)?;
                evaluations += 1;
            }
        }

        let fitnesses = fitness_values(&self.population)?;
        let stats = GenerationStats {
            generation: self.generation,
            evaluations,
            min: fitnesses.iter().cloned().fold(f64::INFINITY, f64::min),
            mean: fitnesses.iter().mean(),
            std: fitnesses.iter().population_std_dev(),
            max: fitnesses.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        };
        log::debug!(
            "[GA] Gen {}  evals {}  min {:.3}  mean {:.3}  std {:.3}  max {:.3}  diversity {:.2}",
            stats.generation,
            stats.evaluations,
            stats.min,
            stats.mean,
            stats.std,
            stats.max,
            self.population_diversity()
        );
        self.history.push(stats);

        if let Some(best) = self
            .population
            .iter()
            .min_by_key(|ind| OrderedFloat(ind.fitness().unwrap_or(f64::INFINITY)))
        {
            let improved = match &self.best_individual {
                Some(current) => best.fitness() < current.fitness(),
                None => true,
            };
            if improved {
                self.best_individual = Some(best.clone());
            }
        }

        self.state = EngineState::Evaluated;
        Ok(evaluations)
    }

    /// Pair consecutive offspring for crossover, then mutate each one.
    fn vary(&mut self, offspring: &mut [Individual]) {
        for i in (1..offspring.len()).step_by(2) {
            if self.rng.gen::<f64>() < self.config.crossover_prob {
                let (left, right) = offspring.split_at_mut(i);
                crossover(&mut left[i - 1], &mut right[0], &mut self.rng);
            }
        }

        for individual in offspring.iter_mut() {
            if self.rng.gen::<f64>() < self.config.mutation_prob {
                mutate(individual, self.config.gene_mutation_prob, &mut self.rng);
            }
        }
    }

    /// Run one generation: select, vary, evaluate and replace.
    pub fn step(&mut self) -> GaResult<()> {
        if self.state == EngineState::Created {
            self.initialize()?;
        }

        self.state = EngineState::Selecting;
        let chosen = self
            .config
            .selection
            .select(&self.population, self.population.len(), &mut self.rng)?;
        // copies, so crossover on one slot never touches another
        let mut offspring: Population = chosen
            .into_iter()
            .map(|idx| self.population[idx].clone())
            .collect();

        self.state = EngineState::Varying;
        self.vary(&mut offspring);

        self.population = offspring;
        self.generation += 1;
        self.evaluate_population()?;
        Ok(())
    }

    /// Seed a random population and evolve it for the configured number of
    /// generations.
    pub fn run(&mut self) -> GaResult<Solution> {
        let start = Instant::now();
        self.initialize()?;
        self.evolve(start)
    }

    /// Evolve a given initial population for the configured number of
    /// generations.
    pub fn run_from(&mut self, population: Population) -> GaResult<Solution> {
        let start = Instant::now();
        self.seed_population(population)?;
        self.evolve(start)
    }

    fn evolve(&mut self, start: Instant) -> GaResult<Solution> {
        log::info!(
            "[GA] {} on {}: {} individuals x {} generations, noise {}",
            self.config.selection.label(),
            self.instance.name,
            self.population.len(),
            self.config.num_generations,
            self.config.noise_factor()
        );

        while self.generation < self.config.num_generations {
            self.step()?;
        }
        self.state = EngineState::Terminated;

        let mut solution = self.current_solution()?;
        solution.computation_time = start.elapsed().as_secs_f64();

        log::info!(
            "[GA] Finished {} generations: final min {:.3}, best ever {:.3}, {:.2}s",
            self.generation,
            solution.cost,
            solution.best_ever_cost,
            solution.computation_time
        );
        Ok(solution)
    }

    /// Summarise the current population as a [`Solution`].
    pub fn current_solution(&self) -> GaResult<Solution> {
        let final_best = self
            .population
            .iter()
            .min_by_key(|ind| OrderedFloat(ind.fitness().unwrap_or(f64::INFINITY)))
            .ok_or_else(|| GaError::configuration("the engine has no population yet"))?;

        let mut solution = Solution::from_tour(
            self.instance,
            final_best.genes().to_vec(),
            &self.config.selection.label(),
        )?;
        if let Some(best_ever) = &self.best_individual {
            solution.best_ever_tour = best_ever.genes().to_vec();
            solution.best_ever_cost = best_ever.fitness().unwrap_or(solution.cost);
        }
        solution.noise_factor = self.config.noise_factor();
        solution.generations = self.generation;
        solution.evaluations = self.history.iter().map(|s| s.evaluations).sum();
        Ok(solution)
    }

    pub fn config(&self) -> &GAConfig {
        &self.config
    }

    pub fn population(&self) -> &[Individual] {
        &self.population
    }

    /// Best individual evaluated so far
    pub fn best_individual(&self) -> Option<&Individual> {
        self.best_individual.as_ref()
    }

    /// Get current generation
    pub fn current_generation(&self) -> usize {
        self.generation
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Statistics of every evaluated generation, the initial one included
    pub fn history(&self) -> &[GenerationStats] {
        &self.history
    }

    /// Get population diversity (average number of differing positions
    /// between pairs among the first 20 individuals)
    pub fn population_diversity(&self) -> f64 {
        if self.population.len() < 2 {
            return 0.0;
        }

        let sample = &self.population[..self.population.len().min(20)];
        let mut total_diff = 0.0;
        let mut count = 0;

        for i in 0..sample.len() {
            for j in i + 1..sample.len() {
                let diff = sample[i]
                    .genes()
                    .iter()
                    .zip(sample[j].genes())
                    .filter(|(a, b)| a != b)
                    .count();
                total_diff += diff as f64;
                count += 1;
            }
        }

        if count > 0 {
            total_diff / count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_instance() -> TspInstance {
        TspInstance::new(
            "test",
            vec![
                vec![0.0, 1.0, 2.0, 3.0],
                vec![1.0, 0.0, 4.0, 5.0],
                vec![2.0, 4.0, 0.0, 6.0],
                vec![3.0, 5.0, 6.0, 0.0],
            ],
            14.0,
        )
        .unwrap()
    }

    /// Cities on a line at positions 0..n; the optimal closed tour goes out
    /// and back, costing 2 * (n - 1).
    fn line_instance(n: usize) -> TspInstance {
        let matrix = (0..n)
            .map(|i| (0..n).map(|j| (i as f64 - j as f64).abs()).collect())
            .collect();
        TspInstance::new("line", matrix, 2.0 * (n - 1) as f64).unwrap()
    }

    fn small_config(seed: u64) -> GAConfig {
        GAConfig {
            population_size: 20,
            num_generations: 10,
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = GAConfig::default();
        assert_eq!(config.selection, Selection::default());
        assert_eq!(config.crossover_prob, 0.6);
        assert_eq!(config.mutation_prob, 0.1);
        assert_eq!(config.gene_mutation_prob, 0.05);
        assert_eq!(config.noise_factor(), 0.0);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_for_instance() {
        let mut instance = line_instance(6);
        let config = GAConfig::for_instance(&instance);
        assert_eq!((config.num_generations, config.population_size), (100, 60));

        instance.name = "burma14".to_string();
        let config = GAConfig::for_instance(&instance);
        assert_eq!((config.num_generations, config.population_size), (100, 140));
    }

    #[test]
    fn test_invalid_config() {
        let bad = [
            GAConfig { crossover_prob: 1.5, ..Default::default() },
            GAConfig { mutation_prob: -0.1, ..Default::default() },
            GAConfig { gene_mutation_prob: f64::NAN, ..Default::default() },
            GAConfig { population_size: 1, ..Default::default() },
            GAConfig { num_generations: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(GaError::Configuration { .. })));
        }
        assert!(GAConfig::default().with_noise_factor(-2.0).is_err());

        let instance = create_test_instance();
        let config = GAConfig { crossover_prob: 2.0, ..Default::default() };
        assert!(GeneticAlgorithm::new(&instance, config).is_err());
    }

    #[test]
    fn test_invalid_instance_rejected_before_seeding() {
        let instance = TspInstance {
            name: "degenerate".to_string(),
            tour_size: 1,
            opt_distance: 0.0,
            distance_matrix: vec![vec![0.0]],
        };
        let result = GeneticAlgorithm::new(&instance, small_config(1));
        assert!(matches!(result, Err(GaError::InvalidInstance { .. })));
    }

    #[test]
    fn test_state_transitions() {
        let instance = create_test_instance();
        let mut ga = GeneticAlgorithm::new(&instance, small_config(5)).unwrap();
        assert_eq!(ga.state(), EngineState::Created);

        ga.initialize().unwrap();
        assert_eq!(ga.state(), EngineState::Evaluated);
        assert_eq!(ga.population().len(), 20);
        assert!(ga.population().iter().all(|ind| ind.is_evaluated()));

        ga.step().unwrap();
        assert_eq!(ga.state(), EngineState::Evaluated);
        assert_eq!(ga.current_generation(), 1);

        ga.run().unwrap();
        assert_eq!(ga.state(), EngineState::Terminated);
        assert_eq!(ga.current_generation(), 10);
    }

    #[test]
    fn test_four_city_reaches_optimum() {
        let instance = create_test_instance();
        for seed in 0..5 {
            let mut ga = GeneticAlgorithm::new(&instance, small_config(seed)).unwrap();
            let solution = ga.run().unwrap();
            assert_eq!(solution.cost, 14.0);
            assert!(solution.is_complete(&instance));
        }
    }

    #[test]
    fn test_converges_on_line_instance() {
        let instance = line_instance(8);
        let best = (0..3)
            .map(|seed| {
                let config = GAConfig {
                    population_size: 60,
                    num_generations: 100,
                    seed: Some(seed),
                    ..Default::default()
                };
                let mut ga = GeneticAlgorithm::new(&instance, config).unwrap();
                ga.run().unwrap().cost
            })
            .fold(f64::INFINITY, f64::min);
        assert_eq!(best, 14.0);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let instance = line_instance(10);
        let config = GAConfig {
            population_size: 30,
            num_generations: 20,
            selection: Selection::rank_based(1.5, 2.0).unwrap(),
            seed: Some(77),
            ..Default::default()
        };

        let first = GeneticAlgorithm::new(&instance, config.clone()).unwrap().run().unwrap();
        let second = GeneticAlgorithm::new(&instance, config).unwrap().run().unwrap();
        assert_eq!(first.tour, second.tour);
        assert_eq!(first.cost, second.cost);
        assert_eq!(first.evaluations, second.evaluations);
    }

    #[test]
    fn test_history_and_best_ever() {
        let instance = line_instance(9);
        let config = GAConfig {
            population_size: 30,
            num_generations: 15,
            selection: Selection::tournament(3, 1.0).unwrap(),
            seed: Some(3),
            ..Default::default()
        };
        let mut ga = GeneticAlgorithm::new(&instance, config).unwrap();
        let solution = ga.run().unwrap();

        let history = ga.history();
        assert_eq!(history.len(), 16);
        assert_eq!(history[0].evaluations, 30);
        assert!(history.iter().all(|s| s.min <= s.mean && s.mean <= s.max));

        let lowest_seen = history.iter().map(|s| s.min).fold(f64::INFINITY, f64::min);
        assert_eq!(solution.best_ever_cost, lowest_seen);
        assert!(solution.best_ever_cost <= solution.cost);
        assert_eq!(solution.cost, history[15].min);
        assert_eq!(solution.cost, instance.evaluate(&solution.tour).unwrap());
        assert!(solution.is_complete(&instance));
        assert_eq!(solution.algorithm, "tournament(size=3)");
        assert_eq!(solution.noise_factor, 1.0);
        assert_eq!(solution.generations, 15);
        assert_eq!(
            solution.evaluations,
            history.iter().map(|s| s.evaluations).sum::<usize>()
        );
    }

    #[test]
    fn test_population_stays_valid_under_noise() {
        let instance = line_instance(12);
        for selection in [
            Selection::tournament(2, 4.0).unwrap(),
            Selection::rank_based(2.0, 4.0).unwrap(),
        ] {
            let config = GAConfig {
                population_size: 24,
                num_generations: 25,
                selection,
                crossover_prob: 0.9,
                mutation_prob: 0.5,
                gene_mutation_prob: 0.2,
                seed: Some(11),
            };
            let mut ga = GeneticAlgorithm::new(&instance, config).unwrap();
            ga.run().unwrap();
            assert_eq!(ga.population().len(), 24);
            for ind in ga.population() {
                assert!(ind.is_permutation());
                assert_eq!(ind.fitness(), Some(instance.evaluate(ind.genes()).unwrap()));
            }
        }
    }

    #[test]
    fn test_without_variation_offspring_are_copies() {
        let instance = line_instance(7);
        let config = GAConfig {
            population_size: 16,
            num_generations: 1,
            crossover_prob: 0.0,
            mutation_prob: 0.0,
            seed: Some(8),
            ..Default::default()
        };
        let mut ga = GeneticAlgorithm::new(&instance, config).unwrap();
        ga.initialize().unwrap();
        let before: Vec<Vec<usize>> = ga.population().iter().map(|i| i.genes().to_vec()).collect();

        ga.step().unwrap();
        assert_eq!(ga.history()[1].evaluations, 0);
        for ind in ga.population() {
            assert!(before.iter().any(|genes| genes.as_slice() == ind.genes()));
        }
    }

    #[test]
    fn test_run_from_rejects_bad_population() {
        let instance = line_instance(5);
        let mut ga = GeneticAlgorithm::new(&instance, small_config(1)).unwrap();

        assert!(ga.run_from(Vec::new()).is_err());
        assert!(ga.run_from(vec![Individual::new(vec![0, 1, 2])]).is_err());
        assert!(ga.run_from(vec![Individual::new(vec![0, 1, 1, 2, 3])]).is_err());

        let population = vec![
            Individual::new(vec![0, 1, 2, 3, 4]),
            Individual::new(vec![4, 2, 0, 1, 3]),
        ];
        let solution = ga.run_from(population).unwrap();
        assert_eq!(solution.generations, 10);
        assert_eq!(ga.population().len(), 2);
    }
}
