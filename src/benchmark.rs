//! Noise-robustness experiments.
//!
//! A noise sweep runs the genetic algorithm several times per noise level and
//! keeps the lowest final cost for each level. Every noise level starts from
//! the same set of initial populations, so levels differ only by the noise
//! injected during selection.

use crate::error::{GaError, GaResult};
use crate::heuristics::genetic::{GAConfig, GeneticAlgorithm};
use crate::heuristics::noise::NoiseModel;
use crate::heuristics::selection::Selection;
use crate::individual::{random_population, Population};
use crate::instance::TspInstance;

use indicatif::{ProgressBar, ProgressStyle};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fs::File;
use std::path::Path;
use std::time::Instant;

/// Tournament sizes compared in a parameter sweep
pub const TOURNAMENT_SIZES: [usize; 5] = [2, 4, 6, 8, 10];

/// Selection pressures compared in a parameter sweep
pub const SELECTION_PRESSURES: [f64; 5] = [1.1, 1.3, 1.5, 1.7, 2.0];

/// Outcome of all trials at one noise level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseSweepResult {
    /// Instance name
    pub instance: String,
    /// Selection label, e.g. `tournament(size=2)`
    pub selection: String,
    pub noise_level: f64,
    /// Lowest final cost over all trials
    pub min_distance: f64,
    /// Known optimal distance of the instance
    pub optimal_distance: f64,
    /// Gap of `min_distance` to the optimum, in percent
    pub gap_percent: f64,
    pub mean_distance: f64,
    pub std_distance: f64,
    /// Final cost of each trial, in trial order
    #[serde(skip)]
    pub trial_distances: Vec<f64>,
    /// Wall time for all trials of this level, in seconds
    pub time: f64,
}

/// Benchmark configuration
#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    /// Noise factors to evaluate
    pub noise_levels: Vec<f64>,
    /// Independent trials per noise level
    pub num_trials: usize,
    /// Run trials in parallel
    pub parallel: bool,
    /// Show a progress bar
    pub show_progress: bool,
    /// Master seed; falls back to the GA seed, then to OS entropy
    pub seed: Option<u64>,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        BenchmarkConfig {
            noise_levels: vec![0.0, 1.0, 2.0, 4.0],
            num_trials: 10,
            parallel: true,
            show_progress: false,
            seed: None,
        }
    }
}

impl BenchmarkConfig {
    pub fn validate(&self) -> GaResult<()> {
        if self.num_trials == 0 {
            return Err(GaError::configuration("num_trials must be at least 1"));
        }
        if self.noise_levels.is_empty() {
            return Err(GaError::configuration("at least one noise level is required"));
        }
        for &level in &self.noise_levels {
            NoiseModel::new(level)?;
        }
        Ok(())
    }
}

/// Tournament selections for each given size
pub fn tournament_variants(sizes: &[usize]) -> GaResult<Vec<Selection>> {
    sizes.iter().map(|&size| Selection::tournament(size, 0.0)).collect()
}

/// Rank-based selections for each given pressure
pub fn rank_variants(pressures: &[f64]) -> GaResult<Vec<Selection>> {
    pressures
        .iter()
        .map(|&pressure| Selection::rank_based(pressure, 0.0))
        .collect()
}

/// Benchmarking engine
pub struct Benchmark {
    config: BenchmarkConfig,
    results: Vec<NoiseSweepResult>,
}

impl Benchmark {
    pub fn new(config: BenchmarkConfig) -> GaResult<Self> {
        config.validate()?;
        Ok(Benchmark {
            config,
            results: Vec::new(),
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len} trials ({elapsed})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar
    }

    /// Run every trial at every noise level with `ga_config`'s selection.
    pub fn run_noise_sweep(
        &mut self,
        instance: &TspInstance,
        ga_config: &GAConfig,
    ) -> GaResult<Vec<NoiseSweepResult>> {
        instance.validate()?;
        ga_config.validate()?;

        let mut master = match self.config.seed.or(ga_config.seed) {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let initial: Vec<Population> = (0..self.config.num_trials)
            .map(|_| random_population(ga_config.population_size, instance.tour_size, &mut master))
            .collect();

        let bar = self.progress_bar((self.config.noise_levels.len() * self.config.num_trials) as u64);
        bar.set_message(format!("{} {}", instance.name, ga_config.selection.label()));

        let mut sweep = Vec::with_capacity(self.config.noise_levels.len());

        for &noise_level in &self.config.noise_levels {
            let config = ga_config.clone().with_noise_factor(noise_level)?;
            let seeds: Vec<u64> = (0..self.config.num_trials).map(|_| master.gen()).collect();
            let start = Instant::now();

            let run_trial = |population: &Population, seed: u64| -> GaResult<f64> {
                let rng = ChaCha8Rng::seed_from_u64(seed);
                let mut ga = GeneticAlgorithm::with_rng(instance, config.clone(), rng)?;
                let solution = ga.run_from(population.clone())?;
                bar.inc(1);
                Ok(solution.cost)
            };

            let trial_distances: Vec<f64> = if self.config.parallel {
                initial
                    .par_iter()
                    .zip(seeds.par_iter())
                    .map(|(population, &seed)| run_trial(population, seed))
                    .collect::<GaResult<Vec<f64>>>()?
            } else {
                initial
                    .iter()
                    .zip(seeds.iter())
                    .map(|(population, &seed)| run_trial(population, seed))
                    .collect::<GaResult<Vec<f64>>>()?
            };

            let min_distance = trial_distances.iter().cloned().fold(f64::INFINITY, f64::min);
            let gap_percent = if instance.opt_distance > 0.0 {
                (min_distance - instance.opt_distance) / instance.opt_distance * 100.0
            } else {
                0.0
            };

            let result = NoiseSweepResult {
                instance: instance.name.clone(),
                selection: config.selection.label(),
                noise_level,
                min_distance,
                optimal_distance: instance.opt_distance,
                gap_percent,
                mean_distance: trial_distances.iter().mean(),
                std_distance: trial_distances.iter().population_std_dev(),
                trial_distances,
                time: start.elapsed().as_secs_f64(),
            };
            log::info!(
                "{} {} noise {}: min {:.2} (optimum {:.2}, gap {:.2}%)",
                result.instance,
                result.selection,
                noise_level,
                result.min_distance,
                result.optimal_distance,
                result.gap_percent
            );
            sweep.push(result);
        }

        bar.finish_and_clear();
        self.results.extend(sweep.iter().cloned());
        Ok(sweep)
    }

    /// Run a noise sweep for each selection variant. The variants' own noise
    /// factors are replaced by the sweep's noise levels.
    pub fn run_parameter_sweep(
        &mut self,
        instance: &TspInstance,
        ga_config: &GAConfig,
        selections: &[Selection],
    ) -> GaResult<Vec<NoiseSweepResult>> {
        let mut all = Vec::new();
        for selection in selections {
            let config = GAConfig {
                selection: *selection,
                ..ga_config.clone()
            };
            all.extend(self.run_noise_sweep(instance, &config)?);
        }
        Ok(all)
    }

    /// Export results to CSV
    pub fn export_to_csv<P: AsRef<Path>>(&self, path: P) -> GaResult<()> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);

        for result in &self.results {
            writer.serialize(result)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Generate summary report
    pub fn generate_report(&self) -> String {
        let mut report = String::new();

        report.push_str("========================================\n");
        report.push_str("     Noisy Selection Benchmark Report\n");
        report.push_str("========================================\n");
        report.push_str(&format!(
            "Generated: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        report.push_str(&format!("Trials per noise level: {}\n\n", self.config.num_trials));

        report.push_str("-".repeat(96).as_str());
        report.push('\n');
        report.push_str(&format!(
            "{:<12} {:<24} {:>7} {:>12} {:>12} {:>9} {:>12} {:>10}\n",
            "Instance", "Selection", "Noise", "Min Dist", "Optimal", "Gap%", "Mean Dist", "Time"
        ));
        report.push_str("-".repeat(96).as_str());
        report.push('\n');

        for r in &self.results {
            report.push_str(&format!(
                "{:<12} {:<24} {:>7.1} {:>12.2} {:>12.2} {:>8.2}% {:>12.2} {:>10.3}\n",
                r.instance,
                r.selection,
                r.noise_level,
                r.min_distance,
                r.optimal_distance,
                r.gap_percent,
                r.mean_distance,
                r.time
            ));
        }

        report.push_str("-".repeat(96).as_str());
        report.push('\n');
        report
    }

    /// Get all results
    pub fn results(&self) -> &[NoiseSweepResult] {
        &self.results
    }

    pub fn config(&self) -> &BenchmarkConfig {
        &self.config
    }
}

/// Load every `*.json` instance of a directory, smallest first. Files that
/// fail to load are skipped with a warning.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P) -> GaResult<Vec<TspInstance>> {
    let mut instances = Vec::new();

    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            match TspInstance::from_file(&path) {
                Ok(instance) => instances.push(instance),
                Err(e) => log::warn!("Skipping {:?}: {}", path, e),
            }
        }
    }

    instances.sort_by_key(|i| i.tour_size);
    Ok(instances)
}
