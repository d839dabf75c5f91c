//! Noisy TSP GA - Command Line Interface
//!
//! Runs the genetic algorithm on a TSP instance and compares tournament and
//! rank-based selection under selection-time fitness noise.

use clap::{Parser, Subcommand, ValueEnum};
use noisy_tsp_ga::benchmark::{
    load_instances_from_dir, rank_variants, tournament_variants, Benchmark, BenchmarkConfig,
    SELECTION_PRESSURES, TOURNAMENT_SIZES,
};
use noisy_tsp_ga::error::GaResult;
use noisy_tsp_ga::heuristics::genetic::{GAConfig, GeneticAlgorithm};
use noisy_tsp_ga::heuristics::selection::Selection;
use noisy_tsp_ga::instance::TspInstance;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "noisy-tsp-ga")]
#[command(version = "1.0")]
#[command(about = "Genetic algorithm for the TSP with noisy tournament and rank-based selection")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the genetic algorithm once
    Solve {
        /// Path to the instance JSON file
        #[arg(short, long)]
        instance: PathBuf,

        /// Selection strategy
        #[arg(long, value_enum, default_value = "tournament")]
        selection: SelectionKind,

        /// Tournament size
        #[arg(long, default_value = "2")]
        tournament_size: usize,

        /// Selection pressure for rank-based selection, in (1, 2]
        #[arg(long, default_value = "1.1")]
        pressure: f64,

        /// Noise factor applied to selection
        #[arg(short, long, default_value = "0")]
        noise: f64,

        #[command(flatten)]
        ga: GaArgs,

        /// Write the solution as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print instance statistics and per-generation history
        #[arg(short, long)]
        verbose: bool,
    },

    /// Noise sweep over several selection parameters
    Sweep {
        /// Instance JSON file or a directory of them
        #[arg(short, long)]
        instance: PathBuf,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Selection strategy to sweep
        #[arg(long, value_enum, default_value = "tournament")]
        selection: SelectionKind,

        /// Tournament sizes
        #[arg(long, value_delimiter = ',', default_values_t = TOURNAMENT_SIZES.to_vec())]
        sizes: Vec<usize>,

        /// Selection pressures
        #[arg(long, value_delimiter = ',', default_values_t = SELECTION_PRESSURES.to_vec())]
        pressures: Vec<f64>,

        /// Noise factors
        #[arg(long, value_delimiter = ',', default_values_t = vec![0.0, 1.0, 2.0, 4.0])]
        noise_levels: Vec<f64>,

        /// Trials per noise level
        #[arg(short, long, default_value = "10")]
        trials: usize,

        #[command(flatten)]
        ga: GaArgs,

        /// Run trials one after another
        #[arg(long)]
        sequential: bool,

        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Analyze an instance
    Analyze {
        /// Path to the instance JSON file
        #[arg(short, long)]
        instance: PathBuf,
    },
}

#[derive(clap::Args)]
struct GaArgs {
    /// Number of generations (instance preset or 100 when omitted)
    #[arg(short, long)]
    generations: Option<usize>,

    /// Population size (instance preset or 10 x tour size when omitted)
    #[arg(short, long)]
    population: Option<usize>,

    #[arg(long, default_value = "0.6")]
    crossover_prob: f64,

    #[arg(long, default_value = "0.1")]
    mutation_prob: f64,

    /// Per-gene swap probability inside a mutation
    #[arg(long, default_value = "0.05")]
    gene_mutation_prob: f64,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,
}

impl GaArgs {
    fn to_config(&self, instance: &TspInstance, selection: Selection) -> GAConfig {
        let defaults = GAConfig::for_instance(instance);
        GAConfig {
            population_size: self.population.unwrap_or(defaults.population_size),
            num_generations: self.generations.unwrap_or(defaults.num_generations),
            selection,
            crossover_prob: self.crossover_prob,
            mutation_prob: self.mutation_prob,
            gene_mutation_prob: self.gene_mutation_prob,
            seed: self.seed,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum SelectionKind {
    /// Tournament selection
    Tournament,
    /// Linear ranking with roulette-wheel sampling
    Rank,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Solve { instance, selection, tournament_size, pressure, noise, ga, output, verbose } => {
            let selection = match selection {
                SelectionKind::Tournament => Selection::tournament(tournament_size, noise),
                SelectionKind::Rank => Selection::rank_based(pressure, noise),
            };
            selection.and_then(|s| solve_instance(&instance, s, &ga, output, verbose))
        }

        Commands::Sweep {
            instance,
            output,
            selection,
            sizes,
            pressures,
            noise_levels,
            trials,
            ga,
            sequential,
            progress,
        } => {
            let bench_config = BenchmarkConfig {
                noise_levels,
                num_trials: trials,
                parallel: !sequential,
                show_progress: progress,
                seed: ga.seed,
            };
            let variants = match selection {
                SelectionKind::Tournament => tournament_variants(&sizes),
                SelectionKind::Rank => rank_variants(&pressures),
            };
            variants.and_then(|v| run_sweep(&instance, &output, &v, &ga, bench_config))
        }

        Commands::Analyze { instance } => analyze_instance(&instance),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_instance(path: &Path) -> GaResult<TspInstance> {
    println!("Loading instance from {:?}...", path);
    TspInstance::from_file(path)
}

fn solve_instance(
    path: &Path,
    selection: Selection,
    ga: &GaArgs,
    output: Option<PathBuf>,
    verbose: bool,
) -> GaResult<()> {
    let instance = load_instance(path)?;
    if verbose {
        println!("{}", instance.statistics());
    }

    let config = ga.to_config(&instance, selection);
    println!(
        "Solving {} with {} (noise {}), {} individuals x {} generations...",
        instance.name,
        selection.label(),
        selection.noise_factor(),
        config.population_size,
        config.num_generations
    );

    let mut engine = GeneticAlgorithm::new(&instance, config)?;
    let solution = engine.run()?;

    println!("\n{}", solution);
    println!(
        "Optimal distance: {:.2} (gap {:.2}%)",
        instance.opt_distance,
        solution.gap_to(instance.opt_distance)
    );

    if verbose {
        println!("\n{:>6} {:>7} {:>12} {:>12} {:>12} {:>12}", "Gen", "Evals", "Min", "Mean", "Std", "Max");
        for stats in engine.history() {
            println!(
                "{:>6} {:>7} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
                stats.generation, stats.evaluations, stats.min, stats.mean, stats.std, stats.max
            );
        }
    }

    if let Some(out_path) = output {
        let json = serde_json::to_string_pretty(&solution)?;
        std::fs::write(&out_path, json)?;
        println!("Solution saved to {:?}", out_path);
    }

    Ok(())
}

fn run_sweep(
    path: &Path,
    output: &Path,
    selections: &[Selection],
    ga: &GaArgs,
    config: BenchmarkConfig,
) -> GaResult<()> {
    let instances = if path.is_dir() {
        load_instances_from_dir(path)?
    } else {
        vec![load_instance(path)?]
    };
    println!("Running noise sweep on {} instance(s)...", instances.len());

    std::fs::create_dir_all(output)?;
    let mut benchmark = Benchmark::new(config)?;

    for instance in &instances {
        let ga_config = ga.to_config(instance, Selection::default());
        println!(
            "  {} ({} cities): {} individuals x {} generations",
            instance.name, instance.tour_size, ga_config.population_size, ga_config.num_generations
        );
        benchmark.run_parameter_sweep(instance, &ga_config, selections)?;
    }

    let results_path = output.join("results.csv");
    benchmark.export_to_csv(&results_path)?;
    println!("\nResults exported to {:?}", results_path);

    let report = benchmark.generate_report();
    println!("\n{}", report);

    let report_path = output.join("report.txt");
    std::fs::write(&report_path, &report)?;
    println!("Report saved to {:?}", report_path);

    Ok(())
}

fn analyze_instance(path: &Path) -> GaResult<()> {
    let instance = load_instance(path)?;

    println!("========== Instance Analysis ==========\n");
    println!("{}", instance.statistics());

    match instance.preset() {
        Some(p) => println!(
            "Preset: {} generations x {} individuals",
            p.num_generations, p.population_size
        ),
        None => println!("Preset: none (100 generations x {} individuals)", 10 * instance.tour_size),
    }

    Ok(())
}
