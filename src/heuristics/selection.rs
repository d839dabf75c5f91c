//! Parent selection operators.
//!
//! Two strategies are compared under noise:
//! - [`TournamentSelection`]: best of `size` individuals drawn with replacement.
//! - [`RankBasedSelection`]: linear ranking followed by roulette-wheel sampling
//!   over the rank weights.
//!
//! Both minimise tour cost. Selection returns population indices; the same
//! index may appear several times. When the noise factor is positive, the
//! whole population is observed through the [`NoiseModel`] once per call and
//! all comparisons in that call use the observed values.

use crate::error::{GaError, GaResult};
use crate::heuristics::noise::{NoiseModel, NoisyObservation};
use crate::individual::Individual;
use ordered_float::OrderedFloat;
use rand::Rng;

/// Chooses `k` parents from a population
pub trait SelectionOperator {
    /// Indices of the selected individuals, in draw order.
    fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual],
        k: usize,
        rng: &mut R,
    ) -> GaResult<Vec<usize>>;

    fn noise(&self) -> NoiseModel;
}

fn ensure_not_empty(population: &[Individual], k: usize) -> GaResult<()> {
    if population.is_empty() && k > 0 {
        return Err(GaError::configuration("cannot select from an empty population"));
    }
    Ok(())
}

/// Tournament selection with optional noisy comparisons
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TournamentSelection {
    /// Number of aspirants per tournament
    pub size: usize,
    pub noise: NoiseModel,
}

impl TournamentSelection {
    pub fn new(size: usize, noise_factor: f64) -> GaResult<Self> {
        if size == 0 {
            return Err(GaError::configuration("tournament size must be at least 1"));
        }
        Ok(TournamentSelection {
            size,
            noise: NoiseModel::new(noise_factor)?,
        })
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        TournamentSelection {
            size: 2,
            noise: NoiseModel::noiseless(),
        }
    }
}

/// Lowest observed fitness among the aspirants; ties go to the first drawn.
fn tournament_winner(aspirants: &[usize], observed: &[NoisyObservation]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for &idx in aspirants {
        match best {
            Some(b) if observed[idx].fitness >= observed[b].fitness => {}
            _ => best = Some(idx),
        }
    }
    best
}

impl SelectionOperator for TournamentSelection {
    fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual],
        k: usize,
        rng: &mut R,
    ) -> GaResult<Vec<usize>> {
        ensure_not_empty(population, k)?;
        let observed = self.noise.observe(population, rng)?;
        let n = population.len();

        let mut chosen = Vec::with_capacity(k);
        let mut aspirants = Vec::with_capacity(self.size);
        for _ in 0..k {
            aspirants.clear();
            aspirants.extend((0..self.size).map(|_| rng.gen_range(0..n)));
            if let Some(winner) = tournament_winner(&aspirants, &observed) {
                chosen.push(winner);
            }
        }

        Ok(chosen)
    }

    fn noise(&self) -> NoiseModel {
        self.noise
    }
}

/// Linear rank selection with roulette-wheel sampling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankBasedSelection {
    /// Selection pressure in (1, 2]
    pub pressure: f64,
    pub noise: NoiseModel,
}

impl RankBasedSelection {
    pub fn new(pressure: f64, noise_factor: f64) -> GaResult<Self> {
        if !(pressure > 1.0 && pressure <= 2.0) {
            return Err(GaError::configuration(format!(
                "selection pressure must lie in (1, 2], got {}",
                pressure
            )));
        }
        Ok(RankBasedSelection {
            pressure,
            noise: NoiseModel::new(noise_factor)?,
        })
    }
}

impl Default for RankBasedSelection {
    fn default() -> Self {
        RankBasedSelection {
            pressure: 1.1,
            noise: NoiseModel::noiseless(),
        }
    }
}

/// Weight of each rank position, best (position 0) first.
///
/// `w(i) = (2 - P) + 2 (P - 1) (n - 1 - i) / (n - 1)`
pub fn rank_weights(n: usize, pressure: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![2.0 - pressure];
    }
    let last = (n - 1) as f64;
    (0..n)
        .map(|i| (2.0 - pressure) + 2.0 * (pressure - 1.0) * (last - i as f64) / last)
        .collect()
}

impl SelectionOperator for RankBasedSelection {
    fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual],
        k: usize,
        rng: &mut R,
    ) -> GaResult<Vec<usize>> {
        ensure_not_empty(population, k)?;
        let mut ranked = self.noise.observe(population, rng)?;
        match ranked.len() {
            0 => return Ok(Vec::new()),
            1 => return Ok(vec![0; k]),
            _ => {}
        }

        // stable: equal fitness keeps population order
        ranked.sort_by_key(|obs| OrderedFloat(obs.fitness));

        let weights = rank_weights(ranked.len(), self.pressure);
        let total: f64 = weights.iter().sum();

        let mut chosen = Vec::with_capacity(k);
        for _ in 0..k {
            let spin = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut landed = None;
            for (obs, weight) in ranked.iter().zip(&weights) {
                cumulative += weight;
                if cumulative > spin {
                    landed = Some(obs.index);
                    break;
                }
            }
            // rounding can leave the spin just past the last boundary
            chosen.push(landed.unwrap_or(ranked[ranked.len() - 1].index));
        }

        Ok(chosen)
    }

    fn noise(&self) -> NoiseModel {
        self.noise
    }
}

/// Selection strategy used by the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection {
    Tournament(TournamentSelection),
    RankBased(RankBasedSelection),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(TournamentSelection::default())
    }
}

impl Selection {
    pub fn tournament(size: usize, noise_factor: f64) -> GaResult<Self> {
        Ok(Selection::Tournament(TournamentSelection::new(size, noise_factor)?))
    }

    pub fn rank_based(pressure: f64, noise_factor: f64) -> GaResult<Self> {
        Ok(Selection::RankBased(RankBasedSelection::new(pressure, noise_factor)?))
    }

    /// Same strategy with a different noise level.
    pub fn with_noise_factor(self, noise_factor: f64) -> GaResult<Self> {
        match self {
            Selection::Tournament(t) => Selection::tournament(t.size, noise_factor),
            Selection::RankBased(r) => Selection::rank_based(r.pressure, noise_factor),
        }
    }

    pub fn noise_factor(&self) -> f64 {
        self.noise().noise_factor()
    }

    /// Re-run the constructor checks, for values built field by field.
    pub fn validate(&self) -> GaResult<()> {
        self.with_noise_factor(self.noise_factor()).map(|_| ())
    }

    /// Short description used in reports
    pub fn label(&self) -> String {
        match self {
            Selection::Tournament(t) => format!("tournament(size={})", t.size),
            Selection::RankBased(r) => format!("rank(pressure={:.1})", r.pressure),
        }
    }
}

impl SelectionOperator for Selection {
    fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual],
        k: usize,
        rng: &mut R,
    ) -> GaResult<Vec<usize>> {
        match self {
            Selection::Tournament(t) => t.select(population, k, rng),
            Selection::RankBased(r) => r.select(population, k, rng),
        }
    }

    fn noise(&self) -> NoiseModel {
        match self {
            Selection::Tournament(t) => t.noise,
            Selection::RankBased(r) => r.noise,
        }
    }
}
