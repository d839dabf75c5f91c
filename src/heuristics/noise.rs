//! Selection-time fitness noise.
//!
//! The noise model perturbs the fitness values a selection operator sees,
//! never the cached fitness of an individual. Each call draws fresh samples,
//! so two selections in the same generation observe independent noise.
//!
//! Perturbed fitness = true fitness + N(0, sigma), with
//! `sigma = sqrt(noise_factor) * std(population fitness)`. A population whose
//! fitness values are all equal uses a standard deviation of 1 instead of 0.

use crate::error::{GaError, GaResult};
use crate::individual::{fitness_values, Individual};
use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::Normal;
use statrs::statistics::Statistics;

/// A fitness value as seen by one selection call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoisyObservation {
    /// Position of the individual in the population being selected from
    pub index: usize,
    /// True fitness plus the sampled noise
    pub fitness: f64,
}

/// Gaussian noise scaled by the population's fitness spread
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseModel {
    noise_factor: f64,
}

impl Default for NoiseModel {
    fn default() -> Self {
        NoiseModel::noiseless()
    }
}

impl NoiseModel {
    pub fn new(noise_factor: f64) -> GaResult<Self> {
        if !noise_factor.is_finite() || noise_factor < 0.0 {
            return Err(GaError::configuration(format!(
                "noise_factor must be a finite value >= 0, got {}",
                noise_factor
            )));
        }
        Ok(NoiseModel { noise_factor })
    }

    pub fn noiseless() -> Self {
        NoiseModel { noise_factor: 0.0 }
    }

    pub fn noise_factor(&self) -> f64 {
        self.noise_factor
    }

    /// Whether selection has to draw noise at all.
    pub fn is_active(&self) -> bool {
        self.noise_factor > 0.0
    }

    /// Standard deviation of the noise for a population with these fitness values.
    pub fn sigma(&self, fitnesses: &[f64]) -> f64 {
        let mut std = fitnesses.iter().population_std_dev();
        if std == 0.0 || std.is_nan() {
            log::trace!("Degenerate fitness spread, using a nominal standard deviation of 1");
            std = 1.0;
        }
        self.noise_factor.sqrt() * std
    }

    /// Perturb every value independently. With a zero noise factor the values
    /// are returned unchanged and no randomness is consumed.
    pub fn perturb<R: Rng + ?Sized>(&self, fitnesses: &[f64], rng: &mut R) -> GaResult<Vec<f64>> {
        if !self.is_active() {
            return Ok(fitnesses.to_vec());
        }

        let sigma = self.sigma(fitnesses);
        let normal = Normal::new(0.0, sigma).map_err(|e| GaError::Noise(e.to_string()))?;

        Ok(fitnesses
            .iter()
            .map(|&fitness| fitness + normal.sample(rng))
            .collect())
    }

    /// Observe the whole population once, keyed by population index.
    pub fn observe<R: Rng + ?Sized>(
        &self,
        population: &[Individual],
        rng: &mut R,
    ) -> GaResult<Vec<NoisyObservation>> {
        let fitnesses = fitness_values(population)?;
        let observed = self.perturb(&fitnesses, rng)?;

        Ok(observed
            .into_iter()
            .enumerate()
            .map(|(index, fitness)| NoisyObservation { index, fitness })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rejects_negative_factor() {
        assert!(NoiseModel::new(-1.0).is_err());
        assert!(NoiseModel::new(f64::NAN).is_err());
        assert!(NoiseModel::new(0.0).is_ok());
        assert!(NoiseModel::new(4.0).is_ok());
    }

    #[test]
    fn test_noiseless_returns_true_values_without_randomness() {
        let model = NoiseModel::noiseless();
        let values = [10.0, 12.5, 7.25];

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut untouched = ChaCha8Rng::seed_from_u64(11);

        let observed = model.perturb(&values, &mut rng).unwrap();
        assert_eq!(observed, values.to_vec());
        assert_eq!(rng.gen::<u64>(), untouched.gen::<u64>());
    }

    #[test]
    fn test_sigma_scales_with_factor() {
        // population std of [1, 3] is 1
        let values = [1.0, 3.0];
        assert!((NoiseModel::new(1.0).unwrap().sigma(&values) - 1.0).abs() < 1e-12);
        assert!((NoiseModel::new(4.0).unwrap().sigma(&values) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_population_uses_unit_std() {
        let model = NoiseModel::new(4.0).unwrap();
        assert!((model.sigma(&[5.0, 5.0, 5.0]) - 2.0).abs() < 1e-12);

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let observed = model.perturb(&[5.0, 5.0, 5.0], &mut rng).unwrap();
        assert!(observed.iter().any(|&v| v != 5.0));
    }

    #[test]
    fn test_noise_statistics() {
        let model = NoiseModel::new(2.0).unwrap();
        // population std of [0, 10] is 5, so sigma = 5 * sqrt(2)
        let base = [0.0, 10.0];
        let sigma = 5.0 * 2.0_f64.sqrt();
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let mut residuals = Vec::new();
        for _ in 0..20_000 {
            let observed = model.perturb(&base, &mut rng).unwrap();
            residuals.push(observed[0] - base[0]);
            residuals.push(observed[1] - base[1]);
        }

        let mean = residuals.iter().mean();
        let std = residuals.iter().population_std_dev();
        assert!(mean.abs() < 0.15, "mean {mean}");
        assert!((std - sigma).abs() < 0.15, "std {std} vs {sigma}");
    }

    #[test]
    fn test_observe_keeps_individual_fitness() {
        let mut population = vec![
            Individual::new(vec![0, 1, 2]),
            Individual::new(vec![2, 1, 0]),
        ];
        let instance = crate::instance::TspInstance::new(
            "tri",
            vec![
                vec![0.0, 1.0, 4.0],
                vec![2.0, 0.0, 1.0],
                vec![1.0, 3.0, 0.0],
            ],
            3.0,
        )
        .unwrap();
        for ind in population.iter_mut() {
            ind.evaluate(&instance).unwrap();
        }

        let model = NoiseModel::new(1.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let observations = model.observe(&population, &mut rng).unwrap();

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].index, 0);
        assert_eq!(observations[1].index, 1);
        assert_eq!(population[0].fitness(), Some(3.0));
        assert_eq!(population[1].fitness(), Some(9.0));
    }
}
