//! Module for loading and representing TSP instances.
//!
//! An instance is a precomputed square matrix of edge costs plus the size of
//! a tour. It is produced by an external converter as a JSON record with the
//! fields `TourSize`, `OptDistance` and `DistanceMatrix`. Asymmetric matrices
//! are allowed: the evaluator never assumes `d[i][j] == d[j][i]`.

use crate::error::{GaError, GaResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Generation and population sizes used for the reference instances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstancePreset {
    pub name: &'static str,
    pub num_generations: usize,
    pub population_size: usize,
    /// Best known tour cost
    pub opt_distance: f64,
}

/// Parameters tuned per reference instance (generations x population).
pub const PRESETS: [InstancePreset; 8] = [
    InstancePreset { name: "burma14", num_generations: 100, population_size: 140, opt_distance: 3323.0 },
    InstancePreset { name: "ulysses16", num_generations: 150, population_size: 160, opt_distance: 6859.0 },
    InstancePreset { name: "ulysses22", num_generations: 200, population_size: 220, opt_distance: 7013.0 },
    InstancePreset { name: "bays29", num_generations: 800, population_size: 290, opt_distance: 2020.0 },
    InstancePreset { name: "dantzig42", num_generations: 900, population_size: 420, opt_distance: 699.0 },
    InstancePreset { name: "att48", num_generations: 400, population_size: 480, opt_distance: 10628.0 },
    InstancePreset { name: "eil51", num_generations: 1000, population_size: 510, opt_distance: 426.0 },
    InstancePreset { name: "eil76", num_generations: 700, population_size: 760, opt_distance: 538.0 },
];

/// Look up the preset of a reference instance by name.
pub fn preset(name: &str) -> Option<&'static InstancePreset> {
    PRESETS.iter().find(|p| p.name == name)
}

/// Represents a complete TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TspInstance {
    /// Name of the instance (file stem when loaded from disk)
    #[serde(skip)]
    pub name: String,
    /// Number of cities in a tour
    #[serde(rename = "TourSize")]
    pub tour_size: usize,
    /// Known optimal tour cost, only used for reporting
    #[serde(rename = "OptDistance")]
    pub opt_distance: f64,
    /// Pairwise edge costs, `distance_matrix[from][to]`
    #[serde(rename = "DistanceMatrix")]
    pub distance_matrix: Vec<Vec<f64>>,
}

impl TspInstance {
    /// Build an instance from an in-memory matrix. The tour size is the
    /// matrix dimension.
    pub fn new(name: &str, distance_matrix: Vec<Vec<f64>>, opt_distance: f64) -> GaResult<Self> {
        let instance = TspInstance {
            name: name.to_string(),
            tour_size: distance_matrix.len(),
            opt_distance,
            distance_matrix,
        };
        instance.validate()?;
        Ok(instance)
    }

    /// Parse the converter's JSON record.
    pub fn from_json_str(name: &str, json: &str) -> GaResult<Self> {
        let mut instance: TspInstance = serde_json::from_str(json)?;
        instance.name = name.to_string();
        instance.validate()?;
        Ok(instance)
    }

    /// Load an instance from a JSON file; the file stem becomes its name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> GaResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let instance = Self::from_json_str(&name, &json)?;
        log::info!(
            "Loaded instance {} ({} cities) from {:?}",
            instance.name,
            instance.tour_size,
            path
        );
        Ok(instance)
    }

    /// Reject instances no population can be seeded for.
    pub fn validate(&self) -> GaResult<()> {
        if self.tour_size <= 1 {
            return Err(GaError::invalid_instance(format!(
                "tour size must be greater than 1, got {}",
                self.tour_size
            )));
        }
        if self.distance_matrix.len() != self.tour_size {
            return Err(GaError::invalid_instance(format!(
                "tour size {} does not match a matrix with {} rows",
                self.tour_size,
                self.distance_matrix.len()
            )));
        }
        for (i, row) in self.distance_matrix.iter().enumerate() {
            if row.len() != self.tour_size {
                return Err(GaError::invalid_instance(format!(
                    "matrix is not square: row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    self.tour_size
                )));
            }
            if let Some(j) = row.iter().position(|d| !d.is_finite() || *d < 0.0) {
                return Err(GaError::invalid_instance(format!(
                    "distance [{}][{}] = {} is not a non-negative finite cost",
                    i, j, row[j]
                )));
            }
        }
        Ok(())
    }

    /// Get the cost of the edge `from -> to`
    #[inline]
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distance_matrix[from][to]
    }

    fn checked_distance(&self, from: usize, to: usize) -> GaResult<f64> {
        let row = self.distance_matrix.get(from).ok_or(GaError::GeneOutOfRange {
            gene: from,
            tour_size: self.tour_size,
        })?;
        row.get(to).copied().ok_or(GaError::GeneOutOfRange {
            gene: to,
            tour_size: self.tour_size,
        })
    }

    /// Closed tour cost: every consecutive edge plus the edge from the last
    /// city back to the first.
    ///
    /// The permutation property is not checked here; only out-of-range genes
    /// are reported.
    pub fn evaluate(&self, tour: &[usize]) -> GaResult<f64> {
        let (first, last) = match (tour.first(), tour.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Ok(0.0),
        };

        let mut length = self.checked_distance(last, first)?;
        for pair in tour.windows(2) {
            length += self.checked_distance(pair[0], pair[1])?;
        }

        Ok(length)
    }

    /// Whether `d[i][j] == d[j][i]` for every pair of cities.
    pub fn is_symmetric(&self) -> bool {
        (0..self.tour_size).all(|i| {
            (i + 1..self.tour_size).all(|j| self.distance(i, j) == self.distance(j, i))
        })
    }

    /// Preset parameters when this is one of the reference instances.
    pub fn preset(&self) -> Option<&'static InstancePreset> {
        preset(&self.name)
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let mut distances: Vec<f64> = Vec::new();
        for i in 0..self.tour_size {
            for j in 0..self.tour_size {
                if i != j {
                    distances.push(self.distance(i, j));
                }
            }
        }
        let avg_distance = if distances.is_empty() {
            0.0
        } else {
            distances.iter().sum::<f64>() / distances.len() as f64
        };
        let max_distance = distances.iter().cloned().fold(0.0, f64::max);

        InstanceStatistics {
            name: self.name.clone(),
            tour_size: self.tour_size,
            opt_distance: self.opt_distance,
            symmetric: self.is_symmetric(),
            avg_distance,
            max_distance,
        }
    }
}

/// Statistics about a TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub tour_size: usize,
    pub opt_distance: f64,
    pub symmetric: bool,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Cities: {}", self.tour_size)?;
        writeln!(f, "  Optimal distance: {:.2}", self.opt_distance)?;
        writeln!(f, "  Symmetric: {}", self.symmetric)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_city() -> TspInstance {
        TspInstance::new(
            "four",
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

    fn asymmetric() -> TspInstance {
        TspInstance::new(
            "asym",
            vec![
                vec![0.0, 1.0, 10.0],
                vec![10.0, 0.0, 1.0],
                vec![1.0, 10.0, 0.0],
            ],
            3.0,
        )
        .unwrap()
    }

    #[test]
    fn test_evaluate_closed_tour() {
        let instance = four_city();
        assert_eq!(instance.evaluate(&[0, 1, 2, 3]).unwrap(), 14.0);
        // 0-2-1-3-0 = 2 + 4 + 5 + 3
        assert_eq!(instance.evaluate(&[0, 2, 1, 3]).unwrap(), 14.0);
        // 0-1-3-2-0 = 1 + 5 + 6 + 2
        assert_eq!(instance.evaluate(&[0, 1, 3, 2]).unwrap(), 14.0);
    }

    #[test]
    fn test_evaluate_rotation_invariant() {
        let instance = asymmetric();
        let tour = [0, 1, 2];
        let expected = instance.evaluate(&tour).unwrap();
        assert_eq!(instance.evaluate(&[1, 2, 0]).unwrap(), expected);
        assert_eq!(instance.evaluate(&[2, 0, 1]).unwrap(), expected);

        let symmetric = four_city();
        let cost = symmetric.evaluate(&[3, 1, 0, 2]).unwrap();
        assert_eq!(symmetric.evaluate(&[1, 0, 2, 3]).unwrap(), cost);
    }

    #[test]
    fn test_evaluate_reversal() {
        let symmetric = four_city();
        assert_eq!(
            symmetric.evaluate(&[0, 2, 3, 1]).unwrap(),
            symmetric.evaluate(&[1, 3, 2, 0]).unwrap()
        );

        let asym = asymmetric();
        assert_eq!(asym.evaluate(&[0, 1, 2]).unwrap(), 3.0);
        assert_eq!(asym.evaluate(&[2, 1, 0]).unwrap(), 30.0);
    }

    #[test]
    fn test_evaluate_idempotent() {
        let instance = four_city();
        let first = instance.evaluate(&[3, 0, 2, 1]).unwrap();
        let second = instance.evaluate(&[3, 0, 2, 1]).unwrap();
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn test_evaluate_out_of_range_gene() {
        let instance = four_city();
        match instance.evaluate(&[0, 1, 7, 3]) {
            Err(GaError::GeneOutOfRange { gene, tour_size }) => {
                assert_eq!(gene, 7);
                assert_eq!(tour_size, 4);
            }
            other => panic!("expected GeneOutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_invalid_instances() {
        assert!(TspInstance::new("one", vec![vec![0.0]], 0.0).is_err());
        assert!(TspInstance::new("ragged", vec![vec![0.0, 1.0], vec![1.0]], 0.0).is_err());
        assert!(TspInstance::new("neg", vec![vec![0.0, -1.0], vec![1.0, 0.0]], 0.0).is_err());

        let json = r#"{"TourSize": 3, "OptDistance": 2, "DistanceMatrix": [[0, 1], [1, 0]]}"#;
        assert!(matches!(
            TspInstance::from_json_str("mismatch", json),
            Err(GaError::InvalidInstance { .. })
        ));
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "TourSize": 3,
            "OptDistance": 6,
            "DistanceMatrix": [
                [0.0, 1.0, 2.0],
                [1.0, 0.0, 3.0],
                [2.0, 3.0, 0.0]
            ]
        }"#;
        let instance = TspInstance::from_json_str("tri", json).unwrap();
        assert_eq!(instance.name, "tri");
        assert_eq!(instance.tour_size, 3);
        assert_eq!(instance.opt_distance, 6.0);
        assert_eq!(instance.distance(1, 2), 3.0);
        assert!(instance.is_symmetric());
    }

    #[test]
    fn test_presets() {
        let burma = preset("burma14").unwrap();
        assert_eq!(burma.num_generations, 100);
        assert_eq!(burma.population_size, 140);
        assert_eq!(burma.opt_distance, 3323.0);

        let att = preset("att48").unwrap();
        assert_eq!((att.num_generations, att.population_size), (400, 480));

        assert!(preset("unknown").is_none());
    }

    #[test]
    fn test_statistics() {
        let stats = four_city().statistics();
        assert_eq!(stats.tour_size, 4);
        assert!(stats.symmetric);
        assert_eq!(stats.max_distance, 6.0);
        assert!((stats.avg_distance - 3.5).abs() < 1e-12);
        assert!(!asymmetric().statistics().symmetric);
    }
}
