//! Module for loading and representing dispersion instances.
//!
//! An instance is a complete weighted graph given by a symmetric distance matrix,
//! together with a cost and a capacity weight per node, a cost ceiling `K` and a
//! capacity floor `B`. Instances are read-only once built and are shared by
//! reference between every solution derived from them.

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tolerance used when checking the symmetry of the distance matrix
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// On-disk layout of an instance (JSON)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstanceFile {
    #[serde(default)]
    name: Option<String>,
    n: usize,
    d: Vec<Vec<f64>>,
    a: Vec<f64>,
    c: Vec<f64>,
    #[serde(rename = "K")]
    k: f64,
    #[serde(rename = "B")]
    b: f64,
}

/// Represents a complete bi-objective dispersion instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Name of the instance
    pub name: String,
    /// Number of nodes
    n: usize,
    /// Symmetric distance matrix with zero diagonal
    distances: Vec<Vec<f64>>,
    /// Cost weight of every node (`a`)
    costs: Vec<f64>,
    /// Capacity weight of every node (`c`)
    capacities: Vec<f64>,
    /// Cost ceiling `K` (total cost must stay strictly below)
    cost_limit: f64,
    /// Capacity floor `B` (total capacity must stay strictly above)
    capacity_floor: f64,
}

impl Instance {
    /// Build an instance, rejecting malformed data.
    ///
    /// Fails if `costs` or `capacities` do not have one entry per node, or if the
    /// distance matrix is not square, not symmetric, has a non-zero diagonal or
    /// contains non-finite values.
    pub fn new(
        name: impl Into<String>,
        distances: Vec<Vec<f64>>,
        costs: Vec<f64>,
        capacities: Vec<f64>,
        cost_limit: f64,
        capacity_floor: f64,
    ) -> Result<Self> {
        let n = distances.len();
        ensure!(n > 0, "instance has no nodes");
        ensure!(
            costs.len() == n,
            "cost vector has {} entries, expected {}",
            costs.len(),
            n
        );
        ensure!(
            capacities.len() == n,
            "capacity vector has {} entries, expected {}",
            capacities.len(),
            n
        );

        for (i, row) in distances.iter().enumerate() {
            ensure!(
                row.len() == n,
                "distance matrix is not square: row {} has {} entries, expected {}",
                i,
                row.len(),
                n
            );
        }

        for i in 0..n {
            ensure!(
                distances[i][i] == 0.0,
                "distance matrix diagonal must be zero (d[{}][{}] = {})",
                i,
                i,
                distances[i][i]
            );
            for j in i + 1..n {
                let (dij, dji) = (distances[i][j], distances[j][i]);
                ensure!(
                    dij.is_finite() && dji.is_finite(),
                    "distance between {} and {} is not finite",
                    i,
                    j
                );
                if (dij - dji).abs() > SYMMETRY_TOLERANCE {
                    bail!(
                        "distance matrix is not symmetric: d[{}][{}] = {} but d[{}][{}] = {}",
                        i,
                        j,
                        dij,
                        j,
                        i,
                        dji
                    );
                }
            }
        }

        ensure!(
            costs.iter().chain(capacities.iter()).all(|w| w.is_finite()),
            "node weights must be finite"
        );
        ensure!(
            cost_limit.is_finite() && capacity_floor.is_finite(),
            "cost ceiling and capacity floor must be finite"
        );

        Ok(Instance {
            name: name.into(),
            n,
            distances,
            costs,
            capacities,
            cost_limit,
            capacity_floor,
        })
    }

    /// Parse an instance from a JSON file `{name?, n, d, a, c, K, B}`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("cannot open instance file {}", path.display()))?;
        let raw: InstanceFile = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("cannot parse instance file {}", path.display()))?;

        ensure!(
            raw.n == raw.d.len(),
            "declared node count n = {} does not match distance matrix size {}",
            raw.n,
            raw.d.len()
        );

        let name = raw.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Self::new(name, raw.d, raw.a, raw.c, raw.k, raw.b)
            .with_context(|| format!("invalid instance {}", path.display()))
    }

    /// Number of nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Get the distance between two nodes
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distances[i][j]
    }

    /// Cost weight of a node
    #[inline]
    pub fn cost(&self, node: usize) -> f64 {
        self.costs[node]
    }

    /// Capacity weight of a node
    #[inline]
    pub fn capacity(&self, node: usize) -> f64 {
        self.capacities[node]
    }

    /// Cost ceiling `K`
    #[inline]
    pub fn cost_limit(&self) -> f64 {
        self.cost_limit
    }

    /// Capacity floor `B`
    #[inline]
    pub fn capacity_floor(&self) -> f64 {
        self.capacity_floor
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn capacities(&self) -> &[f64] {
        &self.capacities
    }

    /// Sum of the pairwise distances inside a group of nodes
    pub fn pairwise_sum(&self, nodes: &[usize]) -> f64 {
        let mut sum = 0.0;
        for (i, &u) in nodes.iter().enumerate() {
            for &v in &nodes[i + 1..] {
                sum += self.distance(u, v);
            }
        }
        sum
    }

    /// Minimum pairwise distance inside a group of nodes (`None` for fewer than two nodes)
    pub fn pairwise_min(&self, nodes: &[usize]) -> Option<f64> {
        let mut min: Option<f64> = None;
        for (i, &u) in nodes.iter().enumerate() {
            for &v in &nodes[i + 1..] {
                let d = self.distance(u, v);
                min = Some(min.map_or(d, |m| m.min(d)));
            }
        }
        min
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let mut pairs = 0usize;
        let mut total_distance = 0.0;
        let mut max_distance: f64 = 0.0;
        for i in 0..self.n {
            for j in i + 1..self.n {
                let d = self.distance(i, j);
                total_distance += d;
                max_distance = max_distance.max(d);
                pairs += 1;
            }
        }
        let avg_distance = if pairs > 0 { total_distance / pairs as f64 } else { 0.0 };

        InstanceStatistics {
            name: self.name.clone(),
            nodes: self.n,
            cost_limit: self.cost_limit,
            capacity_floor: self.capacity_floor,
            total_cost: self.costs.iter().sum(),
            total_capacity: self.capacities.iter().sum(),
            avg_distance,
            max_distance,
        }
    }
}

/// Statistics about a dispersion instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub nodes: usize,
    pub cost_limit: f64,
    pub capacity_floor: f64,
    pub total_cost: f64,
    pub total_capacity: f64,
    pub avg_distance: f64,
    pub max_distance: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {}", self.nodes)?;
        writeln!(f, "  Cost ceiling K: {}", self.cost_limit)?;
        writeln!(f, "  Capacity floor B: {}", self.capacity_floor)?;
        writeln!(f, "  Total node cost: {:.2}", self.total_cost)?;
        writeln!(f, "  Total node capacity: {:.2}", self.total_capacity)?;
        writeln!(f, "  Avg distance: {:.2}", self.avg_distance)?;
        writeln!(f, "  Max distance: {:.2}", self.max_distance)
    }
}
