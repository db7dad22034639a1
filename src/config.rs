//! GRASP configuration.
//!
//! Loaded from a JSON file; every strategy switch is a closed enumeration.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// How the construction phase handles the two objectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionApproach {
    /// Alternate the objective at every step inside one construction
    AltInS,
    /// Alternate the objective between constructions (by iteration parity)
    AltBwC,
    MaxSum,
    MaxMin,
}

/// How local search orders and accepts exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocalSearchApproach {
    /// Accept exchanges that Pareto-dominate
    Dom,
    /// Accept strict improvements of the objective chosen by iteration parity
    Alt,
    MaxSum,
    MaxMin,
}

/// Biased distribution used to pick from the sorted candidate list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distribution {
    Geometric,
    Triangular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Variable Neighborhood Descent over every configured neighborhood
    #[serde(rename = "VND")]
    Vnd,
    /// Plain local search on the 1-1 exchange neighborhood
    Single,
}

/// Improvement scheme of the local search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scheme {
    First,
    Best,
    Fast,
}

impl Scheme {
    pub fn name(&self) -> &'static str {
        match self {
            Scheme::First => "First",
            Scheme::Best => "Best",
            Scheme::Fast => "Fast",
        }
    }
}

/// How Fast Improve compares combinations while picking the greedy pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FastComparison {
    /// `<=` / `>=`: later combinations with equal values replace earlier ones
    #[default]
    Lenient,
    /// `<` / `>`
    Strict,
}

/// Time and iteration budgets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Wall-clock budget of the whole run, in seconds
    pub max_time: f64,
    /// Wall-clock budget of one local search call, in seconds
    pub max_local_search_time: f64,
    /// Maximum VND iterations per local search call
    pub max_local_search_it: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        ExecutionLimits {
            max_time: 600.0,
            max_local_search_time: 5.0,
            max_local_search_it: 100,
        }
    }
}

impl ExecutionLimits {
    /// Run budget; a budget too large for a `Duration` saturates
    pub fn max_time(&self) -> Duration {
        seconds(self.max_time)
    }

    pub fn max_local_search_time(&self) -> Duration {
        seconds(self.max_local_search_time)
    }
}

fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// GRASP configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraspConfig {
    /// Multi-objective approach of the construction phase
    #[serde(rename = "mo_approach_C")]
    pub mo_approach_c: ConstructionApproach,
    /// Multi-objective approach of the local search phase
    #[serde(rename = "mo_approach_LS")]
    pub mo_approach_ls: LocalSearchApproach,
    pub distribution: Distribution,
    /// Geometric bias in `[0, 1)`; negative draws a random bias per construction
    pub beta: f64,
    pub strategy: Strategy,
    /// Neighborhood id -> `(k_out, k_in)`, explored in id order
    pub neighborhoods: BTreeMap<u32, (usize, usize)>,
    pub scheme: Scheme,
    pub execution_limits: ExecutionLimits,
    /// GRASP iterations per instance
    pub iterations: usize,
    /// Repetitions of the whole run, each with its own execution number
    pub experiments: u32,
    /// Random seed
    pub seed: u64,
    /// Let Best Improve stop enumerating once `max_local_search_time` is spent
    pub best_improve_time_abort: bool,
    pub fast_comparison: FastComparison,
}

impl Default for GraspConfig {
    fn default() -> Self {
        let mut neighborhoods = BTreeMap::new();
        neighborhoods.insert(1, (1, 1));
        neighborhoods.insert(2, (1, 2));
        neighborhoods.insert(3, (2, 2));

        GraspConfig {
            mo_approach_c: ConstructionApproach::AltBwC,
            mo_approach_ls: LocalSearchApproach::Dom,
            distribution: Distribution::Geometric,
            beta: 0.3,
            strategy: Strategy::Vnd,
            neighborhoods,
            scheme: Scheme::First,
            execution_limits: ExecutionLimits::default(),
            iterations: 100,
            experiments: 1,
            seed: 42,
            best_improve_time_abort: false,
            fast_comparison: FastComparison::Lenient,
        }
    }
}

impl GraspConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("cannot open config file {}", path.display()))?;
        let config: GraspConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("cannot parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.beta < 1.0, "beta must be lower than 1 (got {})", self.beta);
        ensure!(self.iterations > 0, "iterations must be positive");
        ensure!(self.experiments > 0, "experiments must be positive");
        ensure!(!self.neighborhoods.is_empty(), "at least one neighborhood is required");
        for (id, &(k_out, k_in)) in &self.neighborhoods {
            ensure!(
                k_out > 0 && k_in > 0,
                "neighborhood {} must exchange at least one node each way (got {:?})",
                id,
                (k_out, k_in)
            );
        }
        let limits = &self.execution_limits;
        for (name, secs) in [
            ("max_time", limits.max_time),
            ("max_local_search_time", limits.max_local_search_time),
        ] {
            ensure!(
                Duration::try_from_secs_f64(secs).is_ok(),
                "{} must be a non-negative number of seconds (got {})",
                name,
                secs
            );
        }
        Ok(())
    }

    /// Configuration of the `experiment`-th repetition: same parameters, shifted seed
    pub fn for_experiment(&self, experiment: u32) -> Self {
        let mut config = self.clone();
        config.seed = self.seed.wrapping_add(u64::from(experiment));
        config
    }

    /// Neighborhoods explored by the local search, in order
    pub fn active_neighborhoods(&self) -> Vec<(usize, usize)> {
        match self.strategy {
            Strategy::Vnd => self.neighborhoods.values().copied().collect(),
            Strategy::Single => vec![(1, 1)],
        }
    }

    /// Tag identifying the parameterisation, e.g. `IT100_b03_Fir`
    pub fn label(&self) -> String {
        format!("IT{}_b{}_{}", self.iterations, self.beta, &self.scheme.name()[..3]).replace('.', "")
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_experiments(mut self, experiments: u32) -> Self {
        self.experiments = experiments;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_construction_approach(mut self, approach: ConstructionApproach) -> Self {
        self.mo_approach_c = approach;
        self
    }

    pub fn with_local_search_approach(mut self, approach: LocalSearchApproach) -> Self {
        self.mo_approach_ls = approach;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
}
