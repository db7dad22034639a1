//! Bi-objective dispersion GRASP
//!
//! Selects a subset of nodes that maximizes both the sum of pairwise distances
//! (MaxSum) and the minimum pairwise distance (MaxMin), with the total cost kept
//! strictly below a ceiling `K` and the total capacity strictly above a floor `B`.
//!
//! # Features
//!
//! - Incremental objective bookkeeping on insertion and removal
//! - Biased-randomized construction and deconstruction (Geometric, Triangular)
//! - First, Best and Fast improvement over k-for-k node exchanges
//! - Variable Neighborhood Descent
//! - Pareto non-dominated filtering and CSV result collection
//!
//! # Example
//!
//! ```no_run
//! use dispersion_grasp::config::GraspConfig;
//! use dispersion_grasp::heuristics::Grasp;
//! use dispersion_grasp::instance::Instance;
//!
//! // Load instance and configuration
//! let instance = Instance::from_file("instance.json").unwrap();
//! let config = GraspConfig::from_file("config.json").unwrap();
//!
//! // Run the GRASP iterations on every core
//! let result = Grasp::new(config).run_parallel(&instance);
//!
//! for solution in result.front() {
//!     println!("{} -> ({:.2}, {:.2})", solution.node_list(), solution.max_sum(), solution.objectives().max_min);
//! }
//! ```

pub mod instance;
pub mod solution;
pub mod candidate;
pub mod dominance;
pub mod config;
pub mod heuristics;
pub mod results;

pub use config::GraspConfig;
pub use heuristics::Grasp;
pub use instance::Instance;
pub use solution::Solution;
