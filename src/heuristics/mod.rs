//! Search heuristics for the bi-objective dispersion problem.
//!
//! This module exports the construction, local search and GRASP components.

pub mod sampling;
pub mod construction;
pub mod local_search;
pub mod vnd;
pub mod grasp;

pub use construction::BiasedRandomizedConstruction;
pub use grasp::{Grasp, GraspResult, IterationOutcome};
pub use local_search::{
    scheme_for, BestImprove, ExchangeSearch, FastImprove, FirstImprove, ImprovementCriterion, Neighborhood,
};
pub use sampling::{sampler_for, BiasedSampler, Geometric, Triangular};
pub use vnd::{Termination, Vnd, VndOutcome};
