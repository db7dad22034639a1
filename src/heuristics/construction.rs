//! Biased-randomized construction and deconstruction.
//!
//! Both procedures walk a trajectory of nested selections, one node at a time,
//! and snapshot every selection that satisfies both constraints:
//!
//! - [`BiasedRandomizedConstruction::construct`] grows a selection from a single
//!   random node while the cost ceiling can still be respected.
//! - [`BiasedRandomizedConstruction::deconstruct`] shrinks the full node set while
//!   the capacity floor can still be respected.
//!
//! At each step the candidate list is sorted by the active objective and an entry
//! is drawn with a [`BiasedSampler`](crate::heuristics::sampling::BiasedSampler).

use crate::candidate::{CandidateList, SortKey};
use crate::config::{ConstructionApproach, Distribution, GraspConfig};
use crate::heuristics::sampling::sampler_for;
use crate::instance::Instance;
use crate::solution::{Delta, Objective, Solution};
use rand::{Rng, RngCore};
use std::time::Instant;

/// Biased-randomized greedy construction
#[derive(Debug, Clone)]
pub struct BiasedRandomizedConstruction {
    pub approach: ConstructionApproach,
    pub distribution: Distribution,
    /// Geometric bias; negative draws one per call
    pub beta: f64,
    /// Stop extending the trajectory once this instant is reached
    pub deadline: Option<Instant>,
}

impl BiasedRandomizedConstruction {
    pub fn new(approach: ConstructionApproach, distribution: Distribution, beta: f64) -> Self {
        BiasedRandomizedConstruction {
            approach,
            distribution,
            beta,
            deadline: None,
        }
    }

    pub fn from_config(config: &GraspConfig) -> Self {
        Self::new(config.mo_approach_c, config.distribution, config.beta)
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    fn out_of_time(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Objective for the next step
    fn step_objective(&self, objective: Objective, remaining: usize) -> Objective {
        match self.approach {
            ConstructionApproach::AltInS => Objective::from_parity(remaining),
            _ => objective,
        }
    }

    /// Sort key of a construction step; MaxSum flips a fair coin between distance sum and cost score
    fn step_key(objective: Objective, rng: &mut dyn RngCore) -> SortKey {
        match objective {
            Objective::MaxSum if rng.gen_bool(0.5) => SortKey::Score,
            _ => SortKey::for_objective(objective),
        }
    }

    /// Sort key of a deconstruction step; MaxSum removes by cost score alone
    fn removal_key(objective: Objective) -> SortKey {
        match objective {
            Objective::MaxSum => SortKey::Score,
            Objective::MaxMin => SortKey::for_objective(objective),
        }
    }

    /// Grow a trajectory from a uniformly drawn first node
    pub fn construct<'a>(
        &self,
        instance: &'a Instance,
        objective: Objective,
        rng: &mut dyn RngCore,
    ) -> Vec<Solution<'a>> {
        let start = rng.gen_range(0..instance.len());
        self.construct_from(instance, objective, start, rng)
    }

    /// Grow a trajectory from a given first node.
    ///
    /// Returns every feasible selection met along the way, or a single
    /// [`Solution::no_feasible`] marker when there is none.
    pub fn construct_from<'a>(
        &self,
        instance: &'a Instance,
        objective: Objective,
        start: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Solution<'a>> {
        let sampler = sampler_for(self.distribution, self.beta, rng);
        let mut objective = objective;
        let mut snapshots = Vec::new();

        let mut solution = Solution::new(instance);
        solution.add(start, None);
        let mut candidates = CandidateList::build(&solution, Some(start));
        if solution.is_feasible() {
            snapshots.push(solution.clone());
        }

        while solution.satisfies_cost(&[], &[]) && !candidates.is_empty() {
            if self.out_of_time() {
                log::debug!("Construction stopped by the time limit");
                break;
            }
            objective = self.step_objective(objective, candidates.len());

            candidates.retain(|c| solution.satisfies_cost(&[c.node], &[]));
            if candidates.is_empty() {
                break;
            }
            candidates.sort_descending(Self::step_key(objective, rng));

            let chosen = candidates.take(sampler.sample_index(candidates.len(), rng));
            solution.add(
                chosen.node,
                Some(Delta {
                    min_distance: chosen.min_distance,
                    sum_variation: chosen.sum_distance,
                }),
            );
            candidates.on_added(&solution, chosen.node);
            log::trace!("Added node {} ({} objective)", chosen.node, objective.name());

            if solution.is_feasible() {
                snapshots.push(solution.clone());
            }
        }

        Self::finish(instance, snapshots)
    }

    /// Shrink a trajectory starting from the full node set
    pub fn deconstruct<'a>(
        &self,
        instance: &'a Instance,
        objective: Objective,
        rng: &mut dyn RngCore,
    ) -> Vec<Solution<'a>> {
        let sampler = sampler_for(self.distribution, self.beta, rng);
        let mut objective = objective;
        let mut snapshots = Vec::new();

        let all: Vec<usize> = (0..instance.len()).collect();
        let mut solution = Solution::from_nodes(instance, &all);
        let mut candidates = CandidateList::build(&solution, None);
        if solution.is_feasible() {
            snapshots.push(solution.clone());
        }

        while solution.satisfies_capacity(&[], &[]) && !candidates.is_empty() {
            if self.out_of_time() {
                log::debug!("Deconstruction stopped by the time limit");
                break;
            }
            objective = self.step_objective(objective, candidates.len());

            candidates.retain(|c| solution.satisfies_capacity(&[], &[c.node]));
            if candidates.is_empty() {
                break;
            }
            candidates.sort_ascending(Self::removal_key(objective));

            let chosen = candidates.take(sampler.sample_index(candidates.len(), rng));
            solution.remove(
                chosen.node,
                Some(Delta {
                    min_distance: chosen.min_distance,
                    sum_variation: chosen.sum_distance,
                }),
            );
            candidates.on_removed(&solution, chosen.node);
            log::trace!("Removed node {} ({} objective)", chosen.node, objective.name());

            if solution.is_feasible() {
                snapshots.push(solution.clone());
            }
        }

        Self::finish(instance, snapshots)
    }

    fn finish<'a>(instance: &'a Instance, snapshots: Vec<Solution<'a>>) -> Vec<Solution<'a>> {
        if snapshots.is_empty() {
            log::debug!("No feasible solution reached in the construction phase");
            vec![Solution::no_feasible(instance)]
        } else {
            snapshots
        }
    }
}
