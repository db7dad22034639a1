//! GRASP driver.
//!
//! Every iteration builds a trajectory of feasible selections (construction on
//! iterations `i % 4 ∈ {0, 1}`, deconstruction otherwise), then refines the first
//! and the last snapshot with the VND. Iteration `i` draws from its own ChaCha
//! stream, so iterations are independent and can run in parallel.

use crate::config::{ConstructionApproach, GraspConfig};
use crate::dominance::filter_nondominated;
use crate::heuristics::construction::BiasedRandomizedConstruction;
use crate::heuristics::vnd::Vnd;
use crate::instance::Instance;
use crate::solution::{Objective, Solution};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Solutions produced by one GRASP iteration
#[derive(Debug, Clone)]
pub struct IterationOutcome<'a> {
    pub iteration: usize,
    /// Trajectory as built, before local search
    pub constructed: Vec<Solution<'a>>,
    /// Same trajectory with its first and last snapshots refined
    pub solutions: Vec<Solution<'a>>,
}

/// Result of a GRASP run
#[derive(Debug, Clone)]
pub struct GraspResult<'a> {
    pub constructed: Vec<Solution<'a>>,
    pub solutions: Vec<Solution<'a>>,
    /// `nondominated[i]` tells whether `solutions[i]` is on the front
    pub nondominated: Vec<bool>,
    pub elapsed: Duration,
    /// Iterations actually started
    pub iterations: usize,
}

impl<'a> GraspResult<'a> {
    /// Solutions that no other solution of the run dominates
    pub fn front(&self) -> impl Iterator<Item = &Solution<'a>> + '_ {
        self.solutions
            .iter()
            .zip(&self.nondominated)
            .filter(|(_, &keep)| keep)
            .map(|(s, _)| s)
    }

    pub fn front_size(&self) -> usize {
        self.nondominated.iter().filter(|&&keep| keep).count()
    }
}

/// Greedy Randomized Adaptive Search Procedure
#[derive(Debug)]
pub struct Grasp {
    config: GraspConfig,
    construction: BiasedRandomizedConstruction,
    vnd: Vnd,
}

impl Grasp {
    pub fn new(config: GraspConfig) -> Self {
        let construction = BiasedRandomizedConstruction::from_config(&config);
        let vnd = Vnd::from_config(&config);
        Grasp {
            config,
            construction,
            vnd,
        }
    }

    pub fn config(&self) -> &GraspConfig {
        &self.config
    }

    /// Random stream of iteration `iteration`
    pub fn rng_for(&self, iteration: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(iteration as u64);
        rng
    }

    /// Objective handed to the construction of iteration `iteration`
    pub fn construction_objective(&self, iteration: usize) -> Objective {
        match self.config.mo_approach_c {
            ConstructionApproach::MaxSum => Objective::MaxSum,
            ConstructionApproach::MaxMin => Objective::MaxMin,
            ConstructionApproach::AltBwC | ConstructionApproach::AltInS => Objective::from_parity(iteration),
        }
    }

    /// Build one trajectory and refine its ends
    pub fn run_iteration<'a>(
        &self,
        instance: &'a Instance,
        iteration: usize,
        deadline: Option<Instant>,
    ) -> IterationOutcome<'a> {
        let mut rng = self.rng_for(iteration);
        let objective = self.construction_objective(iteration);
        let construction = self.construction.clone().with_deadline(deadline);

        let mut solutions = if iteration % 4 < 2 {
            construction.construct(instance, objective, &mut rng)
        } else {
            construction.deconstruct(instance, objective, &mut rng)
        };
        let constructed = solutions.clone();

        let last = solutions.len().saturating_sub(1);
        let targets = if last > 0 { vec![0, last] } else { vec![0] };
        for idx in targets {
            if let Some(solution) = solutions.get_mut(idx) {
                if !solution.is_empty() {
                    self.vnd.improve(solution);
                }
            }
        }

        IterationOutcome {
            iteration,
            constructed,
            solutions,
        }
    }

    /// Run every iteration sequentially
    pub fn run<'a>(&self, instance: &'a Instance) -> GraspResult<'a> {
        self.run_with_progress(instance, |_| {})
    }

    /// Run every iteration sequentially, reporting each finished iteration
    pub fn run_with_progress<'a, F>(&self, instance: &'a Instance, mut on_iteration: F) -> GraspResult<'a>
    where
        F: FnMut(&IterationOutcome<'a>),
    {
        let start = Instant::now();
        let max_time = self.config.execution_limits.max_time();
        let deadline = start.checked_add(max_time);
        self.log_start(instance);

        let mut outcomes = Vec::with_capacity(self.config.iterations);
        for i in 0..self.config.iterations {
            if start.elapsed() > max_time {
                log::info!("Maximum allowed execution time is exceeded. Total IT: {}", i);
                break;
            }
            log::debug!("Finding solution #{}", i + 1);
            let outcome = self.run_iteration(instance, i, deadline);
            on_iteration(&outcome);
            outcomes.push(outcome);
        }

        self.gather(instance, outcomes, start)
    }

    /// Run the iterations on the rayon thread pool.
    ///
    /// Gives the same solutions as [`Grasp::run`] as long as the time budget is not hit.
    pub fn run_parallel<'a>(&self, instance: &'a Instance) -> GraspResult<'a> {
        let start = Instant::now();
        let max_time = self.config.execution_limits.max_time();
        let deadline = start.checked_add(max_time);
        self.log_start(instance);

        let outcomes: Vec<IterationOutcome<'a>> = (0..self.config.iterations)
            .into_par_iter()
            .filter_map(|i| {
                if start.elapsed() > max_time {
                    None
                } else {
                    Some(self.run_iteration(instance, i, deadline))
                }
            })
            .collect();

        self.gather(instance, outcomes, start)
    }

    fn log_start(&self, instance: &Instance) {
        log::info!(
            "Solving instance {} with {} GRASP iterations ({:?} construction, {} {:?} local search)",
            instance.name,
            self.config.iterations,
            self.config.mo_approach_c,
            self.config.scheme.name(),
            self.config.strategy
        );
    }

    fn gather<'a>(&self, instance: &Instance, outcomes: Vec<IterationOutcome<'a>>, start: Instant) -> GraspResult<'a> {
        let iterations = outcomes.len();
        let mut constructed = Vec::new();
        let mut solutions = Vec::new();
        for outcome in outcomes {
            constructed.extend(outcome.constructed);
            solutions.extend(outcome.solutions);
        }

        let nondominated = filter_nondominated(&solutions);
        let result = GraspResult {
            constructed,
            solutions,
            nondominated,
            elapsed: start.elapsed(),
            iterations,
        };
        log::info!(
            "Instance {} solved in {:.2}s: {} solutions, {} non-dominated",
            instance.name,
            result.elapsed.as_secs_f64(),
            result.solutions.len(),
            result.front_size()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Distribution, LocalSearchApproach, Scheme};
    use crate::dominance::solution_dominates;

    /// Nodes on a 4-wide grid with Manhattan distances, so every sum is exact
    fn create_test_instance() -> Instance {
        let n = 12;
        let coords: Vec<(i32, i32)> = (0..n).map(|i| ((i % 4) as i32, (i / 4) as i32)).collect();
        let d = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| ((coords[i].0 - coords[j].0).abs() + (coords[i].1 - coords[j].1).abs()) as f64)
                    .collect()
            })
            .collect();
        let costs = (0..n).map(|i| 1.0 + (i % 3) as f64).collect();
        let capacities = (0..n).map(|i| 1.0 + (i % 2) as f64).collect();
        Instance::new("grid12", d, costs, capacities, 9.0, 4.0).unwrap()
    }

    fn small_config() -> GraspConfig {
        GraspConfig::default().with_iterations(8).with_seed(7)
    }

    fn assert_feasible_or_marker(solutions: &[Solution]) {
        for s in solutions {
            if s.is_empty() {
                continue;
            }
            assert!(s.total_cost() < s.instance().cost_limit());
            assert!(s.total_capacity() > s.instance().capacity_floor());
        }
    }

    #[test]
    fn test_construction_objective_schedule() {
        let grasp = Grasp::new(small_config());
        assert_eq!(grasp.construction_objective(0), Objective::MaxSum);
        assert_eq!(grasp.construction_objective(1), Objective::MaxMin);

        let fixed = Grasp::new(small_config().with_construction_approach(ConstructionApproach::MaxMin));
        assert_eq!(fixed.construction_objective(0), Objective::MaxMin);
        assert_eq!(fixed.construction_objective(1), Objective::MaxMin);
    }

    #[test]
    fn test_iteration_schedule_alternates_direction() {
        let instance = create_test_instance();
        let grasp = Grasp::new(small_config());

        let grown = grasp.run_iteration(&instance, 0, None);
        for pair in grown.constructed.windows(2) {
            assert!(pair[0].len() < pair[1].len());
        }
        let shrunk = grasp.run_iteration(&instance, 2, None);
        for pair in shrunk.constructed.windows(2) {
            assert!(pair[0].len() > pair[1].len());
        }
    }

    #[test]
    fn test_local_search_refines_trajectory_ends() {
        let instance = create_test_instance();
        let grasp = Grasp::new(small_config());

        for i in 0..8 {
            let outcome = grasp.run_iteration(&instance, i, None);
            assert_eq!(outcome.constructed.len(), outcome.solutions.len());
            let last = outcome.solutions.len() - 1;
            for idx in [0, last] {
                assert!(!solution_dominates(&outcome.constructed[idx], Some(&outcome.solutions[idx])));
            }
            // Inner snapshots are left untouched.
            for idx in 1..last {
                assert_eq!(outcome.constructed[idx].node_list(), outcome.solutions[idx].node_list());
            }
        }
    }

    #[test]
    fn test_run_returns_feasible_solutions_and_front() {
        let instance = create_test_instance();
        let grasp = Grasp::new(small_config());
        let result = grasp.run(&instance);

        assert_eq!(result.iterations, 8);
        assert_feasible_or_marker(&result.solutions);
        assert_feasible_or_marker(&result.constructed);
        assert_eq!(result.nondominated.len(), result.solutions.len());
        assert!(result.front_size() > 0);

        let front: Vec<&Solution> = result.front().collect();
        for a in &front {
            for b in &result.solutions {
                assert!(!solution_dominates(b, Some(a)));
            }
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let instance = create_test_instance();
        let config = small_config()
            .with_scheme(Scheme::Best)
            .with_distribution(Distribution::Triangular)
            .with_local_search_approach(LocalSearchApproach::Alt);
        let grasp = Grasp::new(config);

        let sequential = grasp.run(&instance);
        let parallel = grasp.run_parallel(&instance);

        let lists = |r: &GraspResult| r.solutions.iter().map(|s| s.node_list()).collect::<Vec<_>>();
        assert_eq!(lists(&sequential), lists(&parallel));
        assert_eq!(sequential.nondominated, parallel.nondominated);
    }

    #[test]
    fn test_progress_callback_sees_every_iteration() {
        let instance = create_test_instance();
        let grasp = Grasp::new(small_config().with_iterations(5));
        let mut seen = Vec::new();

        grasp.run_with_progress(&instance, |outcome| seen.push(outcome.iteration));
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_same_seed_same_run() {
        let instance = create_test_instance();
        let a = Grasp::new(small_config()).run(&instance);
        let b = Grasp::new(small_config()).run(&instance);

        let objectives = |r: &GraspResult| r.solutions.iter().map(|s| s.objectives()).collect::<Vec<_>>();
        assert_eq!(objectives(&a), objectives(&b));
    }
}
