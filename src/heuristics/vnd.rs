//! Variable Neighborhood Descent over exchange neighborhoods.
//!
//! The controller walks the configured neighborhoods in order. An improvement
//! sends it back to the first neighborhood, a failure moves it to the next one.
//! It stops once the last neighborhood fails, or when the iteration or time
//! budget is spent.

use crate::config::{GraspConfig, LocalSearchApproach};
use crate::heuristics::local_search::{scheme_for, ExchangeSearch, ImprovementCriterion, Neighborhood};
use crate::solution::{Objective, Solution};
use std::time::{Duration, Instant};

/// Why a descent stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The last neighborhood could not improve the solution
    Exhausted,
    IterationLimit,
    TimeLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VndState {
    /// Index into the neighborhood list
    Neighborhood(usize),
    Terminated(Termination),
}

/// Summary of one descent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VndOutcome {
    pub improved: bool,
    pub iterations: usize,
    pub failed_iterations: usize,
    pub termination: Termination,
}

/// Variable Neighborhood Descent (VND)
pub struct Vnd {
    search: Box<dyn ExchangeSearch + Send + Sync>,
    neighborhoods: Vec<Neighborhood>,
    approach: LocalSearchApproach,
    max_iterations: usize,
    max_time: Option<Duration>,
}

impl Vnd {
    pub fn new(
        search: Box<dyn ExchangeSearch + Send + Sync>,
        neighborhoods: Vec<Neighborhood>,
        approach: LocalSearchApproach,
    ) -> Self {
        Vnd {
            search,
            neighborhoods,
            approach,
            max_iterations: 100,
            max_time: None,
        }
    }

    /// Descent configured by `scheme`, `strategy`, `neighborhoods` and the
    /// local search limits. A zero `max_local_search_time` disables the time budget.
    pub fn from_config(config: &GraspConfig) -> Self {
        let neighborhoods = config
            .active_neighborhoods()
            .into_iter()
            .map(Neighborhood::from)
            .collect();
        let limits = &config.execution_limits;
        let max_time = (limits.max_local_search_time > 0.0).then(|| limits.max_local_search_time());

        Vnd::new(scheme_for(config), neighborhoods, config.mo_approach_ls)
            .with_max_iterations(limits.max_local_search_it)
            .with_max_time(max_time)
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_max_time(mut self, max_time: Option<Duration>) -> Self {
        self.max_time = max_time;
        self
    }

    pub fn neighborhoods(&self) -> &[Neighborhood] {
        &self.neighborhoods
    }

    /// Objective of the `iteration`-th attempt
    pub fn objective_for(&self, iteration: usize) -> Objective {
        match self.approach {
            LocalSearchApproach::MaxSum => Objective::MaxSum,
            LocalSearchApproach::MaxMin => Objective::MaxMin,
            LocalSearchApproach::Dom | LocalSearchApproach::Alt => Objective::from_parity(iteration),
        }
    }

    pub fn criterion(&self) -> ImprovementCriterion {
        match self.approach {
            LocalSearchApproach::Dom => ImprovementCriterion::Dominance,
            _ => ImprovementCriterion::Objective,
        }
    }

    /// Improve `solution` in place until a local optimum or a budget is reached
    pub fn improve(&self, solution: &mut Solution) -> VndOutcome {
        let start = Instant::now();
        let criterion = self.criterion();
        let mut iterations = 0;
        let mut failed_iterations = 0;
        let mut improved = false;

        let mut state = if self.neighborhoods.is_empty() {
            VndState::Terminated(Termination::Exhausted)
        } else {
            VndState::Neighborhood(0)
        };

        while let VndState::Neighborhood(k) = state {
            if iterations >= self.max_iterations {
                state = VndState::Terminated(Termination::IterationLimit);
                continue;
            }
            if self.max_time.is_some_and(|limit| start.elapsed() >= limit) {
                state = VndState::Terminated(Termination::TimeLimit);
                continue;
            }

            let neighborhood = self.neighborhoods[k];
            let objective = self.objective_for(iterations);
            log::debug!(
                "Local searching in neighborhood {} with exchange {} and {} objective",
                k + 1,
                neighborhood,
                match criterion {
                    ImprovementCriterion::Dominance => "Dom",
                    ImprovementCriterion::Objective => objective.name(),
                }
            );

            iterations += 1;
            state = if self.search.try_improvement(solution, objective, criterion, neighborhood) {
                log::debug!("Improved solution");
                improved = true;
                VndState::Neighborhood(0)
            } else {
                log::debug!("Unable to improve solution, changing neighborhood");
                failed_iterations += 1;
                if k + 1 < self.neighborhoods.len() {
                    VndState::Neighborhood(k + 1)
                } else {
                    VndState::Terminated(Termination::Exhausted)
                }
            };
        }

        let termination = match state {
            VndState::Terminated(reason) => reason,
            VndState::Neighborhood(_) => Termination::Exhausted,
        };
        log::debug!(
            "{} stopped ({:?}) after {} iterations, {} without improvement",
            self.search.name(),
            termination,
            iterations,
            failed_iterations
        );

        VndOutcome {
            improved,
            iterations,
            failed_iterations,
            termination,
        }
    }
}

impl std::fmt::Debug for Vnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vnd")
            .field("search", &self.search.name())
            .field("neighborhoods", &self.neighborhoods)
            .field("approach", &self.approach)
            .field("max_iterations", &self.max_iterations)
            .field("max_time", &self.max_time)
            .finish()
    }
}
