//! Exchange-based local search for the bi-objective dispersion problem.
//!
//! One improvement attempt swaps `k_out` selected nodes for `k_in` unselected
//! ones. Three schemes share the [`ExchangeSearch`] contract:
//! - [`FirstImprove`]: applies the first accepted exchange
//! - [`BestImprove`]: scans the whole neighborhood and applies the exchange with
//!   the dominant improvement margin
//! - [`FastImprove`]: greedily pairs the weakest removal with the strongest
//!   insertion and applies it only if it dominates

use crate::candidate::{CandidateEntry, CandidateList, SortKey};
use crate::config::{FastComparison, GraspConfig, Scheme};
use crate::dominance::exchange_is_dominant;
use crate::instance::Instance;
use crate::solution::{round2, MinDistance, Objective, Solution};
use std::time::{Duration, Instant};

/// Exchange size: remove `k_out` selected nodes, insert `k_in` unselected ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Neighborhood {
    pub k_out: usize,
    pub k_in: usize,
}

impl Neighborhood {
    pub fn new(k_out: usize, k_in: usize) -> Self {
        Neighborhood { k_out, k_in }
    }
}

impl From<(usize, usize)> for Neighborhood {
    fn from((k_out, k_in): (usize, usize)) -> Self {
        Neighborhood { k_out, k_in }
    }
}

impl std::fmt::Display for Neighborhood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.k_out, self.k_in)
    }
}

/// Number of `k`-subsets of an `n`-set, `None` if it does not fit in a `usize`
pub fn binomial(n: usize, k: usize) -> Option<usize> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    (0..k).try_fold(1usize, |acc, i| Some(acc.checked_mul(n - i)? / (i + 1)))
}

/// Lexicographic `k`-combinations of the indices `0..n`
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    indices: Vec<usize>,
    started: bool,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, k: usize) -> Self {
        Combinations {
            n,
            indices: (0..k).collect(),
            started: false,
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            return Some(self.indices.clone());
        }

        let k = self.indices.len();
        // Rightmost position that can still move forward
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                return None;
            }
            i -= 1;
            if self.indices[i] < self.n - k + i {
                break;
            }
        }
        self.indices[i] += 1;
        for j in i + 1..k {
            self.indices[j] = self.indices[j - 1] + 1;
        }
        Some(self.indices.clone())
    }
}

/// Objective variation of one exchange.
///
/// `out_*` is what the removed group contributes to the selection, `in_*` what the
/// inserted group will contribute once the removed group is gone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExchangeValue {
    pub out_sum: f64,
    pub out_min: f64,
    pub in_sum: f64,
    pub in_min: f64,
}

impl ExchangeValue {
    /// Values rounded to 2 decimals, as compared by the searches
    pub fn rounded(self) -> Self {
        ExchangeValue {
            out_sum: round2(self.out_sum),
            out_min: round2(self.out_min),
            in_sum: round2(self.in_sum),
            in_min: round2(self.in_min),
        }
    }

    pub fn is_dominant(&self) -> bool {
        exchange_is_dominant(self.out_sum, self.out_min, self.in_sum, self.in_min)
    }

    /// Strict improvement of a single objective
    pub fn improves(&self, objective: Objective) -> bool {
        match objective {
            Objective::MaxSum => self.out_sum < self.in_sum,
            Objective::MaxMin => self.out_min < self.in_min,
        }
    }

    pub fn accepted_by(&self, criterion: ImprovementCriterion, objective: Objective) -> bool {
        match criterion {
            ImprovementCriterion::Dominance => self.is_dominant(),
            ImprovementCriterion::Objective => self.improves(objective),
        }
    }

    /// `(in_sum - out_sum, in_min - out_min)`
    pub fn margin(&self) -> (f64, f64) {
        (self.in_sum - self.out_sum, self.in_min - self.out_min)
    }
}

/// Contribution of the `out` group: its distance sum to the selection with the
/// intra-group pairs counted once, and its smallest distance to the selection.
///
/// Minima are reported values: a selection without pairs contributes 0.
fn removal_value(instance: &Instance, out: &[&CandidateEntry]) -> (f64, f64) {
    let nodes: Vec<usize> = out.iter().map(|e| e.node).collect();
    let sum = out.iter().map(|e| e.sum_distance).sum::<f64>() - instance.pairwise_sum(&nodes);
    let min = out.iter().map(|e| e.min_distance).fold(f64::INFINITY, f64::min);
    (sum, MinDistance::from_f64(min).reported())
}

/// Contribution of the `inserted` group once `removed` has left the selection
fn insertion_value(solution: &Solution, inserted: &[&CandidateEntry], removed: &[usize]) -> (f64, f64) {
    let instance = solution.instance();
    let nodes: Vec<usize> = inserted.iter().map(|e| e.node).collect();

    let to_selection: f64 = inserted
        .iter()
        .map(|e| e.sum_distance - removed.iter().map(|&s| instance.distance(e.node, s)).sum::<f64>())
        .sum();
    let sum = to_selection + instance.pairwise_sum(&nodes);

    let min = inserted
        .iter()
        .map(|e| solution.exact_min_distance_to(e.node, removed))
        .fold(instance.pairwise_min(&nodes).unwrap_or(f64::INFINITY), f64::min);
    // Infinite only when fewer than two nodes are left after the exchange
    (sum, MinDistance::from_f64(min).reported())
}

fn exchange_value(
    solution: &Solution,
    out: &[&CandidateEntry],
    inserted: &[&CandidateEntry],
    removed: &[usize],
) -> ExchangeValue {
    let (out_sum, out_min) = removal_value(solution.instance(), out);
    let (in_sum, in_min) = insertion_value(solution, inserted, removed);
    ExchangeValue {
        out_sum,
        out_min,
        in_sum,
        in_min,
    }
    .rounded()
}

/// Rounded value of swapping `removed` (selected) for `added` (unselected)
pub fn evaluate_exchange(solution: &Solution, removed: &[usize], added: &[usize]) -> ExchangeValue {
    let annotate = |u: usize| CandidateEntry {
        sum_distance: solution.exact_distance_sum_to(u, &[]),
        min_distance: solution.exact_min_distance_to(u, &[]),
        node: u,
        score: 0.0,
    };
    let out: Vec<CandidateEntry> = removed.iter().map(|&u| annotate(u)).collect();
    let inserted: Vec<CandidateEntry> = added.iter().map(|&u| annotate(u)).collect();
    let out_refs: Vec<&CandidateEntry> = out.iter().collect();
    let in_refs: Vec<&CandidateEntry> = inserted.iter().collect();
    exchange_value(solution, &out_refs, &in_refs, removed)
}

fn pick<'l>(list: &'l CandidateList, combo: &[usize]) -> Vec<&'l CandidateEntry> {
    combo.iter().map(|&i| &list.entries()[i]).collect()
}

fn nodes_of(entries: &[&CandidateEntry]) -> Vec<usize> {
    entries.iter().map(|e| e.node).collect()
}

fn is_feasible_exchange(solution: &Solution, removed: &[usize], added: &[usize]) -> bool {
    solution.satisfies_cost(added, removed) && solution.satisfies_capacity(added, removed)
}

/// When an exchange counts as an improvement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImprovementCriterion {
    /// The inserted group Pareto-dominates the removed one
    Dominance,
    /// Strict gain on the active objective
    Objective,
}

/// Trait for exchange-based improvement schemes
pub trait ExchangeSearch {
    /// Try one improving exchange in the given neighborhood and apply it in place.
    ///
    /// Returns whether the solution changed.
    fn try_improvement(
        &self,
        solution: &mut Solution,
        objective: Objective,
        criterion: ImprovementCriterion,
        neighborhood: Neighborhood,
    ) -> bool;

    fn name(&self) -> &str;
}

/// First Improve: apply the first accepted exchange.
///
/// Selected nodes are scanned worst-first and unselected nodes best-first on the
/// active objective, so promising exchanges come early.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstImprove;

impl FirstImprove {
    pub fn new() -> Self {
        FirstImprove
    }

    /// Drop unselected nodes that cannot beat the weakest selected node
    fn bound_filter(selected: &CandidateList, unselected: &mut CandidateList, neighborhood: Neighborhood) {
        for bound in [Objective::MaxSum, Objective::MaxMin] {
            // Adding more nodes than removed can raise the sum even with weak nodes
            if bound == Objective::MaxSum && neighborhood.k_out < neighborhood.k_in {
                continue;
            }
            let worst = selected
                .iter()
                .map(|e| e.value(bound))
                .fold(f64::INFINITY, f64::min);
            if worst.is_finite() {
                unselected.retain(|e| e.value(bound) >= worst);
            }
        }
    }
}

impl ExchangeSearch for FirstImprove {
    fn try_improvement(
        &self,
        solution: &mut Solution,
        objective: Objective,
        criterion: ImprovementCriterion,
        neighborhood: Neighborhood,
    ) -> bool {
        let instance = solution.instance();
        let key = SortKey::for_objective(objective);

        let mut selected = CandidateList::selected(solution);
        let mut unselected = CandidateList::unselected(solution);
        selected.sort_ascending(key);
        unselected.sort_descending(key);
        Self::bound_filter(&selected, &mut unselected, neighborhood);

        // Inserted groups must be at least as dispersed as the current selection
        let threshold = solution.max_min().value();
        let in_combos: Vec<Vec<usize>> = Combinations::new(unselected.len(), neighborhood.k_in)
            .filter(|combo| match threshold {
                Some(current) if neighborhood.k_in > 1 => {
                    let nodes = nodes_of(&pick(&unselected, combo));
                    instance.pairwise_min(&nodes).map_or(false, |d| d > current)
                }
                _ => true,
            })
            .collect();

        let mut exchange = None;
        'search: for out_combo in Combinations::new(selected.len(), neighborhood.k_out) {
            let out = pick(&selected, &out_combo);
            let removed = nodes_of(&out);
            for in_combo in &in_combos {
                let inserted = pick(&unselected, in_combo);
                let added = nodes_of(&inserted);
                if !is_feasible_exchange(solution, &removed, &added) {
                    continue;
                }
                let value = exchange_value(solution, &out, &inserted, &removed);
                if value.accepted_by(criterion, objective) {
                    exchange = Some((removed, added));
                    break 'search;
                }
            }
        }

        match exchange {
            Some((removed, added)) => {
                log::trace!("First Improve: {:?} -> {:?}", removed, added);
                solution.apply_exchange(&removed, &added);
                true
            }
            None => false,
        }
    }

    fn name(&self) -> &str {
        "First Improve"
    }
}

/// Best Improve: scan the whole neighborhood, apply the exchange whose
/// improvement margin dominates every other eligible one
#[derive(Debug, Clone, Copy)]
pub struct BestImprove {
    /// Wall-clock budget of one scan
    pub time_limit: Duration,
    /// Stop scanning once `time_limit` is spent and keep the best exchange so far
    pub abort_on_time_limit: bool,
}

impl BestImprove {
    pub fn new() -> Self {
        BestImprove {
            time_limit: Duration::from_secs(5),
            abort_on_time_limit: false,
        }
    }

    pub fn with_time_limit(time_limit: Duration) -> Self {
        BestImprove {
            time_limit,
            abort_on_time_limit: true,
        }
    }
}

impl Default for BestImprove {
    fn default() -> Self {
        Self::new()
    }
}

impl ExchangeSearch for BestImprove {
    fn try_improvement(
        &self,
        solution: &mut Solution,
        objective: Objective,
        _criterion: ImprovementCriterion,
        neighborhood: Neighborhood,
    ) -> bool {
        let start = Instant::now();
        let key = SortKey::for_objective(objective);

        let mut selected = CandidateList::selected(solution);
        let mut unselected = CandidateList::unselected(solution);
        selected.sort_ascending(key);
        unselected.sort_descending(key);

        let mut best: Option<((f64, f64), Vec<usize>, Vec<usize>)> = None;
        for out_combo in Combinations::new(selected.len(), neighborhood.k_out) {
            let out = pick(&selected, &out_combo);
            let removed = nodes_of(&out);
            for in_combo in Combinations::new(unselected.len(), neighborhood.k_in) {
                let inserted = pick(&unselected, &in_combo);
                let added = nodes_of(&inserted);
                if !is_feasible_exchange(solution, &removed, &added) {
                    continue;
                }
                let value = exchange_value(solution, &out, &inserted, &removed);
                if !value.is_dominant() {
                    continue;
                }
                let margin = value.margin();
                let replaces = match &best {
                    None => true,
                    Some((incumbent, _, _)) => {
                        exchange_is_dominant(incumbent.0, incumbent.1, margin.0, margin.1)
                    }
                };
                if replaces {
                    best = Some((margin, removed.clone(), added));
                }
            }

            if self.abort_on_time_limit && start.elapsed() >= self.time_limit {
                log::debug!("Best Improve scan stopped after {:?}", start.elapsed());
                break;
            }
        }

        match best {
            Some((margin, removed, added)) => {
                log::trace!("Best Improve: {:?} -> {:?} (margin {:?})", removed, added, margin);
                solution.apply_exchange(&removed, &added);
                true
            }
            None => false,
        }
    }

    fn name(&self) -> &str {
        "Best Improve"
    }
}

/// Fast Improve: pick the weakest selected group and, independently, the
/// strongest feasible unselected group; swap them if the swap dominates
#[derive(Debug, Clone, Copy, Default)]
pub struct FastImprove {
    pub comparison: FastComparison,
}

impl FastImprove {
    pub fn new(comparison: FastComparison) -> Self {
        FastImprove { comparison }
    }

    fn no_greater(&self, a: f64, b: f64) -> bool {
        match self.comparison {
            FastComparison::Lenient => a <= b,
            FastComparison::Strict => a < b,
        }
    }

    fn no_lower(&self, a: f64, b: f64) -> bool {
        match self.comparison {
            FastComparison::Lenient => a >= b,
            FastComparison::Strict => a > b,
        }
    }
}

impl ExchangeSearch for FastImprove {
    fn try_improvement(
        &self,
        solution: &mut Solution,
        _objective: Objective,
        _criterion: ImprovementCriterion,
        neighborhood: Neighborhood,
    ) -> bool {
        let instance = solution.instance();
        let selected = CandidateList::selected(solution);
        let unselected = CandidateList::unselected(solution);

        let mut worst: Option<((f64, f64), Vec<usize>)> = None;
        for combo in Combinations::new(selected.len(), neighborhood.k_out) {
            let out = pick(&selected, &combo);
            let (sum, min) = removal_value(instance, &out);
            let (sum, min) = (round2(sum), round2(min));
            let replaces = match &worst {
                None => true,
                Some(((best_sum, best_min), _)) => {
                    self.no_greater(sum, *best_sum) && self.no_greater(min, *best_min)
                }
            };
            if replaces {
                worst = Some(((sum, min), nodes_of(&out)));
            }
        }
        let Some(((out_sum, out_min), removed)) = worst else {
            return false;
        };

        let mut best: Option<((f64, f64), Vec<usize>)> = None;
        for combo in Combinations::new(unselected.len(), neighborhood.k_in) {
            let inserted = pick(&unselected, &combo);
            let added = nodes_of(&inserted);
            if !is_feasible_exchange(solution, &removed, &added) {
                continue;
            }
            let (sum, min) = insertion_value(solution, &inserted, &removed);
            let (sum, min) = (round2(sum), round2(min));
            let replaces = match &best {
                None => true,
                Some(((best_sum, best_min), _)) => {
                    self.no_lower(sum, *best_sum) && self.no_lower(min, *best_min)
                }
            };
            if replaces {
                best = Some(((sum, min), added));
            }
        }
        let Some(((in_sum, in_min), added)) = best else {
            return false;
        };

        if exchange_is_dominant(out_sum, out_min, in_sum, in_min) {
            log::trace!("Fast Improve: {:?} -> {:?}", removed, added);
            solution.apply_exchange(&removed, &added);
            true
        } else {
            false
        }
    }

    fn name(&self) -> &str {
        "Fast Improve"
    }
}

/// Improvement scheme selected by the configuration
pub fn scheme_for(config: &GraspConfig) -> Box<dyn ExchangeSearch + Send + Sync> {
    match config.scheme {
        Scheme::First => Box::new(FirstImprove::new()),
        Scheme::Best => Box::new(BestImprove {
            time_limit: config.execution_limits.max_local_search_time(),
            abort_on_time_limit: config.best_improve_time_abort,
        }),
        Scheme::Fast => Box::new(FastImprove::new(config.fast_comparison)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn create_test_instance() -> Instance {
        let d = vec![
            vec![0.0, 1.0, 2.0, 3.0],
            vec![1.0, 0.0, 4.0, 5.0],
            vec![2.0, 4.0, 0.0, 6.0],
            vec![3.0, 5.0, 6.0, 0.0],
        ];
        Instance::new("test", d, vec![1.0; 4], vec![1.0; 4], 3.0, 1.0).unwrap()
    }

    fn line_instance(n: usize, cost_limit: f64) -> Instance {
        let d = (0..n)
            .map(|i| (0..n).map(|j| (i as f64 - j as f64).abs()).collect())
            .collect();
        Instance::new("line", d, vec![1.0; n], vec![1.0; n], cost_limit, 0.0).unwrap()
    }

    fn one_one() -> Neighborhood {
        Neighborhood::new(1, 1)
    }

    #[test]
    fn test_combinations_order_and_count() {
        let combos: Vec<Vec<usize>> = Combinations::new(4, 2).collect();
        assert_eq!(
            combos,
            vec![vec![0, 1], vec![0, 2], vec![0, 3], vec![1, 2], vec![1, 3], vec![2, 3]]
        );
        assert_eq!(Some(Combinations::new(7, 3).count()), binomial(7, 3));
        assert_eq!(Combinations::new(2, 3).count(), 0);
        assert_eq!(Combinations::new(3, 3).count(), 1);
        assert_eq!(binomial(10, 0), Some(1));
    }

    #[test]
    fn test_binomial_overflow() {
        assert_eq!(binomial(60, 30), Some(118_264_581_564_861_424));
        assert_eq!(binomial(200, 100), None);
        assert_eq!(binomial(usize::MAX, 1), Some(usize::MAX));
    }

    #[test]
    fn test_exchange_value_counts_group_pairs_once() {
        let instance = create_test_instance();
        let sol = Solution::from_nodes(&instance, &[0, 1]);

        // Remove both, insert both: the whole sum is replaced.
        let value = evaluate_exchange(&sol, &[0, 1], &[2, 3]);
        assert_eq!(value.out_sum, 1.0);
        assert_eq!(value.in_sum, 6.0);
        assert_eq!(value.in_min, 6.0);
    }

    #[test]
    fn test_first_improve_applies_first_dominant_swap() {
        let instance = create_test_instance();
        let mut sol = Solution::from_nodes(&instance, &[0, 1]);

        let improved =
            FirstImprove::new().try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Dominance, one_one());
        assert!(improved);
        assert_eq!(sol.node_list(), "1 - 3");
        assert_eq!(sol.max_sum(), 5.0);
        assert_eq!(sol.max_min(), MinDistance::Value(5.0));
    }

    #[test]
    fn test_first_improve_bound_filter_blocks_weak_nodes() {
        let instance = create_test_instance();
        let mut sol = Solution::from_nodes(&instance, &[1, 3]);

        // Node 0 is too close to the selection, node 2 is too close to node 1.
        let improved =
            FirstImprove::new().try_improvement(&mut sol, Objective::MaxMin, ImprovementCriterion::Dominance, one_one());
        assert!(!improved);
        assert_eq!(sol.node_list(), "1 - 3");
    }

    #[test]
    fn test_first_improve_objective_criterion() {
        let instance = line_instance(6, 10.0);
        let mut sol = Solution::from_nodes(&instance, &[1, 2, 3]);

        let improved =
            FirstImprove::new().try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Objective, one_one());
        assert!(improved);
        let (sum, _) = sol.evaluate_from_scratch();
        assert!(sum > 4.0);
        assert_eq!(sol.len(), 3);
    }

    #[test]
    fn test_first_improve_grows_with_one_two_exchange() {
        let instance = line_instance(6, 10.0);
        let mut sol = Solution::from_nodes(&instance, &[2, 3]);

        let improved = FirstImprove::new().try_improvement(
            &mut sol,
            Objective::MaxSum,
            ImprovementCriterion::Dominance,
            Neighborhood::new(1, 2),
        );
        assert!(improved);
        assert_eq!(sol.len(), 3);
        assert!(sol.max_sum() > 1.0);
        assert!(sol.max_min().reported() > 1.0);
    }

    #[test]
    fn test_single_objective_needs_two_nodes_left() {
        // Swapping the pair for the far node leaves a single node: MaxMin drops to 0.
        let d = vec![
            vec![0.0, 1.0, 10.0],
            vec![1.0, 0.0, 10.0],
            vec![10.0, 10.0, 0.0],
        ];
        let instance = Instance::new("far", d, vec![1.0; 3], vec![1.0; 3], 3.0, 0.0).unwrap();
        let mut sol = Solution::from_nodes(&instance, &[0, 1]);

        let value = evaluate_exchange(&sol, &[0, 1], &[2]);
        assert_eq!(value.out_min, 1.0);
        assert_eq!(value.in_min, 0.0);
        assert!(!value.improves(Objective::MaxMin));

        let improved = FirstImprove::new().try_improvement(
            &mut sol,
            Objective::MaxMin,
            ImprovementCriterion::Objective,
            Neighborhood::new(2, 1),
        );
        assert!(!improved);
        assert_eq!(sol.node_list(), "0 - 1");
    }

    #[test]
    fn test_single_node_grows_into_pair() {
        let instance = line_instance(6, 10.0);
        let mut sol = Solution::from_nodes(&instance, &[2]);

        let improved = FirstImprove::new().try_improvement(
            &mut sol,
            Objective::MaxSum,
            ImprovementCriterion::Dominance,
            Neighborhood::new(1, 2),
        );
        assert!(improved);
        assert_eq!(sol.len(), 2);
        assert!(sol.max_min().reported() > 0.0);
    }

    #[test]
    fn test_best_improve_picks_largest_margin() {
        let instance = create_test_instance();
        let mut sol = Solution::from_nodes(&instance, &[0, 1]);

        let improved =
            BestImprove::new().try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Dominance, one_one());
        assert!(improved);
        assert_eq!(sol.node_list(), "1 - 3");
    }

    #[test]
    fn test_best_improve_differs_from_first_improve() {
        let instance = line_instance(8, 10.0);
        let start = Solution::from_nodes(&instance, &[3, 4, 5]);

        // First Improve swaps the worst node 4 for node 0, margin (6, 2).
        let mut first = start.clone();
        assert!(FirstImprove::new().try_improvement(
            &mut first,
            Objective::MaxSum,
            ImprovementCriterion::Dominance,
            one_one()
        ));
        assert_eq!(first.node_list(), "0 - 3 - 5");

        // Best Improve keeps scanning and prefers node 3 out, margin (6, 3).
        let mut best = start.clone();
        assert!(BestImprove::new().try_improvement(
            &mut best,
            Objective::MaxSum,
            ImprovementCriterion::Dominance,
            one_one()
        ));
        assert_eq!(best.node_list(), "0 - 4 - 5");
        assert_eq!(best.max_sum(), 10.0);
        assert_eq!(evaluate_exchange(&start, &[3], &[0]).margin(), (6.0, 3.0));
        assert_eq!(evaluate_exchange(&start, &[4], &[0]).margin(), (6.0, 2.0));
    }

    #[test]
    fn test_best_improve_abort_keeps_best_so_far() {
        let instance = create_test_instance();
        let mut sol = Solution::from_nodes(&instance, &[0, 1]);

        let search = BestImprove::with_time_limit(Duration::ZERO);
        let improved =
            search.try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Dominance, one_one());
        // The first removed group is always scanned completely.
        assert!(improved);
        assert!(sol.contains(3));
    }

    #[test]
    fn test_fast_improve_single_swap_then_stops() {
        let instance = create_test_instance();
        let mut sol = Solution::from_nodes(&instance, &[0, 1]);
        let fast = FastImprove::default();

        assert!(fast.try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Dominance, one_one()));
        assert_eq!(sol.node_list(), "0 - 3");
        assert_eq!(sol.max_sum(), 3.0);

        assert!(!fast.try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Dominance, one_one()));
        assert_eq!(sol.node_list(), "0 - 3");
    }

    #[test]
    fn test_fast_improve_strict_comparison() {
        let instance = create_test_instance();
        let mut sol = Solution::from_nodes(&instance, &[0, 1]);
        let fast = FastImprove::new(FastComparison::Strict);

        assert!(fast.try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Dominance, one_one()));
        assert_eq!(sol.node_list(), "1 - 3");
        assert!(fast.try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Dominance, one_one()));
        assert_eq!(sol.node_list(), "2 - 3");
        assert!(!fast.try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Dominance, one_one()));
    }

    #[test]
    fn test_exchanges_respect_constraints() {
        // Node 3 is far away but too expensive to fit under the ceiling.
        let d = vec![
            vec![0.0, 1.0, 2.0, 9.0],
            vec![1.0, 0.0, 1.0, 9.0],
            vec![2.0, 1.0, 0.0, 9.0],
            vec![9.0, 9.0, 9.0, 0.0],
        ];
        let instance = Instance::new("pricey", d, vec![1.0, 1.0, 1.0, 5.0], vec![1.0; 4], 4.0, 1.0).unwrap();
        let schemes: Vec<Box<dyn ExchangeSearch>> = vec![
            Box::new(FirstImprove::new()),
            Box::new(BestImprove::new()),
            Box::new(FastImprove::default()),
        ];

        for scheme in schemes {
            let mut sol = Solution::from_nodes(&instance, &[0, 1]);
            while scheme.try_improvement(&mut sol, Objective::MaxSum, ImprovementCriterion::Dominance, one_one()) {}
            assert!(!sol.contains(3), "{} inserted an unaffordable node", scheme.name());
            assert!(sol.is_feasible());
        }
    }

    #[test]
    fn test_scheme_for_config() {
        let config = GraspConfig::default().with_scheme(Scheme::Best);
        assert_eq!(scheme_for(&config).name(), "Best Improve");
        let config = config.with_scheme(Scheme::Fast);
        assert_eq!(scheme_for(&config).name(), "Fast Improve");
    }

    fn random_instance(n: usize, weights: &[u8]) -> Instance {
        let mut d = vec![vec![0.0; n]; n];
        let mut k = 0;
        for i in 0..n {
            for j in i + 1..n {
                let w = weights[k % weights.len()] as f64;
                d[i][j] = w;
                d[j][i] = w;
                k += 1;
            }
        }
        Instance::new("random", d, vec![1.0; n], vec![1.0; n], n as f64 + 1.0, 0.0).unwrap()
    }

    proptest! {
        #[test]
        fn prop_exchange_sum_matches_applied_exchange(
            weights in prop::collection::vec(1u8..40, 1..60),
            k_out in 1usize..3,
            k_in in 1usize..3,
        ) {
            let instance = random_instance(8, &weights);
            let sol = Solution::from_nodes(&instance, &[0, 1, 2, 3]);
            let removed: Vec<usize> = (0..k_out).collect();
            let added: Vec<usize> = (4..4 + k_in).collect();

            let value = evaluate_exchange(&sol, &removed, &added);
            let mut after = sol.clone();
            after.apply_exchange(&removed, &added);

            prop_assert!((sol.max_sum() - value.out_sum + value.in_sum - after.max_sum()).abs() < 1e-6);
        }
    }
}
