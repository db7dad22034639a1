//! Solution representation and incremental objective bookkeeping.
//!
//! A [`Solution`] is a set of selected nodes together with the aggregates that the
//! search needs on every move: the sum of pairwise distances (MaxSum), the minimum
//! pairwise distance (MaxMin), the total cost and the total capacity. The
//! aggregates are updated incrementally on every insertion and removal.

use crate::instance::Instance;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Tolerance used to decide whether a removed distance defined the current minimum
const MIN_TIE_TOLERANCE: f64 = 1e-9;

/// Round a value to two decimals, used for objective comparisons
#[inline]
pub fn round2(value: f64) -> f64 {
    if value.is_finite() {
        (value * 100.0).round() / 100.0
    } else {
        value
    }
}

/// One of the two competing objectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Objective {
    MaxSum,
    MaxMin,
}

impl Objective {
    /// Objective selected by the parity of a counter (even: MaxSum, odd: MaxMin)
    pub fn from_parity(counter: usize) -> Self {
        if counter % 2 == 0 {
            Objective::MaxSum
        } else {
            Objective::MaxMin
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Objective::MaxSum => "MaxSum",
            Objective::MaxMin => "MaxMin",
        }
    }
}

/// Minimum pairwise distance of a selection.
///
/// A selection with fewer than two nodes has no pair, so its minimum is
/// `Undefined` instead of a magic "infinity" constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MinDistance {
    Undefined,
    Value(f64),
}

impl MinDistance {
    /// `Undefined` for non-finite inputs (e.g. the minimum over an empty set)
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            MinDistance::Value(value)
        } else {
            MinDistance::Undefined
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            MinDistance::Undefined => None,
            MinDistance::Value(v) => Some(v),
        }
    }

    /// Identity of `min`: `Undefined` behaves as +inf
    pub fn as_bound(self) -> f64 {
        self.value().unwrap_or(f64::INFINITY)
    }

    /// Objective value reported and compared: a selection without pairs has no dispersion
    pub fn reported(self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn min_with(self, distance: f64) -> Self {
        match self {
            MinDistance::Undefined => MinDistance::from_f64(distance),
            MinDistance::Value(v) => MinDistance::Value(v.min(distance)),
        }
    }
}

/// Objective vector `(MaxSum, MaxMin)` of a solution, both maximized
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Objectives {
    pub max_sum: f64,
    pub max_min: f64,
}

/// Precomputed variation of an insertion or removal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    /// Minimum distance between the node and the rest of the selection
    pub min_distance: f64,
    /// Sum of distances between the node and the rest of the selection
    pub sum_variation: f64,
}

/// Represents a (partial) selection of nodes of an instance
#[derive(Debug, Clone)]
pub struct Solution<'a> {
    instance: &'a Instance,
    selected: BTreeSet<usize>,
    max_sum: f64,
    max_min: MinDistance,
    total_cost: f64,
    total_capacity: f64,
}

impl<'a> Solution<'a> {
    /// Create a new empty solution
    pub fn new(instance: &'a Instance) -> Self {
        Solution {
            instance,
            selected: BTreeSet::new(),
            max_sum: 0.0,
            max_min: MinDistance::Undefined,
            total_cost: 0.0,
            total_capacity: 0.0,
        }
    }

    /// Marker returned when a construction could not reach any feasible solution
    pub fn no_feasible(instance: &'a Instance) -> Self {
        let mut solution = Solution::new(instance);
        solution.max_min = MinDistance::Value(0.0);
        solution
    }

    /// Build a solution from a list of node ids
    pub fn from_nodes(instance: &'a Instance, nodes: &[usize]) -> Self {
        let mut solution = Solution::new(instance);
        for &u in nodes {
            solution.add(u, None);
        }
        solution
    }

    pub fn instance(&self) -> &'a Instance {
        self.instance
    }

    pub fn selected(&self) -> &BTreeSet<usize> {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, u: usize) -> bool {
        self.selected.contains(&u)
    }

    pub fn max_sum(&self) -> f64 {
        self.max_sum
    }

    pub fn max_min(&self) -> MinDistance {
        self.max_min
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn total_capacity(&self) -> f64 {
        self.total_capacity
    }

    pub fn objectives(&self) -> Objectives {
        Objectives {
            max_sum: self.max_sum,
            max_min: self.max_min.reported(),
        }
    }

    /// Value of a single objective
    pub fn objective_value(&self, objective: Objective) -> f64 {
        match objective {
            Objective::MaxSum => self.max_sum,
            Objective::MaxMin => self.max_min.reported(),
        }
    }

    /// Add a node to the selection.
    ///
    /// Without a delta the variation is computed by scanning the selection.
    ///
    /// # Panics
    ///
    /// Panics if `u` is already selected or is not a node of the instance.
    pub fn add(&mut self, u: usize, delta: Option<Delta>) {
        assert!(
            u < self.instance.len(),
            "node {} is out of range (instance has {} nodes)",
            u,
            self.instance.len()
        );
        assert!(!self.selected.contains(&u), "node {} is already selected", u);

        match delta {
            Some(delta) => {
                self.max_sum += delta.sum_variation;
                self.max_min = self.max_min.min_with(delta.min_distance);
            }
            None => {
                for &s in &self.selected {
                    let d = self.instance.distance(u, s);
                    self.max_sum += d;
                    self.max_min = self.max_min.min_with(d);
                }
            }
        }
        self.total_cost += self.instance.cost(u);
        self.total_capacity += self.instance.capacity(u);
        self.selected.insert(u);
    }

    /// Remove a node from the selection.
    ///
    /// When the removed node realised the current minimum, the minimum is
    /// recomputed from scratch over the remaining selection.
    ///
    /// # Panics
    ///
    /// Panics if `u` is not selected.
    pub fn remove(&mut self, u: usize, delta: Option<Delta>) {
        assert!(self.selected.remove(&u), "node {} is not selected", u);

        let current_min = self.max_min.as_bound();
        let defined_min = match delta {
            Some(delta) => {
                self.max_sum -= delta.sum_variation;
                delta.min_distance <= current_min + MIN_TIE_TOLERANCE
            }
            None => {
                let mut tie = false;
                for &s in &self.selected {
                    let d = self.instance.distance(u, s);
                    self.max_sum -= d;
                    if d <= current_min + MIN_TIE_TOLERANCE {
                        tie = true;
                    }
                }
                tie
            }
        };
        if defined_min || self.selected.len() < 2 {
            self.max_min = self.minimum_distance_in_selection();
        }

        self.total_cost -= self.instance.cost(u);
        self.total_capacity -= self.instance.capacity(u);
        if self.selected.is_empty() {
            self.max_sum = 0.0;
            self.total_cost = 0.0;
            self.total_capacity = 0.0;
        }
    }

    /// Remove the `removed` nodes and then add the `added` nodes
    pub fn apply_exchange(&mut self, removed: &[usize], added: &[usize]) {
        for &u in removed {
            self.remove(u, None);
        }
        for &v in added {
            self.add(v, None);
        }
    }

    /// True iff the cost after the hypothetical move stays strictly below `K`
    pub fn satisfies_cost(&self, adding: &[usize], removing: &[usize]) -> bool {
        let removed: f64 = removing.iter().map(|&q| self.instance.cost(q)).sum();
        let added: f64 = adding.iter().map(|&q| self.instance.cost(q)).sum();
        self.total_cost - removed + added < self.instance.cost_limit()
    }

    /// True iff the capacity after the hypothetical move stays strictly above `B`
    pub fn satisfies_capacity(&self, adding: &[usize], removing: &[usize]) -> bool {
        let removed: f64 = removing.iter().map(|&q| self.instance.capacity(q)).sum();
        let added: f64 = adding.iter().map(|&q| self.instance.capacity(q)).sum();
        self.total_capacity - removed + added > self.instance.capacity_floor()
    }

    /// Both constraints hold for the current selection
    pub fn is_feasible(&self) -> bool {
        self.satisfies_cost(&[], &[]) && self.satisfies_capacity(&[], &[])
    }

    /// Sum of distances from `u` to the selection minus `excluding`, rounded to 2 decimals
    pub fn distance_sum_to(&self, u: usize, excluding: &[usize]) -> f64 {
        round2(self.exact_distance_sum_to(u, excluding))
    }

    /// Minimum distance from `u` to the selection minus `excluding` and `u` itself,
    /// rounded to 2 decimals (`+inf` if no node is left)
    pub fn min_distance_to(&self, u: usize, excluding: &[usize]) -> f64 {
        round2(self.exact_min_distance_to(u, excluding))
    }

    pub(crate) fn exact_distance_sum_to(&self, u: usize, excluding: &[usize]) -> f64 {
        self.selected
            .iter()
            .filter(|s| !excluding.contains(s))
            .map(|&s| self.instance.distance(s, u))
            .sum()
    }

    pub(crate) fn exact_min_distance_to(&self, u: usize, excluding: &[usize]) -> f64 {
        self.selected
            .iter()
            .filter(|&&s| s != u && !excluding.contains(&s))
            .map(|&s| self.instance.distance(s, u))
            .fold(f64::INFINITY, f64::min)
    }

    /// Minimum pairwise distance over the whole selection, O(|selected|^2)
    fn minimum_distance_in_selection(&self) -> MinDistance {
        let nodes: Vec<usize> = self.selected.iter().copied().collect();
        match self.instance.pairwise_min(&nodes) {
            Some(d) => MinDistance::Value(d),
            None => MinDistance::Undefined,
        }
    }

    /// Objective values recomputed from scratch by scanning every pair
    pub fn evaluate_from_scratch(&self) -> (f64, MinDistance) {
        let nodes: Vec<usize> = self.selected.iter().copied().collect();
        let sum = self.instance.pairwise_sum(&nodes);
        (sum, self.minimum_distance_in_selection())
    }

    /// Selected ids sorted and joined as `"a - b - c"`
    pub fn node_list(&self) -> String {
        self.selected
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

impl std::fmt::Display for Solution<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Solution ({} nodes)", self.selected.len())?;
        writeln!(f, "  MaxSum: {:.2}", self.max_sum)?;
        match self.max_min {
            MinDistance::Value(v) => writeln!(f, "  MaxMin: {:.2}", v)?,
            MinDistance::Undefined => writeln!(f, "  MaxMin: undefined")?,
        }
        writeln!(f, "  Cost: {:.2}", self.total_cost)?;
        writeln!(f, "  Capacity: {:.2}", self.total_capacity)?;
        writeln!(f, "  Feasible: {}", self.is_feasible())?;
        writeln!(f, "  Nodes: {}", self.node_list())
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

    fn assert_consistent(solution: &Solution) {
        let (sum, min) = solution.evaluate_from_scratch();
        assert!((solution.max_sum() - sum).abs() < 1e-6, "max_sum drifted");
        match (solution.max_min(), min) {
            (MinDistance::Undefined, MinDistance::Undefined) => {}
            (MinDistance::Value(a), MinDistance::Value(b)) => assert!((a - b).abs() < 1e-6),
            (a, b) => panic!("max_min mismatch: {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn test_solution_creation() {
        let instance = create_test_instance();
        let sol = Solution::new(&instance);

        assert!(sol.is_empty());
        assert_eq!(sol.max_sum(), 0.0);
        assert_eq!(sol.max_min(), MinDistance::Undefined);
        assert_eq!(sol.objectives().max_min, 0.0);
    }

    #[test]
    fn test_add_and_remove() {
        let instance = create_test_instance();
        let mut sol = Solution::new(&instance);

        sol.add(0, None);
        assert_eq!(sol.max_min(), MinDistance::Undefined);
        sol.add(2, None);
        sol.add(3, None);
        assert_eq!(sol.max_sum(), 11.0);
        assert_eq!(sol.max_min(), MinDistance::Value(2.0));
        assert_eq!(sol.total_cost(), 3.0);

        // Removing 0 removes the pair that defined the minimum.
        sol.remove(0, None);
        assert_eq!(sol.max_sum(), 6.0);
        assert_eq!(sol.max_min(), MinDistance::Value(6.0));

        sol.remove(2, None);
        assert_eq!(sol.max_min(), MinDistance::Undefined);
        assert_consistent(&sol);
    }

    #[test]
    fn test_add_with_delta() {
        let instance = create_test_instance();
        let mut sol = Solution::from_nodes(&instance, &[1, 2]);

        let delta = Delta {
            min_distance: sol.min_distance_to(3, &[]),
            sum_variation: sol.distance_sum_to(3, &[]),
        };
        sol.add(3, Some(delta));
        assert_eq!(sol.max_sum(), 15.0);
        assert_eq!(sol.max_min(), MinDistance::Value(4.0));

        let delta = Delta {
            min_distance: sol.min_distance_to(1, &[1]),
            sum_variation: sol.distance_sum_to(1, &[1]),
        };
        sol.remove(1, Some(delta));
        assert_eq!(sol.max_sum(), 6.0);
        assert_eq!(sol.max_min(), MinDistance::Value(6.0));
        assert_consistent(&sol);
    }

    #[test]
    #[should_panic(expected = "already selected")]
    fn test_double_add_panics() {
        let instance = create_test_instance();
        let mut sol = Solution::new(&instance);
        sol.add(1, None);
        sol.add(1, None);
    }

    #[test]
    #[should_panic(expected = "not selected")]
    fn test_remove_missing_panics() {
        let instance = create_test_instance();
        let mut sol = Solution::new(&instance);
        sol.remove(1, None);
    }

    #[test]
    fn test_constraints_are_strict() {
        let instance = create_test_instance();
        let sol = Solution::from_nodes(&instance, &[0, 1]);

        // cost 2 < 3, adding one more reaches exactly K.
        assert!(sol.satisfies_cost(&[], &[]));
        assert!(!sol.satisfies_cost(&[2], &[]));
        assert!(sol.satisfies_cost(&[2], &[0]));
        // capacity 2 > 1, removing one reaches exactly B.
        assert!(sol.satisfies_capacity(&[], &[]));
        assert!(!sol.satisfies_capacity(&[], &[0]));
        assert!(sol.is_feasible());
    }

    #[test]
    fn test_helper_queries() {
        let instance = create_test_instance();
        let sol = Solution::from_nodes(&instance, &[0, 1, 2]);

        assert_eq!(sol.distance_sum_to(3, &[]), 14.0);
        assert_eq!(sol.distance_sum_to(3, &[2]), 8.0);
        assert_eq!(sol.min_distance_to(3, &[0]), 5.0);
        assert_eq!(sol.min_distance_to(0, &[]), 1.0);
        assert_eq!(sol.min_distance_to(0, &[1, 2]), f64::INFINITY);
    }

    #[test]
    fn test_clone_is_independent() {
        let instance = create_test_instance();
        let mut original = Solution::from_nodes(&instance, &[0, 3]);
        let snapshot = original.clone();

        original.add(1, None);
        original.remove(0, None);

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(0));
        assert!(!snapshot.contains(1));
        assert_eq!(snapshot.max_sum(), 3.0);
        assert_consistent(&snapshot);
        assert_consistent(&original);
    }

    #[test]
    fn test_apply_exchange() {
        let instance = create_test_instance();
        let mut sol = Solution::from_nodes(&instance, &[0, 1]);
        sol.apply_exchange(&[0, 1], &[2, 3]);

        assert_eq!(sol.node_list(), "2 - 3");
        assert_eq!(sol.max_sum(), 6.0);
        assert_eq!(sol.max_min(), MinDistance::Value(6.0));
    }

    #[test]
    fn test_no_feasible_marker() {
        let instance = create_test_instance();
        let marker = Solution::no_feasible(&instance);
        assert!(marker.is_empty());
        assert_eq!(marker.max_min(), MinDistance::Value(0.0));
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
        fn prop_incremental_matches_recomputation(
            n in 2usize..12,
            weights in prop::collection::vec(1u8..50, 1..80),
            ops in prop::collection::vec((0usize..12, any::<bool>()), 1..60),
        ) {
            let instance = random_instance(n, &weights);
            let mut sol = Solution::new(&instance);

            for (node, use_delta) in ops {
                let u = node % n;
                let delta = if use_delta {
                    let excluding = [u];
                    Some(Delta {
                        min_distance: sol.exact_min_distance_to(u, &excluding),
                        sum_variation: sol.exact_distance_sum_to(u, &excluding),
                    })
                } else {
                    None
                };
                if sol.contains(u) {
                    sol.remove(u, delta);
                } else {
                    sol.add(u, delta);
                }

                let (sum, min) = sol.evaluate_from_scratch();
                prop_assert!((sol.max_sum() - sum).abs() < 1e-6);
                prop_assert_eq!(sol.max_min(), min);
                prop_assert_eq!(sol.total_cost(), sol.len() as f64);
            }
        }
    }
}
