//! Pareto dominance over the `(MaxSum, MaxMin)` pair, both maximized.

use crate::solution::{Objectives, Solution};

/// Whether the "in" pair dominates the "out" pair.
///
/// True iff `in_sum >= out_sum`, `in_min >= out_min` and at least one of the two
/// inequalities is strict. Used to decide whether swapping the removed nodes
/// (`out`) for the inserted ones (`in`) improves a solution.
#[inline]
pub fn exchange_is_dominant(out_sum: f64, out_min: f64, in_sum: f64, in_min: f64) -> bool {
    in_sum >= out_sum && in_min >= out_min && (in_sum > out_sum || in_min > out_min)
}

/// Whether objective vector `a` dominates `b`
#[inline]
pub fn objectives_dominate(a: &Objectives, b: &Objectives) -> bool {
    exchange_is_dominant(b.max_sum, b.max_min, a.max_sum, a.max_min)
}

/// Whether `s1` dominates `s2`. An absent `s2` is dominated by anything.
pub fn solution_dominates(s1: &Solution, s2: Option<&Solution>) -> bool {
    match s2 {
        Some(s2) => objectives_dominate(&s1.objectives(), &s2.objectives()),
        None => true,
    }
}

/// For every solution, whether no other solution of the set dominates it.
///
/// O(m^2) pairwise comparison. Identical objective vectors do not dominate each
/// other, so duplicates are all kept.
pub fn filter_nondominated(solutions: &[Solution]) -> Vec<bool> {
    let objectives: Vec<Objectives> = solutions.iter().map(|s| s.objectives()).collect();
    nondominated_mask(&objectives)
}

/// [`filter_nondominated`] over raw objective vectors
pub fn nondominated_mask(objectives: &[Objectives]) -> Vec<bool> {
    let mut is_nondominated = vec![true; objectives.len()];
    for (i, oi) in objectives.iter().enumerate() {
        for (j, oj) in objectives.iter().enumerate() {
            if i != j && objectives_dominate(oj, oi) {
                is_nondominated[i] = false;
                break;
            }
        }
    }
    is_nondominated
}
