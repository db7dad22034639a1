//! Candidate lists used by construction and local search.
//!
//! Every entry annotates a node with its aggregate distances to the current
//! selection and a cost-based tie-break score. Entries are patched in place after
//! each insertion or removal instead of being rebuilt.

use crate::solution::{Objective, Solution};
use ordered_float::OrderedFloat;
use std::cmp::Ordering;

/// Tolerance used to detect that a removed node defined an entry's minimum
const MIN_TIE_TOLERANCE: f64 = 1e-9;

/// A node annotated with its distances to the current selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateEntry {
    /// Sum of distances to the selected nodes
    pub sum_distance: f64,
    /// Minimum distance to the selected nodes (`+inf` when there is none)
    pub min_distance: f64,
    /// Node id
    pub node: usize,
    /// Tie-break score: minus the min-max normalized node cost
    pub score: f64,
}

impl CandidateEntry {
    /// Value of the entry for an objective
    #[inline]
    pub fn value(&self, objective: Objective) -> f64 {
        match objective {
            Objective::MaxSum => self.sum_distance,
            Objective::MaxMin => self.min_distance,
        }
    }
}

/// Key used to order candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Distance sum first, score as tie-break
    SumDistance,
    /// Minimum distance first, score as tie-break
    MinDistance,
    /// Score first, distance sum as tie-break
    Score,
}

impl SortKey {
    pub fn for_objective(objective: Objective) -> Self {
        match objective {
            Objective::MaxSum => SortKey::SumDistance,
            Objective::MaxMin => SortKey::MinDistance,
        }
    }

    fn compare(&self, a: &CandidateEntry, b: &CandidateEntry) -> Ordering {
        let (primary_a, primary_b, tie_a, tie_b) = match self {
            SortKey::SumDistance => (a.sum_distance, b.sum_distance, a.score, b.score),
            SortKey::MinDistance => (a.min_distance, b.min_distance, a.score, b.score),
            SortKey::Score => (a.score, b.score, a.sum_distance, b.sum_distance),
        };
        OrderedFloat(primary_a)
            .cmp(&OrderedFloat(primary_b))
            .then_with(|| OrderedFloat(tie_a).cmp(&OrderedFloat(tie_b)))
    }
}

/// Working list of candidate nodes
#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    entries: Vec<CandidateEntry>,
}

impl CandidateList {
    /// Annotate every node of the instance except `skip` against the selection
    pub fn build(solution: &Solution, skip: Option<usize>) -> Self {
        let n = solution.instance().len();
        Self::from_nodes(solution, (0..n).filter(|&c| Some(c) != skip))
    }

    /// Annotate only the unselected nodes
    pub fn unselected(solution: &Solution) -> Self {
        let n = solution.instance().len();
        Self::from_nodes(solution, (0..n).filter(|&c| !solution.contains(c)))
    }

    /// Annotate only the selected nodes (distances to the rest of the selection)
    pub fn selected(solution: &Solution) -> Self {
        Self::from_nodes(solution, solution.selected().iter().copied())
    }

    fn from_nodes(solution: &Solution, nodes: impl Iterator<Item = usize>) -> Self {
        let entries = nodes
            .map(|c| CandidateEntry {
                sum_distance: solution.exact_distance_sum_to(c, &[]),
                min_distance: solution.exact_min_distance_to(c, &[]),
                node: c,
                score: 0.0,
            })
            .collect();
        let mut list = CandidateList { entries };
        list.refresh_scores(solution);
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CandidateEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CandidateEntry> {
        self.entries.iter()
    }

    pub fn get(&self, index: usize) -> Option<&CandidateEntry> {
        self.entries.get(index)
    }

    /// Keep only the entries matching the predicate
    pub fn retain<F: FnMut(&CandidateEntry) -> bool>(&mut self, f: F) {
        self.entries.retain(f);
    }

    /// Remove and return the entry at `index`
    pub fn take(&mut self, index: usize) -> CandidateEntry {
        self.entries.remove(index)
    }

    /// Sort from best to worst (descending) on the given key
    pub fn sort_descending(&mut self, key: SortKey) {
        self.entries.sort_by(|a, b| key.compare(b, a));
    }

    /// Sort from worst to best (ascending) on the given key
    pub fn sort_ascending(&mut self, key: SortKey) {
        self.entries.sort_by(|a, b| key.compare(a, b));
    }

    /// Patch entries after `added` joined the selection
    pub fn on_added(&mut self, solution: &Solution, added: usize) {
        let instance = solution.instance();
        for entry in &mut self.entries {
            let d = instance.distance(added, entry.node);
            entry.sum_distance += d;
            if d < entry.min_distance {
                entry.min_distance = d;
            }
        }
        self.refresh_scores(solution);
    }

    /// Patch entries after `removed` left the selection.
    ///
    /// An entry whose minimum was realised by the removed node gets its minimum
    /// recomputed against the new selection.
    pub fn on_removed(&mut self, solution: &Solution, removed: usize) {
        let instance = solution.instance();
        for entry in &mut self.entries {
            let d = instance.distance(removed, entry.node);
            entry.sum_distance -= d;
            if (d - entry.min_distance).abs() <= MIN_TIE_TOLERANCE {
                entry.min_distance = solution.exact_min_distance_to(entry.node, &[]);
            }
        }
        self.refresh_scores(solution);
    }

    /// Recompute `score = -normalized_cost` over the current entries
    fn refresh_scores(&mut self, solution: &Solution) {
        let instance = solution.instance();
        let (min_cost, max_cost) = self
            .entries
            .iter()
            .map(|e| instance.cost(e.node))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| (lo.min(c), hi.max(c)));

        let range = max_cost - min_cost;
        for entry in &mut self.entries {
            entry.score = if range > 0.0 {
                -(instance.cost(entry.node) - min_cost) / range
            } else {
                0.0
            };
        }
    }
}

impl<'l> IntoIterator for &'l CandidateList {
    type Item = &'l CandidateEntry;
    type IntoIter = std::slice::Iter<'l, CandidateEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
