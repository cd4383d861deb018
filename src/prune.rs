//! Prune
//!
//! C4.5 collapsing and pessimistic-error pruning with optional subtree raising,
//! written once against [`PrunableTree`] so the standalone tree and the
//! consolidated tree (with its shadow trees) share the same decisions.
use crate::constants::{COLLAPSE_TOLERANCE, DEFAULT_CONFIDENCE_FACTOR, PRUNE_TOLERANCE};
use crate::data::{Dataset, Instances};
use crate::distribution::Distribution;
use crate::node::TreeView;
use crate::utils::{add_errs, approx_eq, smaller_or_eq};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Copy, PartialEq, Debug)]
pub struct PruneParams {
    pub unpruned: bool,
    pub collapse: bool,
    pub subtree_raising: bool,
    pub confidence_factor: f64,
}

impl Default for PruneParams {
    fn default() -> Self {
        PruneParams {
            unpruned: false,
            collapse: true,
            subtree_raising: true,
            confidence_factor: DEFAULT_CONFIDENCE_FACTOR,
        }
    }
}

/// Structural edits pruning needs on top of read access.
pub trait PrunableTree: TreeView {
    /// Rows that reached the node while growing.
    fn node_data(&self, node: usize) -> Option<&Instances>;
    /// Drop the subtree under `node`, keeping its distribution.
    fn set_as_leaf(&mut self, node: usize);
    /// Put the subtree of child `branch` in place of `node` and recompute its
    /// distributions from the rows stored at `node`.
    fn replace_with_branch(&mut self, node: usize, branch: usize, data: &Dataset);
}

/// Weight misclassified at the leaves of the subtree, on training data.
pub fn training_errors<T: TreeView + ?Sized>(tree: &T, node: usize) -> f64 {
    if tree.is_leaf(node) {
        tree.distribution(node).num_incorrect()
    } else {
        tree.children(node).iter().map(|c| training_errors(tree, *c)).sum()
    }
}

/// Observed plus pessimistic extra errors of a leaf holding `dist`.
pub fn estimated_errors_for_distribution(dist: &Distribution, confidence_factor: f64) -> f64 {
    if approx_eq(dist.total(), 0.0) {
        0.0
    } else {
        let incorrect = dist.num_incorrect();
        incorrect + add_errs(dist.total(), incorrect, confidence_factor)
    }
}

/// Estimated errors of the subtree under `node`.
pub fn estimated_errors<T: TreeView + ?Sized>(tree: &T, node: usize, confidence_factor: f64) -> f64 {
    if tree.is_leaf(node) {
        estimated_errors_for_distribution(tree.distribution(node), confidence_factor)
    } else {
        tree.children(node)
            .iter()
            .map(|c| estimated_errors(tree, *c, confidence_factor))
            .sum()
    }
}

/// Estimated errors of the subtree under `node` if `instances` were routed through it.
pub fn estimated_errors_for_branch<T: TreeView + ?Sized>(
    tree: &T,
    data: &Dataset,
    node: usize,
    instances: &Instances,
    confidence_factor: f64,
) -> f64 {
    if tree.is_leaf(node) {
        return estimated_errors_for_distribution(&Distribution::from_instances(data, instances), confidence_factor);
    }
    let split = tree.split(node);
    let distribution = split.distribution(data, instances);
    let subsets = split.split(data, instances, &distribution);
    tree.children(node)
        .iter()
        .zip(subsets.iter())
        .map(|(child, subset)| estimated_errors_for_branch(tree, data, *child, subset, confidence_factor))
        .sum()
}

/// Turn into leaves, top-down, the subtrees that do not reduce the training error.
pub fn collapse<T: PrunableTree + ?Sized>(tree: &mut T, node: usize) {
    if tree.is_leaf(node) {
        return;
    }
    let errors_of_subtree = training_errors(tree, node);
    let errors_of_tree = tree.distribution(node).num_incorrect();
    if errors_of_subtree >= errors_of_tree - COLLAPSE_TOLERANCE {
        tree.set_as_leaf(node);
    } else {
        let children = tree.children(node).to_vec();
        for child in children {
            collapse(tree, child);
        }
    }
}

/// Bottom-up pessimistic pruning with optional subtree raising.
pub fn prune<T: PrunableTree + ?Sized>(tree: &mut T, data: &Dataset, node: usize, params: &PruneParams) {
    if tree.is_leaf(node) {
        return;
    }
    let children = tree.children(node).to_vec();
    for child in &children {
        prune(tree, data, *child, params);
    }

    let cf = params.confidence_factor;
    let distribution = tree.distribution(node);
    let largest_branch = distribution.max_bag();
    let errors_leaf = estimated_errors_for_distribution(distribution, cf);
    let errors_largest_branch = match (params.subtree_raising, tree.node_data(node)) {
        (true, Some(instances)) => estimated_errors_for_branch(tree, data, children[largest_branch], instances, cf),
        _ => f64::MAX,
    };
    let errors_tree = estimated_errors(tree, node, cf);

    if smaller_or_eq(errors_leaf, errors_tree + PRUNE_TOLERANCE)
        && smaller_or_eq(errors_leaf, errors_largest_branch + PRUNE_TOLERANCE)
    {
        tree.set_as_leaf(node);
        return;
    }
    if smaller_or_eq(errors_largest_branch, errors_tree + PRUNE_TOLERANCE) {
        tree.replace_with_branch(node, largest_branch, data);
        prune(tree, data, node, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests_support::two_class_dataset;
    use crate::data::Attribute;
    use crate::grower::{GrowthBudget, PriorityCriterion};
    use crate::splitter::C45Splitter;
    use crate::tree::tree::Tree;
    use approx::assert_relative_eq;

    fn grown(data: &Dataset) -> Tree {
        let splitter = C45Splitter::new(2.0, true, true);
        let mut tree = Tree::new();
        tree.grow(
            data,
            data.instances_with_class(),
            &splitter,
            PriorityCriterion::Original,
            GrowthBudget::Unlimited,
        );
        tree
    }

    #[test]
    fn test_estimated_errors_for_distribution() {
        let data = Dataset::from_labels(
            vec![Attribute::nominal("c", &["n", "p"])],
            &[vec!["n"], vec!["n"], vec!["n"], vec!["p"]],
            0,
        )
        .unwrap();
        let dist = Distribution::from_instances(&data, &data.all_instances());
        let errors = estimated_errors_for_distribution(&dist, 0.25);
        assert!(errors > 1.0);
        assert_eq!(estimated_errors_for_distribution(&Distribution::new(1, 2), 0.25), 0.0);
    }

    #[test]
    fn test_pruning_shrinks_tree() {
        let data = two_class_dataset(400, 5, 0.0);
        let mut tree = grown(&data);
        let before_nodes = tree.num_nodes();
        prune(&mut tree, &data, 0, &PruneParams::default());
        assert!(tree.num_nodes() <= before_nodes);
        for node in tree.nodes.values() {
            assert_eq!(node.is_leaf, node.children.is_empty());
            assert!(node.children.iter().all(|c| tree.nodes.contains_key(c)));
        }
        assert_relative_eq!(tree.distribution(0).total(), 400.0, epsilon = 1e-6);
    }

    #[test]
    fn test_collapse_keeps_useful_splits() {
        let data = two_class_dataset(400, 5, 0.0);
        let mut tree = grown(&data);
        collapse(&mut tree, 0);
        assert!(!tree.is_leaf(0));
        assert!(training_errors(&tree, 0) < tree.distribution(0).num_incorrect());
    }

    #[test]
    fn test_set_as_leaf_drops_descendants() {
        let data = two_class_dataset(400, 5, 0.0);
        let mut tree = grown(&data);
        let total = tree.distribution(0).total();
        tree.set_as_leaf(0);
        assert_eq!(tree.num_nodes(), 1);
        assert!(tree.is_leaf(0));
        assert_relative_eq!(tree.distribution(0).total(), total, epsilon = 1e-9);
    }

    #[test]
    fn test_raising_keeps_all_rows() {
        let data = two_class_dataset(400, 9, 0.1);
        let mut tree = grown(&data);
        if tree.is_leaf(0) {
            return;
        }
        let largest = tree.distribution(0).max_bag();
        tree.replace_with_branch(0, largest, &data);
        assert_relative_eq!(tree.distribution(0).total(), 400.0, epsilon = 1e-6);
        for child in tree.children(0).to_vec() {
            assert_eq!(tree.nodes[&child].depth, 1);
        }
    }
}
