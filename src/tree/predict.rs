use super::tree::Tree;
use crate::data::Dataset;
use crate::distribution::Distribution;
use crate::node::TreeView;
use rayon::prelude::*;

/// Send a row down `view` from `node`, calling `leaf` with every distribution the
/// row ends up in, the bag it fell into when the branch was empty, and its weight.
///
/// A row missing the split attribute follows every non-empty branch, weighted by
/// the share of training weight that went down each of them.
pub fn route<V: TreeView + ?Sized>(
    view: &V,
    node: usize,
    row: &[f64],
    missing: f64,
    weight: f64,
    leaf: &mut dyn FnMut(&Distribution, Option<usize>, f64),
) {
    if view.is_leaf(node) {
        match view.completion(node) {
            Some(tree) => route(tree, tree.root(), row, missing, weight, leaf),
            None => leaf(view.distribution(node), None, weight),
        }
        return;
    }
    let split = view.split(node);
    let children = view.children(node);
    let value = split.attribute().map_or(missing, |att| row[att]);
    match split.which_subset(value, missing) {
        Some(subset) => {
            let child = children[subset];
            if view.is_empty(child) {
                leaf(view.distribution(node), Some(subset), weight);
            } else {
                route(view, child, row, missing, weight, leaf);
            }
        }
        None => {
            let proportions = view.distribution(node).bag_proportions();
            for (child, p) in children.iter().zip(proportions) {
                if !view.is_empty(*child) {
                    route(view, *child, row, missing, weight * p, leaf);
                }
            }
        }
    }
}

/// Class probabilities of a row.
pub fn class_probabilities<V: TreeView + ?Sized>(
    view: &V,
    num_classes: usize,
    row: &[f64],
    missing: f64,
    laplace: bool,
) -> Vec<f64> {
    let mut probs = vec![0.0; num_classes];
    route(view, view.root(), row, missing, 1.0, &mut |dist: &Distribution, bag: Option<usize>, w: f64| {
        for (class, p) in probs.iter_mut().enumerate() {
            *p += w * match (bag, laplace) {
                (None, false) => dist.prob(class),
                (None, true) => dist.laplace_prob(class),
                (Some(b), false) => dist.prob_in_bag(class, b),
                (Some(b), true) => dist.laplace_prob_in_bag(class, b),
            };
        }
    });
    probs
}

/// Mean target of a row, for a numeric class.
pub fn mean_value<V: TreeView + ?Sized>(view: &V, row: &[f64], missing: f64) -> f64 {
    let mut value = 0.0;
    route(view, view.root(), row, missing, 1.0, &mut |dist: &Distribution, bag: Option<usize>, w: f64| {
        value += w * dist.mean_target(bag);
    });
    value
}

impl Tree {
    pub fn predict_distribution_row(&self, row: &[f64], missing: f64, laplace: bool) -> Vec<f64> {
        class_probabilities(self, self.num_classes, row, missing, laplace)
    }

    pub fn predict_value_row(&self, row: &[f64], missing: f64) -> f64 {
        mean_value(self, row, missing)
    }

    /// Class probabilities of every row of `data`.
    pub fn predict_distribution(&self, data: &Dataset, parallel: bool, laplace: bool) -> Vec<Vec<f64>> {
        let missing = data.missing();
        if parallel {
            (0..data.rows())
                .into_par_iter()
                .map(|r| self.predict_distribution_row(&data.get_row(r), missing, laplace))
                .collect()
        } else {
            (0..data.rows())
                .map(|r| self.predict_distribution_row(&data.get_row(r), missing, laplace))
                .collect()
        }
    }
}
