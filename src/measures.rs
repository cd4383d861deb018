//! Measures
//!
//! Complexity and explanation measures of a tree, and their aggregates over the
//! shadow trees of a hybrid model.
use crate::node::TreeView;
use crate::utils::{lower_median, mean, sample_std_dev};
use serde::{Deserialize, Serialize};

/// Shape of one tree, completion trees included.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug, Default)]
pub struct TreeMeasures {
    pub tree_size: f64,
    pub leaf_count: f64,
    pub rule_count: f64,
    pub inner_node_count: f64,
    /// Mean depth of the leaves.
    pub explanation_length: f64,
    /// Depth of the leaves weighted by their training weight.
    pub weighted_explanation_length: f64,
}

/// Measures aggregated over the shadow trees.
pub const AGGREGATED_MEASURES: [&str; 5] = [
    "leafCount",
    "ruleCount",
    "innerNodeCount",
    "explanationLength",
    "weightedExplanationLength",
];

/// Aggregates, in the order their suffixes are reported.
pub const AGGREGATES: [&str; 6] = ["Avg", "Min", "Max", "Sum", "Mdn", "Dev"];

#[derive(Default)]
struct Walk {
    nodes: usize,
    leaves: usize,
    depth_sum: f64,
    weighted_depth_sum: f64,
    leaf_weight: f64,
}

fn walk<V: TreeView + ?Sized>(view: &V, node: usize, depth: usize, acc: &mut Walk) {
    if view.is_leaf(node) {
        if let Some(tree) = view.completion(node) {
            walk(tree, tree.root(), depth, acc);
            return;
        }
        let weight = view.distribution(node).total();
        acc.nodes += 1;
        acc.leaves += 1;
        acc.depth_sum += depth as f64;
        acc.weighted_depth_sum += depth as f64 * weight;
        acc.leaf_weight += weight;
        return;
    }
    acc.nodes += 1;
    for child in view.children(node) {
        walk(view, *child, depth + 1, acc);
    }
}

impl TreeMeasures {
    pub fn of<V: TreeView + ?Sized>(view: &V) -> Self {
        let mut acc = Walk::default();
        walk(view, view.root(), 0, &mut acc);
        let explanation_length = if acc.leaves == 0 {
            0.0
        } else {
            acc.depth_sum / acc.leaves as f64
        };
        let weighted_explanation_length = if acc.leaf_weight > 0.0 {
            acc.weighted_depth_sum / acc.leaf_weight
        } else {
            0.0
        };
        TreeMeasures {
            tree_size: acc.nodes as f64,
            leaf_count: acc.leaves as f64,
            rule_count: acc.leaves as f64,
            inner_node_count: (acc.nodes - acc.leaves) as f64,
            explanation_length,
            weighted_explanation_length,
        }
    }

    /// Value of a measure by name.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "treeSize" => Some(self.tree_size),
            "leafCount" => Some(self.leaf_count),
            "ruleCount" => Some(self.rule_count),
            "innerNodeCount" => Some(self.inner_node_count),
            "explanationLength" => Some(self.explanation_length),
            "weightedExplanationLength" => Some(self.weighted_explanation_length),
            _ => None,
        }
    }

    pub fn named(&self) -> Vec<(String, f64)> {
        [
            "treeSize",
            "leafCount",
            "ruleCount",
            "innerNodeCount",
            "explanationLength",
            "weightedExplanationLength",
        ]
        .iter()
        .filter_map(|name| self.get(name).map(|v| (name.to_string(), v)))
        .collect()
    }
}

/// One aggregate of a list of values, `None` for an unknown aggregate.
pub fn aggregate(values: &[f64], op: &str) -> Option<f64> {
    if values.is_empty() {
        return Some(0.0);
    }
    let value = match op {
        "Avg" => mean(values),
        "Min" => values.iter().copied().fold(f64::INFINITY, f64::min),
        "Max" => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        "Sum" => values.iter().sum(),
        "Mdn" => lower_median(values).unwrap_or(0.0),
        "Dev" => sample_std_dev(values),
        _ => return None,
    };
    Some(value)
}

/// `{measure}{Aggregate}` values over a set of trees, e.g. `leafCountAvg`.
pub fn aggregate_measures(per_tree: &[TreeMeasures]) -> Vec<(String, f64)> {
    let mut out = Vec::with_capacity(AGGREGATED_MEASURES.len() * AGGREGATES.len());
    for name in AGGREGATED_MEASURES {
        let values: Vec<f64> = per_tree.iter().filter_map(|m| m.get(name)).collect();
        for op in AGGREGATES {
            if let Some(v) = aggregate(&values, op) {
                out.push((format!("{}{}", name, op), v));
            }
        }
    }
    out
}
