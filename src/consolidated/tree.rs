use crate::consolidation::{ConsolidatedDecision, ConsolidatedSplitSelector};
use crate::data::{Dataset, Instances};
use crate::distribution::Distribution;
use crate::grower::{GrowthBudget, PriorityCriterion, WorkItem, WorkList};
use crate::node::{ConsolidatedNode, TreeView};
use crate::prune::PrunableTree;
use crate::splitter::{SplitModel, Splitter};
use crate::utils::approx_eq;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Consolidated tree. Every node holds one shadow node per sample, so shadow tree
/// `i` is the same arena read through `shadows[i]`.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct ConsolidatedTree {
    pub nodes: HashMap<usize, ConsolidatedNode>,
    pub num_samples: usize,
    pub num_classes: usize,
}

struct Pending {
    instances: Instances,
    samples: Vec<Instances>,
    decision: Option<ConsolidatedDecision>,
}

type ChildWork = (usize, Instances, Vec<Instances>);

impl ConsolidatedTree {
    pub fn new() -> Self {
        ConsolidatedTree {
            nodes: HashMap::new(),
            num_samples: 0,
            num_classes: 0,
        }
    }

    fn init(&mut self, data: &Dataset, num_samples: usize) {
        self.nodes.clear();
        self.num_samples = num_samples;
        self.num_classes = data.num_classes();
        self.nodes
            .insert(0, ConsolidatedNode::new(0, 0, num_samples, self.num_classes));
    }

    /// Grow the whole tree by plain recursive descent.
    ///
    /// * `instances` - Rows of the original data reaching the root.
    /// * `samples` - One set of rows per sample.
    pub fn build_recursive<S: Splitter>(
        &mut self,
        selector: &ConsolidatedSplitSelector<S>,
        data: &Dataset,
        instances: Instances,
        samples: Vec<Instances>,
    ) {
        self.init(data, samples.len());
        let mut n_nodes = 1;
        self.grow_node(selector, data, 0, instances, samples, &mut n_nodes);
    }

    fn grow_node<S: Splitter>(
        &mut self,
        selector: &ConsolidatedSplitSelector<S>,
        data: &Dataset,
        num: usize,
        instances: Instances,
        samples: Vec<Instances>,
        n_nodes: &mut usize,
    ) {
        let decision = selector.select(data, &samples);
        let children = self.apply_decision(data, num, instances, samples, decision, n_nodes);
        for (child, child_instances, child_samples) in children {
            self.grow_node(selector, data, child, child_instances, child_samples, n_nodes);
        }
    }

    /// Grow the tree from an explicit work list, expanding pending nodes in
    /// `priority` order. Nodes that could split once `budget` is spent become
    /// truncated leaves. Returns the number of inner nodes created.
    pub fn build_iterative<S: Splitter>(
        &mut self,
        selector: &ConsolidatedSplitSelector<S>,
        data: &Dataset,
        instances: Instances,
        samples: Vec<Instances>,
        priority: PriorityCriterion,
        budget: GrowthBudget,
    ) -> usize {
        self.init(data, samples.len());
        let mut n_nodes = 1;
        let mut inner_nodes = 0;
        let mut growable = WorkList::new(priority);
        growable.add_node(WorkItem::new(
            0,
            0,
            0.0,
            Pending {
                instances,
                samples,
                decision: None,
            },
        ));

        while let Some(item) = growable.get_next_node() {
            let WorkItem {
                node: num,
                depth,
                payload,
                ..
            } = item;
            let Pending {
                instances,
                samples,
                decision,
            } = payload;
            let mut decision = decision.unwrap_or_else(|| selector.select(data, &samples));
            let mut truncated = false;
            if decision.is_split() && !budget.allows_split(depth, inner_nodes) {
                decision = decision.into_leaf();
                truncated = true;
            }
            let branch_weights: Vec<f64> = (0..decision.distribution.num_bags())
                .map(|b| decision.distribution.per_bag(b))
                .collect();

            let children = self.apply_decision(data, num, instances, samples, decision, &mut n_nodes);
            if truncated {
                if let Some(node) = self.nodes.get_mut(&num) {
                    node.truncated = true;
                }
            }
            if children.is_empty() {
                continue;
            }
            inner_nodes += 1;

            let items = children
                .into_iter()
                .zip(branch_weights)
                .map(|((child, child_instances, child_samples), weight)| {
                    let child_decision = if priority.needs_gain_ratio() {
                        Some(selector.select(data, &child_samples))
                    } else {
                        None
                    };
                    let gain_ratio = child_decision
                        .as_ref()
                        .map_or(f64::NEG_INFINITY, |d| d.priority_gain_ratio());
                    WorkItem::new(
                        child,
                        depth + 1,
                        priority.child_priority(weight, gain_ratio),
                        Pending {
                            instances: child_instances,
                            samples: child_samples,
                            decision: child_decision,
                        },
                    )
                })
                .collect();
            growable.add_children(items);
        }
        inner_nodes
    }

    /// Set node `num` and its shadows from a consolidated decision. For a split,
    /// the children are created and returned with their rows, original and per sample.
    fn apply_decision(
        &mut self,
        data: &Dataset,
        num: usize,
        instances: Instances,
        samples: Vec<Instances>,
        decision: ConsolidatedDecision,
        n_nodes: &mut usize,
    ) -> Vec<ChildWork> {
        let Some(node) = self.nodes.get_mut(&num) else {
            return Vec::new();
        };
        let depth = node.depth;

        if !decision.is_split() {
            node.split = SplitModel::NoSplit;
            node.is_empty = approx_eq(decision.leaf_distribution.total(), 0.0);
            node.distribution = decision.leaf_distribution;
            node.children = Vec::new();
            node.is_leaf = true;
            node.data = Some(instances);
            for ((shadow, leaf), sample) in node.shadows.iter_mut().zip(decision.sample_leaves).zip(samples) {
                shadow.make_leaf_node(leaf);
                shadow.data = Some(sample);
            }
            return Vec::new();
        }

        // Every sample is partitioned with the consolidated branch weights.
        let partitions = decision.model.split(data, &instances, &decision.distribution);
        let num_subsets = decision.model.num_subsets();
        let mut child_samples: Vec<Vec<Instances>> = (0..num_subsets)
            .map(|_| Vec::with_capacity(samples.len()))
            .collect();
        for sample in &samples {
            for (b, part) in decision
                .model
                .split(data, sample, &decision.distribution)
                .into_iter()
                .enumerate()
            {
                child_samples[b].push(part);
            }
        }

        let children: Vec<usize> = (*n_nodes..*n_nodes + num_subsets).collect();
        *n_nodes += num_subsets;
        node.split = decision.model;
        node.distribution = decision.distribution;
        node.children = children.clone();
        node.is_leaf = false;
        node.is_empty = false;
        node.data = Some(instances);
        for ((shadow, candidate), sample) in node.shadows.iter_mut().zip(decision.sample_splits).zip(samples) {
            shadow.make_parent_node(candidate);
            shadow.data = Some(sample);
        }

        for &child in &children {
            self.nodes.insert(
                child,
                ConsolidatedNode::new(child, depth + 1, self.num_samples, self.num_classes),
            );
        }
        children
            .into_iter()
            .zip(partitions)
            .zip(child_samples)
            .map(|((child, child_instances), samples)| (child, child_instances, samples))
            .collect()
    }

    /// Drop the training rows kept at every node, completion trees stay.
    pub fn cleanup(&mut self) {
        for node in self.nodes.values_mut() {
            node.data = None;
            node.shadows.iter_mut().for_each(|s| s.data = None);
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.values().filter(|n| n.is_leaf).count()
    }

    pub fn num_inner_nodes(&self) -> usize {
        self.num_nodes() - self.num_leaves()
    }

    /// Depth of the deepest leaf.
    pub fn depth(&self) -> usize {
        self.nodes.values().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Descendants of `num`, not including it.
    fn descendants(&self, num: usize) -> Vec<usize> {
        let mut found = Vec::new();
        let mut stack: Vec<usize> = self.nodes.get(&num).map(|n| n.children.clone()).unwrap_or_default();
        while let Some(n) = stack.pop() {
            if let Some(node) = self.nodes.get(&n) {
                stack.extend(node.children.iter().copied());
            }
            found.push(n);
        }
        found
    }

    /// Make `num` a leaf that bagging completion will grow further.
    pub fn truncate(&mut self, num: usize) {
        self.set_as_leaf(num);
        if let Some(node) = self.nodes.get_mut(&num) {
            node.truncated = true;
        }
    }

    /// Recompute the distributions of the subtree under `num`: every shadow from its
    /// own rows, the consolidated node as their average.
    fn new_distribution(
        &mut self,
        num: usize,
        depth: usize,
        data: &Dataset,
        instances: Instances,
        samples: Vec<Instances>,
    ) {
        let num_classes = self.num_classes;
        let Some(node) = self.nodes.get_mut(&num) else {
            return;
        };
        node.depth = depth;

        if node.is_leaf {
            for (shadow, sample) in node.shadows.iter_mut().zip(samples) {
                shadow.distribution = Distribution::from_instances(data, &sample);
                shadow.is_empty = approx_eq(shadow.distribution.total(), 0.0);
                shadow.data = Some(sample);
            }
            let dists: Vec<Distribution> = node.shadows.iter().map(|s| s.distribution.clone()).collect();
            node.distribution = Distribution::average(&dists).unwrap_or_else(|| Distribution::new(1, num_classes));
            node.is_empty = approx_eq(node.distribution.total(), 0.0);
            node.data = Some(instances);
            return;
        }

        let split = node.split.clone();
        let dists: Vec<Distribution> = samples.iter().map(|s| split.distribution(data, s)).collect();
        let consolidated =
            Distribution::average(&dists).unwrap_or_else(|| Distribution::new(split.num_subsets(), num_classes));
        let partitions = split.split(data, &instances, &consolidated);
        let mut child_samples: Vec<Vec<Instances>> = (0..split.num_subsets())
            .map(|_| Vec::with_capacity(samples.len()))
            .collect();
        for ((shadow, sample), dist) in node.shadows.iter_mut().zip(samples).zip(dists) {
            for (b, part) in split.split(data, &sample, &consolidated).into_iter().enumerate() {
                child_samples[b].push(part);
            }
            shadow.is_empty = approx_eq(dist.total(), 0.0);
            shadow.distribution = dist;
            shadow.data = Some(sample);
        }
        node.distribution = consolidated;
        node.data = Some(instances);

        let children = node.children.clone();
        for ((child, child_instances), samples) in children.into_iter().zip(partitions).zip(child_samples) {
            self.new_distribution(child, depth + 1, data, child_instances, samples);
        }
    }
}

impl TreeView for ConsolidatedTree {
    fn split(&self, node: usize) -> &SplitModel {
        &self.nodes[&node].split
    }

    fn distribution(&self, node: usize) -> &Distribution {
        &self.nodes[&node].distribution
    }

    fn children(&self, node: usize) -> &[usize] {
        &self.nodes[&node].children
    }

    fn is_leaf(&self, node: usize) -> bool {
        self.nodes[&node].is_leaf
    }

    fn is_empty(&self, node: usize) -> bool {
        self.nodes[&node].is_empty
    }
}

impl PrunableTree for ConsolidatedTree {
    fn node_data(&self, node: usize) -> Option<&Instances> {
        self.nodes.get(&node).and_then(|n| n.data.as_ref())
    }

    /// The node, and every shadow node with it, becomes a leaf. A leaf replacing a
    /// subtree that held truncated leaves is truncated too.
    fn set_as_leaf(&mut self, node: usize) {
        let removed = self.descendants(node);
        let mut truncated = false;
        for n in removed {
            if let Some(r) = self.nodes.remove(&n) {
                truncated |= r.truncated;
            }
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.split = SplitModel::NoSplit;
            n.distribution = n.distribution.to_single_bag();
            n.children.clear();
            n.is_leaf = true;
            n.truncated |= truncated;
            for shadow in n.shadows.iter_mut() {
                shadow.split = SplitModel::NoSplit;
                shadow.distribution = shadow.distribution.to_single_bag();
                shadow.is_leaf = true;
            }
        }
    }

    fn replace_with_branch(&mut self, node: usize, branch: usize, data: &Dataset) {
        let children = match self.nodes.get(&node) {
            Some(n) => n.children.clone(),
            None => return,
        };
        let Some(&raised) = children.get(branch) else {
            return;
        };
        for &child in children.iter().filter(|c| **c != raised) {
            for n in self.descendants(child) {
                self.nodes.remove(&n);
            }
            self.nodes.remove(&child);
        }
        let Some(raised) = self.nodes.remove(&raised) else {
            return;
        };
        let (depth, instances, samples) = match self.nodes.get_mut(&node) {
            Some(n) => {
                n.split = raised.split;
                n.children = raised.children;
                n.is_leaf = raised.is_leaf;
                n.truncated = raised.truncated;
                let samples: Vec<Instances> = n
                    .shadows
                    .iter_mut()
                    .zip(raised.shadows)
                    .map(|(shadow, from)| {
                        shadow.split = from.split;
                        shadow.is_leaf = from.is_leaf;
                        shadow.data.take().unwrap_or_default()
                    })
                    .collect();
                (n.depth, n.data.take().unwrap_or_default(), samples)
            }
            None => return,
        };
        self.new_distribution(node, depth, data, instances, samples);
    }
}
