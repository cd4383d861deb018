use crate::data::{Dataset, Instances};
use crate::distribution::Distribution;
use crate::grower::{GrowthBudget, PriorityCriterion, WorkItem, WorkList};
use crate::node::{TreeNode, TreeView};
use crate::prune::{collapse, prune, PrunableTree, PruneParams};
use crate::splitter::{SplitCandidate, SplitModel, Splitter};
use crate::utils::approx_eq;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a standalone tree is grown and pruned.
#[derive(Deserialize, Serialize, Clone, Copy, PartialEq, Debug)]
pub struct TreeParams {
    pub priority: PriorityCriterion,
    pub budget: GrowthBudget,
    pub prune: PruneParams,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            priority: PriorityCriterion::Original,
            budget: GrowthBudget::Unlimited,
            prune: PruneParams::default(),
        }
    }
}

/// Single-sample C4.5 tree, stored as an arena of nodes keyed by node number.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Tree {
    pub nodes: HashMap<usize, TreeNode>,
    pub num_classes: usize,
}

struct Pending {
    instances: Instances,
    candidate: Option<SplitCandidate>,
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            nodes: HashMap::new(),
            num_classes: 0,
        }
    }

    /// Grow, collapse and prune a tree on `instances`.
    pub fn fit<S: Splitter>(&mut self, data: &Dataset, instances: Instances, splitter: &S, params: &TreeParams) {
        self.grow(data, instances, splitter, params.priority, params.budget);
        if params.prune.collapse {
            collapse(self, 0);
        }
        if !params.prune.unpruned {
            prune(self, data, 0, &params.prune);
        }
        self.cleanup();
    }

    /// Grow the tree without pruning it, visiting pending nodes in `priority` order
    /// until `budget` runs out. Node data is kept.
    pub fn grow<S: Splitter>(
        &mut self,
        data: &Dataset,
        instances: Instances,
        splitter: &S,
        priority: PriorityCriterion,
        budget: GrowthBudget,
    ) {
        self.nodes.clear();
        self.num_classes = data.num_classes();
        self.nodes.insert(0, TreeNode::new(0, 0, self.num_classes));

        let mut n_nodes = 1;
        let mut inner_nodes = 0;
        let mut growable = WorkList::new(priority);
        growable.add_node(WorkItem::new(
            0,
            0,
            0.0,
            Pending {
                instances,
                candidate: None,
            },
        ));

        while let Some(item) = growable.get_next_node() {
            let WorkItem {
                node: num,
                depth,
                payload,
                ..
            } = item;
            let Pending { instances, candidate } = payload;
            let candidate = candidate.unwrap_or_else(|| splitter.select_split(data, &instances));

            if !(candidate.model.is_split() && budget.allows_split(depth, inner_nodes)) {
                let distribution = Distribution::from_instances(data, &instances);
                if let Some(node) = self.nodes.get_mut(&num) {
                    node.make_leaf_node(distribution);
                    node.data = Some(instances);
                }
                continue;
            }

            let subsets = candidate.model.split(data, &instances, &candidate.distribution);
            let mut children = Vec::with_capacity(subsets.len());
            let mut items = Vec::with_capacity(subsets.len());
            for subset in subsets {
                let child = n_nodes;
                n_nodes += 1;
                let child_candidate = if priority.needs_gain_ratio() {
                    Some(splitter.select_split(data, &subset))
                } else {
                    None
                };
                let gain_ratio = child_candidate
                    .as_ref()
                    .map_or(f64::NEG_INFINITY, |c| c.priority_gain_ratio());
                let priority_value = priority.child_priority(subset.sum_of_weights(), gain_ratio);
                self.nodes.insert(child, TreeNode::new(child, depth + 1, self.num_classes));
                children.push(child);
                items.push(WorkItem::new(
                    child,
                    depth + 1,
                    priority_value,
                    Pending {
                        instances: subset,
                        candidate: child_candidate,
                    },
                ));
            }
            if let Some(node) = self.nodes.get_mut(&num) {
                node.make_parent_node(candidate, children);
                node.data = Some(instances);
            }
            inner_nodes += 1;
            growable.add_children(items);
        }
    }

    /// Drop the training rows kept at every node.
    pub fn cleanup(&mut self) {
        self.nodes.values_mut().for_each(|n| n.data = None);
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

    /// Remove every descendant of `num` from the arena.
    fn remove_subtree(&mut self, num: usize) {
        let mut stack: Vec<usize> = match self.nodes.get(&num) {
            Some(n) => n.children.clone(),
            None => return,
        };
        while let Some(n) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&n) {
                stack.extend(removed.children);
            }
        }
    }

    /// Recompute the distributions of the subtree under `num` from `instances`.
    fn new_distribution(&mut self, num: usize, depth: usize, data: &Dataset, instances: Instances) {
        let Some(node) = self.nodes.get_mut(&num) else {
            return;
        };
        node.depth = depth;
        if node.is_leaf {
            node.distribution = Distribution::from_instances(data, &instances);
            node.is_empty = approx_eq(node.distribution.total(), 0.0);
            node.data = Some(instances);
            return;
        }
        let distribution = node.split.distribution(data, &instances);
        let subsets = node.split.split(data, &instances, &distribution);
        node.distribution = distribution;
        node.data = Some(instances);
        let children = node.children.clone();
        for (child, subset) in children.into_iter().zip(subsets) {
            self.new_distribution(child, depth + 1, data, subset);
        }
    }
}

impl TreeView for Tree {
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

impl PrunableTree for Tree {
    fn node_data(&self, node: usize) -> Option<&Instances> {
        self.nodes.get(&node).and_then(|n| n.data.as_ref())
    }

    fn set_as_leaf(&mut self, node: usize) {
        self.remove_subtree(node);
        if let Some(n) = self.nodes.get_mut(&node) {
            n.split = SplitModel::NoSplit;
            n.distribution = n.distribution.to_single_bag();
            n.children.clear();
            n.is_leaf = true;
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
            self.remove_subtree(child);
            self.nodes.remove(&child);
        }
        let Some(raised) = self.nodes.remove(&raised) else {
            return;
        };
        let (depth, instances) = match self.nodes.get_mut(&node) {
            Some(n) => {
                n.split = raised.split;
                n.children = raised.children;
                n.is_leaf = raised.is_leaf;
                (n.depth, n.data.take().unwrap_or_default())
            }
            None => return,
        };
        self.new_distribution(node, depth, data, instances);
    }
}
