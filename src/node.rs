use crate::data::Instances;
use crate::distribution::Distribution;
use crate::splitter::{SplitCandidate, SplitModel};
use crate::tree::tree::Tree;
use crate::utils::approx_eq;
use serde::{Deserialize, Serialize};

/// Node of a standalone tree.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct TreeNode {
    pub num: usize,
    pub depth: usize,
    pub split: SplitModel,
    pub distribution: Distribution,
    pub children: Vec<usize>,
    pub is_leaf: bool,
    pub is_empty: bool,
    /// Training rows reaching the node, dropped once the tree is final.
    #[serde(skip)]
    pub data: Option<Instances>,
}

impl TreeNode {
    pub fn new(num: usize, depth: usize, num_classes: usize) -> Self {
        TreeNode {
            num,
            depth,
            split: SplitModel::NoSplit,
            distribution: Distribution::new(1, num_classes),
            children: Vec::new(),
            is_leaf: true,
            is_empty: false,
            data: None,
        }
    }

    pub fn make_parent_node(&mut self, candidate: SplitCandidate, children: Vec<usize>) {
        self.split = candidate.model;
        self.distribution = candidate.distribution;
        self.children = children;
        self.is_leaf = false;
        self.is_empty = false;
    }

    pub fn make_leaf_node(&mut self, distribution: Distribution) {
        self.is_empty = approx_eq(distribution.total(), 0.0);
        self.split = SplitModel::NoSplit;
        self.distribution = distribution.to_single_bag();
        self.children = Vec::new();
        self.is_leaf = true;
    }
}

/// Per-sample counterpart of a consolidated node.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ShadowNode {
    pub split: SplitModel,
    /// Distribution of the sample's rows reaching the node.
    pub distribution: Distribution,
    pub is_leaf: bool,
    pub is_empty: bool,
    #[serde(skip)]
    pub data: Option<Instances>,
    /// Independent tree grown on the sample's rows where consolidation stopped.
    pub completion: Option<Tree>,
}

impl ShadowNode {
    pub fn new(num_classes: usize) -> Self {
        ShadowNode {
            split: SplitModel::NoSplit,
            distribution: Distribution::new(1, num_classes),
            is_leaf: true,
            is_empty: false,
            data: None,
            completion: None,
        }
    }

    pub fn make_parent_node(&mut self, candidate: SplitCandidate) {
        self.is_empty = approx_eq(candidate.distribution.total(), 0.0);
        self.split = candidate.model;
        self.distribution = candidate.distribution;
        self.is_leaf = false;
    }

    pub fn make_leaf_node(&mut self, distribution: Distribution) {
        self.is_empty = approx_eq(distribution.total(), 0.0);
        self.split = SplitModel::NoSplit;
        self.distribution = distribution.to_single_bag();
        self.is_leaf = true;
    }
}

/// Node of the consolidated tree, carrying its shadow node for every sample.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ConsolidatedNode {
    pub num: usize,
    pub depth: usize,
    pub split: SplitModel,
    /// Average of the shadow distributions.
    pub distribution: Distribution,
    pub children: Vec<usize>,
    pub is_leaf: bool,
    pub is_empty: bool,
    /// Leaf only because consolidation stopped here.
    pub truncated: bool,
    /// Original training rows reaching the node.
    #[serde(skip)]
    pub data: Option<Instances>,
    pub shadows: Vec<ShadowNode>,
}

impl ConsolidatedNode {
    pub fn new(num: usize, depth: usize, num_samples: usize, num_classes: usize) -> Self {
        ConsolidatedNode {
            num,
            depth,
            split: SplitModel::NoSplit,
            distribution: Distribution::new(1, num_classes),
            children: Vec::new(),
            is_leaf: true,
            is_empty: false,
            truncated: false,
            data: None,
            shadows: vec![ShadowNode::new(num_classes); num_samples],
        }
    }
}

/// Read access to a tree, shared by prediction and the measures.
pub trait TreeView {
    fn root(&self) -> usize {
        0
    }
    fn split(&self, node: usize) -> &SplitModel;
    fn distribution(&self, node: usize) -> &Distribution;
    fn children(&self, node: usize) -> &[usize];
    fn is_leaf(&self, node: usize) -> bool;
    fn is_empty(&self, node: usize) -> bool;
    /// Independent tree continuing a leaf.
    fn completion(&self, _node: usize) -> Option<&Tree> {
        None
    }
}
