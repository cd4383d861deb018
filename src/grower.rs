use serde::Deserialize;
use serde::Serialize;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::VecDeque;

/// Trait for handling the growth of the tree.
pub trait Grower<T> {
    /// Add a node to the grower.
    fn add_node(&mut self, node: T);
    /// Get the next node to split.
    fn get_next_node(&mut self) -> Option<T>;
    /// Check if the grower is empty.
    fn is_empty(&self) -> bool;
}

impl<T: Ord> Grower<T> for BinaryHeap<T> {
    fn add_node(&mut self, node: T) {
        self.push(node);
    }

    fn get_next_node(&mut self) -> Option<T> {
        self.pop()
    }

    fn is_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Grower<T> for VecDeque<T> {
    fn add_node(&mut self, node: T) {
        self.push_back(node);
    }

    fn get_next_node(&mut self) -> Option<T> {
        self.pop_front()
    }

    fn is_empty(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Grower<T> for Vec<T> {
    fn add_node(&mut self, node: T) {
        self.push(node);
    }

    fn get_next_node(&mut self) -> Option<T> {
        self.pop()
    }

    fn is_empty(&self) -> bool {
        self.is_empty()
    }
}

/// Order in which pending nodes are expanded.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum PriorityCriterion {
    /// Depth first, as plain recursion would visit the nodes.
    #[default]
    Original,
    /// Breadth first.
    LevelByLevel,
    /// Depth first.
    Preorder,
    /// Heaviest pending node first.
    Size,
    /// Pending node with the best split first.
    GainRatio,
    /// Pending node with the largest weight times gain ratio first.
    NormalizedGainRatio,
}

impl PriorityCriterion {
    /// Ranking children requires their best split to be searched when they are created.
    pub fn needs_gain_ratio(&self) -> bool {
        matches!(self, PriorityCriterion::GainRatio | PriorityCriterion::NormalizedGainRatio)
    }

    /// Priority of a child reaching `branch_weight`, whose own best split has `gain_ratio`.
    pub fn child_priority(&self, branch_weight: f64, gain_ratio: f64) -> f64 {
        match self {
            PriorityCriterion::Size => branch_weight,
            PriorityCriterion::GainRatio => gain_ratio,
            PriorityCriterion::NormalizedGainRatio => {
                if gain_ratio == f64::NEG_INFINITY {
                    f64::NEG_INFINITY
                } else {
                    branch_weight * gain_ratio
                }
            }
            _ => 0.0,
        }
    }
}

/// Limit on how far a tree may grow.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum GrowthBudget {
    Unlimited,
    /// Nodes deeper than this are never split.
    MaxLevels(usize),
    /// No more than this many nodes are split.
    MaxInnerNodes(usize),
}

impl GrowthBudget {
    #[inline]
    pub fn allows_split(&self, depth: usize, inner_nodes: usize) -> bool {
        match self {
            GrowthBudget::Unlimited => true,
            GrowthBudget::MaxLevels(levels) => depth < *levels,
            GrowthBudget::MaxInnerNodes(nodes) => inner_nodes < *nodes,
        }
    }
}

/// A node waiting to be expanded.
#[derive(Debug)]
pub struct WorkItem<T> {
    pub node: usize,
    pub depth: usize,
    pub priority: f64,
    seq: usize,
    pub payload: T,
}

impl<T> WorkItem<T> {
    pub fn new(node: usize, depth: usize, priority: f64, payload: T) -> Self {
        WorkItem {
            node,
            depth,
            priority,
            seq: 0,
            payload,
        }
    }
}

// Highest priority first, oldest first among equals.
impl<T> Ord for WorkItem<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for WorkItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for WorkItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for WorkItem<T> {}

enum Pending<T> {
    Stack(Vec<WorkItem<T>>),
    Queue(VecDeque<WorkItem<T>>),
    Heap(BinaryHeap<WorkItem<T>>),
}

/// Pending nodes, handed out in the order of a [`PriorityCriterion`].
pub struct WorkList<T> {
    pending: Pending<T>,
    seq: usize,
}

impl<T> WorkList<T> {
    pub fn new(criterion: PriorityCriterion) -> Self {
        let pending = match criterion {
            PriorityCriterion::Original | PriorityCriterion::Preorder => Pending::Stack(Vec::new()),
            PriorityCriterion::LevelByLevel => Pending::Queue(VecDeque::new()),
            _ => Pending::Heap(BinaryHeap::new()),
        };
        WorkList { pending, seq: 0 }
    }

    pub fn add_node(&mut self, mut item: WorkItem<T>) {
        item.seq = self.seq;
        self.seq += 1;
        match &mut self.pending {
            Pending::Stack(s) => s.add_node(item),
            Pending::Queue(q) => q.add_node(item),
            Pending::Heap(h) => h.add_node(item),
        }
    }

    /// Add the children of an expanded node, given in branch order.
    pub fn add_children(&mut self, children: Vec<WorkItem<T>>) {
        if let Pending::Stack(_) = self.pending {
            // The first child has to come out first.
            for child in children.into_iter().rev() {
                self.add_node(child);
            }
        } else {
            for child in children {
                self.add_node(child);
            }
        }
    }

    pub fn get_next_node(&mut self) -> Option<WorkItem<T>> {
        match &mut self.pending {
            Pending::Stack(s) => s.get_next_node(),
            Pending::Queue(q) => q.get_next_node(),
            Pending::Heap(h) => h.get_next_node(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.pending {
            Pending::Stack(s) => s.is_empty(),
            Pending::Queue(q) => q.is_empty(),
            Pending::Heap(h) => h.is_empty(),
        }
    }
}
