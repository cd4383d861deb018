//! Partial consolidation
//!
//! Keeps only part of the consolidated tree and lets every sample grow its own
//! standalone tree wherever consolidation was cut short.
use super::tree::ConsolidatedTree;
use crate::data::Dataset;
use crate::grower::{GrowthBudget, PriorityCriterion, WorkItem, WorkList};
use crate::node::{ShadowNode, TreeView};
use crate::splitter::Splitter;
use crate::tree::tree::{Tree, TreeParams};
use log::debug;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};

/// How the consolidation value is turned into a budget.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum BudgetMode {
    /// Percentage of the inner nodes, or levels, of the untruncated tree.
    #[default]
    Percentage,
    /// Number of inner nodes, or levels, kept as is.
    Absolute,
}

/// Number of inner nodes (or levels) to consolidate out of `available`.
pub fn consolidation_target(value: f64, mode: BudgetMode, available: usize) -> usize {
    match mode {
        BudgetMode::Percentage => ((available as f64 * value) / 100.0 + 0.5) as usize,
        BudgetMode::Absolute => (value + 0.5) as usize,
    }
}

/// Growth budget of the iterative builder for a priority criterion, given the
/// inner nodes and levels of the untruncated tree.
pub fn growth_budget(
    value: f64,
    mode: BudgetMode,
    priority: PriorityCriterion,
    inner_nodes: usize,
    levels: usize,
) -> GrowthBudget {
    match priority {
        PriorityCriterion::LevelByLevel => GrowthBudget::MaxLevels(consolidation_target(value, mode, levels)),
        _ => GrowthBudget::MaxInnerNodes(consolidation_target(value, mode, inner_nodes)),
    }
}

impl ConsolidatedTree {
    /// Keep the `target` heaviest inner nodes reachable from the root through kept
    /// nodes and truncate the rest. Returns the number of inner nodes kept.
    pub fn leave_partially_consolidated(&mut self, target: usize) -> usize {
        let mut pending: WorkList<()> = WorkList::new(PriorityCriterion::Size);
        if !self.is_leaf(self.root()) {
            let root = self.root();
            pending.add_node(WorkItem::new(root, 0, self.distribution(root).total(), ()));
        }
        let mut kept = 0;
        while kept < target {
            let Some(item) = pending.get_next_node() else {
                break;
            };
            let children: Vec<usize> = self
                .children(item.node)
                .iter()
                .copied()
                .filter(|c| !self.is_leaf(*c))
                .collect();
            for child in children {
                pending.add_node(WorkItem::new(child, item.depth + 1, self.distribution(child).total(), ()));
            }
            kept += 1;
        }
        while let Some(item) = pending.get_next_node() {
            self.truncate(item.node);
        }
        kept
    }

    /// Grow a standalone tree on every shadow of every truncated leaf, from the
    /// sample's own rows at that leaf. Returns the number of trees grown.
    pub fn complete_with_bagging<S: Splitter + Sync>(
        &mut self,
        data: &Dataset,
        splitter: &S,
        params: &TreeParams,
        pool: &ThreadPool,
    ) -> usize {
        let mut slots: Vec<&mut ShadowNode> = self
            .nodes
            .values_mut()
            .filter(|n| n.is_leaf && n.truncated)
            .flat_map(|n| n.shadows.iter_mut())
            .filter(|s| s.data.is_some())
            .collect();
        let completed = slots.len();
        pool.install(|| {
            slots.par_iter_mut().for_each(|shadow| {
                if let Some(instances) = shadow.data.clone() {
                    let mut tree = Tree::new();
                    tree.fit(data, instances, splitter, params);
                    shadow.completion = Some(tree);
                }
            })
        });
        debug!("Grew {} completion trees", completed);
        completed
    }
}
