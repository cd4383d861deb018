use super::tree::ConsolidatedTree;
use crate::distribution::Distribution;
use crate::node::TreeView;
use crate::splitter::SplitModel;
use crate::tree::predict::{class_probabilities, mean_value};
use crate::tree::tree::Tree;

/// Shadow tree of one sample, read from the consolidated arena.
pub struct ShadowView<'a> {
    tree: &'a ConsolidatedTree,
    sample: usize,
}

impl<'a> TreeView for ShadowView<'a> {
    fn split(&self, node: usize) -> &SplitModel {
        &self.tree.nodes[&node].shadows[self.sample].split
    }

    fn distribution(&self, node: usize) -> &Distribution {
        &self.tree.nodes[&node].shadows[self.sample].distribution
    }

    fn children(&self, node: usize) -> &[usize] {
        &self.tree.nodes[&node].children
    }

    fn is_leaf(&self, node: usize) -> bool {
        self.tree.nodes[&node].shadows[self.sample].is_leaf
    }

    fn is_empty(&self, node: usize) -> bool {
        self.tree.nodes[&node].shadows[self.sample].is_empty
    }

    fn completion(&self, node: usize) -> Option<&Tree> {
        self.tree.nodes[&node].shadows[self.sample].completion.as_ref()
    }
}

impl ConsolidatedTree {
    pub fn shadow(&self, sample: usize) -> ShadowView<'_> {
        ShadowView { tree: self, sample }
    }

    /// Class probabilities from the consolidated tree alone.
    pub fn predict_consolidated_row(&self, row: &[f64], missing: f64, laplace: bool) -> Vec<f64> {
        class_probabilities(self, self.num_classes, row, missing, laplace)
    }

    /// Class probabilities of the shadow trees summed and normalized.
    pub fn predict_hybrid_row(&self, row: &[f64], missing: f64, laplace: bool) -> Vec<f64> {
        let mut probs = vec![0.0; self.num_classes];
        for sample in 0..self.num_samples {
            let shadow = class_probabilities(&self.shadow(sample), self.num_classes, row, missing, laplace);
            probs.iter_mut().zip(shadow).for_each(|(p, s)| *p += s);
        }
        let total: f64 = probs.iter().sum();
        if total > 0.0 {
            probs.iter_mut().for_each(|p| *p /= total);
        }
        probs
    }

    pub fn predict_consolidated_value(&self, row: &[f64], missing: f64) -> f64 {
        mean_value(self, row, missing)
    }

    /// Average of the shadow tree predictions, for a numeric class.
    pub fn predict_hybrid_value(&self, row: &[f64], missing: f64) -> f64 {
        if self.num_samples == 0 {
            return 0.0;
        }
        let sum: f64 = (0..self.num_samples)
            .map(|sample| mean_value(&self.shadow(sample), row, missing))
            .sum();
        sum / self.num_samples as f64
    }
}
