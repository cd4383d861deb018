use super::config::{PartialConsolidation, TreeConfig};
use super::ConsolidatedClassifier;
use crate::consolidated::partial::BudgetMode;
use crate::grower::PriorityCriterion;
use crate::sampler::{BagSize, ClassDistribution, ResamplingPolicy, SampleCount};

impl ConsolidatedClassifier {
    // Set methods for parameters

    /// Set the whole resampling policy.
    /// * `resampling` - How the samples are drawn from the training set.
    pub fn set_resampling(mut self, resampling: ResamplingPolicy) -> Self {
        self.cfg.resampling = resampling;
        self
    }

    /// Set sampling with or without replacement.
    /// * `replacement` - Draw every sample with replacement.
    pub fn set_replacement(mut self, replacement: bool) -> Self {
        self.cfg.resampling.replacement = replacement;
        self
    }

    /// Set the size of every sample.
    /// * `bag_size` - Percentage of the training set, minority class size or max size.
    pub fn set_bag_size(mut self, bag_size: BagSize) -> Self {
        self.cfg.resampling.bag_size = bag_size;
        self
    }

    /// Set the class distribution inside every sample.
    /// * `class_distribution` - Free, stratified, or a minority class percentage.
    pub fn set_class_distribution(mut self, class_distribution: ClassDistribution) -> Self {
        self.cfg.resampling.class_distribution = class_distribution;
        self
    }

    /// Set the number of samples.
    /// * `sample_count` - A fixed number of samples, or the coverage of the training set to reach.
    pub fn set_sample_count(mut self, sample_count: SampleCount) -> Self {
        self.cfg.resampling.sample_count = sample_count;
        self
    }

    /// Set the tree induction options.
    /// * `tree` - Pruning and split options shared by every tree.
    pub fn set_tree(mut self, tree: TreeConfig) -> Self {
        self.cfg.tree = tree;
        self
    }

    /// Set whether trees are left unpruned.
    /// * `unpruned` - Skip pessimistic pruning.
    pub fn set_unpruned(mut self, unpruned: bool) -> Self {
        self.cfg.tree.unpruned = unpruned;
        self
    }

    /// Set the pruning confidence factor.
    /// * `confidence_factor` - Smaller values prune more, in (0, 1).
    pub fn set_confidence_factor(mut self, confidence_factor: f64) -> Self {
        self.cfg.tree.confidence_factor = confidence_factor;
        self
    }

    /// Set the minimum number of instances per leaf.
    /// * `min_instances_per_leaf` - Minimum weight of at least two branches of a split.
    pub fn set_min_instances_per_leaf(mut self, min_instances_per_leaf: usize) -> Self {
        self.cfg.tree.min_instances_per_leaf = min_instances_per_leaf;
        self
    }

    /// Set subtree raising while pruning.
    /// * `subtree_raising` - Allow a node to be replaced by its largest branch.
    pub fn set_subtree_raising(mut self, subtree_raising: bool) -> Self {
        self.cfg.tree.subtree_raising = subtree_raising;
        self
    }

    /// Set the MDL correction of numeric splits.
    /// * `mdl_correction` - Penalise numeric splits by the number of candidate cut points.
    pub fn set_mdl_correction(mut self, mdl_correction: bool) -> Self {
        self.cfg.tree.mdl_correction = mdl_correction;
        self
    }

    /// Set Laplace smoothing of leaf probabilities.
    pub fn set_laplace(mut self, laplace: bool) -> Self {
        self.cfg.tree.laplace = laplace;
        self
    }

    /// Set partial consolidation.
    /// * `partial` - `None` for the fully consolidated tree, `Some` for the hybrid model.
    pub fn set_partial(mut self, partial: Option<PartialConsolidation>) -> Self {
        self.cfg.partial = partial;
        self
    }

    /// Build the hybrid model, keeping `percent` of the consolidated tree.
    /// * `percent` - Percentage, or number in absolute mode, of inner nodes or levels.
    /// * `priority` - Order in which the consolidated tree is grown and truncated.
    /// * `budget_mode` - How `percent` is read.
    pub fn set_consolidation(mut self, percent: f64, priority: PriorityCriterion, budget_mode: BudgetMode) -> Self {
        self.cfg.partial = Some(PartialConsolidation {
            percent,
            priority,
            budget_mode,
        });
        self
    }

    /// Set the seed of the resampler.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.cfg.seed = seed;
        self
    }

    /// Set the number of threads on the classifier.
    /// * `num_threads` - Set the number of threads used by bagging completion.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.cfg.num_threads = num_threads;
        self
    }
}
