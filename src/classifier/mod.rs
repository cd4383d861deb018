//! Consolidated Classifier
//!
//! End to end model: resample the training set, grow the consolidated tree,
//! prune it, keep part of it and complete the rest with one standalone tree per
//! sample.
use crate::consolidated::partial::{consolidation_target, growth_budget};
use crate::consolidated::tree::ConsolidatedTree;
use crate::consolidation::ConsolidatedSplitSelector;
use crate::data::{Dataset, Instances};
use crate::errors::ConsolidatedError;
use crate::grower::{GrowthBudget, PriorityCriterion};
use crate::measures::{aggregate_measures, TreeMeasures};
use crate::prune::{collapse, prune, PruneParams};
use crate::sampler::{Resampler, ResamplingReport};
use crate::splitter::C45Splitter;
use config::{ConsolidatedConfig, PartialConsolidation};
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod predict;
mod setters;

/// A fitted consolidated tree and what was done to obtain it.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ConsolidatedModel {
    pub tree: ConsolidatedTree,
    pub report: ResamplingReport,
    /// Predict with the shadow trees instead of the consolidated leaves, set when
    /// part of the consolidated tree was truncated.
    pub hybrid: bool,
    pub class_is_nominal: bool,
    pub missing: f64,
    /// Inner nodes of the untruncated consolidated tree.
    pub reference_inner_nodes: usize,
    /// Inner nodes kept consolidated.
    pub consolidated_inner_nodes: usize,
    /// Standalone trees grown by bagging completion.
    pub completed: usize,
}

/// Consolidated tree classifier.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ConsolidatedClassifier {
    pub cfg: ConsolidatedConfig,
    pub model: Option<ConsolidatedModel>,
}

/// Validate `config`, then fit a classifier on `dataset`.
pub fn build(dataset: &Dataset, config: ConsolidatedConfig) -> Result<ConsolidatedClassifier, ConsolidatedError> {
    let mut classifier = ConsolidatedClassifier::new(config)?;
    classifier.fit(dataset)?;
    Ok(classifier)
}

fn post_prune(tree: &mut ConsolidatedTree, data: &Dataset, params: &PruneParams) {
    if params.collapse {
        collapse(tree, 0);
    }
    if !params.unpruned {
        prune(tree, data, 0, params);
    }
}

impl ConsolidatedClassifier {
    /// Create a classifier, rejecting an invalid configuration.
    pub fn new(cfg: ConsolidatedConfig) -> Result<Self, ConsolidatedError> {
        cfg.validate()?;
        Ok(ConsolidatedClassifier { cfg, model: None })
    }

    /// Fit the classifier on every row of `data` with a known class.
    pub fn fit(&mut self, data: &Dataset) -> Result<(), ConsolidatedError> {
        self.cfg.validate()?;
        let sample_set =
            Resampler::new(self.cfg.resampling.clone(), self.cfg.tree.min_instances_per_leaf).generate(data, self.cfg.seed)?;
        let splitter = self.cfg.splitter();
        let prune_params = self.cfg.prune_params();
        let instances = data.instances_with_class();

        let (mut tree, reference_inner_nodes, consolidated_inner_nodes) = match self.cfg.partial {
            None => {
                let tree = self.consolidate(data, &splitter, instances, sample_set.samples, &prune_params);
                let inner = tree.num_inner_nodes();
                (tree, inner, inner)
            }
            Some(partial) if partial.priority == PriorityCriterion::Original => {
                let mut tree = self.consolidate(data, &splitter, instances, sample_set.samples, &prune_params);
                let reference = tree.num_inner_nodes();
                let target = consolidation_target(partial.percent, partial.budget_mode, reference);
                let kept = tree.leave_partially_consolidated(target);
                (tree, reference, kept)
            }
            Some(partial) => self.consolidate_budgeted(
                data,
                &splitter,
                instances,
                sample_set.samples,
                &prune_params,
                &partial,
            ),
        };

        // Without a truncated leaf the shadows add nothing to the consolidated tree.
        let hybrid = self.cfg.partial.is_some() && tree.nodes.values().any(|n| n.truncated);
        let completed = if hybrid {
            let pool = self.thread_pool()?;
            tree.complete_with_bagging(data, &splitter, &self.cfg.tree_params(), &pool)
        } else {
            0
        };
        tree.cleanup();

        if reference_inner_nodes > 0 && consolidated_inner_nodes == 0 && hybrid {
            warn!("No inner node was kept consolidated, the model is a bagging of independent trees.");
        }
        info!(
            "Consolidated {} of {} inner nodes, completed {} branches.",
            consolidated_inner_nodes, reference_inner_nodes, completed
        );

        self.model = Some(ConsolidatedModel {
            tree,
            report: sample_set.report,
            hybrid,
            class_is_nominal: data.class_is_nominal(),
            missing: data.missing(),
            reference_inner_nodes,
            consolidated_inner_nodes,
            completed,
        });
        Ok(())
    }

    /// Whole consolidated tree, grown recursively and pruned.
    fn consolidate(
        &self,
        data: &Dataset,
        splitter: &C45Splitter,
        instances: Instances,
        samples: Vec<Instances>,
        prune_params: &PruneParams,
    ) -> ConsolidatedTree {
        let selector = ConsolidatedSplitSelector::new(splitter);
        let mut tree = ConsolidatedTree::new();
        tree.build_recursive(&selector, data, instances, samples);
        post_prune(&mut tree, data, prune_params);
        tree
    }

    /// Consolidated tree grown in `partial.priority` order until the budget derived
    /// from an untruncated, unpruned build runs out.
    fn consolidate_budgeted(
        &self,
        data: &Dataset,
        splitter: &C45Splitter,
        instances: Instances,
        samples: Vec<Instances>,
        prune_params: &PruneParams,
        partial: &PartialConsolidation,
    ) -> (ConsolidatedTree, usize, usize) {
        let selector = ConsolidatedSplitSelector::new(splitter);
        let mut reference = ConsolidatedTree::new();
        let inner_nodes = reference.build_iterative(
            &selector,
            data,
            instances.clone(),
            samples.clone(),
            partial.priority,
            GrowthBudget::Unlimited,
        );
        let levels = reference.depth();
        let budget = growth_budget(partial.percent, partial.budget_mode, partial.priority, inner_nodes, levels);
        info!("Growing the consolidated tree with {:?}.", budget);

        let mut tree = ConsolidatedTree::new();
        tree.build_iterative(&selector, data, instances, samples, partial.priority, budget);
        post_prune(&mut tree, data, prune_params);
        let kept = tree.num_inner_nodes();
        (tree, inner_nodes, kept)
    }

    fn thread_pool(&self) -> Result<rayon::ThreadPool, ConsolidatedError> {
        let num_threads = match self.cfg.num_threads {
            Some(num_threads) => num_threads,
            None => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        };
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| {
                ConsolidatedError::InvalidParameter("num_threads".to_string(), "a usable thread count".to_string(), e.to_string())
            })
    }

    pub(crate) fn fitted(&self) -> Result<&ConsolidatedModel, ConsolidatedError> {
        self.model.as_ref().ok_or(ConsolidatedError::ModelNotFitted)
    }

    pub fn report(&self) -> Result<&ResamplingReport, ConsolidatedError> {
        Ok(&self.fitted()?.report)
    }

    /// Anomalies corrected while resampling.
    pub fn diagnostics(&self) -> Result<&[String], ConsolidatedError> {
        Ok(&self.fitted()?.report.diagnostics)
    }

    /// Every named measure of the fitted model. Hybrid models also report the
    /// aggregates of the shadow tree measures.
    pub fn measures(&self) -> Result<Vec<(String, f64)>, ConsolidatedError> {
        let model = self.fitted()?;
        let mut out = TreeMeasures::of(&model.tree).named();
        out.push(("achievedCoverage".to_string(), model.report.true_coverage));
        out.push(("samplesUsedForCoverage".to_string(), model.report.number_samples as f64));
        out.push(("consolidatedInnerNodes".to_string(), model.consolidated_inner_nodes as f64));
        let achieved = if model.reference_inner_nodes == 0 {
            100.0
        } else {
            100.0 * model.consolidated_inner_nodes as f64 / model.reference_inner_nodes as f64
        };
        out.push(("consolidationPercentAchieved".to_string(), achieved));
        if model.hybrid {
            let per_shadow: Vec<TreeMeasures> = (0..model.tree.num_samples)
                .map(|i| TreeMeasures::of(&model.tree.shadow(i)))
                .collect();
            out.extend(aggregate_measures(&per_shadow));
        }
        Ok(out)
    }

    /// One measure by name, e.g. `leafCount` or `innerNodeCountAvg`.
    pub fn measure(&self, name: &str) -> Result<f64, ConsolidatedError> {
        self.measures()?
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| {
                ConsolidatedError::InvalidParameter("measure".to_string(), "a known measure name".to_string(), name.to_string())
            })
    }
}
