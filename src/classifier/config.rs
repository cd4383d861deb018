//! Classifier Configuration
//!
//! Options of the consolidated classifier: how samples are drawn, how every tree
//! is induced and pruned, and how much of the tree is consolidated.
use crate::consolidated::partial::BudgetMode;
use crate::constants::{DEFAULT_CONFIDENCE_FACTOR, DEFAULT_MIN_INSTANCES_PER_LEAF};
use crate::errors::ConsolidatedError;
use crate::grower::{GrowthBudget, PriorityCriterion};
use crate::prune::PruneParams;
use crate::sampler::ResamplingPolicy;
use crate::splitter::C45Splitter;
use crate::tree::tree::TreeParams;
use crate::utils::{approx_eq, validate_open_float_parameter};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_confidence_factor() -> f64 {
    DEFAULT_CONFIDENCE_FACTOR
}
fn default_min_instances_per_leaf() -> usize {
    DEFAULT_MIN_INSTANCES_PER_LEAF
}
fn default_true() -> bool {
    true
}
fn default_percent() -> f64 {
    20.0
}
fn default_seed() -> u64 {
    1
}

/// Induction and pruning of every tree, consolidated or standalone.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct TreeConfig {
    #[serde(default)]
    pub unpruned: bool,
    /// Confidence used by pessimistic pruning, in (0, 1).
    #[serde(default = "default_confidence_factor")]
    pub confidence_factor: f64,
    #[serde(default = "default_min_instances_per_leaf")]
    pub min_instances_per_leaf: usize,
    #[serde(default = "default_true")]
    pub subtree_raising: bool,
    #[serde(default = "default_true")]
    pub collapse_tree: bool,
    /// Penalise numeric splits by the number of candidate cut points.
    #[serde(default = "default_true")]
    pub mdl_correction: bool,
    #[serde(default = "default_true")]
    pub split_point_actual_value: bool,
    /// Laplace smoothing of leaf probabilities.
    #[serde(default)]
    pub laplace: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig {
            unpruned: false,
            confidence_factor: DEFAULT_CONFIDENCE_FACTOR,
            min_instances_per_leaf: DEFAULT_MIN_INSTANCES_PER_LEAF,
            subtree_raising: true,
            collapse_tree: true,
            mdl_correction: true,
            split_point_actual_value: true,
            laplace: false,
        }
    }
}

/// Part of the consolidated tree that is kept before bagging completion.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub struct PartialConsolidation {
    /// Percentage (or number, in absolute mode) of inner nodes or levels to keep.
    #[serde(default = "default_percent")]
    pub percent: f64,
    #[serde(default)]
    pub priority: PriorityCriterion,
    #[serde(default)]
    pub budget_mode: BudgetMode,
}

impl Default for PartialConsolidation {
    fn default() -> Self {
        PartialConsolidation {
            percent: default_percent(),
            priority: PriorityCriterion::Original,
            budget_mode: BudgetMode::Percentage,
        }
    }
}

/// Configuration of a consolidated classifier.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct ConsolidatedConfig {
    #[serde(default)]
    pub resampling: ResamplingPolicy,
    #[serde(default)]
    pub tree: TreeConfig,
    /// `None` keeps the whole consolidated tree and predicts with its own leaves,
    /// `Some` builds the hybrid model predicting with the shadow trees.
    #[serde(default)]
    pub partial: Option<PartialConsolidation>,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Threads used by bagging completion, all available when `None`.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

impl Default for ConsolidatedConfig {
    fn default() -> Self {
        ConsolidatedConfig {
            resampling: ResamplingPolicy::default(),
            tree: TreeConfig::default(),
            partial: None,
            seed: default_seed(),
            num_threads: None,
        }
    }
}

impl ConsolidatedConfig {
    /// Reject out of range values and contradictory combinations before any
    /// data is read.
    pub fn validate(&self) -> Result<(), ConsolidatedError> {
        self.resampling.validate()?;
        validate_open_float_parameter(self.tree.confidence_factor, 0.0, 1.0, "confidence_factor")?;
        if self.tree.unpruned && !approx_eq(self.tree.confidence_factor, DEFAULT_CONFIDENCE_FACTOR) {
            return Err(ConsolidatedError::IncompatibleParameters(
                "unpruned trees do not use a confidence factor".to_string(),
            ));
        }
        if self.tree.unpruned && !self.tree.subtree_raising {
            return Err(ConsolidatedError::IncompatibleParameters(
                "subtree raising has no effect on unpruned trees".to_string(),
            ));
        }
        if let Some(partial) = &self.partial {
            let valid = match partial.budget_mode {
                BudgetMode::Percentage => (0.0..=100.0).contains(&partial.percent),
                BudgetMode::Absolute => partial.percent >= 0.0,
            };
            if !valid {
                let expected = match partial.budget_mode {
                    BudgetMode::Percentage => "percentage within 0 and 100",
                    BudgetMode::Absolute => "non-negative number of inner nodes or levels",
                };
                return Err(ConsolidatedError::InvalidParameter(
                    "consolidation_percent".to_string(),
                    expected.to_string(),
                    partial.percent.to_string(),
                ));
            }
        }
        if self.num_threads == Some(0) {
            return Err(ConsolidatedError::InvalidParameter(
                "num_threads".to_string(),
                "at least one thread".to_string(),
                "0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn splitter(&self) -> C45Splitter {
        C45Splitter::new(
            self.tree.min_instances_per_leaf as f64,
            self.tree.mdl_correction,
            self.tree.split_point_actual_value,
        )
    }

    pub fn prune_params(&self) -> PruneParams {
        PruneParams {
            unpruned: self.tree.unpruned,
            collapse: self.tree.collapse_tree,
            subtree_raising: self.tree.subtree_raising,
            confidence_factor: self.tree.confidence_factor,
        }
    }

    /// Parameters of the standalone trees grown by bagging completion.
    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            priority: PriorityCriterion::Original,
            budget: GrowthBudget::Unlimited,
            prune: self.prune_params(),
        }
    }
}

pub trait ConfigIO: Serialize + DeserializeOwned + Sized {
    /// Save a configuration as a json object to a file.
    ///
    /// * `path` - Path to save the configuration.
    fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<(), ConsolidatedError> {
        fs::write(path, self.json_dump()?).map_err(|e| ConsolidatedError::UnableToWrite(e.to_string()))
    }

    /// Dump a configuration as a json object
    fn json_dump(&self) -> Result<String, ConsolidatedError> {
        serde_json::to_string(self).map_err(|e| ConsolidatedError::UnableToWrite(e.to_string()))
    }

    /// Load a configuration from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, ConsolidatedError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| ConsolidatedError::UnableToRead(e.to_string()))
    }

    /// Load a configuration from a path to a json object.
    ///
    /// * `path` - Path to load the configuration from.
    fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, ConsolidatedError> {
        let json_str = fs::read_to_string(path).map_err(|e| ConsolidatedError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl ConfigIO for ConsolidatedConfig {}
