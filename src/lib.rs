// Modules
pub mod classifier;
pub mod consolidated;
pub mod consolidation;
pub mod constants;
pub mod data;
pub mod distribution;
pub mod errors;
pub mod grower;
pub mod measures;
pub mod node;
pub mod prune;
pub mod sampler;
pub mod splitter;
pub mod tree;
pub mod utils;

// Individual classes, and functions
pub use classifier::config::{ConfigIO, ConsolidatedConfig, PartialConsolidation, TreeConfig};
pub use classifier::{build, ConsolidatedClassifier};
pub use consolidated::partial::BudgetMode;
pub use consolidated::tree::ConsolidatedTree;
pub use data::{Attribute, Dataset, Instances};
pub use errors::ConsolidatedError;
pub use grower::PriorityCriterion;
pub use sampler::{BagSize, ClassDistribution, ResamplingPolicy, SampleCount};
