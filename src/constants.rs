/// Absolute tolerance used by the float comparisons of the split and pruning code.
pub const FLOAT_TOLERANCE: f64 = 1e-6;
/// Minimum gap between two sorted numeric values for a cut point to be considered.
pub const DISTINCT_VALUE_GAP: f64 = 1e-5;
/// Largest value the minimum numeric split size can grow to.
pub const MAX_MIN_SPLIT: f64 = 25.0;
/// Share of the dataset rows above which a nominal attribute counts as many-valued.
pub const MANY_VALUES_RATIO: f64 = 0.3;
/// Slack allowed below the average info gain when choosing the best split.
pub const AVERAGE_GAIN_SLACK: f64 = 1e-3;
/// Slack used when collapsing a subtree into a leaf.
pub const COLLAPSE_TOLERANCE: f64 = 1e-3;
/// Slack used when comparing estimated errors during pruning.
pub const PRUNE_TOLERANCE: f64 = 0.1;
/// Fewest samples ever generated when the count is derived from coverage.
pub const MIN_NUMBER_SAMPLES: usize = 3;
/// Default pruning confidence factor.
pub const DEFAULT_CONFIDENCE_FACTOR: f64 = 0.25;
/// Default minimum number of instances per leaf.
pub const DEFAULT_MIN_INSTANCES_PER_LEAF: usize = 2;
/// Default bag size reduction applied when samples would otherwise be identical.
pub const DEFAULT_SIZE_REDUCTION_PERCENT: u32 = 75;
/// Default floor, as a percentage of the dataset, for the size of every class.
pub const DEFAULT_MIN_CLASS_FLOOR_PERCENT: f64 = 2.0;
