//! Consolidation
//!
//! Consensus split selection: every sample proposes its own best split, the
//! attribute with the most votes wins and, when numeric, its split point is the
//! lower median of the points proposed for it. The split is then applied to every
//! sample and the resulting distributions are averaged.
use crate::data::{Dataset, Instances};
use crate::distribution::Distribution;
use crate::splitter::{gain_ratio, info_gain, SplitCandidate, SplitModel, Splitter};
use crate::utils::{first_max_index, lower_median};

/// Outcome of consolidating one node.
#[derive(Debug, Clone)]
pub struct ConsolidatedDecision {
    /// Consensus split, `NoSplit` for a leaf.
    pub model: SplitModel,
    /// Average of the sample distributions under `model`.
    pub distribution: Distribution,
    /// Average of the sample distributions without splitting.
    pub leaf_distribution: Distribution,
    pub info_gain: f64,
    pub gain_ratio: f64,
    /// `model` applied to every sample, in sample order.
    pub sample_splits: Vec<SplitCandidate>,
    /// Unsplit distribution of every sample, in sample order.
    pub sample_leaves: Vec<Distribution>,
}

impl ConsolidatedDecision {
    #[inline]
    pub fn is_split(&self) -> bool {
        self.model.is_split()
    }

    /// Gain ratio used to rank nodes, negative infinity for a leaf.
    pub fn priority_gain_ratio(&self) -> f64 {
        if self.is_split() {
            self.gain_ratio
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Turn the decision into a leaf, keeping the unsplit distributions.
    pub fn into_leaf(mut self) -> Self {
        self.model = SplitModel::NoSplit;
        self.distribution = self.leaf_distribution.clone();
        self.info_gain = 0.0;
        self.gain_ratio = 0.0;
        self.sample_splits = self.sample_leaves.iter().cloned().map(SplitCandidate::leaf).collect();
        self
    }
}

/// Tally the split proposed by every sample into one consensus split.
///
/// The most voted attribute wins, the lowest attribute index on ties. A numeric
/// attribute is cut at the lower median of the points proposed for it.
pub fn consensus_split(data: &Dataset, proposals: &[SplitModel]) -> SplitModel {
    let mut votes = vec![0.0; data.num_attributes()];
    let mut points: Vec<Vec<f64>> = vec![Vec::new(); data.num_attributes()];
    for proposal in proposals {
        if let Some(att) = proposal.attribute() {
            votes[att] += 1.0;
            if let Some(p) = proposal.split_point() {
                points[att].push(p);
            }
        }
    }
    let winner = first_max_index(&votes);
    if votes.is_empty() || votes[winner] == 0.0 {
        return SplitModel::NoSplit;
    }
    let attribute = data.attribute(winner);
    if attribute.is_nominal() {
        SplitModel::Nominal {
            attribute: winner,
            num_values: attribute.num_values(),
        }
    } else {
        match lower_median(&points[winner]) {
            Some(split_point) => SplitModel::Numeric {
                attribute: winner,
                split_point,
            },
            None => SplitModel::NoSplit,
        }
    }
}

/// Chooses one split for a node from all of its samples.
pub struct ConsolidatedSplitSelector<'a, S: Splitter> {
    splitter: &'a S,
}

impl<'a, S: Splitter> ConsolidatedSplitSelector<'a, S> {
    pub fn new(splitter: &'a S) -> Self {
        ConsolidatedSplitSelector { splitter }
    }

    pub fn splitter(&self) -> &S {
        self.splitter
    }

    /// Consolidated decision for the node whose sample partitions are `samples`.
    pub fn select(&self, data: &Dataset, samples: &[Instances]) -> ConsolidatedDecision {
        let sample_leaves: Vec<Distribution> = samples.iter().map(|s| Distribution::from_instances(data, s)).collect();
        let leaf_distribution =
            Distribution::average(&sample_leaves).unwrap_or_else(|| Distribution::new(1, data.num_classes()));
        let proposals: Vec<SplitModel> = samples
            .iter()
            .map(|s| self.splitter.select_split(data, s).model)
            .collect();
        let model = consensus_split(data, &proposals);

        let leaf = ConsolidatedDecision {
            model: SplitModel::NoSplit,
            distribution: leaf_distribution.clone(),
            leaf_distribution: leaf_distribution.clone(),
            info_gain: 0.0,
            gain_ratio: 0.0,
            sample_splits: sample_leaves.iter().cloned().map(SplitCandidate::leaf).collect(),
            sample_leaves: sample_leaves.clone(),
        };
        if !model.is_split() {
            return leaf;
        }

        let sample_splits: Vec<SplitCandidate> = samples
            .iter()
            .map(|s| self.splitter.force_split(data, s, &model))
            .collect();
        let split_dists: Vec<Distribution> = sample_splits.iter().map(|c| c.distribution.clone()).collect();
        let distribution = match Distribution::average(&split_dists) {
            Some(d) => d,
            None => return leaf,
        };
        if !distribution.check(self.splitter.min_no_obj()) {
            return leaf;
        }
        let sum_of_weights = leaf_distribution.total();
        let info_gain = info_gain(&distribution, sum_of_weights);
        let gain_ratio = gain_ratio(&distribution, sum_of_weights, info_gain);
        ConsolidatedDecision {
            model,
            distribution,
            leaf_distribution,
            info_gain,
            gain_ratio,
            sample_splits,
            sample_leaves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::tests_support::two_class_dataset;
    use crate::data::Attribute;
    use crate::sampler::{BagSize, ClassDistribution, Resampler, ResamplingPolicy, SampleCount};
    use crate::splitter::C45Splitter;
    use approx::assert_relative_eq;

    fn schema() -> Dataset {
        Dataset::from_rows(
            vec![
                Attribute::numeric("a"),
                Attribute::numeric("b"),
                Attribute::nominal("class", &["n", "p"]),
            ],
            &[vec![0.0, 0.0, 0.0]],
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_lower_median_split_point() {
        let data = schema();
        let proposals = vec![
            SplitModel::Numeric {
                attribute: 0,
                split_point: 3.0,
            },
            SplitModel::Numeric {
                attribute: 0,
                split_point: 3.2,
            },
            SplitModel::Numeric {
                attribute: 1,
                split_point: 7.0,
            },
            SplitModel::Numeric {
                attribute: 0,
                split_point: 3.1,
            },
            SplitModel::Numeric {
                attribute: 0,
                split_point: 2.9,
            },
        ];
        assert_eq!(
            consensus_split(&data, &proposals),
            SplitModel::Numeric {
                attribute: 0,
                split_point: 3.0
            }
        );
    }

    #[test]
    fn test_vote_ties_go_to_lowest_attribute() {
        let data = schema();
        let proposals = vec![
            SplitModel::Numeric {
                attribute: 1,
                split_point: 1.0,
            },
            SplitModel::NoSplit,
            SplitModel::Numeric {
                attribute: 0,
                split_point: 2.0,
            },
        ];
        assert_eq!(consensus_split(&data, &proposals).attribute(), Some(0));
        assert_eq!(consensus_split(&data, &[SplitModel::NoSplit, SplitModel::NoSplit]), SplitModel::NoSplit);
    }

    #[test]
    fn test_consolidated_distribution_is_sample_average() {
        let data = two_class_dataset(300, 11, 0.05);
        let policy = ResamplingPolicy {
            class_distribution: ClassDistribution::Stratified,
            bag_size: BagSize::Percent(60),
            sample_count: SampleCount::Fixed(6),
            ..Default::default()
        };
        let set = Resampler::new(policy, 2).generate(&data, 1).unwrap();
        let splitter = C45Splitter::new(2.0, true, true);
        let decision = ConsolidatedSplitSelector::new(&splitter).select(&data, &set.samples);
        assert!(decision.is_split());
        assert_eq!(decision.sample_splits.len(), 6);

        let direct: Vec<Distribution> = set.samples.iter().map(|s| decision.model.distribution(&data, s)).collect();
        let avg = Distribution::average(&direct).unwrap();
        for bag in 0..avg.num_bags() {
            for class in 0..avg.num_classes() {
                assert_relative_eq!(
                    decision.distribution.per_class_per_bag(bag, class),
                    avg.per_class_per_bag(bag, class),
                    epsilon = 1e-9
                );
            }
        }
        assert_relative_eq!(decision.leaf_distribution.total(), 180.0, epsilon = 1e-9);
        assert!(decision.gain_ratio > 0.0);
    }

    #[test]
    fn test_empty_samples_make_a_leaf() {
        let data = two_class_dataset(50, 3, 0.0);
        let splitter = C45Splitter::new(2.0, true, true);
        let samples = vec![Instances::new(), Instances::new(), Instances::new()];
        let decision = ConsolidatedSplitSelector::new(&splitter).select(&data, &samples);
        assert!(!decision.is_split());
        assert_eq!(decision.distribution.total(), 0.0);
        assert_eq!(decision.priority_gain_ratio(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_into_leaf() {
        let data = two_class_dataset(300, 11, 0.0);
        let samples = vec![data.instances_with_class(); 3];
        let splitter = C45Splitter::new(2.0, true, true);
        let decision = ConsolidatedSplitSelector::new(&splitter).select(&data, &samples).into_leaf();
        assert!(!decision.is_split());
        assert_eq!(decision.distribution.num_bags(), 1);
        assert!(decision.sample_splits.iter().all(|c| !c.model.is_split()));
        assert_relative_eq!(decision.distribution.total(), 300.0, epsilon = 1e-9);
    }
}
