//! Splitter
//!
//! Split models and the C4.5 gain-ratio split criterion. A [`Splitter`] either
//! searches the best split of a set of instances or applies a split decided
//! elsewhere ("forced") to them, returning the resulting [`Distribution`].
use crate::constants::{AVERAGE_GAIN_SLACK, DISTINCT_VALUE_GAP, MANY_VALUES_RATIO, MAX_MIN_SPLIT};
use crate::data::{Dataset, Instances};
use crate::distribution::Distribution;
use crate::utils::{approx_eq, greater, greater_or_eq, is_missing, ln_func, smaller, smaller_or_eq};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f64::consts::LN_2;

/// How a node partitions its instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SplitModel {
    /// Leaf.
    NoSplit,
    /// One branch per label of a nominal attribute.
    Nominal { attribute: usize, num_values: usize },
    /// Two branches, `<= split_point` and `> split_point`.
    Numeric { attribute: usize, split_point: f64 },
}

impl SplitModel {
    pub fn num_subsets(&self) -> usize {
        match self {
            SplitModel::NoSplit => 1,
            SplitModel::Nominal { num_values, .. } => *num_values,
            SplitModel::Numeric { .. } => 2,
        }
    }

    #[inline]
    pub fn is_split(&self) -> bool {
        !matches!(self, SplitModel::NoSplit)
    }

    pub fn attribute(&self) -> Option<usize> {
        match self {
            SplitModel::NoSplit => None,
            SplitModel::Nominal { attribute, .. } | SplitModel::Numeric { attribute, .. } => Some(*attribute),
        }
    }

    pub fn split_point(&self) -> Option<f64> {
        match self {
            SplitModel::Numeric { split_point, .. } => Some(*split_point),
            _ => None,
        }
    }

    /// Branch taken by a value of the split attribute, `None` when the value is missing.
    pub fn which_subset(&self, value: f64, missing: f64) -> Option<usize> {
        match self {
            SplitModel::NoSplit => Some(0),
            _ if is_missing(&value, &missing) => None,
            SplitModel::Nominal { num_values, .. } => {
                let code = value as usize;
                if value < 0.0 || code >= *num_values {
                    None
                } else {
                    Some(code)
                }
            }
            SplitModel::Numeric { split_point, .. } => {
                if value <= *split_point {
                    Some(0)
                } else {
                    Some(1)
                }
            }
        }
    }

    /// Branch taken by a row of the dataset.
    #[inline]
    pub fn subset_of_row(&self, data: &Dataset, row: usize) -> Option<usize> {
        match self.attribute() {
            None => Some(0),
            Some(att) => self.which_subset(data.get(row, att), data.missing()),
        }
    }

    /// Distribution of the instances over the branches, rows missing the split
    /// attribute spread in proportion to the known ones.
    pub fn distribution(&self, data: &Dataset, instances: &Instances) -> Distribution {
        let att = match self.attribute() {
            None => return Distribution::from_instances(data, instances),
            Some(att) => att,
        };
        let mut dist = Distribution::new(self.num_subsets(), data.num_classes());
        for (row, w) in instances.iter() {
            if let Some(subset) = self.subset_of_row(data, row) {
                dist.add(subset, data, row, w);
            }
        }
        dist.add_with_unknown(data, instances, att);
        dist
    }

    /// Partition the instances over the branches. Rows missing the split attribute
    /// go to every branch with their weight scaled by the branch share of `dist`.
    pub fn split(&self, data: &Dataset, instances: &Instances, dist: &Distribution) -> Vec<Instances> {
        if !self.is_split() {
            return vec![instances.clone()];
        }
        let proportions = dist.bag_proportions();
        let mut subsets = vec![Instances::new(); self.num_subsets()];
        for (row, w) in instances.iter() {
            match self.subset_of_row(data, row) {
                Some(subset) => subsets[subset].push(row, w),
                None => {
                    for (subset, p) in proportions.iter().enumerate() {
                        if *p > 0.0 {
                            subsets[subset].push(row, w * p);
                        }
                    }
                }
            }
        }
        subsets
    }
}

/// A split model together with the distribution it induces and its quality.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitCandidate {
    pub model: SplitModel,
    pub distribution: Distribution,
    pub info_gain: f64,
    pub gain_ratio: f64,
}

impl SplitCandidate {
    pub fn leaf(distribution: Distribution) -> Self {
        SplitCandidate {
            model: SplitModel::NoSplit,
            distribution,
            info_gain: 0.0,
            gain_ratio: 0.0,
        }
    }

    /// Gain ratio used to rank nodes, negative infinity when the node cannot split.
    pub fn priority_gain_ratio(&self) -> f64 {
        if self.model.is_split() {
            self.gain_ratio
        } else {
            f64::NEG_INFINITY
        }
    }
}

/// Split search for one set of instances.
pub trait Splitter {
    /// Minimum weight that at least two branches of a split must hold.
    fn min_no_obj(&self) -> f64;
    /// Best split of the instances, or a leaf.
    fn select_split(&self, data: &Dataset, instances: &Instances) -> SplitCandidate;
    /// Apply an already chosen split to the instances.
    fn force_split(&self, data: &Dataset, instances: &Instances, model: &SplitModel) -> SplitCandidate;
}

/// Entropy of the class distribution before splitting, in bits times the weight.
pub fn old_ent(dist: &Distribution) -> f64 {
    let mut ent = 0.0;
    for c in 0..dist.num_classes() {
        ent += ln_func(dist.per_class(c));
    }
    (ln_func(dist.total()) - ent) / LN_2
}

/// Entropy of the class distribution after splitting, in bits times the weight.
pub fn new_ent(dist: &Distribution) -> f64 {
    let mut ent = 0.0;
    for b in 0..dist.num_bags() {
        for c in 0..dist.num_classes() {
            ent += ln_func(dist.per_class_per_bag(b, c));
        }
        ent -= ln_func(dist.per_bag(b));
    }
    -ent / LN_2
}

/// Split information, counting the rows with unknown values as an extra branch.
pub fn split_ent(dist: &Distribution, total_no_inst: f64) -> f64 {
    let mut ent = 0.0;
    if greater(dist.total(), 0.0) {
        let no_unknown = total_no_inst - dist.total();
        for b in 0..dist.num_bags() {
            ent -= ln_func(dist.per_bag(b));
        }
        ent -= ln_func(no_unknown);
        ent += ln_func(total_no_inst);
    }
    ent / LN_2
}

/// Information gain per instance, discounted by the share of unknown values.
pub fn info_gain_given_old(dist: &Distribution, total_no_inst: f64, old: f64) -> f64 {
    let numerator = old - new_ent(dist);
    if approx_eq(numerator, 0.0) || approx_eq(dist.total(), 0.0) {
        return 0.0;
    }
    let unknown_rate = (total_no_inst - dist.total()) / total_no_inst;
    (1.0 - unknown_rate) * numerator / dist.total()
}

pub fn info_gain(dist: &Distribution, total_no_inst: f64) -> f64 {
    info_gain_given_old(dist, total_no_inst, old_ent(dist))
}

pub fn gain_ratio(dist: &Distribution, total_no_inst: f64, info_gain: f64) -> f64 {
    let denominator = split_ent(dist, total_no_inst);
    if approx_eq(denominator, 0.0) {
        return 0.0;
    }
    info_gain / (denominator / total_no_inst)
}

/// C4.5 model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct C45Splitter {
    /// Minimum weight per branch.
    pub min_no_obj: f64,
    /// Penalise numeric splits by the number of candidate cut points.
    pub use_mdl_correction: bool,
    /// Move numeric split points down to the closest value seen in the training data.
    pub split_point_actual_value: bool,
}

struct AttributeSplit {
    model: SplitModel,
    distribution: Distribution,
    info_gain: f64,
    gain_ratio: f64,
}

impl C45Splitter {
    pub fn new(min_no_obj: f64, use_mdl_correction: bool, split_point_actual_value: bool) -> Self {
        C45Splitter {
            min_no_obj,
            use_mdl_correction,
            split_point_actual_value,
        }
    }

    fn nominal_split(&self, data: &Dataset, instances: &Instances, att: usize, sum_of_weights: f64) -> Option<AttributeSplit> {
        let model = SplitModel::Nominal {
            attribute: att,
            num_values: data.attribute(att).num_values(),
        };
        let mut dist = Distribution::new(model.num_subsets(), data.num_classes());
        for (row, w) in instances.iter() {
            if let Some(subset) = model.subset_of_row(data, row) {
                dist.add(subset, data, row, w);
            }
        }
        if !dist.check(self.min_no_obj) {
            return None;
        }
        let info_gain = info_gain(&dist, sum_of_weights);
        let gain_ratio = gain_ratio(&dist, sum_of_weights, info_gain);
        Some(AttributeSplit {
            model,
            distribution: dist,
            info_gain,
            gain_ratio,
        })
    }

    fn numeric_split(&self, data: &Dataset, instances: &Instances, att: usize, sum_of_weights: f64) -> Option<AttributeSplit> {
        let mut known: Vec<(f64, usize, f64)> = instances
            .iter()
            .filter(|(row, _)| !data.is_missing(*row, att))
            .map(|(row, w)| (data.get(row, att), row, w))
            .collect();
        known.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let num_classes = data.num_classes();
        let mut dist = Distribution::new(2, num_classes);
        for (_, row, w) in known.iter() {
            dist.add(1, data, *row, *w);
        }
        let first_miss = known.len();
        let mut min_split = 0.1 * dist.total() / num_classes as f64;
        if smaller_or_eq(min_split, self.min_no_obj) {
            min_split = self.min_no_obj;
        } else if greater(min_split, MAX_MIN_SPLIT) {
            min_split = MAX_MIN_SPLIT;
        }
        if smaller(first_miss as f64, 2.0 * min_split) {
            return None;
        }

        let default_ent = old_ent(&dist);
        let mut best_gain = 0.0;
        let mut split_index = None;
        let mut candidates = 0;
        let mut last = 0;
        for next in 1..first_miss {
            if known[next - 1].0 + DISTINCT_VALUE_GAP < known[next].0 {
                for (_, row, w) in known[last..next].iter() {
                    dist.shift(1, 0, data, *row, *w);
                }
                if greater_or_eq(dist.per_bag(0), min_split) && greater_or_eq(dist.per_bag(1), min_split) {
                    let gain = info_gain_given_old(&dist, sum_of_weights, default_ent);
                    if greater(gain, best_gain) {
                        best_gain = gain;
                        split_index = Some(next - 1);
                    }
                    candidates += 1;
                }
                last = next;
            }
        }
        if candidates == 0 {
            return None;
        }
        if self.use_mdl_correction {
            best_gain -= (candidates as f64).log2() / sum_of_weights;
        }
        if smaller_or_eq(best_gain, 0.0) {
            return None;
        }
        let split_index = split_index?;

        let mut split_point = (known[split_index + 1].0 + known[split_index].0) / 2.0;
        if split_point == known[split_index + 1].0 {
            split_point = known[split_index].0;
        }
        let mut dist = Distribution::new(2, num_classes);
        for (i, (_, row, w)) in known.iter().enumerate() {
            dist.add(if i <= split_index { 0 } else { 1 }, data, *row, *w);
        }
        let gain_ratio = gain_ratio(&dist, sum_of_weights, best_gain);
        Some(AttributeSplit {
            model: SplitModel::Numeric {
                attribute: att,
                split_point,
            },
            distribution: dist,
            info_gain: best_gain,
            gain_ratio,
        })
    }
}

impl Splitter for C45Splitter {
    fn min_no_obj(&self) -> f64 {
        self.min_no_obj
    }

    fn select_split(&self, data: &Dataset, instances: &Instances) -> SplitCandidate {
        let check = Distribution::from_instances(data, instances);
        if !data.class_is_nominal()
            || smaller(check.total(), 2.0 * self.min_no_obj)
            || approx_eq(check.total(), check.per_class(check.max_class()))
        {
            return SplitCandidate::leaf(check);
        }

        let many_values = MANY_VALUES_RATIO * data.rows() as f64;
        let class_index = data.class_index();
        let multi_val = data
            .attributes()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != class_index)
            .all(|(_, a)| a.is_nominal() && !smaller(a.num_values() as f64, many_values));

        let sum_of_weights = instances.sum_of_weights();
        let mut splits: Vec<Option<AttributeSplit>> = Vec::with_capacity(data.num_attributes());
        let mut valid_models = 0;
        let mut average_info_gain = 0.0;
        for att in 0..data.num_attributes() {
            let split = if att == class_index {
                None
            } else if data.attribute(att).is_nominal() {
                self.nominal_split(data, instances, att, sum_of_weights)
            } else {
                self.numeric_split(data, instances, att, sum_of_weights)
            };
            if let Some(s) = &split {
                let attribute = data.attribute(att);
                if !attribute.is_nominal() || multi_val || smaller(attribute.num_values() as f64, many_values) {
                    average_info_gain += s.info_gain;
                    valid_models += 1;
                }
            }
            splits.push(split);
        }
        if valid_models == 0 {
            return SplitCandidate::leaf(check);
        }
        average_info_gain /= valid_models as f64;

        let mut min_result = 0.0;
        let mut best: Option<AttributeSplit> = None;
        for split in splits.into_iter().flatten() {
            if split.info_gain >= average_info_gain - AVERAGE_GAIN_SLACK && greater(split.gain_ratio, min_result) {
                min_result = split.gain_ratio;
                best = Some(split);
            }
        }
        let mut best = match best {
            Some(b) if !approx_eq(min_result, 0.0) => b,
            _ => return SplitCandidate::leaf(check),
        };

        let att = best.model.attribute().unwrap_or(class_index);
        best.distribution.add_with_unknown(data, instances, att);
        if self.split_point_actual_value {
            if let SplitModel::Numeric { attribute, split_point } = best.model {
                if let Some(actual) = data.largest_value_not_above(attribute, split_point) {
                    best.model = SplitModel::Numeric {
                        attribute,
                        split_point: actual,
                    };
                }
            }
        }
        SplitCandidate {
            model: best.model,
            distribution: best.distribution,
            info_gain: best.info_gain,
            gain_ratio: best.gain_ratio,
        }
    }

    fn force_split(&self, data: &Dataset, instances: &Instances, model: &SplitModel) -> SplitCandidate {
        if !model.is_split() {
            return SplitCandidate::leaf(Distribution::from_instances(data, instances));
        }
        let distribution = model.distribution(data, instances);
        let sum_of_weights = instances.sum_of_weights();
        let info_gain = info_gain(&distribution, sum_of_weights);
        let gain_ratio = gain_ratio(&distribution, sum_of_weights, info_gain);
        SplitCandidate {
            model: model.clone(),
            distribution,
            info_gain,
            gain_ratio,
        }
    }
}
