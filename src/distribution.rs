//! Distribution
//!
//! Weighted class counts per branch ("bag") of a split, with per-class and grand
//! totals. A consolidated distribution is the element-wise average of the
//! distributions obtained on every sample.
use crate::data::{Dataset, Instances};
use crate::utils::{approx_eq, greater, greater_or_eq};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    per_class_per_bag: Vec<Vec<f64>>,
    per_bag: Vec<f64>,
    per_class: Vec<f64>,
    total: f64,
    /// Weighted sum of the class values per bag, only meaningful for a numeric class.
    target_per_bag: Vec<f64>,
}

impl Distribution {
    pub fn new(num_bags: usize, num_classes: usize) -> Self {
        Distribution {
            per_class_per_bag: vec![vec![0.0; num_classes]; num_bags],
            per_bag: vec![0.0; num_bags],
            per_class: vec![0.0; num_classes],
            total: 0.0,
            target_per_bag: vec![0.0; num_bags],
        }
    }

    /// Single bag distribution of a set of instances.
    pub fn from_instances(data: &Dataset, instances: &Instances) -> Self {
        let mut dist = Distribution::new(1, data.num_classes());
        for (row, w) in instances.iter() {
            dist.add(0, data, row, w);
        }
        dist
    }

    /// Element-wise average, `None` for an empty slice.
    pub fn average(dists: &[Distribution]) -> Option<Distribution> {
        let first = dists.first()?;
        let mut avg = Distribution::new(first.num_bags(), first.num_classes());
        for d in dists {
            for (bag, classes) in d.per_class_per_bag.iter().enumerate() {
                for (class, w) in classes.iter().enumerate() {
                    avg.per_class_per_bag[bag][class] += w;
                }
                avg.per_bag[bag] += d.per_bag[bag];
                avg.target_per_bag[bag] += d.target_per_bag[bag];
            }
            for (class, w) in d.per_class.iter().enumerate() {
                avg.per_class[class] += w;
            }
            avg.total += d.total;
        }
        let n = dists.len() as f64;
        avg.per_class_per_bag
            .iter_mut()
            .flat_map(|c| c.iter_mut())
            .chain(avg.per_bag.iter_mut())
            .chain(avg.per_class.iter_mut())
            .chain(avg.target_per_bag.iter_mut())
            .for_each(|v| *v /= n);
        avg.total /= n;
        Some(avg)
    }

    /// Same counts merged into a single bag.
    pub fn to_single_bag(&self) -> Distribution {
        Distribution {
            per_class_per_bag: vec![self.per_class.clone()],
            per_bag: vec![self.total],
            per_class: self.per_class.clone(),
            total: self.total,
            target_per_bag: vec![self.target_per_bag.iter().sum()],
        }
    }

    #[inline]
    pub fn num_bags(&self) -> usize {
        self.per_bag.len()
    }

    #[inline]
    pub fn num_classes(&self) -> usize {
        self.per_class.len()
    }

    #[inline]
    pub fn total(&self) -> f64 {
        self.total
    }

    #[inline]
    pub fn per_bag(&self, bag: usize) -> f64 {
        self.per_bag[bag]
    }

    #[inline]
    pub fn per_class(&self, class: usize) -> f64 {
        self.per_class[class]
    }

    #[inline]
    pub fn per_class_per_bag(&self, bag: usize, class: usize) -> f64 {
        self.per_class_per_bag[bag][class]
    }

    /// Add a row with the given weight to a bag.
    pub fn add(&mut self, bag: usize, data: &Dataset, row: usize, weight: f64) {
        let class = data.class_code(row);
        self.per_class_per_bag[bag][class] += weight;
        self.per_bag[bag] += weight;
        self.per_class[class] += weight;
        self.total += weight;
        if !data.class_is_nominal() {
            self.target_per_bag[bag] += weight * data.class_value(row);
        }
    }

    /// Move a row from one bag to another.
    pub fn shift(&mut self, from: usize, to: usize, data: &Dataset, row: usize, weight: f64) {
        let class = data.class_code(row);
        self.per_class_per_bag[from][class] -= weight;
        self.per_class_per_bag[to][class] += weight;
        self.per_bag[from] -= weight;
        self.per_bag[to] += weight;
        if !data.class_is_nominal() {
            let target = weight * data.class_value(row);
            self.target_per_bag[from] -= target;
            self.target_per_bag[to] += target;
        }
    }

    /// Add a row to every bag, scaled by `bag_weights`.
    pub fn add_weights(&mut self, data: &Dataset, row: usize, weight: f64, bag_weights: &[f64]) {
        let class = data.class_code(row);
        for (bag, bw) in bag_weights.iter().enumerate() {
            let w = weight * bw;
            self.per_class_per_bag[bag][class] += w;
            self.per_bag[bag] += w;
            if !data.class_is_nominal() {
                self.target_per_bag[bag] += w * data.class_value(row);
            }
        }
        self.per_class[class] += weight;
        self.total += weight;
    }

    /// Share of the weight reaching each bag, uniform when the distribution is empty.
    pub fn bag_proportions(&self) -> Vec<f64> {
        if approx_eq(self.total, 0.0) {
            vec![1.0 / self.num_bags() as f64; self.num_bags()]
        } else {
            self.per_bag.iter().map(|b| b / self.total).collect()
        }
    }

    /// Spread the rows missing `attribute` over the bags, in proportion to the
    /// weight the known rows already put in them.
    pub fn add_with_unknown(&mut self, data: &Dataset, instances: &Instances, attribute: usize) {
        let proportions = self.bag_proportions();
        for (row, w) in instances.iter() {
            if data.is_missing(row, attribute) {
                self.add_weights(data, row, w, &proportions);
            }
        }
    }

    /// Heaviest bag, the last one on ties.
    pub fn max_bag(&self) -> usize {
        let mut max = 0.0;
        let mut max_index = 0;
        for (i, w) in self.per_bag.iter().enumerate() {
            if greater_or_eq(*w, max) {
                max = *w;
                max_index = i;
            }
        }
        max_index
    }

    /// Heaviest class, the first one on ties.
    pub fn max_class(&self) -> usize {
        let mut max = 0.0;
        let mut max_index = 0;
        for (i, w) in self.per_class.iter().enumerate() {
            if greater(*w, max) {
                max = *w;
                max_index = i;
            }
        }
        max_index
    }

    pub fn num_correct(&self) -> f64 {
        self.per_class[self.max_class()]
    }

    pub fn num_incorrect(&self) -> f64 {
        self.total - self.num_correct()
    }

    pub fn prob(&self, class: usize) -> f64 {
        if approx_eq(self.total, 0.0) {
            0.0
        } else {
            self.per_class[class] / self.total
        }
    }

    /// Class probability within a bag, the overall one when the bag is empty.
    pub fn prob_in_bag(&self, class: usize, bag: usize) -> f64 {
        if greater(self.per_bag[bag], 0.0) {
            self.per_class_per_bag[bag][class] / self.per_bag[bag]
        } else {
            self.prob(class)
        }
    }

    pub fn laplace_prob(&self, class: usize) -> f64 {
        (self.per_class[class] + 1.0) / (self.total + self.num_classes() as f64)
    }

    pub fn laplace_prob_in_bag(&self, class: usize, bag: usize) -> f64 {
        if greater(self.per_bag[bag], 0.0) {
            (self.per_class_per_bag[bag][class] + 1.0) / (self.per_bag[bag] + self.num_classes() as f64)
        } else {
            self.laplace_prob(class)
        }
    }

    /// Weighted mean of a numeric class, over one bag or the whole distribution.
    pub fn mean_target(&self, bag: Option<usize>) -> f64 {
        let (sum, weight) = match bag {
            Some(b) if greater(self.per_bag[b], 0.0) => (self.target_per_bag[b], self.per_bag[b]),
            _ => (self.target_per_bag.iter().sum(), self.total),
        };
        if approx_eq(weight, 0.0) {
            0.0
        } else {
            sum / weight
        }
    }

    /// At least two bags hold `min_no_obj` or more weight.
    pub fn check(&self, min_no_obj: f64) -> bool {
        self.per_bag.iter().filter(|w| greater_or_eq(**w, min_no_obj)).count() > 1
    }
}
