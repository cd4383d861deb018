//! Data
//!
//! Tabular dataset abstraction consumed by the tree builders: typed columns stored
//! column-major, a designated class column, per-row weights and a missing-value
//! sentinel. Subsets of a dataset (samples, node partitions, fractional copies of
//! rows with missing values) are [`Instances`], weighted lists of row indices that
//! never copy attribute values.
use crate::errors::ConsolidatedError;
use crate::utils::is_missing;
use hashbrown::HashMap;
use log::warn;
use rand::distributions::{Distribution as _, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Type of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Real valued attribute.
    Numeric,
    /// Attribute taking one of a fixed set of labels, stored as the label's code.
    Nominal(Vec<String>),
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn numeric(name: &str) -> Self {
        Attribute {
            name: name.to_string(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn nominal(name: &str, values: &[&str]) -> Self {
        Attribute {
            name: name.to_string(),
            kind: AttributeKind::Nominal(values.iter().map(|v| v.to_string()).collect()),
        }
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self.kind, AttributeKind::Nominal(_))
    }

    /// Number of labels of a nominal attribute, zero for numeric ones.
    pub fn num_values(&self) -> usize {
        match &self.kind {
            AttributeKind::Nominal(values) => values.len(),
            AttributeKind::Numeric => 0,
        }
    }

    /// Code of a nominal label.
    pub fn value_code(&self, label: &str) -> Option<usize> {
        match &self.kind {
            AttributeKind::Nominal(values) => values.iter().position(|v| v == label),
            AttributeKind::Numeric => None,
        }
    }
}

/// Column-major table with a class column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    attributes: Vec<Attribute>,
    columns: Vec<Vec<f64>>,
    weights: Vec<f64>,
    class_index: usize,
    rows: usize,
    missing: f64,
}

impl Dataset {
    /// Create a dataset from its columns, one per attribute.
    ///
    /// * `attributes` - Schema, including the class attribute.
    /// * `columns` - Values of every attribute, nominal values given as label codes.
    /// * `class_index` - Position of the class attribute.
    pub fn new(attributes: Vec<Attribute>, columns: Vec<Vec<f64>>, class_index: usize) -> Result<Self, ConsolidatedError> {
        if attributes.len() != columns.len() {
            return Err(ConsolidatedError::InvalidData(format!(
                "{} attributes declared but {} columns provided",
                attributes.len(),
                columns.len()
            )));
        }
        if class_index >= attributes.len() {
            return Err(ConsolidatedError::InvalidData(format!(
                "class index {} out of range for {} attributes",
                class_index,
                attributes.len()
            )));
        }
        let rows = columns.first().map(|c| c.len()).unwrap_or(0);
        for (attribute, column) in attributes.iter().zip(columns.iter()) {
            if column.len() != rows {
                return Err(ConsolidatedError::InvalidData(format!(
                    "column {} has {} rows, expected {}",
                    attribute.name,
                    column.len(),
                    rows
                )));
            }
            if attribute.is_nominal() {
                let n = attribute.num_values() as f64;
                if let Some(v) = column
                    .iter()
                    .find(|v| !v.is_nan() && (**v < 0.0 || **v >= n || v.fract() != 0.0))
                {
                    return Err(ConsolidatedError::InvalidData(format!(
                        "value {} is not a label code of nominal attribute {}",
                        v, attribute.name
                    )));
                }
            }
        }
        Ok(Dataset {
            attributes,
            columns,
            weights: vec![1.0; rows],
            class_index,
            rows,
            missing: f64::NAN,
        })
    }

    /// Create a dataset from row-major values.
    pub fn from_rows(attributes: Vec<Attribute>, rows: &[Vec<f64>], class_index: usize) -> Result<Self, ConsolidatedError> {
        let mut columns = vec![Vec::with_capacity(rows.len()); attributes.len()];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != attributes.len() {
                return Err(ConsolidatedError::InvalidData(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    attributes.len()
                )));
            }
            for (column, v) in columns.iter_mut().zip(row.iter()) {
                column.push(*v);
            }
        }
        Dataset::new(attributes, columns, class_index)
    }

    /// Create a dataset from row-major labels, `"?"` marking a missing value.
    /// Nominal labels are looked up in the attribute, numeric ones parsed.
    pub fn from_labels(attributes: Vec<Attribute>, rows: &[Vec<&str>], class_index: usize) -> Result<Self, ConsolidatedError> {
        let lookups: Vec<HashMap<&str, usize>> = attributes
            .iter()
            .map(|a| match &a.kind {
                AttributeKind::Nominal(values) => values.iter().enumerate().map(|(i, v)| (v.as_str(), i)).collect(),
                AttributeKind::Numeric => HashMap::new(),
            })
            .collect();
        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            let mut parsed = Vec::with_capacity(row.len());
            for (j, label) in row.iter().enumerate() {
                let attribute = attributes.get(j).ok_or_else(|| {
                    ConsolidatedError::InvalidData(format!("row has more than {} values", attributes.len()))
                })?;
                let v = if *label == "?" {
                    f64::NAN
                } else if attribute.is_nominal() {
                    *lookups[j].get(label).ok_or_else(|| {
                        ConsolidatedError::InvalidData(format!("unknown label {} for attribute {}", label, attribute.name))
                    })? as f64
                } else {
                    label.parse::<f64>().map_err(|_| {
                        ConsolidatedError::InvalidData(format!("{} is not a number for attribute {}", label, attribute.name))
                    })?
                };
                parsed.push(v);
            }
            values.push(parsed);
        }
        drop(lookups);
        Dataset::from_rows(attributes, &values, class_index)
    }

    /// Set the per-row weights.
    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self, ConsolidatedError> {
        if weights.len() != self.rows {
            return Err(ConsolidatedError::InvalidData(format!(
                "{} weights provided for {} rows",
                weights.len(),
                self.rows
            )));
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(ConsolidatedError::InvalidData(format!("invalid row weight {}", w)));
        }
        self.weights = weights;
        Ok(self)
    }

    /// Set the value that marks a missing entry, NaN is always treated as missing.
    pub fn with_missing(mut self, missing: f64) -> Self {
        self.missing = missing;
        self
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, col: usize) -> &Attribute {
        &self.attributes[col]
    }

    pub fn class_index(&self) -> usize {
        self.class_index
    }

    pub fn class_attribute(&self) -> &Attribute {
        &self.attributes[self.class_index]
    }

    pub fn class_is_nominal(&self) -> bool {
        self.class_attribute().is_nominal()
    }

    /// Number of class labels, one for a numeric class.
    pub fn num_classes(&self) -> usize {
        if self.class_is_nominal() {
            self.class_attribute().num_values()
        } else {
            1
        }
    }

    pub fn missing(&self) -> f64 {
        self.missing
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.columns[col][row]
    }

    pub fn column(&self, col: usize) -> &[f64] {
        &self.columns[col]
    }

    #[inline]
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        is_missing(&self.columns[col][row], &self.missing)
    }

    #[inline]
    pub fn weight(&self, row: usize) -> f64 {
        self.weights[row]
    }

    /// Class code of a row, zero for a numeric class.
    #[inline]
    pub fn class_code(&self, row: usize) -> usize {
        if self.class_is_nominal() {
            self.get(row, self.class_index) as usize
        } else {
            0
        }
    }

    #[inline]
    pub fn class_value(&self, row: usize) -> f64 {
        self.get(row, self.class_index)
    }

    /// Values of a single row, in attribute order.
    pub fn get_row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[row]).collect()
    }

    /// Every row with its weight.
    pub fn all_instances(&self) -> Instances {
        Instances {
            index: (0..self.rows).collect(),
            weights: self.weights.clone(),
        }
    }

    /// Every row whose class value is known.
    pub fn instances_with_class(&self) -> Instances {
        let mut instances = Instances::with_capacity(self.rows);
        for row in 0..self.rows {
            if !self.is_missing(row, self.class_index) {
                instances.push(row, self.weights[row]);
            }
        }
        instances
    }

    /// Largest known value of a numeric attribute that is not above `limit`.
    pub fn largest_value_not_above(&self, col: usize, limit: f64) -> Option<f64> {
        self.columns[col]
            .iter()
            .filter(|v| !is_missing(v, &self.missing) && **v <= limit)
            .copied()
            .fold(None, |acc: Option<f64>, v| match acc {
                Some(a) if a >= v => Some(a),
                _ => Some(v),
            })
    }
}

/// Weighted multiset of rows of a [`Dataset`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instances {
    pub index: Vec<usize>,
    pub weights: Vec<f64>,
}

impl Instances {
    pub fn new() -> Self {
        Instances::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Instances {
            index: Vec::with_capacity(capacity),
            weights: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, row: usize, weight: f64) {
        self.index.push(row);
        self.weights.push(weight);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.index.iter().copied().zip(self.weights.iter().copied())
    }

    pub fn sum_of_weights(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn extend(&mut self, other: &Instances) {
        self.index.extend_from_slice(&other.index);
        self.weights.extend_from_slice(&other.weights);
    }

    pub fn truncate(&mut self, len: usize) {
        self.index.truncate(len);
        self.weights.truncate(len);
    }

    /// Split into one list per class label, keeping the row order.
    pub fn by_class(&self, data: &Dataset) -> Vec<Instances> {
        let mut classes = vec![Instances::new(); data.num_classes()];
        for (row, w) in self.iter() {
            classes[data.class_code(row)].push(row, w);
        }
        classes
    }

    /// Shuffle the rows in place.
    pub fn shuffle(&mut self, rng: &mut StdRng) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);
        self.index = order.iter().map(|i| self.index[*i]).collect();
        self.weights = order.iter().map(|i| self.weights[*i]).collect();
    }

    /// Bootstrap of the same size, each row drawn with probability proportional
    /// to its weight. Drawn copies carry unit weight. Rows without any positive
    /// weight give an empty bag.
    pub fn resample_with_weights(&self, rng: &mut StdRng) -> Instances {
        let mut drawn = Instances::with_capacity(self.len());
        let dist = match WeightedIndex::new(&self.weights) {
            Ok(dist) => dist,
            Err(e) => {
                if !self.is_empty() {
                    warn!("Unable to resample {} rows by weight ({}), the bag is empty.", self.len(), e);
                }
                return drawn;
            }
        };
        for _ in 0..self.len() {
            drawn.push(self.index[dist.sample(rng)], 1.0);
        }
        drawn
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;
    use rand::{Rng, SeedableRng};

    /// Two numeric attributes, one nominal attribute and a two-label class.
    /// The class is `pos` when `x0 > 5` and `color != blue`, with a little noise.
    pub fn two_class_dataset(rows: usize, seed: u64, missing_rate: f64) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let attributes = vec![
            Attribute::numeric("x0"),
            Attribute::numeric("x1"),
            Attribute::nominal("color", &["red", "green", "blue"]),
            Attribute::nominal("class", &["neg", "pos"]),
        ];
        let mut values = Vec::with_capacity(rows);
        for _ in 0..rows {
            let x0: f64 = (rng.gen_range(0.0..10.0_f64) * 10.0).round() / 10.0;
            let x1: f64 = (rng.gen_range(0.0..1.0_f64) * 100.0).round() / 100.0;
            let color = rng.gen_range(0..3) as f64;
            let mut class = if x0 > 5.0 && color != 2.0 { 1.0 } else { 0.0 };
            if rng.gen_range(0.0..1.0) < 0.05 {
                class = 1.0 - class;
            }
            let mut row = vec![x0, x1, color, class];
            for v in row.iter_mut().take(3) {
                if rng.gen_range(0.0..1.0) < missing_rate {
                    *v = f64::NAN;
                }
            }
            values.push(row);
        }
        Dataset::from_rows(attributes, &values, 3).unwrap()
    }

    /// Three well separated classes over two numeric attributes.
    pub fn three_class_dataset(rows_per_class: &[usize], seed: u64) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let attributes = vec![
            Attribute::numeric("a"),
            Attribute::numeric("b"),
            Attribute::nominal("class", &["c0", "c1", "c2"]),
        ];
        let mut values = Vec::new();
        for (class, n) in rows_per_class.iter().enumerate() {
            for _ in 0..*n {
                let a = class as f64 * 3.0 + rng.gen_range(0.0..2.5);
                let b = rng.gen_range(0.0..1.0);
                values.push(vec![a, b, class as f64]);
            }
        }
        Dataset::from_rows(attributes, &values, 2).unwrap()
    }

    /// `neg` rows followed by `pos` rows, a single numeric attribute.
    pub fn class_sizes_dataset(neg: usize, pos: usize) -> Dataset {
        let attributes = vec![Attribute::numeric("x"), Attribute::nominal("class", &["neg", "pos"])];
        let mut values = Vec::new();
        for i in 0..neg {
            values.push(vec![i as f64, 0.0]);
        }
        for i in 0..pos {
            values.push(vec![(neg + i) as f64, 1.0]);
        }
        Dataset::from_rows(attributes, &values, 1).unwrap()
    }
}
