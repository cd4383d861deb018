//! Sampler
//!
//! Generation of the N resampled subsets ("samples") consumed by consolidation.
//! The policy fixes the bag size, the class distribution inside every sample and
//! the number of samples, either given directly or derived from the coverage of
//! the training set the samples should reach.
use crate::constants::{DEFAULT_MIN_CLASS_FLOOR_PERCENT, DEFAULT_SIZE_REDUCTION_PERCENT, MIN_NUMBER_SAMPLES};
use crate::data::{Dataset, Instances};
use crate::errors::ConsolidatedError;
use crate::utils::{first_max_index, validate_float_parameter, validate_open_float_parameter};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Size of every sample.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub enum BagSize {
    /// Percentage of the training set, in 1..=100.
    Percent(u32),
    /// Size of the smallest class.
    MinorityClassSize,
    /// Largest size reachable without replacement given the requested class distribution.
    MaxSize,
}

/// Class distribution inside every sample.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub enum ClassDistribution {
    /// Rows drawn ignoring the class.
    Free,
    /// Same class proportions as the training set.
    Stratified,
    /// Requested percentage of the minority class, 50 balances the classes.
    Minority(f64),
}

/// Number of samples.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Debug)]
pub enum SampleCount {
    Fixed(usize),
    /// Percentage of training rows expected to appear in at least one sample.
    Coverage(f64),
}

fn default_size_reduction_percent() -> u32 {
    DEFAULT_SIZE_REDUCTION_PERCENT
}
fn default_min_class_floor_percent() -> f64 {
    DEFAULT_MIN_CLASS_FLOOR_PERCENT
}

/// How the samples are drawn from the training set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ResamplingPolicy {
    /// Draw with replacement.
    pub replacement: bool,
    pub bag_size: BagSize,
    pub class_distribution: ClassDistribution,
    pub sample_count: SampleCount,
    /// Bag percentage used instead when every sample would contain the whole training set.
    #[serde(default = "default_size_reduction_percent")]
    pub size_reduction_percent: u32,
    /// Floor for the size of every class, as a percentage of the training set.
    #[serde(default = "default_min_class_floor_percent")]
    pub min_class_floor_percent: f64,
}

impl Default for ResamplingPolicy {
    fn default() -> Self {
        ResamplingPolicy {
            replacement: false,
            bag_size: BagSize::MaxSize,
            class_distribution: ClassDistribution::Minority(50.0),
            sample_count: SampleCount::Coverage(99.0),
            size_reduction_percent: DEFAULT_SIZE_REDUCTION_PERCENT,
            min_class_floor_percent: DEFAULT_MIN_CLASS_FLOOR_PERCENT,
        }
    }
}

impl ResamplingPolicy {
    /// Reject out of range values and contradictory combinations.
    pub fn validate(&self) -> Result<(), ConsolidatedError> {
        if let BagSize::Percent(p) = self.bag_size {
            if p == 0 || p > 100 {
                return Err(ConsolidatedError::InvalidParameter(
                    "bag_size".to_string(),
                    "percentage within 1 and 100".to_string(),
                    p.to_string(),
                ));
            }
        }
        match self.class_distribution {
            ClassDistribution::Free | ClassDistribution::Stratified => {
                if !matches!(self.bag_size, BagSize::Percent(_)) {
                    return Err(ConsolidatedError::IncompatibleParameters(
                        "free and stratified class distributions need the bag size as a percentage".to_string(),
                    ));
                }
            }
            ClassDistribution::Minority(d) => {
                validate_open_float_parameter(d, 0.0, 100.0, "class_distribution")?;
                if self.replacement {
                    return Err(ConsolidatedError::IncompatibleParameters(
                        "sampling with replacement cannot change the class distribution".to_string(),
                    ));
                }
            }
        }
        match self.sample_count {
            SampleCount::Fixed(0) => {
                return Err(ConsolidatedError::InvalidParameter(
                    "sample_count".to_string(),
                    "at least one sample".to_string(),
                    "0".to_string(),
                ))
            }
            SampleCount::Fixed(_) => (),
            SampleCount::Coverage(c) => validate_open_float_parameter(c, 0.0, 100.0, "sample_count")?,
        }
        if self.size_reduction_percent == 0 || self.size_reduction_percent >= 100 {
            return Err(ConsolidatedError::InvalidParameter(
                "size_reduction_percent".to_string(),
                "percentage within 1 and 99".to_string(),
                self.size_reduction_percent.to_string(),
            ));
        }
        validate_float_parameter(self.min_class_floor_percent, 0.0, 100.0, "min_class_floor_percent")?;
        Ok(())
    }
}

/// What the resampler actually did.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ResamplingReport {
    /// Training rows with a known class, after any oversampling.
    pub data_size: usize,
    pub bag_size: usize,
    pub class_sizes: Vec<usize>,
    /// Rows of every class in one sample.
    pub new_class_sizes: Vec<usize>,
    pub number_samples: usize,
    /// Number of samples derived from the coverage target, when one was given.
    pub samples_by_coverage: Option<usize>,
    /// Percentage of training rows expected to appear in at least one sample.
    pub true_coverage: f64,
    pub diagnostics: Vec<String>,
}

impl ResamplingReport {
    fn diagnostic(&mut self, msg: String) {
        warn!("{}", msg);
        self.diagnostics.push(msg);
    }
}

/// Resampled subsets, `samples[i]` is sample `i` everywhere in the tree.
#[derive(Clone, Debug, Default)]
pub struct SampleSet {
    pub samples: Vec<Instances>,
    pub report: ResamplingReport,
}

impl SampleSet {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// A sampler draws one sample from the training rows.
pub trait Sampler {
    fn sample(&self, rng: &mut StdRng) -> Instances;
}

/// Draws rows ignoring their class.
pub struct FreeSampler<'a> {
    instances: &'a Instances,
    bag_size: usize,
    replacement: bool,
}

impl<'a> FreeSampler<'a> {
    pub fn new(instances: &'a Instances, bag_size: usize, replacement: bool) -> Self {
        FreeSampler {
            instances,
            bag_size,
            replacement,
        }
    }
}

impl Sampler for FreeSampler<'_> {
    fn sample(&self, rng: &mut StdRng) -> Instances {
        let mut sample = if self.replacement {
            self.instances.resample_with_weights(rng)
        } else {
            self.instances.clone()
        };
        sample.shuffle(rng);
        sample.truncate(self.bag_size);
        sample
    }
}

/// Draws a fixed number of rows from every class.
pub struct ClassSampler<'a> {
    classes: &'a [Instances],
    new_class_sizes: &'a [usize],
    replacement: bool,
}

impl<'a> ClassSampler<'a> {
    pub fn new(classes: &'a [Instances], new_class_sizes: &'a [usize], replacement: bool) -> Self {
        ClassSampler {
            classes,
            new_class_sizes,
            replacement,
        }
    }
}

impl Sampler for ClassSampler<'_> {
    fn sample(&self, rng: &mut StdRng) -> Instances {
        let mut sample = Instances::with_capacity(self.new_class_sizes.iter().sum());
        for (class, size) in self.classes.iter().zip(self.new_class_sizes.iter()) {
            if class.is_empty() {
                continue;
            }
            let mut bag = if self.replacement {
                class.resample_with_weights(rng)
            } else {
                class.clone()
            };
            bag.shuffle(rng);
            bag.truncate(*size);
            sample.extend(&bag);
        }
        sample.shuffle(rng);
        sample
    }
}

/// Number of samples needed so that a row of a class sampled at ratio `r` is
/// drawn at least once with probability `coverage`.
pub fn samples_for_coverage(coverage: f64, r: f64, replacement: bool) -> f64 {
    let n = if replacement {
        -(1.0 - coverage).ln() / r
    } else {
        (1.0 - coverage).ln() / (1.0 - r).ln()
    };
    n.ceil()
}

/// Probability that a row of a class sampled at ratio `r` appears in one of `n` samples.
pub fn coverage_of(r: f64, n: usize, replacement: bool) -> f64 {
    if r >= 1.0 && !replacement {
        return 1.0;
    }
    if replacement {
        1.0 - (-r * n as f64).exp()
    } else {
        1.0 - (1.0 - r).powi(n as i32)
    }
}

#[inline]
fn round_size(x: f64) -> usize {
    x.round().max(0.0) as usize
}

/// Smallest non empty class, the first one on ties.
fn minority_class(sizes: &[usize]) -> Option<usize> {
    let mut min: Option<usize> = None;
    for (i, s) in sizes.iter().enumerate() {
        if *s > 0 && min.map(|m| *s < sizes[m]).unwrap_or(true) {
            min = Some(i);
        }
    }
    min
}

/// Produces the sample set for a dataset.
pub struct Resampler {
    policy: ResamplingPolicy,
    min_no_obj: usize,
}

impl Resampler {
    /// * `policy` - How to draw the samples.
    /// * `min_no_obj` - Minimum instances per leaf of the trees, the floor for every class size.
    pub fn new(policy: ResamplingPolicy, min_no_obj: usize) -> Self {
        Resampler { policy, min_no_obj }
    }

    pub fn generate(&self, data: &Dataset, seed: u64) -> Result<SampleSet, ConsolidatedError> {
        self.policy.validate()?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut report = ResamplingReport::default();
        let instances = data.instances_with_class();

        if !data.class_is_nominal() && self.policy.class_distribution != ClassDistribution::Free {
            return Err(ConsolidatedError::IncompatibleParameters(
                "a numeric class can only be sampled with the free class distribution".to_string(),
            ));
        }
        if instances.is_empty() {
            report.diagnostic("Dataset is empty after removing rows with a missing class".to_string());
            let n = match self.policy.sample_count {
                SampleCount::Fixed(n) => n,
                SampleCount::Coverage(_) => MIN_NUMBER_SAMPLES,
            };
            report.class_sizes = vec![0; data.num_classes()];
            report.new_class_sizes = vec![0; data.num_classes()];
            report.number_samples = n;
            return Ok(SampleSet {
                samples: vec![Instances::new(); n],
                report,
            });
        }

        let mut classes = if data.class_is_nominal() {
            instances.by_class(data)
        } else {
            vec![instances.clone()]
        };
        let new_class_sizes = match self.policy.class_distribution {
            ClassDistribution::Free => self.free_sizes(&classes, &mut report)?,
            ClassDistribution::Stratified => self.stratified_sizes(&classes, &mut report)?,
            ClassDistribution::Minority(d) => self.minority_sizes(data, &mut classes, d, &mut rng, &mut report)?,
        };
        report.class_sizes = classes.iter().map(|c| c.len()).collect();
        report.data_size = report.class_sizes.iter().sum();
        if report.bag_size == 0 {
            report.diagnostic("Bag size is zero, every sample is empty".to_string());
        }

        // Ratio of every class between one sample and the training set.
        let free = self.policy.class_distribution == ClassDistribution::Free;
        let ratios: Vec<f64> = report
            .class_sizes
            .iter()
            .zip(new_class_sizes.iter())
            .map(|(size, new)| {
                if *size == 0 {
                    f64::MAX
                } else if free {
                    report.bag_size as f64 / report.data_size as f64
                } else {
                    *new as f64 / *size as f64
                }
            })
            .collect();
        // Changing the class distribution is only possible without replacement.
        let replacement = self.policy.replacement && !matches!(self.policy.class_distribution, ClassDistribution::Minority(_));
        let number_samples = match self.policy.sample_count {
            SampleCount::Fixed(n) => n,
            SampleCount::Coverage(c) => {
                let disfavored = ratios.iter().copied().fold(f64::MAX, f64::min);
                let n = samples_for_coverage(c / 100.0, disfavored, replacement);
                let n = if !n.is_finite() {
                    report.diagnostic(format!(
                        "The coverage cannot be reached with a sampling ratio of {}, forced the number of samples to be {}",
                        disfavored, MIN_NUMBER_SAMPLES
                    ));
                    MIN_NUMBER_SAMPLES
                } else if (n as usize) < MIN_NUMBER_SAMPLES {
                    report.diagnostic(format!("Forced the number of samples to be {}", MIN_NUMBER_SAMPLES));
                    MIN_NUMBER_SAMPLES
                } else {
                    n as usize
                };
                report.samples_by_coverage = Some(n);
                n
            }
        };
        report.number_samples = number_samples;
        report.true_coverage = 100.0
            * report
                .class_sizes
                .iter()
                .zip(ratios.iter())
                .filter(|(size, _)| **size > 0)
                .map(|(size, r)| (*size as f64 / report.data_size as f64) * coverage_of(*r, number_samples, replacement))
                .sum::<f64>();

        let samples = match self.policy.class_distribution {
            ClassDistribution::Free => {
                let sampler = FreeSampler::new(&instances, report.bag_size, self.policy.replacement);
                (0..number_samples).map(|_| sampler.sample(&mut rng)).collect()
            }
            _ => {
                let sampler = ClassSampler::new(&classes, &new_class_sizes, self.policy.replacement);
                (0..number_samples).map(|_| sampler.sample(&mut rng)).collect()
            }
        };
        report.new_class_sizes = new_class_sizes;
        info!(
            "Generated {} samples of {} rows, true coverage {:.2}%.",
            number_samples, report.bag_size, report.true_coverage
        );
        Ok(SampleSet { samples, report })
    }

    fn bag_percent(&self) -> Result<u32, ConsolidatedError> {
        match self.policy.bag_size {
            BagSize::Percent(p) => Ok(p),
            _ => Err(ConsolidatedError::IncompatibleParameters(
                "free and stratified class distributions need the bag size as a percentage".to_string(),
            )),
        }
    }

    /// Bag percentage actually used. A whole training set drawn without
    /// replacement would make every sample the same set of rows.
    fn reduced_percent(&self, percent: u32, report: &mut ResamplingReport) -> u32 {
        if percent == 100 && !self.policy.replacement {
            report.diagnostic(format!(
                "Forced bag size reduction to {}% to avoid identical samples",
                self.policy.size_reduction_percent
            ));
            self.policy.size_reduction_percent
        } else {
            percent
        }
    }

    fn free_sizes(&self, classes: &[Instances], report: &mut ResamplingReport) -> Result<Vec<usize>, ConsolidatedError> {
        let data_size: usize = classes.iter().map(|c| c.len()).sum();
        let percent = self.reduced_percent(self.bag_percent()?, report);
        let bag_size = data_size * percent as usize / 100;
        report.bag_size = bag_size;
        let ratio = bag_size as f64 / data_size as f64;
        // Expected rows of every class in a sample.
        Ok(classes.iter().map(|c| (c.len() as f64 * ratio) as usize).collect())
    }

    fn stratified_sizes(&self, classes: &[Instances], report: &mut ResamplingReport) -> Result<Vec<usize>, ConsolidatedError> {
        let data_size: usize = classes.iter().map(|c| c.len()).sum();
        let percent = self.reduced_percent(self.bag_percent()?, report);
        let bag_size = data_size * percent as usize / 100;
        report.bag_size = bag_size;
        let sizes: Vec<usize> = classes.iter().map(|c| c.len()).collect();
        let i_min = minority_class(&sizes).unwrap_or(0);
        let mut new_sizes: Vec<usize> = sizes
            .iter()
            .map(|s| round_size(*s as f64 * percent as f64 / 100.0))
            .collect();
        let others: usize = new_sizes
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != i_min)
            .map(|(_, s)| *s)
            .sum();
        new_sizes[i_min] = bag_size.saturating_sub(others).min(sizes[i_min]);
        Ok(new_sizes)
    }

    fn minority_sizes(
        &self,
        data: &Dataset,
        classes: &mut [Instances],
        distribution: f64,
        rng: &mut StdRng,
        report: &mut ResamplingReport,
    ) -> Result<Vec<usize>, ConsolidatedError> {
        let data_size: usize = classes.iter().map(|c| c.len()).sum();
        let floor = ((data_size as f64 * self.policy.min_class_floor_percent / 100.0).ceil() as usize).max(self.min_no_obj);
        for (c, class) in classes.iter_mut().enumerate() {
            let size = class.len();
            if size > 0 && size < floor {
                let original = class.clone();
                while class.len() < floor {
                    let pick = rng.gen_range(0..original.len());
                    class.push(original.index[pick], original.weights[pick]);
                }
                report.diagnostic(format!(
                    "Class {} oversampled from {} to {} instances",
                    class_label(data, c),
                    size,
                    floor
                ));
            }
        }

        let sizes: Vec<usize> = classes.iter().map(|c| c.len()).collect();
        let data_size: usize = sizes.iter().sum();
        let non_empty = sizes.iter().filter(|s| **s > 0).count();
        let i_min = minority_class(&sizes).unwrap_or(0);
        let min_size = sizes[i_min];
        let mut i_maj = first_max_index(&sizes.iter().map(|s| *s as f64).collect::<Vec<f64>>());
        if sizes[i_maj] == min_size {
            i_maj = (0..sizes.len()).rev().find(|c| *c != i_min).unwrap_or(i_min);
        }
        if non_empty > 2 && distribution != 50.0 {
            return Err(ConsolidatedError::UnsupportedClassDistribution(format!(
                "only balancing (50%) is possible with {} classes, {}% requested",
                non_empty, distribution
            )));
        }

        let mut new_sizes = vec![0; sizes.len()];
        let mut bag_size = self.policy.bag_size;
        if bag_size == BagSize::MaxSize {
            let unchanged = if non_empty > 2 {
                sizes.iter().filter(|s| **s > 0).all(|s| *s == min_size)
            } else {
                let original = 100.0 * min_size as f64 / data_size as f64;
                (original - distribution).abs() < 1e-9
            };
            if unchanged {
                report.diagnostic(format!(
                    "Forced bag size reduction to {}% because the class distribution does not change",
                    self.policy.size_reduction_percent
                ));
                bag_size = BagSize::Percent(self.policy.size_reduction_percent);
            }
        }
        // A full bag takes every row when there are two classes, or when all classes
        // already have the minority size.
        if bag_size == BagSize::Percent(100)
            && (non_empty <= 2 || sizes.iter().filter(|s| **s > 0).all(|s| *s == min_size))
        {
            bag_size = BagSize::Percent(self.reduced_percent(100, report));
        }

        if non_empty > 2 {
            let percent = match bag_size {
                BagSize::MaxSize => 100.0,
                BagSize::MinorityClassSize => 50.0,
                BagSize::Percent(p) => p as f64,
            };
            for (c, s) in sizes.iter().enumerate() {
                if *s > 0 {
                    new_sizes[c] = (percent * min_size as f64 / 100.0) as usize;
                }
            }
        } else if non_empty == 2 {
            match bag_size {
                BagSize::MaxSize => {
                    let original = 100.0 * min_size as f64 / data_size as f64;
                    if distribution > original {
                        new_sizes[i_min] = min_size;
                        new_sizes[i_maj] = round_size(min_size as f64 * (100.0 - distribution) / distribution);
                    } else {
                        new_sizes[i_maj] = sizes[i_maj];
                        new_sizes[i_min] = round_size(sizes[i_maj] as f64 * distribution / (100.0 - distribution));
                    }
                }
                BagSize::MinorityClassSize | BagSize::Percent(_) => {
                    let bag = match bag_size {
                        BagSize::Percent(p) => data_size * p as usize / 100,
                        _ => min_size,
                    };
                    new_sizes[i_min] = round_size(distribution * bag as f64 / 100.0);
                    new_sizes[i_maj] = bag.saturating_sub(new_sizes[i_min]);
                }
            }
        } else {
            new_sizes[i_min] = match bag_size {
                BagSize::Percent(p) => data_size * p as usize / 100,
                _ => min_size,
            };
        }

        for (c, (new, size)) in new_sizes.iter().zip(sizes.iter()).enumerate() {
            if new > size {
                return Err(ConsolidatedError::UnsupportedClassDistribution(format!(
                    "class {} would need {} instances per sample but only has {}",
                    class_label(data, c),
                    new,
                    size
                )));
            }
        }
        report.bag_size = new_sizes.iter().sum();
        Ok(new_sizes)
    }
}

fn class_label(data: &Dataset, class: usize) -> String {
    match &data.class_attribute().kind {
        crate::data::AttributeKind::Nominal(values) => values.get(class).cloned().unwrap_or_else(|| class.to_string()),
        crate::data::AttributeKind::Numeric => class.to_string(),
    }
}
