use consolidated_trees::consolidated::tree::ConsolidatedTree;
use consolidated_trees::consolidation::ConsolidatedSplitSelector;
use consolidated_trees::sampler::Resampler;
use consolidated_trees::{
    Attribute, BagSize, BudgetMode, ClassDistribution, ConsolidatedClassifier, ConsolidatedConfig, Dataset,
    PriorityCriterion, ResamplingPolicy, SampleCount,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

fn create_data(n_samples: usize, n_features: usize) -> Dataset {
    let mut rng = StdRng::seed_from_u64(1903);
    let mut attributes: Vec<Attribute> = (0..n_features)
        .map(|i| Attribute::numeric(&format!("x{}", i)))
        .collect();
    attributes.push(Attribute::nominal("class", &["neg", "pos"]));
    let rows: Vec<Vec<f64>> = (0..n_samples)
        .map(|_| {
            let mut row: Vec<f64> = (0..n_features).map(|_| rng.gen_range(0.0..1.0)).collect();
            let score = row[0] + 0.5 * row[1] - 0.3 * row[2] + rng.gen_range(-0.2..0.2);
            row.push(if score > 0.6 { 1.0 } else { 0.0 });
            row
        })
        .collect();
    Dataset::from_rows(attributes, &rows, n_features).expect("valid benchmark dataset")
}

pub fn consolidated_benchmarks(c: &mut Criterion) {
    let data = create_data(5000, 6);
    let policy = ResamplingPolicy {
        class_distribution: ClassDistribution::Stratified,
        bag_size: BagSize::Percent(75),
        sample_count: SampleCount::Fixed(10),
        ..Default::default()
    };

    c.bench_function("Resample (stratified, 10 samples)", |b| {
        b.iter(|| Resampler::new(policy.clone(), 2).generate(black_box(&data), black_box(1)))
    });

    let config = ConsolidatedConfig {
        resampling: policy.clone(),
        ..Default::default()
    };
    let splitter = config.splitter();
    let samples = Resampler::new(policy.clone(), 2)
        .generate(&data, 1)
        .expect("valid policy")
        .samples;

    let mut building = c.benchmark_group("build_consolidated");
    building.warm_up_time(Duration::from_secs(5));
    building.sample_size(20);
    building.bench_function("Recursive builder", |b| {
        b.iter(|| {
            let selector = ConsolidatedSplitSelector::new(&splitter);
            let mut tree = ConsolidatedTree::new();
            tree.build_recursive(&selector, black_box(&data), data.instances_with_class(), samples.clone());
        })
    });
    building.bench_function("Iterative builder (gain ratio)", |b| {
        b.iter(|| {
            let selector = ConsolidatedSplitSelector::new(&splitter);
            let mut tree = ConsolidatedTree::new();
            tree.build_iterative(
                &selector,
                black_box(&data),
                data.instances_with_class(),
                samples.clone(),
                PriorityCriterion::GainRatio,
                consolidated_trees::grower::GrowthBudget::Unlimited,
            );
        })
    });
    building.bench_function("Fully consolidated classifier", |b| {
        b.iter(|| {
            let mut classifier = ConsolidatedClassifier::new(config.clone()).expect("valid config");
            classifier.fit(black_box(&data)).expect("fit");
        })
    });
    building.bench_function("Hybrid classifier (20%)", |b| {
        b.iter(|| {
            let mut classifier = ConsolidatedClassifier::new(config.clone())
                .expect("valid config")
                .set_consolidation(20.0, PriorityCriterion::Original, BudgetMode::Percentage);
            classifier.fit(black_box(&data)).expect("fit");
        })
    });
    building.finish();

    let mut hybrid = ConsolidatedClassifier::new(config.clone())
        .expect("valid config")
        .set_consolidation(20.0, PriorityCriterion::Original, BudgetMode::Percentage);
    hybrid.fit(&data).expect("fit");
    c.bench_function("Hybrid predict (Single Threaded)", |b| {
        b.iter(|| hybrid.predict_proba(black_box(&data), black_box(false)))
    });
    c.bench_function("Hybrid predict (Multi Threaded)", |b| {
        b.iter(|| hybrid.predict_proba(black_box(&data), black_box(true)))
    });
}

criterion_group!(benches, consolidated_benchmarks);
criterion_main!(benches);
