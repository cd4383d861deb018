pub mod partial;
pub mod predict;
pub mod tree;

// Unit-testing
#[cfg(test)]
mod tests {
    use super::partial::{consolidation_target, growth_budget, BudgetMode};
    use super::tree::ConsolidatedTree;
    use crate::consolidation::ConsolidatedSplitSelector;
    use crate::data::tests_support::two_class_dataset;
    use crate::data::{Dataset, Instances};
    use crate::distribution::Distribution;
    use crate::grower::{GrowthBudget, PriorityCriterion};
    use crate::node::TreeView;
    use crate::prune::{collapse, prune, PruneParams};
    use crate::sampler::{BagSize, ClassDistribution, Resampler, ResamplingPolicy, SampleCount};
    use crate::splitter::C45Splitter;
    use crate::tree::tree::TreeParams;
    use approx::assert_relative_eq;

    fn samples(data: &Dataset, n: usize) -> Vec<Instances> {
        let policy = ResamplingPolicy {
            class_distribution: ClassDistribution::Stratified,
            bag_size: BagSize::Percent(70),
            sample_count: SampleCount::Fixed(n),
            ..Default::default()
        };
        Resampler::new(policy, 2).generate(data, 7).unwrap().samples
    }

    fn built(data: &Dataset, splitter: &C45Splitter) -> ConsolidatedTree {
        let selector = ConsolidatedSplitSelector::new(splitter);
        let mut tree = ConsolidatedTree::new();
        tree.build_recursive(&selector, data, data.instances_with_class(), samples(data, 5));
        tree
    }

    fn assert_aligned(tree: &ConsolidatedTree) {
        for node in tree.nodes.values() {
            assert_eq!(node.shadows.len(), tree.num_samples);
            assert_eq!(node.is_leaf, node.children.is_empty());
            for shadow in &node.shadows {
                assert_eq!(shadow.is_leaf, node.is_leaf);
                assert_eq!(shadow.split, node.split);
                assert_eq!(shadow.distribution.num_bags(), node.distribution.num_bags());
            }
            for child in &node.children {
                assert_eq!(tree.nodes[child].depth, node.depth + 1);
            }
        }
    }

    fn assert_average(tree: &ConsolidatedTree) {
        for node in tree.nodes.values() {
            let dists: Vec<Distribution> = node.shadows.iter().map(|s| s.distribution.clone()).collect();
            let avg = Distribution::average(&dists).unwrap();
            for bag in 0..avg.num_bags() {
                for class in 0..avg.num_classes() {
                    assert_relative_eq!(
                        node.distribution.per_class_per_bag(bag, class),
                        avg.per_class_per_bag(bag, class),
                        epsilon = 1e-9
                    );
                }
            }
        }
    }

    #[test]
    fn test_build_keeps_shadows_aligned() {
        let data = two_class_dataset(400, 3, 0.05);
        let splitter = C45Splitter::new(2.0, true, true);
        let tree = built(&data, &splitter);
        assert!(!tree.is_leaf(0));
        assert_eq!(tree.num_samples, 5);
        assert_aligned(&tree);
        assert_average(&tree);
    }

    #[test]
    fn test_pruning_keeps_shadows_aligned() {
        let data = two_class_dataset(400, 3, 0.1);
        let splitter = C45Splitter::new(2.0, true, true);
        let mut tree = built(&data, &splitter);
        let before = tree.num_nodes();
        collapse(&mut tree, 0);
        assert_aligned(&tree);
        prune(&mut tree, &data, 0, &PruneParams::default());
        assert!(tree.num_nodes() <= before);
        assert_aligned(&tree);
        assert_average(&tree);
    }

    #[test]
    fn test_recursive_and_iterative_builders_agree() {
        let data = two_class_dataset(400, 12, 0.05);
        let splitter = C45Splitter::new(2.0, true, true);
        let selector = ConsolidatedSplitSelector::new(&splitter);
        let sample_set = samples(&data, 5);

        let mut recursive = ConsolidatedTree::new();
        recursive.build_recursive(&selector, &data, data.instances_with_class(), sample_set.clone());
        let mut iterative = ConsolidatedTree::new();
        let inner = iterative.build_iterative(
            &selector,
            &data,
            data.instances_with_class(),
            sample_set,
            PriorityCriterion::Original,
            GrowthBudget::Unlimited,
        );

        assert_eq!(inner, recursive.num_inner_nodes());
        assert_eq!(recursive.num_nodes(), iterative.num_nodes());
        for (num, node) in &recursive.nodes {
            let other = &iterative.nodes[num];
            assert_eq!(node.split, other.split);
            assert_eq!(node.is_leaf, other.is_leaf);
            assert_eq!(node.children, other.children);
            assert!(!other.truncated);
        }
    }

    #[test]
    fn test_budgeted_build_truncates() {
        let data = two_class_dataset(500, 4, 0.0);
        let splitter = C45Splitter::new(2.0, true, true);
        let selector = ConsolidatedSplitSelector::new(&splitter);
        let mut tree = ConsolidatedTree::new();
        let inner = tree.build_iterative(
            &selector,
            &data,
            data.instances_with_class(),
            samples(&data, 5),
            PriorityCriterion::Size,
            GrowthBudget::MaxInnerNodes(1),
        );
        assert_eq!(inner, 1);
        assert_eq!(tree.num_inner_nodes(), 1);
        assert!(tree.nodes.values().any(|n| n.truncated));
        assert!(tree.nodes.values().filter(|n| n.truncated).all(|n| n.is_leaf));
        assert_aligned(&tree);
    }

    #[test]
    fn test_leave_partially_consolidated() {
        let data = two_class_dataset(500, 4, 0.05);
        let splitter = C45Splitter::new(2.0, true, true);
        let mut tree = built(&data, &splitter);
        let inner = tree.num_inner_nodes();
        assert!(inner >= 2);

        let kept = tree.leave_partially_consolidated(1);
        assert_eq!(kept, 1);
        assert_eq!(tree.num_inner_nodes(), 1);
        assert!(!tree.is_leaf(0));
        for child in tree.children(0).to_vec() {
            assert!(tree.is_leaf(child));
        }
        assert!(tree.nodes.values().any(|n| n.truncated));
        assert_aligned(&tree);
    }

    #[test]
    fn test_full_consolidation_truncates_nothing() {
        let data = two_class_dataset(300, 6, 0.0);
        let splitter = C45Splitter::new(2.0, true, true);
        let mut tree = built(&data, &splitter);
        let inner = tree.num_inner_nodes();
        let kept = tree.leave_partially_consolidated(consolidation_target(100.0, BudgetMode::Percentage, inner));
        assert_eq!(kept, inner);
        assert!(tree.nodes.values().all(|n| !n.truncated));

        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let completed = tree.complete_with_bagging(&data, &splitter, &TreeParams::default(), &pool);
        assert_eq!(completed, 0);
    }

    #[test]
    fn test_zero_consolidation_grows_independent_trees() {
        let data = two_class_dataset(300, 6, 0.0);
        let splitter = C45Splitter::new(2.0, true, true);
        let mut tree = built(&data, &splitter);
        let kept = tree.leave_partially_consolidated(0);
        assert_eq!(kept, 0);
        assert_eq!(tree.num_nodes(), 1);
        assert!(tree.nodes[&0].truncated);

        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let completed = tree.complete_with_bagging(&data, &splitter, &TreeParams::default(), &pool);
        assert_eq!(completed, 5);
        for shadow in &tree.nodes[&0].shadows {
            let completion = shadow.completion.as_ref().unwrap();
            assert!(completion.num_inner_nodes() > 0);
        }

        tree.cleanup();
        let row = data.get_row(0);
        let probs = tree.predict_hybrid_row(&row, data.missing(), false);
        assert_relative_eq!(probs.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_budget_derivation() {
        assert_eq!(consolidation_target(20.0, BudgetMode::Percentage, 12), 2);
        assert_eq!(consolidation_target(25.0, BudgetMode::Percentage, 10), 3);
        assert_eq!(consolidation_target(0.0, BudgetMode::Percentage, 10), 0);
        assert_eq!(consolidation_target(4.0, BudgetMode::Absolute, 10), 4);
        assert_eq!(
            growth_budget(50.0, BudgetMode::Percentage, PriorityCriterion::LevelByLevel, 20, 6),
            GrowthBudget::MaxLevels(3)
        );
        assert_eq!(
            growth_budget(50.0, BudgetMode::Percentage, PriorityCriterion::GainRatio, 20, 6),
            GrowthBudget::MaxInnerNodes(10)
        );
    }

    #[test]
    fn test_consolidated_and_hybrid_agree_without_completion() {
        let data = two_class_dataset(300, 2, 0.0);
        let splitter = C45Splitter::new(2.0, true, true);
        let tree = built(&data, &splitter);
        let mut agree = 0;
        for r in 0..data.rows() {
            let row = data.get_row(r);
            let a = tree.predict_consolidated_row(&row, data.missing(), false);
            let b = tree.predict_hybrid_row(&row, data.missing(), false);
            assert_relative_eq!(b.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
            if (a[1] > a[0]) == (b[1] > b[0]) {
                agree += 1;
            }
        }
        assert!(agree as f64 / data.rows() as f64 > 0.9);
    }
}
