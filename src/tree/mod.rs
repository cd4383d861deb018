pub mod predict;
pub mod tree;

// Unit-testing
#[cfg(test)]
mod tests {
    use crate::data::tests_support::{three_class_dataset, two_class_dataset};
    use crate::data::{Attribute, Dataset};
    use crate::grower::{GrowthBudget, PriorityCriterion};
    use crate::node::TreeView;
    use crate::prune::PruneParams;
    use crate::splitter::{C45Splitter, SplitModel};
    use crate::tree::tree::{Tree, TreeParams};
    use crate::utils::first_max_index;
    use approx::assert_relative_eq;

    fn splitter() -> C45Splitter {
        C45Splitter::new(2.0, true, true)
    }

    fn accuracy(tree: &Tree, data: &Dataset) -> f64 {
        let preds = tree.predict_distribution(data, false, false);
        let correct = preds
            .iter()
            .enumerate()
            .filter(|(r, p)| first_max_index(p) == data.class_code(*r))
            .count();
        correct as f64 / data.rows() as f64
    }

    #[test]
    fn test_tree_fit() {
        let data = two_class_dataset(500, 0, 0.0);
        let mut tree = Tree::new();
        tree.fit(&data, data.instances_with_class(), &splitter(), &TreeParams::default());

        assert!(!tree.is_leaf(0));
        assert!(matches!(tree.split(0).attribute(), Some(0) | Some(2)));
        assert!(accuracy(&tree, &data) > 0.9);
        assert_eq!(tree.num_nodes(), tree.num_leaves() + tree.num_inner_nodes());
        assert!(tree.nodes.values().all(|n| n.data.is_none()));
    }

    #[test]
    fn test_tree_fit_multiclass() {
        let data = three_class_dataset(&[60, 60, 60], 4);
        let mut tree = Tree::new();
        tree.fit(&data, data.instances_with_class(), &splitter(), &TreeParams::default());
        assert!(tree.num_leaves() >= 3);
        assert!(accuracy(&tree, &data) > 0.95);
    }

    #[test]
    fn test_visit_order_does_not_change_unbudgeted_tree() {
        let data = two_class_dataset(300, 2, 0.05);
        let criteria = [
            PriorityCriterion::Original,
            PriorityCriterion::LevelByLevel,
            PriorityCriterion::Preorder,
            PriorityCriterion::Size,
            PriorityCriterion::GainRatio,
            PriorityCriterion::NormalizedGainRatio,
        ];
        let mut shapes = Vec::new();
        for criterion in criteria {
            let mut tree = Tree::new();
            tree.grow(
                &data,
                data.instances_with_class(),
                &splitter(),
                criterion,
                GrowthBudget::Unlimited,
            );
            let mut splits: Vec<(usize, Option<usize>)> =
                tree.nodes.values().map(|n| (n.depth, n.split.attribute())).collect();
            splits.sort();
            shapes.push((tree.num_nodes(), tree.num_leaves(), splits));
        }
        assert!(shapes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_budgets() {
        let data = two_class_dataset(500, 3, 0.0);
        let mut full = Tree::new();
        full.grow(
            &data,
            data.instances_with_class(),
            &splitter(),
            PriorityCriterion::Original,
            GrowthBudget::Unlimited,
        );
        assert!(full.num_inner_nodes() > 2);

        let mut by_nodes = Tree::new();
        by_nodes.grow(
            &data,
            data.instances_with_class(),
            &splitter(),
            PriorityCriterion::Size,
            GrowthBudget::MaxInnerNodes(2),
        );
        assert_eq!(by_nodes.num_inner_nodes(), 2);

        let mut by_levels = Tree::new();
        by_levels.grow(
            &data,
            data.instances_with_class(),
            &splitter(),
            PriorityCriterion::LevelByLevel,
            GrowthBudget::MaxLevels(1),
        );
        assert_eq!(by_levels.depth(), 1);
        assert_eq!(by_levels.num_inner_nodes(), 1);
    }

    #[test]
    fn test_unpruned_is_not_smaller() {
        let data = two_class_dataset(400, 8, 0.05);
        let mut pruned = Tree::new();
        pruned.fit(&data, data.instances_with_class(), &splitter(), &TreeParams::default());
        let params = TreeParams {
            prune: PruneParams {
                unpruned: true,
                collapse: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut unpruned = Tree::new();
        unpruned.fit(&data, data.instances_with_class(), &splitter(), &params);
        assert!(unpruned.num_nodes() >= pruned.num_nodes());
    }

    #[test]
    fn test_missing_value_goes_down_every_branch() {
        let data = two_class_dataset(500, 0, 0.0);
        let mut tree = Tree::new();
        tree.fit(&data, data.instances_with_class(), &splitter(), &TreeParams::default());
        let row = vec![f64::NAN, f64::NAN, f64::NAN, f64::NAN];
        let probs = tree.predict_distribution_row(&row, f64::NAN, false);
        assert_relative_eq!(probs.iter().sum::<f64>(), 1.0, epsilon = 1e-9);

        let root = tree.distribution(0).to_single_bag();
        assert_relative_eq!(probs[1], root.prob(1), epsilon = 0.1);
    }

    #[test]
    fn test_empty_branch_uses_parent_bag() {
        let attributes = vec![
            Attribute::nominal("outlook", &["sunny", "rainy", "overcast"]),
            Attribute::nominal("play", &["no", "yes"]),
        ];
        let mut rows = Vec::new();
        for i in 0..20 {
            rows.push(vec![if i < 10 { "sunny" } else { "rainy" }, if i < 9 || i == 19 { "no" } else { "yes" }]);
        }
        let data = Dataset::from_labels(attributes, &rows, 1).unwrap();
        let mut tree = Tree::new();
        tree.grow(
            &data,
            data.instances_with_class(),
            &splitter(),
            PriorityCriterion::Original,
            GrowthBudget::Unlimited,
        );
        assert!(matches!(tree.split(0), SplitModel::Nominal { .. }));
        assert!(tree.is_empty(tree.children(0)[2]));
        let probs = tree.predict_distribution_row(&[2.0, f64::NAN], f64::NAN, false);
        let root = tree.distribution(0);
        assert_relative_eq!(probs[0], root.prob(0), epsilon = 1e-9);
    }

    #[test]
    fn test_laplace_smooths_pure_leaves() {
        let data = three_class_dataset(&[30, 30, 30], 1);
        let mut tree = Tree::new();
        tree.fit(&data, data.instances_with_class(), &splitter(), &TreeParams::default());
        let row = data.get_row(0);
        let plain = tree.predict_distribution_row(&row, f64::NAN, false);
        let smoothed = tree.predict_distribution_row(&row, f64::NAN, true);
        let best = first_max_index(&plain);
        assert!(smoothed[best] <= plain[best]);
        assert!(smoothed.iter().all(|p| *p > 0.0));
        assert_relative_eq!(smoothed.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_numeric_class_is_mean_leaf() {
        let attributes = vec![Attribute::numeric("x"), Attribute::numeric("y")];
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, (i * 2) as f64]).collect();
        let data = Dataset::from_rows(attributes, &rows, 1).unwrap();
        let mut tree = Tree::new();
        tree.fit(&data, data.instances_with_class(), &splitter(), &TreeParams::default());
        assert_eq!(tree.num_nodes(), 1);
        assert_relative_eq!(tree.predict_value_row(&[3.0, f64::NAN], f64::NAN), 9.0, epsilon = 1e-9);
    }
}
