use erclust::application::analysis::ResultAggregator;
use erclust::application::clustering::{ClusteringConfig, ClusteringStrategy, StrategyFactory};
use erclust::domain::clustering::ClusteringFamily;
use erclust::domain::features::{
    CompleteFeatures, DegenerateColumnPolicy, FeatureMatrix, FeatureRow,
};

fn complete(rows: &[(&str, &[f64])]) -> CompleteFeatures {
    let width = rows[0].1.len();
    let periods: Vec<usize> = (6..6 + width).collect();
    let rows = rows
        .iter()
        .map(|(symbol, values)| FeatureRow {
            symbol: symbol.to_string(),
            values: values.iter().copied().map(Some).collect(),
        })
        .collect();
    FeatureMatrix::new(periods, rows)
        .unwrap()
        .complete_rows()
        .unwrap()
}

fn cluster(
    features: &CompleteFeatures,
    config: &ClusteringConfig,
) -> (Box<dyn ClusteringStrategy>, Vec<usize>) {
    let normalized = features.normalize(DegenerateColumnPolicy::ZeroFill).unwrap();
    let mut strategy = StrategyFactory::create(config);
    let labels = strategy.fit_predict(normalized.values()).unwrap();
    (strategy, labels)
}

#[test]
fn test_three_separated_instruments_get_three_clusters() {
    let features = complete(&[
        ("X", &[0.9, 0.91, 0.92]),
        ("Y", &[0.1, 0.11, 0.12]),
        ("Z", &[0.5, 0.52, 0.49]),
    ]);

    for family in ClusteringFamily::all() {
        let config = ClusteringConfig::for_family(family).with_fixed_count(3);
        let (strategy, labels) = cluster(&features, &config);

        let by_symbol = ResultAggregator::label_by_symbol(features.symbols(), &labels).unwrap();
        let assignment = ResultAggregator::aggregate(&features, &by_symbol).unwrap();

        assert_eq!(assignment.cluster_count(), 3, "{}", family);
        assert_eq!(strategy.optimal_count().unwrap(), 3);

        let ordered: Vec<&str> = assignment
            .sorted_by_mean_ratio()
            .iter()
            .map(|r| r.symbol.as_str())
            .collect();
        assert_eq!(ordered, vec!["Y", "Z", "X"]);
        assert!((assignment.get("X").unwrap().mean_efficiency_ratio - 0.91).abs() < 1e-12);
    }
}

#[test]
fn test_identical_feature_vectors_share_a_cluster() {
    let features = complete(&[
        ("A", &[0.30, 0.35, 0.40]),
        ("B", &[0.80, 0.82, 0.85]),
        ("TWIN_1", &[0.55, 0.50, 0.45]),
        ("C", &[0.10, 0.12, 0.15]),
        ("TWIN_2", &[0.55, 0.50, 0.45]),
        ("D", &[0.62, 0.70, 0.66]),
    ]);

    for family in ClusteringFamily::all() {
        for config in [
            ClusteringConfig::for_family(family).with_max_count(4),
            ClusteringConfig::for_family(family).with_fixed_count(5),
        ] {
            let (_, labels) = cluster(&features, &config);
            assert_eq!(labels[2], labels[4], "{} {:?}", family, config.fixed_count);
        }
    }
}

#[test]
fn test_two_rows_with_two_clusters_never_crash() {
    let features = complete(&[("LOW", &[0.1, 0.2, 0.15]), ("HIGH", &[0.7, 0.8, 0.75])]);

    for family in ClusteringFamily::all() {
        let fixed = ClusteringConfig::for_family(family).with_fixed_count(2);
        let (_, labels) = cluster(&features, &fixed);
        assert_eq!(labels, vec![0, 1], "{}", family);

        let swept = ClusteringConfig::for_family(family);
        let (strategy, labels) = cluster(&features, &swept);
        let count = strategy.optimal_count().unwrap();
        assert!((1..=2).contains(&count), "{}", family);
        assert_eq!(labels.len(), 2);
    }
}

#[test]
fn test_fit_predict_matches_fit_then_predict() {
    let features = complete(&[
        ("A", &[0.10, 0.12, 0.11, 0.13]),
        ("B", &[0.14, 0.15, 0.12, 0.16]),
        ("C", &[0.50, 0.48, 0.52, 0.51]),
        ("D", &[0.47, 0.49, 0.50, 0.46]),
        ("E", &[0.85, 0.88, 0.90, 0.87]),
        ("F", &[0.91, 0.86, 0.89, 0.92]),
        ("G", &[0.30, 0.33, 0.29, 0.31]),
    ]);
    let normalized = features.normalize(DegenerateColumnPolicy::ZeroFill).unwrap();

    for family in ClusteringFamily::all() {
        let config = ClusteringConfig::for_family(family).with_max_count(5).with_seed(1234);

        let mut combined = StrategyFactory::create(&config);
        let one_step = combined.fit_predict(normalized.values()).unwrap();

        let mut separate = StrategyFactory::create(&config);
        separate.fit(normalized.values()).unwrap();
        let two_step = separate.predict(normalized.values()).unwrap();

        assert_eq!(one_step, two_step, "{}", family);
        assert_eq!(combined.selection(), separate.selection());
    }
}

#[test]
fn test_normalized_matrix_has_no_nan() {
    let features = complete(&[
        ("A", &[0.2, 0.4, 0.5]),
        ("B", &[0.6, 0.4, 0.1]),
        ("C", &[0.9, 0.4, 0.3]),
    ]);

    let normalized = features.normalize(DegenerateColumnPolicy::ZeroFill).unwrap();
    assert!(normalized.values().iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
    assert_eq!(normalized.degenerate_columns().len(), 1);
    assert_eq!(normalized.degenerate_columns()[0].label, "period_7");

    let dropped = features.normalize(DegenerateColumnPolicy::DropColumn).unwrap();
    assert_eq!(dropped.periods(), &[6, 8]);

    assert!(features.normalize(DegenerateColumnPolicy::Reject).is_err());
}
