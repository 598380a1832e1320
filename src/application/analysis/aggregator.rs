use crate::domain::clustering::{AssignmentRow, ClusterAssignment};
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::features::CompleteFeatures;
use std::collections::BTreeMap;

/// Joins cluster labels back onto instruments.
///
/// Labels are matched by symbol, never by row position, and the reported
/// mean ratio comes from the raw (un-normalized) feature values.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Pairs each clustered symbol with its label.
    pub fn label_by_symbol(
        symbols: &[String],
        labels: &[usize],
    ) -> AnalysisResult<BTreeMap<String, usize>> {
        if symbols.len() != labels.len() {
            return Err(AnalysisError::LabelCountMismatch {
                labels: labels.len(),
                rows: symbols.len(),
            });
        }
        Ok(symbols.iter().cloned().zip(labels.iter().copied()).collect())
    }

    /// One row per instrument of `features`; every instrument must carry a label.
    pub fn aggregate(
        features: &CompleteFeatures,
        labels: &BTreeMap<String, usize>,
    ) -> AnalysisResult<ClusterAssignment> {
        if labels.len() != features.len() {
            return Err(AnalysisError::LabelCountMismatch {
                labels: labels.len(),
                rows: features.len(),
            });
        }

        let mut assignment = ClusterAssignment::new();
        for (symbol, mean) in features.symbols().iter().zip(features.row_means()) {
            let cluster_label =
                *labels
                    .get(symbol)
                    .ok_or_else(|| AnalysisError::LabelCountMismatch {
                        labels: labels.len(),
                        rows: features.len(),
                    })?;

            assignment.insert(AssignmentRow {
                symbol: symbol.clone(),
                mean_efficiency_ratio: mean,
                cluster_label,
            });
        }
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{FeatureMatrix, FeatureRow};

    fn features() -> CompleteFeatures {
        let rows = vec![
            FeatureRow {
                symbol: "US30".to_string(),
                values: vec![Some(0.2), Some(0.4)],
            },
            FeatureRow {
                symbol: "GER40".to_string(),
                values: vec![Some(0.6), Some(0.8)],
            },
        ];
        FeatureMatrix::new(vec![6, 7], rows)
            .unwrap()
            .complete_rows()
            .unwrap()
    }

    #[test]
    fn test_labels_join_by_symbol() {
        let mut labels = BTreeMap::new();
        labels.insert("GER40".to_string(), 0);
        labels.insert("US30".to_string(), 1);

        let assignment = ResultAggregator::aggregate(&features(), &labels).unwrap();
        let us30 = assignment.get("US30").unwrap();
        assert_eq!(us30.cluster_label, 1);
        assert!((us30.mean_efficiency_ratio - 0.3).abs() < 1e-12);
        assert_eq!(assignment.label_of("GER40"), Some(0));
    }

    #[test]
    fn test_label_count_must_match() {
        let err = ResultAggregator::label_by_symbol(&["US30".to_string()], &[0, 1]).unwrap_err();
        assert_eq!(err, AnalysisError::LabelCountMismatch { labels: 2, rows: 1 });

        let mut labels = BTreeMap::new();
        labels.insert("US30".to_string(), 0);
        labels.insert("NAS100".to_string(), 1);
        assert!(ResultAggregator::aggregate(&features(), &labels).is_err());
    }
}
