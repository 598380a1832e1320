use crate::application::clustering::clustering_config::{ClusteringConfig, KMeansSettings};
use crate::application::clustering::count_selector::{
    candidate_counts, select_by_inertia_knee, sweep,
};
use crate::application::clustering::dispersion::{
    distinct_row_count, first_appearance_permutation, within_cluster_sum_of_squares,
};
use crate::application::clustering::{ClusteringStrategy, check_width, require_rows};
use crate::domain::clustering::{ClusteringFamily, CountSelection};
use crate::domain::errors::{AnalysisError, AnalysisResult};
use ndarray::Array2;
use smartcore::cluster::kmeans::{KMeans, KMeansParameters};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

type SmartKMeans = KMeans<f64, usize, DenseMatrix<f64>, Vec<usize>>;

fn to_dense_matrix(
    x: &Array2<f64>,
    family: ClusteringFamily,
) -> AnalysisResult<DenseMatrix<f64>> {
    let rows: Vec<Vec<f64>> = x.rows().into_iter().map(|row| row.to_vec()).collect();
    DenseMatrix::from_2d_vec(&rows).map_err(|e| AnalysisError::FitFailed {
        family: family.to_string(),
        reason: format!("Matrix creation failed: {}", e),
    })
}

/// Fitted centroid model. smartcore rejects k < 2; a single cluster labels
/// every row 0.
enum CentroidModel {
    Single,
    Lloyd {
        model: SmartKMeans,
        /// Raw smartcore cluster id -> dense label.
        label_map: Vec<usize>,
    },
}

impl CentroidModel {
    fn fit(
        x: &Array2<f64>,
        k: usize,
        settings: KMeansSettings,
        seed: u64,
    ) -> AnalysisResult<Self> {
        if k == 1 {
            return Ok(CentroidModel::Single);
        }

        let data = to_dense_matrix(x, ClusteringFamily::Centroid)?;
        let params = KMeansParameters {
            k,
            max_iter: settings.max_iter,
            seed: Some(seed),
        };
        let model = SmartKMeans::fit(&data, params).map_err(|e| AnalysisError::FitFailed {
            family: ClusteringFamily::Centroid.to_string(),
            reason: e.to_string(),
        })?;

        let raw = Self::raw_predict(&model, &data)?;
        let label_map = first_appearance_permutation(&raw, k);
        Ok(CentroidModel::Lloyd { model, label_map })
    }

    fn raw_predict(model: &SmartKMeans, data: &DenseMatrix<f64>) -> AnalysisResult<Vec<usize>> {
        model.predict(data).map_err(|e| AnalysisError::FitFailed {
            family: ClusteringFamily::Centroid.to_string(),
            reason: format!("Prediction failed: {}", e),
        })
    }

    fn predict(&self, x: &Array2<f64>) -> AnalysisResult<Vec<usize>> {
        match self {
            CentroidModel::Single => Ok(vec![0; x.nrows()]),
            CentroidModel::Lloyd { model, label_map } => {
                let data = to_dense_matrix(x, ClusteringFamily::Centroid)?;
                let raw = Self::raw_predict(model, &data)?;
                Ok(raw.into_iter().map(|label| label_map[label]).collect())
            }
        }
    }
}

/// Centroid-family strategy backed by smartcore k-means (k-means++ seeding).
pub struct KMeansClustering {
    config: ClusteringConfig,
    model: Option<(CentroidModel, usize)>,
    selection: Option<CountSelection>,
}

impl KMeansClustering {
    pub fn new(config: ClusteringConfig) -> Self {
        Self {
            config,
            model: None,
            selection: None,
        }
    }

    fn select_count(&self, x: &Array2<f64>) -> AnalysisResult<CountSelection> {
        let distinct = distinct_row_count(x);

        if let Some(count) = self.config.fixed_count {
            if count > distinct {
                return Err(AnalysisError::TooFewInstruments {
                    requested: count,
                    available: distinct,
                });
            }
            return Ok(CountSelection::fixed(ClusteringFamily::Centroid, count));
        }

        let settings = self.config.kmeans;
        let seed = self.config.seed;
        let candidates = candidate_counts(ClusteringFamily::Centroid, self.config.max_count, distinct);
        let scores = sweep(candidates, self.config.parallel_sweep, |k| {
            let labels = CentroidModel::fit(x, k, settings, seed)?.predict(x)?;
            Ok(within_cluster_sum_of_squares(x, &labels))
        })?;

        // Identical rows leave no candidate and fall back to a single cluster
        Ok(select_by_inertia_knee(scores))
    }
}

impl ClusteringStrategy for KMeansClustering {
    fn family(&self) -> ClusteringFamily {
        ClusteringFamily::Centroid
    }

    fn fit(&mut self, x: &Array2<f64>) -> AnalysisResult<()> {
        self.config.validate()?;
        require_rows(x)?;

        let selection = self.select_count(x)?;
        let model = CentroidModel::fit(x, selection.count, self.config.kmeans, self.config.seed)?;

        info!(
            "KMeans fitted: k={} ({:?}, {:?})",
            selection.count, selection.method, selection.confidence
        );
        self.model = Some((model, x.ncols()));
        self.selection = Some(selection);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> AnalysisResult<Vec<usize>> {
        let (model, width) = self.model.as_ref().ok_or_else(|| self.not_fitted("predict"))?;
        check_width(*width, x)?;
        model.predict(x)
    }

    fn selection(&self) -> Option<&CountSelection> {
        self.selection.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn three_groups() -> Array2<f64> {
        array![
            [0.0, 0.0],
            [0.05, 0.02],
            [0.02, 0.04],
            [0.5, 0.5],
            [0.52, 0.48],
            [0.49, 0.51],
            [1.0, 1.0],
            [0.97, 0.99],
            [0.98, 1.0],
        ]
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let strategy = KMeansClustering::new(ClusteringConfig::default());
        let err = strategy.predict(&three_groups()).unwrap_err();
        assert!(matches!(err, AnalysisError::NotFitted { operation: "predict", .. }));
    }

    #[test]
    fn test_fixed_count_separates_groups() {
        let config = ClusteringConfig::default().with_fixed_count(3);
        let mut strategy = KMeansClustering::new(config);
        let labels = strategy.fit_predict(&three_groups()).unwrap();

        assert_eq!(labels[0], 0);
        assert_eq!(labels[..3], [labels[0]; 3]);
        assert_eq!(labels[3..6], [labels[3]; 3]);
        assert_eq!(labels[6..], [labels[6]; 3]);
        assert_ne!(labels[0], labels[3]);
        assert_ne!(labels[3], labels[6]);
        assert_eq!(strategy.optimal_count().unwrap(), 3);
    }

    #[test]
    fn test_fixed_count_above_distinct_rows_is_rejected() {
        let x = array![[0.0], [0.0], [1.0]];
        let mut strategy = KMeansClustering::new(ClusteringConfig::default().with_fixed_count(3));
        assert_eq!(
            strategy.fit(&x).unwrap_err(),
            AnalysisError::TooFewInstruments {
                requested: 3,
                available: 2
            }
        );
    }

    #[test]
    fn test_single_cluster_model() {
        let x = array![[0.2, 0.3], [0.4, 0.1]];
        let mut strategy = KMeansClustering::new(ClusteringConfig::default().with_fixed_count(1));
        assert_eq!(strategy.fit_predict(&x).unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let mut strategy = KMeansClustering::new(ClusteringConfig::default().with_fixed_count(2));
        strategy.fit(&three_groups()).unwrap();
        assert_eq!(
            strategy.predict(&array![[0.1, 0.2, 0.3]]).unwrap_err(),
            AnalysisError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_sweep_records_scores_per_candidate() {
        let mut strategy = KMeansClustering::new(ClusteringConfig::default().with_max_count(6));
        strategy.fit(&three_groups()).unwrap();
        let selection = strategy.selection().unwrap();
        assert_eq!(selection.scores.keys().copied().collect::<Vec<_>>(), vec![2, 3, 4, 5, 6]);
        assert!((2..=6).contains(&selection.count));
    }
}
