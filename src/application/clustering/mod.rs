pub mod agglomerative;
pub mod clustering_config;
pub mod count_selector;
pub mod dispersion;
pub mod gaussian_mixture;
pub mod kmeans;
pub mod model_selection;

pub use agglomerative::{AgglomerativeClustering, WardDendrogram};
pub use clustering_config::{ClusteringConfig, DEFAULT_SEED, KMeansSettings, MixtureSettings};
pub use gaussian_mixture::{FittedMixture, GaussianMixtureClustering};
pub use kmeans::KMeansClustering;

use crate::domain::clustering::{ClusteringFamily, CountSelection};
use crate::domain::errors::{AnalysisError, AnalysisResult};
use ndarray::Array2;

/// Common capability set of the clustering families.
///
/// `fit` selects the cluster count (or takes the fixed one from the config)
/// and fits the model; `predict` labels rows with the fitted model. The
/// fitted state belongs to the strategy and is replaced by every `fit`.
pub trait ClusteringStrategy: Send + Sync {
    fn family(&self) -> ClusteringFamily;

    fn fit(&mut self, x: &Array2<f64>) -> AnalysisResult<()>;

    /// Fails with `NotFitted` until `fit` has succeeded.
    fn predict(&self, x: &Array2<f64>) -> AnalysisResult<Vec<usize>>;

    /// Selection outcome of the last `fit`.
    fn selection(&self) -> Option<&CountSelection>;

    /// Always `fit` then `predict` on the same rows.
    fn fit_predict(&mut self, x: &Array2<f64>) -> AnalysisResult<Vec<usize>> {
        self.fit(x)?;
        self.predict(x)
    }

    fn optimal_count(&self) -> AnalysisResult<usize> {
        self.selection()
            .map(|selection| selection.count)
            .ok_or_else(|| self.not_fitted("optimal_count"))
    }

    fn not_fitted(&self, operation: &'static str) -> AnalysisError {
        AnalysisError::NotFitted {
            family: self.family().to_string(),
            operation,
        }
    }
}

/// Builds the strategy for the configured family.
pub struct StrategyFactory;

impl StrategyFactory {
    pub fn create(config: &ClusteringConfig) -> Box<dyn ClusteringStrategy> {
        match config.family {
            ClusteringFamily::Centroid => Box::new(KMeansClustering::new(config.clone())),
            ClusteringFamily::Mixture => Box::new(GaussianMixtureClustering::new(config.clone())),
            ClusteringFamily::Hierarchical => {
                Box::new(AgglomerativeClustering::new(config.clone()))
            }
        }
    }
}

pub(crate) fn require_rows(x: &Array2<f64>) -> AnalysisResult<()> {
    if x.nrows() == 0 {
        return Err(AnalysisError::TooFewInstruments {
            requested: 1,
            available: 0,
        });
    }
    Ok(())
}

pub(crate) fn check_width(expected: usize, x: &Array2<f64>) -> AnalysisResult<()> {
    if x.ncols() != expected {
        return Err(AnalysisError::DimensionMismatch {
            expected,
            actual: x.ncols(),
        });
    }
    Ok(())
}
