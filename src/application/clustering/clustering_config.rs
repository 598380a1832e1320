use crate::domain::clustering::{ClusteringFamily, InformationCriterion};
use crate::domain::errors::{AnalysisError, AnalysisResult};
use serde::{Deserialize, Serialize};

/// Default seed shared by every randomized component.
pub const DEFAULT_SEED: u64 = 42;

/// k-means settings. Initialization is always k-means++.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KMeansSettings {
    pub max_iter: usize,
}

impl Default for KMeansSettings {
    fn default() -> Self {
        Self { max_iter: 300 }
    }
}

/// Gaussian mixture EM settings (full covariance, k-means initialization).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixtureSettings {
    pub max_iter: usize,
    /// Convergence threshold on the change of the mean log-likelihood.
    pub tol: f64,
    /// Added to covariance diagonals to keep them positive definite.
    pub reg_covar: f64,
}

impl Default for MixtureSettings {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-3,
            reg_covar: 1e-6,
        }
    }
}

/// Everything a clustering strategy needs at construction.
///
/// The seed lives here once and is handed to every randomized step
/// (k-means++ seeding, mixture initialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringConfig {
    pub family: ClusteringFamily,
    /// Pins the cluster/component count and skips the sweep.
    pub fixed_count: Option<usize>,
    /// Upper bound of the sweep (inclusive).
    pub max_count: usize,
    pub seed: u64,
    pub criterion: InformationCriterion,
    pub kmeans: KMeansSettings,
    pub mixture: MixtureSettings,
    /// Fit sweep candidates on the rayon pool.
    pub parallel_sweep: bool,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            family: ClusteringFamily::default(),
            fixed_count: None,
            max_count: 10,
            seed: DEFAULT_SEED,
            criterion: InformationCriterion::default(),
            kmeans: KMeansSettings::default(),
            mixture: MixtureSettings::default(),
            parallel_sweep: true,
        }
    }
}

impl ClusteringConfig {
    pub fn for_family(family: ClusteringFamily) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }

    pub fn with_fixed_count(mut self, count: usize) -> Self {
        self.fixed_count = Some(count);
        self
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_criterion(mut self, criterion: InformationCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn validate(&self) -> AnalysisResult<()> {
        if self.max_count == 0 {
            return Err(AnalysisError::InvalidMaxClusterCount(self.max_count));
        }
        if let Some(count) = self.fixed_count {
            if count == 0 {
                return Err(AnalysisError::InvalidFixedClusterCount(count));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_stable() {
        let config = ClusteringConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.max_count, 10);
        assert_eq!(config.criterion, InformationCriterion::Bic);
        assert_eq!(config.kmeans.max_iter, 300);
        assert_eq!(config.mixture.max_iter, 100);
        assert!(config.fixed_count.is_none());
    }

    #[test]
    fn test_validate_rejects_zero_counts() {
        let zero_max = ClusteringConfig::default().with_max_count(0);
        assert_eq!(
            zero_max.validate().unwrap_err(),
            AnalysisError::InvalidMaxClusterCount(0)
        );

        let zero_fixed = ClusteringConfig::default().with_fixed_count(0);
        assert_eq!(
            zero_fixed.validate().unwrap_err(),
            AnalysisError::InvalidFixedClusterCount(0)
        );
    }
}
