use serde::{Deserialize, Serialize};
use std::fmt;

/// The three interchangeable clustering strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ClusteringFamily {
    /// Hard partition around centroids (k-means).
    #[default]
    Centroid,
    /// Probabilistic Gaussian mixture scored by AIC/BIC.
    Mixture,
    /// Ward agglomerative clustering scored by the WCSS elbow.
    Hierarchical,
}

impl ClusteringFamily {
    pub fn all() -> [ClusteringFamily; 3] {
        [
            ClusteringFamily::Centroid,
            ClusteringFamily::Mixture,
            ClusteringFamily::Hierarchical,
        ]
    }

    /// Smallest count the selector sweeps for this family.
    pub fn min_count(&self) -> usize {
        match self {
            ClusteringFamily::Centroid => 2,
            ClusteringFamily::Mixture | ClusteringFamily::Hierarchical => 1,
        }
    }
}

impl std::str::FromStr for ClusteringFamily {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kmeans" | "k-means" | "centroid" => Ok(ClusteringFamily::Centroid),
            "gmm" | "mixture" | "gaussian" => Ok(ClusteringFamily::Mixture),
            "agglomerative" | "hierarchical" | "ward" => Ok(ClusteringFamily::Hierarchical),
            _ => anyhow::bail!(
                "Invalid CLUSTER_FAMILY: {}. Valid: kmeans, gmm, agglomerative",
                s
            ),
        }
    }
}

impl fmt::Display for ClusteringFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusteringFamily::Centroid => write!(f, "KMeans"),
            ClusteringFamily::Mixture => write!(f, "GaussianMixture"),
            ClusteringFamily::Hierarchical => write!(f, "Agglomerative"),
        }
    }
}

/// Information criterion used to score mixture models. Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum InformationCriterion {
    Aic,
    #[default]
    Bic,
}

impl InformationCriterion {
    /// Criterion value from total log-likelihood, free parameter count and sample size.
    pub fn score(&self, log_likelihood: f64, n_parameters: usize, n_samples: usize) -> f64 {
        let penalty = match self {
            InformationCriterion::Aic => 2.0 * n_parameters as f64,
            InformationCriterion::Bic => n_parameters as f64 * (n_samples as f64).ln(),
        };
        -2.0 * log_likelihood + penalty
    }
}

impl std::str::FromStr for InformationCriterion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aic" => Ok(InformationCriterion::Aic),
            "bic" => Ok(InformationCriterion::Bic),
            _ => anyhow::bail!("Invalid GMM_CRITERION: {}. Must be 'aic' or 'bic'", s),
        }
    }
}

impl fmt::Display for InformationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InformationCriterion::Aic => write!(f, "AIC"),
            InformationCriterion::Bic => write!(f, "BIC"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_parsing_aliases() {
        assert_eq!(
            "KMeans".parse::<ClusteringFamily>().unwrap(),
            ClusteringFamily::Centroid
        );
        assert_eq!(
            "gmm".parse::<ClusteringFamily>().unwrap(),
            ClusteringFamily::Mixture
        );
        assert_eq!(
            "ward".parse::<ClusteringFamily>().unwrap(),
            ClusteringFamily::Hierarchical
        );
        assert!("dbscan".parse::<ClusteringFamily>().is_err());
    }

    #[test]
    fn test_bic_penalizes_more_than_aic_for_large_samples() {
        let aic = InformationCriterion::Aic.score(-10.0, 5, 100);
        let bic = InformationCriterion::Bic.score(-10.0, 5, 100);
        assert!((aic - 30.0).abs() < 1e-12);
        assert!(bic > aic);
    }
}
