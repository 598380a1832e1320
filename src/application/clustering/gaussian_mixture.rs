//! Full-covariance Gaussian mixture fitted by expectation-maximization
//!
//! - EM runs in `linfa_clustering` with seeded k-means initialization
//! - Convergence: change of the mean per-sample log-likelihood below `tol`
//! - `reg_covar` is added to every covariance diagonal
//! - Labels and the AIC/BIC log-likelihood are scored here in log space from
//!   the fitted weights, means and covariances

use crate::application::clustering::clustering_config::{ClusteringConfig, MixtureSettings};
use crate::application::clustering::count_selector::{candidate_counts, select_by_criterion, sweep};
use crate::application::clustering::dispersion::{distinct_row_count, first_appearance_permutation};
use crate::application::clustering::{ClusteringStrategy, check_width, require_rows};
use crate::domain::clustering::{ClusteringFamily, CountSelection};
use crate::domain::errors::{AnalysisError, AnalysisResult};
use linfa::prelude::*;
use linfa_clustering::GaussianMixtureModel;
use linfa_linalg::cholesky::Cholesky;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand_xoshiro::Xoshiro256Plus;
use rand_xoshiro::rand_core::SeedableRng;
use tracing::{info, warn};

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Free parameters of a k-component, d-dimensional full-covariance mixture:
/// covariances, means and the k - 1 independent weights.
pub fn n_parameters(k: usize, d: usize) -> usize {
    k * d * (d + 1) / 2 + k * d + (k - 1)
}

fn fit_failed(reason: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::FitFailed {
        family: ClusteringFamily::Mixture.to_string(),
        reason: reason.to_string(),
    }
}

fn log_sum_exp(values: ArrayView1<f64>) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// A fitted mixture with its training log-likelihood.
pub struct FittedMixture {
    model: GaussianMixtureModel<f64>,
    /// `ln w_j - (d ln 2pi + ln |S_j|) / 2` per component.
    log_norms: Array1<f64>,
    n_features: usize,
    log_likelihood: f64,
    /// Raw component index -> dense label.
    label_map: Vec<usize>,
}

impl FittedMixture {
    pub fn fit(
        x: &Array2<f64>,
        k: usize,
        settings: MixtureSettings,
        seed: u64,
    ) -> AnalysisResult<Self> {
        let dataset = DatasetBase::from(x.clone());
        let model = GaussianMixtureModel::params_with_rng(k, Xoshiro256Plus::seed_from_u64(seed))
            .tolerance(settings.tol)
            .reg_covariance(settings.reg_covar)
            .max_n_iterations(settings.max_iter as u64)
            .fit(&dataset)
            .map_err(fit_failed)?;

        let d = x.ncols() as f64;
        let mut log_norms = Array1::<f64>::zeros(k);
        for (j, covariance) in model.covariances().outer_iter().enumerate() {
            let factor = covariance.cholesky().map_err(fit_failed)?;
            let log_det = 2.0 * factor.diag().mapv(f64::ln).sum();
            log_norms[j] = model.weights()[j].ln() - 0.5 * (d * LN_2PI + log_det);
        }

        let mut fitted = Self {
            model,
            log_norms,
            n_features: x.ncols(),
            log_likelihood: 0.0,
            label_map: Vec::new(),
        };

        let log_prob = fitted.weighted_log_prob(x);
        fitted.log_likelihood = log_prob.rows().into_iter().map(log_sum_exp).sum();
        fitted.label_map = first_appearance_permutation(&argmax_rows(&log_prob), k);
        Ok(fitted)
    }

    /// `ln w_j + ln N(x_i | mu_j, S_j)` for every row and component.
    fn weighted_log_prob(&self, x: &Array2<f64>) -> Array2<f64> {
        let means = self.model.means();
        let precisions = self.model.precisions();
        let mut out = Array2::<f64>::zeros((x.nrows(), self.log_norms.len()));
        for (j, precision) in precisions.outer_iter().enumerate() {
            let mean = means.row(j);
            for (i, row) in x.rows().into_iter().enumerate() {
                let centered = &row - &mean;
                let mahalanobis = centered.dot(&precision.dot(&centered));
                out[[i, j]] = self.log_norms[j] - 0.5 * mahalanobis;
            }
        }
        out
    }

    /// Total log-likelihood of the training data.
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn weights(&self) -> Vec<f64> {
        self.model.weights().to_vec()
    }

    /// Component with the highest weighted log-probability per row.
    pub fn predict(&self, x: &Array2<f64>) -> Vec<usize> {
        argmax_rows(&self.weighted_log_prob(x))
            .into_iter()
            .map(|raw| self.label_map[raw])
            .collect()
    }
}

fn argmax_rows(scores: &Array2<f64>) -> Vec<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            for (j, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}

/// Mixture-family strategy; the count is chosen by AIC or BIC.
pub struct GaussianMixtureClustering {
    config: ClusteringConfig,
    model: Option<FittedMixture>,
    selection: Option<CountSelection>,
}

impl GaussianMixtureClustering {
    pub fn new(config: ClusteringConfig) -> Self {
        Self {
            config,
            model: None,
            selection: None,
        }
    }

    fn fit_components(&self, x: &Array2<f64>, k: usize) -> AnalysisResult<FittedMixture> {
        FittedMixture::fit(x, k, self.config.mixture, self.config.seed)
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
            return Ok(CountSelection::fixed(ClusteringFamily::Mixture, count));
        }

        let (n, d) = x.dim();
        let criterion = self.config.criterion;
        let candidates = candidate_counts(ClusteringFamily::Mixture, self.config.max_count, distinct);
        let mut scores = sweep(candidates, self.config.parallel_sweep, |k| {
            match self.fit_components(x, k) {
                Ok(model) => Ok(criterion.score(model.log_likelihood(), n_parameters(k, d), n)),
                Err(err) => {
                    // Empty or non-converging components drop out of the sweep
                    warn!("GaussianMixture k={} skipped: {}", k, err);
                    Ok(f64::NAN)
                }
            }
        })?;
        scores.retain(|_, score| score.is_finite());

        Ok(select_by_criterion(criterion, scores))
    }
}

impl ClusteringStrategy for GaussianMixtureClustering {
    fn family(&self) -> ClusteringFamily {
        ClusteringFamily::Mixture
    }

    fn fit(&mut self, x: &Array2<f64>) -> AnalysisResult<()> {
        self.config.validate()?;
        require_rows(x)?;

        let selection = self.select_count(x)?;
        let model = self.fit_components(x, selection.count)?;

        info!(
            "GaussianMixture fitted: k={} ({:?}, {:?}), log-likelihood {:.4}",
            selection.count,
            selection.method,
            selection.confidence,
            model.log_likelihood()
        );
        self.model = Some(model);
        self.selection = Some(selection);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> AnalysisResult<Vec<usize>> {
        let model = self.model.as_ref().ok_or_else(|| self.not_fitted("predict"))?;
        check_width(model.n_features, x)?;
        Ok(model.predict(x))
    }

    fn selection(&self) -> Option<&CountSelection> {
        self.selection.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clustering::InformationCriterion;
    use ndarray::array;

    fn two_blobs() -> Array2<f64> {
        array![
            [0.00, 0.05],
            [0.04, 0.00],
            [0.02, 0.03],
            [0.06, 0.04],
            [0.01, 0.02],
            [0.95, 1.00],
            [1.00, 0.96],
            [0.97, 0.98],
            [0.99, 0.94],
            [0.96, 0.99],
        ]
    }

    #[test]
    fn test_parameter_count() {
        // 2 components in 3 dims: 2*6 covariance + 2*3 means + 1 weight
        assert_eq!(n_parameters(2, 3), 19);
        assert_eq!(n_parameters(1, 1), 2);
    }

    #[test]
    fn test_log_sum_exp_is_stable() {
        let values = array![-1000.0, -1000.0];
        assert!((log_sum_exp(values.view()) - (-1000.0 + 2f64.ln())).abs() < 1e-9);
        let empty = Array1::<f64>::from(vec![f64::NEG_INFINITY]);
        assert_eq!(log_sum_exp(empty.view()), f64::NEG_INFINITY);
    }

    #[test]
    fn test_single_component_matches_gaussian_fit() {
        let x = array![[0.0], [2.0]];
        let model = FittedMixture::fit(&x, 1, MixtureSettings::default(), 42).unwrap();
        // mean 1, variance 1 (+ reg): each point one standard deviation away
        let expected = 2.0 * (-0.5 * (LN_2PI + 1.0));
        assert!((model.log_likelihood() - expected).abs() < 1e-4);
        assert!((model.weights()[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_blobs_are_separated() {
        let config = ClusteringConfig::for_family(ClusteringFamily::Mixture).with_fixed_count(2);
        let mut strategy = GaussianMixtureClustering::new(config);
        let labels = strategy.fit_predict(&two_blobs()).unwrap();

        assert_eq!(labels[..5], [0; 5]);
        assert_eq!(labels[5..], [1; 5]);
    }

    #[test]
    fn test_far_rows_still_get_a_label() {
        let config = ClusteringConfig::for_family(ClusteringFamily::Mixture).with_fixed_count(2);
        let mut strategy = GaussianMixtureClustering::new(config);
        strategy.fit(&two_blobs()).unwrap();

        let far = array![[1.0e6, -1.0e6], [0.02, 0.02]];
        let labels = strategy.predict(&far).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[1], 0);
    }

    #[test]
    fn test_selected_count_minimizes_its_criterion() {
        for criterion in [InformationCriterion::Aic, InformationCriterion::Bic] {
            let config = ClusteringConfig::for_family(ClusteringFamily::Mixture)
                .with_max_count(4)
                .with_criterion(criterion);
            let mut strategy = GaussianMixtureClustering::new(config);
            strategy.fit(&two_blobs()).unwrap();

            let selection = strategy.selection().unwrap();
            assert!(selection.scores.values().all(|s| s.is_finite()));
            let best = selection
                .scores
                .values()
                .copied()
                .fold(f64::INFINITY, f64::min);
            assert_eq!(selection.scores[&selection.count], best);
        }
    }

    #[test]
    fn test_same_seed_gives_same_fit() {
        let first = FittedMixture::fit(&two_blobs(), 2, MixtureSettings::default(), 7).unwrap();
        let second = FittedMixture::fit(&two_blobs(), 2, MixtureSettings::default(), 7).unwrap();
        assert_eq!(first.log_likelihood(), second.log_likelihood());
        assert_eq!(first.predict(&two_blobs()), second.predict(&two_blobs()));
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let strategy =
            GaussianMixtureClustering::new(ClusteringConfig::for_family(ClusteringFamily::Mixture));
        assert!(matches!(
            strategy.predict(&two_blobs()),
            Err(AnalysisError::NotFitted { .. })
        ));
        assert!(strategy.optimal_count().is_err());
    }
}
