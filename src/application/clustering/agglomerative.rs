use crate::application::clustering::clustering_config::ClusteringConfig;
use crate::application::clustering::count_selector::{candidate_counts, select_by_wcss_elbow, sweep};
use crate::application::clustering::dispersion::{
    distinct_row_count, relabel_by_first_appearance, squared_distance,
    within_cluster_sum_of_squares,
};
use crate::application::clustering::{ClusteringStrategy, check_width, require_rows};
use crate::domain::clustering::{ClusteringFamily, CountSelection};
use crate::domain::errors::{AnalysisError, AnalysisResult};
use ndarray::{Array1, Array2};
use tracing::{debug, info};

/// One Ward merge: cluster slot `absorbed` joins slot `into`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub into: usize,
    pub absorbed: usize,
    /// Increase in total within-cluster sum of squares.
    pub cost: f64,
}

/// Full Ward merge history of a dataset, from n singletons to one cluster.
///
/// Cutting at k replays the first `n - k` merges, so every cut comes from
/// the same tree.
#[derive(Debug, Clone)]
pub struct WardDendrogram {
    n_samples: usize,
    merges: Vec<Merge>,
}

impl WardDendrogram {
    /// Greedy Ward agglomeration. Each step merges the pair with the smallest
    /// `n_a * n_b / (n_a + n_b) * |mu_a - mu_b|^2`; equal costs go to the pair
    /// with the lowest slot indices.
    pub fn build(x: &Array2<f64>) -> Self {
        let n = x.nrows();
        let mut centroids: Vec<Array1<f64>> = x.rows().into_iter().map(|r| r.to_owned()).collect();
        let mut sizes = vec![1usize; n];
        let mut active: Vec<usize> = (0..n).collect();
        let mut merges = Vec::with_capacity(n.saturating_sub(1));

        while active.len() > 1 {
            let mut best: Option<(usize, usize, f64)> = None;
            for (pos, &a) in active.iter().enumerate() {
                for &b in &active[pos + 1..] {
                    let (na, nb) = (sizes[a] as f64, sizes[b] as f64);
                    let cost = na * nb / (na + nb)
                        * squared_distance(centroids[a].view(), centroids[b].view());
                    if best.is_none_or(|(_, _, c)| cost < c) {
                        best = Some((a, b, cost));
                    }
                }
            }

            let Some((a, b, cost)) = best else { break };
            let (na, nb) = (sizes[a] as f64, sizes[b] as f64);
            centroids[a] = (&centroids[a] * na + &centroids[b] * nb) / (na + nb);
            sizes[a] += sizes[b];
            active.retain(|&slot| slot != b);
            merges.push(Merge {
                into: a,
                absorbed: b,
                cost,
            });
        }

        Self {
            n_samples: n,
            merges,
        }
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Flat partition with `k` clusters (`1 <= k <= n`), labels dense by
    /// first appearance.
    pub fn cut(&self, k: usize) -> Vec<usize> {
        let k = k.clamp(1, self.n_samples.max(1));
        let mut slots: Vec<usize> = (0..self.n_samples).collect();
        for merge in self.merges.iter().take(self.n_samples - k) {
            for slot in slots.iter_mut().filter(|s| **s == merge.absorbed) {
                *slot = merge.into;
            }
        }
        relabel_by_first_appearance(&slots)
    }
}

#[derive(Debug, Clone, Copy)]
struct FittedHierarchy {
    count: usize,
    n_features: usize,
}

/// Hierarchical-family strategy: Ward-linkage agglomerative clustering.
///
/// Agglomeration has no out-of-sample rule; `predict` rebuilds the tree on
/// its input and cuts it at the fitted count.
pub struct AgglomerativeClustering {
    config: ClusteringConfig,
    model: Option<FittedHierarchy>,
    selection: Option<CountSelection>,
}

impl AgglomerativeClustering {
    pub fn new(config: ClusteringConfig) -> Self {
        Self {
            config,
            model: None,
            selection: None,
        }
    }

    fn select_count(
        &self,
        x: &Array2<f64>,
        tree: &WardDendrogram,
        distinct: usize,
    ) -> AnalysisResult<CountSelection> {
        if let Some(count) = self.config.fixed_count {
            check_cut(count, distinct)?;
            return Ok(CountSelection::fixed(ClusteringFamily::Hierarchical, count));
        }

        let candidates =
            candidate_counts(ClusteringFamily::Hierarchical, self.config.max_count, distinct);
        let scores = sweep(candidates, self.config.parallel_sweep, |k| {
            Ok(within_cluster_sum_of_squares(x, &tree.cut(k)))
        })?;

        Ok(select_by_wcss_elbow(scores))
    }
}

fn check_cut(count: usize, distinct: usize) -> AnalysisResult<()> {
    if count > distinct {
        return Err(AnalysisError::TooFewInstruments {
            requested: count,
            available: distinct,
        });
    }
    Ok(())
}

impl ClusteringStrategy for AgglomerativeClustering {
    fn family(&self) -> ClusteringFamily {
        ClusteringFamily::Hierarchical
    }

    fn fit(&mut self, x: &Array2<f64>) -> AnalysisResult<()> {
        self.config.validate()?;
        require_rows(x)?;

        let distinct = distinct_row_count(x);
        let tree = WardDendrogram::build(x);
        debug!("Ward tree built: {} merges", tree.merges().len());

        let selection = self.select_count(x, &tree, distinct)?;
        info!(
            "Agglomerative fitted: k={} ({:?}, {:?})",
            selection.count, selection.method, selection.confidence
        );

        self.model = Some(FittedHierarchy {
            count: selection.count,
            n_features: x.ncols(),
        });
        self.selection = Some(selection);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> AnalysisResult<Vec<usize>> {
        let model = self.model.ok_or_else(|| self.not_fitted("predict"))?;
        check_width(model.n_features, x)?;
        require_rows(x)?;
        check_cut(model.count, distinct_row_count(x))?;
        Ok(WardDendrogram::build(x).cut(model.count))
    }

    fn selection(&self) -> Option<&CountSelection> {
        self.selection.as_ref()
    }
}
