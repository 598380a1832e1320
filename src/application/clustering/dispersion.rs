use ndarray::{Array2, ArrayView1};
use std::collections::{BTreeSet, HashMap};

/// Mean point of every label in `0..k`. Labels with no member keep a zero row.
pub fn cluster_centroids(x: &Array2<f64>, labels: &[usize], k: usize) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros((k, x.ncols()));
    let mut counts = vec![0usize; k];

    for (row, &label) in x.rows().into_iter().zip(labels) {
        if label < k {
            let mut target = sums.row_mut(label);
            target += &row;
            counts[label] += 1;
        }
    }

    for (mut centroid, &count) in sums.rows_mut().into_iter().zip(&counts) {
        if count > 0 {
            centroid /= count as f64;
        }
    }
    sums
}

/// Within-cluster sum of squared distances to the cluster means.
///
/// Used both as k-means inertia and as the hierarchical WCSS curve; computing
/// it from labels keeps the two families comparable.
pub fn within_cluster_sum_of_squares(x: &Array2<f64>, labels: &[usize]) -> f64 {
    let k = labels.iter().max().map_or(0, |&m| m + 1);
    let centroids = cluster_centroids(x, labels, k);

    x.rows()
        .into_iter()
        .zip(labels)
        .map(|(row, &label)| squared_distance(row, centroids.row(label)))
        .sum()
}

pub fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Number of pairwise-distinct rows. No partition can have more non-empty
/// clusters than this.
pub fn distinct_row_count(x: &Array2<f64>) -> usize {
    x.rows()
        .into_iter()
        // +0.0 folds -0.0 onto 0.0 so equal values share a bit pattern
        .map(|row| row.iter().map(|v| (v + 0.0).to_bits()).collect::<Vec<u64>>())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Renumbers labels densely in order of first appearance.
pub fn relabel_by_first_appearance(labels: &[usize]) -> Vec<usize> {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    labels
        .iter()
        .map(|label| {
            let next = mapping.len();
            *mapping.entry(*label).or_insert(next)
        })
        .collect()
}

/// Permutation of raw labels `0..k` onto dense labels: labels seen in
/// `labels` are numbered by first appearance, unseen ones follow in raw order.
pub fn first_appearance_permutation(labels: &[usize], k: usize) -> Vec<usize> {
    let mut permutation: Vec<Option<usize>> = vec![None; k];
    let mut next = 0;
    for label in labels.iter().copied().chain(0..k).filter(|&l| l < k) {
        if permutation[label].is_none() {
            permutation[label] = Some(next);
            next += 1;
        }
    }
    permutation
        .into_iter()
        .enumerate()
        .map(|(raw, dense)| dense.unwrap_or(raw))
        .collect()
}
