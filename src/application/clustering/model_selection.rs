//! Cluster-count selection heuristics
//!
//! Pure functions over precomputed score curves, independent of any
//! clustering algorithm:
//! - Kneedle knee detection (convex, decreasing curves such as inertia vs k)
//! - Criterion minimization with smallest-index tie breaking (AIC/BIC)
//! - Discrete second-difference elbow (WCSS vs k)

/// Kneedle sensitivity used for the inertia curve.
pub const DEFAULT_KNEE_SENSITIVITY: f64 = 1.0;

/// Finds the knee of a convex, decreasing curve with the Kneedle algorithm.
///
/// The curve is scaled to the unit square, flipped so the knee becomes a local
/// maximum of `y - x`, and the first maximum whose difference curve then drops
/// below `max - S * mean(dx)` is reported.
///
/// # Arguments
/// * `xs` - Candidate parameter values, increasing
/// * `ys` - Score per candidate
/// * `sensitivity` - Kneedle `S`; larger values are more conservative
///
/// # Returns
/// * `Some(index)` - Position of the knee in `xs`
/// * `None` - Fewer than three points, a flat curve, or no knee
pub fn find_knee(xs: &[f64], ys: &[f64], sensitivity: f64) -> Option<usize> {
    let n = xs.len();
    if n < 3 || ys.len() != n {
        return None;
    }

    let x_norm = unit_scale(xs)?;
    let y_norm = unit_scale(ys)?;
    let y_top = y_norm.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let difference: Vec<f64> = y_norm
        .iter()
        .zip(&x_norm)
        .map(|(y, x)| (y_top - y) - x)
        .collect();

    let maxima = local_extrema(&difference, |value, neighbour| value >= neighbour);
    let minima = local_extrema(&difference, |value, neighbour| value <= neighbour);
    let first_maximum = *maxima.first()?;

    let mean_step =
        x_norm.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>() / (n - 1) as f64;

    let mut threshold = 0.0;
    let mut threshold_index = 0;
    let mut maxima_seen = 0;

    for i in first_maximum..n - 1 {
        if maxima.contains(&i) {
            threshold = difference[maxima[maxima_seen]] - sensitivity * mean_step;
            threshold_index = i;
            maxima_seen += 1;
        }
        if minima.contains(&i) {
            threshold = 0.0;
        }
        if difference[i + 1] < threshold {
            return Some(threshold_index);
        }
    }

    None
}

/// Index of the smallest finite score; ties resolve to the smallest index.
///
/// # Returns
/// `(index, all_tied)` where `all_tied` is set when more than one score was
/// compared and every one of them was equal. `None` when no score is finite.
pub fn argmin_with_ties(scores: &[f64]) -> Option<(usize, bool)> {
    let finite: Vec<(usize, f64)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| s.is_finite())
        .collect();

    let mut best = *finite.first()?;
    for &(i, s) in &finite[1..] {
        if s < best.1 {
            best = (i, s);
        }
    }

    let all_tied = finite.len() > 1 && finite.iter().all(|&(_, s)| s == best.1);
    Some((best.0, all_tied))
}

/// Elbow of a WCSS curve sampled at k = 1, 2, 3, ...
///
/// Takes the discrete second difference of the curve and returns
/// `argmin + 2`: each finite difference shortens the series by one, so the
/// offset maps the index back onto a cluster count.
///
/// # Returns
/// `(count, all_tied)`, or `None` with fewer than three points.
pub fn second_difference_elbow(wcss: &[f64]) -> Option<(usize, bool)> {
    if wcss.len() < 3 {
        return None;
    }

    let first: Vec<f64> = wcss.windows(2).map(|w| w[1] - w[0]).collect();
    let second: Vec<f64> = first.windows(2).map(|w| w[1] - w[0]).collect();

    argmin_with_ties(&second).map(|(index, tied)| (index + 2, tied))
}

fn unit_scale(values: &[f64]) -> Option<Vec<f64>> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if !range.is_finite() || range == 0.0 {
        return None;
    }
    Some(values.iter().map(|v| (v - min) / range).collect())
}

/// Relative extrema with order 1; edges compare against themselves.
fn local_extrema(values: &[f64], keep: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    let last = values.len().saturating_sub(1);
    (0..values.len())
        .filter(|&i| {
            let left = values[i.saturating_sub(1)];
            let right = values[(i + 1).min(last)];
            keep(values[i], left) && keep(values[i], right)
        })
        .collect()
}
