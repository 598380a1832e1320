use crate::application::clustering::model_selection::{
    DEFAULT_KNEE_SENSITIVITY, argmin_with_ties, find_knee, second_difference_elbow,
};
use crate::domain::clustering::{
    ClusteringFamily, CountSelection, DegradedReason, InformationCriterion, SelectionConfidence,
    SelectionMethod,
};
use crate::domain::errors::AnalysisResult;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use tracing::debug;

/// Candidate counts for a sweep: `[family minimum, min(max_count, cap)]`.
/// Empty when the cap falls below the family minimum.
pub fn candidate_counts(
    family: ClusteringFamily,
    max_count: usize,
    cap: usize,
) -> RangeInclusive<usize> {
    family.min_count()..=max_count.min(cap)
}

/// Scores every candidate count. Candidates are independent, so with
/// `parallel` they run on the rayon pool; the result is keyed by count and
/// does not depend on completion order.
pub fn sweep<F>(
    candidates: RangeInclusive<usize>,
    parallel: bool,
    score: F,
) -> AnalysisResult<BTreeMap<usize, f64>>
where
    F: Fn(usize) -> AnalysisResult<f64> + Sync + Send,
{
    let scores: BTreeMap<usize, f64> = if parallel {
        candidates
            .into_par_iter()
            .map(|k| score(k).map(|s| (k, s)))
            .collect::<AnalysisResult<_>>()?
    } else {
        candidates
            .map(|k| score(k).map(|s| (k, s)))
            .collect::<AnalysisResult<_>>()?
    };

    for (k, s) in &scores {
        debug!("sweep k={} score={:.6}", k, s);
    }
    Ok(scores)
}

/// Centroid family: knee of the inertia curve.
///
/// No knee falls back to the smallest swept count, flagged as degraded.
pub fn select_by_inertia_knee(scores: BTreeMap<usize, f64>) -> CountSelection {
    let family = ClusteringFamily::Centroid;
    let method = SelectionMethod::InertiaKnee;

    if scores.len() < 2 {
        let count = scores.keys().next().copied().unwrap_or(1);
        return degraded(family, count, method, scores, DegradedReason::TooFewCandidates);
    }

    let ks: Vec<f64> = scores.keys().map(|&k| k as f64).collect();
    let inertia: Vec<f64> = scores.values().copied().collect();

    match find_knee(&ks, &inertia, DEFAULT_KNEE_SENSITIVITY) {
        Some(index) => confident(family, ks[index] as usize, method, scores),
        None => {
            let smallest = ks[0] as usize;
            degraded(family, smallest, method, scores, DegradedReason::NoElbowDetected)
        }
    }
}

/// Mixture family: minimum information criterion, ties to the smallest count.
pub fn select_by_criterion(
    criterion: InformationCriterion,
    scores: BTreeMap<usize, f64>,
) -> CountSelection {
    let family = ClusteringFamily::Mixture;
    let method = match criterion {
        InformationCriterion::Aic => SelectionMethod::MinimumAic,
        InformationCriterion::Bic => SelectionMethod::MinimumBic,
    };

    let counts: Vec<usize> = scores.keys().copied().collect();
    let values: Vec<f64> = scores.values().copied().collect();

    match argmin_with_ties(&values) {
        Some((index, _)) if counts.len() == 1 => {
            let count = counts[index];
            degraded(family, count, method, scores, DegradedReason::TooFewCandidates)
        }
        Some((index, true)) => {
            let count = counts[index];
            degraded(family, count, method, scores, DegradedReason::AllScoresTied)
        }
        Some((index, false)) => confident(family, counts[index], method, scores),
        None => {
            let count = counts.first().copied().unwrap_or(1);
            degraded(family, count, method, scores, DegradedReason::TooFewCandidates)
        }
    }
}

/// Hierarchical family: second-difference elbow of the WCSS curve swept
/// from k = 1.
pub fn select_by_wcss_elbow(scores: BTreeMap<usize, f64>) -> CountSelection {
    let family = ClusteringFamily::Hierarchical;
    let method = SelectionMethod::WcssSecondDifference;
    let upper = scores.keys().next_back().copied().unwrap_or(1);

    let wcss: Vec<f64> = scores.values().copied().collect();
    match second_difference_elbow(&wcss) {
        Some((count, false)) => confident(family, count, method, scores),
        Some((count, true)) => degraded(family, count, method, scores, DegradedReason::AllScoresTied),
        None => degraded(
            family,
            upper.min(2),
            method,
            scores,
            DegradedReason::TooFewCandidates,
        ),
    }
}

fn confident(
    family: ClusteringFamily,
    count: usize,
    method: SelectionMethod,
    scores: BTreeMap<usize, f64>,
) -> CountSelection {
    CountSelection {
        family,
        count,
        method,
        scores,
        confidence: SelectionConfidence::Confident,
    }
}

fn degraded(
    family: ClusteringFamily,
    count: usize,
    method: SelectionMethod,
    scores: BTreeMap<usize, f64>,
    reason: DegradedReason,
) -> CountSelection {
    CountSelection {
        family,
        count,
        method,
        scores,
        confidence: SelectionConfidence::Degraded(reason),
    }
}
