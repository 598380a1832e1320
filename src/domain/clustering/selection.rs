use crate::domain::clustering::family::ClusteringFamily;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How the cluster count was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Caller pinned the count; no sweep ran.
    Fixed,
    /// Knee of the inertia-vs-k curve.
    InertiaKnee,
    /// Minimum Akaike information criterion.
    MinimumAic,
    /// Minimum Bayesian information criterion.
    MinimumBic,
    /// Minimum discrete second difference of the WCSS-vs-k curve.
    WcssSecondDifference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradedReason {
    /// The score curve has no detectable knee.
    NoElbowDetected,
    /// Every candidate scored the same.
    AllScoresTied,
    /// Too few candidate counts to evaluate the criterion.
    TooFewCandidates,
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradedReason::NoElbowDetected => write!(f, "no elbow detected"),
            DegradedReason::AllScoresTied => write!(f, "all scores tied"),
            DegradedReason::TooFewCandidates => write!(f, "too few candidates"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionConfidence {
    Confident,
    /// A valid count was returned but the criterion could not discriminate.
    Degraded(DegradedReason),
}

/// Outcome of the cluster-count selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountSelection {
    pub family: ClusteringFamily,
    pub count: usize,
    pub method: SelectionMethod,
    /// Score per candidate count, keyed by count. Empty for fixed counts.
    pub scores: BTreeMap<usize, f64>,
    pub confidence: SelectionConfidence,
}

impl CountSelection {
    pub fn fixed(family: ClusteringFamily, count: usize) -> Self {
        Self {
            family,
            count,
            method: SelectionMethod::Fixed,
            scores: BTreeMap::new(),
            confidence: SelectionConfidence::Confident,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.confidence, SelectionConfidence::Degraded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_selection_is_confident() {
        let selection = CountSelection::fixed(ClusteringFamily::Mixture, 3);
        assert_eq!(selection.count, 3);
        assert_eq!(selection.method, SelectionMethod::Fixed);
        assert!(selection.scores.is_empty());
        assert!(!selection.is_degraded());
    }
}
