use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::features::feature_matrix::period_label;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// What to do with a feature column whose min equals its max.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DegenerateColumnPolicy {
    /// Keep the column and set every cell to 0.
    #[default]
    ZeroFill,
    /// Remove the column before clustering.
    DropColumn,
    /// Fail the run with [`AnalysisError::DegenerateFeatureColumn`].
    Reject,
}

impl std::str::FromStr for DegenerateColumnPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "zero" | "zerofill" => Ok(DegenerateColumnPolicy::ZeroFill),
            "drop" | "dropcolumn" => Ok(DegenerateColumnPolicy::DropColumn),
            "reject" => Ok(DegenerateColumnPolicy::Reject),
            _ => anyhow::bail!(
                "Invalid DEGENERATE_COLUMN_POLICY: {}. Valid: zero-fill, drop, reject",
                s
            ),
        }
    }
}

impl fmt::Display for DegenerateColumnPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateColumnPolicy::ZeroFill => write!(f, "zero-fill"),
            DegenerateColumnPolicy::DropColumn => write!(f, "drop"),
            DegenerateColumnPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// A constant column detected during min-max scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegenerateColumn {
    pub label: String,
    pub value: f64,
}

/// Feature matrix with every column scaled to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeatures {
    symbols: Vec<String>,
    periods: Vec<usize>,
    values: Array2<f64>,
    degenerate: Vec<DegenerateColumn>,
}

impl NormalizedFeatures {
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Lookback lengths of the columns that were kept.
    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn degenerate_columns(&self) -> &[DegenerateColumn] {
        &self.degenerate
    }
}

/// Scales each column independently: `(x - min) / (max - min)`.
pub fn min_max_normalize(
    symbols: &[String],
    periods: &[usize],
    values: &Array2<f64>,
    policy: DegenerateColumnPolicy,
) -> AnalysisResult<NormalizedFeatures> {
    let mut kept_periods = Vec::with_capacity(periods.len());
    let mut kept_columns = Vec::with_capacity(periods.len());
    let mut degenerate = Vec::new();

    for (j, column) in values.axis_iter(Axis(1)).enumerate() {
        let min = column.iter().copied().fold(f64::INFINITY, f64::min);
        let max = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let label = period_label(periods[j]);

        if max == min {
            warn!("Feature column {} is constant at {}", label, min);
            match policy {
                DegenerateColumnPolicy::Reject => {
                    return Err(AnalysisError::DegenerateFeatureColumn { label, value: min });
                }
                DegenerateColumnPolicy::ZeroFill => {
                    kept_periods.push(periods[j]);
                    kept_columns.push(vec![0.0; column.len()]);
                }
                DegenerateColumnPolicy::DropColumn => {}
            }
            degenerate.push(DegenerateColumn { label, value: min });
            continue;
        }

        let range = max - min;
        kept_periods.push(periods[j]);
        kept_columns.push(column.iter().map(|v| (v - min) / range).collect());
    }

    if kept_columns.is_empty() {
        return Err(AnalysisError::NoInformativeColumns);
    }

    let mut scaled = Array2::zeros((values.nrows(), kept_columns.len()));
    for (j, column) in kept_columns.iter().enumerate() {
        for (i, v) in column.iter().enumerate() {
            scaled[[i, j]] = *v;
        }
    }

    Ok(NormalizedFeatures {
        symbols: symbols.to_vec(),
        periods: kept_periods,
        values: scaled,
        degenerate,
    })
}
