use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::features::normalization::{
    DegenerateColumnPolicy, NormalizedFeatures, min_max_normalize,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const LABEL_PREFIX: &str = "period_";

/// Column label for a lookback length, e.g. `period_14`.
pub fn period_label(period: usize) -> String {
    format!("{LABEL_PREFIX}{period}")
}

/// Recovers the lookback length from a column label.
pub fn period_from_label(label: &str) -> Option<usize> {
    label.strip_prefix(LABEL_PREFIX)?.parse().ok()
}

/// Mean efficiency ratios of one instrument, one cell per lookback length.
/// `None` marks a length the instrument has too little history for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub symbol: String,
    pub values: Vec<Option<f64>>,
}

impl FeatureRow {
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

/// Raw (instrument × lookback length) table of mean efficiency ratios.
///
/// Built fresh per analysis run and immutable afterwards. Rows keep the
/// order the instruments were supplied in; columns are ascending lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    periods: Vec<usize>,
    rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn new(periods: Vec<usize>, rows: Vec<FeatureRow>) -> AnalysisResult<Self> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if !seen.insert(row.symbol.as_str()) {
                return Err(AnalysisError::DuplicateInstrument {
                    symbol: row.symbol.clone(),
                });
            }
            if row.values.len() != periods.len() {
                return Err(AnalysisError::DimensionMismatch {
                    expected: periods.len(),
                    actual: row.values.len(),
                });
            }
        }
        Ok(Self { periods, rows })
    }

    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    pub fn labels(&self) -> Vec<String> {
        self.periods.iter().map(|&p| period_label(p)).collect()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn row(&self, symbol: &str) -> Option<&FeatureRow> {
        self.rows.iter().find(|r| r.symbol == symbol)
    }

    pub fn value(&self, symbol: &str, period: usize) -> Option<f64> {
        let column = self.periods.iter().position(|&p| p == period)?;
        self.row(symbol)?.values[column]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drops every instrument with an undefined cell.
    ///
    /// The dropped symbols are carried in [`CompleteFeatures::excluded`] so the
    /// caller can report them; an empty result is an error, never a silent
    /// empty matrix.
    pub fn complete_rows(&self) -> AnalysisResult<CompleteFeatures> {
        let (complete, incomplete): (Vec<&FeatureRow>, Vec<&FeatureRow>) =
            self.rows.iter().partition(|r| r.is_complete());

        if complete.is_empty() {
            return Err(AnalysisError::InsufficientOverlappingHistory {
                periods: self.periods.len(),
                excluded: incomplete.len(),
            });
        }

        let mut values = Array2::zeros((complete.len(), self.periods.len()));
        for (i, row) in complete.iter().enumerate() {
            for (j, cell) in row.values.iter().enumerate() {
                if let Some(v) = cell {
                    values[[i, j]] = *v;
                }
            }
        }

        Ok(CompleteFeatures {
            symbols: complete.iter().map(|r| r.symbol.clone()).collect(),
            periods: self.periods.clone(),
            values,
            excluded: incomplete.iter().map(|r| r.symbol.clone()).collect(),
        })
    }
}

/// Feature rows with every lookback length defined, ready for normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteFeatures {
    symbols: Vec<String>,
    periods: Vec<usize>,
    values: Array2<f64>,
    excluded: Vec<String>,
}

impl CompleteFeatures {
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn periods(&self) -> &[usize] {
        &self.periods
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Instruments removed because at least one lookback length was undefined.
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Mean efficiency ratio of each instrument across all lookback lengths.
    pub fn row_means(&self) -> Vec<f64> {
        let width = self.values.ncols() as f64;
        self.values
            .rows()
            .into_iter()
            .map(|row| row.sum() / width)
            .collect()
    }

    pub fn normalize(&self, policy: DegenerateColumnPolicy) -> AnalysisResult<NormalizedFeatures> {
        min_max_normalize(&self.symbols, &self.periods, &self.values, policy)
    }
}
