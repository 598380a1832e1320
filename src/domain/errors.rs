use thiserror::Error;

/// Errors raised by a single efficiency-ratio clustering run.
///
/// Every variant is local to one run: the core performs no I/O, so a failed
/// run simply produces no result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Instrument universe is empty")]
    EmptyUniverse,

    #[error("Invalid lookback range [{init}, {end}): init must be positive and below end")]
    InvalidLookbackRange { init: usize, end: usize },

    #[error("Maximum cluster count must be positive, got {0}")]
    InvalidMaxClusterCount(usize),

    #[error("Fixed cluster count must be positive, got {0}")]
    InvalidFixedClusterCount(usize),

    #[error("Duplicate instrument in universe: {symbol}")]
    DuplicateInstrument { symbol: String },

    #[error("Price series for {symbol} is not strictly increasing at index {index}")]
    UnorderedSeries { symbol: String, index: usize },

    #[error("Invalid close price for {symbol} at {timestamp}: {price}")]
    InvalidPrice {
        symbol: String,
        timestamp: i64,
        price: f64,
    },

    #[error(
        "Insufficient overlapping history: no instrument has a defined ratio for all {periods} lookback lengths ({excluded} excluded)"
    )]
    InsufficientOverlappingHistory { periods: usize, excluded: usize },

    #[error("Feature column {label} is constant ({value}); min-max normalization is undefined")]
    DegenerateFeatureColumn { label: String, value: f64 },

    #[error("Every feature column is constant; nothing left to cluster")]
    NoInformativeColumns,

    #[error("Requested {requested} clusters but only {available} distinct instruments are available")]
    TooFewInstruments { requested: usize, available: usize },

    #[error("{family} model is not fitted: call fit() before {operation}()")]
    NotFitted {
        family: String,
        operation: &'static str,
    },

    #[error("Feature width mismatch: model fitted on {expected} columns, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("{family} fit failed: {reason}")]
    FitFailed { family: String, reason: String },

    #[error("Label count {labels} does not match instrument count {rows}")]
    LabelCountMismatch { labels: usize, rows: usize },

    #[error("Assignment covers {assigned} + {excluded} excluded instruments, universe has {universe}")]
    AssignmentInvariant {
        assigned: usize,
        excluded: usize,
        universe: usize,
    },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_fitted_names_missing_call() {
        let error = AnalysisError::NotFitted {
            family: "KMeans".to_string(),
            operation: "predict",
        };

        let msg = error.to_string();
        assert!(msg.contains("KMeans"));
        assert!(msg.contains("fit()"));
        assert!(msg.contains("predict()"));
    }

    #[test]
    fn test_lookback_range_formatting() {
        let error = AnalysisError::InvalidLookbackRange { init: 30, end: 6 };
        let msg = error.to_string();
        assert!(msg.contains("[30, 6)"));
    }
}
