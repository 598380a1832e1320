pub mod feature_matrix;
pub mod normalization;

pub use feature_matrix::{
    CompleteFeatures, FeatureMatrix, FeatureRow, period_from_label, period_label,
};
pub use normalization::{DegenerateColumn, DegenerateColumnPolicy, NormalizedFeatures};
