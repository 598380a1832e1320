pub mod aggregator;
pub mod pipeline;
pub mod universe_loader;

pub use aggregator::ResultAggregator;
pub use pipeline::{AnalysisConfig, AnalysisReport, EfficiencyRatioAnalysis};
pub use universe_loader::load_universe;
