use crate::application::analysis::aggregator::ResultAggregator;
use crate::application::clustering::{ClusteringConfig, StrategyFactory};
use crate::application::features::FeatureBuilder;
use crate::domain::clustering::{ClusterAssignment, ClusterSummary, CountSelection};
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::features::{DegenerateColumn, DegenerateColumnPolicy, FeatureMatrix};
use crate::domain::market::{PriceSeries, align_on_common_timestamps};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// First lookback length (inclusive).
    pub init_period: usize,
    /// Last lookback length (exclusive).
    pub end_period: usize,
    pub clustering: ClusteringConfig,
    pub degenerate_policy: DegenerateColumnPolicy,
    /// Restrict every series to the timestamps shared by the whole universe
    /// before computing ratios.
    pub align_timestamps: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            init_period: 6,
            end_period: 30,
            clustering: ClusteringConfig::default(),
            degenerate_policy: DegenerateColumnPolicy::default(),
            align_timestamps: false,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        FeatureBuilder::new(self.init_period, self.end_period)?;
        self.clustering.validate()
    }
}

/// Output of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub assignment: ClusterAssignment,
    pub selection: CountSelection,
    /// Raw per-length mean ratios, including rows that were later excluded.
    pub features: FeatureMatrix,
    /// Instruments without a defined ratio for every lookback length.
    pub excluded_symbols: Vec<String>,
    pub degenerate_columns: Vec<DegenerateColumn>,
}

impl AnalysisReport {
    pub fn summaries(&self) -> Vec<ClusterSummary> {
        self.assignment.summaries()
    }
}

/// Features -> complete rows -> min-max scaling -> clustering -> assignment.
pub struct EfficiencyRatioAnalysis {
    config: AnalysisConfig,
}

impl EfficiencyRatioAnalysis {
    pub fn new(config: AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run(&self, universe: &[PriceSeries]) -> AnalysisResult<AnalysisReport> {
        let started = Instant::now();
        if universe.is_empty() {
            return Err(AnalysisError::EmptyUniverse);
        }

        info!(
            "Efficiency-ratio analysis: {} instruments, lengths [{}, {}), family {}",
            universe.len(),
            self.config.init_period,
            self.config.end_period,
            self.config.clustering.family
        );

        let aligned;
        let series = if self.config.align_timestamps {
            aligned = align_on_common_timestamps(universe)?;
            aligned.as_slice()
        } else {
            universe
        };

        let builder = FeatureBuilder::new(self.config.init_period, self.config.end_period)?;
        let features = builder.build(series)?;

        let complete = features.complete_rows()?;
        if !complete.excluded().is_empty() {
            warn!(
                "Excluded {} instruments with insufficient history: {:?}",
                complete.excluded().len(),
                complete.excluded()
            );
        }

        let normalized = complete.normalize(self.config.degenerate_policy)?;

        let mut strategy = StrategyFactory::create(&self.config.clustering);
        let labels = strategy.fit_predict(normalized.values())?;
        let selection = strategy
            .selection()
            .cloned()
            .ok_or_else(|| strategy.not_fitted("selection"))?;

        let by_symbol = ResultAggregator::label_by_symbol(normalized.symbols(), &labels)?;
        let assignment = ResultAggregator::aggregate(&complete, &by_symbol)?;

        let excluded_symbols = complete.excluded().to_vec();
        if assignment.len() + excluded_symbols.len() != universe.len() {
            return Err(AnalysisError::AssignmentInvariant {
                assigned: assignment.len(),
                excluded: excluded_symbols.len(),
                universe: universe.len(),
            });
        }

        info!(
            "Analysis complete in {:?}: {} instruments in {} clusters ({:?})",
            started.elapsed(),
            assignment.len(),
            assignment.cluster_count(),
            selection.confidence
        );

        Ok(AnalysisReport {
            assignment,
            selection,
            features,
            excluded_symbols,
            degenerate_columns: normalized.degenerate_columns().to_vec(),
        })
    }
}
