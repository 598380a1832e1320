use crate::application::features::efficiency_ratio::mean_efficiency_ratio;
use crate::domain::errors::{AnalysisError, AnalysisResult};
use crate::domain::features::{FeatureMatrix, FeatureRow};
use crate::domain::market::PriceSeries;
use rayon::prelude::*;
use std::ops::Range;
use tracing::{debug, info};

/// Builds the (instrument × lookback length) mean efficiency-ratio table.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    periods: Range<usize>,
}

impl FeatureBuilder {
    /// # Arguments
    /// * `init_period` - First lookback length (inclusive, positive)
    /// * `end_period` - Last lookback length (exclusive)
    pub fn new(init_period: usize, end_period: usize) -> AnalysisResult<Self> {
        if init_period == 0 || init_period >= end_period {
            return Err(AnalysisError::InvalidLookbackRange {
                init: init_period,
                end: end_period,
            });
        }
        Ok(Self {
            periods: init_period..end_period,
        })
    }

    pub fn periods(&self) -> Vec<usize> {
        self.periods.clone().collect()
    }

    /// Longest lookback length in the range.
    pub fn max_period(&self) -> usize {
        self.periods.end - 1
    }

    /// Computes one row per instrument. Instruments are processed in parallel;
    /// rows come back in input order.
    pub fn build(&self, universe: &[PriceSeries]) -> AnalysisResult<FeatureMatrix> {
        if universe.is_empty() {
            return Err(AnalysisError::EmptyUniverse);
        }

        let periods = self.periods();
        info!(
            "Building efficiency-ratio features for {} instruments over lengths {}..{}",
            universe.len(),
            self.periods.start,
            self.periods.end
        );

        let rows: Vec<FeatureRow> = universe
            .par_iter()
            .map(|series| {
                let closes = series.closes();
                let values: Vec<Option<f64>> = periods
                    .iter()
                    .map(|&length| mean_efficiency_ratio(&closes, length))
                    .collect();
                let undefined = values.iter().filter(|v| v.is_none()).count();
                if undefined > 0 {
                    debug!(
                        "{}: {} of {} lengths undefined ({} bars)",
                        series.symbol(),
                        undefined,
                        values.len(),
                        closes.len()
                    );
                }
                FeatureRow {
                    symbol: series.symbol().to_string(),
                    values,
                }
            })
            .collect();

        FeatureMatrix::new(periods, rows)
    }
}
