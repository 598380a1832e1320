use crate::domain::errors::{AnalysisError, AnalysisResult};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One OHLCV bar as delivered by a price-history provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub symbol: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub timestamp: i64,
}

impl Candle {
    /// Rejects bars that are physically impossible: non-positive prices,
    /// low above high, negative volume.
    pub fn is_valid(&self) -> bool {
        if self.open <= Decimal::ZERO
            || self.high <= Decimal::ZERO
            || self.low <= Decimal::ZERO
            || self.close <= Decimal::ZERO
        {
            warn!(
                "Validation FAILED: Candle for {} at {} has non-positive price component(s)",
                self.symbol, self.timestamp
            );
            return false;
        }

        if self.low > self.high {
            warn!(
                "Validation FAILED: Candle for {} at {} has low {} > high {}",
                self.symbol, self.timestamp, self.low, self.high
            );
            return false;
        }

        if self.volume < Decimal::ZERO {
            warn!(
                "Validation FAILED: Candle for {} at {} has negative volume: {}",
                self.symbol, self.timestamp, self.volume
            );
            return false;
        }

        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Unix seconds.
    pub timestamp: i64,
    pub close: f64,
}

/// Ordered close-price history of one instrument.
///
/// Timestamps are strictly increasing and closes are finite and positive;
/// both are checked at construction so the feature builder can trust them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> AnalysisResult<Self> {
        let symbol = symbol.into();

        for (index, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(AnalysisError::InvalidPrice {
                    symbol,
                    timestamp: point.timestamp,
                    price: point.close,
                });
            }
            if index > 0 && points[index - 1].timestamp >= point.timestamp {
                return Err(AnalysisError::UnorderedSeries { symbol, index });
            }
        }

        Ok(Self { symbol, points })
    }

    /// Builds a series from closes sampled at consecutive integer timestamps.
    pub fn from_closes(symbol: impl Into<String>, closes: &[f64]) -> AnalysisResult<Self> {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                timestamp: i as i64,
                close,
            })
            .collect();
        Self::new(symbol, points)
    }

    /// Converts provider candles into a close series. Candles must already be
    /// sorted by timestamp; conversion to f64 happens at this boundary.
    pub fn from_candles(symbol: impl Into<String>, candles: &[Candle]) -> AnalysisResult<Self> {
        let symbol = symbol.into();
        let mut points = Vec::with_capacity(candles.len());
        for candle in candles {
            let close = candle.close.to_f64().ok_or_else(|| AnalysisError::InvalidPrice {
                symbol: symbol.clone(),
                timestamp: candle.timestamp,
                price: f64::NAN,
            })?;
            points.push(PricePoint {
                timestamp: candle.timestamp,
                close,
            });
        }
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(timestamp: i64, close: Decimal) -> Candle {
        Candle {
            symbol: "EURUSD".to_string(),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(100),
            timestamp,
        }
    }

    #[test]
    fn test_rejects_unordered_timestamps() {
        let points = vec![
            PricePoint { timestamp: 10, close: 1.0 },
            PricePoint { timestamp: 10, close: 1.1 },
        ];
        let err = PriceSeries::new("EURUSD", points).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::UnorderedSeries {
                symbol: "EURUSD".to_string(),
                index: 1
            }
        );
    }

    #[test]
    fn test_rejects_non_positive_close() {
        let err = PriceSeries::from_closes("XAUUSD", &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidPrice { .. }));
    }

    #[test]
    fn test_from_candles_keeps_order() {
        let candles = vec![candle(1, dec!(1.1012)), candle(2, dec!(1.1020))];
        let series = PriceSeries::from_candles("EURUSD", &candles).unwrap();
        assert_eq!(series.len(), 2);
        assert!((series.closes()[1] - 1.1020).abs() < 1e-12);
    }

    #[test]
    fn test_candle_low_above_high_is_invalid() {
        let mut bar = candle(1, dec!(2000.0));
        bar.low = dec!(2001.0);
        assert!(!bar.is_valid());
        assert!(candle(1, dec!(2000.0)).is_valid());
    }
}
