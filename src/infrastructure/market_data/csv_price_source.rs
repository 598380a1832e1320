use crate::domain::market::Candle;
use crate::domain::ports::PriceHistoryProvider;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::StringRecord;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, warn};

/// Reads daily/intraday bars from `<data_dir>/<SYMBOL>.csv`.
///
/// Header names are matched case-insensitively: `date|time|timestamp` and
/// `close` are required; `open`, `high`, `low` default to the close and
/// `volume|spread` defaults to zero.
pub struct CsvPriceSource {
    data_dir: PathBuf,
}

struct ColumnLayout {
    timestamp: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

impl ColumnLayout {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };

        Ok(Self {
            timestamp: find(&["date", "time", "timestamp", "datetime"])
                .ok_or_else(|| anyhow!("CSV header has no date/time/timestamp column"))?,
            open: find(&["open"]),
            high: find(&["high"]),
            low: find(&["low"]),
            close: find(&["close", "adj close"])
                .ok_or_else(|| anyhow!("CSV header has no close column"))?,
            volume: find(&["volume", "spread", "tick_volume"]),
        })
    }
}

impl CsvPriceSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", symbol))
    }

    /// Parses bars from any CSV reader, sorted by timestamp.
    ///
    /// Malformed cells are errors; physically impossible bars are skipped.
    pub fn parse_bars<R: std::io::Read>(symbol: &str, reader: R) -> Result<Vec<Candle>> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let layout = ColumnLayout::locate(rdr.headers()?)?;

        let mut candles = Vec::new();
        let mut skipped = 0usize;
        for (line, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("{}: unreadable CSV row {}", symbol, line + 2))?;
            let cell = |index: usize| record.get(index).unwrap_or("");
            let price = |index: Option<usize>, fallback: Decimal| -> Result<Decimal> {
                match index {
                    Some(i) => parse_decimal(cell(i))
                        .with_context(|| format!("{}: bad number on row {}", symbol, line + 2)),
                    None => Ok(fallback),
                }
            };

            let close = price(Some(layout.close), Decimal::ZERO)?;
            let candle = Candle {
                symbol: symbol.to_string(),
                open: price(layout.open, close)?,
                high: price(layout.high, close)?,
                low: price(layout.low, close)?,
                close,
                volume: price(layout.volume, Decimal::ZERO)?,
                timestamp: parse_timestamp(cell(layout.timestamp))
                    .with_context(|| format!("{}: bad date on row {}", symbol, line + 2))?,
            };

            if candle.is_valid() {
                candles.push(candle);
            } else {
                skipped += 1;
            }
        }

        if skipped > 0 {
            warn!("{}: skipped {} invalid bars", symbol, skipped);
        }

        candles.sort_by_key(|c| c.timestamp);
        if let Some(pair) = candles.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            bail!("{}: duplicate bar timestamp {}", symbol, pair[0].timestamp);
        }

        debug!("{}: parsed {} bars", symbol, candles.len());
        Ok(candles)
    }
}

fn parse_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| anyhow!("'{}': {}", raw, e))
}

/// Unix seconds, RFC 3339, `%Y-%m-%d %H:%M:%S` or `%Y-%m-%d` (UTC midnight).
pub fn parse_timestamp(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<i64>() {
        return Ok(seconds);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt.and_utc().timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc().timestamp());
        }
    }
    bail!("unrecognized date '{}'", raw)
}

#[async_trait]
impl PriceHistoryProvider for CsvPriceSource {
    async fn get_historical_bars(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>> {
        let path = self.path_for(symbol);
        let content = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;

        let mut candles = Self::parse_bars(symbol, content.as_slice())?;
        candles.retain(|c| {
            start.is_none_or(|s| c.timestamp >= s.timestamp())
                && end.is_none_or(|e| c.timestamp <= e.timestamp())
        });
        Ok(candles)
    }

    fn name(&self) -> &str {
        "CSV"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = "Date,Open,High,Low,Close,Volume
2024-01-03,101,103,100,102.5,1200
2024-01-02,100,102,99,101,1000
2024-01-04,102,104,101,-1,900
2024-01-05,103,105,102,104,1500
";

    #[test]
    fn test_parse_sorts_and_skips_invalid_bars() {
        let candles = CsvPriceSource::parse_bars("SPX", SAMPLE.as_bytes()).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].close, dec!(101));
        assert_eq!(candles[1].close, dec!(102.5));
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_minimal_header_defaults_ohlc_to_close() {
        let csv = "time,close,spread\n1700000000,1.0850,12\n1700003600,1.0860,11\n";
        let candles = CsvPriceSource::parse_bars("EURUSD", csv.as_bytes()).unwrap();
        assert_eq!(candles[1].timestamp, 1_700_003_600);
        assert_eq!(candles[1].high, dec!(1.0860));
        assert_eq!(candles[1].volume, dec!(11));
    }

    #[test]
    fn test_duplicate_timestamps_are_rejected() {
        let csv = "Date,Close\n2024-01-02,10\n2024-01-02,11\n";
        let err = CsvPriceSource::parse_bars("DAX", csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_missing_close_column_is_an_error() {
        let csv = "Date,Open\n2024-01-02,10\n";
        assert!(CsvPriceSource::parse_bars("DAX", csv.as_bytes()).is_err());
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(parse_timestamp("86400").unwrap(), 86_400);
        assert_eq!(parse_timestamp("1970-01-02").unwrap(), 86_400);
        assert_eq!(parse_timestamp("1970-01-02 00:00:10").unwrap(), 86_410);
        assert_eq!(parse_timestamp("1970-01-02T01:00:00+01:00").unwrap(), 86_400);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[tokio::test]
    async fn test_missing_file_names_the_path() {
        let source = CsvPriceSource::new("/nonexistent/erclust");
        let err = source.get_historical_bars("NOPE", None, None).await.unwrap_err();
        assert!(err.to_string().contains("NOPE.csv"));
    }
}
