use crate::domain::market::Candle;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Source of historical bars. Everything behind this port runs before the
/// clustering core is invoked.
#[async_trait]
pub trait PriceHistoryProvider: Send + Sync {
    /// Bars for `symbol` ordered by timestamp, optionally bounded to `[start, end]`.
    async fn get_historical_bars(
        &self,
        symbol: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<Candle>>;

    fn name(&self) -> &str;
}
