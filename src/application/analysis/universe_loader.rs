use crate::domain::market::PriceSeries;
use crate::domain::ports::PriceHistoryProvider;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

/// Fetches every symbol from `provider` and converts the bars into close
/// series. Any failing symbol fails the whole load; the analysis never runs
/// on a silently shrunken universe.
pub async fn load_universe(
    provider: &dyn PriceHistoryProvider,
    symbols: &[String],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<PriceSeries>> {
    info!(
        "Loading {} instruments from {} ({:?} .. {:?})",
        symbols.len(),
        provider.name(),
        start,
        end
    );

    let mut universe = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let candles = provider
            .get_historical_bars(symbol, start, end)
            .await
            .with_context(|| format!("Failed to load bars for {}", symbol))?;

        if candles.is_empty() {
            warn!("{}: provider returned no bars", symbol);
        }

        let series = PriceSeries::from_candles(symbol.as_str(), &candles)
            .with_context(|| format!("Invalid price history for {}", symbol))?;
        info!("{}: {} bars", symbol, series.len());
        universe.push(series);
    }

    Ok(universe)
}
