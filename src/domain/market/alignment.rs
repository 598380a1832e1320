use crate::domain::errors::AnalysisResult;
use crate::domain::market::price_series::{PricePoint, PriceSeries};
use std::collections::BTreeSet;
use tracing::info;

/// Restricts every series to the timestamps shared by the whole universe.
///
/// Equivalent to an inner join of all close columns followed by dropping
/// incomplete rows. A single short or gapped instrument therefore shortens
/// the history of every other one.
pub fn align_on_common_timestamps(series: &[PriceSeries]) -> AnalysisResult<Vec<PriceSeries>> {
    let Some(first) = series.first() else {
        return Ok(Vec::new());
    };

    let mut common: BTreeSet<i64> = first.points().iter().map(|p| p.timestamp).collect();
    for other in &series[1..] {
        let stamps: BTreeSet<i64> = other.points().iter().map(|p| p.timestamp).collect();
        common = common.intersection(&stamps).copied().collect();
    }

    info!(
        "Aligned {} instruments on {} common timestamps",
        series.len(),
        common.len()
    );

    series
        .iter()
        .map(|s| {
            let points: Vec<PricePoint> = s
                .points()
                .iter()
                .filter(|p| common.contains(&p.timestamp))
                .copied()
                .collect();
            PriceSeries::new(s.symbol(), points)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(symbol: &str, stamps: &[i64]) -> PriceSeries {
        let points = stamps
            .iter()
            .map(|&timestamp| PricePoint {
                timestamp,
                close: 100.0 + timestamp as f64,
            })
            .collect();
        PriceSeries::new(symbol, points).unwrap()
    }

    #[test]
    fn test_keeps_only_shared_timestamps() {
        let aligned = align_on_common_timestamps(&[
            series("AUDCAD", &[1, 2, 3, 4, 5]),
            series("NDX", &[2, 3, 5, 6]),
        ])
        .unwrap();

        let stamps: Vec<i64> = aligned[0].points().iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![2, 3, 5]);
        assert_eq!(aligned[1].len(), 3);
        assert_eq!(aligned[1].symbol(), "NDX");
    }

    #[test]
    fn test_empty_universe_is_empty() {
        assert!(align_on_common_timestamps(&[]).unwrap().is_empty());
    }
}
