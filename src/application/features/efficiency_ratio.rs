//! Kaufman efficiency ratio
//!
//! ER = |net change over L bars| / sum of |bar-to-bar changes| over the same L bars
//!
//! - ER close to 1: directional, persistent movement
//! - ER close to 0: noise, price travels far to go nowhere

/// Decimal places kept in the per-length mean ratio.
pub const MEAN_RATIO_DECIMALS: i32 = 5;

/// Rolling efficiency ratio series.
///
/// # Arguments
/// * `closes` - Close prices in chronological order
/// * `length` - Lookback length in bars (must be positive)
///
/// # Returns
/// One entry per close. The first `length` positions are `None`, as is any
/// window whose bar-to-bar movement sums to zero (0/0).
pub fn rolling_efficiency_ratio(closes: &[f64], length: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    let mut result = vec![None; n];
    if length == 0 || n <= length {
        return result;
    }

    let abs_changes: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]).abs()).collect();

    for i in length..n {
        let direction = (closes[i] - closes[i - length]).abs();
        // abs_changes[j - 1] holds |c[j] - c[j - 1]|
        let volatility: f64 = abs_changes[i - length..i].iter().sum();
        if volatility > 0.0 {
            result[i] = Some((direction / volatility).clamp(0.0, 1.0));
        }
    }

    result
}

/// Arithmetic mean of the defined rolling ratios, rounded to
/// [`MEAN_RATIO_DECIMALS`] places.
///
/// # Returns
/// * `Some(f64)` - Mean ratio in [0, 1]
/// * `None` - The history is too short for `length`, or every window was flat
pub fn mean_efficiency_ratio(closes: &[f64], length: usize) -> Option<f64> {
    let (sum, count) = rolling_efficiency_ratio(closes, length)
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), er| (sum + er, count + 1));

    if count == 0 {
        return None;
    }

    Some(round_to(sum / count as f64, MEAN_RATIO_DECIMALS))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_trend_is_one() {
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let er = rolling_efficiency_ratio(&closes, 5);
        assert!(er[..5].iter().all(Option::is_none));
        assert!(er[5..].iter().all(|v| *v == Some(1.0)));
        assert_eq!(mean_efficiency_ratio(&closes, 5), Some(1.0));
    }

    #[test]
    fn test_alternating_noise_is_low() {
        let closes: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        // Even window: back where it started
        assert_eq!(mean_efficiency_ratio(&closes, 4), Some(0.0));
        // Odd window: one step net over five steps
        assert_eq!(mean_efficiency_ratio(&closes, 5), Some(0.2));
    }

    #[test]
    fn test_known_window_value() {
        // Net +2 over |+1| + |-1| + |+2| = 4
        let closes = [10.0, 11.0, 10.0, 12.0];
        let er = rolling_efficiency_ratio(&closes, 3);
        assert_eq!(er, vec![None, None, None, Some(0.5)]);
    }

    #[test]
    fn test_flat_window_is_undefined() {
        let closes = [5.0; 10];
        assert!(rolling_efficiency_ratio(&closes, 3).iter().all(Option::is_none));
        assert_eq!(mean_efficiency_ratio(&closes, 3), None);
    }

    #[test]
    fn test_history_shorter_than_length_is_undefined() {
        let closes = [1.0, 2.0, 3.0];
        assert_eq!(mean_efficiency_ratio(&closes, 3), None);
        assert_eq!(mean_efficiency_ratio(&closes, 2), Some(1.0));
    }

    #[test]
    fn test_mean_is_rounded_to_five_places() {
        let closes = [1.0, 2.0, 1.5, 2.25, 2.0, 3.125, 2.9];
        let mean = mean_efficiency_ratio(&closes, 2).unwrap();
        assert_eq!(mean, round_to(mean, 5));
        assert!((0.0..=1.0).contains(&mean));
    }
}
