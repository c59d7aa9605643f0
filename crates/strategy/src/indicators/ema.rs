/// Exponential Moving Average series over `prices` (oldest first).
///
/// The first value is seeded with the SMA of the first `min(period, len)`
/// prices and every later value follows `price * k + prev * (1 - k)` with
/// `k = 2 / (period + 1)`. The output has one value per input price.
/// Returns an empty `Vec` when `prices` is empty or `period == 0`.
pub fn ema(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() || period == 0 {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed_len = period.min(prices.len());
    let seed = prices[..seed_len].iter().sum::<f64>() / seed_len as f64;

    let mut result = Vec::with_capacity(prices.len());
    result.push(seed);

    let mut prev = seed;
    for &price in &prices[1..] {
        prev = price * k + prev * (1.0 - k);
        result.push(prev);
    }
    result
}

/// Last value of [`ema`], or `None` for degenerate input.
pub fn latest_ema(prices: &[f64], period: usize) -> Option<f64> {
    ema(prices, period).last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_empty_input_yields_empty_series() {
        assert!(ema(&[], 12).is_empty());
    }

    #[test]
    fn ema_zero_period_yields_empty_series() {
        assert!(ema(&[1.0, 2.0, 3.0], 0).is_empty());
    }

    #[test]
    fn ema_has_one_value_per_price() {
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
        assert_eq!(ema(&prices, 12).len(), 50);
    }

    #[test]
    fn ema_seed_is_sma_even_at_index_zero() {
        // Seed is the mean of the first 3 prices, placed at index 0.
        let series = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert!((series[0] - 4.0).abs() < 1e-12);
        // k = 0.5 → 4 * 0.5 + 4 * 0.5
        assert!((series[1] - 4.0).abs() < 1e-12);
        assert!((series[2] - 5.0).abs() < 1e-12);
        assert!((series[3] - 6.5).abs() < 1e-12);
    }

    #[test]
    fn ema_period_longer_than_input_seeds_with_full_mean() {
        let series = ema(&[10.0, 20.0], 676);
        assert!((series[0] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn ema_known_values_period_one_tracks_price() {
        // k = 1 → the EMA is the price itself.
        let prices = [3.0, 7.0, 1.0];
        assert_eq!(ema(&prices, 1), prices.to_vec());
    }

    #[test]
    fn latest_ema_returns_last_value() {
        let prices = [2.0, 4.0, 6.0, 8.0];
        assert_eq!(latest_ema(&prices, 3), ema(&prices, 3).last().copied());
        assert_eq!(latest_ema(&[], 3), None);
    }
}
