mod macd;
mod rsi;

pub use macd::macd;
pub use rsi::rsi;

/// Simple moving average over the last `period` values. `None` if there
/// aren't enough samples.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average seeded with the first value in `values`, then
/// smoothed over the rest — matches the recursive single-pass definition
/// rather than a rolling-window one, so `values` should be the full series.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut acc = values[0];
    for &v in &values[1..] {
        acc = v * k + acc * (1.0 - k);
    }
    Some(acc)
}

/// Population standard deviation over the last `period` values.
pub fn stddev(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / period as f64;
    Some(variance.sqrt())
}

/// Bollinger Bands: `(middle, upper, lower)`.
pub fn bollinger(values: &[f64], period: usize, mult: f64) -> Option<(f64, f64, f64)> {
    let middle = sma(values, period)?;
    let sd = stddev(values, period)?;
    Some((middle, middle + mult * sd, middle - mult * sd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_averages_the_trailing_window() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&values, 3), Some(4.0));
    }

    #[test]
    fn sma_none_when_insufficient_data() {
        assert_eq!(sma(&[1.0, 2.0], 3), None);
    }

    #[test]
    fn ema_seeds_from_the_first_value() {
        let values = vec![10.0, 10.0, 10.0];
        assert_eq!(ema(&values, 2), Some(10.0));
    }

    #[test]
    fn stddev_zero_for_constant_series() {
        let values = vec![5.0; 10];
        let sd = stddev(&values, 5).unwrap();
        assert!(sd.abs() < 1e-9);
    }

    #[test]
    fn bollinger_bands_straddle_the_middle() {
        let values: Vec<f64> = (0..20).map(|i| 100.0 + (i % 5) as f64).collect();
        let (mid, upper, lower) = bollinger(&values, 10, 2.0).unwrap();
        assert!(upper >= mid);
        assert!(lower <= mid);
    }
}
