/// Relative Strength Index over the last `period` deltas.
///
/// This is the plain sum-of-gains/sum-of-losses form, not Wilder's smoothed
/// average: each call recomputes from scratch over `values[-period..]`
/// deltas rather than carrying a running average forward. `None` until at
/// least `period + 1` values are available.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    let tail = &values[values.len() - period - 1..];
    for window in tail.windows(2) {
        let delta = window[1] - window[0];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }

    if losses == 0.0 {
        return Some(100.0);
    }
    let rs = gains / losses;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_returns_none_when_insufficient_data() {
        let prices = vec![100.0; 14];
        assert!(rsi(&prices, 14).is_none());
    }

    #[test]
    fn rsi_returns_some_with_sufficient_data() {
        let prices: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        assert!(rsi(&prices, 14).is_some());
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let prices = vec![10.0, 11.0, 12.0, 13.0];
        let value = rsi(&prices, 3).unwrap();
        assert!((value - 100.0).abs() < 1e-6, "expected ~100, got {value}");
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let prices = vec![13.0, 12.0, 11.0, 10.0];
        let value = rsi(&prices, 3).unwrap();
        assert!((value - 0.0).abs() < 1e-6, "expected ~0, got {value}");
    }

    #[test]
    fn rsi_only_looks_at_the_last_period_deltas() {
        // A big earlier loss should not affect an RSI window that no longer
        // spans it.
        let prices = vec![100.0, 50.0, 51.0, 52.0, 53.0];
        let value = rsi(&prices, 3).unwrap();
        assert!((value - 100.0).abs() < 1e-6, "expected ~100, got {value}");
    }
}
