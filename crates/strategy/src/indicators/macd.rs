use super::ema;

/// MACD line, signal line, and histogram: `(macd, signal, histogram)`.
///
/// Recomputes the fast/slow EMA pair from scratch for every prefix
/// `values[..i]`, `i` from `slow` to `values.len()`, then takes the EMA of
/// that difference series as the signal line, rather than maintaining the
/// EMAs incrementally. Callers with long series may want to memoise.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Option<(f64, f64, f64)> {
    if fast == 0 || slow == 0 || signal == 0 || values.len() < slow + signal {
        return None;
    }

    let mut macd_line_series = Vec::with_capacity(values.len() - slow + 1);
    for i in slow..=values.len() {
        let slice = &values[..i];
        let (Some(ema_fast), Some(ema_slow)) = (ema(slice, fast), ema(slice, slow)) else {
            continue;
        };
        macd_line_series.push(ema_fast - ema_slow);
    }

    if macd_line_series.len() < signal {
        return None;
    }

    let signal_line = ema(&macd_line_series, signal)?;
    let macd_line = *macd_line_series.last()?;
    Some((macd_line, signal_line, macd_line - signal_line))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_none_when_insufficient_data() {
        let values = vec![1.0; 10];
        assert!(macd(&values, 12, 26, 9).is_none());
    }

    #[test]
    fn macd_zero_histogram_on_flat_series() {
        let values = vec![100.0; 40];
        let (macd_line, signal_line, hist) = macd(&values, 12, 26, 9).unwrap();
        assert!(macd_line.abs() < 1e-9);
        assert!(signal_line.abs() < 1e-9);
        assert!(hist.abs() < 1e-9);
    }

    #[test]
    fn macd_positive_on_a_sustained_uptrend() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.5).collect();
        let (macd_line, _, _) = macd(&values, 12, 26, 9).unwrap();
        assert!(macd_line > 0.0, "expected positive MACD on an uptrend, got {macd_line}");
    }
}
