use proptest::prelude::*;
use strategy::indicators::{rsi, sma};

proptest! {
    /// RSI is a percentage: whenever there is enough data to compute it,
    /// the result must stay in [0, 100] regardless of how extreme the
    /// underlying price series is.
    #[test]
    fn rsi_stays_within_bounds(
        prices in prop::collection::vec(0.0001f64..1_000_000.0f64, 16..64),
        period in 2usize..14,
    ) {
        if let Some(value) = rsi(&prices, period) {
            prop_assert!((0.0..=100.0).contains(&value), "RSI out of range: {value}");
        }
    }

    /// SMA of a window can never fall outside the min/max of that window.
    #[test]
    fn sma_is_bounded_by_the_window(
        prices in prop::collection::vec(-1_000.0f64..1_000.0f64, 8..64),
        period in 1usize..8,
    ) {
        if let Some(value) = sma(&prices, period) {
            let window = &prices[prices.len() - period..];
            let min = window.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(value >= min - 1e-9 && value <= max + 1e-9);
        }
    }
}
