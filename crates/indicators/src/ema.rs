//! Exponential Moving Average
//!
//! Recursive: `ema = alpha * close + (1 - alpha) * prev` with
//! `alpha = 2 / (period + 1)`, seeded with the SMA of the first `period`
//! closes. Warm: after `period` updates.

use rust_decimal::prelude::ToPrimitive;

use hermes_core::Bar;
use hermes_ports::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
    alpha: f64,
    count: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl Ema {
    /// Panics if `period` is zero
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
            alpha: 2.0 / (period as f64 + 1.0),
            count: 0,
            seed_sum: 0.0,
            value: None,
        }
    }

    /// Current value; `None` until warm
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, bar: &Bar) {
        let close = bar.close.to_f64().unwrap_or(f64::NAN);
        self.count += 1;
        match self.value {
            Some(prev) => {
                self.value = Some(self.alpha * close + (1.0 - self.alpha) * prev);
            }
            None => {
                self.seed_sum += close;
                if self.count >= self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
    }

    fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    fn reset(&mut self) {
        self.count = 0;
        self.seed_sum = 0.0;
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn bar(close: rust_decimal::Decimal) -> Bar {
        Bar::new(close, close, close, close, dec!(1), Utc::now())
    }

    #[test]
    fn test_seeded_with_sma_then_recursive() {
        // period 3: alpha = 0.5, seed = mean(10, 11, 12) = 11
        // next: 0.5*13 + 0.5*11 = 12, then 0.5*14 + 0.5*12 = 13
        let mut ema = Ema::new(3);
        ema.update(&bar(dec!(10)));
        ema.update(&bar(dec!(11)));
        assert!(!ema.is_initialized());

        ema.update(&bar(dec!(12)));
        assert_eq!(ema.value(), Some(11.0));

        ema.update(&bar(dec!(13)));
        assert_eq!(ema.value(), Some(12.0));
        ema.update(&bar(dec!(14)));
        assert_eq!(ema.value(), Some(13.0));
    }

    #[test]
    fn test_period_one_tracks_close() {
        let mut ema = Ema::new(1);
        ema.update(&bar(dec!(100)));
        assert_eq!(ema.value(), Some(100.0));
        ema.update(&bar(dec!(250)));
        assert_eq!(ema.value(), Some(250.0));
    }

    #[test]
    fn test_reset_discards_state() {
        let mut ema = Ema::new(2);
        ema.update(&bar(dec!(10)));
        ema.update(&bar(dec!(20)));
        assert!(ema.is_initialized());

        ema.reset();
        assert!(!ema.is_initialized());
        assert_eq!(ema.value(), None);
    }
}
