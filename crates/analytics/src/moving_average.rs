//! Rolling moving averages over bar closes.
//!
//! Produces the overlay series a candlestick renderer draws on top of the
//! bars (e.g. 3- and 6-bucket averages).

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;
use tape_core::{Bar, Price};

/// Rolling simple moving average.
pub struct MovingAverage {
    /// Window size in observations.
    window: usize,
    /// Values currently in the window.
    values: VecDeque<Price>,
    /// Running sum of the window; `None` while it is out of range.
    sum: Option<Decimal>,
}

impl MovingAverage {
    /// Create a moving average over `window` observations (must be > 0).
    pub fn new(window: usize) -> Self {
        Self {
            window,
            values: VecDeque::with_capacity(window),
            sum: Some(Decimal::ZERO),
        }
    }

    /// Add an observation.
    ///
    /// Returns the average once the window is full.
    pub fn push(&mut self, value: Price) -> Option<Price> {
        let mut sum = self.sum;
        if self.values.len() >= self.window {
            if let Some(old) = self.values.pop_front() {
                sum = sum.and_then(|s| s.checked_sub(old));
            }
        }
        self.values.push_back(value);
        self.sum = sum
            .and_then(|s| s.checked_add(value))
            .or_else(|| self.window_sum());
        self.value()
    }

    /// Current average, `None` until `window` observations have been seen
    /// or while their sum exceeds the decimal range.
    pub fn value(&self) -> Option<Price> {
        if self.window == 0 || self.values.len() < self.window {
            return None;
        }
        self.sum?.checked_div(Decimal::from(self.window as u64))
    }

    fn window_sum(&self) -> Option<Decimal> {
        self.values
            .iter()
            .try_fold(Decimal::ZERO, |acc, &v| acc.checked_add(v))
    }

    /// Window size.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.values.clear();
        self.sum = Some(Decimal::ZERO);
    }
}

/// One moving-average line aligned with a bar sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overlay {
    /// Window in buckets.
    pub window: usize,
    /// One entry per bar; `None` until the window is filled.
    pub values: Vec<Option<Price>>,
}

/// Moving averages of bar closes, one overlay per window.
pub fn overlays(bars: &[Bar], windows: &[usize]) -> Vec<Overlay> {
    windows
        .iter()
        .map(|&window| {
            let mut ma = MovingAverage::new(window);
            Overlay {
                window,
                values: bars.iter().map(|bar| ma.push(bar.close)).collect(),
            }
        })
        .collect()
}
