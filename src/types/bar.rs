use serde::{Deserialize, Serialize};

/// OHLC (Open, High, Low, Close) price bar.
///
/// `time` is a Unix timestamp in seconds and must strictly increase across a
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }

    /// Close above open.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Close below open.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Absolute size of the candle body.
    pub fn body(&self) -> f64 {
        (self.open - self.close).abs()
    }

    /// Distance from the top of the body to the high.
    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    /// Distance from the bottom of the body to the low.
    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Total high-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Check the OHLC invariant: all values finite, `low <= min(open, close)`
    /// and `high >= max(open, close)`.
    pub fn is_consistent(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite());
        finite && self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }
}

/// A single value of a derived indicator series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub time: i64,
    pub value: f64,
}
