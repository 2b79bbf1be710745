//! Trend and body-size context shared by the pattern rules.

use crate::types::Bar;

/// Number of trailing bars used as the body-size reference.
pub const BODY_LOOKBACK: usize = 10;

/// Highs strictly decreasing across exactly three bars.
pub fn is_downtrend(bars: &[Bar]) -> bool {
    bars.len() == 3 && bars[0].high > bars[1].high && bars[1].high > bars[2].high
}

/// Lows strictly increasing across exactly three bars.
pub fn is_uptrend(bars: &[Bar]) -> bool {
    bars.len() == 3 && bars[0].low < bars[1].low && bars[1].low < bars[2].low
}

/// Reference body size for the bar at `index`: the summed bodies of the
/// trailing [`BODY_LOOKBACK`] bars ending at `index` (inclusive), divided by
/// [`BODY_LOOKBACK`]. Near the start of a window fewer bars contribute but
/// the divisor stays fixed.
pub fn reference_body(bars: &[Bar], index: usize) -> f64 {
    let end = index + 1;
    let start = end.saturating_sub(BODY_LOOKBACK);
    bars[start..end].iter().map(Bar::body).sum::<f64>() / BODY_LOOKBACK as f64
}

/// Body-size classification of candles evaluated at one index.
#[derive(Debug, Clone, Copy)]
pub struct BodyScale {
    reference: f64,
}

impl BodyScale {
    pub fn at(bars: &[Bar], index: usize) -> Self {
        Self {
            reference: reference_body(bars, index),
        }
    }

    pub fn is_long(&self, bar: &Bar) -> bool {
        bar.body() > self.reference
    }

    pub fn is_short(&self, bar: &Bar) -> bool {
        bar.body() < self.reference
    }
}
