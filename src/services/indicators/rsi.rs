//! Relative Strength Index (RSI) indicator.

use super::{check_period, Indicator};
use crate::error::Result;
use crate::types::{Bar, IndicatorKind, IndicatorPoint};

/// Convert smoothed averages into an oscillator value. A zero average loss
/// saturates at 100.
fn oscillator_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Split a close-to-close change into (gain, loss), losses as positive
/// magnitudes.
fn split_change(change: f64) -> (f64, f64) {
    if change > 0.0 {
        (change, 0.0)
    } else {
        (0.0, -change)
    }
}

/// Wilder-smoothed relative strength index.
///
/// The first point sits at index `period`, seeded from the mean gain and
/// loss of the first `period` deltas. Every later point folds in the delta
/// ending at that bar with `avg = (avg * (period - 1) + current) / period`.
/// Windows of `period` bars or fewer yield nothing.
pub fn compute_oscillator(bars: &[Bar], period: usize) -> Result<Vec<IndicatorPoint>> {
    check_period(period)?;

    if bars.len() <= period {
        return Ok(Vec::new());
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let (gain, loss) = split_change(bars[i].close - bars[i - 1].close);
        gains += gain;
        losses += loss;
    }

    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    let mut points = Vec::with_capacity(bars.len() - period);
    points.push(IndicatorPoint {
        time: bars[period].time,
        value: oscillator_value(avg_gain, avg_loss),
    });

    for i in (period + 1)..bars.len() {
        let (gain, loss) = split_change(bars[i].close - bars[i - 1].close);
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;

        points.push(IndicatorPoint {
            time: bars[i].time,
            value: oscillator_value(avg_gain, avg_loss),
        });
    }

    Ok(points)
}

/// RSI (Relative Strength Index) indicator.
///
/// Measures momentum by comparing the magnitude of recent gains to recent losses.
/// Values range from 0-100:
/// - Below 30: Oversold
/// - Above 70: Overbought
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self> {
        check_period(period)?;
        Ok(Self { period })
    }
}

impl Indicator for Rsi {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Rsi
    }

    fn period(&self) -> usize {
        self.period
    }

    fn min_periods(&self) -> usize {
        self.period + 1
    }

    fn series(&self, bars: &[Bar]) -> Vec<IndicatorPoint> {
        compute_oscillator(bars, self.period).unwrap_or_default()
    }
}
