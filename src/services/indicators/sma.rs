//! Simple Moving Average (SMA) indicator.

use super::{check_period, Indicator};
use crate::error::Result;
use crate::types::{Bar, IndicatorKind, IndicatorPoint};

/// Arithmetic mean of `close` over each trailing `period`-bar slice.
///
/// One point per bar from index `period - 1` onwards, so a window of `L`
/// bars yields `L - period + 1` points. Shorter windows yield nothing.
pub fn compute_moving_average(bars: &[Bar], period: usize) -> Result<Vec<IndicatorPoint>> {
    check_period(period)?;

    if bars.len() < period {
        return Ok(Vec::new());
    }

    Ok(bars
        .windows(period)
        .map(|slice| IndicatorPoint {
            time: slice[period - 1].time,
            value: slice.iter().map(|b| b.close).sum::<f64>() / period as f64,
        })
        .collect())
}

/// SMA (Simple Moving Average) indicator.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self> {
        check_period(period)?;
        Ok(Self { period })
    }
}

impl Indicator for Sma {
    fn kind(&self) -> IndicatorKind {
        IndicatorKind::Sma
    }

    fn period(&self) -> usize {
        self.period
    }

    fn min_periods(&self) -> usize {
        self.period
    }

    fn series(&self, bars: &[Bar]) -> Vec<IndicatorPoint> {
        compute_moving_average(bars, self.period).unwrap_or_default()
    }
}
