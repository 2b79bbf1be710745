//! Indicator engine: moving average and relative strength oscillator.
//!
//! Both indicators are pure functions of the bar window. Neither caches
//! state between calls, so a series is always identical to a full
//! recomputation over the same bars.

pub mod rsi;
pub mod sma;

pub use rsi::{compute_oscillator, Rsi};
pub use sma::{compute_moving_average, Sma};

use crate::error::{AppError, Result};
use crate::types::{Bar, IndicatorKind, IndicatorPoint, IndicatorSeries, IndicatorSettings};

/// Trait implemented by every indicator the engine can compute.
pub trait Indicator: Send + Sync {
    /// Which indicator this is.
    fn kind(&self) -> IndicatorKind;

    /// Lookback period.
    fn period(&self) -> usize;

    /// Minimum number of bars before the first point is produced.
    fn min_periods(&self) -> usize;

    /// Compute the full series for a window. Returns an empty series when
    /// the window is too short.
    fn series(&self, bars: &[Bar]) -> Vec<IndicatorPoint>;
}

/// Reject a zero period before any computation runs.
pub(crate) fn check_period(period: usize) -> Result<()> {
    if period == 0 {
        return Err(AppError::InvalidConfig(
            "indicator period must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Build the indicator described by a kind and period.
pub fn build_indicator(kind: IndicatorKind, period: usize) -> Result<Box<dyn Indicator>> {
    Ok(match kind {
        IndicatorKind::Sma => Box::new(Sma::new(period)?),
        IndicatorKind::Rsi => Box::new(Rsi::new(period)?),
    })
}

/// Compute the series for one indicator's settings, or `None` if it is
/// disabled.
pub fn compute_series(
    kind: IndicatorKind,
    settings: &IndicatorSettings,
    bars: &[Bar],
) -> Result<Option<IndicatorSeries>> {
    if !settings.enabled {
        return Ok(None);
    }

    let indicator = build_indicator(kind, settings.period)?;
    let points = if bars.len() < indicator.min_periods() {
        Vec::new()
    } else {
        indicator.series(bars)
    };

    Ok(Some(IndicatorSeries {
        kind: indicator.kind(),
        period: indicator.period(),
        color: settings.color.clone(),
        line_style: settings.line_style,
        points,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Bar::new(i as i64, *c, c + 0.5, c - 0.5, *c))
            .collect()
    }

    #[test]
    fn test_build_indicator_rejects_zero_period() {
        assert!(build_indicator(IndicatorKind::Sma, 0).is_err());
        assert!(build_indicator(IndicatorKind::Rsi, 0).is_err());
    }

    #[test]
    fn test_build_indicator_kinds() {
        let sma = build_indicator(IndicatorKind::Sma, 5).unwrap();
        assert_eq!(sma.kind(), IndicatorKind::Sma);
        assert_eq!(sma.min_periods(), 5);

        let rsi = build_indicator(IndicatorKind::Rsi, 14).unwrap();
        assert_eq!(rsi.kind(), IndicatorKind::Rsi);
        assert_eq!(rsi.min_periods(), 15);
    }

    #[test]
    fn test_compute_series_disabled() {
        let settings = IndicatorSettings::sma_default();
        let result = compute_series(IndicatorKind::Sma, &settings, &bars(&[1.0; 30])).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_compute_series_carries_style() {
        let mut settings = IndicatorSettings::sma_default();
        settings.enabled = true;
        settings.period = 3;
        let series = compute_series(IndicatorKind::Sma, &settings, &bars(&[1.0, 2.0, 3.0, 4.0]))
            .unwrap()
            .unwrap();
        assert_eq!(series.period, 3);
        assert_eq!(series.color, "#f6e05e");
        assert_eq!(series.points.len(), 2);
    }

    #[test]
    fn test_compute_series_short_window_is_empty() {
        let mut settings = IndicatorSettings::rsi_default();
        settings.enabled = true;
        settings.period = 4;
        // RSI(4) needs five closes before its first point.
        let short = compute_series(IndicatorKind::Rsi, &settings, &bars(&[1.0, 2.0, 3.0, 4.0]))
            .unwrap()
            .unwrap();
        assert_eq!(short.kind, IndicatorKind::Rsi);
        assert_eq!(short.period, 4);
        assert!(short.points.is_empty());

        let enough = compute_series(
            IndicatorKind::Rsi,
            &settings,
            &bars(&[1.0, 2.0, 3.0, 4.0, 5.0]),
        )
        .unwrap()
        .unwrap();
        assert_eq!(enough.points.len(), 1);
    }
}
