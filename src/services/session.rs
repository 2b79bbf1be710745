//! Analysis session: owns the bar window and everything derived from it.
//!
//! A session runs to completion on every bar. The only asynchronous step,
//! the prediction request, is handed back to the caller as a
//! [`PredictionRequest`]; its result is folded in later through
//! [`Session::complete_prediction`], which drops responses addressed to an
//! earlier session identity.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::services::indicators::compute_series;
use crate::services::patterns;
use crate::services::predictor::PredictionRequest;
use crate::services::sampler::{Clock, SignalSampler, TickCounter};
use crate::services::window::BarWindow;
use crate::types::{
    Bar, CurrencyPair, IndicatorKind, IndicatorSeries, IndicatorSettings, PatternConfig,
    PatternEvent, PatternFilter, PredictedPoint, PredictionResult, PredictionSettings,
    PredictionState, PriceTicker, SessionId, SessionView, SignalInfo, TradeHistoryEntry,
};

/// Maximum trade-history entries kept, newest first.
pub const HISTORY_LIMIT: usize = 10;

/// Bar spacing assumed when a request carries a single bar.
const DEFAULT_BAR_INTERVAL_SECS: i64 = 60;

/// Streaming analysis session for one instrument.
pub struct Session {
    pair: CurrencyPair,
    generation: u64,
    window: BarWindow,
    settings: PredictionSettings,
    sma: IndicatorSettings,
    rsi: IndicatorSettings,
    pattern_config: PatternConfig,
    pattern_filter: PatternFilter,
    sampler: SignalSampler,
    clock: Arc<dyn Clock>,
    history: VecDeque<TradeHistoryEntry>,
    patterns: Vec<PatternEvent>,
    indicators: Vec<IndicatorSeries>,
    alert: Option<PatternEvent>,
    prediction: PredictionState,
}

impl Session {
    /// Create a session whose sampler counts ingested ticks.
    pub fn new(pair: CurrencyPair, settings: PredictionSettings, window_capacity: usize) -> Self {
        Self::with_clock(pair, settings, window_capacity, Arc::new(TickCounter::new(0)))
    }

    /// Create a session sampling on the given clock.
    pub fn with_clock(
        pair: CurrencyPair,
        settings: PredictionSettings,
        window_capacity: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pair,
            generation: 0,
            window: BarWindow::new(window_capacity),
            settings: settings.normalized(),
            sma: IndicatorSettings::sma_default(),
            rsi: IndicatorSettings::rsi_default(),
            pattern_config: PatternConfig::default(),
            pattern_filter: PatternFilter::default(),
            sampler: SignalSampler::default(),
            clock,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            patterns: Vec::new(),
            indicators: Vec::new(),
            alert: None,
            prediction: PredictionState::default(),
        }
    }

    /// Current session identity.
    pub fn id(&self) -> SessionId {
        SessionId {
            pair: self.pair.name.to_string(),
            generation: self.generation,
        }
    }

    pub fn pair(&self) -> CurrencyPair {
        self.pair
    }

    pub fn settings(&self) -> PredictionSettings {
        self.settings
    }

    pub fn window(&self) -> &BarWindow {
        &self.window
    }

    pub fn patterns(&self) -> &[PatternEvent] {
        &self.patterns
    }

    pub fn indicators(&self) -> &[IndicatorSeries] {
        &self.indicators
    }

    pub fn alert(&self) -> Option<&PatternEvent> {
        self.alert.as_ref()
    }

    pub fn history(&self) -> impl Iterator<Item = &TradeHistoryEntry> {
        self.history.iter()
    }

    pub fn prediction(&self) -> &PredictionState {
        &self.prediction
    }

    pub fn indicator_settings(&self, kind: IndicatorKind) -> &IndicatorSettings {
        match kind {
            IndicatorKind::Sma => &self.sma,
            IndicatorKind::Rsi => &self.rsi,
        }
    }

    /// Ingest one bar.
    ///
    /// Appends to the window, recomputes patterns and indicators, and asks
    /// the sampler whether to request a prediction. Returns the request to
    /// dispatch, if any. A rejected bar leaves every piece of state as it
    /// was.
    pub fn on_new_bar(&mut self, bar: Bar) -> Result<Option<PredictionRequest>> {
        if let Err(e) = self.window.push(bar) {
            warn!("Rejected bar for {}: {}", self.pair.name, e);
            return Err(e);
        }

        self.refresh_patterns();
        self.refresh_indicators();

        Ok(self.sample())
    }

    /// Ingest a block of historical bars as a single tick: derived state is
    /// recomputed once and the sampler is consulted once. Bars the window
    /// rejects are skipped.
    pub fn backfill(&mut self, bars: impl IntoIterator<Item = Bar>) -> Option<PredictionRequest> {
        let mut accepted = 0usize;
        for bar in bars {
            match self.window.push(bar) {
                Ok(_) => accepted += 1,
                Err(e) => warn!("Skipping backfill bar for {}: {}", self.pair.name, e),
            }
        }
        if accepted == 0 {
            return None;
        }

        debug!("Backfilled {} bars for {}", accepted, self.pair.name);
        self.refresh_patterns();
        self.refresh_indicators();

        self.sample()
    }

    fn sample(&mut self) -> Option<PredictionRequest> {
        if !self.sampler.should_sample(self.clock.now_millis()) {
            return None;
        }

        let request = PredictionRequest {
            session: self.id(),
            pair: self.pair.name.to_string(),
            bars: self.window.trailing(self.settings.history_length),
            settings: self.settings,
        };
        self.prediction.loading = true;
        self.prediction.error = None;

        debug!(
            "Sampled tick for {} ({} bars)",
            self.pair.name,
            request.bars.len()
        );

        Some(request)
    }

    /// Fold a prediction outcome back into the session.
    ///
    /// Returns `false` when the response belongs to an earlier session
    /// identity and was discarded. Failures only set the error state; the
    /// window and ledger stay untouched.
    pub fn complete_prediction(
        &mut self,
        request: &PredictionRequest,
        outcome: Result<PredictionResult>,
    ) -> bool {
        if request.session != self.id() {
            debug!(
                "Discarding stale prediction for {} generation {}",
                request.session.pair, request.session.generation
            );
            return false;
        }

        self.sampler.finish();
        self.prediction.loading = false;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!("Prediction failed for {}: {}", request.pair, e);
                self.prediction.error = Some(format!("Failed to get prediction: {}", e));
                return true;
            }
        };

        let Some(last) = request.bars.last() else {
            warn!("Prediction request for {} carried no bars", request.pair);
            return true;
        };

        let interval = match request.bars.len() {
            n if n >= 2 => last.time - request.bars[n - 2].time,
            _ => DEFAULT_BAR_INTERVAL_SECS,
        };

        self.prediction.prediction = Some(PredictedPoint {
            time: last.time + interval,
            price: result.predicted_price,
        });
        self.prediction.signal = Some(SignalInfo {
            signal: result.signal,
            rationale: result.rationale,
        });
        self.prediction.error = None;

        self.history.push_front(TradeHistoryEntry {
            id: Uuid::new_v4(),
            pair: request.pair.clone(),
            time: chrono::Utc::now(),
            price: last.close,
            signal: result.signal,
        });
        self.history.truncate(HISTORY_LIMIT);

        info!(
            "{} signal for {} at {:.5} (predicted {:.5})",
            result.signal, request.pair, last.close, result.predicted_price
        );

        true
    }

    /// Keep only events whose class passes the type filter and whose name is
    /// enabled.
    pub fn filter_patterns(&self, events: &[PatternEvent]) -> Vec<PatternEvent> {
        events
            .iter()
            .filter(|e| self.pattern_filter.allows(e.class) && self.pattern_config.is_enabled(e.name))
            .copied()
            .collect()
    }

    /// Switch instrument. Selecting the current pair is a no-op.
    pub fn set_pair(&mut self, name: &str) -> Result<()> {
        let pair = CurrencyPair::find(name)
            .ok_or_else(|| AppError::NotFound(format!("Unknown currency pair: {}", name)))?;

        if pair != self.pair {
            self.pair = pair;
            self.reset("pair change");
        }
        Ok(())
    }

    /// Apply prediction settings, clamped to their valid ranges. A change of
    /// history length resets the session.
    pub fn set_prediction_settings(&mut self, settings: PredictionSettings) -> PredictionSettings {
        let settings = settings.normalized();
        let history_changed = settings.history_length != self.settings.history_length;
        self.settings = settings;

        if history_changed {
            self.reset("history length change");
        }
        settings
    }

    /// Apply indicator settings. Periods below two are rejected and leave the
    /// session unchanged.
    pub fn set_indicator(&mut self, kind: IndicatorKind, settings: IndicatorSettings) -> Result<()> {
        if settings.period < IndicatorSettings::MIN_PERIOD {
            warn!("Ignoring {:?} period {}", kind, settings.period);
            return Err(AppError::InvalidConfig(format!(
                "indicator period must be at least {}, got {}",
                IndicatorSettings::MIN_PERIOD,
                settings.period
            )));
        }

        match kind {
            IndicatorKind::Sma => self.sma = settings,
            IndicatorKind::Rsi => self.rsi = settings,
        }
        self.refresh_indicators();
        Ok(())
    }

    pub fn set_pattern_config(&mut self, config: PatternConfig) {
        self.pattern_config = config;
        self.refresh_patterns();
    }

    pub fn set_pattern_filter(&mut self, filter: PatternFilter) {
        self.pattern_filter = filter;
        self.refresh_patterns();
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Snapshot for the presentation layer.
    pub fn view(&self) -> SessionView {
        let bars = self.window.to_vec();
        SessionView {
            session: self.id(),
            settings: self.settings,
            ticker: PriceTicker::from_bars(&bars),
            bars,
            indicators: self.indicators.clone(),
            patterns: self.patterns.clone(),
            alert: self.alert,
            history: self.history.iter().cloned().collect(),
            prediction: self.prediction.clone(),
        }
    }

    /// Start a new session generation: empty window, fresh sampler, no
    /// derived state. The trade-history ledger is kept.
    fn reset(&mut self, reason: &str) {
        self.generation += 1;
        self.window.clear();
        self.sampler.reset();
        self.patterns.clear();
        self.indicators.clear();
        self.alert = None;
        self.prediction = PredictionState::default();

        info!(
            "Session reset ({}): {} generation {}",
            reason, self.pair.name, self.generation
        );
    }

    /// Re-run detection over the whole window, filter, and raise an alert if
    /// the newest bar completed a visible pattern.
    fn refresh_patterns(&mut self) {
        let detected = patterns::detect(self.window.as_slice());
        self.patterns = self.filter_patterns(&detected);

        let newest = self.window.latest().map(|b| b.time);
        let alert = newest.and_then(|t| self.patterns.iter().find(|e| e.time == t).copied());

        if let Some(event) = alert {
            if self.alert != Some(event) {
                info!("Pattern alert: {} ({:?}) at {}", event.name, event.class, event.time);
            }
        }
        self.alert = alert;
    }

    fn refresh_indicators(&mut self) {
        let bars = self.window.as_slice();
        let mut series = Vec::with_capacity(2);

        for (kind, settings) in [(IndicatorKind::Sma, &self.sma), (IndicatorKind::Rsi, &self.rsi)] {
            match compute_series(kind, settings, bars) {
                Ok(Some(s)) => series.push(s),
                Ok(None) => {}
                Err(e) => warn!("Skipping {:?}: {}", kind, e),
            }
        }

        self.indicators = series;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PatternName, TradeSignal, CURRENCY_PAIRS};

    fn session(capacity: usize) -> Session {
        // Clock starts at 1 so only the first tick and multiples of four sample.
        Session::with_clock(
            CURRENCY_PAIRS[0],
            PredictionSettings::default(),
            capacity,
            Arc::new(TickCounter::new(1)),
        )
    }

    fn flat_bar(time: i64, close: f64) -> Bar {
        Bar::new(time, close, close + 0.0002, close - 0.0002, close + 0.00005)
    }

    fn result(signal: TradeSignal) -> PredictionResult {
        PredictionResult {
            predicted_price: 1.09,
            signal,
            rationale: "test".to_string(),
        }
    }

    #[test]
    fn test_first_bar_requests_prediction() {
        let mut s = session(100);
        let request = s.on_new_bar(flat_bar(1, 1.0855)).unwrap();
        let request = request.expect("first bar must be sampled");
        assert_eq!(request.bars.len(), 1);
        assert_eq!(request.pair, "EUR/USD");
        assert!(s.prediction().loading);
    }

    #[test]
    fn test_single_request_in_flight() {
        let mut s = session(100);
        let first = s.on_new_bar(flat_bar(1, 1.0855)).unwrap();
        assert!(first.is_some());
        for t in 2..20 {
            assert!(s.on_new_bar(flat_bar(t, 1.0855)).unwrap().is_none());
        }
        assert_eq!(s.window().len(), 19);
    }

    #[test]
    fn test_successful_prediction_updates_ledger() {
        let mut s = session(100);
        s.on_new_bar(flat_bar(100, 1.0855)).unwrap();
        let request = s.on_new_bar(flat_bar(102, 1.0860)).unwrap();
        assert!(request.is_none());

        let mut s = session(100);
        let request = s.on_new_bar(flat_bar(100, 1.0855)).unwrap().unwrap();
        assert!(s.complete_prediction(&request, Ok(result(TradeSignal::Buy))));

        let entries: Vec<&TradeHistoryEntry> = s.history().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].signal, TradeSignal::Buy);
        assert_eq!(entries[0].price, request.bars[0].close);
        assert_eq!(entries[0].pair, "EUR/USD");

        let state = s.prediction();
        assert!(!state.loading);
        assert_eq!(state.signal.as_ref().map(|x| x.signal), Some(TradeSignal::Buy));
        assert_eq!(state.prediction.map(|p| p.time), Some(160));
    }

    #[test]
    fn test_ledger_capped_newest_first() {
        let mut s = session(100);
        let mut sent = 0;
        let mut t = 0;
        while sent < 15 {
            t += 1;
            if let Some(request) = s.on_new_bar(flat_bar(t, 1.0 + t as f64 * 1e-5)).unwrap() {
                s.complete_prediction(&request, Ok(result(TradeSignal::Sell)));
                sent += 1;
                let front = s.history().next().unwrap();
                assert_eq!(front.price, request.bars.last().unwrap().close);
            }
        }
        assert_eq!(s.history().count(), HISTORY_LIMIT);
    }

    #[test]
    fn test_failed_prediction_sets_error_only() {
        let mut s = session(100);
        let request = s.on_new_bar(flat_bar(1, 1.0855)).unwrap().unwrap();
        let applied =
            s.complete_prediction(&request, Err(AppError::Prediction("timeout".to_string())));
        assert!(applied);
        assert_eq!(s.history().count(), 0);
        assert_eq!(s.window().len(), 1);
        assert!(s.prediction().error.as_deref().unwrap().contains("timeout"));
        assert!(!s.prediction().loading);
    }

    #[test]
    fn test_error_cleared_on_next_request() {
        let mut s = session(100);
        let request = s.on_new_bar(flat_bar(1, 1.0855)).unwrap().unwrap();
        s.complete_prediction(&request, Err(AppError::Prediction("down".to_string())));

        let mut t = 1;
        loop {
            t += 1;
            if s.on_new_bar(flat_bar(t, 1.0855)).unwrap().is_some() {
                break;
            }
        }
        assert!(s.prediction().error.is_none());
        assert!(s.prediction().loading);
    }

    #[test]
    fn test_stale_response_discarded_after_pair_change() {
        let mut s = session(100);
        let request = s.on_new_bar(flat_bar(1, 1.0855)).unwrap().unwrap();
        s.set_pair("USD/JPY").unwrap();

        assert!(!s.complete_prediction(&request, Ok(result(TradeSignal::Buy))));
        assert_eq!(s.history().count(), 0);
        assert!(s.prediction().signal.is_none());
    }

    #[test]
    fn test_pair_change_resets_window_and_sampler() {
        let mut s = session(100);
        s.on_new_bar(flat_bar(1, 1.0855)).unwrap();
        s.on_new_bar(flat_bar(2, 1.0856)).unwrap();
        s.set_pair("gbp/usd").unwrap();

        assert!(s.window().is_empty());
        assert_eq!(s.id().pair, "GBP/USD");
        assert_eq!(s.id().generation, 1);
        // First bar of the new session is sampled although the old request
        // never returned.
        assert!(s.on_new_bar(flat_bar(3, 150.0)).unwrap().is_some());
    }

    #[test]
    fn test_unknown_pair_rejected() {
        let mut s = session(100);
        assert!(matches!(s.set_pair("BTC/USD"), Err(AppError::NotFound(_))));
        assert_eq!(s.id().generation, 0);
    }

    #[test]
    fn test_same_pair_is_noop() {
        let mut s = session(100);
        s.on_new_bar(flat_bar(1, 1.0855)).unwrap();
        s.set_pair("EUR/USD").unwrap();
        assert_eq!(s.window().len(), 1);
        assert_eq!(s.id().generation, 0);
    }

    #[test]
    fn test_history_length_change_resets_and_truncates_requests() {
        let mut s = session(32);
        s.on_new_bar(flat_bar(1, 1.0)).unwrap();

        let applied = s.set_prediction_settings(PredictionSettings {
            temperature: 0.2,
            history_length: 30,
        });
        assert_eq!(applied.history_length, 30);
        assert!(s.window().is_empty());
        assert_eq!(s.id().generation, 1);

        let mut last_request = None;
        for t in 10..50 {
            if let Some(req) = s.on_new_bar(flat_bar(t, 1.0)).unwrap() {
                s.complete_prediction(&req, Ok(result(TradeSignal::Hold)));
                last_request = Some(req);
            }
        }

        assert_eq!(s.window().len(), 32);
        assert_eq!(s.window().to_vec()[0].time, 18);
        let req = last_request.unwrap();
        assert!(req.bars.len() <= 30);
        assert_eq!(req.settings.history_length, 30);
    }

    #[test]
    fn test_temperature_change_keeps_window() {
        let mut s = session(100);
        s.on_new_bar(flat_bar(1, 1.0)).unwrap();
        s.set_prediction_settings(PredictionSettings {
            temperature: 0.9,
            history_length: 50,
        });
        assert_eq!(s.window().len(), 1);
        assert_eq!(s.settings().temperature, 0.9);
    }

    #[test]
    fn test_out_of_range_history_clamped() {
        let mut s = session(100);
        let applied = s.set_prediction_settings(PredictionSettings {
            temperature: 0.5,
            history_length: 500,
        });
        assert_eq!(applied.history_length, 100);
    }

    #[test]
    fn test_invalid_period_rejected() {
        let mut s = session(100);
        let mut settings = IndicatorSettings::sma_default();
        settings.enabled = true;
        settings.period = 1;
        assert!(s.set_indicator(IndicatorKind::Sma, settings).is_err());
        assert!(!s.indicator_settings(IndicatorKind::Sma).enabled);
        assert_eq!(s.indicator_settings(IndicatorKind::Sma).period, 20);
    }

    #[test]
    fn test_enabled_indicators_computed() {
        let mut s = session(100);
        let mut sma = IndicatorSettings::sma_default();
        sma.enabled = true;
        sma.period = 5;
        s.set_indicator(IndicatorKind::Sma, sma).unwrap();

        for t in 1..=10 {
            s.on_new_bar(flat_bar(t, 1.0 + t as f64 * 0.001)).unwrap();
        }
        assert_eq!(s.indicators().len(), 1);
        assert_eq!(s.indicators()[0].kind, IndicatorKind::Sma);
        assert_eq!(s.indicators()[0].points.len(), 6);

        let mut rsi = IndicatorSettings::rsi_default();
        rsi.enabled = true;
        rsi.period = 3;
        s.set_indicator(IndicatorKind::Rsi, rsi).unwrap();
        assert_eq!(s.indicators().len(), 2);
        assert_eq!(s.indicators()[1].points.len(), 7);
    }

    fn engulfing_bars() -> Vec<Bar> {
        vec![
            Bar::new(1, 1.1010, 1.1020, 1.0990, 1.1000),
            Bar::new(2, 1.1000, 1.1005, 1.0975, 1.0980),
            Bar::new(3, 1.0975, 1.0985, 1.0945, 1.0950),
            Bar::new(4, 1.0945, 1.0995, 1.0940, 1.0990),
        ]
    }

    #[test]
    fn test_alert_raised_for_newest_bar() {
        let mut s = session(100);
        for bar in engulfing_bars() {
            s.on_new_bar(bar).unwrap();
        }
        let alert = s.alert().copied().unwrap();
        assert_eq!(alert.name, PatternName::BullishEngulfing);
        assert_eq!(alert.time, s.window().latest().unwrap().time);

        // The next bar completes nothing, so the alert lapses.
        s.on_new_bar(Bar::new(5, 1.0990, 1.1100, 1.0900, 1.1060)).unwrap();
        assert!(s
            .alert()
            .map_or(true, |a| a.time == s.window().latest().unwrap().time));
    }

    #[test]
    fn test_filters_hide_patterns_and_alerts() {
        let mut s = session(100);
        s.set_pattern_filter(PatternFilter {
            bullish: false,
            bearish: true,
            neutral: true,
        });
        for bar in engulfing_bars() {
            s.on_new_bar(bar).unwrap();
        }
        assert!(s.patterns().iter().all(|e| e.name != PatternName::BullishEngulfing));
        assert!(s.alert().is_none());

        s.set_pattern_filter(PatternFilter::default());
        assert!(s.alert().is_some());

        let mut config = PatternConfig::default();
        config.set(PatternName::BullishEngulfing, false);
        s.set_pattern_config(config);
        assert!(s.alert().is_none());
    }

    #[test]
    fn test_dismiss_alert() {
        let mut s = session(100);
        for bar in engulfing_bars() {
            s.on_new_bar(bar).unwrap();
        }
        assert!(s.alert().is_some());
        s.dismiss_alert();
        assert!(s.alert().is_none());
    }

    #[test]
    fn test_rejected_bar_leaves_state() {
        let mut s = session(100);
        s.on_new_bar(flat_bar(5, 1.0)).unwrap();
        let before = s.view();
        assert!(s.on_new_bar(flat_bar(5, 1.0)).is_err());
        assert_eq!(s.view().bars, before.bars);
    }

    #[test]
    fn test_backfill_is_one_tick() {
        let mut s = session(100);
        let bars: Vec<Bar> = (1..=50).map(|t| flat_bar(t, 1.0 + t as f64 * 1e-5)).collect();
        let request = s.backfill(bars).expect("first tick is sampled");
        assert_eq!(request.bars.len(), 50);
        assert_eq!(s.window().len(), 50);

        // Duplicate timestamps are skipped without touching the window.
        assert!(s.backfill(vec![flat_bar(50, 1.0)]).is_none());
        assert_eq!(s.window().len(), 50);
    }

    #[test]
    fn test_view_snapshot() {
        let mut s = session(100);
        s.on_new_bar(flat_bar(1, 1.0)).unwrap();
        s.on_new_bar(flat_bar(2, 1.1)).unwrap();
        let view = s.view();
        assert_eq!(view.bars.len(), 2);
        assert_eq!(view.session, s.id());
        let ticker = view.ticker.unwrap();
        assert_eq!(ticker.current, 1.1 + 0.00005);
        assert!(view.history.is_empty());
    }

    #[test]
    fn test_default_clock_samples_about_a_quarter() {
        // Bars two seconds apart, the simulator's default spacing.
        let mut s = Session::new(CURRENCY_PAIRS[0], PredictionSettings::default(), 100);
        let mut sampled = 0;
        for i in 0..100 {
            if let Some(request) = s.on_new_bar(flat_bar(i * 2, 1.0855)).unwrap() {
                sampled += 1;
                s.complete_prediction(&request, Ok(result(TradeSignal::Hold)));
            }
        }
        assert!((20..=30).contains(&sampled), "sampled {} of 100", sampled);
    }
}
