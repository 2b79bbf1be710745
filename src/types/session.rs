use serde::{Deserialize, Serialize};

use super::{Bar, IndicatorPoint, PatternEvent, PredictedPoint, SignalInfo, TradeHistoryEntry};

/// A tradable instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrencyPair {
    pub name: &'static str,
    pub icon: &'static str,
}

/// Instruments the session can analyse.
pub const CURRENCY_PAIRS: [CurrencyPair; 5] = [
    CurrencyPair { name: "EUR/USD", icon: "🇪🇺/🇺🇸" },
    CurrencyPair { name: "USD/JPY", icon: "🇺🇸/🇯🇵" },
    CurrencyPair { name: "GBP/USD", icon: "🇬🇧/🇺🇸" },
    CurrencyPair { name: "USD/CHF", icon: "🇺🇸/🇨🇭" },
    CurrencyPair { name: "AUD/USD", icon: "🇦🇺/🇺🇸" },
];

impl CurrencyPair {
    /// Look up a pair by label, case-insensitively.
    pub fn find(name: &str) -> Option<Self> {
        CURRENCY_PAIRS
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
            .copied()
    }
}

/// Identity of an analysis session. A response produced for one identity is
/// stale once the session has moved to another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    pub pair: String,
    pub generation: u64,
}

/// Settings forwarded to the prediction collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionSettings {
    pub temperature: f64,
    pub history_length: usize,
}

impl PredictionSettings {
    pub const MIN_HISTORY: usize = 20;
    pub const MAX_HISTORY: usize = 100;
    pub const HISTORY_STEP: usize = 5;

    /// Clamp temperature to `0..=1` and history length to `20..=100`,
    /// snapped to the nearest step of 5.
    pub fn normalized(self) -> Self {
        let temperature = if self.temperature.is_finite() {
            self.temperature.clamp(0.0, 1.0)
        } else {
            0.5
        };
        let clamped = self
            .history_length
            .clamp(Self::MIN_HISTORY, Self::MAX_HISTORY);
        let history_length = ((clamped + Self::HISTORY_STEP / 2) / Self::HISTORY_STEP
            * Self::HISTORY_STEP)
            .min(Self::MAX_HISTORY);

        Self {
            temperature,
            history_length,
        }
    }
}

impl Default for PredictionSettings {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            history_length: 50,
        }
    }
}

/// Indicators the engine can compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma,
    Rsi,
}

impl IndicatorKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sma" | "moving_average" => Some(Self::Sma),
            "rsi" | "oscillator" => Some(Self::Rsi),
            _ => None,
        }
    }
}

/// Line style used when drawing an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dotted,
    Dashed,
    LargeDashed,
    SparseDotted,
}

/// Enable flag, period and display style of one indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSettings {
    pub enabled: bool,
    pub period: usize,
    pub color: String,
    pub line_style: LineStyle,
}

impl IndicatorSettings {
    pub const MIN_PERIOD: usize = 2;

    pub fn sma_default() -> Self {
        Self {
            enabled: false,
            period: 20,
            color: "#f6e05e".to_string(),
            line_style: LineStyle::Solid,
        }
    }

    pub fn rsi_default() -> Self {
        Self {
            enabled: false,
            period: 14,
            color: "#4299e1".to_string(),
            line_style: LineStyle::Solid,
        }
    }
}

/// A computed indicator series together with its display settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub period: usize,
    pub color: String,
    pub line_style: LineStyle,
    pub points: Vec<IndicatorPoint>,
}

/// Latest price and its move from the previous bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTicker {
    pub current: f64,
    pub previous: f64,
    pub change: f64,
    pub change_pct: f64,
}

impl PriceTicker {
    /// Build from the trailing bars of a window. A single bar has no
    /// previous price.
    pub fn from_bars(bars: &[Bar]) -> Option<Self> {
        let current = bars.last()?.close;
        let previous = if bars.len() > 1 {
            bars[bars.len() - 2].close
        } else {
            0.0
        };
        let change = if previous == 0.0 { 0.0 } else { current - previous };
        let change_pct = if previous == 0.0 {
            0.0
        } else {
            change / previous * 100.0
        };

        Some(Self {
            current,
            previous,
            change,
            change_pct,
        })
    }
}

/// Prediction, signal and error state shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionState {
    pub loading: bool,
    pub error: Option<String>,
    pub signal: Option<SignalInfo>,
    pub prediction: Option<PredictedPoint>,
}

/// Everything the presentation layer needs after an update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session: SessionId,
    pub settings: PredictionSettings,
    pub bars: Vec<Bar>,
    pub ticker: Option<PriceTicker>,
    pub indicators: Vec<IndicatorSeries>,
    pub patterns: Vec<PatternEvent>,
    pub alert: Option<PatternEvent>,
    pub history: Vec<TradeHistoryEntry>,
    pub prediction: PredictionState,
}
