use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Directional class of a candlestick pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternClass {
    Bullish,
    Bearish,
    Neutral,
}

/// Closed set of recognised candlestick formations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatternName {
    #[serde(rename = "Bullish Engulfing")]
    BullishEngulfing,
    #[serde(rename = "Bearish Engulfing")]
    BearishEngulfing,
    #[serde(rename = "Doji")]
    Doji,
    #[serde(rename = "Hammer")]
    Hammer,
    #[serde(rename = "Morning Star")]
    MorningStar,
    #[serde(rename = "Evening Star")]
    EveningStar,
    #[serde(rename = "Piercing Line")]
    PiercingLine,
    #[serde(rename = "Dark Cloud Cover")]
    DarkCloudCover,
    #[serde(rename = "Three White Soldiers")]
    ThreeWhiteSoldiers,
    #[serde(rename = "Three Black Crows")]
    ThreeBlackCrows,
}

/// Every pattern the detector can emit, in catalogue order.
pub const ALL_PATTERNS: [PatternName; 10] = [
    PatternName::BullishEngulfing,
    PatternName::BearishEngulfing,
    PatternName::Doji,
    PatternName::Hammer,
    PatternName::MorningStar,
    PatternName::EveningStar,
    PatternName::PiercingLine,
    PatternName::DarkCloudCover,
    PatternName::ThreeWhiteSoldiers,
    PatternName::ThreeBlackCrows,
];

impl PatternName {
    /// The class a pattern of this name is always reported with.
    pub fn class(&self) -> PatternClass {
        match self {
            Self::BullishEngulfing
            | Self::Hammer
            | Self::MorningStar
            | Self::PiercingLine
            | Self::ThreeWhiteSoldiers => PatternClass::Bullish,
            Self::BearishEngulfing
            | Self::EveningStar
            | Self::DarkCloudCover
            | Self::ThreeBlackCrows => PatternClass::Bearish,
            Self::Doji => PatternClass::Neutral,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BullishEngulfing => "Bullish Engulfing",
            Self::BearishEngulfing => "Bearish Engulfing",
            Self::Doji => "Doji",
            Self::Hammer => "Hammer",
            Self::MorningStar => "Morning Star",
            Self::EveningStar => "Evening Star",
            Self::PiercingLine => "Piercing Line",
            Self::DarkCloudCover => "Dark Cloud Cover",
            Self::ThreeWhiteSoldiers => "Three White Soldiers",
            Self::ThreeBlackCrows => "Three Black Crows",
        }
    }

    /// Number of candles the formation spans.
    pub fn candles(&self) -> usize {
        match self {
            Self::Doji | Self::Hammer => 1,
            Self::BullishEngulfing
            | Self::BearishEngulfing
            | Self::PiercingLine
            | Self::DarkCloudCover => 2,
            Self::MorningStar
            | Self::EveningStar
            | Self::ThreeWhiteSoldiers
            | Self::ThreeBlackCrows => 3,
        }
    }
}

impl fmt::Display for PatternName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A detected candlestick formation, stamped with the time of the candle
/// that completed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternEvent {
    pub time: i64,
    pub name: PatternName,
    #[serde(rename = "type")]
    pub class: PatternClass,
}

impl PatternEvent {
    pub fn new(time: i64, name: PatternName) -> Self {
        Self {
            time,
            name,
            class: name.class(),
        }
    }
}

/// Per-class visibility toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternFilter {
    pub bullish: bool,
    pub bearish: bool,
    pub neutral: bool,
}

impl Default for PatternFilter {
    fn default() -> Self {
        Self {
            bullish: true,
            bearish: true,
            neutral: true,
        }
    }
}

impl PatternFilter {
    pub fn allows(&self, class: PatternClass) -> bool {
        match class {
            PatternClass::Bullish => self.bullish,
            PatternClass::Bearish => self.bearish,
            PatternClass::Neutral => self.neutral,
        }
    }
}

/// Per-pattern enable map. Patterns missing from the map count as disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternConfig(pub BTreeMap<PatternName, bool>);

impl Default for PatternConfig {
    fn default() -> Self {
        Self(ALL_PATTERNS.iter().map(|name| (*name, true)).collect())
    }
}

impl PatternConfig {
    pub fn is_enabled(&self, name: PatternName) -> bool {
        self.0.get(&name).copied().unwrap_or(false)
    }

    pub fn set(&mut self, name: PatternName, enabled: bool) {
        self.0.insert(name, enabled);
    }
}

/// Catalogue entry describing a pattern for configuration screens.
#[derive(Debug, Clone, Serialize)]
pub struct PatternInfo {
    pub name: PatternName,
    #[serde(rename = "type")]
    pub class: PatternClass,
    pub candles: usize,
}

impl From<PatternName> for PatternInfo {
    fn from(name: PatternName) -> Self {
        Self {
            name,
            class: name.class(),
            candles: name.candles(),
        }
    }
}
