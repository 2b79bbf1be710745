//! Candlestick pattern detection.
//!
//! Every candle from the third onwards is checked against ten rule sets
//! (single, double and triple candle). Two-candle rules and the hammer need
//! a three-bar trend ending at the previous candle; three-candle rules need
//! one ending at the first candle of the formation. Detection is stateless
//! and always runs over the whole window: evaluation at an index depends on
//! the bars before it, so eviction at the front can change the result near
//! the window start.

pub mod context;
pub mod rules;

use crate::types::{Bar, PatternEvent, PatternName};
use context::{is_downtrend, is_uptrend, BodyScale};

/// Bars needed before any pattern can be reported.
pub const MIN_CONTEXT: usize = 3;

/// Detect all patterns in a window, in ascending time order.
pub fn detect(bars: &[Bar]) -> Vec<PatternEvent> {
    if bars.len() < MIN_CONTEXT {
        return Vec::new();
    }

    (2..bars.len()).flat_map(|i| detect_at(bars, i)).collect()
}

/// Detect the patterns completed by the candle at `index`. Several patterns
/// may complete on the same candle.
pub fn detect_at(bars: &[Bar], index: usize) -> Vec<PatternEvent> {
    let mut found = Vec::new();
    if index < 2 || index >= bars.len() {
        return found;
    }

    let c1 = &bars[index - 2];
    let c2 = &bars[index - 1];
    let c3 = &bars[index];
    let mut emit = |name: PatternName| found.push(PatternEvent::new(c3.time, name));

    if rules::is_doji(c3) {
        emit(PatternName::Doji);
    }

    if index >= 3 {
        let lead = &bars[index - 3..index];
        let down = is_downtrend(lead);
        let up = is_uptrend(lead);

        if down && rules::is_hammer(c3) {
            emit(PatternName::Hammer);
        }
        if down && rules::is_bullish_engulfing(c2, c3) {
            emit(PatternName::BullishEngulfing);
        }
        if up && rules::is_bearish_engulfing(c2, c3) {
            emit(PatternName::BearishEngulfing);
        }
        if down && rules::is_piercing_line(c2, c3) {
            emit(PatternName::PiercingLine);
        }
        if up && rules::is_dark_cloud_cover(c2, c3) {
            emit(PatternName::DarkCloudCover);
        }
    }

    if index >= 4 {
        let lead = &bars[index - 4..index - 1];
        let down = is_downtrend(lead);
        let up = is_uptrend(lead);
        let scale = BodyScale::at(bars, index);

        if down && rules::is_morning_star(c1, c2, c3, &scale) {
            emit(PatternName::MorningStar);
        }
        if up && rules::is_evening_star(c1, c2, c3, &scale) {
            emit(PatternName::EveningStar);
        }
        if down && rules::is_three_white_soldiers(c1, c2, c3, &scale) {
            emit(PatternName::ThreeWhiteSoldiers);
        }
        if up && rules::is_three_black_crows(c1, c2, c3, &scale) {
            emit(PatternName::ThreeBlackCrows);
        }
    }

    found
}

/// Patterns completed by the newest candle of the window.
pub fn detect_latest(bars: &[Bar]) -> Vec<PatternEvent> {
    match bars.len() {
        0 => Vec::new(),
        n => detect_at(bars, n - 1),
    }
}
