//! Candle-shape predicates for each pattern. Trend preconditions are applied
//! by the detector, not here.

use super::context::BodyScale;
use crate::types::Bar;

// Single candle

pub fn is_doji(c: &Bar) -> bool {
    let range = c.range();
    range > 0.0 && c.body() / range < 0.1
}

pub fn is_hammer(c: &Bar) -> bool {
    let body = c.body();
    body > 0.0 && c.lower_wick() > body * 2.0 && c.upper_wick() < body * 0.5
}

// Two candles: `prev` then `cur`

pub fn is_bullish_engulfing(prev: &Bar, cur: &Bar) -> bool {
    prev.is_bearish() && cur.is_bullish() && cur.open < prev.close && cur.close > prev.open
}

pub fn is_bearish_engulfing(prev: &Bar, cur: &Bar) -> bool {
    prev.is_bullish() && cur.is_bearish() && cur.open > prev.close && cur.close < prev.open
}

pub fn is_piercing_line(prev: &Bar, cur: &Bar) -> bool {
    let midpoint = prev.open - prev.body() / 2.0;
    prev.is_bearish()
        && cur.is_bullish()
        && cur.open < prev.low
        && cur.close > midpoint
        && cur.close < prev.open
}

pub fn is_dark_cloud_cover(prev: &Bar, cur: &Bar) -> bool {
    let midpoint = prev.open + prev.body() / 2.0;
    prev.is_bullish()
        && cur.is_bearish()
        && cur.open > prev.high
        && cur.close < midpoint
        && cur.close > prev.open
}

// Three candles: `c1`, `c2`, `c3` oldest first

pub fn is_morning_star(c1: &Bar, c2: &Bar, c3: &Bar, scale: &BodyScale) -> bool {
    let midpoint = c1.open - c1.body() / 2.0;
    c1.is_bearish()
        && scale.is_long(c1)
        && scale.is_short(c2)
        && c2.close < c1.close
        && c3.is_bullish()
        && c3.open > c2.close
        && c3.close > midpoint
}

pub fn is_evening_star(c1: &Bar, c2: &Bar, c3: &Bar, scale: &BodyScale) -> bool {
    let midpoint = c1.open + c1.body() / 2.0;
    c1.is_bullish()
        && scale.is_long(c1)
        && scale.is_short(c2)
        && c2.close > c1.close
        && c3.is_bearish()
        && c3.open < c2.close
        && c3.close < midpoint
}

fn is_soldier(c: &Bar, scale: &BodyScale) -> bool {
    c.is_bullish() && scale.is_long(c) && c.upper_wick() < c.body() * 0.3
}

fn is_crow(c: &Bar, scale: &BodyScale) -> bool {
    c.is_bearish() && scale.is_long(c) && c.lower_wick() < c.body() * 0.3
}

pub fn is_three_white_soldiers(c1: &Bar, c2: &Bar, c3: &Bar, scale: &BodyScale) -> bool {
    is_soldier(c1, scale)
        && is_soldier(c2, scale)
        && is_soldier(c3, scale)
        && c2.open > c1.open
        && c2.close > c1.close
        && c3.open > c2.open
        && c3.close > c2.close
}

pub fn is_three_black_crows(c1: &Bar, c2: &Bar, c3: &Bar, scale: &BodyScale) -> bool {
    is_crow(c1, scale)
        && is_crow(c2, scale)
        && is_crow(c3, scale)
        && c2.open < c1.open
        && c2.close < c1.close
        && c3.open < c2.open
        && c3.close < c2.close
}
