//! Bounded, time-ordered window of bars.

use std::collections::VecDeque;

use crate::error::{AppError, Result};
use crate::types::Bar;

/// Append-only sliding window of bars. Once `capacity` is reached every
/// push evicts the oldest bar.
#[derive(Debug, Clone)]
pub struct BarWindow {
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl BarWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a bar, returning the evicted bar if the window was full.
    ///
    /// Rejects bars that break the OHLC invariant or whose time does not
    /// strictly follow the newest bar; a rejected bar leaves the window
    /// untouched.
    pub fn push(&mut self, bar: Bar) -> Result<Option<Bar>> {
        if !bar.is_consistent() {
            return Err(AppError::InvalidBar(format!(
                "inconsistent OHLC at {}: o={} h={} l={} c={}",
                bar.time, bar.open, bar.high, bar.low, bar.close
            )));
        }
        if let Some(last) = self.bars.back() {
            if bar.time <= last.time {
                return Err(AppError::InvalidBar(format!(
                    "time {} does not follow {}",
                    bar.time, last.time
                )));
            }
        }

        self.bars.push_back(bar);

        if self.bars.len() > self.capacity {
            Ok(self.bars.pop_front())
        } else {
            Ok(None)
        }
    }

    /// Contiguous view of the window, oldest first.
    pub fn as_slice(&mut self) -> &[Bar] {
        self.bars.make_contiguous()
    }

    /// Owned copy of the window, oldest first.
    pub fn to_vec(&self) -> Vec<Bar> {
        self.bars.iter().copied().collect()
    }

    /// Owned copy of the newest `n` bars, oldest first.
    pub fn trailing(&self, n: usize) -> Vec<Bar> {
        let skip = self.bars.len().saturating_sub(n);
        self.bars.iter().skip(skip).copied().collect()
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.back()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(time: i64, close: f64) -> Bar {
        Bar::new(time, close, close + 0.001, close - 0.001, close)
    }

    #[test]
    fn test_push_within_capacity() {
        let mut window = BarWindow::new(3);
        assert!(window.push(bar(1, 1.0)).unwrap().is_none());
        assert!(window.push(bar(2, 1.1)).unwrap().is_none());
        assert_eq!(window.len(), 2);
        assert_eq!(window.latest().unwrap().time, 2);
    }

    #[test]
    fn test_push_evicts_oldest() {
        let mut window = BarWindow::new(3);
        for t in 1..=3 {
            window.push(bar(t, 1.0)).unwrap();
        }
        let evicted = window.push(bar(4, 1.0)).unwrap();
        assert_eq!(evicted.map(|b| b.time), Some(1));
        assert_eq!(window.len(), 3);

        let times: Vec<i64> = window.as_slice().iter().map(|b| b.time).collect();
        assert_eq!(times, vec![2, 3, 4]);
    }

    #[test]
    fn test_rejects_non_increasing_time() {
        let mut window = BarWindow::new(5);
        window.push(bar(10, 1.0)).unwrap();
        assert!(matches!(window.push(bar(10, 1.0)), Err(AppError::InvalidBar(_))));
        assert!(matches!(window.push(bar(9, 1.0)), Err(AppError::InvalidBar(_))));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_rejects_inconsistent_bar() {
        let mut window = BarWindow::new(5);
        let bad = Bar::new(1, 1.0, 0.9, 0.8, 1.0);
        assert!(window.push(bad).is_err());
        assert!(window.is_empty());
    }

    #[test]
    fn test_trailing() {
        let mut window = BarWindow::new(10);
        for t in 1..=6 {
            window.push(bar(t, 1.0)).unwrap();
        }
        let tail: Vec<i64> = window.trailing(3).iter().map(|b| b.time).collect();
        assert_eq!(tail, vec![4, 5, 6]);
        assert_eq!(window.trailing(50).len(), 6);
    }

    #[test]
    fn test_zero_capacity_holds_one_bar() {
        let mut window = BarWindow::new(0);
        window.push(bar(1, 1.0)).unwrap();
        window.push(bar(2, 1.0)).unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window.capacity(), 1);
    }
}
