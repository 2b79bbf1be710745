//! Simulated price feed.
//!
//! Produces a random-walk bar stream for local runs. Each time the session
//! moves to a new identity the walk restarts from the base price and a block
//! of backfill bars is sent ahead of the live ticks. Everything sent is
//! tagged with the identity it was generated for.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};

use crate::services::runner::{SessionAction, SessionHandle};
use crate::types::Bar;

/// Starting price of every walk.
pub const INITIAL_PRICE: f64 = 1.0855;
/// Maximum close-to-close move is twice this value.
pub const VOLATILITY: f64 = 0.00015;

/// Random-walk bar generator.
pub struct TickSimulator {
    rng: StdRng,
    interval: Duration,
    last: Option<Bar>,
}

impl TickSimulator {
    pub fn new(interval: Duration) -> Self {
        Self::with_rng(interval, StdRng::from_entropy())
    }

    /// Deterministic simulator for tests.
    pub fn seeded(interval: Duration, seed: u64) -> Self {
        Self::with_rng(interval, StdRng::seed_from_u64(seed))
    }

    fn with_rng(interval: Duration, rng: StdRng) -> Self {
        Self {
            rng,
            interval,
            last: None,
        }
    }

    /// Bar spacing in whole seconds, never below one.
    pub fn spacing_secs(&self) -> i64 {
        (self.interval.as_secs() as i64).max(1)
    }

    /// Restart the walk at [`INITIAL_PRICE`] and generate `count` bars ending
    /// near `now`. Timestamps always continue past anything emitted before.
    pub fn backfill(&mut self, count: usize, now: i64) -> Vec<Bar> {
        let spacing = self.spacing_secs();
        let mut time = now - count as i64 * spacing;
        if let Some(last) = self.last {
            time = time.max(last.time + spacing);
        }

        let mut close = INITIAL_PRICE;
        let mut bars = Vec::with_capacity(count);
        for _ in 0..count {
            let bar = self.step(time, close);
            close = bar.close;
            time += spacing;
            bars.push(bar);
        }

        if let Some(bar) = bars.last() {
            self.last = Some(*bar);
        }
        bars
    }

    /// Next bar of the walk, opening at the previous close.
    pub fn next_bar(&mut self, now: i64) -> Bar {
        let (time, open) = match self.last {
            Some(last) => (last.time + self.spacing_secs(), last.close),
            None => (now, INITIAL_PRICE),
        };
        let bar = self.step(time, open);
        self.last = Some(bar);
        bar
    }

    fn step(&mut self, time: i64, open: f64) -> Bar {
        let change = (self.rng.gen::<f64>() - 0.5) * VOLATILITY * 2.0;
        let close = open + change;
        let high = open.max(close) + self.rng.gen::<f64>() * VOLATILITY;
        let low = open.min(close) - self.rng.gen::<f64>() * VOLATILITY;
        Bar::new(time, open, high, low, close)
    }

    /// Feed the session until its runner stops.
    pub async fn run(mut self, handle: SessionHandle) {
        let mut ticker = interval(self.interval);
        let mut current = None;

        info!("Tick simulator started ({:?} per bar)", self.interval);

        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();

            let id = handle.session_id();
            if current.as_ref() != Some(&id) {
                let count = handle.view().settings.history_length;
                debug!(
                    "Backfilling {} bars for {} generation {}",
                    count, id.pair, id.generation
                );
                let bars = self.backfill(count, now);
                if let Err(e) = handle.apply(SessionAction::Backfill(id.clone(), bars)).await {
                    info!("Tick simulator stopped: {}", e);
                    return;
                }
                current = Some(id);
                continue;
            }

            let bar = self.next_bar(now);
            if handle.send_bar(id, bar).await.is_err() {
                info!("Tick simulator stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backfill_shape() {
        let mut sim = TickSimulator::seeded(Duration::from_millis(2000), 7);
        let bars = sim.backfill(50, 10_000);

        assert_eq!(bars.len(), 50);
        assert_eq!(bars[0].open, INITIAL_PRICE);
        assert_eq!(bars[0].time, 10_000 - 100);
        for pair in bars.windows(2) {
            assert_eq!(pair[1].time - pair[0].time, 2);
            assert_eq!(pair[1].open, pair[0].close);
        }
        assert!(bars.iter().all(Bar::is_consistent));
    }

    #[test]
    fn test_walk_continues_from_last_close() {
        let mut sim = TickSimulator::seeded(Duration::from_secs(2), 1);
        let seed = sim.backfill(3, 100);
        let next = sim.next_bar(0);
        assert_eq!(next.open, seed[2].close);
        assert_eq!(next.time, seed[2].time + 2);
        assert!((next.close - next.open).abs() <= VOLATILITY);
    }

    #[test]
    fn test_backfill_never_goes_back_in_time() {
        let mut sim = TickSimulator::seeded(Duration::from_secs(2), 3);
        let first = sim.backfill(10, 1_000);
        let again = sim.backfill(10, 1_000);
        assert!(again[0].time > first[9].time);
        assert_eq!(again[0].open, INITIAL_PRICE);
    }

    #[test]
    fn test_sub_second_interval_spacing() {
        let sim = TickSimulator::seeded(Duration::from_millis(250), 0);
        assert_eq!(sim.spacing_secs(), 1);
    }

    #[test]
    fn test_first_bar_without_history() {
        let mut sim = TickSimulator::seeded(Duration::from_secs(2), 5);
        let bar = sim.next_bar(42);
        assert_eq!(bar.time, 42);
        assert_eq!(bar.open, INITIAL_PRICE);
        assert!(bar.is_consistent());
    }
}
