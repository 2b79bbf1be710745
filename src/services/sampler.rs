//! Rate limiting of prediction requests.
//!
//! The sampler forwards roughly one tick in four to the predictor. The
//! decision is keyed on a monotonically advancing clock rather than on bar
//! timestamps, so sampling density does not depend on bar spacing. It is a
//! best-effort limiter, not a fixed-period scheduler.

use std::sync::atomic::{AtomicI64, Ordering};

/// Default sampling modulus: one tick in four.
pub const DEFAULT_MODULUS: i64 = 4;

/// Monotonically advancing clock consulted once per tick.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Clock that advances by one on every read. Sessions sample on this by
/// default, so exactly one tick in four is eligible however the bars are
/// spaced.
#[derive(Debug, Default)]
pub struct TickCounter {
    next: AtomicI64,
}

impl TickCounter {
    pub fn new(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl Clock for TickCounter {
    fn now_millis(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// Decides which ticks are forwarded to the predictor.
///
/// - the first tick after construction or [`reset`](Self::reset) is always
///   sampled;
/// - no tick is sampled while a request is in flight;
/// - otherwise a tick is sampled when the clock value is a multiple of the
///   modulus.
#[derive(Debug, Clone)]
pub struct SignalSampler {
    modulus: i64,
    first_pending: bool,
    in_flight: bool,
}

impl Default for SignalSampler {
    fn default() -> Self {
        Self::new(DEFAULT_MODULUS)
    }
}

impl SignalSampler {
    /// Create a sampler. A modulus below one samples every tick.
    pub fn new(modulus: i64) -> Self {
        Self {
            modulus: modulus.max(1),
            first_pending: true,
            in_flight: false,
        }
    }

    /// Decide whether the current tick should trigger a request. A positive
    /// decision marks a request as in flight until [`finish`](Self::finish).
    pub fn should_sample(&mut self, clock: i64) -> bool {
        let sample = if self.in_flight {
            false
        } else if self.first_pending {
            self.first_pending = false;
            true
        } else {
            clock.rem_euclid(self.modulus) == 0
        };

        if sample {
            self.in_flight = true;
        }
        sample
    }

    /// Mark the outstanding request as finished.
    pub fn finish(&mut self) {
        self.in_flight = false;
    }

    /// Start over: the next tick is sampled and any outstanding request is
    /// forgotten.
    pub fn reset(&mut self) {
        self.first_pending = true;
        self.in_flight = false;
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}
