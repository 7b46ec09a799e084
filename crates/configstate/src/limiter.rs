// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Token bucket throttle for backend queries.
//!
//! Unlike a try-or-fail bucket, [`Limiter::reserve`] always takes a token and
//! tells the caller how long to wait for it. The token count may go negative
//! while reservations are outstanding; refill pays the debt back first.

use std::time::{Duration, Instant};

/// Reserving token bucket.
///
/// One token is added every `period`, up to `burst` tokens. A zero period
/// means no limit at all.
#[derive(Debug)]
pub struct Limiter {
    /// Current token count; negative while reservations are pending.
    tokens: f64,

    /// Maximum token count.
    burst: u32,

    /// Time to refill one token.
    period: Duration,

    /// Last refill timestamp.
    last_refill: Instant,

    /// Sum of every delay handed out so far.
    total_delay: Duration,
}

impl Limiter {
    /// Create a limiter starting with a full bucket.
    pub fn new(period: Duration, burst: u32) -> Self {
        Self {
            tokens: burst as f64,
            burst,
            period,
            last_refill: Instant::now(),
            total_delay: Duration::ZERO,
        }
    }

    /// Limiter allowing `burst` calls per `interval / factor`.
    pub fn every(interval: Duration, factor: u32, burst: u32) -> Self {
        Self::new(interval / factor.max(1), burst)
    }

    /// Reserve the next slot, returning how long to wait before using it.
    ///
    /// Returns `Duration::ZERO` when a token is available now.
    pub fn reserve(&mut self) -> Duration {
        if self.period.is_zero() {
            return Duration::ZERO;
        }

        self.refill();
        self.tokens -= 1.0;

        if self.tokens >= 0.0 {
            return Duration::ZERO;
        }

        let delay = self.period.mul_f64(-self.tokens);
        self.total_delay += delay;
        delay
    }

    /// Cumulative delay reserved since creation.
    pub fn total_delay(&self) -> Duration {
        self.total_delay
    }

    /// Current token count (refilled to now).
    pub fn tokens(&mut self) -> f64 {
        self.refill();
        self.tokens
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        self.last_refill = now;

        if elapsed.is_zero() {
            return;
        }

        let add = elapsed.as_secs_f64() / self.period.as_secs_f64();
        self.tokens = (self.tokens + add).min(self.burst as f64);
    }
}
