//! Cancellable fixed-cadence ticker.
//!
//! A [`Ticker`] yields ticks on a fixed period measured by a
//! [`TimeProvider`]. The loop body runs between ticks and is never raced
//! against cancellation, so work started on a tick always finishes:
//!
//! ```rust,ignore
//! let mut ticker = Ticker::new(time, Duration::from_millis(800), token.clone());
//! while let Some(tick) = ticker.tick().await {
//!     do_work(tick).await; // completes even if `token` is cancelled meanwhile
//! }
//! ```
//!
//! Ticks never overlap. A deadline that passes while the body is still
//! running is dropped rather than fired late, so a slow body cannot cause
//! a burst of catch-up ticks.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::TimeProvider;

/// Fixed-period ticker stopped by a [`CancellationToken`].
#[derive(Debug)]
pub struct Ticker<T: TimeProvider> {
    time: T,
    period: Duration,
    token: CancellationToken,
    next_deadline: Duration,
    ticks: u64,
    skipped: u64,
}

impl<T: TimeProvider> Ticker<T> {
    /// Ticker whose first tick fires one period from now.
    pub fn new(time: T, period: Duration, token: CancellationToken) -> Self {
        let next_deadline = time.now() + period;
        Self {
            time,
            period,
            token,
            next_deadline,
            ticks: 0,
            skipped: 0,
        }
    }

    /// Ticker whose first tick fires immediately.
    pub fn immediate(time: T, period: Duration, token: CancellationToken) -> Self {
        let next_deadline = time.now();
        Self {
            time,
            period,
            token,
            next_deadline,
            ticks: 0,
            skipped: 0,
        }
    }

    /// Wait for the next tick.
    ///
    /// Returns the 1-based tick number, or `None` once the token has been
    /// cancelled (checked at every tick boundary and while waiting).
    pub async fn tick(&mut self) -> Option<u64> {
        if self.token.is_cancelled() {
            return None;
        }

        let now = self.time.now();
        while self.next_deadline < now {
            self.next_deadline += self.period;
            self.skipped += 1;
            tracing::trace!(skipped = self.skipped, "tick missed while busy");
        }

        if now < self.next_deadline {
            let wait = self.next_deadline - now;
            tokio::select! {
                _ = self.token.cancelled() => return None,
                slept = self.time.sleep(wait) => {
                    if slept.is_err() {
                        return None;
                    }
                }
            }
        }

        if self.token.is_cancelled() {
            return None;
        }

        self.next_deadline += self.period;
        self.ticks += 1;
        Some(self.ticks)
    }

    /// Ticks delivered so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Deadlines dropped because the previous tick's work overran them.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::TokioTimeProvider;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_cadence() {
        let time = TokioTimeProvider::new();
        let period = Duration::from_millis(800);
        let mut ticker = Ticker::new(time.clone(), period, CancellationToken::new());

        for expected in 1..=3u64 {
            assert_eq!(ticker.tick().await, Some(expected));
            assert_eq!(time.now(), Duration::from_millis(800 * expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_first_tick() {
        let time = TokioTimeProvider::new();
        let mut ticker =
            Ticker::immediate(time.clone(), Duration::from_millis(1000), CancellationToken::new());

        assert_eq!(ticker.tick().await, Some(1));
        assert_eq!(time.now(), Duration::ZERO);
        assert_eq!(ticker.tick().await, Some(2));
        assert_eq!(time.now(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_skips_missed_deadline() {
        let time = TokioTimeProvider::new();
        let period = Duration::from_millis(800);
        let mut ticker = Ticker::new(time.clone(), period, CancellationToken::new());

        assert_eq!(ticker.tick().await, Some(1));
        // Body runs past the 1600ms deadline.
        time.sleep(Duration::from_millis(900)).await.unwrap();

        assert_eq!(ticker.tick().await, Some(2));
        assert_eq!(time.now(), Duration::from_millis(2400));
        assert_eq!(ticker.skipped(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pending_wait() {
        let time = TokioTimeProvider::new();
        let token = CancellationToken::new();
        let mut ticker = Ticker::new(time.clone(), Duration::from_millis(800), token.clone());

        let cancel = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            token.cancel();
        };
        let (tick, ()) = tokio::join!(ticker.tick(), cancel);

        assert_eq!(tick, None);
        assert_eq!(time.now(), Duration::from_millis(300));
        assert_eq!(ticker.tick().await, None);
        assert_eq!(ticker.ticks(), 0);
    }
}
