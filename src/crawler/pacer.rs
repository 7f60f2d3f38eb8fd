//! Inter-request pacing
//!
//! A fixed pause separates consecutive fetches against the target site,
//! whatever the discovery mode. The pause runs from the moment one fetch
//! completes to the moment the next one starts, so a slow response never
//! shortens it. It is awaited inline by the single crawl task, so nothing
//! else runs while it elapses.

use std::time::{Duration, Instant};

/// Tracks request timing for the target site
#[derive(Debug, Clone)]
pub struct Pacer {
    /// Minimum idle time between the end of one fetch and the start of the next
    delay: Duration,

    /// Number of fetches started so far
    pub request_count: u32,

    /// When the previous fetch completed
    pub last_completed: Option<Instant>,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            request_count: 0,
            last_completed: None,
        }
    }

    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Time left before the next fetch may start
    ///
    /// Returns None if a fetch can start now.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let last = self.last_completed?;
        let idle = now.saturating_duration_since(last);
        if idle >= self.delay {
            None
        } else {
            Some(self.delay - idle)
        }
    }

    /// Waits out the remaining delay, then counts the new fetch
    pub async fn wait_turn(&mut self) {
        if let Some(wait) = self.time_until_next_request(Instant::now()) {
            tracing::trace!("Pausing {:?} before next request", wait);
            tokio::time::sleep(wait).await;
        }
        self.request_count += 1;
    }

    /// Marks the fetch started by the last [`wait_turn`](Self::wait_turn) as done
    pub fn record_completion(&mut self, now: Instant) {
        self.last_completed = Some(now);
    }
}
