use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::core::error::{NexusError, Result};

/// Sliding-window admission control, keyed by canonical domain.
///
/// Windows are per-domain, never global. The limiter is consulted before
/// fetch work starts; cache lookups are not rate limited.
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { limit: limit.max(1), window, windows: Mutex::new(HashMap::new()) }
    }

    /// Admit one request for `domain` or fail with `RateLimited`.
    pub fn check(&self, domain: &str) -> Result<()> {
        let now = Instant::now();
        let mut windows = self.windows.lock().expect("rate limiter mutex poisoned");
        let ring = windows.entry(domain.to_string()).or_default();

        while let Some(front) = ring.front() {
            if now.duration_since(*front) >= self.window {
                ring.pop_front();
            } else {
                break;
            }
        }

        if ring.len() >= self.limit {
            let retry_after = ring
                .front()
                .map(|front| self.window.saturating_sub(now.duration_since(*front)))
                .unwrap_or(self.window);
            return Err(NexusError::RateLimited {
                domain: domain.to_string(),
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        ring.push_back(now);
        Ok(())
    }
}
