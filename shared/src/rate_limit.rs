//! Per-client fixed-window rate limiting.
//!
//! Each key gets a counter that resets once its window has fully elapsed.
//! Bursts straddling a window boundary are accepted.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }
}

/// Decides whether a client may make another request.
pub trait RateLimiter: Send + Sync {
    fn allow(&self, key: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    window_start: Instant,
}

/// In-process fixed-window counter, one record per client key.
#[derive(Debug, Default)]
pub struct FixedWindowLimiter {
    config: RateLimitConfig,
    records: DashMap<String, WindowRecord>,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: DashMap::new(),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn expired(&self, record: &WindowRecord, now: Instant) -> bool {
        now.saturating_duration_since(record.window_start) > self.config.window
    }

    /// `allow` evaluated at an explicit instant.
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let fresh = WindowRecord {
            count: 1,
            window_start: now,
        };

        // The entry guard holds the shard lock for the whole read-modify-write.
        match self.records.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                true
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if self.expired(record, now) {
                    *record = fresh;
                    true
                } else if record.count < self.config.max_requests {
                    record.count += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drop records whose window has elapsed. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !self.expired(record, now));
        before.saturating_sub(self.records.len())
    }

    /// Number of tracked client keys.
    pub fn tracked_keys(&self) -> usize {
        self.records.len()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }
}
