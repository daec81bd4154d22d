//! Fixed-window request counter keyed by client identity.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Deserialize;
use tracing::debug;

use super::clock::{Clock, SystemClock};
use crate::config::RateLimitSettings;
use crate::utils::{BridgeError, Result};

/// How a request is compared against `max_requests`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPolicy {
    /// Admit while `count < max` and only count admitted requests.
    /// At most `max` requests get through per window.
    #[default]
    Strict,
    /// Reject once `count > max`, checked before incrementing, and count
    /// every request. Lets `max + 1` requests through per window.
    Lenient,
}

/// Counter state for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u64,
    pub window_start: i64,
}

/// Per-identity fixed-window rate limiter.
///
/// Each `check_limit` call does its read-modify-write under the map's
/// per-key guard, so concurrent bursts from one identity are never
/// undercounted.
pub struct WindowRateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    window_ms: i64,
    max_requests: u64,
    policy: LimitPolicy,
    idle_windows: u32,
    clock: Arc<dyn Clock>,
}

impl WindowRateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Result<Self> {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: &RateLimitSettings, clock: Arc<dyn Clock>) -> Result<Self> {
        if settings.window_ms == 0 || settings.max_requests == 0 {
            return Err(BridgeError::InvalidConfig(
                "rate limit window and maximum must both be positive".to_string(),
            ));
        }

        Ok(Self {
            entries: DashMap::new(),
            window_ms: i64::try_from(settings.window_ms).unwrap_or(i64::MAX),
            max_requests: settings.max_requests,
            policy: settings.policy,
            idle_windows: settings.idle_windows.max(1),
            clock,
        })
    }

    /// Returns `true` when `identity` is over its limit and the request must
    /// be rejected, `false` when it is admitted.
    pub fn check_limit(&self, identity: &str) -> bool {
        let now = self.clock.now_millis();

        let mut entry = self
            .entries
            .entry(identity.to_string())
            .or_insert(RateLimitEntry {
                count: 0,
                window_start: now,
            });

        if now - entry.window_start > self.window_ms {
            *entry = RateLimitEntry {
                count: 0,
                window_start: now,
            };
        }

        let over_limit = match self.policy {
            LimitPolicy::Strict => {
                if entry.count < self.max_requests {
                    entry.count += 1;
                    false
                } else {
                    true
                }
            }
            LimitPolicy::Lenient => {
                let over = entry.count > self.max_requests;
                entry.count = entry.count.saturating_add(1);
                over
            }
        };

        if over_limit {
            debug!(
                identity,
                count = entry.count,
                limit = self.max_requests,
                "rate limit exceeded"
            );
        }

        over_limit
    }

    /// Requests counted for `identity` in its current window, if it has one.
    pub fn current_usage(&self, identity: &str) -> Option<u64> {
        let now = self.clock.now_millis();
        self.entries
            .get(identity)
            .filter(|entry| now - entry.window_start <= self.window_ms)
            .map(|entry| entry.count)
    }

    pub fn tracked_identities(&self) -> usize {
        self.entries.len()
    }

    /// Drops entries whose window started more than `idle_windows` windows
    /// ago. Such entries would be reset on their next request anyway.
    pub fn evict_stale(&self) -> usize {
        let now = self.clock.now_millis();
        let max_age = self.window_ms.saturating_mul(i64::from(self.idle_windows));
        let before = self.entries.len();

        self.entries
            .retain(|_, entry| now - entry.window_start <= max_age);

        before.saturating_sub(self.entries.len())
    }

    pub fn policy(&self) -> LimitPolicy {
        self.policy
    }

    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }
}

impl std::fmt::Debug for WindowRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRateLimiter")
            .field("window_ms", &self.window_ms)
            .field("max_requests", &self.max_requests)
            .field("policy", &self.policy)
            .field("tracked", &self.entries.len())
            .finish()
    }
}
