//! Core fixed-window rate limiter.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::clock::{saturating_millis, Clock, SystemClock};
use super::entry::WindowEntry;

/// Default window length when none is configured.
const DEFAULT_WINDOW_MS: u64 = 60 * 1000;
/// Default budget per window when none is configured.
const DEFAULT_MAX_REQUESTS: u32 = 3;

/// Configuration for one limiter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Window length in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Maximum accepted requests per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

fn default_window_ms() -> u64 {
    DEFAULT_WINDOW_MS
}

fn default_max_requests() -> u32 {
    DEFAULT_MAX_REQUESTS
}

impl LimitConfig {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window_ms: saturating_millis(window),
            max_requests,
        }
    }

    /// The window as a `Duration`.
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_requests: DEFAULT_MAX_REQUESTS,
        }
    }
}

/// A fixed-window rate limiter keyed by arbitrary strings.
///
/// Each key gets at most `max_requests` accepted calls per window. Windows
/// expire lazily on the next access; [`RateLimiter::cleanup`] only reclaims
/// memory and never changes a decision.
///
/// The check-then-increment in [`RateLimiter::is_allowed`] runs under the
/// map's per-shard write lock, so concurrent callers on the same key cannot
/// both slip under the limit. Every instance owns its own key space.
pub struct RateLimiter<C: Clock = SystemClock> {
    /// Window state indexed by key
    entries: DashMap<String, WindowEntry>,
    config: LimitConfig,
    clock: C,
    /// Label used in log output
    name: String,
}

impl RateLimiter<SystemClock> {
    /// Create a limiter backed by the system clock.
    pub fn new(config: LimitConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a limiter that reads time from `clock`.
    pub fn with_clock(config: LimitConfig, clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock,
            name: String::from("default"),
        }
    }

    /// Attach a label for log output.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> LimitConfig {
        self.config
    }

    /// Record a request for `key` and decide whether it may proceed.
    ///
    /// The request that opens a window is itself counted. A rejected request
    /// does not consume budget.
    pub fn is_allowed(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        let window = self.config.window();

        trace!(limiter = %self.name, "Checking rate limit");

        match self.entries.entry(key.to_string()) {
            Entry::Vacant(vacant) => {
                debug!(
                    limiter = %self.name,
                    window_ms = self.config.window_ms,
                    max_requests = self.config.max_requests,
                    "Opening rate limit window"
                );
                vacant.insert(WindowEntry::open(now, window));
                true
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();

                if entry.is_expired(now) {
                    debug!(limiter = %self.name, "Window expired, starting a new one");
                    *entry = WindowEntry::open(now, window);
                    return true;
                }

                if entry.count >= self.config.max_requests {
                    debug!(
                        limiter = %self.name,
                        count = entry.count,
                        reset_in_ms = entry.time_until_reset(now),
                        "Rate limit exceeded"
                    );
                    return false;
                }

                entry.count += 1;
                true
            }
        }
    }

    /// Time left in the current window for `key`; zero when untracked or expired.
    pub fn time_until_reset(&self, key: &str) -> Duration {
        let now = self.clock.now_ms();
        let ms = self
            .entries
            .get(key)
            .map(|entry| entry.time_until_reset(now))
            .unwrap_or(0);
        Duration::from_millis(ms)
    }

    /// Requests `key` may still make in its current window.
    pub fn remaining_requests(&self, key: &str) -> u32 {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .map(|entry| entry.remaining(self.config.max_requests, now))
            .unwrap_or(self.config.max_requests)
    }

    /// Drop every entry whose window has expired.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        debug!(
            limiter = %self.name,
            removed,
            remaining = self.entries.len(),
            "Swept expired rate limit entries"
        );
        removed
    }

    /// Number of keys currently tracked, expired or not.
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// Forget every key.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_millis(60_000);

    fn limiter(max_requests: u32) -> (Arc<ManualClock>, RateLimiter<Arc<ManualClock>>) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let limiter =
            RateLimiter::with_clock(LimitConfig::new(WINDOW, max_requests), Arc::clone(&clock));
        (clock, limiter)
    }

    #[test]
    fn test_default_config() {
        let config = LimitConfig::default();
        assert_eq!(config.window(), Duration::from_secs(60));
        assert_eq!(config.max_requests, 3);
    }

    #[test]
    fn test_rejects_after_max_requests() {
        let (_clock, limiter) = limiter(3);

        for _ in 0..3 {
            assert!(limiter.is_allowed("k"));
        }
        assert!(!limiter.is_allowed("k"));
        assert!(!limiter.is_allowed("k"));
        assert_eq!(limiter.remaining_requests("k"), 0);
    }

    #[test]
    fn test_two_request_scenario() {
        let (clock, limiter) = limiter(2);

        assert!(limiter.is_allowed("a"));
        assert!(limiter.is_allowed("a"));
        assert!(!limiter.is_allowed("a"));

        clock.advance(Duration::from_millis(60_001));
        assert!(limiter.is_allowed("a"));
        assert_eq!(limiter.remaining_requests("a"), 1);
        assert_eq!(limiter.time_until_reset("a"), Duration::from_millis(60_000));

        clock.advance(Duration::from_millis(1));
        assert_eq!(limiter.time_until_reset("a"), Duration::from_millis(59_999));

        assert!(limiter.is_allowed("a"));
        assert!(!limiter.is_allowed("a"));
    }

    #[test]
    fn test_window_still_live_at_reset_instant() {
        let (clock, limiter) = limiter(1);

        assert!(limiter.is_allowed("k"));
        clock.advance(WINDOW);
        assert_eq!(limiter.time_until_reset("k"), Duration::ZERO);
        assert!(!limiter.is_allowed("k"));

        clock.advance(Duration::from_millis(1));
        assert!(limiter.is_allowed("k"));
    }

    #[test]
    fn test_rejection_does_not_consume_budget() {
        let (clock, limiter) = limiter(2);

        limiter.is_allowed("k");
        limiter.is_allowed("k");
        for _ in 0..10 {
            assert!(!limiter.is_allowed("k"));
        }

        clock.advance(WINDOW + Duration::from_millis(1));
        assert!(limiter.is_allowed("k"));
        assert!(limiter.is_allowed("k"));
        assert!(!limiter.is_allowed("k"));
    }

    #[test]
    fn test_zero_budget_admits_opening_request() {
        let (clock, limiter) = limiter(0);

        assert!(limiter.is_allowed("k"));
        assert!(!limiter.is_allowed("k"));
        assert_eq!(limiter.remaining_requests("k"), 0);

        clock.advance(WINDOW + Duration::from_millis(1));
        assert!(limiter.is_allowed("k"));
        assert!(!limiter.is_allowed("k"));
    }

    #[test]
    fn test_huge_window_saturates() {
        let config = LimitConfig::new(Duration::MAX, 1);
        assert_eq!(config.window_ms, u64::MAX);
    }

    #[test]
    fn test_remaining_requests_counts_down() {
        let (clock, limiter) = limiter(3);

        assert_eq!(limiter.remaining_requests("k"), 3);
        limiter.is_allowed("k");
        assert_eq!(limiter.remaining_requests("k"), 2);
        limiter.is_allowed("k");
        assert_eq!(limiter.remaining_requests("k"), 1);
        limiter.is_allowed("k");
        assert_eq!(limiter.remaining_requests("k"), 0);
        limiter.is_allowed("k");
        assert_eq!(limiter.remaining_requests("k"), 0);

        clock.advance(WINDOW + Duration::from_millis(1));
        assert_eq!(limiter.remaining_requests("k"), 3);
    }

    #[test]
    fn test_untracked_key() {
        let (_clock, limiter) = limiter(2);

        assert_eq!(limiter.time_until_reset("nobody"), Duration::ZERO);
        assert_eq!(limiter.remaining_requests("nobody"), 2);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_empty_key_is_ordinary() {
        let (_clock, limiter) = limiter(1);

        assert!(limiter.is_allowed(""));
        assert!(!limiter.is_allowed(""));
        assert!(limiter.is_allowed(" "));
    }

    #[test]
    fn test_keys_are_independent() {
        let (_clock, limiter) = limiter(1);

        assert!(limiter.is_allowed("a"));
        assert!(!limiter.is_allowed("a"));
        assert!(limiter.is_allowed("b"));
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let clock = Arc::new(ManualClock::new(0));
        let first = RateLimiter::with_clock(LimitConfig::new(WINDOW, 1), Arc::clone(&clock));
        let second = RateLimiter::with_clock(LimitConfig::new(WINDOW, 1), Arc::clone(&clock));

        assert!(first.is_allowed("shared"));
        assert!(!first.is_allowed("shared"));
        assert!(second.is_allowed("shared"));
        assert_eq!(second.remaining_requests("shared"), 0);
        assert_eq!(first.tracked_keys(), 1);
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let (clock, limiter) = limiter(2);

        limiter.is_allowed("old");
        clock.advance(Duration::from_millis(30_000));
        limiter.is_allowed("fresh");
        limiter.is_allowed("fresh");

        clock.advance(Duration::from_millis(30_001));
        assert_eq!(limiter.cleanup(), 1);
        assert_eq!(limiter.tracked_keys(), 1);

        // The surviving window keeps its count.
        assert!(!limiter.is_allowed("fresh"));
        assert_eq!(limiter.remaining_requests("old"), 2);
    }

    #[test]
    fn test_cleanup_with_no_entries() {
        let (_clock, limiter) = limiter(2);
        assert_eq!(limiter.cleanup(), 0);
    }

    #[test]
    fn test_cleanup_many_keys() {
        let (clock, limiter) = limiter(2);

        for i in 0..500 {
            limiter.is_allowed(&format!("user{}@example.com", i));
        }
        assert_eq!(limiter.cleanup(), 0);

        clock.advance(WINDOW + Duration::from_millis(1));
        assert_eq!(limiter.cleanup(), 500);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_clear() {
        let (_clock, limiter) = limiter(1);

        limiter.is_allowed("k");
        limiter.clear();
        assert_eq!(limiter.tracked_keys(), 0);
        assert!(limiter.is_allowed("k"));
    }

    #[test]
    fn test_concurrent_callers_respect_limit() {
        let (_clock, limiter) = limiter(5);
        let limiter = Arc::new(limiter);

        let accepted: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let limiter = Arc::clone(&limiter);
                    scope.spawn(move || (0..50).filter(|_| limiter.is_allowed("hot")).count())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(accepted, 5);
    }

    #[test]
    fn test_name_label() {
        let limiter = RateLimiter::new(LimitConfig::default()).with_name("password_reset");
        assert_eq!(limiter.name(), "password_reset");
        assert_eq!(limiter.config(), LimitConfig::default());
    }
}
