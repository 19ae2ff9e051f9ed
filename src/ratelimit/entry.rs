//! Per-key fixed-window state.

use std::time::Duration;

use super::clock::saturating_millis;

/// The budget consumed by one key within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    /// Accepted requests in the current window
    pub count: u32,
    /// Absolute time (ms since epoch) at which the window expires
    pub reset_at_ms: u64,
}

impl WindowEntry {
    /// Open a new window at `now_ms` with the opening request already counted.
    pub fn open(now_ms: u64, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at_ms: now_ms.saturating_add(saturating_millis(window)),
        }
    }

    /// Whether the window has fully elapsed.
    ///
    /// The window is still live at exactly `reset_at_ms`.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.reset_at_ms
    }

    /// Milliseconds until the window resets, clamped at zero.
    pub fn time_until_reset(&self, now_ms: u64) -> u64 {
        self.reset_at_ms.saturating_sub(now_ms)
    }

    /// Requests still available in this window.
    pub fn remaining(&self, max_requests: u32, now_ms: u64) -> u32 {
        if self.is_expired(now_ms) {
            max_requests
        } else {
            max_requests.saturating_sub(self.count)
        }
    }
}
