//! Per-user sliding-window rate limiting.
//!
//! Each user id maps to the timestamps of their admitted requests inside the
//! trailing window. Entries are created lazily on a user's first request and
//! pruned lazily on access; state lives only for the lifetime of the
//! process.
//!
//! Check-and-record is atomic per user: the `DashMap` entry guard is held
//! across the prune/count/record sequence, so two concurrent requests from
//! the same user cannot both observe the last free slot.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Sliding-window translation rate limiter, scoped per user id.
#[derive(Debug)]
pub struct RateLimiter {
    /// Admitted-request timestamps (unix seconds) per user
    windows: DashMap<String, VecDeque<u64>>,
    limit: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window_secs,
        }
    }

    /// Maximum admitted requests per window.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Window duration in seconds.
    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Check whether a request from `user_id` is admitted, recording it if
    /// so. Returns `false` without recording when the window is full.
    pub fn check(&self, user_id: &str) -> bool {
        self.check_at(user_id, now_unix())
    }

    /// Number of admissions left in the current window.
    pub fn remaining(&self, user_id: &str) -> u32 {
        self.remaining_at(user_id, now_unix())
    }

    /// Seconds until the oldest counted request ages out and frees a slot.
    /// Zero when the user has slots available or no recorded requests.
    pub fn retry_after(&self, user_id: &str) -> u64 {
        self.retry_after_at(user_id, now_unix())
    }

    fn check_at(&self, user_id: &str, now: u64) -> bool {
        let mut entry = self.windows.entry(user_id.to_string()).or_default();
        Self::prune(&mut entry, now, self.window_secs);

        if entry.len() as u32 >= self.limit {
            return false;
        }

        entry.push_back(now);
        true
    }

    fn remaining_at(&self, user_id: &str, now: u64) -> u32 {
        match self.windows.get_mut(user_id) {
            Some(mut entry) => {
                let window = entry.value_mut();
                Self::prune(window, now, self.window_secs);
                self.limit.saturating_sub(window.len() as u32)
            }
            None => self.limit,
        }
    }

    fn retry_after_at(&self, user_id: &str, now: u64) -> u64 {
        match self.windows.get_mut(user_id) {
            Some(mut entry) => {
                let window = entry.value_mut();
                Self::prune(window, now, self.window_secs);
                match window.front() {
                    Some(&oldest) => {
                        let elapsed = now.saturating_sub(oldest);
                        self.window_secs.saturating_sub(elapsed)
                    }
                    None => 0,
                }
            }
            None => 0,
        }
    }

    /// Discard timestamps older than the window. Timestamps are appended in
    /// order, so pruning from the front is sufficient.
    fn prune(window: &mut VecDeque<u64>, now: u64, window_secs: u64) {
        let cutoff = now.saturating_sub(window_secs);
        while matches!(window.front(), Some(&ts) if ts <= cutoff) {
            window.pop_front();
        }
    }
}

/// Current time as unix seconds.
fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
