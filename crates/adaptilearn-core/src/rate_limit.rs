//! Caller-owned, fixed-window rate limiting for external APIs.
//!
//! Each API gets a request budget per window. A window opens on the first
//! request after the previous one lapsed. APIs without a configured limit
//! are never throttled.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

const HOUR: Duration = Duration::from_secs(3600);

/// Default per-hour budgets for the external APIs the system talks to.
pub const DEFAULT_LIMITS: [(&str, u32); 5] = [
    ("question_bank", 100),
    ("education", 50),
    ("syllabus", 200),
    ("academic", 30),
    ("video", 100),
];

/// Request budget for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn per_hour(requests: u32) -> Self {
        Self {
            requests,
            window: HOUR,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Rate-limit bookkeeping keyed by API name.
#[derive(Debug, Clone, Default)]
pub struct RateLimiterState {
    limits: HashMap<String, RateLimit>,
    windows: HashMap<String, Window>,
}

impl RateLimiterState {
    /// A limiter with no limits configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// A limiter with [`DEFAULT_LIMITS`].
    pub fn with_defaults() -> Self {
        DEFAULT_LIMITS
            .iter()
            .fold(Self::new(), |state, (api, requests)| {
                state.with_limit(api, RateLimit::per_hour(*requests))
            })
    }

    /// Set or replace the limit for `api`.
    pub fn with_limit(mut self, api: &str, limit: RateLimit) -> Self {
        self.limits.insert(api.to_string(), limit);
        self
    }

    pub fn limit(&self, api: &str) -> Option<RateLimit> {
        self.limits.get(api).copied()
    }

    fn live_window(&self, api: &str, limit: RateLimit, now: Instant) -> Option<Window> {
        self.windows
            .get(api)
            .copied()
            .filter(|w| now.saturating_duration_since(w.started) <= limit.window)
    }

    /// Whether a request to `api` at `now` is within budget.
    ///
    /// On refusal returns how long until the window resets.
    pub fn check(&self, api: &str, now: Instant) -> Result<(), Duration> {
        let Some(limit) = self.limit(api) else {
            return Ok(());
        };
        match self.live_window(api, limit, now) {
            Some(window) if window.count >= limit.requests => {
                let elapsed = now.saturating_duration_since(window.started);
                Err(limit.window.saturating_sub(elapsed))
            }
            None if limit.requests == 0 => Err(limit.window),
            _ => Ok(()),
        }
    }

    /// Count a request to `api` made at `now`.
    pub fn record(&mut self, api: &str, now: Instant) {
        let Some(limit) = self.limit(api) else {
            return;
        };
        let window = match self.live_window(api, limit, now) {
            Some(w) => Window {
                started: w.started,
                count: w.count + 1,
            },
            None => Window {
                started: now,
                count: 1,
            },
        };
        self.windows.insert(api.to_string(), window);
    }

    /// Check and record in one step.
    pub fn try_acquire(&mut self, api: &str, now: Instant) -> Result<(), Duration> {
        self.check(api, now)?;
        self.record(api, now);
        Ok(())
    }

    /// [`try_acquire`](Self::try_acquire) as a [`CoreError`].
    pub fn acquire(&mut self, api: &str, now: Instant) -> Result<(), CoreError> {
        self.try_acquire(api, now).map_err(|retry_after| {
            tracing::warn!("rate limit reached for '{api}', retry after {retry_after:?}");
            CoreError::RateLimited {
                api: api.to_string(),
                retry_after,
            }
        })
    }

    /// Requests left in the current window. `None` for unlimited APIs.
    pub fn remaining(&self, api: &str, now: Instant) -> Option<u32> {
        let limit = self.limit(api)?;
        let used = self
            .live_window(api, limit, now)
            .map_or(0, |w| w.count);
        Some(limit.requests.saturating_sub(used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_apis_are_unlimited() {
        let mut state = RateLimiterState::with_defaults();
        let now = Instant::now();
        for _ in 0..1000 {
            assert!(state.try_acquire("weather", now).is_ok());
        }
        assert_eq!(state.remaining("weather", now), None);
    }

    #[test]
    fn budget_is_enforced_within_window() {
        let mut state = RateLimiterState::new().with_limit(
            "academic",
            RateLimit {
                requests: 2,
                window: Duration::from_secs(60),
            },
        );
        let t0 = Instant::now();
        assert!(state.try_acquire("academic", t0).is_ok());
        assert!(state.try_acquire("academic", t0 + Duration::from_secs(10)).is_ok());
        assert_eq!(state.remaining("academic", t0 + Duration::from_secs(10)), Some(0));

        let wait = state
            .try_acquire("academic", t0 + Duration::from_secs(20))
            .unwrap_err();
        assert_eq!(wait, Duration::from_secs(40));
    }

    #[test]
    fn window_resets_after_it_lapses() {
        let mut state = RateLimiterState::new().with_limit(
            "video",
            RateLimit {
                requests: 1,
                window: Duration::from_secs(60),
            },
        );
        let t0 = Instant::now();
        state.try_acquire("video", t0).unwrap();
        // The boundary instant still belongs to the old window.
        assert!(state.check("video", t0 + Duration::from_secs(60)).is_err());
        assert!(state.try_acquire("video", t0 + Duration::from_secs(61)).is_ok());
        assert_eq!(state.remaining("video", t0 + Duration::from_secs(61)), Some(0));
    }

    #[test]
    fn defaults_match_known_apis() {
        let state = RateLimiterState::with_defaults();
        assert_eq!(state.limit("question_bank"), Some(RateLimit::per_hour(100)));
        assert_eq!(state.limit("academic"), Some(RateLimit::per_hour(30)));
        assert_eq!(state.limit("syllabus"), Some(RateLimit::per_hour(200)));
    }

    #[test]
    fn acquire_reports_rate_limited() {
        let mut state = RateLimiterState::new().with_limit("education", RateLimit::per_hour(0));
        let err = state.acquire("education", Instant::now()).unwrap_err();
        assert!(matches!(err, CoreError::RateLimited { ref api, .. } if api == "education"));
    }
}
