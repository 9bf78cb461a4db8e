use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::ApiError;
use crate::middleware::auth::AuthUser;

/// Request budget for one route scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    pub requests: u32,
    pub window: Duration,
}

impl RateBudget {
    pub const fn per_minute(requests: u32) -> Self {
        Self {
            requests,
            window: Duration::from_secs(60),
        }
    }

    pub const fn per_hour(requests: u32) -> Self {
        Self {
            requests,
            window: Duration::from_secs(60 * 60),
        }
    }
}

/// Outcome of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
    length: Duration,
}

/// Fixed-window counters keyed by `scope:user`
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    windows: Mutex<HashMap<String, Window>>,
    checks: Mutex<u64>,
}

const SWEEP_EVERY: u64 = 1024;

impl RateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            windows: Mutex::new(HashMap::new()),
            checks: Mutex::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn check(&self, key: &str, budget: RateBudget) -> RateDecision {
        self.check_at(key, budget, Instant::now())
    }

    fn check_at(&self, key: &str, budget: RateBudget, now: Instant) -> RateDecision {
        if !self.enabled {
            return RateDecision::Allowed { remaining: budget.requests };
        }

        self.maybe_sweep(now);

        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let window = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
            length: budget.window,
        });

        if now.duration_since(window.started) >= window.length {
            window.started = now;
            window.count = 0;
            window.length = budget.window;
        }

        if window.count >= budget.requests {
            let elapsed = now.duration_since(window.started);
            return RateDecision::Limited {
                retry_after: window.length.saturating_sub(elapsed),
            };
        }

        window.count += 1;
        RateDecision::Allowed {
            remaining: budget.requests - window.count,
        }
    }

    /// Rate limit `user` within `scope`, as an `ApiError` for handlers
    pub fn enforce(&self, scope: &str, user: &AuthUser, budget: RateBudget) -> Result<(), ApiError> {
        let key = format!("{}:{}", scope, user.id);
        match self.check(&key, budget) {
            RateDecision::Allowed { .. } => Ok(()),
            RateDecision::Limited { retry_after } => {
                tracing::warn!("Rate limit exceeded for {} on {}", user.id, scope);
                // Round up so clients never retry a moment too early
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Err(ApiError::too_many_requests(
                    format!("Too many requests for {}; retry later", scope),
                    secs.max(1),
                ))
            }
        }
    }

    /// Number of live windows (for tests and diagnostics)
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }

    fn maybe_sweep(&self, now: Instant) {
        let due = {
            let mut checks = match self.checks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *checks += 1;
            *checks % SWEEP_EVERY == 0
        };

        if due {
            self.sweep(now);
        }
    }

    fn sweep(&self, now: Instant) {
        if let Ok(mut windows) = self.windows.lock() {
            let before = windows.len();
            windows.retain(|_, w| now.duration_since(w.started) < w.length);
            tracing::debug!("Rate limiter sweep removed {} windows", before - windows.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_after_budget_and_resets() {
        let limiter = RateLimiter::new(true);
        let budget = RateBudget {
            requests: 2,
            window: Duration::from_secs(10),
        };
        let start = Instant::now();

        assert_eq!(limiter.check_at("k", budget, start), RateDecision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_at("k", budget, start), RateDecision::Allowed { remaining: 0 });
        match limiter.check_at("k", budget, start + Duration::from_secs(4)) {
            RateDecision::Limited { retry_after } => assert_eq!(retry_after, Duration::from_secs(6)),
            other => panic!("expected limit, got {:?}", other),
        }

        // Other keys have their own window
        assert!(matches!(limiter.check_at("other", budget, start), RateDecision::Allowed { .. }));

        // New window after expiry
        assert_eq!(
            limiter.check_at("k", budget, start + Duration::from_secs(10)),
            RateDecision::Allowed { remaining: 1 }
        );
    }

    #[test]
    fn disabled_limiter_allows_everything() {
        let limiter = RateLimiter::new(false);
        let budget = RateBudget::per_minute(0);
        assert!(matches!(limiter.check("k", budget), RateDecision::Allowed { .. }));
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn sweep_drops_expired_windows() {
        let limiter = RateLimiter::new(true);
        let budget = RateBudget {
            requests: 5,
            window: Duration::from_secs(1),
        };
        let start = Instant::now();
        limiter.check_at("a", budget, start);
        limiter.check_at("b", budget, start);
        assert_eq!(limiter.tracked_keys(), 2);

        limiter.sweep(start + Duration::from_secs(2));
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn enforce_maps_to_429() {
        let limiter = RateLimiter::new(true);
        let user = AuthUser {
            id: uuid::Uuid::new_v4(),
            email: "x@example.com".into(),
            role: crate::auth::Role::Student,
        };
        let budget = RateBudget::per_minute(1);
        assert!(limiter.enforce("messages:send", &user, budget).is_ok());
        let err = limiter.enforce("messages:send", &user, budget).unwrap_err();
        assert_eq!(err.status_code(), 429);
    }
}
