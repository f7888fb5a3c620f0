//! Cost-weighted admission control shared across tool invocations.
//!
//! Buckets are keyed by rate-limit type, a namespace shared by related
//! tools (typically one per upstream provider). Admission is a token
//! bucket: capacity `threshold`, continuous refill over `window`.

use crate::config::RuntimeConfig;
use crate::error::ToolError;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Budget for one rate-limit type: `threshold` units of cost per `window`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimit {
    pub threshold: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl RateLimit {
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self { threshold, window }
    }

    fn refill_per_sec(&self) -> f64 {
        self.threshold as f64 / self.window.as_secs_f64()
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::new(60, Duration::from_secs(60))
    }
}

struct Bucket {
    limit: RateLimit,
    available: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(limit: RateLimit, now: Instant) -> Self {
        Self {
            limit,
            available: limit.threshold as f64,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.available = (self.available + elapsed * self.limit.refill_per_sec())
            .min(self.limit.threshold as f64);
        self.last_refill = now;
    }

    /// Check-and-commit. On rejection returns the whole seconds until the
    /// bucket frees enough capacity for `cost`.
    fn try_admit(&mut self, cost: u32, now: Instant) -> Result<(), u64> {
        self.refill(now);
        let cost = cost as f64;
        if self.available >= cost {
            self.available -= cost;
            Ok(())
        } else {
            let deficit = cost - self.available;
            let seconds = (deficit / self.limit.refill_per_sec()).ceil() as u64;
            Err(seconds.max(1))
        }
    }
}

/// Admission gate consulted before every non-mock tool invocation.
///
/// Check-and-commit is atomic across concurrent callers: the bucket map is
/// guarded by a mutex that is never held across an await point.
pub struct RateLimiter {
    default_limit: RateLimit,
    limits: HashMap<String, RateLimit>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(default_limit: RateLimit) -> Self {
        Self {
            default_limit,
            limits: HashMap::new(),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Override the budget for one rate-limit type.
    pub fn with_limit(mut self, rate_limit_type: impl Into<String>, limit: RateLimit) -> Self {
        self.limits.insert(rate_limit_type.into(), limit);
        self
    }

    /// Build a limiter from the loaded runtime configuration.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let mut limiter = Self::new(config.default_limit());
        for (rate_limit_type, limit) in &config.rate_limits.overrides {
            limiter = limiter.with_limit(rate_limit_type.clone(), *limit);
        }
        limiter
    }

    /// Admit `cost` units against the bucket for `rate_limit_type`, or
    /// reject with a `RATE_LIMIT` error carrying a retry hint. Rejection is
    /// immediate and never queues.
    pub fn check_rate_limit(&self, rate_limit_type: &str, cost: u32) -> Result<(), ToolError> {
        let now = Instant::now();
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let bucket = buckets.entry(rate_limit_type.to_string()).or_insert_with(|| {
            let limit = self
                .limits
                .get(rate_limit_type)
                .copied()
                .unwrap_or(self.default_limit);
            Bucket::new(limit, now)
        });

        match bucket.try_admit(cost, now) {
            Ok(()) => {
                debug!(rate_limit_type, cost, available = bucket.available, "admitted");
                Ok(())
            }
            Err(retry_after) => {
                warn!(rate_limit_type, cost, retry_after, "admission rejected");
                Err(ToolError::rate_limited(format!(
                    "rate limit exceeded for '{}'",
                    rate_limit_type
                ))
                .with_retry_after(retry_after)
                .with_detail("rate_limit_type", rate_limit_type)
                .with_detail("cost", cost))
            }
        }
    }
}
