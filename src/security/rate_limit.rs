//! Sliding-window rate limiting per client identity.
//!
//! # Data Flow
//! ```text
//! request → client identity → RateLimiter::evaluate(policy, client)
//!     → no policy        → Allow (registry untouched)
//!     → under the limit  → Allow (window replaced with recent + now)
//!     → at the limit     → Reject (registry untouched) → 429
//!
//! every evaluation with a policy:
//!     SweepSampler::should_sweep() → sweep(now) on hit
//! ```
//!
//! # Design Decisions
//! - The registry lives in this process only; running several gateway
//!   instances gives each its own independent counters
//! - Read-filter-write per client is not atomic: concurrent requests from
//!   one client may all read the same window and all be admitted
//! - Clock and sweep sampling are injected, never read from globals
//! - The sweep uses a fixed staleness threshold, independent of any route's
//!   window

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::RateLimitConfig;
use crate::http::response::error_response;
use crate::observability::metrics;

/// Entries whose newest timestamp is older than this are evicted by a sweep.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Roughly one sweep every hundred evaluations.
pub const DEFAULT_SWEEP_PROBABILITY: f64 = 0.01;

/// Per-route quota: at most `limit` accepted requests per trailing
/// `window_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window_seconds: u64,
}

impl RateLimitPolicy {
    pub fn new(limit: u32, window_seconds: u64) -> Self {
        Self {
            limit,
            window_seconds,
        }
    }

    /// A policy with a zero limit or zero window is malformed and is never
    /// enforced.
    pub fn is_valid(&self) -> bool {
        self.limit > 0 && self.window_seconds > 0
    }

    fn window_ms(&self) -> u64 {
        self.window_seconds.saturating_mul(1000)
    }
}

/// Outcome of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Quota exhausted. `retry_after_secs` is when the oldest counted
    /// request leaves the window (at least 1).
    Reject { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn is_reject(&self) -> bool {
        !self.is_allow()
    }
}

/// The only error the limiter produces.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("client {client} exceeded {limit} requests per {window_secs}s")]
    QuotaExceeded {
        client: String,
        limit: u32,
        window_secs: u64,
        retry_after_secs: u64,
    },
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let RateLimitError::QuotaExceeded {
            retry_after_secs, ..
        } = &self;
        let retry_after = HeaderValue::from(*retry_after_secs);

        let mut response = error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "too_many_requests",
            "Too many requests, please slow down",
        );
        response.headers_mut().insert(header::RETRY_AFTER, retry_after);
        response
    }
}

/// Source of wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> u64;
}

/// Reads the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// Decides, per evaluation, whether to run a registry sweep.
pub trait SweepSampler: Send + Sync + fmt::Debug {
    fn should_sweep(&self) -> bool;
}

/// Sweeps with a fixed probability per evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RandomSampler {
    probability: f64,
}

impl RandomSampler {
    /// `probability` is clamped to `[0, 1]`.
    pub fn new(probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self { probability }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_PROBABILITY)
    }
}

impl SweepSampler for RandomSampler {
    fn should_sweep(&self) -> bool {
        rand::thread_rng().gen_bool(self.probability)
    }
}

/// Always or never sweeps.
#[derive(Debug, Clone, Copy)]
pub struct FixedSampler(pub bool);

impl FixedSampler {
    pub fn always() -> Self {
        Self(true)
    }

    pub fn never() -> Self {
        Self(false)
    }
}

impl SweepSampler for FixedSampler {
    fn should_sweep(&self) -> bool {
        self.0
    }
}

/// In-memory registry of request timestamps keyed by client identity.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Vec<u64>>,
    clock: Arc<dyn Clock>,
    sampler: Arc<dyn SweepSampler>,
    stale_after_ms: u64,
}

impl RateLimiter {
    /// Build a limiter on the system clock with the configured sweep settings.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_parts(
            Arc::new(SystemClock),
            Arc::new(RandomSampler::new(config.sweep_probability)),
            Duration::from_secs(config.stale_after_secs),
        )
    }

    pub fn with_parts(
        clock: Arc<dyn Clock>,
        sampler: Arc<dyn SweepSampler>,
        stale_after: Duration,
    ) -> Self {
        Self {
            windows: DashMap::new(),
            clock,
            sampler,
            stale_after_ms: stale_after.as_millis() as u64,
        }
    }

    /// Evaluate a request at the clock's current time.
    pub fn evaluate(&self, policy: Option<&RateLimitPolicy>, client: &str) -> Decision {
        self.evaluate_at(policy, client, self.clock.now_millis())
    }

    /// Evaluate a request arriving at `now_ms`.
    ///
    /// Without a valid policy the request is admitted and nothing is
    /// recorded.
    pub fn evaluate_at(
        &self,
        policy: Option<&RateLimitPolicy>,
        client: &str,
        now_ms: u64,
    ) -> Decision {
        let Some(policy) = policy.filter(|p| p.is_valid()) else {
            return Decision::Allow;
        };

        let decision = self.admit(policy, client, now_ms);

        if self.sampler.should_sweep() {
            self.sweep_at(now_ms);
        }

        decision
    }

    /// Like [`evaluate`](Self::evaluate), reporting a rejection as
    /// [`RateLimitError::QuotaExceeded`].
    pub fn check(
        &self,
        policy: Option<&RateLimitPolicy>,
        client: &str,
    ) -> Result<(), RateLimitError> {
        match self.evaluate(policy, client) {
            Decision::Allow => Ok(()),
            Decision::Reject { retry_after_secs } => {
                let (limit, window_secs) = policy
                    .map(|p| (p.limit, p.window_seconds))
                    .unwrap_or_default();
                Err(RateLimitError::QuotaExceeded {
                    client: client.to_owned(),
                    limit,
                    window_secs,
                    retry_after_secs,
                })
            }
        }
    }

    fn admit(&self, policy: &RateLimitPolicy, client: &str, now_ms: u64) -> Decision {
        let window_ms = policy.window_ms();
        let limit = policy.limit as usize;

        // Snapshot under the shard read lock; the lock is gone before the
        // write below.
        let mut recent: Vec<u64> = self
            .windows
            .get(client)
            .map(|w| {
                w.iter()
                    .copied()
                    .filter(|&ts| now_ms.saturating_sub(ts) < window_ms)
                    .collect()
            })
            .unwrap_or_default();

        if recent.len() >= limit {
            // The request that must expire before one more fits.
            let blocking = recent
                .get(recent.len() - limit)
                .copied()
                .unwrap_or(now_ms);
            let wait_ms = blocking.saturating_add(window_ms).saturating_sub(now_ms);
            return Decision::Reject {
                retry_after_secs: wait_ms.div_ceil(1000).max(1),
            };
        }

        recent.push(now_ms);
        self.windows.insert(client.to_owned(), recent);
        Decision::Allow
    }

    /// Sweep at the clock's current time. Returns the number of evicted
    /// clients.
    pub fn sweep(&self) -> usize {
        self.sweep_at(self.clock.now_millis())
    }

    /// Drop timestamps older than the staleness threshold and remove clients
    /// left with none.
    pub fn sweep_at(&self, now_ms: u64) -> usize {
        let stale_after_ms = self.stale_after_ms;
        let mut evicted = 0;

        self.windows.retain(|_, timestamps| {
            timestamps.retain(|&ts| now_ms.saturating_sub(ts) < stale_after_ms);
            let keep = !timestamps.is_empty();
            if !keep {
                evicted += 1;
            }
            keep
        });

        let remaining = self.windows.len();
        metrics::record_sweep(evicted, remaining);
        tracing::debug!(evicted, remaining, "Rate limit registry swept");
        evicted
    }

    /// Number of client identities currently held.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Total timestamps held across all clients, expired ones included.
    pub fn tracked_timestamps(&self) -> usize {
        self.windows.iter().map(|w| w.value().len()).sum()
    }

    /// Stored timestamps for a client, as of the last accepted request or
    /// sweep.
    pub fn window(&self, client: &str) -> Option<Vec<u64>> {
        self.windows.get(client).map(|w| w.value().clone())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
