//! Per-adapter runtime health state.
//!
//! Each adapter owns one [`AdapterRuntime`]: rolling success/failure
//! counters, a short ring of recent call samples, and a rate-limited
//! flag with its own expiry. The state is single-writer — only the
//! owning adapter's `record_outcome` path mutates it after each call
//! outcome — while the service and status surface read point-in-time
//! snapshots. It is in-memory and resets on application restart.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};
use serde::Serialize;

use crate::errors::{ErrorKind, MarketDataError};

/// How many recent call samples to retain per adapter.
const RECENT_SAMPLES: usize = 50;

/// How long an adapter stays demoted after a vendor rate-limit signal.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

/// One recorded call outcome.
#[derive(Clone, Debug)]
struct CallSample {
    latency: Duration,
    error: Option<String>,
}

/// Point-in-time health snapshot of one adapter.
#[derive(Clone, Debug, Serialize)]
pub struct AdapterHealth {
    pub calls_total: u64,
    pub calls_success: u64,
    pub calls_failed: u64,
    /// Fraction of successful calls; 1.0 when no calls were made yet
    pub success_rate: f64,
    /// Mean latency over the recent sample window, in milliseconds
    pub avg_latency_ms: f64,
    /// Most recent error summaries, newest last
    pub recent_errors: Vec<String>,
    pub rate_limited: bool,
}

/// Mutable health state owned by one adapter.
pub struct AdapterRuntime {
    calls_total: AtomicU64,
    calls_success: AtomicU64,
    calls_failed: AtomicU64,
    recent: Mutex<VecDeque<CallSample>>,
    rate_limited_until: Mutex<Option<Instant>>,
}

impl AdapterRuntime {
    pub fn new() -> Self {
        Self {
            calls_total: AtomicU64::new(0),
            calls_success: AtomicU64::new(0),
            calls_failed: AtomicU64::new(0),
            recent: Mutex::new(VecDeque::with_capacity(RECENT_SAMPLES)),
            rate_limited_until: Mutex::new(None),
        }
    }

    /// Lock the sample ring, recovering from poison if necessary.
    ///
    /// Health samples are advisory; recovering a possibly inconsistent
    /// ring beats panicking the request path.
    fn lock_recent(&self) -> MutexGuard<'_, VecDeque<CallSample>> {
        self.recent.lock().unwrap_or_else(|poisoned| {
            warn!("Adapter runtime sample mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_rate_limit(&self) -> MutexGuard<'_, Option<Instant>> {
        self.rate_limited_until.lock().unwrap_or_else(|poisoned| {
            warn!("Adapter rate-limit mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Record the outcome of one vendor call.
    ///
    /// Called by the service after every attempt. A rate-limit error
    /// additionally flags the adapter as rate-limited for a backoff
    /// window, demoting it in subsequent failover ordering.
    pub fn record_outcome(
        &self,
        success: bool,
        latency: Duration,
        error: Option<&MarketDataError>,
    ) {
        self.calls_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.calls_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.calls_failed.fetch_add(1, Ordering::Relaxed);
        }

        let mut recent = self.lock_recent();
        if recent.len() == RECENT_SAMPLES {
            recent.pop_front();
        }
        recent.push_back(CallSample {
            latency,
            error: error.map(|e| e.to_string()),
        });
        drop(recent);

        if let Some(e) = error {
            if e.kind() == ErrorKind::RateLimit {
                self.mark_rate_limited(RATE_LIMIT_BACKOFF);
            }
        }
    }

    /// Flag this adapter as rate-limited for `backoff`.
    pub fn mark_rate_limited(&self, backoff: Duration) {
        let mut until = self.lock_rate_limit();
        *until = Some(Instant::now() + backoff);
        debug!("Adapter flagged rate-limited for {:?}", backoff);
    }

    /// Whether the adapter is currently believed to be rate-limited.
    ///
    /// The flag expires on its own; an expired flag is cleared lazily
    /// here so a recovered vendor regains its base priority.
    pub fn is_rate_limited(&self) -> bool {
        let mut until = self.lock_rate_limit();
        match *until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                *until = None;
                false
            }
            None => false,
        }
    }

    /// Point-in-time health snapshot.
    pub fn health(&self) -> AdapterHealth {
        let total = self.calls_total.load(Ordering::Relaxed);
        let success = self.calls_success.load(Ordering::Relaxed);
        let failed = self.calls_failed.load(Ordering::Relaxed);

        let recent = self.lock_recent();
        let avg_latency_ms = if recent.is_empty() {
            0.0
        } else {
            recent
                .iter()
                .map(|s| s.latency.as_secs_f64() * 1000.0)
                .sum::<f64>()
                / recent.len() as f64
        };
        let all_errors: Vec<String> = recent
            .iter()
            .filter_map(|s| s.error.clone())
            .collect();
        let recent_errors: Vec<String> =
            all_errors[all_errors.len().saturating_sub(5)..].to_vec();
        drop(recent);

        AdapterHealth {
            calls_total: total,
            calls_success: success,
            calls_failed: failed,
            success_rate: if total == 0 {
                1.0
            } else {
                success as f64 / total as f64
            },
            avg_latency_ms,
            recent_errors,
            rate_limited: self.is_rate_limited(),
        }
    }
}

impl Default for AdapterRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_track_outcomes() {
        let runtime = AdapterRuntime::new();
        runtime.record_outcome(true, Duration::from_millis(20), None);
        runtime.record_outcome(true, Duration::from_millis(40), None);
        runtime.record_outcome(
            false,
            Duration::from_millis(100),
            Some(&MarketDataError::ProviderError {
                provider: "TEST".to_string(),
                message: "boom".to_string(),
            }),
        );

        let health = runtime.health();
        assert_eq!(health.calls_total, 3);
        assert_eq!(health.calls_success, 2);
        assert_eq!(health.calls_failed, 1);
        assert!((health.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(health.recent_errors.len(), 1);
    }

    #[test]
    fn test_fresh_runtime_reports_full_success() {
        let runtime = AdapterRuntime::new();
        assert!((runtime.health().success_rate - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rate_limit_error_sets_flag() {
        let runtime = AdapterRuntime::new();
        assert!(!runtime.is_rate_limited());

        runtime.record_outcome(
            false,
            Duration::from_millis(5),
            Some(&MarketDataError::RateLimited {
                provider: "TEST".to_string(),
            }),
        );
        assert!(runtime.is_rate_limited());
    }

    #[test]
    fn test_rate_limit_flag_expires() {
        let runtime = AdapterRuntime::new();
        runtime.mark_rate_limited(Duration::from_millis(10));
        assert!(runtime.is_rate_limited());

        std::thread::sleep(Duration::from_millis(20));
        assert!(!runtime.is_rate_limited());
    }

    #[test]
    fn test_sample_ring_is_bounded() {
        let runtime = AdapterRuntime::new();
        for _ in 0..(RECENT_SAMPLES + 10) {
            runtime.record_outcome(true, Duration::from_millis(1), None);
        }
        assert_eq!(runtime.lock_recent().len(), RECENT_SAMPLES);
    }

    #[test]
    fn test_non_rate_limit_error_does_not_flag() {
        let runtime = AdapterRuntime::new();
        runtime.record_outcome(
            false,
            Duration::from_millis(5),
            Some(&MarketDataError::SymbolNotFound("NOPE".to_string())),
        );
        assert!(!runtime.is_rate_limited());
    }
}
