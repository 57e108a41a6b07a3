//! Fetch metrics collection.
//!
//! Every logical fetch — cache hit, dedup-shared, or real upstream call
//! — appends exactly one immutable [`FetchRecord`]. Records live in a
//! bounded ring (oldest dropped at capacity) and all aggregates are
//! computed on read, keeping the write path to a push under one short
//! lock.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use crate::errors::ErrorKind;
use crate::models::{DataType, Market};

/// Default maximum number of retained records.
const DEFAULT_CAPACITY: usize = 10_000;

/// One recorded fetch attempt.
#[derive(Clone, Debug, Serialize)]
pub struct FetchRecord {
    pub data_type: DataType,
    pub symbol: String,
    pub market: Market,
    /// Adapters attempted, in order, including the one that succeeded
    pub providers_tried: Vec<String>,
    /// Adapter that produced the value (cache source for cache hits)
    pub provider_used: Option<String>,
    pub latency_ms: f64,
    pub cache_hit: bool,
    /// True when the result was shared from another caller's in-flight fetch
    pub deduplicated: bool,
    pub success: bool,
    /// True when the value came from an adapter other than the first tried
    pub fallback_used: bool,
    pub error_kind: Option<ErrorKind>,
    pub timestamp: DateTime<Utc>,
}

/// Record filter; unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct MetricsFilter {
    pub data_type: Option<DataType>,
    pub market: Option<Market>,
    /// Matches records served by this provider
    pub provider: Option<String>,
    pub symbol: Option<String>,
}

impl MetricsFilter {
    fn matches(&self, record: &FetchRecord) -> bool {
        if let Some(dt) = self.data_type {
            if record.data_type != dt {
                return false;
            }
        }
        if let Some(market) = self.market {
            if record.market != market {
                return false;
            }
        }
        if let Some(ref provider) = self.provider {
            if record.provider_used.as_deref() != Some(provider.as_str()) {
                return false;
            }
        }
        if let Some(ref symbol) = self.symbol {
            if record.symbol != *symbol {
                return false;
            }
        }
        true
    }
}

/// Aggregate over a set of records.
#[derive(Clone, Debug, Serialize)]
pub struct MetricsSummary {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub cache_hits: u64,
    pub deduplicated: u64,
    pub fallbacks: u64,
    /// successes / total; 1.0 when no records match
    pub success_rate: f64,
    pub avg_latency_ms: f64,
}

/// Latency distribution in milliseconds.
#[derive(Clone, Debug, Serialize)]
pub struct LatencyPercentiles {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Per-provider view derived from the record ring.
#[derive(Clone, Debug, Serialize)]
pub struct ProviderHealthReport {
    pub provider: String,
    /// Requests in which this provider was attempted
    pub attempts: u64,
    /// Requests this provider served
    pub successes: u64,
    /// Attempts that fell through to another provider or failed outright
    pub failures: u64,
    pub success_rate: f64,
    /// Mean request latency over the requests this provider served
    pub avg_latency_ms: f64,
}

/// Append-only bounded metrics ring.
pub struct MetricsCollector {
    records: Mutex<VecDeque<FetchRecord>>,
    capacity: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    fn lock_records(&self) -> MutexGuard<'_, VecDeque<FetchRecord>> {
        self.records.lock().unwrap_or_else(|poisoned| {
            warn!("Metrics mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Append one record, dropping the oldest at capacity.
    pub fn record(&self, record: FetchRecord) {
        let mut records = self.lock_records();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Aggregate counts over matching records.
    pub fn stats(&self, filter: &MetricsFilter) -> MetricsSummary {
        let records = self.lock_records();
        let matching: Vec<&FetchRecord> = records.iter().filter(|r| filter.matches(r)).collect();

        let total = matching.len() as u64;
        let successes = matching.iter().filter(|r| r.success).count() as u64;
        let cache_hits = matching.iter().filter(|r| r.cache_hit).count() as u64;
        let deduplicated = matching.iter().filter(|r| r.deduplicated).count() as u64;
        let fallbacks = matching.iter().filter(|r| r.fallback_used).count() as u64;
        let avg_latency_ms = if matching.is_empty() {
            0.0
        } else {
            matching.iter().map(|r| r.latency_ms).sum::<f64>() / matching.len() as f64
        };

        MetricsSummary {
            total,
            successes,
            failures: total - successes,
            cache_hits,
            deduplicated,
            fallbacks,
            success_rate: if total == 0 {
                1.0
            } else {
                successes as f64 / total as f64
            },
            avg_latency_ms,
        }
    }

    /// Latency percentiles over matching records.
    pub fn latency_percentiles(&self, filter: &MetricsFilter) -> LatencyPercentiles {
        let records = self.lock_records();
        let mut latencies: Vec<f64> = records
            .iter()
            .filter(|r| filter.matches(r))
            .map(|r| r.latency_ms)
            .collect();
        latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        LatencyPercentiles {
            p50: percentile(&latencies, 50.0),
            p90: percentile(&latencies, 90.0),
            p95: percentile(&latencies, 95.0),
            p99: percentile(&latencies, 99.0),
        }
    }

    /// Most recent matching records, newest first, up to `limit`.
    pub fn recent(&self, filter: &MetricsFilter, limit: usize) -> Vec<FetchRecord> {
        let records = self.lock_records();
        records
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Per-provider view across the whole ring.
    ///
    /// An "attempt" is any request whose failover loop reached the
    /// provider; a "success" is a request the provider served.
    pub fn provider_health(&self, provider: &str) -> ProviderHealthReport {
        let records = self.lock_records();

        let mut attempts = 0u64;
        let mut successes = 0u64;
        let mut served_latency = 0.0f64;

        for record in records.iter() {
            if !record.providers_tried.iter().any(|p| p == provider) {
                continue;
            }
            attempts += 1;
            if record.provider_used.as_deref() == Some(provider) && record.success {
                successes += 1;
                served_latency += record.latency_ms;
            }
        }

        ProviderHealthReport {
            provider: provider.to_string(),
            attempts,
            successes,
            failures: attempts - successes,
            success_rate: if attempts == 0 {
                1.0
            } else {
                successes as f64 / attempts as f64
            },
            avg_latency_ms: if successes == 0 {
                0.0
            } else {
                served_latency / successes as f64
            },
        }
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.lock_records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest-rank percentile over pre-sorted data.
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(provider: &str, success: bool, latency_ms: f64) -> FetchRecord {
        FetchRecord {
            data_type: DataType::Quote,
            symbol: "AAPL".to_string(),
            market: Market::Us,
            providers_tried: vec![provider.to_string()],
            provider_used: success.then(|| provider.to_string()),
            latency_ms,
            cache_hit: false,
            deduplicated: false,
            success,
            fallback_used: false,
            error_kind: (!success).then_some(ErrorKind::Provider),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_stats_aggregate() {
        let metrics = MetricsCollector::new();
        metrics.record(record("YAHOO", true, 100.0));
        metrics.record(record("YAHOO", true, 200.0));
        metrics.record(record("YAHOO", false, 50.0));

        let stats = metrics.stats(&MetricsFilter::default());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.failures, 1);
        assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((stats.avg_latency_ms - 350.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_filter_by_provider_and_market() {
        let metrics = MetricsCollector::new();
        metrics.record(record("YAHOO", true, 10.0));
        metrics.record(record("FINNHUB", true, 20.0));
        let mut hk = record("YAHOO", true, 30.0);
        hk.market = Market::Hk;
        metrics.record(hk);

        let yahoo = metrics.stats(&MetricsFilter {
            provider: Some("YAHOO".to_string()),
            ..Default::default()
        });
        assert_eq!(yahoo.total, 2);

        let hk_only = metrics.stats(&MetricsFilter {
            market: Some(Market::Hk),
            ..Default::default()
        });
        assert_eq!(hk_only.total, 1);
    }

    #[test]
    fn test_percentiles() {
        let metrics = MetricsCollector::new();
        for i in 1..=100 {
            metrics.record(record("YAHOO", true, i as f64));
        }

        let pct = metrics.latency_percentiles(&MetricsFilter::default());
        assert_eq!(pct.p50, 50.0);
        assert_eq!(pct.p90, 90.0);
        assert_eq!(pct.p95, 95.0);
        assert_eq!(pct.p99, 99.0);
    }

    #[test]
    fn test_percentiles_empty() {
        let metrics = MetricsCollector::new();
        let pct = metrics.latency_percentiles(&MetricsFilter::default());
        assert_eq!(pct.p50, 0.0);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let metrics = MetricsCollector::with_capacity(3);
        for i in 0..5 {
            let mut r = record("YAHOO", true, i as f64);
            r.symbol = format!("SYM{}", i);
            metrics.record(r);
        }

        assert_eq!(metrics.len(), 3);
        let recent = metrics.recent(&MetricsFilter::default(), 10);
        assert_eq!(recent[0].symbol, "SYM4");
        assert_eq!(recent[2].symbol, "SYM2");
    }

    #[test]
    fn test_recent_respects_limit_and_order() {
        let metrics = MetricsCollector::new();
        metrics.record(record("YAHOO", true, 1.0));
        metrics.record(record("FINNHUB", true, 2.0));
        metrics.record(record("YAHOO", false, 3.0));

        let recent = metrics.recent(&MetricsFilter::default(), 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].latency_ms, 3.0);
        assert_eq!(recent[1].latency_ms, 2.0);
    }

    #[test]
    fn test_provider_health_counts_fallthrough_as_failure() {
        let metrics = MetricsCollector::new();

        // YAHOO failed, FINNHUB served the request.
        let mut fallback = record("FINNHUB", true, 80.0);
        fallback.providers_tried = vec!["YAHOO".to_string(), "FINNHUB".to_string()];
        fallback.fallback_used = true;
        metrics.record(fallback);
        metrics.record(record("YAHOO", true, 40.0));

        let yahoo = metrics.provider_health("YAHOO");
        assert_eq!(yahoo.attempts, 2);
        assert_eq!(yahoo.successes, 1);
        assert_eq!(yahoo.failures, 1);

        let finnhub = metrics.provider_health("FINNHUB");
        assert_eq!(finnhub.attempts, 1);
        assert_eq!(finnhub.successes, 1);
    }
}
