//! Market data service: the orchestrating façade over the vendor adapters.
//!
//! One shared instance serves all request handlers. Per call it:
//! 1. Detects the market and normalizes the symbol
//! 2. Checks the cache (a hit short-circuits, no adapters consulted)
//! 3. Deduplicates against identical in-flight requests
//! 4. Orders the candidate adapters by priority plus a rate-limit penalty
//! 5. Drives the failover loop, caching the first success
//! 6. Records exactly one metrics record for the logical request
//!
//! "All providers failed" is a normal data-unavailable outcome (`Ok(None)`),
//! not an error; the only raised failure is the deduplication wait timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

use crate::errors::{ErrorKind, MarketDataError};
use crate::models::{CacheKey, DataPayload, DataType, FetchParams, FetchRequest, Market};
use crate::provider::{AdapterHealth, VendorAdapter};
use crate::resolver;

use super::cache::{CacheStats, DataCache};
use super::dedup::{DedupResult, DedupStats, RequestDeduplicator, DEFAULT_WAIT_TIMEOUT};
use super::metrics::{
    FetchRecord, LatencyPercentiles, MetricsCollector, MetricsFilter, MetricsSummary,
    ProviderHealthReport,
};

/// Priority penalty applied to a rate-limited adapter.
///
/// Demotes but never excludes: a previously limited vendor may have
/// recovered, so it stays at the end of the order instead of dropping out.
pub const RATE_LIMIT_PENALTY: u32 = 1000;

/// Service tuning knobs.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Cache capacity in entries
    pub cache_capacity: usize,
    /// How long a dedup waiter blocks on someone else's fetch
    pub dedup_timeout: Duration,
    /// Outer bound on a single adapter call, in case the adapter's own
    /// network timeout fails to fire
    pub adapter_call_timeout: Duration,
    /// Metrics ring capacity in records
    pub metrics_capacity: usize,
    /// Per-data-type TTL overrides; defaults come from `DataType::default_ttl`
    pub ttl_overrides: HashMap<DataType, Duration>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 1000,
            dedup_timeout: DEFAULT_WAIT_TIMEOUT,
            adapter_call_timeout: Duration::from_secs(15),
            metrics_capacity: 10_000,
            ttl_overrides: HashMap::new(),
        }
    }
}

/// Outcome of one upstream failover loop, shared across dedup waiters.
#[derive(Clone, Debug)]
struct FetchOutcome {
    value: Option<Arc<DataPayload>>,
    provider_used: Option<&'static str>,
    providers_tried: Vec<&'static str>,
    fallback_used: bool,
    error_kind: Option<ErrorKind>,
}

/// Static config plus live health for one adapter, for the status API.
#[derive(Clone, Debug, Serialize)]
pub struct ProviderStatus {
    pub name: &'static str,
    pub priority: u32,
    pub effective_priority: u32,
    pub enabled: bool,
    pub rate_limited: bool,
    pub markets: Vec<Market>,
    pub data_types: Vec<DataType>,
    pub health: AdapterHealth,
}

/// The orchestrating market data service.
///
/// Construct once at application startup and share by reference
/// (`Arc<MarketDataService>`) across request handlers; all internal
/// state is behind its own synchronization.
pub struct MarketDataService {
    adapters: Vec<Arc<dyn VendorAdapter>>,
    cache: DataCache,
    dedup: RequestDeduplicator<FetchOutcome>,
    metrics: MetricsCollector,
    config: ServiceConfig,
}

impl MarketDataService {
    /// Create a service with default configuration.
    pub fn new(adapters: Vec<Arc<dyn VendorAdapter>>) -> Self {
        Self::with_config(adapters, ServiceConfig::default())
    }

    /// Create a service with custom configuration.
    pub fn with_config(adapters: Vec<Arc<dyn VendorAdapter>>, config: ServiceConfig) -> Self {
        Self {
            cache: DataCache::with_capacity(config.cache_capacity),
            dedup: RequestDeduplicator::new(config.dedup_timeout),
            metrics: MetricsCollector::with_capacity(config.metrics_capacity),
            adapters,
            config,
        }
    }

    pub fn builder() -> MarketDataServiceBuilder {
        MarketDataServiceBuilder::default()
    }

    /// Fetch one piece of market data.
    ///
    /// Returns `Ok(None)` when every candidate adapter failed — data
    /// temporarily unavailable is an expected terminal state, not a
    /// defect. The only raised failure is
    /// [`MarketDataError::DedupTimeout`], which callers should treat as
    /// retryable.
    pub async fn fetch(
        &self,
        data_type: DataType,
        symbol: &str,
        params: FetchParams,
    ) -> Result<Option<Arc<DataPayload>>, MarketDataError> {
        let started = Instant::now();
        let (market, normalized) = resolver::detect_and_normalize(symbol);
        let symbol: Arc<str> = Arc::from(normalized);
        let key = CacheKey {
            data_type,
            symbol: symbol.clone(),
            params: params.clone(),
        };

        if let Some(hit) = self.cache.get(&key) {
            debug!("Cache hit: {}", key);
            self.metrics.record(FetchRecord {
                data_type,
                symbol: symbol.to_string(),
                market,
                providers_tried: Vec::new(),
                provider_used: Some(hit.source.to_string()),
                latency_ms: elapsed_ms(started),
                cache_hit: true,
                deduplicated: false,
                success: true,
                fallback_used: false,
                error_kind: None,
                timestamp: Utc::now(),
            });
            return Ok(Some(hit.value));
        }

        let request = FetchRequest {
            data_type,
            symbol: symbol.clone(),
            market,
            params,
        };

        let result = self
            .dedup
            .execute(&key, || self.fetch_upstream(&request, &key))
            .await;

        match result {
            Ok(DedupResult { value: outcome, shared }) => {
                self.record_outcome(&request, &outcome, shared, started);
                Ok(outcome.value)
            }
            Err(MarketDataError::InFlightAbandoned) => {
                // The fetch this caller attached to was dropped before
                // finishing; report data-unavailable rather than raising.
                warn!("In-flight fetch abandoned: {}", key);
                let outcome = FetchOutcome {
                    value: None,
                    provider_used: None,
                    providers_tried: Vec::new(),
                    fallback_used: false,
                    error_kind: Some(ErrorKind::InFlightAbandoned),
                };
                self.record_outcome(&request, &outcome, true, started);
                Ok(None)
            }
            Err(e) => {
                warn!("Dedup wait timed out: {}", key);
                self.metrics.record(FetchRecord {
                    data_type,
                    symbol: symbol.to_string(),
                    market,
                    providers_tried: Vec::new(),
                    provider_used: None,
                    latency_ms: elapsed_ms(started),
                    cache_hit: false,
                    deduplicated: true,
                    success: false,
                    fallback_used: false,
                    error_kind: Some(e.kind()),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    /// The failover loop: try candidate adapters in effective-priority
    /// order until one succeeds. Runs at most once per key at a time
    /// (leader side of the deduplicator).
    async fn fetch_upstream(&self, request: &FetchRequest, key: &CacheKey) -> FetchOutcome {
        let candidates = self.ordered_adapters(request.data_type, request.market);

        if candidates.is_empty() {
            warn!(
                "No adapters available for {} in market {}",
                request.data_type, request.market
            );
            return FetchOutcome {
                value: None,
                provider_used: None,
                providers_tried: Vec::new(),
                fallback_used: false,
                error_kind: Some(ErrorKind::AllProvidersFailed),
            };
        }

        let mut tried: Vec<&'static str> = Vec::with_capacity(candidates.len());

        for adapter in candidates {
            tried.push(adapter.id());
            let attempt_started = Instant::now();

            let result = match tokio::time::timeout(
                self.config.adapter_call_timeout,
                adapter.fetch(request),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(MarketDataError::Timeout {
                    provider: adapter.id().to_string(),
                }),
            };
            let latency = attempt_started.elapsed();

            match result {
                Ok(payload) => {
                    adapter.runtime().record_outcome(true, latency, None);

                    let value = Arc::new(payload);
                    let ttl = self.ttl_for(request.data_type);
                    self.cache.insert(key.clone(), value.clone(), ttl, adapter.id());

                    let fallback_used = tried.len() > 1;
                    info!(
                        "Fetched {} from '{}'{}",
                        key,
                        adapter.id(),
                        if fallback_used { " (fallback)" } else { "" }
                    );

                    return FetchOutcome {
                        value: Some(value),
                        provider_used: Some(adapter.id()),
                        providers_tried: tried,
                        fallback_used,
                        error_kind: None,
                    };
                }
                Err(e) => {
                    adapter.runtime().record_outcome(false, latency, Some(&e));
                    warn!(
                        "Provider '{}' failed for {}: {}, trying next",
                        adapter.id(),
                        key,
                        e
                    );
                }
            }
        }

        warn!("All providers failed for {}", key);
        FetchOutcome {
            value: None,
            provider_used: None,
            fallback_used: tried.len() > 1,
            providers_tried: tried,
            error_kind: Some(ErrorKind::AllProvidersFailed),
        }
    }

    /// Candidate adapters for `(data_type, market)`, ordered by effective
    /// priority.
    ///
    /// Effective priority is the configured priority plus
    /// [`RATE_LIMIT_PENALTY`] while the adapter reports itself
    /// rate-limited. Recomputed per request — the penalty expires on its
    /// own, so a cached order would go stale. The sort is stable: ties
    /// keep registration order.
    fn ordered_adapters(
        &self,
        data_type: DataType,
        market: Market,
    ) -> Vec<Arc<dyn VendorAdapter>> {
        let mut candidates: Vec<(u32, Arc<dyn VendorAdapter>)> = self
            .adapters
            .iter()
            .filter(|a| a.config().can_serve(data_type, market))
            .map(|a| {
                let mut priority = a.config().priority;
                if a.runtime().is_rate_limited() {
                    priority += RATE_LIMIT_PENALTY;
                    debug!("Adapter '{}' demoted by rate-limit penalty", a.id());
                }
                (priority, a.clone())
            })
            .collect();

        candidates.sort_by_key(|(priority, _)| *priority);
        candidates.into_iter().map(|(_, a)| a).collect()
    }

    fn record_outcome(
        &self,
        request: &FetchRequest,
        outcome: &FetchOutcome,
        deduplicated: bool,
        started: Instant,
    ) {
        self.metrics.record(FetchRecord {
            data_type: request.data_type,
            symbol: request.symbol.to_string(),
            market: request.market,
            providers_tried: outcome
                .providers_tried
                .iter()
                .map(|p| p.to_string())
                .collect(),
            provider_used: outcome.provider_used.map(|p| p.to_string()),
            latency_ms: elapsed_ms(started),
            cache_hit: false,
            deduplicated,
            success: outcome.value.is_some(),
            fallback_used: outcome.fallback_used,
            error_kind: outcome.error_kind,
            timestamp: Utc::now(),
        });
    }

    fn ttl_for(&self, data_type: DataType) -> Duration {
        self.config
            .ttl_overrides
            .get(&data_type)
            .copied()
            .unwrap_or_else(|| data_type.default_ttl())
    }

    // ========================================================================
    // Observability surface
    // ========================================================================

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn dedup_stats(&self) -> DedupStats {
        self.dedup.stats()
    }

    pub fn stats(&self, filter: &MetricsFilter) -> MetricsSummary {
        self.metrics.stats(filter)
    }

    pub fn latency_percentiles(&self, filter: &MetricsFilter) -> LatencyPercentiles {
        self.metrics.latency_percentiles(filter)
    }

    pub fn recent_calls(&self, filter: &MetricsFilter, limit: usize) -> Vec<FetchRecord> {
        self.metrics.recent(filter, limit)
    }

    pub fn provider_health(&self, provider: &str) -> ProviderHealthReport {
        self.metrics.provider_health(provider)
    }

    /// Static config plus live health for every registered adapter.
    pub fn provider_status(&self) -> Vec<ProviderStatus> {
        self.adapters
            .iter()
            .map(|a| {
                let config = a.config();
                let rate_limited = a.runtime().is_rate_limited();
                ProviderStatus {
                    name: config.name,
                    priority: config.priority,
                    effective_priority: config.priority
                        + if rate_limited { RATE_LIMIT_PENALTY } else { 0 },
                    enabled: config.enabled,
                    rate_limited,
                    markets: config.markets.to_vec(),
                    data_types: config.data_types.to_vec(),
                    health: a.runtime().health(),
                }
            })
            .collect()
    }
}

/// Builder for [`MarketDataService`].
#[derive(Default)]
pub struct MarketDataServiceBuilder {
    adapters: Vec<Arc<dyn VendorAdapter>>,
    config: ServiceConfig,
}

impl MarketDataServiceBuilder {
    pub fn adapter(mut self, adapter: Arc<dyn VendorAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.config.cache_capacity = capacity;
        self
    }

    pub fn dedup_timeout(mut self, timeout: Duration) -> Self {
        self.config.dedup_timeout = timeout;
        self
    }

    pub fn adapter_call_timeout(mut self, timeout: Duration) -> Self {
        self.config.adapter_call_timeout = timeout;
        self
    }

    pub fn metrics_capacity(mut self, capacity: usize) -> Self {
        self.config.metrics_capacity = capacity;
        self
    }

    pub fn ttl_override(mut self, data_type: DataType, ttl: Duration) -> Self {
        self.config.ttl_overrides.insert(data_type, ttl);
        self
    }

    pub fn build(self) -> MarketDataService {
        MarketDataService::with_config(self.adapters, self.config)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
