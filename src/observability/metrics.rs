// Comprehensive metrics system with Prometheus

use prometheus::{
    Encoder, Gauge, GaugeVec, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::MetricsConfig;

/// Error type for metrics operations
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to register metric: {0}")]
    RegistrationError(String),

    #[error("Failed to record metric: {0}")]
    RecordError(String),

    #[error("Failed to export metrics: {0}")]
    ExportError(String),

    #[error("Metric not found: {0}")]
    NotFound(String),
}

/// Global metrics registry for the fetch engine.
pub struct MetricsRegistry {
    registry: Arc<Registry>,
    config: MetricsConfig,

    // Fetch / orchestration metrics
    pub fetch_requests_total: IntCounterVec,
    pub fetch_duration_seconds: HistogramVec,
    pub tier_attempts_total: IntCounterVec,
    pub tier_attempt_duration_seconds: HistogramVec,
    pub tier_fallbacks_total: IntCounterVec,
    pub fetch_budget_exhausted_total: IntCounterVec,

    // Proxy metrics
    pub proxy_assignments_total: IntCounterVec,
    pub proxy_cooldowns_entered_total: IntCounterVec,
    pub proxy_domain_blocks_total: IntCounterVec,
    pub proxy_success_rate: GaugeVec,
    pub proxies_available: IntGaugeVec,

    // Risk metrics
    pub domain_risk_classifications_total: IntCounterVec,
    pub domains_tracked: IntGauge,

    // Pattern / learning metrics
    pub pattern_health_transitions_total: IntCounterVec,
    pub patterns_active: IntGauge,
    pub patterns_archived_total: IntCounter,
    pub quirks_learned_total: IntCounterVec,
    pub domain_groups_total: IntGauge,
    pub domain_group_transfers_total: IntCounterVec,

    // Extraction / validation metrics
    pub extraction_validation_failures_total: IntCounterVec,
    pub extraction_confidence: HistogramVec,

    // Debug recorder metrics
    pub decision_traces_recorded_total: IntCounterVec,
    pub decision_traces_dropped_total: IntCounter,

    // System metrics
    pub uptime_seconds: Gauge,
    pub build_info: IntCounterVec,
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new(config: MetricsConfig) -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let fetch_requests_total = IntCounterVec::new(
            Opts::new("fetch_requests_total", "Total fetch requests by final outcome")
                .namespace("fetch_ops"),
            &["outcome"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(fetch_requests_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let fetch_duration_seconds = HistogramVec::new(
            HistogramOpts::new("fetch_duration_seconds", "End-to-end fetch duration in seconds")
                .namespace("fetch_ops")
                .buckets(config.latency_buckets.clone()),
            &["outcome"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(fetch_duration_seconds.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let tier_attempts_total = IntCounterVec::new(
            Opts::new("tier_attempts_total", "Total per-tier fetch attempts")
                .namespace("fetch_ops"),
            &["tier", "outcome"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(tier_attempts_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let tier_attempt_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tier_attempt_duration_seconds",
                "Per-tier attempt duration in seconds",
            )
            .namespace("fetch_ops")
            .buckets(config.latency_buckets.clone()),
            &["tier"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(tier_attempt_duration_seconds.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let tier_fallbacks_total = IntCounterVec::new(
            Opts::new("tier_fallbacks_total", "Fallbacks from one tier to the next")
                .namespace("fetch_ops"),
            &["from_tier", "to_tier"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(tier_fallbacks_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let fetch_budget_exhausted_total = IntCounterVec::new(
            Opts::new(
                "fetch_budget_exhausted_total",
                "Requests that ran out of tiers allowed by their budget",
            )
            .namespace("fetch_ops"),
            &["plan"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(fetch_budget_exhausted_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let proxy_assignments_total = IntCounterVec::new(
            Opts::new("proxy_assignments_total", "Proxy assignments by tier")
                .namespace("fetch_ops"),
            &["tier"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(proxy_assignments_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let proxy_cooldowns_entered_total = IntCounterVec::new(
            Opts::new("proxy_cooldowns_entered_total", "Times a proxy entered cooldown")
                .namespace("fetch_ops"),
            &["tier"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(proxy_cooldowns_entered_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let proxy_domain_blocks_total = IntCounterVec::new(
            Opts::new(
                "proxy_domain_blocks_total",
                "Times a proxy was blocked for a specific domain",
            )
            .namespace("fetch_ops"),
            &["tier"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(proxy_domain_blocks_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let proxy_success_rate = GaugeVec::new(
            Opts::new("proxy_success_rate", "EWMA success rate per proxy")
                .namespace("fetch_ops"),
            &["proxy_id", "tier"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(proxy_success_rate.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let proxies_available = IntGaugeVec::new(
            Opts::new("proxies_available", "Proxies not currently in cooldown, by tier")
                .namespace("fetch_ops"),
            &["tier"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(proxies_available.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let domain_risk_classifications_total = IntCounterVec::new(
            Opts::new(
                "domain_risk_classifications_total",
                "Domain risk classifications by resulting level",
            )
            .namespace("fetch_ops"),
            &["risk_level"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(domain_risk_classifications_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let domains_tracked = IntGauge::with_opts(
            Opts::new("domains_tracked", "Distinct domains with a risk record")
                .namespace("fetch_ops"),
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(domains_tracked.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let pattern_health_transitions_total = IntCounterVec::new(
            Opts::new(
                "pattern_health_transitions_total",
                "Pattern health status transitions",
            )
            .namespace("fetch_ops"),
            &["from_status", "to_status"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(pattern_health_transitions_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let patterns_active = IntGauge::with_opts(
            Opts::new("patterns_active", "Non-archived learned patterns").namespace("fetch_ops"),
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(patterns_active.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let patterns_archived_total = IntCounter::with_opts(
            Opts::new("patterns_archived_total", "Patterns archived over time")
                .namespace("fetch_ops"),
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(patterns_archived_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let quirks_learned_total = IntCounterVec::new(
            Opts::new("quirks_learned_total", "Quirks learned, by kind").namespace("fetch_ops"),
            &["kind"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(quirks_learned_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let domain_groups_total = IntGauge::with_opts(
            Opts::new("domain_groups_total", "Registered domain groups").namespace("fetch_ops"),
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(domain_groups_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let domain_group_transfers_total = IntCounterVec::new(
            Opts::new(
                "domain_group_transfers_total",
                "Cross-domain handler transfers attempted, by outcome",
            )
            .namespace("fetch_ops"),
            &["outcome"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(domain_group_transfers_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let extraction_validation_failures_total = IntCounterVec::new(
            Opts::new(
                "extraction_validation_failures_total",
                "Extraction validation failures, by reason",
            )
            .namespace("fetch_ops"),
            &["reason"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(extraction_validation_failures_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let extraction_confidence = HistogramVec::new(
            HistogramOpts::new("extraction_confidence", "Extraction result confidence score")
                .namespace("fetch_ops")
                .buckets(vec![0.0, 0.25, 0.5, 0.7, 0.85, 0.95, 1.0]),
            &["tier"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(extraction_confidence.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let decision_traces_recorded_total = IntCounterVec::new(
            Opts::new("decision_traces_recorded_total", "Decision traces written, by outcome")
                .namespace("fetch_ops"),
            &["outcome"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(decision_traces_recorded_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let decision_traces_dropped_total = IntCounter::with_opts(
            Opts::new(
                "decision_traces_dropped_total",
                "Decision traces dropped by retention policy",
            )
            .namespace("fetch_ops"),
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(decision_traces_dropped_total.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let uptime_seconds = Gauge::with_opts(
            Opts::new("uptime_seconds", "Process uptime in seconds").namespace("fetch_ops"),
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(uptime_seconds.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;

        let build_info = IntCounterVec::new(
            Opts::new("build_info", "Build information").namespace("fetch_ops"),
            &["version"],
        )
        .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        registry
            .register(Box::new(build_info.clone()))
            .map_err(|e| MetricsError::RegistrationError(e.to_string()))?;
        build_info
            .with_label_values(&[env!("CARGO_PKG_VERSION")])
            .inc();

        if config.include_process_metrics {
            let process_collector = prometheus::process_collector::ProcessCollector::for_self();
            let _ = registry.register(Box::new(process_collector));
        }

        Ok(Self {
            registry: Arc::new(registry),
            config,
            fetch_requests_total,
            fetch_duration_seconds,
            tier_attempts_total,
            tier_attempt_duration_seconds,
            tier_fallbacks_total,
            fetch_budget_exhausted_total,
            proxy_assignments_total,
            proxy_cooldowns_entered_total,
            proxy_domain_blocks_total,
            proxy_success_rate,
            proxies_available,
            domain_risk_classifications_total,
            domains_tracked,
            pattern_health_transitions_total,
            patterns_active,
            patterns_archived_total,
            quirks_learned_total,
            domain_groups_total,
            domain_group_transfers_total,
            extraction_validation_failures_total,
            extraction_confidence,
            decision_traces_recorded_total,
            decision_traces_dropped_total,
            uptime_seconds,
            build_info,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::ExportError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::ExportError(e.to_string()))
    }

    /// Get the underlying registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    histogram: Histogram,
}

impl Timer {
    pub fn new(histogram: Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }

    pub fn observe_duration(self) -> Duration {
        let duration = self.start.elapsed();
        self.histogram.observe(duration.as_secs_f64());
        duration
    }
}

pub fn start_timer(histogram: &Histogram) -> Timer {
    Timer::new(histogram.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registry_creation() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config);
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_export() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        registry
            .fetch_requests_total
            .with_label_values(&["success"])
            .inc();

        let exported = registry.export().unwrap();
        assert!(exported.contains("fetch_ops_fetch_requests_total"));
    }

    #[test]
    fn test_tier_metrics() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        registry
            .tier_attempts_total
            .with_label_values(&["intelligence", "success"])
            .inc();

        registry
            .tier_fallbacks_total
            .with_label_values(&["intelligence", "lightweight"])
            .inc();

        let exported = registry.export().unwrap();
        assert!(exported.contains("fetch_ops_tier_attempts_total"));
        assert!(exported.contains("fetch_ops_tier_fallbacks_total"));
    }

    #[test]
    fn test_proxy_metrics() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        registry
            .proxy_assignments_total
            .with_label_values(&["datacenter"])
            .inc();

        registry
            .proxy_success_rate
            .with_label_values(&["p1", "datacenter"])
            .set(0.97);

        registry.proxies_available.with_label_values(&["datacenter"]).set(5);

        let exported = registry.export().unwrap();
        assert!(exported.contains("fetch_ops_proxy_assignments_total"));
        assert!(exported.contains("fetch_ops_proxy_success_rate"));
    }

    #[test]
    fn test_pattern_metrics() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        registry
            .pattern_health_transitions_total
            .with_label_values(&["healthy", "degraded"])
            .inc();

        registry.patterns_active.set(12);
        registry.patterns_archived_total.inc();

        let exported = registry.export().unwrap();
        assert!(exported.contains("fetch_ops_pattern_health_transitions_total"));
        assert!(exported.contains("fetch_ops_patterns_active"));
    }

    #[test]
    fn test_timer() {
        let config = MetricsConfig::default();
        let registry = MetricsRegistry::new(config).unwrap();

        let histogram = registry.fetch_duration_seconds.with_label_values(&["success"]);

        let timer = start_timer(&histogram);
        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.observe_duration();

        assert!(duration.as_millis() >= 10);
    }
}
