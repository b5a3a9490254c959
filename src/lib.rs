//! fetch-ops - a tiered, learning web-fetching engine for LLM agents.
//!
//! Fetches a URL through progressively more capable (and more expensive)
//! extraction tiers, routes through health-tracked proxy pools, and learns
//! per-domain behavior over time: API patterns, pattern health, site
//! quirks, and cross-domain transfer groups.

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod extract;
pub mod learning;
pub mod observability;
pub mod orchestrator;
pub mod proxy;
pub mod rendering;
pub mod storage;
pub mod trace;

pub use config::Config;

pub use domain::{
    apex_domain, registered_domain, Attempt, Budget, DecisionTrace, DomainGroup, DomainRisk,
    ErrorCategory, FetchError, FetchOptions, FetchResult, GeoPrefs, LinkData, NetworkStats,
    Outcome, Pattern, PatternHealth, PatternStatus, Proxy, ProxyHealth, ProxyTier,
    RecommendedAction, Request, Result, RiskLevel, SelectorAttempt, SiteQuirks, TableData, Tier,
    TitleAttempt, TitleSource,
};

pub use engine::{Engine, FeedbackVerdict};

pub use orchestrator::OrchestratorFailure;

pub use rendering::{RenderRequest, RenderResponse, RenderingBackend, RenderingBackends};

pub use storage::{InMemoryKeyValueStore, KeyValueStore, KvRepositories};

pub use trace::{query_traces, DebugRecorder, TraceFilter, TraceQueryMatch};

pub use learning::{EventBus, HealthNotification, PatternEvent};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes process-wide observability (structured logging/tracing)
/// using the given configuration's logging section. Call once at startup.
pub fn init(config: &Config) -> anyhow::Result<()> {
    let tracing_config = observability::TracingConfig {
        level: config.logging.level.clone(),
        ..Default::default()
    };
    observability::init_tracing(&tracing_config).map_err(|e| anyhow::anyhow!(e))
}
