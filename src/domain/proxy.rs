use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Proxy tier, from cheapest to most expensive (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyTier {
    Datacenter,
    Isp,
    Residential,
    Premium,
}

impl ProxyTier {
    pub const ALL_ASCENDING: [ProxyTier; 4] = [
        ProxyTier::Datacenter,
        ProxyTier::Isp,
        ProxyTier::Residential,
        ProxyTier::Premium,
    ];

    /// Request-cost multiplier relative to a datacenter proxy (spec §4.2).
    pub fn cost_multiplier(&self) -> u32 {
        match self {
            ProxyTier::Datacenter => 1,
            ProxyTier::Isp => 5,
            ProxyTier::Residential => 25,
            ProxyTier::Premium => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyTier::Datacenter => "datacenter",
            ProxyTier::Isp => "isp",
            ProxyTier::Residential => "residential",
            ProxyTier::Premium => "premium",
        }
    }
}

impl std::fmt::Display for ProxyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable proxy registration (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proxy {
    pub id: String,
    pub url: String,
    pub tier: ProxyTier,
    pub country: Option<String>,
    pub is_residential: Option<bool>,
}

/// A named collection of homogeneous proxies of a single tier (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyPool {
    pub id: String,
    pub tier: ProxyTier,
    pub name: String,
    pub proxies: Vec<Proxy>,
}

/// Per-domain success/failure counters for one proxy (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerDomainHealth {
    pub successes: u64,
    pub failures: u64,
    /// Consecutive failures against this domain since the last success or
    /// block-clear, reset to 0 on any success (spec §4.4 domain block rule).
    #[serde(default)]
    pub consecutive_failures: u64,
    pub blocked_since: Option<chrono::DateTime<chrono::Utc>>,
}

/// Per-proxy health record (spec §3, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyHealth {
    pub proxy_id: String,
    pub total_requests: u64,
    pub total_success: u64,
    pub total_failures: u64,
    pub consecutive_failures: u32,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub is_in_cooldown: bool,
    pub cooldown_until: Option<chrono::DateTime<chrono::Utc>>,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub per_domain: HashMap<String, PerDomainHealth>,
    /// Running count of recorded latencies, capped at 100 samples for the
    /// rolling average (spec §4.4: "running average over last 100 uses").
    #[serde(default)]
    pub latency_sample_count: u32,
}

impl ProxyHealth {
    pub fn new(proxy_id: impl Into<String>) -> Self {
        Self {
            proxy_id: proxy_id.into(),
            total_requests: 0,
            total_success: 0,
            total_failures: 0,
            consecutive_failures: 0,
            success_rate: 1.0,
            avg_latency_ms: 0.0,
            is_in_cooldown: false,
            cooldown_until: None,
            last_used_at: None,
            per_domain: HashMap::new(),
            latency_sample_count: 0,
        }
    }

    /// Clear an expired cooldown. Cooldowns are time-bounded and auto-expire
    /// on next read (spec §4.4).
    pub fn refresh_cooldown(&mut self, now: chrono::DateTime<chrono::Utc>) {
        if let Some(until) = self.cooldown_until {
            if now >= until {
                self.is_in_cooldown = false;
                self.cooldown_until = None;
            }
        }
    }
}

/// Risk level for a domain (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Extreme,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskFactors {
    pub known_protection: Vec<String>,
    pub rate_limit_signals: u32,
    pub geo_signals: Vec<String>,
    pub bot_score: f64,
}

/// Derived classification of how hostile a domain is to automated fetching
/// (spec §3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRisk {
    pub domain: String,
    pub risk_level: RiskLevel,
    pub factors: RiskFactors,
    pub recommended_proxy_tier: ProxyTier,
    pub recommended_delay_ms: u64,
    pub last_observed_at: chrono::DateTime<chrono::Utc>,
    /// Consecutive clean observations since the last risk bump, used to
    /// decay the risk level by one step after N (default 20, spec §3).
    #[serde(default)]
    pub consecutive_clean_observations: u32,
}

impl DomainRisk {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            risk_level: RiskLevel::Low,
            factors: RiskFactors::default(),
            recommended_proxy_tier: ProxyTier::Datacenter,
            recommended_delay_ms: 0,
            last_observed_at: chrono::Utc::now(),
            consecutive_clean_observations: 0,
        }
    }
}
