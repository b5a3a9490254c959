//! Engine configuration (spec §6 "Configuration (recognized options, enumerated)").
//!
//! Loaded the way the teacher loads its own config: a typed struct with
//! serde defaults, overridable from a TOML file and the environment via
//! `figment`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::{ProxyTier, Result, Tier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyPoolsConfig {
    #[serde(default)]
    pub datacenter_urls: Vec<String>,
    #[serde(default)]
    pub isp_urls: Vec<String>,
    #[serde(default)]
    pub residential_urls: Vec<String>,
    #[serde(default)]
    pub premium_urls: Vec<String>,
    #[serde(default)]
    pub provider_session_rotation: bool,
}

impl Default for ProxyPoolsConfig {
    fn default() -> Self {
        Self {
            datacenter_urls: Vec::new(),
            isp_urls: Vec::new(),
            residential_urls: Vec::new(),
            premium_urls: Vec::new(),
            provider_session_rotation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    pub full_page_load_ms: u64,
    pub per_tier_attempt_ms: u64,
    pub selector_wait_ms: u64,
    pub script_execution_ms: u64,
    pub network_fetch_ms: u64,
    pub bot_challenge_wait_ms: u64,
    pub inter_step_ms: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            full_page_load_ms: 30_000,
            per_tier_attempt_ms: 30_000,
            selector_wait_ms: 5_000,
            script_execution_ms: 5_000,
            network_fetch_ms: 30_000,
            bot_challenge_wait_ms: 15_000,
            inter_step_ms: 400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetsConfig {
    pub max_latency_ms_default: Option<u64>,
    pub max_cost_tier_default: Option<Tier>,
}

impl Default for BudgetsConfig {
    fn default() -> Self {
        Self {
            max_latency_ms_default: None,
            max_cost_tier_default: None,
        }
    }
}

/// Plan → allowed proxy tiers (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTierMapConfig {
    pub free: Vec<ProxyTier>,
    pub starter: Vec<ProxyTier>,
    pub team: Vec<ProxyTier>,
    pub enterprise: Vec<ProxyTier>,
}

impl Default for PlanTierMapConfig {
    fn default() -> Self {
        use ProxyTier::*;
        Self {
            free: vec![Datacenter],
            starter: vec![Datacenter, Isp],
            team: vec![Datacenter, Isp, Residential],
            enterprise: vec![Datacenter, Isp, Residential, Premium],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugRecorderConfig {
    pub enabled: bool,
    #[serde(default)]
    pub always_record_domains: Vec<String>,
    #[serde(default)]
    pub never_record_domains: Vec<String>,
    pub only_record_failures: bool,
    pub max_traces: usize,
    pub max_age_hours: u64,
    pub max_storage_bytes: Option<u64>,
}

impl Default for DebugRecorderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            always_record_domains: Vec::new(),
            never_record_domains: Vec::new(),
            only_record_failures: false,
            max_traces: 10_000,
            max_age_hours: 24 * 7,
            max_storage_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    pub debounce_ms: u64,
    pub min_transfers_for_relationship: u32,
    pub min_success_rate: f64,
    pub min_group_size: usize,
    pub min_confidence_for_registration: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2_000,
            min_transfers_for_relationship: 2,
            min_success_rate: 0.6,
            min_group_size: 2,
            min_confidence_for_registration: 0.7,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub proxy_pools: ProxyPoolsConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub budgets: BudgetsConfig,
    #[serde(default)]
    pub plan_tier_map: PlanTierMapConfig,
    #[serde(default)]
    pub debug_recorder: DebugRecorderConfig,
    #[serde(default)]
    pub learning: LearningConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults and
    /// environment overrides (`FETCH_OPS__*`), mirroring the teacher's
    /// `Config::from_file` + figment-merge convention.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        use figment::providers::{Env, Format, Toml};
        use figment::Figment;

        let figment = Figment::from(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FETCH_OPS__").split("__"));

        figment
            .extract()
            .map_err(|e| crate::domain::FetchError::ConfigInvalidUrl(e.to_string()))
    }

    pub fn allowed_tiers(&self, plan: &str) -> Vec<ProxyTier> {
        match plan.to_uppercase().as_str() {
            "FREE" => self.plan_tier_map.free.clone(),
            "STARTER" => self.plan_tier_map.starter.clone(),
            "TEAM" => self.plan_tier_map.team.clone(),
            "ENTERPRISE" => self.plan_tier_map.enterprise.clone(),
            _ => self.plan_tier_map.free.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_map_matches_spec() {
        let config = Config::default();
        assert_eq!(config.allowed_tiers("FREE"), vec![ProxyTier::Datacenter]);
        assert_eq!(
            config.allowed_tiers("ENTERPRISE"),
            vec![
                ProxyTier::Datacenter,
                ProxyTier::Isp,
                ProxyTier::Residential,
                ProxyTier::Premium
            ]
        );
    }

    #[test]
    fn default_timeouts_match_spec_defaults() {
        let timeouts = TimeoutsConfig::default();
        assert_eq!(timeouts.full_page_load_ms, 30_000);
        assert_eq!(timeouts.selector_wait_ms, 5_000);
        assert_eq!(timeouts.bot_challenge_wait_ms, 15_000);
    }
}
