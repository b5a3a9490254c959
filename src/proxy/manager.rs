//! Proxy Manager (spec §4.2): owns the proxy pools, wires the selector and
//! health tracker together, and is the one surface the orchestrator talks
//! to for anything proxy-related.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Config, ProxyPoolsConfig};
use crate::domain::{Proxy, ProxyTier, Result};
use crate::storage::ProxyHealthRepository;

use super::health::ProxyHealthTracker;
use super::selector::ProxySelector;

pub struct ProxyManager<R: ProxyHealthRepository> {
    pools: HashMap<ProxyTier, Vec<Proxy>>,
    health: ProxyHealthTracker<R>,
    plan_tier_map: Arc<Config>,
}

impl<R: ProxyHealthRepository> ProxyManager<R> {
    pub fn new(config: Arc<Config>, health_repo: Arc<R>) -> Self {
        let pools = build_pools(&config.proxy_pools);
        Self {
            pools,
            health: ProxyHealthTracker::new(health_repo),
            plan_tier_map: config,
        }
    }

    /// Tiers this plan is entitled to, intersected with tiers that actually
    /// have at least one configured proxy (spec §4.2 `getAvailableTiers`).
    pub fn available_tiers(&self, plan: &str) -> Vec<ProxyTier> {
        self.plan_tier_map
            .allowed_tiers(plan)
            .into_iter()
            .filter(|tier| self.pools.get(tier).is_some_and(|p| !p.is_empty()))
            .collect()
    }

    /// `calculateRequestCost`: relative cost multiplier of serving a request
    /// from the given tier (spec §4.2).
    pub fn calculate_request_cost(&self, tier: ProxyTier) -> u32 {
        tier.cost_multiplier()
    }

    pub async fn get_proxy(
        &self,
        plan: &str,
        domain: &str,
        recommended_proxy_tier: ProxyTier,
        preferred_tier: Option<ProxyTier>,
    ) -> Result<Proxy> {
        let allowed = self.plan_tier_map.allowed_tiers(plan);
        let candidates = self.candidates_for(&allowed);
        ProxySelector::select(
            &candidates,
            recommended_proxy_tier,
            &allowed,
            preferred_tier,
            domain,
            &self.health,
        )
        .await
    }

    /// Second attempt at a proxy for the same request, excluding the one
    /// that just failed (spec §4.2 `getFallbackProxy`).
    pub async fn get_fallback_proxy(
        &self,
        plan: &str,
        domain: &str,
        recommended_proxy_tier: ProxyTier,
        exclude_proxy_id: &str,
    ) -> Result<Proxy> {
        let allowed = self.plan_tier_map.allowed_tiers(plan);
        let candidates: Vec<Proxy> = self
            .candidates_for(&allowed)
            .into_iter()
            .filter(|p| p.id != exclude_proxy_id)
            .collect();
        ProxySelector::select(
            &candidates,
            recommended_proxy_tier,
            &allowed,
            None,
            domain,
            &self.health,
        )
        .await
    }

    pub async fn report_success(&self, proxy_id: &str, domain: &str, latency_ms: u64) -> Result<()> {
        self.health.report_success(proxy_id, domain, latency_ms).await?;
        Ok(())
    }

    pub async fn report_failure(&self, proxy_id: &str, domain: &str) -> Result<()> {
        self.health.report_failure(proxy_id, domain).await?;
        Ok(())
    }

    /// Protection (CAPTCHA/WAF challenge) detected on this proxy+domain:
    /// treated as a failure plus an immediate cooldown, since the signal is
    /// stronger than an ordinary transport failure.
    pub async fn report_protection_detected(&self, proxy_id: &str, domain: &str) -> Result<()> {
        self.health.report_failure(proxy_id, domain).await?;
        self.health
            .force_cooldown(proxy_id, chrono::Duration::minutes(5))
            .await
    }

    pub async fn force_proxy_cooldown(&self, proxy_id: &str, duration: chrono::Duration) -> Result<()> {
        self.health.force_cooldown(proxy_id, duration).await
    }

    pub async fn clear_proxy_cooldown(&self, proxy_id: &str) -> Result<()> {
        self.health.clear_cooldown(proxy_id).await
    }

    pub async fn clear_domain_blocks(&self, proxy_id: &str, domain: &str) -> Result<()> {
        self.health.clear_domain_blocks(proxy_id, domain).await
    }

    pub async fn proxy_health(&self, proxy_id: &str) -> Result<crate::domain::ProxyHealth> {
        self.health.get(proxy_id).await
    }

    /// Pool size per tier, for admin/ops visibility (spec §6 `getProxyPoolStats`).
    pub fn pool_stats(&self) -> HashMap<ProxyTier, usize> {
        self.pools.iter().map(|(tier, proxies)| (*tier, proxies.len())).collect()
    }

    fn candidates_for(&self, allowed: &[ProxyTier]) -> Vec<Proxy> {
        allowed
            .iter()
            .filter_map(|tier| self.pools.get(tier))
            .flatten()
            .cloned()
            .collect()
    }
}

fn build_pools(config: &ProxyPoolsConfig) -> HashMap<ProxyTier, Vec<Proxy>> {
    let mut pools = HashMap::new();
    pools.insert(
        ProxyTier::Datacenter,
        proxies_from_urls(&config.datacenter_urls, ProxyTier::Datacenter),
    );
    pools.insert(
        ProxyTier::Isp,
        proxies_from_urls(&config.isp_urls, ProxyTier::Isp),
    );
    pools.insert(
        ProxyTier::Residential,
        proxies_from_urls(&config.residential_urls, ProxyTier::Residential),
    );
    pools.insert(
        ProxyTier::Premium,
        proxies_from_urls(&config.premium_urls, ProxyTier::Premium),
    );
    pools
}

fn proxies_from_urls(urls: &[String], tier: ProxyTier) -> Vec<Proxy> {
    urls.iter()
        .enumerate()
        .map(|(i, url)| Proxy {
            id: format!("{tier}-{i}"),
            url: url.clone(),
            tier,
            country: None,
            is_residential: Some(tier == ProxyTier::Residential),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryKeyValueStore, KvRepositories};

    fn manager_with(config: Config) -> ProxyManager<KvRepositories<InMemoryKeyValueStore>> {
        ProxyManager::new(
            Arc::new(config),
            Arc::new(KvRepositories::new(Arc::new(InMemoryKeyValueStore::new()))),
        )
    }

    fn config_with_datacenter() -> Config {
        let mut config = Config::default();
        config.proxy_pools.datacenter_urls = vec!["http://dc1.example".to_string()];
        config
    }

    #[tokio::test]
    async fn free_plan_gets_datacenter_proxy() {
        let manager = manager_with(config_with_datacenter());
        let proxy = manager
            .get_proxy("FREE", "example.com", ProxyTier::Datacenter, None)
            .await
            .unwrap();
        assert_eq!(proxy.tier, ProxyTier::Datacenter);
    }

    #[tokio::test]
    async fn free_plan_cannot_reach_residential() {
        let mut config = config_with_datacenter();
        config.proxy_pools.residential_urls = vec!["http://res1.example".to_string()];
        let manager = manager_with(config);
        let result = manager
            .get_proxy("FREE", "example.com", ProxyTier::Residential, None)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn available_tiers_excludes_empty_pools() {
        let manager = manager_with(config_with_datacenter());
        let tiers = manager.available_tiers("ENTERPRISE");
        assert_eq!(tiers, vec![ProxyTier::Datacenter]);
    }

    #[tokio::test]
    async fn fallback_proxy_excludes_failed_one() {
        let mut config = config_with_datacenter();
        config.proxy_pools.datacenter_urls.push("http://dc2.example".to_string());
        let manager = manager_with(config);
        let first = manager
            .get_proxy("FREE", "example.com", ProxyTier::Datacenter, None)
            .await
            .unwrap();
        let fallback = manager
            .get_fallback_proxy("FREE", "example.com", ProxyTier::Datacenter, &first.id)
            .await
            .unwrap();
        assert_ne!(fallback.id, first.id);
    }
}
