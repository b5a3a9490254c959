//! Proxy Health Tracker (spec §4.4): rolling success/failure counters, an
//! EWMA'd success rate, cooldowns on repeated failure, and per-domain
//! blocks for proxies that keep failing the same site.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{ProxyHealth, Result};
use crate::storage::ProxyHealthRepository;

/// Decay factor for the success-rate EWMA. Chosen to weight roughly the
/// last ~10 requests most heavily while still remembering older history.
const EWMA_ALPHA: f64 = 0.9;

/// Rolling window for `avg_latency_ms` (spec §4.4: "running average over
/// last 100 uses").
const LATENCY_SAMPLE_CAP: u32 = 100;

/// Consecutive failures before a proxy enters cooldown.
const COOLDOWN_FAILURE_THRESHOLD: u32 = 3;
const COOLDOWN_BASE_SECS: i64 = 60;
const COOLDOWN_MAX_SECS: i64 = 30 * 60;

/// Consecutive same-domain failures before the proxy is blocked on that
/// domain specifically.
const DOMAIN_BLOCK_FAILURE_THRESHOLD: u64 = 5;
const DOMAIN_BLOCK_DURATION_SECS: i64 = 60 * 60;

pub struct ProxyHealthTracker<R: ProxyHealthRepository> {
    repo: Arc<R>,
}

impl<R: ProxyHealthRepository> ProxyHealthTracker<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    async fn load_or_new(&self, proxy_id: &str) -> Result<ProxyHealth> {
        Ok(self
            .repo
            .get_health(proxy_id)
            .await?
            .unwrap_or_else(|| ProxyHealth::new(proxy_id)))
    }

    /// Current health, with any expired cooldown cleared (spec §4.4:
    /// "cooldowns auto-expire on read").
    pub async fn get(&self, proxy_id: &str) -> Result<ProxyHealth> {
        let mut health = self.load_or_new(proxy_id).await?;
        health.refresh_cooldown(chrono::Utc::now());
        Ok(health)
    }

    pub async fn report_success(&self, proxy_id: &str, domain: &str, latency_ms: u64) -> Result<ProxyHealth> {
        let mut health = self.load_or_new(proxy_id).await?;
        let now = chrono::Utc::now();
        health.refresh_cooldown(now);

        health.total_requests += 1;
        health.total_success += 1;
        health.consecutive_failures = 0;
        health.last_used_at = Some(now);
        health.success_rate = ewma(health.success_rate, 1.0);
        health.avg_latency_ms = rolling_average(
            health.avg_latency_ms,
            health.latency_sample_count,
            latency_ms as f64,
        );
        health.latency_sample_count = (health.latency_sample_count + 1).min(LATENCY_SAMPLE_CAP);

        let per_domain = health.per_domain.entry(domain.to_string()).or_default();
        per_domain.successes += 1;
        per_domain.consecutive_failures = 0;
        per_domain.blocked_since = None;

        self.repo.put_health(&health).await?;
        Ok(health)
    }

    pub async fn report_failure(&self, proxy_id: &str, domain: &str) -> Result<ProxyHealth> {
        let mut health = self.load_or_new(proxy_id).await?;
        let now = chrono::Utc::now();
        health.refresh_cooldown(now);

        health.total_requests += 1;
        health.total_failures += 1;
        health.consecutive_failures += 1;
        health.last_used_at = Some(now);
        health.success_rate = ewma(health.success_rate, 0.0);

        if health.consecutive_failures >= COOLDOWN_FAILURE_THRESHOLD {
            let exponent = health.consecutive_failures - COOLDOWN_FAILURE_THRESHOLD;
            let secs = (COOLDOWN_BASE_SECS * 2i64.pow(exponent)).min(COOLDOWN_MAX_SECS);
            health.is_in_cooldown = true;
            health.cooldown_until = Some(now + chrono::Duration::seconds(secs));
            debug!(proxy_id, secs, "proxy entering cooldown");
        }

        let per_domain = health.per_domain.entry(domain.to_string()).or_default();
        per_domain.failures += 1;
        per_domain.consecutive_failures += 1;

        if per_domain.consecutive_failures >= DOMAIN_BLOCK_FAILURE_THRESHOLD && per_domain.blocked_since.is_none() {
            per_domain.blocked_since = Some(now);
            warn!(proxy_id, domain, "proxy blocked on domain after repeated failures");
        }

        self.repo.put_health(&health).await?;
        Ok(health)
    }

    pub async fn force_cooldown(&self, proxy_id: &str, duration: chrono::Duration) -> Result<()> {
        let mut health = self.load_or_new(proxy_id).await?;
        health.is_in_cooldown = true;
        health.cooldown_until = Some(chrono::Utc::now() + duration);
        self.repo.put_health(&health).await
    }

    pub async fn clear_cooldown(&self, proxy_id: &str) -> Result<()> {
        let mut health = self.load_or_new(proxy_id).await?;
        health.is_in_cooldown = false;
        health.cooldown_until = None;
        health.consecutive_failures = 0;
        self.repo.put_health(&health).await
    }

    pub async fn clear_domain_blocks(&self, proxy_id: &str, domain: &str) -> Result<()> {
        let mut health = self.load_or_new(proxy_id).await?;
        if let Some(per_domain) = health.per_domain.get_mut(domain) {
            per_domain.blocked_since = None;
            per_domain.failures = 0;
            per_domain.consecutive_failures = 0;
        }
        self.repo.put_health(&health).await
    }

    /// Is this proxy currently usable against `domain`: not in cooldown and
    /// not blocked on this specific domain.
    pub fn is_available_for(health: &ProxyHealth, domain: &str) -> bool {
        if health.is_in_cooldown {
            return false;
        }
        match health.per_domain.get(domain) {
            Some(per_domain) => per_domain.blocked_since.is_none(),
            None => true,
        }
    }
}

fn ewma(previous: f64, sample: f64) -> f64 {
    EWMA_ALPHA * previous + (1.0 - EWMA_ALPHA) * sample
}

fn rolling_average(previous_avg: f64, sample_count: u32, new_sample: f64) -> f64 {
    let n = sample_count.min(LATENCY_SAMPLE_CAP) as f64;
    if n == 0.0 {
        new_sample
    } else {
        (previous_avg * n + new_sample) / (n + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryKeyValueStore, KvRepositories};

    fn tracker() -> ProxyHealthTracker<KvRepositories<InMemoryKeyValueStore>> {
        ProxyHealthTracker::new(Arc::new(KvRepositories::new(Arc::new(
            InMemoryKeyValueStore::new(),
        ))))
    }

    #[tokio::test]
    async fn success_resets_consecutive_failures() {
        let tracker = tracker();
        tracker.report_failure("p1", "example.com").await.unwrap();
        let health = tracker.report_success("p1", "example.com", 100).await.unwrap();
        assert_eq!(health.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn cooldown_engages_after_threshold() {
        let tracker = tracker();
        for _ in 0..3 {
            tracker.report_failure("p1", "example.com").await.unwrap();
        }
        let health = tracker.get("p1").await.unwrap();
        assert!(health.is_in_cooldown);
    }

    #[tokio::test]
    async fn domain_block_after_five_consecutive_failures() {
        let tracker = tracker();
        for _ in 0..5 {
            tracker.report_failure("p1", "example.com").await.unwrap();
        }
        let health = tracker.get("p1").await.unwrap();
        assert!(!ProxyHealthTracker::<KvRepositories<InMemoryKeyValueStore>>::is_available_for(
            &health,
            "example.com"
        ));
    }

    #[tokio::test]
    async fn domain_block_retriggers_after_an_intervening_success() {
        let tracker = tracker();
        tracker.report_success("p1", "example.com", 50).await.unwrap();
        for _ in 0..5 {
            tracker.report_failure("p1", "example.com").await.unwrap();
        }
        let health = tracker.get("p1").await.unwrap();
        assert!(!ProxyHealthTracker::<KvRepositories<InMemoryKeyValueStore>>::is_available_for(
            &health,
            "example.com"
        ));
    }

    #[tokio::test]
    async fn fresh_proxy_is_available() {
        let tracker = tracker();
        let health = tracker.get("p1").await.unwrap();
        assert!(ProxyHealthTracker::<KvRepositories<InMemoryKeyValueStore>>::is_available_for(
            &health,
            "example.com"
        ));
    }
}
