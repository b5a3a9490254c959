//! Proxy Selector (spec §4.3): scores candidate proxies and picks the best
//! one for a request, honoring plan entitlements and the domain's
//! recommended minimum tier.

use crate::domain::{FetchError, Proxy, ProxyHealth, ProxyTier, Result};

use super::health::ProxyHealthTracker;
use crate::storage::ProxyHealthRepository;

/// A proxy is considered idle long enough to deserve a recency boost after
/// this long unused (spec §4.3).
const RECENCY_BOOST_AFTER_SECS: i64 = 60 * 60;

const WEIGHT_SUCCESS_RATE: f64 = 0.5;
const WEIGHT_LATENCY: f64 = 0.3;
const WEIGHT_RECENCY: f64 = 0.2;

/// Upper bound used to normalize latency into `[0, 1]` for scoring; proxies
/// slower than this are clamped rather than scored negative.
const LATENCY_NORMALIZATION_CEILING_MS: f64 = 5_000.0;

pub struct ProxySelector;

#[derive(Debug, Clone)]
pub struct ScoredProxy {
    pub proxy: Proxy,
    pub score: f64,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ProxySelector {
    /// Select the best proxy from `candidates`, already filtered to tiers
    /// the plan allows and `>= recommended_proxy_tier`, excluding any
    /// restricted by `preferred_tier`.
    pub async fn select<R: ProxyHealthRepository>(
        candidates: &[Proxy],
        recommended_proxy_tier: ProxyTier,
        allowed_tiers: &[ProxyTier],
        preferred_tier: Option<ProxyTier>,
        domain: &str,
        health_tracker: &ProxyHealthTracker<R>,
    ) -> Result<Proxy> {
        let mut scored: Vec<ScoredProxy> = Vec::new();

        for proxy in candidates {
            if !allowed_tiers.contains(&proxy.tier) {
                continue;
            }
            if proxy.tier < recommended_proxy_tier {
                continue;
            }
            if let Some(preferred) = preferred_tier {
                if proxy.tier != preferred {
                    continue;
                }
            }

            let health = health_tracker.get(&proxy.id).await?;
            if !ProxyHealthTracker::<R>::is_available_for(&health, domain) {
                continue;
            }

            let score = score_proxy(&health);
            scored.push(ScoredProxy {
                proxy: proxy.clone(),
                score,
                last_used_at: health.last_used_at,
            });
        }

        scored
            .into_iter()
            .max_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap()
                    .then_with(|| tiebreak_lru(a, b))
            })
            .map(|s| s.proxy)
            .ok_or(FetchError::NoProxyAvailable {
                hint: Some("tryLowerRecommendedTier".to_string()),
            })
    }
}

fn tiebreak_lru(a: &ScoredProxy, b: &ScoredProxy) -> std::cmp::Ordering {
    // Least-recently-used wins a tie; `None` (never used) is the most LRU.
    match (a.last_used_at, b.last_used_at) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (Some(_), None) => std::cmp::Ordering::Less,
        (Some(a_time), Some(b_time)) => b_time.cmp(&a_time),
    }
}

fn score_proxy(health: &ProxyHealth) -> f64 {
    let normalized_latency = (health.avg_latency_ms / LATENCY_NORMALIZATION_CEILING_MS).min(1.0);
    let recency_boost = recency_boost(health.last_used_at);

    WEIGHT_SUCCESS_RATE * health.success_rate
        + WEIGHT_LATENCY * (1.0 - normalized_latency)
        + WEIGHT_RECENCY * recency_boost
}

fn recency_boost(last_used_at: Option<chrono::DateTime<chrono::Utc>>) -> f64 {
    match last_used_at {
        None => 1.0,
        Some(last_used) => {
            let idle_secs = (chrono::Utc::now() - last_used).num_seconds();
            if idle_secs >= RECENCY_BOOST_AFTER_SECS {
                1.0
            } else {
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryKeyValueStore, KvRepositories};
    use std::sync::Arc;

    fn proxy(id: &str, tier: ProxyTier) -> Proxy {
        Proxy {
            id: id.to_string(),
            url: format!("http://{id}.proxy"),
            tier,
            country: None,
            is_residential: None,
        }
    }

    #[tokio::test]
    async fn empty_candidates_yields_no_proxy_available() {
        let tracker = ProxyHealthTracker::new(Arc::new(KvRepositories::new(Arc::new(
            InMemoryKeyValueStore::new(),
        ))));
        let result = ProxySelector::select(
            &[],
            ProxyTier::Datacenter,
            &[ProxyTier::Datacenter],
            None,
            "example.com",
            &tracker,
        )
        .await;
        assert!(matches!(result, Err(FetchError::NoProxyAvailable { .. })));
    }

    #[tokio::test]
    async fn filters_below_recommended_tier() {
        let tracker = ProxyHealthTracker::new(Arc::new(KvRepositories::new(Arc::new(
            InMemoryKeyValueStore::new(),
        ))));
        let candidates = vec![proxy("p1", ProxyTier::Datacenter)];
        let result = ProxySelector::select(
            &candidates,
            ProxyTier::Residential,
            &[ProxyTier::Datacenter, ProxyTier::Residential],
            None,
            "example.com",
            &tracker,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn picks_healthier_proxy() {
        let repo = Arc::new(KvRepositories::new(Arc::new(InMemoryKeyValueStore::new())));
        let tracker = ProxyHealthTracker::new(repo);
        tracker.report_failure("bad", "example.com").await.unwrap();
        tracker.report_success("good", "example.com", 50).await.unwrap();

        let candidates = vec![proxy("bad", ProxyTier::Datacenter), proxy("good", ProxyTier::Datacenter)];
        let selected = ProxySelector::select(
            &candidates,
            ProxyTier::Datacenter,
            &[ProxyTier::Datacenter],
            None,
            "example.com",
            &tracker,
        )
        .await
        .unwrap();
        assert_eq!(selected.id, "good");
    }
}
