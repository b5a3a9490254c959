//! Domain Risk Classifier (spec §4.5): turns WAF signals, HTTP status
//! history and a hardcoded extreme-risk list into a recommended proxy
//! tier and request delay for a domain.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{DomainRisk, ProxyTier, Result, RiskLevel};
use crate::storage::DomainRiskRepository;

/// Domains whose risk always floors at `extreme` regardless of observed
/// history (spec §4.5): major search engines, social platforms, and
/// marketplaces that aggressively fingerprint automated traffic.
const HARDCODED_EXTREME_DOMAINS: &[&str] = &[
    "google.com",
    "facebook.com",
    "instagram.com",
    "linkedin.com",
    "amazon.com",
    "twitter.com",
    "x.com",
];

const WAF_HEADER_MARKERS: &[&str] = &["cf-ray", "x-amz-cf-id"];

/// Window of recent observations used for the 403/429 rate signal.
const OBSERVATION_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy)]
pub enum Observation {
    Success { status: u16 },
    Failure { status: Option<u16> },
}

pub struct DomainRiskClassifier<R: DomainRiskRepository> {
    repo: Arc<R>,
}

impl<R: DomainRiskRepository> DomainRiskClassifier<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, domain: &str) -> Result<DomainRisk> {
        Ok(self
            .repo
            .get_risk(domain)
            .await?
            .unwrap_or_else(|| DomainRisk::new(domain)))
    }

    /// Records one observation (response headers + status), recomputing
    /// risk level and recommendations.
    pub async fn observe(
        &self,
        domain: &str,
        headers: &HashMap<String, String>,
        status: u16,
        recent_statuses: &[u16],
        historical_success_rate_by_tier: &HashMap<ProxyTier, f64>,
    ) -> Result<DomainRisk> {
        let mut risk = self.get(domain).await?;
        risk.last_observed_at = chrono::Utc::now();

        let waf_detected = headers
            .keys()
            .any(|h| WAF_HEADER_MARKERS.iter().any(|m| h.eq_ignore_ascii_case(m)));
        if waf_detected {
            let marker = "waf_headers_present".to_string();
            if !risk.factors.known_protection.contains(&marker) {
                risk.factors.known_protection.push(marker);
            }
        }

        let recent: Vec<u16> = recent_statuses
            .iter()
            .rev()
            .take(OBSERVATION_WINDOW)
            .copied()
            .collect();
        let blocked_count = recent.iter().filter(|s| **s == 403 || **s == 429).count();
        risk.factors.rate_limit_signals = blocked_count as u32;

        let is_hardcoded_extreme = HARDCODED_EXTREME_DOMAINS
            .iter()
            .any(|d| domain == *d || domain.ends_with(&format!(".{d}")));

        let observed_level = classify_level(waf_detected, blocked_count, recent.len());
        risk.risk_level = if is_hardcoded_extreme {
            RiskLevel::Extreme
        } else {
            observed_level
        };

        if status == 403 || status == 429 {
            risk.consecutive_clean_observations = 0;
        } else {
            risk.consecutive_clean_observations += 1;
        }

        risk.recommended_proxy_tier =
            recommended_tier(risk.risk_level, historical_success_rate_by_tier, status);
        risk.recommended_delay_ms = recommended_delay_ms(risk.risk_level);

        self.repo.put_risk(&risk).await?;
        Ok(risk)
    }

    /// Transfers a learned risk signature from one domain to another, used
    /// when the Domain Group Learner establishes a relationship between
    /// sites (spec §4.5 "learned transfers from SiteQuirks/PatternHealth").
    pub async fn transfer(&self, source_domain: &str, target_domain: &str) -> Result<DomainRisk> {
        let source = self.get(source_domain).await?;
        let mut target = self.get(target_domain).await?;
        target.risk_level = source.risk_level;
        target.recommended_proxy_tier = source.recommended_proxy_tier;
        target.recommended_delay_ms = source.recommended_delay_ms;
        self.repo.put_risk(&target).await?;
        Ok(target)
    }
}

fn classify_level(waf_detected: bool, blocked_count: usize, window_len: usize) -> RiskLevel {
    if window_len == 0 {
        return if waf_detected { RiskLevel::Medium } else { RiskLevel::Low };
    }
    let blocked_rate = blocked_count as f64 / window_len as f64;
    match (waf_detected, blocked_rate) {
        (true, rate) if rate >= 0.3 => RiskLevel::Extreme,
        (true, _) => RiskLevel::High,
        (false, rate) if rate >= 0.5 => RiskLevel::Extreme,
        (false, rate) if rate >= 0.2 => RiskLevel::High,
        (false, rate) if rate >= 0.05 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Cheapest tier with historical success >= 0.7, else one tier above the
/// last failed status's implied tier (spec §4.5).
fn recommended_tier(
    risk_level: RiskLevel,
    historical_success_rate_by_tier: &HashMap<ProxyTier, f64>,
    last_status: u16,
) -> ProxyTier {
    for tier in ProxyTier::ALL_ASCENDING {
        if historical_success_rate_by_tier
            .get(&tier)
            .copied()
            .unwrap_or(0.0)
            >= 0.7
        {
            return tier;
        }
    }

    if last_status == 403 || last_status == 429 {
        let floor = match risk_level {
            RiskLevel::Low => ProxyTier::Datacenter,
            RiskLevel::Medium => ProxyTier::Isp,
            RiskLevel::High => ProxyTier::Residential,
            RiskLevel::Extreme => ProxyTier::Premium,
        };
        return floor;
    }

    match risk_level {
        RiskLevel::Extreme => ProxyTier::Premium,
        RiskLevel::High => ProxyTier::Residential,
        RiskLevel::Medium => ProxyTier::Isp,
        RiskLevel::Low => ProxyTier::Datacenter,
    }
}

fn recommended_delay_ms(risk_level: RiskLevel) -> u64 {
    match risk_level {
        RiskLevel::Low => 0,
        RiskLevel::Medium => 500,
        RiskLevel::High => 2000,
        RiskLevel::Extreme => 5000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryKeyValueStore, KvRepositories};
    use std::sync::Arc;

    fn classifier() -> DomainRiskClassifier<KvRepositories<InMemoryKeyValueStore>> {
        DomainRiskClassifier::new(Arc::new(KvRepositories::new(Arc::new(
            InMemoryKeyValueStore::new(),
        ))))
    }

    #[tokio::test]
    async fn hardcoded_extreme_domain_floors_risk() {
        let classifier = classifier();
        let risk = classifier
            .observe("google.com", &HashMap::new(), 200, &[], &HashMap::new())
            .await
            .unwrap();
        assert_eq!(risk.risk_level, RiskLevel::Extreme);
        assert_eq!(risk.recommended_proxy_tier, ProxyTier::Premium);
        assert_eq!(risk.recommended_delay_ms, 5000);
    }

    #[tokio::test]
    async fn waf_header_raises_risk() {
        let classifier = classifier();
        let mut headers = HashMap::new();
        headers.insert("cf-ray".to_string(), "abc123".to_string());
        let risk = classifier
            .observe("shop.example.com", &headers, 200, &[], &HashMap::new())
            .await
            .unwrap();
        assert!(!risk.factors.known_protection.is_empty());
    }

    #[tokio::test]
    async fn clean_domain_stays_low_risk() {
        let classifier = classifier();
        let risk = classifier
            .observe("example.com", &HashMap::new(), 200, &[200, 200, 200], &HashMap::new())
            .await
            .unwrap();
        assert_eq!(risk.risk_level, RiskLevel::Low);
        assert_eq!(risk.recommended_delay_ms, 0);
    }
}
