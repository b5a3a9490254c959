//! Narrow per-entity repositories, each a thin typed wrapper over a
//! [`KeyValueStore`]. Business logic in `proxy`, `learning`, and `trace`
//! depends only on these traits, never on a concrete backend.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{DomainGroup, DomainRisk, Pattern, ProxyHealth, Result, SiteQuirks};

use super::kv::KeyValueStore;

const NS_PROXY_HEALTH: &str = "proxy_health";
const NS_DOMAIN_RISK: &str = "domain_risk";
const NS_PATTERN: &str = "pattern";
const NS_QUIRKS: &str = "quirks";
const NS_GROUP: &str = "domain_group";

#[async_trait]
pub trait ProxyHealthRepository: Send + Sync {
    async fn get_health(&self, proxy_id: &str) -> Result<Option<ProxyHealth>>;
    async fn put_health(&self, health: &ProxyHealth) -> Result<()>;
    async fn list_health(&self) -> Result<Vec<ProxyHealth>>;
}

#[async_trait]
pub trait DomainRiskRepository: Send + Sync {
    async fn get_risk(&self, domain: &str) -> Result<Option<DomainRisk>>;
    async fn put_risk(&self, risk: &DomainRisk) -> Result<()>;
    async fn list_risks(&self) -> Result<Vec<DomainRisk>>;
}

#[async_trait]
pub trait PatternRepository: Send + Sync {
    async fn get_pattern(&self, id: uuid::Uuid) -> Result<Option<Pattern>>;
    async fn find_patterns_by_domain(&self, domain: &str) -> Result<Vec<Pattern>>;
    async fn put_pattern(&self, pattern: &Pattern) -> Result<()>;
    async fn list_patterns(&self) -> Result<Vec<Pattern>>;
}

#[async_trait]
pub trait QuirksRepository: Send + Sync {
    async fn get_quirks(&self, domain: &str) -> Result<Option<SiteQuirks>>;
    async fn put_quirks(&self, quirks: &SiteQuirks) -> Result<()>;
    async fn list_quirks(&self) -> Result<Vec<SiteQuirks>>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn get_group(&self, name: &str) -> Result<Option<DomainGroup>>;
    async fn put_group(&self, group: &DomainGroup) -> Result<()>;
    async fn list_groups(&self) -> Result<Vec<DomainGroup>>;
}

/// `KeyValueStore`-backed implementation shared by every repository trait
/// above; each method set operates in its own namespace so the store never
/// needs to know about entity types.
pub struct KvRepositories<S: KeyValueStore> {
    store: Arc<S>,
}

impl<S: KeyValueStore> KvRepositories<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: KeyValueStore> ProxyHealthRepository for KvRepositories<S> {
    async fn get_health(&self, proxy_id: &str) -> Result<Option<ProxyHealth>> {
        match self.store.get(NS_PROXY_HEALTH, proxy_id).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_health(&self, health: &ProxyHealth) -> Result<()> {
        debug!(proxy_id = %health.proxy_id, "persisting proxy health");
        let bytes = serde_json::to_vec(health)?;
        self.store.set(NS_PROXY_HEALTH, &health.proxy_id, bytes).await
    }

    async fn list_health(&self) -> Result<Vec<ProxyHealth>> {
        let keys = self.store.list_keys(NS_PROXY_HEALTH, None).await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.store.get(NS_PROXY_HEALTH, &key).await? {
                out.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl<S: KeyValueStore> DomainRiskRepository for KvRepositories<S> {
    async fn get_risk(&self, domain: &str) -> Result<Option<DomainRisk>> {
        match self.store.get(NS_DOMAIN_RISK, domain).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_risk(&self, risk: &DomainRisk) -> Result<()> {
        let bytes = serde_json::to_vec(risk)?;
        self.store.set(NS_DOMAIN_RISK, &risk.domain, bytes).await
    }

    async fn list_risks(&self) -> Result<Vec<DomainRisk>> {
        let keys = self.store.list_keys(NS_DOMAIN_RISK, None).await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.store.get(NS_DOMAIN_RISK, &key).await? {
                out.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl<S: KeyValueStore> PatternRepository for KvRepositories<S> {
    async fn get_pattern(&self, id: uuid::Uuid) -> Result<Option<Pattern>> {
        match self.store.get(NS_PATTERN, &id.to_string()).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_patterns_by_domain(&self, domain: &str) -> Result<Vec<Pattern>> {
        let all = self.list_patterns().await?;
        Ok(all.into_iter().filter(|p| p.domain == domain).collect())
    }

    async fn put_pattern(&self, pattern: &Pattern) -> Result<()> {
        let bytes = serde_json::to_vec(pattern)?;
        self.store.set(NS_PATTERN, &pattern.id.to_string(), bytes).await
    }

    async fn list_patterns(&self) -> Result<Vec<Pattern>> {
        let keys = self.store.list_keys(NS_PATTERN, None).await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.store.get(NS_PATTERN, &key).await? {
                out.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl<S: KeyValueStore> QuirksRepository for KvRepositories<S> {
    async fn get_quirks(&self, domain: &str) -> Result<Option<SiteQuirks>> {
        match self.store.get(NS_QUIRKS, domain).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_quirks(&self, quirks: &SiteQuirks) -> Result<()> {
        let bytes = serde_json::to_vec(quirks)?;
        self.store.set(NS_QUIRKS, &quirks.domain, bytes).await
    }

    async fn list_quirks(&self) -> Result<Vec<SiteQuirks>> {
        let keys = self.store.list_keys(NS_QUIRKS, None).await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.store.get(NS_QUIRKS, &key).await? {
                out.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl<S: KeyValueStore> GroupRepository for KvRepositories<S> {
    async fn get_group(&self, name: &str) -> Result<Option<DomainGroup>> {
        match self.store.get(NS_GROUP, name).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_group(&self, group: &DomainGroup) -> Result<()> {
        let bytes = serde_json::to_vec(group)?;
        self.store.set(NS_GROUP, &group.name, bytes).await
    }

    async fn list_groups(&self) -> Result<Vec<DomainGroup>> {
        let keys = self.store.list_keys(NS_GROUP, None).await?;
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(bytes) = self.store.get(NS_GROUP, &key).await? {
                out.push(serde_json::from_slice(&bytes)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::InMemoryKeyValueStore;

    #[tokio::test]
    async fn proxy_health_round_trips() {
        let repo = KvRepositories::new(Arc::new(InMemoryKeyValueStore::new()));
        let health = ProxyHealth::new("p1");
        repo.put_health(&health).await.unwrap();

        let fetched = repo.get_health("p1").await.unwrap().unwrap();
        assert_eq!(fetched.proxy_id, "p1");
        assert_eq!(repo.list_health().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn pattern_find_by_domain_filters() {
        let repo = KvRepositories::new(Arc::new(InMemoryKeyValueStore::new()));
        let p1 = Pattern::new("a.com", "/items", "GET", "/items/{id}");
        let p2 = Pattern::new("b.com", "/items", "GET", "/items/{id}");
        repo.put_pattern(&p1).await.unwrap();
        repo.put_pattern(&p2).await.unwrap();

        let found = repo.find_patterns_by_domain("a.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].domain, "a.com");
    }

    #[tokio::test]
    async fn domain_risk_missing_returns_none() {
        let repo = KvRepositories::new(Arc::new(InMemoryKeyValueStore::new()));
        assert!(repo.get_risk("nope.com").await.unwrap().is_none());
    }
}
