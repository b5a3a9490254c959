//! API Pattern Registry (spec §4.6): records observed request/response
//! shapes, finds a matching pattern for a URL, and transfers patterns
//! between similar domains.

use std::sync::Arc;

use crate::domain::{Pattern, PatternExample, Result};
use crate::storage::PatternRepository;

use super::events::{EventBus, PatternEvent};
use super::url_pattern::{generalize_path, match_path, PatternRegexCache};

const REGEX_CACHE_CAPACITY: usize = 1000;

pub struct PatternObservation {
    pub domain: String,
    pub endpoint_path: String,
    pub method: String,
    pub response_shape: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub pattern: Pattern,
    pub similarity: f64,
}

pub struct PatternRegistry<R: PatternRepository> {
    repo: Arc<R>,
    events: EventBus,
    regex_cache: PatternRegexCache,
}

impl<R: PatternRepository> PatternRegistry<R> {
    pub fn new(repo: Arc<R>, events: EventBus) -> Self {
        Self {
            repo,
            events,
            regex_cache: PatternRegexCache::new(REGEX_CACHE_CAPACITY),
        }
    }

    /// Subscribe to this registry's pattern lifecycle events (spec §4.6,
    /// consumed by the Domain Group Learner among others).
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<PatternEvent> {
        self.events.subscribe()
    }

    /// All non-archived patterns recorded for a domain, in no particular
    /// order. Used by the orchestrator's learned-preference tier selection
    /// (spec §4.1 step 4).
    pub async fn patterns_for_domain(&self, domain: &str) -> Result<Vec<Pattern>> {
        Ok(self
            .repo
            .find_patterns_by_domain(domain)
            .await?
            .into_iter()
            .filter(|p| !p.archived)
            .collect())
    }

    /// Records an observation, creating a new pattern if none matches this
    /// domain + generalized path yet, else updating the existing one's
    /// examples and stats.
    pub async fn record(&self, observation: PatternObservation) -> Result<Pattern> {
        let url_pattern = generalize_path(&observation.endpoint_path);
        let existing = self
            .repo
            .find_patterns_by_domain(&observation.domain)
            .await?
            .into_iter()
            .find(|p| p.url_pattern == url_pattern && p.method == observation.method);

        let mut pattern = match existing {
            Some(p) => p,
            None => {
                let mut p = Pattern::new(
                    &observation.domain,
                    &observation.endpoint_path,
                    &observation.method,
                    &url_pattern,
                );
                p.response_shape = observation.response_shape.clone();
                self.events.publish(PatternEvent::Created {
                    pattern_id: p.id,
                    domain: p.domain.clone(),
                    endpoint: p.endpoint.clone(),
                });
                p
            }
        };

        pattern.examples.push(PatternExample {
            url: observation.endpoint_path.clone(),
            recorded_at: chrono::Utc::now(),
        });
        pattern.stats.uses += 1;
        pattern.updated_at = chrono::Utc::now();

        self.repo.put_pattern(&pattern).await?;
        Ok(pattern)
    }

    /// Finds the best-matching pattern for `domain` + `path`, scored by how
    /// closely the concrete path matches the pattern's placeholders.
    pub async fn find(&self, domain: &str, path: &str) -> Result<Option<PatternMatch>> {
        let candidates = self.repo.find_patterns_by_domain(domain).await?;
        let mut best: Option<PatternMatch> = None;

        for pattern in candidates.into_iter().filter(|p| !p.archived) {
            if let Some(captures) = match_path(&self.regex_cache, &pattern.url_pattern, path) {
                let similarity = similarity_score(&pattern.url_pattern, path, captures.len());
                let is_better = best.as_ref().map(|b| similarity > b.similarity).unwrap_or(true);
                if is_better {
                    best = Some(PatternMatch { pattern, similarity });
                }
            }
        }

        if let Some(found) = &best {
            self.events.publish(PatternEvent::Used {
                pattern_id: found.pattern.id,
                domain: domain.to_string(),
                success: true,
            });
        }

        Ok(best)
    }

    /// Transfers a pattern learned on `source_domain` to `target_domain`,
    /// seeding a fresh pattern there with reduced confidence until it earns
    /// its own track record (spec §4.6).
    pub async fn transfer(&self, source_domain: &str, target_domain: &str, reason: &str) -> Result<Option<Pattern>> {
        let source_patterns = self.repo.find_patterns_by_domain(source_domain).await?;
        let mut transferred = None;

        for source in source_patterns.into_iter().filter(|p| !p.archived) {
            let mut clone = Pattern::new(
                target_domain,
                &source.endpoint,
                &source.method,
                &source.url_pattern,
            );
            clone.response_shape = source.response_shape.clone();
            clone.preferred_tier = source.preferred_tier;
            clone.source_domain = Some(source_domain.to_string());
            self.repo.put_pattern(&clone).await?;

            self.events.publish(PatternEvent::Transferred {
                source_domain: source_domain.to_string(),
                target_domain: target_domain.to_string(),
                reason: reason.to_string(),
                similarity: None,
                success: None,
            });

            if transferred.is_none() {
                transferred = Some(clone);
            }
        }

        Ok(transferred)
    }

    /// Reports whether a subsequent use of a transferred pattern succeeded,
    /// feeding the Domain Group Learner a real success/similarity signal for
    /// the pair the pattern was seeded from (spec §4.9: the learner's inputs
    /// are a stream of `pattern_transferred`/`pattern_used` outcomes, not the
    /// speculative seeding event alone). No-op for patterns not created via
    /// [`Self::transfer`].
    pub fn report_transfer_outcome(&self, pattern: &Pattern, success: bool, similarity: Option<f64>) {
        let Some(source_domain) = &pattern.source_domain else {
            return;
        };
        self.events.publish(PatternEvent::Transferred {
            source_domain: source_domain.clone(),
            target_domain: pattern.domain.clone(),
            reason: "pattern_used".to_string(),
            similarity,
            success: Some(success),
        });
    }

    pub async fn archive(&self, mut pattern: Pattern) -> Result<()> {
        pattern.archived = true;
        pattern.updated_at = chrono::Utc::now();
        self.events.publish(PatternEvent::Archived {
            pattern_id: pattern.id,
            domain: pattern.domain.clone(),
        });
        self.repo.put_pattern(&pattern).await
    }
}

/// More captured placeholders relative to path length implies a looser
/// match; fewer implies a tighter, more confident one. Clamped to `[0, 1]`.
fn similarity_score(pattern: &str, path: &str, capture_count: usize) -> f64 {
    let segment_count = path.split('/').filter(|s| !s.is_empty()).count().max(1);
    let specificity = 1.0 - (capture_count as f64 / segment_count as f64);
    let length_bonus = if pattern.len() == path.len() { 0.1 } else { 0.0 };
    (specificity + length_bonus).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryKeyValueStore, KvRepositories};

    fn registry() -> PatternRegistry<KvRepositories<InMemoryKeyValueStore>> {
        PatternRegistry::new(
            Arc::new(KvRepositories::new(Arc::new(InMemoryKeyValueStore::new()))),
            EventBus::new(),
        )
    }

    #[tokio::test]
    async fn record_then_find_same_url_matches() {
        let registry = registry();
        registry
            .record(PatternObservation {
                domain: "example.com".to_string(),
                endpoint_path: "/users/123".to_string(),
                method: "GET".to_string(),
                response_shape: None,
            })
            .await
            .unwrap();

        let found = registry.find("example.com", "/users/456").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn repeated_observation_reuses_pattern() {
        let registry = registry();
        registry
            .record(PatternObservation {
                domain: "example.com".to_string(),
                endpoint_path: "/users/123".to_string(),
                method: "GET".to_string(),
                response_shape: None,
            })
            .await
            .unwrap();
        let second = registry
            .record(PatternObservation {
                domain: "example.com".to_string(),
                endpoint_path: "/users/456".to_string(),
                method: "GET".to_string(),
                response_shape: None,
            })
            .await
            .unwrap();

        assert_eq!(second.stats.uses, 2);
    }

    #[tokio::test]
    async fn transfer_seeds_pattern_on_target_domain() {
        let registry = registry();
        registry
            .record(PatternObservation {
                domain: "shop-a.com".to_string(),
                endpoint_path: "/products/123".to_string(),
                method: "GET".to_string(),
                response_shape: None,
            })
            .await
            .unwrap();

        let transferred = registry
            .transfer("shop-a.com", "shop-b.com", "domain_group_learned")
            .await
            .unwrap();
        assert!(transferred.is_some());

        let found = registry.find("shop-b.com", "/products/999").await.unwrap();
        assert!(found.is_some());
    }
}
