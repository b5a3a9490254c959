//! Domain Group Learner (spec §4.9): watches pattern-transfer outcomes,
//! builds per-pair relationship strength, and clusters domains that
//! transfer well into each other into registered groups via iterative
//! union-find.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{DomainGroup, GroupEvidence, GroupSource, Result};
use crate::storage::GroupRepository;

const STRONG_MIN_SUCCESSES: u64 = 2;
const STRONG_MIN_SUCCESS_RATE: f64 = 0.6;
const AUTO_REGISTER_CONFIDENCE: f64 = 0.7;
const OVERLAP_MERGE_THRESHOLD: f64 = 0.7;
const SATURATION_TRANSFERS: f64 = 10.0;

fn normalize_domain(domain: &str) -> String {
    domain.trim().to_lowercase().strip_prefix("www.").unwrap_or(domain.trim()).to_lowercase()
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    let a = normalize_domain(a);
    let b = normalize_domain(b);
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Debug, Clone, Default)]
struct PairRelationship {
    count: u64,
    successes: u64,
    similarity_sum: f64,
    similarity_samples: u64,
    last_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl PairRelationship {
    fn success_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.successes as f64 / self.count as f64
        }
    }

    fn avg_similarity(&self) -> f64 {
        if self.similarity_samples == 0 {
            0.0
        } else {
            self.similarity_sum / self.similarity_samples as f64
        }
    }

    fn is_strong(&self) -> bool {
        self.successes >= STRONG_MIN_SUCCESSES && self.success_rate() >= STRONG_MIN_SUCCESS_RATE
    }
}

pub struct DomainGroupLearner<R: GroupRepository> {
    repo: Arc<R>,
    relationships: std::sync::Mutex<HashMap<(String, String), PairRelationship>>,
}

#[derive(Debug, Clone)]
pub struct GroupSuggestion {
    pub domains: Vec<String>,
    pub confidence: f64,
}

impl<R: GroupRepository> DomainGroupLearner<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            relationships: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Records one transfer outcome between two domains.
    pub fn observe_transfer(&self, source: &str, target: &str, success: bool, similarity: Option<f64>) {
        let key = pair_key(source, target);
        let mut relationships = self.relationships.lock().expect("relationships lock poisoned");
        let rel = relationships.entry(key).or_default();
        rel.count += 1;
        if success {
            rel.successes += 1;
        }
        if let Some(sim) = similarity {
            rel.similarity_sum += sim;
            rel.similarity_samples += 1;
        }
        rel.last_at = Some(chrono::Utc::now());
    }

    /// Runs union-find over all strong relationships and returns connected
    /// components of size >= 2 with their confidence (spec §4.9).
    pub fn candidate_groups(&self) -> Vec<GroupSuggestion> {
        let relationships = self.relationships.lock().expect("relationships lock poisoned");
        let strong: Vec<(&(String, String), &PairRelationship)> = relationships
            .iter()
            .filter(|(_, rel)| rel.is_strong())
            .collect();

        if strong.is_empty() {
            return Vec::new();
        }

        let mut domains: Vec<String> = Vec::new();
        let mut index_of: HashMap<String, usize> = HashMap::new();
        for ((a, b), _) in &strong {
            for d in [a, b] {
                if !index_of.contains_key(d) {
                    index_of.insert(d.clone(), domains.len());
                    domains.push(d.clone());
                }
            }
        }

        let mut uf = UnionFind::new(domains.len());
        for ((a, b), _) in &strong {
            uf.union(index_of[a], index_of[b]);
        }

        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..domains.len() {
            components.entry(uf.find(i)).or_default().push(i);
        }

        let total_edges = strong.len();
        components
            .into_values()
            .filter(|members| members.len() >= 2)
            .map(|members| {
                let member_domains: Vec<String> = members.iter().map(|i| domains[*i].clone()).collect();
                let confidence = component_confidence(&member_domains, &relationships, total_edges);
                GroupSuggestion {
                    domains: member_domains,
                    confidence,
                }
            })
            .collect()
    }

    /// Registers or suggests groups based on the current candidate
    /// clustering; groups at or above the registration confidence are
    /// written as `registered`, others as suggestions only.
    pub async fn reconcile(&self) -> Result<Vec<DomainGroup>> {
        let candidates = self.candidate_groups();
        let mut existing = self.repo.list_groups().await?;
        let mut written = Vec::new();

        for candidate in candidates {
            if let Some(overlap_target) = find_overlap(&existing, &candidate.domains) {
                if overlap_target.confidence >= candidate.confidence {
                    continue;
                }
            }

            let registered = candidate.confidence >= AUTO_REGISTER_CONFIDENCE;
            let name = group_name(&candidate.domains);
            let group = DomainGroup {
                name: name.clone(),
                domains: candidate.domains,
                source: GroupSource::TransferLearning,
                confidence: candidate.confidence,
                evidence: GroupEvidence::default(),
                registered,
            };
            self.repo.put_group(&group).await?;
            existing.push(group.clone());
            written.push(group);
        }

        Ok(written)
    }
}

fn find_overlap<'a>(existing: &'a [DomainGroup], candidate_domains: &[String]) -> Option<&'a DomainGroup> {
    existing.iter().find(|group| {
        let overlap = group
            .domains
            .iter()
            .filter(|d| candidate_domains.contains(d))
            .count();
        let smaller = group.domains.len().min(candidate_domains.len()).max(1);
        (overlap as f64 / smaller as f64) >= OVERLAP_MERGE_THRESHOLD
    })
}

fn group_name(domains: &[String]) -> String {
    let mut sorted = domains.to_vec();
    sorted.sort();
    sorted.join("+")
}

/// Confidence = weighted combination of success rate, saturating transfer
/// volume, graph density, and average similarity (spec §4.9).
fn component_confidence(
    members: &[String],
    relationships: &HashMap<(String, String), PairRelationship>,
    total_edges_in_graph: usize,
) -> f64 {
    let mut pair_count = 0usize;
    let mut total_successes = 0u64;
    let mut rate_sum = 0.0;
    let mut similarity_sum = 0.0;
    let mut similarity_samples = 0usize;

    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            let key = pair_key(&members[i], &members[j]);
            if let Some(rel) = relationships.get(&key) {
                pair_count += 1;
                total_successes += rel.successes;
                rate_sum += rel.success_rate();
                if rel.similarity_samples > 0 {
                    similarity_sum += rel.avg_similarity();
                    similarity_samples += 1;
                }
            }
        }
    }

    if pair_count == 0 {
        return 0.0;
    }

    let avg_rate = rate_sum / pair_count as f64;
    let volume_factor = (total_successes as f64 / SATURATION_TRANSFERS).min(1.0);
    let max_possible_edges = members.len() * (members.len() - 1) / 2;
    let density = pair_count as f64 / max_possible_edges.max(1) as f64;
    let avg_similarity = if similarity_samples > 0 {
        similarity_sum / similarity_samples as f64
    } else {
        0.5
    };
    let _ = total_edges_in_graph;

    (0.4 * avg_rate + 0.25 * volume_factor + 0.15 * density + 0.2 * avg_similarity).clamp(0.0, 1.0)
}

/// Iterative union-find with path compression and union-by-rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryKeyValueStore, KvRepositories};

    fn learner() -> DomainGroupLearner<KvRepositories<InMemoryKeyValueStore>> {
        DomainGroupLearner::new(Arc::new(KvRepositories::new(Arc::new(
            InMemoryKeyValueStore::new(),
        ))))
    }

    #[test]
    fn union_find_merges_connected_components() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 1);
        uf.union(1, 2);
        assert_eq!(uf.find(0), uf.find(2));
        assert_ne!(uf.find(0), uf.find(3));
    }

    #[test]
    fn weak_relationships_produce_no_candidate_groups() {
        let learner = learner();
        learner.observe_transfer("a.com", "b.com", false, Some(0.5));
        assert!(learner.candidate_groups().is_empty());
    }

    #[test]
    fn strong_relationship_forms_a_group() {
        let learner = learner();
        learner.observe_transfer("shop-a.com", "shop-b.com", true, Some(0.8));
        learner.observe_transfer("shop-a.com", "shop-b.com", true, Some(0.8));
        learner.observe_transfer("shop-a.com", "shop-b.com", true, Some(0.9));

        let groups = learner.candidate_groups();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].domains.contains(&"shop-a.com".to_string()));
        assert!(groups[0].confidence >= AUTO_REGISTER_CONFIDENCE);
    }

    #[tokio::test]
    async fn reconcile_registers_high_confidence_group() {
        let learner = learner();
        for _ in 0..5 {
            learner.observe_transfer("shop-a.com", "shop-b.com", true, Some(0.9));
        }
        let groups = learner.reconcile().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert!(groups[0].registered);
    }

    #[test]
    fn domain_normalization_strips_www_and_case() {
        assert_eq!(normalize_domain("WWW.Example.com"), "example.com");
    }
}
