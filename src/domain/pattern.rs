use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Health status of a learned pattern (spec §3, §4.7). Transitions are
/// monotonic within a detection window; recovery opens a new epoch rather
/// than rewriting history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternStatus {
    Healthy,
    Degraded,
    Failing,
    Broken,
}

impl PatternStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternStatus::Healthy => "healthy",
            PatternStatus::Degraded => "degraded",
            PatternStatus::Failing => "failing",
            PatternStatus::Broken => "broken",
        }
    }
}

impl std::fmt::Display for PatternStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hourly health snapshot, at most one per hour per pattern, last 168 retained
/// (spec §3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub success_rate: f64,
    pub sample_size: usize,
}

/// Rule-based recommendation attached to a pattern's health state (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedPatternAction {
    RelearnPattern,
    SwitchTierPlaywright,
    EnableStealth,
    PausePattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternHealth {
    pub status: PatternStatus,
    pub current_success_rate: f64,
    pub consecutive_failures: u32,
    pub degradation_detected_at: Option<chrono::DateTime<chrono::Utc>>,
    pub history: VecDeque<HealthSnapshot>,
    pub recommended_actions: Vec<RecommendedPatternAction>,
}

impl PatternHealth {
    pub const MAX_SNAPSHOTS: usize = 168;

    pub fn new() -> Self {
        Self {
            status: PatternStatus::Healthy,
            current_success_rate: 1.0,
            consecutive_failures: 0,
            degradation_detected_at: None,
            history: VecDeque::new(),
            recommended_actions: Vec::new(),
        }
    }
}

impl Default for PatternHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Observed use of a pattern, used by both the health monitor and the
/// pattern store's aggregate stats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternStats {
    pub uses: u64,
    pub successes: u64,
}

/// A single extraction example recorded during learning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternExample {
    pub url: String,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

/// A learned API/selector pattern for one domain + endpoint (spec §3, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: Uuid,
    pub domain: String,
    pub endpoint: String,
    pub method: String,
    pub url_pattern: String,
    pub parameters: Vec<String>,
    pub response_shape: Option<serde_json::Value>,
    pub examples: Vec<PatternExample>,
    pub stats: PatternStats,
    pub health: PatternHealth,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Tier that most reliably serves this pattern, used by the orchestrator's
    /// learned-preference tier selection rule (spec §4.1 step 4).
    pub preferred_tier: Option<crate::domain::Tier>,
    /// Archived patterns are retained, never deleted (spec §3 lifecycle).
    #[serde(default)]
    pub archived: bool,
    /// Domain this pattern was seeded from, if created via
    /// [`crate::learning::PatternRegistry::transfer`] rather than observed
    /// directly (spec §4.9 cross-domain transfer tracking).
    #[serde(default)]
    pub source_domain: Option<String>,
}

impl Pattern {
    pub fn new(domain: impl Into<String>, endpoint: impl Into<String>, method: impl Into<String>, url_pattern: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: Uuid::new_v4(),
            domain: domain.into(),
            endpoint: endpoint.into(),
            method: method.into(),
            url_pattern: url_pattern.into(),
            parameters: Vec::new(),
            response_shape: None,
            examples: Vec::new(),
            stats: PatternStats::default(),
            health: PatternHealth::new(),
            created_at: now,
            updated_at: now,
            preferred_tier: None,
            archived: false,
            source_domain: None,
        }
    }
}

/// Per-domain behavioral quirks (spec §3, §4.8).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitQuirk {
    pub requests_per_second: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StealthQuirk {
    pub required: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiBotQuirk {
    pub kind: String,
    pub severity: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteQuirks {
    pub domain: String,
    pub required_headers: std::collections::HashMap<String, String>,
    pub rate_limit: Option<RateLimitQuirk>,
    pub stealth: Option<StealthQuirk>,
    pub anti_bot: Option<AntiBotQuirk>,
    pub response_transforms: Vec<String>,
    pub confidence: f64,
    pub learned_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_verified: Option<chrono::DateTime<chrono::Utc>>,
}

impl SiteQuirks {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }
}

/// Source of a learned domain group (spec §3, §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSource {
    Hardcoded,
    TransferLearning,
    Merged,
    SimilaritySuggestion,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupEvidence {
    pub transfers: u64,
    pub successes: u64,
    pub avg_similarity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainGroup {
    pub name: String,
    pub domains: Vec<String>,
    pub source: GroupSource,
    pub confidence: f64,
    pub evidence: GroupEvidence,
    pub registered: bool,
}
