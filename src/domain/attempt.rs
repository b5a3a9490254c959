use serde::{Deserialize, Serialize};

use super::error::FetchError;
use super::tier::Tier;

/// Outcome of a single tier attempt (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    ValidationFailed,
    TransportError,
    Timeout,
    SkippedByBudget,
    Blocked,
}

/// Coarse network statistics recorded per attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkStats {
    pub bytes_downloaded: u64,
    pub status_code: Option<u16>,
    pub redirects: u32,
}

/// One tier attempt within a request's decision trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub tier: Tier,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
    pub outcome: Outcome,
    pub error: Option<FetchError>,
    pub proxy_id: Option<String>,
    pub network_stats: NetworkStats,
}

impl Attempt {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}
