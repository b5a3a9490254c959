use serde::{Deserialize, Serialize};

/// Extraction tier, ordered by cost (spec §3: `intelligence < lightweight < playwright`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Intelligence,
    Lightweight,
    Playwright,
}

impl Tier {
    pub const ALL_ASCENDING: [Tier; 3] = [Tier::Intelligence, Tier::Lightweight, Tier::Playwright];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Intelligence => "intelligence",
            Tier::Lightweight => "lightweight",
            Tier::Playwright => "playwright",
        }
    }

    /// Rough minimum latency estimate used for budget skip decisions.
    pub fn estimated_min_latency_ms(&self) -> u64 {
        match self {
            Tier::Intelligence => 200,
            Tier::Lightweight => 800,
            Tier::Playwright => 2500,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
