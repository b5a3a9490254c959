use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attempt::Attempt;
use super::tier::Tier;

/// One selector tried during content extraction (title or body container).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorAttempt {
    pub selector: String,
    pub matched: bool,
    pub confidence: f64,
    pub selected: bool,
}

/// One title-extraction strategy tried, in source-preference order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleAttempt {
    pub source: TitleSource,
    pub value: Option<String>,
    pub confidence: f64,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleSource {
    OgTitle,
    TitleTag,
    H1,
    Unknown,
}

impl TitleSource {
    pub fn base_confidence(&self) -> f64 {
        match self {
            TitleSource::OgTitle => 0.95,
            TitleSource::TitleTag => 0.85,
            TitleSource::H1 => 0.70,
            TitleSource::Unknown => 0.00,
        }
    }
}

/// Append-only record for one request (spec §3, §4.11).
///
/// Built incrementally while the request is in flight; becomes immutable
/// once the request completes. A trace exists for every completed request,
/// success or failure, per the invariant in spec §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub id: Uuid,
    pub domain: String,
    pub tiers: Vec<Attempt>,
    pub selectors: Vec<SelectorAttempt>,
    pub title: Vec<TitleAttempt>,
    pub summary: String,
}

impl DecisionTrace {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain: domain.into(),
            tiers: Vec::new(),
            selectors: Vec::new(),
            title: Vec::new(),
            summary: String::new(),
        }
    }

    pub fn record_attempt(&mut self, attempt: Attempt) {
        self.tiers.push(attempt);
    }

    pub fn record_selector(&mut self, attempt: SelectorAttempt) {
        self.selectors.push(attempt);
    }

    pub fn record_title(&mut self, attempt: TitleAttempt) {
        self.title.push(attempt);
    }

    pub fn finish(&mut self, success: bool, tier_used: Option<Tier>) {
        self.summary = match (success, tier_used) {
            (true, Some(tier)) => format!(
                "succeeded on {tier} after {} attempt(s)",
                self.tiers.len()
            ),
            _ => format!("failed after {} attempt(s)", self.tiers.len()),
        };
    }

    /// `result.fellBack ⇔ attempts.length ≥ 2 AND attempts[0].outcome ≠ success` (spec §8).
    pub fn fell_back(&self) -> bool {
        self.tiers.len() >= 2 && !self.tiers[0].is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::attempt::{NetworkStats, Outcome};

    fn attempt(tier: Tier, outcome: Outcome) -> Attempt {
        Attempt {
            tier,
            started_at: chrono::Utc::now(),
            duration_ms: 10,
            outcome,
            error: None,
            proxy_id: None,
            network_stats: NetworkStats::default(),
        }
    }

    #[test]
    fn fell_back_requires_two_attempts_and_first_not_success() {
        let mut trace = DecisionTrace::new("example.com");
        assert!(!trace.fell_back());

        trace.record_attempt(attempt(Tier::Intelligence, Outcome::Success));
        assert!(!trace.fell_back());

        let mut trace = DecisionTrace::new("example.com");
        trace.record_attempt(attempt(Tier::Intelligence, Outcome::ValidationFailed));
        assert!(!trace.fell_back());
        trace.record_attempt(attempt(Tier::Lightweight, Outcome::Success));
        assert!(trace.fell_back());
    }

    #[test]
    fn round_trips_through_json() {
        let mut trace = DecisionTrace::new("example.com");
        trace.record_attempt(attempt(Tier::Intelligence, Outcome::Success));
        trace.finish(true, Some(Tier::Intelligence));

        let json = serde_json::to_string(&trace).unwrap();
        let back: DecisionTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, trace.id);
        assert_eq!(back.summary, trace.summary);
        assert_eq!(back.tiers.len(), trace.tiers.len());
    }
}
