//! Tier sequence selection (spec §4.1 step 1–4): decides which tiers to
//! try, in what order, before a single request attempt is made.

use crate::domain::{ProxyTier, RiskLevel, Tier};

#[derive(Debug, Clone, Copy)]
pub struct LearnedPreference {
    pub tier: Tier,
    pub successes_last_24h: u32,
    pub success_rate: f64,
}

impl LearnedPreference {
    /// Qualifies as a steering signal: >= 3 successes in 24h, success rate
    /// >= 0.8 (spec §4.1 step 4).
    pub fn qualifies(&self) -> bool {
        self.successes_last_24h >= 3 && self.success_rate >= 0.8
    }
}

/// Builds the ordered tier sequence to attempt for one request (spec §4.1).
///
/// Order of precedence: the domain risk floor wins over everything else —
/// it may only be *reordered within*, never overridden by, a hint or
/// learned preference (spec §9 decided open question).
pub fn select_tier_sequence(
    tier_hint: Option<Tier>,
    risk_level: RiskLevel,
    recommended_proxy_tier: ProxyTier,
    learned: Option<LearnedPreference>,
    max_cost_tier: Option<Tier>,
) -> Vec<Tier> {
    let mut sequence: Vec<Tier> = Tier::ALL_ASCENDING.to_vec();

    if risk_level == RiskLevel::Extreme || recommended_proxy_tier == ProxyTier::Premium {
        sequence = vec![Tier::Playwright];
    } else if let Some(pref) = learned {
        if pref.qualifies() {
            sequence = reorder_starting_at(&sequence, pref.tier);
        }
    }

    if let Some(hint) = tier_hint {
        sequence = reorder_starting_at(&sequence, hint);
    }

    if let Some(max_tier) = max_cost_tier {
        sequence.retain(|t| *t <= max_tier);
    }

    sequence
}

/// Drops every tier strictly cheaper than `start`, keeping the remainder in
/// ascending cost order (spec §3: tier sequences are strictly increasing in
/// cost with no duplicates — a hint or learned preference may only narrow
/// the already-risk-filtered set, never reintroduce a cheaper tier after it).
fn reorder_starting_at(sequence: &[Tier], start: Tier) -> Vec<Tier> {
    if !sequence.contains(&start) {
        return sequence.to_vec();
    }
    sequence.iter().copied().filter(|t| *t >= start).collect()
}

/// Remaining latency budget for the next attempt, given what's already
/// been spent (spec §4.1 step 2: budget consumed as remaining budget per
/// attempt).
pub fn remaining_budget_ms(max_latency_ms: Option<u64>, spent_ms: u64) -> Option<u64> {
    max_latency_ms.map(|max| max.saturating_sub(spent_ms))
}

/// Whether to skip this tier attempt because the remaining budget can't
/// cover even its estimated minimum latency (spec §4.1 step 2, §8 boundary
/// behavior).
pub fn should_skip_by_budget(remaining_ms: Option<u64>, tier: Tier) -> bool {
    match remaining_ms {
        Some(remaining) => remaining <= tier.estimated_min_latency_ms(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sequence_is_cost_ordered() {
        let sequence = select_tier_sequence(None, RiskLevel::Low, ProxyTier::Datacenter, None, None);
        assert_eq!(sequence, vec![Tier::Intelligence, Tier::Lightweight, Tier::Playwright]);
    }

    #[test]
    fn extreme_risk_forces_playwright_only() {
        let sequence = select_tier_sequence(
            Some(Tier::Intelligence),
            RiskLevel::Extreme,
            ProxyTier::Premium,
            None,
            None,
        );
        assert_eq!(sequence, vec![Tier::Playwright]);
    }

    #[test]
    fn tier_hint_reorders_within_allowed_set() {
        let sequence = select_tier_sequence(Some(Tier::Lightweight), RiskLevel::Low, ProxyTier::Datacenter, None, None);
        assert_eq!(sequence[0], Tier::Lightweight);
    }

    #[test]
    fn extreme_risk_floor_wins_over_hint() {
        let sequence = select_tier_sequence(
            Some(Tier::Intelligence),
            RiskLevel::Extreme,
            ProxyTier::Premium,
            None,
            None,
        );
        assert_eq!(sequence, vec![Tier::Playwright]);
    }

    #[test]
    fn learned_preference_reorders_when_qualified() {
        let pref = LearnedPreference {
            tier: Tier::Lightweight,
            successes_last_24h: 5,
            success_rate: 0.9,
        };
        let sequence = select_tier_sequence(None, RiskLevel::Low, ProxyTier::Datacenter, Some(pref), None);
        assert_eq!(sequence[0], Tier::Lightweight);
    }

    #[test]
    fn unqualified_learned_preference_is_ignored() {
        let pref = LearnedPreference {
            tier: Tier::Playwright,
            successes_last_24h: 1,
            success_rate: 0.9,
        };
        let sequence = select_tier_sequence(None, RiskLevel::Low, ProxyTier::Datacenter, Some(pref), None);
        assert_eq!(sequence[0], Tier::Intelligence);
    }

    #[test]
    fn tier_hint_drops_cheaper_tiers_instead_of_retaining_them() {
        let sequence = select_tier_sequence(Some(Tier::Lightweight), RiskLevel::Low, ProxyTier::Datacenter, None, None);
        assert_eq!(sequence, vec![Tier::Lightweight, Tier::Playwright]);
    }

    #[test]
    fn max_cost_tier_truncates_sequence() {
        let sequence = select_tier_sequence(None, RiskLevel::Low, ProxyTier::Datacenter, None, Some(Tier::Lightweight));
        assert_eq!(sequence, vec![Tier::Intelligence, Tier::Lightweight]);
    }

    #[test]
    fn budget_too_small_skips_tier() {
        assert!(should_skip_by_budget(Some(100), Tier::Intelligence));
        assert!(!should_skip_by_budget(Some(10_000), Tier::Intelligence));
        assert!(!should_skip_by_budget(None, Tier::Playwright));
    }
}
