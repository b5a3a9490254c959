//! Geo Routing (spec §4.12): TLD-derived country hints, region-restriction
//! detection, and learned per-domain country preferences.

use std::collections::HashMap;

/// TLD suffix -> ISO country hint. Not exhaustive; covers the common
/// ccTLDs a proxy selector would plausibly bias on.
const TLD_COUNTRY_HINTS: &[(&str, &str)] = &[
    (".co.uk", "gb"),
    (".org.uk", "gb"),
    (".de", "de"),
    (".fr", "fr"),
    (".jp", "jp"),
    (".co.jp", "jp"),
    (".com.au", "au"),
    (".com.br", "br"),
    (".ca", "ca"),
    (".in", "in"),
];

const REGION_RESTRICTION_MARKERS: &[&str] = &[
    "not available in your region",
    "this content is not available in your country",
    "geo-restricted",
];

pub fn tld_country_hint(domain: &str) -> Option<&'static str> {
    TLD_COUNTRY_HINTS
        .iter()
        .find(|(suffix, _)| domain.ends_with(*suffix))
        .map(|(_, country)| *country)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionRestriction {
    pub detected: bool,
    pub confidence: f64,
}

/// Detects a region-restriction page from body markers and a `451` status.
pub fn detect_region_restriction(body: &str, status: u16) -> RegionRestriction {
    let lowered = body.to_lowercase();
    let marker_hit = REGION_RESTRICTION_MARKERS.iter().any(|m| lowered.contains(m));

    match (status == 451, marker_hit) {
        (true, true) => RegionRestriction { detected: true, confidence: 0.95 },
        (true, false) => RegionRestriction { detected: true, confidence: 0.8 },
        (false, true) => RegionRestriction { detected: true, confidence: 0.6 },
        (false, false) => RegionRestriction { detected: false, confidence: 0.0 },
    }
}

/// Learned per-domain country preference: which countries have historically
/// succeeded, by success rate.
#[derive(Debug, Clone, Default)]
pub struct DomainGeoPreference {
    pub domain: String,
    pub success_rate_by_country: HashMap<String, f64>,
}

impl DomainGeoPreference {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            success_rate_by_country: HashMap::new(),
        }
    }

    pub fn preferred_country(&self) -> Option<&str> {
        self.success_rate_by_country
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(country, _)| country.as_str())
    }

    pub fn record(&mut self, country: impl Into<String>, success: bool) {
        let country = country.into();
        let rate = self.success_rate_by_country.entry(country).or_insert(1.0);
        *rate = 0.9 * *rate + 0.1 * if success { 1.0 } else { 0.0 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_co_uk_to_gb() {
        assert_eq!(tld_country_hint("shop.example.co.uk"), Some("gb"));
    }

    #[test]
    fn unknown_tld_has_no_hint() {
        assert_eq!(tld_country_hint("example.com"), None);
    }

    #[test]
    fn detects_region_restriction_from_status_and_body() {
        let restriction = detect_region_restriction("This content is not available in your country.", 451);
        assert!(restriction.detected);
        assert!(restriction.confidence > 0.9);
    }

    #[test]
    fn geo_preference_tracks_best_country() {
        let mut pref = DomainGeoPreference::new("example.com");
        pref.record("us", true);
        pref.record("us", true);
        pref.record("de", false);
        assert_eq!(pref.preferred_country(), Some("us"));
    }
}
