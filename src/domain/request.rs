use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::tier::Tier;

/// Optional per-request budget (spec §3).
///
/// Both fields are optional; unset means unbounded. `max_latency_ms` bounds
/// wall-clock time across *all* tier attempts; `max_cost_tier` caps the
/// highest tier the orchestrator may attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Budget {
    pub max_latency_ms: Option<u64>,
    pub max_cost_tier: Option<Tier>,
}

/// Geo routing preferences supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeoPrefs {
    pub preferred_countries: Vec<String>,
}

/// Per-request options that don't warrant their own top-level field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchOptions {
    pub headers: HashMap<String, String>,
    pub cookies: Option<String>,
    pub timeout_ms: Option<u64>,
}

/// One `fetch(url, opts)` call (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub url: String,
    pub domain: String,
    pub tenant_id: String,
    pub plan: String,
    pub tier_hint: Option<Tier>,
    pub budget: Option<Budget>,
    pub geo_prefs: Option<GeoPrefs>,
    #[serde(default)]
    pub options: FetchOptions,
}

impl Request {
    /// Build a request, deriving the registered domain (eTLD+1-aware for the
    /// common multi-part TLDs) from the URL.
    pub fn new(url: impl Into<String>, tenant_id: impl Into<String>, plan: impl Into<String>) -> crate::domain::Result<Self> {
        let url = url.into();
        let domain = registered_domain(&url)?;
        Ok(Self {
            id: Uuid::new_v4(),
            url,
            domain,
            tenant_id: tenant_id.into(),
            plan: plan.into(),
            tier_hint: None,
            budget: None,
            geo_prefs: None,
            options: FetchOptions::default(),
        })
    }

    pub fn with_tier_hint(mut self, tier: Tier) -> Self {
        self.tier_hint = Some(tier);
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = Some(budget);
        self
    }
}

/// A short list of two-part public suffixes common enough to special-case
/// without pulling in a full public-suffix-list dependency.
const TWO_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "gov.uk", "ac.uk", "co.jp", "co.nz", "com.au", "com.br",
];

/// Extract the registered domain (eTLD+1) from a URL, case-folded and
/// stripped of a leading `www.`.
pub fn registered_domain(url: &str) -> crate::domain::Result<String> {
    let parsed = url::Url::parse(url)
        .map_err(|e| crate::domain::FetchError::ConfigInvalidUrl(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| crate::domain::FetchError::ConfigInvalidUrl(url.to_string()))?
        .to_lowercase();
    Ok(apex_domain(&host))
}

/// Reduce a hostname to its apex (registered) domain.
pub fn apex_domain(host: &str) -> String {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host.to_string();
    }
    let last_two = labels[labels.len() - 2..].join(".");
    if TWO_LABEL_SUFFIXES.contains(&last_two.as_str()) && labels.len() >= 3 {
        return labels[labels.len() - 3..].join(".");
    }
    last_two
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_www_and_case_folds() {
        assert_eq!(apex_domain("WWW.Example.com"), "example.com");
    }

    #[test]
    fn handles_two_label_public_suffix() {
        assert_eq!(apex_domain("shop.example.co.uk"), "example.co.uk");
    }

    #[test]
    fn handles_plain_apex() {
        assert_eq!(apex_domain("example.com"), "example.com");
    }

    #[test]
    fn request_new_derives_domain() {
        let req = Request::new("https://www.Example.com/page", "tenant-1", "FREE").unwrap();
        assert_eq!(req.domain, "example.com");
    }

    #[test]
    fn request_new_rejects_bad_url() {
        assert!(Request::new("not a url", "t", "FREE").is_err());
    }
}
