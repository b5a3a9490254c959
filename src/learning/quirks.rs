//! Dynamic Handler/Quirks Registry (spec §4.8): learns per-domain
//! behavioral quirks from response signals (429/403/WAF markers/recurring
//! required headers) and applies them to outgoing fetch options.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{AntiBotQuirk, FetchOptions, RateLimitQuirk, Result, SiteQuirks, StealthQuirk};
use crate::storage::QuirksRepository;

const WAF_BODY_MARKERS: &[(&str, &str, &str)] = &[
    ("cloudflare", "checking your browser", "high"),
    ("datadome", "datadome", "high"),
    ("perimeterx", "press & hold", "medium"),
    ("akamai", "ak_bmsc", "medium"),
];

pub struct QuirksRegistry<R: QuirksRepository> {
    repo: Arc<R>,
}

impl<R: QuirksRepository> QuirksRegistry<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, domain: &str) -> Result<SiteQuirks> {
        Ok(self
            .repo
            .get_quirks(domain)
            .await?
            .unwrap_or_else(|| SiteQuirks::new(domain)))
    }

    /// Learns from a 429 response: caps the observed requests-per-second to
    /// at most 1, stepping down further if a previous quirk already existed
    /// (spec §4.8 "429 -> rateLimit.requestsPerSecond <= 1 with stepdown").
    pub async fn learn_rate_limit(&self, domain: &str) -> Result<SiteQuirks> {
        let mut quirks = self.get(domain).await?;
        let current = quirks
            .rate_limit
            .as_ref()
            .map(|r| r.requests_per_second)
            .unwrap_or(1.0);
        let stepped_down = (current / 2.0).max(0.1).min(1.0);
        quirks.rate_limit = Some(RateLimitQuirk {
            requests_per_second: stepped_down,
        });
        quirks.learned_at = Some(chrono::Utc::now());
        self.repo.put_quirks(&quirks).await?;
        Ok(quirks)
    }

    /// Learns from a 403: flips stealth mode on, provisionally (spec §4.8).
    pub async fn learn_stealth_required(&self, domain: &str, reason: &str) -> Result<SiteQuirks> {
        let mut quirks = self.get(domain).await?;
        quirks.stealth = Some(StealthQuirk {
            required: true,
            reason: Some(reason.to_string()),
        });
        quirks.learned_at = Some(chrono::Utc::now());
        self.repo.put_quirks(&quirks).await?;
        Ok(quirks)
    }

    /// Scans a response body for known WAF/anti-bot fingerprints.
    pub async fn learn_anti_bot_from_body(&self, domain: &str, body: &str) -> Result<SiteQuirks> {
        let lowered = body.to_lowercase();
        let Some((kind, _, severity)) = WAF_BODY_MARKERS
            .iter()
            .find(|(_, marker, _)| lowered.contains(marker))
        else {
            return self.get(domain).await;
        };

        let mut quirks = self.get(domain).await?;
        quirks.anti_bot = Some(AntiBotQuirk {
            kind: kind.to_string(),
            severity: severity.to_string(),
        });
        quirks.learned_at = Some(chrono::Utc::now());
        self.repo.put_quirks(&quirks).await?;
        Ok(quirks)
    }

    /// Infers a recurrently-required header by comparing headers present on
    /// successful attempts against those on failed ones: a header present
    /// on every success and absent from every failure is inferred required.
    pub async fn learn_required_header(
        &self,
        domain: &str,
        successful_headers: &[HashMap<String, String>],
        failed_headers: &[HashMap<String, String>],
    ) -> Result<SiteQuirks> {
        let mut quirks = self.get(domain).await?;

        if let Some(first) = successful_headers.first() {
            for (key, value) in first {
                let present_in_all_successes =
                    successful_headers.iter().all(|h| h.get(key) == Some(value));
                let absent_from_all_failures =
                    failed_headers.iter().all(|h| h.get(key) != Some(value));
                if present_in_all_successes && absent_from_all_failures && !failed_headers.is_empty() {
                    quirks.required_headers.insert(key.clone(), value.clone());
                }
            }
        }

        if !quirks.required_headers.is_empty() {
            quirks.learned_at = Some(chrono::Utc::now());
            self.repo.put_quirks(&quirks).await?;
        }
        Ok(quirks)
    }
}

/// Merges learned quirks into outgoing fetch options. User-provided headers
/// always win on a key collision (spec §4.8, tested invariant in spec §8).
pub fn apply_quirks_to_fetch_options(quirks: &SiteQuirks, mut options: FetchOptions) -> FetchOptions {
    for (key, value) in &quirks.required_headers {
        options.headers.entry(key.clone()).or_insert_with(|| value.clone());
    }
    options
}
