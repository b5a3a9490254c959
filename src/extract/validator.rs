//! Validates an extraction against the tier and domain it came from (spec
//! §4.10). Distinguishes retryable failures (worth escalating to a pricier
//! tier) from fatal ones (no fallback helps) from success-with-warnings.

use crate::domain::{FetchResult, Tier};

const MIN_CONTENT_LENGTH: usize = 300;

const LOADING_MARKERS: &[&str] = &["loading...", "please wait", "enable javascript"];
const CHALLENGE_MARKERS: &[&str] = &[
    "checking your browser",
    "captcha",
    "verify you are human",
    "just a moment",
    "access denied",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid { warnings: Vec<String> },
    Retryable { reasons: Vec<String> },
    Fatal { reasons: Vec<String> },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid { .. })
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ValidationOutcome::Retryable { .. })
    }
}

/// `(extraction, tier, domain) -> outcome` per spec §4.10.
pub fn validate(extraction: &FetchResult, _tier: Tier, _domain: &str) -> ValidationOutcome {
    let mut retryable_reasons = Vec::new();

    if extraction.text.trim().chars().count() < MIN_CONTENT_LENGTH {
        retryable_reasons.push("content_too_short".to_string());
    }

    let lowered = extraction.text.to_lowercase();
    if LOADING_MARKERS.iter().any(|m| lowered.contains(m)) {
        retryable_reasons.push("loading_shell_detected".to_string());
    }
    if CHALLENGE_MARKERS.iter().any(|m| lowered.contains(m)) {
        retryable_reasons.push("challenge_page_detected".to_string());
    }

    let title_missing_with_body_fallback = extraction.title.is_none()
        && extraction
            .decision_trace
            .selectors
            .iter()
            .any(|s| s.selected && s.selector == "body" && s.confidence <= 0.4);
    if title_missing_with_body_fallback {
        retryable_reasons.push("title_missing_body_fallback".to_string());
    }

    if !retryable_reasons.is_empty() {
        return ValidationOutcome::Retryable {
            reasons: retryable_reasons,
        };
    }

    let mut warnings = Vec::new();
    if extraction.confidence < 0.5 {
        warnings.push("low_extraction_confidence".to_string());
    }
    if extraction.title.is_none() {
        warnings.push("no_title_found".to_string());
    }

    ValidationOutcome::Valid { warnings }
}
