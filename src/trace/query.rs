//! Trace query API (spec §4.11, §6 `queryTraces`): filters the recorder's
//! in-memory index by domain, URL pattern, time range, success, and tier.

use regex::Regex;

use crate::domain::Tier;

use super::recorder::{DebugRecorder, TraceIndexEntry};

#[derive(Debug, Clone, Default)]
pub struct TraceFilter {
    pub domain: Option<String>,
    pub url_regex: Option<String>,
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    pub until: Option<chrono::DateTime<chrono::Utc>>,
    pub success: Option<bool>,
    pub tier: Option<Tier>,
}

#[derive(Debug, Clone)]
pub struct TraceQueryMatch {
    pub id: uuid::Uuid,
    pub entry: TraceIndexEntry,
}

pub async fn query_traces(recorder: &DebugRecorder, filter: &TraceFilter) -> Vec<TraceQueryMatch> {
    let url_re = filter
        .url_regex
        .as_deref()
        .and_then(|pattern| Regex::new(pattern).ok());

    let mut matches: Vec<TraceQueryMatch> = recorder
        .index_snapshot()
        .await
        .into_iter()
        .filter(|(_, entry)| matches_filter(entry, filter, url_re.as_ref()))
        .map(|(id, entry)| TraceQueryMatch { id, entry })
        .collect();

    matches.sort_by_key(|m| std::cmp::Reverse(m.entry.timestamp));
    matches
}

fn matches_filter(entry: &TraceIndexEntry, filter: &TraceFilter, url_re: Option<&Regex>) -> bool {
    if let Some(domain) = &filter.domain {
        if &entry.domain != domain {
            return false;
        }
    }
    if let Some(re) = url_re {
        if !re.is_match(&entry.domain) {
            return false;
        }
    }
    if let Some(since) = filter.since {
        if entry.timestamp < since {
            return false;
        }
    }
    if let Some(until) = filter.until {
        if entry.timestamp > until {
            return false;
        }
    }
    if let Some(success) = filter.success {
        if entry.success != success {
            return false;
        }
    }
    if let Some(tier) = filter.tier {
        if entry.tier_used != Some(tier) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DebugRecorderConfig;
    use crate::domain::DecisionTrace;

    fn recorder() -> DebugRecorder {
        DebugRecorder::new(
            DebugRecorderConfig {
                enabled: true,
                always_record_domains: Vec::new(),
                never_record_domains: Vec::new(),
                only_record_failures: false,
                max_traces: 100,
                max_age_hours: 24,
                max_storage_bytes: None,
            },
            std::env::temp_dir().join(format!("fetch-ops-query-test-{}", uuid::Uuid::new_v4())),
        )
    }

    #[tokio::test]
    async fn filters_by_domain() {
        let recorder = recorder();
        let a = DecisionTrace::new("a.com");
        let b = DecisionTrace::new("b.com");
        recorder.record(&a, true, Some(Tier::Intelligence)).await.unwrap();
        recorder.record(&b, true, Some(Tier::Intelligence)).await.unwrap();

        let filter = TraceFilter {
            domain: Some("a.com".to_string()),
            ..Default::default()
        };
        let results = query_traces(&recorder, &filter).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, a.id);
    }

    #[tokio::test]
    async fn filters_by_success_and_tier() {
        let recorder = recorder();
        let ok = DecisionTrace::new("a.com");
        let failed = DecisionTrace::new("a.com");
        recorder.record(&ok, true, Some(Tier::Intelligence)).await.unwrap();
        recorder.record(&failed, false, Some(Tier::Playwright)).await.unwrap();

        let filter = TraceFilter {
            success: Some(false),
            ..Default::default()
        };
        let results = query_traces(&recorder, &filter).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, failed.id);
    }
}
