//! Debug Recorder (spec §4.11): persists one JSON file per decision trace,
//! governed by a global enable flag plus per-domain allow/deny lists, with
//! retention enforced on every write.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;

use crate::config::DebugRecorderConfig;
use crate::domain::{DecisionTrace, Result, Tier};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceIndexEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub domain: String,
    pub success: bool,
    pub tier_used: Option<Tier>,
}

pub struct DebugRecorder {
    config: DebugRecorderConfig,
    storage_dir: PathBuf,
    index: Arc<RwLock<HashMap<uuid::Uuid, TraceIndexEntry>>>,
}

impl DebugRecorder {
    pub fn new(config: DebugRecorderConfig, storage_dir: PathBuf) -> Self {
        Self {
            config,
            storage_dir,
            index: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Whether a trace for this domain should be recorded at all, per
    /// global enable + allow/deny lists.
    fn should_record(&self, domain: &str, success: bool) -> bool {
        if !self.config.enabled {
            return false;
        }
        if self.config.never_record_domains.iter().any(|d| d == domain) {
            return false;
        }
        if !self.config.always_record_domains.is_empty()
            && !self.config.always_record_domains.iter().any(|d| d == domain)
        {
            return false;
        }
        if self.config.only_record_failures && success {
            return false;
        }
        true
    }

    pub async fn record(&self, trace: &DecisionTrace, success: bool, tier_used: Option<Tier>) -> Result<()> {
        if !self.should_record(&trace.domain, success) {
            return Ok(());
        }

        fs::create_dir_all(&self.storage_dir)
            .await
            .map_err(|e| crate::domain::FetchError::InternalError(e.to_string()))?;

        let path = self.trace_path(trace.id);
        let bytes = serde_json::to_vec_pretty(trace)?;
        fs::write(&path, bytes)
            .await
            .map_err(|e| crate::domain::FetchError::InternalError(e.to_string()))?;

        let mut index = self.index.write().await;
        index.insert(
            trace.id,
            TraceIndexEntry {
                timestamp: chrono::Utc::now(),
                domain: trace.domain.clone(),
                success,
                tier_used,
            },
        );
        drop(index);

        self.enforce_retention().await
    }

    pub async fn load(&self, id: uuid::Uuid) -> Result<Option<DecisionTrace>> {
        let path = self.trace_path(id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(crate::domain::FetchError::InternalError(e.to_string())),
        }
    }

    pub async fn index_snapshot(&self) -> HashMap<uuid::Uuid, TraceIndexEntry> {
        self.index.read().await.clone()
    }

    fn trace_path(&self, id: uuid::Uuid) -> PathBuf {
        self.storage_dir.join(format!("{id}.json"))
    }

    /// Deletes traces older than `max_age_hours` or beyond `max_traces`
    /// (oldest first), enforced on every write (spec §4.11).
    async fn enforce_retention(&self) -> Result<()> {
        let now = chrono::Utc::now();
        let mut index = self.index.write().await;

        let expired: Vec<uuid::Uuid> = index
            .iter()
            .filter(|(_, entry)| {
                (now - entry.timestamp).num_hours() as u64 >= self.config.max_age_hours
            })
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            index.remove(id);
            let _ = fs::remove_file(self.trace_path(*id)).await;
        }

        if index.len() > self.config.max_traces {
            let mut by_age: Vec<(uuid::Uuid, chrono::DateTime<chrono::Utc>)> =
                index.iter().map(|(id, entry)| (*id, entry.timestamp)).collect();
            by_age.sort_by_key(|(_, ts)| *ts);
            let overflow = index.len() - self.config.max_traces;
            for (id, _) in by_age.into_iter().take(overflow) {
                index.remove(&id);
                let _ = fs::remove_file(self.trace_path(id)).await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DebugRecorderConfig {
        DebugRecorderConfig {
            enabled: true,
            always_record_domains: Vec::new(),
            never_record_domains: Vec::new(),
            only_record_failures: false,
            max_traces: 10_000,
            max_age_hours: 24 * 7,
            max_storage_bytes: None,
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fetch-ops-trace-test-{name}-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn records_and_loads_a_trace() {
        let recorder = DebugRecorder::new(config(), temp_dir("basic"));
        let trace = DecisionTrace::new("example.com");
        recorder.record(&trace, true, Some(Tier::Intelligence)).await.unwrap();

        let loaded = recorder.load(trace.id).await.unwrap().unwrap();
        assert_eq!(loaded.domain, "example.com");
    }

    #[tokio::test]
    async fn never_record_domain_is_skipped() {
        let mut cfg = config();
        cfg.never_record_domains.push("blocked.com".to_string());
        let recorder = DebugRecorder::new(cfg, temp_dir("never"));
        let trace = DecisionTrace::new("blocked.com");
        recorder.record(&trace, true, None).await.unwrap();
        assert!(recorder.load(trace.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn only_record_failures_skips_successes() {
        let mut cfg = config();
        cfg.only_record_failures = true;
        let recorder = DebugRecorder::new(cfg, temp_dir("failures-only"));
        let success_trace = DecisionTrace::new("example.com");
        recorder.record(&success_trace, true, None).await.unwrap();
        assert!(recorder.load(success_trace.id).await.unwrap().is_none());

        let failure_trace = DecisionTrace::new("example.com");
        recorder.record(&failure_trace, false, None).await.unwrap();
        assert!(recorder.load(failure_trace.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn retention_evicts_oldest_beyond_max_traces() {
        let mut cfg = config();
        cfg.max_traces = 2;
        let recorder = DebugRecorder::new(cfg, temp_dir("max-traces"));

        let first = DecisionTrace::new("a.com");
        recorder.record(&first, true, None).await.unwrap();
        let second = DecisionTrace::new("b.com");
        recorder.record(&second, true, None).await.unwrap();
        let third = DecisionTrace::new("c.com");
        recorder.record(&third, true, None).await.unwrap();

        assert!(recorder.load(first.id).await.unwrap().is_none());
        assert!(recorder.load(third.id).await.unwrap().is_some());
    }
}
