//! Pattern Health Monitor (spec §4.7): tracks rolling success rate per
//! pattern, classifies status, snapshots hourly, and emits a notification
//! on every downgrade.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::domain::{
    HealthSnapshot, Pattern, PatternStatus, RecommendedPatternAction, Result,
};
use crate::storage::PatternRepository;

const SUCCESS_WINDOW: usize = 20;
const SNAPSHOT_MIN_INTERVAL_HOURS: i64 = 1;

#[derive(Debug, Clone)]
pub struct HealthNotification {
    pub domain: String,
    pub endpoint: String,
    pub previous_status: PatternStatus,
    pub new_status: PatternStatus,
    pub success_rate: f64,
    pub suggested_actions: Vec<RecommendedPatternAction>,
}

pub struct PatternHealthMonitor<R: PatternRepository> {
    repo: Arc<R>,
    notifications: std::sync::Mutex<VecDeque<HealthNotification>>,
    /// Rolling window of recent use outcomes, per pattern id.
    windows: std::sync::Mutex<std::collections::HashMap<uuid::Uuid, VecDeque<bool>>>,
}

impl<R: PatternRepository> PatternHealthMonitor<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            notifications: std::sync::Mutex::new(VecDeque::new()),
            windows: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Records one use outcome for `pattern`, updating its health and
    /// queuing a notification if status has downgraded.
    pub async fn record_use(&self, mut pattern: Pattern, success: bool) -> Result<Pattern> {
        let window = {
            let mut windows = self.windows.lock().expect("pattern health windows lock poisoned");
            let entry = windows.entry(pattern.id).or_insert_with(VecDeque::new);
            entry.push_back(success);
            while entry.len() > SUCCESS_WINDOW {
                entry.pop_front();
            }
            entry.clone()
        };

        let successes = window.iter().filter(|s| **s).count();
        let success_rate = successes as f64 / window.len() as f64;

        pattern.stats.uses += 1;
        if success {
            pattern.stats.successes += 1;
            pattern.health.consecutive_failures = 0;
        } else {
            pattern.health.consecutive_failures += 1;
        }
        pattern.health.current_success_rate = success_rate;

        let previous_status = pattern.health.status;
        let new_status = classify(success_rate, pattern.health.consecutive_failures);

        if new_status != previous_status {
            if is_downgrade(previous_status, new_status) {
                pattern.health.degradation_detected_at = Some(chrono::Utc::now());
                let actions = recommended_actions(new_status);
                pattern.health.recommended_actions = actions.clone();
                self.notifications
                    .lock()
                    .expect("pattern health notifications lock poisoned")
                    .push_back(HealthNotification {
                        domain: pattern.domain.clone(),
                        endpoint: pattern.endpoint.clone(),
                        previous_status,
                        new_status,
                        success_rate,
                        suggested_actions: actions,
                    });
            } else {
                pattern.health.recommended_actions.clear();
            }
            pattern.health.status = new_status;
        }

        maybe_snapshot(&mut pattern.health.history, success_rate, window.len());
        pattern.updated_at = chrono::Utc::now();

        self.repo.put_pattern(&pattern).await?;
        Ok(pattern)
    }

    pub fn drain_notifications(&self) -> Vec<HealthNotification> {
        let mut notifications = self
            .notifications
            .lock()
            .expect("pattern health notifications lock poisoned");
        notifications.drain(..).collect()
    }

    pub async fn unhealthy_patterns(&self) -> Result<Vec<Pattern>> {
        let all = self.repo.list_patterns().await?;
        Ok(all
            .into_iter()
            .filter(|p| !p.archived && p.health.status != PatternStatus::Healthy)
            .collect())
    }
}

/// Status thresholds (spec §4.7): classified independently by success rate
/// and by consecutive-failure run, then taking the worse of the two.
fn classify(success_rate: f64, consecutive_failures: u32) -> PatternStatus {
    classify_by_rate(success_rate).max(classify_by_streak(consecutive_failures))
}

fn classify_by_rate(success_rate: f64) -> PatternStatus {
    if success_rate < 0.3 {
        PatternStatus::Broken
    } else if success_rate < 0.7 {
        PatternStatus::Failing
    } else if success_rate < 0.9 {
        PatternStatus::Degraded
    } else {
        PatternStatus::Healthy
    }
}

fn classify_by_streak(consecutive_failures: u32) -> PatternStatus {
    if consecutive_failures >= 10 {
        PatternStatus::Broken
    } else if consecutive_failures >= 5 {
        PatternStatus::Failing
    } else if consecutive_failures >= 2 {
        PatternStatus::Degraded
    } else {
        PatternStatus::Healthy
    }
}

fn is_downgrade(previous: PatternStatus, new: PatternStatus) -> bool {
    new > previous
}

fn recommended_actions(status: PatternStatus) -> Vec<RecommendedPatternAction> {
    match status {
        PatternStatus::Healthy => vec![],
        PatternStatus::Degraded => vec![RecommendedPatternAction::RelearnPattern],
        PatternStatus::Failing => vec![
            RecommendedPatternAction::RelearnPattern,
            RecommendedPatternAction::SwitchTierPlaywright,
        ],
        PatternStatus::Broken => vec![
            RecommendedPatternAction::EnableStealth,
            RecommendedPatternAction::PausePattern,
        ],
    }
}

fn maybe_snapshot(history: &mut VecDeque<HealthSnapshot>, success_rate: f64, sample_size: usize) {
    let now = chrono::Utc::now();
    let should_snapshot = history
        .back()
        .map(|last| (now - last.timestamp).num_hours() >= SNAPSHOT_MIN_INTERVAL_HOURS)
        .unwrap_or(true);

    if should_snapshot {
        history.push_back(HealthSnapshot {
            timestamp: now,
            success_rate,
            sample_size,
        });
        while history.len() > crate::domain::PatternHealth::MAX_SNAPSHOTS {
            history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryKeyValueStore, KvRepositories};

    fn monitor() -> PatternHealthMonitor<KvRepositories<InMemoryKeyValueStore>> {
        PatternHealthMonitor::new(Arc::new(KvRepositories::new(Arc::new(
            InMemoryKeyValueStore::new(),
        ))))
    }

    #[tokio::test]
    async fn healthy_pattern_stays_healthy_on_success() {
        let monitor = monitor();
        let pattern = Pattern::new("example.com", "/items", "GET", "/items/{id}");
        let pattern = monitor.record_use(pattern, true).await.unwrap();
        assert_eq!(pattern.health.status, PatternStatus::Healthy);
    }

    #[tokio::test]
    async fn ten_consecutive_failures_reaches_broken_with_notification() {
        let monitor = monitor();
        let mut pattern = Pattern::new("api.example.com", "/users", "GET", "/users/{id}");
        for _ in 0..20 {
            pattern = monitor.record_use(pattern, true).await.unwrap();
        }
        for _ in 0..10 {
            pattern = monitor.record_use(pattern, false).await.unwrap();
        }
        assert_eq!(pattern.health.status, PatternStatus::Broken);

        let notifications = monitor.drain_notifications();
        assert!(!notifications.is_empty());
        assert!(notifications.iter().any(|n| n.new_status == PatternStatus::Broken));
    }

    #[tokio::test]
    async fn upgrades_never_notify() {
        let monitor = monitor();
        let mut pattern = Pattern::new("example.com", "/items", "GET", "/items/{id}");
        for _ in 0..10 {
            pattern = monitor.record_use(pattern, false).await.unwrap();
        }
        monitor.drain_notifications();

        for _ in 0..20 {
            pattern = monitor.record_use(pattern, true).await.unwrap();
        }
        assert_eq!(pattern.health.status, PatternStatus::Healthy);
        let notifications = monitor.drain_notifications();
        assert!(notifications.is_empty());
    }
}
