//! End-to-end scenarios over the learning subsystem directly: pattern health
//! downgrade notifications and cross-domain transfer feeding the domain
//! group learner through the real event bus wiring.

use std::sync::Arc;

use fetch_ops::domain::PatternStatus;
use fetch_ops::learning::{
    DomainGroupLearner, EventBus, PatternEvent, PatternHealthMonitor, PatternObservation,
    PatternRegistry,
};
use fetch_ops::storage::{InMemoryKeyValueStore, KvRepositories};

type Repo = KvRepositories<InMemoryKeyValueStore>;

fn repo() -> Arc<Repo> {
    Arc::new(KvRepositories::new(Arc::new(InMemoryKeyValueStore::new())))
}

/// Scenario 5: a pattern with an established healthy track record (18/20
/// successes) degrades to `failing` after 5 consecutive failures, and
/// exactly one notification documents the transition.
#[tokio::test]
async fn established_pattern_downgrades_to_failing_after_five_failures() {
    let monitor = PatternHealthMonitor::new(repo());
    let registry = PatternRegistry::new(repo(), EventBus::new());

    let mut pattern = registry
        .record(PatternObservation {
            domain: "api.example.com".to_string(),
            endpoint_path: "/users/1".to_string(),
            method: "GET".to_string(),
            response_shape: None,
        })
        .await
        .unwrap();

    for i in 0..20 {
        let success = i < 18;
        pattern = monitor.record_use(pattern, success).await.unwrap();
    }
    assert_eq!(pattern.health.status, PatternStatus::Healthy);
    monitor.drain_notifications();

    for _ in 0..5 {
        pattern = monitor.record_use(pattern, false).await.unwrap();
    }

    assert_eq!(pattern.health.status, PatternStatus::Failing);

    let notifications = monitor.drain_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].previous_status, PatternStatus::Healthy);
    assert_eq!(notifications[0].new_status, PatternStatus::Failing);
}

/// Scenario 6: repeated successful transfers between two shops at
/// similarity 0.8 produce a high-confidence candidate group, auto-registered
/// on reconcile, driven through the same event bus wiring the engine uses to
/// bridge the pattern registry into the domain group learner. The seed
/// transfer itself counts as one unweighted (`success: None`) event in the
/// relationship, same as in production, so enough successful uses are
/// reported afterward to clear the auto-register threshold.
#[tokio::test(flavor = "multi_thread")]
async fn repeated_successful_transfers_register_a_domain_group() {
    let events = EventBus::new();
    let registry = Arc::new(PatternRegistry::new(repo(), events));
    let group_learner = Arc::new(DomainGroupLearner::new(repo()));

    let mut receiver = registry.subscribe_events();
    let bridge_learner = group_learner.clone();
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            if let PatternEvent::Transferred { source_domain, target_domain, success, similarity, .. } = event {
                bridge_learner.observe_transfer(&source_domain, &target_domain, success.unwrap_or(false), similarity);
            }
        }
    });

    registry
        .record(PatternObservation {
            domain: "shop-a.com".to_string(),
            endpoint_path: "/products/123".to_string(),
            method: "GET".to_string(),
            response_shape: None,
        })
        .await
        .unwrap();

    let transferred = registry
        .transfer("shop-a.com", "shop-b.com", "domain_group_learned")
        .await
        .unwrap()
        .expect("a pattern should have transferred");

    for _ in 0..5 {
        registry.report_transfer_outcome(&transferred, true, Some(0.8));
    }

    // Let the spawned bridge task drain the broadcast channel before reading
    // the learner's state.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let groups = group_learner.reconcile().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert!(groups[0].registered);
    assert!(groups[0].domains.contains(&"shop-a.com".to_string()));
    assert!(groups[0].domains.contains(&"shop-b.com".to_string()));
    assert!(groups[0].confidence >= 0.7);
}
