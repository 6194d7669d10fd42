use super::*;
use crate::store::MemoryStore;
use farebridge_types::models::Provider;

async fn tracker_with(id: &str, limit: i64) -> QuotaTracker {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    store
        .upsert_provider(&Provider {
            id: id.to_string(),
            service_type: ServiceType::Hotel,
            enabled: true,
            priority: 1,
            base_url: "https://example.test".to_string(),
            health_path: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
    let tracker = QuotaTracker::new(store, QuotaConfig::default(), RetryConfig::default());
    tracker.ensure(id, ServiceType::Hotel, Some(limit), Some(3600), true).await.unwrap();
    tracker
}

#[test]
fn test_next_reset_skips_whole_windows() {
    let start = Utc::now();
    assert_eq!(next_reset_at(start, 60, start - Duration::seconds(1)), start);
    assert_eq!(next_reset_at(start, 60, start), start + Duration::seconds(60));
    assert_eq!(
        next_reset_at(start, 60, start + Duration::seconds(150)),
        start + Duration::seconds(180)
    );
}

#[tokio::test]
async fn test_usage_moves_through_bands() {
    let tracker = tracker_with("h1", 100).await;
    let now = Utc::now();

    let record = tracker.record_usage_at("h1", 75, now).await.unwrap().unwrap();
    assert_eq!(tracker.status_of(&record), QuotaStatus::Warning);

    let record = tracker.record_usage_at("h1", 15, now).await.unwrap().unwrap();
    assert_eq!(tracker.status_of(&record), QuotaStatus::Critical);

    let record = tracker.record_usage_at("h1", 10, now).await.unwrap().unwrap();
    assert_eq!(tracker.status_of(&record), QuotaStatus::Exceeded);
}

#[tokio::test]
async fn test_usage_is_clamped_to_overshoot_ceiling() {
    let tracker = tracker_with("h1", 10).await;
    let now = Utc::now();

    let record = tracker.record_usage_at("h1", i64::MAX, now).await.unwrap().unwrap();
    assert_eq!(record.quota_used, 20);

    let record = tracker.record_usage_at("h1", -1_000, now).await.unwrap().unwrap();
    assert_eq!(record.quota_used, 0);
}

#[tokio::test]
async fn test_window_reset_zeroes_usage_once() {
    let tracker = tracker_with("h1", 100).await;
    let now = Utc::now();
    tracker.record_usage_at("h1", 100, now).await.unwrap();

    assert!(!tracker.reset_if_window_elapsed_at("h1", now).await.unwrap());

    let later = now + Duration::seconds(3601);
    assert!(tracker.reset_if_window_elapsed_at("h1", later).await.unwrap());
    assert!(!tracker.reset_if_window_elapsed_at("h1", later).await.unwrap());

    let record = tracker.record("h1").await.unwrap().unwrap();
    assert_eq!(record.quota_used, 0);
    assert!(record.reset_at > later);
}

#[tokio::test]
async fn test_usage_after_elapsed_window_lands_in_new_window() {
    let tracker = tracker_with("h1", 100).await;
    let now = Utc::now();
    tracker.record_usage_at("h1", 100, now).await.unwrap();

    let later = now + Duration::seconds(3601);
    let record = tracker.record_usage_at("h1", 1, later).await.unwrap().unwrap();
    assert_eq!(record.quota_used, 1);
    assert_eq!(tracker.status_of(&record), QuotaStatus::Healthy);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_usage_is_never_lost() {
    const WRITERS: u32 = 64;
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();
    store
        .upsert_provider(&Provider {
            id: "h1".to_string(),
            service_type: ServiceType::Hotel,
            enabled: true,
            priority: 1,
            base_url: "https://example.test".to_string(),
            health_path: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
    // A writer only loses a swap to another writer's commit, so WRITERS attempts always suffice.
    let retry = RetryConfig { max_attempts: WRITERS, base_delay_ms: 1, max_delay_ms: 5 };
    let tracker = Arc::new(QuotaTracker::new(store, QuotaConfig::default(), retry));
    tracker.ensure("h1", ServiceType::Hotel, Some(1000), Some(3600), true).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..WRITERS {
        let tracker = Arc::clone(&tracker);
        handles.push(tokio::spawn(async move { tracker.record_usage_at("h1", 1, now).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }

    let stored = tracker.refresh("h1").await.unwrap().unwrap();
    assert_eq!(stored.quota_used, i64::from(WRITERS));
    assert_eq!(tracker.record("h1").await.unwrap().unwrap().version, stored.version);
}

#[tokio::test]
async fn test_reset_all_elapsed_reports_ids() {
    let tracker = tracker_with("h1", 100).await;
    let now = Utc::now();
    tracker.record_usage_at("h1", 5, now).await.unwrap();

    assert!(tracker.reset_all_elapsed_at(now).await.unwrap().is_empty());
    let reset = tracker.reset_all_elapsed_at(now + Duration::hours(2)).await.unwrap();
    assert_eq!(reset, vec!["h1".to_string()]);
}

#[tokio::test]
async fn test_set_limit_updates_provenance() {
    let tracker = tracker_with("h1", 100).await;
    tracker.record_usage_at("h1", 80, Utc::now()).await.unwrap();

    let record = tracker.set_limit("h1", 50, false).await.unwrap().unwrap();
    assert_eq!(record.quota_limit, 50);
    assert!(!record.is_actual_quota_limit);
    assert_eq!(tracker.status_of(&record), QuotaStatus::Exceeded);
}

#[tokio::test]
async fn test_zero_limit_is_exceeded() {
    let tracker = tracker_with("h1", 0).await;
    let record = tracker.record("h1").await.unwrap().unwrap();
    assert_eq!(tracker.status_of(&record), QuotaStatus::Exceeded);
}

#[tokio::test]
async fn test_unknown_provider_has_no_record() {
    let tracker = tracker_with("h1", 100).await;
    assert!(tracker.record_usage("ghost", 1).await.unwrap().is_none());
}
