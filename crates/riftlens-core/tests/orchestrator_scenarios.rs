//! End-to-end pipeline scenarios against in-process fakes.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{orchestrator, FakeTelemetry, RecordingDelivery, ScriptedGenerator};
use riftlens_core::orchestrator::{OutcomeKind, FALLBACK_VERSION, NARRATIVE_VERSION};
use riftlens_core::{
    AnalysisRequest, AnalysisStatus, DeliveryOutcome, DeliveryTarget, MemoryResultStore,
    ResultStore, RiftError, SqliteResultStore, Stage,
};

fn target(age: chrono::Duration) -> DeliveryTarget {
    DeliveryTarget {
        application_id: "app-1".into(),
        interaction_token: "tok-1".into(),
        channel_id: "chan-1".into(),
        issued_at: Utc::now() - age,
    }
}

#[tokio::test]
async fn generator_failing_every_attempt_falls_back_to_template() {
    let generator = Arc::new(ScriptedGenerator::failing());
    let orchestrator = orchestrator(
        Arc::new(FakeTelemetry::default()),
        Arc::new(MemoryResultStore::new()),
        generator.clone(),
    );

    let result = orchestrator.run(AnalysisRequest::new("EUW1_100", 1)).await;

    assert_eq!(result.status, AnalysisStatus::Completed);
    assert_eq!(result.algorithm_version.as_deref(), Some(FALLBACK_VERSION));
    let narrative = result.narrative.as_deref().unwrap();
    assert!(narrative.starts_with("Ahri"), "got {narrative}");
    assert_eq!(result.metrics[&Stage::Narrating].outcome, OutcomeKind::Degraded);
    assert!(result
        .notes
        .iter()
        .any(|n| n.stage == Stage::Narrating && n.kind == "transient_network"));
    assert_eq!(
        generator.calls.load(Ordering::SeqCst),
        orchestrator.config().narrative.attempts
    );
}

#[tokio::test]
async fn rerun_overwrites_persisted_result() {
    let store = Arc::new(SqliteResultStore::memory().unwrap());
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = orchestrator(
        Arc::new(FakeTelemetry::default()),
        store.clone(),
        generator.clone(),
    );

    let first = orchestrator.run(AnalysisRequest::new("EUW1_100", 1)).await;
    let stored_first = store.get("EUW1_100").await.unwrap().unwrap();
    let second = orchestrator.run(AnalysisRequest::new("EUW1_100", 1)).await;
    let stored_second = store.get("EUW1_100").await.unwrap().unwrap();

    assert_eq!(first.status, AnalysisStatus::Completed);
    assert_eq!(second.status, AnalysisStatus::Completed);
    assert_eq!(stored_second.analysis.run_id, second.run_id);
    assert_eq!(stored_first.analysis.scores, stored_second.analysis.scores);
    assert_eq!(stored_first.analysis.narrative, stored_second.analysis.narrative);
    assert_eq!(
        stored_second.analysis.algorithm_version.as_deref(),
        Some(NARRATIVE_VERSION)
    );
    // second narration is a cache hit
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_patch_posts_once_and_rerun_is_suppressed() {
    let store = Arc::new(MemoryResultStore::new());
    let delivery = Arc::new(RecordingDelivery {
        patch_error: Some(RiftError::DeliveryExpired {
            message: "Unknown Webhook".into(),
        }),
        ..Default::default()
    });
    let orchestrator = orchestrator(
        Arc::new(FakeTelemetry::default()),
        store.clone(),
        Arc::new(ScriptedGenerator::default()),
    )
    .with_delivery(delivery.clone());
    let request =
        AnalysisRequest::new("EUW1_100", 1).with_delivery(target(chrono::Duration::minutes(2)));

    let first = orchestrator.run(request.clone()).await;
    assert_eq!(first.delivery, DeliveryOutcome::FallbackPosted);
    assert_eq!(first.status, AnalysisStatus::Completed);

    let second = orchestrator.run(request.clone()).await;
    assert_eq!(second.delivery, DeliveryOutcome::Suppressed);

    let third = orchestrator.run(request).await;
    assert_eq!(third.delivery, DeliveryOutcome::Suppressed);

    assert_eq!(delivery.patches.load(Ordering::SeqCst), 3);
    assert_eq!(delivery.posts.load(Ordering::SeqCst), 1);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn expired_token_skips_patch() {
    let delivery = Arc::new(RecordingDelivery::default());
    let orchestrator = orchestrator(
        Arc::new(FakeTelemetry::default()),
        Arc::new(MemoryResultStore::new()),
        Arc::new(ScriptedGenerator::default()),
    )
    .with_delivery(delivery.clone());

    let result = orchestrator
        .run(
            AnalysisRequest::new("EUW1_100", 1)
                .with_delivery(target(chrono::Duration::minutes(20))),
        )
        .await;

    assert_eq!(result.delivery, DeliveryOutcome::FallbackPosted);
    assert!(result
        .notes
        .iter()
        .any(|n| n.stage == Stage::Delivering && n.kind == "delivery_expired"));
    assert_eq!(delivery.patches.load(Ordering::SeqCst), 0);
    assert_eq!(delivery.posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn delivery_failure_does_not_fail_completed_run() {
    let delivery = Arc::new(RecordingDelivery {
        patch_error: Some(RiftError::network("HTTP 502")),
        post_error: Some(RiftError::network("HTTP 502")),
        ..Default::default()
    });
    let orchestrator = orchestrator(
        Arc::new(FakeTelemetry::default()),
        Arc::new(MemoryResultStore::new()),
        Arc::new(ScriptedGenerator::default()),
    )
    .with_delivery(delivery.clone());

    let result = orchestrator
        .run(AnalysisRequest::new("EUW1_100", 1).with_delivery(target(chrono::Duration::zero())))
        .await;

    assert_eq!(result.status, AnalysisStatus::Completed);
    assert!(matches!(result.delivery, DeliveryOutcome::Failed { .. }));
    assert_eq!(result.metrics[&Stage::Delivering].outcome, OutcomeKind::Failed);
    assert_eq!(delivery.patches.load(Ordering::SeqCst), 1);
    assert_eq!(delivery.posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_found_fails_the_run() {
    let orchestrator = orchestrator(
        Arc::new(FakeTelemetry::failing_first(vec![RiftError::not_found(
            "timeline for EUW1_404",
        )])),
        Arc::new(MemoryResultStore::new()),
        Arc::new(ScriptedGenerator::default()),
    );

    let result = orchestrator.run(AnalysisRequest::new("EUW1_404", 1)).await;

    match &result.status {
        AnalysisStatus::Failed { stage, reason } => {
            assert_eq!(*stage, Stage::Fetching);
            assert!(reason.contains("not found"), "got {reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(result.scores.is_empty());
    assert!(result.narrative.is_none());
    assert_eq!(result.metrics[&Stage::Fetching].outcome, OutcomeKind::Failed);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_fetch_waits_then_completes() {
    let telemetry = Arc::new(FakeTelemetry::failing_first(vec![RiftError::RateLimited {
        retry_after: Some(Duration::from_secs(3)),
    }]));
    let orchestrator = orchestrator(
        telemetry.clone(),
        Arc::new(MemoryResultStore::new()),
        Arc::new(ScriptedGenerator::default()),
    );

    let start = tokio::time::Instant::now();
    let result = orchestrator.run(AnalysisRequest::new("EUW1_100", 1)).await;

    assert_eq!(result.status, AnalysisStatus::Completed);
    assert!(start.elapsed() >= Duration::from_secs(3));
    assert!(result.metrics[&Stage::Fetching].duration_ms >= 3_000);
    assert_eq!(telemetry.timeline_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_beyond_cap_fails_fast() {
    let telemetry = Arc::new(FakeTelemetry::failing_first(vec![RiftError::RateLimited {
        retry_after: Some(Duration::from_secs(600)),
    }]));
    let orchestrator = orchestrator(
        telemetry.clone(),
        Arc::new(MemoryResultStore::new()),
        Arc::new(ScriptedGenerator::default()),
    );

    let start = tokio::time::Instant::now();
    let result = orchestrator.run(AnalysisRequest::new("EUW1_100", 1)).await;

    assert!(matches!(result.status, AnalysisStatus::Failed { stage: Stage::Fetching, .. }));
    assert!(start.elapsed() < Duration::from_secs(600));
    assert_eq!(telemetry.timeline_calls.load(Ordering::SeqCst), 1);
}
