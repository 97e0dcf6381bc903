//! Same-match serialization and cross-match independence, both at the guard
//! and through the full pipeline.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{details, orchestrator, timeline, FakeTelemetry, ScriptedGenerator};
use riftlens_core::timeline::{MatchDetails, MatchTimeline};
use riftlens_core::{
    AnalysisRequest, AnalysisStatus, MatchExecutionGuard, MemoryResultStore, RiftResult,
    TelemetryClient,
};
use tokio::sync::Barrier;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_acquires_have_one_holder() {
    let guard = MatchExecutionGuard::new();
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..12)
        .map(|_| {
            let guard = guard.clone();
            let active = active.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                let token = guard.acquire("M1").await.unwrap();
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                drop(token);
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(guard.active_matches(), 0);
}

#[tokio::test]
async fn second_run_fetches_after_first_releases() {
    let orchestrator = Arc::new(orchestrator(
        Arc::new(FakeTelemetry::slow(Duration::from_millis(30))),
        Arc::new(MemoryResultStore::new()),
        Arc::new(ScriptedGenerator::default()),
    ));

    let (a, b) = tokio::join!(
        orchestrator.run(AnalysisRequest::new("M1", 1)),
        orchestrator.run(AnalysisRequest::new("M1", 2)),
    );
    assert_eq!(a.status, AnalysisStatus::Completed);
    assert_eq!(b.status, AnalysisStatus::Completed);

    let acquired = |r: &riftlens_core::AnalysisResult| r.lifecycle.guard_acquired.unwrap().seq;
    let (first, second) = if acquired(&a) < acquired(&b) { (a, b) } else { (b, a) };

    let released = first.lifecycle.guard_released.unwrap();
    let fetch_started = second.lifecycle.fetch_started.unwrap();
    assert!(fetch_started.seq > released.seq);
    assert!(fetch_started.at >= released.at);
    assert_eq!(orchestrator.guard().active_matches(), 0);
}

/// Each fetch waits until the other match has started fetching too, so the
/// runs only finish if they are not serialized against each other.
struct RendezvousTelemetry {
    barrier: Barrier,
}

#[async_trait]
impl TelemetryClient for RendezvousTelemetry {
    async fn get_timeline(&self, match_id: &str) -> RiftResult<MatchTimeline> {
        self.barrier.wait().await;
        Ok(timeline(match_id))
    }

    async fn get_match_details(&self, match_id: &str) -> RiftResult<MatchDetails> {
        Ok(details(match_id))
    }
}

#[tokio::test]
async fn distinct_matches_run_in_parallel() {
    let orchestrator = orchestrator(
        Arc::new(RendezvousTelemetry {
            barrier: Barrier::new(2),
        }),
        Arc::new(MemoryResultStore::new()),
        Arc::new(ScriptedGenerator::default()),
    );

    let both = async {
        tokio::join!(
            orchestrator.run(AnalysisRequest::new("M1", 1)),
            orchestrator.run(AnalysisRequest::new("M2", 1)),
        )
    };
    let (a, b) = tokio::time::timeout(Duration::from_secs(5), both)
        .await
        .expect("runs for distinct matches blocked each other");

    assert_eq!(a.status, AnalysisStatus::Completed);
    assert_eq!(b.status, AnalysisStatus::Completed);
}
