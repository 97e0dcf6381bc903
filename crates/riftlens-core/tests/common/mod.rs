//! Shared fakes and fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use riftlens_core::config::{PipelineConfig, RetryConfig};
use riftlens_core::timeline::{
    Frame, GameEvent, MatchDetails, MatchTimeline, ParticipantFrame, ParticipantStats, Position,
    TimelineInfo,
};
use riftlens_core::{
    AnalysisOrchestrator, DeliveryClient, DeliveryPayload, MemoryCacheStore, NarrativeCache,
    NarrativeGenerator, ResultStore, RiftError, RiftResult, TelemetryClient,
};
use serde_json::Value as JsonValue;

pub const CHAMPIONS: [&str; 10] = [
    "Ahri", "Lee Sin", "Garen", "Jinx", "Thresh", "Zed", "Vi", "Darius", "Caitlyn", "Leona",
];

/// Ten participants, 25 one-minute frames and a handful of fights.
pub fn timeline(match_id: &str) -> MatchTimeline {
    let mut frames = Vec::new();
    for minute in 0..=25u32 {
        let mut frame = Frame {
            timestamp: u64::from(minute) * 60_000,
            ..Default::default()
        };
        for id in 1..=10u8 {
            let k = u32::from(id);
            frame.participant_frames.insert(
                id,
                ParticipantFrame {
                    total_gold: 500 + (340 + 4 * k) * minute,
                    xp: 410 * minute,
                    level: (1 + minute / 2).min(18),
                    minions_killed: (5 + k % 3) * minute,
                    position: Some(Position {
                        x: 900 * i32::from(id),
                        y: 700 * i32::from(id),
                    }),
                    ..Default::default()
                },
            );
        }
        if minute % 6 == 3 {
            frame.events.push(GameEvent::ChampionKill {
                timestamp: frame.timestamp,
                killer_id: 1,
                victim_id: 6 + (minute % 5) as u8,
                assisting_participant_ids: vec![2],
            });
        }
        frames.push(frame);
    }
    let mut timeline = MatchTimeline {
        info: TimelineInfo {
            frame_interval: 60_000,
            frames,
        },
        ..Default::default()
    };
    timeline.metadata.match_id = match_id.to_string();
    timeline
}

pub fn details(match_id: &str) -> MatchDetails {
    MatchDetails {
        match_id: match_id.to_string(),
        game_duration: 25 * 60,
        participants: (1..=10u8)
            .map(|id| ParticipantStats {
                participant_id: id,
                team_id: if id <= 5 { 100 } else { 200 },
                champion_name: CHAMPIONS[usize::from(id - 1)].to_string(),
                riot_id_game_name: Some(format!("summoner{id}")),
                kills: if id == 1 { 5 } else { 0 },
                deaths: if id > 5 { 1 } else { 0 },
                assists: if id == 2 { 5 } else { 0 },
                gold_earned: 9_000 + 100 * u32::from(id),
                vision_score: 20,
                win: id <= 5,
                ..Default::default()
            })
            .collect(),
    }
}

/// Telemetry that serves the canned match, optionally failing the first
/// timeline calls with scripted errors or pausing each call.
#[derive(Default)]
pub struct FakeTelemetry {
    pub timeline_errors: Mutex<VecDeque<RiftError>>,
    pub delay: Option<Duration>,
    pub timeline_calls: AtomicU32,
}

impl FakeTelemetry {
    pub fn failing_first(errors: Vec<RiftError>) -> Self {
        Self {
            timeline_errors: Mutex::new(errors.into()),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }
}

#[async_trait]
impl TelemetryClient for FakeTelemetry {
    async fn get_timeline(&self, match_id: &str) -> RiftResult<MatchTimeline> {
        self.timeline_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.timeline_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(timeline(match_id))
    }

    async fn get_match_details(&self, match_id: &str) -> RiftResult<MatchDetails> {
        Ok(details(match_id))
    }
}

/// Generator that writes a short recap, or fails every call.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub fail: bool,
    pub calls: AtomicU32,
}

impl ScriptedGenerator {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl NarrativeGenerator for ScriptedGenerator {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _system_prompt: &str, input: &JsonValue) -> RiftResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RiftError::network("HTTP 500: model overloaded"));
        }
        let subject = input["subject"].as_str().unwrap_or("The player");
        Ok(format!(
            "{subject} set the pace early and kept pressure on the map all game long."
        ))
    }
}

/// Records delivery calls; patch and post results are scripted.
#[derive(Default)]
pub struct RecordingDelivery {
    pub patch_error: Option<RiftError>,
    pub post_error: Option<RiftError>,
    pub patches: AtomicU32,
    pub posts: AtomicU32,
}

#[async_trait]
impl DeliveryClient for RecordingDelivery {
    async fn patch_original_message(
        &self,
        _application_id: &str,
        _token: &str,
        _payload: &DeliveryPayload,
    ) -> RiftResult<()> {
        self.patches.fetch_add(1, Ordering::SeqCst);
        self.patch_error.clone().map_or(Ok(()), Err)
    }

    async fn post_new_message(&self, _channel_id: &str, _payload: &DeliveryPayload) -> RiftResult<()> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        self.post_error.clone().map_or(Ok(()), Err)
    }
}

pub fn fast_config() -> PipelineConfig {
    PipelineConfig::default().with_retry(RetryConfig {
        max_attempts: 3,
        base_backoff_ms: 5,
        max_backoff_ms: 20,
        max_retry_after_secs: 10,
    })
}

pub fn orchestrator(
    telemetry: Arc<dyn TelemetryClient>,
    store: Arc<dyn ResultStore>,
    generator: Arc<dyn NarrativeGenerator>,
) -> AnalysisOrchestrator {
    let config = fast_config();
    let narratives = NarrativeCache::new(
        Arc::new(MemoryCacheStore::new()),
        generator,
        &config.narrative,
    );
    AnalysisOrchestrator::new(config, telemetry, store, narratives).expect("valid config")
}
