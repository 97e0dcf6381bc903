//! Requests and the per-match result aggregate.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::ParticipantScore;
use crate::timeline::ParticipantId;

use super::stage::{AnalysisStatus, OutcomeKind, Stage, StageTiming};

/// Narrative produced by the generator.
pub const NARRATIVE_VERSION: &str = "narrative-v1";
/// Narrative produced by the deterministic template.
pub const FALLBACK_VERSION: &str = "fallback-template";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub match_id: String,
    /// Narrative focus.
    pub participant_id: ParticipantId,
    #[serde(default)]
    pub delivery: Option<DeliveryTarget>,
    #[serde(default)]
    pub synthesize_audio: bool,
}

impl AnalysisRequest {
    pub fn new(match_id: impl Into<String>, participant_id: ParticipantId) -> Self {
        Self {
            match_id: match_id.into(),
            participant_id,
            delivery: None,
            synthesize_audio: false,
        }
    }

    pub fn with_delivery(mut self, target: DeliveryTarget) -> Self {
        self.delivery = Some(target);
        self
    }

    pub fn with_audio(mut self) -> Self {
        self.synthesize_audio = true;
        self
    }
}

/// Where to deliver. The interaction token is only valid for a limited window
/// after `issued_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryTarget {
    pub application_id: String,
    pub interaction_token: String,
    pub channel_id: String,
    pub issued_at: DateTime<Utc>,
}

impl DeliveryTarget {
    pub fn token_age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.issued_at).to_std().unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    #[default]
    NotRequested,
    Patched,
    FallbackPosted,
    /// A previous run already used the fallback post.
    Suppressed,
    Failed {
        reason: String,
    },
}

impl DeliveryOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::NotRequested => "not_requested",
            DeliveryOutcome::Patched => "patched",
            DeliveryOutcome::FallbackPosted => "fallback_posted",
            DeliveryOutcome::Suppressed => "suppressed",
            DeliveryOutcome::Failed { .. } => "failed",
        }
    }
}

static LIFECYCLE_SEQ: AtomicU64 = AtomicU64::new(1);

/// Point in a run's life. `seq` is strictly increasing across the process,
/// so marks from concurrent runs can be ordered even when clocks tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleMark {
    pub seq: u64,
    pub at: DateTime<Utc>,
}

impl LifecycleMark {
    pub fn now() -> Self {
        Self {
            seq: LIFECYCLE_SEQ.fetch_add(1, Ordering::SeqCst),
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub accepted: LifecycleMark,
    #[serde(default)]
    pub guard_acquired: Option<LifecycleMark>,
    #[serde(default)]
    pub fetch_started: Option<LifecycleMark>,
    #[serde(default)]
    pub guard_released: Option<LifecycleMark>,
}

/// Why a stage degraded or failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageNote {
    pub stage: Stage,
    pub kind: String,
    pub message: String,
}

/// Per-match aggregate, mutated only by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub run_id: String,
    pub match_id: String,
    pub participant_id: ParticipantId,
    pub status: AnalysisStatus,
    pub stage: Stage,
    #[serde(default)]
    pub scores: BTreeMap<ParticipantId, ParticipantScore>,
    #[serde(default)]
    pub narrative: Option<String>,
    #[serde(default)]
    pub algorithm_version: Option<String>,
    /// Guarded text handed to speech synthesis.
    #[serde(default)]
    pub spoken_text: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub delivery: DeliveryOutcome,
    #[serde(default)]
    pub metrics: BTreeMap<Stage, StageTiming>,
    #[serde(default)]
    pub notes: Vec<StageNote>,
    pub lifecycle: Lifecycle,
}

impl AnalysisResult {
    pub fn new(run_id: impl Into<String>, request: &AnalysisRequest) -> Self {
        Self {
            run_id: run_id.into(),
            match_id: request.match_id.clone(),
            participant_id: request.participant_id,
            status: AnalysisStatus::Pending,
            stage: Stage::Pending,
            scores: BTreeMap::new(),
            narrative: None,
            algorithm_version: None,
            spoken_text: None,
            audio_url: None,
            delivery: DeliveryOutcome::NotRequested,
            metrics: BTreeMap::new(),
            notes: Vec::new(),
            lifecycle: Lifecycle {
                accepted: LifecycleMark::now(),
                guard_acquired: None,
                fetch_started: None,
                guard_released: None,
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move into `stage`. Ignored once the result is terminal.
    pub(crate) fn enter(&mut self, stage: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        if self.status == AnalysisStatus::Pending {
            self.status = AnalysisStatus::Processing;
        }
        self.stage = stage;
        true
    }

    pub(crate) fn complete(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.stage = Stage::Completed;
        self.status = AnalysisStatus::Completed;
        true
    }

    /// Fail the run at `stage`. A stage that may not fail the run records the
    /// reason as a note instead and the run carries on.
    pub(crate) fn fail(&mut self, stage: Stage, reason: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        if !stage.can_fail_run() {
            self.note(stage, "degraded", reason);
            return false;
        }
        self.stage = stage;
        self.status = AnalysisStatus::Failed {
            stage,
            reason: reason.into(),
        };
        true
    }

    pub(crate) fn record_timing(&mut self, stage: Stage, elapsed: Duration, outcome: OutcomeKind) {
        self.metrics.insert(
            stage,
            StageTiming {
                duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                outcome,
            },
        );
    }

    pub(crate) fn note(&mut self, stage: Stage, kind: &str, message: impl Into<String>) {
        self.notes.push(StageNote {
            stage,
            kind: kind.to_string(),
            message: message.into(),
        });
    }

    pub fn focus_score(&self) -> Option<&ParticipantScore> {
        self.scores.get(&self.participant_id)
    }

    pub fn used_fallback_narrative(&self) -> bool {
        self.algorithm_version.as_deref() == Some(FALLBACK_VERSION)
    }
}
