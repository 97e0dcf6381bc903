//! Durable result store.

mod memory;
mod sqlite;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RiftResult;
use crate::orchestrator::{AnalysisResult, AnalysisStatus, DeliveryOutcome};
use crate::scoring::ParticipantScore;
use crate::timeline::ParticipantId;

pub use memory::MemoryResultStore;
pub use sqlite::SqliteResultStore;

/// Score data and pipeline outputs persisted per match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub run_id: String,
    pub participant_id: ParticipantId,
    pub scores: BTreeMap<ParticipantId, ParticipantScore>,
    #[serde(default)]
    pub narrative: Option<String>,
    #[serde(default)]
    pub algorithm_version: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub delivery: DeliveryOutcome,
}

impl StoredAnalysis {
    pub fn from_result(result: &AnalysisResult) -> Self {
        Self {
            run_id: result.run_id.clone(),
            participant_id: result.participant_id,
            scores: result.scores.clone(),
            narrative: result.narrative.clone(),
            algorithm_version: result.algorithm_version.clone(),
            audio_url: result.audio_url.clone(),
            delivery: result.delivery.clone(),
        }
    }
}

/// One row of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub match_id: String,
    pub analysis: StoredAnalysis,
    pub status: AnalysisStatus,
    pub updated_at: DateTime<Utc>,
}

/// Keyed by match id; writes overwrite.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert or overwrite. Returns `true` when the row did not exist before.
    async fn upsert(
        &self,
        match_id: &str,
        analysis: &StoredAnalysis,
        status: &AnalysisStatus,
    ) -> RiftResult<bool>;

    async fn get(&self, match_id: &str) -> RiftResult<Option<StoredRecord>>;
}
