//! Pipeline stages, run status and per-stage outcomes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Fetching,
    Scoring,
    Persisting,
    Narrating,
    Synthesizing,
    Delivering,
    Completed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Fetching => "fetching",
            Stage::Scoring => "scoring",
            Stage::Persisting => "persisting",
            Stage::Narrating => "narrating",
            Stage::Synthesizing => "synthesizing",
            Stage::Delivering => "delivering",
            Stage::Completed => "completed",
        }
    }

    /// Only these stages may fail a run; later ones degrade.
    pub fn can_fail_run(self) -> bool {
        matches!(self, Stage::Fetching | Stage::Persisting)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result lifecycle: `pending -> processing -> completed | failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed { stage: Stage, reason: String },
}

impl AnalysisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed { .. } => "failed",
        }
    }
}

/// Explicit three-way stage result.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Success(T),
    Degraded(T, String),
    Failed(String),
}

impl<T> StageOutcome<T> {
    pub fn label(&self) -> &'static str {
        match self {
            StageOutcome::Success(_) => "success",
            StageOutcome::Degraded(..) => "degraded",
            StageOutcome::Failed(_) => "failed",
        }
    }
}

/// Outcome label recorded in the metrics bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Degraded,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub duration_ms: u64,
    pub outcome: OutcomeKind,
}
