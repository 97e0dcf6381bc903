//! Post-match analytics for a multiplayer game.
//!
//! The crate turns match telemetry into per-participant performance scores
//! and runs the staged pipeline that persists them, narrates them, optionally
//! speaks them and delivers the result to a notification channel.
//!
//! # Modules
//!
//! - [`scoring`]: deterministic ten-dimension [`ScoringEngine`]
//! - [`orchestrator`]: the staged [`AnalysisOrchestrator`]
//! - [`guard`]: per-match FIFO mutual exclusion
//! - [`narrative`]: content-addressed cache in front of the narrative generator
//! - [`guardrail`]: text clean-up before speech synthesis
//! - [`providers`]: collaborator traits plus HTTP and fixture adapters
//! - [`storage`]: durable result store
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use riftlens_core::{
//!     AnalysisOrchestrator, AnalysisRequest, FixtureTelemetryClient, MemoryCacheStore,
//!     NarrativeCache, PipelineConfig, SqliteResultStore, ChatCompletionsGenerator,
//! };
//!
//! # async fn demo() -> riftlens_core::RiftResult<()> {
//! let config = PipelineConfig::from_env();
//! let narratives = NarrativeCache::new(
//!     Arc::new(MemoryCacheStore::new()),
//!     Arc::new(ChatCompletionsGenerator::new("http://localhost:8080/v1", &config.narrative.model_id)?),
//!     &config.narrative,
//! );
//! let orchestrator = AnalysisOrchestrator::new(
//!     config,
//!     Arc::new(FixtureTelemetryClient::new("fixtures")),
//!     Arc::new(SqliteResultStore::open("results.db".as_ref())?),
//!     narratives,
//! )?;
//! let result = orchestrator.run(AnalysisRequest::new("EUW1_100", 1)).await;
//! println!("{}", result.status.label());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod guardrail;
pub mod narrative;
pub mod orchestrator;
pub mod providers;
pub mod scoring;
pub mod storage;
pub mod timeline;

pub use config::PipelineConfig;
pub use error::{RiftError, RiftResult};
pub use guard::{GuardToken, MatchExecutionGuard};
pub use guardrail::{FactLedger, GuardReport, TtsGuardrail};
pub use narrative::{CacheStore, FsCacheStore, MemoryCacheStore, NarrativeCache};
pub use orchestrator::{
    AnalysisOrchestrator, AnalysisRequest, AnalysisResult, AnalysisStatus, DeliveryOutcome,
    DeliveryTarget, Stage,
};
pub use providers::{
    ChatCompletionsGenerator, DeliveryClient, DeliveryPayload, FixtureTelemetryClient,
    HttpDeliveryClient, HttpTelemetryClient, NarrativeGenerator, SpeechSynthesizer,
    TelemetryClient, ToneTag,
};
pub use scoring::{Dimension, DimensionScores, ParticipantScore, ScoringEngine};
pub use storage::{MemoryResultStore, ResultStore, SqliteResultStore};
pub use timeline::{MatchDetails, MatchTimeline};
