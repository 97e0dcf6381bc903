//! Staged analysis pipeline.
//!
//! `fetch -> score -> persist -> narrate -> synthesize -> deliver`. Only
//! fetch and persist can fail a run; later stages degrade and the run still
//! completes. Every run for the same match id holds the
//! [`MatchExecutionGuard`] from before the fetch until the end of the run.

mod deliver;
mod result;
mod retry;
mod stage;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{RiftError, RiftResult};
use crate::guard::MatchExecutionGuard;
use crate::guardrail::{FactLedger, TtsGuardrail};
use crate::narrative::{system_prompt, template_narrative, NarrativeCache, NarrativeInput};
use crate::providers::{
    DeliveryClient, DeliveryPayload, SpeechSynthesizer, TelemetryClient, ToneTag,
};
use crate::scoring::{ParticipantScore, ScoringEngine};
use crate::storage::{ResultStore, StoredAnalysis, StoredRecord};
use crate::timeline::{MatchDetails, MatchTimeline, ParticipantId};

pub use result::{
    AnalysisRequest, AnalysisResult, DeliveryOutcome, DeliveryTarget, Lifecycle, LifecycleMark,
    StageNote, FALLBACK_VERSION, NARRATIVE_VERSION,
};
pub use stage::{AnalysisStatus, OutcomeKind, Stage, StageOutcome, StageTiming};

use deliver::DeliveryStep;
use retry::RetryPolicy;

type Fetched = (MatchTimeline, Option<MatchDetails>);

pub struct AnalysisOrchestrator {
    telemetry: Arc<dyn TelemetryClient>,
    store: Arc<dyn ResultStore>,
    narratives: NarrativeCache,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    delivery: Option<Arc<dyn DeliveryClient>>,
    guard: MatchExecutionGuard,
    guardrail: TtsGuardrail,
    engine: ScoringEngine,
    retry: RetryPolicy,
    config: PipelineConfig,
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("narratives", &self.narratives)
            .field("has_synthesizer", &self.synthesizer.is_some())
            .field("has_delivery", &self.delivery.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AnalysisOrchestrator {
    /// Fails only on an invalid configuration.
    pub fn new(
        config: PipelineConfig,
        telemetry: Arc<dyn TelemetryClient>,
        store: Arc<dyn ResultStore>,
        narratives: NarrativeCache,
    ) -> RiftResult<Self> {
        config.validate()?;
        let guardrail = TtsGuardrail::new(&config.guardrail)?;
        Ok(Self {
            telemetry,
            store,
            narratives,
            synthesizer: None,
            delivery: None,
            guard: MatchExecutionGuard::new(),
            guardrail,
            engine: ScoringEngine::new(),
            retry: RetryPolicy::from_config(&config.retry),
            config,
        })
    }

    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_delivery(mut self, delivery: Arc<dyn DeliveryClient>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Share a guard with other orchestrators in the same process.
    pub fn with_guard(mut self, guard: MatchExecutionGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn guard(&self) -> &MatchExecutionGuard {
        &self.guard
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline for one request. Always returns a result; a failed
    /// run is reported through [`AnalysisResult::status`].
    pub async fn run(&self, request: AnalysisRequest) -> AnalysisResult {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "analysis",
            match_id = %request.match_id,
            participant_id = request.participant_id,
            run_id = %run_id,
        );
        self.run_guarded(run_id, request).instrument(span).await
    }

    async fn run_guarded(&self, run_id: String, request: AnalysisRequest) -> AnalysisResult {
        let mut result = AnalysisResult::new(run_id, &request);
        info!("analysis accepted");

        let token = match self.guard.acquire(&request.match_id).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "could not acquire match guard");
                result.fail(Stage::Fetching, e.to_string());
                return result;
            }
        };
        result.lifecycle.guard_acquired = Some(LifecycleMark::now());
        debug!("match guard acquired");

        // The token is released on drop even if this future is cancelled.
        self.execute(&request, &mut result).await;

        result.lifecycle.guard_released = Some(LifecycleMark::now());
        token.release();

        info!(
            status = result.status.label(),
            stage = %result.stage,
            delivery = result.delivery.label(),
            "analysis finished"
        );
        result
    }

    async fn execute(&self, request: &AnalysisRequest, result: &mut AnalysisResult) {
        let match_id = request.match_id.as_str();

        // Fetch
        result.enter(Stage::Fetching);
        result.lifecycle.fetch_started = Some(LifecycleMark::now());
        let started = begin(Stage::Fetching);
        let fetched = self.fetch(match_id, result).await;
        debug!(outcome = fetched.label(), "fetch stage finished");
        let (timeline, details) = match fetched {
            StageOutcome::Success(fetched) => {
                finish(result, Stage::Fetching, started, OutcomeKind::Success);
                fetched
            }
            StageOutcome::Degraded(fetched, _) => {
                finish(result, Stage::Fetching, started, OutcomeKind::Degraded);
                fetched
            }
            StageOutcome::Failed(reason) => {
                finish(result, Stage::Fetching, started, OutcomeKind::Failed);
                result.fail(Stage::Fetching, reason);
                self.record_failure(match_id, result).await;
                return;
            }
        };

        // Score
        result.enter(Stage::Scoring);
        let started = begin(Stage::Scoring);
        let (scores, focus) = self.score(&timeline, details.as_ref(), request.participant_id);
        result.scores = scores;
        finish(result, Stage::Scoring, started, OutcomeKind::Success);
        info!(
            overall_score = focus.overall_score,
            participants = result.scores.len(),
            "match scored"
        );

        // Persist
        result.enter(Stage::Persisting);
        let started = begin(Stage::Persisting);
        let persisted = self.persist(match_id, result).await;
        debug!(outcome = persisted.label(), "persist stage finished");
        let previous = match persisted {
            StageOutcome::Success(previous) | StageOutcome::Degraded(previous, _) => {
                finish(result, Stage::Persisting, started, OutcomeKind::Success);
                previous
            }
            StageOutcome::Failed(reason) => {
                finish(result, Stage::Persisting, started, OutcomeKind::Failed);
                result.fail(Stage::Persisting, reason);
                return;
            }
        };

        // Narrate
        result.enter(Stage::Narrating);
        let started = begin(Stage::Narrating);
        let narrated = self.narrate(match_id, &focus, result).await;
        debug!(outcome = narrated.label(), "narrate stage finished");
        let kind = match narrated {
            StageOutcome::Success(text) => {
                result.narrative = Some(text);
                result.algorithm_version = Some(NARRATIVE_VERSION.to_string());
                OutcomeKind::Success
            }
            StageOutcome::Degraded(text, _) => {
                result.narrative = Some(text);
                result.algorithm_version = Some(FALLBACK_VERSION.to_string());
                OutcomeKind::Degraded
            }
            StageOutcome::Failed(_) => {
                result.narrative = Some(template_narrative(&focus));
                result.algorithm_version = Some(FALLBACK_VERSION.to_string());
                OutcomeKind::Degraded
            }
        };
        finish(result, Stage::Narrating, started, kind);

        // Synthesize
        if request.synthesize_audio {
            result.enter(Stage::Synthesizing);
            let started = begin(Stage::Synthesizing);
            let kind = match self.synthesize(&focus, result).await {
                Some(url) => {
                    result.audio_url = Some(url);
                    OutcomeKind::Success
                }
                None => OutcomeKind::Skipped,
            };
            finish(result, Stage::Synthesizing, started, kind);
        }

        // Deliver
        if let Some(target) = &request.delivery {
            result.enter(Stage::Delivering);
            let started = begin(Stage::Delivering);
            let previous_delivery = previous.as_ref().map(|p| &p.analysis.delivery);
            let kind = self.deliver(target, &focus, previous_delivery, result).await;
            finish(result, Stage::Delivering, started, kind);
        }

        result.complete();
        self.persist_final(match_id, result).await;
    }

    async fn fetch(&self, match_id: &str, result: &mut AnalysisResult) -> StageOutcome<Fetched> {
        let timeout = self.config.timeouts.fetch();
        let telemetry = self.telemetry.as_ref();
        let (timeline, details) = tokio::join!(
            self.retry
                .run("fetch_timeline", timeout, || telemetry.get_timeline(match_id)),
            self.retry
                .run("fetch_details", timeout, || telemetry.get_match_details(match_id)),
        );

        let timeline = match timeline {
            Ok(timeline) => timeline,
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "timeline fetch failed");
                result.note(Stage::Fetching, e.kind(), e.to_string());
                return StageOutcome::Failed(e.to_string());
            }
        };

        match details {
            Ok(details) => StageOutcome::Success((timeline, Some(details))),
            Err(e) => {
                let reason = format!("match details unavailable: {e}");
                warn!(error = %e, "scoring from timeline only");
                result.note(Stage::Fetching, e.kind(), reason.clone());
                StageOutcome::Degraded((timeline, None), reason)
            }
        }
    }

    fn score(
        &self,
        timeline: &MatchTimeline,
        details: Option<&MatchDetails>,
        focus: ParticipantId,
    ) -> (BTreeMap<ParticipantId, ParticipantScore>, ParticipantScore) {
        let mut scores = self.engine.score_all(timeline, details);
        let focus_score = scores
            .entry(focus)
            .or_insert_with(|| self.engine.score(timeline, focus, details))
            .clone();
        (scores, focus_score)
    }

    /// Durable write of the scores. Returns the record a previous run left.
    async fn persist(
        &self,
        match_id: &str,
        result: &mut AnalysisResult,
    ) -> StageOutcome<Option<StoredRecord>> {
        let timeout = self.config.timeouts.persist();

        let previous = match tokio::time::timeout(timeout, self.store.get(match_id)).await {
            Ok(Ok(previous)) => previous,
            Ok(Err(e)) => {
                warn!(error = %e, "could not read previous result");
                None
            }
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                warn!(timeout_ms, "previous result read timed out");
                None
            }
        };
        if let Some(previous) = &previous {
            debug!(
                previous_status = previous.status.label(),
                previous_run = %previous.analysis.run_id,
                "overwriting earlier result"
            );
        }

        let stored = StoredAnalysis::from_result(result);
        let status = result.status.clone();
        let written = self
            .retry
            .run("persist", timeout, || {
                self.store.upsert(match_id, &stored, &status)
            })
            .await;

        match written {
            Ok(inserted) => {
                debug!(inserted, "scores persisted");
                StageOutcome::Success(previous)
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "persist failed");
                result.note(Stage::Persisting, e.kind(), e.to_string());
                StageOutcome::Failed(e.to_string())
            }
        }
    }

    /// Generated narrative, or the deterministic template when every
    /// attempt fails.
    async fn narrate(
        &self,
        match_id: &str,
        focus: &ParticipantScore,
        result: &mut AnalysisResult,
    ) -> StageOutcome<String> {
        let fallback = |result: &mut AnalysisResult, e: RiftError| {
            warn!(error = %e, kind = e.kind(), "narrative degraded to template");
            result.note(Stage::Narrating, e.kind(), e.to_string());
            StageOutcome::Degraded(template_narrative(focus), e.to_string())
        };

        let input = match NarrativeInput::from_score(match_id, focus).to_json() {
            Ok(input) => input,
            Err(e) => return fallback(result, e),
        };
        let prompt = system_prompt(&self.config.narrative.prompt_version);
        let model_id = self.narratives.generator().model_id().to_string();
        let timeout = self.config.timeouts.narrate();
        let attempts = self.config.narrative.attempts.max(1);

        let mut last_error = RiftError::Unknown {
            message: "narrative not attempted".into(),
        };
        for attempt in 1..=attempts {
            let call = self.narratives.get_or_generate(&model_id, &prompt, &input);
            match tokio::time::timeout(timeout, call).await {
                Ok(Ok(narration)) => {
                    debug!(
                        attempt,
                        cache_hit = narration.cache_hit,
                        cache_key = narration.cache_key.as_deref().unwrap_or("-"),
                        "narrative ready"
                    );
                    return StageOutcome::Success(narration.text);
                }
                Ok(Err(e)) => last_error = e,
                Err(_) => last_error = RiftError::timeout("narrate", timeout),
            }
            debug!(attempt, attempts, error = %last_error, "narrative attempt failed");
        }
        fallback(result, last_error)
    }

    /// Guarded narration spoken with a tone derived from the score. Any
    /// failure yields `None` and the run continues without audio.
    async fn synthesize(
        &self,
        focus: &ParticipantScore,
        result: &mut AnalysisResult,
    ) -> Option<String> {
        let Some(synthesizer) = &self.synthesizer else {
            result.note(Stage::Synthesizing, "skipped", "no speech synthesizer configured");
            return None;
        };
        let narrative = result.narrative.clone()?;

        let competitors = competitor_names(&result.scores, focus.participant_id);
        let ledger = FactLedger::from_score(focus, &competitors);
        let report = self.guardrail.guard_with_report(&narrative, &ledger);
        debug!(
            removed_numbers = report.removed_numbers.len(),
            removed_phrases = report.removed_phrases.len(),
            replaced_names = report.replaced_names.len(),
            used_template = report.used_template,
            "guardrail applied"
        );
        let Some(text) = report.text else {
            result.note(Stage::Synthesizing, "skipped", "guardrail rejected narration");
            return None;
        };
        result.spoken_text = Some(text.clone());

        let tone = ToneTag::from_overall(focus.overall_score);
        let timeout = self.config.timeouts.synthesize();
        match tokio::time::timeout(timeout, synthesizer.synthesize(&text, tone)).await {
            Ok(Ok(Some(url))) => {
                debug!(tone = tone.as_str(), "audio synthesized");
                Some(url)
            }
            Ok(Ok(None)) => {
                result.note(Stage::Synthesizing, "skipped", "synthesizer returned no audio");
                None
            }
            Ok(Err(e)) => {
                debug!(error = %e, "speech synthesis skipped");
                result.note(Stage::Synthesizing, e.kind(), e.to_string());
                None
            }
            Err(_) => {
                let e = RiftError::timeout("synthesize", timeout);
                result.note(Stage::Synthesizing, e.kind(), e.to_string());
                None
            }
        }
    }

    async fn deliver(
        &self,
        target: &DeliveryTarget,
        focus: &ParticipantScore,
        previous: Option<&DeliveryOutcome>,
        result: &mut AnalysisResult,
    ) -> OutcomeKind {
        let Some(client) = &self.delivery else {
            result.note(Stage::Delivering, "skipped", "no delivery client configured");
            return OutcomeKind::Skipped;
        };

        let payload = DeliveryPayload {
            match_id: result.match_id.clone(),
            content: result.narrative.clone().unwrap_or_default(),
            overall_score: focus.overall_score,
            audio_url: result.audio_url.clone(),
        };
        let step = DeliveryStep {
            client: client.as_ref(),
            timeout: self.config.timeouts.deliver(),
            token_ttl: self.config.delivery.token_ttl(),
        };
        let report = step.deliver(target, &payload, previous).await;
        if let Some(e) = &report.patch_error {
            result.note(Stage::Delivering, e.kind(), e.to_string());
        }
        debug!(calls = report.calls, outcome = report.outcome.label(), "delivery finished");

        let kind = match &report.outcome {
            DeliveryOutcome::Patched => OutcomeKind::Success,
            DeliveryOutcome::FallbackPosted => OutcomeKind::Degraded,
            DeliveryOutcome::Suppressed | DeliveryOutcome::NotRequested => OutcomeKind::Skipped,
            DeliveryOutcome::Failed { reason } => {
                result.note(Stage::Delivering, "delivery_failed", reason.clone());
                OutcomeKind::Failed
            }
        };
        result.delivery = report.outcome;
        kind
    }

    /// Best-effort write of the completed state.
    /// Write the terminal state. A failed write leaves the stored row behind
    /// the returned result, which the caller sees as a `Persisting` note.
    async fn persist_final(&self, match_id: &str, result: &mut AnalysisResult) {
        let stored = StoredAnalysis::from_result(result);
        let timeout = self.config.timeouts.persist();
        let write = self.store.upsert(match_id, &stored, &result.status);
        let written = tokio::time::timeout(timeout, write)
            .await
            .unwrap_or_else(|_| Err(RiftError::timeout("persist", timeout)));
        if let Err(e) = written {
            warn!(error = %e, "final result not persisted");
            result.note(
                Stage::Persisting,
                e.kind(),
                format!("final state not persisted, stored result is stale: {e}"),
            );
        }
    }

    /// Record a failed fetch unless an earlier run already left a result.
    async fn record_failure(&self, match_id: &str, result: &mut AnalysisResult) {
        let timeout = self.config.timeouts.persist();
        let lookup = tokio::time::timeout(timeout, self.store.get(match_id))
            .await
            .unwrap_or_else(|_| Err(RiftError::timeout("persist", timeout)));
        match lookup {
            Ok(None) => self.persist_final(match_id, result).await,
            Ok(Some(_)) => debug!("keeping earlier result after failed fetch"),
            Err(e) => {
                warn!(error = %e, "failure not recorded");
                result.note(
                    Stage::Persisting,
                    e.kind(),
                    format!("failure not recorded: {e}"),
                );
            }
        }
    }
}

fn begin(stage: Stage) -> Instant {
    debug!(stage = %stage, "stage started");
    Instant::now()
}

fn finish(result: &mut AnalysisResult, stage: Stage, started: Instant, outcome: OutcomeKind) {
    let elapsed = started.elapsed();
    result.record_timing(stage, elapsed, outcome);
    let duration_ms = elapsed.as_millis() as u64;
    match outcome {
        OutcomeKind::Success | OutcomeKind::Skipped => {
            info!(stage = %stage, duration_ms, outcome = ?outcome, "stage finished")
        }
        OutcomeKind::Degraded | OutcomeKind::Failed => {
            warn!(stage = %stage, duration_ms, outcome = ?outcome, "stage finished")
        }
    }
}

/// Names of everyone but `focus` that generated text could confuse with
/// the subject.
fn competitor_names(
    scores: &BTreeMap<ParticipantId, ParticipantScore>,
    focus: ParticipantId,
) -> Vec<String> {
    let mut names = Vec::new();
    for score in scores.values().filter(|s| s.participant_id != focus) {
        for name in [&score.subject_name, &score.riot_id].into_iter().flatten() {
            if !name.trim().is_empty() && !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}
