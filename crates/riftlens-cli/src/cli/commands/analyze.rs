use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::info;

use riftlens_core::{
    AnalysisOrchestrator, AnalysisRequest, AnalysisStatus, CacheStore, ChatCompletionsGenerator,
    DeliveryTarget, FixtureTelemetryClient, FsCacheStore, HttpDeliveryClient, MemoryCacheStore,
    MemoryResultStore, NarrativeCache, NarrativeGenerator, PipelineConfig, ResultStore, RiftError,
    RiftResult, SqliteResultStore,
};

use super::print_json;
use crate::cli::args::AnalyzeArgs;
use crate::exit_codes::{ANALYSIS_FAILED, SUCCESS};

/// Stand-in when no narrative endpoint is configured. Every call fails, so
/// the pipeline renders the template narrative.
struct OfflineGenerator {
    model_id: String,
}

#[async_trait]
impl NarrativeGenerator for OfflineGenerator {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn generate(&self, _system_prompt: &str, _input: &JsonValue) -> RiftResult<String> {
        Err(RiftError::config("no narrative endpoint configured (--llm-url)"))
    }
}

fn load_config(args: &AnalyzeArgs) -> anyhow::Result<PipelineConfig> {
    let config = match &args.config {
        Some(path) => {
            let mut config = PipelineConfig::from_yaml_file(path)?;
            config.apply_env_overrides();
            config
        }
        None => PipelineConfig::from_env(),
    };
    config.validate().context("invalid pipeline configuration")?;
    Ok(config)
}

pub async fn run(args: AnalyzeArgs) -> anyhow::Result<i32> {
    let config = load_config(&args)?;

    let generator: Arc<dyn NarrativeGenerator> = match &args.llm_url {
        Some(url) => {
            let mut generator = ChatCompletionsGenerator::new(url, &config.narrative.model_id)?;
            if let Some(key) = &args.llm_api_key {
                generator = generator.with_api_key(key);
            }
            Arc::new(generator)
        }
        None => Arc::new(OfflineGenerator {
            model_id: config.narrative.model_id.clone(),
        }),
    };
    let cache: Arc<dyn CacheStore> = match &args.cache_dir {
        Some(dir) => Arc::new(FsCacheStore::with_dir(dir)),
        None => Arc::new(MemoryCacheStore::new()),
    };
    let store: Arc<dyn ResultStore> = match &args.db {
        Some(path) => Arc::new(
            SqliteResultStore::open(path)
                .with_context(|| format!("failed to open result store {}", path.display()))?,
        ),
        None => Arc::new(MemoryResultStore::new()),
    };

    let narratives = NarrativeCache::new(cache, generator, &config.narrative);
    let telemetry = Arc::new(FixtureTelemetryClient::new(&args.fixtures));
    let mut orchestrator = AnalysisOrchestrator::new(config, telemetry, store, narratives)?;

    let mut request = AnalysisRequest::new(&args.match_id, args.participant);
    if let Some(base_url) = &args.discord_url {
        let mut client = HttpDeliveryClient::new(base_url)?;
        if let Some(token) = &args.bot_token {
            client = client.with_bot_token(token);
        }
        orchestrator = orchestrator.with_delivery(Arc::new(client));

        match (&args.application_id, &args.interaction_token, &args.channel_id) {
            (Some(application_id), Some(interaction_token), Some(channel_id)) => {
                request = request.with_delivery(DeliveryTarget {
                    application_id: application_id.clone(),
                    interaction_token: interaction_token.clone(),
                    channel_id: channel_id.clone(),
                    issued_at: args.token_issued_at.unwrap_or_else(Utc::now),
                });
            }
            _ => anyhow::bail!(
                "--discord-url needs --application-id, --interaction-token and --channel-id"
            ),
        }
    }

    let result = orchestrator.run(request).await;
    info!(
        match_id = %result.match_id,
        status = result.status.label(),
        "analysis complete"
    );
    print_json(&result)?;

    Ok(match result.status {
        AnalysisStatus::Completed => SUCCESS,
        _ => ANALYSIS_FAILED,
    })
}
