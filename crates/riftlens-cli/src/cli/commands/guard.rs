use std::collections::BTreeMap;

use anyhow::{bail, Context};
use serde_json::Value as JsonValue;

use riftlens_core::config::PipelineConfig;
use riftlens_core::{FactLedger, ParticipantScore, TtsGuardrail};

use super::{print_json, read_json};
use crate::cli::args::GuardArgs;
use crate::exit_codes::SUCCESS;

/// Focus score plus the names of everyone else in the file.
fn load_scores(args: &GuardArgs) -> anyhow::Result<(ParticipantScore, Vec<String>)> {
    let raw: JsonValue = read_json(&args.score)?;
    if raw.get("participant_id").is_some() {
        let score: ParticipantScore =
            serde_json::from_value(raw).context("score file is not a participant score")?;
        return Ok((score, Vec::new()));
    }

    let mut scores: BTreeMap<u8, ParticipantScore> =
        serde_json::from_value(raw).context("score file is not a match score map")?;
    let Some(id) = args.participant else {
        bail!("--participant is required when the score file holds a whole match");
    };
    let Some(focus) = scores.remove(&id) else {
        bail!("participant {id} not found in score file");
    };
    let mut competitors = Vec::new();
    for other in scores.values() {
        for name in [&other.subject_name, &other.riot_id].into_iter().flatten() {
            if !competitors.contains(name) {
                competitors.push(name.clone());
            }
        }
    }
    Ok((focus, competitors))
}

pub fn run(args: GuardArgs) -> anyhow::Result<i32> {
    let (score, competitors) = load_scores(&args)?;
    let config = PipelineConfig::from_env();
    let guardrail = TtsGuardrail::new(&config.guardrail)?;
    let ledger = FactLedger::from_score(&score, &competitors);

    let report = guardrail.guard_with_report(&args.text, &ledger);
    print_json(&report)?;
    Ok(SUCCESS)
}
