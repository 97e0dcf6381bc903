use anyhow::bail;
use riftlens_core::{MatchDetails, MatchTimeline, ScoringEngine};

use super::{print_json, read_json};
use crate::cli::args::ScoreArgs;
use crate::exit_codes::SUCCESS;

pub fn run(args: ScoreArgs) -> anyhow::Result<i32> {
    let timeline: MatchTimeline = read_json(&args.timeline)?;
    let details: Option<MatchDetails> = args
        .details
        .as_deref()
        .map(read_json::<MatchDetails>)
        .transpose()?;
    let engine = ScoringEngine::new();

    match args.participant {
        Some(id) => {
            let known = timeline.participant_ids().contains(&id)
                || details.as_ref().and_then(|d| d.participant(id)).is_some();
            if !known {
                bail!("participant {id} does not appear in the match");
            }
            print_json(&engine.score(&timeline, id, details.as_ref()))?;
        }
        None => print_json(&engine.score_all(&timeline, details.as_ref()))?,
    }
    Ok(SUCCESS)
}
